//! Trivia quiz backend.
//!
//! Imports categories and multiple-choice questions from Open Trivia DB into a
//! local SQLite database, then serves them over HTTP:
//!
//! - `GET /api/categories` lists every category
//! - `GET /api/quiz?category=9&difficulty=easy` samples a shuffled quiz
//! - `POST /api/quiz/score` checks submitted answers
//!
//! ```sh
//! trivia_quiz import
//! trivia_quiz serve
//! ```
//!
//! The import is slow on purpose: the source only tolerates one request every
//! few seconds, and every stored batch is followed by a 15 to 35 second pause.
pub mod config;
pub mod error;
pub mod importer;
pub mod models;
pub mod quiz;
pub mod retry;
pub mod routes;
pub mod server;
pub mod source;
pub mod state;
pub mod store;
