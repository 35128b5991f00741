//! SQLite document store for categories and questions.
//!
//! Each question is kept as one row; the incorrect answers live in a JSON
//! array column so a record reads back exactly as it was imported.
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, types::Type, Connection, Row};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::models::{Category, Difficulty, Question};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    category INTEGER NOT NULL,
    difficulty TEXT NOT NULL,
    question TEXT NOT NULL,
    correct_answer TEXT NOT NULL,
    incorrect_answers TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_questions_category_difficulty
    ON questions (category, difficulty);
"#;

const QUESTION_COLUMNS: &str =
    "id, category, difficulty, question, correct_answer, incorrect_answers";

/// Ids bound per lookup query, well under SQLite's host parameter limit
const LOOKUP_CHUNK: usize = 500;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode answers: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Cloneable handle to the trivia database
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (or creates) the database file and makes sure the tables exist
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Deletes every category and question
    pub fn clear(&self) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let categories = tx.execute("DELETE FROM categories", [])?;
        let questions = tx.execute("DELETE FROM questions", [])?;
        tx.commit()?;

        debug!(categories, questions, "cleared store");
        Ok(())
    }

    /// Inserts categories as-is in one transaction
    pub fn insert_categories(&self, categories: &[Category]) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO categories (id, name) VALUES (?1, ?2)")?;
            for category in categories {
                stmt.execute(params![category.id, category.name])?;
            }
        }
        tx.commit()?;

        Ok(categories.len())
    }

    /// Inserts a batch of questions in one transaction
    pub fn insert_questions(&self, questions: &[Question]) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO questions ({QUESTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            ))?;
            for q in questions {
                let incorrect = serde_json::to_string(&q.incorrect_answers)?;
                stmt.execute(params![
                    q.id,
                    q.category,
                    q.difficulty.as_str(),
                    q.question,
                    q.correct_answer,
                    incorrect,
                ])?;
            }
        }
        tx.commit()?;

        Ok(questions.len())
    }

    /// All categories ordered by id
    pub fn categories(&self) -> StoreResult<Vec<Category>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Uniform random sample of at most `size` questions matching both filters
    pub fn sample_questions(
        &self,
        category: i64,
        difficulty: Difficulty,
        size: usize,
    ) -> StoreResult<Vec<Question>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions
             WHERE category = ?1 AND difficulty = ?2
             ORDER BY RANDOM()
             LIMIT ?3"
        ))?;
        let rows = stmt.query_map(
            params![category, difficulty.as_str(), size as i64],
            row_to_question,
        )?;

        let mut questions = Vec::new();
        for row in rows {
            questions.push(row?);
        }
        Ok(questions)
    }

    /// Looks up questions by id, `LOOKUP_CHUNK` ids per query. Unknown ids are simply absent.
    pub fn questions_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Question>> {
        let unique: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let conn = self.conn.lock();
        let mut questions = Vec::new();
        for chunk in unique.chunks(LOOKUP_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ({placeholders})"
            ))?;
            let rows = stmt.query_map(params_from_iter(chunk), row_to_question)?;
            for row in rows {
                questions.push(row?);
            }
        }
        Ok(questions)
    }

    pub fn category_count(&self) -> StoreResult<usize> {
        self.count("SELECT COUNT(*) FROM categories")
    }

    pub fn question_count(&self) -> StoreResult<usize> {
        self.count("SELECT COUNT(*) FROM questions")
    }

    fn count(&self, sql: &str) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
    let difficulty: String = row.get(2)?;
    let difficulty = difficulty
        .parse::<Difficulty>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into()))?;

    let incorrect: String = row.get(5)?;
    let incorrect_answers: Vec<String> = serde_json::from_str(&incorrect)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

    Ok(Question {
        id: row.get(0)?,
        category: row.get(1)?,
        difficulty,
        question: row.get(3)?,
        correct_answer: row.get(4)?,
        incorrect_answers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, category: i64, difficulty: Difficulty, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            category,
            difficulty,
            question: format!("Question {id}?"),
            correct_answer: correct.to_string(),
            incorrect_answers: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        }
    }

    #[test]
    fn test_categories_round_trip_in_id_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_categories(&[
                Category { id: 22, name: "Geography".to_string() },
                Category { id: 9, name: "General Knowledge".to_string() },
            ])
            .unwrap();

        let categories = store.categories().unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].id, 9);
        assert_eq!(categories[1].name, "Geography");
    }

    #[test]
    fn test_duplicate_category_id_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let result = store.insert_categories(&[
            Category { id: 9, name: "One".to_string() },
            Category { id: 9, name: "Two".to_string() },
        ]);

        assert!(result.is_err());
        // transaction rolled back
        assert_eq!(store.category_count().unwrap(), 0);
    }

    #[test]
    fn test_sample_filters_and_limits() {
        let store = Store::open_in_memory().unwrap();
        let mut batch = Vec::new();
        for i in 0..8 {
            batch.push(question(&format!("easy-{i}"), 9, Difficulty::Easy, "yes"));
        }
        batch.push(question("hard-0", 9, Difficulty::Hard, "yes"));
        batch.push(question("other-0", 10, Difficulty::Easy, "yes"));
        store.insert_questions(&batch).unwrap();

        let sample = store.sample_questions(9, Difficulty::Easy, 5).unwrap();
        assert_eq!(sample.len(), 5);
        for q in &sample {
            assert_eq!(q.category, 9);
            assert_eq!(q.difficulty, Difficulty::Easy);
        }

        let hard = store.sample_questions(9, Difficulty::Hard, 5).unwrap();
        assert_eq!(hard.len(), 1);

        let none = store.sample_questions(9, Difficulty::Medium, 5).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_questions_keep_incorrect_answer_order() {
        let store = Store::open_in_memory().unwrap();
        let mut q = question("q1", 9, Difficulty::Medium, "Paris");
        q.incorrect_answers = vec!["Lyon".to_string(), "Nice".to_string(), "Lille".to_string()];
        store.insert_questions(&[q.clone()]).unwrap();

        let found = store.questions_by_ids(&["q1".to_string()]).unwrap();
        assert_eq!(found, vec![q]);
    }

    #[test]
    fn test_lookup_by_ids_skips_unknown_and_duplicates() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_questions(&[
                question("q1", 9, Difficulty::Easy, "a"),
                question("q2", 9, Difficulty::Easy, "b"),
            ])
            .unwrap();

        let ids = vec!["q1".to_string(), "nope".to_string(), "q1".to_string()];
        let found = store.questions_by_ids(&ids).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "q1");

        assert!(store.questions_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_lookup_beyond_parameter_limit() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_questions(&[
                question("known-a", 9, Difficulty::Easy, "a"),
                question("known-b", 9, Difficulty::Hard, "b"),
            ])
            .unwrap();

        let mut ids: Vec<String> = (0..33_000).map(|i| format!("unknown-{i}")).collect();
        ids.insert(17, "known-a".to_string());
        ids.push("known-b".to_string());

        let mut found: Vec<String> = store
            .questions_by_ids(&ids)
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        found.sort();
        assert_eq!(found, vec!["known-a", "known-b"]);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_categories(&[Category { id: 9, name: "General".to_string() }])
            .unwrap();
        store
            .insert_questions(&[question("q1", 9, Difficulty::Easy, "a")])
            .unwrap();

        store.clear().unwrap();

        assert_eq!(store.category_count().unwrap(), 0);
        assert_eq!(store.question_count().unwrap(), 0);
    }
}
