//! Client for the external trivia source (Open Trivia DB).
//!
//! Every call here is a single attempt; rate-limit retries are applied by the
//! caller with an explicit [`RetryPolicy`](crate::retry::RetryPolicy).
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Category, Difficulty, Question};

pub const DEFAULT_SOURCE_URL: &str = "https://opentdb.com";

/// `response_code` the source sends with a usable batch
pub const RESPONSE_SUCCESS: u8 = 0;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("rate limited by trivia source")]
    RateLimited,

    #[error("trivia source returned HTTP {0}")]
    Status(u16),

    #[error("request to trivia source failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
pub struct CategoryList {
    pub trivia_categories: Vec<Category>,
}

/// One page of questions as the source returns it
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBatch {
    pub response_code: u8,
    #[serde(default)]
    pub results: Vec<RawQuestion>,
}

/// A question with the source's HTML-escaped text
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: Vec<String>,
}

impl RawQuestion {
    /// Decodes every text field and tags the record with its local category and difficulty
    pub fn into_question(self, category: i64, difficulty: Difficulty) -> Question {
        Question {
            id: Uuid::new_v4().to_string(),
            category,
            difficulty,
            question: decode(&self.question),
            correct_answer: decode(&self.correct_answer),
            incorrect_answers: self.incorrect_answers.iter().map(|a| decode(a)).collect(),
        }
    }
}

/// Converts HTML-entity-escaped text to plain display text
pub fn decode(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Where categories and questions come from
#[allow(async_fn_in_trait)]
pub trait TriviaSource {
    async fn categories(&self) -> Result<Vec<Category>, FetchError>;

    async fn questions(
        &self,
        category: i64,
        difficulty: Difficulty,
        amount: u32,
    ) -> Result<QuestionBatch, FetchError>;
}

/// HTTP client for Open Trivia DB
pub struct OpenTdb {
    client: Client,
    base_url: String,
}

impl OpenTdb {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn categories_url(&self) -> String {
        format!("{}/api_category.php", self.base_url)
    }

    fn questions_url(&self, category: i64, difficulty: Difficulty, amount: u32) -> String {
        format!(
            "{}/api.php?amount={amount}&category={category}&difficulty={difficulty}&type=multiple",
            self.base_url
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!(url, "fetching");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.json::<T>().await?)
    }
}

impl TriviaSource for OpenTdb {
    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        let list: CategoryList = self.get_json(&self.categories_url()).await?;
        Ok(list.trivia_categories)
    }

    async fn questions(
        &self,
        category: i64,
        difficulty: Difficulty,
        amount: u32,
    ) -> Result<QuestionBatch, FetchError> {
        self.get_json(&self.questions_url(category, difficulty, amount))
            .await
    }
}
