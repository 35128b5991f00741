//! HTTP handlers for the quiz API.
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;
use tokio::task;
use tracing::debug;

use crate::error::AppError;
use crate::models::{Category, Difficulty, QuizQuestion, ScoreRequest, ScoreResponse};
use crate::quiz::{assemble_quiz, score_answers};
use crate::state::AppState;
use crate::store::StoreResult;

const CATEGORIES_ERROR: &str = "Failed to fetch categories";
const QUIZ_ERROR: &str = "Failed to fetch quiz questions";
const SCORE_ERROR: &str = "Failed to score quiz";

/// Raw quiz filters. Values that cannot match a stored question yield an empty quiz.
#[derive(Debug, Deserialize)]
pub struct QuizParams {
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

impl QuizParams {
    fn filters(&self) -> Option<(i64, Difficulty)> {
        let category = self.category.as_deref()?.trim().parse().ok()?;
        let difficulty = self.difficulty.as_deref()?.parse().ok()?;
        Some((category, difficulty))
    }
}

pub async fn hello_handler() -> &'static str {
    "hello world"
}

pub async fn categories_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    let store = state.store.clone();
    let categories = blocking(CATEGORIES_ERROR, move || store.categories()).await?;

    Ok(Json(categories))
}

pub async fn quiz_handler(
    State(state): State<AppState>,
    params: Result<Query<QuizParams>, QueryRejection>,
) -> Result<Json<Vec<QuizQuestion>>, AppError> {
    let Query(params) = params.map_err(|e| AppError::internal(QUIZ_ERROR, e))?;
    let Some((category, difficulty)) = params.filters() else {
        debug!(?params, "quiz filters match nothing");
        return Ok(Json(Vec::new()));
    };

    let store = state.store.clone();
    let size = state.quiz_size;
    let questions = blocking(QUIZ_ERROR, move || {
        store.sample_questions(category, difficulty, size)
    })
    .await?;

    // fewer matches than the quiz size is not an error
    let quiz = assemble_quiz(questions, &mut rand::thread_rng());

    Ok(Json(quiz))
}

pub async fn score_handler(
    State(state): State<AppState>,
    request: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, AppError> {
    let Json(request) = request.map_err(|e| AppError::internal(SCORE_ERROR, e))?;
    let ids: Vec<String> = request
        .answers
        .iter()
        .map(|a| a.question_id.clone())
        .collect();

    let store = state.store.clone();
    let known = blocking(SCORE_ERROR, move || store.questions_by_ids(&ids)).await?;

    Ok(Json(score_answers(&request.answers, &known)))
}

/// Runs a store call on the blocking pool, mapping any failure to `message`
async fn blocking<T, F>(message: &'static str, f: F) -> Result<T, AppError>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(message, e))?
        .map_err(|e| AppError::internal(message, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(category: Option<&str>, difficulty: Option<&str>) -> QuizParams {
        QuizParams {
            category: category.map(str::to_string),
            difficulty: difficulty.map(str::to_string),
        }
    }

    #[test]
    fn test_filters_parse_valid_values() {
        assert_eq!(
            params(Some("22"), Some("easy")).filters(),
            Some((22, Difficulty::Easy))
        );
        assert_eq!(
            params(Some(" 9 "), Some("hard")).filters(),
            Some((9, Difficulty::Hard))
        );
    }

    #[test]
    fn test_filters_that_match_nothing() {
        assert_eq!(params(Some("22"), Some("Easy")).filters(), None);
        assert_eq!(params(Some("abc"), Some("easy")).filters(), None);
        assert_eq!(params(None, Some("easy")).filters(), None);
        assert_eq!(params(Some("22"), None).filters(), None);
    }
}
