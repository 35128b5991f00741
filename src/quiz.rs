//! Quiz assembly and answer scoring.
//!
//! Both are pure: the caller loads the questions and supplies the randomness.
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;

use crate::models::{AnswerResult, Question, QuizQuestion, ScoreResponse, SubmittedAnswer};

/// Correct answer plus every incorrect answer, in a fresh random order
pub fn shuffled_options<R: Rng + ?Sized>(question: &Question, rng: &mut R) -> Vec<String> {
    let mut options = Vec::with_capacity(question.incorrect_answers.len() + 1);
    options.push(question.correct_answer.clone());
    options.extend(question.incorrect_answers.iter().cloned());
    options.shuffle(rng);
    options
}

/// Turns sampled questions into quiz entries without revealing the answers
pub fn assemble_quiz<R: Rng + ?Sized>(questions: Vec<Question>, rng: &mut R) -> Vec<QuizQuestion> {
    questions
        .into_iter()
        .map(|q| {
            let options = shuffled_options(&q, &mut *rng);
            QuizQuestion {
                id: q.id,
                question: q.question,
                options,
            }
        })
        .collect()
}

/// Scores answers against the stored questions.
///
/// Results keep the order of `answers`. An id missing from `known` counts as
/// wrong and reports no correct answer.
pub fn score_answers(answers: &[SubmittedAnswer], known: &[Question]) -> ScoreResponse {
    let by_id: HashMap<&str, &Question> = known.iter().map(|q| (q.id.as_str(), q)).collect();

    let results: Vec<AnswerResult> = answers
        .iter()
        .map(|answer| match by_id.get(answer.question_id.as_str()) {
            Some(question) => AnswerResult {
                question_id: answer.question_id.clone(),
                correct_answer: Some(question.correct_answer.clone()),
                is_correct: answer.selected_answer == question.correct_answer,
            },
            None => AnswerResult {
                question_id: answer.question_id.clone(),
                correct_answer: None,
                is_correct: false,
            },
        })
        .collect();

    let score = results.iter().filter(|r| r.is_correct).count();

    ScoreResponse { score, results }
}
