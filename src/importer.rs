//! One-shot import of categories and questions from the trivia source.
//!
//! The run is strictly sequential: one request at a time, with a randomized
//! pause after every stored batch so the source's rate limit is respected.
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::ops::Range;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::models::{Difficulty, Question};
use crate::retry::{with_retry, RetryPolicy};
use crate::source::{FetchError, TriviaSource, RESPONSE_SUCCESS};
use crate::store::{Store, StoreError};

/// Questions requested per (category, difficulty) pair
pub const DEFAULT_BATCH_AMOUNT: u32 = 50;

/// Pause after each stored batch, in milliseconds (upper bound exclusive)
pub const DEFAULT_PAUSE_MS: Range<u64> = 15_000..35_000;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("store failure during import: {0}")]
    Store(#[from] StoreError),

    #[error("fetch failure during import: {0}")]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub amount: u32,
    pub retry: RetryPolicy,
    pub pause_ms: Range<u64>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            amount: DEFAULT_BATCH_AMOUNT,
            retry: RetryPolicy::default(),
            pause_ms: DEFAULT_PAUSE_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The source answered with a non-zero `response_code`
    ResponseCode(u8),
    /// Still rate limited after every retry
    RateLimited,
}

/// A batch pair that ended up with no stored questions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBatch {
    pub category: i64,
    pub difficulty: Difficulty,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub categories: usize,
    pub questions: usize,
    pub skipped: Vec<SkippedBatch>,
}

/// Replaces the store's contents with a fresh copy of the trivia source.
///
/// Skipped batches are recorded in the report rather than failing the run.
/// Any other error aborts the import and leaves whatever was already stored.
pub async fn run_import<S, R>(
    store: &Store,
    source: &S,
    options: &ImportOptions,
    rng: &mut R,
) -> Result<ImportReport, ImportError>
where
    S: TriviaSource,
    R: Rng + ?Sized,
{
    store.clear()?;
    info!("Cleared existing categories and questions");

    let categories = with_retry(&options.retry, move || source.categories()).await?;
    let mut report = ImportReport {
        categories: store.insert_categories(&categories)?,
        ..ImportReport::default()
    };
    info!(count = report.categories, "Inserted categories");

    let progress = progress_bar((categories.len() * Difficulty::ALL.len()) as u64);
    let amount = options.amount;

    for category in &categories {
        let category_id = category.id;

        for difficulty in Difficulty::ALL {
            progress.set_message(format!("{} ({difficulty})", category.name));

            let fetched = with_retry(&options.retry, move || {
                source.questions(category_id, difficulty, amount)
            })
            .await;

            let reason = match fetched {
                Ok(batch) if batch.response_code == RESPONSE_SUCCESS => {
                    let questions: Vec<Question> = batch
                        .results
                        .into_iter()
                        .map(|raw| raw.into_question(category_id, difficulty))
                        .collect();
                    let inserted = store.insert_questions(&questions)?;
                    report.questions += inserted;
                    debug!(category = category_id, %difficulty, inserted, "Stored batch");

                    progress.inc(1);

                    let pause = Duration::from_millis(rng.gen_range(options.pause_ms.clone()));
                    debug!(pause_ms = pause.as_millis() as u64, "Waiting before next request");
                    sleep(pause).await;
                    continue;
                }
                Ok(batch) => SkipReason::ResponseCode(batch.response_code),
                Err(FetchError::RateLimited) => SkipReason::RateLimited,
                Err(e) => {
                    progress.abandon_with_message("import aborted");
                    return Err(e.into());
                }
            };

            warn!(category = category_id, %difficulty, ?reason, "Skipping batch");
            report.skipped.push(SkippedBatch {
                category: category_id,
                difficulty,
                reason,
            });
            progress.inc(1);
        }
    }

    progress.finish_with_message("done");
    Ok(report)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
