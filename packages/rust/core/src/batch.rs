//! Batch rewrite: pending lessons → alignment → rewrite → store.
//!
//! Lessons are handled strictly one after another with a fixed delay between
//! them. A failure in one lesson is recorded on that lesson and never stops
//! the batch.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use prepnest_generator::ContentGenerator;
use prepnest_shared::{LessonDocument, PrepnestError, Result, WorkerConfig};
use prepnest_store::{ContentStore, LessonPatch};

/// Knobs for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum lessons fetched and processed.
    pub batch_size: usize,
    /// Pause between consecutive lessons.
    pub delay: Duration,
    /// Skip every store write, logging it instead.
    pub dry_run: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            delay: Duration::from_millis(1_000),
            dry_run: false,
        }
    }
}

impl From<&WorkerConfig> for BatchOptions {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            delay: config.delay(),
            dry_run: config.dry_run,
        }
    }
}

/// Result of processing a single lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonOutcome {
    Completed,
    Failed { error: String },
}

impl LessonOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Totals for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Lessons fetched after eligibility filtering.
    pub fetched: usize,
    pub successful: usize,
    pub failed: usize,
    /// `(lesson id, error message)` per failed lesson, in processing order.
    pub failures: Vec<(String, String)>,
    pub elapsed: Duration,
    pub dry_run: bool,
}

impl BatchSummary {
    fn record(&mut self, id: &str, outcome: &LessonOutcome) {
        match outcome {
            LessonOutcome::Completed => self.successful += 1,
            LessonOutcome::Failed { error } => {
                self.failed += 1;
                self.failures.push((id.to_string(), error.clone()));
            }
        }
    }
}

/// Progress callback for reporting batch status.
pub trait BatchProgress: Send + Sync {
    /// Called once the eligible lessons are known.
    fn batch_fetched(&self, count: usize);
    /// Called before a lesson is claimed. `index` is 1-based.
    fn lesson_started(&self, index: usize, total: usize, title: &str);
    fn lesson_finished(&self, id: &str, outcome: &LessonOutcome);
    fn done(&self, summary: &BatchSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn batch_fetched(&self, _count: usize) {}
    fn lesson_started(&self, _index: usize, _total: usize, _title: &str) {}
    fn lesson_finished(&self, _id: &str, _outcome: &LessonOutcome) {}
    fn done(&self, _summary: &BatchSummary) {}
}

/// Drives pending lessons through generation and back into the store.
pub struct BatchRewriter<'a> {
    store: &'a dyn ContentStore,
    generator: &'a dyn ContentGenerator,
    options: BatchOptions,
}

impl<'a> BatchRewriter<'a> {
    pub fn new(
        store: &'a dyn ContentStore,
        generator: &'a dyn ContentGenerator,
        options: BatchOptions,
    ) -> Self {
        Self {
            store,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Up to `limit` lessons that are pending (or unset) and have raw content.
    #[instrument(skip(self))]
    pub async fn fetch_eligible(&self, limit: usize) -> Result<Vec<LessonDocument>> {
        let fetched = self.store.fetch_pending(limit).await?;
        let returned = fetched.len();

        let eligible: Vec<LessonDocument> = fetched
            .into_iter()
            .filter(LessonDocument::is_eligible)
            .take(limit)
            .collect();

        if eligible.len() < returned {
            warn!(
                returned,
                kept = eligible.len(),
                "store returned ineligible or surplus lessons"
            );
        }
        Ok(eligible)
    }

    /// Claim, generate and persist one lesson.
    ///
    /// Never returns an error: any failure after the claim is written back
    /// as a `failed` status and reported in the outcome.
    #[instrument(skip_all, fields(lesson = %lesson.id, title = %lesson.display_title()))]
    pub async fn process_one(&self, lesson: &LessonDocument) -> LessonOutcome {
        if let Err(e) = self.write(&lesson.id, &LessonPatch::claim()).await {
            warn!(error = %e, "failed to claim lesson, continuing");
        }

        match self.generate_and_store(lesson).await {
            Ok(()) => {
                info!("lesson completed");
                LessonOutcome::Completed
            }
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "lesson failed");

                if let Err(write_err) = self
                    .write(&lesson.id, &LessonPatch::failure(&message))
                    .await
                {
                    error!(error = %write_err, "failed to record failure status");
                }
                LessonOutcome::Failed { error: message }
            }
        }
    }

    /// Fetch one batch and process it sequentially.
    #[instrument(skip_all, fields(batch_size = self.options.batch_size, dry_run = self.options.dry_run))]
    pub async fn run_batch(&self, progress: &dyn BatchProgress) -> Result<BatchSummary> {
        let start = Instant::now();
        let mut summary = BatchSummary {
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        let lessons = self.fetch_eligible(self.options.batch_size).await?;
        summary.fetched = lessons.len();
        progress.batch_fetched(lessons.len());

        if lessons.is_empty() {
            info!("no pending lessons");
        } else {
            info!(count = lessons.len(), model = self.generator.model_id(), "starting batch");
        }

        let total = lessons.len();
        for (i, lesson) in lessons.iter().enumerate() {
            if i > 0 && !self.options.delay.is_zero() {
                tokio::time::sleep(self.options.delay).await;
            }

            progress.lesson_started(i + 1, total, lesson.display_title());
            let outcome = self.process_one(lesson).await;
            progress.lesson_finished(&lesson.id, &outcome);
            summary.record(&lesson.id, &outcome);
        }

        summary.elapsed = start.elapsed();
        info!(
            successful = summary.successful,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch complete"
        );
        progress.done(&summary);

        Ok(summary)
    }

    async fn generate_and_store(&self, lesson: &LessonDocument) -> Result<()> {
        if lesson.has_blank_raw_content() {
            return Err(PrepnestError::validation("raw content is blank"));
        }

        let alignment = self.generator.align_document(lesson).await?;
        let rewrite = self.generator.rewrite_document(lesson).await?;
        rewrite.validate()?;

        let patch = LessonPatch::completion(
            &rewrite,
            &alignment,
            self.generator.model_id(),
            Utc::now(),
        );
        self.write(&lesson.id, &patch).await
    }

    async fn write(&self, id: &str, patch: &LessonPatch) -> Result<()> {
        if self.options.dry_run {
            let fields: Vec<&str> = patch.fields().keys().map(String::as_str).collect();
            info!(
                lesson = id,
                status = ?patch.status(),
                ?fields,
                "dry run: would update"
            );
            return Ok(());
        }
        self.store.patch(id, patch).await
    }
}
