//! Dataset generation pipeline.
//!
//! Pipeline flow:
//! Config → Survey → Worker Pool (chunks) → Records → failure policy → Dataset → CSV/JSONL

use crate::models::{Config, Dataset, FailurePolicy, Record, Result, RunStats, Survey, SynthError};
use crate::output::write_dataset;
use crate::pool::{RecordBuilder, RecordOutcome, WorkerPool};
use crate::sampler::WeightedSampler;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Pipeline generating one dataset per run.
pub struct GenerationPipeline {
    config: Config,
    survey: Arc<Survey>,
    pool: WorkerPool,
    show_progress: bool,
}

impl GenerationPipeline {
    /// Create a new pipeline from configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let survey = Arc::new(config.survey()?);

        let builder = Arc::new(RecordBuilder::new(
            Arc::clone(&survey),
            WeightedSampler::new(config.generation.pick_policy),
        ));
        let pool = WorkerPool::new(
            builder,
            config.generation.workers,
            config.generation.chunk_size,
        );

        Ok(Self {
            config,
            survey,
            pool,
            show_progress: true,
        })
    }

    /// Disable the progress bar.
    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn survey(&self) -> &Survey {
        &self.survey
    }

    /// Configured seed, or a fresh one. The result is recorded in `RunStats`
    /// so any run can be reproduced.
    pub fn resolve_seed(&self) -> u64 {
        self.config
            .generation
            .seed
            .unwrap_or_else(|| rand::rng().random())
    }

    fn progress_bar(&self, total: usize) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
                .map_err(|e| SynthError::Internal(format!("Invalid progress template: {e}")))?
                .progress_chars("##-"),
        );
        Ok(pb)
    }

    /// Generate `generation.count` records.
    pub async fn generate(&self) -> Result<(Dataset, RunStats)> {
        let start = Instant::now();
        let count = self.config.generation.count;
        let seed = self.resolve_seed();
        let policy = self.config.generation.on_record_error;
        let mut stats = RunStats::new(seed, count);

        info!(
            records = count,
            questions = self.survey.len(),
            seed,
            workers = self.pool.pool_size(),
            pick_policy = ?self.config.generation.pick_policy,
            "Starting generation"
        );

        let pb = self.progress_bar(count)?;
        let chunks = self.pool.plan(count);
        let batch_size = (self.pool.pool_size() * 2).max(1);
        let mut records = Vec::with_capacity(count);
        let mut done = 0usize;

        for batch in chunks.chunks(batch_size) {
            let outcomes = self.pool.generate_batch(seed, batch.to_vec()).await?;
            done += outcomes.len();

            if let Err(e) = apply_failure_policy(outcomes, policy, &mut records, &mut stats) {
                pb.abandon_with_message("Aborted");
                return Err(e);
            }

            pb.set_position(done as u64);
            pb.set_message(format!("skipped: {}", stats.skipped));
        }

        pb.finish_with_message(format!(
            "Done! {} generated, {} skipped",
            records.len(),
            stats.skipped
        ));

        stats.generated = records.len();
        stats.runtime_secs = start.elapsed().as_secs_f64();
        stats.finalize();

        if stats.skipped > 0 {
            warn!(
                requested = count,
                generated = stats.generated,
                skipped = stats.skipped,
                "Dataset is short of the requested size"
            );
        }

        info!(
            generated = stats.generated,
            skipped = stats.skipped,
            throughput = format!("{:.0}/s", stats.throughput_per_sec),
            "Generation complete"
        );

        Ok((Dataset::new(records), stats))
    }

    /// Generate and write the dataset to `output_path`.
    pub async fn run(&self, output_path: &Path) -> Result<(Dataset, RunStats)> {
        let (dataset, stats) = self.generate().await?;
        write_dataset(&dataset, &self.survey, output_path, &self.config.output)?;
        Ok((dataset, stats))
    }
}

/// Keep successful records; on failure abort or skip according to `policy`.
pub fn apply_failure_policy(
    outcomes: Vec<RecordOutcome>,
    policy: FailurePolicy,
    records: &mut Vec<Record>,
    stats: &mut RunStats,
) -> Result<()> {
    for (respondent, outcome) in outcomes {
        match (outcome, policy) {
            (Ok(record), _) => records.push(record),
            (Err(source), FailurePolicy::Abort) => {
                return Err(SynthError::RecordFailed { respondent, source });
            }
            (Err(source), FailurePolicy::Skip) => {
                warn!(respondent, error = %source, "Record failed, skipping");
                stats.skipped += 1;
            }
        }
    }
    Ok(())
}
