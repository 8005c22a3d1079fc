//! Worker pool for parallel record generation.
//!
//! Records are generated in fixed-size chunks. Chunk `i` draws from stream `i`
//! of a ChaCha generator seeded with the run seed, so a dataset depends only
//! on (survey, seed, chunk size), never on worker count or scheduling.

use crate::models::{Record, Result, SamplerError, SynthError};
use crate::pool::RecordBuilder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::ops::Range;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// Outcome of building one record.
pub type RecordOutcome = (usize, std::result::Result<Record, SamplerError>);

/// A contiguous run of respondents sharing one random stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Stream index
    pub index: usize,
    /// Respondent indices covered
    pub respondents: Range<usize>,
}

/// Worker pool for parallel record generation.
pub struct WorkerPool {
    /// Record builder (shared)
    builder: Arc<RecordBuilder>,
    /// Pool size (max concurrent chunks)
    pool_size: usize,
    /// Records per chunk
    chunk_size: usize,
    /// Semaphore for concurrency control
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a new worker pool.
    pub fn new(builder: Arc<RecordBuilder>, pool_size: usize, chunk_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            builder,
            pool_size,
            chunk_size: chunk_size.max(1),
            semaphore: Arc::new(Semaphore::new(pool_size)),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Split `0..count` into chunks.
    pub fn plan(&self, count: usize) -> Vec<Chunk> {
        (0..count)
            .step_by(self.chunk_size)
            .enumerate()
            .map(|(index, start)| Chunk {
                index,
                respondents: start..(start + self.chunk_size).min(count),
            })
            .collect()
    }

    /// Random stream for one chunk.
    pub fn chunk_rng(seed: u64, chunk: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(chunk as u64);
        rng
    }

    /// Build every record of one chunk on the current thread.
    pub fn generate_chunk(builder: &RecordBuilder, seed: u64, chunk: &Chunk) -> Vec<RecordOutcome> {
        let mut rng = Self::chunk_rng(seed, chunk.index);
        chunk
            .respondents
            .clone()
            .map(|respondent| (respondent, builder.build(respondent, &mut rng)))
            .collect()
    }

    /// Generate a batch of chunks in parallel.
    ///
    /// Outcomes come back in chunk order, then respondent order.
    pub async fn generate_batch(&self, seed: u64, chunks: Vec<Chunk>) -> Result<Vec<RecordOutcome>> {
        let mut handles = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let permit = Arc::clone(&self.semaphore)
                .acquire_owned()
                .await
                .map_err(|_| SynthError::Internal("Semaphore closed".to_string()))?;
            let builder = Arc::clone(&self.builder);

            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let outcomes = Self::generate_chunk(&builder, seed, &chunk);
                debug!(chunk = chunk.index, records = outcomes.len(), "Chunk generated");
                outcomes
            }));
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            let chunk_outcomes = handle
                .await
                .map_err(|e| SynthError::Internal(format!("Worker task failed: {e}")))?;
            outcomes.extend(chunk_outcomes);
        }

        Ok(outcomes)
    }
}
