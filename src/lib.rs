//! survey-synth - Synthetic survey response generation from weighted distributions.
//!
//! ## Architecture
//!
//! - **Survey**: validated questions with normalized option weights and
//!   conditional rules tying one question's distribution to an earlier answer
//! - **Sampler**: stateless weighted draws (single, multi without replacement,
//!   conditional)
//! - **Worker Pool**: builds records in fixed-size chunks, each chunk on its own
//!   seeded random stream, so a seed reproduces a dataset regardless of
//!   worker count
//!
//! ## Pipeline
//!
//! Config → Survey → Worker Pool → Dataset → CSV/JSONL, plus a preview and a
//! frequency summary comparing observed and configured shares.

pub mod models;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod sampler;

// Re-exports for convenience
pub use models::{
    Answer, Config, ConfigError, Dataset, PickPolicy, Question, Record, Result, RunStats,
    SamplerError, Survey, SynthError,
};
pub use output::{FrequencySummary, preview, write_dataset};
pub use pipeline::GenerationPipeline;
pub use pool::{RecordBuilder, WorkerPool};
pub use sampler::WeightedSampler;
