//! Core data models for survey-synth.
//!
//! - `config`: TOML configuration and its validation into a survey
//! - `survey`: validated questions, conditional rules, draw order
//! - `record`: answers, records, datasets, run statistics
//! - `error`: error taxonomy

mod config;
mod error;
mod record;
mod survey;

pub use config::*;
pub use error::*;
pub use record::*;
pub use survey::*;
