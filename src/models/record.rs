//! Record and dataset types.
//!
//! These types carry generated answers from the worker pool to the writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Answer drawn for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Single-choice label
    Single(String),
    /// Distinct multi-choice labels, in draw order
    Multi(Vec<String>),
}

impl Answer {
    /// Whether `label` was drawn.
    pub fn contains(&self, label: &str) -> bool {
        match self {
            Self::Single(value) => value == label,
            Self::Multi(values) => values.iter().any(|v| v == label),
        }
    }

    /// Drawn labels as a slice-like iterator.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Multi(values) => values,
        };
        values.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multi(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render as a single table cell, joining multi labels with `separator`.
    pub fn to_cell(&self, separator: &str) -> String {
        match self {
            Self::Single(value) => value.clone(),
            Self::Multi(values) => values.join(separator),
        }
    }
}

/// One simulated respondent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Zero-based respondent index within the run
    pub respondent: usize,

    /// Answers keyed by question id
    pub answers: HashMap<String, Answer>,
}

impl Record {
    pub fn new(respondent: usize) -> Self {
        Self {
            respondent,
            answers: HashMap::new(),
        }
    }

    pub fn get(&self, question: &str) -> Option<&Answer> {
        self.answers.get(question)
    }

    pub fn insert(&mut self, question: impl Into<String>, answer: Answer) {
        self.answers.insert(question.into(), answer);
    }
}

/// All records of one run, in respondent order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Statistics for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Unique identifier for this run
    pub run_id: String,

    /// Seed every chunk stream was derived from
    pub seed: u64,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Records requested
    pub requested: usize,

    /// Records generated and kept
    pub generated: usize,

    /// Records dropped under the skip policy
    pub skipped: usize,

    /// Total runtime in seconds
    pub runtime_secs: f64,

    /// Records per second
    pub throughput_per_sec: f64,
}

impl RunStats {
    pub fn new(seed: u64, requested: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            seed,
            started_at: Utc::now(),
            requested,
            generated: 0,
            skipped: 0,
            runtime_secs: 0.0,
            throughput_per_sec: 0.0,
        }
    }

    /// Calculate derived stats.
    pub fn finalize(&mut self) {
        if self.runtime_secs > 0.0 {
            self.throughput_per_sec = self.generated as f64 / self.runtime_secs;
        }
    }
}
