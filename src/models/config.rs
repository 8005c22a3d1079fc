//! Configuration models for survey-synth.
//!
//! The survey definition and every run parameter come from one TOML file.
//! `Config::survey` turns the raw question specs into a validated `Survey`.

use super::{ConditionalRule, Choices, Mode, Question, SamplerError, Survey};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for survey-synth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Generation settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Questions in column order
    pub questions: Vec<QuestionSpec>,
}

/// Generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of records (respondents) to generate
    #[serde(default = "default_count")]
    pub count: usize,

    /// Seed for reproducible runs; a fresh one is drawn when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// How many picks a multi-choice question makes per record
    #[serde(default)]
    pub pick_policy: PickPolicy,

    /// Maximum chunks generated concurrently
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Records per chunk; each chunk owns one random stream
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// What to do when a single record fails
    #[serde(default)]
    pub on_record_error: FailurePolicy,
}

fn default_count() -> usize {
    312
}

fn default_workers() -> usize {
    4
}

fn default_chunk_size() -> usize {
    64
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            seed: None,
            pick_policy: PickPolicy::default(),
            workers: default_workers(),
            chunk_size: default_chunk_size(),
            on_record_error: FailurePolicy::default(),
        }
    }
}

/// Number of picks a multi-choice question makes per record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PickPolicy {
    /// Uniform in `[1, max_picks]`, drawn per record (default)
    #[default]
    Uniform,
    /// Always `max_picks`
    Fixed,
}

/// Record-level failure handling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run at the first failed record (default)
    #[default]
    Abort,
    /// Log the failure, drop the record, keep going
    Skip,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file path
    #[serde(default = "default_output_path")]
    pub path: PathBuf,

    /// Output format; inferred from the path extension when absent
    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Prefix CSV output with a UTF-8 byte order mark
    #[serde(default = "default_true")]
    pub bom: bool,

    /// Separator joining multi-choice labels in one CSV cell
    #[serde(default = "default_multi_separator")]
    pub multi_separator: String,

    /// Records shown in the preview after generation (0 disables)
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Print observed vs configured frequencies after generation
    #[serde(default = "default_true")]
    pub summary: bool,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("问卷数据.csv")
}

fn default_true() -> bool {
    true
}

fn default_multi_separator() -> String {
    "|".to_string()
}

fn default_preview_rows() -> usize {
    5
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: None,
            bom: true,
            multi_separator: default_multi_separator(),
            preview_rows: default_preview_rows(),
            summary: true,
        }
    }
}

impl OutputConfig {
    /// Format to write `path` in: explicit setting, else by extension, else CSV.
    pub fn format_for(&self, path: &Path) -> OutputFormat {
        self.format
            .or_else(|| OutputFormat::from_extension(path))
            .unwrap_or(OutputFormat::Csv)
    }
}

/// Tabular output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values, one column per question
    Csv,
    /// One JSON object per record
    Jsonl,
}

impl OutputFormat {
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "ndjson" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

/// Cardinality as written in the config file.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModeSpec {
    #[default]
    Single,
    Multi,
}

/// Raw question definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionSpec {
    /// Question identifier, also the column header
    pub id: String,

    /// Single or multi choice
    #[serde(default)]
    pub mode: ModeSpec,

    /// Upper bound on picks for multi questions; defaults to the option count
    #[serde(default)]
    pub max_picks: Option<usize>,

    /// Option labels
    pub options: Vec<String>,

    /// Relative weights, parallel to `options`
    pub weights: Vec<f64>,

    /// Conditional overrides, tried in order
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

/// Raw conditional rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Question whose answer triggers the override
    pub when: String,

    /// Answer label that triggers the override
    pub equals: String,

    /// Override labels; defaults to the base question's options
    #[serde(default)]
    pub options: Option<Vec<String>>,

    /// Override weights
    pub weights: Vec<f64>,
}

impl QuestionSpec {
    /// Validate into a `Question`.
    pub fn build(&self) -> Result<Question, ConfigError> {
        let mode = match (self.mode, self.max_picks) {
            (ModeSpec::Single, None) => Mode::Single,
            (ModeSpec::Single, Some(_)) => {
                return Err(ConfigError::InvalidValue {
                    field: format!("questions.{}.max_picks", self.id),
                    reason: "only multi questions take max_picks".to_string(),
                });
            }
            (ModeSpec::Multi, max_picks) => Mode::Multi {
                max_picks: max_picks.unwrap_or(self.options.len()),
            },
        };

        let mut question = Question::new(self.id.clone(), self.options.clone(), &self.weights, mode)?;
        for rule in &self.rules {
            let options = rule.options.clone().unwrap_or_else(|| self.options.clone());
            let choices = Choices::new(&self.id, options, &rule.weights)?;
            question = question.with_rule(ConditionalRule::new(&rule.when, &rule.equals, choices));
        }
        Ok(question)
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_owned(),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }

    /// The built-in example: the parental education attitudes survey.
    pub fn example() -> Result<Self, ConfigError> {
        Self::parse(EXAMPLE_CONFIG)
    }

    /// Check run parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("generation.count", self.generation.count),
            ("generation.workers", self.generation.workers),
            ("generation.chunk_size", self.generation.chunk_size),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.output.multi_separator.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output.multi_separator".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Build the validated survey.
    pub fn survey(&self) -> Result<Survey, ConfigError> {
        let questions = self
            .questions
            .iter()
            .map(QuestionSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        Survey::new(questions)
    }
}

/// Example configuration printed by `survey-synth example`.
pub const EXAMPLE_CONFIG: &str = r#"# survey-synth configuration file

[generation]
count = 312
# seed = 42
pick_policy = "uniform"   # "uniform": 1..=max_picks per record, "fixed": always max_picks
workers = 4
chunk_size = 64
on_record_error = "abort" # or "skip"

[output]
path = "问卷数据.csv"
bom = true
multi_separator = "|"
preview_rows = 5
summary = true

# Basic information

[[questions]]
id = "Q1_身份"
options = ["母亲", "父亲", "祖父母", "其他亲属"]
weights = [68, 25, 5, 2]

[[questions]]
id = "Q2_年龄"
options = ["25岁及以下", "26-30岁", "31-35岁", "36-40岁", "41岁及以上"]
weights = [3, 7, 40, 30, 20]

[[questions.rules]]
when = "Q1_身份"
equals = "母亲"
weights = [0.02, 0.12, 0.45, 0.35, 0.06]

[[questions]]
id = "Q3_学历"
options = ["初中及以下", "高中/中专", "大专", "本科", "硕士及以上"]
weights = [5, 20, 25, 45, 5]

# Education attitudes

[[questions]]
id = "Q4_能力培养"
mode = "multi"
max_picks = 3
options = ["创造力", "规则意识", "情绪管理", "知识学习", "运动能力", "艺术兴趣", "其他"]
weights = [52, 48, 45, 35, 28, 15, 4]

[[questions]]
id = "Q5_教育方法"
options = ["耐心讲道理", "共同讨论", "批评责备", "冷处理"]
weights = [65, 58, 12, 8]
"#;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Distribution(#[from] SamplerError),

    #[error("Duplicate question id: '{0}'")]
    DuplicateQuestion(String),

    #[error("Question '{question}' has a rule on unknown question '{trigger}'")]
    UnknownTrigger { question: String, trigger: String },

    #[error("Question '{question}' has a rule on '{trigger}' = '{value}', which '{trigger}' can never answer")]
    UnknownTriggerValue {
        question: String,
        trigger: String,
        value: String,
    },

    #[error("Question '{0}' has a rule triggered by its own answer")]
    SelfTrigger(String),

    #[error("Conditional rules form a cycle between: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}
