//! Validated survey definition.
//!
//! Everything here is constructed once from configuration and shared
//! read-only afterwards. Weights are normalized at construction so the
//! sampler never re-normalizes per draw.

use super::{Answer, ConfigError, SamplerError};
use std::collections::{HashMap, HashSet};

/// Cardinality of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Exactly one label per record
    Single,
    /// Between 1 and `max_picks` distinct labels per record
    Multi { max_picks: usize },
}

impl Mode {
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi { .. })
    }
}

/// Option labels with their normalized probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct Choices {
    options: Vec<String>,
    probabilities: Vec<f64>,
    positive: usize,
}

impl Choices {
    /// Validate and normalize a labelled weight vector.
    ///
    /// Weights are relative: `[68, 25, 5, 2]` and `[0.68, 0.25, 0.05, 0.02]`
    /// describe the same distribution.
    pub fn new(question: &str, options: Vec<String>, weights: &[f64]) -> Result<Self, SamplerError> {
        if options.is_empty() {
            return Err(SamplerError::invalid(question, "no options"));
        }
        if options.len() != weights.len() {
            return Err(SamplerError::invalid(
                question,
                format!(
                    "{} options but {} weights",
                    options.len(),
                    weights.len()
                ),
            ));
        }

        let mut seen = HashSet::with_capacity(options.len());
        for label in &options {
            if label.is_empty() {
                return Err(SamplerError::invalid(question, "empty option label"));
            }
            if !seen.insert(label.as_str()) {
                return Err(SamplerError::invalid(
                    question,
                    format!("duplicate option '{label}'"),
                ));
            }
        }

        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(SamplerError::invalid(
                question,
                format!("weight {bad} is negative or not finite"),
            ));
        }

        let largest = weights.iter().copied().fold(0.0, f64::max);
        if largest <= 0.0 {
            return Err(SamplerError::invalid(question, "all weights are zero"));
        }

        // The raw sum can overflow for huge finite weights; scaling by the
        // largest weight first bounds it by the option count.
        let total: f64 = weights.iter().sum();
        let probabilities: Vec<f64> = if total.is_finite() {
            weights.iter().map(|w| w / total).collect()
        } else {
            let scaled: Vec<f64> = weights.iter().map(|w| w / largest).collect();
            let total: f64 = scaled.iter().sum();
            scaled.iter().map(|w| w / total).collect()
        };

        if let Some(i) = (0..weights.len()).find(|&i| weights[i] > 0.0 && !probabilities[i].is_normal()) {
            return Err(SamplerError::invalid(
                question,
                format!("weight {} is too small relative to the others", weights[i]),
            ));
        }

        Ok(Self {
            positive: probabilities.iter().filter(|p| **p > 0.0).count(),
            probabilities,
            options,
        })
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Normalized probabilities, parallel to `options()`, summing to 1.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Number of options with a strictly positive weight.
    pub fn positive_count(&self) -> usize {
        self.positive
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Configured probability of `label`, if it is one of the options.
    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.options
            .iter()
            .position(|o| o == label)
            .map(|i| self.probabilities[i])
    }
}

/// Override distribution used when another question's answer matches.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalRule {
    when: String,
    equals: String,
    choices: Choices,
}

impl ConditionalRule {
    pub fn new(when: impl Into<String>, equals: impl Into<String>, choices: Choices) -> Self {
        Self {
            when: when.into(),
            equals: equals.into(),
            choices,
        }
    }

    /// Question whose answer triggers this rule.
    pub fn when(&self) -> &str {
        &self.when
    }

    /// Label that must have been drawn for `when`.
    pub fn equals(&self) -> &str {
        &self.equals
    }

    pub fn choices(&self) -> &Choices {
        &self.choices
    }

    /// A multi answer matches when it contains the label.
    pub fn matches(&self, context: &HashMap<String, Answer>) -> bool {
        context
            .get(&self.when)
            .is_some_and(|answer| answer.contains(&self.equals))
    }
}

/// A validated question.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    id: String,
    choices: Choices,
    mode: Mode,
    rules: Vec<ConditionalRule>,
}

impl Question {
    /// Build a question, validating and normalizing its weights.
    pub fn new(
        id: impl Into<String>,
        options: Vec<String>,
        weights: &[f64],
        mode: Mode,
    ) -> Result<Self, SamplerError> {
        let id = id.into();
        if let Mode::Multi { max_picks: 0 } = mode {
            return Err(SamplerError::invalid(&id, "max_picks must be at least 1"));
        }
        let choices = Choices::new(&id, options, weights)?;
        Ok(Self {
            id,
            choices,
            mode,
            rules: Vec::new(),
        })
    }

    /// Single-choice question from borrowed labels.
    pub fn single(id: &str, options: &[&str], weights: &[f64]) -> Result<Self, SamplerError> {
        Self::new(id, to_labels(options), weights, Mode::Single)
    }

    /// Multi-choice question from borrowed labels.
    pub fn multi(
        id: &str,
        options: &[&str],
        weights: &[f64],
        max_picks: usize,
    ) -> Result<Self, SamplerError> {
        Self::new(id, to_labels(options), weights, Mode::Multi { max_picks })
    }

    /// Attach a conditional rule. Rules are tried in the order they are added.
    pub fn with_rule(mut self, rule: ConditionalRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn choices(&self) -> &Choices {
        &self.choices
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rules(&self) -> &[ConditionalRule] {
        &self.rules
    }

    /// First rule matching the answers drawn so far.
    pub fn rule_for(&self, context: &HashMap<String, Answer>) -> Option<&ConditionalRule> {
        self.rules.iter().find(|rule| rule.matches(context))
    }

    /// Whether `label` can ever be drawn, under the base set or any override.
    pub fn can_answer(&self, label: &str) -> bool {
        std::iter::once(&self.choices)
            .chain(self.rules.iter().map(ConditionalRule::choices))
            .any(|c| c.probability_of(label).is_some_and(|p| p > 0.0))
    }
}

fn to_labels(options: &[&str]) -> Vec<String> {
    options.iter().map(|s| s.to_string()).collect()
}

/// Ordered, validated set of questions.
#[derive(Debug, Clone)]
pub struct Survey {
    questions: Vec<Question>,
    draw_order: Vec<usize>,
}

impl Survey {
    /// Validate question ids and rule references, then compute a draw order
    /// in which every trigger question precedes the questions it conditions.
    ///
    /// Among questions whose triggers are satisfied, declared order wins, so a
    /// survey without rules is drawn exactly in declared order.
    pub fn new(questions: Vec<Question>) -> Result<Self, ConfigError> {
        if questions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "questions".to_string(),
                reason: "survey has no questions".to_string(),
            });
        }

        let mut index = HashMap::with_capacity(questions.len());
        for (i, q) in questions.iter().enumerate() {
            if index.insert(q.id().to_string(), i).is_some() {
                return Err(ConfigError::DuplicateQuestion(q.id().to_string()));
            }
        }

        // deps[i] = indices that must be drawn before question i
        let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); questions.len()];
        for (i, q) in questions.iter().enumerate() {
            for rule in q.rules() {
                if rule.when() == q.id() {
                    return Err(ConfigError::SelfTrigger(q.id().to_string()));
                }
                let trigger = *index.get(rule.when()).ok_or_else(|| ConfigError::UnknownTrigger {
                    question: q.id().to_string(),
                    trigger: rule.when().to_string(),
                })?;
                if !questions[trigger].can_answer(rule.equals()) {
                    return Err(ConfigError::UnknownTriggerValue {
                        question: q.id().to_string(),
                        trigger: rule.when().to_string(),
                        value: rule.equals().to_string(),
                    });
                }
                deps[i].insert(trigger);
            }
        }

        let mut draw_order = Vec::with_capacity(questions.len());
        let mut placed = vec![false; questions.len()];
        while draw_order.len() < questions.len() {
            let next = (0..questions.len())
                .find(|&i| !placed[i] && deps[i].iter().all(|&d| placed[d]));
            match next {
                Some(i) => {
                    placed[i] = true;
                    draw_order.push(i);
                }
                None => {
                    let stuck = (0..questions.len())
                        .filter(|&i| !placed[i])
                        .map(|i| questions[i].id().to_string())
                        .collect();
                    return Err(ConfigError::DependencyCycle(stuck));
                }
            }
        }

        Ok(Self {
            questions,
            draw_order,
        })
    }

    /// Questions in declared order (the column order of exported tables).
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Questions in dependency-respecting draw order.
    pub fn draw_order(&self) -> impl Iterator<Item = &Question> {
        self.draw_order.iter().map(|&i| &self.questions[i])
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question ids in declared order.
    pub fn column_names(&self) -> Vec<&str> {
        self.questions.iter().map(Question::id).collect()
    }
}
