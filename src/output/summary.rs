//! Preview and frequency summary of a generated dataset.

use crate::models::{Dataset, Mode, Survey};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Observed frequency of one option.
#[derive(Debug, Clone, Serialize)]
pub struct OptionFrequency {
    pub label: String,

    /// Records whose answer contains the label
    pub count: usize,

    /// `count` over the number of records
    pub observed: f64,

    /// Normalized base weight; `None` for labels only reachable via overrides.
    /// A share of records for single-choice questions, but only a relative
    /// weight for multi-choice ones, where `observed` sums to the mean picks.
    pub configured: Option<f64>,
}

/// Frequencies for one question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSummary {
    pub id: String,
    pub multi: bool,
    pub options: Vec<OptionFrequency>,

    /// Average labels per record (1.0 for single-choice questions)
    pub mean_picks: f64,
}

/// Observed vs configured shares for every question.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencySummary {
    pub records: usize,
    pub questions: Vec<QuestionSummary>,
}

impl FrequencySummary {
    pub fn from_dataset(dataset: &Dataset, survey: &Survey) -> Self {
        let records = dataset.len();
        let share = |count: usize| {
            if records == 0 {
                0.0
            } else {
                count as f64 / records as f64
            }
        };

        let questions = survey
            .questions()
            .iter()
            .map(|question| {
                let mut counts: HashMap<&str, usize> = HashMap::new();
                let mut extra: Vec<&str> = Vec::new();
                let mut picks = 0usize;

                for record in dataset {
                    let Some(answer) = record.get(question.id()) else {
                        continue;
                    };
                    picks += answer.len();
                    for label in answer.labels() {
                        let seen = counts.entry(label).or_default();
                        if *seen == 0 && question.choices().probability_of(label).is_none() {
                            extra.push(label);
                        }
                        *seen += 1;
                    }
                }

                let base = question.choices();
                let mut options: Vec<OptionFrequency> = base
                    .options()
                    .iter()
                    .zip(base.probabilities())
                    .map(|(label, p)| {
                        let count = counts.get(label.as_str()).copied().unwrap_or(0);
                        OptionFrequency {
                            label: label.clone(),
                            count,
                            observed: share(count),
                            configured: Some(*p),
                        }
                    })
                    .collect();
                options.extend(extra.into_iter().map(|label| {
                    let count = counts[label];
                    OptionFrequency {
                        label: label.to_string(),
                        count,
                        observed: share(count),
                        configured: None,
                    }
                }));

                QuestionSummary {
                    id: question.id().to_string(),
                    multi: matches!(question.mode(), Mode::Multi { .. }),
                    options,
                    mean_picks: share(picks),
                }
            })
            .collect();

        Self { records, questions }
    }

    /// Largest |observed - configured| across single-choice questions without
    /// conditional rules, where the two are directly comparable.
    pub fn max_deviation(&self, survey: &Survey) -> f64 {
        self.questions
            .iter()
            .filter(|q| !q.multi)
            .filter(|q| survey.get(&q.id).is_some_and(|s| s.rules().is_empty()))
            .flat_map(|q| &q.options)
            .filter_map(|o| o.configured.map(|c| (o.observed - c).abs()))
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for FrequencySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records: {}", self.records)?;
        for question in &self.questions {
            writeln!(f)?;
            if question.multi {
                writeln!(f, "{} (multi, {:.2} picks/record)", question.id, question.mean_picks)?;
            } else {
                writeln!(f, "{}", question.id)?;
            }
            let basis = if question.multi { "weight" } else { "configured" };
            for option in &question.options {
                let configured = option
                    .configured
                    .map(|c| format!("{:>6.1}%", c * 100.0))
                    .unwrap_or_else(|| "     -".to_string());
                writeln!(
                    f,
                    "  {:<16} {:>6}  {:>6.1}%  ({basis} {configured})",
                    option.label,
                    option.count,
                    option.observed * 100.0,
                )?;
            }
        }
        Ok(())
    }
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// First `rows` records rendered as a table, multi answers joined with `separator`.
pub fn preview(dataset: &Dataset, survey: &Survey, rows: usize, separator: &str) -> String {
    let headers = survey.column_names();
    let body: Vec<Vec<String>> = dataset
        .iter()
        .take(rows)
        .map(|record| {
            survey
                .questions()
                .iter()
                .map(|q| {
                    record
                        .get(q.id())
                        .map(|a| a.to_cell(separator))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            body.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = render_row(headers.iter().copied(), &widths);
    for row in &body {
        out.push('\n');
        out.push_str(&render_row(row.iter().map(String::as_str), &widths));
    }
    out
}
