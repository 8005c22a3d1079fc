//! Dataset writers.
//!
//! CSV has one column per question, in declared order. JSONL has one object per
//! record with answers keyed by question id.

use crate::models::{Dataset, OutputConfig, OutputFormat, Result, Survey, SynthError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `dataset` to `path` in the configured (or inferred) format.
pub fn write_dataset(dataset: &Dataset, survey: &Survey, path: &Path, output: &OutputConfig) -> Result<()> {
    let format = output.format_for(path);
    let file = File::create(path).map_err(|e| SynthError::io("creating output file", e))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Csv => write_csv(&mut writer, dataset, survey, &output.multi_separator, output.bom)?,
        OutputFormat::Jsonl => write_jsonl(&mut writer, dataset, survey)?,
    }

    writer
        .flush()
        .map_err(|e| SynthError::io("flushing output", e))?;

    info!(records = dataset.len(), path = %path.display(), ?format, "Dataset written");
    Ok(())
}

/// Write CSV: a header of question ids, then one row per record.
pub fn write_csv<W: Write>(
    mut writer: W,
    dataset: &Dataset,
    survey: &Survey,
    multi_separator: &str,
    bom: bool,
) -> Result<()> {
    if bom {
        writer
            .write_all(UTF8_BOM)
            .map_err(|e| SynthError::io("writing byte order mark", e))?;
    }

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(survey.column_names())?;

    for record in dataset {
        let row = survey.questions().iter().map(|q| {
            record
                .get(q.id())
                .map(|answer| answer.to_cell(multi_separator))
                .unwrap_or_default()
        });
        csv.write_record(row)?;
    }

    csv.flush()
        .map_err(|e| SynthError::io("flushing CSV output", e))?;
    Ok(())
}

#[derive(Serialize)]
struct JsonRow<'a> {
    respondent: usize,
    answers: BTreeMap<&'a str, &'a crate::models::Answer>,
}

/// Write JSONL: one `{"respondent": n, "answers": {...}}` object per line.
///
/// Answers are keyed in sorted order so equal datasets produce equal files.
pub fn write_jsonl<W: Write>(mut writer: W, dataset: &Dataset, survey: &Survey) -> Result<()> {
    for record in dataset {
        let answers = survey
            .questions()
            .iter()
            .filter_map(|q| record.get(q.id()).map(|answer| (q.id(), answer)))
            .collect();
        let row = JsonRow {
            respondent: record.respondent,
            answers,
        };

        let json = serde_json::to_string(&row)?;
        writeln!(writer, "{json}").map_err(|e| SynthError::io("writing output", e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Answer, Question, Record};
    use tempfile::tempdir;

    fn fixture() -> (Survey, Dataset) {
        let survey = Survey::new(vec![
            Question::single("身份", &["母亲", "父亲"], &[1.0, 1.0]).unwrap(),
            Question::multi("能力培养", &["创造力", "规则意识", "其他"], &[1.0, 1.0, 1.0], 3).unwrap(),
        ])
        .unwrap();

        let mut first = Record::new(0);
        first.insert("身份", Answer::Single("母亲".to_string()));
        first.insert(
            "能力培养",
            Answer::Multi(vec!["创造力".to_string(), "规则意识".to_string()]),
        );
        let mut second = Record::new(1);
        second.insert("身份", Answer::Single("父亲".to_string()));
        second.insert("能力培养", Answer::Multi(vec!["其他".to_string()]));

        (survey, Dataset::new(vec![first, second]))
    }

    #[test]
    fn test_csv_layout_with_bom() {
        let (survey, dataset) = fixture();
        let mut buf = Vec::new();
        write_csv(&mut buf, &dataset, &survey, "|", true).unwrap();

        assert!(buf.starts_with(UTF8_BOM));
        let text = String::from_utf8(buf[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["身份,能力培养", "母亲,创造力|规则意识", "父亲,其他"]);
    }

    #[test]
    fn test_csv_without_bom_and_custom_separator() {
        let (survey, dataset) = fixture();
        let mut buf = Vec::new();
        write_csv(&mut buf, &dataset, &survey, ";", false).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("身份"));
        assert!(text.contains("创造力;规则意识"));
    }

    #[test]
    fn test_jsonl_rows() {
        let (survey, dataset) = fixture();
        let mut buf = Vec::new();
        write_jsonl(&mut buf, &dataset, &survey).unwrap();

        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["respondent"], 0);
        assert_eq!(rows[0]["answers"]["身份"], "母亲");
        assert_eq!(rows[0]["answers"]["能力培养"], serde_json::json!(["创造力", "规则意识"]));
        assert_eq!(rows[1]["answers"]["能力培养"], serde_json::json!(["其他"]));
    }

    #[test]
    fn test_write_dataset_picks_format_from_extension() {
        let (survey, dataset) = fixture();
        let dir = tempdir().unwrap();
        let output = OutputConfig::default();

        let csv_path = dir.path().join("问卷数据.csv");
        write_dataset(&dataset, &survey, &csv_path, &output).unwrap();
        let csv_bytes = std::fs::read(&csv_path).unwrap();
        assert!(csv_bytes.starts_with(UTF8_BOM));

        let jsonl_path = dir.path().join("data.jsonl");
        write_dataset(&dataset, &survey, &jsonl_path, &output).unwrap();
        let jsonl = std::fs::read_to_string(&jsonl_path).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.starts_with('{'));
    }
}
