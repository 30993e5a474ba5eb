//! JSON results files: writing run documents and reading them back

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::records::{EvaluationRecord, ResultsDocument};
use crate::providers::AnswerMode;

/// Errors reading a results file
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in file '{}'.", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing expected key in results file: '{0}'")]
    MissingField(String),

    #[error("Malformed record {index}: {message}")]
    Parse { index: usize, message: String },
}

/// Writes results documents as pretty JSON
pub struct JsonWriter;

impl JsonWriter {
    /// `results_<mode>_<split>_<YYYYmmdd_HHMMSS>.json`
    pub fn file_name(mode: AnswerMode, split: &str, at: DateTime<Utc>) -> String {
        format!("results_{}_{}_{}.json", mode, split, at.format("%Y%m%d_%H%M%S"))
    }

    /// Write a document into `dir`, returning the path written
    pub fn write_document(
        dir: impl AsRef<Path>,
        document: &ResultsDocument,
        mode: AnswerMode,
        at: DateTime<Utc>,
    ) -> std::io::Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let path = dir.join(Self::file_name(mode, &document.meta.split, at));
        Self::write_to_file(&path, document)?;
        Ok(path)
    }

    pub fn write_to_file(path: impl AsRef<Path>, document: &ResultsDocument) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

/// Load every record from a results file.
///
/// Accepts the grouped document this crate writes as well as a flat
/// `{"results": [...]}` document.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<EvaluationRecord>, ReportError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|source| ReportError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;

    records_from_value(&value)
}

/// Extract records from an already parsed document
pub fn records_from_value(value: &Value) -> Result<Vec<EvaluationRecord>, ReportError> {
    let raw: Vec<&Value> = if let Some(results) = value.get("results") {
        as_array(results, "results")?.iter().collect()
    } else if value.get("ranking").is_some() || value.get("matching").is_some() {
        let mut all = Vec::new();
        for group in ["ranking", "matching"] {
            let results = value
                .get(group)
                .and_then(|g| g.get("results"))
                .ok_or_else(|| ReportError::MissingField(format!("{}.results", group)))?;
            all.extend(as_array(results, group)?.iter());
        }
        all
    } else {
        return Err(ReportError::MissingField("results".to_string()));
    };

    raw.into_iter()
        .enumerate()
        .map(|(index, item)| parse_record(index, item))
        .collect()
}

fn as_array<'a>(value: &'a Value, key: &str) -> Result<&'a Vec<Value>, ReportError> {
    value.as_array().ok_or_else(|| ReportError::Parse {
        index: 0,
        message: format!("'{}' is not an array", key),
    })
}

fn parse_record(index: usize, item: &Value) -> Result<EvaluationRecord, ReportError> {
    if let Some(missing) = EvaluationRecord::FIELDS
        .iter()
        .find(|key| item.get(**key).is_none())
    {
        return Err(ReportError::MissingField(missing.to_string()));
    }

    serde_json::from_value(item.clone()).map_err(|e| ReportError::Parse {
        index,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(contest: u32, task: &str, extracted: &str, correct: bool) -> Value {
        json!({
            "contest_number": contest,
            "problem": "Which caption?",
            "correct_answer": "A",
            "model_answer": extracted,
            "reasoning": "",
            "extracted_answer": extracted,
            "task": task,
            "is_correct": correct,
        })
    }

    #[test]
    fn test_file_name() {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            JsonWriter::file_name(AnswerMode::Reasoned, "test_hard", at),
            "results_reasoned_test_hard_20250309_140507.json"
        );
    }

    #[test]
    fn test_flat_document() {
        let doc = json!({ "results": [record(1, "ranking", "A", true), record(2, "matching", "Unknown", false)] });
        let records = records_from_value(&doc).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].is_unknown());
    }

    #[test]
    fn test_grouped_document_order() {
        let doc = json!({
            "meta": { "split": "test", "max_new_tokens": 512 },
            "ranking": { "summary": {}, "results": [record(4, "ranking", "A", true)] },
            "matching": { "summary": {}, "results": [record(5, "matching", "B", false)] },
        });
        let contests: Vec<u32> = records_from_value(&doc)
            .unwrap()
            .iter()
            .map(|r| r.contest_number)
            .collect();
        assert_eq!(contests, vec![4, 5]);
    }

    #[test]
    fn test_missing_results_key() {
        let err = records_from_value(&json!({ "meta": {} })).unwrap_err();
        assert_eq!(err.to_string(), "Missing expected key in results file: 'results'");
    }

    #[test]
    fn test_missing_record_key() {
        let mut item = record(1, "ranking", "A", true);
        item.as_object_mut().unwrap().remove("task");
        let err = records_from_value(&json!({ "results": [item] })).unwrap_err();
        assert!(matches!(err, ReportError::MissingField(ref key) if key == "task"));
    }

    #[test]
    fn test_bad_task_value() {
        let doc = json!({ "results": [record(1, "captioning", "A", true)] });
        assert!(matches!(records_from_value(&doc), Err(ReportError::Parse { index: 0, .. })));
    }
}
