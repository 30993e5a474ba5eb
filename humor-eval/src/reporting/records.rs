//! Per-entry records, per-task summaries and the results document

use serde::{Deserialize, Serialize};

use crate::dataset::{Choice, DatasetEntry, TaskKind};
use crate::interpreter::{ExtractedAnswer, Interpretation};
use crate::providers::AnswerMode;

/// Outcome of one entry under one answer mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub contest_number: u32,
    pub problem: String,
    pub correct_answer: Choice,
    /// Raw model output
    pub model_answer: String,
    pub reasoning: String,
    pub extracted_answer: ExtractedAnswer,
    pub task: TaskKind,
    pub is_correct: bool,
    /// Inference failure, when the model never produced a response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationRecord {
    /// Keys every serialized record must carry
    pub const FIELDS: [&'static str; 8] = [
        "contest_number",
        "problem",
        "correct_answer",
        "model_answer",
        "reasoning",
        "extracted_answer",
        "task",
        "is_correct",
    ];

    pub fn new(entry: &DatasetEntry, response: impl Into<String>, interpretation: Interpretation) -> Self {
        Self {
            contest_number: entry.contest_number,
            problem: entry.problem.clone(),
            correct_answer: entry.answer,
            model_answer: response.into(),
            reasoning: interpretation.reasoning,
            extracted_answer: interpretation.answer,
            task: entry.task,
            is_correct: interpretation.answer.matches(entry.answer),
            error: None,
        }
    }

    /// Record for an entry whose inference failed; always incorrect
    pub fn failed(entry: &DatasetEntry, error: impl Into<String>) -> Self {
        Self {
            contest_number: entry.contest_number,
            problem: entry.problem.clone(),
            correct_answer: entry.answer,
            model_answer: String::new(),
            reasoning: String::new(),
            extracted_answer: ExtractedAnswer::Unknown,
            task: entry.task,
            is_correct: false,
            error: Some(error.into()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.extracted_answer.is_unknown()
    }
}

/// Accuracy summary for one task group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub total_entries: usize,
    pub correct_answers: usize,
    pub accuracy: f64,
    pub answer_mode: AnswerMode,
    pub task: TaskKind,
    pub split: String,
}

impl TaskSummary {
    pub fn from_records(records: &[EvaluationRecord], task: TaskKind, mode: AnswerMode, split: &str) -> Self {
        let total_entries = records.len();
        let correct_answers = records.iter().filter(|r| r.is_correct).count();
        let accuracy = if total_entries > 0 {
            correct_answers as f64 / total_entries as f64
        } else {
            0.0
        };

        Self {
            total_entries,
            correct_answers,
            accuracy,
            answer_mode: mode,
            task,
            split: split.to_string(),
        }
    }
}

/// Summary plus the records it summarizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub summary: TaskSummary,
    pub results: Vec<EvaluationRecord>,
}

/// Run metadata written alongside the results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub split: String,
    pub max_new_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_mode: Option<AnswerMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

impl RunMeta {
    pub fn new(split: impl Into<String>, max_new_tokens: u32) -> Self {
        Self {
            split: split.into(),
            max_new_tokens,
            answer_mode: None,
            provider: None,
            model: None,
            generated_at: None,
        }
    }
}

/// Records of one answer mode over one split, grouped by task kind
#[derive(Debug, Clone, PartialEq)]
pub struct ModeReport {
    pub mode: AnswerMode,
    pub split: String,
    pub ranking: TaskGroup,
    pub matching: TaskGroup,
}

impl ModeReport {
    /// Group records by task, keeping their relative order
    pub fn from_records(records: Vec<EvaluationRecord>, mode: AnswerMode, split: &str) -> Self {
        let (ranking, matching): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| r.task == TaskKind::Ranking);

        Self {
            mode,
            split: split.to_string(),
            ranking: TaskGroup {
                summary: TaskSummary::from_records(&ranking, TaskKind::Ranking, mode, split),
                results: ranking,
            },
            matching: TaskGroup {
                summary: TaskSummary::from_records(&matching, TaskKind::Matching, mode, split),
                results: matching,
            },
        }
    }

    pub fn group(&self, task: TaskKind) -> &TaskGroup {
        match task {
            TaskKind::Ranking => &self.ranking,
            TaskKind::Matching => &self.matching,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.ranking.results.iter().chain(self.matching.results.iter())
    }
}

/// The JSON document written for one mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub meta: RunMeta,
    pub ranking: TaskGroup,
    pub matching: TaskGroup,
}

impl ResultsDocument {
    pub fn new(meta: RunMeta, report: ModeReport) -> Self {
        Self {
            meta,
            ranking: report.ranking,
            matching: report.matching,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.ranking.results.iter().chain(self.matching.results.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ImagePayload;
    use crate::interpreter::interpret;

    fn entry(contest: u32, task: TaskKind, answer: Choice) -> DatasetEntry {
        DatasetEntry {
            image: ImagePayload::new(Vec::new(), "image/png"),
            contest_number: contest,
            problem: format!("Contest {}", contest),
            answer,
            task,
        }
    }

    #[test]
    fn test_record_correctness() {
        let e = entry(7, TaskKind::Ranking, Choice::C);
        let hit = EvaluationRecord::new(&e, "<answer>C</answer>", interpret("<answer>C</answer>"));
        let miss = EvaluationRecord::new(&e, "A", interpret("A"));
        let unknown = EvaluationRecord::new(&e, "no idea", interpret("no idea"));

        assert!(hit.is_correct);
        assert!(!miss.is_correct);
        assert!(!unknown.is_correct);
        assert!(unknown.is_unknown());
    }

    #[test]
    fn test_failed_record() {
        let record = EvaluationRecord::failed(&entry(1, TaskKind::Matching, Choice::A), "timeout");
        assert!(!record.is_correct);
        assert_eq!(record.extracted_answer, ExtractedAnswer::Unknown);
        assert_eq!(record.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_error_field_omitted_when_absent() {
        let e = entry(3, TaskKind::Ranking, Choice::B);
        let json = serde_json::to_value(EvaluationRecord::new(&e, "B", interpret("B"))).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["extracted_answer"], "B");
        assert_eq!(json["task"], "ranking");
        for key in EvaluationRecord::FIELDS {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }

    #[test]
    fn test_mode_report_grouping() {
        let records = vec![
            EvaluationRecord::new(&entry(1, TaskKind::Ranking, Choice::A), "A", interpret("A")),
            EvaluationRecord::new(&entry(2, TaskKind::Matching, Choice::B), "C", interpret("C")),
            EvaluationRecord::new(&entry(3, TaskKind::Ranking, Choice::D), "E", interpret("E")),
        ];
        let report = ModeReport::from_records(records, AnswerMode::Simple, "test");

        assert_eq!(report.ranking.summary.total_entries, 2);
        assert_eq!(report.ranking.summary.correct_answers, 1);
        assert_eq!(report.ranking.summary.accuracy, 0.5);
        assert_eq!(report.matching.summary.total_entries, 1);
        assert_eq!(report.matching.summary.accuracy, 0.0);
        let order: Vec<u32> = report.records().map(|r| r.contest_number).collect();
        assert_eq!(order, vec![1, 3, 2]);
    }

    #[test]
    fn test_empty_group_accuracy() {
        let summary = TaskSummary::from_records(&[], TaskKind::Matching, AnswerMode::Reasoned, "test");
        assert_eq!(summary.total_entries, 0);
        assert_eq!(summary.accuracy, 0.0);
    }
}
