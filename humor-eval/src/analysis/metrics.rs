//! Unknown-aware accuracy metrics

use serde::{Deserialize, Serialize};

use crate::dataset::TaskKind;
use crate::reporting::EvaluationRecord;

/// Counters for one task group, or all of them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total: usize,
    pub correct: usize,
    pub unknown: usize,
    pub total_excluding_unknown: usize,
    pub correct_excluding_unknown: usize,
}

impl AccuracyStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a EvaluationRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut stats, record| {
            stats.add(record);
            stats
        })
    }

    pub fn add(&mut self, record: &EvaluationRecord) {
        self.total += 1;
        if record.is_unknown() {
            self.unknown += 1;
        } else {
            self.total_excluding_unknown += 1;
            if record.is_correct {
                self.correct_excluding_unknown += 1;
            }
        }
        if record.is_correct {
            self.correct += 1;
        }
    }

    /// Unknown answers count as wrong
    pub fn accuracy_with_unknown(&self) -> f64 {
        safe_divide(self.correct, self.total)
    }

    /// Unknown answers are dropped from both sides
    pub fn accuracy_excluding_unknown(&self) -> f64 {
        safe_divide(self.correct_excluding_unknown, self.total_excluding_unknown)
    }

    pub fn unknown_rate(&self) -> f64 {
        safe_divide(self.unknown, self.total)
    }

    fn merge(&self, other: &Self) -> Self {
        Self {
            total: self.total + other.total,
            correct: self.correct + other.correct,
            unknown: self.unknown + other.unknown,
            total_excluding_unknown: self.total_excluding_unknown + other.total_excluding_unknown,
            correct_excluding_unknown: self.correct_excluding_unknown
                + other.correct_excluding_unknown,
        }
    }
}

pub fn safe_divide(numerator: usize, denominator: usize) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}

/// Per-task and overall statistics for one results file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsAnalysis {
    pub ranking: AccuracyStats,
    pub matching: AccuracyStats,
    pub overall: AccuracyStats,
}

impl ResultsAnalysis {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let ranking = AccuracyStats::from_records(records.iter().filter(|r| r.task == TaskKind::Ranking));
        let matching = AccuracyStats::from_records(records.iter().filter(|r| r.task == TaskKind::Matching));
        let overall = ranking.merge(&matching);

        Self {
            ranking,
            matching,
            overall,
        }
    }

    pub fn task(&self, task: TaskKind) -> &AccuracyStats {
        match task {
            TaskKind::Ranking => &self.ranking,
            TaskKind::Matching => &self.matching,
        }
    }

    /// Overall accuracy over answered entries: correct / (total - unknown)
    pub fn overall_accuracy_excluding_unknown(&self) -> f64 {
        safe_divide(self.overall.correct, self.overall.total - self.overall.unknown)
    }
}
