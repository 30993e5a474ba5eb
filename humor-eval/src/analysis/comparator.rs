//! Simple vs reasoned comparison

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::metrics::safe_divide;
use crate::dataset::TaskKind;
use crate::reporting::EvaluationRecord;

/// Correct count, total and accuracy of one results file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeAccuracy {
    pub correct: usize,
    pub total: usize,
    pub accuracy: f64,
}

impl ModeAccuracy {
    pub fn from_records(records: &[EvaluationRecord]) -> Self {
        let correct = records.iter().filter(|r| r.is_correct).count();
        Self {
            correct,
            total: records.len(),
            accuracy: safe_divide(correct, records.len()),
        }
    }
}

/// Outcome of comparing a simple run against a reasoned run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub simple: ModeAccuracy,
    pub reasoned: ModeAccuracy,
    /// Contests where simple was wrong and reasoned was correct
    pub helped: Vec<u32>,
    /// Contests where simple was correct and reasoned was wrong
    pub hurt: Vec<u32>,
    /// Entries present in only one of the two files
    pub unmatched: usize,
}

impl ComparisonReport {
    /// Reasoned minus simple accuracy
    pub fn delta(&self) -> f64 {
        self.reasoned.accuracy - self.simple.accuracy
    }
}

/// Compare two runs entry by entry, pairing on task and contest number.
///
/// Repeated keys pair in order of appearance; each record is used at most once.
pub fn compare(simple: &[EvaluationRecord], reasoned: &[EvaluationRecord]) -> ComparisonReport {
    let mut by_key: HashMap<(TaskKind, u32), VecDeque<&EvaluationRecord>> = HashMap::new();
    for r in reasoned {
        by_key.entry((r.task, r.contest_number)).or_default().push_back(r);
    }

    let mut helped = Vec::new();
    let mut hurt = Vec::new();
    let mut matched = 0;

    // Iterate the simple side so the lists follow its order
    for s in simple {
        let Some(r) = by_key
            .get_mut(&(s.task, s.contest_number))
            .and_then(|queue| queue.pop_front())
        else {
            continue;
        };
        matched += 1;
        match (s.is_correct, r.is_correct) {
            (false, true) => helped.push(s.contest_number),
            (true, false) => hurt.push(s.contest_number),
            _ => {}
        }
    }

    let unmatched = (simple.len() - matched) + (reasoned.len() - matched);
    if unmatched > 0 {
        tracing::warn!("{} entries appear in only one of the compared files", unmatched);
    }

    ComparisonReport {
        simple: ModeAccuracy::from_records(simple),
        reasoned: ModeAccuracy::from_records(reasoned),
        helped,
        hurt,
        unmatched,
    }
}
