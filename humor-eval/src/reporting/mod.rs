//! Results reporting

pub mod json_writer;
pub mod records;

pub use json_writer::{load_records, records_from_value, JsonWriter, ReportError};
pub use records::{EvaluationRecord, ModeReport, ResultsDocument, RunMeta, TaskGroup, TaskSummary};

use crate::analysis::{AccuracyStats, ComparisonReport, ResultsAnalysis};
use crate::dataset::TaskKind;

/// Print the per-task accuracy of one finished mode
pub fn print_run_summary(report: &ModeReport) {
    println!("\n=== {} mode on split '{}' ===\n", report.mode, report.split);

    for task in TaskKind::all() {
        let summary = &report.group(task).summary;
        println!(
            "  {:<10} {}/{} = {:.3} ({:.1}%)",
            task.as_str(),
            summary.correct_answers,
            summary.total_entries,
            summary.accuracy,
            summary.accuracy * 100.0
        );
    }

    let failures = report.records().filter(|r| r.error.is_some()).count();
    if failures > 0 {
        println!("\n  {} entries failed during inference", failures);
    }
}

fn accuracy_line(label: &str, correct: usize, total: usize, accuracy: f64) -> String {
    format!(
        "  {}: {}/{} = {:.3} ({:.1}%)",
        label,
        correct,
        total,
        accuracy,
        accuracy * 100.0
    )
}

fn print_task_block(name: &str, stats: &AccuracyStats) {
    println!("{} TASK:", name.to_uppercase());
    println!("  Total entries: {}", stats.total);
    println!(
        "  Unknown answers: {} ({:.1}%)",
        stats.unknown,
        stats.unknown_rate() * 100.0
    );
    println!(
        "{}",
        accuracy_line(
            "Accuracy (including unknowns)",
            stats.correct,
            stats.total,
            stats.accuracy_with_unknown()
        )
    );
    println!(
        "{}",
        accuracy_line(
            "Accuracy (excluding unknowns)",
            stats.correct_excluding_unknown,
            stats.total_excluding_unknown,
            stats.accuracy_excluding_unknown()
        )
    );
    println!();
}

fn table_row(label: &str, stats: &AccuracyStats, acc_with: f64, acc_without: f64) -> String {
    format!(
        "{:<10} | {:<6} | {:<8} | {:.3} ({:.1}%) | {:.3} ({:.1}%)",
        label,
        stats.total,
        stats.unknown,
        acc_with,
        acc_with * 100.0,
        acc_without,
        acc_without * 100.0
    )
}

/// Print Unknown-aware accuracy for one results file
pub fn print_analysis(analysis: &ResultsAnalysis) {
    let overall = &analysis.overall;

    println!("{:=<60}", "");
    println!("HUMOR EVALUATION RESULTS ANALYSIS");
    println!("{:=<60}", "");
    println!();

    println!("OVERALL SUMMARY:");
    println!("  Total entries: {}", overall.total);
    println!(
        "  Unknown answers: {} ({:.1}%)",
        overall.unknown,
        overall.unknown_rate() * 100.0
    );
    println!(
        "{}",
        accuracy_line(
            "Accuracy (including unknowns)",
            overall.correct,
            overall.total,
            overall.accuracy_with_unknown()
        )
    );
    println!(
        "{}",
        accuracy_line(
            "Accuracy (excluding unknowns)",
            overall.correct,
            overall.total - overall.unknown,
            analysis.overall_accuracy_excluding_unknown()
        )
    );
    println!();

    for task in TaskKind::all() {
        print_task_block(task.as_str(), analysis.task(task));
    }

    println!("SUMMARY TABLE:");
    println!("{:-<80}", "");
    println!(
        "{:<10} | {:<6} | {:<8} | {:<15} | {:<16}",
        "Task", "Total", "Unknown", "Acc (w/ Unknown)", "Acc (w/o Unknown)"
    );
    println!("{:-<80}", "");
    for task in TaskKind::all() {
        let stats = analysis.task(task);
        println!(
            "{}",
            table_row(
                task.as_str(),
                stats,
                stats.accuracy_with_unknown(),
                stats.accuracy_excluding_unknown()
            )
        );
    }
    println!("{:-<80}", "");
    println!(
        "{}",
        table_row(
            "OVERALL",
            overall,
            overall.accuracy_with_unknown(),
            analysis.overall_accuracy_excluding_unknown()
        )
    );
    println!("{:-<80}", "");
}

fn contest_list(contests: &[u32]) -> String {
    if contests.is_empty() {
        "  (none)".to_string()
    } else {
        let items: Vec<String> = contests.iter().map(|c| c.to_string()).collect();
        format!("[{}]", items.join(", "))
    }
}

/// Print accuracy deltas between a simple and a reasoned run
pub fn print_comparison(report: &ComparisonReport) {
    let delta = report.delta();

    println!("{:=<70}", "");
    println!("COMPARISON: SIMPLE vs REASONED");
    println!("{:=<70}", "");
    println!(
        "Simple  : {}/{} = {:.3} ({:.1}%)",
        report.simple.correct,
        report.simple.total,
        report.simple.accuracy,
        report.simple.accuracy * 100.0
    );
    println!(
        "Reasoned: {}/{} = {:.3} ({:.1}%)",
        report.reasoned.correct,
        report.reasoned.total,
        report.reasoned.accuracy,
        report.reasoned.accuracy * 100.0
    );
    println!(
        "Delta accuracy (reasoned - simple): {:+.3} ({:+.1} pp)",
        delta,
        delta * 100.0
    );

    println!("\nItems where reasoned helped (simple wrong, reasoned correct):");
    println!("{}", contest_list(&report.helped));
    println!("Items where reasoning hurt (simple correct, reasoned wrong):");
    println!("{}", contest_list(&report.hurt));

    if report.unmatched > 0 {
        println!("\nUnmatched entries: {}", report.unmatched);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contest_list() {
        assert_eq!(contest_list(&[]), "  (none)");
        assert_eq!(contest_list(&[12, 40]), "[12, 40]");
    }

    #[test]
    fn test_table_row_layout() {
        let stats = AccuracyStats {
            total: 10,
            correct: 4,
            unknown: 2,
            total_excluding_unknown: 8,
            correct_excluding_unknown: 4,
        };
        assert_eq!(
            table_row("ranking", &stats, 0.4, 0.5),
            "ranking    | 10     | 2        | 0.400 (40.0%) | 0.500 (50.0%)"
        );
    }
}
