//! Pure scoring over a finished attempt. Derivable at any time from the
//! attempt's items, so nothing here is persisted.

use crate::models::{Attempt, AttemptItem, ExamResult};

/// Minimum KPI coverage, in percent, for a pass.
pub const PASS_KPI_THRESHOLD: f64 = 80.0;

/// Minimum score share, in percent, for a pass.
pub const PASS_SCORE_THRESHOLD: f64 = 50.0;

const PASS_FEEDBACK: &str =
    "Pass: KPI coverage and overall score both meet the exam thresholds.";
const REMEDIAL_FEEDBACK: &str =
    "Not passed yet: review the missed KPIs per question and retry with a new timed attempt.";

/// Aggregate an attempt's items into a pass/fail result.
///
/// Selected questions without a stored item contribute nothing to
/// either denominator, so a partially evaluated attempt still yields a
/// well-defined result. Both thresholds are inclusive; an empty item
/// set scores 0% on both axes.
pub fn compute_exam_result(attempt: &Attempt, items: &[AttemptItem]) -> ExamResult {
    let mut kpis_detected = 0usize;
    let mut kpis_missing = 0usize;
    let mut total_score = 0i32;
    let mut max_score = 0i32;

    for item in items.iter().filter(|i| i.attempt_id == attempt.id) {
        kpis_detected += item.kpis_detected.len();
        kpis_missing += item.kpis_missing.len();
        total_score += item.score;
        max_score += item.max_score;
    }

    let total_kpis = kpis_detected + kpis_missing;
    let kpi_percentage = if total_kpis == 0 {
        0.0
    } else {
        kpis_detected as f64 / total_kpis as f64 * 100.0
    };
    let score_percentage = if max_score == 0 {
        0.0
    } else {
        f64::from(total_score) / f64::from(max_score) * 100.0
    };

    let passed = kpi_percentage >= PASS_KPI_THRESHOLD && score_percentage >= PASS_SCORE_THRESHOLD;

    ExamResult {
        total_kpis,
        kpis_detected,
        kpis_missing,
        total_score,
        max_score,
        kpi_percentage,
        score_percentage,
        passed,
        feedback: if passed {
            PASS_FEEDBACK.to_string()
        } else {
            REMEDIAL_FEEDBACK.to_string()
        },
    }
}
