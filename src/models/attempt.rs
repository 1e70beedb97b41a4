use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// Exam time budget: three minutes per selected question.
pub const MINUTES_PER_QUESTION: i64 = 3;

/// Fixed per-item score ceiling. Changing this mid-history would skew
/// every aggregate percentage, so it is a constant, not configuration.
pub const ITEM_MAX_SCORE: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    Timeout,
}

/// One learner's timed pass through a set of selected questions.
/// `submitted` and `timeout` are terminal: no further mutation of the
/// attempt is permitted once either is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic_id: Uuid,
    pub selected_question_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub total_time_minutes: i64,
    pub time_remaining_secs: i64,
    pub status: AttemptStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One question's answer within an attempt. The evaluation fields
/// (score, detected/missing KPIs, feedback) are filled in by the
/// external evaluator through `update_attempt_item`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptItem {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub kpis_detected: Vec<Uuid>,
    pub kpis_missing: Vec<Uuid>,
    pub score: i32,
    pub max_score: i32,
    pub feedback: String,
    pub is_evaluated: bool,
    pub duration_secs: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAttempt {
    pub end_time: Option<OffsetDateTime>,
    #[validate(range(min = 0))]
    pub time_remaining_secs: Option<i64>,
    pub status: Option<AttemptStatus>,
    pub submitted_at: Option<OffsetDateTime>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateAttemptItem {
    pub answer: Option<String>,
    pub kpis_detected: Option<Vec<Uuid>>,
    pub kpis_missing: Option<Vec<Uuid>>,
    #[validate(range(min = 0, max = 3, message = "Score must be between 0 and 3"))]
    pub score: Option<i32>,
    pub feedback: Option<String>,
    pub is_evaluated: Option<bool>,
    #[validate(range(min = 0))]
    pub duration_secs: Option<i64>,
}

/// Aggregate outcome of an attempt, derived from its items. Never
/// persisted by this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub total_kpis: usize,
    pub kpis_detected: usize,
    pub kpis_missing: usize,
    pub total_score: i32,
    pub max_score: i32,
    pub kpi_percentage: f64,
    pub score_percentage: f64,
    pub passed: bool,
    pub feedback: String,
}

impl Attempt {
    pub fn start(
        user_id: Uuid,
        topic_id: Uuid,
        selected_question_ids: Vec<Uuid>,
        now: OffsetDateTime,
    ) -> Self {
        let total_time_minutes = selected_question_ids.len() as i64 * MINUTES_PER_QUESTION;
        Attempt {
            id: Uuid::new_v4(),
            user_id,
            topic_id,
            selected_question_ids,
            start_time: now,
            end_time: None,
            total_time_minutes,
            time_remaining_secs: total_time_minutes * 60,
            status: AttemptStatus::InProgress,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            AttemptStatus::Submitted | AttemptStatus::Timeout
        )
    }

    pub fn apply(&mut self, patch: UpdateAttempt, now: OffsetDateTime) {
        if let Some(end_time) = patch.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(time_remaining_secs) = patch.time_remaining_secs {
            self.time_remaining_secs = time_remaining_secs;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(submitted_at) = patch.submitted_at {
            self.submitted_at = Some(submitted_at);
        }
        self.updated_at = now;
    }
}

impl AttemptItem {
    /// A freshly answered item: evaluation fields empty until the
    /// external evaluator reports back.
    pub fn unevaluated(
        attempt_id: Uuid,
        question_id: Uuid,
        answer: String,
        now: OffsetDateTime,
    ) -> Self {
        AttemptItem {
            id: Uuid::new_v4(),
            attempt_id,
            question_id,
            answer,
            kpis_detected: Vec::new(),
            kpis_missing: Vec::new(),
            score: 0,
            max_score: ITEM_MAX_SCORE,
            feedback: String::new(),
            is_evaluated: false,
            duration_secs: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: UpdateAttemptItem, now: OffsetDateTime) {
        if let Some(answer) = patch.answer {
            self.answer = answer;
        }
        if let Some(kpis_detected) = patch.kpis_detected {
            self.kpis_detected = kpis_detected;
        }
        if let Some(kpis_missing) = patch.kpis_missing {
            self.kpis_missing = kpis_missing;
        }
        if let Some(score) = patch.score {
            self.score = score;
        }
        if let Some(feedback) = patch.feedback {
            self.feedback = feedback;
        }
        if let Some(is_evaluated) = patch.is_evaluated {
            self.is_evaluated = is_evaluated;
        }
        if let Some(duration_secs) = patch.duration_secs {
            self.duration_secs = duration_secs;
        }
        self.updated_at = now;
    }
}
