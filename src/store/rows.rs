//! Wire row shapes for the remote store. Columns are snake_case,
//! mirroring the camelCase in-memory fields; conversion happens here at
//! the boundary and nowhere else. The subscription row additionally
//! flattens the reminder flags into two columns.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::{
    Attempt, AttemptItem, AttemptStatus, CompanyCode, Kpi, PlanType, Question, ReminderSent,
    SampleAnswer, Subscription, Subtopic, Topic, TrainingExample, UserProfile, UserRole,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub subtopic_ids: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtopicRow {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRow {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub subtopic_id: Uuid,
    pub prompt: String,
    pub is_active: bool,
    pub connected_kpis: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRow {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub subtopic_id: Uuid,
    pub name: String,
    pub is_essential: bool,
    pub connected_questions: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyCodeRow {
    pub id: Uuid,
    pub code: String,
    pub company_name: String,
    pub admin_email: String,
    pub max_users: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub is_active: bool,
    pub authorized_emails: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAnswerRow {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub kpis_covered: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExampleRow {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub kpis_detected: Vec<Uuid>,
    pub score: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfileRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub company_code: Option<String>,
    pub company_name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    pub is_active: bool,
    pub plan_type: PlanType,
    pub auto_renew: bool,
    pub reminder_seven_days: bool,
    pub reminder_one_day: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRow {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptItemRow {
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

macro_rules! mirror_row {
    ($model:ty, $row:ty, { $($field:ident),+ $(,)? }) => {
        impl From<$model> for $row {
            fn from(value: $model) -> Self {
                Self { $($field: value.$field),+ }
            }
        }

        impl From<$row> for $model {
            fn from(value: $row) -> Self {
                Self { $($field: value.$field),+ }
            }
        }
    };
}

mirror_row!(Topic, TopicRow, {
    id, title, description, is_active, subtopic_ids, created_at, updated_at,
});

mirror_row!(Subtopic, SubtopicRow, {
    id, topic_id, title, description, is_active, created_at, updated_at,
});

mirror_row!(Question, QuestionRow, {
    id, topic_id, subtopic_id, prompt, is_active, connected_kpis, created_at, updated_at,
});

mirror_row!(Kpi, KpiRow, {
    id, topic_id, subtopic_id, name, is_essential, connected_questions, created_at, updated_at,
});

mirror_row!(CompanyCode, CompanyCodeRow, {
    id, code, company_name, admin_email, max_users, expires_at, is_active,
    authorized_emails, created_at, updated_at,
});

mirror_row!(SampleAnswer, SampleAnswerRow, {
    id, question_id, answer_text, kpis_covered, created_at, updated_at,
});

mirror_row!(TrainingExample, TrainingExampleRow, {
    id, question_id, answer_text, kpis_detected, score, created_at, updated_at,
});

mirror_row!(UserProfile, UserProfileRow, {
    id, email, name, role, company_code, company_name, created_at, updated_at,
});

mirror_row!(Attempt, AttemptRow, {
    id, user_id, topic_id, selected_question_ids, start_time, end_time,
    total_time_minutes, time_remaining_secs, status, submitted_at, created_at, updated_at,
});

mirror_row!(AttemptItem, AttemptItemRow, {
    id, attempt_id, question_id, answer, kpis_detected, kpis_missing, score,
    max_score, feedback, is_evaluated, duration_secs, created_at, updated_at,
});

// Subscription flattens the reminder struct, so its conversion is
// written out by hand.
impl From<Subscription> for SubscriptionRow {
    fn from(value: Subscription) -> Self {
        SubscriptionRow {
            id: value.id,
            user_id: value.user_id,
            start_date: value.start_date,
            end_date: value.end_date,
            is_active: value.is_active,
            plan_type: value.plan_type,
            auto_renew: value.auto_renew,
            reminder_seven_days: value.reminder_sent.seven_days,
            reminder_one_day: value.reminder_sent.one_day,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<SubscriptionRow> for Subscription {
    fn from(value: SubscriptionRow) -> Self {
        Subscription {
            id: value.id,
            user_id: value.user_id,
            start_date: value.start_date,
            end_date: value.end_date,
            is_active: value.is_active,
            plan_type: value.plan_type,
            auto_renew: value.auto_renew,
            reminder_sent: ReminderSent {
                seven_days: value.reminder_seven_days,
                one_day: value.reminder_one_day,
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
