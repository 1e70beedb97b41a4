use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanType {
    Trial,
    Premium,
}

/// Which expiry reminders have been delivered. A flag flips to true
/// only after the email collaborator reports success, so a failed send
/// is retried on the next check cycle (at-least-once delivery).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderSent {
    pub seven_days: bool,
    pub one_day: bool,
}

/// A user's access window. Extensions are additive from the current
/// `end_date`, never recomputed from "now".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    pub is_active: bool,
    pub plan_type: PlanType,
    pub auto_renew: bool,
    pub reminder_sent: ReminderSent,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Subscription {
    /// The default grant handed to a new `user`-role profile at first
    /// login.
    pub fn trial(user_id: Uuid, trial_days: i64, now: OffsetDateTime) -> Self {
        Subscription {
            id: Uuid::new_v4(),
            user_id,
            start_date: now,
            end_date: now + Duration::days(trial_days),
            is_active: true,
            plan_type: PlanType::Trial,
            auto_renew: false,
            reminder_sent: ReminderSent::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
