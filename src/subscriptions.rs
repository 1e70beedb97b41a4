//! Subscription lifecycle: trial grants at registration, additive
//! extensions, expiry sweeps and at-least-once expiry reminders.
//!
//! Reminder delivery leans on the flag design in
//! [`crate::models::ReminderSent`]: a flag flips only after the sender
//! reports success, so a failed send is simply retried on the next
//! sweep. Duplicate reminders are possible if a crash lands between
//! send and flag write; a missed reminder is not.

use std::sync::Arc;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SubscriptionSection;
use crate::email::{EmailMessage, EmailSender};
use crate::engine::ReconciliationEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::{NewUserProfile, Subscription, UserProfile, UserRole};

/// How close to the end date the early reminder fires.
const REMINDER_WINDOW_DAYS: i64 = 7;

/// Outcome of an expiry sweep, bucketed by user. The buckets are
/// mutually exclusive: an expired subscription never also counts as
/// expiring soon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    pub expired: Vec<Uuid>,
    pub expiring_soon: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderReport {
    pub seven_day_sent: usize,
    pub one_day_sent: usize,
    pub failed: usize,
}

pub struct SubscriptionLifecycle {
    engine: Arc<ReconciliationEngine>,
    email: Arc<dyn EmailSender>,
    settings: SubscriptionSection,
}

impl SubscriptionLifecycle {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        email: Arc<dyn EmailSender>,
        settings: SubscriptionSection,
    ) -> Self {
        SubscriptionLifecycle {
            engine,
            email,
            settings,
        }
    }

    /// Create the account and, for learner-role profiles, the trial
    /// subscription that goes with it. Trainers and admins get no
    /// subscription.
    pub fn register_user(
        &self,
        new: NewUserProfile,
    ) -> EngineResult<(UserProfile, Option<Subscription>)> {
        let user = self.engine.add_user(new)?;
        let subscription = if user.role == UserRole::User {
            let trial = Subscription::trial(
                user.id,
                self.settings.trial_days,
                OffsetDateTime::now_utc(),
            );
            Some(self.engine.add_subscription(trial)?)
        } else {
            None
        };
        info!(user = %user.id, role = ?user.role, "User registered");
        Ok((user, subscription))
    }

    /// Extend a subscription by whole days, additively from the current
    /// end date. Extending also re-arms both reminders and reactivates
    /// an expired subscription.
    pub fn extend(&self, user_id: Uuid, days: i64) -> EngineResult<Subscription> {
        if days <= 0 {
            return Err(EngineError::Validation(
                "extension must be a positive number of days".to_string(),
            ));
        }
        let subscription = self.engine.mutate_subscription(user_id, |s| {
            s.end_date += Duration::days(days);
            s.is_active = true;
            s.reminder_sent.seven_days = false;
            s.reminder_sent.one_day = false;
        })?;
        info!(user = %user_id, days, end_date = %subscription.end_date, "Subscription extended");
        Ok(subscription)
    }

    /// Sweep every subscription against `now`: deactivate the expired
    /// ones and report which are inside the reminder window.
    pub fn check_expiry(&self, now: OffsetDateTime) -> ExpiryReport {
        let mut report = ExpiryReport::default();
        for subscription in self.engine.subscriptions() {
            if subscription.end_date <= now {
                report.expired.push(subscription.user_id);
                if subscription.is_active {
                    if let Err(e) = self
                        .engine
                        .mutate_subscription(subscription.user_id, |s| s.is_active = false)
                    {
                        warn!(user = %subscription.user_id, error = %e, "Expiry flip failed");
                    }
                }
            } else if subscription.end_date <= now + Duration::days(REMINDER_WINDOW_DAYS) {
                report.expiring_soon.push(subscription.user_id);
            }
        }
        report
    }

    /// Send the seven-day and one-day expiry reminders that are due.
    /// A subscription inside the one-day window gets the one-day
    /// reminder, not both.
    pub async fn send_reminders(&self, now: OffsetDateTime) -> ReminderReport {
        let mut report = ReminderReport::default();
        let users = self.engine.users();

        for subscription in self.engine.subscriptions() {
            if !subscription.is_active || subscription.end_date <= now {
                continue;
            }
            let remaining = subscription.end_date - now;

            let due_one_day = remaining <= Duration::days(1) && !subscription.reminder_sent.one_day;
            let due_seven_days = !due_one_day
                && remaining <= Duration::days(REMINDER_WINDOW_DAYS)
                && !subscription.reminder_sent.seven_days;
            if !due_one_day && !due_seven_days {
                continue;
            }

            let Some(user) = users.iter().find(|u| u.id == subscription.user_id) else {
                warn!(user = %subscription.user_id, "Subscription without a user profile, skipping reminder");
                continue;
            };

            let message = if due_one_day {
                EmailMessage {
                    to: user.email.clone(),
                    subject: "Your subscription expires tomorrow".to_string(),
                    body: format!(
                        "Hi {}, your exam preparation subscription ends on {}. \
                         Extend it today to keep your access.",
                        user.name, subscription.end_date
                    ),
                }
            } else {
                EmailMessage {
                    to: user.email.clone(),
                    subject: "Your subscription expires in a week".to_string(),
                    body: format!(
                        "Hi {}, your exam preparation subscription ends on {}. \
                         Extend it to keep practising without interruption.",
                        user.name, subscription.end_date
                    ),
                }
            };

            let outcome = self.email.send(message).await;
            if outcome.success {
                let result = self.engine.mutate_subscription(subscription.user_id, |s| {
                    if due_one_day {
                        s.reminder_sent.one_day = true;
                    } else {
                        s.reminder_sent.seven_days = true;
                    }
                });
                match result {
                    Ok(_) => {
                        if due_one_day {
                            report.one_day_sent += 1;
                        } else {
                            report.seven_day_sent += 1;
                        }
                    }
                    Err(e) => {
                        warn!(user = %subscription.user_id, error = %e, "Reminder flag write failed");
                        report.failed += 1;
                    }
                }
            } else {
                warn!(
                    user = %subscription.user_id,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Reminder send failed, will retry on the next sweep"
                );
                report.failed += 1;
            }
        }
        report
    }
}
