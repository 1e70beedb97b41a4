//! Trial grants, additive extensions, expiry sweeps and at-least-once
//! reminder delivery.

mod common;

use examprep_core::error::EngineError;
use examprep_core::models::{NewUserProfile, PlanType, UserRole};
use time::{Duration, OffsetDateTime};

#[tokio::test]
async fn learner_registration_grants_a_trial() {
    let harness = common::harness().await;

    let (user, subscription) = harness
        .state
        .subscriptions
        .register_user(common::learner("learner@example.com"))
        .unwrap();
    let subscription = subscription.expect("learner should receive a trial");

    assert_eq!(subscription.user_id, user.id);
    assert_eq!(subscription.plan_type, PlanType::Trial);
    assert!(subscription.is_active);
    assert_eq!(
        subscription.end_date - subscription.start_date,
        Duration::days(60)
    );

    harness.state.engine.flush().await;
    assert_eq!(harness.remote.subscription_rows().len(), 1);
}

#[tokio::test]
async fn trainers_and_admins_get_no_subscription() {
    let harness = common::harness().await;

    let (_, subscription) = harness
        .state
        .subscriptions
        .register_user(NewUserProfile {
            email: "coach@example.com".to_string(),
            name: "Coach".to_string(),
            role: UserRole::Trainer,
            company_code: None,
        })
        .unwrap();
    assert!(subscription.is_none());
    assert!(harness.state.engine.subscriptions().is_empty());
}

#[tokio::test]
async fn extension_is_additive_from_the_current_end_date() {
    let harness = common::harness().await;
    let lifecycle = &harness.state.subscriptions;

    let (user, subscription) = lifecycle
        .register_user(common::learner("learner@example.com"))
        .unwrap();
    let original_end = subscription.unwrap().end_date;

    let extended = lifecycle.extend(user.id, 30).unwrap();
    assert_eq!(extended.end_date, original_end + Duration::days(30));

    // A second extension stacks on top, not on "now".
    let extended = lifecycle.extend(user.id, 7).unwrap();
    assert_eq!(extended.end_date, original_end + Duration::days(37));

    let err = lifecycle.extend(user.id, 0).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn expiry_sweep_buckets_are_mutually_exclusive() {
    let harness = common::harness().await;
    let lifecycle = &harness.state.subscriptions;
    let engine = &harness.state.engine;
    let now = OffsetDateTime::now_utc();

    let (expired_user, _) = lifecycle
        .register_user(common::learner("expired@example.com"))
        .unwrap();
    let (soon_user, _) = lifecycle
        .register_user(common::learner("soon@example.com"))
        .unwrap();
    let (healthy_user, _) = lifecycle
        .register_user(common::learner("healthy@example.com"))
        .unwrap();

    engine
        .mutate_subscription(expired_user.id, |s| s.end_date = now - Duration::days(1))
        .unwrap();
    engine
        .mutate_subscription(soon_user.id, |s| s.end_date = now + Duration::days(3))
        .unwrap();

    let report = lifecycle.check_expiry(now);
    assert_eq!(report.expired, vec![expired_user.id]);
    assert_eq!(report.expiring_soon, vec![soon_user.id]);
    assert!(!report.expired.contains(&healthy_user.id));
    assert!(!report.expiring_soon.contains(&healthy_user.id));

    // The expired subscription was deactivated in place.
    let expired = engine.subscription_for_user(expired_user.id).unwrap();
    assert!(!expired.is_active);
}

#[tokio::test]
async fn reminders_fire_once_per_window() {
    let harness = common::harness().await;
    let lifecycle = &harness.state.subscriptions;
    let engine = &harness.state.engine;
    let now = OffsetDateTime::now_utc();

    let (user, _) = lifecycle
        .register_user(common::learner("learner@example.com"))
        .unwrap();
    engine
        .mutate_subscription(user.id, |s| s.end_date = now + Duration::days(6))
        .unwrap();

    let report = lifecycle.send_reminders(now).await;
    assert_eq!(report.seven_day_sent, 1);
    assert_eq!(report.one_day_sent, 0);
    assert_eq!(harness.email.sent().len(), 1);
    assert_eq!(harness.email.sent()[0].to, "learner@example.com");

    // Same window again: the flag suppresses a duplicate.
    let report = lifecycle.send_reminders(now).await;
    assert_eq!(report.seven_day_sent, 0);
    assert_eq!(harness.email.send_count(), 1);

    // Inside the one-day window the second reminder fires.
    engine
        .mutate_subscription(user.id, |s| s.end_date = now + Duration::hours(12))
        .unwrap();
    let report = lifecycle.send_reminders(now).await;
    assert_eq!(report.one_day_sent, 1);
    assert_eq!(harness.email.sent().len(), 2);
}

#[tokio::test]
async fn failed_reminder_sends_are_retried_on_the_next_sweep() {
    let harness = common::harness().await;
    let lifecycle = &harness.state.subscriptions;
    let engine = &harness.state.engine;
    let now = OffsetDateTime::now_utc();

    let (user, _) = lifecycle
        .register_user(common::learner("learner@example.com"))
        .unwrap();
    engine
        .mutate_subscription(user.id, |s| s.end_date = now + Duration::days(5))
        .unwrap();

    harness.email.set_fail_sends(true);
    let report = lifecycle.send_reminders(now).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.seven_day_sent, 0);
    let subscription = engine.subscription_for_user(user.id).unwrap();
    assert!(!subscription.reminder_sent.seven_days);

    // Delivery recovers: the same reminder goes out on the next sweep.
    harness.email.set_fail_sends(false);
    let report = lifecycle.send_reminders(now).await;
    assert_eq!(report.seven_day_sent, 1);
    let subscription = engine.subscription_for_user(user.id).unwrap();
    assert!(subscription.reminder_sent.seven_days);
}

#[tokio::test]
async fn extension_rearms_the_reminders() {
    let harness = common::harness().await;
    let lifecycle = &harness.state.subscriptions;
    let engine = &harness.state.engine;
    let now = OffsetDateTime::now_utc();

    let (user, _) = lifecycle
        .register_user(common::learner("learner@example.com"))
        .unwrap();
    engine
        .mutate_subscription(user.id, |s| s.end_date = now + Duration::days(2))
        .unwrap();
    lifecycle.send_reminders(now).await;
    assert!(
        engine
            .subscription_for_user(user.id)
            .unwrap()
            .reminder_sent
            .seven_days
    );

    lifecycle.extend(user.id, 90).unwrap();
    let subscription = engine.subscription_for_user(user.id).unwrap();
    assert!(!subscription.reminder_sent.seven_days);
    assert!(!subscription.reminder_sent.one_day);
}
