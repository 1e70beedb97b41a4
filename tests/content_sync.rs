//! Optimistic content mutations: immediate in-memory effect, background
//! remote convergence, retry and parking behavior, cascades, and the
//! last-write-wins reconciliation pass.

mod common;

use examprep_core::error::EngineError;
use examprep_core::models::{
    NewCompanyCode, NewKpi, NewQuestion, NewSubtopic, NewTopic, NewUserProfile, UserRole,
};
use examprep_core::seed;
use examprep_core::store::RemoteStore;
use time::{Duration, OffsetDateTime};

fn new_topic(title: &str) -> NewTopic {
    NewTopic {
        title: title.to_string(),
        description: None,
    }
}

#[tokio::test]
async fn add_topic_applies_immediately_and_converges_to_remote() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    let topic = engine.add_topic(new_topic("Quality Management")).unwrap();
    assert!(engine.topics().iter().any(|t| t.id == topic.id));

    engine.flush().await;
    assert!(harness
        .remote
        .topic_rows()
        .iter()
        .any(|r| r.id == topic.id && r.title == "Quality Management"));
}

#[tokio::test]
async fn validation_failure_changes_nothing() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;
    let writes_before = harness.remote.write_count();

    let err = engine.add_topic(new_topic("ab")).unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    engine.flush().await;
    assert_eq!(engine.topics(), seed::topics());
    assert_eq!(harness.remote.write_count(), writes_before);
}

#[tokio::test]
async fn transient_remote_failures_are_retried_to_success() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    harness.remote.fail_next_writes(2);
    let topic = engine.add_topic(new_topic("Schedule Management")).unwrap();

    engine.flush().await;
    assert!(harness.remote.topic_rows().iter().any(|r| r.id == topic.id));
    assert!(harness.remote.write_count() >= 3);
    assert_eq!(engine.outbox_stats().parked, 0);
}

#[tokio::test]
async fn exhausted_retries_park_the_operation_without_rollback() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    harness.remote.set_fail_writes(true);
    let topic = engine.add_topic(new_topic("Procurement")).unwrap();
    engine.flush().await;

    // Never rolled back locally, never delivered remotely.
    assert!(engine.topics().iter().any(|t| t.id == topic.id));
    assert!(harness.remote.topic_rows().is_empty());
    assert_eq!(engine.outbox_stats().parked, 1);

    harness.remote.set_fail_writes(false);
    assert_eq!(engine.retry_parked(), 1);
    engine.flush().await;
    assert!(harness.remote.topic_rows().iter().any(|r| r.id == topic.id));
    assert_eq!(engine.outbox_stats().parked, 0);
}

#[tokio::test]
async fn deleting_a_topic_cascades_to_its_subtree() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;
    engine.flush().await;

    engine.delete_topic(seed::RISK_TOPIC_ID).unwrap();

    assert!(engine.topics().is_empty());
    assert!(engine.subtopics().is_empty());
    assert!(engine.questions().is_empty());
    assert!(engine.kpis().is_empty());

    engine.flush().await;
    assert!(harness.remote.topic_rows().is_empty());
    assert!(harness.remote.subtopic_rows().is_empty());
    assert!(harness.remote.question_rows().is_empty());
    assert!(harness.remote.kpi_rows().is_empty());
}

#[tokio::test]
async fn adding_a_subtopic_links_it_into_the_parent_topic() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    let subtopic = engine
        .add_subtopic(NewSubtopic {
            topic_id: seed::RISK_TOPIC_ID,
            title: "Risk Monitoring".to_string(),
            description: None,
        })
        .unwrap();

    let parent = engine
        .topics()
        .into_iter()
        .find(|t| t.id == seed::RISK_TOPIC_ID)
        .unwrap();
    assert!(parent.subtopic_ids.contains(&subtopic.id));

    engine.flush().await;
    let parent_row = harness
        .remote
        .topic_rows()
        .into_iter()
        .find(|r| r.id == seed::RISK_TOPIC_ID)
        .unwrap();
    assert!(parent_row.subtopic_ids.contains(&subtopic.id));
}

#[tokio::test]
async fn kpi_question_links_stay_symmetric_through_connect_and_disconnect() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    let question = engine
        .add_question(NewQuestion {
            topic_id: seed::RISK_TOPIC_ID,
            subtopic_id: seed::RISK_IDENTIFICATION_ID,
            prompt: "How do you escalate a red-status risk?".to_string(),
        })
        .unwrap();
    let kpi = engine
        .add_kpi(NewKpi {
            topic_id: seed::RISK_TOPIC_ID,
            subtopic_id: seed::RISK_IDENTIFICATION_ID,
            name: "Escalates risks in time".to_string(),
            is_essential: false,
        })
        .unwrap();

    engine.connect_kpi_question(kpi.id, question.id).unwrap();
    let linked_kpi = engine.kpis().into_iter().find(|k| k.id == kpi.id).unwrap();
    let linked_question = engine
        .questions()
        .into_iter()
        .find(|q| q.id == question.id)
        .unwrap();
    assert!(linked_kpi.connected_questions.contains(&question.id));
    assert!(linked_question.connected_kpis.contains(&kpi.id));

    // Connecting again is a no-op, not a duplicate entry.
    engine.connect_kpi_question(kpi.id, question.id).unwrap();
    let linked_kpi = engine.kpis().into_iter().find(|k| k.id == kpi.id).unwrap();
    assert_eq!(
        linked_kpi
            .connected_questions
            .iter()
            .filter(|q| **q == question.id)
            .count(),
        1
    );

    engine.disconnect_kpi_question(kpi.id, question.id).unwrap();
    let unlinked_kpi = engine.kpis().into_iter().find(|k| k.id == kpi.id).unwrap();
    let unlinked_question = engine
        .questions()
        .into_iter()
        .find(|q| q.id == question.id)
        .unwrap();
    assert!(!unlinked_kpi.connected_questions.contains(&question.id));
    assert!(!unlinked_question.connected_kpis.contains(&kpi.id));
}

#[tokio::test]
async fn deleting_a_question_scrubs_kpi_back_references() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    let linked_kpis: Vec<_> = engine
        .kpis()
        .into_iter()
        .filter(|k| {
            k.connected_questions
                .contains(&seed::questions()[0].id)
        })
        .collect();
    assert!(!linked_kpis.is_empty());

    engine.delete_question(seed::questions()[0].id).unwrap();
    for kpi in engine.kpis() {
        assert!(!kpi.connected_questions.contains(&seed::questions()[0].id));
    }
    engine.flush().await;
    assert!(harness.remote.write_count() > 0);
}

#[tokio::test]
async fn duplicate_email_registration_is_a_conflict() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    engine.add_user(common::learner("sam@example.com")).unwrap();
    let err = engine
        .add_user(common::learner("SAM@example.com"))
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(engine.users().len(), 1);
}

#[tokio::test]
async fn company_code_gates_registration_and_removal_cascades() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    let code = engine
        .add_company_code(NewCompanyCode {
            code: "ACME2026".to_string(),
            company_name: "Acme Consulting".to_string(),
            admin_email: "admin@acme.example".to_string(),
            max_users: 5,
            expires_at: OffsetDateTime::now_utc() + Duration::days(90),
            authorized_emails: vec!["jo@acme.example".to_string(), "kim@acme.example".to_string()],
        })
        .unwrap();

    let jo = engine
        .add_user(NewUserProfile {
            email: "jo@acme.example".to_string(),
            name: "Jo".to_string(),
            role: UserRole::User,
            company_code: Some("ACME2026".to_string()),
        })
        .unwrap();
    assert_eq!(jo.company_name.as_deref(), Some("Acme Consulting"));

    // Unauthorized email is rejected up front.
    let err = engine
        .add_user(NewUserProfile {
            email: "stranger@acme.example".to_string(),
            name: "Stranger".to_string(),
            role: UserRole::User,
            company_code: Some("ACME2026".to_string()),
        })
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // Dropping jo from the authorized list retires the account.
    engine
        .update_company_code(
            code.id,
            examprep_core::models::UpdateCompanyCode {
                company_name: None,
                admin_email: None,
                max_users: None,
                expires_at: None,
                is_active: None,
                authorized_emails: Some(vec!["kim@acme.example".to_string()]),
            },
        )
        .unwrap();
    assert!(engine.users().is_empty());
}

#[tokio::test]
async fn reconciliation_merges_newer_remote_and_pushes_local_only_records() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;

    // The remote holds a newer revision of the seed topic.
    let mut remote_topic = seed::topics().remove(0);
    remote_topic.title = "Risk Management (revised)".to_string();
    remote_topic.updated_at += Duration::days(1);
    harness
        .remote
        .upsert_topic(remote_topic.clone().into())
        .await
        .unwrap();

    // And the local side holds a topic the remote has never seen.
    let local_only = engine.add_topic(new_topic("Leadership")).unwrap();
    engine.flush().await;
    harness.remote.delete_topic(local_only.id).await.unwrap();

    let report = engine.reconcile_with_remote().await.unwrap();
    assert!(report.adopted >= 1);
    assert!(report.pushed >= 1);

    let topics = engine.topics();
    assert!(topics
        .iter()
        .any(|t| t.id == remote_topic.id && t.title == "Risk Management (revised)"));
    assert!(topics.iter().any(|t| t.id == local_only.id));

    engine.flush().await;
    assert!(harness
        .remote
        .topic_rows()
        .iter()
        .any(|r| r.id == local_only.id));
}

#[tokio::test]
async fn reconciliation_propagates_remote_failure() {
    let harness = common::harness().await;
    harness.remote.set_fail_reads(true);

    let err = harness
        .state
        .engine
        .reconcile_with_remote()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Remote(_)));
}
