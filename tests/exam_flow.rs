//! Timed exam attempts end to end: question selection, the strict
//! persistence policy, the submit and timeout state transitions, and
//! post-attempt evaluation.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use examprep_core::error::EngineError;
use examprep_core::exam::compute_exam_result;
use examprep_core::models::{
    AttemptStatus, UpdateAttempt, UpdateAttemptItem, ITEM_MAX_SCORE, MINUTES_PER_QUESTION,
};
use examprep_core::seed;
use tokio::sync::Mutex;
use uuid::Uuid;

#[tokio::test]
async fn selection_draws_one_active_question_per_active_subtopic() {
    let harness = common::harness().await;
    let exams = &harness.state.exams;

    let drawn = exams.select_random_questions(seed::RISK_TOPIC_ID);
    assert_eq!(drawn.len(), 2);
    assert_eq!(drawn[0].subtopic_id, seed::RISK_IDENTIFICATION_ID);
    assert_eq!(drawn[1].subtopic_id, seed::RISK_RESPONSE_ID);

    // Over many draws every question of a subtopic should come up.
    let mut seen: HashSet<Uuid> = HashSet::new();
    for _ in 0..100 {
        for question in exams.select_random_questions(seed::RISK_TOPIC_ID) {
            seen.insert(question.id);
        }
    }
    for question in seed::questions() {
        assert!(seen.contains(&question.id), "question never drawn");
    }
}

#[tokio::test]
async fn inactive_subtopics_and_questions_are_excluded() {
    let harness = common::harness().await;
    let engine = &harness.state.engine;
    let exams = &harness.state.exams;

    engine
        .update_subtopic(
            seed::RISK_RESPONSE_ID,
            examprep_core::models::UpdateSubtopic {
                title: None,
                description: None,
                is_active: Some(false),
            },
        )
        .unwrap();

    let drawn = exams.select_random_questions(seed::RISK_TOPIC_ID);
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].subtopic_id, seed::RISK_IDENTIFICATION_ID);
}

#[tokio::test]
async fn starting_an_attempt_sizes_the_clock_and_persists_strictly() {
    let harness = common::harness().await;
    let user_id = Uuid::new_v4();

    let session = harness
        .state
        .exams
        .start_attempt(user_id, seed::RISK_TOPIC_ID)
        .await
        .unwrap();

    assert_eq!(session.attempt.status, AttemptStatus::InProgress);
    assert_eq!(
        session.attempt.total_time_minutes,
        2 * MINUTES_PER_QUESTION
    );
    assert_eq!(
        session.attempt.time_remaining_secs,
        2 * MINUTES_PER_QUESTION * 60
    );

    let rows = harness.remote.attempt_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, session.attempt.id);
}

#[tokio::test]
async fn attempt_persistence_failure_reaches_the_caller() {
    let harness = common::harness().await;
    harness.remote.set_fail_writes(true);

    let err = harness
        .state
        .exams
        .start_attempt(Uuid::new_v4(), seed::RISK_TOPIC_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Remote(_)));
}

#[tokio::test]
async fn topic_without_questions_cannot_start() {
    let harness = common::harness().await;
    let err = harness
        .state
        .exams
        .start_attempt(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn answers_are_recorded_and_submission_is_terminal() {
    let harness = common::harness().await;
    let exams = &harness.state.exams;
    let mut session = exams
        .start_attempt(Uuid::new_v4(), seed::RISK_TOPIC_ID)
        .await
        .unwrap();

    let first_question = session.attempt.selected_question_ids[0];
    exams
        .record_answer(&mut session, first_question, "Initial answer".to_string())
        .await
        .unwrap();
    exams
        .record_answer(&mut session, first_question, "Revised answer".to_string())
        .await
        .unwrap();
    assert_eq!(
        session.item_for(first_question).unwrap().answer,
        "Revised answer"
    );
    assert_eq!(harness.remote.attempt_item_rows().len(), 1);

    // Answering a question outside the draw is rejected.
    let err = exams
        .record_answer(&mut session, Uuid::new_v4(), "stray".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    exams.submit(&mut session).await.unwrap();
    assert_eq!(session.attempt.status, AttemptStatus::Submitted);
    assert!(session.attempt.submitted_at.is_some());

    let err = exams
        .record_answer(&mut session, first_question, "too late".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    let err = exams.submit(&mut session).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test(start_paused = true)]
async fn countdown_times_out_and_backfills_unanswered_questions() {
    let harness = common::harness().await;
    let exams = Arc::clone(&harness.state.exams);
    let mut session = exams
        .start_attempt(Uuid::new_v4(), seed::RISK_TOPIC_ID)
        .await
        .unwrap();

    let answered = session.attempt.selected_question_ids[0];
    exams
        .record_answer(&mut session, answered, "Managed to answer one".to_string())
        .await
        .unwrap();

    let session = Arc::new(Mutex::new(session));
    let countdown = tokio::spawn(Arc::clone(&exams).run_countdown(Arc::clone(&session)));
    countdown.await.unwrap().unwrap();

    let session = session.lock().await;
    assert_eq!(session.attempt.status, AttemptStatus::Timeout);
    assert_eq!(session.attempt.time_remaining_secs, 0);
    assert!(session.attempt.end_time.is_some());

    // Both questions have an item; the unanswered one is empty.
    assert_eq!(session.items().len(), 2);
    let unanswered = session
        .attempt
        .selected_question_ids
        .iter()
        .find(|qid| **qid != answered)
        .unwrap();
    assert_eq!(session.item_for(*unanswered).unwrap().answer, "");
    assert_eq!(harness.remote.attempt_item_rows().len(), 2);

    let row = harness
        .remote
        .attempt_rows()
        .into_iter()
        .find(|r| r.id == session.attempt.id)
        .unwrap();
    assert_eq!(row.status, AttemptStatus::Timeout);
}

#[tokio::test]
async fn evaluation_updates_are_allowed_after_submission_but_answers_are_frozen() {
    let harness = common::harness().await;
    let exams = &harness.state.exams;
    let mut session = exams
        .start_attempt(Uuid::new_v4(), seed::RISK_TOPIC_ID)
        .await
        .unwrap();

    let question_id = session.attempt.selected_question_ids[0];
    exams
        .record_answer(&mut session, question_id, "My answer".to_string())
        .await
        .unwrap();
    exams.submit(&mut session).await.unwrap();

    let attempt = session.attempt.clone();
    let mut item = session.item_for(question_id).unwrap().clone();

    // The external evaluator reports back after submission.
    exams
        .update_attempt_item(
            &attempt,
            &mut item,
            UpdateAttemptItem {
                score: Some(ITEM_MAX_SCORE),
                kpis_detected: Some(vec![seed::kpis()[0].id]),
                is_evaluated: Some(true),
                feedback: Some("Well structured".to_string()),
                ..UpdateAttemptItem::default()
            },
        )
        .await
        .unwrap();
    assert!(item.is_evaluated);
    assert_eq!(item.score, ITEM_MAX_SCORE);

    // The learner's answer is frozen once the attempt closed.
    let err = exams
        .update_attempt_item(
            &attempt,
            &mut item,
            UpdateAttemptItem {
                answer: Some("Rewritten after the fact".to_string()),
                ..UpdateAttemptItem::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // An out-of-range score never reaches the store.
    let err = exams
        .update_attempt_item(
            &attempt,
            &mut item,
            UpdateAttemptItem {
                score: Some(ITEM_MAX_SCORE + 1),
                ..UpdateAttemptItem::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // The closed attempt itself rejects every patch.
    let mut attempt = attempt;
    let err = exams
        .update_attempt(
            &mut attempt,
            UpdateAttempt {
                time_remaining_secs: Some(10),
                ..UpdateAttempt::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // And the evaluated item feeds the aggregate result.
    let result = compute_exam_result(&attempt, &[item]);
    assert_eq!(result.total_score, ITEM_MAX_SCORE);
    assert!(result.passed);
}

#[tokio::test]
async fn attempt_history_serves_cache_when_remote_is_down() {
    let harness = common::harness().await;
    let exams = &harness.state.exams;
    let user_id = Uuid::new_v4();

    let mut session = exams
        .start_attempt(user_id, seed::RISK_TOPIC_ID)
        .await
        .unwrap();
    exams.submit(&mut session).await.unwrap();

    let from_remote = exams.attempt_history(user_id).await;
    assert_eq!(from_remote.len(), 1);

    harness.remote.set_fail_reads(true);
    let from_cache = exams.attempt_history(user_id).await;
    assert_eq!(from_cache.len(), 1);
    assert_eq!(from_cache[0].id, session.attempt.id);
    assert_eq!(from_cache[0].status, AttemptStatus::Submitted);
}

#[tokio::test]
async fn attempt_items_fall_back_to_cache_as_well() {
    let harness = common::harness().await;
    let exams = &harness.state.exams;
    let user_id = Uuid::new_v4();

    let mut session = exams
        .start_attempt(user_id, seed::RISK_TOPIC_ID)
        .await
        .unwrap();
    let question_id = session.attempt.selected_question_ids[0];
    exams
        .record_answer(&mut session, question_id, "Answer".to_string())
        .await
        .unwrap();

    harness.remote.set_fail_reads(true);
    let items = exams.attempt_items(user_id, session.attempt.id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].question_id, question_id);
}
