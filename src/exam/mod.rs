//! Timed exam attempts. Unlike content mutations, everything here
//! persists strictly: a remote write that fails comes back to the
//! caller as an error so the presentation layer can offer a retry,
//! because losing a learner's graded attempt is not acceptable.

mod result;

pub use result::{compute_exam_result, PASS_KPI_THRESHOLD, PASS_SCORE_THRESHOLD};

use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::cache::{keys, KeyValueCache};
use crate::engine::ReconciliationEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Attempt, AttemptItem, AttemptStatus, Question, UpdateAttempt, UpdateAttemptItem,
};
use crate::store::RemoteStore;

/// A live attempt plus its answers, keyed by question. Owned by one
/// learner's UI flow; the countdown task shares it behind an async
/// mutex.
#[derive(Debug)]
pub struct ExamSession {
    pub attempt: Attempt,
    items: HashMap<Uuid, AttemptItem>,
}

impl ExamSession {
    fn new(attempt: Attempt) -> Self {
        ExamSession {
            attempt,
            items: HashMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.attempt.is_terminal()
    }

    pub fn item_for(&self, question_id: Uuid) -> Option<&AttemptItem> {
        self.items.get(&question_id)
    }

    /// Items in the attempt's question order.
    pub fn items(&self) -> Vec<&AttemptItem> {
        self.attempt
            .selected_question_ids
            .iter()
            .filter_map(|qid| self.items.get(qid))
            .collect()
    }
}

pub struct ExamService {
    remote: Arc<dyn RemoteStore>,
    engine: Arc<ReconciliationEngine>,
    cache: KeyValueCache,
}

impl ExamService {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        engine: Arc<ReconciliationEngine>,
        cache: KeyValueCache,
    ) -> Self {
        ExamService {
            remote,
            engine,
            cache,
        }
    }

    /// One random question per active subtopic of the topic, in the
    /// subtopic order of the content snapshot. Subtopics without an
    /// active question are skipped, so the draw can be shorter than the
    /// subtopic count but never empty-per-subtopic.
    pub fn select_random_questions(&self, topic_id: Uuid) -> Vec<Question> {
        let subtopics = self.engine.subtopics();
        let questions = self.engine.questions();
        let mut rng = rand::thread_rng();

        subtopics
            .iter()
            .filter(|s| s.topic_id == topic_id && s.is_active)
            .filter_map(|subtopic| {
                let pool: Vec<&Question> = questions
                    .iter()
                    .filter(|q| q.subtopic_id == subtopic.id && q.is_active)
                    .collect();
                pool.choose(&mut rng).map(|q| (*q).clone())
            })
            .collect()
    }

    /// Draw the question set and persist the fresh attempt. The time
    /// budget is fixed at three minutes per drawn question.
    pub async fn start_attempt(&self, user_id: Uuid, topic_id: Uuid) -> EngineResult<ExamSession> {
        let questions = self.select_random_questions(topic_id);
        if questions.is_empty() {
            return Err(EngineError::Validation(format!(
                "topic {topic_id} has no active questions to draw from"
            )));
        }

        let attempt = Attempt::start(
            user_id,
            topic_id,
            questions.iter().map(|q| q.id).collect(),
            OffsetDateTime::now_utc(),
        );
        self.remote.upsert_attempt(attempt.clone().into()).await?;
        self.mirror_attempt(&attempt);
        info!(
            attempt = %attempt.id,
            questions = attempt.selected_question_ids.len(),
            minutes = attempt.total_time_minutes,
            "Attempt started"
        );
        Ok(ExamSession::new(attempt))
    }

    /// Store or replace the learner's answer for one selected question.
    pub async fn record_answer(
        &self,
        session: &mut ExamSession,
        question_id: Uuid,
        answer: String,
    ) -> EngineResult<()> {
        if session.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "attempt {} is already closed",
                session.attempt.id
            )));
        }
        if !session
            .attempt
            .selected_question_ids
            .contains(&question_id)
        {
            return Err(EngineError::Validation(format!(
                "question {question_id} is not part of this attempt"
            )));
        }

        let now = OffsetDateTime::now_utc();
        let item = match session.items.get_mut(&question_id) {
            Some(existing) => {
                existing.answer = answer;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let item = AttemptItem::unevaluated(session.attempt.id, question_id, answer, now);
                session.items.insert(question_id, item.clone());
                item
            }
        };

        self.remote.upsert_attempt_item(item.clone().into()).await?;
        self.mirror_item(session.attempt.user_id, &item);
        Ok(())
    }

    /// Close the attempt as submitted. Terminal; any later mutation is a
    /// conflict.
    pub async fn submit(&self, session: &mut ExamSession) -> EngineResult<()> {
        if session.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "attempt {} is already closed",
                session.attempt.id
            )));
        }

        let now = OffsetDateTime::now_utc();
        session.attempt.status = AttemptStatus::Submitted;
        session.attempt.end_time = Some(now);
        session.attempt.submitted_at = Some(now);
        session.attempt.updated_at = now;

        self.remote
            .upsert_attempt(session.attempt.clone().into())
            .await?;
        self.mirror_attempt(&session.attempt);
        info!(attempt = %session.attempt.id, "Attempt submitted");
        Ok(())
    }

    /// One second of countdown. Returns true once the session is
    /// terminal; at zero the attempt times out.
    pub async fn tick(&self, session: &mut ExamSession) -> EngineResult<bool> {
        if session.is_terminal() {
            return Ok(true);
        }
        session.attempt.time_remaining_secs =
            (session.attempt.time_remaining_secs - 1).max(0);
        if session.attempt.time_remaining_secs == 0 {
            self.timeout(session).await?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Close the attempt as timed out. Unanswered questions get an
    /// empty-answer item so the evaluator sees the full question set.
    pub async fn timeout(&self, session: &mut ExamSession) -> EngineResult<()> {
        if session.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "attempt {} is already closed",
                session.attempt.id
            )));
        }

        let now = OffsetDateTime::now_utc();
        let unanswered: Vec<Uuid> = session
            .attempt
            .selected_question_ids
            .iter()
            .filter(|qid| !session.items.contains_key(qid))
            .copied()
            .collect();
        for question_id in unanswered {
            let item =
                AttemptItem::unevaluated(session.attempt.id, question_id, String::new(), now);
            self.remote.upsert_attempt_item(item.clone().into()).await?;
            self.mirror_item(session.attempt.user_id, &item);
            session.items.insert(question_id, item);
        }

        session.attempt.status = AttemptStatus::Timeout;
        session.attempt.end_time = Some(now);
        session.attempt.time_remaining_secs = 0;
        session.attempt.updated_at = now;

        self.remote
            .upsert_attempt(session.attempt.clone().into())
            .await?;
        self.mirror_attempt(&session.attempt);
        warn!(attempt = %session.attempt.id, "Attempt timed out");
        Ok(())
    }

    /// Drive the one-second countdown until the session closes. The
    /// first interval tick fires immediately and is skipped, so a
    /// session loses its first second a full second after spawn.
    pub async fn run_countdown(
        self: Arc<Self>,
        session: Arc<Mutex<ExamSession>>,
    ) -> EngineResult<()> {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut session = session.lock().await;
            if self.tick(&mut session).await? {
                return Ok(());
            }
        }
    }

    /// Patch an open attempt. Closed attempts reject every change.
    pub async fn update_attempt(
        &self,
        attempt: &mut Attempt,
        patch: UpdateAttempt,
    ) -> EngineResult<()> {
        patch.validate()?;
        if attempt.is_terminal() {
            return Err(EngineError::Conflict(format!(
                "attempt {} is already closed",
                attempt.id
            )));
        }
        attempt.apply(patch, OffsetDateTime::now_utc());
        self.remote.upsert_attempt(attempt.clone().into()).await?;
        self.mirror_attempt(attempt);
        Ok(())
    }

    /// Patch an attempt item. After the attempt closes the learner's
    /// answer is frozen, but the evaluation fields stay writable: the
    /// external evaluator reports its verdict after submission.
    pub async fn update_attempt_item(
        &self,
        attempt: &Attempt,
        item: &mut AttemptItem,
        patch: UpdateAttemptItem,
    ) -> EngineResult<()> {
        patch.validate()?;
        if attempt.is_terminal() && patch.answer.is_some() {
            return Err(EngineError::Conflict(format!(
                "attempt {} is closed, the answer can no longer change",
                attempt.id
            )));
        }
        item.apply(patch, OffsetDateTime::now_utc());
        self.remote.upsert_attempt_item(item.clone().into()).await?;
        self.mirror_item(attempt.user_id, item);
        Ok(())
    }

    /// A learner's past attempts. Served from the remote store when
    /// reachable (and re-mirrored locally), from the cache otherwise.
    pub async fn attempt_history(&self, user_id: Uuid) -> Vec<Attempt> {
        let key = keys::attempts_for(user_id);
        match self.remote.list_attempts_for_user(user_id).await {
            Ok(rows) => {
                let attempts: Vec<Attempt> = rows.into_iter().map(Into::into).collect();
                self.cache.save(&key, &attempts);
                attempts
            }
            Err(e) => {
                warn!(%user_id, error = %e, "History fetch failed, serving cached attempts");
                self.cache.load(&key, Vec::new())
            }
        }
    }

    /// The items of one past attempt, with the same cache fallback as
    /// [`attempt_history`](Self::attempt_history).
    pub async fn attempt_items(&self, user_id: Uuid, attempt_id: Uuid) -> Vec<AttemptItem> {
        let key = keys::attempt_items_for(user_id);
        match self.remote.list_attempt_items_for_attempt(attempt_id).await {
            Ok(rows) => {
                let items: Vec<AttemptItem> = rows.into_iter().map(Into::into).collect();
                let mut cached: Vec<AttemptItem> = self.cache.load(&key, Vec::new());
                cached.retain(|i| i.attempt_id != attempt_id);
                cached.extend(items.iter().cloned());
                self.cache.save(&key, &cached);
                items
            }
            Err(e) => {
                warn!(%attempt_id, error = %e, "Item fetch failed, serving cached items");
                let cached: Vec<AttemptItem> = self.cache.load(&key, Vec::new());
                cached
                    .into_iter()
                    .filter(|i| i.attempt_id == attempt_id)
                    .collect()
            }
        }
    }

    fn mirror_attempt(&self, attempt: &Attempt) {
        let key = keys::attempts_for(attempt.user_id);
        let mut attempts: Vec<Attempt> = self.cache.load(&key, Vec::new());
        match attempts.iter_mut().find(|a| a.id == attempt.id) {
            Some(existing) => *existing = attempt.clone(),
            None => attempts.push(attempt.clone()),
        }
        self.cache.save(&key, &attempts);
    }

    fn mirror_item(&self, user_id: Uuid, item: &AttemptItem) {
        let key = keys::attempt_items_for(user_id);
        let mut items: Vec<AttemptItem> = self.cache.load(&key, Vec::new());
        match items.iter_mut().find(|i| i.id == item.id) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }
        self.cache.save(&key, &items);
    }
}
