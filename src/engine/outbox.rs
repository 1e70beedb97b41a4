//! Sync outbox: the single remote-write path for optimistic content
//! mutations. Operations are enqueued in mutation order and drained by
//! one background worker with linear retry-with-backoff; an operation
//! that exhausts its retries is parked, never bounced back to the
//! caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    CompanyCode, Kpi, Question, SampleAnswer, Subscription, Subtopic, Topic, TrainingExample,
    UserProfile,
};
use crate::store::{RemoteStore, RemoteStoreError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff_ms: 120,
        }
    }
}

impl RetryPolicy {
    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(attempt as u64))
    }
}

/// One pending remote write. Upserts carry the full entity so a retry
/// always pushes the freshest state the mutation produced.
#[derive(Debug, Clone)]
pub enum SyncOp {
    UpsertTopic(Topic),
    DeleteTopic(Uuid),
    UpsertSubtopic(Subtopic),
    DeleteSubtopic(Uuid),
    UpsertQuestion(Question),
    DeleteQuestion(Uuid),
    UpsertKpi(Kpi),
    DeleteKpi(Uuid),
    UpsertCompanyCode(CompanyCode),
    DeleteCompanyCode(Uuid),
    UpsertSampleAnswer(SampleAnswer),
    DeleteSampleAnswer(Uuid),
    UpsertTrainingExample(TrainingExample),
    DeleteTrainingExample(Uuid),
    UpsertUser(UserProfile),
    DeleteUser(Uuid),
    UpsertSubscription(Subscription),
    DeleteSubscription(Uuid),
}

impl SyncOp {
    pub fn kind(&self) -> &'static str {
        match self {
            SyncOp::UpsertTopic(_) => "upsert_topic",
            SyncOp::DeleteTopic(_) => "delete_topic",
            SyncOp::UpsertSubtopic(_) => "upsert_subtopic",
            SyncOp::DeleteSubtopic(_) => "delete_subtopic",
            SyncOp::UpsertQuestion(_) => "upsert_question",
            SyncOp::DeleteQuestion(_) => "delete_question",
            SyncOp::UpsertKpi(_) => "upsert_kpi",
            SyncOp::DeleteKpi(_) => "delete_kpi",
            SyncOp::UpsertCompanyCode(_) => "upsert_company_code",
            SyncOp::DeleteCompanyCode(_) => "delete_company_code",
            SyncOp::UpsertSampleAnswer(_) => "upsert_sample_answer",
            SyncOp::DeleteSampleAnswer(_) => "delete_sample_answer",
            SyncOp::UpsertTrainingExample(_) => "upsert_training_example",
            SyncOp::DeleteTrainingExample(_) => "delete_training_example",
            SyncOp::UpsertUser(_) => "upsert_user",
            SyncOp::DeleteUser(_) => "delete_user",
            SyncOp::UpsertSubscription(_) => "upsert_subscription",
            SyncOp::DeleteSubscription(_) => "delete_subscription",
        }
    }
}

async fn apply(remote: &dyn RemoteStore, op: &SyncOp) -> Result<(), RemoteStoreError> {
    match op {
        SyncOp::UpsertTopic(t) => remote.upsert_topic(t.clone().into()).await,
        SyncOp::DeleteTopic(id) => remote.delete_topic(*id).await,
        SyncOp::UpsertSubtopic(s) => remote.upsert_subtopic(s.clone().into()).await,
        SyncOp::DeleteSubtopic(id) => remote.delete_subtopic(*id).await,
        SyncOp::UpsertQuestion(q) => remote.upsert_question(q.clone().into()).await,
        SyncOp::DeleteQuestion(id) => remote.delete_question(*id).await,
        SyncOp::UpsertKpi(k) => remote.upsert_kpi(k.clone().into()).await,
        SyncOp::DeleteKpi(id) => remote.delete_kpi(*id).await,
        SyncOp::UpsertCompanyCode(c) => remote.upsert_company_code(c.clone().into()).await,
        SyncOp::DeleteCompanyCode(id) => remote.delete_company_code(*id).await,
        SyncOp::UpsertSampleAnswer(s) => remote.upsert_sample_answer(s.clone().into()).await,
        SyncOp::DeleteSampleAnswer(id) => remote.delete_sample_answer(*id).await,
        SyncOp::UpsertTrainingExample(t) => remote.upsert_training_example(t.clone().into()).await,
        SyncOp::DeleteTrainingExample(id) => remote.delete_training_example(*id).await,
        SyncOp::UpsertUser(u) => remote.upsert_user(u.clone().into()).await,
        SyncOp::DeleteUser(id) => remote.delete_user(*id).await,
        SyncOp::UpsertSubscription(s) => remote.upsert_subscription(s.clone().into()).await,
        SyncOp::DeleteSubscription(id) => remote.delete_subscription(*id).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboxStats {
    /// Operations enqueued or mid-retry.
    pub queued: usize,
    /// Operations that exhausted their retries.
    pub parked: usize,
}

#[derive(Default)]
struct Shared {
    in_flight: AtomicUsize,
    parked: Mutex<Vec<SyncOp>>,
    drained: Notify,
}

pub struct Outbox {
    tx: mpsc::UnboundedSender<SyncOp>,
    shared: Arc<Shared>,
}

impl Outbox {
    /// Spawn the worker task. Must be called inside a tokio runtime.
    pub fn spawn(remote: Arc<dyn RemoteStore>, policy: RetryPolicy) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SyncOp>();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let mut delivered = false;
                for attempt in 1..=policy.max_attempts {
                    match apply(remote.as_ref(), &op).await {
                        Ok(()) => {
                            debug!(op = op.kind(), attempt, "Remote persist succeeded");
                            delivered = true;
                            break;
                        }
                        Err(e) => {
                            warn!(op = op.kind(), attempt, error = %e, "Remote persist failed");
                            if attempt < policy.max_attempts {
                                tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
                            }
                        }
                    }
                }
                if !delivered {
                    warn!(op = op.kind(), "Retries exhausted, parking operation");
                    worker_shared
                        .parked
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(op);
                }
                if worker_shared.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
                    worker_shared.drained.notify_waiters();
                }
            }
        });

        Self { tx, shared }
    }

    pub fn enqueue(&self, op: SyncOp) {
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(op).is_err() {
            // Worker is gone; only happens during shutdown.
            self.shared.in_flight.fetch_sub(1, Ordering::AcqRel);
            warn!("Outbox worker stopped, dropping operation");
        }
    }

    /// Wait until every enqueued operation has been delivered or parked.
    pub async fn flush(&self) {
        loop {
            let drained = self.shared.drained.notified();
            if self.shared.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            drained.await;
        }
    }

    pub fn stats(&self) -> OutboxStats {
        OutboxStats {
            queued: self.shared.in_flight.load(Ordering::Acquire),
            parked: self
                .shared
                .parked
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .len(),
        }
    }

    /// Re-enqueue every parked operation, e.g. after the remote store
    /// has recovered.
    pub fn retry_parked(&self) -> usize {
        let parked: Vec<SyncOp> = std::mem::take(
            &mut *self
                .shared
                .parked
                .lock()
                .unwrap_or_else(|e| e.into_inner()),
        );
        let count = parked.len();
        for op in parked {
            self.enqueue(op);
        }
        count
    }
}
