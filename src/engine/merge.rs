//! Timestamp-based reconciliation against the remote store, used when
//! connectivity returns after a cache- or seed-backed session. Per
//! record, the newer `updated_at` wins; remote-only records are
//! adopted, local-only records are kept and pushed back through the
//! outbox.
//!
//! Deletions are not reconciled: a record deleted remotely while this
//! client was offline comes back if the client still holds a local
//! copy. Tombstones are the eventual fix; until then resurrection is
//! the accepted failure mode.

use tracing::info;

use crate::error::EngineResult;
use crate::models::Record;

use super::{ReconciliationEngine, SyncOp};

/// What a reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Remote records taken over the local state (new or newer).
    pub adopted: usize,
    /// Local records pushed back to the remote (new or newer).
    pub pushed: usize,
}

struct MergeOutcome<T> {
    merged: Vec<T>,
    push: Vec<T>,
    adopted: usize,
}

/// Pure last-write-wins merge. The result keeps remote ordering for
/// records the remote knows about and appends local-only records in
/// local order.
fn merge_records<T: Record + Clone>(local: &[T], remote: &[T]) -> MergeOutcome<T> {
    let mut merged = Vec::with_capacity(remote.len());
    let mut push = Vec::new();
    let mut adopted = 0;

    for remote_record in remote {
        match local
            .iter()
            .find(|l| l.record_id() == remote_record.record_id())
        {
            Some(local_record) => {
                if local_record.record_updated_at() > remote_record.record_updated_at() {
                    merged.push(local_record.clone());
                    push.push(local_record.clone());
                } else {
                    if local_record.record_updated_at() < remote_record.record_updated_at() {
                        adopted += 1;
                    }
                    merged.push(remote_record.clone());
                }
            }
            None => {
                adopted += 1;
                merged.push(remote_record.clone());
            }
        }
    }

    for local_record in local {
        if !remote
            .iter()
            .any(|r| r.record_id() == local_record.record_id())
        {
            merged.push(local_record.clone());
            push.push(local_record.clone());
        }
    }

    MergeOutcome {
        merged,
        push,
        adopted,
    }
}

impl ReconciliationEngine {
    /// Strict full-state reconciliation: pull every collection, merge
    /// last-write-wins, push the local winners through the outbox and
    /// re-mirror the cache. Unlike the mutation path this propagates
    /// remote errors, so the caller knows the pass did not happen.
    pub async fn reconcile_with_remote(&self) -> EngineResult<MergeReport> {
        let (topics, subtopics, questions, kpis, company_codes, sample_answers, training_examples, users, subscriptions) = tokio::join!(
            self.remote.list_topics(),
            self.remote.list_subtopics(),
            self.remote.list_questions(),
            self.remote.list_kpis(),
            self.remote.list_company_codes(),
            self.remote.list_sample_answers(),
            self.remote.list_training_examples(),
            self.remote.list_users(),
            self.remote.list_subscriptions(),
        );

        let remote_topics: Vec<_> = topics?.into_iter().map(Into::into).collect();
        let remote_subtopics: Vec<_> = subtopics?.into_iter().map(Into::into).collect();
        let remote_questions: Vec<_> = questions?.into_iter().map(Into::into).collect();
        let remote_kpis: Vec<_> = kpis?.into_iter().map(Into::into).collect();
        let remote_company_codes: Vec<_> = company_codes?.into_iter().map(Into::into).collect();
        let remote_sample_answers: Vec<_> = sample_answers?.into_iter().map(Into::into).collect();
        let remote_training_examples: Vec<_> =
            training_examples?.into_iter().map(Into::into).collect();
        let remote_users: Vec<_> = users?.into_iter().map(Into::into).collect();
        let remote_subscriptions: Vec<_> = subscriptions?.into_iter().map(Into::into).collect();

        let mut report = MergeReport::default();
        {
            let mut collections = self.write();

            let outcome = merge_records(&collections.topics, &remote_topics);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.topics = outcome.merged;
            for topic in outcome.push {
                self.enqueue(SyncOp::UpsertTopic(topic));
            }

            let outcome = merge_records(&collections.subtopics, &remote_subtopics);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.subtopics = outcome.merged;
            for subtopic in outcome.push {
                self.enqueue(SyncOp::UpsertSubtopic(subtopic));
            }

            let outcome = merge_records(&collections.questions, &remote_questions);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.questions = outcome.merged;
            for question in outcome.push {
                self.enqueue(SyncOp::UpsertQuestion(question));
            }

            let outcome = merge_records(&collections.kpis, &remote_kpis);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.kpis = outcome.merged;
            for kpi in outcome.push {
                self.enqueue(SyncOp::UpsertKpi(kpi));
            }

            let outcome = merge_records(&collections.company_codes, &remote_company_codes);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.company_codes = outcome.merged;
            for code in outcome.push {
                self.enqueue(SyncOp::UpsertCompanyCode(code));
            }

            let outcome = merge_records(&collections.sample_answers, &remote_sample_answers);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.sample_answers = outcome.merged;
            for sample in outcome.push {
                self.enqueue(SyncOp::UpsertSampleAnswer(sample));
            }

            let outcome =
                merge_records(&collections.training_examples, &remote_training_examples);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.training_examples = outcome.merged;
            for example in outcome.push {
                self.enqueue(SyncOp::UpsertTrainingExample(example));
            }

            let outcome = merge_records(&collections.users, &remote_users);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.users = outcome.merged;
            for user in outcome.push {
                self.enqueue(SyncOp::UpsertUser(user));
            }

            let outcome = merge_records(&collections.subscriptions, &remote_subscriptions);
            report.adopted += outcome.adopted;
            report.pushed += outcome.push.len();
            collections.subscriptions = outcome.merged;
            for subscription in outcome.push {
                self.enqueue(SyncOp::UpsertSubscription(subscription));
            }
        }

        self.mirror_all();
        info!(
            adopted = report.adopted,
            pushed = report.pushed,
            "Reconciliation pass complete"
        );
        Ok(report)
    }
}
