use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::rows::{
    AttemptItemRow, AttemptRow, CompanyCodeRow, KpiRow, QuestionRow, SampleAnswerRow,
    SubscriptionRow, SubtopicRow, TopicRow, TrainingExampleRow, UserProfileRow,
};
use super::{RemoteStore, RemoteStoreError, StoreResult};

#[derive(Debug, Default)]
struct Tables {
    topics: Vec<TopicRow>,
    subtopics: Vec<SubtopicRow>,
    questions: Vec<QuestionRow>,
    kpis: Vec<KpiRow>,
    company_codes: Vec<CompanyCodeRow>,
    sample_answers: Vec<SampleAnswerRow>,
    training_examples: Vec<TrainingExampleRow>,
    users: Vec<UserProfileRow>,
    subscriptions: Vec<SubscriptionRow>,
    attempts: Vec<AttemptRow>,
    attempt_items: Vec<AttemptItemRow>,
}

/// In-process remote store: the bundled offline-mode backend and the
/// test double. Reads and writes can be failed on demand, either
/// latched (`set_fail_*`) or for the next N writes (`fail_next_writes`),
/// which is how the retry and fallback paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_failures_remaining: AtomicUsize,
    write_count: AtomicUsize,
}

fn upsert_by<R>(rows: &mut Vec<R>, row: R, id: impl Fn(&R) -> Uuid) {
    let row_id = id(&row);
    match rows.iter_mut().find(|r| id(*r) == row_id) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail exactly the next `n` write calls, then recover.
    pub fn fail_next_writes(&self, n: usize) {
        self.write_failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn guard_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::Connection(
                "injected read failure".to_string(),
            ));
        }
        Ok(())
    }

    fn guard_write(&self) -> StoreResult<()> {
        self.write_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::Connection(
                "injected write failure".to_string(),
            ));
        }
        let took_one = self
            .write_failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if took_one {
            return Err(RemoteStoreError::Connection(
                "injected write failure".to_string(),
            ));
        }
        Ok(())
    }

    // Inspection hooks for tests.

    pub fn topic_rows(&self) -> Vec<TopicRow> {
        self.lock().topics.clone()
    }

    pub fn subtopic_rows(&self) -> Vec<SubtopicRow> {
        self.lock().subtopics.clone()
    }

    pub fn question_rows(&self) -> Vec<QuestionRow> {
        self.lock().questions.clone()
    }

    pub fn kpi_rows(&self) -> Vec<KpiRow> {
        self.lock().kpis.clone()
    }

    pub fn company_code_rows(&self) -> Vec<CompanyCodeRow> {
        self.lock().company_codes.clone()
    }

    pub fn sample_answer_rows(&self) -> Vec<SampleAnswerRow> {
        self.lock().sample_answers.clone()
    }

    pub fn training_example_rows(&self) -> Vec<TrainingExampleRow> {
        self.lock().training_examples.clone()
    }

    pub fn user_rows(&self) -> Vec<UserProfileRow> {
        self.lock().users.clone()
    }

    pub fn subscription_rows(&self) -> Vec<SubscriptionRow> {
        self.lock().subscriptions.clone()
    }

    pub fn attempt_rows(&self) -> Vec<AttemptRow> {
        self.lock().attempts.clone()
    }

    pub fn attempt_item_rows(&self) -> Vec<AttemptItemRow> {
        self.lock().attempt_items.clone()
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn upsert_topic(&self, row: TopicRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().topics, row, |r| r.id);
        Ok(())
    }

    async fn delete_topic(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().topics.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_topics(&self) -> StoreResult<Vec<TopicRow>> {
        self.guard_read()?;
        Ok(self.lock().topics.clone())
    }

    async fn upsert_subtopic(&self, row: SubtopicRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().subtopics, row, |r| r.id);
        Ok(())
    }

    async fn delete_subtopic(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().subtopics.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_subtopics(&self) -> StoreResult<Vec<SubtopicRow>> {
        self.guard_read()?;
        Ok(self.lock().subtopics.clone())
    }

    async fn upsert_question(&self, row: QuestionRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().questions, row, |r| r.id);
        Ok(())
    }

    async fn delete_question(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().questions.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_questions(&self) -> StoreResult<Vec<QuestionRow>> {
        self.guard_read()?;
        Ok(self.lock().questions.clone())
    }

    async fn upsert_kpi(&self, row: KpiRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().kpis, row, |r| r.id);
        Ok(())
    }

    async fn delete_kpi(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().kpis.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_kpis(&self) -> StoreResult<Vec<KpiRow>> {
        self.guard_read()?;
        Ok(self.lock().kpis.clone())
    }

    async fn upsert_company_code(&self, row: CompanyCodeRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().company_codes, row, |r| r.id);
        Ok(())
    }

    async fn delete_company_code(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().company_codes.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_company_codes(&self) -> StoreResult<Vec<CompanyCodeRow>> {
        self.guard_read()?;
        Ok(self.lock().company_codes.clone())
    }

    async fn upsert_sample_answer(&self, row: SampleAnswerRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().sample_answers, row, |r| r.id);
        Ok(())
    }

    async fn delete_sample_answer(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().sample_answers.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_sample_answers(&self) -> StoreResult<Vec<SampleAnswerRow>> {
        self.guard_read()?;
        Ok(self.lock().sample_answers.clone())
    }

    async fn upsert_training_example(&self, row: TrainingExampleRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().training_examples, row, |r| r.id);
        Ok(())
    }

    async fn delete_training_example(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().training_examples.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_training_examples(&self) -> StoreResult<Vec<TrainingExampleRow>> {
        self.guard_read()?;
        Ok(self.lock().training_examples.clone())
    }

    async fn upsert_user(&self, row: UserProfileRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().users, row, |r| r.id);
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().users.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserProfileRow>> {
        self.guard_read()?;
        Ok(self.lock().users.clone())
    }

    async fn upsert_subscription(&self, row: SubscriptionRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().subscriptions, row, |r| r.id);
        Ok(())
    }

    async fn delete_subscription(&self, id: Uuid) -> StoreResult<()> {
        self.guard_write()?;
        self.lock().subscriptions.retain(|r| r.id != id);
        Ok(())
    }

    async fn list_subscriptions(&self) -> StoreResult<Vec<SubscriptionRow>> {
        self.guard_read()?;
        Ok(self.lock().subscriptions.clone())
    }

    async fn upsert_attempt(&self, row: AttemptRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().attempts, row, |r| r.id);
        Ok(())
    }

    async fn list_attempts_for_user(&self, user_id: Uuid) -> StoreResult<Vec<AttemptRow>> {
        self.guard_read()?;
        Ok(self
            .lock()
            .attempts
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_attempt_item(&self, row: AttemptItemRow) -> StoreResult<()> {
        self.guard_write()?;
        upsert_by(&mut self.lock().attempt_items, row, |r| r.id);
        Ok(())
    }

    async fn list_attempt_items_for_attempt(
        &self,
        attempt_id: Uuid,
    ) -> StoreResult<Vec<AttemptItemRow>> {
        self.guard_read()?;
        Ok(self
            .lock()
            .attempt_items
            .iter()
            .filter(|r| r.attempt_id == attempt_id)
            .cloned()
            .collect())
    }
}
