//! Remote store boundary. The hosted backend is an external
//! collaborator reached through [`RemoteStore`]; every call can fail
//! independently and there is no batch atomicity: N related writes can
//! partially succeed. Rows speak snake_case at this boundary
//! ([`rows`]); the in-memory and cache side speaks camelCase.

mod memory;
pub mod rows;

pub use memory::MemoryRemoteStore;
pub use rows::{
    AttemptItemRow, AttemptRow, CompanyCodeRow, KpiRow, QuestionRow, SampleAnswerRow,
    SubscriptionRow, SubtopicRow, TopicRow, TrainingExampleRow, UserProfileRow,
};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RemoteStoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate record")]
    Duplicate,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized access")]
    Unauthorized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, RemoteStoreError>;

/// Per-entity upsert/delete/list operations against the remote store.
/// Attempts and attempt items are additionally listed per user and per
/// attempt; they are never deleted by this crate.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upsert_topic(&self, row: TopicRow) -> StoreResult<()>;
    async fn delete_topic(&self, id: Uuid) -> StoreResult<()>;
    async fn list_topics(&self) -> StoreResult<Vec<TopicRow>>;

    async fn upsert_subtopic(&self, row: SubtopicRow) -> StoreResult<()>;
    async fn delete_subtopic(&self, id: Uuid) -> StoreResult<()>;
    async fn list_subtopics(&self) -> StoreResult<Vec<SubtopicRow>>;

    async fn upsert_question(&self, row: QuestionRow) -> StoreResult<()>;
    async fn delete_question(&self, id: Uuid) -> StoreResult<()>;
    async fn list_questions(&self) -> StoreResult<Vec<QuestionRow>>;

    async fn upsert_kpi(&self, row: KpiRow) -> StoreResult<()>;
    async fn delete_kpi(&self, id: Uuid) -> StoreResult<()>;
    async fn list_kpis(&self) -> StoreResult<Vec<KpiRow>>;

    async fn upsert_company_code(&self, row: CompanyCodeRow) -> StoreResult<()>;
    async fn delete_company_code(&self, id: Uuid) -> StoreResult<()>;
    async fn list_company_codes(&self) -> StoreResult<Vec<CompanyCodeRow>>;

    async fn upsert_sample_answer(&self, row: SampleAnswerRow) -> StoreResult<()>;
    async fn delete_sample_answer(&self, id: Uuid) -> StoreResult<()>;
    async fn list_sample_answers(&self) -> StoreResult<Vec<SampleAnswerRow>>;

    async fn upsert_training_example(&self, row: TrainingExampleRow) -> StoreResult<()>;
    async fn delete_training_example(&self, id: Uuid) -> StoreResult<()>;
    async fn list_training_examples(&self) -> StoreResult<Vec<TrainingExampleRow>>;

    async fn upsert_user(&self, row: UserProfileRow) -> StoreResult<()>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<()>;
    async fn list_users(&self) -> StoreResult<Vec<UserProfileRow>>;

    async fn upsert_subscription(&self, row: SubscriptionRow) -> StoreResult<()>;
    async fn delete_subscription(&self, id: Uuid) -> StoreResult<()>;
    async fn list_subscriptions(&self) -> StoreResult<Vec<SubscriptionRow>>;

    async fn upsert_attempt(&self, row: AttemptRow) -> StoreResult<()>;
    async fn list_attempts_for_user(&self, user_id: Uuid) -> StoreResult<Vec<AttemptRow>>;

    async fn upsert_attempt_item(&self, row: AttemptItemRow) -> StoreResult<()>;
    async fn list_attempt_items_for_attempt(
        &self,
        attempt_id: Uuid,
    ) -> StoreResult<Vec<AttemptItemRow>>;
}
