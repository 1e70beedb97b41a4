#![allow(dead_code)]

use std::sync::Arc;

use examprep_core::cache::{KeyValueStore, MemoryKeyValueStore};
use examprep_core::email::{EmailSender, RecordingEmailSender};
use examprep_core::models::{NewUserProfile, UserRole};
use examprep_core::store::{MemoryRemoteStore, RemoteStore};
use examprep_core::{AppState, Config};

/// The full stack over in-process collaborators, with handles to the
/// doubles kept open for inspection and failure injection.
pub struct Harness {
    pub remote: Arc<MemoryRemoteStore>,
    pub key_value: Arc<MemoryKeyValueStore>,
    pub email: Arc<RecordingEmailSender>,
    pub state: AppState,
}

pub fn collaborators() -> (
    Arc<MemoryRemoteStore>,
    Arc<MemoryKeyValueStore>,
    Arc<RecordingEmailSender>,
) {
    (
        Arc::new(MemoryRemoteStore::new()),
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(RecordingEmailSender::new()),
    )
}

/// Wire a state over prepared collaborators, e.g. after staging remote
/// rows or cache records for a startup scenario.
pub async fn assemble(
    config: Config,
    remote: Arc<MemoryRemoteStore>,
    key_value: Arc<MemoryKeyValueStore>,
    email: Arc<RecordingEmailSender>,
) -> Harness {
    let state = AppState::build(
        config,
        Arc::clone(&remote) as Arc<dyn RemoteStore>,
        Arc::clone(&key_value) as Arc<dyn KeyValueStore>,
        Arc::clone(&email) as Arc<dyn EmailSender>,
    )
    .await
    .unwrap();
    Harness {
        remote,
        key_value,
        email,
        state,
    }
}

/// Fresh stack with default configuration and empty collaborators, so
/// the content snapshot starts from the bundled seed data.
pub async fn harness() -> Harness {
    let (remote, key_value, email) = collaborators();
    assemble(Config::default(), remote, key_value, email).await
}

pub fn learner(email: &str) -> NewUserProfile {
    NewUserProfile {
        email: email.to_string(),
        name: "Test Learner".to_string(),
        role: UserRole::User,
        company_code: None,
    }
}
