use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::cache::{KeyValueCache, KeyValueStore};
use crate::config::Config;
use crate::email::EmailSender;
use crate::engine::ReconciliationEngine;
use crate::exam::ExamService;
use crate::store::RemoteStore;
use crate::subscriptions::SubscriptionLifecycle;

/// Shared application state: the engine and the services built on top
/// of it, wired to the embedder's remote store, key-value store and
/// mail collaborators. Cheap to clone and hand to tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub engine: Arc<ReconciliationEngine>,
    pub exams: Arc<ExamService>,
    pub subscriptions: Arc<SubscriptionLifecycle>,
}

impl AppState {
    /// Wire the full stack and run the startup load. Must be called
    /// inside a tokio runtime; the engine spawns its outbox worker here.
    pub async fn build(
        config: Config,
        remote: Arc<dyn RemoteStore>,
        key_value: Arc<dyn KeyValueStore>,
        email: Arc<dyn EmailSender>,
    ) -> Result<Self> {
        let cache = KeyValueCache::new(key_value);
        let engine = Arc::new(ReconciliationEngine::new(
            Arc::clone(&remote),
            cache.clone(),
            &config.engine,
        ));
        engine.bootstrap().await;

        let exams = Arc::new(ExamService::new(
            Arc::clone(&remote),
            Arc::clone(&engine),
            cache,
        ));
        let subscriptions = Arc::new(SubscriptionLifecycle::new(
            Arc::clone(&engine),
            email,
            config.subscriptions.clone(),
        ));

        info!(app = %config.app.name, "Application state ready");
        Ok(AppState {
            config,
            engine,
            exams,
            subscriptions,
        })
    }
}
