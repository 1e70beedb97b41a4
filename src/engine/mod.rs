//! Reconciliation engine: sole owner of the authoritative in-memory
//! collections.
//!
//! Startup is a two-tier fallback (remote → local cache → bundled
//! seed), attempted top-down and never escalating back up within a
//! session. Content mutations are optimistic: validated synchronously,
//! applied to memory immediately, mirrored to the cache, and persisted
//! remotely through the [`outbox`]; remote failure is logged and
//! retried, never rolled back, never surfaced to the mutating caller.
//!
//! Single-writer contract: every mutation goes through this type's own
//! mutator methods, which re-derive from the latest in-memory snapshot
//! under a write lock that is never held across an await point. Any
//! number of callers may invoke mutators concurrently; two rapid edits
//! to the same entity last-write-win with no version check.

mod merge;
mod mutations;
mod outbox;

pub use merge::MergeReport;
pub use outbox::{Outbox, OutboxStats, RetryPolicy, SyncOp};

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::cache::{keys, KeyValueCache};
use crate::config::EngineSection;
use crate::models::{
    CompanyCode, Kpi, Question, SampleAnswer, Subscription, Subtopic, Topic, TrainingExample,
    UserProfile,
};
use crate::seed;
use crate::store::RemoteStore;

/// Where a collection's current in-memory contents came from at
/// startup. Recorded so "intentionally emptied remote" versus "never
/// populated" is observable instead of inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionSource {
    Remote,
    Cache,
    Seed,
}

#[derive(Debug, Clone, Copy)]
pub struct CollectionSources {
    pub topics: CollectionSource,
    pub subtopics: CollectionSource,
    pub questions: CollectionSource,
    pub kpis: CollectionSource,
    pub company_codes: CollectionSource,
    pub sample_answers: CollectionSource,
    pub training_examples: CollectionSource,
    pub users: CollectionSource,
    pub subscriptions: CollectionSource,
}

impl Default for CollectionSources {
    fn default() -> Self {
        CollectionSources {
            topics: CollectionSource::Seed,
            subtopics: CollectionSource::Seed,
            questions: CollectionSource::Seed,
            kpis: CollectionSource::Seed,
            company_codes: CollectionSource::Seed,
            sample_answers: CollectionSource::Seed,
            training_examples: CollectionSource::Seed,
            users: CollectionSource::Seed,
            subscriptions: CollectionSource::Seed,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct Collections {
    pub topics: Vec<Topic>,
    pub subtopics: Vec<Subtopic>,
    pub questions: Vec<Question>,
    pub kpis: Vec<Kpi>,
    pub company_codes: Vec<CompanyCode>,
    pub sample_answers: Vec<SampleAnswer>,
    pub training_examples: Vec<TrainingExample>,
    pub users: Vec<UserProfile>,
    pub subscriptions: Vec<Subscription>,
}

pub struct ReconciliationEngine {
    remote: Arc<dyn RemoteStore>,
    cache: KeyValueCache,
    collections: RwLock<Collections>,
    sources: RwLock<CollectionSources>,
    outbox: Outbox,
    seed_on_empty_remote: bool,
}

impl ReconciliationEngine {
    /// Construct the engine and spawn its outbox worker. Call
    /// [`bootstrap`](Self::bootstrap) before handing the engine to
    /// consumers.
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: KeyValueCache,
        settings: &EngineSection,
    ) -> Self {
        let outbox = Outbox::spawn(
            Arc::clone(&remote),
            RetryPolicy {
                max_attempts: settings.outbox_max_attempts,
                base_backoff_ms: settings.outbox_base_backoff_ms,
            },
        );
        ReconciliationEngine {
            remote,
            cache,
            collections: RwLock::new(Collections::default()),
            sources: RwLock::new(CollectionSources::default()),
            outbox,
            seed_on_empty_remote: settings.seed_on_empty_remote,
        }
    }

    /// Startup protocol. Issues every collection list concurrently and
    /// joins them; if all succeed, remote wins (seed filling empty
    /// collections) and every loaded collection is mirrored into the
    /// cache. If any fails, the whole load falls back to the cache,
    /// with seed data behind it. Runs once, before any consumer reads.
    pub async fn bootstrap(&self) {
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

        let remote_ok = topics.is_ok()
            && subtopics.is_ok()
            && questions.is_ok()
            && kpis.is_ok()
            && company_codes.is_ok()
            && sample_answers.is_ok()
            && training_examples.is_ok()
            && users.is_ok()
            && subscriptions.is_ok();

        if remote_ok {
            let seed_on_empty = self.seed_on_empty_remote;
            let adopt = |remote_len: usize| remote_len == 0 && seed_on_empty;

            let (topics, topics_src) =
                Self::remote_or_seed(to_models(topics.unwrap_or_default()), seed::topics(), adopt);
            let (subtopics, subtopics_src) = Self::remote_or_seed(
                to_models(subtopics.unwrap_or_default()),
                seed::subtopics(),
                adopt,
            );
            let (questions, questions_src) = Self::remote_or_seed(
                to_models(questions.unwrap_or_default()),
                seed::questions(),
                adopt,
            );
            let (kpis, kpis_src) =
                Self::remote_or_seed(to_models(kpis.unwrap_or_default()), seed::kpis(), adopt);
            let (company_codes, company_codes_src) = Self::remote_or_seed(
                to_models(company_codes.unwrap_or_default()),
                seed::company_codes(),
                adopt,
            );
            let (sample_answers, sample_answers_src) = Self::remote_or_seed(
                to_models(sample_answers.unwrap_or_default()),
                seed::sample_answers(),
                adopt,
            );
            let (training_examples, training_examples_src) = Self::remote_or_seed(
                to_models(training_examples.unwrap_or_default()),
                seed::training_examples(),
                adopt,
            );
            let (users, users_src) = Self::remote_or_seed(
                to_models(users.unwrap_or_default()),
                Vec::<UserProfile>::new(),
                adopt,
            );
            let (subscriptions, subscriptions_src) = Self::remote_or_seed(
                to_models(subscriptions.unwrap_or_default()),
                Vec::<Subscription>::new(),
                adopt,
            );

            {
                let mut collections = self.write();
                collections.topics = topics;
                collections.subtopics = subtopics;
                collections.questions = questions;
                collections.kpis = kpis;
                collections.company_codes = company_codes;
                collections.sample_answers = sample_answers;
                collections.training_examples = training_examples;
                collections.users = users;
                collections.subscriptions = subscriptions;
            }
            {
                let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
                sources.topics = topics_src;
                sources.subtopics = subtopics_src;
                sources.questions = questions_src;
                sources.kpis = kpis_src;
                sources.company_codes = company_codes_src;
                sources.sample_answers = sample_answers_src;
                sources.training_examples = training_examples_src;
                sources.users = users_src;
                sources.subscriptions = subscriptions_src;
            }

            self.mirror_all();
            info!("Engine bootstrapped from remote store");
        } else {
            warn!("Remote load failed, falling back to local cache");
            self.bootstrap_from_cache();
        }
    }

    fn remote_or_seed<T>(
        rows: Vec<T>,
        seed: Vec<T>,
        adopt_seed: impl Fn(usize) -> bool,
    ) -> (Vec<T>, CollectionSource) {
        if adopt_seed(rows.len()) {
            (seed, CollectionSource::Seed)
        } else {
            (rows, CollectionSource::Remote)
        }
    }

    fn bootstrap_from_cache(&self) {
        let cached = |hit: bool| {
            if hit {
                CollectionSource::Cache
            } else {
                CollectionSource::Seed
            }
        };

        let (topics, topics_hit) = self.cache_or_seed(keys::TOPICS, seed::topics());
        let (subtopics, subtopics_hit) = self.cache_or_seed(keys::SUBTOPICS, seed::subtopics());
        let (questions, questions_hit) = self.cache_or_seed(keys::QUESTIONS, seed::questions());
        let (kpis, kpis_hit) = self.cache_or_seed(keys::KPIS, seed::kpis());
        let (company_codes, company_codes_hit) =
            self.cache_or_seed(keys::COMPANY_CODES, seed::company_codes());
        let (sample_answers, sample_answers_hit) =
            self.cache_or_seed(keys::SAMPLE_ANSWERS, seed::sample_answers());
        let (training_examples, training_examples_hit) =
            self.cache_or_seed(keys::TRAINING_EXAMPLES, seed::training_examples());
        let (users, users_hit) = self.cache_or_seed(keys::USERS, Vec::<UserProfile>::new());
        let (subscriptions, subscriptions_hit) =
            self.cache_or_seed(keys::SUBSCRIPTIONS, Vec::<Subscription>::new());

        {
            let mut collections = self.write();
            collections.topics = topics;
            collections.subtopics = subtopics;
            collections.questions = questions;
            collections.kpis = kpis;
            collections.company_codes = company_codes;
            collections.sample_answers = sample_answers;
            collections.training_examples = training_examples;
            collections.users = users;
            collections.subscriptions = subscriptions;
        }
        {
            let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
            sources.topics = cached(topics_hit);
            sources.subtopics = cached(subtopics_hit);
            sources.questions = cached(questions_hit);
            sources.kpis = cached(kpis_hit);
            sources.company_codes = cached(company_codes_hit);
            sources.sample_answers = cached(sample_answers_hit);
            sources.training_examples = cached(training_examples_hit);
            sources.users = cached(users_hit);
            sources.subscriptions = cached(subscriptions_hit);
        }
        // No cache mirroring on this path: the cache is the source.
    }

    /// An empty cached collection is treated like a miss; seed data
    /// fills it, matching the remote-side policy.
    fn cache_or_seed<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        seed: Vec<T>,
    ) -> (Vec<T>, bool) {
        let (data, hit) = self.cache.load_tracked::<T>(key, Vec::new());
        if hit && !data.is_empty() {
            (data, true)
        } else {
            (seed, false)
        }
    }

    /// Per-collection startup provenance.
    pub fn sources(&self) -> CollectionSources {
        *self.sources.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Await delivery (or parking) of every pending remote write.
    pub async fn flush(&self) {
        self.outbox.flush().await;
    }

    pub fn outbox_stats(&self) -> OutboxStats {
        self.outbox.stats()
    }

    /// Re-enqueue parked remote writes, e.g. after connectivity
    /// returns. Returns how many were requeued.
    pub fn retry_parked(&self) -> usize {
        self.outbox.retry_parked()
    }

    // ----- collection snapshots -----

    pub fn topics(&self) -> Vec<Topic> {
        self.read().topics.clone()
    }

    pub fn subtopics(&self) -> Vec<Subtopic> {
        self.read().subtopics.clone()
    }

    pub fn questions(&self) -> Vec<Question> {
        self.read().questions.clone()
    }

    pub fn kpis(&self) -> Vec<Kpi> {
        self.read().kpis.clone()
    }

    pub fn company_codes(&self) -> Vec<CompanyCode> {
        self.read().company_codes.clone()
    }

    pub fn sample_answers(&self) -> Vec<SampleAnswer> {
        self.read().sample_answers.clone()
    }

    pub fn training_examples(&self) -> Vec<TrainingExample> {
        self.read().training_examples.clone()
    }

    pub fn users(&self) -> Vec<UserProfile> {
        self.read().users.clone()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.read().subscriptions.clone()
    }

    // ----- internals shared with mutations/merge -----

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache(&self) -> &KeyValueCache {
        &self.cache
    }

    pub(crate) fn enqueue(&self, op: SyncOp) {
        self.outbox.enqueue(op);
    }

    pub(crate) fn mirror_all(&self) {
        let snapshot = self.read().clone();
        self.cache.save(keys::TOPICS, &snapshot.topics);
        self.cache.save(keys::SUBTOPICS, &snapshot.subtopics);
        self.cache.save(keys::QUESTIONS, &snapshot.questions);
        self.cache.save(keys::KPIS, &snapshot.kpis);
        self.cache.save(keys::COMPANY_CODES, &snapshot.company_codes);
        self.cache.save(keys::SAMPLE_ANSWERS, &snapshot.sample_answers);
        self.cache
            .save(keys::TRAINING_EXAMPLES, &snapshot.training_examples);
        self.cache.save(keys::USERS, &snapshot.users);
        self.cache.save(keys::SUBSCRIPTIONS, &snapshot.subscriptions);
    }
}

fn to_models<R, M: From<R>>(rows: Vec<R>) -> Vec<M> {
    rows.into_iter().map(M::from).collect()
}
