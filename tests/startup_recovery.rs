//! Startup fallback chain: remote store, then local cache, then the
//! bundled seed data, with per-collection provenance.

mod common;

use std::sync::Arc;

use examprep_core::cache::{keys, KeyValueCache, KeyValueStore};
use examprep_core::engine::CollectionSource;
use examprep_core::models::Topic;
use examprep_core::store::RemoteStore;
use examprep_core::{seed, Config};
use time::macros::datetime;
use uuid::Uuid;

fn topic(title: &str) -> Topic {
    let now = datetime!(2026-03-01 08:00 UTC);
    Topic {
        id: Uuid::new_v4(),
        title: title.to_string(),
        description: None,
        is_active: true,
        subtopic_ids: Vec::new(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn remote_content_wins_and_is_mirrored_locally() {
    let (remote, key_value, email) = common::collaborators();
    let hosted = topic("Hosted Topic");
    remote.upsert_topic(hosted.clone().into()).await.unwrap();

    let harness = common::assemble(Config::default(), remote, key_value, email).await;

    let topics = harness.state.engine.topics();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].title, "Hosted Topic");
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Remote
    );

    // The startup load must leave a cache mirror behind.
    let cache = KeyValueCache::new(Arc::clone(&harness.key_value) as Arc<dyn KeyValueStore>);
    let mirrored: Vec<Topic> = cache.load(keys::TOPICS, Vec::new());
    assert_eq!(mirrored, topics);
}

#[tokio::test]
async fn empty_remote_collections_fall_back_to_seed() {
    let harness = common::harness().await;

    let topics = harness.state.engine.topics();
    assert_eq!(topics, seed::topics());
    assert_eq!(harness.state.engine.questions().len(), 6);
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Seed
    );
    assert_eq!(
        harness.state.engine.sources().questions,
        CollectionSource::Seed
    );
}

#[tokio::test]
async fn seed_fill_can_be_disabled() {
    let (remote, key_value, email) = common::collaborators();
    let mut config = Config::default();
    config.engine.seed_on_empty_remote = false;

    let harness = common::assemble(config, remote, key_value, email).await;

    assert!(harness.state.engine.topics().is_empty());
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Remote
    );
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_cached_content() {
    let (remote, key_value, email) = common::collaborators();
    let cached = topic("Cached Topic");
    let cache = KeyValueCache::new(Arc::clone(&key_value) as Arc<dyn KeyValueStore>);
    cache.save(keys::TOPICS, std::slice::from_ref(&cached));
    remote.set_fail_reads(true);

    let harness = common::assemble(Config::default(), remote, key_value, email).await;

    let topics = harness.state.engine.topics();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].title, "Cached Topic");
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Cache
    );
    // Collections the cache does not hold still degrade to seed.
    assert_eq!(
        harness.state.engine.sources().questions,
        CollectionSource::Seed
    );
    assert_eq!(harness.state.engine.questions(), seed::questions());
}

#[tokio::test]
async fn unreachable_remote_with_empty_cache_uses_seed() {
    let (remote, key_value, email) = common::collaborators();
    remote.set_fail_reads(true);

    let harness = common::assemble(Config::default(), remote, key_value, email).await;

    assert_eq!(harness.state.engine.topics(), seed::topics());
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Seed
    );
}

#[tokio::test]
async fn legacy_bare_array_cache_records_are_accepted() {
    let (remote, key_value, email) = common::collaborators();
    let legacy = topic("Legacy Cached Topic");
    key_value.set_raw(keys::TOPICS, &serde_json::to_string(&[legacy]).unwrap());
    remote.set_fail_reads(true);

    let harness = common::assemble(Config::default(), remote, key_value, email).await;

    let topics = harness.state.engine.topics();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].title, "Legacy Cached Topic");
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Cache
    );
}

#[tokio::test]
async fn corrupt_cache_record_degrades_to_seed_instead_of_failing() {
    let (remote, key_value, email) = common::collaborators();
    key_value.set_raw(keys::TOPICS, "{definitely not json");
    remote.set_fail_reads(true);

    let harness = common::assemble(Config::default(), remote, key_value, email).await;

    assert_eq!(harness.state.engine.topics(), seed::topics());
    assert_eq!(
        harness.state.engine.sources().topics,
        CollectionSource::Seed
    );
}
