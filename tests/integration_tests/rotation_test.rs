//! Rotation and cache lifecycle tests
//!
//! Covers:
//! 1. Full rotation without repeats, then reset on exhaustion
//! 2. Seen set persistence across engine instances
//! 3. Pruning of ids that left the source
//! 4. Cache adoption, expiry and empty envelopes
//! 5. Segmentation of delivered jokes

use jokebox::engine::EngineState;
use jokebox::models::{JokeId, Progress};
use jokebox::storage::MemoryStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{
    engine, mount_csv, seed_cache, seed_seen, stored_cache, stored_seen, RecordingSleep,
    FOUR_JOKES_CSV,
};

// ============================================================================
// Rotation
// ============================================================================

#[tokio::test]
async fn test_full_rotation_without_repeats() {
    let server = MockServer::start().await;
    mount_csv(&server, FOUR_JOKES_CSV).await;

    let store = Arc::new(MemoryStore::new());
    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    let mut delivered = HashSet::new();
    for _ in 0..4 {
        let delivery = engine.get_next().expect("jokes loaded");
        assert!(delivered.insert(delivery.id), "joke repeated before rotation ended");
    }
    assert_eq!(delivered.len(), 4);
    assert_eq!(stored_seen(&store).len(), 4);

    // Fifth call starts a new rotation
    let fifth = engine.get_next().unwrap();
    assert_eq!(fifth.progress, Progress { seen: 1, total: 4 });
    assert_eq!(stored_seen(&store), vec![fifth.id]);
}

#[tokio::test]
async fn test_many_rotations_never_repeat_within_a_cycle() {
    let server = MockServer::start().await;
    mount_csv(&server, FOUR_JOKES_CSV).await;

    let mut engine = engine(&server, MemoryStore::new(), RecordingSleep::default());
    engine.init().await.unwrap();

    for _ in 0..5 {
        let cycle: HashSet<JokeId> = (0..4).map(|_| engine.get_next().unwrap().id).collect();
        assert_eq!(cycle.len(), 4);
    }
}

#[tokio::test]
async fn test_seen_set_survives_new_session() {
    let server = MockServer::start().await;
    mount_csv(&server, FOUR_JOKES_CSV).await;
    let store = Arc::new(MemoryStore::new());

    let mut first = engine(&server, Arc::clone(&store), RecordingSleep::default());
    first.init().await.unwrap();
    let a = first.get_next().unwrap().id;
    let b = first.get_next().unwrap().id;
    drop(first);

    let mut second = engine(&server, Arc::clone(&store), RecordingSleep::default());
    second.init().await.unwrap();
    assert_eq!(second.progress(), Progress { seen: 2, total: 4 });

    let c = second.get_next().unwrap().id;
    let d = second.get_next().unwrap().id;
    let all: HashSet<_> = [a, b, c, d].into_iter().collect();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn test_get_next_segments_jokes() {
    let server = MockServer::start().await;
    mount_csv(&server, FOUR_JOKES_CSV).await;

    let mut engine = engine(&server, MemoryStore::new(), RecordingSleep::default());
    engine.init().await.unwrap();

    let deliveries: Vec<_> = (0..4).map(|_| engine.get_next().unwrap()).collect();

    let skeleton = deliveries
        .iter()
        .find(|d| d.setup.as_deref() == Some("Why don't skeletons fight each other?"))
        .expect("question joke split");
    assert_eq!(skeleton.punchline.as_deref(), Some("They don't have the guts."));

    let beard = deliveries
        .iter()
        .find(|d| d.setup.as_deref() == Some("I used to hate facial hair…"))
        .expect("ellipsis joke split");
    assert_eq!(beard.punchline.as_deref(), Some("but then it grew on me."));

    let singles: Vec<_> = deliveries.iter().filter(|d| !d.has_break).collect();
    assert_eq!(singles.len(), 2);
    assert!(singles
        .iter()
        .any(|d| d.text.as_deref() == Some("She asked \"Are you listening?\" I think.")));
}

// ============================================================================
// Pruning
// ============================================================================

#[tokio::test]
async fn test_prune_drops_ids_removed_from_source() {
    let server = MockServer::start().await;
    mount_csv(&server, "alpha\nbeta\n").await;

    let store = Arc::new(MemoryStore::new());
    let gone = JokeId::from_text("deleted joke");
    let kept = JokeId::from_text("alpha");
    seed_seen(&store, &[gone.clone(), kept.clone()]);

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    assert!(!engine.is_seen(&gone));
    assert!(engine.is_seen(&kept));
    assert_eq!(stored_seen(&store), vec![kept]);
    assert_eq!(engine.progress(), Progress { seen: 1, total: 2 });
}

#[tokio::test]
async fn test_legacy_seen_array_is_honoured() {
    let server = MockServer::start().await;
    mount_csv(&server, "alpha\nbeta\n").await;

    let store = Arc::new(MemoryStore::new());
    let alpha = JokeId::from_text("alpha");
    jokebox::storage::KeyValueStore::set(
        store.as_ref(),
        super::fixtures::SEEN_KEY,
        &format!("[\"{alpha}\"]"),
    )
    .unwrap();

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    let next = engine.get_next().unwrap();
    assert_eq!(next.id, JokeId::from_text("beta"));
}

// ============================================================================
// Cache lifecycle
// ============================================================================

#[tokio::test]
async fn test_fetch_writes_cache_envelope() {
    let server = MockServer::start().await;
    mount_csv(&server, FOUR_JOKES_CSV).await;

    let store = Arc::new(MemoryStore::new());
    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    let envelope = stored_cache(&store).expect("cache written");
    assert_eq!(envelope.jokes.len(), 4);
    assert_eq!(envelope.jokes, engine.jokes());
}

#[tokio::test]
async fn test_fresh_cache_skips_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote joke\n"))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    seed_cache(&store, &["cached one", "cached two"], Duration::from_secs(60));

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.jokes().len(), 2);
    assert_eq!(engine.jokes()[0].text, "cached one");
}

#[tokio::test]
async fn test_expired_cache_is_never_adopted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote joke\n"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    seed_cache(&store, &["stale one"], Duration::from_secs(2 * 3600));

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    let texts: Vec<_> = engine.jokes().iter().map(|j| j.text.as_str()).collect();
    assert_eq!(texts, vec!["remote joke"]);
    assert_eq!(stored_cache(&store).unwrap().jokes[0].text, "remote joke");
}

#[tokio::test]
async fn test_empty_fresh_cache_is_not_adopted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("remote joke\n"))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    seed_cache(&store, &[], Duration::ZERO);

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    assert_eq!(engine.jokes().len(), 1);
}

#[tokio::test]
async fn test_refresh_bypasses_fresh_cache() {
    let server = MockServer::start().await;
    mount_csv(&server, "new one\nnew two\nnew three\n").await;

    let store = Arc::new(MemoryStore::new());
    seed_cache(&store, &["cached"], Duration::from_secs(1));

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();
    assert_eq!(engine.jokes().len(), 1);

    engine.refresh().await.unwrap();
    assert_eq!(engine.jokes().len(), 3);
    assert_eq!(stored_cache(&store).unwrap().jokes.len(), 3);
}

#[tokio::test]
async fn test_refresh_before_init_keeps_stored_seen_set() {
    let server = MockServer::start().await;
    mount_csv(&server, "a\nb\nc\n").await;

    let store = Arc::new(MemoryStore::new());
    let a = JokeId::from_text("a");
    let b = JokeId::from_text("b");
    seed_seen(&store, &[a.clone(), b.clone()]);

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.refresh().await.unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.progress(), Progress { seen: 2, total: 3 });

    let next = engine.get_next().unwrap();
    assert_eq!(next.id, JokeId::from_text("c"));

    let persisted: HashSet<JokeId> = stored_seen(&store).into_iter().collect();
    let expected: HashSet<JokeId> = [a, b, next.id].into_iter().collect();
    assert_eq!(persisted, expected);
}
