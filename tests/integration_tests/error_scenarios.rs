//! Error scenario integration tests
//!
//! Tests failure modes and how the engine recovers from them:
//! 1. HTTP error responses with retry
//! 2. Empty export bodies
//! 3. Retry exhaustion and the failed state
//! 4. Broken or corrupt persistent storage

use jokebox::engine::EngineState;
use jokebox::storage::{KeyValueStore, MemoryStore};
use jokebox::utils::error::{FetchError, JokeError};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{
    engine, mount_csv, stored_cache, FailingStore, RecordingSleep, CACHE_KEY, FOUR_JOKES_CSV,
    SEEN_KEY,
};

// ============================================================================
// Retry Tests
// ============================================================================

#[tokio::test]
async fn test_two_failures_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FOUR_JOKES_CSV))
        .mount(&server)
        .await;

    let sleep = RecordingSleep::default();
    let mut engine = engine(&server, MemoryStore::new(), sleep.clone());

    engine.init().await.expect("third attempt succeeds");

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.jokes().len(), 4);
    assert_eq!(sleep.calls(), vec![Duration::from_millis(1000); 2]);
}

#[tokio::test]
async fn test_empty_body_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("\n\n"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally a joke\n"))
        .mount(&server)
        .await;

    let sleep = RecordingSleep::default();
    let mut engine = engine(&server, MemoryStore::new(), sleep.clone());

    engine.init().await.unwrap();
    assert_eq!(engine.jokes()[0].text, "finally a joke");
    assert_eq!(sleep.calls().len(), 1);
}

#[tokio::test]
async fn test_retries_exhausted_reports_network_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let sleep = RecordingSleep::default();
    let store = Arc::new(MemoryStore::new());
    let mut engine = engine(&server, Arc::clone(&store), sleep.clone());

    let err = engine.init().await.unwrap_err();

    match &err {
        JokeError::Network { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(last, FetchError::Status(503)));
        }
        other => panic!("Expected network error, got: {other:?}"),
    }
    assert!(!err.user_message().is_empty());
    assert_eq!(engine.state(), EngineState::Failed);
    assert!(engine.get_next().is_none());
    assert!(stored_cache(&store).is_none());
    assert_eq!(sleep.calls().len(), 2);
}

#[tokio::test]
async fn test_undecodable_body_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x66, 0x6f, 0xff, 0xfe]))
        .expect(1)
        .mount(&server)
        .await;

    let sleep = RecordingSleep::default();
    let mut engine = engine(&server, MemoryStore::new(), sleep.clone());

    let err = engine.init().await.unwrap_err();

    match &err {
        JokeError::Network { attempts, last } => {
            assert_eq!(*attempts, 1);
            assert!(matches!(last, FetchError::Decode(_)));
        }
        other => panic!("Expected network error, got: {other:?}"),
    }
    assert!(sleep.calls().is_empty());
    assert_eq!(engine.state(), EngineState::Failed);
}

#[tokio::test]
async fn test_always_empty_reports_empty_result() {
    let server = MockServer::start().await;
    mount_csv(&server, "   \n\"\"\n").await;

    let mut engine = engine(&server, MemoryStore::new(), RecordingSleep::default());
    let err = engine.init().await.unwrap_err();

    assert!(matches!(err, JokeError::EmptyResult { attempts: 3 }));
}

#[tokio::test]
async fn test_init_after_failure_can_recover() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FOUR_JOKES_CSV))
        .mount(&server)
        .await;

    let mut engine = engine(&server, MemoryStore::new(), RecordingSleep::default());
    assert!(engine.init().await.is_err());
    assert_eq!(engine.state(), EngineState::Failed);

    engine.init().await.unwrap();
    assert_eq!(engine.state(), EngineState::Ready);
    assert!(engine.get_next().is_some());
}

#[tokio::test]
async fn test_failed_refresh_keeps_current_jokes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FOUR_JOKES_CSV))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut engine = engine(&server, MemoryStore::new(), RecordingSleep::default());
    engine.init().await.unwrap();

    assert!(engine.refresh().await.is_err());
    assert_eq!(engine.jokes().len(), 4);
    assert_eq!(engine.state(), EngineState::Ready);
}

// ============================================================================
// Storage Tests
// ============================================================================

#[tokio::test]
async fn test_failing_store_does_not_break_rotation() {
    let server = MockServer::start().await;
    mount_csv(&server, FOUR_JOKES_CSV).await;

    let mut engine = engine(&server, FailingStore, RecordingSleep::default());
    engine.init().await.unwrap();

    for n in 1..=4 {
        let delivery = engine.get_next().unwrap();
        assert_eq!(delivery.progress.seen, n);
    }
}

#[tokio::test]
async fn test_corrupt_records_are_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FOUR_JOKES_CSV))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(SEEN_KEY, "{not json").unwrap();
    store.set(CACHE_KEY, r#"{"jokes":"oops","timestamp":"yesterday"}"#).unwrap();

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    assert_eq!(engine.progress().seen, 0);
    assert_eq!(engine.jokes().len(), 4);
    assert_eq!(stored_cache(&store).unwrap().jokes.len(), 4);
}

#[tokio::test]
async fn test_future_schema_version_is_discarded() {
    let server = MockServer::start().await;
    mount_csv(&server, "only joke\n").await;

    let store = Arc::new(MemoryStore::new());
    store
        .set(SEEN_KEY, r#"{"version":99,"ids":["whatever"]}"#)
        .unwrap();

    let mut engine = engine(&server, Arc::clone(&store), RecordingSleep::default());
    engine.init().await.unwrap();

    assert_eq!(engine.progress().seen, 0);
}
