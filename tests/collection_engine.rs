//! Collection Engine Tests
//!
//! End-to-end behavior of ledger collections over scripted connections:
//! - Routing between the fast and slow connections
//! - Wait-for queries resolved by poll, listener, timer or cancellation
//! - Driver failures surfaced as unavailable or execution errors
//! - Change events routed to the owning collection

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{collection, ledger, ScriptedDriver};
use ledgerq::collection::{
    AccessGuard, AccessRights, Collection, DriverError, EngineConfig, QueryError, QueryRequest,
    SlowQueriesMode,
};
use ledgerq::filter::FieldSelection;
use ledgerq::realtime::{ChangeEvent, ChangeKind};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Helper Functions
// =============================================================================

fn drivers() -> (Arc<ScriptedDriver>, Arc<ScriptedDriver>) {
    (ScriptedDriver::new(), ScriptedDriver::new())
}

fn config_with_poll(interval_ms: u64) -> EngineConfig {
    EngineConfig {
        wait_poll_interval_ms: interval_ms,
        ..EngineConfig::default()
    }
}

async fn run(messages: &Collection, request: &QueryRequest) -> Result<Vec<Value>, QueryError> {
    messages
        .query(request, &AccessRights::unrestricted(), &CancellationToken::new())
        .await
}

/// Waits until the collection's feed has `count` listeners
async fn wait_for_listeners(collection: &Collection, count: usize) {
    for _ in 0..200 {
        if collection.feed().listener_count() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("listener count never reached {}", count);
}

// =============================================================================
// Routing
// =============================================================================

/// An index-backed filter runs once on the fast connection.
#[tokio::test]
async fn test_fast_query_uses_fast_connection() {
    let (fast, slow) = drivers();
    fast.push_response(Ok(vec![json!({"_key": "m1"})]));
    let data = ledger(&fast, &slow, EngineConfig::default());
    let messages = collection(&data, "messages");

    let docs = run(&messages, &QueryRequest::new(json!({"src": {"eq": "0:a"}})))
        .await
        .unwrap();

    assert_eq!(docs, vec![json!({"_key": "m1"})]);
    let calls = fast.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0,
        "FOR doc IN messages FILTER doc.src == @v1 LIMIT 50 RETURN { _key: doc._key }"
    );
    assert_eq!(slow.call_count(), 0);
}

/// Each slow-query mode routes or rejects an unindexed filter.
#[tokio::test]
async fn test_slow_query_modes() {
    let request = QueryRequest::new(json!({"bounce": {"eq": true}}));

    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, EngineConfig::default());
    run(&collection(&data, "messages"), &request).await.unwrap();
    assert_eq!((fast.call_count(), slow.call_count()), (0, 1));

    let (fast, slow) = drivers();
    let config = EngineConfig {
        slow_queries: SlowQueriesMode::Enable,
        ..EngineConfig::default()
    };
    let data = ledger(&fast, &slow, config);
    run(&collection(&data, "messages"), &request).await.unwrap();
    assert_eq!((fast.call_count(), slow.call_count()), (1, 0));

    let (fast, slow) = drivers();
    let config = EngineConfig {
        slow_queries: SlowQueriesMode::Disable,
        ..EngineConfig::default()
    };
    let data = ledger(&fast, &slow, config);
    let messages = collection(&data, "messages");
    let err = run(&messages, &request).await.unwrap_err();
    assert!(matches!(err, QueryError::SlowQueriesDisabled(ref reason) if reason.contains("bounce")));
    assert_eq!(fast.call_count() + slow.call_count(), 0);
    assert_eq!(messages.stats().slow_queries, 1);
}

/// A restricted caller on a collection without account fields sees nothing,
/// and the database is never asked.
#[tokio::test]
async fn test_statically_false_skips_database() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, EngineConfig::default());
    let blocks = collection(&data, "blocks");

    let docs = blocks
        .query(
            &QueryRequest::new(json!({"seq_no": {"eq": 1}})),
            &AccessRights::restricted(["0:a"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(docs.is_empty());
    assert_eq!(fast.call_count() + slow.call_count(), 0);
}

/// Restricted callers get the account condition AND'ed onto their filter.
#[tokio::test]
async fn test_restricted_query_binds_accounts() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, EngineConfig::default());
    let transactions = collection(&data, "transactions");

    transactions
        .query(
            &QueryRequest::new(json!({"now": {"gt": 100}})),
            &AccessRights::restricted(["0:a", "0:b"]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let (text, params) = fast.calls().remove(0);
    assert!(text.contains("(doc.now > @v1) AND (doc.account_addr IN @v2)"));
    assert_eq!(params["v2"], json!(["0:a", "0:b"]));
}

// =============================================================================
// Driver Failures
// =============================================================================

/// Transport faults are masked, query failures keep their message.
#[tokio::test]
async fn test_driver_errors() {
    let (fast, slow) = drivers();
    fast.push_response(Err(DriverError::transport("connection reset by peer")));
    fast.push_response(Err(DriverError::query("AQL: syntax error")));
    let data = ledger(&fast, &slow, EngineConfig::default());
    let messages = collection(&data, "messages");
    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}}));

    let first = run(&messages, &request).await.unwrap_err();
    assert!(matches!(first, QueryError::Unavailable));
    assert!(!first.is_rejection());

    let second = run(&messages, &request).await.unwrap_err();
    assert!(matches!(second, QueryError::Execution(ref m) if m.contains("syntax error")));
    assert_eq!(messages.stats().failed_queries, 2);
}

// =============================================================================
// Wait-For Queries
// =============================================================================

/// A later poll finds the document.
#[tokio::test]
async fn test_wait_for_resolved_by_poll() {
    let fast = ScriptedDriver::with_fallback(vec![json!({"_key": "m1", "src": "0:a"})]);
    let slow = ScriptedDriver::new();
    fast.push_response(Ok(vec![]));
    let data = ledger(&fast, &slow, config_with_poll(10));
    let messages = collection(&data, "messages");

    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}})).timeout_ms(5_000);
    let docs = run(&messages, &request).await.unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(fast.call_count(), 2);
    assert_eq!(messages.feed().listener_count(), 0);
}

/// A matching change-feed document wins the race and is projected.
#[tokio::test]
async fn test_wait_for_resolved_by_listener() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, config_with_poll(60_000));
    let messages = collection(&data, "messages");

    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}}))
        .timeout_ms(30_000)
        .selection(FieldSelection::parse("src").unwrap());
    let waiting = messages.clone();
    let task = tokio::spawn(async move {
        waiting
            .query(&request, &AccessRights::unrestricted(), &CancellationToken::new())
            .await
    });

    wait_for_listeners(&messages, 1).await;
    messages.on_document(&json!({"_key": "m9", "src": "0:z"}), ChangeKind::Insert);
    messages.on_document(
        &json!({"_key": "m1", "src": "0:a", "dst": "0:b"}),
        ChangeKind::Insert,
    );

    let docs = task.await.unwrap().unwrap();
    assert_eq!(docs, vec![json!({"_key": "m1", "src": "0:a"})]);
    assert_eq!(messages.feed().listener_count(), 0);
    assert_eq!(messages.stats().active_waits, 0);

    // the poll that ran first returned the same fields
    assert!(fast.calls()[0].0.ends_with("RETURN { _key: doc._key, src: doc.src }"));
}

/// Nothing arrives before the timeout; the result is empty.
#[tokio::test]
async fn test_wait_for_resolved_by_timer() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, config_with_poll(60_000));
    let messages = collection(&data, "messages");

    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}})).timeout_ms(50);
    let docs = run(&messages, &request).await.unwrap();

    assert!(docs.is_empty());
    assert_eq!(fast.call_count(), 1);
    assert_eq!(messages.feed().listener_count(), 0);
}

/// Caller cancellation ends the wait with an empty result.
#[tokio::test]
async fn test_wait_for_resolved_by_cancel() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, config_with_poll(60_000));
    let messages = collection(&data, "messages");
    let cancel = CancellationToken::new();

    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}})).timeout_ms(30_000);
    let waiting = messages.clone();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        waiting
            .query(&request, &AccessRights::unrestricted(), &token)
            .await
    });

    wait_for_listeners(&messages, 1).await;
    cancel.cancel();

    let docs = task.await.unwrap().unwrap();
    assert!(docs.is_empty());
    assert_eq!(messages.feed().listener_count(), 0);
}

/// Once the timer or the caller ends the wait, polling stops.
#[tokio::test]
async fn test_wait_for_losers_are_torn_down() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, config_with_poll(10));
    let messages = collection(&data, "messages");

    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}})).timeout_ms(50);
    assert!(run(&messages, &request).await.unwrap().is_empty());
    let polled = fast.call_count();
    assert!(polled > 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fast.call_count(), polled);
    assert_eq!(messages.feed().listener_count(), 0);
    assert_eq!(messages.stats().active_waits, 0);

    let cancel = CancellationToken::new();
    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}})).timeout_ms(30_000);
    let waiting = messages.clone();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        waiting
            .query(&request, &AccessRights::unrestricted(), &token)
            .await
    });
    wait_for_listeners(&messages, 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();
    assert!(task.await.unwrap().unwrap().is_empty());

    let polled = fast.call_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fast.call_count(), polled);
    assert_eq!(messages.feed().listener_count(), 0);
    assert_eq!(messages.stats().active_waits, 0);
}

/// Listener matches respect access restrictions.
#[tokio::test]
async fn test_wait_for_listener_checks_access() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, config_with_poll(60_000));
    let messages = collection(&data, "messages");

    let request = QueryRequest::new(json!({})).timeout_ms(200);
    let waiting = messages.clone();
    let task = tokio::spawn(async move {
        waiting
            .query(&request, &AccessRights::restricted(["0:a"]), &CancellationToken::new())
            .await
    });

    wait_for_listeners(&messages, 1).await;
    messages.on_document(&json!({"_key": "m1", "src": "0:x", "dst": "0:y"}), ChangeKind::Insert);

    let docs = task.await.unwrap().unwrap();
    assert!(docs.is_empty());
}

// =============================================================================
// Keys and Access Keys
// =============================================================================

/// Key lookups go to the fast connection with the keys bound as one array.
#[tokio::test]
async fn test_fetch_by_keys() {
    let fast = ScriptedDriver::with_fallback(vec![json!({"_key": "t1"}), json!({"_key": "t2"})]);
    let slow = ScriptedDriver::new();
    let data = ledger(&fast, &slow, EngineConfig::default());
    let transactions = collection(&data, "transactions");

    assert!(transactions.fetch_by_keys(&[]).await.unwrap().is_empty());
    assert_eq!(fast.call_count(), 0);

    let keys = vec!["t1".to_string(), "t2".to_string()];
    let docs = transactions.fetch_by_keys(&keys).await.unwrap();
    assert_eq!(docs.len(), 2);
    let (text, params) = fast.calls().remove(0);
    assert_eq!(text, "FOR doc IN transactions FILTER doc._key IN @v1 RETURN doc");
    assert_eq!(params["v1"], json!(["t1", "t2"]));
}

/// A second, different access key poisons the whole request.
#[test]
fn test_access_guard() {
    let guard = AccessGuard::new();
    assert!(guard.check(Some("k1")).is_ok());
    assert!(guard.check(Some("k1")).is_ok());
    assert!(matches!(guard.check(Some("k2")), Err(QueryError::MultipleAccessKeys)));
    assert!(guard.check(Some("k1")).is_err());
}

/// Calls of one multiplexed request share a guard; a second key rejects
/// every operation before the database is reached.
#[tokio::test]
async fn test_multiplexed_request_rejects_second_key() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, EngineConfig::default());
    let messages = collection(&data, "messages");
    let guard = Arc::new(AccessGuard::new());
    let request = QueryRequest::new(json!({"src": {"eq": "0:a"}}));

    let first = AccessRights::unrestricted().with_access_key(&guard, Some("k1"));
    messages
        .query(&request, &first, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(fast.call_count(), 1);

    let second = AccessRights::unrestricted().with_access_key(&guard, Some("k2"));
    let err = messages
        .query(&request, &second, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::MultipleAccessKeys));

    let aggregated = messages.aggregate(&json!({}), &[], &first).await;
    assert!(matches!(aggregated, Err(QueryError::MultipleAccessKeys)));
    let subscribed = messages.subscribe(&json!({}), &[], &first);
    assert!(matches!(subscribed, Err(QueryError::MultipleAccessKeys)));

    assert_eq!(fast.call_count() + slow.call_count(), 1);
}

// =============================================================================
// Change Feed Routing
// =============================================================================

/// Events reach only the collection they name.
#[tokio::test]
async fn test_dispatch_routes_by_collection() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, EngineConfig::default());
    let accounts = collection(&data, "accounts");
    let subscription = accounts
        .subscribe(&json!({}), &[], &AccessRights::unrestricted())
        .unwrap();

    assert_eq!(data.dispatch(&ChangeEvent::insert("accounts", json!({"_key": "0:a"}))).unwrap(), 1);
    assert_eq!(data.dispatch(&ChangeEvent::insert("blocks", json!({"_key": "b1"}))).unwrap(), 0);
    assert!(data.dispatch(&ChangeEvent::insert("nowhere", json!({}))).is_err());

    assert_eq!(subscription.buffered(), 1);
    assert_eq!(accounts.stats().observed_documents, 1);
}

/// The feed pump drains the channel and stops when senders are gone.
#[tokio::test]
async fn test_change_feed_pump() {
    let (fast, slow) = drivers();
    let data = Arc::new(ledger(&fast, &slow, EngineConfig::default()));
    let messages = collection(&data, "messages");
    let subscription = messages
        .subscribe(&json!({"dst": {"eq": "0:b"}}), &[], &AccessRights::unrestricted())
        .unwrap();

    let (sender, receiver) = mpsc::channel(8);
    let pump = data.spawn_change_feed(receiver);
    sender
        .send(ChangeEvent::insert("messages", json!({"_key": "m1", "dst": "0:b"})))
        .await
        .unwrap();
    sender
        .send(ChangeEvent::update("messages", json!({"_key": "m2", "dst": "0:c"})))
        .await
        .unwrap();
    drop(sender);
    pump.await.unwrap();

    assert_eq!(subscription.next().await.unwrap()["_key"], "m1");
    assert_eq!(subscription.buffered(), 0);
}

/// A catalog refresh that adds an index turns a slow filter fast.
#[tokio::test]
async fn test_refresh_indexes() {
    let (fast, slow) = drivers();
    let data = ledger(&fast, &slow, EngineConfig::default());
    let messages = collection(&data, "messages");
    let request = QueryRequest::new(json!({"bounce": {"eq": true}}));

    run(&messages, &request).await.unwrap();
    assert_eq!(slow.call_count(), 1);

    let mut indexes = ledgerq::schema::default_indexes("messages");
    indexes.push(ledgerq::planner::IndexInfo::parse("bounce"));
    fast.set_indexes(indexes);
    assert!(messages.refresh_indexes().await.unwrap());

    run(&messages, &request).await.unwrap();
    assert_eq!(fast.call_count(), 1);
    assert_eq!(slow.call_count(), 1);
}
