//! Subscription Tests
//!
//! Live views over a collection's change feed:
//! - At most the queue capacity is buffered; overflow is dropped
//! - Only matching, accessible documents are delivered, projected
//! - Closing releases waiting consumers and deregisters the listener

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{collection, ledger, ScriptedDriver};
use futures_util::StreamExt;
use ledgerq::collection::{AccessRights, EngineConfig, QueryError};
use ledgerq::filter::FieldSelection;
use ledgerq::realtime::{ChangeKind, PushOutcome, SubscriptionQueue};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn messages_collection() -> Arc<ledgerq::collection::Collection> {
    let data = ledger(&ScriptedDriver::new(), &ScriptedDriver::new(), EngineConfig::default());
    collection(&data, "messages")
}

// =============================================================================
// Bounded Buffering
// =============================================================================

/// Fifteen matches with no consumer leave the first ten buffered, in order.
#[tokio::test]
async fn test_overflow_is_dropped() {
    let messages = messages_collection();
    let subscription = messages
        .subscribe(&json!({}), &[], &AccessRights::unrestricted())
        .unwrap();

    for i in 0..15 {
        messages.on_document(&json!({"_key": format!("m{}", i)}), ChangeKind::Insert);
    }
    assert_eq!(subscription.buffered(), 10);

    for i in 0..10 {
        let document = subscription.next().await.unwrap();
        assert_eq!(document["_key"], format!("m{}", i));
    }
    assert_eq!(subscription.buffered(), 0);
}

/// The configured capacity applies to every subscription.
#[tokio::test]
async fn test_configured_capacity() {
    let config = EngineConfig {
        subscription_queue_capacity: 2,
        ..EngineConfig::default()
    };
    let data = ledger(&ScriptedDriver::new(), &ScriptedDriver::new(), config);
    let accounts = collection(&data, "accounts");
    let subscription = accounts
        .subscribe(&json!({}), &[], &AccessRights::unrestricted())
        .unwrap();

    for key in ["0:a", "0:b", "0:c"] {
        accounts.on_document(&json!({"_key": key}), ChangeKind::Update);
    }
    assert_eq!(subscription.buffered(), 2);
}

/// Consumers that give up waiting do not hold on to queue capacity.
#[tokio::test]
async fn test_abandoned_waits_do_not_silence_subscription() {
    let messages = messages_collection();
    let subscription = messages
        .subscribe(&json!({}), &[], &AccessRights::unrestricted())
        .unwrap();

    for _ in 0..10 {
        let waited = tokio::time::timeout(Duration::from_millis(1), subscription.next()).await;
        assert!(waited.is_err());
    }
    for i in 0..5 {
        messages.on_document(&json!({"_key": format!("m{}", i)}), ChangeKind::Insert);
    }

    assert_eq!(subscription.buffered(), 5);
    assert_eq!(subscription.next().await.unwrap()["_key"], "m0");
}

/// Waiting takers count toward capacity and receive documents directly.
#[tokio::test]
async fn test_waiting_taker_gets_document() {
    let queue = Arc::new(SubscriptionQueue::new(1));
    let consumer = queue.clone();
    let task = tokio::spawn(async move { consumer.next().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(queue.push(json!({"_key": "first"})), PushOutcome::Delivered);
    assert_eq!(queue.push(json!({"_key": "extra"})), PushOutcome::Buffered);
    assert_eq!(queue.push(json!({"_key": "overflow"})), PushOutcome::Dropped);
    assert_eq!(task.await.unwrap(), Some(json!({"_key": "first"})));
}

// =============================================================================
// Filtering and Projection
// =============================================================================

/// Documents failing the filter or the access check are skipped.
#[tokio::test]
async fn test_filter_and_access() {
    let messages = messages_collection();
    let subscription = messages
        .subscribe(
            &json!({"msg_type_name": {"eq": "Internal"}}),
            &FieldSelection::parse("src dst msg_type_name").unwrap(),
            &AccessRights::restricted(["0:a"]),
        )
        .unwrap();

    messages.on_document(&json!({"_key": "m1", "msg_type": 1, "src": "0:a"}), ChangeKind::Insert);
    messages.on_document(&json!({"_key": "m2", "msg_type": 0, "src": "0:x"}), ChangeKind::Insert);
    messages.on_document(
        &json!({"_key": "m3", "msg_type": 0, "src": "0:x", "dst": "0:a", "value": "0"}),
        ChangeKind::Insert,
    );

    assert_eq!(subscription.buffered(), 1);
    assert_eq!(
        subscription.next().await.unwrap(),
        json!({"_key": "m3", "msg_type": 0, "src": "0:x", "dst": "0:a"})
    );
}

/// A bad filter is rejected when subscribing, not when documents arrive.
#[test]
fn test_invalid_filter_rejected_up_front() {
    let messages = messages_collection();
    let result = messages.subscribe(&json!({"nonsense": {"eq": 1}}), &[], &AccessRights::unrestricted());
    assert!(matches!(result, Err(QueryError::Filter(_))));
    assert_eq!(messages.feed().listener_count(), 0);
    assert_eq!(messages.stats().active_subscriptions, 0);

    let denied = messages.subscribe(&json!({}), &[], &AccessRights::denied());
    assert!(matches!(denied, Err(QueryError::AccessDenied)));
}

// =============================================================================
// Closing
// =============================================================================

/// Closing discards the buffer, ends the consumer and the gauge.
#[tokio::test]
async fn test_close() {
    let messages = messages_collection();
    let mut subscription = messages
        .subscribe(&json!({}), &[], &AccessRights::unrestricted())
        .unwrap();
    assert_eq!(messages.stats().active_subscriptions, 1);
    assert_eq!(messages.feed().listener_count(), 1);

    messages.on_document(&json!({"_key": "m1"}), ChangeKind::Insert);
    subscription.close();
    subscription.close();

    assert!(subscription.is_closed());
    assert_eq!(subscription.next().await, None);
    assert_eq!(messages.feed().listener_count(), 0);
    assert_eq!(messages.stats().active_subscriptions, 0);
}

/// A consumer already waiting is released with `None`.
#[tokio::test]
async fn test_close_releases_waiting_consumer() {
    let queue = Arc::new(SubscriptionQueue::new(10));
    let consumer = queue.clone();
    let task = tokio::spawn(async move { consumer.next().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.close();

    assert_eq!(task.await.unwrap(), None);
    assert_eq!(queue.push(json!({"_key": "late"})), PushOutcome::Closed);
}

/// Dropping the subscription has the same effect as closing it.
#[tokio::test]
async fn test_drop_closes() {
    let messages = messages_collection();
    let subscription = messages
        .subscribe(&json!({}), &[], &AccessRights::unrestricted())
        .unwrap();
    drop(subscription);
    assert_eq!(messages.feed().listener_count(), 0);
    assert_eq!(messages.stats().active_subscriptions, 0);
    assert_eq!(messages.on_document(&json!({"_key": "m1"}), ChangeKind::Insert), 0);
}

// =============================================================================
// Streams
// =============================================================================

/// The stream yields documents as they arrive.
#[tokio::test]
async fn test_into_stream() {
    let messages = messages_collection();
    let subscription = messages
        .subscribe(&json!({"bounce": {"eq": true}}), &[], &AccessRights::unrestricted())
        .unwrap();

    messages.on_document(&json!({"_key": "m1", "bounce": true}), ChangeKind::Insert);
    messages.on_document(&json!({"_key": "m2", "bounce": false}), ChangeKind::Insert);
    messages.on_document(&json!({"_key": "m3", "bounce": true}), ChangeKind::Update);

    let keys: Vec<String> = subscription
        .into_stream()
        .take(2)
        .map(|document| document["_key"].as_str().unwrap_or_default().to_string())
        .collect()
        .await;
    assert_eq!(keys, vec!["m1", "m3"]);
    assert_eq!(messages.stats().active_subscriptions, 0);
}
