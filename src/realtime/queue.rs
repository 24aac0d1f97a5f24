//! # Subscription Queue
//!
//! Bounded hand-off between the change feed (producer) and one consumer.
//! The queue holds either buffered documents or waiting takers, never both.
//! When buffered plus waiting reaches capacity, new documents are dropped.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::oneshot;

/// Default number of buffered-or-pending entries
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// What happened to a pushed document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Handed straight to a waiting consumer
    Delivered,
    /// Stored until the consumer asks for it
    Buffered,
    /// Discarded because the queue is full
    Dropped,
    /// Discarded because the queue is closed
    Closed,
}

#[derive(Debug, Default)]
struct QueueState {
    buffered: VecDeque<Value>,
    takers: VecDeque<oneshot::Sender<Option<Value>>>,
    closed: bool,
}

#[derive(Debug)]
pub struct SubscriptionQueue {
    state: Mutex<QueueState>,
    capacity: usize,
}

impl Default for SubscriptionQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl SubscriptionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            capacity,
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, document: Value) -> PushOutcome {
        let mut state = self.state();
        if state.closed {
            return PushOutcome::Closed;
        }
        // takers whose next() future was dropped
        state.takers.retain(|taker| !taker.is_closed());
        if state.buffered.len() + state.takers.len() >= self.capacity {
            return PushOutcome::Dropped;
        }
        let mut document = document;
        while let Some(taker) = state.takers.pop_front() {
            match taker.send(Some(document)) {
                Ok(()) => return PushOutcome::Delivered,
                // consumer went away; try the next one
                Err(returned) => document = returned.unwrap_or(Value::Null),
            }
        }
        state.buffered.push_back(document);
        PushOutcome::Buffered
    }

    /// Next document, or `None` once the queue is closed
    pub async fn next(&self) -> Option<Value> {
        let receiver = {
            let mut state = self.state();
            if let Some(document) = state.buffered.pop_front() {
                return Some(document);
            }
            if state.closed {
                return None;
            }
            let (sender, receiver) = oneshot::channel();
            state.takers.push_back(sender);
            receiver
        };
        receiver.await.unwrap_or(None)
    }

    /// Terminates the queue: waiting takers get `None`, buffered documents
    /// are discarded
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        state.buffered.clear();
        for taker in state.takers.drain(..) {
            let _ = taker.send(None);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Number of buffered documents
    pub fn len(&self) -> usize {
        self.state().buffered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_drops_beyond_capacity() {
        let queue = SubscriptionQueue::new(10);
        let outcomes: Vec<PushOutcome> = (0..15).map(|i| queue.push(json!(i))).collect();
        assert_eq!(queue.len(), 10);
        assert!(outcomes[..10].iter().all(|o| *o == PushOutcome::Buffered));
        assert!(outcomes[10..].iter().all(|o| *o == PushOutcome::Dropped));
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = SubscriptionQueue::new(10);
        queue.push(json!(1));
        queue.push(json!(2));
        assert_eq!(queue.next().await, Some(json!(1)));
        assert_eq!(queue.next().await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_waiting_consumer_receives_push() {
        let queue = Arc::new(SubscriptionQueue::new(10));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(queue.push(json!("doc")), PushOutcome::Delivered);
        assert_eq!(consumer.await.unwrap(), Some(json!("doc")));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_close_releases_waiting_consumer() {
        let queue = Arc::new(SubscriptionQueue::new(10));
        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();
        assert_eq!(consumer.await.unwrap(), None);
        assert_eq!(queue.push(json!(1)), PushOutcome::Closed);
        assert_eq!(queue.next().await, None);
    }

    #[tokio::test]
    async fn test_cancelled_takers_free_capacity() {
        let queue = SubscriptionQueue::new(10);
        for _ in 0..10 {
            let waited = tokio::time::timeout(Duration::from_millis(1), queue.next()).await;
            assert!(waited.is_err());
        }
        assert_eq!(queue.push(json!(1)), PushOutcome::Buffered);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next().await, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_close_discards_buffered() {
        let queue = SubscriptionQueue::new(10);
        queue.push(json!(1));
        queue.close();
        assert!(queue.is_empty());
        assert_eq!(queue.next().await, None);
    }
}
