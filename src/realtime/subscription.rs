//! # Subscriptions
//!
//! A subscription registers a listener on a collection's change feed and
//! funnels accepted documents through a bounded [`SubscriptionQueue`].
//! Closing (or dropping) the subscription deregisters the listener and
//! releases a waiting consumer.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use serde_json::Value;
use uuid::Uuid;

use super::errors::{RealtimeError, RealtimeResult};
use super::event::ChangeKind;
use super::feed::{ChangeFeed, ListenerHandle};
use super::queue::{PushOutcome, SubscriptionQueue};
use crate::observability::Logger;

type CloseHook = Box<dyn FnOnce() + Send + Sync>;

pub struct Subscription {
    id: Uuid,
    collection: String,
    queue: Arc<SubscriptionQueue>,
    handle: Option<ListenerHandle>,
    on_close: Option<CloseHook>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("collection", &self.collection)
            .field("buffered", &self.queue.len())
            .field("open", &self.handle.is_some())
            .finish()
    }
}

impl Subscription {
    /// Starts listening on `feed`. `accept` returns the projected document
    /// to enqueue, or `None` to skip it.
    pub fn open<F>(feed: &ChangeFeed, collection: impl Into<String>, capacity: usize, accept: F) -> Self
    where
        F: Fn(&Value, ChangeKind) -> Option<Value> + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let collection = collection.into();
        let queue = Arc::new(SubscriptionQueue::new(capacity));

        let listener_queue = queue.clone();
        let listener_collection = collection.clone();
        let handle = feed.listen(Arc::new(move |document: &Value, kind: ChangeKind| {
            let Some(projected) = accept(document, kind) else {
                return;
            };
            if listener_queue.push(projected) == PushOutcome::Dropped {
                let subscription = id.to_string();
                let key = document.get("_key").and_then(Value::as_str).unwrap_or("");
                Logger::warn(
                    "SUBSCRIPTION_DROPPED_DOC",
                    &[
                        ("collection", listener_collection.as_str()),
                        ("key", key),
                        ("subscription", subscription.as_str()),
                    ],
                );
            }
        }));

        let subscription = id.to_string();
        Logger::info(
            "SUBSCRIPTION_OPENED",
            &[("collection", collection.as_str()), ("subscription", subscription.as_str())],
        );

        Self {
            id,
            collection,
            queue,
            handle: Some(handle),
            on_close: None,
        }
    }

    /// Runs `hook` once when the subscription closes
    pub fn on_close(mut self, hook: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Documents waiting to be consumed
    pub fn buffered(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Next document; `None` after close
    pub async fn next(&self) -> Option<Value> {
        self.queue.next().await
    }

    pub async fn recv(&self) -> RealtimeResult<Value> {
        self.next().await.ok_or(RealtimeError::SubscriptionClosed)
    }

    /// Deregisters the listener and terminates the queue. Idempotent.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        drop(handle);
        self.queue.close();
        if let Some(hook) = self.on_close.take() {
            hook();
        }
        let subscription = self.id.to_string();
        Logger::info(
            "SUBSCRIPTION_CLOSED",
            &[
                ("collection", self.collection.as_str()),
                ("subscription", subscription.as_str()),
            ],
        );
    }

    /// Adapts the subscription into a stream that ends on close
    pub fn into_stream(self) -> impl Stream<Item = Value> + Send {
        stream::unfold(self, |subscription| async move {
            let document = subscription.next().await?;
            Some((document, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
