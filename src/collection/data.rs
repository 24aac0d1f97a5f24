//! Collection registry
//!
//! Routes change-feed events to the owning collection and drives periodic
//! index catalog refreshes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::collection::Collection;
use super::errors::{QueryError, QueryResult};
use crate::observability::Logger;
use crate::realtime::{ChangeEvent, RealtimeError, RealtimeResult};

/// All collections served by one process
#[derive(Debug, Default)]
pub struct LedgerData {
    collections: BTreeMap<String, Arc<Collection>>,
}

impl LedgerData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collection, replacing any previous one of the same name
    pub fn add(&mut self, collection: Collection) -> Arc<Collection> {
        let collection = Arc::new(collection);
        self.collections
            .insert(collection.name().to_string(), collection.clone());
        collection
    }

    pub fn collection(&self, name: &str) -> QueryResult<Arc<Collection>> {
        self.collections
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::UnknownCollection(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Hands one change event to its collection. Returns the number of
    /// listeners that saw it.
    pub fn dispatch(&self, event: &ChangeEvent) -> RealtimeResult<usize> {
        match self.collections.get(&event.collection) {
            Some(collection) => Ok(collection.on_document(&event.document, event.kind)),
            None => {
                let key = event.key().unwrap_or("");
                Logger::warn(
                    "CHANGE_FEED_UNKNOWN_COLLECTION",
                    &[("collection", event.collection.as_str()), ("key", key)],
                );
                Err(RealtimeError::UnknownCollection(event.collection.clone()))
            }
        }
    }

    /// Pumps events from `receiver` until the sending side closes
    pub fn spawn_change_feed(self: &Arc<Self>, mut receiver: mpsc::Receiver<ChangeEvent>) -> JoinHandle<()> {
        let data = self.clone();
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let _ = data.dispatch(&event);
            }
            let error = RealtimeError::FeedClosed;
            Logger::info("CHANGE_FEED_CLOSED", &[("code", error.code())]);
        })
    }

    /// Refreshes every collection's index catalog. Returns how many changed;
    /// failures are logged by the collection and skipped.
    pub async fn refresh_indexes(&self) -> usize {
        let mut changed = 0;
        for collection in self.collections.values() {
            if let Ok(true) = collection.refresh_indexes().await {
                changed += 1;
            }
        }
        changed
    }

    /// Refreshes index catalogs every `interval` until the returned token
    /// is cancelled. The first refresh runs immediately.
    pub fn spawn_index_refresh(self: &Arc<Self>, interval: Duration) -> CancellationToken {
        let token = CancellationToken::new();
        let stop = token.clone();
        let data = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = ticker.tick() => {
                        data.refresh_indexes().await;
                    }
                }
            }
        });
        token
    }
}
