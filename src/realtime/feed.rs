//! # Change Feed
//!
//! Per-collection multicast of observed documents to registered listeners.
//! Listeners may register and deregister while a dispatch is in progress:
//! dispatch works on a snapshot taken under the read lock and calls
//! listeners after releasing it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use uuid::Uuid;

use super::event::ChangeKind;

/// Receives documents observed on a collection's change feed
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, document: &Value, kind: ChangeKind);
}

impl<F> ChangeListener for F
where
    F: Fn(&Value, ChangeKind) + Send + Sync,
{
    fn on_change(&self, document: &Value, kind: ChangeKind) {
        self(document, kind)
    }
}

type ListenerMap = RwLock<HashMap<Uuid, Arc<dyn ChangeListener>>>;

/// Multicast of one collection's changes
#[derive(Default)]
pub struct ChangeFeed {
    listeners: Arc<ListenerMap>,
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener; it stays registered until the handle is dropped
    pub fn listen(&self, listener: Arc<dyn ChangeListener>) -> ListenerHandle {
        let id = Uuid::new_v4();
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.insert(id, listener);
        }
        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Delivers a document to every listener registered at call time.
    /// Returns the number of listeners called.
    pub fn dispatch(&self, document: &Value, kind: ChangeKind) -> usize {
        let snapshot: Vec<Arc<dyn ChangeListener>> = match self.listeners.read() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => return 0,
        };
        for listener in &snapshot {
            listener.on_change(document, kind);
        }
        snapshot.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

/// Registration token; deregisters its listener on drop
pub struct ListenerHandle {
    id: Uuid,
    listeners: Weak<ListenerMap>,
}

impl ListenerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.write() {
                listeners.remove(&self.id);
            }
        }
    }
}
