//! # Real-Time Delivery
//!
//! Change-feed multicast, bounded subscription queues and subscriptions.
//!
//! ## Architecture
//!
//! - **Feed**: one multicast per collection; listeners deregister on drop
//! - **Queue**: bounded buffer between the feed and one consumer
//! - **Subscription**: listener + queue + close hook, also usable as a stream

pub mod errors;
pub mod event;
pub mod feed;
pub mod queue;
pub mod subscription;

pub use errors::{RealtimeError, RealtimeResult};
pub use event::{ChangeEvent, ChangeKind};
pub use feed::{ChangeFeed, ChangeListener, ListenerHandle};
pub use queue::{PushOutcome, SubscriptionQueue, DEFAULT_QUEUE_CAPACITY};
pub use subscription::Subscription;
