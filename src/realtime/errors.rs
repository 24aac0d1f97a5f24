//! # Real-Time Errors

use thiserror::Error;

/// Result type for real-time operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Real-time errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    /// Subscription was closed
    #[error("Subscription closed")]
    SubscriptionClosed,

    /// Change event names a collection nobody serves
    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    /// Upstream change feed ended
    #[error("Change feed closed")]
    FeedClosed,
}

impl RealtimeError {
    pub fn code(&self) -> &'static str {
        match self {
            RealtimeError::SubscriptionClosed => "LQ_SUBSCRIPTION_CLOSED",
            RealtimeError::UnknownCollection(_) => "LQ_UNKNOWN_COLLECTION",
            RealtimeError::FeedClosed => "LQ_FEED_CLOSED",
        }
    }
}
