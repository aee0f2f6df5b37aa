//! Subscription routing and sample dispatch
//!
//! This module owns the per-session registry (publisher cache, ordered
//! subscription table, sample log), routes each published sample to the
//! matching subscriptions and runs one ordered delivery queue per
//! subscription.

/// Dispatch error types
pub mod error;
pub(crate) mod dispatcher;
pub(crate) mod registry;
pub(crate) mod sample_log;
/// Ordered subscription table
pub mod subscription_router;

// Re-export commonly used types for convenience
pub use error::RouterError;
pub use subscription_router::{SubscriptionId, SubscriptionRouter};

// Re-export for internal crate usage only
pub(crate) use dispatcher::DrainingWorker;
pub(crate) use registry::{PublisherState, Registry};
