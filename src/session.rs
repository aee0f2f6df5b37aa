//! Session module
//!
//! This module provides the public session surface: opening and closing a
//! session, publishers, subscriptions and queries.

/// Session implementation
pub mod async_session;
pub mod config;
/// Session error types
pub mod error;
/// Publishers for concrete keys
pub mod publisher;
/// Subscription handles
pub mod subscriber;

// Re-export commonly used types for convenience
pub use async_session::{GetOptions, Session, SessionInfo};
pub use config::{ConfigError, Mode, SessionConfig, SessionSettings};
pub use error::{ErrorKind, SessionError};
pub use publisher::Publisher;
pub use subscriber::Subscription;
