//! # keyexpr-pubsub
//!
//! Topic-addressed publish/subscribe sessions. Producers publish byte
//! payloads under hierarchical, `/`-delimited keys; consumers subscribe with
//! wildcard patterns and receive only the samples whose key matches.
//!
//! ## Features
//!
//! - **Wildcard patterns**: `*` matches one segment, `**` matches any number
//! - **Session-scoped registry**: every publisher and subscription belongs to
//!   one session and is released when it closes
//! - **Concurrent ordered dispatch**: each subscription has its own queue, so a
//!   slow or panicking handler never stalls the publisher or other subscribers
//! - **Local queries**: samples published in the session can be queried back
//! - **Pluggable transport**: a narrow [`Transport`] port for networked
//!   operation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use keyexpr_pubsub::{Session, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open(SessionConfig::default()).await?;
//!
//!     let _subscription = session.subscribe("robot/*/status", |sample| {
//!         println!("{} -> {}", sample.key(), sample);
//!     })?;
//!
//!     let publisher = session.publisher("robot/arm/status")?;
//!     publisher.put("ready")?;
//!
//!     let history = session.query("robot/**")?;
//!     assert_eq!(history.len(), 1);
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Pattern Matching
//!
//! - `a/*` matches `a/b` but not `a/b/c`
//! - `a/**` matches `a/b` and `a/b/c/d`, but not `a` itself
//! - `**` alone matches every key
//!
//! Publication keys must be concrete: `*` and `**` segments are rejected by
//! [`Session::publisher`].

#![warn(missing_docs)]

pub mod dispatch;
pub mod key_expr;
pub mod sample;
pub mod session;
pub mod transport;

// === Core Public API ===
pub use key_expr::{KeyExpr, KeyExprError, matches};
pub use sample::{Handler, Sample, SampleKind};
pub use session::{
	ConfigError, ErrorKind, GetOptions, Mode, Publisher, Session,
	SessionConfig, SessionError, SessionInfo, SessionSettings, Subscription,
};
// === Transport port ===
pub use transport::{
	SampleSink, Transport, TransportConnector, TransportError,
	TransportSubscriptionId,
};
pub use dispatch::SubscriptionId;

/// Result type alias for operations that may fail with SessionError
pub type Result<T> = std::result::Result<T, SessionError>;

/// Prelude module for convenient imports
///
/// ```rust
/// use keyexpr_pubsub::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		GetOptions, KeyExpr, Publisher, Result, Sample, SampleKind, Session,
		SessionConfig, SessionError, Subscription,
	};
}

/// Error types used throughout the library
///
/// ```rust
/// use keyexpr_pubsub::errors::*;
/// ```
pub mod errors {
	pub use crate::dispatch::RouterError;
	pub use crate::{
		ConfigError, ErrorKind, KeyExprError, SessionError, TransportError,
	};
}
