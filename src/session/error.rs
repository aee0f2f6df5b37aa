use thiserror::Error;

use super::config::ConfigError;
use crate::key_expr::{KeyExpr, KeyExprError};
use crate::transport::TransportError;

/// Coarse classification of [`SessionError`].
///
/// Lets callers branch on the failure without knowing transport details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Operation attempted after close. Recoverable.
	SessionClosed,
	/// Malformed key or pattern. Caller bug, not retried.
	InvalidKeyExpr,
	/// Configuration or environment rejected before any connection attempt
	InvalidConfig,
	/// Transport could not be established
	ConnectionFailed,
	/// Transport rejected a publication
	PublishFailed,
	/// Transport rejected a subscription
	SubscribeFailed,
	/// Transport rejected or abandoned a query
	QueryFailed,
	/// A bounded wait elapsed
	Timeout,
}

/// Errors returned by session, publisher and subscription operations
#[derive(Debug, Error)]
pub enum SessionError {
	/// The session (or the handle) is closed
	#[error("session closed")]
	SessionClosed,

	/// Key or pattern failed validation
	#[error("invalid key expression: {0}")]
	InvalidKeyExpr(#[from] KeyExprError),

	/// Configuration failed validation
	#[error("invalid config: {0}")]
	InvalidConfig(#[from] ConfigError),

	/// The session was opened outside a tokio runtime
	#[error("no tokio runtime available to run the session")]
	RuntimeUnavailable,

	/// Transport could not be established
	#[error("connection failed: {0}")]
	ConnectionFailed(#[source] TransportError),

	/// Transport rejected a publisher declaration or a publication
	#[error("publish failed for '{key}': {source}")]
	PublishFailed {
		/// Key being published
		key: KeyExpr,
		/// Underlying transport failure
		#[source]
		source: TransportError,
	},

	/// Transport rejected a subscription
	#[error("subscribe failed for '{pattern}': {source}")]
	SubscribeFailed {
		/// Pattern being subscribed
		pattern: KeyExpr,
		/// Underlying transport failure
		#[source]
		source: TransportError,
	},

	/// Transport rejected a query
	#[error("query failed for '{pattern}': {source}")]
	QueryFailed {
		/// Queried pattern
		pattern: KeyExpr,
		/// Underlying transport failure
		#[source]
		source: TransportError,
	},

	/// Caller cancelled a query before replies were collected
	#[error("query for '{pattern}' cancelled")]
	QueryCancelled {
		/// Queried pattern
		pattern: KeyExpr,
	},

	/// A bounded wait elapsed
	#[error("operation timed out after {timeout_millis}ms")]
	Timeout {
		/// Deadline that elapsed
		timeout_millis: u64,
	},
}

impl SessionError {
	/// Classifies this error.
	pub fn kind(&self) -> ErrorKind {
		match self {
			| SessionError::SessionClosed => ErrorKind::SessionClosed,
			| SessionError::InvalidKeyExpr(_) => ErrorKind::InvalidKeyExpr,
			| SessionError::InvalidConfig(_)
			| SessionError::RuntimeUnavailable => ErrorKind::InvalidConfig,
			| SessionError::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
			| SessionError::PublishFailed { .. } => ErrorKind::PublishFailed,
			| SessionError::SubscribeFailed { .. } => ErrorKind::SubscribeFailed,
			| SessionError::QueryFailed { .. }
			| SessionError::QueryCancelled { .. } => ErrorKind::QueryFailed,
			| SessionError::Timeout { .. } => ErrorKind::Timeout,
		}
	}

	/// Native transport code, if the failure came from the transport.
	pub fn transport_code(&self) -> Option<i32> {
		match self {
			| SessionError::ConnectionFailed(source)
			| SessionError::PublishFailed { source, .. }
			| SessionError::SubscribeFailed { source, .. }
			| SessionError::QueryFailed { source, .. } => Some(source.code),
			| _ => None,
		}
	}

	pub(crate) fn publish_failed(key: &KeyExpr, source: TransportError) -> Self {
		Self::PublishFailed {
			key: key.clone(),
			source,
		}
	}

	pub(crate) fn subscribe_failed(
		pattern: &KeyExpr,
		source: TransportError,
	) -> Self {
		Self::SubscribeFailed {
			pattern: pattern.clone(),
			source,
		}
	}

	pub(crate) fn query_failed(pattern: &KeyExpr, source: TransportError) -> Self {
		Self::QueryFailed {
			pattern: pattern.clone(),
			source,
		}
	}

	pub(crate) fn timeout(timeout: std::time::Duration) -> Self {
		Self::Timeout {
			timeout_millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
		}
	}
}

impl From<std::convert::Infallible> for SessionError {
	fn from(never: std::convert::Infallible) -> Self {
		match never {}
	}
}
