//! Network transport port
//!
//! A session runs self-contained by default and dispatches samples locally.
//! When opened with a [`TransportConnector`], publications, subscriptions and
//! remote queries are delegated to the [`Transport`] it returns. Samples
//! arriving from the network are pushed into the subscription's
//! [`SampleSink`], so they go through the same ordered, panic-isolated
//! dispatch as local samples.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc::WeakUnboundedSender;

use crate::dispatch::SubscriptionId;
use crate::key_expr::KeyExpr;
use crate::sample::{Sample, SampleKind};
use crate::session::SessionConfig;

/// Failure reported by a transport implementation.
///
/// `code` is the native error code, kept for diagnostics only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport error {code}: {message}")]
pub struct TransportError {
	/// Native error code
	pub code: i32,
	/// Human readable description
	pub message: String,
}

impl TransportError {
	/// Code used when the connector did not answer within `connect_timeout`
	pub const CONNECT_TIMEOUT: i32 = -110;

	/// Creates a new transport error
	pub fn new(code: i32, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
		}
	}
}

/// Identifier a transport assigns to a declared subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportSubscriptionId(pub u64);

impl fmt::Display for TransportSubscriptionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TransportSubscriptionId({})", self.0)
	}
}

/// Delivery endpoint handed to [`Transport::declare_subscription`].
///
/// Holds only a weak reference to the subscription queue: once the
/// subscription or its session is closed, [`SampleSink::deliver`] returns
/// `false` and drops the sample.
#[derive(Clone)]
pub struct SampleSink {
	subscription_id: SubscriptionId,
	queue: WeakUnboundedSender<Sample>,
	active: Arc<AtomicBool>,
}

impl SampleSink {
	pub(crate) fn new(
		subscription_id: SubscriptionId,
		queue: WeakUnboundedSender<Sample>,
		active: Arc<AtomicBool>,
	) -> Self {
		Self {
			subscription_id,
			queue,
			active,
		}
	}

	/// Subscription this sink feeds.
	pub fn subscription_id(&self) -> SubscriptionId {
		self.subscription_id
	}

	/// Queues a received sample for the subscription's handler.
	///
	/// The sample is timestamped now. Returns `false` if the subscription is
	/// gone.
	pub fn deliver(&self, key: KeyExpr, payload: Bytes, kind: SampleKind) -> bool {
		if !self.active.load(Ordering::Acquire) {
			return false;
		}
		match self.queue.upgrade() {
			| Some(queue) => queue.send(Sample::new(key, payload, kind)).is_ok(),
			| None => false,
		}
	}
}

impl fmt::Debug for SampleSink {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SampleSink")
			.field("subscription_id", &self.subscription_id)
			.field("active", &self.active.load(Ordering::Relaxed))
			.finish()
	}
}

/// Connected transport used by a session.
///
/// Declaration and publish calls are non-blocking hand-offs and must not
/// wait on the network. Implementations must be safe to call from several
/// threads at once.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
	/// Declares a publisher for a concrete key.
	fn declare_publisher(&self, key: &KeyExpr) -> Result<(), TransportError>;

	/// Declares interest in `pattern`; matching samples go to `sink`.
	fn declare_subscription(
		&self,
		pattern: &KeyExpr,
		sink: SampleSink,
	) -> Result<TransportSubscriptionId, TransportError>;

	/// Drops a subscription declared earlier.
	fn undeclare_subscription(
		&self,
		id: TransportSubscriptionId,
	) -> Result<(), TransportError>;

	/// Publishes a sample.
	fn publish(
		&self,
		key: &KeyExpr,
		payload: Bytes,
		kind: SampleKind,
	) -> Result<(), TransportError>;

	/// Collects replies for `pattern`. The session bounds the wait.
	async fn query(&self, pattern: &KeyExpr) -> Result<Vec<Sample>, TransportError>;

	/// Releases every declaration and the underlying connection.
	async fn drop_all(&self);
}

/// Establishes a [`Transport`] from session configuration.
#[async_trait]
pub trait TransportConnector: Send + Sync {
	/// Connects according to `config`. Bounded by `config.connect_timeout`.
	async fn connect(
		&self,
		config: &SessionConfig,
	) -> Result<Arc<dyn Transport>, TransportError>;
}
