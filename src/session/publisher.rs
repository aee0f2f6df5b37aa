use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use super::error::SessionError;
use crate::dispatch::{PublisherState, Registry};
use crate::key_expr::KeyExpr;
use crate::sample::SampleKind;

/// Publisher for one concrete key.
///
/// Created via `Session::publisher()`. Every handle obtained for the same key
/// string refers to the same cached publisher until it is closed. Closed
/// automatically when the session closes.
#[derive(Clone)]
pub struct Publisher {
	registry: Arc<Registry>,
	state: Arc<PublisherState>,
}

impl Publisher {
	pub(crate) fn new(registry: Arc<Registry>, state: Arc<PublisherState>) -> Self {
		Self { registry, state }
	}

	/// Key this publisher writes to.
	pub fn key(&self) -> &KeyExpr {
		self.state.key()
	}

	/// Publishes `payload`. Returns once the sample is queued, never waits
	/// for subscribers.
	pub fn put(&self, payload: impl Into<Bytes>) -> Result<(), SessionError> {
		self.publish(payload.into(), SampleKind::Put)
	}

	/// Announces deletion of the key. The sample carries an empty payload.
	pub fn delete(&self) -> Result<(), SessionError> {
		self.publish(Bytes::new(), SampleKind::Delete)
	}

	fn publish(&self, payload: Bytes, kind: SampleKind) -> Result<(), SessionError> {
		if self.state.is_closed() {
			return Err(SessionError::SessionClosed);
		}
		self.registry.publish(self.state.key(), payload, kind)
	}

	/// Closes this publisher and evicts it from the session cache.
	/// Idempotent.
	pub fn close(&self) {
		self.registry.close_publisher(&self.state);
	}

	/// True once this publisher or its session is closed.
	pub fn is_closed(&self) -> bool {
		self.state.is_closed() || self.registry.is_closed()
	}

	/// True if both handles refer to the same cached publisher.
	pub fn same_publisher(&self, other: &Publisher) -> bool {
		Arc::ptr_eq(&self.state, &other.state)
	}
}

impl fmt::Debug for Publisher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Publisher")
			.field("session_id", self.registry.session_id())
			.field("key", self.state.key())
			.field("closed", &self.state.is_closed())
			.finish()
	}
}
