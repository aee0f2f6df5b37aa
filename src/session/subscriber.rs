use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::dispatch::{Registry, SubscriptionId};
use crate::key_expr::KeyExpr;

/// Active subscription to a key expression pattern.
///
/// Created via `Session::subscribe()`. The handler keeps receiving matching
/// samples until [`Subscription::close`] is called, the handle is dropped, or
/// the session closes.
pub struct Subscription {
	registry: Arc<Registry>,
	id: SubscriptionId,
	pattern: KeyExpr,
	closed: AtomicBool,
}

impl Subscription {
	pub(crate) fn new(
		registry: Arc<Registry>,
		id: SubscriptionId,
		pattern: KeyExpr,
	) -> Self {
		Self {
			registry,
			id,
			pattern,
			closed: AtomicBool::new(false),
		}
	}

	/// Session-unique id of this subscription.
	pub fn id(&self) -> SubscriptionId {
		self.id
	}

	/// Pattern this subscription was declared with.
	pub fn pattern(&self) -> &KeyExpr {
		&self.pattern
	}

	/// Stops delivery and removes the subscription from the session.
	///
	/// Samples queued but not yet handed to the handler are discarded. A
	/// handler invocation already running is not interrupted. Idempotent.
	pub fn close(&self) {
		if self.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		self.registry.remove_subscription(&self.id);
	}

	/// True once this subscription or its session is closed.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire) || self.registry.is_closed()
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.close();
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription")
			.field("session_id", self.registry.session_id())
			.field("id", &self.id)
			.field("pattern", &self.pattern)
			.field("closed", &self.is_closed())
			.finish()
	}
}
