use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arcstr::ArcStr;
use bytes::Bytes;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use super::dispatcher::{DispatchWorker, DrainingWorker};
use super::sample_log::SampleLog;
use super::subscription_router::{SubscriptionId, SubscriptionRouter};
use crate::key_expr::KeyExpr;
use crate::sample::{Handler, Sample, SampleKind};
use crate::session::{SessionError, SessionSettings};
use crate::transport::{Transport, TransportSubscriptionId};

/// Shared state behind one cached publisher.
#[derive(Debug)]
pub(crate) struct PublisherState {
	key: KeyExpr,
	closed: AtomicBool,
}

impl PublisherState {
	pub fn key(&self) -> &KeyExpr {
		&self.key
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}
}

#[derive(Debug)]
struct SubscriptionEntry {
	worker: DispatchWorker,
	transport_id: Option<TransportSubscriptionId>,
}

struct RegistryState {
	closed: bool,
	publishers: HashMap<ArcStr, Arc<PublisherState>>,
	router: SubscriptionRouter<SubscriptionEntry>,
	log: SampleLog,
}

/// What `close_all` detached from the registry.
#[derive(Debug, Default)]
pub(crate) struct DetachedResources {
	/// Dispatch workers still draining their queues
	pub workers: Vec<DrainingWorker>,
	/// Subscriptions still declared on the transport
	pub transport_subscriptions: Vec<TransportSubscriptionId>,
}

/// Publisher cache, subscription table and sample log of one session.
///
/// Everything sits behind a single lock. Queries and state checks share it;
/// registration, removal, publication and close take it exclusively.
pub(crate) struct Registry {
	session_id: ArcStr,
	state: RwLock<RegistryState>,
	transport: Option<Arc<dyn Transport>>,
	runtime: Handle,
}

impl Registry {
	pub fn new(
		session_id: ArcStr,
		settings: &SessionSettings,
		transport: Option<Arc<dyn Transport>>,
		runtime: Handle,
	) -> Self {
		Self {
			session_id,
			state: RwLock::new(RegistryState {
				closed: false,
				publishers: HashMap::new(),
				router: SubscriptionRouter::new(),
				log: SampleLog::new(settings.log_capacity),
			}),
			transport,
			runtime,
		}
	}

	pub fn session_id(&self) -> &ArcStr {
		&self.session_id
	}

	pub fn transport(&self) -> Option<&Arc<dyn Transport>> {
		self.transport.as_ref()
	}

	pub fn is_closed(&self) -> bool {
		self.state.read().closed
	}

	/// Returns the cached publisher for `key`, creating it if absent.
	pub fn get_or_create_publisher(
		&self,
		key: KeyExpr,
	) -> Result<Arc<PublisherState>, SessionError> {
		let state = self.state.upgradable_read();
		if state.closed {
			return Err(SessionError::SessionClosed);
		}
		if let Some(publisher) = state.publishers.get(key.as_arcstr()) {
			return Ok(Arc::clone(publisher));
		}

		if let Some(transport) = &self.transport {
			transport
				.declare_publisher(&key)
				.map_err(|source| SessionError::publish_failed(&key, source))?;
		}

		let mut state = RwLockUpgradableReadGuard::upgrade(state);
		let publisher = Arc::new(PublisherState {
			key: key.clone(),
			closed: AtomicBool::new(false),
		});
		state
			.publishers
			.insert(key.as_arcstr().clone(), Arc::clone(&publisher));
		debug!(session_id = %self.session_id, key = %key, "Publisher declared");
		Ok(publisher)
	}

	/// Marks the publisher closed and evicts it from the cache.
	pub fn close_publisher(&self, publisher: &Arc<PublisherState>) {
		if publisher.closed.swap(true, Ordering::AcqRel) {
			return;
		}
		let mut state = self.state.write();
		let cached = state
			.publishers
			.get(publisher.key.as_arcstr())
			.is_some_and(|cached| Arc::ptr_eq(cached, publisher));
		if cached {
			state.publishers.remove(publisher.key.as_arcstr());
		}
		debug!(session_id = %self.session_id, key = %publisher.key, "Publisher closed");
	}

	/// Records the sample and routes it to every matching subscription, or
	/// to the transport when one is attached.
	pub fn publish(
		&self,
		key: &KeyExpr,
		payload: Bytes,
		kind: SampleKind,
	) -> Result<(), SessionError> {
		if let Some(transport) = &self.transport {
			if self.is_closed() {
				return Err(SessionError::SessionClosed);
			}
			transport
				.publish(key, payload.clone(), kind)
				.map_err(|source| SessionError::publish_failed(key, source))?;
			let mut state = self.state.write();
			if !state.closed {
				state.log.append(Sample::new(key.clone(), payload, kind));
			}
			return Ok(());
		}

		let mut state = self.state.write();
		if state.closed {
			return Err(SessionError::SessionClosed);
		}
		let sample = Sample::new(key.clone(), payload, kind);
		state.log.append(sample.clone());

		let mut delivered = 0usize;
		for (_, _, entry) in state.router.get_subscribers(key) {
			if entry.worker.enqueue(sample.clone()) {
				delivered += 1;
			}
		}
		debug!(
			session_id = %self.session_id,
			key = %key,
			kind = %kind,
			subscribers = delivered,
			"Sample published"
		);
		Ok(())
	}

	pub fn subscribe(
		&self,
		pattern: KeyExpr,
		handler: Handler,
	) -> Result<SubscriptionId, SessionError> {
		let mut state = self.state.write();
		if state.closed {
			return Err(SessionError::SessionClosed);
		}

		let id = state.router.allocate_id();
		let worker =
			DispatchWorker::spawn(id, pattern.clone(), handler, &self.runtime);

		let transport_id = match &self.transport {
			| Some(transport) => {
				match transport.declare_subscription(&pattern, worker.sink()) {
					| Ok(transport_id) => Some(transport_id),
					| Err(source) => {
						drop(worker.cancel());
						return Err(SessionError::subscribe_failed(&pattern, source));
					}
				}
			}
			| None => None,
		};

		debug!(
			session_id = %self.session_id,
			subscription_id = %id,
			pattern = %pattern,
			"Subscription declared"
		);
		state.router.insert(id, pattern, SubscriptionEntry {
			worker,
			transport_id,
		});
		Ok(id)
	}

	/// Removes exactly this subscription. Unknown ids are ignored.
	pub fn remove_subscription(&self, id: &SubscriptionId) {
		let removed = self.state.write().router.unsubscribe(id);
		match removed {
			| Ok((pattern, entry)) => {
				drop(entry.worker.cancel());
				if let (Some(transport), Some(transport_id)) =
					(&self.transport, entry.transport_id)
				{
					if let Err(err) = transport.undeclare_subscription(transport_id) {
						error!(
							session_id = %self.session_id,
							subscription_id = %id,
							error = ?err,
							"Failed to undeclare subscription on transport"
						);
					}
				}
				debug!(
					session_id = %self.session_id,
					subscription_id = %id,
					pattern = %pattern,
					"Subscription closed"
				);
			}
			| Err(err) => {
				debug!(session_id = %self.session_id, error = %err, "Subscription already removed");
			}
		}
	}

	/// Logged samples matching `pattern`, in publish order.
	pub fn query(&self, pattern: &KeyExpr) -> Result<Vec<Sample>, SessionError> {
		let state = self.state.read();
		if state.closed {
			return Err(SessionError::SessionClosed);
		}
		Ok(state.log.query(pattern))
	}

	/// Closes the registry and detaches every publisher and subscription.
	///
	/// Returns `None` if it was already closed.
	pub fn close_all(&self) -> Option<DetachedResources> {
		let mut state = self.state.write();
		if state.closed {
			return None;
		}
		state.closed = true;

		for publisher in state.publishers.values() {
			publisher.closed.store(true, Ordering::Release);
		}
		let publisher_count = state.publishers.len();
		let logged_samples = state.log.len();
		state.publishers.clear();
		state.log.clear();

		let mut detached = DetachedResources::default();
		for (_, entry) in state.router.cleanup() {
			detached.workers.push(entry.worker.finish());
			detached.transport_subscriptions.extend(entry.transport_id);
		}
		debug!(
			session_id = %self.session_id,
			publishers = publisher_count,
			subscriptions = detached.workers.len(),
			logged_samples,
			"Registry closed"
		);
		Some(detached)
	}

	pub fn subscription_count(&self) -> usize {
		self.state.read().router.len()
	}

	pub fn publisher_count(&self) -> usize {
		self.state.read().publishers.len()
	}
}

impl Drop for Registry {
	fn drop(&mut self) {
		let state = self.state.get_mut();
		if !state.closed && !state.router.is_empty() {
			warn!(
				session_id = %self.session_id,
				subscriptions = state.router.len(),
				"Registry dropped with live subscriptions"
			);
		}
	}
}
