use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::{Mode, SessionConfig};
use super::error::SessionError;
use super::publisher::Publisher;
use super::subscriber::Subscription;
use crate::dispatch::{DrainingWorker, Registry};
use crate::key_expr::KeyExpr;
use crate::sample::{Handler, Sample};
use crate::transport::{Transport, TransportConnector, TransportError};

/// Session metadata for debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
	/// Unique session identifier
	pub id: String,
	/// Peer or client
	pub mode: Mode,
	/// Endpoints from the configuration
	pub endpoints: Vec<String>,
	/// False when samples are dispatched locally only
	pub backed_by_native_transport: bool,
}

/// Bounds for [`Session::get`]
#[derive(Debug, Clone)]
pub struct GetOptions {
	/// Deadline for collecting replies
	pub timeout: Duration,
	/// Cancels the query early when triggered
	pub cancellation: Option<CancellationToken>,
}

impl Default for GetOptions {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(10),
			cancellation: None,
		}
	}
}

impl GetOptions {
	/// Returns a copy with the given deadline
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	/// Returns a copy cancelled by `token`
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancellation = Some(token);
		self
	}
}

/// Publish/subscribe session.
///
/// Owns every publisher and subscription created through it. Without a
/// transport, published samples are routed to matching local subscriptions;
/// with one, publication and subscription are delegated to the network.
///
/// Call [`Session::close`] and await it before dropping the session to make
/// sure queued samples are delivered.
pub struct Session {
	config: SessionConfig,
	registry: Arc<Registry>,
}

impl Session {
	/// Opens a self-contained session with local dispatch.
	///
	/// Must be polled from within a tokio runtime; handlers run on it.
	/// Otherwise fails with [`SessionError::RuntimeUnavailable`].
	pub async fn open(config: SessionConfig) -> Result<Self, SessionError> {
		config.validate()?;
		let runtime = current_runtime()?;
		Ok(Self::build(config, None, runtime))
	}

	/// Opens a session backed by the transport `connector` establishes.
	///
	/// The connection attempt is bounded by `config.connect_timeout`.
	pub async fn open_with_transport<C>(
		config: SessionConfig,
		connector: &C,
	) -> Result<Self, SessionError>
	where
		C: TransportConnector + ?Sized,
	{
		config.validate()?;
		let runtime = current_runtime()?;

		let timeout = config.connect_timeout;
		let transport = tokio::time::timeout(timeout, connector.connect(&config))
			.await
			.map_err(|_| {
				SessionError::ConnectionFailed(TransportError::new(
					TransportError::CONNECT_TIMEOUT,
					format!("no connection within {}ms", timeout.as_millis()),
				))
			})?
			.map_err(|err| {
				debug!(error = %err, mode = %config.mode, "Transport connection failed");
				SessionError::ConnectionFailed(err)
			})?;

		Ok(Self::build(config, Some(transport), runtime))
	}

	fn build(
		config: SessionConfig,
		transport: Option<Arc<dyn Transport>>,
		runtime: Handle,
	) -> Self {
		let session_id = ArcStr::from(Uuid::new_v4().to_string());
		let registry =
			Registry::new(session_id.clone(), &config.settings, transport, runtime);
		info!(
			session_id = %session_id,
			mode = %config.mode,
			endpoints = ?config.endpoints,
			transport = registry.transport().is_some(),
			"Session opened"
		);
		Self {
			config,
			registry: Arc::new(registry),
		}
	}

	/// Unique identifier of this session.
	pub fn id(&self) -> &str {
		self.registry.session_id()
	}

	/// Configuration the session was opened with.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Returns the publisher for `key`, creating it on first use.
	///
	/// `key` must be concrete: `*` and `**` segments are rejected.
	pub fn publisher(
		&self,
		key: impl Into<ArcStr>,
	) -> Result<Publisher, SessionError> {
		self.ensure_open()?;
		let key = KeyExpr::new_publication(key)?;
		let state = self.registry.get_or_create_publisher(key)?;
		Ok(Publisher::new(Arc::clone(&self.registry), state))
	}

	/// Subscribes `handler` to every sample whose key matches `pattern`.
	///
	/// Supports wildcards: `topic/*` or `topic/**`. The handler runs off the
	/// publishing thread and sees samples in publish order.
	pub fn subscribe<F>(
		&self,
		pattern: impl TryInto<KeyExpr, Error: Into<SessionError>>,
		handler: F,
	) -> Result<Subscription, SessionError>
	where
		F: Fn(Sample) + Send + Sync + 'static,
	{
		self.ensure_open()?;
		let pattern = pattern.try_into().map_err(Into::into)?;
		let handler: Handler = Arc::new(handler);
		let id = self.registry.subscribe(pattern.clone(), handler)?;
		Ok(Subscription::new(Arc::clone(&self.registry), id, pattern))
	}

	/// Samples published in this session whose key matches `pattern`, in
	/// publish order.
	pub fn query(
		&self,
		pattern: impl TryInto<KeyExpr, Error: Into<SessionError>>,
	) -> Result<Vec<Sample>, SessionError> {
		self.ensure_open()?;
		let pattern = pattern.try_into().map_err(Into::into)?;
		self.registry.query(&pattern)
	}

	/// Queries `pattern` and waits for the replies.
	///
	/// Without a transport this answers from the local log, like
	/// [`Session::query`]. With one, the transport is asked and the wait is
	/// bounded by `options`.
	pub async fn get(
		&self,
		pattern: impl TryInto<KeyExpr, Error: Into<SessionError>>,
		options: GetOptions,
	) -> Result<Vec<Sample>, SessionError> {
		self.ensure_open()?;
		let pattern = pattern.try_into().map_err(Into::into)?;
		let Some(transport) = self.registry.transport().cloned() else {
			return self.registry.query(&pattern);
		};

		let cancellation = options.cancellation.unwrap_or_default();
		tokio::select! {
			biased;
			_ = cancellation.cancelled() => {
				debug!(session_id = %self.id(), pattern = %pattern, "Query cancelled");
				Err(SessionError::QueryCancelled { pattern: pattern.clone() })
			}
			replies = tokio::time::timeout(options.timeout, transport.query(&pattern)) => {
				match replies {
					| Ok(Ok(samples)) => Ok(samples),
					| Ok(Err(source)) => Err(SessionError::query_failed(&pattern, source)),
					| Err(_) => {
						warn!(
							session_id = %self.id(),
							pattern = %pattern,
							timeout_ms = options.timeout.as_millis(),
							"Query timed out"
						);
						Err(SessionError::timeout(options.timeout))
					}
				}
			}
		}
	}

	/// Closes the session and everything it owns. Idempotent.
	///
	/// 1. Rejects new operations and detaches all publishers and subscriptions
	/// 2. Releases the transport, if any
	/// 3. Waits, up to `settings.drain_timeout`, for samples already queued
	///    to reach their handlers; workers still busy afterwards are aborted
	pub async fn close(&self) {
		let Some(detached) = self.registry.close_all() else {
			debug!(session_id = %self.id(), "Session already closed");
			return;
		};

		if let Some(transport) = self.registry.transport() {
			for id in detached.transport_subscriptions {
				if let Err(err) = transport.undeclare_subscription(id) {
					error!(
						session_id = %self.id(),
						transport_subscription = %id,
						error = ?err,
						"Failed to undeclare subscription"
					);
				}
			}
			transport.drop_all().await;
		}

		self.drain_workers(detached.workers).await;
		info!(session_id = %self.id(), "Session closed");
	}

	async fn drain_workers(&self, workers: Vec<DrainingWorker>) {
		let drain_timeout = self.config.settings.drain_timeout;
		let mut pending: FuturesUnordered<DrainingWorker> =
			workers.into_iter().collect();

		let drained = tokio::time::timeout(drain_timeout, async {
			while let Some(result) = pending.next().await {
				if let Err(err) = result {
					warn!(session_id = %self.id(), error = ?err, "Dispatch worker failed");
				}
			}
		})
		.await;

		if drained.is_err() {
			warn!(
				session_id = %self.id(),
				remaining = pending.len(),
				timeout_ms = drain_timeout.as_millis(),
				"Dispatch drain timed out, aborting remaining workers"
			);
			for worker in pending.iter() {
				worker.abort();
			}
		}
	}

	/// True once [`Session::close`] has run or the session was dropped.
	pub fn is_closed(&self) -> bool {
		self.registry.is_closed()
	}

	/// Number of live subscriptions.
	pub fn subscription_count(&self) -> usize {
		self.registry.subscription_count()
	}

	/// Number of cached publishers.
	pub fn publisher_count(&self) -> usize {
		self.registry.publisher_count()
	}

	/// Session metadata.
	pub fn info(&self) -> SessionInfo {
		SessionInfo {
			id: self.id().to_string(),
			mode: self.config.mode,
			endpoints: self.config.endpoints.clone(),
			backed_by_native_transport: self.registry.transport().is_some(),
		}
	}

	fn ensure_open(&self) -> Result<(), SessionError> {
		if self.registry.is_closed() {
			return Err(SessionError::SessionClosed);
		}
		Ok(())
	}
}

fn current_runtime() -> Result<Handle, SessionError> {
	Handle::try_current().map_err(|err| {
		debug!(error = %err, "Session opened outside a tokio runtime");
		SessionError::RuntimeUnavailable
	})
}

impl std::fmt::Debug for Session {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("id", &self.id())
			.field("mode", &self.config.mode)
			.field("closed", &self.is_closed())
			.finish()
	}
}

// Dropping an open session closes it without waiting for queued samples.
impl Drop for Session {
	fn drop(&mut self) {
		let Some(detached) = self.registry.close_all() else {
			return;
		};
		warn!(
			session_id = %self.id(),
			"Session dropped without calling close(). Please call close() and \
			 await its completion before dropping."
		);
		if let Some(transport) = self.registry.transport().cloned() {
			for id in detached.transport_subscriptions {
				if let Err(err) = transport.undeclare_subscription(id) {
					error!(
						session_id = %self.id(),
						transport_subscription = %id,
						error = ?err,
						"Failed to undeclare subscription"
					);
				}
			}
			if let Ok(runtime) = Handle::try_current() {
				runtime.spawn(async move { transport.drop_all().await });
			}
		}
	}
}
