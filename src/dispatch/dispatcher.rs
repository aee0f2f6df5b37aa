use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, warn};

use super::subscription_router::SubscriptionId;
use crate::key_expr::KeyExpr;
use crate::sample::{Handler, Sample};
use crate::transport::SampleSink;

/// Per-subscription delivery queue and the task draining it.
///
/// Samples are handed to the handler one at a time in queue order, each on
/// tokio's blocking pool. A panicking handler is logged and the worker
/// moves on to the next sample.
#[derive(Debug)]
pub(crate) struct DispatchWorker {
	id: SubscriptionId,
	queue: UnboundedSender<Sample>,
	active: Arc<AtomicBool>,
	join_handle: JoinHandle<()>,
}

impl DispatchWorker {
	pub fn spawn(
		id: SubscriptionId,
		pattern: KeyExpr,
		handler: Handler,
		runtime: &Handle,
	) -> Self {
		let (queue, queue_rx) = mpsc::unbounded_channel();
		let active = Arc::new(AtomicBool::new(true));
		let join_handle = runtime.spawn(run(
			id,
			pattern,
			handler,
			queue_rx,
			Arc::clone(&active),
		));
		Self {
			id,
			queue,
			active,
			join_handle,
		}
	}

	/// Queues a sample. Never waits for the handler.
	pub fn enqueue(&self, sample: Sample) -> bool {
		match self.queue.send(sample) {
			| Ok(()) => true,
			| Err(err) => {
				warn!(
					subscription_id = %self.id,
					key = %err.0.key(),
					"Dispatch worker gone, sample dropped"
				);
				false
			}
		}
	}

	/// Sink for samples arriving from a transport.
	pub fn sink(&self) -> SampleSink {
		SampleSink::new(self.id, self.queue.downgrade(), Arc::clone(&self.active))
	}

	/// Stops delivery. Samples still queued are discarded.
	pub fn cancel(self) -> JoinHandle<()> {
		self.active.store(false, Ordering::Release);
		self.join_handle
	}

	/// Closes the queue. Samples already queued are still delivered.
	pub fn finish(self) -> DrainingWorker {
		DrainingWorker {
			join_handle: self.join_handle,
			active: self.active,
		}
	}
}

/// Worker whose queue is closed, delivering what is left.
///
/// Resolves when the queue is empty.
#[derive(Debug)]
pub(crate) struct DrainingWorker {
	join_handle: JoinHandle<()>,
	active: Arc<AtomicBool>,
}

impl DrainingWorker {
	/// Stops delivery. No handler starts afterwards, including calls already
	/// waiting for a blocking thread.
	pub fn abort(&self) {
		self.active.store(false, Ordering::Release);
		self.join_handle.abort();
	}
}

impl Future for DrainingWorker {
	type Output = Result<(), JoinError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.join_handle).poll(cx)
	}
}

async fn run(
	id: SubscriptionId,
	pattern: KeyExpr,
	handler: Handler,
	mut queue_rx: UnboundedReceiver<Sample>,
	active: Arc<AtomicBool>,
) {
	debug!(subscription_id = %id, pattern = %pattern, "Dispatch worker started");
	while let Some(sample) = queue_rx.recv().await {
		if !active.load(Ordering::Acquire) {
			break;
		}
		let key = sample.key().clone();
		let handler = Arc::clone(&handler);
		let still_active = Arc::clone(&active);
		let delivery = tokio::task::spawn_blocking(move || {
			// The blocking pool may start this after the worker was stopped
			if still_active.load(Ordering::Acquire) {
				handler(sample);
			}
		});
		match delivery.await {
			| Ok(()) => {}
			| Err(err) if err.is_panic() => {
				let payload = err.into_panic();
				error!(
					subscription_id = %id,
					pattern = %pattern,
					key = %key,
					panic = panic_message(&*payload),
					"Subscription handler panicked, continuing with next sample"
				);
			}
			| Err(err) => {
				warn!(subscription_id = %id, error = ?err, "Handler task cancelled");
				break;
			}
		}
	}
	debug!(subscription_id = %id, "Dispatch worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		message
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message
	} else {
		"<non-string panic payload>"
	}
}
