//! Session, publisher and subscription lifecycle

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use keyexpr_pubsub::{
	ErrorKind, Mode, Sample, Session, SessionConfig, SessionError,
	SessionSettings,
};
use tokio::sync::mpsc;

fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

#[tokio::test]
async fn test_operations_after_close_fail() {
	init_tracing();
	let session = Session::open(SessionConfig::default()).await.unwrap();
	let publisher = session.publisher("robot/status").unwrap();
	let subscription = session.subscribe("robot/*", |_| {}).unwrap();

	session.close().await;
	assert!(session.is_closed());
	assert!(publisher.is_closed());
	assert!(subscription.is_closed());

	let errors = [
		session.publisher("robot/status").unwrap_err(),
		session.subscribe("robot/*", |_| {}).unwrap_err(),
		session.query("robot/**").unwrap_err(),
		session.get("robot/**", Default::default()).await.unwrap_err(),
		publisher.put("late").unwrap_err(),
		publisher.delete().unwrap_err(),
	];
	for err in errors {
		assert_eq!(err.kind(), ErrorKind::SessionClosed, "{err}");
	}

	// Closed-session check runs before key validation
	assert_eq!(
		session.publisher("bad//key").unwrap_err().kind(),
		ErrorKind::SessionClosed
	);
	assert_eq!(session.subscription_count(), 0);
	assert_eq!(session.publisher_count(), 0);
}

#[tokio::test]
async fn test_close_is_idempotent() {
	init_tracing();
	let session = Session::open(SessionConfig::default()).await.unwrap();
	let subscription = session.subscribe("a/**", |_| {}).unwrap();

	session.close().await;
	session.close().await;
	subscription.close();
	subscription.close();
	assert!(session.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_subscription_close_stops_delivery() {
	init_tracing();
	let session = Session::open(SessionConfig::default()).await.unwrap();
	let (tx, mut rx) = mpsc::unbounded_channel::<Sample>();

	let subscription = session
		.subscribe("events/*", move |sample| {
			let _ = tx.send(sample);
		})
		.unwrap();
	let publisher = session.publisher("events/start").unwrap();

	publisher.put("first").unwrap();
	let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(first.to_string(), "first");

	subscription.close();
	subscription.close();
	assert!(subscription.is_closed());
	assert_eq!(session.subscription_count(), 0);

	publisher.put("second").unwrap();
	// The handler (and its sender) is released once the worker exits
	let next = tokio::time::timeout(Duration::from_secs(2), rx.recv())
		.await
		.unwrap();
	assert!(next.is_none(), "closed subscription received {next:?}");

	session.close().await;
}

#[tokio::test]
async fn test_closing_one_subscription_leaves_others() {
	init_tracing();
	let session = Session::open(SessionConfig::default()).await.unwrap();

	let first = session.subscribe("shared/key", |_| {}).unwrap();
	let second = session.subscribe("shared/key", |_| {}).unwrap();
	assert_ne!(first.id(), second.id());
	assert_eq!(first.pattern(), second.pattern());
	assert_eq!(session.subscription_count(), 2);

	first.close();
	assert!(first.is_closed());
	assert!(!second.is_closed());
	assert_eq!(session.subscription_count(), 1);

	session.close().await;
}

#[tokio::test]
async fn test_dropping_subscription_unsubscribes() {
	init_tracing();
	let session = Session::open(SessionConfig::default()).await.unwrap();

	{
		let _subscription = session.subscribe("scoped/**", |_| {}).unwrap();
		assert_eq!(session.subscription_count(), 1);
	}
	assert_eq!(session.subscription_count(), 0);

	session.close().await;
}

#[tokio::test]
async fn test_dropping_session_closes_handles() {
	init_tracing();
	let session = Session::open(SessionConfig::default()).await.unwrap();
	let publisher = session.publisher("orphan").unwrap();
	let subscription = session.subscribe("orphan", |_| {}).unwrap();

	drop(session);

	assert!(publisher.is_closed());
	assert!(subscription.is_closed());
	assert_eq!(
		publisher.put("nobody").unwrap_err().kind(),
		ErrorKind::SessionClosed
	);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_drains_queued_samples() {
	init_tracing();
	let config = SessionConfig::default().with_settings(SessionSettings {
		drain_timeout: Duration::from_secs(5),
		..SessionSettings::default()
	});
	let session = Session::open(config).await.unwrap();
	let delivered = Arc::new(AtomicUsize::new(0));

	let counter = Arc::clone(&delivered);
	let _subscription = session
		.subscribe("slow", move |_| {
			std::thread::sleep(Duration::from_millis(10));
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();

	let publisher = session.publisher("slow").unwrap();
	for i in 0..10 {
		publisher.put(format!("{i}")).unwrap();
	}

	session.close().await;
	assert_eq!(delivered.load(Ordering::SeqCst), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_aborts_after_drain_timeout() {
	init_tracing();
	let config = SessionConfig::default().with_settings(SessionSettings {
		drain_timeout: Duration::from_millis(50),
		..SessionSettings::default()
	});
	let session = Session::open(config).await.unwrap();
	let delivered = Arc::new(AtomicUsize::new(0));

	let counter = Arc::clone(&delivered);
	let _subscription = session
		.subscribe("stuck", move |_| {
			std::thread::sleep(Duration::from_millis(100));
			counter.fetch_add(1, Ordering::SeqCst);
		})
		.unwrap();

	let publisher = session.publisher("stuck").unwrap();
	for _ in 0..20 {
		publisher.put("x").unwrap();
	}

	let started = std::time::Instant::now();
	session.close().await;
	assert!(started.elapsed() < Duration::from_secs(1));
	assert!(delivered.load(Ordering::SeqCst) < 20);
}

#[tokio::test]
async fn test_info_and_config() {
	init_tracing();
	let session = Session::open(SessionConfig::peer(["tcp/0.0.0.0:7447"]))
		.await
		.unwrap();

	let info = session.info();
	assert_eq!(info.id, session.id());
	assert_eq!(info.mode, Mode::Peer);
	assert!(info.endpoints.is_empty());
	assert!(!info.backed_by_native_transport);
	assert_eq!(session.config().listen_endpoints, ["tcp/0.0.0.0:7447"]);

	let json = serde_json::to_value(&info).unwrap();
	assert_eq!(json["mode"], "peer");
	assert_eq!(json["backed_by_native_transport"], false);

	let other = Session::open(SessionConfig::default()).await.unwrap();
	assert_ne!(other.id(), session.id());

	other.close().await;
	session.close().await;
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
	init_tracing();
	let err = Session::open(SessionConfig::client(Vec::<String>::new()))
		.await
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidConfig);

	let err = Session::open(SessionConfig::default().with_timeout(Duration::ZERO))
		.await
		.unwrap_err();
	assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}

#[test]
fn test_open_outside_tokio_runtime_fails() {
	init_tracing();
	let result = futures::executor::block_on(Session::open(SessionConfig::default()));

	let err = result.unwrap_err();
	assert!(matches!(err, SessionError::RuntimeUnavailable), "{err}");
	assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}

#[test]
fn test_no_handler_starts_after_close_times_out() {
	init_tracing();
	// A single blocking thread, so a second handler call has to wait for it
	let runtime = tokio::runtime::Builder::new_multi_thread()
		.worker_threads(2)
		.max_blocking_threads(1)
		.enable_all()
		.build()
		.unwrap();

	runtime.block_on(async {
		let config = SessionConfig::default().with_settings(SessionSettings {
			drain_timeout: Duration::from_millis(50),
			..SessionSettings::default()
		});
		let session = Session::open(config).await.unwrap();

		let (started_tx, mut started_rx) = mpsc::unbounded_channel::<()>();
		let _busy = session
			.subscribe("busy", move |_| {
				let _ = started_tx.send(());
				std::thread::sleep(Duration::from_millis(400));
			})
			.unwrap();

		let late_calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&late_calls);
		let _waiting = session
			.subscribe("waiting", move |_| {
				counter.fetch_add(1, Ordering::SeqCst);
			})
			.unwrap();

		session.publisher("busy").unwrap().put("hold").unwrap();
		tokio::time::timeout(Duration::from_secs(2), started_rx.recv())
			.await
			.unwrap()
			.unwrap();

		// Queued behind the busy handler on the blocking pool
		session.publisher("waiting").unwrap().put("late").unwrap();
		tokio::time::sleep(Duration::from_millis(50)).await;

		session.close().await;
		tokio::time::sleep(Duration::from_millis(700)).await;
		assert_eq!(late_calls.load(Ordering::SeqCst), 0);
	});
}
