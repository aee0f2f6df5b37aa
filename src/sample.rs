//! Sample value type and delivery callback

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::key_expr::KeyExpr;

/// Whether a sample carries data or announces a deletion
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
	/// Data published
	#[default]
	Put,
	/// Resource deleted
	Delete,
}

impl fmt::Display for SampleKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			| SampleKind::Put => f.write_str("PUT"),
			| SampleKind::Delete => f.write_str("DELETE"),
		}
	}
}

/// One published event.
///
/// Immutable once built. `timestamp` is taken when the sample enters local
/// delivery, not when a remote peer published it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
	key: KeyExpr,
	payload: Bytes,
	timestamp: SystemTime,
	kind: SampleKind,
}

impl Sample {
	/// Builds a sample stamped with the current time.
	pub fn new(key: KeyExpr, payload: Bytes, kind: SampleKind) -> Self {
		Self::with_timestamp(key, payload, kind, SystemTime::now())
	}

	/// Builds a sample with an explicit timestamp.
	pub fn with_timestamp(
		key: KeyExpr,
		payload: Bytes,
		kind: SampleKind,
		timestamp: SystemTime,
	) -> Self {
		Self {
			key,
			payload,
			timestamp,
			kind,
		}
	}

	/// Key the sample was published to.
	pub fn key(&self) -> &KeyExpr {
		&self.key
	}

	/// Raw payload bytes. Empty for deletions.
	pub fn payload(&self) -> &Bytes {
		&self.payload
	}

	/// When the sample entered local delivery.
	pub fn timestamp(&self) -> SystemTime {
		self.timestamp
	}

	/// Put or delete.
	pub fn kind(&self) -> SampleKind {
		self.kind
	}
}

/// Shows the payload as (lossy) UTF-8 text.
impl fmt::Display for Sample {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&String::from_utf8_lossy(&self.payload))
	}
}

/// Callback invoked once per delivered sample.
///
/// Runs on tokio's blocking pool, one sample at a time per subscription.
pub type Handler = Arc<dyn Fn(Sample) + Send + Sync + 'static>;
