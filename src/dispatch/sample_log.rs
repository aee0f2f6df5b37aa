//! In-session sample history used to answer local queries

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use crate::key_expr::KeyExpr;
use crate::sample::Sample;

/// Append-only history of published samples.
///
/// Unbounded unless a capacity is set, in which case the oldest samples are
/// evicted first.
#[derive(Debug, Default)]
pub(crate) struct SampleLog {
	samples: VecDeque<Sample>,
	capacity: Option<NonZeroUsize>,
}

impl SampleLog {
	pub fn new(capacity: Option<NonZeroUsize>) -> Self {
		Self {
			samples: VecDeque::new(),
			capacity,
		}
	}

	pub fn append(&mut self, sample: Sample) {
		if let Some(capacity) = self.capacity {
			while self.samples.len() >= capacity.get() {
				self.samples.pop_front();
			}
		}
		self.samples.push_back(sample);
	}

	/// Samples whose key matches `pattern`, oldest first.
	pub fn query(&self, pattern: &KeyExpr) -> Vec<Sample> {
		self.samples
			.iter()
			.filter(|sample| pattern.matches(sample.key()))
			.cloned()
			.collect()
	}

	pub fn len(&self) -> usize {
		self.samples.len()
	}

	pub fn clear(&mut self) {
		self.samples.clear();
	}
}
