//! Wildcard matching between a pattern and a concrete key
//!
//! `*` consumes exactly one segment. `**` consumes zero or more segments and
//! is resolved by backtracking over every possible split point, which is
//! exponential in the number of `**` tokens but cheap for realistic depths.
//!
//! A trailing `**` only short-circuits while the subject still has segments
//! left, so `a/**` does not match `a`. The lone pattern `**` matches every
//! subject.

use smallvec::SmallVec;

use super::key_expr_path::{DOUBLE_WILDCARD, SINGLE_WILDCARD};

type Segments<'a> = SmallVec<[&'a str; 8]>;

/// Returns true if `pattern` matches `subject`.
///
/// Total and side-effect free; neither argument is validated.
pub fn matches(pattern: &str, subject: &str) -> bool {
	if pattern == subject {
		return true;
	}

	if pattern == DOUBLE_WILDCARD {
		return true;
	}

	let pattern: Segments<'_> = pattern.split('/').collect();
	let subject: Segments<'_> = subject.split('/').collect();

	match_segments(&pattern, &subject)
}

fn match_segments(pattern: &[&str], subject: &[&str]) -> bool {
	let (mut pi, mut si) = (0, 0);

	while pi < pattern.len() && si < subject.len() {
		match pattern[pi] {
			| DOUBLE_WILDCARD => {
				if pi == pattern.len() - 1 {
					return true;
				}
				let rest = &pattern[pi + 1 ..];
				return (si ..= subject.len())
					.any(|split| match_segments(rest, &subject[split ..]));
			}
			| SINGLE_WILDCARD => {
				pi += 1;
				si += 1;
			}
			| literal => {
				if literal != subject[si] {
					return false;
				}
				pi += 1;
				si += 1;
			}
		}
	}

	pi == pattern.len() && si == subject.len()
}
