//! Key expression value type and its segment model

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use arcstr::{ArcStr, Substr};

use super::error::{KeyExprError, validation};
use super::key_expr_matcher;

/// Single-segment wildcard token
pub const SINGLE_WILDCARD: &str = "*";
/// Multi-segment wildcard token
pub const DOUBLE_WILDCARD: &str = "**";

/// One `/`-delimited segment of a key expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyExprSegment {
	/// Literal token, compared by exact string equality
	Literal(Substr),
	/// `*`, matches exactly one segment
	Single,
	/// `**`, matches zero or more segments
	Multi,
}

impl KeyExprSegment {
	/// Returns string representation of the segment.
	pub fn as_str(&self) -> &str {
		match self {
			| KeyExprSegment::Literal(s) => s,
			| KeyExprSegment::Single => SINGLE_WILDCARD,
			| KeyExprSegment::Multi => DOUBLE_WILDCARD,
		}
	}

	/// Returns true if this segment is `*` or `**`.
	pub fn is_wildcard(&self) -> bool {
		matches!(self, KeyExprSegment::Single | KeyExprSegment::Multi)
	}
}

impl From<Substr> for KeyExprSegment {
	fn from(segment: Substr) -> Self {
		match segment.as_str() {
			| SINGLE_WILDCARD => KeyExprSegment::Single,
			| DOUBLE_WILDCARD => KeyExprSegment::Multi,
			| _ => KeyExprSegment::Literal(segment),
		}
	}
}

impl fmt::Display for KeyExprSegment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A validated, `/`-separated key expression.
///
/// The same type is used for concrete publication keys and for subscription
/// patterns. [`KeyExpr::new`] accepts wildcards, [`KeyExpr::new_publication`]
/// rejects them. Cloning is cheap.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyExpr(ArcStr);

impl KeyExpr {
	/// Parses a key expression that may contain `*` and `**` segments.
	pub fn new(key_expr: impl Into<ArcStr>) -> Result<Self, KeyExprError> {
		let key_expr = key_expr.into();
		validation::validate_key_expr(&key_expr)?;
		Ok(Self(key_expr))
	}

	/// Parses a concrete key. Wildcard segments are rejected.
	pub fn new_publication(
		key_expr: impl Into<ArcStr>,
	) -> Result<Self, KeyExprError> {
		let key_expr = key_expr.into();
		validation::validate_publication_key(&key_expr)?;
		Ok(Self(key_expr))
	}

	/// Returns the key expression as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Returns the shared backing string.
	pub fn as_arcstr(&self) -> &ArcStr {
		&self.0
	}

	/// Iterates the segments without allocating the segment model.
	pub fn raw_segments(&self) -> impl Iterator<Item = &str> {
		self.0.split('/')
	}

	/// Returns parsed segments sharing this key expression's storage.
	pub fn segments(&self) -> Vec<KeyExprSegment> {
		self.0
			.split('/')
			.map(|s| KeyExprSegment::from(self.0.substr_from(s)))
			.collect()
	}

	/// Number of segments.
	pub fn depth(&self) -> usize {
		self.0.split('/').count()
	}

	/// Returns true if any segment is `*` or `**`.
	pub fn is_wild(&self) -> bool {
		self.raw_segments()
			.any(|s| s == SINGLE_WILDCARD || s == DOUBLE_WILDCARD)
	}

	/// Returns true if `self`, used as a pattern, matches `subject`.
	pub fn matches(&self, subject: &KeyExpr) -> bool {
		key_expr_matcher::matches(self.as_str(), subject.as_str())
	}
}

impl fmt::Display for KeyExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl fmt::Debug for KeyExpr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "KeyExpr({})", self.0)
	}
}

impl AsRef<str> for KeyExpr {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl Borrow<str> for KeyExpr {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl FromStr for KeyExpr {
	type Err = KeyExprError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

impl TryFrom<&str> for KeyExpr {
	type Error = KeyExprError;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<String> for KeyExpr {
	type Error = KeyExprError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl TryFrom<ArcStr> for KeyExpr {
	type Error = KeyExprError;

	fn try_from(value: ArcStr) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl From<KeyExpr> for ArcStr {
	fn from(key_expr: KeyExpr) -> Self {
		key_expr.0
	}
}
