//! Error types and limits for key expressions
//!
//! This module contains the error type shared by parsing and validation of
//! key expressions, together with the constants that bound their size.

use thiserror::Error;

/// Errors raised while validating a key expression
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyExprError {
	/// Key expression is the empty string
	#[error("Key expression cannot be empty")]
	Empty,

	/// A segment between two slashes is empty
	#[error(
		"Key expression '{key_expr}' has an empty segment at position \
		 {position}"
	)]
	EmptySegment {
		/// The offending key expression
		key_expr: String,
		/// Zero-based segment index
		position: usize,
	},

	/// Wildcard segment used where a concrete key is required
	#[error(
		"Key expression '{key_expr}' contains wildcard '{wildcard}' but a \
		 concrete key is required"
	)]
	WildcardInKey {
		/// The offending key expression
		key_expr: String,
		/// The wildcard segment that was found
		wildcard: String,
	},

	/// Key expression exceeds one of the [`limits`]
	#[error("Key expression too large: {details}")]
	TooLarge {
		/// Which limit was exceeded
		details: String,
	},

	/// Key expression contains a NUL byte
	#[error("Key expression '{key_expr}' contains a NUL byte")]
	NulByte {
		/// The offending key expression (NUL escaped)
		key_expr: String,
	},
}

impl KeyExprError {
	/// Creates a new EmptySegment error
	pub fn empty_segment(key_expr: impl Into<String>, position: usize) -> Self {
		Self::EmptySegment {
			key_expr: key_expr.into(),
			position,
		}
	}

	/// Creates a new WildcardInKey error
	pub fn wildcard_in_key(
		key_expr: impl Into<String>,
		wildcard: impl Into<String>,
	) -> Self {
		Self::WildcardInKey {
			key_expr: key_expr.into(),
			wildcard: wildcard.into(),
		}
	}

	/// Creates a new TooLarge error
	pub fn too_large(details: impl Into<String>) -> Self {
		Self::TooLarge {
			details: details.into(),
		}
	}
}

/// Convenient Result type for key expression operations
pub type KeyExprResult<T> = Result<T, KeyExprError>;

/// Key expression size limits
pub mod limits {
	/// Maximum number of segments in a key expression
	pub const MAX_KEY_EXPR_DEPTH: usize = 64;

	/// Maximum total key expression length in bytes
	pub const MAX_KEY_EXPR_LENGTH: usize = 4096;
}

/// Validation utilities for key expressions
pub mod validation {
	use super::KeyExprError;
	use super::limits::*;
	use crate::key_expr::key_expr_path::{DOUBLE_WILDCARD, SINGLE_WILDCARD};

	/// Validates structural constraints shared by keys and patterns
	pub fn validate_key_expr(key_expr: &str) -> Result<(), KeyExprError> {
		if key_expr.is_empty() {
			return Err(KeyExprError::Empty);
		}

		if key_expr.len() > MAX_KEY_EXPR_LENGTH {
			return Err(KeyExprError::too_large(format!(
				"length {} > {}",
				key_expr.len(),
				MAX_KEY_EXPR_LENGTH
			)));
		}

		if key_expr.contains('\0') {
			return Err(KeyExprError::NulByte {
				key_expr: key_expr.escape_default().to_string(),
			});
		}

		let mut depth = 0;
		for (index, segment) in key_expr.split('/').enumerate() {
			if segment.is_empty() {
				return Err(KeyExprError::empty_segment(key_expr, index));
			}
			depth += 1;
		}

		if depth > MAX_KEY_EXPR_DEPTH {
			return Err(KeyExprError::too_large(format!(
				"depth {depth} > {MAX_KEY_EXPR_DEPTH}"
			)));
		}

		Ok(())
	}

	/// Validates a concrete key used for publishing
	///
	/// On top of [`validate_key_expr`], rejects `*` and `**` segments.
	pub fn validate_publication_key(key: &str) -> Result<(), KeyExprError> {
		validate_key_expr(key)?;
		if let Some(wildcard) = key
			.split('/')
			.find(|s| *s == SINGLE_WILDCARD || *s == DOUBLE_WILDCARD)
		{
			return Err(KeyExprError::wildcard_in_key(key, wildcard));
		}
		Ok(())
	}
}
