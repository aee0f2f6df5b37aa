//! Key expression handling module
//!
//! This module provides the key expression value type, its validation rules,
//! and the wildcard matcher that decides whether a subscription pattern
//! covers a published key.

// Submodules
pub mod error;
pub mod key_expr_matcher;
/// Key expression value type and segments
pub mod key_expr_path;


// Re-export commonly used types for convenience
pub use error::{KeyExprError, KeyExprResult, limits, validation};
pub use key_expr_matcher::matches;
pub use key_expr_path::{KeyExpr, KeyExprSegment};
