//! Error types for the operation algebra.

use thiserror::Error;

use crate::operation::{CharIdx, CharLen};

/// Errors produced when operations do not fit the text they are used with.
///
/// A length mismatch means two operations were not derived from a common
/// base document; callers abandon incremental reconciliation and resync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
	/// The operation expects a document of a different length.
	#[error("length mismatch: operation expects {expected} chars, found {actual}")]
	LengthMismatch {
		/// Length the operation was derived from.
		expected: CharLen,
		/// Length actually supplied.
		actual: CharLen,
	},

	/// An edit range extends past the end of the document.
	#[error("position {pos} out of bounds for document of {len} chars")]
	OutOfBounds {
		/// End of the offending range.
		pos: CharIdx,
		/// Document length.
		len: CharLen,
	},

	/// Component lengths sum past the largest representable length.
	#[error("operation length overflows")]
	LengthOverflow,
}

/// Result type for operation algebra calls.
pub type Result<T> = std::result::Result<T, OperationError>;
