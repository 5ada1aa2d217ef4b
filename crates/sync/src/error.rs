//! Error types for document synchronization.

use quill_primitives::{CharIdx, CharLen, OperationError};
use thiserror::Error;

/// Errors raised by bindings and the sync manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
	/// Operations did not share a base and no full text was available to recover.
	#[error(transparent)]
	Operation(#[from] OperationError),

	/// The surface reported a local edit while a remote operation was being applied.
	#[error("local edit reported while applying a remote operation")]
	ReentrantLocalEdit,

	/// A remote apply was started while another one was in progress.
	#[error("remote apply already in progress")]
	AlreadyApplyingRemote,

	/// A local edit does not fit the mirrored text.
	#[error("local edit at {position} removing {removed} chars exceeds document length {len}")]
	DeltaOutOfBounds {
		/// Edit start.
		position: CharIdx,
		/// Number of characters removed.
		removed: CharLen,
		/// Mirror length.
		len: CharLen,
	},

	/// A binding already exists for this document.
	#[error("document already open: {0}")]
	DocumentAlreadyOpen(String),

	/// No binding exists for this document.
	#[error("document not open: {0}")]
	DocumentNotOpen(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
