//! Editing surface adapter.
//!
//! The widget that captures keystrokes and renders text is external. It
//! reports each user edit as a [`LocalDelta`] and receives remote changes
//! through [`EditingSurface`]. Calls into the surface happen while the binding
//! is in [`Mode::ApplyingRemote`](crate::Mode::ApplyingRemote), so the
//! surface's own change capture must not report them back as local edits.

use quill_primitives::{CharIdx, CharLen, Operation, OperationError, Rope};

/// A single user edit as reported by the surface's native change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDelta {
	/// Start of the edit, in characters.
	pub position: CharIdx,
	/// Number of characters removed at `position`.
	pub removed_len: CharLen,
	/// Text inserted at `position`.
	pub inserted_text: String,
}

impl LocalDelta {
	/// An insertion of `text` at `position`.
	pub fn insert(position: CharIdx, text: impl Into<String>) -> Self {
		Self {
			position,
			removed_len: 0,
			inserted_text: text.into(),
		}
	}

	/// A removal of `len` characters at `position`.
	pub fn delete(position: CharIdx, len: CharLen) -> Self {
		Self {
			position,
			removed_len: len,
			inserted_text: String::new(),
		}
	}
}

/// The live text buffer a binding keeps in step with its mirror.
pub trait EditingSurface {
	/// Returns the surface's current text.
	fn contents(&self) -> String;

	/// Applies a remote operation to the visible buffer.
	///
	/// # Errors
	/// Returns the algebra error if the buffer no longer matches the
	/// operation; the binding then falls back to [`Self::replace_all`].
	fn apply_remote_operation(&mut self, op: &Operation) -> Result<(), OperationError>;

	/// Replaces the entire visible buffer.
	fn replace_all(&mut self, text: &str);
}

/// A rope-backed surface for headless replicas, tests and simulation.
#[derive(Debug, Clone, Default)]
pub struct RopeSurface {
	text: Rope,
	remote_applies: usize,
	replacements: usize,
}

impl RopeSurface {
	/// Creates a surface holding `text`.
	pub fn new(text: &str) -> Self {
		Self {
			text: Rope::from(text),
			..Self::default()
		}
	}

	/// Returns the underlying rope.
	pub fn rope(&self) -> &Rope {
		&self.text
	}

	/// Simulates a user edit, returning the delta the widget would report.
	///
	/// Out-of-range edits are clamped to the end of the buffer.
	pub fn edit(&mut self, position: CharIdx, removed_len: CharLen, inserted: &str) -> LocalDelta {
		let len = self.text.len_chars();
		let position = position.min(len);
		let removed_len = removed_len.min(len - position);

		self.text.remove(position..position + removed_len);
		self.text.insert(position, inserted);

		LocalDelta {
			position,
			removed_len,
			inserted_text: inserted.to_string(),
		}
	}

	/// Number of incremental remote applies received.
	pub fn remote_applies(&self) -> usize {
		self.remote_applies
	}

	/// Number of whole-buffer replacements received.
	pub fn replacements(&self) -> usize {
		self.replacements
	}
}

impl EditingSurface for RopeSurface {
	fn contents(&self) -> String {
		self.text.to_string()
	}

	fn apply_remote_operation(&mut self, op: &Operation) -> Result<(), OperationError> {
		op.apply_rope(&mut self.text)?;
		self.remote_applies += 1;
		Ok(())
	}

	fn replace_all(&mut self, text: &str) {
		self.text = Rope::from(text);
		self.replacements += 1;
	}
}
