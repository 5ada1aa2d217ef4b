//! Retain/insert/delete operations over flat Unicode text.

mod compose;
mod transform;
mod types;

#[cfg(test)]
mod tests;

use ropey::Rope;

pub use self::types::{Bias, CharIdx, CharLen, Component, Insertion, Priority};
use crate::error::{OperationError, Result};

/// A sequence of components describing an edit to a text document.
///
/// An operation is only valid against a document whose length equals
/// [`Operation::len`]: the sum of its retain and delete lengths. The builder
/// methods keep the component list in normal form at all times:
///
/// - adjacent components of the same kind are merged,
/// - zero-length components are dropped,
/// - an insertion adjacent to a deletion is ordered before it.
///
/// Two operations with the same effect therefore compare equal, and the
/// normal form is what goes over the wire.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Operation {
	components: Vec<Component>,
	/// Length of the source document.
	len: CharLen,
	/// Length of the document after applying this operation.
	len_after: CharLen,
}

impl Operation {
	/// Creates an empty operation, valid against the empty document.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an operation that leaves a document of `len` characters unchanged.
	pub fn identity(len: CharLen) -> Self {
		let mut op = Self::new();
		op.retain(len);
		op
	}

	/// Builds an operation from arbitrary components, normalizing them.
	pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
		let mut op = Self::new();
		for component in components {
			op.push(component);
		}
		op
	}

	/// Builds the operation replacing `removed` characters at `pos` with `inserted`.
	///
	/// # Errors
	/// [`OperationError::OutOfBounds`] if the replaced range ends past `doc_len`.
	pub fn splice(doc_len: CharLen, pos: CharIdx, removed: CharLen, inserted: &str) -> Result<Self> {
		let end = pos.checked_add(removed).filter(|end| *end <= doc_len).ok_or(
			OperationError::OutOfBounds {
				pos: pos.saturating_add(removed),
				len: doc_len,
			},
		)?;

		let mut op = Self::new();
		op.retain(pos);
		op.insert(inserted);
		op.delete(removed);
		op.retain(doc_len - end);
		Ok(op)
	}

	/// Computes an operation that turns `old` into `new`.
	///
	/// Scans for a common prefix and suffix to isolate the single differing
	/// region, then emits one insert+delete for that region.
	pub fn diff(old: &str, new: &str) -> Self {
		let old: Vec<char> = old.chars().collect();
		let new: Vec<char> = new.chars().collect();

		let prefix = old
			.iter()
			.zip(new.iter())
			.take_while(|(a, b)| a == b)
			.count();

		let max_suffix = (old.len() - prefix).min(new.len() - prefix);
		let suffix = old
			.iter()
			.rev()
			.zip(new.iter().rev())
			.take(max_suffix)
			.take_while(|(a, b)| a == b)
			.count();

		let mut op = Self::new();
		op.retain(prefix);
		op.insert(new[prefix..new.len() - suffix].iter().collect::<String>());
		op.delete(old.len() - suffix - prefix);
		op.retain(suffix);
		op
	}

	/// Returns the length of the source document (before changes).
	pub fn len(&self) -> CharLen {
		self.len
	}

	/// Returns the length of the document after applying changes.
	pub fn len_after(&self) -> CharLen {
		self.len_after
	}

	/// Returns true if this operation contains no components at all.
	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	/// Returns true if applying this operation never changes a document.
	pub fn is_noop(&self) -> bool {
		self.components
			.iter()
			.all(|c| matches!(c, Component::Retain(_)))
	}

	/// Returns the normalized components.
	pub fn components(&self) -> &[Component] {
		&self.components
	}

	/// Consumes the operation, returning its components.
	pub fn into_components(self) -> Vec<Component> {
		self.components
	}

	/// Rebuilds the operation in normal form.
	///
	/// Builders already maintain the normal form, so this is idempotent and
	/// returns an equal operation.
	#[must_use]
	pub fn normalize(self) -> Self {
		Self::from_components(self.components)
	}

	/// Builds an operation from components received from an untrusted source.
	///
	/// # Errors
	/// [`OperationError::LengthOverflow`] if the summed lengths do not fit in a [`CharLen`].
	pub fn try_from_components(components: impl IntoIterator<Item = Component>) -> Result<Self> {
		let mut op = Self::new();
		for component in components {
			let (consumed, produced) = component.lengths();
			op.len = op.len.checked_add(consumed).ok_or(OperationError::LengthOverflow)?;
			op.len_after = op
				.len_after
				.checked_add(produced)
				.ok_or(OperationError::LengthOverflow)?;
			op.merge(component);
		}
		Ok(op)
	}

	/// Appends a component, keeping the normal form.
	///
	/// Lengths are trusted; use [`Self::try_from_components`] for peer input.
	pub fn push(&mut self, component: Component) {
		let (consumed, produced) = component.lengths();
		self.len += consumed;
		self.len_after += produced;
		self.merge(component);
	}

	/// Adds a retain, preserving `n` characters from the source.
	pub fn retain(&mut self, n: CharLen) {
		self.push(Component::Retain(n));
	}

	/// Adds a delete, removing `n` characters from the source.
	pub fn delete(&mut self, n: CharLen) {
		self.push(Component::Delete(n));
	}

	/// Adds an insert at the current position.
	pub fn insert(&mut self, text: impl Into<String>) {
		self.push(Component::insert(text));
	}

	/// Folds an already counted component into the tail of the list.
	///
	/// Merged counts never exceed `len` or `len_after`, so they cannot overflow
	/// once those totals fit.
	fn merge(&mut self, component: Component) {
		if component.is_empty() {
			return;
		}
		match component {
			Component::Retain(n) => match self.components.last_mut() {
				Some(Component::Retain(count)) => *count += n,
				_ => self.components.push(Component::Retain(n)),
			},
			Component::Delete(n) => match self.components.last_mut() {
				Some(Component::Delete(count)) => *count += n,
				_ => self.components.push(Component::Delete(n)),
			},
			Component::Insert(ins) => {
				// Inserts go in front of a trailing delete.
				let delete = if matches!(self.components.last(), Some(Component::Delete(_))) {
					self.components.pop()
				} else {
					None
				};
				match self.components.last_mut() {
					Some(Component::Insert(prev)) => prev.push_str(&ins),
					_ => self.components.push(Component::Insert(ins)),
				}
				self.components.extend(delete);
			}
		}
	}

	fn check_len(&self, actual: CharLen) -> Result<()> {
		if self.len == actual {
			Ok(())
		} else {
			Err(OperationError::LengthMismatch {
				expected: self.len,
				actual,
			})
		}
	}

	/// Applies this operation to `text`, returning the new text.
	///
	/// # Errors
	/// [`OperationError::LengthMismatch`] if `text` is not exactly [`Self::len`] characters.
	pub fn apply(&self, text: &str) -> Result<String> {
		self.check_len(text.chars().count())?;

		let mut out = String::with_capacity(text.len());
		let mut chars = text.chars();
		for component in &self.components {
			match component {
				Component::Retain(n) => out.extend(chars.by_ref().take(*n)),
				Component::Delete(n) => {
					chars.by_ref().take(*n).for_each(drop);
				}
				Component::Insert(ins) => out.push_str(ins.text()),
			}
		}
		Ok(out)
	}

	/// Applies this operation to a rope in place.
	///
	/// # Errors
	/// [`OperationError::LengthMismatch`] if the rope is not exactly [`Self::len`] characters.
	pub fn apply_rope(&self, doc: &mut Rope) -> Result<()> {
		self.check_len(doc.len_chars())?;

		let mut pos = 0;
		for component in &self.components {
			match component {
				Component::Retain(n) => pos += n,
				Component::Delete(n) => doc.remove(pos..pos + n),
				Component::Insert(ins) => {
					doc.insert(pos, ins.text());
					pos += ins.char_len();
				}
			}
		}
		Ok(())
	}

	/// Creates the operation that undoes this one.
	///
	/// `base` is the document this operation was derived from.
	///
	/// # Errors
	/// [`OperationError::LengthMismatch`] if `base` does not match [`Self::len`].
	pub fn invert(&self, base: &str) -> Result<Operation> {
		self.check_len(base.chars().count())?;

		let mut result = Operation::new();
		let mut chars = base.chars();
		for component in &self.components {
			match component {
				Component::Retain(n) => {
					result.retain(*n);
					chars.by_ref().take(*n).for_each(drop);
				}
				Component::Delete(n) => {
					result.insert(chars.by_ref().take(*n).collect::<String>());
				}
				Component::Insert(ins) => result.delete(ins.char_len()),
			}
		}
		Ok(result)
	}

	/// Maps a position in the source document into the result.
	///
	/// Text inserted before `pos` shifts it. Text inserted exactly at `pos`
	/// shifts it only under [`Bias::Right`]; remote cursors use `Right` so
	/// that a peer typing at someone's caret pushes the caret along. A position
	/// inside a deleted range lands where the range used to start.
	pub fn map_pos(&self, pos: CharIdx, bias: Bias) -> CharIdx {
		let mut src = 0;
		let mut dst = 0;

		for component in &self.components {
			match component {
				Component::Insert(ins) => {
					if src < pos || (src == pos && bias == Bias::Right) {
						dst += ins.char_len();
					}
				}
				Component::Retain(n) if src + n > pos => return dst + (pos - src),
				Component::Delete(n) if src + n > pos => return dst,
				Component::Retain(n) => {
					src += n;
					dst += n;
				}
				Component::Delete(n) => src += n,
			}
		}

		// Past the end of the source: keep the distance from the end.
		dst + pos.saturating_sub(src)
	}
}

impl FromIterator<Component> for Operation {
	fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
		Self::from_components(iter)
	}
}
