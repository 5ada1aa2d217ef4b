use super::{Component, Operation};
use crate::error::{OperationError, Result};

impl Operation {
	/// Composes two sequential operations into a single equivalent operation.
	///
	/// The result applied to a document equals applying `self` and then `other`.
	///
	/// # Errors
	/// [`OperationError::LengthMismatch`] if `other` does not expect a document
	/// of `self.len_after()` characters.
	pub fn compose(self, other: Operation) -> Result<Operation> {
		if self.len_after != other.len {
			return Err(OperationError::LengthMismatch {
				expected: other.len,
				actual: self.len_after,
			});
		}

		let mut result = Operation::new();
		let mut a_iter = self.components.into_iter();
		let mut b_iter = other.components.into_iter();
		let mut a = a_iter.next();
		let mut b = b_iter.next();

		loop {
			match (a.take(), b.take()) {
				(None, None) => break,
				// Deletions in the first operation never reach the second.
				(Some(Component::Delete(n)), next_b) => {
					result.delete(n);
					a = a_iter.next();
					b = next_b;
				}
				// Insertions in the second operation consume nothing from the first.
				(next_a, Some(Component::Insert(ins))) => {
					result.push(Component::Insert(ins));
					a = next_a;
					b = b_iter.next();
				}
				(Some(Component::Retain(i)), Some(Component::Retain(j))) => {
					let n = i.min(j);
					result.retain(n);
					a = Component::Retain(i).advance(n).or_else(|| a_iter.next());
					b = Component::Retain(j).advance(n).or_else(|| b_iter.next());
				}
				(Some(Component::Retain(i)), Some(Component::Delete(j))) => {
					let n = i.min(j);
					result.delete(n);
					a = Component::Retain(i).advance(n).or_else(|| a_iter.next());
					b = Component::Delete(j).advance(n).or_else(|| b_iter.next());
				}
				(Some(Component::Insert(ins)), Some(Component::Retain(j))) => {
					let n = ins.char_len().min(j);
					let (kept, rest) = ins.split_at(n);
					result.push(Component::Insert(kept));
					a = Some(Component::Insert(rest))
						.filter(|c| !c.is_empty())
						.or_else(|| a_iter.next());
					b = Component::Retain(j).advance(n).or_else(|| b_iter.next());
				}
				// Text inserted by the first operation and deleted by the second cancels out.
				(Some(Component::Insert(ins)), Some(Component::Delete(j))) => {
					let n = ins.char_len().min(j);
					a = Component::Insert(ins).advance(n).or_else(|| a_iter.next());
					b = Component::Delete(j).advance(n).or_else(|| b_iter.next());
				}
				(Some(_), None) | (None, Some(_)) => {
					return Err(OperationError::LengthMismatch {
						expected: other.len,
						actual: self.len_after,
					});
				}
			}
		}

		Ok(result)
	}
}
