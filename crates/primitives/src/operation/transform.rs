use super::{Component, Operation, Priority};
use crate::error::{OperationError, Result};

impl Operation {
	/// Transforms two concurrent operations against each other.
	///
	/// Both `self` and `other` must be derived from the same document. Returns
	/// `(self', other')` where `self'` applies after `other` and `other'` applies
	/// after `self`, such that both orders produce the same text:
	///
	/// ```text
	/// apply(apply(doc, self), other') == apply(apply(doc, other), self')
	/// ```
	///
	/// When both insert at the same position, `priority` decides which insertion
	/// comes first. Swapping the arguments and flipping the priority yields the
	/// same pair, swapped.
	///
	/// # Errors
	/// [`OperationError::LengthMismatch`] if the operations expect documents of
	/// different lengths.
	pub fn transform(&self, other: &Operation, priority: Priority) -> Result<(Operation, Operation)> {
		if self.len != other.len {
			return Err(OperationError::LengthMismatch {
				expected: self.len,
				actual: other.len,
			});
		}

		let mut a_prime = Operation::new();
		let mut b_prime = Operation::new();
		let mut a_iter = self.components.iter().cloned();
		let mut b_iter = other.components.iter().cloned();
		let mut a = a_iter.next();
		let mut b = b_iter.next();

		loop {
			match (a.take(), b.take()) {
				(None, None) => break,
				(Some(Component::Insert(ours)), Some(Component::Insert(theirs))) => {
					if priority == Priority::Left {
						b_prime.retain(ours.char_len());
						a_prime.push(Component::Insert(ours));
						a = a_iter.next();
						b = Some(Component::Insert(theirs));
					} else {
						a_prime.retain(theirs.char_len());
						b_prime.push(Component::Insert(theirs));
						a = Some(Component::Insert(ours));
						b = b_iter.next();
					}
				}
				(Some(Component::Insert(ours)), next_b) => {
					b_prime.retain(ours.char_len());
					a_prime.push(Component::Insert(ours));
					a = a_iter.next();
					b = next_b;
				}
				(next_a, Some(Component::Insert(theirs))) => {
					a_prime.retain(theirs.char_len());
					b_prime.push(Component::Insert(theirs));
					a = next_a;
					b = b_iter.next();
				}
				(Some(Component::Retain(i)), Some(Component::Retain(j))) => {
					let n = i.min(j);
					a_prime.retain(n);
					b_prime.retain(n);
					a = Component::Retain(i).advance(n).or_else(|| a_iter.next());
					b = Component::Retain(j).advance(n).or_else(|| b_iter.next());
				}
				// Both sides removed the same text; neither needs to do it again.
				(Some(Component::Delete(i)), Some(Component::Delete(j))) => {
					let n = i.min(j);
					a = Component::Delete(i).advance(n).or_else(|| a_iter.next());
					b = Component::Delete(j).advance(n).or_else(|| b_iter.next());
				}
				(Some(Component::Delete(i)), Some(Component::Retain(j))) => {
					let n = i.min(j);
					a_prime.delete(n);
					a = Component::Delete(i).advance(n).or_else(|| a_iter.next());
					b = Component::Retain(j).advance(n).or_else(|| b_iter.next());
				}
				(Some(Component::Retain(i)), Some(Component::Delete(j))) => {
					let n = i.min(j);
					b_prime.delete(n);
					a = Component::Retain(i).advance(n).or_else(|| a_iter.next());
					b = Component::Delete(j).advance(n).or_else(|| b_iter.next());
				}
				(Some(_), None) | (None, Some(_)) => {
					return Err(OperationError::LengthMismatch {
						expected: self.len,
						actual: other.len,
					});
				}
			}
		}

		Ok((a_prime, b_prime))
	}
}
