//! Conversion between [`WireOperation`] and [`Operation`].

use quill_primitives::{Component, Operation, OperationError};
use quill_proto::{WireOp, WireOperation};

/// Converts an [`Operation`] into its wire form.
pub fn to_wire(op: &Operation) -> WireOperation {
	let ops = op
		.components()
		.iter()
		.map(|component| match component {
			Component::Retain(n) => WireOp::Retain(*n),
			Component::Delete(n) => WireOp::Delete(*n),
			Component::Insert(ins) => WireOp::Insert(ins.text().to_string()),
		})
		.collect();
	WireOperation(ops)
}

/// Converts a wire operation back into a normalized [`Operation`].
///
/// Peers may send components in any shape; the result is always in normal form.
///
/// # Errors
/// [`OperationError::LengthOverflow`] if the lengths a peer sent do not add up
/// to a representable document length.
pub fn from_wire(wire: &WireOperation) -> Result<Operation, OperationError> {
	Operation::try_from_components(wire.0.iter().map(|op| match op {
		WireOp::Retain(n) => Component::Retain(*n),
		WireOp::Delete(n) => Component::Delete(*n),
		WireOp::Insert(text) => Component::insert(text.as_str()),
	}))
}
