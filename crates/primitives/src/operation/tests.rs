use proptest::prelude::*;

use super::{Bias, Component, Operation, Priority};
use crate::OperationError;
use crate::Rope;

fn op(components: Vec<Component>) -> Operation {
	Operation::from_components(components)
}

#[test]
fn test_operation_retain() {
	let mut op = Operation::new();
	op.retain(5);
	assert_eq!(op.len(), 5);
	assert_eq!(op.len_after(), 5);
	assert!(op.is_noop());
}

#[test]
fn test_operation_delete() {
	let mut op = Operation::new();
	op.delete(2);
	op.retain(3);
	assert_eq!(op.len(), 5);
	assert_eq!(op.len_after(), 3);
}

#[test]
fn test_operation_insert() {
	let mut op = Operation::new();
	op.insert("world");
	op.retain(5);
	assert_eq!(op.len(), 5);
	assert_eq!(op.len_after(), 10);
}

#[test]
fn test_operation_apply() {
	let mut op = Operation::new();
	op.delete(2);
	op.insert("aa");
	op.retain(3);
	assert_eq!(op.apply("hello").unwrap(), "aallo");
}

#[test]
fn test_apply_rope_matches_apply() {
	let op = Operation::splice(11, 5, 1, ", ").unwrap();
	let mut rope = Rope::from("hello world");
	op.apply_rope(&mut rope).unwrap();
	assert_eq!(rope.to_string(), op.apply("hello world").unwrap());
	assert_eq!(rope.to_string(), "hello, world");
}

#[test]
fn test_apply_length_mismatch() {
	let op = Operation::identity(3);
	assert_eq!(
		op.apply("hello"),
		Err(OperationError::LengthMismatch {
			expected: 3,
			actual: 5
		})
	);
	let mut rope = Rope::from("hi");
	assert!(op.apply_rope(&mut rope).is_err());
}

#[test]
fn test_apply_counts_chars_not_bytes() {
	let op = Operation::splice(3, 1, 1, "ö").unwrap();
	assert_eq!(op.apply("a😀c").unwrap(), "aöc");
}

#[test]
fn test_normalize_merges_and_drops() {
	let op = op(vec![
		Component::Retain(0),
		Component::Retain(2),
		Component::Retain(1),
		Component::Delete(1),
		Component::insert("x"),
		Component::insert(""),
		Component::insert("y"),
		Component::Delete(0),
		Component::Delete(2),
	]);
	assert_eq!(
		op.components(),
		&[
			Component::Retain(3),
			Component::insert("xy"),
			Component::Delete(3),
		]
	);
	assert_eq!(op.clone().normalize(), op);
}

#[test]
fn test_try_from_components_overflow() {
	assert_eq!(
		Operation::try_from_components([Component::Retain(usize::MAX), Component::Retain(1)]),
		Err(OperationError::LengthOverflow)
	);
	assert_eq!(
		Operation::try_from_components([Component::insert("a"), Component::Retain(usize::MAX)]),
		Err(OperationError::LengthOverflow)
	);

	let op = Operation::try_from_components([Component::Delete(usize::MAX - 1), Component::insert("ab")]).unwrap();
	assert_eq!(op.len(), usize::MAX - 1);
	assert_eq!(op.len_after(), 2);
	assert_eq!(op.components(), &[Component::insert("ab"), Component::Delete(usize::MAX - 1)]);
}

#[test]
fn test_splice_out_of_bounds() {
	assert_eq!(
		Operation::splice(3, 2, 2, ""),
		Err(OperationError::OutOfBounds { pos: 4, len: 3 })
	);
}

#[test]
fn test_compose_simple() {
	let a = Operation::splice(5, 5, 0, " world").unwrap();
	let b = Operation::splice(11, 0, 0, "Oh, ").unwrap();
	let composed = a.compose(b).unwrap();
	assert_eq!(composed.apply("hello").unwrap(), "Oh, hello world");
}

#[test]
fn test_compose_insert_then_delete_cancels() {
	let a = Operation::splice(2, 1, 0, "xyz").unwrap();
	let b = Operation::splice(5, 1, 3, "").unwrap();
	let composed = a.compose(b).unwrap();
	assert!(composed.is_noop());
	assert_eq!(composed.apply("ab").unwrap(), "ab");
}

#[test]
fn test_compose_length_mismatch() {
	let a = Operation::identity(3);
	let b = Operation::identity(4);
	assert!(matches!(
		a.compose(b),
		Err(OperationError::LengthMismatch { .. })
	));
}

#[test]
fn test_transform_non_overlapping_inserts() {
	let doc = "hello";
	let local = Operation::splice(5, 5, 0, " world").unwrap();
	let remote = Operation::splice(5, 0, 0, "Oh, ").unwrap();
	let (local_prime, remote_prime) = local.transform(&remote, Priority::Left).unwrap();

	let here = remote_prime.apply(&local.apply(doc).unwrap()).unwrap();
	let there = local_prime.apply(&remote.apply(doc).unwrap()).unwrap();
	assert_eq!(here, "Oh, hello world");
	assert_eq!(there, "Oh, hello world");
}

#[test]
fn test_transform_same_position_priority() {
	let doc = "ab";
	let x = Operation::splice(2, 1, 0, "X").unwrap();
	let y = Operation::splice(2, 1, 0, "Y").unwrap();

	let (x_prime, y_prime) = x.transform(&y, Priority::Left).unwrap();
	assert_eq!(y_prime.apply(&x.apply(doc).unwrap()).unwrap(), "aXYb");
	assert_eq!(x_prime.apply(&y.apply(doc).unwrap()).unwrap(), "aXYb");

	let (x_prime, y_prime) = x.transform(&y, Priority::Right).unwrap();
	assert_eq!(y_prime.apply(&x.apply(doc).unwrap()).unwrap(), "aYXb");
	assert_eq!(x_prime.apply(&y.apply(doc).unwrap()).unwrap(), "aYXb");
}

#[test]
fn test_transform_overlapping_deletes() {
	let doc = "abcdef";
	let a = Operation::splice(6, 1, 3, "").unwrap();
	let b = Operation::splice(6, 2, 3, "").unwrap();
	let (a_prime, b_prime) = a.transform(&b, Priority::Left).unwrap();
	assert_eq!(b_prime.apply(&a.apply(doc).unwrap()).unwrap(), "af");
	assert_eq!(a_prime.apply(&b.apply(doc).unwrap()).unwrap(), "af");
}

#[test]
fn test_transform_length_mismatch() {
	let a = Operation::identity(2);
	let b = Operation::identity(3);
	assert!(a.transform(&b, Priority::Left).is_err());
}

#[test]
fn test_map_pos_bias() {
	let op = Operation::splice(5, 2, 0, "xx").unwrap();
	assert_eq!(op.map_pos(1, Bias::Left), 1);
	assert_eq!(op.map_pos(2, Bias::Left), 2);
	assert_eq!(op.map_pos(2, Bias::Right), 4);
	assert_eq!(op.map_pos(5, Bias::Left), 7);
}

#[test]
fn test_map_pos_insert_at_start() {
	let op = Operation::splice(3, 0, 0, "ab").unwrap();
	assert_eq!(op.map_pos(0, Bias::Left), 0);
	assert_eq!(op.map_pos(0, Bias::Right), 2);
	assert_eq!(op.map_pos(3, Bias::Left), 5);
}

#[test]
fn test_map_pos_inside_delete() {
	let op = Operation::splice(10, 2, 5, "").unwrap();
	assert_eq!(op.map_pos(4, Bias::Left), 2);
	assert_eq!(op.map_pos(8, Bias::Left), 3);
}

#[test]
fn test_diff() {
	let cases = [
		("hello", "hello"),
		("hello", "helloabc"),
		("helloabc", "hello"),
		("world", "hello world"),
		("hello world", "world"),
		("hello world", "hello rust"),
		("", "abc"),
		("abc", ""),
		("aaa", "aa"),
		("né😀", "n😀"),
	];
	for (old, new) in cases {
		let op = Operation::diff(old, new);
		assert_eq!(op.apply(old).unwrap(), new, "diff({old:?} -> {new:?})");
	}
	assert!(Operation::diff("same", "same").is_noop());
}

#[test]
fn test_invert() {
	let base = "hello world";
	let op = Operation::splice(11, 0, 5, "goodbye").unwrap();
	let edited = op.apply(base).unwrap();
	assert_eq!(edited, "goodbye world");
	assert_eq!(op.invert(base).unwrap().apply(&edited).unwrap(), base);
}

/// Generates a document mixing ASCII and multi-byte characters.
fn arb_document() -> impl Strategy<Value = String> {
	"[a-z é😀\n]{0,40}"
}

/// Generates edit steps that [`build_op`] turns into a valid operation for any length.
fn arb_steps() -> impl Strategy<Value = Vec<(u8, usize, String)>> {
	prop::collection::vec((0u8..3, 1usize..6, "[A-Zß]{1,3}"), 0..10)
}

/// Builds an operation valid against a document of `len` characters.
fn build_op(len: usize, steps: &[(u8, usize, String)]) -> Operation {
	let mut op = Operation::new();
	let mut remaining = len;
	for (kind, n, text) in steps {
		match kind {
			0 => {
				let n = (*n).min(remaining);
				op.retain(n);
				remaining -= n;
			}
			1 => {
				let n = (*n).min(remaining);
				op.delete(n);
				remaining -= n;
			}
			_ => op.insert(text.as_str()),
		}
	}
	op.retain(remaining);
	op
}

fn arb_component() -> impl Strategy<Value = Component> {
	prop_oneof![
		(0usize..4).prop_map(Component::Retain),
		(0usize..4).prop_map(Component::Delete),
		"[a-c]{0,2}".prop_map(Component::insert),
	]
}

proptest! {
	/// Both orders of applying concurrent edits converge.
	#[test]
	fn prop_transform_converges(doc in arb_document(), a_steps in arb_steps(), b_steps in arb_steps()) {
		let len = doc.chars().count();
		let a = build_op(len, &a_steps);
		let b = build_op(len, &b_steps);

		let (a_prime, b_prime) = a.transform(&b, Priority::Left).unwrap();
		let via_a = b_prime.apply(&a.apply(&doc).unwrap()).unwrap();
		let via_b = a_prime.apply(&b.apply(&doc).unwrap()).unwrap();
		prop_assert_eq!(via_a, via_b);
	}

	/// Swapping arguments and flipping priority yields the same pair.
	#[test]
	fn prop_transform_symmetric(doc in arb_document(), a_steps in arb_steps(), b_steps in arb_steps()) {
		let len = doc.chars().count();
		let a = build_op(len, &a_steps);
		let b = build_op(len, &b_steps);

		let (a_prime, b_prime) = a.transform(&b, Priority::Left).unwrap();
		let (b_prime2, a_prime2) = b.transform(&a, Priority::Right).unwrap();
		prop_assert_eq!(a_prime, a_prime2);
		prop_assert_eq!(b_prime, b_prime2);
	}

	/// Composing then applying equals applying sequentially.
	#[test]
	fn prop_compose_apply(doc in arb_document(), a_steps in arb_steps(), b_steps in arb_steps()) {
		let a = build_op(doc.chars().count(), &a_steps);
		let after_a = a.apply(&doc).unwrap();
		let b = build_op(a.len_after(), &b_steps);

		let sequential = b.apply(&after_a).unwrap();
		let composed = a.compose(b).unwrap();
		prop_assert_eq!(composed.apply(&doc).unwrap(), sequential);
	}

	/// Normalization is idempotent and yields the canonical shape.
	#[test]
	fn prop_normalize_idempotent(components in prop::collection::vec(arb_component(), 0..12)) {
		let once = Operation::from_components(components);
		let twice = once.clone().normalize();
		prop_assert_eq!(&once, &twice);

		for component in once.components() {
			prop_assert!(!component.is_empty());
		}
		for pair in once.components().windows(2) {
			prop_assert!(std::mem::discriminant(&pair[0]) != std::mem::discriminant(&pair[1]));
			prop_assert!(!matches!(pair, [Component::Delete(_), Component::Insert(_)]));
		}
	}

	/// Checked construction agrees with the trusted builder when nothing overflows.
	#[test]
	fn prop_try_from_components_matches(components in prop::collection::vec(arb_component(), 0..12)) {
		let checked = Operation::try_from_components(components.clone()).unwrap();
		prop_assert_eq!(checked, Operation::from_components(components));
	}

	/// Inserting then deleting the same text restores the document.
	#[test]
	fn prop_insert_delete_roundtrip(doc in arb_document(), pos in 0usize..50, text in "[a-z😀]{1,8}") {
		let len = doc.chars().count();
		let pos = pos.min(len);
		let inserted = text.chars().count();

		let insert = Operation::splice(len, pos, 0, &text).unwrap();
		let edited = insert.apply(&doc).unwrap();
		let delete = Operation::splice(len + inserted, pos, inserted, "").unwrap();
		prop_assert_eq!(delete.apply(&edited).unwrap(), doc);
	}

	/// Applying an operation then its inverse restores the document.
	#[test]
	fn prop_invert_roundtrip(doc in arb_document(), steps in arb_steps()) {
		let op = build_op(doc.chars().count(), &steps);
		let edited = op.apply(&doc).unwrap();
		prop_assert_eq!(op.invert(&doc).unwrap().apply(&edited).unwrap(), doc);
	}

	/// Diff always produces an operation mapping old to new.
	#[test]
	fn prop_diff(old in arb_document(), new in arb_document()) {
		prop_assert_eq!(Operation::diff(&old, &new).apply(&old).unwrap(), new);
	}
}
