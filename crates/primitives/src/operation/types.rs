/// A position in the text, measured in characters (not bytes).
///
/// This is the canonical coordinate space for Quill operations.
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
pub type CharLen = usize;

/// Bias determines how positions at insertion boundaries are mapped.
///
/// When mapping a position through an operation, bias determines whether the
/// position stays before an insertion at the same location or moves after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
	/// Position stays before insertions at the same location.
	Left,
	/// Position moves after insertions at the same location.
	Right,
}

/// Tie-break used by [`Operation::transform`](super::Operation::transform).
///
/// When both operations insert at the same position, the insertion of the
/// operation holding [`Priority::Left`] ends up first in the merged text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
	/// This operation's insertions are ordered first.
	Left,
	/// The other operation's insertions are ordered first.
	Right,
}

impl Priority {
	/// Returns the priority the other side of a transform holds.
	#[must_use]
	pub fn flip(self) -> Self {
		match self {
			Self::Left => Self::Right,
			Self::Right => Self::Left,
		}
	}
}

/// Text inserted by an operation, paired with its length in chars.
///
/// The algebra walks documents char by char, so the count is taken once when
/// the text is created and carried with it. The fields are private to keep
/// the two in step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
	text: String,
	char_len: CharLen,
}

impl Insertion {
	pub fn new(text: impl Into<String>) -> Self {
		let text = text.into();
		Self {
			char_len: text.chars().count(),
			text,
		}
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	/// Length in chars.
	pub fn char_len(&self) -> CharLen {
		self.char_len
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}

	pub fn into_text(self) -> String {
		self.text
	}

	pub(super) fn push_str(&mut self, other: &Insertion) {
		self.text.push_str(&other.text);
		self.char_len += other.char_len;
	}

	/// Splits after the first `n` chars; `n` must not exceed [`Self::char_len`].
	pub(super) fn split_at(self, n: CharLen) -> (Insertion, Insertion) {
		let Self { mut text, char_len } = self;
		let byte = text.char_indices().nth(n).map_or(text.len(), |(idx, _)| idx);
		let tail = text.split_off(byte);
		(
			Self { text, char_len: n },
			Self {
				text: tail,
				char_len: char_len - n,
			},
		)
	}
}

/// A single component of an [`Operation`](super::Operation).
///
/// Components describe a walk over the source document: retaining existing
/// text, deleting it, or inserting new text at the cursor of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
	/// Copy the next N characters of the source document unchanged.
	Retain(CharLen),
	/// Remove the next N characters of the source document.
	Delete(CharLen),
	/// Insert new text at the current position.
	Insert(Insertion),
}

impl Component {
	/// Creates an insert component.
	pub fn insert(text: impl Into<String>) -> Self {
		Self::Insert(Insertion::new(text))
	}

	/// Number of characters this component spans (walked or produced).
	pub fn span(&self) -> CharLen {
		match self {
			Self::Retain(n) | Self::Delete(n) => *n,
			Self::Insert(ins) => ins.char_len(),
		}
	}

	/// Chars consumed from the source and produced in the result.
	pub(super) fn lengths(&self) -> (CharLen, CharLen) {
		match self {
			Self::Retain(n) => (*n, *n),
			Self::Delete(n) => (*n, 0),
			Self::Insert(ins) => (0, ins.char_len()),
		}
	}

	/// Returns true if this component has zero length.
	pub fn is_empty(&self) -> bool {
		self.span() == 0
	}

	/// Drops the first `n` characters, returning what is left (if anything).
	pub(super) fn advance(self, n: CharLen) -> Option<Component> {
		let rest = match self {
			Self::Retain(len) => Self::Retain(len.saturating_sub(n)),
			Self::Delete(len) => Self::Delete(len.saturating_sub(n)),
			Self::Insert(ins) => Self::Insert(ins.split_at(n).1),
		};
		(!rest.is_empty()).then_some(rest)
	}
}
