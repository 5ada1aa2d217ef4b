//! Remote cursor annotations.
//!
//! Cursors are best effort: they may be stale or dropped without affecting
//! the text. Remote cursors are mapped through every operation the binding
//! applies so they stay attached to the same text between updates.

use std::time::{Duration, Instant};

use quill_primitives::{Bias, CharIdx, CharLen, Operation};
use quill_proto::ReplicaId;
use rustc_hash::FxHashMap;

/// A remote replica's selection, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteCursor {
	/// Selection start.
	pub start: CharIdx,
	/// Selection end (caret).
	pub end: CharIdx,
}

/// Cursor state for one document.
#[derive(Debug)]
pub struct Presence {
	cursors: FxHashMap<ReplicaId, RemoteCursor>,
	throttle: Duration,
	last_sent: Option<(CharIdx, CharIdx)>,
	last_sent_at: Option<Instant>,
	pending: Option<(CharIdx, CharIdx)>,
}

impl Presence {
	/// Creates empty presence state with the given broadcast throttle.
	pub fn new(throttle: Duration) -> Self {
		Self {
			cursors: FxHashMap::default(),
			throttle,
			last_sent: None,
			last_sent_at: None,
			pending: None,
		}
	}

	/// Records a remote cursor, clamped to the document length.
	pub fn update(&mut self, author: ReplicaId, start: CharIdx, end: CharIdx, doc_len: CharLen) {
		let cursor = RemoteCursor {
			start: start.min(doc_len),
			end: end.min(doc_len),
		};
		self.cursors.insert(author, cursor);
	}

	/// Forgets a replica's cursor. Returns true if one was known.
	pub fn remove(&mut self, author: &ReplicaId) -> bool {
		self.cursors.remove(author).is_some()
	}

	/// Returns a replica's cursor.
	pub fn get(&self, author: &ReplicaId) -> Option<RemoteCursor> {
		self.cursors.get(author).copied()
	}

	/// Iterates over known remote cursors.
	pub fn cursors(&self) -> impl Iterator<Item = (&ReplicaId, &RemoteCursor)> {
		self.cursors.iter()
	}

	/// Moves every remote cursor through an applied operation.
	pub fn map_through(&mut self, op: &Operation) {
		for cursor in self.cursors.values_mut() {
			cursor.start = op.map_pos(cursor.start, Bias::Right);
			cursor.end = op.map_pos(cursor.end, Bias::Right);
		}
	}

	/// Drops every remote cursor, e.g. after the text was replaced wholesale.
	pub fn clear(&mut self) {
		self.cursors.clear();
	}

	/// Decides whether the local cursor should be broadcast now.
	///
	/// Unchanged positions are never re-sent. Changes inside the throttle
	/// window are parked and released by [`Self::take_due`].
	pub fn note_local(&mut self, start: CharIdx, end: CharIdx, now: Instant) -> bool {
		if self.last_sent == Some((start, end)) {
			self.pending = None;
			return false;
		}
		if self
			.last_sent_at
			.is_some_and(|last| now.duration_since(last) < self.throttle)
		{
			self.pending = Some((start, end));
			return false;
		}
		self.mark_sent(start, end, now);
		true
	}

	/// Returns a parked local cursor once the throttle window has passed.
	pub fn take_due(&mut self, now: Instant) -> Option<(CharIdx, CharIdx)> {
		let (start, end) = self.pending?;
		if self
			.last_sent_at
			.is_some_and(|last| now.duration_since(last) < self.throttle)
		{
			return None;
		}
		self.pending = None;
		self.mark_sent(start, end, now);
		Some((start, end))
	}

	fn mark_sent(&mut self, start: CharIdx, end: CharIdx, now: Instant) {
		self.last_sent = Some((start, end));
		self.last_sent_at = Some(now);
	}
}
