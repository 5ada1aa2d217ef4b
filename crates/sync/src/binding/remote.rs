//! Remote path: acknowledgments, transformation and resync.

use std::time::Instant;

use quill_primitives::{Operation, OperationError, Priority};
use quill_proto::CodeMessage;

use super::{Absorbed, DocumentBinding, IgnoreReason, MAX_UNCONFIRMED, Unconfirmed};
use crate::convert;
use crate::error::Result;
use crate::surface::EditingSurface;
use crate::transport::Transport;

/// Pending local state rebased over one remote operation.
struct Rebased {
	unconfirmed: Vec<Unconfirmed>,
	/// Parallel to `outstanding`; `None` for sends the sender had already absorbed.
	outstanding: Vec<Option<Operation>>,
	buffer: Option<Operation>,
	remote: Operation,
	mirror: String,
}

impl DocumentBinding {
	/// Absorbs a code message from the channel, including echoes of our own sends.
	///
	/// # Errors
	/// [`SyncError::Operation`](crate::SyncError::Operation) if the remote
	/// operation does not fit the local state and the message carries no full
	/// text to recover from. The operation is dropped and the text is unchanged.
	pub fn on_remote_message(
		&mut self,
		msg: &CodeMessage,
		surface: &mut dyn EditingSurface,
		transport: &mut dyn Transport,
		now: Instant,
	) -> Result<Absorbed> {
		if !self.matches_document(msg.project.as_deref(), &msg.path) {
			return Ok(Absorbed::Ignored(IgnoreReason::OtherDocument));
		}

		self.version = self.version.max(msg.version);

		if msg.author == self.replica {
			return Ok(self.acknowledge(msg, transport, now));
		}

		if self
			.seen
			.get(&msg.author)
			.is_some_and(|seen| msg.version <= *seen)
		{
			tracing::debug!(
				path = %self.path,
				author = %msg.author,
				version = msg.version,
				"ignoring redelivered operation"
			);
			return Ok(Absorbed::Ignored(IgnoreReason::Duplicate));
		}
		self.seen.insert(msg.author.clone(), msg.version);

		let remote = match convert::from_wire(&msg.ops) {
			Ok(remote) => remote,
			Err(err) => return self.reject(err, msg, surface),
		};
		if remote.is_empty() {
			return Ok(match &msg.full_text {
				Some(text) => {
					self.hard_resync(text, msg, surface);
					Absorbed::Resynced
				}
				None => Absorbed::Ignored(IgnoreReason::Empty),
			});
		}

		let covered = (!msg.clock.is_empty())
			.then(|| msg.clock.get(&self.replica).copied().unwrap_or(0));
		let priority = self.priority_against(&msg.author);
		let rebased = match self.rebase(remote, priority, covered) {
			Ok(rebased) => rebased,
			Err(err) => return self.reject(err, msg, surface),
		};

		self.unconfirmed = rebased.unconfirmed;
		for (entry, op) in self.outstanding.iter_mut().zip(rebased.outstanding) {
			match op {
				Some(op) => entry.op = op,
				None => entry.confirmed = true,
			}
		}
		self.buffer = rebased.buffer;
		self.set_mirror(rebased.mirror);
		self.presence.map_through(&rebased.remote);

		if let Some(text) = &msg.full_text
			&& *text != self.mirror
		{
			if !self.has_pending() && self.clock_dominates(msg) {
				tracing::warn!(
					path = %self.path,
					author = %msg.author,
					version = msg.version,
					"mirror diverged from sender's text, resyncing"
				);
				self.hard_resync(text, msg, surface);
				return Ok(Absorbed::Resynced);
			}
			tracing::debug!(
				path = %self.path,
				author = %msg.author,
				pending = self.has_pending(),
				"full text differs from mirror but states are not comparable"
			);
		}

		self.update_surface(surface, Some(&rebased.remote));
		Ok(Absorbed::Applied(rebased.remote))
	}

	/// Handles a remote operation that cannot be absorbed.
	///
	/// Falls back to the message's full text when it has one; otherwise the
	/// operation is dropped and the error returned.
	fn reject(
		&mut self,
		err: OperationError,
		msg: &CodeMessage,
		surface: &mut dyn EditingSurface,
	) -> Result<Absorbed> {
		match &msg.full_text {
			Some(text) => {
				tracing::warn!(
					path = %self.path,
					author = %msg.author,
					error = %err,
					"remote operation does not fit local state, resyncing from full text"
				);
				self.hard_resync(text, msg, surface);
				Ok(Absorbed::Resynced)
			}
			None => {
				tracing::warn!(
					path = %self.path,
					author = %msg.author,
					error = %err,
					"dropping remote operation without full text"
				);
				Err(err.into())
			}
		}
	}

	/// Retires the outstanding entry our own echo refers to and sends the buffer.
	fn acknowledge(&mut self, msg: &CodeMessage, transport: &mut dyn Transport, now: Instant) -> Absorbed {
		let idx = self
			.outstanding
			.iter()
			.position(|entry| entry.version == msg.version)
			.or_else(|| {
				self.outstanding
					.iter()
					.position(|entry| entry.base == msg.base)
			});

		let Some(idx) = idx else {
			tracing::trace!(path = %self.path, version = msg.version, "echo matches nothing outstanding");
			return Absorbed::Ignored(IgnoreReason::UnknownAck);
		};

		let entry = self.outstanding.remove(idx);
		if !entry.confirmed {
			if self.unconfirmed.len() == MAX_UNCONFIRMED {
				self.unconfirmed.remove(0);
			}
			self.unconfirmed.push(Unconfirmed {
				version: entry.version,
				op: entry.op,
			});
		}
		if self.stalled {
			tracing::info!(path = %self.path, version = entry.version, "stalled send acknowledged");
		}
		self.stalled = false;
		tracing::debug!(path = %self.path, version = entry.version, "operation acknowledged");

		self.flush(transport, now);
		Absorbed::Acknowledged
	}

	/// Transforms pending local state against `remote` without touching `self`.
	///
	/// `covered` is the highest of our versions the sender had absorbed, or
	/// `None` if it sent no clock. Such senders are assumed to have seen every
	/// acknowledged send, which holds when the channel delivers in one global order.
	fn rebase(
		&self,
		mut remote: Operation,
		priority: Priority,
		covered: Option<u64>,
	) -> std::result::Result<Rebased, OperationError> {
		let mut unconfirmed = Vec::new();
		for sent in &self.unconfirmed {
			if covered.is_some_and(|seen| sent.version > seen) {
				let (local_prime, remote_prime) = sent.op.transform(&remote, priority)?;
				unconfirmed.push(Unconfirmed {
					version: sent.version,
					op: local_prime,
				});
				remote = remote_prime;
			}
		}

		let mut outstanding = Vec::with_capacity(self.outstanding.len());
		for entry in &self.outstanding {
			if entry.confirmed || covered.is_some_and(|seen| entry.version <= seen) {
				outstanding.push(None);
				continue;
			}
			let (local_prime, remote_prime) = entry.op.transform(&remote, priority)?;
			outstanding.push(Some(local_prime));
			remote = remote_prime;
		}

		let buffer = match &self.buffer {
			Some(buffer) => {
				let (buffer_prime, remote_prime) = buffer.transform(&remote, priority)?;
				remote = remote_prime;
				Some(buffer_prime)
			}
			None => None,
		};

		let mirror = remote.apply(&self.mirror)?;
		Ok(Rebased {
			unconfirmed,
			outstanding,
			buffer,
			remote,
			mirror,
		})
	}

	/// Returns true if the sender had absorbed at least every operation we have.
	///
	/// Its text is then a state we can adopt wholesale: anything it has beyond
	/// ours was missed here, and the adopted clock makes late copies duplicates.
	/// A sender behind us on any author still has our edits in flight, so its
	/// text is not comparable. Senders that do not carry a clock are trusted,
	/// matching peers that only compare text.
	fn clock_dominates(&self, msg: &CodeMessage) -> bool {
		msg.clock.is_empty()
			|| self
				.seen
				.iter()
				.all(|(author, version)| msg.clock.get(author).is_some_and(|theirs| theirs >= version))
	}

	/// Replaces the mirror with `text` and discards pending local state.
	///
	/// Unacknowledged local edits are lost; this is the price of recovering
	/// from a transform bug or a missed message.
	fn hard_resync(&mut self, text: &str, msg: &CodeMessage, surface: &mut dyn EditingSurface) {
		let dropped = self.outstanding.len() + usize::from(self.buffer.is_some());
		self.outstanding.clear();
		self.unconfirmed.clear();
		self.buffer = None;
		self.stalled = false;
		if !msg.clock.is_empty() {
			self.seen = msg.clock.clone();
		}
		self.set_mirror(text.to_string());
		self.presence.clear();

		tracing::info!(
			path = %self.path,
			author = %msg.author,
			dropped,
			"document resynced from full text"
		);
		self.update_surface(surface, None);
	}

	/// Replaces the mirror and the surface with authoritative text.
	///
	/// Discards buffered and outstanding local edits.
	pub fn resync(&mut self, text: &str, surface: &mut dyn EditingSurface) {
		self.outstanding.clear();
		self.unconfirmed.clear();
		self.buffer = None;
		self.stalled = false;
		self.set_mirror(text.to_string());
		self.presence.clear();
		tracing::info!(path = %self.path, "document resynced on request");
		self.update_surface(surface, None);
	}
}
