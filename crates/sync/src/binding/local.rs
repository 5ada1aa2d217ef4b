//! Local edit path: buffer, compose and send.

use std::time::Instant;

use quill_primitives::Operation;
use quill_proto::{CodeMessage, Message};

use super::{DocumentBinding, Mode, Outstanding};
use crate::convert;
use crate::error::{Result, SyncError};
use crate::surface::LocalDelta;
use crate::transport::Transport;

impl DocumentBinding {
	/// Absorbs an edit the user made on the surface.
	///
	/// The delta is expressed against the mirror, composed into the buffer and
	/// sent right away if nothing is in flight. Returns true if a message was sent.
	///
	/// # Errors
	/// - [`SyncError::ReentrantLocalEdit`] while a remote change is being applied.
	/// - [`SyncError::DeltaOutOfBounds`] if the delta does not fit the mirror.
	pub fn on_local_edit(
		&mut self,
		delta: &LocalDelta,
		transport: &mut dyn Transport,
		now: Instant,
	) -> Result<bool> {
		if self.mode == Mode::ApplyingRemote {
			return Err(SyncError::ReentrantLocalEdit);
		}

		let op = Operation::splice(
			self.mirror_len,
			delta.position,
			delta.removed_len,
			&delta.inserted_text,
		)
		.map_err(|_| SyncError::DeltaOutOfBounds {
			position: delta.position,
			removed: delta.removed_len,
			len: self.mirror_len,
		})?;

		self.push_local(op, transport, now)
	}

	/// Absorbs the surface's whole new text, for widgets that cannot report deltas.
	///
	/// # Errors
	/// [`SyncError::ReentrantLocalEdit`] while a remote change is being applied.
	pub fn on_local_text(
		&mut self,
		text: &str,
		transport: &mut dyn Transport,
		now: Instant,
	) -> Result<bool> {
		if self.mode == Mode::ApplyingRemote {
			return Err(SyncError::ReentrantLocalEdit);
		}
		let op = Operation::diff(&self.mirror, text);
		self.push_local(op, transport, now)
	}

	fn push_local(&mut self, op: Operation, transport: &mut dyn Transport, now: Instant) -> Result<bool> {
		if op.is_noop() {
			return Ok(false);
		}

		let mirror = op.apply(&self.mirror)?;
		let buffer = match &self.buffer {
			Some(buffer) => buffer.clone().compose(op.clone())?,
			None => op.clone(),
		};

		self.set_mirror(mirror);
		self.buffer = Some(buffer);
		self.presence.map_through(&op);

		Ok(self.flush(transport, now))
	}

	/// Sends the buffer if nothing is in flight.
	///
	/// Sends are strictly one at a time per document: while an operation is
	/// outstanding, later edits keep composing into the buffer. Returns true if
	/// a message was sent.
	pub fn flush(&mut self, transport: &mut dyn Transport, now: Instant) -> bool {
		if !self.outstanding.is_empty() {
			return false;
		}
		let Some(op) = self.buffer.take() else {
			return false;
		};
		if op.is_noop() {
			return false;
		}

		let base = self.version;
		let version = base + 1;
		self.version = version;

		let message = CodeMessage {
			project: self.project.clone(),
			path: self.path.clone(),
			base,
			version,
			ops: convert::to_wire(&op),
			full_text: Some(self.mirror.clone()),
			author: self.replica.clone(),
			clock: self.clock_with(version),
		};
		self.seen.insert(self.replica.clone(), version);

		tracing::debug!(path = %self.path, base, version, "sending local operation");
		transport.send(Message::Code(message.clone()));

		self.outstanding.push(Outstanding {
			op,
			base,
			version,
			message,
			sent_at: now,
			attempts: 0,
			confirmed: false,
		});
		true
	}
}
