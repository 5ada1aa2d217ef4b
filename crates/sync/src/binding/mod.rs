//! Per-document reconciliation state.
//!
//! A [`DocumentBinding`] owns the replica's mirror of one document together
//! with the local edits that are not yet known to the other replicas:
//!
//! - `buffer`: edits composed together but not sent, because a send is in flight;
//! - `outstanding`: the send in flight, kept until its echo comes back;
//! - `unconfirmed`: echoed sends that no peer has reported absorbing yet.
//!
//! Every message carries the sender's clock, the highest version it absorbed
//! from each author. A remote edit is transformed against exactly the local
//! sends its clock does not cover, and against the buffer, before it touches
//! the mirror, so the local user never waits on the network. When the mirror provably
//! diverges from a peer's full text, the binding falls back to that text.

mod local;
mod remote;
mod retry;


use std::collections::BTreeMap;
use std::time::Instant;

use quill_primitives::{CharLen, Operation, Priority};
use quill_proto::{CodeMessage, CursorMessage, Message, ReplicaId};

use crate::config::{SyncConfig, TieBreak};
use crate::error::{Result, SyncError};
use crate::presence::Presence;
use crate::surface::EditingSurface;
use crate::transport::Transport;

/// Whether the binding is currently pushing a remote change into the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	/// Normal operation; local edits are accepted.
	Idle,
	/// A remote operation or replacement is being applied to the surface.
	/// Local edits reported in this mode are echoes and are rejected.
	ApplyingRemote,
}

/// Externally visible synchronization status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
	/// No local edits are waiting for acknowledgment.
	Synced,
	/// A send is in flight or edits are buffered behind it.
	Pending,
	/// The in-flight send was retransmitted `max_retries` times without an echo.
	/// Local edits keep buffering until it is acknowledged or the document is reopened.
	Stalled,
}

/// Why an inbound message had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
	/// The message is for another document or project.
	OtherDocument,
	/// The message was already absorbed (at-least-once redelivery).
	Duplicate,
	/// An echo of our own send that matches nothing outstanding.
	UnknownAck,
	/// The message carried neither an edit nor a full text.
	Empty,
}

/// Outcome of feeding an inbound message to a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absorbed {
	/// Nothing changed.
	Ignored(IgnoreReason),
	/// Our own send was echoed back and retired.
	Acknowledged,
	/// A remote edit was transformed and applied; carries the operation as applied locally.
	Applied(Operation),
	/// The mirror was replaced by the sender's full text.
	Resynced,
	/// A cursor update or leave notice changed presence state.
	Presence,
}

/// Acknowledged sends kept until a peer is known to have absorbed them.
const MAX_UNCONFIRMED: usize = 1024;

/// A local operation sent to peers and not yet echoed back.
#[derive(Debug, Clone)]
pub struct Outstanding {
	/// The operation, rebased over every remote edit absorbed since it was
	/// sent by a peer that had not seen it.
	pub op: Operation,
	/// Version this replica was at when sending.
	pub base: u64,
	/// Version carried by the message.
	pub version: u64,
	/// The message exactly as sent, for retransmission.
	message: CodeMessage,
	sent_at: Instant,
	attempts: u32,
	/// A peer's clock already covers this send.
	confirmed: bool,
}

/// An acknowledged send that peers may not have absorbed yet.
#[derive(Debug, Clone)]
struct Unconfirmed {
	version: u64,
	op: Operation,
}

/// Reconciliation state for one open document on one replica.
pub struct DocumentBinding {
	project: Option<String>,
	path: String,
	replica: ReplicaId,
	config: SyncConfig,

	/// Best-known text, consistent with `version`.
	mirror: String,
	mirror_len: CharLen,
	/// Monotonic; advanced per send and raised to any higher version observed.
	version: u64,
	buffer: Option<Operation>,
	outstanding: Vec<Outstanding>,
	/// Acknowledged sends, in send order. A remote operation whose clock does
	/// not cover one of them was made without it and is transformed against it.
	unconfirmed: Vec<Unconfirmed>,
	/// Highest version absorbed from each author. Our own entry is the last version we sent.
	seen: BTreeMap<ReplicaId, u64>,

	mode: Mode,
	stalled: bool,
	presence: Presence,
}

impl DocumentBinding {
	/// Creates a binding for a document whose surface currently shows `text`.
	///
	/// `version` seeds the counter so reopening a document never regresses it.
	pub fn new(
		project: Option<String>,
		path: impl Into<String>,
		replica: ReplicaId,
		text: impl Into<String>,
		version: u64,
		config: SyncConfig,
	) -> Self {
		let mirror = text.into();
		let presence = Presence::new(config.cursor_throttle());
		Self {
			project,
			path: path.into(),
			replica,
			config,
			mirror_len: mirror.chars().count(),
			mirror,
			version,
			buffer: None,
			outstanding: Vec::new(),
			unconfirmed: Vec::new(),
			seen: BTreeMap::new(),
			mode: Mode::Idle,
			stalled: false,
			presence,
		}
	}

	/// Document path.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Project the document belongs to.
	pub fn project(&self) -> Option<&str> {
		self.project.as_deref()
	}

	/// This replica's id.
	pub fn replica(&self) -> &ReplicaId {
		&self.replica
	}

	/// The mirrored text.
	pub fn text(&self) -> &str {
		&self.mirror
	}

	/// Current version counter.
	pub fn version(&self) -> u64 {
		self.version
	}

	/// Local edits not yet sent.
	pub fn buffer(&self) -> Option<&Operation> {
		self.buffer.as_ref()
	}

	/// Sent operations awaiting their echo, in send order.
	pub fn outstanding(&self) -> &[Outstanding] {
		&self.outstanding
	}

	/// Current mode.
	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// Remote cursors for this document.
	pub fn presence(&self) -> &Presence {
		&self.presence
	}

	/// Returns true while local edits are buffered or unacknowledged.
	pub fn has_pending(&self) -> bool {
		self.buffer.is_some() || !self.outstanding.is_empty()
	}

	/// Current synchronization status.
	pub fn status(&self) -> SyncStatus {
		if self.stalled {
			SyncStatus::Stalled
		} else if self.has_pending() {
			SyncStatus::Pending
		} else {
			SyncStatus::Synced
		}
	}

	/// Enters [`Mode::ApplyingRemote`] for a surface update driven by the host.
	///
	/// Hosts whose surfaces deliver change events through their own queue
	/// bracket the update with this and [`Self::end_remote_apply`] so that the
	/// echoed events are rejected by [`Self::on_local_edit`].
	pub fn begin_remote_apply(&mut self) -> Result<()> {
		match self.mode {
			Mode::Idle => {
				self.mode = Mode::ApplyingRemote;
				Ok(())
			}
			Mode::ApplyingRemote => Err(SyncError::AlreadyApplyingRemote),
		}
	}

	/// Returns to [`Mode::Idle`].
	pub fn end_remote_apply(&mut self) {
		self.mode = Mode::Idle;
	}

	/// Tie-break for transforming a local operation against one from `author`.
	fn priority_against(&self, author: &ReplicaId) -> Priority {
		match self.config.tie_break {
			TieBreak::LocalFirst => Priority::Left,
			TieBreak::ReplicaId if self.replica <= *author => Priority::Left,
			TieBreak::ReplicaId => Priority::Right,
		}
	}

	/// Our clock as a message would carry it after sending `version`.
	fn clock_with(&self, version: u64) -> BTreeMap<ReplicaId, u64> {
		let mut clock = self.seen.clone();
		clock.insert(self.replica.clone(), version);
		clock
	}

	fn matches_document(&self, project: Option<&str>, path: &str) -> bool {
		if path != self.path {
			return false;
		}
		match (project, self.project.as_deref()) {
			(Some(theirs), Some(ours)) => theirs == ours,
			_ => true,
		}
	}

	fn set_mirror(&mut self, text: String) {
		self.mirror_len = text.chars().count();
		self.mirror = text;
	}

	/// Pushes a change into the surface with local capture suppressed.
	fn update_surface(&mut self, surface: &mut dyn EditingSurface, op: Option<&Operation>) {
		self.mode = Mode::ApplyingRemote;
		match op {
			Some(op) => {
				if let Err(err) = surface.apply_remote_operation(op) {
					tracing::warn!(
						path = %self.path,
						error = %err,
						"surface rejected remote operation, replacing its text"
					);
					surface.replace_all(&self.mirror);
				}
			}
			None => surface.replace_all(&self.mirror),
		}
		self.mode = Mode::Idle;
	}

	/// Applies a remote cursor update.
	pub fn on_remote_cursor(&mut self, msg: &CursorMessage) -> bool {
		if msg.author == self.replica || !self.matches_document(msg.project.as_deref(), &msg.path) {
			return false;
		}
		self.presence.update(
			msg.author.clone(),
			msg.cursor_start,
			msg.cursor_end,
			self.mirror_len,
		);
		true
	}

	/// Forgets a replica that left the channel.
	pub fn on_leave(&mut self, author: &ReplicaId) -> bool {
		self.presence.remove(author)
	}

	/// Reports the local selection, broadcasting it unless unchanged or throttled.
	pub fn local_cursor(
		&mut self,
		start: usize,
		end: usize,
		transport: &mut dyn Transport,
		now: Instant,
	) -> bool {
		let (start, end) = (start.min(self.mirror_len), end.min(self.mirror_len));
		if !self.presence.note_local(start, end, now) {
			return false;
		}
		self.send_cursor(start, end, transport);
		true
	}

	fn send_cursor(&self, start: usize, end: usize, transport: &mut dyn Transport) {
		transport.send(Message::Cursor(CursorMessage {
			project: self.project.clone(),
			path: self.path.clone(),
			author: self.replica.clone(),
			cursor_start: start,
			cursor_end: end,
		}));
	}
}
