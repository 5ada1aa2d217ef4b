//! Routing of channel messages to per-document bindings.
//!
//! The [`SyncManager`] owns every open [`DocumentBinding`] of one replica
//! together with its surface. It enforces one binding per path and keeps a
//! version registry so a document that is closed and reopened resumes from
//! the highest version it had reached.

use std::time::Instant;

use quill_proto::{Message, ReplicaId};
use rustc_hash::FxHashMap;

use crate::binding::{Absorbed, DocumentBinding, IgnoreReason, SyncStatus};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::surface::{EditingSurface, LocalDelta};
use crate::transport::Transport;

/// An open document: its binding and the surface it keeps in step.
pub struct OpenDocument<S> {
	/// Reconciliation state.
	pub binding: DocumentBinding,
	/// The live buffer.
	pub surface: S,
}

impl<S: EditingSurface> OpenDocument<S> {
	/// Forwards a surface edit to the binding.
	pub fn local_edit(
		&mut self,
		delta: &LocalDelta,
		transport: &mut dyn Transport,
		now: Instant,
	) -> Result<bool> {
		self.binding.on_local_edit(delta, transport, now)
	}

	/// Returns true if the surface shows exactly the mirrored text.
	pub fn is_consistent(&self) -> bool {
		self.surface.contents() == self.binding.text()
	}
}

/// Manages bindings for all documents open on one replica.
pub struct SyncManager<S> {
	replica: ReplicaId,
	project: Option<String>,
	config: SyncConfig,
	docs: FxHashMap<String, OpenDocument<S>>,
	/// Last version reached by each closed document.
	versions: FxHashMap<String, u64>,
}

impl<S: EditingSurface> SyncManager<S> {
	/// Creates a manager for `replica` with no open documents.
	pub fn new(replica: ReplicaId, project: Option<String>, config: SyncConfig) -> Self {
		Self {
			replica,
			project,
			config,
			docs: FxHashMap::default(),
			versions: FxHashMap::default(),
		}
	}

	/// This replica's id.
	pub fn replica(&self) -> &ReplicaId {
		&self.replica
	}

	/// Opens a document whose surface currently shows its text.
	///
	/// # Errors
	/// [`SyncError::DocumentAlreadyOpen`] if a binding already exists for `path`.
	pub fn open(&mut self, path: &str, surface: S) -> Result<&mut OpenDocument<S>> {
		if self.docs.contains_key(path) {
			return Err(SyncError::DocumentAlreadyOpen(path.to_string()));
		}

		let version = self.recorded_version(path);
		let binding = DocumentBinding::new(
			self.project.clone(),
			path,
			self.replica.clone(),
			surface.contents(),
			version,
			self.config.clone(),
		);
		tracing::debug!(path, version, replica = %self.replica, "document opened");

		Ok(self
			.docs
			.entry(path.to_string())
			.or_insert(OpenDocument { binding, surface }))
	}

	/// Closes a document, recording its version and returning its surface.
	///
	/// Buffered and outstanding local edits are discarded.
	///
	/// # Errors
	/// [`SyncError::DocumentNotOpen`] if no binding exists for `path`.
	pub fn close(&mut self, path: &str) -> Result<S> {
		let doc = self
			.docs
			.remove(path)
			.ok_or_else(|| SyncError::DocumentNotOpen(path.to_string()))?;
		let version = doc.binding.version();
		if doc.binding.has_pending() {
			tracing::warn!(path, version, "closing document with unacknowledged edits");
		}
		self.record_version(path, version);
		tracing::debug!(path, version, "document closed");
		Ok(doc.surface)
	}

	/// Returns the open document at `path`.
	pub fn document(&self, path: &str) -> Option<&OpenDocument<S>> {
		self.docs.get(path)
	}

	/// Returns the open document at `path` mutably.
	pub fn document_mut(&mut self, path: &str) -> Option<&mut OpenDocument<S>> {
		self.docs.get_mut(path)
	}

	/// Iterates over the paths of open documents.
	pub fn paths(&self) -> impl Iterator<Item = &str> {
		self.docs.keys().map(String::as_str)
	}

	/// Version a document will start from when next opened.
	pub fn recorded_version(&self, path: &str) -> u64 {
		self.versions.get(path).copied().unwrap_or(0)
	}

	fn record_version(&mut self, path: &str, version: u64) {
		let entry = self.versions.entry(path.to_string()).or_insert(0);
		*entry = (*entry).max(version);
	}

	/// Forwards a surface edit to the binding for `path`.
	///
	/// # Errors
	/// [`SyncError::DocumentNotOpen`] if `path` is not open, or any error of
	/// [`DocumentBinding::on_local_edit`].
	pub fn local_edit(
		&mut self,
		path: &str,
		delta: &LocalDelta,
		transport: &mut dyn Transport,
		now: Instant,
	) -> Result<bool> {
		self.docs
			.get_mut(path)
			.ok_or_else(|| SyncError::DocumentNotOpen(path.to_string()))?
			.local_edit(delta, transport, now)
	}

	/// Routes an inbound message to the binding it concerns.
	///
	/// Messages for documents that are not open here are ignored. A leave
	/// notice removes the author's cursor from every open document.
	///
	/// # Errors
	/// Propagates [`DocumentBinding::on_remote_message`] failures.
	pub fn handle_message(
		&mut self,
		msg: &Message,
		transport: &mut dyn Transport,
		now: Instant,
	) -> Result<Absorbed> {
		match msg {
			Message::Code(code) => {
				let Some(doc) = self.docs.get_mut(&code.path) else {
					tracing::trace!(path = %code.path, "message for unopened document");
					return Ok(Absorbed::Ignored(IgnoreReason::OtherDocument));
				};
				doc.binding
					.on_remote_message(code, &mut doc.surface, transport, now)
			}
			Message::Cursor(cursor) => {
				let applied = self
					.docs
					.get_mut(&cursor.path)
					.is_some_and(|doc| doc.binding.on_remote_cursor(cursor));
				Ok(if applied {
					Absorbed::Presence
				} else {
					Absorbed::Ignored(IgnoreReason::OtherDocument)
				})
			}
			Message::Leave { author } => {
				let mut known = false;
				for doc in self.docs.values_mut() {
					known |= doc.binding.on_leave(author);
				}
				tracing::debug!(%author, "replica left");
				Ok(if known {
					Absorbed::Presence
				} else {
					Absorbed::Ignored(IgnoreReason::OtherDocument)
				})
			}
		}
	}

	/// Polls every open document for retransmissions and throttled cursors.
	pub fn poll(&mut self, now: Instant, transport: &mut dyn Transport) {
		for doc in self.docs.values_mut() {
			doc.binding.poll(now, transport);
		}
	}

	/// Synchronization status of `path`, or `None` if it is not open.
	pub fn status(&self, path: &str) -> Option<SyncStatus> {
		self.docs.get(path).map(|doc| doc.binding.status())
	}

	/// Returns true if any open document has edits waiting for acknowledgment.
	pub fn has_pending(&self) -> bool {
		self.docs.values().any(|doc| doc.binding.has_pending())
	}

	/// Closes every document, recording their versions.
	pub fn close_all(&mut self) {
		let docs: Vec<_> = self.docs.drain().collect();
		for (path, doc) in docs {
			self.record_version(&path, doc.binding.version());
		}
	}

	/// Drops all sync tracking, e.g. after the channel is lost for good.
	///
	/// Unlike [`Self::close_all`], versions are forgotten as well.
	pub fn disable_all(&mut self) {
		self.docs.clear();
		self.versions.clear();
	}
}
