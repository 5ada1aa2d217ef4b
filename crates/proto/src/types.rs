//! Message types exchanged between replicas.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of one replica of a document.
///
/// The authoritative replica is always `"master"`; remote viewers and editors
/// use a generated UUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(pub String);

impl ReplicaId {
	/// Identifier reserved for the authoritative replica.
	pub const MASTER: &'static str = "master";

	/// Returns the master replica id.
	pub fn master() -> Self {
		Self(Self::MASTER.to_string())
	}

	/// Generates a fresh peer replica id.
	pub fn generate() -> Self {
		Self(uuid::Uuid::new_v4().to_string())
	}

	/// Builds a peer id from caller-supplied random bytes.
	///
	/// Lets seeded runs produce the same ids every time.
	pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
		Self(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
	}

	/// Returns true for the master replica.
	pub fn is_master(&self) -> bool {
		self.0 == Self::MASTER
	}

	/// Returns the id as a string slice.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ReplicaId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ReplicaId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

/// A single serializable edit component.
///
/// Serialized as `{"retain": n}`, `{"insert": "text"}` or `{"delete": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireOp {
	/// Skip over N characters.
	Retain(usize),
	/// Insert the given string at the current position.
	Insert(String),
	/// Delete N characters.
	Delete(usize),
}

/// A serializable operation: an ordered list of [`WireOp`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireOperation(pub Vec<WireOp>);

impl WireOperation {
	/// Returns true if the operation carries no components.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// A text edit broadcast by one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMessage {
	/// Project the document belongs to. Messages without a project match any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub project: Option<String>,
	/// Document path the edit applies to.
	pub path: String,
	/// Sender's version before the edit.
	pub base: u64,
	/// Sender's version after the edit.
	pub version: u64,
	/// The edit itself, expressed against the sender's text at `base`.
	pub ops: WireOperation,
	/// Sender's full text after the edit, used as a consistency fallback.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub full_text: Option<String>,
	/// Replica that originated the edit.
	pub author: ReplicaId,
	/// Highest version the sender had absorbed from each author, its own
	/// `version` included. Empty when the sender does not track it.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub clock: BTreeMap<ReplicaId, u64>,
}

/// A best-effort cursor annotation broadcast by one replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMessage {
	/// Project the document belongs to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub project: Option<String>,
	/// Document path.
	pub path: String,
	/// Replica owning the cursor.
	pub author: ReplicaId,
	/// Selection start, in characters.
	pub cursor_start: usize,
	/// Selection end (caret), in characters.
	pub cursor_end: usize,
}

/// Envelope for everything sent over the document channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Message {
	/// A text edit.
	Code(CodeMessage),
	/// A cursor update.
	Cursor(CursorMessage),
	/// A replica left the channel.
	Leave {
		/// Replica that left.
		author: ReplicaId,
	},
}

impl Message {
	/// Returns the originating replica.
	pub fn author(&self) -> &ReplicaId {
		match self {
			Self::Code(msg) => &msg.author,
			Self::Cursor(msg) => &msg.author,
			Self::Leave { author } => author,
		}
	}

	/// Returns the document path, if the message concerns a single document.
	pub fn path(&self) -> Option<&str> {
		match self {
			Self::Code(msg) => Some(&msg.path),
			Self::Cursor(msg) => Some(&msg.path),
			Self::Leave { .. } => None,
		}
	}

	/// Returns the project, if the sender set one.
	pub fn project(&self) -> Option<&str> {
		match self {
			Self::Code(msg) => msg.project.as_deref(),
			Self::Cursor(msg) => msg.project.as_deref(),
			Self::Leave { .. } => None,
		}
	}
}
