//! Wire protocol for Quill document synchronization.
//!
//! Messages travel over an unordered, at-least-once broadcast channel keyed by
//! document path. The channel itself is out of scope; this crate only fixes
//! the shapes exchanged over it and their JSON framing.

pub mod codec;
pub mod types;

pub use codec::{ProtoError, decode, encode};
pub use types::{CodeMessage, CursorMessage, Message, ReplicaId, WireOp, WireOperation};
