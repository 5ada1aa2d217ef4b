//! Collaborative text synchronization for Quill documents.
//!
//! Every open document on every replica gets a [`DocumentBinding`] that keeps
//! a mirror of the text, buffers local edits while a send is in flight, and
//! absorbs remote edits by transforming them against pending local work.
//! [`SyncManager`] routes channel messages to the right binding.
//!
//! The transport and the editing widget are external: they plug in through
//! the [`Transport`] and [`EditingSurface`] traits.

pub mod binding;
pub mod config;
pub mod convert;
pub mod error;
pub mod manager;
pub mod presence;
pub mod surface;
pub mod transport;

pub use binding::{Absorbed, DocumentBinding, IgnoreReason, Mode, SyncStatus};
pub use config::{ConfigError, SyncConfig, TieBreak};
pub use error::{Result, SyncError};
pub use manager::{OpenDocument, SyncManager};
pub use presence::{Presence, RemoteCursor};
pub use surface::{EditingSurface, LocalDelta, RopeSurface};
pub use transport::{MemoryBus, Transport};
