//! Operation algebra for collaborative plain-text editing.
//!
//! An [`Operation`] is a walk over a document made of retain, insert and
//! delete components. The algebra provides the four primitives a replica
//! needs to stay convergent with its peers:
//!
//! - normalize: canonical form for equality and transmission,
//! - [`Operation::apply`]: run the walk over a text,
//! - [`Operation::compose`]: fold two sequential edits into one,
//! - [`Operation::transform`]: rebase two concurrent edits onto each other.

pub mod error;
pub mod operation;

pub use error::OperationError;
pub use operation::{Bias, CharIdx, CharLen, Component, Insertion, Operation, Priority};
pub use ropey::Rope;
