//! Data model for scan results.
//!
//! Re-exports the node tree and the size-formatting helpers.
pub mod node;
pub mod size;

pub use node::{display_order, extension_of, size_order, Node, NodeKind, NO_EXTENSION};
