//! Taproot Core — Property-graph data model, content hashing, and context tracking

pub mod context;
pub mod hash;
pub mod model;

#[cfg(test)]
pub mod tests;

pub use context::{Context, PathSignature};
pub use hash::{ContentHash, NodeHasher};
pub use model::{CONTEXT_COLUMNS, EdgeRow, EdgeType, GraphRecord, NodeLabel, NodeRow, RowMap};
