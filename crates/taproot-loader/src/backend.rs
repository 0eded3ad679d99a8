//! The seam between the loader and whatever graph store receives the rows.

use async_trait::async_trait;
use taproot_core::{EdgeType, NodeLabel, RowMap};
use thiserror::Error;

/// How a backend operation failed, which decides the retry policy: a
/// transient failure spends one unit of the retry budget, an unavailable
/// backend abandons the batch immediately.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transient backend failure: {0}")]
    Transient(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// A graph store that can absorb exported tables.
///
/// Implementations must make both merge operations idempotent: nodes
/// keyed by label plus `HASH`, relationships keyed by endpoints, type and
/// the `ContextHash` disambiguator. Repeated loads of the same rows must
/// converge to the same graph.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Guarantee a uniqueness constraint on `HASH` for this label. Called
    /// for every discovered label before any row is loaded.
    async fn ensure_constraint(&self, label: NodeLabel) -> Result<(), BackendError>;

    /// Merge one batch of node rows.
    async fn merge_nodes(&self, label: NodeLabel, rows: &[RowMap]) -> Result<(), BackendError>;

    /// Merge one batch of relationship rows. Only called once every node
    /// table has been committed.
    async fn merge_relationships(
        &self,
        edge_type: EdgeType,
        rows: &[RowMap],
    ) -> Result<(), BackendError>;
}
