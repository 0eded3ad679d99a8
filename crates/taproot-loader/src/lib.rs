//! Taproot Loader — Bulk loading of exported tables into a graph store
//!
//! [`BulkLoader`] discovers the CSV tables an export produced, enforces
//! the load-order contract (uniqueness constraints, then every node
//! table, then relationships) and commits batches with bounded retries
//! and a fixed backoff. [`GraphBackend`] is the seam a real store
//! implements; [`MemoryBackend`] is the in-crate reference
//! implementation with the same merge keying.

pub mod backend;
pub mod loader;
pub mod memory;

#[cfg(test)]
mod tests;

pub use crate::backend::{BackendError, GraphBackend};
pub use crate::loader::{BulkLoader, LoadError, LoadReport, LoaderConfig};
pub use crate::memory::{MemoryBackend, MemoryStats};
