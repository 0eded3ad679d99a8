//! In-memory backend with the merge semantics the load contract assumes.
//!
//! Nodes are unique per (label, HASH); relationships are keyed by
//! endpoints, type and the ContextHash disambiguator, so repeated loads
//! converge instead of duplicating. Row columns that exist only to drive
//! the load (ids, labels, ancestor context) are stripped before the rest
//! become properties. Contract breaches are recorded as counters rather
//! than errors; [`MemoryBackend::stats`] reports them.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use taproot_core::{CONTEXT_COLUMNS, ContentHash, EdgeType, NodeLabel, RowMap};
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::{BackendError, GraphBackend};

const NODE_KEY_COLUMNS: [&str; 2] = ["HASH", "LABEL"];
const EDGE_KEY_COLUMNS: [&str; 5] =
    ["START_ID", "END_ID", "TYPE", "StartNodeLabel", "EndNodeLabel"];

type NodeKey = (NodeLabel, String);
type RelKey = (String, String, EdgeType, String);

#[derive(Debug, Default)]
struct MemoryGraph {
    constraints: BTreeSet<NodeLabel>,
    nodes: BTreeMap<NodeKey, BTreeMap<String, String>>,
    relationships: BTreeMap<RelKey, BTreeMap<String, String>>,
    ordering_violations: u64,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    graph: Mutex<MemoryGraph>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub nodes: u64,
    pub relationships: u64,
    pub constraints: u64,
    /// Rows merged before their prerequisites: nodes ahead of their
    /// uniqueness constraint, relationships ahead of an endpoint node.
    pub ordering_violations: u64,
    /// Relationships whose endpoints are still missing after everything
    /// was merged. The zero hash marks rows with no start node and is
    /// not counted.
    pub dangling_relationships: u64,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        MemoryBackend::default()
    }

    pub async fn stats(&self) -> MemoryStats {
        let graph = self.graph.lock().await;
        let zero = ContentHash::ZERO.to_string();
        let hashes: BTreeSet<&String> = graph.nodes.keys().map(|(_, hash)| hash).collect();
        let dangling = graph
            .relationships
            .keys()
            .filter(|(start, end, _, _)| {
                (*start != zero && !hashes.contains(start)) || !hashes.contains(end)
            })
            .count() as u64;
        MemoryStats {
            nodes: graph.nodes.len() as u64,
            relationships: graph.relationships.len() as u64,
            constraints: graph.constraints.len() as u64,
            ordering_violations: graph.ordering_violations,
            dangling_relationships: dangling,
        }
    }

    pub async fn node_property(&self, label: NodeLabel, hash: &str, key: &str) -> Option<String> {
        let graph = self.graph.lock().await;
        graph.nodes.get(&(label, hash.to_string()))?.get(key).cloned()
    }

    pub async fn relationships_of(&self, edge_type: EdgeType) -> u64 {
        let graph = self.graph.lock().await;
        graph.relationships.keys().filter(|(_, _, kind, _)| *kind == edge_type).count() as u64
    }
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    async fn ensure_constraint(&self, label: NodeLabel) -> Result<(), BackendError> {
        let mut graph = self.graph.lock().await;
        graph.constraints.insert(label);
        Ok(())
    }

    async fn merge_nodes(&self, label: NodeLabel, rows: &[RowMap]) -> Result<(), BackendError> {
        let mut graph = self.graph.lock().await;
        if !graph.constraints.contains(&label) {
            graph.ordering_violations += 1;
        }
        for row in rows {
            let Some(hash) = row.get("HASH") else {
                debug!(label = label.as_str(), "node row without HASH, ignoring");
                continue;
            };
            let props = strip(row, &NODE_KEY_COLUMNS);
            graph.nodes.entry((label, hash.clone())).or_default().extend(props);
        }
        Ok(())
    }

    async fn merge_relationships(
        &self,
        edge_type: EdgeType,
        rows: &[RowMap],
    ) -> Result<(), BackendError> {
        let mut guard = self.graph.lock().await;
        let graph = &mut *guard;
        let zero = ContentHash::ZERO.to_string();
        let hashes: BTreeSet<&String> = graph.nodes.keys().map(|(_, hash)| hash).collect();
        for row in rows {
            let start = row.get("START_ID").cloned().unwrap_or_default();
            let end = row.get("END_ID").cloned().unwrap_or_default();
            let context = row.get("ContextHash").cloned().unwrap_or_default();
            if (start != zero && !hashes.contains(&start)) || !hashes.contains(&end) {
                graph.ordering_violations += 1;
            }
            let mut props = strip(row, &EDGE_KEY_COLUMNS);
            for column in CONTEXT_COLUMNS {
                props.remove(column);
            }
            graph
                .relationships
                .entry((start, end, edge_type, context))
                .or_default()
                .extend(props);
        }
        Ok(())
    }
}

fn strip(row: &RowMap, keys: &[&str]) -> BTreeMap<String, String> {
    row.iter()
        .filter(|(name, _)| !keys.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
