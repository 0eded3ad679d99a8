use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use taproot_core::{EdgeType, NodeLabel, RowMap};
use taproot_export::export_view;
use taproot_ir::fixtures;
use tempfile::TempDir;

use crate::backend::{BackendError, GraphBackend};
use crate::loader::{BulkLoader, LoadError, LoaderConfig};
use crate::memory::MemoryBackend;

fn quick_config() -> LoaderConfig {
    LoaderConfig {
        batch_size: 100,
        retries: 5,
        retry_delay: Duration::from_millis(1),
        concurrency: 4,
    }
}

/// Fails a configurable number of calls before delegating to a real
/// in-memory graph, counting every relationship attempt it sees.
#[derive(Default)]
struct FlakyBackend {
    inner: MemoryBackend,
    constraint_failures: AtomicU32,
    node_failures: AtomicU32,
    rel_failures: AtomicU32,
    rel_attempts: AtomicU32,
    unavailable: bool,
}

fn take(counter: &AtomicU32) -> bool {
    counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
}

#[async_trait]
impl GraphBackend for FlakyBackend {
    async fn ensure_constraint(&self, label: NodeLabel) -> Result<(), BackendError> {
        if take(&self.constraint_failures) {
            return Err(BackendError::Unavailable("constraint refused".to_string()));
        }
        self.inner.ensure_constraint(label).await
    }

    async fn merge_nodes(&self, label: NodeLabel, rows: &[RowMap]) -> Result<(), BackendError> {
        if take(&self.node_failures) {
            return Err(BackendError::Transient("node commit dropped".to_string()));
        }
        self.inner.merge_nodes(label, rows).await
    }

    async fn merge_relationships(
        &self,
        edge_type: EdgeType,
        rows: &[RowMap],
    ) -> Result<(), BackendError> {
        self.rel_attempts.fetch_add(1, Ordering::SeqCst);
        if take(&self.rel_failures) {
            let reason = "relationship commit dropped".to_string();
            return Err(if self.unavailable {
                BackendError::Unavailable(reason)
            } else {
                BackendError::Transient(reason)
            });
        }
        self.inner.merge_relationships(edge_type, rows).await
    }
}

#[tokio::test]
async fn test_full_pipeline_round_trip() {
    let view = fixtures::call_pair();
    let dir = TempDir::new().unwrap();
    let export = export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(MemoryBackend::new());
    let loader = BulkLoader::new(backend.clone(), quick_config());
    let report = loader.load_dir(dir.path()).await.unwrap();

    assert_eq!(report.node_rows, export.nodes_written);
    assert_eq!(report.relationship_rows, export.edges_written);
    assert_eq!(report.batches_abandoned, 0);

    let stats = backend.stats().await;
    assert_eq!(stats.nodes, export.nodes_written);
    assert_eq!(stats.relationships, export.edges_written);
    assert_eq!(stats.ordering_violations, 0);
    assert_eq!(stats.dangling_relationships, 0);

    // Properties survive with the key columns stripped away.
    let helper = taproot_export::records::hash_function(&view.functions[1]).to_string();
    let convention = backend.node_property(NodeLabel::Function, &helper, "CallingConvention").await;
    assert_eq!(convention.as_deref(), Some("sysv"));
    assert_eq!(backend.node_property(NodeLabel::Function, &helper, "HASH").await, None);
    assert_eq!(backend.relationships_of(EdgeType::FunctionCall).await, 1);
}

#[tokio::test]
async fn test_repeated_loads_converge() {
    let view = fixtures::diamond();
    let dir = TempDir::new().unwrap();
    export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(MemoryBackend::new());
    let loader = BulkLoader::new(backend.clone(), quick_config());
    loader.load_dir(dir.path()).await.unwrap();
    let first = backend.stats().await;
    loader.load_dir(dir.path()).await.unwrap();
    let second = backend.stats().await;

    assert_eq!(first, second);
    assert_eq!(second.ordering_violations, 0);
}

#[tokio::test]
async fn test_twin_membership_rows_collapse_under_merge_keying() {
    let view = fixtures::twin_functions();
    let dir = TempDir::new().unwrap();
    let export = export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(MemoryBackend::new());
    let loader = BulkLoader::new(backend.clone(), quick_config());
    loader.load_dir(dir.path()).await.unwrap();

    // Both MemberFunc rows share endpoints, type and context hash, so the
    // backend keeps one relationship for them.
    assert_eq!(backend.relationships_of(EdgeType::MemberFunc).await, 1);
    let stats = backend.stats().await;
    assert_eq!(stats.relationships, export.edges_written - 1);
    assert_eq!(stats.nodes, export.nodes_written);
    assert_eq!(stats.dangling_relationships, 0);
}

#[tokio::test]
async fn test_transient_failures_retry_until_success() {
    let view = fixtures::diamond();
    let dir = TempDir::new().unwrap();
    let export = export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(FlakyBackend {
        node_failures: AtomicU32::new(2),
        ..FlakyBackend::default()
    });
    let loader = BulkLoader::new(backend.clone(), quick_config());
    let report = loader.load_dir(dir.path()).await.unwrap();

    assert_eq!(report.batches_abandoned, 0);
    let stats = backend.inner.stats().await;
    assert_eq!(stats.nodes, export.nodes_written);
}

#[tokio::test]
async fn test_exhausted_retry_budget_abandons_the_batch() {
    let view = fixtures::diamond();
    let dir = TempDir::new().unwrap();
    export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(FlakyBackend {
        rel_failures: AtomicU32::new(u32::MAX),
        ..FlakyBackend::default()
    });
    let config = LoaderConfig { retries: 1, ..quick_config() };
    let loader = BulkLoader::new(backend.clone(), config);
    let report = loader.load_dir(dir.path()).await.unwrap();

    assert!(report.batches_abandoned > 0);
    // One initial attempt plus one retry per abandoned batch.
    assert_eq!(backend.rel_attempts.load(Ordering::SeqCst), 2 * report.batches_abandoned as u32);
    assert_eq!(backend.inner.stats().await.relationships, 0);
}

#[tokio::test]
async fn test_unavailable_backend_abandons_without_retrying() {
    let view = fixtures::diamond();
    let dir = TempDir::new().unwrap();
    export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(FlakyBackend {
        rel_failures: AtomicU32::new(u32::MAX),
        unavailable: true,
        ..FlakyBackend::default()
    });
    let loader = BulkLoader::new(backend.clone(), quick_config());
    let report = loader.load_dir(dir.path()).await.unwrap();

    assert!(report.batches_abandoned > 0);
    assert_eq!(backend.rel_attempts.load(Ordering::SeqCst), report.batches_abandoned as u32);
}

#[tokio::test]
async fn test_constraint_setup_failure_is_fatal() {
    let view = fixtures::diamond();
    let dir = TempDir::new().unwrap();
    export_view(&view, dir.path()).unwrap();

    let backend = Arc::new(FlakyBackend {
        constraint_failures: AtomicU32::new(1),
        ..FlakyBackend::default()
    });
    let loader = BulkLoader::new(backend, quick_config());
    let err = loader.load_dir(dir.path()).await.unwrap_err();
    assert!(matches!(err, LoadError::Constraint { .. }));
}

#[tokio::test]
async fn test_unknown_tables_are_skipped() {
    let view = fixtures::diamond();
    let dir = TempDir::new().unwrap();
    let export = export_view(&view, dir.path()).unwrap();
    std::fs::write(dir.path().join("Bogus-nodes.csv"), "HASH,LABEL\ndead,Bogus\n").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a table").unwrap();

    let backend = Arc::new(MemoryBackend::new());
    let loader = BulkLoader::new(backend.clone(), quick_config());
    let report = loader.load_dir(dir.path()).await.unwrap();

    assert_eq!(report.node_rows, export.nodes_written);
    assert_eq!(backend.stats().await.nodes, export.nodes_written);
}
