//! Table discovery, batching and the retry loop.
//!
//! Loading is two-phase: every node table commits before the first
//! relationship batch goes out, since relationships match their endpoints
//! by hash. Node batches commit sequentially; relationship batches fan
//! out across a bounded number of concurrent commits and rely on the
//! backend's merge keying to stay idempotent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use taproot_core::{EdgeType, NodeLabel, RowMap};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::backend::{BackendError, GraphBackend};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read table {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("constraint setup failed for {label}")]
    Constraint {
        label: &'static str,
        #[source]
        source: BackendError,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Rows per commit.
    pub batch_size: usize,
    /// Transient failures tolerated per batch before abandoning it.
    pub retries: u32,
    /// Fixed delay between retry attempts.
    pub retry_delay: Duration,
    /// Concurrent relationship commits in flight.
    pub concurrency: usize,
}

impl Default for LoaderConfig {
    fn default() -> LoaderConfig {
        LoaderConfig {
            batch_size: 100,
            retries: 5,
            retry_delay: Duration::from_secs(2),
            concurrency: 8,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    pub node_rows: u64,
    pub relationship_rows: u64,
    pub batches_committed: u64,
    pub batches_abandoned: u64,
}

enum Batch {
    Nodes { label: NodeLabel, rows: Vec<RowMap> },
    Relationships { edge_type: EdgeType, rows: Vec<RowMap> },
}

impl Batch {
    fn table(&self) -> &'static str {
        match self {
            Batch::Nodes { label, .. } => label.as_str(),
            Batch::Relationships { edge_type, .. } => edge_type.as_str(),
        }
    }
}

pub struct BulkLoader {
    backend: Arc<dyn GraphBackend>,
    config: LoaderConfig,
}

impl BulkLoader {
    pub fn new(backend: Arc<dyn GraphBackend>, config: LoaderConfig) -> BulkLoader {
        BulkLoader { backend, config }
    }

    /// Load every table found in `dir`. Abandoned batches are counted,
    /// not fatal; the only hard failures are unreadable tables and
    /// constraint setup.
    pub async fn load_dir(&self, dir: &Path) -> Result<LoadReport, LoadError> {
        let (node_tables, edge_tables) = discover(dir)?;
        let mut report = LoadReport::default();
        let batch_size = self.config.batch_size.max(1);

        for (label, _) in &node_tables {
            self.backend
                .ensure_constraint(*label)
                .await
                .map_err(|source| LoadError::Constraint { label: label.as_str(), source })?;
        }

        for (label, rows) in node_tables {
            report.node_rows += rows.len() as u64;
            for chunk in rows.chunks(batch_size) {
                let batch = Batch::Nodes { label, rows: chunk.to_vec() };
                if commit_with_retry(self.backend.as_ref(), &batch, &self.config).await {
                    report.batches_committed += 1;
                } else {
                    report.batches_abandoned += 1;
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut commits = JoinSet::new();
        for (edge_type, rows) in edge_tables {
            report.relationship_rows += rows.len() as u64;
            for chunk in rows.chunks(batch_size) {
                let batch = Batch::Relationships { edge_type, rows: chunk.to_vec() };
                let backend = Arc::clone(&self.backend);
                let config = self.config.clone();
                let semaphore = Arc::clone(&semaphore);
                commits.spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => return false,
                    };
                    commit_with_retry(backend.as_ref(), &batch, &config).await
                });
            }
        }
        while let Some(joined) = commits.join_next().await {
            match joined {
                Ok(true) => report.batches_committed += 1,
                Ok(false) => report.batches_abandoned += 1,
                Err(err) => {
                    error!(error = %err, "commit task failed");
                    report.batches_abandoned += 1;
                }
            }
        }

        info!(
            node_rows = report.node_rows,
            relationship_rows = report.relationship_rows,
            committed = report.batches_committed,
            abandoned = report.batches_abandoned,
            "load finished"
        );
        Ok(report)
    }
}

async fn commit_with_retry(
    backend: &dyn GraphBackend,
    batch: &Batch,
    config: &LoaderConfig,
) -> bool {
    let mut attempt: u32 = 0;
    loop {
        let result = match batch {
            Batch::Nodes { label, rows } => backend.merge_nodes(*label, rows).await,
            Batch::Relationships { edge_type, rows } => {
                backend.merge_relationships(*edge_type, rows).await
            }
        };
        let reason = match result {
            Ok(()) => return true,
            Err(BackendError::Unavailable(reason)) => {
                error!(
                    table = batch.table(),
                    reason = %reason,
                    "backend unavailable, abandoning batch"
                );
                return false;
            }
            Err(BackendError::Transient(reason)) => reason,
        };
        attempt += 1;
        if attempt > config.retries {
            error!(
                table = batch.table(),
                reason = %reason,
                attempts = attempt,
                "retry budget exhausted, abandoning batch"
            );
            return false;
        }
        warn!(
            table = batch.table(),
            reason = %reason,
            attempt,
            "transient backend failure, backing off"
        );
        tokio::time::sleep(config.retry_delay).await;
    }
}

type NodeTables = Vec<(NodeLabel, Vec<RowMap>)>;
type EdgeTables = Vec<(EdgeType, Vec<RowMap>)>;

/// Find tables by the exporter's file naming. Files matching neither
/// suffix are ignored; tables with an unrecognized prefix are skipped
/// with a warning.
fn discover(dir: &Path) -> Result<(NodeTables, EdgeTables), LoadError> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        paths.push(entry?.path());
    }
    paths.sort();

    let mut nodes = NodeTables::new();
    let mut edges = EdgeTables::new();
    for path in &paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if let Some(prefix) = name.strip_suffix("-nodes.csv") {
            match NodeLabel::parse(prefix) {
                Some(label) => nodes.push((label, read_table(path)?)),
                None => warn!(file = name, "unknown node table, skipping"),
            }
        } else if let Some(prefix) = name.strip_suffix("-relationships.csv") {
            match EdgeType::parse(prefix) {
                Some(edge_type) => edges.push((edge_type, read_table(path)?)),
                None => warn!(file = name, "unknown relationship table, skipping"),
            }
        }
    }
    Ok((nodes, edges))
}

fn read_table(path: &Path) -> Result<Vec<RowMap>, LoadError> {
    if fs::metadata(path)?.len() == 0 {
        return Ok(Vec::new());
    }
    let read_err =
        |source: csv::Error| LoadError::Read { path: path.to_path_buf(), source };
    let mut reader = csv::Reader::from_path(path).map_err(read_err)?;
    let mut rows = Vec::new();
    for row in reader.deserialize::<RowMap>() {
        rows.push(row.map_err(read_err)?);
    }
    Ok(rows)
}
