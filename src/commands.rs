//! CLI command implementations

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use taproot_export::{export_view, refresh_xrefs};
use taproot_ir::IrView;
use taproot_loader::{BulkLoader, LoaderConfig, MemoryBackend};

pub fn export(view_path: PathBuf, out: PathBuf) -> anyhow::Result<()> {
    let view = read_view(&view_path)?;
    tracing::info!("Exporting {} ({} functions)", view.filename, view.functions.len());

    let report = export_view(&view, &out)?;

    tracing::info!(
        "Wrote {} node rows and {} relationship rows to {}",
        report.nodes_written,
        report.edges_written,
        out.display()
    );
    if report.walk.rows_dropped > 0 {
        tracing::warn!("{} rows were lost to write failures", report.walk.rows_dropped);
    }
    if report.xref.calls_unresolved > 0 {
        tracing::info!("{} call sites stayed unresolved", report.xref.calls_unresolved);
    }
    Ok(())
}

pub fn xref(view_path: PathBuf, out: PathBuf) -> anyhow::Result<()> {
    let view = read_view(&view_path)?;
    tracing::info!("Refreshing cross-references in {}", out.display());

    let report = refresh_xrefs(&view, &out)?;

    tracing::info!(
        "Resolved {} calls, linked {} definitions and {} uses",
        report.calls_resolved,
        report.defs_linked,
        report.uses_linked
    );
    Ok(())
}

pub async fn check(dir: PathBuf, batch_size: usize, concurrency: usize) -> anyhow::Result<()> {
    tracing::info!("Loading tables from {}", dir.display());

    let backend = Arc::new(MemoryBackend::new());
    let config = LoaderConfig { batch_size, concurrency, ..LoaderConfig::default() };
    let loader = BulkLoader::new(backend.clone(), config);
    let report = loader.load_dir(&dir).await?;
    let stats = backend.stats().await;

    tracing::info!(
        "Merged {} node rows into {} nodes, {} relationship rows into {} relationships",
        report.node_rows,
        stats.nodes,
        report.relationship_rows,
        stats.relationships
    );
    if report.batches_abandoned > 0 {
        tracing::warn!("{} batches were abandoned", report.batches_abandoned);
    }
    if stats.ordering_violations > 0 || stats.dangling_relationships > 0 {
        anyhow::bail!(
            "table set is inconsistent: {} ordering violations, {} dangling relationships",
            stats.ordering_violations,
            stats.dangling_relationships
        );
    }
    tracing::info!("Tables are consistent");
    Ok(())
}

fn read_view(path: &Path) -> anyhow::Result<IrView> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read view file {}", path.display()))?;
    let view = serde_json::from_str(&text)
        .with_context(|| format!("{} does not hold a serialized view", path.display()))?;
    Ok(view)
}
