//! Integration tests for Taproot
//!
//! These tests verify that export, cross-referencing and loading work
//! together, both in process and through the CLI binary.

use std::process::Command;
use std::sync::Arc;

use taproot_export::export_view;
use taproot_ir::fixtures;
use taproot_loader::{BulkLoader, LoaderConfig, MemoryBackend};
use tempfile::TempDir;

fn taproot_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_taproot"))
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = taproot_cmd().arg("--help").output().expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("taproot"));
    assert!(stdout.contains("export"));
    assert!(stdout.contains("xref"));
    assert!(stdout.contains("check"));
}

/// Test the whole pipeline through the binary: serialize a view, export
/// it, re-run the cross-reference pass, then check the tables.
#[test]
fn test_cli_pipeline_round_trip() {
    let dir = TempDir::new().unwrap();
    let view_path = dir.path().join("view.json");
    let out = dir.path().join("graph");
    let view = fixtures::call_pair();
    std::fs::write(&view_path, serde_json::to_string(&view).unwrap()).unwrap();

    let status = taproot_cmd()
        .arg("export")
        .arg(&view_path)
        .arg("--out")
        .arg(&out)
        .status()
        .expect("Failed to execute command");
    assert!(status.success());
    assert!(out.join("Function-nodes.csv").exists());
    assert!(out.join("FunctionCall-relationships.csv").exists());

    let status = taproot_cmd()
        .arg("xref")
        .arg(&view_path)
        .arg("--out")
        .arg(&out)
        .status()
        .expect("Failed to execute command");
    assert!(status.success());

    let status = taproot_cmd().arg("check").arg(&out).status().expect("Failed to execute command");
    assert!(status.success());
}

/// Test that a missing view file fails cleanly
#[test]
fn test_cli_rejects_missing_view() {
    let dir = TempDir::new().unwrap();

    let status = taproot_cmd()
        .arg("export")
        .arg(dir.path().join("absent.json"))
        .arg("--out")
        .arg(dir.path().join("graph"))
        .status()
        .expect("Failed to execute command");
    assert!(!status.success());
}

/// Test end-to-end export and load in process
#[tokio::test]
async fn test_end_to_end_export_and_load() {
    let dir = TempDir::new().unwrap();
    let view = fixtures::diamond();
    let report = export_view(&view, dir.path()).unwrap();
    assert!(report.nodes_written > 0);

    let backend = Arc::new(MemoryBackend::new());
    let loader = BulkLoader::new(backend.clone(), LoaderConfig::default());
    let load = loader.load_dir(dir.path()).await.unwrap();

    assert_eq!(load.node_rows, report.nodes_written);
    assert_eq!(load.relationship_rows, report.edges_written);
    assert_eq!(load.batches_abandoned, 0);

    let stats = backend.stats().await;
    assert_eq!(stats.ordering_violations, 0);
    assert_eq!(stats.dangling_relationships, 0);
}
