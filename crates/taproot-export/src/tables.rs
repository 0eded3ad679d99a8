//! Append-only CSV table emission.
//!
//! One table per node label and per edge type. [`TableSet::new`] starts a
//! fresh snapshot, truncating whatever is on disk; [`TableSet::open_existing`]
//! reopens the tables of an earlier export for appending, which is what lets
//! the cross-reference pass re-run standalone. Failing to open a table is
//! the only globally fatal condition; everything after that is per-row.
//! Headers are written on first append, so untouched tables stay zero-byte
//! and are read back as empty.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use csv::Writer;
use taproot_core::{ContentHash, Context, EdgeRow, EdgeType, GraphRecord, NodeLabel, NodeRow};
use thiserror::Error;

pub use taproot_core::{CONTEXT_COLUMNS, RowMap};

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to open table {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no open table for {0}")]
    MissingTable(&'static str),
    #[error("row does not match the columns of {table} (expected {expected}, got {found})")]
    ColumnMismatch {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

struct Table {
    name: &'static str,
    path: PathBuf,
    writer: Writer<File>,
    header: Vec<String>,
    header_written: bool,
    rows: u64,
}

impl Table {
    fn open(
        dir: &Path,
        file: String,
        name: &'static str,
        header: Vec<String>,
        append: bool,
    ) -> Result<Table, EmitError> {
        let path = dir.join(file);
        let handle = if append {
            OpenOptions::new().create(true).append(true).open(&path)
        } else {
            File::create(&path)
        }
        .map_err(|source| EmitError::Open { path: path.clone(), source })?;
        // A reopened non-empty table already carries its header row.
        let header_written =
            append && fs::metadata(&path).map(|meta| meta.len() > 0).unwrap_or(false);
        Ok(Table {
            name,
            path,
            writer: Writer::from_writer(handle),
            header,
            header_written,
            rows: 0,
        })
    }

    fn append(&mut self, values: Vec<String>) -> Result<(), EmitError> {
        if values.len() != self.header.len() {
            return Err(EmitError::ColumnMismatch {
                table: self.name,
                expected: self.header.len(),
                found: values.len(),
            });
        }
        if !self.header_written {
            self.writer.write_record(&self.header)?;
            self.header_written = true;
        }
        self.writer.write_record(&values)?;
        self.rows += 1;
        Ok(())
    }

    fn read_rows(&mut self) -> Result<Vec<RowMap>, EmitError> {
        self.writer.flush()?;
        if fs::metadata(&self.path)?.len() == 0 {
            return Ok(vec![]);
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in reader.deserialize::<RowMap>() {
            rows.push(row?);
        }
        Ok(rows)
    }
}

/// The full set of output tables for one export run.
///
/// Dropping the set flushes whatever the underlying writers still buffer;
/// [`TableSet::finish`] is the checked path and should be preferred.
pub struct TableSet {
    nodes: BTreeMap<NodeLabel, Table>,
    edges: BTreeMap<EdgeType, Table>,
}

impl TableSet {
    /// Start a fresh snapshot in `dir`, truncating any earlier tables.
    pub fn new(dir: &Path) -> Result<TableSet, EmitError> {
        TableSet::open(dir, false)
    }

    /// Reopen the tables of an earlier export for appending.
    pub fn open_existing(dir: &Path) -> Result<TableSet, EmitError> {
        TableSet::open(dir, true)
    }

    fn open(dir: &Path, append: bool) -> Result<TableSet, EmitError> {
        fs::create_dir_all(dir)?;

        let mut nodes = BTreeMap::new();
        for label in NodeLabel::ALL {
            let mut header = vec!["HASH".to_string(), "LABEL".to_string()];
            header.extend(label.attr_columns().iter().map(|c| c.to_string()));
            let table = Table::open(dir, label.table_file(), label.as_str(), header, append)?;
            nodes.insert(label, table);
        }

        let mut edges = BTreeMap::new();
        for edge_type in EdgeType::ALL {
            let mut header: Vec<String> =
                ["START_ID", "END_ID", "TYPE", "StartNodeLabel", "EndNodeLabel"]
                    .iter()
                    .map(|c| c.to_string())
                    .collect();
            header.extend(edge_type.attr_columns().iter().map(|c| c.to_string()));
            header.extend(CONTEXT_COLUMNS.iter().map(|c| c.to_string()));
            let table =
                Table::open(dir, edge_type.table_file(), edge_type.as_str(), header, append)?;
            edges.insert(edge_type, table);
        }

        Ok(TableSet { nodes, edges })
    }

    /// Append the node and/or relationship halves of a record.
    /// `write_node = false` is the content-dedup path: the node already
    /// exists, only the new edge is recorded.
    pub fn emit(
        &mut self,
        record: &GraphRecord,
        write_node: bool,
        write_relationship: bool,
    ) -> Result<(), EmitError> {
        if write_node {
            self.append_node(&record.node)?;
        }
        if write_relationship {
            self.append_edge(&record.edge)?;
        }
        Ok(())
    }

    pub fn append_node(&mut self, row: &NodeRow) -> Result<(), EmitError> {
        let expected = row.label.attr_columns();
        let names_match = row.attrs.len() == expected.len()
            && row.attrs.iter().map(|(name, _)| *name).eq(expected.iter().copied());
        if !names_match {
            return Err(EmitError::ColumnMismatch {
                table: row.label.as_str(),
                expected: expected.len(),
                found: row.attrs.len(),
            });
        }
        let table = self
            .nodes
            .get_mut(&row.label)
            .ok_or(EmitError::MissingTable(row.label.as_str()))?;
        let mut values = vec![row.hash.to_string(), row.label.as_str().to_string()];
        values.extend(row.attrs.iter().map(|(_, value)| value.clone()));
        table.append(values)
    }

    pub fn append_edge(&mut self, row: &EdgeRow) -> Result<(), EmitError> {
        let expected = row.edge_type.attr_columns();
        let names_match = row.attrs.len() == expected.len()
            && row.attrs.iter().map(|(name, _)| *name).eq(expected.iter().copied());
        if !names_match {
            return Err(EmitError::ColumnMismatch {
                table: row.edge_type.as_str(),
                expected: expected.len(),
                found: row.attrs.len(),
            });
        }
        let table = self
            .edges
            .get_mut(&row.edge_type)
            .ok_or(EmitError::MissingTable(row.edge_type.as_str()))?;
        let mut values = vec![
            row.start.to_string(),
            row.end.to_string(),
            row.edge_type.as_str().to_string(),
            row.start_label.as_str().to_string(),
            row.end_label.as_str().to_string(),
        ];
        values.extend(row.attrs.iter().map(|(_, value)| value.clone()));
        values.extend(context_values(&row.context));
        table.append(values)
    }

    /// Re-read one node table. Used by the post-processor, which operates
    /// purely on what was emitted.
    pub fn read_node_rows(&mut self, label: NodeLabel) -> Result<Vec<RowMap>, EmitError> {
        match self.nodes.get_mut(&label) {
            Some(table) => table.read_rows(),
            None => Err(EmitError::MissingTable(label.as_str())),
        }
    }

    /// Re-read one relationship table.
    pub fn read_edge_rows(&mut self, edge_type: EdgeType) -> Result<Vec<RowMap>, EmitError> {
        match self.edges.get_mut(&edge_type) {
            Some(table) => table.read_rows(),
            None => Err(EmitError::MissingTable(edge_type.as_str())),
        }
    }

    pub fn nodes_written(&self) -> u64 {
        self.nodes.values().map(|t| t.rows).sum()
    }

    pub fn edges_written(&self) -> u64 {
        self.edges.values().map(|t| t.rows).sum()
    }

    /// Per-table row counts for the export summary, in table-name order.
    pub fn row_counts(&self) -> Vec<(&'static str, u64)> {
        let mut counts: Vec<(&'static str, u64)> = Vec::new();
        counts.extend(self.nodes.values().map(|t| (t.name, t.rows)));
        counts.extend(self.edges.values().map(|t| (t.name, t.rows)));
        counts
    }

    /// Flush every table. The checked counterpart of dropping the set.
    pub fn finish(mut self) -> Result<(), EmitError> {
        for table in self.nodes.values_mut().chain(self.edges.values_mut()) {
            table.writer.flush()?;
        }
        Ok(())
    }
}

fn context_values(context: &Context) -> Vec<String> {
    fn opt(hash: Option<ContentHash>) -> String {
        hash.map(|h| h.to_string()).unwrap_or_default()
    }
    vec![
        context.binary_view.to_string(),
        opt(context.function),
        opt(context.basic_block),
        opt(context.instruction),
        opt(context.expression),
        context.operand_index.clone().unwrap_or_default(),
        context.self_hash.to_string(),
        context.parent_hash.to_string(),
        context.path_signature().to_string(),
    ]
}
