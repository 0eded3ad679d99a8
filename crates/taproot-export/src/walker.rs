//! The tree walker: single-pass graph construction over one binary view.
//!
//! Dedup happens at two levels. Content caches (one per node label, scoped
//! to the whole export) decide whether a node row is written at all.
//! The edge-seen set, keyed by path signature plus an attribute
//! fingerprint, decides whether a given edge derivation is new or a
//! re-walk of the same path. A block whose content is already known gets
//! its incoming edge recorded but is never descended again; that rule is
//! what keeps shared blocks and diamonds linear instead of exponential.

use std::collections::{HashMap, HashSet};

use taproot_core::{
    ContentHash, Context, EdgeType, GraphRecord, NodeHasher, NodeLabel, PathSignature,
};
use taproot_ir::{IrExpr, IrFunction, IrOperand, IrString, IrSymbol, IrVariable, IrView};
use tracing::{debug, warn};

use crate::records::{self, ChainKind, Incoming};
use crate::tables::TableSet;

/// Address-keyed lookup of the view's strings and symbols, snapshotted at
/// export start so constant operands can attach literals inline.
pub struct AddressBook<'a> {
    strings: HashMap<u64, &'a IrString>,
    symbols: HashMap<u64, &'a IrSymbol>,
}

impl<'a> AddressBook<'a> {
    pub fn new(view: &'a IrView) -> AddressBook<'a> {
        AddressBook {
            strings: view.strings.iter().map(|s| (s.address, s)).collect(),
            symbols: view.symbols.iter().map(|s| (s.address, s)).collect(),
        }
    }

    pub fn string_at(&self, address: u64) -> Option<&'a IrString> {
        self.strings.get(&address).copied()
    }

    pub fn symbol_at(&self, address: u64) -> Option<&'a IrSymbol> {
        self.symbols.get(&address).copied()
    }
}

/// Outcome of offering one record to the dedup machinery.
enum Visit {
    /// Node and edge both written; descend into the sub-tree.
    New,
    /// Node already known, new path; edge written, sub-tree skipped.
    EdgeOnly,
    /// Node and path both known; nothing written.
    Seen,
    /// A row could not be written; the sub-tree is abandoned.
    Failed,
}

#[derive(Debug, Default, Clone)]
pub struct WalkReport {
    /// Functions whose bodies were extracted.
    pub functions_walked: u64,
    /// Functions that merged into an already-extracted body.
    pub functions_merged: u64,
    /// Rows lost to per-row emit failures.
    pub rows_dropped: u64,
}

struct WorkItem {
    block: usize,
    incoming: Incoming,
    parent: Context,
}

pub struct GraphWalker<'a> {
    tables: &'a mut TableSet,
    book: &'a AddressBook<'a>,
    seen_views: HashSet<ContentHash>,
    seen_functions: HashSet<ContentHash>,
    seen_blocks: HashSet<ContentHash>,
    seen_instructions: HashSet<ContentHash>,
    seen_expressions: HashSet<ContentHash>,
    seen_variables: HashSet<ContentHash>,
    seen_constants: HashSet<ContentHash>,
    seen_strings: HashSet<ContentHash>,
    seen_symbols: HashSet<ContentHash>,
    seen_edges: HashSet<(EdgeType, PathSignature, u64)>,
    report: WalkReport,
}

impl<'a> GraphWalker<'a> {
    pub fn new(tables: &'a mut TableSet, book: &'a AddressBook<'a>) -> GraphWalker<'a> {
        GraphWalker {
            tables,
            book,
            seen_views: HashSet::new(),
            seen_functions: HashSet::new(),
            seen_blocks: HashSet::new(),
            seen_instructions: HashSet::new(),
            seen_expressions: HashSet::new(),
            seen_variables: HashSet::new(),
            seen_constants: HashSet::new(),
            seen_strings: HashSet::new(),
            seen_symbols: HashSet::new(),
            seen_edges: HashSet::new(),
            report: WalkReport::default(),
        }
    }

    /// Walk one view into the tables. Row-level failures are logged and
    /// counted, never propagated; by this point the tables are open and
    /// every further error is local to its sub-tree.
    pub fn walk(&mut self, view: &IrView) -> WalkReport {
        let record = records::view_record(view);
        let root = record.edge.context.clone();
        match self.visit(&record) {
            Visit::New => {
                for func in &view.functions {
                    self.walk_function(func, &root);
                }
            }
            Visit::EdgeOnly | Visit::Seen => {
                debug!(filename = view.filename.as_str(), "image already walked in this run");
            }
            Visit::Failed => {
                warn!(filename = view.filename.as_str(), "binary view row lost, skipping walk");
            }
        }
        self.report.clone()
    }

    fn walk_function(&mut self, func: &IrFunction, root: &Context) {
        let record = records::function_record(func, root);
        match self.visit(&record) {
            Visit::New => {}
            Visit::EdgeOnly => {
                self.report.functions_merged += 1;
                debug!(function = func.name.as_str(), "body already extracted, edge only");
                return;
            }
            Visit::Seen | Visit::Failed => return,
        }
        self.report.functions_walked += 1;

        let mut work = vec![WorkItem {
            block: 0,
            incoming: Incoming::FromFunction,
            parent: record.edge.context,
        }];
        while let Some(item) = work.pop() {
            self.walk_block(func, item, &mut work);
        }
    }

    fn walk_block(&mut self, func: &IrFunction, item: WorkItem, work: &mut Vec<WorkItem>) {
        let Some(block) = func.blocks.get(item.block) else {
            warn!(function = func.name.as_str(), block = item.block, "branch target out of range");
            return;
        };
        let record = records::block_record(block, item.incoming, &item.parent);
        match self.visit(&record) {
            Visit::New => {}
            _ => return,
        }
        let block_ctx = record.edge.context;

        let mut prev: Option<Context> = None;
        for instr in &block.instructions {
            let (chain, parent) = match &prev {
                None => (ChainKind::FromBlock, &block_ctx),
                Some(ctx) => (ChainKind::FromPrevious, ctx),
            };
            let rec = records::instruction_record(instr, chain, parent);
            match self.visit(&rec) {
                Visit::New => {
                    let ctx = &rec.edge.context;
                    self.walk_expression(&instr.expr, ctx, NodeLabel::Instruction, "0");
                }
                Visit::EdgeOnly | Visit::Seen => {}
                // The rest of the chain would dangle from the lost row.
                Visit::Failed => break,
            }
            prev = Some(rec.edge.context);
        }

        for branch in &block.outgoing {
            let incoming = Incoming::FromBlock { kind: branch.kind, back_edge: branch.back_edge };
            let next = WorkItem { block: branch.target, incoming, parent: block_ctx.clone() };
            if branch.back_edge {
                // Emit the closing edge right now instead of queueing the
                // target; the dedup check terminates the cycle.
                self.walk_block(func, next, work);
            } else {
                work.push(next);
            }
        }
    }

    fn walk_expression(
        &mut self,
        expr: &IrExpr,
        parent: &Context,
        parent_label: NodeLabel,
        operand_index: &str,
    ) {
        let record = records::expression_record(expr, parent, parent_label, operand_index);
        match self.visit(&record) {
            Visit::New => {}
            _ => return,
        }
        let ctx = record.edge.context;

        for (position, operand) in expr.operands.iter().enumerate() {
            let index = position.to_string();
            match operand {
                IrOperand::Expr(child) => {
                    self.walk_expression(child, &ctx, NodeLabel::Expression, &index);
                }
                IrOperand::ExprList(children) => {
                    for (slot, child) in children.iter().enumerate() {
                        let param = format!("func_param_{slot}");
                        self.walk_expression(child, &ctx, NodeLabel::Expression, &param);
                    }
                }
                IrOperand::Var(var) => {
                    self.emit_variable(var, &ctx, &index);
                }
                IrOperand::VarList(vars) => {
                    for (slot, var) in vars.iter().enumerate() {
                        self.emit_variable(var, &ctx, &slot.to_string());
                    }
                }
                IrOperand::Int(value) => {
                    self.emit_constant(&value.to_string(), "int", Some(*value), &ctx, &index);
                }
                IrOperand::Float(value) => {
                    self.emit_constant(&value.to_string(), "float", None, &ctx, &index);
                }
                IrOperand::IntList(_) | IrOperand::Intrinsic(_) => {
                    debug!(op = expr.op.name(), position, "unhandled operand kind, skipping");
                }
            }
        }
    }

    fn emit_variable(&mut self, var: &IrVariable, parent: &Context, operand_index: &str) {
        let record = records::variable_record(var, parent, operand_index);
        self.visit(&record);
    }

    fn emit_constant(
        &mut self,
        text: &str,
        const_type: &str,
        address: Option<i64>,
        parent: &Context,
        operand_index: &str,
    ) {
        let record = records::constant_record(text, const_type, parent, operand_index);
        match self.visit(&record) {
            Visit::New => {}
            _ => return,
        }
        let Some(value) = address else { return };
        let Ok(address) = u64::try_from(value) else { return };
        let const_ctx = record.edge.context;

        if let Some(string) = self.book.string_at(address) {
            let rec = records::string_record(&string.value, &const_ctx, NodeLabel::Constant);
            self.visit(&rec);
        }
        if let Some(symbol) = self.book.symbol_at(address) {
            let rec = records::symbol_record(symbol, &const_ctx, NodeLabel::Constant);
            self.visit(&rec);
        }
    }

    /// The three-way dedup decision plus the actual writes.
    fn visit(&mut self, record: &GraphRecord) -> Visit {
        let hash = record.node.hash;
        let label = record.node.label;
        let content_new = !self.cache(label).contains(&hash);
        let edge_key = (
            record.edge.edge_type,
            record.edge.context.path_signature(),
            attr_fingerprint(&record.edge.attrs),
        );
        if !content_new && self.seen_edges.contains(&edge_key) {
            return Visit::Seen;
        }

        if content_new {
            if let Err(err) = self.tables.append_node(&record.node) {
                warn!(node = %hash, label = label.as_str(), error = %err, "node row lost");
                self.report.rows_dropped += 1;
                return Visit::Failed;
            }
            self.cache(label).insert(hash);
        }
        if let Err(err) = self.tables.append_edge(&record.edge) {
            warn!(node = %hash, label = label.as_str(), error = %err, "edge row lost");
            self.report.rows_dropped += 1;
            return Visit::Failed;
        }
        self.seen_edges.insert(edge_key);

        if content_new { Visit::New } else { Visit::EdgeOnly }
    }

    fn cache(&mut self, label: NodeLabel) -> &mut HashSet<ContentHash> {
        match label {
            NodeLabel::BinaryView => &mut self.seen_views,
            NodeLabel::Function => &mut self.seen_functions,
            NodeLabel::BasicBlock => &mut self.seen_blocks,
            NodeLabel::Instruction => &mut self.seen_instructions,
            NodeLabel::Expression => &mut self.seen_expressions,
            NodeLabel::Variable => &mut self.seen_variables,
            NodeLabel::Constant => &mut self.seen_constants,
            NodeLabel::String => &mut self.seen_strings,
            NodeLabel::Symbol => &mut self.seen_symbols,
        }
    }
}

fn attr_fingerprint(attrs: &[(&'static str, String)]) -> u64 {
    let mut hasher = NodeHasher::new();
    for (_, value) in attrs {
        hasher.write(value);
    }
    hasher.finish().0
}
