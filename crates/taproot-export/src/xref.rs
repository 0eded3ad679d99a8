//! Cross-reference pass over the emitted tables.
//!
//! Runs after the walk and reads back what it wrote: resolves direct call
//! targets against the function offsets, links variables to the
//! instructions that define and use them, and attaches any string or
//! symbol literals the inline pass missed. Every emission is checked
//! against the endpoint pairs already present in the target table, so the
//! pass can be re-run over existing tables without duplicating rows.

use std::collections::{HashMap, HashSet};

use taproot_core::{ContentHash, Context, EdgeRow, EdgeType, NodeLabel};
use tracing::{debug, warn};

use crate::records;
use crate::tables::{EmitError, RowMap, TableSet};
use crate::walker::AddressBook;

#[derive(Debug, Default, Clone)]
pub struct XrefReport {
    pub calls_resolved: u64,
    pub calls_unresolved: u64,
    pub defs_linked: u64,
    pub uses_linked: u64,
    pub strings_attached: u64,
    pub symbols_attached: u64,
}

pub struct CrossReferencer<'a> {
    tables: &'a mut TableSet,
    book: &'a AddressBook<'a>,
}

impl<'a> CrossReferencer<'a> {
    pub fn new(tables: &'a mut TableSet, book: &'a AddressBook<'a>) -> CrossReferencer<'a> {
        CrossReferencer { tables, book }
    }

    /// Read failures abort the pass; a table that cannot be read back
    /// would silently drop every edge derived from it. Write failures for
    /// individual rows are logged and skipped like the walker does.
    pub fn run(mut self) -> Result<XrefReport, EmitError> {
        let mut report = XrefReport::default();
        self.resolve_calls(&mut report)?;
        self.link_use_def(&mut report)?;
        self.attach_literals(&mut report)?;
        Ok(report)
    }

    /// CALL expression, destination operand at slot zero, constant child,
    /// constant value matching a function offset. Anything that breaks the
    /// chain (indirect call, unknown target) is counted, not guessed at.
    fn resolve_calls(&mut self, report: &mut XrefReport) -> Result<(), EmitError> {
        let member_rows = self.tables.read_edge_rows(EdgeType::MemberFunc)?;
        let expr_nodes = self.tables.read_node_rows(NodeLabel::Expression)?;
        let operand_rows = self.tables.read_edge_rows(EdgeType::Operand)?;
        let const_rows = self.tables.read_edge_rows(EdgeType::ConstantOperand)?;
        let const_nodes = self.tables.read_node_rows(NodeLabel::Constant)?;
        let call_rows = self.tables.read_edge_rows(EdgeType::FunctionCall)?;

        let mut offsets: HashMap<&str, &str> = HashMap::new();
        for row in &member_rows {
            offsets.entry(field(row, "Offset")).or_insert(field(row, "END_ID"));
        }
        // Instructions share their root expression's hash, so a call hash
        // keys rows from both tables; the label filter picks the row whose
        // start is the expression node.
        let mut dest_rows: HashMap<&str, &RowMap> = HashMap::new();
        for row in &operand_rows {
            if field(row, "StartNodeLabel") == "Expression" && field(row, "OperandIndex") == "0" {
                dest_rows.entry(field(row, "START_ID")).or_insert(row);
            }
        }
        let mut const_children: HashMap<&str, &str> = HashMap::new();
        for row in &const_rows {
            const_children.entry(field(row, "START_ID")).or_insert(field(row, "END_ID"));
        }
        let mut values: HashMap<&str, &str> = HashMap::new();
        for node in &const_nodes {
            values.entry(field(node, "HASH")).or_insert(field(node, "ConstantValue"));
        }
        let mut pairs = pair_set(&call_rows);

        for expr in &expr_nodes {
            if field(expr, "OperationName") != "CALL" {
                continue;
            }
            let call_hash = field(expr, "HASH");
            let Some(dest) = dest_rows.get(call_hash) else {
                report.calls_unresolved += 1;
                debug!(call = call_hash, "call destination operand not recorded");
                continue;
            };
            let Some(const_hash) = const_children.get(field(dest, "END_ID")) else {
                report.calls_unresolved += 1;
                debug!(call = call_hash, "indirect call, destination is not a constant");
                continue;
            };
            let Some(value) = values.get(*const_hash) else {
                report.calls_unresolved += 1;
                continue;
            };
            let Some(target_text) = offsets.get(*value) else {
                report.calls_unresolved += 1;
                debug!(call = call_hash, offset = *value, "call target is not a known function");
                continue;
            };
            let (Ok(instr), Ok(target)) = (
                ContentHash::from_hex(field(dest, "RootInstruction")),
                ContentHash::from_hex(target_text),
            ) else {
                report.calls_unresolved += 1;
                continue;
            };

            let pair = (instr.to_string(), target.to_string());
            if pairs.contains(&pair) {
                continue;
            }
            let edge = EdgeRow {
                start: instr,
                end: target,
                edge_type: EdgeType::FunctionCall,
                start_label: NodeLabel::Instruction,
                end_label: NodeLabel::Function,
                attrs: vec![],
                context: context_from_row(dest, target, instr),
            };
            match self.tables.append_edge(&edge) {
                Ok(()) => {
                    pairs.insert(pair);
                    report.calls_resolved += 1;
                }
                Err(err) => warn!(call = call_hash, error = %err, "call edge lost"),
            }
        }
        Ok(())
    }

    /// Variable def/use site indices resolve to instruction nodes through
    /// the chain tables, which record each instruction's index within its
    /// function.
    fn link_use_def(&mut self, report: &mut XrefReport) -> Result<(), EmitError> {
        let chain_rows = self.tables.read_edge_rows(EdgeType::InstructionChain)?;
        let next_rows = self.tables.read_edge_rows(EdgeType::NextInstruction)?;
        let var_rows = self.tables.read_edge_rows(EdgeType::VarOperand)?;
        let def_rows = self.tables.read_edge_rows(EdgeType::DefinedAt)?;
        let use_rows = self.tables.read_edge_rows(EdgeType::UsedAt)?;

        let mut instr_at: HashMap<(String, String), ContentHash> = HashMap::new();
        for row in chain_rows.iter().chain(next_rows.iter()) {
            let Ok(hash) = ContentHash::from_hex(field(row, "END_ID")) else { continue };
            let key = (
                field(row, "RootFunction").to_string(),
                field(row, "InstructionIndex").to_string(),
            );
            instr_at.entry(key).or_insert(hash);
        }
        let mut def_pairs = pair_set(&def_rows);
        let mut use_pairs = pair_set(&use_rows);

        for row in &var_rows {
            report.defs_linked += self.link_sites(
                row,
                "VariableDefinedAtIndex",
                EdgeType::DefinedAt,
                &instr_at,
                &mut def_pairs,
            );
            report.uses_linked += self.link_sites(
                row,
                "VariableUsedAtIndex",
                EdgeType::UsedAt,
                &instr_at,
                &mut use_pairs,
            );
        }
        Ok(())
    }

    fn link_sites(
        &mut self,
        row: &RowMap,
        column: &str,
        edge_type: EdgeType,
        instr_at: &HashMap<(String, String), ContentHash>,
        pairs: &mut HashSet<(String, String)>,
    ) -> u64 {
        let Ok(var_hash) = ContentHash::from_hex(field(row, "END_ID")) else { return 0 };
        let function = field(row, "RootFunction");
        let mut linked = 0;
        for index in field(row, column).split(',').map(str::trim) {
            if index.is_empty() {
                continue;
            }
            let key = (function.to_string(), index.to_string());
            let Some(instr) = instr_at.get(&key) else {
                // Merged duplicate blocks drop their chain rows, taking
                // these indices with them.
                debug!(column, index, "no instruction recorded at def/use index");
                continue;
            };
            let pair = (var_hash.to_string(), instr.to_string());
            if pairs.contains(&pair) {
                continue;
            }
            let edge = EdgeRow {
                start: var_hash,
                end: *instr,
                edge_type,
                start_label: NodeLabel::Variable,
                end_label: NodeLabel::Instruction,
                attrs: vec![],
                context: context_from_row(row, *instr, var_hash),
            };
            match self.tables.append_edge(&edge) {
                Ok(()) => {
                    pairs.insert(pair);
                    linked += 1;
                }
                Err(err) => warn!(variable = %var_hash, error = %err, "def/use edge lost"),
            }
        }
        linked
    }

    /// Backstop for constants whose literal attachment was skipped, which
    /// happens when the constant node predates the address book entry in a
    /// resumed run. Writes the literal node too if it is missing.
    fn attach_literals(&mut self, report: &mut XrefReport) -> Result<(), EmitError> {
        let const_nodes = self.tables.read_node_rows(NodeLabel::Constant)?;
        let const_rows = self.tables.read_edge_rows(EdgeType::ConstantOperand)?;
        let string_nodes = self.tables.read_node_rows(NodeLabel::String)?;
        let symbol_nodes = self.tables.read_node_rows(NodeLabel::Symbol)?;
        let string_rows = self.tables.read_edge_rows(EdgeType::StringRef)?;
        let symbol_rows = self.tables.read_edge_rows(EdgeType::SymbolRef)?;

        let mut known_strings = hash_set(&string_nodes);
        let mut known_symbols = hash_set(&symbol_nodes);
        let mut string_pairs = pair_set(&string_rows);
        let mut symbol_pairs = pair_set(&symbol_rows);
        let mut contexts: HashMap<&str, &RowMap> = HashMap::new();
        for row in &const_rows {
            contexts.entry(field(row, "END_ID")).or_insert(row);
        }

        for node in &const_nodes {
            let hash_text = field(node, "HASH");
            let Ok(value) = field(node, "ConstantValue").parse::<i64>() else { continue };
            let Ok(address) = u64::try_from(value) else { continue };
            let Some(row) = contexts.get(hash_text) else { continue };
            let Ok(const_hash) = ContentHash::from_hex(hash_text) else { continue };
            let parent =
                ContentHash::from_hex(field(row, "ParentHASH")).unwrap_or(ContentHash::ZERO);
            let const_ctx = context_from_row(row, const_hash, parent);

            if let Some(string) = self.book.string_at(address) {
                let record = records::string_record(&string.value, &const_ctx, NodeLabel::Constant);
                let pair = (hash_text.to_string(), record.node.hash.to_string());
                if !string_pairs.contains(&pair) {
                    let write_node = !known_strings.contains(&record.node.hash);
                    match self.tables.emit(&record, write_node, true) {
                        Ok(()) => {
                            known_strings.insert(record.node.hash);
                            string_pairs.insert(pair);
                            report.strings_attached += 1;
                        }
                        Err(err) => warn!(constant = hash_text, error = %err, "string ref lost"),
                    }
                }
            }
            if let Some(symbol) = self.book.symbol_at(address) {
                let record = records::symbol_record(symbol, &const_ctx, NodeLabel::Constant);
                let pair = (hash_text.to_string(), record.node.hash.to_string());
                if !symbol_pairs.contains(&pair) {
                    let write_node = !known_symbols.contains(&record.node.hash);
                    match self.tables.emit(&record, write_node, true) {
                        Ok(()) => {
                            known_symbols.insert(record.node.hash);
                            symbol_pairs.insert(pair);
                            report.symbols_attached += 1;
                        }
                        Err(err) => warn!(constant = hash_text, error = %err, "symbol ref lost"),
                    }
                }
            }
        }
        Ok(())
    }
}

fn field<'r>(row: &'r RowMap, key: &str) -> &'r str {
    row.get(key).map(String::as_str).unwrap_or("")
}

fn slot(row: &RowMap, key: &str) -> Option<ContentHash> {
    let text = row.get(key)?;
    if text.is_empty() {
        return None;
    }
    ContentHash::from_hex(text).ok()
}

/// Rebuild the ancestor part of a context from a previously written edge
/// row; the emitting pass supplies its own self and parent identities.
fn context_from_row(row: &RowMap, self_hash: ContentHash, parent_hash: ContentHash) -> Context {
    Context {
        binary_view: slot(row, "RootBinaryView").unwrap_or(ContentHash::ZERO),
        function: slot(row, "RootFunction"),
        basic_block: slot(row, "RootBasicBlock"),
        instruction: slot(row, "RootInstruction"),
        expression: slot(row, "RootExpression"),
        operand_index: None,
        self_hash,
        parent_hash,
    }
}

fn pair_set(rows: &[RowMap]) -> HashSet<(String, String)> {
    rows.iter()
        .map(|row| (field(row, "START_ID").to_string(), field(row, "END_ID").to_string()))
        .collect()
}

fn hash_set(rows: &[RowMap]) -> HashSet<ContentHash> {
    rows.iter()
        .filter_map(|row| ContentHash::from_hex(field(row, "HASH")).ok())
        .collect()
}
