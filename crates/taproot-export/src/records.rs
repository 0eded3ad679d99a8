//! Content hashing and record construction for every node kind.
//!
//! Hash payloads cover only what a node *means*: disassembly text for
//! blocks and functions, rendered operands for instructions and
//! expressions, name and storage for variables. Addresses, indices and
//! assigned identifiers never participate, so identical code always lands
//! on identical hashes.

use taproot_core::{
    Context, ContentHash, EdgeRow, EdgeType, GraphRecord, NodeHasher, NodeLabel, NodeRow,
};
use taproot_ir::{
    BranchKind, IrBlock, IrExpr, IrFunction, IrInstruction, IrSymbol, IrVariable, IrView,
};

/// Prefix of analyzer-assigned fallback labels. Lines carrying these are
/// excluded from block and function digests because the label text is not
/// deterministic across analyses.
pub const AUTO_LABEL_PREFIX: &str = "sub_";

/// How a block was reached, which decides its incoming edge type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incoming {
    /// The function's entry block, parented to the function itself.
    FromFunction,
    /// A branch target, parented to the predecessor block.
    FromBlock { kind: BranchKind, back_edge: bool },
}

/// Which chain edge parents an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// First instruction of a block, parented to the block.
    FromBlock,
    /// Any later instruction, parented to its predecessor.
    FromPrevious,
}

// ── Hash payloads ───────────────────────────────────────────

fn filtered_lines(block: &IrBlock) -> impl Iterator<Item = &str> {
    block
        .disassembly
        .iter()
        .map(String::as_str)
        .filter(|line| !line.starts_with(AUTO_LABEL_PREFIX))
}

pub fn hash_view(view: &IrView) -> ContentHash {
    let mut hasher = NodeHasher::new();
    hasher.write_bytes(&view.image);
    hasher.finish()
}

pub fn hash_function(func: &IrFunction) -> ContentHash {
    let mut hasher = NodeHasher::new();
    for block in &func.blocks {
        for line in filtered_lines(block) {
            hasher.write(line);
        }
    }
    hasher.finish()
}

pub fn hash_block(block: &IrBlock) -> ContentHash {
    let mut hasher = NodeHasher::new();
    for line in filtered_lines(block) {
        hasher.write(line);
    }
    hasher.finish()
}

pub fn hash_expression(expr: &IrExpr) -> ContentHash {
    let mut hasher = NodeHasher::new();
    hasher.write(&expr.operands_text());
    hasher.write(expr.op.name());
    hasher.finish()
}

/// An instruction hashes exactly like its root expression. The two node
/// kinds share identity on purpose; consumers that need to tell them apart
/// filter on the edge row's node labels.
pub fn hash_instruction(instr: &IrInstruction) -> ContentHash {
    hash_expression(&instr.expr)
}

pub fn hash_variable(var: &IrVariable) -> ContentHash {
    let mut hasher = NodeHasher::new();
    hasher.write(&var.name);
    hasher.write(var.storage.as_str());
    hasher.finish()
}

pub fn hash_constant(text: &str) -> ContentHash {
    let mut hasher = NodeHasher::new();
    hasher.write(text);
    hasher.finish()
}

pub fn hash_string(sanitized: &str) -> ContentHash {
    let mut hasher = NodeHasher::new();
    hasher.write(sanitized.trim());
    hasher.finish()
}

pub fn hash_symbol(symbol: &IrSymbol) -> ContentHash {
    let mut hasher = NodeHasher::new();
    hasher.write(&symbol.name);
    hasher.write(&symbol.kind.value().to_string());
    hasher.write(&symbol.namespace);
    hasher.finish()
}

/// Replace quotation marks with ascii escapes the downstream loader can
/// pass through unquoted.
pub fn sanitize_string(raw: &str) -> String {
    raw.replace('"', "%34%").replace('\'', "%39%")
}

fn join_indices(indices: &[usize]) -> String {
    let parts: Vec<String> = indices.iter().map(usize::to_string).collect();
    parts.join(",")
}

fn join_names(vars: &[IrVariable]) -> String {
    let parts: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
    parts.join(",")
}

// ── Record builders ─────────────────────────────────────────

pub fn view_record(view: &IrView) -> GraphRecord {
    let hash = hash_view(view);
    let context = Context::root(hash);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::BinaryView,
            attrs: vec![
                ("FILENAME", view.filename.clone()),
                ("Architecture", view.architecture.clone()),
            ],
        },
        edge: EdgeRow {
            start: ContentHash::ZERO,
            end: hash,
            edge_type: EdgeType::MemberBV,
            start_label: NodeLabel::BinaryView,
            end_label: NodeLabel::BinaryView,
            attrs: vec![],
            context,
        },
    }
}

pub fn function_record(func: &IrFunction, root: &Context) -> GraphRecord {
    let hash = hash_function(func);
    let context = root.enter_function(hash);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::Function,
            attrs: vec![
                ("ClobberedRegisters", func.clobbered_registers.join(",")),
                ("CallingConvention", func.calling_convention.clone()),
            ],
        },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type: EdgeType::MemberFunc,
            start_label: NodeLabel::BinaryView,
            end_label: NodeLabel::Function,
            attrs: vec![
                ("Name", func.name.clone()),
                ("Offset", func.start.to_string()),
            ],
            context,
        },
    }
}

pub fn block_record(block: &IrBlock, incoming: Incoming, parent: &Context) -> GraphRecord {
    let hash = hash_block(block);
    let context = parent.enter_block(hash);
    let (edge_type, start_label, condition, back_edge) = match incoming {
        Incoming::FromFunction => {
            (EdgeType::MemberBB, NodeLabel::Function, BranchKind::Unconditional.value(), false)
        }
        Incoming::FromBlock { kind, back_edge } => {
            (EdgeType::Branch, NodeLabel::BasicBlock, kind.value(), back_edge)
        }
    };
    GraphRecord {
        node: NodeRow { hash, label: NodeLabel::BasicBlock, attrs: vec![] },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type,
            start_label,
            end_label: NodeLabel::BasicBlock,
            attrs: vec![
                ("BranchCondition", condition.to_string()),
                ("BackEdge", back_edge.to_string()),
            ],
            context,
        },
    }
}

pub fn instruction_record(
    instr: &IrInstruction,
    chain: ChainKind,
    parent: &Context,
) -> GraphRecord {
    let hash = hash_instruction(instr);
    let context = parent.enter_instruction(hash);
    let (edge_type, start_label) = match chain {
        ChainKind::FromBlock => (EdgeType::InstructionChain, NodeLabel::BasicBlock),
        ChainKind::FromPrevious => (EdgeType::NextInstruction, NodeLabel::Instruction),
    };
    GraphRecord {
        node: NodeRow { hash, label: NodeLabel::Instruction, attrs: vec![] },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type,
            start_label,
            end_label: NodeLabel::Instruction,
            attrs: vec![
                ("InstructionIndex", instr.index.to_string()),
                ("VarsRead", join_names(&instr.vars_read)),
                ("VarsWritten", join_names(&instr.vars_written)),
            ],
            context,
        },
    }
}

pub fn expression_record(
    expr: &IrExpr,
    parent: &Context,
    parent_label: NodeLabel,
    operand_index: &str,
) -> GraphRecord {
    let hash = hash_expression(expr);
    let context = parent.enter_expression(hash, operand_index);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::Expression,
            attrs: vec![
                ("Operands", expr.operands_text()),
                ("OperationName", expr.op.name().to_string()),
                ("OperationEnum", expr.op.value().to_string()),
                ("OperationType", expr.op.signature_text()),
            ],
        },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type: EdgeType::Operand,
            start_label: parent_label,
            end_label: NodeLabel::Expression,
            attrs: vec![],
            context,
        },
    }
}

pub fn variable_record(var: &IrVariable, parent: &Context, operand_index: &str) -> GraphRecord {
    let hash = hash_variable(var);
    let context = parent.enter_operand(hash, operand_index);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::Variable,
            attrs: vec![
                ("SourceVarType", var.storage.as_str().to_string()),
                ("SourceVarTypeEnum", var.storage.value().to_string()),
                ("Type", var.ty.clone()),
                ("Name", var.name.clone()),
            ],
        },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type: EdgeType::VarOperand,
            start_label: NodeLabel::Expression,
            end_label: NodeLabel::Variable,
            attrs: vec![
                ("VariableDefinedAtIndex", join_indices(&var.defined_at)),
                ("VariableUsedAtIndex", join_indices(&var.used_at)),
            ],
            context,
        },
    }
}

pub fn constant_record(
    text: &str,
    const_type: &str,
    parent: &Context,
    operand_index: &str,
) -> GraphRecord {
    let hash = hash_constant(text);
    let context = parent.enter_operand(hash, operand_index);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::Constant,
            attrs: vec![
                ("ConstantValue", text.to_string()),
                ("ConstType", const_type.to_string()),
            ],
        },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type: EdgeType::ConstantOperand,
            start_label: NodeLabel::Expression,
            end_label: NodeLabel::Constant,
            attrs: vec![],
            context,
        },
    }
}

pub fn string_record(raw: &str, parent: &Context, parent_label: NodeLabel) -> GraphRecord {
    let sanitized = sanitize_string(raw);
    let hash = hash_string(&sanitized);
    let context = parent.attach(hash);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::String,
            attrs: vec![("RawString", sanitized.trim().to_string())],
        },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type: EdgeType::StringRef,
            start_label: parent_label,
            end_label: NodeLabel::String,
            attrs: vec![],
            context,
        },
    }
}

pub fn symbol_record(symbol: &IrSymbol, parent: &Context, parent_label: NodeLabel) -> GraphRecord {
    let hash = hash_symbol(symbol);
    let context = parent.attach(hash);
    GraphRecord {
        node: NodeRow {
            hash,
            label: NodeLabel::Symbol,
            attrs: vec![
                ("SymbolName", symbol.name.clone()),
                ("SymbolTypeEnum", symbol.kind.value().to_string()),
                ("SymbolType", symbol.kind.as_str().to_string()),
                ("SymbolNameSpace", symbol.namespace.clone()),
            ],
        },
        edge: EdgeRow {
            start: context.parent_hash,
            end: hash,
            edge_type: EdgeType::SymbolRef,
            start_label: parent_label,
            end_label: NodeLabel::Symbol,
            attrs: vec![
                ("SymbolOrdinal", symbol.ordinal.to_string()),
                ("SymbolBinding", symbol.binding.as_str().to_string()),
            ],
            context,
        },
    }
}
