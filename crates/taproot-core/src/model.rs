//! Core data structures for the exported property graph

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::hash::ContentHash;

/// One CSV row read back by column name. The emitter writes typed rows;
/// everything that re-reads a table sees this shape.
pub type RowMap = HashMap<String, String>;

/// Trailing columns of every relationship table: the ancestor chain the
/// edge was derived under, plus its path signature.
pub const CONTEXT_COLUMNS: [&str; 9] = [
    "RootBinaryView",
    "RootFunction",
    "RootBasicBlock",
    "RootInstruction",
    "RootExpression",
    "OperandIndex",
    "SelfHASH",
    "ParentHASH",
    "ContextHash",
];

/// Discriminates what kind of program entity a node represents.
///
/// Doubles as the output table selector: every label owns one node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    // ── Structural ──────────────────────────────────────────
    BinaryView,
    Function,
    BasicBlock,
    Instruction,
    Expression,

    // ── Operands ────────────────────────────────────────────
    Variable,
    Constant,

    // ── Attached literals ───────────────────────────────────
    String,
    Symbol,
}

impl NodeLabel {
    pub const ALL: [NodeLabel; 9] = [
        NodeLabel::BinaryView,
        NodeLabel::Function,
        NodeLabel::BasicBlock,
        NodeLabel::Instruction,
        NodeLabel::Expression,
        NodeLabel::Variable,
        NodeLabel::Constant,
        NodeLabel::String,
        NodeLabel::Symbol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::BinaryView => "BinaryView",
            NodeLabel::Function => "Function",
            NodeLabel::BasicBlock => "BasicBlock",
            NodeLabel::Instruction => "Instruction",
            NodeLabel::Expression => "Expression",
            NodeLabel::Variable => "Variable",
            NodeLabel::Constant => "Constant",
            NodeLabel::String => "String",
            NodeLabel::Symbol => "Symbol",
        }
    }

    pub fn parse(s: &str) -> Option<NodeLabel> {
        NodeLabel::ALL.iter().copied().find(|l| l.as_str() == s)
    }

    /// File name of this label's node table.
    pub fn table_file(&self) -> String {
        format!("{}-nodes.csv", self.as_str())
    }

    /// Attribute columns following the mandatory `HASH, LABEL` pair.
    /// Fixed per label for the life of a run.
    pub fn attr_columns(&self) -> &'static [&'static str] {
        match self {
            NodeLabel::BinaryView => &["FILENAME", "Architecture"],
            NodeLabel::Function => &["ClobberedRegisters", "CallingConvention"],
            NodeLabel::BasicBlock => &[],
            NodeLabel::Instruction => &[],
            NodeLabel::Expression => {
                &["Operands", "OperationName", "OperationEnum", "OperationType"]
            }
            NodeLabel::Variable => &["SourceVarType", "SourceVarTypeEnum", "Type", "Name"],
            NodeLabel::Constant => &["ConstantValue", "ConstType"],
            NodeLabel::String => &["RawString"],
            NodeLabel::Symbol => &["SymbolName", "SymbolTypeEnum", "SymbolType", "SymbolNameSpace"],
        }
    }
}

/// What kind of relationship an edge represents.
///
/// Like `NodeLabel`, doubles as the table selector for edge rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeType {
    // ── Containment ─────────────────────────────────────────
    MemberBV,
    MemberFunc,
    MemberBB,

    // ── Control flow ────────────────────────────────────────
    Branch,
    InstructionChain,
    NextInstruction,

    // ── Expression tree ─────────────────────────────────────
    Operand,
    VarOperand,
    ConstantOperand,

    // ── Literal attachment ──────────────────────────────────
    StringRef,
    SymbolRef,

    // ── Cross references (post-processed) ───────────────────
    FunctionCall,
    DefinedAt,
    UsedAt,
}

impl EdgeType {
    pub const ALL: [EdgeType; 14] = [
        EdgeType::MemberBV,
        EdgeType::MemberFunc,
        EdgeType::MemberBB,
        EdgeType::Branch,
        EdgeType::InstructionChain,
        EdgeType::NextInstruction,
        EdgeType::Operand,
        EdgeType::VarOperand,
        EdgeType::ConstantOperand,
        EdgeType::StringRef,
        EdgeType::SymbolRef,
        EdgeType::FunctionCall,
        EdgeType::DefinedAt,
        EdgeType::UsedAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::MemberBV => "MemberBV",
            EdgeType::MemberFunc => "MemberFunc",
            EdgeType::MemberBB => "MemberBB",
            EdgeType::Branch => "Branch",
            EdgeType::InstructionChain => "InstructionChain",
            EdgeType::NextInstruction => "NextInstruction",
            EdgeType::Operand => "Operand",
            EdgeType::VarOperand => "VarOperand",
            EdgeType::ConstantOperand => "ConstantOperand",
            EdgeType::StringRef => "StringRef",
            EdgeType::SymbolRef => "SymbolRef",
            EdgeType::FunctionCall => "FunctionCall",
            EdgeType::DefinedAt => "DefinedAt",
            EdgeType::UsedAt => "UsedAt",
        }
    }

    pub fn parse(s: &str) -> Option<EdgeType> {
        EdgeType::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// File name of this type's relationship table.
    pub fn table_file(&self) -> String {
        format!("{}-relationships.csv", self.as_str())
    }

    /// Attribute columns between the mandatory endpoint columns and the
    /// trailing context columns. Fixed per type for the life of a run.
    pub fn attr_columns(&self) -> &'static [&'static str] {
        match self {
            EdgeType::MemberFunc => &["Name", "Offset"],
            EdgeType::MemberBB | EdgeType::Branch => &["BranchCondition", "BackEdge"],
            EdgeType::InstructionChain | EdgeType::NextInstruction => {
                &["InstructionIndex", "VarsRead", "VarsWritten"]
            }
            EdgeType::VarOperand => &["VariableDefinedAtIndex", "VariableUsedAtIndex"],
            EdgeType::SymbolRef => &["SymbolOrdinal", "SymbolBinding"],
            _ => &[],
        }
    }
}

/// A single node row destined for its label's table.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub hash: ContentHash,
    pub label: NodeLabel,
    /// Attribute values in `label.attr_columns()` order.
    pub attrs: Vec<(&'static str, String)>,
}

/// A single edge row destined for its type's table.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    pub start: ContentHash,
    pub end: ContentHash,
    pub edge_type: EdgeType,
    pub start_label: NodeLabel,
    pub end_label: NodeLabel,
    /// Attribute values in `edge_type.attr_columns()` order.
    pub attrs: Vec<(&'static str, String)>,
    pub context: Context,
}

/// A node together with its incoming edge, as produced by the record
/// builders. The emitter decides which halves to append.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRecord {
    pub node: NodeRow,
    pub edge: EdgeRow,
}
