//! Top-level view structure: binary image, functions, blocks, instructions.

use serde::{Deserialize, Serialize};

use crate::expr::IrExpr;
use crate::vars::{IrString, IrSymbol, IrVariable};

/// One lifted binary: the unit the exporter walks.
///
/// `image` holds the raw file bytes and is the only payload behind the
/// BinaryView node hash, so re-exporting the same file always lands on the
/// same graph root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrView {
    pub filename: String,
    pub architecture: String,
    pub image: Vec<u8>,
    pub functions: Vec<IrFunction>,
    #[serde(default)]
    pub strings: Vec<IrString>,
    #[serde(default)]
    pub symbols: Vec<IrSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrFunction {
    pub name: String,
    /// Image offset of the function entry point.
    pub start: u64,
    #[serde(default)]
    pub calling_convention: String,
    #[serde(default)]
    pub clobbered_registers: Vec<String>,
    pub blocks: Vec<IrBlock>,
}

/// A basic block. Outgoing branches reference sibling blocks by index into
/// the owning function's `blocks` vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrBlock {
    pub start: u64,
    /// Disassembly text, one line per instruction or label.
    pub disassembly: Vec<String>,
    pub instructions: Vec<IrInstruction>,
    #[serde(default)]
    pub outgoing: Vec<IrBranch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrBranch {
    /// Index of the target block within the same function.
    pub target: usize,
    pub kind: BranchKind,
    /// Set by the frontend when the branch closes a natural loop.
    #[serde(default)]
    pub back_edge: bool,
}

/// Condition under which a branch transfers control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    Unconditional,
    OnFalse,
    OnTrue,
}

impl BranchKind {
    pub fn value(self) -> u32 {
        match self {
            BranchKind::Unconditional => 0,
            BranchKind::OnFalse => 1,
            BranchKind::OnTrue => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrInstruction {
    /// Position within the owning function's instruction list.
    pub index: usize,
    pub expr: IrExpr,
    #[serde(default)]
    pub vars_read: Vec<IrVariable>,
    #[serde(default)]
    pub vars_written: Vec<IrVariable>,
}
