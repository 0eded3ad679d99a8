//! Taproot IR — Interchange types for lifted program views
//!
//! A [`IrView`] is the analyzer-independent snapshot taproot consumes: one
//! binary image plus its lifted functions, blocks, instructions and
//! expression trees, with strings and symbols keyed by address. Views are
//! plain serde types so any frontend that can emit JSON can feed the
//! exporter.

pub mod expr;
pub mod fixtures;
pub mod vars;
pub mod view;

#[cfg(test)]
pub mod tests;

pub use expr::{IrExpr, IrOperand, OpKind, OperandKindTag};
pub use vars::{IrString, IrSymbol, IrVariable, StorageClass, SymbolBinding, SymbolKind};
pub use view::{BranchKind, IrBlock, IrBranch, IrFunction, IrInstruction, IrView};
