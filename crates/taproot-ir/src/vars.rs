//! Variables, strings and symbols.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrVariable {
    pub name: String,
    /// Source-level type as text, e.g. `int32_t`.
    #[serde(rename = "type", default)]
    pub ty: String,
    pub storage: StorageClass,
    /// Function-level indices of instructions that write this variable.
    #[serde(default)]
    pub defined_at: Vec<usize>,
    /// Function-level indices of instructions that read this variable.
    #[serde(default)]
    pub used_at: Vec<usize>,
}

/// Where a variable lives. Part of the variable's node hash payload, so
/// two same-named variables in different storage stay distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageClass {
    Stack,
    Register,
    Flag,
}

impl StorageClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageClass::Stack => "Stack",
            StorageClass::Register => "Register",
            StorageClass::Flag => "Flag",
        }
    }

    pub fn value(self) -> u32 {
        match self {
            StorageClass::Stack => 0,
            StorageClass::Register => 1,
            StorageClass::Flag => 2,
        }
    }
}

/// A string literal found in the image, keyed by its address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrString {
    pub address: u64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrSymbol {
    pub address: u64,
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub ordinal: u64,
    #[serde(default)]
    pub binding: SymbolBinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    ImportedFunction,
    Data,
    ImportedData,
    External,
    Library,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "Function",
            SymbolKind::ImportedFunction => "ImportedFunction",
            SymbolKind::Data => "Data",
            SymbolKind::ImportedData => "ImportedData",
            SymbolKind::External => "External",
            SymbolKind::Library => "Library",
        }
    }

    pub fn value(self) -> u32 {
        match self {
            SymbolKind::Function => 0,
            SymbolKind::ImportedFunction => 1,
            SymbolKind::Data => 2,
            SymbolKind::ImportedData => 3,
            SymbolKind::External => 4,
            SymbolKind::Library => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolBinding {
    #[default]
    Global,
    Local,
    Weak,
}

impl SymbolBinding {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolBinding::Global => "Global",
            SymbolBinding::Local => "Local",
            SymbolBinding::Weak => "Weak",
        }
    }
}
