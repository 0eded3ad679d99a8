//! Expression trees.
//!
//! Every instruction carries one root [`IrExpr`]; operands are a closed
//! union so the exporter can dispatch on shape without knowing the source
//! analyzer's operation set.

use serde::{Deserialize, Serialize};

use crate::vars::IrVariable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrExpr {
    pub op: OpKind,
    #[serde(default)]
    pub operands: Vec<IrOperand>,
}

impl IrExpr {
    /// Operation name followed by the rendered operand list,
    /// e.g. `ADD[x, CONST[2]]`.
    pub fn render(&self) -> String {
        format!("{}{}", self.op.name(), self.operands_text())
    }

    /// Canonical text form of the operand list. This string is the hash
    /// payload for Expression and Instruction nodes, so the rendering must
    /// stay position-stable.
    pub fn operands_text(&self) -> String {
        let parts: Vec<String> = self.operands.iter().map(IrOperand::render).collect();
        format!("[{}]", parts.join(", "))
    }
}

/// One operand slot of an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrOperand {
    Expr(IrExpr),
    ExprList(Vec<IrExpr>),
    Var(IrVariable),
    VarList(Vec<IrVariable>),
    Int(i64),
    IntList(Vec<i64>),
    Float(f64),
    Intrinsic(String),
}

impl IrOperand {
    pub fn render(&self) -> String {
        match self {
            IrOperand::Expr(expr) => expr.render(),
            IrOperand::ExprList(exprs) => {
                let parts: Vec<String> = exprs.iter().map(IrExpr::render).collect();
                format!("[{}]", parts.join(", "))
            }
            IrOperand::Var(var) => var.name.clone(),
            IrOperand::VarList(vars) => {
                let parts: Vec<&str> = vars.iter().map(|v| v.name.as_str()).collect();
                format!("[{}]", parts.join(", "))
            }
            IrOperand::Int(value) => value.to_string(),
            IrOperand::IntList(values) => {
                let parts: Vec<String> = values.iter().map(i64::to_string).collect();
                format!("[{}]", parts.join(", "))
            }
            IrOperand::Float(value) => value.to_string(),
            IrOperand::Intrinsic(name) => name.clone(),
        }
    }
}

/// Declared shape of an operand slot, used to render operation signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKindTag {
    Expr,
    ExprList,
    Var,
    VarList,
    Int,
    IntList,
    Float,
    Intrinsic,
}

impl OperandKindTag {
    pub fn as_str(self) -> &'static str {
        match self {
            OperandKindTag::Expr => "expr",
            OperandKindTag::ExprList => "expr_list",
            OperandKindTag::Var => "var",
            OperandKindTag::VarList => "var_list",
            OperandKindTag::Int => "int",
            OperandKindTag::IntList => "int_list",
            OperandKindTag::Float => "float",
            OperandKindTag::Intrinsic => "intrinsic",
        }
    }
}

/// Lifted operation set.
///
/// Deliberately small: enough to express straight-line arithmetic, memory
/// access, control flow and calls. Frontends map their richer operation
/// sets onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    // ── No payload ──
    Nop,
    Unimpl,
    // ── Data movement ──
    SetVar,
    Load,
    Store,
    Var,
    AddressOf,
    // ── Literals ──
    Const,
    ConstPtr,
    FloatConst,
    // ── Arithmetic and logic ──
    Add,
    Sub,
    Mul,
    And,
    Or,
    Xor,
    // ── Comparisons ──
    CmpEq,
    CmpNe,
    CmpSlt,
    // ── Control flow ──
    If,
    Goto,
    JumpTo,
    Call,
    Intrinsic,
    Ret,
}

impl OpKind {
    pub const ALL: [OpKind; 25] = [
        OpKind::Nop,
        OpKind::Unimpl,
        OpKind::SetVar,
        OpKind::Load,
        OpKind::Store,
        OpKind::Var,
        OpKind::AddressOf,
        OpKind::Const,
        OpKind::ConstPtr,
        OpKind::FloatConst,
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::And,
        OpKind::Or,
        OpKind::Xor,
        OpKind::CmpEq,
        OpKind::CmpNe,
        OpKind::CmpSlt,
        OpKind::If,
        OpKind::Goto,
        OpKind::JumpTo,
        OpKind::Call,
        OpKind::Intrinsic,
        OpKind::Ret,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Nop => "NOP",
            OpKind::Unimpl => "UNIMPL",
            OpKind::SetVar => "SET_VAR",
            OpKind::Load => "LOAD",
            OpKind::Store => "STORE",
            OpKind::Var => "VAR",
            OpKind::AddressOf => "ADDRESS_OF",
            OpKind::Const => "CONST",
            OpKind::ConstPtr => "CONST_PTR",
            OpKind::FloatConst => "FLOAT_CONST",
            OpKind::Add => "ADD",
            OpKind::Sub => "SUB",
            OpKind::Mul => "MUL",
            OpKind::And => "AND",
            OpKind::Or => "OR",
            OpKind::Xor => "XOR",
            OpKind::CmpEq => "CMP_E",
            OpKind::CmpNe => "CMP_NE",
            OpKind::CmpSlt => "CMP_SLT",
            OpKind::If => "IF",
            OpKind::Goto => "GOTO",
            OpKind::JumpTo => "JUMP_TO",
            OpKind::Call => "CALL",
            OpKind::Intrinsic => "INTRINSIC",
            OpKind::Ret => "RET",
        }
    }

    pub fn value(self) -> u32 {
        match self {
            OpKind::Nop => 0,
            OpKind::Unimpl => 1,
            OpKind::SetVar => 2,
            OpKind::Load => 3,
            OpKind::Store => 4,
            OpKind::Var => 5,
            OpKind::AddressOf => 6,
            OpKind::Const => 7,
            OpKind::ConstPtr => 8,
            OpKind::FloatConst => 9,
            OpKind::Add => 10,
            OpKind::Sub => 11,
            OpKind::Mul => 12,
            OpKind::And => 13,
            OpKind::Or => 14,
            OpKind::Xor => 15,
            OpKind::CmpEq => 16,
            OpKind::CmpNe => 17,
            OpKind::CmpSlt => 18,
            OpKind::If => 19,
            OpKind::Goto => 20,
            OpKind::JumpTo => 21,
            OpKind::Call => 22,
            OpKind::Intrinsic => 23,
            OpKind::Ret => 24,
        }
    }

    /// Named operand slots in declaration order.
    pub fn signature(self) -> &'static [(&'static str, OperandKindTag)] {
        use OperandKindTag::*;
        match self {
            OpKind::Nop | OpKind::Unimpl => &[],
            OpKind::SetVar => &[("dest", Var), ("src", Expr)],
            OpKind::Load => &[("src", Expr)],
            OpKind::Store => &[("dest", Expr), ("src", Expr)],
            OpKind::Var => &[("src", Var)],
            OpKind::AddressOf => &[("src", Var)],
            OpKind::Const | OpKind::ConstPtr => &[("constant", Int)],
            OpKind::FloatConst => &[("constant", Float)],
            OpKind::Add
            | OpKind::Sub
            | OpKind::Mul
            | OpKind::And
            | OpKind::Or
            | OpKind::Xor
            | OpKind::CmpEq
            | OpKind::CmpNe
            | OpKind::CmpSlt => &[("left", Expr), ("right", Expr)],
            OpKind::If => &[("condition", Expr), ("true", Int), ("false", Int)],
            OpKind::Goto => &[("dest", Int)],
            OpKind::JumpTo => &[("dest", Expr), ("targets", IntList)],
            OpKind::Call => &[("dest", Expr), ("params", ExprList), ("output", VarList)],
            OpKind::Intrinsic => {
                &[("intrinsic", Intrinsic), ("params", ExprList), ("output", VarList)]
            }
            OpKind::Ret => &[("src", ExprList)],
        }
    }

    /// Signature rendered for the OperationType node column,
    /// e.g. `[dest:expr, params:expr_list, output:var_list]`.
    pub fn signature_text(self) -> String {
        let parts: Vec<String> = self
            .signature()
            .iter()
            .map(|(slot, tag)| format!("{}:{}", slot, tag.as_str()))
            .collect();
        format!("[{}]", parts.join(", "))
    }
}
