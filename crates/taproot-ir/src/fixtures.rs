//! Synthetic views used across the test suites.
//!
//! Each fixture is a small hand-built program exercising one traversal
//! shape: a diamond CFG, a natural loop, a caller/callee pair, twin
//! functions with identical bodies, and a function containing two
//! identical blocks.

use crate::expr::{IrExpr, IrOperand, OpKind};
use crate::vars::{IrString, IrSymbol, IrVariable, StorageClass, SymbolBinding, SymbolKind};
use crate::view::{BranchKind, IrBlock, IrBranch, IrFunction, IrInstruction, IrView};

fn expr(op: OpKind, operands: Vec<IrOperand>) -> IrExpr {
    IrExpr { op, operands }
}

fn const_expr(value: i64) -> IrExpr {
    expr(OpKind::Const, vec![IrOperand::Int(value)])
}

fn const_ptr(value: i64) -> IrExpr {
    expr(OpKind::ConstPtr, vec![IrOperand::Int(value)])
}

fn var_expr(var: IrVariable) -> IrExpr {
    expr(OpKind::Var, vec![IrOperand::Var(var)])
}

fn reg_var(name: &str, defined_at: &[usize], used_at: &[usize]) -> IrVariable {
    IrVariable {
        name: name.to_string(),
        ty: "int32_t".to_string(),
        storage: StorageClass::Register,
        defined_at: defined_at.to_vec(),
        used_at: used_at.to_vec(),
    }
}

fn instr(index: usize, expr: IrExpr) -> IrInstruction {
    IrInstruction { index, expr, vars_read: vec![], vars_written: vec![] }
}

fn instr_rw(
    index: usize,
    expr: IrExpr,
    vars_read: Vec<IrVariable>,
    vars_written: Vec<IrVariable>,
) -> IrInstruction {
    IrInstruction { index, expr, vars_read, vars_written }
}

fn branch(target: usize, kind: BranchKind) -> IrBranch {
    IrBranch { target, kind, back_edge: false }
}

fn lines(text: &[&str]) -> Vec<String> {
    text.iter().map(|s| s.to_string()).collect()
}

/// `main` with a diamond CFG: entry splits into two differing arms which
/// rejoin at a shared exit block. The exit must come out as one node with
/// two incoming Branch rows.
pub fn diamond() -> IrView {
    let x = reg_var("x", &[1, 3], &[0, 5]);

    let cond = expr(
        OpKind::CmpEq,
        vec![IrOperand::Expr(var_expr(x.clone())), IrOperand::Expr(const_expr(0))],
    );
    let entry = IrBlock {
        start: 0x1000,
        disassembly: lines(&["cmp eax, 0", "je 0x1010"]),
        instructions: vec![instr_rw(
            0,
            expr(OpKind::If, vec![IrOperand::Expr(cond), IrOperand::Int(1), IrOperand::Int(2)]),
            vec![x.clone()],
            vec![],
        )],
        outgoing: vec![branch(1, BranchKind::OnTrue), branch(2, BranchKind::OnFalse)],
    };
    let left = IrBlock {
        start: 0x1010,
        disassembly: lines(&["mov eax, 1", "jmp 0x1030"]),
        instructions: vec![
            instr_rw(
                1,
                expr(
                    OpKind::SetVar,
                    vec![IrOperand::Var(x.clone()), IrOperand::Expr(const_expr(1))],
                ),
                vec![],
                vec![x.clone()],
            ),
            instr(2, expr(OpKind::Goto, vec![IrOperand::Int(3)])),
        ],
        outgoing: vec![branch(3, BranchKind::Unconditional)],
    };
    let right = IrBlock {
        start: 0x1020,
        disassembly: lines(&["mov eax, 2", "jmp 0x1030"]),
        instructions: vec![
            instr_rw(
                3,
                expr(
                    OpKind::SetVar,
                    vec![IrOperand::Var(x.clone()), IrOperand::Expr(const_expr(2))],
                ),
                vec![],
                vec![x.clone()],
            ),
            instr(4, expr(OpKind::Goto, vec![IrOperand::Int(3)])),
        ],
        outgoing: vec![branch(3, BranchKind::Unconditional)],
    };
    let exit = IrBlock {
        start: 0x1030,
        disassembly: lines(&["retn"]),
        instructions: vec![instr_rw(
            5,
            expr(OpKind::Ret, vec![IrOperand::ExprList(vec![var_expr(x.clone())])]),
            vec![x],
            vec![],
        )],
        outgoing: vec![],
    };

    IrView {
        filename: "diamond.bin".to_string(),
        architecture: "x86_64".to_string(),
        image: b"diamond image bytes".to_vec(),
        functions: vec![IrFunction {
            name: "main".to_string(),
            start: 0x1000,
            calling_convention: "sysv".to_string(),
            clobbered_registers: vec!["eax".to_string()],
            blocks: vec![entry, left, right, exit],
        }],
        strings: vec![],
        symbols: vec![],
    }
}

/// `spin` with a natural loop: the body branches back to itself. Exactly
/// one Branch row with BackEdge set must come out.
pub fn looped() -> IrView {
    let i = reg_var("i", &[0, 1], &[1, 2]);

    let init = IrBlock {
        start: 0x2000,
        disassembly: lines(&["xor eax, eax"]),
        instructions: vec![instr_rw(
            0,
            expr(OpKind::SetVar, vec![IrOperand::Var(i.clone()), IrOperand::Expr(const_expr(0))]),
            vec![],
            vec![i.clone()],
        )],
        outgoing: vec![branch(1, BranchKind::Unconditional)],
    };
    let step = expr(
        OpKind::Add,
        vec![IrOperand::Expr(var_expr(i.clone())), IrOperand::Expr(const_expr(1))],
    );
    let cond = expr(
        OpKind::CmpSlt,
        vec![IrOperand::Expr(var_expr(i.clone())), IrOperand::Expr(const_expr(10))],
    );
    let body = IrBlock {
        start: 0x2004,
        disassembly: lines(&["inc eax", "cmp eax, 10", "jl 0x2004"]),
        instructions: vec![
            instr_rw(
                1,
                expr(OpKind::SetVar, vec![IrOperand::Var(i.clone()), IrOperand::Expr(step)]),
                vec![i.clone()],
                vec![i.clone()],
            ),
            instr_rw(
                2,
                expr(OpKind::If, vec![IrOperand::Expr(cond), IrOperand::Int(1), IrOperand::Int(2)]),
                vec![i],
                vec![],
            ),
        ],
        outgoing: vec![
            IrBranch { target: 1, kind: BranchKind::OnTrue, back_edge: true },
            branch(2, BranchKind::OnFalse),
        ],
    };
    let done = IrBlock {
        start: 0x2010,
        disassembly: lines(&["retn"]),
        instructions: vec![instr(3, expr(OpKind::Ret, vec![IrOperand::ExprList(vec![])]))],
        outgoing: vec![],
    };

    IrView {
        filename: "looped.bin".to_string(),
        architecture: "x86_64".to_string(),
        image: b"looped image bytes".to_vec(),
        functions: vec![IrFunction {
            name: "spin".to_string(),
            start: 0x2000,
            calling_convention: "sysv".to_string(),
            clobbered_registers: vec!["eax".to_string()],
            blocks: vec![init, body, done],
        }],
        strings: vec![],
        symbols: vec![],
    }
}

/// `main` calling `helper` through a constant pointer, passing a string
/// address, plus a second call to an address no function owns. Exercises
/// call resolution, the unresolved-call miss path, and inline string and
/// symbol attachment.
pub fn call_pair() -> IrView {
    let eax = reg_var("eax", &[0], &[2]);
    let result = reg_var("result", &[3], &[4]);

    let known_call = expr(
        OpKind::Call,
        vec![
            IrOperand::Expr(const_ptr(0x1000)),
            IrOperand::ExprList(vec![const_ptr(0x2000)]),
            IrOperand::VarList(vec![eax.clone()]),
        ],
    );
    let unknown_call = expr(
        OpKind::Call,
        vec![
            IrOperand::Expr(const_ptr(0x9999)),
            IrOperand::ExprList(vec![]),
            IrOperand::VarList(vec![]),
        ],
    );
    let main_block = IrBlock {
        start: 0x4000,
        disassembly: lines(&["call 0x1000", "call 0x9999", "retn"]),
        instructions: vec![
            instr_rw(0, known_call, vec![], vec![eax.clone()]),
            instr(1, unknown_call),
            instr_rw(
                2,
                expr(OpKind::Ret, vec![IrOperand::ExprList(vec![var_expr(eax.clone())])]),
                vec![eax],
                vec![],
            ),
        ],
        outgoing: vec![],
    };

    let helper_block = IrBlock {
        start: 0x1000,
        disassembly: lines(&["mov eax, 7", "retn"]),
        instructions: vec![
            instr_rw(
                3,
                expr(
                    OpKind::SetVar,
                    vec![IrOperand::Var(result.clone()), IrOperand::Expr(const_expr(7))],
                ),
                vec![],
                vec![result.clone()],
            ),
            instr_rw(
                4,
                expr(OpKind::Ret, vec![IrOperand::ExprList(vec![var_expr(result.clone())])]),
                vec![result],
                vec![],
            ),
        ],
        outgoing: vec![],
    };

    IrView {
        filename: "call_pair.bin".to_string(),
        architecture: "x86_64".to_string(),
        image: b"call pair image bytes".to_vec(),
        functions: vec![
            IrFunction {
                name: "main".to_string(),
                start: 0x4000,
                calling_convention: "sysv".to_string(),
                clobbered_registers: vec!["eax".to_string()],
                blocks: vec![main_block],
            },
            IrFunction {
                name: "helper".to_string(),
                start: 0x1000,
                calling_convention: "sysv".to_string(),
                clobbered_registers: vec!["eax".to_string()],
                blocks: vec![helper_block],
            },
        ],
        strings: vec![IrString { address: 0x2000, value: "hello world".to_string() }],
        symbols: vec![IrSymbol {
            address: 0x1000,
            name: "helper".to_string(),
            kind: SymbolKind::Function,
            namespace: "default".to_string(),
            ordinal: 1,
            binding: SymbolBinding::Global,
        }],
    }
}

fn twin(name: &str, start: u64, label_line: &str) -> IrFunction {
    let acc = reg_var("acc", &[0], &[1]);
    IrFunction {
        name: name.to_string(),
        start,
        calling_convention: "sysv".to_string(),
        clobbered_registers: vec!["eax".to_string()],
        blocks: vec![IrBlock {
            start,
            disassembly: lines(&[label_line, "mov eax, 1", "retn"]),
            instructions: vec![
                instr_rw(
                    0,
                    expr(
                        OpKind::SetVar,
                        vec![IrOperand::Var(acc.clone()), IrOperand::Expr(const_expr(1))],
                    ),
                    vec![],
                    vec![acc.clone()],
                ),
                instr_rw(
                    1,
                    expr(OpKind::Ret, vec![IrOperand::ExprList(vec![var_expr(acc.clone())])]),
                    vec![acc],
                    vec![],
                ),
            ],
            outgoing: vec![],
        }],
    }
}

/// Two functions whose bodies differ only in their auto-generated label
/// lines. Label filtering makes their content hashes agree, so one
/// Function node with two MemberFunc rows is the expected outcome.
pub fn twin_functions() -> IrView {
    IrView {
        filename: "twins.bin".to_string(),
        architecture: "x86_64".to_string(),
        image: b"twins image bytes".to_vec(),
        functions: vec![twin("alpha", 0x5000, "sub_5000:"), twin("beta", 0x6000, "sub_6000:")],
        strings: vec![],
        symbols: vec![],
    }
}

/// One function holding two textually-identical return blocks reached from
/// different arms. The duplicates must collapse to a single BasicBlock
/// node that keeps both incoming Branch rows.
pub fn duplicate_blocks() -> IrView {
    let y = reg_var("y", &[1, 2], &[0, 3, 4]);

    let cond = expr(
        OpKind::CmpNe,
        vec![IrOperand::Expr(var_expr(y.clone())), IrOperand::Expr(const_expr(0))],
    );
    let entry = IrBlock {
        start: 0x7000,
        disassembly: lines(&["test eax, eax", "jne 0x7010"]),
        instructions: vec![instr_rw(
            0,
            expr(OpKind::If, vec![IrOperand::Expr(cond), IrOperand::Int(1), IrOperand::Int(2)]),
            vec![y.clone()],
            vec![],
        )],
        outgoing: vec![branch(1, BranchKind::OnTrue), branch(2, BranchKind::OnFalse)],
    };
    let arm = |start: u64, index: usize, value: i64, text: &str, target: usize| IrBlock {
        start,
        disassembly: lines(&[text]),
        instructions: vec![instr_rw(
            index,
            expr(
                OpKind::SetVar,
                vec![IrOperand::Var(y.clone()), IrOperand::Expr(const_expr(value))],
            ),
            vec![],
            vec![y.clone()],
        )],
        outgoing: vec![branch(target, BranchKind::Unconditional)],
    };
    let ret = |start: u64, index: usize| IrBlock {
        start,
        disassembly: lines(&["retn"]),
        instructions: vec![instr_rw(
            index,
            expr(OpKind::Ret, vec![IrOperand::ExprList(vec![var_expr(y.clone())])]),
            vec![y.clone()],
            vec![],
        )],
        outgoing: vec![],
    };
    let left = arm(0x7010, 1, 10, "mov eax, 10", 3);
    let right = arm(0x7020, 2, 20, "mov eax, 20", 4);
    let ret_a = ret(0x7030, 3);
    let ret_b = ret(0x7040, 4);

    IrView {
        filename: "duplicate_blocks.bin".to_string(),
        architecture: "x86_64".to_string(),
        image: b"duplicate blocks image bytes".to_vec(),
        functions: vec![IrFunction {
            name: "forked".to_string(),
            start: 0x7000,
            calling_convention: "sysv".to_string(),
            clobbered_registers: vec!["eax".to_string()],
            blocks: vec![entry, left, right, ret_a, ret_b],
        }],
        strings: vec![],
        symbols: vec![],
    }
}
