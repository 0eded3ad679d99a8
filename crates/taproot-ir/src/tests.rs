//! Unit tests for taproot-ir

use std::collections::HashSet;

use crate::expr::{IrExpr, IrOperand, OpKind};
use crate::fixtures;
use crate::vars::{IrVariable, StorageClass};
use crate::view::IrView;

fn nameless_var(name: &str) -> IrVariable {
    IrVariable {
        name: name.to_string(),
        ty: String::new(),
        storage: StorageClass::Register,
        defined_at: vec![],
        used_at: vec![],
    }
}

#[test]
fn test_render_nested_call() {
    let call = IrExpr {
        op: OpKind::Call,
        operands: vec![
            IrOperand::Expr(IrExpr {
                op: OpKind::ConstPtr,
                operands: vec![IrOperand::Int(4096)],
            }),
            IrOperand::ExprList(vec![IrExpr {
                op: OpKind::ConstPtr,
                operands: vec![IrOperand::Int(8192)],
            }]),
            IrOperand::VarList(vec![nameless_var("eax")]),
        ],
    };
    assert_eq!(call.render(), "CALL[CONST_PTR[4096], [CONST_PTR[8192]], [eax]]");
    assert_eq!(call.operands_text(), "[CONST_PTR[4096], [CONST_PTR[8192]], [eax]]");
}

#[test]
fn test_render_covers_every_operand_kind() {
    let sample = IrExpr {
        op: OpKind::Intrinsic,
        operands: vec![
            IrOperand::Intrinsic("rdtsc".to_string()),
            IrOperand::ExprList(vec![]),
            IrOperand::VarList(vec![nameless_var("a"), nameless_var("b")]),
            IrOperand::Int(-5),
            IrOperand::IntList(vec![1, 2]),
            IrOperand::Float(1.5),
            IrOperand::Var(nameless_var("c")),
        ],
    };
    assert_eq!(sample.operands_text(), "[rdtsc, [], [a, b], -5, [1, 2], 1.5, c]");
}

#[test]
fn test_render_is_stable_for_empty_operands() {
    let nop = IrExpr { op: OpKind::Nop, operands: vec![] };
    assert_eq!(nop.render(), "NOP[]");
}

#[test]
fn test_signature_text() {
    assert_eq!(
        OpKind::Call.signature_text(),
        "[dest:expr, params:expr_list, output:var_list]"
    );
    assert_eq!(OpKind::If.signature_text(), "[condition:expr, true:int, false:int]");
    assert_eq!(OpKind::Nop.signature_text(), "[]");
}

#[test]
fn test_opkind_tables_have_no_duplicates() {
    let names: HashSet<&str> = OpKind::ALL.iter().map(|op| op.name()).collect();
    assert_eq!(names.len(), OpKind::ALL.len());

    let values: HashSet<u32> = OpKind::ALL.iter().map(|op| op.value()).collect();
    assert_eq!(values.len(), OpKind::ALL.len());
}

#[test]
fn test_fixture_views_round_trip_through_json() {
    let views = [
        fixtures::diamond(),
        fixtures::looped(),
        fixtures::call_pair(),
        fixtures::twin_functions(),
        fixtures::duplicate_blocks(),
    ];
    for view in views {
        let json = serde_json::to_string(&view).unwrap();
        let back: IrView = serde_json::from_str(&json).unwrap();
        assert_eq!(view, back);
    }
}

#[test]
fn test_diamond_rejoins_at_shared_exit() {
    let view = fixtures::diamond();
    let blocks = &view.functions[0].blocks;
    assert_eq!(blocks.len(), 4);
    assert_eq!(blocks[0].outgoing.len(), 2);
    assert_eq!(blocks[1].outgoing[0].target, 3);
    assert_eq!(blocks[2].outgoing[0].target, 3);
}

#[test]
fn test_looped_carries_exactly_one_back_edge() {
    let view = fixtures::looped();
    let back_edges: usize = view.functions[0]
        .blocks
        .iter()
        .flat_map(|block| block.outgoing.iter())
        .filter(|branch| branch.back_edge)
        .count();
    assert_eq!(back_edges, 1);
}

#[test]
fn test_twin_functions_differ_only_in_labels() {
    let view = fixtures::twin_functions();
    let filtered = |index: usize| -> Vec<&String> {
        view.functions[index].blocks[0]
            .disassembly
            .iter()
            .filter(|line| !line.starts_with("sub_"))
            .collect()
    };
    assert_ne!(view.functions[0].blocks[0].disassembly, view.functions[1].blocks[0].disassembly);
    assert_eq!(filtered(0), filtered(1));
}
