//! Unit tests for taproot-core

use crate::context::Context;
use crate::hash::{hash_fields, ContentHash};
use crate::model::{EdgeType, NodeLabel};

fn sample_root() -> Context {
    Context::root(hash_fields(&["image"]))
}

#[test]
fn test_label_round_trip() {
    for label in NodeLabel::ALL {
        assert_eq!(NodeLabel::parse(label.as_str()), Some(label));
        assert!(label.table_file().ends_with("-nodes.csv"));
    }
    assert_eq!(NodeLabel::parse("NotALabel"), None);
}

#[test]
fn test_edge_type_round_trip() {
    for edge_type in EdgeType::ALL {
        assert_eq!(EdgeType::parse(edge_type.as_str()), Some(edge_type));
        assert!(edge_type.table_file().ends_with("-relationships.csv"));
    }
    assert_eq!(EdgeType::parse("NotAType"), None);
}

#[test]
fn test_attr_columns_are_stable() {
    assert_eq!(NodeLabel::BinaryView.attr_columns(), ["FILENAME", "Architecture"]);
    assert_eq!(
        EdgeType::NextInstruction.attr_columns(),
        ["InstructionIndex", "VarsRead", "VarsWritten"]
    );
    assert!(EdgeType::FunctionCall.attr_columns().is_empty());
}

#[test]
fn test_context_derivation_sets_one_slot() {
    let root = sample_root();
    assert_eq!(root.parent_hash, ContentHash::ZERO);
    assert_eq!(root.self_hash, root.binary_view);

    let func = hash_fields(&["func body"]);
    let fn_ctx = root.enter_function(func);
    assert_eq!(fn_ctx.function, Some(func));
    assert_eq!(fn_ctx.self_hash, func);
    assert_eq!(fn_ctx.parent_hash, root.self_hash);
    assert_eq!(fn_ctx.binary_view, root.binary_view);
    assert_eq!(fn_ctx.basic_block, None);

    let block = hash_fields(&["block body"]);
    let bb_ctx = fn_ctx.enter_block(block);
    assert_eq!(bb_ctx.basic_block, Some(block));
    assert_eq!(bb_ctx.function, Some(func));
    assert_eq!(bb_ctx.parent_hash, func);
}

#[test]
fn test_nested_expression_replaces_slot() {
    let root = sample_root();
    let outer = hash_fields(&["outer"]);
    let inner = hash_fields(&["inner"]);

    let outer_ctx = root.enter_expression(outer, "0");
    let inner_ctx = outer_ctx.enter_expression(inner, "1");
    assert_eq!(inner_ctx.expression, Some(inner));
    assert_eq!(inner_ctx.parent_hash, outer);
    assert_eq!(inner_ctx.operand_index.as_deref(), Some("1"));
}

#[test]
fn test_path_signature_is_deterministic() {
    let a = sample_root().enter_function(hash_fields(&["f"]));
    let b = sample_root().enter_function(hash_fields(&["f"]));
    assert_eq!(a.path_signature(), b.path_signature());
}

#[test]
fn test_path_signature_distinguishes_parents() {
    let root = sample_root();
    let shared = hash_fields(&["shared block"]);

    let via_left = root.enter_block(hash_fields(&["left"])).enter_block(shared);
    let via_right = root.enter_block(hash_fields(&["right"])).enter_block(shared);
    assert_ne!(via_left.path_signature(), via_right.path_signature());
}

#[test]
fn test_path_signature_distinguishes_operand_index() {
    // ADD(x, x): same variable at two operand positions keeps both edges.
    let expr_ctx = sample_root().enter_expression(hash_fields(&["ADD"]), "0");
    let var = hash_fields(&["x", "StackVariable"]);

    let first = expr_ctx.enter_operand(var, "0");
    let second = expr_ctx.enter_operand(var, "1");
    assert_ne!(first.path_signature(), second.path_signature());
}

#[test]
fn test_attach_keeps_ancestors() {
    let const_ctx = sample_root()
        .enter_expression(hash_fields(&["CONST_PTR"]), "0")
        .enter_operand(hash_fields(&["4096"]), "0");
    let string_ctx = const_ctx.attach(hash_fields(&["hello"]));

    assert_eq!(string_ctx.parent_hash, const_ctx.self_hash);
    assert_eq!(string_ctx.expression, const_ctx.expression);
    assert_eq!(string_ctx.operand_index, None);
}

#[test]
fn test_content_hash_serde() {
    let hash = hash_fields(&["round trip"]);
    let json = serde_json::to_string(&hash).unwrap();
    let back: ContentHash = serde_json::from_str(&json).unwrap();
    assert_eq!(hash, back);
}
