//! Ancestor-chain tracking for edge construction and path-level dedup

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::Xxh64;

use crate::hash::ContentHash;

/// Secondary identity for an edge: a digest of the full ancestor chain.
///
/// Distinct from a node's content hash. Two occurrences of the same node
/// under different parents produce different signatures, which is exactly
/// what edge-level dedup needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathSignature(pub u64);

impl std::fmt::Display for PathSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The chain of ancestor identities from the root binary view down to the
/// current node, carried on every emitted edge row.
///
/// Immutable per step: descending one level produces a new `Context` with
/// exactly one slot newly set to the child's hash, the parent set to the
/// previous self, and every other slot copied unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub binary_view: ContentHash,
    pub function: Option<ContentHash>,
    pub basic_block: Option<ContentHash>,
    pub instruction: Option<ContentHash>,
    pub expression: Option<ContentHash>,
    /// Index of the current node within its parent's operand list. Call
    /// parameter lists use the `func_param_<n>` form.
    pub operand_index: Option<String>,
    pub self_hash: ContentHash,
    pub parent_hash: ContentHash,
}

impl Context {
    /// Context of the binary view itself, parented to the synthetic root.
    pub fn root(binary_view: ContentHash) -> Context {
        Context {
            binary_view,
            function: None,
            basic_block: None,
            instruction: None,
            expression: None,
            operand_index: None,
            self_hash: binary_view,
            parent_hash: ContentHash::ZERO,
        }
    }

    pub fn enter_function(&self, function: ContentHash) -> Context {
        Context {
            function: Some(function),
            operand_index: None,
            self_hash: function,
            parent_hash: self.self_hash,
            ..self.clone()
        }
    }

    pub fn enter_block(&self, block: ContentHash) -> Context {
        Context {
            basic_block: Some(block),
            operand_index: None,
            self_hash: block,
            parent_hash: self.self_hash,
            ..self.clone()
        }
    }

    pub fn enter_instruction(&self, instruction: ContentHash) -> Context {
        Context {
            instruction: Some(instruction),
            operand_index: None,
            self_hash: instruction,
            parent_hash: self.self_hash,
            ..self.clone()
        }
    }

    pub fn enter_expression(&self, expression: ContentHash, operand_index: &str) -> Context {
        Context {
            expression: Some(expression),
            operand_index: Some(operand_index.to_string()),
            self_hash: expression,
            parent_hash: self.self_hash,
            ..self.clone()
        }
    }

    /// Descend to a leaf operand (variable or constant) of the current
    /// expression. No ancestor slot changes; only the operand index moves.
    pub fn enter_operand(&self, operand: ContentHash, operand_index: &str) -> Context {
        Context {
            operand_index: Some(operand_index.to_string()),
            self_hash: operand,
            parent_hash: self.self_hash,
            ..self.clone()
        }
    }

    /// Descend to an attached literal (string or symbol) of the current node.
    pub fn attach(&self, attached: ContentHash) -> Context {
        Context {
            operand_index: None,
            self_hash: attached,
            parent_hash: self.self_hash,
            ..self.clone()
        }
    }

    /// Digest of every field in order. The key for "have I emitted this
    /// exact edge before" — the operand index participates, so the two
    /// occurrences of `x` in `ADD(x, x)` keep separate edges.
    pub fn path_signature(&self) -> PathSignature {
        let mut hasher = Xxh64::new(0);
        let mut feed = |hash: &ContentHash| hasher.update(hash.to_string().as_bytes());
        feed(&self.binary_view);
        feed(&self.function.unwrap_or(ContentHash::ZERO));
        feed(&self.basic_block.unwrap_or(ContentHash::ZERO));
        feed(&self.instruction.unwrap_or(ContentHash::ZERO));
        feed(&self.expression.unwrap_or(ContentHash::ZERO));
        if let Some(index) = &self.operand_index {
            hasher.update(index.as_bytes());
        }
        hasher.update(self.parent_hash.to_string().as_bytes());
        hasher.update(self.self_hash.to_string().as_bytes());
        PathSignature(hasher.digest())
    }
}
