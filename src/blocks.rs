//! Block-graph input model for the compiler.
//!
//! A [`BlockGraph`] is the wire form of a graphical workspace: a forest of
//! nodes identified by string ids, each carrying a kind tag, an optional
//! numeric field, and links to a `next` sibling and (for containers) a child
//! chain. The graph is produced by the editor layer and is treated as
//! read-only input here; the compiler never mutates it and retains no nodes
//! after compilation.
//!
//! Graphs arrive serialized (workspace exports), so every type derives serde.
//!
//! # Examples
//!
//! ```
//! use blockdrive::blocks::{BlockGraph, BlockKind, BlockNode};
//!
//! let mut graph = BlockGraph::new();
//! graph.insert("start", BlockNode::new(BlockKind::Start).with_next("fwd"));
//! graph.insert(
//!     "fwd",
//!     BlockNode::new(BlockKind::MoveForward).with_value(2.0),
//! );
//! graph.push_top("start");
//!
//! assert_eq!(graph.anchors().count(), 1);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node within a block graph.
///
/// The editor assigns opaque string ids; the compiler only ever compares and
/// looks them up.
pub type BlockId = String;

/// Kind tag of a block node.
///
/// Mirrors the palette the editor exposes: one anchor kind, five motion
/// primitives, the counted-repeat container, and the numeric literal that
/// feeds a repeat's count input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Anchor marking the start of an executable chain. Only chains linked
    /// from an anchor are compiled.
    Start,
    MoveForward,
    MoveBackward,
    TurnLeft,
    TurnRight,
    Stop,
    /// Counted-repeat container with a child chain and an optional attached
    /// [`BlockKind::Number`] count input.
    Repeat,
    /// Numeric literal block, used only as a repeat count input.
    Number,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BlockKind::Start => "start",
            BlockKind::MoveForward => "move_forward",
            BlockKind::MoveBackward => "move_backward",
            BlockKind::TurnLeft => "turn_left",
            BlockKind::TurnRight => "turn_right",
            BlockKind::Stop => "stop",
            BlockKind::Repeat => "repeat",
            BlockKind::Number => "number",
        };
        write!(f, "{label}")
    }
}

/// One node of a block graph.
///
/// `value` carries the node's numeric field (duration in seconds, degrees, or
/// a literal number, depending on `kind`). `next` links the following sibling
/// in the chain. For [`BlockKind::Repeat`] nodes, `body` points at the first
/// block of the child chain and `count` at an attached number block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BlockId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<BlockId>,
}

impl BlockNode {
    /// Create a node of the given kind with no field value and no links.
    #[must_use]
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            value: None,
            next: None,
            body: None,
            count: None,
        }
    }

    /// Set the numeric field (duration, degrees, or literal value).
    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Link the following sibling.
    #[must_use]
    pub fn with_next(mut self, next: impl Into<BlockId>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Link the first block of a repeat's child chain.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<BlockId>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a repeat's count input block.
    #[must_use]
    pub fn with_count(mut self, count: impl Into<BlockId>) -> Self {
        self.count = Some(count.into());
        self
    }
}

/// A forest of block nodes plus the workspace ordering of its top-level
/// blocks.
///
/// `top` preserves the order in which top-level blocks appear in the
/// workspace; the compiler concatenates anchor chains in exactly this order
/// so that multiple disjoint programs run as one combined sequence.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockGraph {
    #[serde(default)]
    nodes: FxHashMap<BlockId, BlockNode>,
    #[serde(default)]
    top: Vec<BlockId>,
}

impl BlockGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node under the given id, replacing any previous node.
    pub fn insert(&mut self, id: impl Into<BlockId>, node: BlockNode) {
        self.nodes.insert(id.into(), node);
    }

    /// Record a block as top-level, after any previously recorded ones.
    pub fn push_top(&mut self, id: impl Into<BlockId>) {
        self.top.push(id.into());
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&BlockNode> {
        self.nodes.get(id)
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level block ids in workspace order.
    pub fn top_blocks(&self) -> impl Iterator<Item = &BlockId> {
        self.top.iter()
    }

    /// Ids of [`BlockKind::Start`] anchors, in workspace order.
    pub fn anchors(&self) -> impl Iterator<Item = &BlockId> {
        self.top
            .iter()
            .filter(|id| matches!(self.nodes.get(id.as_str()).map(|n| n.kind), Some(BlockKind::Start)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_preserve_workspace_order() {
        let mut graph = BlockGraph::new();
        graph.insert("b", BlockNode::new(BlockKind::Start));
        graph.insert("a", BlockNode::new(BlockKind::Start));
        graph.insert("loose", BlockNode::new(BlockKind::MoveForward).with_value(1.0));
        graph.push_top("b");
        graph.push_top("loose");
        graph.push_top("a");

        let anchors: Vec<_> = graph.anchors().map(String::as_str).collect();
        assert_eq!(anchors, vec!["b", "a"]);
    }

    #[test]
    fn serde_round_trip_keeps_links() {
        let mut graph = BlockGraph::new();
        graph.insert(
            "loop",
            BlockNode::new(BlockKind::Repeat)
                .with_body("fwd")
                .with_count("n"),
        );
        graph.insert("fwd", BlockNode::new(BlockKind::MoveForward).with_value(1.5));
        graph.insert("n", BlockNode::new(BlockKind::Number).with_value(3.0));
        graph.push_top("loop");

        let json = serde_json::to_string(&graph).unwrap();
        let back: BlockGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back.node("loop").unwrap().body.as_deref(), Some("fwd"));
        assert_eq!(back.node("n").unwrap().value, Some(3.0));
    }
}
