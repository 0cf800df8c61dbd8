//! Block-graph compiler.
//!
//! Turns a [`BlockGraph`] forest into an ordered, immutable [`Program`]:
//! a depth-first walk from every `Start` anchor, following `next` links,
//! expanding counted-repeat containers into nested [`Command::Repeat`]
//! bodies. The compiler owns all range validation — out-of-range fields are
//! clamped (never dropped) here, so nothing downstream needs to re-check.
//!
//! The graph is read-only input; no node is retained after compilation.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::blocks::{BlockGraph, BlockId, BlockKind, BlockNode};
use crate::program::{Command, DEGREES_RANGE, DURATION_RANGE_SECS, Program};

/// Repeat count used when the count input is absent or unparseable.
pub const DEFAULT_REPEAT_COUNT: u32 = 1;

/// Compilation failures.
///
/// All of these are fatal to starting a run; the caller must not hand the
/// engine a program that failed to compile.
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// The graph contains no `Start` anchor, so nothing is executable.
    #[error("program has no Start block")]
    #[diagnostic(
        code(blockdrive::compile::no_anchor),
        help("Add a Start block and chain commands below it; only chained blocks run.")
    )]
    NoAnchor,

    /// A `next`/`body` link points at an id that is not in the graph.
    #[error("block '{id}' is referenced but not present in the graph")]
    #[diagnostic(code(blockdrive::compile::unknown_block))]
    UnknownBlock { id: BlockId },

    /// A chain revisits a node; the graph is not tree-shaped.
    #[error("cycle detected at block '{id}'")]
    #[diagnostic(
        code(blockdrive::compile::cycle),
        help("Block graphs must be acyclic; re-export the workspace.")
    )]
    Cycle { id: BlockId },
}

/// Compile a block graph into a runnable program.
///
/// Every `Start` anchor contributes its chain, concatenated in workspace
/// order, so disjoint stacks authored side by side run as one combined
/// sequence. Zero anchors is an error: an empty program is not runnable.
///
/// ```
/// use blockdrive::blocks::{BlockGraph, BlockKind, BlockNode};
/// use blockdrive::compiler::{compile, CompileError};
///
/// let graph = BlockGraph::new();
/// assert!(matches!(compile(&graph), Err(CompileError::NoAnchor)));
/// ```
pub fn compile(graph: &BlockGraph) -> Result<Program, CompileError> {
    let anchors: Vec<&BlockId> = graph.anchors().collect();
    if anchors.is_empty() {
        return Err(CompileError::NoAnchor);
    }

    let mut commands = Vec::new();
    let mut visited = FxHashSet::default();
    for anchor in anchors {
        // Anchors come from the graph's own top-level index, so the lookup
        // cannot dangle; the chain below it can.
        let Some(node) = graph.node(anchor) else {
            continue;
        };
        if let Some(first) = &node.next {
            compile_chain(graph, first.clone(), &mut commands, &mut visited)?;
        }
    }
    Ok(Program::new(commands))
}

fn compile_chain(
    graph: &BlockGraph,
    first: BlockId,
    out: &mut Vec<Command>,
    visited: &mut FxHashSet<BlockId>,
) -> Result<(), CompileError> {
    let mut cursor = Some(first);
    while let Some(id) = cursor {
        if !visited.insert(id.clone()) {
            return Err(CompileError::Cycle { id });
        }
        let node = graph
            .node(&id)
            .ok_or_else(|| CompileError::UnknownBlock { id: id.clone() })?;

        match node.kind {
            BlockKind::MoveForward => out.push(Command::MoveForward {
                seconds: clamp_duration(node.value, &id),
            }),
            BlockKind::MoveBackward => out.push(Command::MoveBackward {
                seconds: clamp_duration(node.value, &id),
            }),
            BlockKind::TurnLeft => out.push(Command::TurnLeft {
                degrees: clamp_degrees(node.value, &id),
            }),
            BlockKind::TurnRight => out.push(Command::TurnRight {
                degrees: clamp_degrees(node.value, &id),
            }),
            BlockKind::Stop => out.push(Command::Stop {
                seconds: clamp_duration(node.value, &id),
            }),
            BlockKind::Repeat => {
                let count = resolve_count(graph, node);
                let mut body = Vec::new();
                if let Some(body_id) = &node.body {
                    compile_chain(graph, body_id.clone(), &mut body, visited)?;
                }
                out.push(Command::Repeat { count, body });
            }
            // A Start mid-chain contributes nothing; stray Number blocks
            // only make sense as count inputs.
            BlockKind::Start | BlockKind::Number => {}
        }

        cursor = node.next.clone();
    }
    Ok(())
}

/// Resolve a repeat's count from its attached number input.
///
/// Absent or unparseable input falls back to [`DEFAULT_REPEAT_COUNT`];
/// negative values clamp to zero, fractional values truncate.
fn resolve_count(graph: &BlockGraph, node: &BlockNode) -> u32 {
    let value = node
        .count
        .as_deref()
        .and_then(|id| graph.node(id))
        .and_then(|input| input.value);
    match value {
        Some(v) if v.is_finite() => {
            if v <= 0.0 {
                0
            } else {
                v.trunc() as u32
            }
        }
        _ => DEFAULT_REPEAT_COUNT,
    }
}

fn clamp_duration(value: Option<f64>, id: &str) -> f64 {
    clamp_field(value, DURATION_RANGE_SECS, id, "duration")
}

fn clamp_degrees(value: Option<f64>, id: &str) -> f64 {
    clamp_field(value, DEGREES_RANGE, id, "degrees")
}

fn clamp_field(value: Option<f64>, (min, max): (f64, f64), id: &str, field: &str) -> f64 {
    let raw = value.unwrap_or(0.0);
    if !raw.is_finite() {
        tracing::warn!(block = id, field, raw, clamped = min, "non-finite field value");
        return min;
    }
    let clamped = raw.clamp(min, max);
    if clamped != raw {
        tracing::warn!(block = id, field, raw, clamped, "field value out of range");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockGraph, BlockKind, BlockNode};

    fn leaf(kind: BlockKind, value: f64) -> BlockNode {
        BlockNode::new(kind).with_value(value)
    }

    #[test]
    fn fields_are_clamped_into_range() {
        let mut graph = BlockGraph::new();
        graph.insert("s", BlockNode::new(BlockKind::Start).with_next("fwd"));
        graph.insert("fwd", leaf(BlockKind::MoveForward, 99.0).with_next("turn"));
        graph.insert("turn", leaf(BlockKind::TurnLeft, 0.0));
        graph.push_top("s");

        let program = compile(&graph).unwrap();
        let commands: Vec<_> = program.iter().cloned().collect();
        assert_eq!(
            commands,
            vec![
                Command::MoveForward { seconds: 10.0 },
                Command::TurnLeft { degrees: 1.0 },
            ]
        );
    }

    #[test]
    fn negative_count_clamps_to_zero_and_missing_defaults() {
        let mut graph = BlockGraph::new();
        graph.insert(
            "s",
            BlockNode::new(BlockKind::Start).with_next("neg"),
        );
        graph.insert(
            "neg",
            BlockNode::new(BlockKind::Repeat)
                .with_count("n")
                .with_next("bare"),
        );
        graph.insert("n", leaf(BlockKind::Number, -3.0));
        graph.insert("bare", BlockNode::new(BlockKind::Repeat));
        graph.push_top("s");

        let program = compile(&graph).unwrap();
        let commands: Vec<_> = program.iter().cloned().collect();
        assert_eq!(
            commands,
            vec![
                Command::Repeat { count: 0, body: vec![] },
                Command::Repeat {
                    count: DEFAULT_REPEAT_COUNT,
                    body: vec![]
                },
            ]
        );
    }

    #[test]
    fn cycle_is_reported() {
        let mut graph = BlockGraph::new();
        graph.insert("s", BlockNode::new(BlockKind::Start).with_next("a"));
        graph.insert("a", leaf(BlockKind::MoveForward, 1.0).with_next("b"));
        graph.insert("b", leaf(BlockKind::Stop, 1.0).with_next("a"));
        graph.push_top("s");

        assert!(matches!(
            compile(&graph),
            Err(CompileError::Cycle { id }) if id == "a"
        ));
    }

    #[test]
    fn dangling_link_is_reported() {
        let mut graph = BlockGraph::new();
        graph.insert("s", BlockNode::new(BlockKind::Start).with_next("ghost"));
        graph.push_top("s");

        assert!(matches!(
            compile(&graph),
            Err(CompileError::UnknownBlock { id }) if id == "ghost"
        ));
    }
}
