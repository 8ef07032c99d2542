//! Control flow graph construction over three-address code.

use std::{collections::HashMap, fmt::Write};

use crate::{
    analysis::cfg::BasicBlock,
    ir::{MarkOp, Tac, TacId, TacList},
    symbols::LabelSymbol,
    utils::{
        escape_dot,
        graph::{DirectedGraph, NodeId},
    },
    Error::GraphError,
    Result,
};

/// A control flow graph of one function body.
///
/// Nodes are [`BasicBlock`]s named `Block_{n}`; each edge carries the instruction
/// that caused it: the `Goto` or `Conditional` for jumps, [`Tac::FallThrough`] for
/// sequential flow. Parallel edges are kept, so a conditional whose target is the
/// next block contributes two edges.
///
/// # Construction
///
/// ```rust,ignore
/// use stagecraft::analysis::ControlFlowGraph;
///
/// let mut cfg = ControlFlowGraph::build(&function.tacs)?;
/// cfg.condense(&function.tacs)?;
/// let live = cfg.reachable(cfg.entry().unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    graph: DirectedGraph<BasicBlock, Tac>,
}

impl ControlFlowGraph {
    /// Splits `list` into basic blocks and connects them.
    ///
    /// A new block starts after every `Goto` and `Conditional`, and at every label
    /// unless the current block is still empty. Conditionals add a fall-through edge
    /// to the following block; jump edges are resolved once all labels are known.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if a jump names a label that is not in the list.
    pub fn build(list: &TacList) -> Result<Self> {
        let mut graph: DirectedGraph<BasicBlock, Tac> = DirectedGraph::new();
        let mut blocks = 0usize;
        let mut open = |graph: &mut DirectedGraph<BasicBlock, Tac>| {
            let id = graph.add_node(format!("Block_{blocks}"), BasicBlock::new(blocks));
            blocks += 1;
            id
        };

        let mut current = open(&mut graph);
        let mut label_blocks: HashMap<&LabelSymbol, NodeId> = HashMap::new();
        let mut jumps: Vec<(NodeId, &LabelSymbol, &Tac)> = Vec::new();

        for (id, tac) in list.iter() {
            match tac {
                Tac::Goto(target) => {
                    push(&mut graph, current, id);
                    jumps.push((current, target, tac));
                    current = open(&mut graph);
                }
                Tac::Conditional { location, .. } => {
                    push(&mut graph, current, id);
                    let next = open(&mut graph);
                    graph.add_edge(current, next, Tac::FallThrough)?;
                    jumps.push((current, location, tac));
                    current = next;
                }
                Tac::Label(label) => {
                    if graph.node(current).is_some_and(|b| !b.is_empty()) {
                        let next = open(&mut graph);
                        graph.add_edge(current, next, Tac::FallThrough)?;
                        current = next;
                    }
                    push(&mut graph, current, id);
                    label_blocks.insert(label, current);
                }
                _ => push(&mut graph, current, id),
            }
        }

        for (source, label, tac) in jumps {
            let target = label_blocks
                .get(label)
                .copied()
                .ok_or_else(|| GraphError(format!("Jump to undefined label {label}")))?;
            graph.add_edge(source, target, tac.clone())?;
        }

        Ok(ControlFlowGraph { graph })
    }

    /// Merges straight-line block pairs, see [`DirectedGraph::condense`].
    ///
    /// The label opening the right block disappears in the merge, and so does a
    /// trailing `goto` of the left block. Returns the number of merges performed.
    ///
    /// # Errors
    ///
    /// Propagates graph errors from edge rewiring, and the merge error of a `goto`
    /// whose single successor does not open on its label.
    pub fn condense(&mut self, list: &TacList) -> Result<usize> {
        self.graph.condense(|a, b| BasicBlock::merge(a, b, list))
    }

    /// Returns the underlying graph.
    #[must_use]
    pub fn graph(&self) -> &DirectedGraph<BasicBlock, Tac> {
        &self.graph
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns a block by node id.
    #[must_use]
    pub fn block(&self, node: NodeId) -> Option<&BasicBlock> {
        self.graph.node(node)
    }

    /// Iterates live blocks in node order.
    pub fn blocks(&self) -> impl Iterator<Item = (NodeId, &BasicBlock)> + '_ {
        self.graph.nodes()
    }

    /// Returns the block that comes first in stream order.
    #[must_use]
    pub fn entry(&self) -> Option<NodeId> {
        self.graph
            .nodes()
            .min_by_key(|(_, block)| block.order())
            .map(|(id, _)| id)
    }

    /// Returns the block holding the `FunctionMark(Start)` instruction.
    #[must_use]
    pub fn find_function_start(&self, list: &TacList) -> Option<NodeId> {
        self.graph.nodes().find_map(|(id, block)| {
            block
                .tacs(list)
                .any(|(_, tac)| matches!(tac, Tac::FunctionMark(MarkOp::Start)))
                .then_some(id)
        })
    }

    /// Returns all blocks reachable from `start`, in breadth-first order.
    #[must_use]
    pub fn reachable(&self, start: NodeId) -> Vec<NodeId> {
        self.graph.reachable(start)
    }

    /// Returns the blocks without predecessors.
    #[must_use]
    pub fn entrances(&self) -> Vec<NodeId> {
        self.graph.entrances()
    }

    /// Returns the blocks without successors.
    #[must_use]
    pub fn exits(&self) -> Vec<NodeId> {
        self.graph.exits()
    }

    /// Flattens `nodes` into one instruction sequence, ordered by original stream
    /// position.
    #[must_use]
    pub fn linearize(&self, nodes: &[NodeId]) -> Vec<TacId> {
        let mut ordered: Vec<&BasicBlock> =
            nodes.iter().filter_map(|id| self.graph.node(*id)).collect();
        ordered.sort_by_key(|block| block.order());
        ordered
            .into_iter()
            .flat_map(|block| block.instructions().iter().copied())
            .collect()
    }

    /// Renders the graph in DOT format with each block's instruction listing.
    #[must_use]
    pub fn to_dot(&self, list: &TacList, title: &str) -> String {
        let mut dot = format!("digraph \"{}\" {{\n", escape_dot(title));
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n");
        for (id, block) in self.graph.nodes() {
            let mut body = String::new();
            for (_, tac) in block.tacs(list) {
                let _ = writeln!(body, "{tac}");
            }
            let _ = writeln!(
                dot,
                "    {id} [label=\"{}\\l{}\"];",
                escape_dot(self.graph.name(id).unwrap_or_default()),
                escape_dot(&body)
            );
        }
        for (edge, data) in self.graph.edges() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                let style = if matches!(data, Tac::FallThrough) {
                    " [style=dashed]"
                } else {
                    ""
                };
                let _ = writeln!(dot, "    {source} -> {target}{style};");
            }
        }
        dot.push_str("}\n");
        dot
    }
}

fn push(graph: &mut DirectedGraph<BasicBlock, Tac>, block: NodeId, id: TacId) {
    if let Some(block) = graph.node_mut(block) {
        block.push(id);
    }
}
