//! Core directed graph implementation.
//!
//! This module provides [`DirectedGraph`], the graph data structure behind the
//! control-flow graph and the call graph. Nodes carry a value and a display name;
//! edges carry an arbitrary value (use `()` for unlabeled graphs).
//!
//! # Removal
//!
//! Nodes and edges live in slot vectors. Removing an element leaves a tombstone
//! behind, so previously handed out [`NodeId`]s and [`EdgeId`]s never change meaning.
//! Iteration skips tombstones and always yields elements in insertion order.

use crate::{
    utils::{
        escape_dot,
        graph::{
            algorithms,
            ids::{EdgeId, NodeId},
            traits::{GraphBase, Predecessors, Successors},
        },
    },
    Error, Result,
};

/// Internal storage for a node's name and value.
#[derive(Debug, Clone)]
struct NodeData<N> {
    name: String,
    value: N,
}

/// Internal storage for edge data and endpoints.
#[derive(Debug, Clone)]
struct EdgeData<E> {
    /// Source node of the edge
    source: NodeId,
    /// Target node of the edge
    target: NodeId,
    /// User-provided edge data
    data: E,
}

/// A directed multigraph with named, typed nodes and typed edges.
///
/// `DirectedGraph` supports:
///
/// - Generic node data (`N`) plus a display name per node
/// - Generic edge data (`E`)
/// - Forward (successors) and backward (predecessors) traversal via adjacency lists
/// - Node and edge removal (tombstoned, identifiers stay stable)
/// - Breadth-first reachability, entrance/exit detection and chain condensation
///
/// Parallel edges are kept as separate edges, so degree queries count edges,
/// not distinct neighbours.
///
/// # Examples
///
/// ```rust,ignore
/// use stagecraft::utils::graph::DirectedGraph;
///
/// let mut graph: DirectedGraph<i32, ()> = DirectedGraph::new();
/// let a = graph.add_node("a", 1);
/// let b = graph.add_node("b", 2);
/// graph.add_edge(a, b, ())?;
///
/// assert_eq!(graph.entrances(), vec![a]);
/// assert_eq!(graph.exits(), vec![b]);
/// ```
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    /// Node slots, `None` once removed
    nodes: Vec<Option<NodeData<N>>>,
    /// Edge slots, `None` once removed
    edges: Vec<Option<EdgeData<E>>>,
    /// Outgoing edges per node slot
    outgoing: Vec<Vec<EdgeId>>,
    /// Incoming edges per node slot
    incoming: Vec<Vec<EdgeId>>,
    /// Number of live nodes
    live_nodes: usize,
    /// Number of live edges
    live_edges: usize,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Creates a new empty directed graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            live_nodes: 0,
            live_edges: 0,
        }
    }

    /// Creates a new directed graph with pre-allocated capacity.
    ///
    /// # Arguments
    ///
    /// * `node_capacity` - Expected number of nodes
    /// * `edge_capacity` - Expected number of edges
    #[must_use]
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        DirectedGraph {
            nodes: Vec::with_capacity(node_capacity),
            edges: Vec::with_capacity(edge_capacity),
            outgoing: Vec::with_capacity(node_capacity),
            incoming: Vec::with_capacity(node_capacity),
            live_nodes: 0,
            live_edges: 0,
        }
    }

    /// Adds a new node with the given name and value.
    ///
    /// Names are informational and need not be unique; [`DirectedGraph::find`]
    /// returns the first live match.
    ///
    /// # Returns
    ///
    /// The `NodeId` assigned to the new node.
    pub fn add_node(&mut self, name: impl Into<String>, value: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Some(NodeData {
            name: name.into(),
            value,
        }));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        self.live_nodes += 1;
        id
    }

    /// Returns `true` if `node` refers to a live node.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        matches!(self.nodes.get(node.index()), Some(Some(_)))
    }

    /// Returns the value stored at `node`, or `None` if it was removed or never existed.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.slot(node).map(|n| &n.value)
    }

    /// Returns a mutable reference to the value stored at `node`.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut N> {
        self.nodes
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .map(|n| &mut n.value)
    }

    /// Returns the display name of `node`.
    #[must_use]
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.slot(node).map(|n| n.name.as_str())
    }

    /// Finds the first live node with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.node_ids().find(|&id| self.name(id) == Some(name))
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    /// Returns one past the largest node index ever assigned.
    #[must_use]
    pub fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_nodes == 0
    }

    /// Returns an iterator over all live node identifiers, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| NodeId::new(i))
    }

    /// Returns an iterator over all live nodes with their identifiers.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NodeId::new(i), &n.value)))
    }

    /// Adds a directed edge from `source` to `target` carrying `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint is not a live node.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<EdgeId> {
        if !self.contains(source) {
            return Err(Error::GraphError(format!(
                "source node {} does not exist in graph with {} nodes",
                source, self.live_nodes
            )));
        }
        if !self.contains(target) {
            return Err(Error::GraphError(format!(
                "target node {} does not exist in graph with {} nodes",
                target, self.live_nodes
            )));
        }

        let id = EdgeId::new(self.edges.len());
        self.edges.push(Some(EdgeData {
            source,
            target,
            data,
        }));
        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);
        self.live_edges += 1;

        Ok(id)
    }

    /// Returns the data carried by `edge`.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&E> {
        self.edge_slot(edge).map(|e| &e.data)
    }

    /// Returns mutable access to the data carried by `edge`.
    pub fn edge_mut(&mut self, edge: EdgeId) -> Option<&mut E> {
        self.edges
            .get_mut(edge.index())
            .and_then(Option::as_mut)
            .map(|e| &mut e.data)
    }

    /// Returns the `(source, target)` pair of `edge`.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edge_slot(edge).map(|e| (e.source, e.target))
    }

    /// Returns the number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.live_edges
    }

    /// Returns an iterator over all live edges with their identifiers.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &E)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|e| (EdgeId::new(i), &e.data)))
    }

    /// Returns the targets of the outgoing edges of `node`.
    ///
    /// A removed or unknown node has no successors.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacent(&self.outgoing, node)
            .iter()
            .filter_map(|&edge| self.edge_slot(edge).map(|e| e.target))
    }

    /// Returns the sources of the incoming edges of `node`.
    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacent(&self.incoming, node)
            .iter()
            .filter_map(|&edge| self.edge_slot(edge).map(|e| e.source))
    }

    /// Returns the outgoing edges of `node` as `(EdgeId, target, data)`.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> + '_ {
        self.adjacent(&self.outgoing, node)
            .iter()
            .filter_map(|&edge| self.edge_slot(edge).map(|e| (edge, e.target, &e.data)))
    }

    /// Returns the incoming edges of `node` as `(EdgeId, source, data)`.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> + '_ {
        self.adjacent(&self.incoming, node)
            .iter()
            .filter_map(|&edge| self.edge_slot(edge).map(|e| (edge, e.source, &e.data)))
    }

    /// Returns the number of outgoing edges of `node`.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.adjacent(&self.outgoing, node).len()
    }

    /// Returns the number of incoming edges of `node`.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.adjacent(&self.incoming, node).len()
    }

    /// Removes a single edge and returns its data.
    pub fn remove_edge(&mut self, edge: EdgeId) -> Option<E> {
        let data = self.edges.get_mut(edge.index())?.take()?;
        self.outgoing[data.source.index()].retain(|&e| e != edge);
        self.incoming[data.target.index()].retain(|&e| e != edge);
        self.live_edges -= 1;
        Some(data.data)
    }

    /// Severs every edge incident to `node`, keeping the node itself.
    pub fn unlink(&mut self, node: NodeId) {
        if !self.contains(node) {
            return;
        }

        let incident: Vec<EdgeId> = self.outgoing[node.index()]
            .iter()
            .chain(self.incoming[node.index()].iter())
            .copied()
            .collect();
        for edge in incident {
            self.remove_edge(edge);
        }
    }

    /// Removes `node` and every edge incident to it.
    ///
    /// # Returns
    ///
    /// The removed node's value, or `None` if the node was not live.
    pub fn remove_node(&mut self, node: NodeId) -> Option<N> {
        self.unlink(node);
        let removed = self.nodes.get_mut(node.index())?.take()?;
        self.live_nodes -= 1;
        Some(removed.value)
    }

    /// Returns all live nodes without incoming edges, in insertion order.
    #[must_use]
    pub fn entrances(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&n| self.in_degree(n) == 0).collect()
    }

    /// Returns all live nodes without outgoing edges, in insertion order.
    #[must_use]
    pub fn exits(&self) -> Vec<NodeId> {
        self.node_ids().filter(|&n| self.out_degree(n) == 0).collect()
    }

    /// Returns every node reachable from `start`, including `start`, in BFS visitation order.
    #[must_use]
    pub fn reachable(&self, start: NodeId) -> Vec<NodeId> {
        algorithms::bfs(self, start).collect()
    }

    fn slot(&self, node: NodeId) -> Option<&NodeData<N>> {
        self.nodes.get(node.index()).and_then(Option::as_ref)
    }

    fn edge_slot(&self, edge: EdgeId) -> Option<&EdgeData<E>> {
        self.edges.get(edge.index()).and_then(Option::as_ref)
    }

    fn adjacent<'s>(&self, lists: &'s [Vec<EdgeId>], node: NodeId) -> &'s [EdgeId] {
        if self.contains(node) {
            lists[node.index()].as_slice()
        } else {
            &[]
        }
    }
}

impl<N, E: Clone> DirectedGraph<N, E> {
    /// Merges single-successor/single-predecessor node pairs.
    ///
    /// Walks the live node set as it was when the call started. For each node `a`
    /// with exactly one outgoing edge whose target `b` has exactly one incoming
    /// edge, a new node `combine(a, b)` named `"{a}+{b}"` is added; it inherits the
    /// incoming edges of `a` and the outgoing edges of `b` (edge data is cloned), and
    /// both originals are removed. Nodes created during the call are not revisited,
    /// so a chain shrinks by at most half per call.
    ///
    /// # Arguments
    ///
    /// * `combine` - Builds the merged value from the `(a, b)` pair
    ///
    /// # Returns
    ///
    /// The number of pairs merged.
    ///
    /// # Errors
    ///
    /// Returns the first error of `combine`; pairs merged before it stay merged.
    pub fn condense<F>(&mut self, mut combine: F) -> Result<usize>
    where
        F: FnMut(&N, &N) -> Result<N>,
    {
        let snapshot: Vec<NodeId> = self.node_ids().collect();
        let mut merged = 0;

        for a in snapshot {
            if self.out_degree(a) != 1 {
                continue;
            }
            let Some(b) = self.successors(a).next() else {
                continue;
            };
            if b == a || self.in_degree(b) != 1 {
                continue;
            }

            let (Some(left), Some(right)) = (self.slot(a), self.slot(b)) else {
                continue;
            };
            let name = format!("{}+{}", left.name, right.name);
            let value = combine(&left.value, &right.value)?;

            let incoming: Vec<(NodeId, E)> = self
                .incoming_edges(a)
                .map(|(_, source, data)| (source, data.clone()))
                .collect();
            let outgoing: Vec<(NodeId, E)> = self
                .outgoing_edges(b)
                .map(|(_, target, data)| (target, data.clone()))
                .collect();

            let fused = self.add_node(name, value);
            for (source, data) in incoming {
                let source = if source == b { fused } else { source };
                self.add_edge(source, fused, data)?;
            }
            // b -> a was already carried over as an incoming edge of a
            for (target, data) in outgoing {
                if target != a {
                    self.add_edge(fused, target, data)?;
                }
            }

            self.remove_node(a);
            self.remove_node(b);
            merged += 1;
        }

        Ok(merged)
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Renders the graph in Graphviz DOT format.
    ///
    /// Nodes are emitted as boxes titled by their name, followed by `label(value)`.
    #[must_use]
    pub fn to_dot<L>(&self, title: &str, label: L) -> String
    where
        L: Fn(&N) -> String,
    {
        let mut out = format!("digraph \"{}\" {{\n", escape_dot(title));
        out.push_str("    node [shape=box, fontname=\"monospace\"];\n");
        for (id, slot) in self.nodes.iter().enumerate() {
            if let Some(node) = slot {
                let body = label(&node.value);
                out.push_str(&format!(
                    "    n{} [label=\"{}\\l{}\\l\"];\n",
                    id,
                    escape_dot(&node.name),
                    escape_dot(&body)
                ));
            }
        }
        for edge in self.edges.iter().flatten() {
            out.push_str(&format!(
                "    n{} -> n{};\n",
                edge.source.index(),
                edge.target.index()
            ));
        }
        out.push_str("}\n");
        out
    }
}

impl<N, E> GraphBase for DirectedGraph<N, E> {
    fn node_count(&self) -> usize {
        self.live_nodes
    }

    fn node_bound(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        DirectedGraph::node_ids(self)
    }
}

impl<N, E> Successors for DirectedGraph<N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::successors(self, node)
    }
}

impl<N, E> Predecessors for DirectedGraph<N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        DirectedGraph::predecessors(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two entrances (1, 0) feeding a diamond that drains into two exits (4, 5).
    fn make_graph() -> (DirectedGraph<i32, ()>, Vec<NodeId>) {
        let mut graph = DirectedGraph::new();
        let mut ids = vec![NodeId::new(0); 6];
        for value in [1, 2, 3, 4, 0, 5] {
            ids[value as usize] = graph.add_node(value.to_string(), value);
        }

        let edges = [(0, 2), (1, 2), (2, 4), (1, 3), (3, 4), (3, 5)];
        for (from, to) in edges {
            graph.add_edge(ids[from], ids[to], ()).unwrap();
        }

        (graph, ids)
    }

    fn values(graph: &DirectedGraph<i32, ()>, nodes: &[NodeId]) -> Vec<i32> {
        nodes.iter().map(|&n| *graph.node(n).unwrap()).collect()
    }

    #[test]
    fn test_entrances_and_exits() {
        let (graph, _) = make_graph();

        assert_eq!(values(&graph, &graph.entrances()), vec![1, 0]);
        assert_eq!(values(&graph, &graph.exits()), vec![4, 5]);
    }

    #[test]
    fn test_reachable_bfs_order() {
        let (graph, ids) = make_graph();

        let order = graph.reachable(ids[1]);
        assert_eq!(values(&graph, &order), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_add_edge_missing_node() {
        let mut graph: DirectedGraph<i32, ()> = DirectedGraph::new();
        let a = graph.add_node("a", 1);

        assert!(matches!(
            graph.add_edge(a, NodeId::new(9), ()),
            Err(Error::GraphError(_))
        ));
        assert!(graph.add_edge(NodeId::new(9), a, ()).is_err());
    }

    #[test]
    fn test_remove_node_severs_edges() {
        let (mut graph, ids) = make_graph();

        assert_eq!(graph.remove_node(ids[2]), Some(2));
        assert!(!graph.contains(ids[2]));
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.out_degree(ids[0]), 0);
        assert_eq!(graph.in_degree(ids[4]), 1);
        assert_eq!(graph.edge_count(), 3);

        // Identifiers of the remaining nodes are untouched
        assert_eq!(graph.node(ids[5]), Some(&5));
        assert_eq!(graph.remove_node(ids[2]), None);
    }

    #[test]
    fn test_unlink_keeps_node() {
        let (mut graph, ids) = make_graph();

        graph.unlink(ids[3]);
        assert!(graph.contains(ids[3]));
        assert_eq!(graph.in_degree(ids[3]), 0);
        assert_eq!(graph.out_degree(ids[3]), 0);
        assert_eq!(values(&graph, &graph.reachable(ids[1])), vec![1, 2, 4]);
    }

    #[test]
    fn test_condense_fork() {
        let mut graph: DirectedGraph<i32, ()> = DirectedGraph::new();
        let n1 = graph.add_node("1", 1);
        let n2 = graph.add_node("2", 2);
        let n3 = graph.add_node("3", 3);
        let n4 = graph.add_node("4", 4);
        graph.add_edge(n1, n2, ()).unwrap();
        graph.add_edge(n2, n3, ()).unwrap();
        graph.add_edge(n2, n4, ()).unwrap();

        let merged = graph.condense(|a, b| Ok(a + b)).unwrap();
        assert_eq!(merged, 1);
        assert_eq!(graph.node_count(), 3);

        let fused = graph.find("1+2").unwrap();
        assert_eq!(graph.node(fused), Some(&3));
        assert_eq!(graph.out_degree(fused), 2);
        assert_eq!(graph.entrances(), vec![fused]);
    }

    #[test]
    fn test_condense_does_not_revisit_new_nodes() {
        let mut graph: DirectedGraph<i32, ()> = DirectedGraph::new();
        let ids: Vec<NodeId> = (0..4).map(|i| graph.add_node(i.to_string(), i)).collect();
        for pair in ids.windows(2) {
            graph.add_edge(pair[0], pair[1], ()).unwrap();
        }

        assert_eq!(graph.condense(|a, b| Ok(a * 10 + b)).unwrap(), 2);
        assert_eq!(graph.node_count(), 2);

        assert_eq!(graph.condense(|a, b| Ok(a * 100 + b)).unwrap(), 1);
        assert_eq!(graph.node_count(), 1);
        let last = graph.node_ids().next().unwrap();
        assert_eq!(graph.node(last), Some(&123));
        assert_eq!(graph.name(last), Some("0+1+2+3"));
    }

    #[test]
    fn test_condense_keeps_parallel_edges() {
        let mut graph: DirectedGraph<&str, &str> = DirectedGraph::new();
        let a = graph.add_node("a", "a");
        let b = graph.add_node("b", "b");
        graph.add_edge(a, b, "jump").unwrap();
        graph.add_edge(a, b, "fallthrough").unwrap();

        assert_eq!(graph.condense(|x, _| Ok(*x)).unwrap(), 0);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_condense_two_node_cycle_keeps_single_loop() {
        let mut graph: DirectedGraph<i32, ()> = DirectedGraph::new();
        let a = graph.add_node("a", 1);
        let b = graph.add_node("b", 2);
        graph.add_edge(a, b, ()).unwrap();
        graph.add_edge(b, a, ()).unwrap();

        assert_eq!(graph.condense(|x, y| Ok(x + y)).unwrap(), 1);
        let fused = graph.find("a+b").unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.successors(fused).collect::<Vec<_>>(), vec![fused]);
    }

    #[test]
    fn test_condense_propagates_combine_error() {
        let mut graph: DirectedGraph<i32, ()> = DirectedGraph::new();
        let a = graph.add_node("a", 1);
        let b = graph.add_node("b", 2);
        graph.add_edge(a, b, ()).unwrap();

        let result = graph.condense(|_, _| Err(Error::GraphError("refused".to_string())));
        assert!(result.is_err());
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_to_dot() {
        let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
        let a = graph.add_node("Block_0", "ReturnVoidTac");
        let b = graph.add_node("Block_1", "NopTac");
        graph.add_edge(a, b, ()).unwrap();

        let dot = graph.to_dot("main", |v| (*v).to_string());
        assert!(dot.starts_with("digraph \"main\" {"));
        assert!(dot.contains("n0 [label=\"Block_0\\lReturnVoidTac\\l\"];"));
        assert!(dot.contains("n0 -> n1;"));
    }
}
