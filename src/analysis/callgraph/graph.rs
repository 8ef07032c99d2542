//! Call graph construction and traversal.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    fmt::Write,
    sync::Arc,
};

use bitflags::bitflags;

use crate::{
    ir::{MarkOp, Tac},
    program::Program,
    symbols::FunctionSymbol,
    utils::{
        escape_dot,
        graph::{
            algorithms::{dfs, postorder},
            DirectedGraph, NodeId,
        },
    },
};

bitflags! {
    /// How a caller reaches a callee.
    ///
    /// An edge may carry both flags when the same callee is called once at runtime
    /// and once at build time.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct CallFlags: u8 {
        /// Called when the compiled program runs.
        const RUNTIME = 0x01;
        /// Called during compilation.
        const BUILD = 0x02;
    }
}

/// Caller to callee edges of a whole program.
///
/// Nodes are the source functions of the program plus every builtin that is
/// actually called. A `BuildMark(Start)` counts as a build call of the region
/// function it names.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    graph: DirectedGraph<Arc<FunctionSymbol>, CallFlags>,
    by_name: HashMap<String, NodeId>,
}

impl CallGraph {
    /// Scans every source function of `program` for calls.
    #[must_use]
    pub fn build(program: &Program) -> Self {
        let mut call_graph = CallGraph::default();

        for function in program.functions() {
            call_graph.insert(&function.symbol);
        }

        for function in program.functions() {
            let caller = call_graph.insert(&function.symbol);
            for tac in function.tacs.tacs() {
                match tac {
                    Tac::Call {
                        function: callee,
                        is_build,
                        ..
                    } => {
                        let flags = if *is_build || callee.is_build {
                            CallFlags::BUILD
                        } else {
                            CallFlags::RUNTIME
                        };
                        let target = call_graph.insert(callee);
                        call_graph.connect(caller, target, flags);
                    }
                    Tac::MultiCall {
                        function: callee, ..
                    } => {
                        let target = call_graph.insert(callee);
                        call_graph.connect(caller, target, CallFlags::RUNTIME);
                    }
                    Tac::BuildMark {
                        name,
                        op: MarkOp::Start,
                    } => {
                        if let Some(region) = program.find_function(name) {
                            let target = call_graph.insert(&region);
                            call_graph.connect(caller, target, CallFlags::BUILD);
                        }
                    }
                    _ => {}
                }
            }
        }

        call_graph
    }

    fn insert(&mut self, function: &Arc<FunctionSymbol>) -> NodeId {
        if let Some(node) = self.by_name.get(&function.name) {
            return *node;
        }
        let node = self.graph.add_node(function.name.clone(), function.clone());
        self.by_name.insert(function.name.clone(), node);
        node
    }

    fn connect(&mut self, caller: NodeId, callee: NodeId, flags: CallFlags) {
        let existing = self
            .graph
            .outgoing_edges(caller)
            .find(|(_, target, _)| *target == callee)
            .map(|(edge, _, _)| edge);

        match existing {
            Some(edge) => {
                if let Some(data) = self.graph.edge_mut(edge) {
                    *data |= flags;
                }
            }
            None => {
                // Both endpoints are live nodes.
                let _ = self.graph.add_edge(caller, callee, flags);
            }
        }
    }

    /// Returns the underlying graph.
    #[must_use]
    pub fn graph(&self) -> &DirectedGraph<Arc<FunctionSymbol>, CallFlags> {
        &self.graph
    }

    /// Returns the number of functions in the graph.
    #[must_use]
    pub fn function_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of distinct caller/callee pairs.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the node of the function called `name`.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the function symbol behind `node`.
    #[must_use]
    pub fn function(&self, node: NodeId) -> Option<&Arc<FunctionSymbol>> {
        self.graph.node(node)
    }

    /// Returns the callees of `caller` with the flags of each edge.
    #[must_use]
    pub fn callees(&self, caller: &str) -> Vec<(Arc<FunctionSymbol>, CallFlags)> {
        let Some(node) = self.node(caller) else {
            return Vec::new();
        };
        self.graph
            .outgoing_edges(node)
            .filter_map(|(_, target, flags)| self.graph.node(target).map(|f| (f.clone(), *flags)))
            .collect()
    }

    /// Returns the callers of `callee`.
    #[must_use]
    pub fn callers(&self, callee: &str) -> Vec<Arc<FunctionSymbol>> {
        let Some(node) = self.node(callee) else {
            return Vec::new();
        };
        self.graph
            .predecessors(node)
            .filter_map(|source| self.graph.node(source).cloned())
            .collect()
    }

    /// Returns the flags on the edge from `caller` to `callee`.
    #[must_use]
    pub fn flags(&self, caller: &str, callee: &str) -> Option<CallFlags> {
        let (source, target) = (self.node(caller)?, self.node(callee)?);
        self.graph
            .outgoing_edges(source)
            .find(|(_, t, _)| *t == target)
            .map(|(_, _, flags)| *flags)
    }

    /// Returns the functions reachable from `start`, callees before callers.
    ///
    /// Each function appears once; recursion is cut at the first revisit.
    #[must_use]
    pub fn post_order(&self, start: &str) -> Vec<Arc<FunctionSymbol>> {
        let Some(node) = self.node(start) else {
            return Vec::new();
        };
        self.symbols(postorder(&self.graph, node))
    }

    /// Returns the functions reachable from `start`, callers before callees.
    ///
    /// Each function appears once, in depth-first pre-order.
    #[must_use]
    pub fn in_order(&self, start: &str) -> Vec<Arc<FunctionSymbol>> {
        let Some(node) = self.node(start) else {
            return Vec::new();
        };
        self.symbols(dfs(&self.graph, node).collect())
    }

    /// Returns the names of the source functions in [`CallGraph::in_order`],
    /// leaving out builtins.
    #[must_use]
    pub fn in_order_functions(&self, start: &str) -> Vec<String> {
        self.in_order(start)
            .into_iter()
            .filter(|f| !f.is_builtin())
            .map(|f| f.name.clone())
            .collect()
    }

    /// Returns every function that `start` reaches through at least one build edge.
    ///
    /// A build edge taints its callee, and everything the callee reaches is tainted
    /// too, whatever the flags of the later edges. The result is in breadth-first
    /// discovery order, each function once.
    #[must_use]
    pub fn build_tainted(&self, start: &str) -> Vec<Arc<FunctionSymbol>> {
        let Some(node) = self.node(start) else {
            return Vec::new();
        };

        let mut seen: HashSet<(NodeId, bool)> = HashSet::new();
        let mut queue: VecDeque<(NodeId, bool)> = VecDeque::new();
        let mut tainted: Vec<NodeId> = Vec::new();
        seen.insert((node, false));
        queue.push_back((node, false));

        while let Some((current, is_tainted)) = queue.pop_front() {
            for (_, target, flags) in self.graph.outgoing_edges(current) {
                let next = is_tainted || flags.contains(CallFlags::BUILD);
                if next && !tainted.contains(&target) {
                    tainted.push(target);
                }
                if seen.insert((target, next)) {
                    queue.push_back((target, next));
                }
            }
        }

        self.symbols(tainted)
    }

    fn symbols(&self, nodes: Vec<NodeId>) -> Vec<Arc<FunctionSymbol>> {
        nodes
            .into_iter()
            .filter_map(|n| self.graph.node(n).cloned())
            .collect()
    }

    /// Renders the call graph in DOT format.
    ///
    /// Build-time functions are filled, build edges are drawn dashed and red.
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::from("digraph CallGraph {\n");
        let _ = writeln!(
            dot,
            "    label=\"{}\";",
            escape_dot(title.unwrap_or("Call Graph"))
        );
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for (id, function) in self.graph.nodes() {
            let style = if function.is_build {
                ", style=filled, fillcolor=lightyellow"
            } else if function.is_builtin() {
                ", style=filled, fillcolor=lightblue"
            } else {
                ""
            };
            let _ = writeln!(
                dot,
                "    {id} [label=\"{}\"{style}];",
                escape_dot(&function.to_string())
            );
        }

        dot.push('\n');
        for (edge, flags) in self.graph.edges() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                let style = if flags.contains(CallFlags::BUILD) {
                    " [style=dashed, color=red]"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        symbols::{FunctionSymbol, TypeSymbol},
        test::Fixture,
    };

    fn call(function: &Arc<FunctionSymbol>, is_build: bool) -> Tac {
        Tac::Call {
            result: None,
            function: function.clone(),
            arguments: vec![],
            is_build,
        }
    }

    /// main -build-> gen -> helper, main -> run -> helper
    fn program() -> Fixture {
        let mut f = Fixture::new("main");
        let (generator, _) = f.declare(FunctionSymbol::new("gen", TypeSymbol::VOID, vec![], false));
        let (run, _) = f.declare(FunctionSymbol::new("run", TypeSymbol::VOID, vec![], false));
        let (helper, _) =
            f.declare(FunctionSymbol::new("helper", TypeSymbol::VOID, vec![], false));

        f.push(call(&generator, true));
        f.push(call(&run, false));
        f.push(call(&run, false));
        f.push_to("gen", call(&helper, false));
        f.push_to("run", call(&helper, false));
        f
    }

    #[test]
    fn test_edges_and_flags() {
        let f = program();
        let graph = CallGraph::build(&f.program);

        assert_eq!(graph.function_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.flags("main", "gen"), Some(CallFlags::BUILD));
        assert_eq!(graph.flags("main", "run"), Some(CallFlags::RUNTIME));
        assert_eq!(graph.callees("main").len(), 2);
        assert_eq!(graph.callers("helper").len(), 2);
    }

    #[test]
    fn test_repeated_calls_merge_flags() {
        let mut f = Fixture::new("main");
        let (generator, _) = f.declare(FunctionSymbol::new("gen", TypeSymbol::VOID, vec![], false));
        f.push(call(&generator, true));
        f.push(call(&generator, false));

        let graph = CallGraph::build(&f.program);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.flags("main", "gen"),
            Some(CallFlags::BUILD | CallFlags::RUNTIME)
        );
    }

    #[test]
    fn test_traversal_orders() {
        let f = program();
        let graph = CallGraph::build(&f.program);

        let post: Vec<String> = graph
            .post_order("main")
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(post.last().map(String::as_str), Some("main"));
        let helper = post.iter().position(|n| n == "helper").unwrap();
        let generator = post.iter().position(|n| n == "gen").unwrap();
        assert!(helper < generator);

        let pre = graph.in_order_functions("main");
        assert_eq!(pre.first().map(String::as_str), Some("main"));
        assert_eq!(pre.len(), 4);
    }

    #[test]
    fn test_build_taint_is_transitive() {
        let f = program();
        let graph = CallGraph::build(&f.program);

        let tainted: Vec<String> = graph
            .build_tainted("main")
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(tainted, vec!["gen".to_string(), "helper".to_string()]);
        assert!(graph.build_tainted("run").is_empty());
    }

    #[test]
    fn test_dot_marks_build_edges() {
        let f = program();
        let dot = CallGraph::build(&f.program).to_dot(None);
        assert!(dot.contains("Call Graph"));
        assert!(dot.contains("color=red"));
    }
}
