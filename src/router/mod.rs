//! # Router Module
//!
//! Shortest-path routing between instruments. Nodes are token symbols (plus synthetic
//! targets such as `"BEAN:SILO"`); edges are step factories that become concrete
//! generators once an account and transfer modes are bound.
//!
//! Every edge costs the same, so the shortest path is found with a breadth-first
//! search. Neighbours are visited in edge declaration order, which makes ties resolve
//! deterministically.

pub mod graph;

pub use graph::{build_swap_graph, silo_node, transfer_self_edge, PoolEdge};

use ethers::types::Address;
use indexmap::{IndexMap, IndexSet};
use log::{debug, info};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use crate::farm::{FarmFromMode, FarmToMode};
use crate::metrics;
use crate::workflow::StepGenerator;

/// Builds the generator for one hop once the account and transfer modes are known.
pub type StepFactory = Arc<dyn Fn(Address, FarmFromMode, FarmToMode) -> StepGenerator + Send + Sync>;

/// Builds the self-edge for an instrument routed to itself.
pub type SelfEdgeFactory = Arc<dyn Fn(&str) -> RouterResult + Send + Sync>;

/// One hop of a route.
#[derive(Clone)]
pub struct RouterResult {
    pub from: String,
    pub to: String,
    step: StepFactory,
}

impl RouterResult {
    pub fn new<F>(from: impl Into<String>, to: impl Into<String>, step: F) -> Self
    where
        F: Fn(Address, FarmFromMode, FarmToMode) -> StepGenerator + Send + Sync + 'static,
    {
        Self {
            from: from.into(),
            to: to.into(),
            step: Arc::new(step),
        }
    }

    pub fn step(&self, account: Address, from_mode: FarmFromMode, to_mode: FarmToMode) -> StepGenerator {
        (self.step)(account, from_mode, to_mode)
    }

    pub fn is_self_edge(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Debug for RouterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

/// Immutable directed graph over instrument symbols.
#[derive(Clone, Default)]
pub struct Graph {
    nodes: IndexSet<String>,
    edges: IndexMap<String, IndexMap<String, RouterResult>>,
}

impl Graph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn has_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&RouterResult> {
        self.edges.get(from).and_then(|targets| targets.get(to))
    }

    pub fn neighbours(&self, node: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(node)
            .into_iter()
            .flat_map(|targets| targets.keys().map(String::as_str))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexMap::len).sum()
    }

    /// Node sequence of a shortest path, `source` and `destination` included.
    pub fn shortest_path(&self, source: &str, destination: &str) -> Option<Vec<String>> {
        if !self.has_node(source) || !self.has_node(destination) {
            return None;
        }

        let mut previous: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([source]);
        let mut reached = source == destination;

        while let Some(node) = queue.pop_front() {
            if reached {
                break;
            }
            for next in self.neighbours(node) {
                if next == source || previous.contains_key(next) {
                    continue;
                }
                previous.insert(next, node);
                if next == destination {
                    reached = true;
                    break;
                }
                queue.push_back(next);
            }
        }

        if !reached {
            return None;
        }

        let mut path = vec![destination.to_string()];
        let mut cursor = destination;
        while cursor != source {
            cursor = previous.get(cursor).copied()?;
            path.push(cursor.to_string());
        }
        path.reverse();
        Some(path)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes)
            .field("edges", &self.edge_count())
            .finish()
    }
}

/// Collects the whitelist and the hand-authored edges, then freezes them into a [`Graph`].
#[derive(Default)]
pub struct GraphBuilder {
    graph: Graph,
}

impl GraphBuilder {
    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.graph.nodes.insert(node.into());
        self
    }

    pub fn nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in nodes {
            self.graph.nodes.insert(node.into());
        }
        self
    }

    /// Adds a directed edge. Unknown endpoints are added as nodes. A second edge
    /// between the same pair replaces the first.
    pub fn edge<F>(mut self, from: impl Into<String>, to: impl Into<String>, step: F) -> Self
    where
        F: Fn(Address, FarmFromMode, FarmToMode) -> StepGenerator + Send + Sync + 'static,
    {
        let result = RouterResult::new(from, to, step);
        self.graph.nodes.insert(result.from.clone());
        self.graph.nodes.insert(result.to.clone());
        self.graph
            .edges
            .entry(result.from.clone())
            .or_default()
            .insert(result.to.clone(), result);
        self
    }

    /// Adds `a -> b` and `b -> a`.
    pub fn bidirectional<F, G>(self, a: impl Into<String>, b: impl Into<String>, forward: F, backward: G) -> Self
    where
        F: Fn(Address, FarmFromMode, FarmToMode) -> StepGenerator + Send + Sync + 'static,
        G: Fn(Address, FarmFromMode, FarmToMode) -> StepGenerator + Send + Sync + 'static,
    {
        let a = a.into();
        let b = b.into();
        self.edge(a.clone(), b.clone(), forward).edge(b, a, backward)
    }

    pub fn build(self) -> Graph {
        debug!(
            "Built routing graph: {} nodes, {} edges",
            self.graph.nodes.len(),
            self.graph.edge_count()
        );
        self.graph
    }
}

/// Resolves routes over a fixed graph. Read-only after construction; share it behind
/// an `Arc` across concurrent lookups.
#[derive(Clone)]
pub struct Router {
    graph: Graph,
    self_edge: SelfEdgeFactory,
}

impl Router {
    pub fn new<F>(graph: Graph, self_edge: F) -> Self
    where
        F: Fn(&str) -> RouterResult + Send + Sync + 'static,
    {
        Self {
            graph,
            self_edge: Arc::new(self_edge),
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Ordered hops from `source` to `destination`.
    ///
    /// - one self-edge: `source == destination`. Checked before node membership, so an
    ///   instrument that is not in the graph still gets exactly one self-edge from the
    ///   self-edge factory.
    /// - empty: no route, or either endpoint is not a graph node
    /// - otherwise: the graph edges along a shortest path
    pub fn find_path(&self, source: &str, destination: &str) -> Vec<RouterResult> {
        if source == destination {
            metrics::increment_route_lookup("self");
            debug!("Route {} -> {}: self-edge", source, destination);
            return vec![(self.self_edge)(source)];
        }

        let Some(path) = self.graph.shortest_path(source, destination) else {
            metrics::increment_route_lookup("unreachable");
            info!("⚠️ No route from {} to {}", source, destination);
            return Vec::new();
        };

        let mut hops = Vec::with_capacity(path.len() - 1);
        for pair in path.windows(2) {
            match self.graph.edge(&pair[0], &pair[1]) {
                Some(edge) => hops.push(edge.clone()),
                None => {
                    metrics::increment_route_lookup("unreachable");
                    return Vec::new();
                }
            }
        }

        metrics::increment_route_lookup("path");
        info!("🧭 Route {} -> {}: {}", source, destination, path.join(" -> "));
        hops
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("graph", &self.graph).finish()
    }
}
