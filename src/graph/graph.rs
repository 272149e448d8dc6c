//! Runtime action graph.
//!
//! Nodes and their dependency edges live in a directed graph (petgraph); a
//! node-id index map gives O(1) lookup and parent deduplication instead of
//! scanning edge lists.

use std::collections::{HashMap, HashSet};

use petgraph::{
    Direction,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use tracing::warn;

use crate::{
    Error, Result, ShareLock,
    common::Vars,
    graph::{
        edge::DependencyEdge,
        node::{ActionNode, NodeId, NodeState},
    },
};

struct GraphInner {
    /// Edges point `child → parent`, in dependency direction.
    graph: DiGraph<ActionNode, DependencyEdge>,
    index: HashMap<NodeId, NodeIndex>,
}

/// Thread-safe graph of action nodes and dependency edges.
///
/// The graph exclusively owns its nodes; edge endpoints are indices, so a
/// parent's lifetime is managed here rather than by its children.
#[derive(Clone)]
pub struct ActionGraph {
    inner: ShareLock<GraphInner>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self {
            inner: ShareLock::new(
                GraphInner {
                    graph: DiGraph::new(),
                    index: HashMap::new(),
                }
                .into(),
            ),
        }
    }

    /// Add a node to the graph. Node ids must be unique.
    pub fn add_node(
        &self,
        node: ActionNode,
    ) -> Result<NodeId> {
        let mut inner = self.inner.write().unwrap();
        if inner.index.contains_key(&node.id) {
            return Err(Error::Graph(format!("node '{}' already exists", node.id)));
        }
        let nid = node.id.clone();
        let node_idx = inner.graph.add_node(node);
        inner.index.insert(nid.clone(), node_idx);
        Ok(nid)
    }

    /// Declare that `parameter` of `child` is produced by `parent`.
    ///
    /// A self dependency is logged and ignored. A parameter holds at most
    /// one edge: re-declaring replaces the previous edge.
    pub fn connect(
        &self,
        child: &str,
        parameter: &str,
        parent: &str,
        file: &str,
    ) -> Result<()> {
        if child == parent {
            warn!("ignoring self dependency on node '{}' for parameter '{}'", child, parameter);
            return Ok(());
        }

        let mut inner = self.inner.write().unwrap();
        let child_idx = *inner.index.get(child).ok_or(Error::Graph(format!("node '{}' not found", child)))?;
        let parent_idx = *inner.index.get(parent).ok_or(Error::Graph(format!("node '{}' not found", parent)))?;

        if inner.graph[child_idx].spec(parameter).is_none() {
            return Err(Error::Graph(format!("node '{}' declares no parameter '{}'", child, parameter)));
        }

        // last-writer-wins per parameter
        let previous = inner.graph.edges_directed(child_idx, Direction::Outgoing).find(|e| e.weight().parameter == parameter).map(|e| e.id());
        if let Some(edge_idx) = previous {
            inner.graph.remove_edge(edge_idx);
        }

        inner.graph.add_edge(child_idx, parent_idx, DependencyEdge::new(parameter, file));
        Ok(())
    }

    /// Dependency edges of a node with their parent ids, in declaration order.
    pub fn dependencies(
        &self,
        nid: &str,
    ) -> Vec<(DependencyEdge, NodeId)> {
        let inner = self.inner.read().unwrap();
        let Some(&node_idx) = inner.index.get(nid) else {
            return Vec::new();
        };
        // petgraph walks outgoing edges most-recent-first
        let mut edges: Vec<(DependencyEdge, NodeId)> = inner.graph.edges_directed(node_idx, Direction::Outgoing).map(|e| (e.weight().clone(), inner.graph[e.target()].id.clone())).collect();
        edges.reverse();
        edges
    }

    /// Distinct parents of a node, deduplicated by identity, first
    /// declaration first.
    pub fn distinct_parents(
        &self,
        nid: &str,
    ) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.dependencies(nid).into_iter().map(|(_, parent)| parent).filter(|parent| seen.insert(parent.clone())).collect()
    }

    /// Get a snapshot of a node by id.
    pub fn get(
        &self,
        nid: &str,
    ) -> Option<ActionNode> {
        let inner = self.inner.read().unwrap();
        inner.index.get(nid).map(|idx| inner.graph[*idx].clone())
    }

    pub fn contains(
        &self,
        nid: &str,
    ) -> bool {
        self.inner.read().unwrap().index.contains_key(nid)
    }

    /// All node ids currently in the graph.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let inner = self.inner.read().unwrap();
        inner.graph.node_indices().map(|idx| inner.graph[idx].id.clone()).collect()
    }

    /// Current state of a node.
    pub fn state(
        &self,
        nid: &str,
    ) -> Option<NodeState> {
        self.get(nid).map(|n| n.state)
    }

    pub fn set_state(
        &self,
        nid: &str,
        state: NodeState,
    ) -> Result<()> {
        self.with_node_mut(nid, |node| node.state = state)
    }

    /// Set a locally entered value for a declared parameter.
    pub fn set_value(
        &self,
        nid: &str,
        parameter: &str,
        value: &str,
    ) -> Result<()> {
        let declared = self.get(nid).ok_or(Error::Graph(format!("node '{}' not found", nid)))?.spec(parameter).is_some();
        if !declared {
            return Err(Error::Graph(format!("node '{}' declares no parameter '{}'", nid, parameter)));
        }
        self.with_node_mut(nid, |node| node.values.set(parameter, value))
    }

    /// Attach externally provided parameters.
    ///
    /// An `output_directory` entry doubles as the node's base directory,
    /// matching descriptors saved by prior runs.
    pub fn set_provided(
        &self,
        nid: &str,
        parameters: Vars,
    ) -> Result<()> {
        self.with_node_mut(nid, |node| {
            if let Some(directory) = parameters.get_str("output_directory") {
                node.output_base_directory = Some(directory);
            }
            node.provided = Some(parameters);
        })
    }

    /// Attach parameters recovered from a cache descriptor.
    pub fn set_loaded(
        &self,
        nid: &str,
        parameters: Vars,
    ) -> Result<()> {
        self.with_node_mut(nid, |node| node.loaded = Some(parameters))
    }

    pub fn set_output_base_directory(
        &self,
        nid: &str,
        directory: &str,
    ) -> Result<()> {
        self.with_node_mut(nid, |node| node.output_base_directory = Some(directory.to_string()))
    }

    pub fn set_output_subdirectory(
        &self,
        nid: &str,
        subdirectory: &str,
    ) -> Result<()> {
        self.with_node_mut(nid, |node| node.output_subdirectory = Some(subdirectory.to_string()))
    }

    /// Base output directory of a node, unresolved.
    pub fn output_base_directory(
        &self,
        nid: &str,
    ) -> Option<String> {
        self.get(nid).and_then(|n| n.output_base_directory)
    }

    /// Resolved output directory (base + subdirectory, trailing separator).
    pub fn output_directory(
        &self,
        nid: &str,
    ) -> Option<String> {
        self.get(nid).and_then(|n| n.output_directory())
    }

    fn with_node_mut<R>(
        &self,
        nid: &str,
        f: impl FnOnce(&mut ActionNode) -> R,
    ) -> Result<R> {
        let mut inner = self.inner.write().unwrap();
        let node_idx = *inner.index.get(nid).ok_or(Error::Graph(format!("node '{}' not found", nid)))?;
        Ok(f(&mut inner.graph[node_idx]))
    }
}

impl Default for ActionGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionTemplate, ParameterKind, ParameterSpec};

    fn add_test_node(
        graph: &ActionGraph,
        id: &str,
        parameters: &[&str],
    ) {
        let template = ActionTemplate {
            name: format!("{}_action", id),
            parameters: parameters
                .iter()
                .map(|name| ParameterSpec {
                    name: name.to_string(),
                    kind: ParameterKind::File,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        graph.add_node(ActionNode::from_template(id, &template)).unwrap();
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "a", &[]);
        let template = ActionTemplate {
            name: "other".to_string(),
            ..Default::default()
        };
        assert!(graph.add_node(ActionNode::from_template("a", &template)).is_err());
    }

    #[test]
    fn test_self_dependency_is_ignored() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "a", &["input"]);

        graph.connect("a", "input", "a", "out.mhd").unwrap();
        assert!(graph.dependencies("a").is_empty());
        assert!(graph.distinct_parents("a").is_empty());
    }

    #[test]
    fn test_connect_requires_declared_parameter() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "a", &[]);
        add_test_node(&graph, "b", &["input"]);

        assert!(graph.connect("b", "unknown", "a", "out.mhd").is_err());
        assert!(graph.connect("b", "input", "missing", "out.mhd").is_err());
        graph.connect("b", "input", "a", "out.mhd").unwrap();
        assert_eq!(graph.dependencies("b").len(), 1);
    }

    #[test]
    fn test_last_writer_wins_per_parameter() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "a", &[]);
        add_test_node(&graph, "b", &[]);
        add_test_node(&graph, "c", &["input"]);

        graph.connect("c", "input", "a", "first.mhd").unwrap();
        graph.connect("c", "input", "b", "second.mhd").unwrap();

        let deps = graph.dependencies("c");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].0.file, "second.mhd");
        assert_eq!(deps[0].1, "b");
    }

    #[test]
    fn test_distinct_parents_order_and_dedup() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "p1", &[]);
        add_test_node(&graph, "p2", &[]);
        add_test_node(&graph, "c", &["first", "second", "third"]);

        graph.connect("c", "first", "p1", "a.mhd").unwrap();
        graph.connect("c", "second", "p2", "b.mhd").unwrap();
        graph.connect("c", "third", "p1", "c.mhd").unwrap();

        let deps = graph.dependencies("c");
        assert_eq!(deps.iter().map(|(e, _)| e.parameter.as_str()).collect::<Vec<_>>(), vec!["first", "second", "third"]);
        assert_eq!(graph.distinct_parents("c"), vec!["p1".to_string(), "p2".to_string()]);
    }

    #[test]
    fn test_state_transitions() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "a", &[]);

        assert_eq!(graph.state("a").unwrap(), NodeState::Idle);
        graph.set_state("a", NodeState::Dispatching).unwrap();
        assert_eq!(graph.state("a").unwrap(), NodeState::Dispatching);
        assert!(graph.state("missing").is_none());
    }

    #[test]
    fn test_provided_parameters_supply_output_directory() {
        let graph = ActionGraph::new();
        add_test_node(&graph, "a", &["input"]);

        let mut provided = Vars::new();
        provided.set("input", "volume.mhd");
        provided.set("output_directory", "out/a");
        graph.set_provided("a", provided).unwrap();

        assert_eq!(graph.output_base_directory("a").as_deref(), Some("out/a"));
        assert_eq!(graph.output_directory("a").as_deref(), Some("out/a/"));
        assert!(graph.get("a").unwrap().is_provided("input"));
    }
}
