//! Lineage Graph
//!
//! The read-only DAG of content nodes and transforms for one project.
//!
//! Content nodes and transforms share a single `petgraph::DiGraph` arena.
//! Edges always alternate: an input edge runs content → transform, an output
//! edge runs transform → content. Every lookup by id goes through an index
//! keyed by [`NodeRef`], so content and transform ids never collide.
//!
//! A `LineageGraph` is only produced by [`crate::builder::GraphBuilder`] and
//! has no mutation methods.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;

use crate::error::IntegrityWarning;
use crate::schema::{ContentNode, EdgeKind, EditDescriptor, SchemaType, TransformNode};

// ============================================================================
// Node References
// ============================================================================

/// Namespaced node id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Content(String),
    Transform(String),
}

impl NodeRef {
    pub fn content(id: impl Into<String>) -> Self {
        NodeRef::Content(id.into())
    }

    pub fn transform(id: impl Into<String>) -> Self {
        NodeRef::Transform(id.into())
    }

    /// The bare id without namespace
    pub fn id(&self) -> &str {
        match self {
            NodeRef::Content(id) | NodeRef::Transform(id) => id,
        }
    }

    pub fn is_content(&self) -> bool {
        matches!(self, NodeRef::Content(_))
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Content(id) => write!(f, "content:{id}"),
            NodeRef::Transform(id) => write!(f, "transform:{id}"),
        }
    }
}

// ============================================================================
// Node and Edge Weights
// ============================================================================

/// Node weight stored in the arena.
#[derive(Debug, Clone, PartialEq)]
pub enum LineageNode {
    Content(ContentNode),
    Transform(TransformNode),
}

impl LineageNode {
    pub fn node_ref(&self) -> NodeRef {
        match self {
            LineageNode::Content(node) => NodeRef::Content(node.id.clone()),
            LineageNode::Transform(node) => NodeRef::Transform(node.id.clone()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            LineageNode::Content(node) => &node.id,
            LineageNode::Transform(node) => &node.id,
        }
    }

    pub fn as_content(&self) -> Option<&ContentNode> {
        match self {
            LineageNode::Content(node) => Some(node),
            LineageNode::Transform(_) => None,
        }
    }

    pub fn as_transform(&self) -> Option<&TransformNode> {
        match self {
            LineageNode::Transform(node) => Some(node),
            LineageNode::Content(_) => None,
        }
    }
}

/// Edge weight stored in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    /// Whether the edge came from the input or output list
    pub kind: EdgeKind,
    /// Role label from the edge record
    pub role: String,
}

// ============================================================================
// Statistics
// ============================================================================

/// Summary counts for a built graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub content_nodes: usize,
    pub transforms: usize,
    pub edges: usize,
    pub roots: usize,
    pub warnings: usize,
    /// Content node count per schema tag
    pub by_schema: BTreeMap<String, usize>,
}

// ============================================================================
// LineageGraph
// ============================================================================

/// Immutable, validated lineage graph for a project snapshot.
#[derive(Debug, Clone)]
pub struct LineageGraph {
    /// The underlying petgraph arena
    graph: DiGraph<LineageNode, EdgeData>,

    /// Map from namespaced id to arena index for O(1) lookup
    index: HashMap<NodeRef, NodeIndex>,

    /// Content node ids per schema type
    schema_index: BTreeMap<SchemaType, BTreeSet<String>>,

    /// Producing transform id per content node id
    producers: HashMap<String, String>,

    /// Accepted annotations per human transform id
    annotations: HashMap<String, Vec<EditDescriptor>>,

    /// Topological position per arena index
    topo_rank: Vec<usize>,

    /// Arena indices, upstream first
    topo_order: Vec<NodeIndex>,

    /// Whether some root lies upstream of (or is) the node, per arena index
    rooted: Vec<bool>,

    /// Integrity warnings recorded during construction
    warnings: Vec<IntegrityWarning>,
}

/// Pieces assembled by the builder.
pub(crate) struct GraphParts {
    pub graph: DiGraph<LineageNode, EdgeData>,
    pub index: HashMap<NodeRef, NodeIndex>,
    pub producers: HashMap<String, String>,
    pub annotations: HashMap<String, Vec<EditDescriptor>>,
    pub topo_order: Vec<NodeIndex>,
    pub warnings: Vec<IntegrityWarning>,
}

impl LineageGraph {
    pub(crate) fn from_parts(parts: GraphParts) -> Self {
        let GraphParts {
            graph,
            index,
            producers,
            annotations,
            topo_order,
            warnings,
        } = parts;

        let mut topo_rank = vec![0; graph.node_count()];
        let mut rooted = vec![false; graph.node_count()];
        for (rank, &idx) in topo_order.iter().enumerate() {
            topo_rank[idx.index()] = rank;
            let mut parents = graph.neighbors_directed(idx, Direction::Incoming).peekable();
            let reached = match graph[idx] {
                LineageNode::Content(_) if parents.peek().is_none() => true,
                _ => parents.any(|parent| rooted[parent.index()]),
            };
            rooted[idx.index()] = reached;
        }

        let mut schema_index: BTreeMap<SchemaType, BTreeSet<String>> = BTreeMap::new();
        for node in graph.node_weights().filter_map(LineageNode::as_content) {
            schema_index
                .entry(node.schema_type.clone())
                .or_default()
                .insert(node.id.clone());
        }

        Self {
            graph,
            index,
            schema_index,
            producers,
            annotations,
            topo_rank,
            topo_order,
            rooted,
            warnings,
        }
    }

    // ------------------------------------------------------------------------
    // Node Lookup
    // ------------------------------------------------------------------------

    /// Get any node by its namespaced id
    pub fn node(&self, node_ref: &NodeRef) -> Option<&LineageNode> {
        self.index
            .get(node_ref)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Get a content node by id
    pub fn content(&self, id: &str) -> Option<&ContentNode> {
        self.node(&NodeRef::content(id))
            .and_then(LineageNode::as_content)
    }

    /// Get a transform by id
    pub fn transform(&self, id: &str) -> Option<&TransformNode> {
        self.node(&NodeRef::transform(id))
            .and_then(LineageNode::as_transform)
    }

    pub fn contains_content(&self, id: &str) -> bool {
        self.index.contains_key(&NodeRef::content(id))
    }

    /// Iterate over all content nodes in id order
    pub fn content_nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.graph.node_weights().filter_map(LineageNode::as_content)
    }

    /// Iterate over all transforms in id order
    pub fn transforms(&self) -> impl Iterator<Item = &TransformNode> {
        self.graph
            .node_weights()
            .filter_map(LineageNode::as_transform)
    }

    pub fn content_count(&self) -> usize {
        self.content_nodes().count()
    }

    pub fn transform_count(&self) -> usize {
        self.transforms().count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Content node ids carrying the given schema type, in id order
    pub fn content_ids_by_schema(&self, schema: &SchemaType) -> impl Iterator<Item = &str> {
        self.schema_index
            .get(schema)
            .into_iter()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }

    // ------------------------------------------------------------------------
    // Neighbors
    // ------------------------------------------------------------------------

    /// Ids reachable over one outgoing edge, sorted
    pub fn forward_neighbors(&self, node_ref: &NodeRef) -> Vec<NodeRef> {
        self.neighbors(node_ref, Direction::Outgoing)
    }

    /// Ids reachable over one incoming edge, sorted
    pub fn backward_neighbors(&self, node_ref: &NodeRef) -> Vec<NodeRef> {
        self.neighbors(node_ref, Direction::Incoming)
    }

    fn neighbors(&self, node_ref: &NodeRef, direction: Direction) -> Vec<NodeRef> {
        let Some(&idx) = self.index.get(node_ref) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].node_ref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The transform that produced a content node, if any
    pub fn producer_of(&self, content_id: &str) -> Option<&TransformNode> {
        self.producers
            .get(content_id)
            .and_then(|transform_id| self.transform(transform_id))
    }

    /// Content nodes consumed by a transform, in id order
    pub fn inputs_of(&self, transform_id: &str) -> Vec<&ContentNode> {
        self.transform_neighbors(transform_id, Direction::Incoming)
    }

    /// Content nodes produced by a transform, in id order
    pub fn outputs_of(&self, transform_id: &str) -> Vec<&ContentNode> {
        self.transform_neighbors(transform_id, Direction::Outgoing)
    }

    fn transform_neighbors(&self, transform_id: &str, direction: Direction) -> Vec<&ContentNode> {
        let Some(&idx) = self.index.get(&NodeRef::transform(transform_id)) else {
            return Vec::new();
        };
        let mut nodes: Vec<&ContentNode> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph[n].as_content())
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes.dedup_by(|a, b| a.id == b.id);
        nodes
    }

    /// Accepted annotations of a human transform
    pub fn annotations_for(&self, transform_id: &str) -> &[EditDescriptor] {
        self.annotations
            .get(transform_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    /// Lazy breadth-first walk over everything downstream of `start`.
    ///
    /// The start node itself is not yielded. Unknown ids yield nothing.
    pub fn descendants_of(&self, start: &NodeRef) -> Traversal<'_> {
        Traversal::new(self, start, Direction::Outgoing)
    }

    /// Lazy breadth-first walk over everything upstream of `start`.
    pub fn ancestors_of(&self, start: &NodeRef) -> Traversal<'_> {
        Traversal::new(self, start, Direction::Incoming)
    }

    /// Downstream content nodes of a content node
    pub fn content_descendants_of<'a>(
        &'a self,
        content_id: &str,
    ) -> impl Iterator<Item = &'a ContentNode> + 'a {
        self.descendants_of(&NodeRef::content(content_id))
            .filter_map(|visit| visit.node.as_content())
    }

    /// All ancestor roots of a content node, in id order.
    ///
    /// A root is its own root.
    pub fn roots_of(&self, content_id: &str) -> Vec<&ContentNode> {
        let Some(node) = self.content(content_id) else {
            return Vec::new();
        };
        if self.is_root(content_id) {
            return vec![node];
        }

        let mut roots: Vec<&ContentNode> = self
            .ancestors_of(&NodeRef::content(content_id))
            .filter_map(|visit| visit.node.as_content())
            .filter(|ancestor| self.is_root(&ancestor.id))
            .collect();
        roots.sort_by(|a, b| a.id.cmp(&b.id));
        roots
    }

    /// Check if at least one root lies upstream of a content node.
    ///
    /// Same answer as `!roots_of(id).is_empty()`, answered from a table
    /// filled during construction.
    pub fn is_rooted(&self, content_id: &str) -> bool {
        self.index
            .get(&NodeRef::content(content_id))
            .is_some_and(|idx| self.rooted[idx.index()])
    }

    /// Tags found strictly downstream of every content node.
    ///
    /// `tag` labels the content nodes of interest. One reverse topological
    /// pass collects, for each content node, the set of tags carried by its
    /// content descendants. Nodes with nothing tagged below them are absent
    /// from the result.
    pub fn downstream_tags<T, F>(&self, tag: F) -> HashMap<&str, BTreeSet<T>>
    where
        T: Ord + Clone,
        F: Fn(&ContentNode) -> Option<T>,
    {
        let mut below: Vec<BTreeSet<T>> = vec![BTreeSet::new(); self.graph.node_count()];
        for &idx in self.topo_order.iter().rev() {
            let mut tags = BTreeSet::new();
            for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
                tags.extend(below[child.index()].iter().cloned());
                if let Some(t) = self.graph[child].as_content().and_then(&tag) {
                    tags.insert(t);
                }
            }
            below[idx.index()] = tags;
        }

        self.topo_order
            .iter()
            .filter_map(|&idx| {
                let node = self.graph[idx].as_content()?;
                let tags = std::mem::take(&mut below[idx.index()]);
                (!tags.is_empty()).then_some((node.id.as_str(), tags))
            })
            .collect()
    }

    /// Check if a content node has no producing transform
    pub fn is_root(&self, content_id: &str) -> bool {
        self.contains_content(content_id) && !self.producers.contains_key(content_id)
    }

    /// Check if `descendant` is strictly downstream of `ancestor`
    pub fn is_descendant(&self, ancestor: &str, descendant: &str) -> bool {
        if ancestor == descendant || !self.contains_content(descendant) {
            return false;
        }
        self.content_descendants_of(ancestor)
            .any(|node| node.id == descendant)
    }

    /// Position of a node in the topological order (upstream first)
    pub fn topo_rank(&self, node_ref: &NodeRef) -> Option<usize> {
        self.index
            .get(node_ref)
            .map(|idx| self.topo_rank[idx.index()])
    }

    /// Re-run cycle detection over the arena.
    ///
    /// Returns the cycle path if one exists. Graphs produced by the builder
    /// never contain one.
    pub fn find_cycle(&self) -> Option<Vec<NodeRef>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(_) => None,
            Err(cycle) => Some(cycle_path(&self.graph, cycle.node_id())),
        }
    }

    // ------------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------------

    /// Integrity warnings recorded while building
    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            content_nodes: self.content_count(),
            transforms: self.transform_count(),
            edges: self.edge_count(),
            roots: self
                .content_nodes()
                .filter(|node| self.is_root(&node.id))
                .count(),
            warnings: self.warnings.len(),
            by_schema: self
                .schema_index
                .iter()
                .map(|(schema, ids)| (schema.to_string(), ids.len()))
                .collect(),
        }
    }

    /// Structural fingerprint: every edge as `(from, to, kind)`, sorted.
    ///
    /// Two graphs built from permutations of the same records have equal
    /// fingerprints.
    pub fn edge_set(&self) -> Vec<(NodeRef, NodeRef, EdgeKind)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some((
                    self.graph[from].node_ref(),
                    self.graph[to].node_ref(),
                    self.graph[e].kind,
                ))
            })
            .collect();
        edges.sort();
        edges.dedup();
        edges
    }
}

/// Reconstruct one cycle through `start` by breadth-first search back to it.
pub(crate) fn cycle_path(graph: &DiGraph<LineageNode, EdgeData>, start: NodeIndex) -> Vec<NodeRef> {
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    let mut seen = HashSet::from([start]);

    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors_directed(current, Direction::Outgoing) {
            if next == start {
                let mut chain = Vec::new();
                let mut cursor = current;
                while cursor != start {
                    chain.push(graph[cursor].node_ref());
                    cursor = parent[&cursor];
                }
                chain.reverse();

                let mut path = Vec::with_capacity(chain.len() + 2);
                path.push(graph[start].node_ref());
                path.extend(chain);
                path.push(graph[start].node_ref());
                return path;
            }
            if seen.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }

    vec![graph[start].node_ref()]
}

// ============================================================================
// Traversal Iterator
// ============================================================================

/// One step of a traversal.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    /// The node reached
    pub node: &'a LineageNode,
    /// Number of edges from the start node along the shortest path
    pub depth: usize,
}

/// Breadth-first traversal in one direction, each node visited once.
pub struct Traversal<'a> {
    graph: &'a LineageGraph,
    direction: Direction,
    queue: VecDeque<(NodeIndex, usize)>,
    visited: HashSet<NodeIndex>,
}

impl<'a> Traversal<'a> {
    fn new(graph: &'a LineageGraph, start: &NodeRef, direction: Direction) -> Self {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        if let Some(&idx) = graph.index.get(start) {
            visited.insert(idx);
            queue.push_back((idx, 0));
        }
        Self {
            graph,
            direction,
            queue,
            visited,
        }
    }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, depth) = self.queue.pop_front()?;
            for next in self.graph.graph.neighbors_directed(idx, self.direction) {
                if self.visited.insert(next) {
                    self.queue.push_back((next, depth + 1));
                }
            }
            // The start node sits at depth 0 and is not part of the walk
            if depth > 0 {
                return Some(Visit {
                    node: &self.graph.graph[idx],
                    depth,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::schema::{EdgeRecord, LineageSnapshot, OriginType};
    use chrono::{TimeZone, Utc};

    fn at(minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
    }

    fn content(id: &str, schema: SchemaType, origin: OriginType, minute: u32) -> ContentNode {
        ContentNode::new(id, "p1", schema, origin, at(minute))
    }

    /// a -> t1 -> b -> t2 -> c, and a -> t3 -> d
    fn sample_graph() -> LineageGraph {
        let snapshot = LineageSnapshot {
            content_nodes: vec![
                content("a", SchemaType::OutlineSettings, OriginType::Seed, 0),
                content("b", SchemaType::Chronicles, OriginType::Derived, 1),
                content("c", SchemaType::EpisodePlanning, OriginType::Derived, 2),
                content("d", SchemaType::Chronicles, OriginType::Derived, 3),
            ],
            transforms: vec![
                TransformNode::automated("t1", at(1)),
                TransformNode::automated("t2", at(2)),
                TransformNode::automated("t3", at(3)),
            ],
            input_edges: vec![
                EdgeRecord::new("t1", "a", "source"),
                EdgeRecord::new("t2", "b", "source"),
                EdgeRecord::new("t3", "a", "source"),
            ],
            output_edges: vec![
                EdgeRecord::new("t1", "b", "result"),
                EdgeRecord::new("t2", "c", "result"),
                EdgeRecord::new("t3", "d", "result"),
            ],
            annotations: vec![],
        };
        GraphBuilder::new().build(&snapshot).unwrap()
    }

    #[test]
    fn test_node_lookup() {
        let graph = sample_graph();
        assert_eq!(graph.content("a").unwrap().schema_type, SchemaType::OutlineSettings);
        assert!(graph.transform("t1").is_some());
        assert!(graph.content("t1").is_none());
        assert!(graph.transform("a").is_none());
        assert_eq!(graph.content_count(), 4);
        assert_eq!(graph.transform_count(), 3);
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn test_neighbors_are_bidirectional() {
        let graph = sample_graph();
        assert_eq!(
            graph.forward_neighbors(&NodeRef::content("a")),
            vec![NodeRef::transform("t1"), NodeRef::transform("t3")]
        );
        assert_eq!(
            graph.backward_neighbors(&NodeRef::content("b")),
            vec![NodeRef::transform("t1")]
        );
        assert_eq!(
            graph.backward_neighbors(&NodeRef::transform("t2")),
            vec![NodeRef::content("b")]
        );
        assert!(graph.forward_neighbors(&NodeRef::content("zzz")).is_empty());
    }

    #[test]
    fn test_descendants_breadth_first_with_depth() {
        let graph = sample_graph();
        let visits: Vec<(String, usize)> = graph
            .descendants_of(&NodeRef::content("a"))
            .map(|v| (v.node.id().to_string(), v.depth))
            .collect();

        assert_eq!(visits.len(), 5);
        assert!(visits.contains(&("b".to_string(), 2)));
        assert!(visits.contains(&("c".to_string(), 4)));
        assert!(visits.contains(&("d".to_string(), 2)));
        // Breadth-first: depth never decreases
        assert!(visits.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_descendants_of_unknown_is_empty() {
        let graph = sample_graph();
        assert_eq!(graph.descendants_of(&NodeRef::content("nope")).count(), 0);
    }

    #[test]
    fn test_roots_of() {
        let graph = sample_graph();
        let roots: Vec<&str> = graph.roots_of("c").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(roots, vec!["a"]);

        let own: Vec<&str> = graph.roots_of("a").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(own, vec!["a"]);
        assert!(graph.roots_of("missing").is_empty());
    }

    #[test]
    fn test_is_rooted_matches_roots_of() {
        let graph = sample_graph();
        for node in graph.content_nodes() {
            assert_eq!(graph.is_rooted(&node.id), !graph.roots_of(&node.id).is_empty());
        }
        assert!(!graph.is_rooted("missing"));
    }

    #[test]
    fn test_output_of_inputless_transform_is_unrooted() {
        let snapshot = LineageSnapshot {
            content_nodes: vec![
                content("floating", SchemaType::Chronicles, OriginType::Derived, 1),
                content("below", SchemaType::EpisodePlanning, OriginType::Derived, 2),
            ],
            transforms: vec![
                TransformNode::automated("t1", at(1)),
                TransformNode::automated("t2", at(2)),
            ],
            input_edges: vec![EdgeRecord::new("t2", "floating", "source")],
            output_edges: vec![
                EdgeRecord::new("t1", "floating", "result"),
                EdgeRecord::new("t2", "below", "result"),
            ],
            annotations: vec![],
        };
        let graph = GraphBuilder::new().build(&snapshot).unwrap();

        assert!(!graph.is_rooted("floating"));
        assert!(!graph.is_rooted("below"));
        assert!(graph.roots_of("floating").is_empty());
    }

    #[test]
    fn test_downstream_tags_collect_strict_descendants() {
        let graph = sample_graph();
        let below = graph.downstream_tags(|node| Some(node.schema_type.clone()));

        assert_eq!(
            below["a"],
            BTreeSet::from([
                SchemaType::Chronicles,
                SchemaType::EpisodePlanning,
            ])
        );
        assert_eq!(below["b"], BTreeSet::from([SchemaType::EpisodePlanning]));
        assert!(!below.contains_key("c"));
        assert!(!below.contains_key("d"));
    }

    #[test]
    fn test_is_descendant() {
        let graph = sample_graph();
        assert!(graph.is_descendant("a", "c"));
        assert!(!graph.is_descendant("c", "a"));
        assert!(!graph.is_descendant("b", "d"));
        assert!(!graph.is_descendant("a", "a"));
    }

    #[test]
    fn test_producer_inputs_outputs() {
        let graph = sample_graph();
        assert_eq!(graph.producer_of("b").unwrap().id, "t1");
        assert!(graph.producer_of("a").is_none());
        let inputs: Vec<&str> = graph.inputs_of("t2").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(inputs, vec!["b"]);
        let outputs: Vec<&str> = graph.outputs_of("t2").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(outputs, vec!["c"]);
    }

    #[test]
    fn test_topo_rank_orders_upstream_first() {
        let graph = sample_graph();
        let a = graph.topo_rank(&NodeRef::content("a")).unwrap();
        let b = graph.topo_rank(&NodeRef::content("b")).unwrap();
        let c = graph.topo_rank(&NodeRef::content("c")).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_schema_index_and_stats() {
        let graph = sample_graph();
        let chronicles: Vec<&str> = graph
            .content_ids_by_schema(&SchemaType::Chronicles)
            .collect();
        assert_eq!(chronicles, vec!["b", "d"]);
        assert_eq!(
            graph
                .content_ids_by_schema(&SchemaType::EpisodeSynopsis)
                .count(),
            0
        );

        let stats = graph.stats();
        assert_eq!(stats.content_nodes, 4);
        assert_eq!(stats.roots, 1);
        assert_eq!(stats.by_schema.get("chronicles"), Some(&2));
        assert!(graph.find_cycle().is_none());
    }

    #[test]
    fn test_node_ref_display() {
        assert_eq!(NodeRef::content("x").to_string(), "content:x");
        assert_eq!(NodeRef::transform("t").to_string(), "transform:t");
        assert_eq!(NodeRef::transform("t").id(), "t");
    }
}
