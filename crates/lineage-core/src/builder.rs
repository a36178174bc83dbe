//! Graph Builder for Lineage Graphs
//!
//! This module provides the `GraphBuilder` struct for turning the flat record
//! lists of a project snapshot into a validated [`LineageGraph`].
//!
//! ## Guarantees
//!
//! - Dangling edges and annotations are dropped and reported as
//!   [`IntegrityWarning`]s; they never abort the build (unless strict mode is on).
//! - A content node with two producers, or any cycle, aborts with a
//!   [`GraphError`].
//! - Records are sorted before insertion, so any permutation of the same
//!   input yields an identical graph.
//!
//! ## Usage
//!
//! ```ignore
//! use lineage_core::builder::GraphBuilder;
//!
//! let graph = GraphBuilder::new().build(&snapshot)?;
//! for warning in graph.warnings() {
//!     eprintln!("{warning}");
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use petgraph::graph::DiGraph;
use tracing::{debug, info, warn};

use crate::error::{GraphError, IntegrityWarning, Result};
use crate::graph::{cycle_path, EdgeData, GraphParts, LineageGraph, LineageNode, NodeRef};
use crate::schema::{
    ContentNode, EdgeKind, EdgeRecord, EditDescriptor, HumanEditAnnotation, LineageSnapshot,
    OriginType, TransformNode,
};

// ============================================================================
// Builder Configuration
// ============================================================================

/// Configuration for the graph builder.
#[derive(Debug, Clone, Default)]
pub struct BuilderConfig {
    /// Promote integrity warnings to a hard `GraphError::Integrity`
    pub strict_integrity: bool,
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Builds lineage graphs from flat node and edge records.
///
/// The builder holds no state between calls; one instance can be shared
/// across threads and reused for any number of projects.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: BuilderConfig,
}

impl GraphBuilder {
    /// Create a builder with default (lenient) configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with custom configuration
    pub fn with_config(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build a graph from a full project snapshot.
    pub fn build(&self, snapshot: &LineageSnapshot) -> Result<LineageGraph> {
        self.build_from_records(
            &snapshot.content_nodes,
            &snapshot.transforms,
            &snapshot.input_edges,
            &snapshot.output_edges,
            &snapshot.annotations,
        )
    }

    /// Build a graph from the individual record lists.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MultipleProducers`] if a content node is output by two transforms
    /// - [`GraphError::Cycle`] if the records describe a cycle
    /// - [`GraphError::Integrity`] if strict mode is on and any warning was raised
    pub fn build_from_records(
        &self,
        content_nodes: &[ContentNode],
        transforms: &[TransformNode],
        input_edges: &[EdgeRecord],
        output_edges: &[EdgeRecord],
        annotations: &[HumanEditAnnotation],
    ) -> Result<LineageGraph> {
        let mut warnings = Vec::new();

        let contents = dedupe_content(content_nodes, &mut warnings);
        let transforms = dedupe_transforms(transforms, &mut warnings);

        let node_count = contents.len() + transforms.len();
        let edge_count = input_edges.len() + output_edges.len();
        let mut graph: DiGraph<LineageNode, EdgeData> = DiGraph::with_capacity(node_count, edge_count);
        let mut index = HashMap::with_capacity(node_count);

        // Sorted insertion keeps arena indices independent of input order
        for node in contents.values() {
            let idx = graph.add_node(LineageNode::Content((*node).clone()));
            index.insert(NodeRef::content(node.id.clone()), idx);
        }
        for node in transforms.values() {
            let idx = graph.add_node(LineageNode::Transform((*node).clone()));
            index.insert(NodeRef::transform(node.id.clone()), idx);
        }

        let mut producer_sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (kind, records) in [(EdgeKind::Input, input_edges), (EdgeKind::Output, output_edges)] {
            let sorted: BTreeSet<&EdgeRecord> = records.iter().collect();
            for record in sorted {
                let content_idx = index.get(&NodeRef::content(record.content_id.clone()));
                let transform_idx = index.get(&NodeRef::transform(record.transform_id.clone()));

                let (content_idx, transform_idx) = match (content_idx, transform_idx) {
                    (Some(&c), Some(&t)) => (c, t),
                    (None, _) => {
                        warnings.push(IntegrityWarning::MissingContentNode {
                            transform_id: record.transform_id.clone(),
                            content_id: record.content_id.clone(),
                            edge: kind,
                        });
                        continue;
                    }
                    (Some(_), None) => {
                        warnings.push(IntegrityWarning::MissingTransform {
                            transform_id: record.transform_id.clone(),
                            content_id: record.content_id.clone(),
                            edge: kind,
                        });
                        continue;
                    }
                };

                let data = EdgeData {
                    kind,
                    role: record.role.clone(),
                };
                match kind {
                    EdgeKind::Input => graph.add_edge(content_idx, transform_idx, data),
                    EdgeKind::Output => {
                        producer_sets
                            .entry(record.content_id.clone())
                            .or_default()
                            .insert(record.transform_id.clone());
                        graph.add_edge(transform_idx, content_idx, data)
                    }
                };
            }
        }

        let mut producers = HashMap::with_capacity(producer_sets.len());
        for (content_id, set) in producer_sets {
            if set.len() > 1 {
                return Err(GraphError::MultipleProducers {
                    content_id,
                    transforms: set.into_iter().collect(),
                });
            }
            if let Some(transform_id) = set.into_iter().next() {
                producers.insert(content_id, transform_id);
            }
        }

        let topo_order = match petgraph::algo::toposort(&graph, None) {
            Ok(order) => order,
            Err(cycle) => {
                let path = cycle_path(&graph, cycle.node_id());
                return Err(GraphError::Cycle { path });
            }
        };

        for node in contents.values() {
            match (producers.get(&node.id), node.origin_type) {
                (None, OriginType::Seed) | (Some(_), OriginType::Derived | OriginType::HumanEdited) => {}
                (None, origin_type) => warnings.push(IntegrityWarning::RootNotSeed {
                    content_id: node.id.clone(),
                    origin_type,
                }),
                (Some(transform_id), OriginType::Seed) => {
                    warnings.push(IntegrityWarning::SeedWithProducer {
                        content_id: node.id.clone(),
                        transform_id: transform_id.clone(),
                    })
                }
            }
        }

        let annotations = collect_annotations(annotations, &transforms, &mut warnings);

        warnings.sort();
        warnings.dedup();
        for warning in &warnings {
            warn!("Lineage integrity: {}", warning);
        }

        if self.config.strict_integrity && !warnings.is_empty() {
            return Err(GraphError::Integrity { warnings });
        }

        let graph = LineageGraph::from_parts(GraphParts {
            graph,
            index,
            producers,
            annotations,
            topo_order,
            warnings,
        });

        info!(
            "Built lineage graph: {} content nodes, {} transforms, {} edges, {} warnings",
            graph.content_count(),
            graph.transform_count(),
            graph.edge_count(),
            graph.warnings().len()
        );

        Ok(graph)
    }
}

// ============================================================================
// Record Preparation
// ============================================================================

/// Index content records by id, keeping one record per id.
///
/// On duplicates the record with the latest `created_at` wins, then the
/// greatest serialized payload, so the survivor does not depend on input order.
fn dedupe_content<'a>(
    records: &'a [ContentNode],
    warnings: &mut Vec<IntegrityWarning>,
) -> BTreeMap<String, &'a ContentNode> {
    let mut kept: BTreeMap<String, &ContentNode> = BTreeMap::new();
    for record in records {
        let replace = match kept.get(&record.id) {
            None => true,
            Some(existing) if *existing == record => false,
            Some(existing) => {
                warnings.push(IntegrityWarning::DuplicateContentNode {
                    content_id: record.id.clone(),
                });
                content_rank(record) > content_rank(*existing)
            }
        };
        if replace {
            kept.insert(record.id.clone(), record);
        }
    }
    kept
}

/// Total order over every field but `id`, so the survivor of a duplicate
/// group never depends on record order.
fn content_rank(node: &ContentNode) -> (DateTime<Utc>, String, OriginType, String, &str) {
    (
        node.created_at,
        serde_json::to_string(&node.payload).unwrap_or_default(),
        node.origin_type,
        node.schema_type.to_string(),
        node.project_id.as_str(),
    )
}

fn dedupe_transforms<'a>(
    records: &'a [TransformNode],
    warnings: &mut Vec<IntegrityWarning>,
) -> BTreeMap<String, &'a TransformNode> {
    let rank = |t: &TransformNode| (t.created_at, t.kind, t.status);
    let mut kept: BTreeMap<String, &TransformNode> = BTreeMap::new();
    for record in records {
        let replace = match kept.get(&record.id) {
            None => true,
            Some(existing) if *existing == record => false,
            Some(existing) => {
                warnings.push(IntegrityWarning::DuplicateTransform {
                    transform_id: record.id.clone(),
                });
                rank(record) > rank(*existing)
            }
        };
        if replace {
            kept.insert(record.id.clone(), record);
        }
    }
    kept
}

/// Keep annotations that belong to existing human transforms.
fn collect_annotations(
    annotations: &[HumanEditAnnotation],
    transforms: &BTreeMap<String, &TransformNode>,
    warnings: &mut Vec<IntegrityWarning>,
) -> HashMap<String, Vec<EditDescriptor>> {
    let sorted: BTreeSet<&HumanEditAnnotation> = annotations.iter().collect();
    let mut accepted: HashMap<String, Vec<EditDescriptor>> = HashMap::new();

    for annotation in sorted {
        match transforms.get(&annotation.transform_id) {
            None => warnings.push(IntegrityWarning::OrphanAnnotation {
                transform_id: annotation.transform_id.clone(),
            }),
            Some(transform) if !transform.is_human() => {
                warnings.push(IntegrityWarning::AnnotationOnAutomated {
                    transform_id: annotation.transform_id.clone(),
                })
            }
            Some(_) => {
                debug!(
                    "Annotation on {}: {:?}",
                    annotation.transform_id, annotation.descriptor
                );
                accepted
                    .entry(annotation.transform_id.clone())
                    .or_default()
                    .push(annotation.descriptor.clone());
            }
        }
    }

    accepted
}
