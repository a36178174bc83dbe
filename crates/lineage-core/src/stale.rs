//! Stale propagation over the lineage graph.
//!
//! An edit to a content node invalidates its entire downstream subtree. No
//! attempt is made to track which fields a transform actually read.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::canonical::{CanonicalContext, CanonicalSlot};
use crate::graph::{LineageGraph, NodeRef};
use crate::schema::{EditEvent, SchemaType};

/// One edit that invalidated a node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StaleCause {
    /// Edited ancestor
    pub source_id: String,
    /// JSON path reported by the edit
    pub path: String,
    /// Content generations between the edited node and the stale node
    pub hops: usize,
}

impl fmt::Display for StaleCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let generations = if self.hops == 1 {
            "1 generation".to_string()
        } else {
            format!("{} generations", self.hops)
        };
        if self.path.is_empty() {
            write!(f, "{} changed ({} upstream)", self.source_id, generations)
        } else {
            write!(
                f,
                "{} changed at {} ({} upstream)",
                self.source_id, self.path, generations
            )
        }
    }
}

/// Why a node is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReason {
    /// Contributing edits, deduplicated and sorted
    pub causes: Vec<StaleCause>,
    /// The stale node is canonical, so the consumer sees it
    pub user_facing: bool,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let causes: Vec<String> = self.causes.iter().map(ToString::to_string).collect();
        write!(f, "upstream edit: {}", causes.join("; "))
    }
}

/// A content node invalidated by one or more edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleEntry {
    pub content_id: String,
    pub schema_type: SchemaType,
    /// Slot the node is canonical for, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<CanonicalSlot>,
    pub reason: StaleReason,
}

/// Result of a stale detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaleReport {
    /// Stale nodes, upstream first
    pub entries: Vec<StaleEntry>,
    /// Edited ids that do not exist in the graph
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_sources: Vec<String>,
}

impl StaleReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.entry(content_id).is_some()
    }

    pub fn entry(&self, content_id: &str) -> Option<&StaleEntry> {
        self.entries.iter().find(|e| e.content_id == content_id)
    }

    /// Entries for canonical nodes only
    pub fn user_facing(&self) -> impl Iterator<Item = &StaleEntry> {
        self.entries.iter().filter(|e| e.reason.user_facing)
    }

    /// Stale canonical node ids grouped by slot
    pub fn stale_slots(&self) -> BTreeMap<CanonicalSlot, Vec<String>> {
        let mut slots: BTreeMap<CanonicalSlot, Vec<String>> = BTreeMap::new();
        for entry in self.user_facing() {
            if let Some(slot) = entry.slot {
                slots.entry(slot).or_default().push(entry.content_id.clone());
            }
        }
        slots
    }
}

/// Computes downstream invalidation for a batch of edits.
pub struct StaleDetector<'g> {
    graph: &'g LineageGraph,
    canonical: &'g CanonicalContext,
}

impl<'g> StaleDetector<'g> {
    pub fn new(graph: &'g LineageGraph, canonical: &'g CanonicalContext) -> Self {
        Self { graph, canonical }
    }

    /// Compute the union of stale sets for `edits`.
    ///
    /// The result depends only on the graph, the canonical context and the
    /// set of edits; repeating an edit adds nothing.
    pub fn detect(&self, edits: &[EditEvent]) -> StaleReport {
        let mut causes: HashMap<&'g str, BTreeSet<StaleCause>> = HashMap::new();
        let mut unknown_sources = BTreeSet::new();

        for edit in edits {
            if !self.graph.contains_content(&edit.content_id) {
                warn!("Edit references unknown content node {}", edit.content_id);
                unknown_sources.insert(edit.content_id.clone());
                continue;
            }

            let mut reached = 0usize;
            for visit in self
                .graph
                .descendants_of(&NodeRef::content(edit.content_id.as_str()))
            {
                let Some(node) = visit.node.as_content() else {
                    continue;
                };
                reached += 1;
                causes.entry(node.id.as_str()).or_default().insert(StaleCause {
                    source_id: edit.content_id.clone(),
                    path: edit.path.clone(),
                    hops: visit.depth / 2,
                });
            }
            debug!(
                "Edit to {} at '{}' reached {} content node(s)",
                edit.content_id, edit.path, reached
            );
        }

        let mut entries: Vec<StaleEntry> = causes
            .into_iter()
            .filter_map(|(id, causes)| {
                let node = self.graph.content(id)?;
                let slot = self.canonical.slot_of(id);
                Some(StaleEntry {
                    content_id: node.id.clone(),
                    schema_type: node.schema_type.clone(),
                    slot,
                    reason: StaleReason {
                        causes: causes.into_iter().collect(),
                        user_facing: slot.is_some(),
                    },
                })
            })
            .collect();

        entries.sort_by_cached_key(|entry| {
            (
                self.graph
                    .topo_rank(&NodeRef::content(entry.content_id.as_str()))
                    .unwrap_or(usize::MAX),
                entry.content_id.clone(),
            )
        });

        let report = StaleReport {
            entries,
            unknown_sources: unknown_sources.into_iter().collect(),
        };
        info!(
            "Stale detection: {} edit(s), {} stale node(s), {} user-facing",
            edits.len(),
            report.len(),
            report.user_facing().count()
        );
        report
    }
}
