//! Canonical Version Resolution
//!
//! Picks the single authoritative content node for each conceptual slot of a
//! project (outline settings, chronicles, the episode synopsis list, ...).
//!
//! ## Rules
//!
//! For a single-valued slot:
//!
//! 1. Candidates are the content nodes of the slot's schema type. Outputs of
//!    failed transforms never qualify; outputs of pending transforms qualify
//!    unless [`ResolverConfig::include_pending`] is off.
//! 2. A candidate with a candidate descendant is superseded. A human edit of
//!    a derived node therefore replaces it at any depth.
//! 3. The surviving leaves compete on the branch key: completed producer
//!    first, then the producer's `created_at` (the node's own for roots), then
//!    the greatest node id.
//!
//! A list-valued slot groups its candidates by index key and applies the same
//! rules per index.
//!
//! When the canonical idea descends from the canonical collection it was
//! picked out of that collection, and only the idea stays canonical. An
//! unrelated collection and idea both stay filled.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::graph::{LineageGraph, NodeRef};
use crate::schema::{ContentNode, OriginType, SchemaType, TransformNode, TransformStatus};

// ============================================================================
// Slot Taxonomy
// ============================================================================

/// Whether a slot holds one document or an indexed list of documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotCardinality {
    Single,
    List,
}

/// A conceptual document slot of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalSlot {
    BrainstormCollection,
    BrainstormIdea,
    OutlineSettings,
    Chronicles,
    EpisodePlanning,
    EpisodeSynopses,
}

impl CanonicalSlot {
    /// Every slot, in resolution order
    pub const ALL: [CanonicalSlot; 6] = [
        CanonicalSlot::BrainstormCollection,
        CanonicalSlot::BrainstormIdea,
        CanonicalSlot::OutlineSettings,
        CanonicalSlot::Chronicles,
        CanonicalSlot::EpisodePlanning,
        CanonicalSlot::EpisodeSynopses,
    ];

    /// Schema type that fills this slot
    pub fn schema(self) -> SchemaType {
        match self {
            CanonicalSlot::BrainstormCollection => SchemaType::BrainstormCollection,
            CanonicalSlot::BrainstormIdea => SchemaType::BrainstormIdea,
            CanonicalSlot::OutlineSettings => SchemaType::OutlineSettings,
            CanonicalSlot::Chronicles => SchemaType::Chronicles,
            CanonicalSlot::EpisodePlanning => SchemaType::EpisodePlanning,
            CanonicalSlot::EpisodeSynopses => SchemaType::EpisodeSynopsis,
        }
    }

    pub fn cardinality(self) -> SlotCardinality {
        match self {
            CanonicalSlot::EpisodeSynopses => SlotCardinality::List,
            _ => SlotCardinality::Single,
        }
    }

    /// Slot a schema type can fill. Unknown schema types fill none.
    pub fn for_schema(schema: &SchemaType) -> Option<Self> {
        match schema {
            SchemaType::BrainstormCollection => Some(CanonicalSlot::BrainstormCollection),
            SchemaType::BrainstormIdea => Some(CanonicalSlot::BrainstormIdea),
            SchemaType::OutlineSettings => Some(CanonicalSlot::OutlineSettings),
            SchemaType::Chronicles => Some(CanonicalSlot::Chronicles),
            SchemaType::EpisodePlanning => Some(CanonicalSlot::EpisodePlanning),
            SchemaType::EpisodeSynopsis => Some(CanonicalSlot::EpisodeSynopses),
            SchemaType::Unknown(_) => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalSlot::BrainstormCollection => "brainstorm_collection",
            CanonicalSlot::BrainstormIdea => "brainstorm_idea",
            CanonicalSlot::OutlineSettings => "outline_settings",
            CanonicalSlot::Chronicles => "chronicles",
            CanonicalSlot::EpisodePlanning => "episode_planning",
            CanonicalSlot::EpisodeSynopses => "episode_synopses",
        }
    }
}

impl fmt::Display for CanonicalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Resolver Configuration
// ============================================================================

/// Configuration for canonical resolution.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Let outputs of still-pending transforms compete
    pub include_pending: bool,
    /// Payload fields holding the index key of list-valued documents, tried in order
    pub index_fields: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            include_pending: true,
            index_fields: vec!["episode_number".to_string(), "episodeNumber".to_string()],
        }
    }
}

// ============================================================================
// Output Types
// ============================================================================

/// Reference to a resolved canonical node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRef {
    pub content_id: String,
    pub schema_type: SchemaType,
    pub origin_type: OriginType,
    /// Producing transform, `None` for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a list-valued slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedRef {
    pub index: u32,
    pub node: CanonicalRef,
}

/// Resolved value of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    /// Single-valued slot; `None` when nothing is canonical yet
    Single(Option<CanonicalRef>),
    /// List-valued slot ordered by index; gaps are allowed
    List(Vec<IndexedRef>),
}

impl SlotValue {
    /// Content ids held by this value
    pub fn content_ids(&self) -> Vec<&str> {
        match self {
            SlotValue::Single(node) => node.iter().map(|n| n.content_id.as_str()).collect(),
            SlotValue::List(entries) => entries
                .iter()
                .map(|e| e.node.content_id.as_str())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SlotValue::Single(node) => node.is_none(),
            SlotValue::List(entries) => entries.is_empty(),
        }
    }
}

/// Record of an idea picked out of a brainstorm collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Collection the idea was picked from
    pub collection_id: String,
    /// Human transform that made the pick
    pub transform_id: String,
    /// Node the pick produced
    pub selected_id: String,
    /// Position of the picked member, when the transform was annotated with it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// Resolved "current truth" snapshot: one value per slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalContext {
    slots: BTreeMap<CanonicalSlot, SlotValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    selection: Option<Selection>,
}

impl CanonicalContext {
    pub fn get(&self, slot: CanonicalSlot) -> Option<&SlotValue> {
        self.slots.get(&slot)
    }

    /// Canonical node of a single-valued slot
    pub fn single(&self, slot: CanonicalSlot) -> Option<&CanonicalRef> {
        match self.slots.get(&slot) {
            Some(SlotValue::Single(node)) => node.as_ref(),
            _ => None,
        }
    }

    /// Canonical entries of a list-valued slot
    pub fn list(&self, slot: CanonicalSlot) -> &[IndexedRef] {
        match self.slots.get(&slot) {
            Some(SlotValue::List(entries)) => entries,
            _ => &[],
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalSlot, &SlotValue)> {
        self.slots.iter().map(|(slot, value)| (*slot, value))
    }

    /// Slot a content node is canonical for, if any
    pub fn slot_of(&self, content_id: &str) -> Option<CanonicalSlot> {
        self.slots
            .iter()
            .find(|(_, value)| value.content_ids().contains(&content_id))
            .map(|(slot, _)| *slot)
    }

    pub fn contains(&self, content_id: &str) -> bool {
        self.slot_of(content_id).is_some()
    }

    /// Number of slots holding at least one canonical node
    pub fn filled_slots(&self) -> usize {
        self.slots.values().filter(|value| !value.is_empty()).count()
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// A content node competing for a slot, with its producing transform.
#[derive(Debug, Clone, Copy)]
struct Candidate<'g> {
    node: &'g ContentNode,
    producer: Option<&'g TransformNode>,
}

impl<'g> Candidate<'g> {
    /// Ordering across independent branches; greatest wins.
    fn branch_key(&self) -> (bool, DateTime<Utc>, &'g str) {
        let node: &'g ContentNode = self.node;
        match self.producer {
            Some(transform) => (
                transform.is_completed(),
                transform.created_at,
                node.id.as_str(),
            ),
            None => (true, node.created_at, node.id.as_str()),
        }
    }

    fn id(&self) -> &'g str {
        let node: &'g ContentNode = self.node;
        node.id.as_str()
    }

    fn to_ref(self) -> CanonicalRef {
        CanonicalRef {
            content_id: self.node.id.clone(),
            schema_type: self.node.schema_type.clone(),
            origin_type: self.node.origin_type,
            produced_by: self.producer.map(|t| t.id.clone()),
            created_at: self.node.created_at,
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Computes the [`CanonicalContext`] of a lineage graph.
///
/// Resolution is a pure function of the graph and the configuration; calling
/// [`resolve`](Self::resolve) twice yields equal contexts.
pub struct CanonicalResolver<'g> {
    graph: &'g LineageGraph,
    config: ResolverConfig,
}

impl<'g> CanonicalResolver<'g> {
    /// Create a resolver with default configuration
    pub fn new(graph: &'g LineageGraph) -> Self {
        Self::with_config(graph, ResolverConfig::default())
    }

    pub fn with_config(graph: &'g LineageGraph, config: ResolverConfig) -> Self {
        Self { graph, config }
    }

    /// Resolve every slot of the taxonomy.
    pub fn resolve(&self) -> CanonicalContext {
        let mut singles: BTreeMap<CanonicalSlot, Option<Candidate<'g>>> = BTreeMap::new();
        let mut slots = BTreeMap::new();

        for slot in CanonicalSlot::ALL {
            let candidates = self.candidates(&slot.schema());
            trace!("Slot {}: {} candidate(s)", slot, candidates.len());
            match slot.cardinality() {
                SlotCardinality::Single => {
                    singles.insert(slot, self.resolve_single(candidates));
                }
                SlotCardinality::List => {
                    slots.insert(slot, SlotValue::List(self.resolve_list(slot, candidates)));
                }
            }
        }

        let collection = singles
            .remove(&CanonicalSlot::BrainstormCollection)
            .flatten();
        let idea = singles.remove(&CanonicalSlot::BrainstormIdea).flatten();
        let (collection, idea, selection) = self.disambiguate_selection(collection, idea);
        singles.insert(CanonicalSlot::BrainstormCollection, collection);
        singles.insert(CanonicalSlot::BrainstormIdea, idea);

        for (slot, winner) in singles {
            debug!(
                "Slot {} resolved to {}",
                slot,
                winner.map_or("nothing", |c| c.node.id.as_str())
            );
            slots.insert(slot, SlotValue::Single(winner.map(Candidate::to_ref)));
        }

        let context = CanonicalContext { slots, selection };
        info!(
            "Resolved canonical context: {} of {} slots filled",
            context.filled_slots(),
            CanonicalSlot::ALL.len()
        );
        context
    }

    /// Content nodes of `schema` eligible to fill a slot.
    fn candidates(&self, schema: &SchemaType) -> Vec<Candidate<'g>> {
        let graph = self.graph;
        graph
            .content_ids_by_schema(schema)
            .filter_map(|id| graph.content(id))
            .filter_map(|node| {
                let producer = graph.producer_of(&node.id);
                match producer.map(|t| t.status) {
                    Some(TransformStatus::Failed) => {
                        trace!("Skipping {}: producer failed", node.id);
                        None
                    }
                    Some(TransformStatus::Pending) if !self.config.include_pending => {
                        trace!("Skipping {}: producer pending", node.id);
                        None
                    }
                    _ => Some(Candidate { node, producer }),
                }
            })
            .filter(|candidate| graph.is_rooted(candidate.id()))
            .collect()
    }

    /// Pick the winner among candidates of one single-valued slot.
    fn resolve_single(&self, candidates: Vec<Candidate<'g>>) -> Option<Candidate<'g>> {
        if candidates.is_empty() {
            return None;
        }
        self.resolve_groups(BTreeMap::from([(0, candidates)]))
            .into_values()
            .next()
    }

    fn resolve_list(&self, slot: CanonicalSlot, candidates: Vec<Candidate<'g>>) -> Vec<IndexedRef> {
        let mut groups: BTreeMap<u32, Vec<Candidate<'g>>> = BTreeMap::new();
        for candidate in candidates {
            match candidate.node.index_key(&self.config.index_fields) {
                Some(index) => groups.entry(index).or_default().push(candidate),
                None => warn!(
                    "Skipping {} node {} without an index key",
                    slot, candidate.node.id
                ),
            }
        }

        self.resolve_groups(groups)
            .into_iter()
            .map(|(index, winner)| IndexedRef {
                index,
                node: winner.to_ref(),
            })
            .collect()
    }

    /// Winner per group. A candidate loses to any candidate of its own group
    /// downstream of it; the remaining leaves compete on the branch key.
    fn resolve_groups(
        &self,
        groups: BTreeMap<u32, Vec<Candidate<'g>>>,
    ) -> BTreeMap<u32, Candidate<'g>> {
        let group_of: HashMap<&'g str, u32> = groups
            .iter()
            .flat_map(|(&key, group)| group.iter().map(move |c| (c.id(), key)))
            .collect();

        let below = if group_of.len() > groups.len() {
            self.graph
                .downstream_tags(|node| group_of.get(node.id.as_str()).copied())
        } else {
            HashMap::new()
        };

        groups
            .into_iter()
            .filter_map(|(key, group)| {
                let leaves: Vec<Candidate<'g>> = group
                    .into_iter()
                    .filter(|c| !below.get(c.id()).is_some_and(|tags| tags.contains(&key)))
                    .collect();
                if leaves.len() > 1 {
                    debug!(
                        "{} competing branches for {} (group {})",
                        leaves.len(),
                        leaves[0].node.schema_type,
                        key
                    );
                }
                leaves
                    .into_iter()
                    .max_by(|a, b| a.branch_key().cmp(&b.branch_key()))
                    .map(|winner| (key, winner))
            })
            .collect()
    }

    /// Clear the collection slot when the canonical idea was picked out of it.
    fn disambiguate_selection(
        &self,
        collection: Option<Candidate<'g>>,
        idea: Option<Candidate<'g>>,
    ) -> (Option<Candidate<'g>>, Option<Candidate<'g>>, Option<Selection>) {
        let Some(idea) = idea else {
            return (collection, None, None);
        };
        let selection = self.find_selection(&idea);

        match collection {
            Some(collection) if self.graph.is_descendant(collection.id(), idea.id()) => {
                debug!(
                    "Idea {} was picked from collection {}",
                    idea.node.id, collection.node.id
                );
                (None, Some(idea), selection)
            }
            collection => (collection, Some(idea), selection),
        }
    }

    /// Nearest upstream human transform that consumed a collection and
    /// produced an idea.
    fn find_selection(&self, idea: &Candidate<'g>) -> Option<Selection> {
        self.graph
            .ancestors_of(&NodeRef::content(idea.node.id.clone()))
            .filter_map(|visit| visit.node.as_transform())
            .filter(|transform| transform.is_human())
            .find_map(|transform| {
                let collection = self
                    .graph
                    .inputs_of(&transform.id)
                    .into_iter()
                    .find(|n| n.schema_type == SchemaType::BrainstormCollection)?;
                let selected = self
                    .graph
                    .outputs_of(&transform.id)
                    .into_iter()
                    .find(|n| n.schema_type == SchemaType::BrainstormIdea)?;
                let index = self
                    .graph
                    .annotations_for(&transform.id)
                    .iter()
                    .find_map(|descriptor| descriptor.selected_index());

                Some(Selection {
                    collection_id: collection.id.clone(),
                    transform_id: transform.id.clone(),
                    selected_id: selected.id.clone(),
                    index,
                })
            })
    }
}
