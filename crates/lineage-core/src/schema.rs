//! Record Types for the Lineage Model
//!
//! This module defines the flat records the persistence layer hands to the
//! core: content nodes, transforms, input/output edges, human-edit
//! annotations and edit events. All of them are plain serde values; none of
//! them knows about the graph built from them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Schema Types
// ============================================================================

/// Declared schema category of a content node.
///
/// The known categories are a closed set so that slot resolution can match
/// exhaustively. Anything else is kept verbatim as `Unknown` and simply never
/// fills a canonical slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaType {
    /// Generated list of candidate story ideas
    BrainstormCollection,
    /// A single idea, usually selected out of a collection
    BrainstormIdea,
    /// Outline settings (characters, setting, tone)
    OutlineSettings,
    /// Chronological story timeline
    Chronicles,
    /// Episode plan derived from the chronicles
    EpisodePlanning,
    /// Synopsis of one episode
    EpisodeSynopsis,
    /// Category this build does not know about
    Unknown(String),
}

impl SchemaType {
    /// Get the wire tag for this schema type
    pub fn as_str(&self) -> &str {
        match self {
            SchemaType::BrainstormCollection => "brainstorm_collection",
            SchemaType::BrainstormIdea => "brainstorm_idea",
            SchemaType::OutlineSettings => "outline_settings",
            SchemaType::Chronicles => "chronicles",
            SchemaType::EpisodePlanning => "episode_planning",
            SchemaType::EpisodeSynopsis => "episode_synopsis",
            SchemaType::Unknown(tag) => tag,
        }
    }

    /// Parse a wire tag. Unrecognized tags map to `Unknown`.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "brainstorm_collection" => SchemaType::BrainstormCollection,
            "brainstorm_idea" => SchemaType::BrainstormIdea,
            "outline_settings" => SchemaType::OutlineSettings,
            "chronicles" => SchemaType::Chronicles,
            "episode_planning" => SchemaType::EpisodePlanning,
            "episode_synopsis" => SchemaType::EpisodeSynopsis,
            other => SchemaType::Unknown(other.to_string()),
        }
    }

    /// Check if this is a category outside the known taxonomy
    pub fn is_unknown(&self) -> bool {
        matches!(self, SchemaType::Unknown(_))
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for SchemaType {
    fn from(tag: &str) -> Self {
        SchemaType::parse(tag)
    }
}

impl Serialize for SchemaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Tags are open-ended: unknown strings deserialize to `Unknown` instead of
/// failing, so older builds can still read snapshots from newer writers.
impl<'de> Deserialize<'de> for SchemaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(SchemaType::parse(&tag))
    }
}

// ============================================================================
// Node Enums
// ============================================================================

/// How a content node came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
    /// Entered directly, the root of a lineage
    Seed,
    /// Produced by an automated transform
    Derived,
    /// Produced by a human edit
    HumanEdited,
}

impl OriginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OriginType::Seed => "seed",
            OriginType::Derived => "derived",
            OriginType::HumanEdited => "human_edited",
        }
    }
}

impl fmt::Display for OriginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Automated,
    Human,
}

/// Execution state of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStatus {
    Pending,
    Completed,
    Failed,
}

/// Direction of an edge record relative to its transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Content node consumed by the transform
    Input,
    /// Content node produced by the transform
    Output,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Input => f.write_str("input"),
            EdgeKind::Output => f.write_str("output"),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// One immutable, schema-tagged document in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Unique node ID
    pub id: String,

    /// Owning project
    pub project_id: String,

    /// Declared schema category
    pub schema_type: SchemaType,

    /// How the node was created
    pub origin_type: OriginType,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Opaque document body
    #[serde(default)]
    pub payload: Value,
}

impl ContentNode {
    /// Create a content node with an empty payload
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        schema_type: SchemaType,
        origin_type: OriginType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            project_id: project_id.into(),
            schema_type,
            origin_type,
            created_at,
            payload: Value::Null,
        }
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Read the declared index key (e.g. the episode number) of a list-valued
    /// document.
    ///
    /// The first field in `fields` holding a non-negative integer wins.
    pub fn index_key(&self, fields: &[String]) -> Option<u32> {
        let object = self.payload.as_object()?;
        fields.iter().find_map(|field| {
            object
                .get(field)
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
        })
    }
}

/// One derivation step: an automated generation or a human edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformNode {
    pub id: String,
    pub kind: TransformKind,
    pub status: TransformStatus,
    pub created_at: DateTime<Utc>,
}

impl TransformNode {
    /// Create a completed automated transform
    pub fn automated(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind: TransformKind::Automated,
            status: TransformStatus::Completed,
            created_at,
        }
    }

    /// Create a completed human transform
    pub fn human(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            kind: TransformKind::Human,
            status: TransformStatus::Completed,
            created_at,
        }
    }

    /// Set the status
    pub fn with_status(mut self, status: TransformStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_human(&self) -> bool {
        self.kind == TransformKind::Human
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransformStatus::Completed
    }
}

/// A content node consumed (input) or produced (output) by a transform.
///
/// The same record shape is used for both edge lists; which list a record
/// came from decides its direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub transform_id: String,
    pub content_id: String,
    #[serde(default)]
    pub role: String,
}

impl EdgeRecord {
    pub fn new(
        transform_id: impl Into<String>,
        content_id: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            transform_id: transform_id.into(),
            content_id: content_id.into(),
            role: role.into(),
        }
    }
}

/// What a human transform did to its input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditDescriptor {
    /// A field at this JSON path was edited
    JsonPath { path: String },
    /// Member `index` of the consumed collection was picked out
    Selection { index: usize },
}

impl EditDescriptor {
    /// Index of the selected collection member, if this descriptor names one.
    ///
    /// Accepts an explicit `Selection` or a JSON path ending in `[n]`
    /// (e.g. `$.ideas[2]`).
    pub fn selected_index(&self) -> Option<usize> {
        match self {
            EditDescriptor::Selection { index } => Some(*index),
            EditDescriptor::JsonPath { path } => {
                let inner = path.strip_suffix(']')?;
                let open = inner.rfind('[')?;
                inner[open + 1..].parse().ok()
            }
        }
    }
}

/// Extra metadata attached to a human transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HumanEditAnnotation {
    pub transform_id: String,
    pub descriptor: EditDescriptor,
}

impl HumanEditAnnotation {
    pub fn json_path(transform_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            transform_id: transform_id.into(),
            descriptor: EditDescriptor::JsonPath { path: path.into() },
        }
    }

    pub fn selection(transform_id: impl Into<String>, index: usize) -> Self {
        Self {
            transform_id: transform_id.into(),
            descriptor: EditDescriptor::Selection { index },
        }
    }
}

/// A full project snapshot as fetched by the repository layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageSnapshot {
    pub content_nodes: Vec<ContentNode>,
    pub transforms: Vec<TransformNode>,
    pub input_edges: Vec<EdgeRecord>,
    pub output_edges: Vec<EdgeRecord>,
    pub annotations: Vec<HumanEditAnnotation>,
}

impl LineageSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the snapshot holds no records at all
    pub fn is_empty(&self) -> bool {
        self.content_nodes.is_empty()
            && self.transforms.is_empty()
            && self.input_edges.is_empty()
            && self.output_edges.is_empty()
            && self.annotations.is_empty()
    }
}

/// A reported change to one content node.
///
/// `before` and `after` are carried for display only; the detector never
/// compares them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditEvent {
    pub content_id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl EditEvent {
    pub fn new(content_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            path: path.into(),
            before: None,
            after: None,
        }
    }

    /// Attach the before/after values
    pub fn with_values(mut self, before: Option<Value>, after: Option<Value>) -> Self {
        self.before = before;
        self.after = after;
        self
    }
}
