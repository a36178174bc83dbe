//! Lineage Core - Provenance graph for derived documents
//!
//! This crate provides the core functionality for tracking derived content:
//! - Record types for content nodes, transforms, edges and annotations
//! - Graph construction from flat relational records into a validated DAG
//! - Canonical version resolution per conceptual document slot
//! - Stale propagation from reported edits to every downstream node
//!
//! Everything here is synchronous and performs no I/O. Callers fetch a
//! [`LineageSnapshot`], build a [`LineageGraph`] with [`GraphBuilder`], and
//! query it with [`CanonicalResolver`] and [`StaleDetector`].

pub mod builder;
pub mod canonical;
pub mod error;
pub mod graph;
pub mod schema;
pub mod stale;

// Record re-exports
pub use schema::{
    ContentNode, EdgeKind, EdgeRecord, EditDescriptor, EditEvent, HumanEditAnnotation,
    LineageSnapshot, OriginType, SchemaType, TransformKind, TransformNode, TransformStatus,
};

// Graph re-exports
pub use builder::{BuilderConfig, GraphBuilder};
pub use error::{GraphError, IntegrityWarning, Result};
pub use graph::{EdgeData, GraphStats, LineageGraph, LineageNode, NodeRef, Traversal, Visit};

// Resolution re-exports
pub use canonical::{
    CanonicalContext, CanonicalRef, CanonicalResolver, CanonicalSlot, IndexedRef,
    ResolverConfig, Selection, SlotCardinality, SlotValue,
};
pub use stale::{StaleCause, StaleDetector, StaleEntry, StaleReason, StaleReport};
