//! Common test utilities for integration tests.
//!
//! This module provides a fluent snapshot builder and the fixture projects
//! shared across integration test files.

#![allow(dead_code)]
#![allow(unused_imports)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use lineage_core::{
    ContentNode, EdgeRecord, GraphBuilder, HumanEditAnnotation, LineageGraph, LineageSnapshot,
    OriginType, SchemaType, TransformNode, TransformStatus,
};
use serde_json::{json, Value};

pub const PROJECT: &str = "proj-1";

/// Builds a [`LineageSnapshot`] one record at a time.
///
/// Every call advances a logical clock by one minute, so records created
/// later in the chain carry later timestamps.
pub struct SnapshotBuilder {
    snapshot: LineageSnapshot,
    tick: i64,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: LineageSnapshot::new(),
            tick: 0,
        }
    }

    fn next_time(&mut self) -> DateTime<Utc> {
        self.tick += 1;
        base_time() + Duration::minutes(self.tick)
    }

    /// Add a root content node
    pub fn seed(mut self, id: &str, schema: SchemaType) -> Self {
        let at = self.next_time();
        self.snapshot
            .content_nodes
            .push(ContentNode::new(id, PROJECT, schema, OriginType::Seed, at));
        self
    }

    /// Add an automated transform consuming `inputs` and producing one node
    pub fn derive(self, transform_id: &str, inputs: &[&str], output: &str, schema: SchemaType) -> Self {
        self.derive_many(transform_id, inputs, &[(output, schema)])
    }

    /// Add an automated transform producing several nodes
    pub fn derive_many(
        mut self,
        transform_id: &str,
        inputs: &[&str],
        outputs: &[(&str, SchemaType)],
    ) -> Self {
        let at = self.next_time();
        self.snapshot
            .transforms
            .push(TransformNode::automated(transform_id, at));
        self.link(transform_id, inputs);
        for (id, schema) in outputs {
            self.snapshot.content_nodes.push(ContentNode::new(
                *id,
                PROJECT,
                schema.clone(),
                OriginType::Derived,
                at,
            ));
            self.snapshot
                .output_edges
                .push(EdgeRecord::new(transform_id, *id, "result"));
        }
        self
    }

    /// Add a human transform that edits `input` into a new node of the same schema
    pub fn human_edit(mut self, transform_id: &str, input: &str, output: &str, path: &str) -> Self {
        let at = self.next_time();
        let schema = self.schema_of(input);
        self.snapshot
            .transforms
            .push(TransformNode::human(transform_id, at));
        self.link(transform_id, &[input]);
        self.snapshot.content_nodes.push(ContentNode::new(
            output,
            PROJECT,
            schema,
            OriginType::HumanEdited,
            at,
        ));
        self.snapshot
            .output_edges
            .push(EdgeRecord::new(transform_id, output, "edited"));
        self.snapshot
            .annotations
            .push(HumanEditAnnotation::json_path(transform_id, path));
        self
    }

    /// Add a human transform picking member `index` of a collection into its own idea node
    pub fn select(mut self, transform_id: &str, collection: &str, output: &str, index: usize) -> Self {
        let at = self.next_time();
        let picked = self
            .payload_of(collection)
            .and_then(|p| p.get("ideas"))
            .and_then(|ideas| ideas.get(index))
            .cloned()
            .unwrap_or(Value::Null);
        self.snapshot
            .transforms
            .push(TransformNode::human(transform_id, at));
        self.link(transform_id, &[collection]);
        self.snapshot.content_nodes.push(
            ContentNode::new(
                output,
                PROJECT,
                SchemaType::BrainstormIdea,
                OriginType::HumanEdited,
                at,
            )
            .with_payload(picked),
        );
        self.snapshot
            .output_edges
            .push(EdgeRecord::new(transform_id, output, "selected"));
        self.snapshot
            .annotations
            .push(HumanEditAnnotation::selection(transform_id, index));
        self
    }

    /// Replace the payload of an existing content node
    pub fn payload(mut self, id: &str, payload: Value) -> Self {
        if let Some(node) = self.snapshot.content_nodes.iter_mut().find(|n| n.id == id) {
            node.payload = payload;
        }
        self
    }

    /// Change the status of an existing transform
    pub fn status(mut self, transform_id: &str, status: TransformStatus) -> Self {
        if let Some(t) = self
            .snapshot
            .transforms
            .iter_mut()
            .find(|t| t.id == transform_id)
        {
            t.status = status;
        }
        self
    }

    pub fn snapshot(self) -> LineageSnapshot {
        self.snapshot
    }

    pub fn graph(self) -> LineageGraph {
        build(&self.snapshot)
    }

    fn link(&mut self, transform_id: &str, inputs: &[&str]) {
        for input in inputs {
            self.snapshot
                .input_edges
                .push(EdgeRecord::new(transform_id, *input, "source"));
        }
    }

    fn schema_of(&self, id: &str) -> SchemaType {
        self.snapshot
            .content_nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.schema_type.clone())
            .unwrap_or_else(|| SchemaType::Unknown("missing".to_string()))
    }

    fn payload_of(&self, id: &str) -> Option<&Value> {
        self.snapshot
            .content_nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| &n.payload)
    }
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// Build a graph with default configuration, panicking on corruption
pub fn build(snapshot: &LineageSnapshot) -> LineageGraph {
    GraphBuilder::new()
        .build(snapshot)
        .expect("fixture snapshot should build")
}

/// A full story project:
///
/// ```text
/// side-notes (older unrelated seed) --derive--> side-chronicles
/// collection --select#1--> idea --derive--> outline --derive--> chronicles
///                                                  \--derive--> planning (from outline + chronicles)
/// planning --derive--> synopsis-1, synopsis-2 ; synopsis-2 --human--> synopsis-2b
/// ```
pub fn story_project() -> SnapshotBuilder {
    SnapshotBuilder::new()
        .seed("side-notes", SchemaType::OutlineSettings)
        .derive(
            "t-side",
            &["side-notes"],
            "side-chronicles",
            SchemaType::Chronicles,
        )
        .seed("collection", SchemaType::BrainstormCollection)
        .payload(
            "collection",
            json!({ "ideas": [{ "title": "Heist" }, { "title": "Time loop" }, { "title": "Exile" }] }),
        )
        .select("t-select", "collection", "idea", 1)
        .derive("t-outline", &["idea"], "outline", SchemaType::OutlineSettings)
        .derive("t-chronicles", &["outline"], "chronicles", SchemaType::Chronicles)
        .derive(
            "t-planning",
            &["outline", "chronicles"],
            "planning",
            SchemaType::EpisodePlanning,
        )
        .derive_many(
            "t-synopses",
            &["planning"],
            &[
                ("synopsis-1", SchemaType::EpisodeSynopsis),
                ("synopsis-2", SchemaType::EpisodeSynopsis),
            ],
        )
        .payload("synopsis-1", json!({ "episode_number": 1, "title": "Pilot" }))
        .payload("synopsis-2", json!({ "episode_number": 2, "title": "Fallout" }))
        .human_edit("t-edit-synopsis", "synopsis-2", "synopsis-2b", "$.title")
        .payload("synopsis-2b", json!({ "episode_number": 2, "title": "Fallout (revised)" }))
}
