//! Error and warning types for lineage graph construction.
//!
//! Two tiers exist. [`IntegrityWarning`]s describe records that were dropped or
//! look suspicious; the graph is still built and the warnings travel with it.
//! [`GraphError`]s describe corruption that breaks the DAG invariant and abort
//! the call.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::graph::NodeRef;
use crate::schema::{EdgeKind, OriginType};

// ============================================================================
// Integrity Warnings
// ============================================================================

/// A non-fatal data-integrity problem found while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// Edge names a content node that does not exist; the edge was dropped
    MissingContentNode {
        transform_id: String,
        content_id: String,
        edge: EdgeKind,
    },

    /// Edge names a transform that does not exist; the edge was dropped
    MissingTransform {
        transform_id: String,
        content_id: String,
        edge: EdgeKind,
    },

    /// Annotation for a transform that does not exist; dropped
    OrphanAnnotation { transform_id: String },

    /// Annotation attached to an automated transform; dropped
    AnnotationOnAutomated { transform_id: String },

    /// Two content records share an id; one was kept
    DuplicateContentNode { content_id: String },

    /// Two transform records share an id; one was kept
    DuplicateTransform { transform_id: String },

    /// Node without a producing transform whose origin is not `seed`
    RootNotSeed {
        content_id: String,
        origin_type: OriginType,
    },

    /// Node with a producing transform whose origin is `seed`
    SeedWithProducer {
        content_id: String,
        transform_id: String,
    },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::MissingContentNode {
                transform_id,
                content_id,
                edge,
            } => write!(
                f,
                "{edge} edge {transform_id} -> {content_id} references missing content node"
            ),
            IntegrityWarning::MissingTransform {
                transform_id,
                content_id,
                edge,
            } => write!(
                f,
                "{edge} edge {transform_id} -> {content_id} references missing transform"
            ),
            IntegrityWarning::OrphanAnnotation { transform_id } => {
                write!(f, "annotation references missing transform {transform_id}")
            }
            IntegrityWarning::AnnotationOnAutomated { transform_id } => {
                write!(f, "annotation on automated transform {transform_id} ignored")
            }
            IntegrityWarning::DuplicateContentNode { content_id } => {
                write!(f, "duplicate content node record {content_id}")
            }
            IntegrityWarning::DuplicateTransform { transform_id } => {
                write!(f, "duplicate transform record {transform_id}")
            }
            IntegrityWarning::RootNotSeed {
                content_id,
                origin_type,
            } => write!(
                f,
                "content node {content_id} has no producing transform but origin is {origin_type}"
            ),
            IntegrityWarning::SeedWithProducer {
                content_id,
                transform_id,
            } => write!(
                f,
                "seed content node {content_id} is produced by transform {transform_id}"
            ),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort graph construction.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node is reachable from itself
    #[error("lineage cycle detected: {}", format_path(.path))]
    Cycle { path: Vec<NodeRef> },

    /// A content node is the output of more than one transform
    #[error(
        "content node '{content_id}' has {} producing transforms: {}",
        .transforms.len(),
        .transforms.join(", ")
    )]
    MultipleProducers {
        content_id: String,
        transforms: Vec<String>,
    },

    /// Integrity warnings promoted to an error by strict mode
    #[error("integrity check failed with {} warning(s); first: {}", .warnings.len(), first_warning(.warnings))]
    Integrity { warnings: Vec<IntegrityWarning> },
}

impl GraphError {
    /// Check if this error indicates corrupted upstream data (as opposed to a
    /// strict-mode rejection of recoverable problems)
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            GraphError::Cycle { .. } | GraphError::MultipleProducers { .. }
        )
    }
}

fn format_path(path: &[NodeRef]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn first_warning(warnings: &[IntegrityWarning]) -> String {
    warnings
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_shows_path() {
        let err = GraphError::Cycle {
            path: vec![
                NodeRef::content("a"),
                NodeRef::transform("t1"),
                NodeRef::content("a"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "lineage cycle detected: content:a -> transform:t1 -> content:a"
        );
        assert!(err.is_corruption());
    }

    #[test]
    fn test_multiple_producers_display() {
        let err = GraphError::MultipleProducers {
            content_id: "n1".to_string(),
            transforms: vec!["t1".to_string(), "t2".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("n1"));
        assert!(msg.contains("2 producing transforms"));
        assert!(msg.contains("t1, t2"));
    }

    #[test]
    fn test_integrity_error_is_not_corruption() {
        let err = GraphError::Integrity {
            warnings: vec![IntegrityWarning::OrphanAnnotation {
                transform_id: "t9".to_string(),
            }],
        };
        assert!(!err.is_corruption());
        assert!(err.to_string().contains("t9"));
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = IntegrityWarning::MissingTransform {
            transform_id: "t1".to_string(),
            content_id: "n1".to_string(),
            edge: EdgeKind::Output,
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "missing_transform");
        assert_eq!(json["edge"], "output");
    }
}
