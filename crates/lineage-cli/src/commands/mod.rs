//! CLI command implementations
//!
//! This module contains all Lineage CLI command implementations and the
//! helpers they share for loading configuration and snapshots.

pub mod canonical;
pub mod check;
pub mod config;
pub mod stale;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use lineage_cache::{GraphCache, RevisionKey};
use lineage_config::{ConfigLoader, LineageConfig};
use lineage_core::{BuilderConfig, GraphBuilder, LineageGraph, LineageSnapshot, ResolverConfig};
use serde::Serialize;
use tracing::debug;

use crate::GlobalOptions;

/// Resolve the project directory from options or current directory.
pub fn resolve_project_dir(global: &GlobalOptions) -> Result<PathBuf> {
    if let Some(ref dir) = global.project_dir {
        if !dir.is_dir() {
            anyhow::bail!("Project directory '{}' does not exist", dir.display());
        }
        return Ok(dir.clone());
    }

    std::env::current_dir().context("Failed to get current directory")
}

/// Load configuration with optional config file override.
///
/// CLI overrides are applied before validation.
pub fn load_config(global: &GlobalOptions) -> Result<LineageConfig> {
    let mut loader = ConfigLoader::new();
    let overrides = global.to_config_overrides();

    if let Some(ref config_path) = global.config {
        return loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    let project = resolve_project_dir(global)?;
    loader
        .load(&project, Some(&overrides))
        .context("Failed to load configuration")
}

/// Read raw snapshot text from a file, or from stdin when `path` is `-`.
fn read_snapshot_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read snapshot {}", path.display()))
}

fn parse_snapshot(path: &Path, content: &str) -> Result<LineageSnapshot> {
    serde_json::from_str(content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// Graph builder settings from the loaded configuration.
pub fn builder_config(config: &LineageConfig) -> BuilderConfig {
    BuilderConfig {
        strict_integrity: config.builder.strict_integrity,
    }
}

/// Resolver settings from the loaded configuration.
pub fn resolver_config(config: &LineageConfig) -> ResolverConfig {
    ResolverConfig {
        include_pending: config.resolver.include_pending,
        index_fields: config.resolver.index_fields.clone(),
    }
}

/// Builds lineage graphs for one command run.
///
/// Snapshots are keyed by project id and a digest of their text, so the
/// same snapshot named twice is built once. The cache is sized by the
/// `[cache]` config section.
pub struct GraphSession {
    builder: GraphBuilder,
    cache: GraphCache,
}

impl GraphSession {
    pub fn new(config: &LineageConfig) -> Self {
        Self {
            builder: GraphBuilder::with_config(builder_config(config)),
            cache: GraphCache::from_settings(&config.cache),
        }
    }

    /// Read a snapshot and build (or reuse) its lineage graph.
    pub fn graph(&self, snapshot_path: &Path) -> Result<Arc<LineageGraph>> {
        let content = read_snapshot_text(snapshot_path)?;
        let snapshot = parse_snapshot(snapshot_path, &content)?;
        let key = RevisionKey::from_content(project_of(&snapshot), content.as_bytes());

        self.cache
            .get_or_build_snapshot(&key, &self.builder, &snapshot)
            .with_context(|| {
                format!(
                    "Failed to build lineage graph from {}",
                    snapshot_path.display()
                )
            })
    }

    pub fn cache(&self) -> &GraphCache {
        &self.cache
    }
}

impl Drop for GraphSession {
    fn drop(&mut self) {
        let metrics = self.cache.metrics();
        debug!(
            "Graph cache: {} hit(s), {} miss(es), {} eviction(s)",
            metrics.hits, metrics.misses, metrics.evictions
        );
    }
}

/// Project a snapshot belongs to, taken from its first content node.
fn project_of(snapshot: &LineageSnapshot) -> &str {
    snapshot
        .content_nodes
        .first()
        .map(|node| node.project_id.as_str())
        .unwrap_or("")
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a warning message to stderr.
pub fn print_warning(message: &str) {
    eprintln!("warning: {}", message);
}

/// Print an info message (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolver_config_follows_settings() {
        let mut config = LineageConfig::default();
        config.resolver.include_pending = false;
        config.resolver.index_fields = vec!["episode".to_string()];

        let resolver = resolver_config(&config);
        assert!(!resolver.include_pending);
        assert_eq!(resolver.index_fields, vec!["episode".to_string()]);
    }

    #[test]
    fn test_builder_config_follows_settings() {
        let mut config = LineageConfig::default();
        assert!(!builder_config(&config).strict_integrity);

        config.builder.strict_integrity = true;
        assert!(builder_config(&config).strict_integrity);
    }

    #[test]
    fn test_session_builds_each_snapshot_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let copy = dir.path().join("b.json");
        let other = dir.path().join("c.json");
        std::fs::write(&first, "{}").unwrap();
        std::fs::write(&copy, "{}").unwrap();
        std::fs::write(&other, r#"{ "content_nodes": [] }"#).unwrap();

        let session = GraphSession::new(&LineageConfig::default());
        let a = session.graph(&first).unwrap();
        let b = session.graph(&copy).unwrap();
        session.graph(&other).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(session.cache().len(), 2);
        assert_eq!(session.cache().metrics().hits, 1);
    }

    #[test]
    fn test_session_cache_sized_by_config() {
        let mut config = LineageConfig::default();
        config.cache.capacity = 1;

        let session = GraphSession::new(&config);
        assert_eq!(session.cache().capacity(), 1);
    }

    #[test]
    fn test_parse_snapshot_reports_path() {
        let err = parse_snapshot(Path::new("broken.json"), "{ not json").unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_read_snapshot_reports_path() {
        let err = read_snapshot_text(Path::new("/nonexistent/lineage/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("snapshot.json"));
    }
}
