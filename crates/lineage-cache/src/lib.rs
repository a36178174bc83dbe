//! Built-Graph Cache
//!
//! Provides an LRU cache of built [`LineageGraph`]s keyed on an explicit
//! project revision token supplied by the caller. The cache never decides
//! whether a revision is current; a new revision is simply a new key.
//!
//! Thread-safe via interior mutability using parking_lot::Mutex. The lock is
//! not held while a graph is being built.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lineage_config::CacheSettings;
use lineage_core::{GraphBuilder, GraphError, LineageGraph, LineageSnapshot};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::{debug, trace};

/// Identifies one immutable state of a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevisionKey {
    pub project_id: String,
    /// Opaque revision stamp, e.g. a row version or content hash
    pub revision: String,
}

impl RevisionKey {
    pub fn new(project_id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            revision: revision.into(),
        }
    }

    /// Key a revision by the SHA-256 of its serialized records, for callers
    /// with no row version of their own.
    pub fn from_content(project_id: impl Into<String>, content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self::new(project_id, format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.project_id, self.revision)
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to build a graph
    pub misses: u64,
    /// Graphs dropped to make room
    pub evictions: u64,
}

impl CacheMetrics {
    /// Get hit rate as a fraction (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Inner state for GraphCache (protected by Mutex)
struct CacheState {
    graphs: LruCache<RevisionKey, Arc<LineageGraph>>,
    metrics: CacheMetrics,
}

/// LRU cache of built graphs.
///
/// An ordinary owned value: create one per service and share it by
/// reference or `Arc`. Graphs are handed out as `Arc<LineageGraph>` so an
/// eviction never invalidates a graph a caller is still reading.
pub struct GraphCache {
    capacity: NonZeroUsize,
    state: Mutex<CacheState>,
}

impl GraphCache {
    /// Create a cache holding at most `capacity` graphs (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity,
            state: Mutex::new(CacheState {
                graphs: LruCache::new(capacity),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Create a cache sized by the `[cache]` configuration section
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.capacity)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn len(&self) -> usize {
        self.state.lock().graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a revision is cached without touching LRU order
    pub fn contains(&self, key: &RevisionKey) -> bool {
        self.state.lock().graphs.contains(key)
    }

    /// Look up a revision, counting a hit or a miss
    pub fn get(&self, key: &RevisionKey) -> Option<Arc<LineageGraph>> {
        let mut state = self.state.lock();
        match state.graphs.get(key).cloned() {
            Some(graph) => {
                state.metrics.hits += 1;
                Some(graph)
            }
            None => {
                state.metrics.misses += 1;
                None
            }
        }
    }

    /// Store a graph for a revision, returning the shared handle
    pub fn insert(&self, key: RevisionKey, graph: LineageGraph) -> Arc<LineageGraph> {
        let graph = Arc::new(graph);
        let mut state = self.state.lock();
        if let Some((evicted, _)) = state.graphs.push(key.clone(), Arc::clone(&graph)) {
            if evicted != key {
                state.metrics.evictions += 1;
                debug!("Evicted lineage graph {}", evicted);
            }
        }
        graph
    }

    /// Return the cached graph for `key`, building and caching it on a miss.
    ///
    /// Build failures are returned as-is and nothing is cached for the key.
    pub fn get_or_build<F, E>(&self, key: &RevisionKey, build: F) -> Result<Arc<LineageGraph>, E>
    where
        F: FnOnce() -> Result<LineageGraph, E>,
    {
        if let Some(graph) = self.get(key) {
            trace!("Cache hit for {}", key);
            return Ok(graph);
        }

        debug!("Building lineage graph for {}", key);
        let graph = build()?;
        Ok(self.insert(key.clone(), graph))
    }

    /// Convenience wrapper building from a snapshot with `builder`.
    pub fn get_or_build_snapshot(
        &self,
        key: &RevisionKey,
        builder: &GraphBuilder,
        snapshot: &LineageSnapshot,
    ) -> Result<Arc<LineageGraph>, GraphError> {
        self.get_or_build(key, || builder.build(snapshot))
    }

    /// Drop every cached revision of a project.
    ///
    /// Returns the number of graphs removed.
    pub fn invalidate_project(&self, project_id: &str) -> usize {
        let mut state = self.state.lock();
        let stale: Vec<RevisionKey> = state
            .graphs
            .iter()
            .filter(|(key, _)| key.project_id == project_id)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            state.graphs.pop(key);
        }
        stale.len()
    }

    /// Get a snapshot of cache metrics
    pub fn metrics(&self) -> CacheMetrics {
        self.state.lock().metrics.clone()
    }

    pub fn reset_metrics(&self) {
        self.state.lock().metrics = CacheMetrics::default();
    }

    /// Drop all cached graphs
    pub fn clear(&self) {
        self.state.lock().graphs.clear();
    }
}

impl Default for GraphCache {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}
