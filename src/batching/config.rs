//! Batch capacity configuration.

use serde::{Deserialize, Serialize};

/// Default maximum number of geometries in a batch.
pub const DEFAULT_MAX_GEOMETRY_COUNT: u32 = 256;
/// Default maximum number of vertices across all geometries.
pub const DEFAULT_MAX_VERTEX_COUNT: u32 = 1024 * 256;
/// Default maximum number of indices across all geometries.
pub const DEFAULT_MAX_INDEX_COUNT: u32 = 1024 * 256;

/// Capacities of a batch. Fixed once the batch is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of geometries (and transform slots).
    pub max_geometry_count: u32,
    /// Size of every shared vertex attribute buffer, in vertices.
    pub max_vertex_count: u32,
    /// Size of the shared index buffer, in indices.
    pub max_index_count: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_geometry_count: DEFAULT_MAX_GEOMETRY_COUNT,
            max_vertex_count: DEFAULT_MAX_VERTEX_COUNT,
            max_index_count: DEFAULT_MAX_INDEX_COUNT,
        }
    }
}

impl BatchConfig {
    /// Create a config with explicit capacities.
    pub const fn new(max_geometry_count: u32, max_vertex_count: u32, max_index_count: u32) -> Self {
        Self {
            max_geometry_count,
            max_vertex_count,
            max_index_count,
        }
    }

    /// Set the geometry capacity.
    pub fn with_max_geometry_count(mut self, count: u32) -> Self {
        self.max_geometry_count = count;
        self
    }

    /// Set the vertex capacity.
    pub fn with_max_vertex_count(mut self, count: u32) -> Self {
        self.max_vertex_count = count;
        self
    }

    /// Set the index capacity.
    pub fn with_max_index_count(mut self, count: u32) -> Self {
        self.max_index_count = count;
        self
    }
}
