//! Errors raised by the batching core.

use thiserror::Error;

/// Errors that can occur while building or querying a batch.
///
/// Every failing operation leaves the batch exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The batch already holds its maximum number of geometries.
    #[error("Geometry capacity exceeded: batch holds at most {max} geometries")]
    GeometryCapacityExceeded {
        /// Configured maximum.
        max: u32,
    },

    /// The shared vertex buffers cannot fit the submitted vertices.
    #[error("Vertex capacity exceeded: {requested} vertices requested, {available} available")]
    VertexCapacityExceeded {
        /// Vertices in the submitted geometry.
        requested: usize,
        /// Vertices still free.
        available: usize,
    },

    /// The shared index buffer cannot fit the submitted indices.
    #[error("Index capacity exceeded: {requested} indices requested, {available} available")]
    IndexCapacityExceeded {
        /// Indices in the submitted geometry.
        requested: usize,
        /// Indices still free.
        available: usize,
    },

    /// The geometry's attribute names differ from the batch's.
    #[error("Attribute set mismatch: batch has {expected:?}, geometry has {found:?}")]
    AttributeSetMismatch {
        /// Attribute names fixed by the first submission.
        expected: Vec<String>,
        /// Attribute names of the rejected geometry.
        found: Vec<String>,
    },

    /// An attribute's component type, item size or normalization differs from the batch's.
    #[error("Attribute '{name}' does not match the batch layout")]
    AttributeLayoutMismatch {
        /// Attribute name.
        name: String,
    },

    /// Indexed geometry submitted to a non-indexed batch, or the reverse.
    #[error("Index presence mismatch: batch is {}", indexing_label(.batch_indexed))]
    IndexPresenceMismatch {
        /// Whether the batch uses an index buffer.
        batch_indexed: bool,
    },

    /// The geometry has no position attribute.
    #[error("Geometry has no position attribute")]
    MissingPositionAttribute,

    /// An attribute's item count differs from the position count.
    #[error("Attribute '{name}' has {count} items, expected {expected}")]
    InconsistentVertexCount {
        /// Attribute name.
        name: String,
        /// Items in the attribute.
        count: usize,
        /// Items in the position attribute.
        expected: usize,
    },

    /// An attribute's component count is not a whole number of items.
    #[error("Attribute '{name}' has {len} components, not a multiple of item size {item_size}")]
    PartialItem {
        /// Attribute name.
        name: String,
        /// Components in the array.
        len: usize,
        /// Components per item.
        item_size: usize,
    },

    /// The index attribute packs more than one value per item.
    #[error("Index item size must be 1, got {item_size}")]
    IndexItemSize {
        /// Item size of the submitted index.
        item_size: usize,
    },

    /// A source index points past the geometry's own vertices.
    #[error("Source index {index} out of range for {vertex_count} vertices")]
    SourceIndexOutOfRange {
        /// Offending index value.
        index: u32,
        /// Vertices in the geometry.
        vertex_count: usize,
    },

    /// A rebased index does not fit the batch's index element width.
    #[error("Rebased index {value} does not fit the batch index format")]
    IndexValueOverflow {
        /// Index value after rebasing.
        value: u64,
    },

    /// An id outside `[0, count)`.
    #[error("Invalid geometry id {id}: batch holds {count} geometries")]
    InvalidId {
        /// Requested id.
        id: usize,
        /// Number of geometries.
        count: usize,
    },
}

fn indexing_label(indexed: &bool) -> &'static str {
    if *indexed {
        "indexed"
    } else {
        "non-indexed"
    }
}

/// Result alias for batching operations.
pub type Result<T> = std::result::Result<T, BatchError>;
