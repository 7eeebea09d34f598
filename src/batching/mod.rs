//! # Batching Module
//!
//! The pieces a [`BatchedMesh`](crate::objects::BatchedMesh) is built from:
//!
//! - [`GeometryArena`]: shared vertex/index buffers source geometries are copied into
//! - [`TransformStore`]: per-geometry matrices packed into a float texture
//! - [`BatchRegistry`]: draw range, bounds and visibility per geometry
//! - [`culling`]: per-frame frustum tests and draw-range collection

mod arena;
mod config;
pub mod culling;
mod error;
mod registry;
mod transform_store;

pub use arena::{ArenaAllocation, GeometryArena, IndexFormat};
pub use config::{
    BatchConfig, DEFAULT_MAX_GEOMETRY_COUNT, DEFAULT_MAX_INDEX_COUNT, DEFAULT_MAX_VERTEX_COUNT,
};
pub use culling::{DrawRange, DrawRangeList};
pub use error::{BatchError, Result};
pub use registry::{BatchEntry, BatchId, BatchRegistry, EntryHandle, EntryHandleMut};
pub use transform_store::{
    MatrixTextureLayout, TransformStore, FLOATS_PER_MATRIX, LAYOUT_VERSION, TEXELS_PER_MATRIX,
};
