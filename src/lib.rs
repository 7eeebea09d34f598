//! # Ren Batch - Batched Mesh Core for the Ren Engine
//!
//! Merges many geometries that share a material into one drawable so a
//! renderer can draw them all with a single multi-draw call.
//!
//! ## Features
//!
//! - **Geometry arena**: fixed-capacity shared vertex and index buffers
//! - **Transform texture**: per-geometry matrices packed 4 texels per matrix
//! - **Culling**: per-geometry visibility and frustum tests against bounding spheres
//! - **Draw ranges**: one `(byte offset, count)` pair per geometry, every frame
//!
//! ## Example
//!
//! ```ignore
//! use ren_batch::prelude::*;
//!
//! let mut batch = BatchedMesh::new();
//! let id = batch.add_geometry(&geometry)?;
//! batch.set_matrix_at(id, &Matrix4::from_translation(&Vector3::new(0.0, 1.0, 0.0)))?;
//!
//! let ranges = batch.prepare_draw(Some(&Frustum::from_matrix(&view_proj)));
//! batch.update_buffers(&device, &queue);
//! ```

#![warn(missing_docs)]

pub mod batching;
pub mod geometry;
pub mod math;
pub mod objects;
pub mod texture;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::batching::{
        BatchConfig, BatchError, BatchId, DrawRange, DrawRangeList, IndexFormat,
        MatrixTextureLayout,
    };
    pub use crate::geometry::*;
    pub use crate::math::*;
    pub use crate::objects::*;
    pub use crate::texture::*;
}
