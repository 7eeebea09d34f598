//! Renderable objects module.
//!
//! Contains the batched mesh, the drawable that owns a batch.

mod batched_mesh;

pub use batched_mesh::*;
