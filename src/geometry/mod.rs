//! Geometry module: source geometries handed to a batch.

mod buffer_attribute;
mod buffer_geometry;

pub use buffer_attribute::{AttributeArray, AttributeUsage, BufferAttribute, ComponentType};
pub use buffer_geometry::{BufferGeometry, POSITION};
