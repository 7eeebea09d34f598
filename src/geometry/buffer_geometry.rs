//! Buffer geometry: named vertex attributes plus an optional index list.

use super::BufferAttribute;
use crate::math::{Sphere, Vector3};
use std::collections::BTreeMap;

/// Name of the attribute every batched geometry must carry.
pub const POSITION: &str = "position";

/// A geometry made of named vertex attributes and an optional index list.
#[derive(Debug, Clone, Default)]
pub struct BufferGeometry {
    /// Vertex attributes keyed by name.
    attributes: BTreeMap<String, BufferAttribute>,
    /// Index list.
    index: Option<BufferAttribute>,
    /// Bounding sphere.
    bounding_sphere: Option<Sphere>,
}

impl BufferGeometry {
    /// Create a new empty buffer geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_attribute`](Self::set_attribute).
    pub fn with_attribute(mut self, name: impl Into<String>, attribute: BufferAttribute) -> Self {
        self.set_attribute(name, attribute);
        self
    }

    /// Builder form of [`set_index`](Self::set_index).
    pub fn with_index(mut self, index: BufferAttribute) -> Self {
        self.set_index(Some(index));
        self
    }

    /// Set (or replace) a named attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, attribute: BufferAttribute) {
        self.attributes.insert(name.into(), attribute);
    }

    /// Get a named attribute.
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.attributes.get(name)
    }

    /// Get a named attribute mutably.
    #[inline]
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut BufferAttribute> {
        self.attributes.get_mut(name)
    }

    /// Iterate attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &BufferAttribute)> {
        self.attributes.iter().map(|(name, attr)| (name.as_str(), attr))
    }

    /// Iterate attributes mutably in name order.
    pub fn attributes_mut(&mut self) -> impl Iterator<Item = (&str, &mut BufferAttribute)> {
        self.attributes.iter_mut().map(|(name, attr)| (name.as_str(), attr))
    }

    /// Attribute names in order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Set or clear the index list.
    pub fn set_index(&mut self, index: Option<BufferAttribute>) {
        self.index = index;
    }

    /// The index list.
    #[inline]
    pub fn index(&self) -> Option<&BufferAttribute> {
        self.index.as_ref()
    }

    /// The index list, mutably.
    #[inline]
    pub fn index_mut(&mut self) -> Option<&mut BufferAttribute> {
        self.index.as_mut()
    }

    /// Check if the geometry has an index list.
    #[inline]
    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Number of vertices, taken from the position attribute.
    pub fn vertex_count(&self) -> usize {
        self.attribute(POSITION).map_or(0, BufferAttribute::count)
    }

    /// Get the bounding sphere.
    #[inline]
    pub fn bounding_sphere(&self) -> Option<&Sphere> {
        self.bounding_sphere.as_ref()
    }

    /// Set the bounding sphere.
    pub fn set_bounding_sphere(&mut self, sphere: Sphere) {
        self.bounding_sphere = Some(sphere);
    }

    /// Bounding sphere of the position attribute, without caching it.
    ///
    /// Missing y/z components read as zero. Returns `None` without positions.
    pub fn position_bounds(&self) -> Option<Sphere> {
        let position = self.attribute(POSITION)?;
        let points = (0..position.count()).map(|i| {
            Vector3::new(
                position.get_component(i, 0).unwrap_or(0.0),
                position.get_component(i, 1).unwrap_or(0.0),
                position.get_component(i, 2).unwrap_or(0.0),
            )
        });
        Some(Sphere::from_points(points))
    }

    /// Compute and cache the bounding sphere from positions.
    pub fn compute_bounding_sphere(&mut self) {
        self.bounding_sphere = self.position_bounds();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count_from_position() {
        let geometry = BufferGeometry::new()
            .with_attribute(POSITION, BufferAttribute::from_f32(&[[0.0; 3]; 5]))
            .with_attribute("uv", BufferAttribute::from_f32(&[[0.0; 2]; 5]));
        assert_eq!(geometry.vertex_count(), 5);
        assert_eq!(geometry.attribute_names(), vec!["position".to_string(), "uv".to_string()]);
        assert!(!geometry.has_index());
    }

    #[test]
    fn test_compute_bounding_sphere() {
        let mut geometry = BufferGeometry::new().with_attribute(
            POSITION,
            BufferAttribute::from_f32(&[[-1.0, -1.0, 0.0], [1.0, 1.0, 0.0]]),
        );
        assert!(geometry.bounding_sphere().is_none());
        geometry.compute_bounding_sphere();
        let sphere = geometry.bounding_sphere().copied().unwrap_or_default();
        assert!(sphere.approx_eq(&Sphere::new(Vector3::ZERO, 2.0_f32.sqrt()), 1e-6));
    }

    #[test]
    fn test_no_position_no_bounds() {
        let geometry = BufferGeometry::new();
        assert_eq!(geometry.vertex_count(), 0);
        assert!(geometry.position_bounds().is_none());
    }
}
