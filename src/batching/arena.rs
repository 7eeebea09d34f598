//! Shared vertex and index buffers that source geometries are packed into.
//!
//! The first accepted geometry fixes the attribute layout (names, component
//! types, item sizes, normalization) and whether the batch is indexed.
//! Every later geometry must match it. Geometries are appended contiguously;
//! there is no reclamation.

use super::{BatchError, Result};
use crate::geometry::{BufferAttribute, BufferGeometry, ComponentType, POSITION};
use std::collections::BTreeMap;

/// Index counts above this use 32-bit indices.
const MAX_U16_INDEX_COUNT: u32 = 65534;

/// Element width of the shared index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

impl IndexFormat {
    /// Format for a buffer sized `max_index_count`.
    pub fn for_capacity(max_index_count: u32) -> Self {
        if max_index_count > MAX_U16_INDEX_COUNT {
            Self::Uint32
        } else {
            Self::Uint16
        }
    }

    /// Bytes per index.
    #[inline]
    pub const fn byte_size(self) -> u32 {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Largest index value representable.
    #[inline]
    pub const fn max_value(self) -> u64 {
        match self {
            Self::Uint16 => u16::MAX as u64,
            Self::Uint32 => u32::MAX as u64,
        }
    }

    fn allocate(self, len: usize) -> BufferAttribute {
        match self {
            Self::Uint16 => BufferAttribute::from_u16_indices(&vec![0; len]),
            Self::Uint32 => BufferAttribute::from_u32_indices(&vec![0; len]),
        }
    }
}

impl From<IndexFormat> for wgpu::IndexFormat {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

/// Where one geometry landed in the shared buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaAllocation {
    /// First vertex.
    pub vertex_start: u32,
    /// Number of vertices.
    pub vertex_count: u32,
    /// First index (0 for non-indexed batches).
    pub index_start: u32,
    /// Number of indices (0 for non-indexed batches).
    pub index_count: u32,
}

/// Layout fixed by the first accepted geometry.
#[derive(Debug)]
struct ArenaLayout {
    attributes: BTreeMap<String, BufferAttribute>,
    index: Option<(IndexFormat, BufferAttribute)>,
}

/// Fixed-capacity shared geometry storage.
#[derive(Debug)]
pub struct GeometryArena {
    max_vertex_count: u32,
    max_index_count: u32,
    vertex_count: u32,
    index_count: u32,
    layout: Option<ArenaLayout>,
}

impl GeometryArena {
    /// Create an empty arena. Buffers are allocated on the first write.
    pub fn new(max_vertex_count: u32, max_index_count: u32) -> Self {
        Self {
            max_vertex_count,
            max_index_count,
            vertex_count: 0,
            index_count: 0,
            layout: None,
        }
    }

    /// Vertices written so far.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Indices written so far.
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Vertex capacity.
    #[inline]
    pub fn max_vertex_count(&self) -> u32 {
        self.max_vertex_count
    }

    /// Index capacity.
    #[inline]
    pub fn max_index_count(&self) -> u32 {
        self.max_index_count
    }

    /// Whether the batch uses an index buffer. `false` before the first write.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.index_format().is_some()
    }

    /// Element width of the index buffer, if any.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.layout.as_ref()?.index.as_ref().map(|(format, _)| *format)
    }

    /// Shared attribute buffer by name.
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.layout.as_ref()?.attributes.get(name)
    }

    /// Shared attribute buffers in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &BufferAttribute)> {
        self.layout
            .iter()
            .flat_map(|layout| layout.attributes.iter().map(|(name, attr)| (name.as_str(), attr)))
    }

    /// Shared index buffer.
    pub fn index(&self) -> Option<&BufferAttribute> {
        self.layout.as_ref()?.index.as_ref().map(|(_, attr)| attr)
    }

    /// Byte size of one draw-range element: an index if indexed, otherwise
    /// one position component. Zero before the first write.
    pub fn element_byte_size(&self) -> u32 {
        let Some(layout) = &self.layout else {
            return 0;
        };
        match &layout.index {
            Some((format, _)) => format.byte_size(),
            None => layout
                .attributes
                .get(POSITION)
                .map_or(0, |attr| attr.array().component_type().byte_size() as u32),
        }
    }

    /// Check that `geometry` can be written, without touching any state.
    pub fn validate(&self, geometry: &BufferGeometry) -> Result<()> {
        let position = geometry
            .attribute(POSITION)
            .ok_or(BatchError::MissingPositionAttribute)?;
        let vertex_count = position.count();

        for (name, attr) in geometry.attributes() {
            if attr.array().len() % attr.item_size() != 0 {
                return Err(BatchError::PartialItem {
                    name: name.to_string(),
                    len: attr.array().len(),
                    item_size: attr.item_size(),
                });
            }
            if attr.count() != vertex_count {
                return Err(BatchError::InconsistentVertexCount {
                    name: name.to_string(),
                    count: attr.count(),
                    expected: vertex_count,
                });
            }
        }

        let index_format = match &self.layout {
            Some(layout) => {
                Self::check_layout(layout, geometry)?;
                layout.index.as_ref().map(|(format, _)| *format)
            }
            None => geometry
                .index()
                .map(|_| IndexFormat::for_capacity(self.max_index_count)),
        };

        let available_vertices = (self.max_vertex_count - self.vertex_count) as usize;
        if vertex_count > available_vertices {
            return Err(BatchError::VertexCapacityExceeded {
                requested: vertex_count,
                available: available_vertices,
            });
        }

        if let (Some(format), Some(index)) = (index_format, geometry.index()) {
            if !matches!(index.array().component_type(), ComponentType::U16 | ComponentType::U32) {
                return Err(BatchError::AttributeLayoutMismatch {
                    name: "index".to_string(),
                });
            }
            if index.item_size() != 1 {
                return Err(BatchError::IndexItemSize {
                    item_size: index.item_size(),
                });
            }

            let available_indices = (self.max_index_count - self.index_count) as usize;
            if index.count() > available_indices {
                return Err(BatchError::IndexCapacityExceeded {
                    requested: index.count(),
                    available: available_indices,
                });
            }

            for i in 0..index.count() {
                let value = index.get_index(i).unwrap_or(0);
                if value as usize >= vertex_count {
                    return Err(BatchError::SourceIndexOutOfRange {
                        index: value,
                        vertex_count,
                    });
                }
                let rebased = u64::from(self.vertex_count) + u64::from(value);
                if rebased > format.max_value() {
                    return Err(BatchError::IndexValueOverflow { value: rebased });
                }
            }
        }

        Ok(())
    }

    fn check_layout(layout: &ArenaLayout, geometry: &BufferGeometry) -> Result<()> {
        let expected: Vec<&str> = layout.attributes.keys().map(String::as_str).collect();
        let found: Vec<&str> = geometry.attributes().map(|(name, _)| name).collect();
        if expected != found {
            return Err(BatchError::AttributeSetMismatch {
                expected: expected.into_iter().map(str::to_string).collect(),
                found: found.into_iter().map(str::to_string).collect(),
            });
        }

        for (name, src) in geometry.attributes() {
            let Some(dst) = layout.attributes.get(name) else {
                continue;
            };
            if src.item_size() != dst.item_size()
                || src.normalized() != dst.normalized()
                || src.array().component_type() != dst.array().component_type()
            {
                return Err(BatchError::AttributeLayoutMismatch {
                    name: name.to_string(),
                });
            }
        }

        if layout.index.is_some() != geometry.has_index() {
            return Err(BatchError::IndexPresenceMismatch {
                batch_indexed: layout.index.is_some(),
            });
        }

        Ok(())
    }

    /// Append `geometry` to the shared buffers.
    ///
    /// Indices are rebased by the current vertex count so they address the
    /// geometry's own vertices in the shared range.
    pub fn write(&mut self, geometry: &BufferGeometry) -> Result<ArenaAllocation> {
        self.validate(geometry)?;

        let max_vertex_count = self.max_vertex_count as usize;
        let max_index_count = self.max_index_count;
        let layout = self.layout.get_or_insert_with(|| {
            let attributes: BTreeMap<String, BufferAttribute> = geometry
                .attributes()
                .map(|(name, src)| (name.to_string(), src.allocate_like(max_vertex_count)))
                .collect();
            let index = geometry.index().map(|_| {
                let format = IndexFormat::for_capacity(max_index_count);
                (format, format.allocate(max_index_count as usize))
            });
            log::info!(
                "Batch arena layout: attributes {:?}, index {:?}",
                attributes.keys().collect::<Vec<_>>(),
                index.as_ref().map(|(format, _)| *format),
            );
            ArenaLayout { attributes, index }
        });

        let vertex_start = self.vertex_count;
        let index_start = self.index_count;
        let vertex_count = geometry.vertex_count() as u32;

        for (name, src) in geometry.attributes() {
            if let Some(dst) = layout.attributes.get_mut(name) {
                let offset = vertex_start as usize * dst.item_size();
                let copied = dst.copy_array_at(src.array(), offset);
                if !copied {
                    log::error!("Batch arena: attribute '{}' rejected a validated copy at {}", name, offset);
                }
                debug_assert!(copied, "validated attribute '{name}' must fit the arena");
            }
        }

        let mut index_count = 0;
        if let (Some((_, dst)), Some(src)) = (layout.index.as_mut(), geometry.index()) {
            index_count = src.count() as u32;
            for i in 0..src.count() {
                let value = src.get_index(i).unwrap_or(0);
                let written = dst.set_index(index_start as usize + i, vertex_start + value);
                if !written {
                    log::error!("Batch arena: index {} rejected a validated write", index_start as usize + i);
                }
                debug_assert!(written, "validated index must fit the arena");
            }
            dst.mark_needs_update();
        }

        self.vertex_count += vertex_count;
        self.index_count += index_count;

        Ok(ArenaAllocation {
            vertex_start,
            vertex_count,
            index_start,
            index_count,
        })
    }

    /// Upload every dirty shared buffer.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let Some(layout) = &mut self.layout else {
            return;
        };
        for attr in layout.attributes.values_mut() {
            attr.upload(device, queue, wgpu::BufferUsages::VERTEX);
        }
        if let Some((_, index)) = &mut layout.index {
            index.upload(device, queue, wgpu::BufferUsages::INDEX);
        }
    }

    /// Check if any shared buffer awaits upload.
    pub fn needs_update(&self) -> bool {
        self.layout.as_ref().is_some_and(|layout| {
            layout.attributes.values().any(BufferAttribute::needs_update)
                || layout.index.as_ref().is_some_and(|(_, index)| index.needs_update())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AttributeArray;

    fn triangle_strip(vertex_count: usize) -> BufferGeometry {
        let positions: Vec<[f32; 3]> = (0..vertex_count).map(|i| [i as f32, 0.0, 0.0]).collect();
        let normals = vec![[0.0, 0.0, 1.0]; vertex_count];
        BufferGeometry::new()
            .with_attribute(POSITION, BufferAttribute::from_f32(&positions))
            .with_attribute("normal", BufferAttribute::from_f32(&normals))
    }

    fn indexed(vertex_count: usize, indices: &[u16]) -> BufferGeometry {
        triangle_strip(vertex_count).with_index(BufferAttribute::from_u16_indices(indices))
    }

    #[test]
    fn test_first_write_fixes_layout() {
        let mut arena = GeometryArena::new(100, 100);
        assert_eq!(arena.element_byte_size(), 0);
        arena.write(&indexed(3, &[0, 1, 2])).expect("fits");

        assert!(arena.is_indexed());
        assert_eq!(arena.index_format(), Some(IndexFormat::Uint16));
        assert_eq!(arena.attribute(POSITION).map(|a| a.count()), Some(100));
        assert_eq!(arena.index().map(|i| i.count()), Some(100));
        assert_eq!(arena.element_byte_size(), 2);
    }

    #[test]
    fn test_index_format_threshold() {
        assert_eq!(IndexFormat::for_capacity(65534), IndexFormat::Uint16);
        assert_eq!(IndexFormat::for_capacity(65535), IndexFormat::Uint32);
        assert_eq!(IndexFormat::for_capacity(262144), IndexFormat::Uint32);
    }

    #[test]
    fn test_indices_are_rebased() {
        let mut arena = GeometryArena::new(100, 100);
        arena.write(&indexed(3, &[0, 1, 2])).expect("fits");
        let second = arena.write(&indexed(4, &[0, 1, 2, 3])).expect("fits");

        assert_eq!(second.vertex_start, 3);
        assert_eq!(second.index_start, 3);
        let index = arena.index().expect("indexed");
        let values: Vec<u32> = (0..7).filter_map(|i| index.get_index(i)).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_vertex_data_is_appended() {
        let mut arena = GeometryArena::new(10, 0);
        arena.write(&triangle_strip(2)).expect("fits");
        arena.write(&triangle_strip(3)).expect("fits");

        let position = arena.attribute(POSITION).expect("position");
        let xs: Vec<f32> = (0..5).filter_map(|i| position.get_component(i, 0)).collect();
        assert_eq!(xs, vec![0.0, 1.0, 0.0, 1.0, 2.0]);
        assert_eq!(arena.vertex_count(), 5);
        assert_eq!(arena.element_byte_size(), 4);
    }

    #[test]
    fn test_vertex_capacity_is_checked() {
        let mut arena = GeometryArena::new(4, 0);
        arena.write(&triangle_strip(3)).expect("fits");
        assert_eq!(
            arena.write(&triangle_strip(2)),
            Err(BatchError::VertexCapacityExceeded { requested: 2, available: 1 })
        );
        assert_eq!(arena.vertex_count(), 3);
    }

    #[test]
    fn test_index_capacity_is_checked() {
        let mut arena = GeometryArena::new(100, 4);
        arena.write(&indexed(3, &[0, 1, 2])).expect("fits");
        assert_eq!(
            arena.write(&indexed(3, &[0, 1, 2])),
            Err(BatchError::IndexCapacityExceeded { requested: 3, available: 1 })
        );
        assert_eq!(arena.vertex_count(), 3);
        assert_eq!(arena.index_count(), 3);
    }

    #[test]
    fn test_attribute_set_mismatch() {
        let mut arena = GeometryArena::new(100, 0);
        arena.write(&triangle_strip(3)).expect("fits");

        let positions_only = BufferGeometry::new()
            .with_attribute(POSITION, BufferAttribute::from_f32(&[[0.0; 3]; 3]));
        assert!(matches!(
            arena.write(&positions_only),
            Err(BatchError::AttributeSetMismatch { .. })
        ));
    }

    #[test]
    fn test_attribute_layout_mismatch() {
        let mut arena = GeometryArena::new(100, 0);
        arena.write(&triangle_strip(3)).expect("fits");

        let odd_normals = BufferGeometry::new()
            .with_attribute(POSITION, BufferAttribute::from_f32(&[[0.0; 3]; 2]))
            .with_attribute("normal", BufferAttribute::new(AttributeArray::I8(vec![0; 6]), 3, true));
        assert_eq!(
            arena.write(&odd_normals),
            Err(BatchError::AttributeLayoutMismatch { name: "normal".to_string() })
        );
    }

    #[test]
    fn test_index_presence_mismatch() {
        let mut arena = GeometryArena::new(100, 100);
        arena.write(&indexed(3, &[0, 1, 2])).expect("fits");
        assert_eq!(
            arena.write(&triangle_strip(3)),
            Err(BatchError::IndexPresenceMismatch { batch_indexed: true })
        );
    }

    #[test]
    fn test_missing_position() {
        let mut arena = GeometryArena::new(100, 0);
        let geometry = BufferGeometry::new()
            .with_attribute("normal", BufferAttribute::from_f32(&[[0.0; 3]; 3]));
        assert_eq!(arena.write(&geometry), Err(BatchError::MissingPositionAttribute));
        assert_eq!(arena.element_byte_size(), 0);
    }

    #[test]
    fn test_inconsistent_vertex_count() {
        let arena = GeometryArena::new(100, 0);
        let geometry = BufferGeometry::new()
            .with_attribute(POSITION, BufferAttribute::from_f32(&[[0.0; 3]; 3]))
            .with_attribute("uv", BufferAttribute::from_f32(&[[0.0; 2]; 2]));
        assert!(matches!(
            arena.validate(&geometry),
            Err(BatchError::InconsistentVertexCount { count: 2, expected: 3, .. })
        ));
    }

    #[test]
    fn test_source_index_out_of_range() {
        let mut arena = GeometryArena::new(100, 100);
        assert_eq!(
            arena.write(&indexed(3, &[0, 1, 3])),
            Err(BatchError::SourceIndexOutOfRange { index: 3, vertex_count: 3 })
        );
    }

    #[test]
    fn test_rebased_index_overflow() {
        let mut arena = GeometryArena::new(70_000, 300);
        arena.write(&indexed(65_535, &[0, 1, 2])).expect("fits");
        assert_eq!(
            arena.write(&indexed(3, &[0, 1, 2])),
            Err(BatchError::IndexValueOverflow { value: 65_536 })
        );
    }

    #[test]
    fn test_partial_item_is_rejected() {
        let mut arena = GeometryArena::new(2, 0);
        let geometry = BufferGeometry::new().with_attribute(
            POSITION,
            BufferAttribute::new(AttributeArray::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]), 3, false),
        );
        assert_eq!(
            arena.write(&geometry),
            Err(BatchError::PartialItem {
                name: POSITION.to_string(),
                len: 7,
                item_size: 3,
            })
        );
        assert_eq!(arena.vertex_count(), 0);
        assert!(arena.attribute(POSITION).is_none());
    }

    #[test]
    fn test_multi_component_index_is_rejected() {
        let mut arena = GeometryArena::new(100, 100);
        let geometry = triangle_strip(4).with_index(BufferAttribute::new(
            AttributeArray::U16(vec![0, 1, 2, 3, 2, 1]),
            2,
            false,
        ));
        assert_eq!(
            arena.write(&geometry),
            Err(BatchError::IndexItemSize { item_size: 2 })
        );
        assert_eq!(arena.index_count(), 0);
        assert!(!arena.is_indexed());

        arena.write(&indexed(4, &[0, 1, 2, 3, 2, 1])).expect("fits");
        let index = arena.index().expect("indexed");
        let values: Vec<u32> = (0..6).filter_map(|i| index.get_index(i)).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 2, 1]);
    }

    #[test]
    fn test_written_vertices_hold_source_data() {
        let mut arena = GeometryArena::new(2, 0);
        let geometry = BufferGeometry::new()
            .with_attribute(POSITION, BufferAttribute::from_f32(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        arena.write(&geometry).expect("fits");

        let position = arena.attribute(POSITION).expect("position");
        let stored: Vec<f32> = (0..6).filter_map(|i| position.array().get(i)).map(|c| c as f32).collect();
        assert_eq!(stored, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_write_marks_dirty() {
        let mut arena = GeometryArena::new(10, 10);
        assert!(!arena.needs_update());
        arena.write(&indexed(3, &[0, 1, 2])).expect("fits");
        assert!(arena.needs_update());
    }
}
