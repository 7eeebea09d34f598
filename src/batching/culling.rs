//! Per-frame frustum culling and draw-range collection.
//!
//! A frame runs [`reset_viewport`] (always) and then optionally
//! [`resolve_frustum`]; [`collect_draw_ranges`] turns the result into one
//! `(byte offset, count)` pair per entry for a multi-draw call.

use super::{BatchRegistry, TransformStore};
use crate::math::{Frustum, Matrix4};

/// Sub-range of the shared buffer to draw for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrawRange {
    /// Offset of the first element in bytes.
    pub byte_offset: u64,
    /// Elements to draw; zero means skip.
    pub count: u32,
}

impl DrawRange {
    /// Check if nothing should be drawn.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Offset of the first element in elements of `element_size` bytes.
    #[inline]
    pub fn first_element(&self, element_size: u32) -> u32 {
        if element_size == 0 {
            0
        } else {
            (self.byte_offset / u64::from(element_size)) as u32
        }
    }

    /// Element range, as wgpu draw calls take it.
    #[inline]
    pub fn elements(&self, element_size: u32) -> std::ops::Range<u32> {
        let first = self.first_element(element_size);
        first..first + self.count
    }
}

/// Draw ranges of a batch in entry-id order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrawRangeList {
    ranges: Vec<DrawRange>,
    element_size: u32,
}

impl DrawRangeList {
    /// All ranges, including empty ones.
    #[inline]
    pub fn as_slice(&self) -> &[DrawRange] {
        &self.ranges
    }

    /// Number of ranges (one per entry).
    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Check if the batch had no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Bytes per element the offsets were computed with.
    #[inline]
    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    /// Ranges that draw something, for backends without multi-draw.
    pub fn non_empty(&self) -> impl Iterator<Item = &DrawRange> {
        self.ranges.iter().filter(|range| !range.is_empty())
    }

    /// Total elements drawn.
    pub fn total_count(&self) -> u64 {
        self.ranges.iter().map(|range| u64::from(range.count)).sum()
    }

    /// Split into parallel start and count arrays, reusing their storage.
    pub fn write_starts_and_counts(&self, starts: &mut Vec<u64>, counts: &mut Vec<u32>) {
        starts.clear();
        counts.clear();
        starts.extend(self.ranges.iter().map(|range| range.byte_offset));
        counts.extend(self.ranges.iter().map(|range| range.count));
    }
}

impl std::ops::Index<usize> for DrawRangeList {
    type Output = DrawRange;
    fn index(&self, index: usize) -> &DrawRange {
        &self.ranges[index]
    }
}

/// Mark every entry as inside the viewport.
///
/// Skipping [`resolve_frustum`] afterwards draws every visible entry.
pub fn reset_viewport(registry: &mut BatchRegistry) {
    registry.reset_in_viewport();
}

/// Test each visible entry's bounds against `frustum`.
///
/// Each bound is moved by its entry transform and then by `world_matrix`.
/// Hidden entries are skipped and keep their previous flag, as are entries
/// whose slot has no transform. Returns `true` if any visible entry intersects.
pub fn resolve_frustum(
    registry: &mut BatchRegistry,
    transforms: &TransformStore,
    frustum: &Frustum,
    world_matrix: &Matrix4,
) -> bool {
    let mut intersected = false;

    for handle in registry.iter_mut() {
        if !handle.entry.visible {
            continue;
        }

        let local = transforms.get(handle.slot);
        debug_assert!(
            local.is_ok(),
            "entry {} slot {} outside the transform store",
            handle.id,
            handle.slot
        );
        let local = match local {
            Ok(matrix) => matrix,
            Err(err) => {
                log::warn!("Batch culling: entry {} has no transform: {}", handle.id, err);
                continue;
            }
        };
        let sphere = handle
            .entry
            .bounding_sphere
            .apply_matrix4(&local)
            .apply_matrix4(world_matrix);

        handle.entry.in_viewport = frustum.intersects_sphere(&sphere);
        intersected |= handle.entry.in_viewport;
    }

    intersected
}

/// One range per entry, in id order. Hidden or culled entries get a zero count
/// but keep their slot so the shader's draw id still maps to the right matrix.
pub fn collect_draw_ranges(registry: &BatchRegistry, element_size: u32) -> DrawRangeList {
    let ranges = registry
        .iter()
        .map(|handle| DrawRange {
            byte_offset: u64::from(handle.entry.draw_start) * u64::from(element_size),
            count: if handle.entry.is_drawn() { handle.entry.draw_count } else { 0 },
        })
        .collect();

    DrawRangeList {
        ranges,
        element_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Sphere, Vector3};

    fn camera_frustum() -> Frustum {
        Frustum::from_matrix(&Matrix4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0))
    }

    /// Three unit spheres at the origin, placed in front of the camera by their transforms.
    fn scene() -> (BatchRegistry, TransformStore) {
        let mut registry = BatchRegistry::new(4);
        let mut transforms = TransformStore::new(4);
        for (i, z) in [-5.0, -10.0, -20.0].into_iter().enumerate() {
            registry
                .add_entry(i as u32 * 3, 3, Sphere::new(Vector3::ZERO, 1.0))
                .expect("capacity");
            transforms
                .set(i, &Matrix4::from_translation(&Vector3::new(0.0, 0.0, z)))
                .expect("slot");
        }
        (registry, transforms)
    }

    #[test]
    fn test_all_inside() {
        let (mut registry, transforms) = scene();
        assert!(resolve_frustum(&mut registry, &transforms, &camera_frustum(), &Matrix4::IDENTITY));
        let ranges = collect_draw_ranges(&registry, 2);
        assert_eq!(ranges.total_count(), 9);
        assert_eq!(ranges[2], DrawRange { byte_offset: 12, count: 3 });
    }

    #[test]
    fn test_entry_transform_moves_bounds_out() {
        let (mut registry, mut transforms) = scene();
        transforms
            .set(1, &Matrix4::from_translation(&Vector3::new(0.0, 0.0, 50.0)))
            .expect("slot");

        assert!(resolve_frustum(&mut registry, &transforms, &camera_frustum(), &Matrix4::IDENTITY));
        let ranges = collect_draw_ranges(&registry, 2);
        assert_eq!(ranges[1], DrawRange { byte_offset: 6, count: 0 });
        assert_eq!(ranges.non_empty().count(), 2);
    }

    #[test]
    fn test_world_matrix_applies_after_entry_transform() {
        let (mut registry, transforms) = scene();
        let behind = Matrix4::from_translation(&Vector3::new(0.0, 0.0, 100.0));
        assert!(!resolve_frustum(&mut registry, &transforms, &camera_frustum(), &behind));
        assert_eq!(collect_draw_ranges(&registry, 2).total_count(), 0);
    }

    #[test]
    fn test_hidden_entries_keep_stale_flag_until_reset() {
        let (mut registry, transforms) = scene();
        let behind = Matrix4::from_translation(&Vector3::new(0.0, 0.0, 100.0));
        resolve_frustum(&mut registry, &transforms, &camera_frustum(), &behind);

        let id = crate::batching::BatchId::new(0);
        registry.set_visible(id, false).expect("valid id");
        resolve_frustum(&mut registry, &transforms, &camera_frustum(), &Matrix4::IDENTITY);
        assert_eq!(registry.in_viewport(id), Ok(false));

        reset_viewport(&mut registry);
        assert_eq!(registry.in_viewport(id), Ok(true));
        registry.set_visible(id, true).expect("valid id");
        assert_eq!(collect_draw_ranges(&registry, 2)[0].count, 3);
    }

    #[test]
    fn test_starts_and_counts_reuse_storage() {
        let (mut registry, _) = scene();
        registry
            .set_visible(crate::batching::BatchId::new(1), false)
            .expect("valid id");
        let ranges = collect_draw_ranges(&registry, 4);

        let mut starts = vec![99; 8];
        let mut counts = vec![99; 8];
        ranges.write_starts_and_counts(&mut starts, &mut counts);
        assert_eq!(starts, vec![0, 12, 24]);
        assert_eq!(counts, vec![3, 0, 3]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside the transform store")]
    fn test_missing_transform_is_not_treated_as_identity() {
        let (mut registry, _) = scene();
        let transforms = TransformStore::new(2);
        resolve_frustum(&mut registry, &transforms, &camera_frustum(), &Matrix4::IDENTITY);
    }

    #[test]
    fn test_range_elements() {
        let range = DrawRange { byte_offset: 12, count: 4 };
        assert_eq!(range.first_element(4), 3);
        assert_eq!(range.elements(4), 3..7);
        assert_eq!(range.first_element(0), 0);
    }
}
