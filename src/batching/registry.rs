//! Per-geometry metadata: draw range, bounds and visibility.
//!
//! Ids are dense and handed out in submission order. Each id reaches its
//! record (and its transform slot) through an `id -> slot` table. Slots are
//! currently equal to ids; the table lets a later compaction move records
//! without invalidating ids already handed out.

use super::{BatchError, Result};
use crate::math::Sphere;

/// Stable handle to one geometry in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(u32);

impl BatchId {
    /// Create from a raw index.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata for one batched geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchEntry {
    /// Offset into the index buffer (indexed) or vertex buffers, in elements.
    pub draw_start: u32,
    /// Elements to draw.
    pub draw_count: u32,
    /// Bounds in the geometry's local space. Never recomputed.
    pub bounding_sphere: Sphere,
    /// User-controlled visibility.
    pub visible: bool,
    /// Result of the last frustum test.
    pub in_viewport: bool,
}

impl BatchEntry {
    fn new(draw_start: u32, draw_count: u32, bounding_sphere: Sphere) -> Self {
        Self {
            draw_start,
            draw_count,
            bounding_sphere,
            visible: true,
            in_viewport: true,
        }
    }

    /// Whether the entry's range should be drawn this frame.
    #[inline]
    pub fn is_drawn(&self) -> bool {
        self.visible && self.in_viewport
    }
}

/// One entry together with the slot its transform lives in.
#[derive(Debug, Clone, Copy)]
pub struct EntryHandle<'a> {
    /// Entry id.
    pub id: BatchId,
    /// Slot of the entry's record and transform.
    pub slot: usize,
    /// The record.
    pub entry: &'a BatchEntry,
}

/// Mutable counterpart of [`EntryHandle`].
#[derive(Debug)]
pub struct EntryHandleMut<'a> {
    /// Entry id.
    pub id: BatchId,
    /// Slot of the entry's record and transform.
    pub slot: usize,
    /// The record.
    pub entry: &'a mut BatchEntry,
}

/// Dense, append-only table of [`BatchEntry`] records.
#[derive(Debug, Clone)]
pub struct BatchRegistry {
    capacity: u32,
    /// Records, indexed by slot.
    entries: Vec<BatchEntry>,
    /// Slot of each id.
    id_to_slot: Vec<usize>,
    /// Id stored in each slot.
    slot_to_id: Vec<BatchId>,
}

impl BatchRegistry {
    /// Create an empty registry holding at most `capacity` entries.
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity as usize),
            id_to_slot: Vec::with_capacity(capacity as usize),
            slot_to_id: Vec::with_capacity(capacity as usize),
        }
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if no further entry fits.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity as usize
    }

    /// Slot a new entry would occupy.
    pub fn next_slot(&self) -> Result<usize> {
        if self.is_full() {
            return Err(BatchError::GeometryCapacityExceeded { max: self.capacity });
        }
        Ok(self.entries.len())
    }

    /// Append an entry and return its id.
    pub fn add_entry(&mut self, draw_start: u32, draw_count: u32, bounding_sphere: Sphere) -> Result<BatchId> {
        let slot = self.next_slot()?;
        let id = BatchId(self.id_to_slot.len() as u32);

        self.entries.push(BatchEntry::new(draw_start, draw_count, bounding_sphere));
        self.id_to_slot.push(slot);
        self.slot_to_id.push(id);
        Ok(id)
    }

    /// Slot of `id`.
    pub fn slot(&self, id: BatchId) -> Result<usize> {
        self.id_to_slot
            .get(id.index())
            .copied()
            .ok_or(BatchError::InvalidId {
                id: id.index(),
                count: self.entries.len(),
            })
    }

    /// Entry for `id` with its slot.
    pub fn get(&self, id: BatchId) -> Result<EntryHandle<'_>> {
        let slot = self.slot(id)?;
        Ok(EntryHandle {
            id,
            slot,
            entry: &self.entries[slot],
        })
    }

    /// Mutable entry for `id` with its slot.
    pub fn get_mut(&mut self, id: BatchId) -> Result<EntryHandleMut<'_>> {
        let slot = self.slot(id)?;
        Ok(EntryHandleMut {
            id,
            slot,
            entry: &mut self.entries[slot],
        })
    }

    /// Local-space bounding sphere of `id`.
    pub fn bounding_sphere(&self, id: BatchId) -> Result<Sphere> {
        Ok(self.get(id)?.entry.bounding_sphere)
    }

    /// Set the visibility of `id`.
    pub fn set_visible(&mut self, id: BatchId, visible: bool) -> Result<()> {
        self.get_mut(id)?.entry.visible = visible;
        Ok(())
    }

    /// Visibility of `id`.
    pub fn visible(&self, id: BatchId) -> Result<bool> {
        Ok(self.get(id)?.entry.visible)
    }

    /// Last frustum test result of `id`.
    pub fn in_viewport(&self, id: BatchId) -> Result<bool> {
        Ok(self.get(id)?.entry.in_viewport)
    }

    /// Mark every entry as inside the viewport.
    pub fn reset_in_viewport(&mut self) {
        for entry in &mut self.entries {
            entry.in_viewport = true;
        }
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = EntryHandle<'_>> {
        self.id_to_slot
            .iter()
            .enumerate()
            .map(|(id, &slot)| EntryHandle {
                id: BatchId(id as u32),
                slot,
                entry: &self.entries[slot],
            })
    }

    /// Entries in slot order, mutably. Slot order equals id order while no
    /// compaction has happened.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = EntryHandleMut<'_>> {
        self.entries
            .iter_mut()
            .zip(self.slot_to_id.iter())
            .enumerate()
            .map(|(slot, (entry, &id))| EntryHandleMut { id, slot, entry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    fn unit() -> Sphere {
        Sphere::new(Vector3::ZERO, 1.0)
    }

    #[test]
    fn test_ids_are_dense() {
        let mut registry = BatchRegistry::new(8);
        let ids: Vec<BatchId> = (0..5)
            .map(|i| registry.add_entry(i * 3, 3, unit()).expect("capacity"))
            .collect();
        assert_eq!(ids, (0..5).map(BatchId::new).collect::<Vec<_>>());
        assert_eq!(registry.len(), 5);
        assert!(registry.iter().all(|h| h.slot == h.id.index()));
    }

    #[test]
    fn test_defaults_visible_and_in_viewport() {
        let mut registry = BatchRegistry::new(1);
        let id = registry.add_entry(0, 3, unit()).expect("capacity");
        assert_eq!(registry.visible(id), Ok(true));
        assert_eq!(registry.in_viewport(id), Ok(true));
    }

    #[test]
    fn test_capacity() {
        let mut registry = BatchRegistry::new(1);
        registry.add_entry(0, 3, unit()).expect("capacity");
        assert!(registry.is_full());
        assert_eq!(
            registry.add_entry(3, 3, unit()),
            Err(BatchError::GeometryCapacityExceeded { max: 1 })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_id() {
        let mut registry = BatchRegistry::new(4);
        registry.add_entry(0, 3, unit()).expect("capacity");
        let missing = BatchId::new(1);
        assert_eq!(registry.visible(missing), Err(BatchError::InvalidId { id: 1, count: 1 }));
        assert!(registry.set_visible(missing, false).is_err());
        assert!(registry.bounding_sphere(missing).is_err());
    }

    #[test]
    fn test_reset_in_viewport() {
        let mut registry = BatchRegistry::new(4);
        let id = registry.add_entry(0, 3, unit()).expect("capacity");
        for handle in registry.iter_mut() {
            handle.entry.in_viewport = false;
        }
        assert_eq!(registry.in_viewport(id), Ok(false));
        registry.reset_in_viewport();
        assert_eq!(registry.in_viewport(id), Ok(true));
    }
}
