//! Batched mesh: many geometries sharing one material, drawn with one multi-draw call.

use crate::batching::{
    culling, BatchConfig, BatchError, BatchId, BatchRegistry, DrawRangeList, GeometryArena, Result,
    TransformStore,
};
use crate::geometry::{BufferAttribute, BufferGeometry};
use crate::math::{Frustum, Matrix4, Sphere};

/// A batched mesh merges many independent geometries into shared buffers.
///
/// Each added geometry gets a [`BatchId`], its own transform (sampled from
/// the matrices texture by the vertex shader) and its own visibility. Each
/// frame the renderer calls [`prepare_draw`](Self::prepare_draw) and issues
/// one multi-draw call over the returned ranges.
pub struct BatchedMesh {
    /// Object name.
    name: String,
    /// Capacities.
    config: BatchConfig,
    /// Shared vertex and index buffers.
    arena: GeometryArena,
    /// Per-geometry metadata.
    registry: BatchRegistry,
    /// Per-geometry transforms.
    transforms: TransformStore,
    /// World matrix of the whole batch.
    world_matrix: Matrix4,
    /// Visibility flag.
    pub visible: bool,
    /// Per-geometry frustum culling.
    pub frustum_culled: bool,
}

impl BatchedMesh {
    /// Create a batched mesh with default capacities.
    pub fn new() -> Self {
        Self::with_config(BatchConfig::default())
    }

    /// Create a batched mesh with the given capacities.
    pub fn with_config(config: BatchConfig) -> Self {
        let transforms = TransformStore::new(config.max_geometry_count);
        log::debug!(
            "BatchedMesh: {} geometries, {} vertices, {} indices, {}x{} matrix texture",
            config.max_geometry_count,
            config.max_vertex_count,
            config.max_index_count,
            transforms.layout().size(),
            transforms.layout().size(),
        );

        Self {
            name: String::new(),
            config,
            arena: GeometryArena::new(config.max_vertex_count, config.max_index_count),
            registry: BatchRegistry::new(config.max_geometry_count),
            transforms,
            world_matrix: Matrix4::IDENTITY,
            visible: true,
            frustum_culled: true,
        }
    }

    /// Get the name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Capacities this batch was created with.
    #[inline]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// World matrix of the whole batch.
    #[inline]
    pub fn world_matrix(&self) -> &Matrix4 {
        &self.world_matrix
    }

    /// Set the world matrix (normally fed from the scene graph).
    pub fn set_world_matrix(&mut self, matrix: Matrix4) {
        self.world_matrix = matrix;
    }

    /// Copy `geometry` into the shared buffers and return its id.
    ///
    /// The new geometry starts visible with an identity transform. Its bounding
    /// sphere is taken from the geometry or computed from its positions. On
    /// error nothing is modified.
    pub fn add_geometry(&mut self, geometry: &BufferGeometry) -> Result<BatchId> {
        self.registry.next_slot().inspect_err(|_| {
            log::warn!(
                "BatchedMesh '{}': geometry capacity ({}) exhausted",
                self.name,
                self.config.max_geometry_count
            );
        })?;

        let bounding_sphere = match geometry.bounding_sphere() {
            Some(sphere) => *sphere,
            None => geometry
                .position_bounds()
                .ok_or(BatchError::MissingPositionAttribute)?,
        };

        let allocation = self.arena.write(geometry).inspect_err(|err| {
            if matches!(
                err,
                BatchError::VertexCapacityExceeded { .. } | BatchError::IndexCapacityExceeded { .. }
            ) {
                log::warn!("BatchedMesh '{}': {}", self.name, err);
            }
        })?;

        let (draw_start, draw_count) = if self.arena.is_indexed() {
            (allocation.index_start, allocation.index_count)
        } else {
            (allocation.vertex_start, allocation.vertex_count)
        };

        let id = self.registry.add_entry(draw_start, draw_count, bounding_sphere)?;
        let slot = self.registry.slot(id)?;
        self.transforms.set(slot, &Matrix4::IDENTITY)?;

        log::debug!(
            "BatchedMesh '{}': geometry {} -> vertices {}..{}, draw range {}+{}",
            self.name,
            id,
            allocation.vertex_start,
            allocation.vertex_start + allocation.vertex_count,
            draw_start,
            draw_count,
        );

        Ok(id)
    }

    /// Number of geometries added.
    #[inline]
    pub fn geometry_count(&self) -> usize {
        self.registry.len()
    }

    /// Local-space bounding sphere of a geometry.
    pub fn bounding_sphere_at(&self, id: BatchId) -> Result<Sphere> {
        self.registry.bounding_sphere(id)
    }

    /// Set the transform of a geometry.
    pub fn set_matrix_at(&mut self, id: BatchId, matrix: &Matrix4) -> Result<()> {
        let slot = self.registry.slot(id)?;
        self.transforms.set(slot, matrix)
    }

    /// Get the transform of a geometry.
    pub fn matrix_at(&self, id: BatchId) -> Result<Matrix4> {
        let slot = self.registry.slot(id)?;
        self.transforms.get(slot)
    }

    /// Show or hide a geometry.
    pub fn set_visibility_at(&mut self, id: BatchId, visible: bool) -> Result<()> {
        self.registry.set_visible(id, visible)
    }

    /// Whether a geometry is visible.
    pub fn visibility_at(&self, id: BatchId) -> Result<bool> {
        self.registry.visible(id)
    }

    /// Whether a geometry passed the last frustum test.
    pub fn in_viewport_at(&self, id: BatchId) -> Result<bool> {
        self.registry.in_viewport(id)
    }

    /// Mark every geometry as inside the viewport.
    pub fn reset_culling_status(&mut self) {
        culling::reset_viewport(&mut self.registry);
    }

    /// Frustum-test every visible geometry. Returns `true` if any intersects.
    pub fn intersects_frustum(&mut self, frustum: &Frustum) -> bool {
        culling::resolve_frustum(&mut self.registry, &self.transforms, frustum, &self.world_matrix)
    }

    /// Draw ranges for the current visibility and culling state.
    pub fn draw_ranges(&self) -> DrawRangeList {
        culling::collect_draw_ranges(&self.registry, self.arena.element_byte_size())
    }

    /// Fill parallel byte-offset and count arrays, one entry per geometry.
    pub fn draw_starts_and_counts(&self, starts: &mut Vec<u64>, counts: &mut Vec<u32>) {
        self.draw_ranges().write_starts_and_counts(starts, counts);
    }

    /// Reset culling, test against `frustum` if culling applies, and collect ranges.
    pub fn prepare_draw(&mut self, frustum: Option<&Frustum>) -> DrawRangeList {
        self.reset_culling_status();
        if let (true, Some(frustum)) = (self.frustum_culled, frustum) {
            self.intersects_frustum(frustum);
        }
        self.draw_ranges()
    }

    /// Shared attribute buffer by name.
    pub fn attribute(&self, name: &str) -> Option<&BufferAttribute> {
        self.arena.attribute(name)
    }

    /// Shared index buffer.
    pub fn index(&self) -> Option<&BufferAttribute> {
        self.arena.index()
    }

    /// Index format for the draw call, if indexed.
    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.arena.index_format().map(Into::into)
    }

    /// The shared geometry buffers.
    #[inline]
    pub fn arena(&self) -> &GeometryArena {
        &self.arena
    }

    /// The per-geometry transforms and their texture.
    #[inline]
    pub fn transforms(&self) -> &TransformStore {
        &self.transforms
    }

    /// Side of the matrices texture; the decoding shader needs it.
    #[inline]
    pub fn matrices_texture_size(&self) -> u32 {
        self.transforms.layout().size()
    }

    /// Check if any buffer or the matrices texture awaits upload.
    pub fn needs_update(&self) -> bool {
        self.arena.needs_update() || self.transforms.texture().needs_update()
    }

    /// Upload dirty vertex, index and matrix data.
    pub fn update_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.arena.upload(device, queue);
        self.transforms.texture_mut().upload(device, queue);
    }

    /// Release the matrices texture. Calling it again is a no-op.
    pub fn dispose(&mut self) {
        self.transforms.texture_mut().dispose();
    }
}

impl Default for BatchedMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BatchedMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchedMesh")
            .field("name", &self.name)
            .field("geometries", &self.registry.len())
            .field("vertices", &self.arena.vertex_count())
            .field("indices", &self.arena.index_count())
            .field("visible", &self.visible)
            .finish()
    }
}
