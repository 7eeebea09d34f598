//! Per-geometry transforms packed into a float texture.
//!
//! Layout (1 matrix = 4 texels, one RGBA texel per matrix column):
//!
//! ```text
//!   RGBA RGBA RGBA RGBA   => column 0, column 1, column 2, column 3
//!    8x8  texture holds   16 matrices
//!   16x16 texture holds   64 matrices
//!   32x32 texture holds  256 matrices
//!   64x64 texture holds 1024 matrices
//! ```
//!
//! A vertex shader fetches matrix `i` from row `floor(i * 4 / size)`,
//! starting at column `(i * 4) mod size`. Producer and consumer must agree on
//! this formula; bump [`LAYOUT_VERSION`] if it ever changes.

use super::{BatchError, Result};
use crate::math::{ceil_power_of_two, Matrix4};
use crate::texture::DataTexture;

/// Version of the matrix texture layout shared with the decoding shader.
pub const LAYOUT_VERSION: u32 = 1;

/// Texels used by one matrix.
pub const TEXELS_PER_MATRIX: u32 = 4;

/// Floats used by one matrix.
pub const FLOATS_PER_MATRIX: usize = 16;

/// Smallest texture side the store will allocate.
const MIN_SIZE: u32 = 4;

/// Geometry of the matrix texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixTextureLayout {
    size: u32,
}

impl MatrixTextureLayout {
    /// Layout for a store holding at least `matrix_count` matrices.
    pub fn for_capacity(matrix_count: u32) -> Self {
        let side = ((matrix_count as f32) * TEXELS_PER_MATRIX as f32).sqrt();
        Self {
            size: ceil_power_of_two(side).max(MIN_SIZE),
        }
    }

    /// Texture width and height in texels.
    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Matrices the texture can hold.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.size * self.size / TEXELS_PER_MATRIX
    }

    /// Texel `(x, y)` holding the first column of matrix `index`.
    #[inline]
    pub fn texel_origin(&self, index: u32) -> (u32, u32) {
        let j = index * TEXELS_PER_MATRIX;
        (j % self.size, j / self.size)
    }
}

/// Fixed-capacity array of 4x4 matrices backed by a [`DataTexture`].
#[derive(Debug)]
pub struct TransformStore {
    layout: MatrixTextureLayout,
    /// Slots addressable through the store.
    capacity: u32,
    texture: DataTexture,
}

impl TransformStore {
    /// Create a store with `capacity` slots, all zero.
    pub fn new(capacity: u32) -> Self {
        let layout = MatrixTextureLayout::for_capacity(capacity);
        debug_assert!(layout.capacity() >= capacity);
        Self {
            layout,
            capacity,
            texture: DataTexture::new_rgba_f32(layout.size(), "Batched Mesh Matrices"),
        }
    }

    /// Texture layout.
    #[inline]
    pub fn layout(&self) -> MatrixTextureLayout {
        self.layout
    }

    /// Number of addressable slots.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn offset(&self, slot: usize) -> Result<usize> {
        if slot < self.capacity as usize {
            Ok(slot * FLOATS_PER_MATRIX)
        } else {
            Err(BatchError::InvalidId {
                id: slot,
                count: self.capacity as usize,
            })
        }
    }

    /// Write the matrix at `slot` and flag the texture for upload.
    pub fn set(&mut self, slot: usize, matrix: &Matrix4) -> Result<()> {
        let offset = self.offset(slot)?;
        matrix.write_to_slice(self.texture.data_mut(), offset);
        Ok(())
    }

    /// Read the matrix at `slot`.
    pub fn get(&self, slot: usize) -> Result<Matrix4> {
        let offset = self.offset(slot)?;
        Matrix4::from_slice(self.texture.data(), offset).ok_or(BatchError::InvalidId {
            id: slot,
            count: self.capacity as usize,
        })
    }

    /// The backing texture.
    #[inline]
    pub fn texture(&self) -> &DataTexture {
        &self.texture
    }

    /// The backing texture, mutably (for upload and disposal).
    #[inline]
    pub fn texture_mut(&mut self) -> &mut DataTexture {
        &mut self.texture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(MatrixTextureLayout::for_capacity(1).size(), 4);
        assert_eq!(MatrixTextureLayout::for_capacity(4).size(), 4);
        assert_eq!(MatrixTextureLayout::for_capacity(5).size(), 8);
        assert_eq!(MatrixTextureLayout::for_capacity(16).size(), 8);
        assert_eq!(MatrixTextureLayout::for_capacity(64).size(), 16);
        assert_eq!(MatrixTextureLayout::for_capacity(1024).size(), 64);

        let layout = MatrixTextureLayout::for_capacity(256);
        assert_eq!(layout.size(), 32);
        assert_eq!(layout.capacity(), 256);
    }

    #[test]
    fn test_capacity_covers_request() {
        for count in [1, 3, 17, 100, 255, 257, 1000, 4097] {
            assert!(MatrixTextureLayout::for_capacity(count).capacity() >= count);
        }
    }

    #[test]
    fn test_texel_origin() {
        let layout = MatrixTextureLayout::for_capacity(256);
        assert_eq!(layout.texel_origin(0), (0, 0));
        assert_eq!(layout.texel_origin(7), (28, 0));
        assert_eq!(layout.texel_origin(8), (0, 1));
        assert_eq!(layout.texel_origin(255), (28, 31));
    }

    #[test]
    fn test_matrix_lands_on_its_texels() {
        let mut store = TransformStore::new(256);
        let m = Matrix4::from_translation(&Vector3::new(7.0, 8.0, 9.0));
        store.set(9, &m).expect("slot in range");

        let (x, y) = store.layout().texel_origin(9);
        let size = store.layout().size() as usize;
        let texel = (y as usize * size + x as usize) * 4;
        // Fourth texel is the translation column.
        assert_eq!(&store.texture().data()[texel + 12..texel + 16], &[7.0, 8.0, 9.0, 1.0]);
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut store = TransformStore::new(16);
        let m = Matrix4::from_cols_array([
            1.0, 2.0, 0.5, 0.0,
            -3.0, 0.25, 4.0, 0.1,
            2.0, 0.0, 7.0, 0.0,
            10.0, -20.0, 30.0, 1.0,
        ]);
        store.set(15, &m).expect("slot in range");
        assert_eq!(store.get(15), Ok(m));
    }

    #[test]
    fn test_out_of_range_slot() {
        let mut store = TransformStore::new(16);
        assert_eq!(
            store.set(16, &Matrix4::IDENTITY),
            Err(BatchError::InvalidId { id: 16, count: 16 })
        );
        assert!(store.get(16).is_err());
    }

    #[test]
    fn test_write_marks_dirty() {
        let mut store = TransformStore::new(4);
        store.texture_mut().clear_needs_update();
        store.set(0, &Matrix4::IDENTITY).expect("slot in range");
        assert!(store.texture().needs_update());
    }
}
