//! 4x4 Matrix implementation.

use super::Vector3;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A 4x4 matrix stored in column-major order.
/// Used for per-entry batch transforms and the batch world matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Matrix4 {
    /// Matrix elements in column-major order.
    /// [m00, m10, m20, m30, m01, m11, m21, m31, m02, m12, m22, m32, m03, m13, m23, m33]
    pub elements: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Create a new Matrix4 from elements in row-major order.
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        m00: f32, m01: f32, m02: f32, m03: f32,
        m10: f32, m11: f32, m12: f32, m13: f32,
        m20: f32, m21: f32, m22: f32, m23: f32,
        m30: f32, m31: f32, m32: f32, m33: f32,
    ) -> Self {
        Self {
            elements: [
                m00, m10, m20, m30,
                m01, m11, m21, m31,
                m02, m12, m22, m32,
                m03, m13, m23, m33,
            ],
        }
    }

    /// Create from column-major array.
    #[inline]
    pub const fn from_cols_array(elements: [f32; 16]) -> Self {
        Self { elements }
    }

    /// Get the column-major array.
    #[inline]
    pub const fn to_cols_array(&self) -> [f32; 16] {
        self.elements
    }

    /// Read 16 column-major floats starting at `offset`.
    ///
    /// Returns `None` if the slice is too short.
    pub fn from_slice(array: &[f32], offset: usize) -> Option<Self> {
        let src = array.get(offset..offset.checked_add(16)?)?;
        let mut elements = [0.0; 16];
        elements.copy_from_slice(src);
        Some(Self { elements })
    }

    /// Write the 16 column-major floats into `array` starting at `offset`.
    ///
    /// Returns `false` (and writes nothing) if the slice is too short.
    pub fn write_to_slice(&self, array: &mut [f32], offset: usize) -> bool {
        let Some(end) = offset.checked_add(16) else {
            return false;
        };
        match array.get_mut(offset..end) {
            Some(dst) => {
                dst.copy_from_slice(&self.elements);
                true
            }
            None => false,
        }
    }

    /// Get the maximum scale component.
    pub fn get_max_scale(&self) -> f32 {
        let e = &self.elements;
        let sx2 = e[0] * e[0] + e[1] * e[1] + e[2] * e[2];
        let sy2 = e[4] * e[4] + e[5] * e[5] + e[6] * e[6];
        let sz2 = e[8] * e[8] + e[9] * e[9] + e[10] * e[10];
        sx2.max(sy2).max(sz2).sqrt()
    }

    /// Create a translation matrix.
    pub fn from_translation(v: &Vector3) -> Self {
        Self {
            elements: [
                1.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                v.x, v.y, v.z, 1.0,
            ],
        }
    }

    /// Create a scale matrix.
    pub fn from_scale(v: &Vector3) -> Self {
        Self {
            elements: [
                v.x, 0.0, 0.0, 0.0,
                0.0, v.y, 0.0, 0.0,
                0.0, 0.0, v.z, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Create a rotation matrix around the Y axis.
    pub fn from_rotation_y(theta: f32) -> Self {
        let c = theta.cos();
        let s = theta.sin();
        Self {
            elements: [
                c, 0.0, -s, 0.0,
                0.0, 1.0, 0.0, 0.0,
                s, 0.0, c, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ],
        }
    }

    /// Create a perspective projection matrix (0-1 depth range).
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fov_y / 2.0).tan();
        Self {
            elements: [
                f / aspect, 0.0, 0.0, 0.0,
                0.0, f, 0.0, 0.0,
                0.0, 0.0, far / (near - far), -1.0,
                0.0, 0.0, (near * far) / (near - far), 0.0,
            ],
        }
    }

    /// Multiply this matrix by another (self * other).
    pub fn multiply(&self, other: &Matrix4) -> Self {
        let a = &self.elements;
        let b = &other.elements;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = a[row] * b[col * 4]
                    + a[4 + row] * b[col * 4 + 1]
                    + a[8 + row] * b[col * 4 + 2]
                    + a[12 + row] * b[col * 4 + 3];
            }
        }
        Self { elements: out }
    }

    /// Transform a point (applies translation and perspective divide).
    pub fn transform_point(&self, v: &Vector3) -> Vector3 {
        let e = &self.elements;
        let w = 1.0 / (e[3] * v.x + e[7] * v.y + e[11] * v.z + e[15]);
        Vector3 {
            x: (e[0] * v.x + e[4] * v.y + e[8] * v.z + e[12]) * w,
            y: (e[1] * v.x + e[5] * v.y + e[9] * v.z + e[13]) * w,
            z: (e[2] * v.x + e[6] * v.y + e[10] * v.z + e[14]) * w,
        }
    }

    /// Check if approximately equal.
    pub fn approx_eq(&self, other: &Matrix4, epsilon: f32) -> bool {
        self.elements.iter()
            .zip(other.elements.iter())
            .all(|(a, b)| (a - b).abs() < epsilon)
    }
}

impl std::ops::Mul for Matrix4 {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        self.multiply(&other)
    }
}

impl From<glam::Mat4> for Matrix4 {
    fn from(m: glam::Mat4) -> Self {
        Self::from_cols_array(m.to_cols_array())
    }
}

impl From<Matrix4> for glam::Mat4 {
    fn from(m: Matrix4) -> Self {
        glam::Mat4::from_cols_array(&m.elements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiply_matches_glam() {
        let a = Matrix4::from_translation(&Vector3::new(1.0, 2.0, 3.0));
        let b = Matrix4::from_rotation_y(0.7) * Matrix4::from_scale(&Vector3::new(2.0, 1.0, 0.5));
        let ours = a * b;
        let theirs: Matrix4 = (glam::Mat4::from(a) * glam::Mat4::from(b)).into();
        assert!(ours.approx_eq(&theirs, 1e-5));
    }

    #[test]
    fn test_slice_round_trip() {
        let m = Matrix4::new(
            1.0, 2.0, 3.0, 4.0,
            5.0, 6.0, 7.0, 8.0,
            9.0, 10.0, 11.0, 12.0,
            13.0, 14.0, 15.0, 16.0,
        );
        let mut array = [0.0; 40];
        assert!(m.write_to_slice(&mut array, 16));
        assert_eq!(Matrix4::from_slice(&array, 16), Some(m));
        assert!(!m.write_to_slice(&mut array, 30));
        assert_eq!(Matrix4::from_slice(&array, 30), None);
    }

    #[test]
    fn test_max_scale() {
        let m = Matrix4::from_scale(&Vector3::new(1.0, 3.0, 2.0));
        assert!((m.get_max_scale() - 3.0).abs() < 1e-6);
    }
}
