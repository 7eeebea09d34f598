//! View frustum implementation for culling.

use super::{Matrix4, Sphere, Vector3};
use serde::{Deserialize, Serialize};

/// One bounding plane of a frustum: `normal . p + constant = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal, pointing into the frustum.
    pub normal: Vector3,
    /// Signed offset along the normal.
    pub constant: f32,
}

impl Plane {
    /// Plane from raw `ax + by + cz + d` coefficients, rescaled to a unit normal.
    fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vector3::new(a, b, c);
        let len = normal.length();
        if len == 0.0 {
            return Self { normal, constant: d };
        }
        Self {
            normal: normal * (1.0 / len),
            constant: d / len,
        }
    }

    /// Signed distance of `point`; positive on the inside.
    #[inline]
    pub fn distance_to_point(&self, point: &Vector3) -> f32 {
        self.normal.dot(point) + self.constant
    }
}

/// A view frustum defined by 6 planes.
/// Used for frustum culling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frustum {
    /// The six planes of the frustum, normals pointing inward.
    /// Order: left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Default for Frustum {
    fn default() -> Self {
        Self {
            planes: [Plane::default(); 6],
        }
    }
}

impl Frustum {
    /// Create a frustum from a projection-view matrix (0-1 depth range).
    pub fn from_matrix(m: &Matrix4) -> Self {
        let e = &m.elements;
        let plane = Plane::from_coefficients;

        Self {
            planes: [
                plane(e[3] + e[0], e[7] + e[4], e[11] + e[8], e[15] + e[12]),
                plane(e[3] - e[0], e[7] - e[4], e[11] - e[8], e[15] - e[12]),
                plane(e[3] + e[1], e[7] + e[5], e[11] + e[9], e[15] + e[13]),
                plane(e[3] - e[1], e[7] - e[5], e[11] - e[9], e[15] - e[13]),
                plane(e[2], e[6], e[10], e[14]),
                plane(e[3] - e[2], e[7] - e[6], e[11] - e[10], e[15] - e[14]),
            ],
        }
    }

    /// Check if a point is inside the frustum.
    pub fn contains_point(&self, point: &Vector3) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Check if a sphere intersects the frustum.
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(&sphere.center) >= -sphere.radius)
    }
}
