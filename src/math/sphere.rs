//! Bounding sphere implementation.

use super::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// A bounding sphere defined by center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Vector3,
    /// Radius of the sphere.
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere.
    #[inline]
    pub const fn new(center: Vector3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Create a sphere that bounds a set of points.
    ///
    /// The center is the center of the points' bounding box; the radius is the
    /// largest distance from that center to any point.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Vector3> + Clone,
    {
        let Some((min, max)) = points
            .clone()
            .into_iter()
            .fold(None, |bounds: Option<(Vector3, Vector3)>, p| match bounds {
                Some((min, max)) => Some((min.min(&p), max.max(&p))),
                None => Some((p, p)),
            })
        else {
            return Self::default();
        };

        let center = (min + max) * 0.5;
        let max_dist_sq = points
            .into_iter()
            .fold(0.0_f32, |acc, p| acc.max(center.distance_to_squared(&p)));

        Self {
            center,
            radius: max_dist_sq.sqrt(),
        }
    }

    /// Check if a point is inside the sphere.
    #[inline]
    pub fn contains_point(&self, point: &Vector3) -> bool {
        self.center.distance_to_squared(point) <= self.radius * self.radius
    }

    /// Apply a Matrix4 transformation.
    ///
    /// The radius is scaled by the largest axis scale so the result still
    /// bounds the transformed geometry.
    pub fn apply_matrix4(&self, m: &Matrix4) -> Self {
        Self {
            center: m.transform_point(&self.center),
            radius: self.radius * m.get_max_scale(),
        }
    }

    /// Check if approximately equal.
    #[inline]
    pub fn approx_eq(&self, other: &Sphere, epsilon: f32) -> bool {
        self.center.approx_eq(&other.center, epsilon)
            && (self.radius - other.radius).abs() < epsilon
    }
}
