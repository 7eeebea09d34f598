//! # Math Module
//!
//! The 3D math needed by the batching core: vectors, matrices, and the
//! bounding spheres and frusta used for culling.
//!
//! Types follow a Three.js-like API and convert to and from `glam`.

mod vector3;
mod matrix4;
mod sphere;
mod frustum;

pub use vector3::Vector3;
pub use matrix4::Matrix4;
pub use sphere::Sphere;
pub use frustum::{Frustum, Plane};

/// Smallest power of two greater than or equal to `value`.
///
/// Values at or below 1 map to 1.
#[inline]
pub fn ceil_power_of_two(value: f32) -> u32 {
    if value <= 1.0 {
        return 1;
    }
    (value.ceil() as u32).next_power_of_two()
}
