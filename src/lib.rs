#[macro_use] pub mod macros; // must stay at the top
pub mod geometry;
pub mod interaction;
pub mod spectrum;
pub mod sampling;
pub mod fresnel;
pub mod reflection;
pub mod id_arena;
pub mod material;
pub mod shapes;
pub mod primitive;
pub mod light;
pub mod scene;
pub mod sampler;
pub mod integrator;

pub use geometry::*;
pub use interaction::SurfaceInteraction;

use cgmath::{Point2, Point3, Vector2, Vector3, InnerSpace};

pub type Float = f32;

pub type Point2f = Point2<Float>;
pub type Point3f = Point3<Float>;
pub type Vec2f = Vector2<Float>;
pub type Vec3f = Vector3<Float>;

pub mod consts {
    pub use std::f32::consts::*;

    pub const TWO_PI: crate::Float = 2.0 * PI;
    pub const INV_2_PI: crate::Float = 1.0 / TWO_PI;
    pub const INV_4_PI: crate::Float = 1.0 / (4.0 * PI);
}

pub fn abs_dot(v1: Vec3f, v2: Vec3f) -> Float {
    v1.dot(v2).abs()
}

/// Clamped dot product, zero when the vectors point into opposite hemispheres.
pub fn sat_dot(v1: Vec3f, v2: Vec3f) -> Float {
    v1.dot(v2).max(0.0)
}

/// Flip `v` so that it lies in the same hemisphere as `reference`.
pub fn faceforward(v: Vec3f, reference: Vec3f) -> Vec3f {
    if v.dot(reference) < 0.0 { -v } else { v }
}

pub fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float) -> Vec3f {
    Vec3f::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
}

/// Build two vectors that together with the normalized `v1` form an orthonormal basis.
pub fn coordinate_system(v1: Vec3f) -> (Vec3f, Vec3f) {
    let v2 = if v1.x.abs() > v1.y.abs() {
        Vec3f::new(-v1.z, 0.0, v1.x) / Float::sqrt(v1.x * v1.x + v1.z * v1.z)
    } else {
        Vec3f::new(0.0, v1.z, -v1.y) / Float::sqrt(v1.y * v1.y + v1.z * v1.z)
    };
    let v3 = v1.cross(v2);
    (v2, v3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_coordinate_system_is_orthonormal() {
        let n = vec3f!(0.3, -0.5, 0.8).normalize();
        let (s, t) = coordinate_system(n);
        assert_abs_diff_eq!(s.dot(n), 0.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(t.dot(n), 0.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(s.dot(t), 0.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(s.magnitude(), 1.0, epsilon = 1.0e-6);
        assert_abs_diff_eq!(t.magnitude(), 1.0, epsilon = 1.0e-6);
    }
}
