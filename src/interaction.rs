use crate::{Point2f, Vec3f, Point3f, Float};
use crate::geometry::Normal3;

/// Offset used to keep spawned rays from re-intersecting the surface they leave.
pub const SHADOW_EPSILON: Float = 0.01;

#[derive(Clone, Copy, Debug)]
pub struct SurfaceInteraction {
    pub p: Point3f,

    /// (u, v) coordinates from the parametrization of the surface
    pub uv: Point2f,

    pub wo: Vec3f,

    /// Geometric normal, always pointing out of the shape
    pub n: Normal3,

    /// Partial derivative of the surface position along u, used for the shading frame
    pub dpdu: Vec3f,
}

impl SurfaceInteraction {
    pub fn new(
        p: Point3f,
        uv: Point2f,
        wo: Vec3f,
        n: Normal3,
        dpdu: Vec3f,
    ) -> Self {
        Self {
            p,
            uv,
            wo,
            n,
            dpdu,
        }
    }
}
