use crate::{Float, Normal3, Point2f, Point3f, Vec3f, coordinate_system};
use crate::consts::{PI, TWO_PI};
use crate::geometry::Ray;
use crate::geometry::bounds::Bounds3f;
use crate::interaction::SurfaceInteraction;
use crate::sampling::concentric_sample_disk;
use crate::shapes::Shape;
use cgmath::InnerSpace;

/// Flat disk facing along its normal.
pub struct Disk {
    center: Point3f,
    n: Normal3,
    radius: Float,
    /// Tangent frame spanning the disk's plane
    s: Vec3f,
    t: Vec3f,
}

impl Disk {
    pub fn new(center: Point3f, normal: Vec3f, radius: Float) -> Self {
        let n = normal.normalize();
        let (s, t) = coordinate_system(n);
        Self { center, n: Normal3(n), radius: radius.abs(), s, t }
    }
}

impl Shape for Disk {
    fn area(&self) -> Float {
        PI * self.radius * self.radius
    }

    fn world_bound(&self) -> Bounds3f {
        // extent of the disk along each axis
        let n = self.n.0;
        let ext = vec3f!(
            self.radius * Float::sqrt(Float::max(0.0, 1.0 - n.x * n.x)),
            self.radius * Float::sqrt(Float::max(0.0, 1.0 - n.y * n.y)),
            self.radius * Float::sqrt(Float::max(0.0, 1.0 - n.z * n.z))
        );
        Bounds3f::with_bounds(self.center - ext, self.center + ext)
    }

    fn intersect(&self, ray: &Ray) -> Option<(Float, SurfaceInteraction)> {
        let denom = ray.dir.dot(self.n.0);
        if denom == 0.0 {
            return None;
        }
        let t_hit = (self.center - ray.origin).dot(self.n.0) / denom;
        if !ray.contains(t_hit) {
            return None;
        }

        let p_hit = ray.at(t_hit);
        let d = p_hit - self.center;
        let dist2 = d.magnitude2();
        if dist2 > self.radius * self.radius {
            return None;
        }

        let (x, y) = (d.dot(self.s), d.dot(self.t));
        let mut phi = Float::atan2(y, x);
        if phi < 0.0 { phi += TWO_PI }
        let uv = Point2f::new(phi / TWO_PI, 1.0 - dist2.sqrt() / self.radius);

        let si = SurfaceInteraction::new(p_hit, uv, -ray.dir, self.n, self.s);
        Some((t_hit, si))
    }

    fn sample(&self, u: Point2f) -> (Point3f, Normal3) {
        let pd = concentric_sample_disk(u);
        let p = self.center + self.s * (pd.x * self.radius) + self.t * (pd.y * self.radius);
        (p, self.n)
    }
}
