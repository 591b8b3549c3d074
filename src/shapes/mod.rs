use crate::geometry::bounds::Bounds3f;
use crate::geometry::{Ray, Normal3};
use crate::interaction::SurfaceInteraction;
use crate::sampling::{uniform_sample_hemisphere, uniform_hemisphere_pdf};
use crate::{Float, Point2f, Point3f, Vec3f, abs_dot, coordinate_system};
use cgmath::InnerSpace;

pub mod sphere;
pub mod disk;

pub use sphere::Sphere;
pub use disk::Disk;

/// A point sampled on a shape, with the density of having picked it.
#[derive(Clone, Copy, Debug)]
pub struct ShapeSample {
    pub p: Point3f,
    pub n: Normal3,

    /// Probability density with respect to solid angle as seen from the reference point
    pub pdf: Float,
}

pub trait Shape: Sync + Send {
    fn area(&self) -> Float;

    fn world_bound(&self) -> Bounds3f;

    /// Find the closest intersection with `t` inside the ray's interval.
    fn intersect(&self, ray: &Ray) -> Option<(Float, SurfaceInteraction)>;

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }

    /// Sample a point uniformly by area, returning it with the surface normal there.
    fn sample(&self, u: Point2f) -> (Point3f, Normal3);

    /// Sample a point as seen from `reference`. The pdf is converted from area to solid
    /// angle and is zero when the sampled point is seen edge-on.
    fn sample_from_ref(&self, reference: Point3f, u: Point2f) -> ShapeSample {
        let (p, n) = self.sample(u);
        let d = p - reference;
        let dist2 = d.magnitude2();
        if dist2 == 0.0 {
            return ShapeSample { p, n, pdf: 0.0 };
        }
        let wi = d / dist2.sqrt();
        let cos = abs_dot(n.0, -wi);
        let pdf = if cos == 0.0 { 0.0 } else { dist2 / (cos * self.area()) };
        ShapeSample { p, n, pdf: if pdf.is_finite() { pdf } else { 0.0 } }
    }

    /// Solid angle density of sampling direction `wi` from `reference` with
    /// `sample_from_ref`.
    fn pdf_from_ref(&self, reference: Point3f, wi: Vec3f) -> Float {
        let ray = Ray::new(reference, wi);
        match self.intersect(&ray) {
            Some((_, si)) => {
                let cos = abs_dot(si.n.0, -wi);
                if cos == 0.0 {
                    return 0.0;
                }
                let pdf = (si.p - reference).magnitude2() / (cos * self.area());
                if pdf.is_finite() { pdf } else { 0.0 }
            },
            None => 0.0
        }
    }

    /// Sample a ray leaving the surface, uniformly over the hemisphere around the normal.
    /// Returns the ray, the normal at its origin and the density of its direction.
    fn sample_ray(&self, u_pos: Point2f, u_dir: Point2f) -> (Ray, Normal3, Float) {
        let (p, n) = self.sample(u_pos);
        let local = uniform_sample_hemisphere(u_dir);
        let (s, t) = coordinate_system(n.0);
        let dir = s * local.x + t * local.y + n.0 * local.z;
        (Ray::new(p, dir), n, uniform_hemisphere_pdf())
    }
}
