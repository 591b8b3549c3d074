use crate::{Float, Normal3, Point2f, Point3f, distance};
use crate::consts::{PI, TWO_PI};
use crate::geometry::Ray;
use crate::geometry::bounds::Bounds3f;
use crate::interaction::SurfaceInteraction;
use crate::sampling::uniform_sample_sphere;
use crate::shapes::Shape;
use cgmath::InnerSpace;

pub struct Sphere {
    center: Point3f,
    radius: Float,
}

impl Sphere {
    pub fn new(center: Point3f, radius: Float) -> Self {
        Self { center, radius: radius.abs() }
    }

    fn interaction_at(&self, p_hit: Point3f, ray: &Ray) -> SurfaceInteraction {
        let mut local = p_hit - self.center;
        // reproject onto the surface
        local *= self.radius / local.magnitude();
        if local.x == 0.0 && local.y == 0.0 { local.x = 1.0e-5 * self.radius }

        let mut phi = Float::atan2(local.y, local.x);
        if phi < 0.0 { phi += TWO_PI }
        let theta = Float::acos((local.z / self.radius).clamp(-1.0, 1.0));

        let dpdu = vec3f!(-TWO_PI * local.y, TWO_PI * local.x, 0.0);
        let n = Normal3(local / self.radius);

        SurfaceInteraction::new(
            self.center + local,
            Point2f::new(phi / TWO_PI, theta / PI),
            -ray.dir,
            n,
            dpdu,
        )
    }
}

impl Shape for Sphere {
    fn area(&self) -> Float {
        4.0 * PI * self.radius * self.radius
    }

    fn world_bound(&self) -> Bounds3f {
        let r = vec3f!(self.radius, self.radius, self.radius);
        Bounds3f::with_bounds(self.center - r, self.center + r)
    }

    fn intersect(&self, ray: &Ray) -> Option<(Float, SurfaceInteraction)> {
        let o = ray.origin - self.center;
        let a = ray.dir.magnitude2();
        let b = 2.0 * ray.dir.dot(o);
        let c = o.magnitude2() - self.radius * self.radius;

        let discrim = b * b - 4.0 * a * c;
        if discrim < 0.0 || a == 0.0 {
            return None;
        }
        let root = discrim.sqrt();
        let q = if b < 0.0 { -0.5 * (b - root) } else { -0.5 * (b + root) };
        let (mut t0, mut t1) = (q / a, if q != 0.0 { c / q } else { q / a });
        if t0 > t1 { std::mem::swap(&mut t0, &mut t1) }

        // find the closest valid intersection t value
        let t_hit = if ray.contains(t0) {
            t0
        } else if ray.contains(t1) {
            t1
        } else {
            return None;
        };

        Some((t_hit, self.interaction_at(ray.at(t_hit), ray)))
    }

    fn sample(&self, u: Point2f) -> (Point3f, Normal3) {
        let dir = uniform_sample_sphere(u);
        let p = self.center + dir * self.radius;
        debug_assert!((distance(p, self.center) - self.radius).abs() < 1.0e-3 * self.radius.max(1.0));
        (p, Normal3(dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_ray_hits_front() {
        let sphere = Sphere::new(point3f!(0, 0, 5), 1.0);
        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1));
        let (t, si) = sphere.intersect(&ray).unwrap();
        assert_abs_diff_eq!(t, 4.0, epsilon = 1.0e-5);
        assert_abs_diff_eq!(si.n.z, -1.0, epsilon = 1.0e-5);
        assert_abs_diff_eq!(si.wo.z, -1.0);
    }

    #[test]
    fn test_ray_from_inside_hits_far_side() {
        let sphere = Sphere::new(point3f!(0, 0, 0), 2.0);
        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(1, 0, 0));
        let (t, si) = sphere.intersect(&ray).unwrap();
        assert_abs_diff_eq!(t, 2.0, epsilon = 1.0e-5);
        assert_abs_diff_eq!(si.n.x, 1.0, epsilon = 1.0e-5);
    }

    #[test]
    fn test_segment_stops_short() {
        let sphere = Sphere::new(point3f!(0, 0, 5), 1.0);
        let ray = Ray::segment(point3f!(0, 0, 0), vec3f!(0, 0, 1), 0.0, 3.5);
        assert!(!sphere.intersect_test(&ray));
    }
}
