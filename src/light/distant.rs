use crate::spectrum::Spectrum;
use crate::{Vec3f, Point3f, Float, Point2f, Normal3, coordinate_system};
use crate::consts::PI;
use crate::geometry::Ray;
use crate::geometry::bounds::Bounds3f;
use crate::light::{Light, LightFlags, LiSample, EmittedRaySample, VisibilityTester};
use crate::sampling::concentric_sample_disk;
use cgmath::InnerSpace;

/// Light arriving from a single direction, like the sun.
pub struct DistantLight {
    radiance: Spectrum,

    /// Direction pointing towards the light
    dir: Vec3f,
    world_center: Point3f,
    world_radius: Float,
}

impl DistantLight {
    pub fn new(radiance: Spectrum, dir: Vec3f) -> Self {
        Self {
            radiance,
            dir: dir.normalize(),
            world_center: Point3f::new(0.0, 0.0, 0.0),
            world_radius: 0.0,
        }
    }
}

impl Light for DistantLight {
    fn flags(&self) -> LightFlags {
        LightFlags::DeltaDirection
    }

    fn preprocess(&mut self, world_bound: &Bounds3f) {
        let (world_center, world_radius) = world_bound.bounding_sphere();
        self.world_center = world_center;
        self.world_radius = world_radius;
    }

    fn sample_incident_radiance(&self, reference: Point3f, _u: Point2f) -> LiSample {
        LiSample {
            radiance: self.radiance,
            wi: self.dir,
            pdf: 1.0,
            distance: Float::INFINITY,
            emission_pdf: 0.0,
            cos_at_light: 1.0,
            vis: VisibilityTester::towards_infinity(reference, self.dir),
        }
    }

    fn pdf_incident_radiance(&self, _reference: Point3f, _wi: Vec3f) -> Float {
        0.0
    }

    /// Rays start on a disk the size of the scene, placed outside it facing the light.
    fn sample_emitted_ray(&self, u_pos: Point2f, _u_dir: Point2f) -> EmittedRaySample {
        let (v1, v2) = coordinate_system(self.dir);
        let cd = concentric_sample_disk(u_pos);
        let p_disk = self.world_center + (v1 * cd.x + v2 * cd.y) * self.world_radius;
        let origin = p_disk + self.dir * self.world_radius;
        let area = PI * self.world_radius * self.world_radius;
        EmittedRaySample {
            radiance: self.radiance,
            ray: Ray::new(origin, -self.dir),
            normal: Normal3(-self.dir),
            pdf_pos: if area > 0.0 { 1.0 / area } else { 0.0 },
            pdf_dir: 1.0,
            cos_at_light: 1.0,
        }
    }

    fn power(&self) -> Spectrum {
        self.radiance * (PI * self.world_radius * self.world_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_power_uses_scene_radius() {
        let mut light = DistantLight::new(Spectrum::uniform(1.0), vec3f!(0, 0, 2));
        assert!(light.power().is_black());
        light.preprocess(&Bounds3f::with_bounds(point3f!(-1, 0, 0), point3f!(1, 0, 0)));
        assert_abs_diff_eq!(light.power()[1], PI);

        let ls = light.sample_incident_radiance(point3f!(0, 0, 0), Point2f::new(0.1, 0.9));
        assert_abs_diff_eq!(ls.wi.z, 1.0);
        assert!(ls.vis.ray.t_max.is_infinite());
    }
}
