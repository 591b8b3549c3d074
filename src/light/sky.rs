use crate::spectrum::Spectrum;
use crate::{Vec3f, Point3f, Float, Point2f, Normal3, coordinate_system};
use crate::consts::{PI, INV_4_PI};
use crate::geometry::Ray;
use crate::geometry::bounds::Bounds3f;
use crate::light::{Light, LightFlags, LiSample, EmittedRaySample, VisibilityTester};
use crate::sampling::{concentric_sample_disk, uniform_sample_sphere};

/// Constant radiance arriving from every direction that escapes the scene.
pub struct SkyLight {
    radiance: Spectrum,
    world_center: Point3f,
    world_radius: Float,
}

impl SkyLight {
    pub fn new(radiance: Spectrum) -> Self {
        Self {
            radiance,
            world_center: Point3f::new(0.0, 0.0, 0.0),
            world_radius: 0.0,
        }
    }
}

impl Light for SkyLight {
    fn flags(&self) -> LightFlags {
        LightFlags::Infinite
    }

    fn preprocess(&mut self, world_bound: &Bounds3f) {
        let (world_center, world_radius) = world_bound.bounding_sphere();
        self.world_center = world_center;
        self.world_radius = world_radius;
    }

    fn sample_incident_radiance(&self, reference: Point3f, u: Point2f) -> LiSample {
        let wi = uniform_sample_sphere(u);
        LiSample {
            radiance: self.radiance,
            wi,
            pdf: INV_4_PI,
            distance: Float::INFINITY,
            emission_pdf: 0.0,
            cos_at_light: 1.0,
            vis: VisibilityTester::towards_infinity(reference, wi),
        }
    }

    fn pdf_incident_radiance(&self, _reference: Point3f, _wi: Vec3f) -> Float {
        INV_4_PI
    }

    fn sample_emitted_ray(&self, u_pos: Point2f, u_dir: Point2f) -> EmittedRaySample {
        let dir = -uniform_sample_sphere(u_dir);
        let (v1, v2) = coordinate_system(-dir);
        let cd = concentric_sample_disk(u_pos);
        let p_disk = self.world_center + (v1 * cd.x + v2 * cd.y) * self.world_radius;
        let area = PI * self.world_radius * self.world_radius;
        EmittedRaySample {
            radiance: self.radiance,
            ray: Ray::new(p_disk + -dir * self.world_radius, dir),
            normal: Normal3(dir),
            pdf_pos: if area > 0.0 { 1.0 / area } else { 0.0 },
            pdf_dir: INV_4_PI,
            cos_at_light: 1.0,
        }
    }

    fn power(&self) -> Spectrum {
        self.radiance * (PI * self.world_radius * self.world_radius)
    }

    fn environment_emitted_radiance(&self, _ray: &Ray) -> Spectrum {
        self.radiance
    }
}
