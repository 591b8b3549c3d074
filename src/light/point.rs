use crate::{Point3f, Float, Point2f, Vec3f, Normal3};
use crate::consts::PI;
use crate::geometry::Ray;
use crate::spectrum::Spectrum;
use crate::light::{Light, LightFlags, LiSample, EmittedRaySample, VisibilityTester};
use crate::sampling::{uniform_sample_sphere, uniform_sphere_pdf};
use cgmath::InnerSpace;

pub struct PointLight {
    position: Point3f,
    intensity: Spectrum,
}

impl PointLight {
    pub fn new(position: Point3f, intensity: Spectrum) -> Self {
        Self { position, intensity }
    }
}

impl Light for PointLight {
    fn flags(&self) -> LightFlags {
        LightFlags::DeltaPosition
    }

    fn sample_incident_radiance(&self, reference: Point3f, _u: Point2f) -> LiSample {
        let d = self.position - reference;
        let dist2 = d.magnitude2();
        if dist2 == 0.0 {
            return LiSample::black(reference);
        }
        let distance = dist2.sqrt();
        let wi = d / distance;
        LiSample {
            radiance: self.intensity / dist2,
            wi,
            pdf: 1.0,
            distance,
            emission_pdf: uniform_sphere_pdf(),
            cos_at_light: 1.0,
            vis: VisibilityTester::segment(reference, wi, distance),
        }
    }

    fn pdf_incident_radiance(&self, _reference: Point3f, _wi: Vec3f) -> Float {
        0.0
    }

    fn sample_emitted_ray(&self, _u_pos: Point2f, u_dir: Point2f) -> EmittedRaySample {
        let dir = uniform_sample_sphere(u_dir);
        EmittedRaySample {
            radiance: self.intensity,
            ray: Ray::new(self.position, dir),
            normal: Normal3(dir),
            pdf_pos: 1.0,
            pdf_dir: uniform_sphere_pdf(),
            cos_at_light: 1.0,
        }
    }

    fn power(&self) -> Spectrum {
        self.intensity * (4.0 * PI)
    }
}
