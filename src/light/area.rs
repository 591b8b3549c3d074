use std::sync::Arc;
use crate::{Float, Point2f, Point3f, Vec3f, sat_dot};
use crate::consts::TWO_PI;
use crate::geometry::Ray;
use crate::interaction::{SurfaceInteraction, SHADOW_EPSILON};
use crate::light::{Light, LightFlags, LiSample, EmittedRaySample, VisibilityTester};
use crate::sampling::uniform_hemisphere_pdf;
use crate::shapes::Shape;
use crate::spectrum::Spectrum;
use cgmath::InnerSpace;

/// Emission from a light leaving a point on an area light, with the densities a
/// bidirectional method needs to weight it.
#[derive(Clone, Copy, Debug)]
pub struct AreaEmission {
    pub radiance: Spectrum,
    pub pdf_area: Float,
    pub emission_pdf: Float,
}

/// Emits constant radiance from the outward side of a shape.
pub struct DiffuseAreaLight {
    intensity: Spectrum,
    shape: Arc<dyn Shape>,
    area: Float,
}

impl DiffuseAreaLight {
    pub fn new(intensity: Spectrum, shape: Arc<dyn Shape>) -> Self {
        let area = shape.area();
        Self { intensity, shape, area }
    }

    pub fn shape(&self) -> &dyn Shape {
        self.shape.as_ref()
    }

    /// Radiance leaving `si` (a point on this light) in direction `wo`.
    pub fn le(&self, si: &SurfaceInteraction, wo: Vec3f) -> AreaEmission {
        let cos = sat_dot(wo, si.n.0);
        if cos == 0.0 {
            return AreaEmission { radiance: Spectrum::uniform(0.0), pdf_area: 0.0, emission_pdf: 0.0 };
        }
        AreaEmission {
            radiance: self.intensity,
            pdf_area: 1.0 / self.area,
            emission_pdf: uniform_hemisphere_pdf() / self.area,
        }
    }

    /// Find where `ray` hits the light and evaluate the emission back along it.
    pub fn le_ray(&self, ray: &Ray) -> Option<(SurfaceInteraction, AreaEmission)> {
        self.shape.intersect(ray).map(|(_, si)| {
            let emission = self.le(&si, -ray.dir);
            (si, emission)
        })
    }
}

impl Light for DiffuseAreaLight {
    fn flags(&self) -> LightFlags {
        LightFlags::Area
    }

    fn sample_incident_radiance(&self, reference: Point3f, u: Point2f) -> LiSample {
        let ss = self.shape.sample_from_ref(reference, u);
        let d = ss.p - reference;
        let distance = d.magnitude();
        if ss.pdf == 0.0 || distance == 0.0 {
            return LiSample::black(reference);
        }
        let wi = d / distance;
        LiSample {
            radiance: self.intensity,
            wi,
            pdf: ss.pdf,
            distance,
            emission_pdf: uniform_hemisphere_pdf() / self.area,
            cos_at_light: (-wi).dot(ss.n.0),
            vis: VisibilityTester::segment(reference, wi, distance),
        }
    }

    fn pdf_incident_radiance(&self, reference: Point3f, wi: Vec3f) -> Float {
        self.shape.pdf_from_ref(reference, wi)
    }

    fn sample_emitted_ray(&self, u_pos: Point2f, u_dir: Point2f) -> EmittedRaySample {
        let (mut ray, normal, pdf_dir) = self.shape.sample_ray(u_pos, u_dir);
        ray.t_min = SHADOW_EPSILON;
        EmittedRaySample {
            radiance: self.intensity,
            cos_at_light: sat_dot(ray.dir, normal.0),
            ray,
            normal,
            pdf_pos: 1.0 / self.area,
            pdf_dir,
        }
    }

    fn power(&self) -> Spectrum {
        self.intensity * (self.area * TWO_PI)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Disk, Sphere};
    use crate::consts::PI;
    use approx::assert_abs_diff_eq;

    fn disk_light() -> DiffuseAreaLight {
        // Faces down towards the origin
        let disk = Disk::new(point3f!(0, 0, 2), vec3f!(0, 0, -1), 1.0);
        DiffuseAreaLight::new(Spectrum::uniform(3.0), Arc::new(disk))
    }

    #[test]
    fn test_incident_sample() {
        let light = disk_light();
        let ls = light.sample_incident_radiance(point3f!(0, 0, 0), Point2f::new(0.5, 0.5));
        assert!(ls.pdf > 0.0);
        assert_abs_diff_eq!(ls.radiance[2], 3.0);
        assert_abs_diff_eq!(ls.emission_pdf, uniform_hemisphere_pdf() / PI, epsilon = 1e-6);
        assert!(ls.cos_at_light > 0.0);
        assert_abs_diff_eq!(ls.vis.ray.t_min, 0.01);
        assert_abs_diff_eq!(ls.vis.ray.t_max, ls.distance - 0.01, epsilon = 1e-6);
        assert_abs_diff_eq!(ls.pdf, light.pdf_incident_radiance(point3f!(0, 0, 0), ls.wi), epsilon = 1e-3);
    }

    #[test]
    fn test_edge_on_sample_is_black() {
        let light = disk_light();
        let ls = light.sample_incident_radiance(point3f!(5, 0, 2), Point2f::new(0.5, 0.5));
        assert_eq!(ls.pdf, 0.0);
        assert!(ls.radiance.is_black());
    }

    #[test]
    fn test_power() {
        let light = DiffuseAreaLight::new(Spectrum::uniform(2.0), Arc::new(Sphere::new(point3f!(0, 0, 0), 1.0)));
        assert_abs_diff_eq!(light.power()[0], 2.0 * 4.0 * PI * TWO_PI, epsilon = 1e-3);
    }

    #[test]
    fn test_le_is_one_sided() {
        let light = disk_light();
        let (si, front) = light.le_ray(&Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1))).unwrap();
        assert_abs_diff_eq!(front.radiance[0], 3.0);
        assert_abs_diff_eq!(front.pdf_area, 1.0 / PI, epsilon = 1e-6);
        assert_abs_diff_eq!(front.emission_pdf, uniform_hemisphere_pdf() / PI, epsilon = 1e-6);

        let back = light.le(&si, vec3f!(0, 0, 1));
        assert!(back.radiance.is_black());
        assert_eq!(back.pdf_area, 0.0);
        assert_eq!(back.emission_pdf, 0.0);
    }

    #[test]
    fn test_emitted_ray_leaves_surface() {
        let light = disk_light();
        let es = light.sample_emitted_ray(Point2f::new(0.3, 0.7), Point2f::new(0.2, 0.4));
        assert_abs_diff_eq!(es.ray.t_min, 0.01);
        assert_abs_diff_eq!(es.pdf_pos, 1.0 / PI, epsilon = 1e-6);
        assert!(es.cos_at_light >= 0.0);
        assert!(es.ray.dir.z <= 0.0);
    }
}
