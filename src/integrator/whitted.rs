use bumpalo::Bump;
use tracing::info;

use crate::integrator::IntegratorRadiance;
use crate::geometry::Ray;
use crate::reflection::BxDFType;
use crate::sampler::PixelSample;
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::sat_dot;

/// Direct lighting from delta lights only, with no indirect bounces.
#[derive(Clone, Copy, Debug)]
pub struct WhittedIntegrator {
    pub max_depth: u16,
}

impl WhittedIntegrator {
    pub fn new(max_depth: u16) -> Self {
        Self { max_depth }
    }
}

impl Default for WhittedIntegrator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl IntegratorRadiance for WhittedIntegrator {
    fn incident_radiance(&self, ray: &Ray, scene: &Scene, sample: &PixelSample, arena: &Bump) -> Spectrum {
        if ray.depth > self.max_depth {
            return Spectrum::uniform(0.0);
        }

        let intersect = match scene.intersect(ray) {
            Some(intersect) => intersect,
            None => return scene.environment_emitted_radiance(ray),
        };

        let material = match intersect.material() {
            Some(material) => material,
            None => return Spectrum::uniform(0.0),
        };

        let bsdf = material.compute_bsdf(&intersect.si, arena);
        let n = intersect.si.n.0;
        let wo = -ray.dir;

        let mut radiance = Spectrum::uniform(0.0);
        for light in scene.lights.iter().filter(|light| light.is_delta()) {
            let li_sample = light.sample_incident_radiance(intersect.si.p, sample.light);

            if li_sample.radiance.is_black() || li_sample.pdf == 0.0 {
                continue;
            }

            let f = bsdf.f(wo, li_sample.wi, BxDFType::all());

            if !f.is_black() && li_sample.vis.unoccluded(scene) {
                radiance += li_sample.radiance * f * sat_dot(li_sample.wi, n) / li_sample.pdf;
            }
        }

        radiance
    }

    fn output_log(&self) {
        info!(max_depth = self.max_depth, "Whitted direct lighting integrator");
    }
}
