use bumpalo::Bump;
use rayon::prelude::*;
use tracing::warn;

use crate::geometry::Ray;
use crate::sampler::{Sampler, PixelSample};
use crate::scene::Scene;
use crate::spectrum::Spectrum;

pub mod whitted;

pub use whitted::WhittedIntegrator;

/// Rays evaluated by one worker before it picks up more work.
const RAY_CHUNK_SIZE: usize = 64;

pub trait IntegratorRadiance: Sync + Send {
    /// Radiance arriving at the origin of `ray` from its direction. BSDFs built on the
    /// way are allocated in `arena`.
    fn incident_radiance(
        &self,
        ray: &Ray,
        scene: &Scene,
        sample: &PixelSample,
        arena: &Bump,
    ) -> Spectrum;

    /// Log a description of the integrator.
    fn output_log(&self);
}

pub struct SamplerIntegrator<R: IntegratorRadiance> {
    pub sampler: Box<dyn Sampler>,
    pub radiance: R,
}

impl<R: IntegratorRadiance> SamplerIntegrator<R> {
    pub fn new(sampler: Box<dyn Sampler>, radiance: R) -> Self {
        Self { sampler, radiance }
    }

    /// Evaluate every ray in parallel, returning radiance in the same order. Each chunk
    /// of rays gets its own arena and a sampler seeded by the chunk index, so results do
    /// not depend on scheduling.
    pub fn render_rays(&self, scene: &Scene, rays: &[Ray]) -> Vec<Spectrum> {
        rays.par_chunks(RAY_CHUNK_SIZE)
            .enumerate()
            .flat_map_iter(|(chunk_id, chunk)| {
                let mut arena = Bump::new();
                let mut sampler = self.sampler.clone_with_seed(chunk_id as u64);
                let mut out = Vec::with_capacity(chunk.len());

                for ray in chunk {
                    let sample = sampler.get_pixel_sample();
                    let radiance = self.radiance.incident_radiance(ray, scene, &sample, &arena);
                    out.push(check_radiance(radiance, ray));
                    arena.reset();
                }

                out
            })
            .collect()
    }

    pub fn render_with_pool(&self, scene: &Scene, rays: &[Ray], pool: &rayon::ThreadPool) -> Vec<Spectrum> {
        pool.install(|| self.render_rays(scene, rays))
    }
}

fn check_radiance(l: Spectrum, ray: &Ray) -> Spectrum {
    if l.has_nans() {
        warn!(origin = ?ray.origin, dir = ?ray.dir, "NaN radiance value, discarding");
        Spectrum::uniform(0.0)
    } else {
        l
    }
}
