use crate::{Float, Point2f};

pub mod random;

pub use random::RandomSampler;

/// The random numbers consumed while estimating the radiance along one ray.
#[derive(Clone, Copy, Debug)]
pub struct PixelSample {
    /// For picking a point on a light
    pub light: Point2f,

    /// For sampling a direction from a BSDF
    pub bsdf: Point2f,
}

pub trait Sampler: Sync + Send {
    fn get_1d(&mut self) -> Float;

    fn get_2d(&mut self) -> Point2f;

    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler>;

    fn get_pixel_sample(&mut self) -> PixelSample {
        PixelSample {
            light: self.get_2d(),
            bsdf: self.get_2d(),
        }
    }
}
