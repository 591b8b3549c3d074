use crate::{Point2f, Float};
use rand_xoshiro::Xoshiro256Plus;
use rand::{SeedableRng, Rng};
use crate::sampler::Sampler;

pub struct RandomSampler {
    rng: Xoshiro256Plus,
}

impl RandomSampler {
    pub fn new_with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256Plus::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn get_1d(&mut self) -> Float {
        self.rng.gen()
    }

    fn get_2d(&mut self) -> Point2f {
        Point2f::new(self.rng.gen(), self.rng.gen())
    }

    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(Self::new_with_seed(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_samplers_repeat() {
        let mut a = RandomSampler::new_with_seed(7);
        let mut b = a.clone_with_seed(7);
        for _ in 0..16 {
            let x = a.get_1d();
            assert!(x >= 0.0 && x < 1.0);
            assert_eq!(x, b.get_1d());
        }
        let ps = a.get_pixel_sample();
        assert!(ps.light.x < 1.0 && ps.bsdf.y < 1.0);
    }
}
