use crate::Float;
use crate::spectrum::Spectrum;

pub trait Fresnel {

    /// Given the cosines of the incident and exitant directions with the (micro)surface
    /// normal, returns the amount of light reflected by the surface. The sign of either
    /// cosine does not matter.
    fn evaluate(&self, cos_i: Float, cos_o: Float) -> Spectrum;
}

/// Reflects everything, for terms that already account for Fresnel effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct FresnelNoOp;

impl Fresnel for FresnelNoOp {
    fn evaluate(&self, _cos_i: Float, _cos_o: Float) -> Spectrum {
        Spectrum::uniform(1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FresnelConductor {
    /// index of refraction
    pub eta: Spectrum,

    /// absorption coefficient
    pub k: Spectrum,
}

impl FresnelConductor {
    pub fn new(eta: Spectrum, k: Spectrum) -> Self {
        Self { eta, k }
    }
}

impl Fresnel for FresnelConductor {
    fn evaluate(&self, cos_i: Float, _cos_o: Float) -> Spectrum {
        let abs_cos = cos_i.abs();
        let sq_cos = abs_cos * abs_cos;

        let t = 2.0 * self.eta * abs_cos;
        let tmp_f = self.eta * self.eta + self.k * self.k;
        let tmp = tmp_f * sq_cos;
        let r_parallel = (tmp - t + 1.0) / (tmp + t + 1.0);
        let r_perp = (tmp_f - t + sq_cos) / (tmp_f + t + sq_cos);

        (r_parallel + r_perp) * 0.5
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FresnelDielectric {
    /// incident index of refraction
    eta_i: Float,

    /// transmitted index of refraction
    eta_t: Float,
}

impl FresnelDielectric {
    pub fn new(eta_i: Float, eta_t: Float) -> Self {
        Self { eta_i, eta_t }
    }
}

impl Fresnel for FresnelDielectric {
    fn evaluate(&self, cos_i: Float, cos_o: Float) -> Spectrum {
        let cos_i = cos_i.abs();
        let cos_o = cos_o.abs();
        let t0 = self.eta_t * cos_i;
        let t1 = self.eta_i * cos_o;
        let t2 = self.eta_i * cos_i;
        let t3 = self.eta_t * cos_o;

        let r_parallel = (t0 - t1) / (t0 + t1);
        let r_perp = (t2 - t3) / (t2 + t3);

        Spectrum::uniform((r_parallel * r_parallel + r_perp * r_perp) * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const COSINES: [Float; 5] = [0.05, 0.3, 0.5, 0.8, 1.0];

    #[test]
    fn test_noop_is_one() {
        assert_eq!(FresnelNoOp.evaluate(0.3, -0.9), Spectrum::uniform(1.0));
    }

    #[test]
    fn test_conductor_sign_invariant() {
        let fresnel = FresnelConductor::new(Spectrum::rgb(0.2, 0.9, 1.1), Spectrum::rgb(3.9, 2.4, 2.2));
        for &ci in &COSINES {
            for &co in &COSINES {
                let f = fresnel.evaluate(ci, co);
                assert_eq!(f, fresnel.evaluate(-ci, co));
                assert_eq!(f, fresnel.evaluate(ci, -co));
                assert_eq!(f, fresnel.evaluate(-ci, -co));
            }
        }
    }

    #[test]
    fn test_conductor_normal_incidence() {
        // at normal incidence both polarizations give ((eta - 1)^2 + k^2) / ((eta + 1)^2 + k^2)
        let fresnel = FresnelConductor::new(Spectrum::uniform(1.5), Spectrum::uniform(0.0));
        let f = fresnel.evaluate(1.0, 1.0);
        assert_abs_diff_eq!(f[0], 0.04, epsilon = 1.0e-6);
    }

    #[test]
    fn test_dielectric_sign_invariant_and_bounded() {
        let fresnel = FresnelDielectric::new(1.0, 1.5);
        for &ci in &COSINES {
            for &co in &COSINES {
                let f = fresnel.evaluate(ci, co);
                assert_eq!(f, fresnel.evaluate(-ci, co));
                assert_eq!(f, fresnel.evaluate(ci, -co));
                assert_eq!(f, fresnel.evaluate(-ci, -co));
                for i in 0..3 {
                    assert!(f[i] >= 0.0 && f[i] <= 1.0, "{:?} out of range for ({}, {})", f, ci, co);
                }
            }
        }
    }

    #[test]
    fn test_dielectric_matched_indices_transmit_everything() {
        let fresnel = FresnelDielectric::new(1.33, 1.33);
        assert_abs_diff_eq!(fresnel.evaluate(0.7, 0.7)[0], 0.0);
    }
}
