use bitflags::bitflags;
use crate::{Vec3f, Point2f, Float};
use crate::spectrum::Spectrum;
use crate::sampling::cosine_sample_hemisphere;
use crate::consts::FRAC_1_PI;
use std::fmt::Debug;

pub mod bsdf;
pub mod microfacet;
pub mod measured;

pub use microfacet::{MicrofacetReflection, MicrofacetRefraction};

bitflags! {
    pub struct BxDFType: u8 {
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
    }
}

// Trigonometric helpers for directions expressed in the local shading frame, where the
// normal is +z.
pub(crate) fn cos_theta(w: Vec3f) -> Float { w.z }
pub(crate) fn cos2_theta(w: Vec3f) -> Float { w.z * w.z }
pub(crate) fn abs_cos_theta(w: Vec3f) -> Float { w.z.abs() }

pub(crate) fn sin2_theta(w: Vec3f) -> Float {
    Float::max(0.0, 1.0 - cos2_theta(w))
}

pub(crate) fn sin_theta(w: Vec3f) -> Float {
    sin2_theta(w).sqrt()
}

pub(crate) fn tan2_theta(w: Vec3f) -> Float {
    sin2_theta(w) / cos2_theta(w)
}

pub(crate) fn cos_phi(w: Vec3f) -> Float {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        1.0
    } else {
        (w.x / sin_theta).clamp(-1.0, 1.0)
    }
}

pub(crate) fn sin_phi(w: Vec3f) -> Float {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        0.0
    } else {
        (w.y / sin_theta).clamp(-1.0, 1.0)
    }
}

pub fn reflect(wo: Vec3f, n: Vec3f) -> Vec3f {
    -wo + 2.0 * cgmath::dot(wo, n) * n
}

pub fn refract(wi: Vec3f, n: Vec3f, eta: Float) -> Option<Vec3f> {
    let cos_theta_i = cgmath::dot(n, wi);
    let sin2_theta_i = Float::max(0.0, 1.0 - cos_theta_i * cos_theta_i);
    let sin2_theta_t = eta * eta * sin2_theta_i;
    if sin2_theta_t >= 1.0 { return None }
    let cos_theta_t = Float::sqrt(1.0 - sin2_theta_t);
    let wt = eta * -wi + (eta * cos_theta_i - cos_theta_t) * n;
    Some(wt)
}

pub fn same_hemisphere(v1: Vec3f, v2: Vec3f) -> bool {
    v1.z.is_sign_positive() == v2.z.is_sign_positive()
}

#[derive(Clone, Copy, Debug)]
pub struct ScatterSample {
    pub f: Spectrum,
    pub wi: Vec3f,
    pub pdf: Float,
    pub sampled_type: BxDFType
}

/// A single scattering term. Directions are given in the local shading frame.
pub trait BxDF: Debug {

    fn matches_flags(&self, t: BxDFType) -> bool {
        t.contains(self.get_type())
    }

    fn get_type(&self) -> BxDFType;

    /// Returns the value of the distribution function for the given pair of directions.
    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum;

    /// Samples an incident direction `wi` for the outgoing direction `wo`, returning the
    /// value of the term for the pair together with the pdf of having chosen `wi`.
    fn sample_f(&self, wo: Vec3f, sample: Point2f) -> Option<ScatterSample>;

    fn pdf(&self, wo: Vec3f, wi: Vec3f) -> Float;

}

/// Terms without a better importance sampling strategy use cosine-weighted hemisphere
/// sampling.
pub trait DefaultSampleF: Debug {
    fn get_type(&self) -> BxDFType;

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum;
}

impl<T> BxDF for T where T: DefaultSampleF {
    fn get_type(&self) -> BxDFType {
        <Self as DefaultSampleF>::get_type(self)
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        <Self as DefaultSampleF>::f(self, wo, wi)
    }

    fn sample_f(&self, wo: Vec3f, sample: Point2f) -> Option<ScatterSample> {
        let mut wi = cosine_sample_hemisphere(sample);
        // flip direction if wo is on the opposite hemisphere
        if wo.z < 0.0 { wi.z *= -1.0; }
        let pdf = self.pdf(wo, wi);
        let f = self.f(wo, wi);
        Some(ScatterSample { f, wi, pdf, sampled_type: self.get_type() })
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f) -> Float {
        if same_hemisphere(wo, wi) {
            abs_cos_theta(wi) * FRAC_1_PI
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
pub struct LambertianReflection {
    pub r: Spectrum,
}

impl LambertianReflection {
    pub fn new(r: Spectrum) -> Self {
        Self { r }
    }
}

impl DefaultSampleF for LambertianReflection {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        if !same_hemisphere(wo, wi) {
            return Spectrum::uniform(0.0);
        }
        self.r * FRAC_1_PI
    }
}

#[derive(Debug)]
pub struct OrenNayar {
    pub r: Spectrum,
    pub a: Float,
    pub b: Float,
}

impl OrenNayar {
    /// `sigma` is the standard deviation of the microfacet orientation angle, in radians.
    pub fn new(r: Spectrum, sigma: Float) -> Self {
        let sigma2 = sigma * sigma;
        let a = 1.0 - (sigma2 / (2.0 * (sigma2 + 0.33)));
        let b = 0.45 * sigma2 / (sigma2 + 0.09);
        OrenNayar { r, a, b }
    }
}

impl DefaultSampleF for OrenNayar {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        if !same_hemisphere(wo, wi) {
            return Spectrum::uniform(0.0);
        }
        let sin_theta_i = sin_theta(wi);
        let sin_theta_o = sin_theta(wo);
        // compute cosine term of Oren-Nayar model
        let max_cos = if sin_theta_i > 1.0e-4 && sin_theta_o > 1.0e-4 {
            let sin_phi_i = sin_phi(wi);
            let cos_phi_i = cos_phi(wi);
            let sin_phi_o = sin_phi(wo);
            let cos_phi_o = cos_phi(wo);
            let d_cos = cos_phi_i * cos_phi_o + sin_phi_i * sin_phi_o;
            Float::max(0.0, d_cos)
        } else {
            0.0
        };

        let (sin_alpha, tan_beta) = if abs_cos_theta(wi) > abs_cos_theta(wo) {
            (sin_theta_o, sin_theta_i / abs_cos_theta(wi))
        } else {
            (sin_theta_i, sin_theta_o / abs_cos_theta(wo))
        };

        self.r * FRAC_1_PI * (self.a + (self.b * max_cos * sin_alpha * tan_beta))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_lambertian_is_constant_over_hemisphere() {
        let lambert = LambertianReflection::new(Spectrum::uniform(0.5));
        let wo = vec3f!(0, 0, 1);
        let f = BxDF::f(&lambert, wo, vec3f!(0.6, 0, 0.8));
        assert_abs_diff_eq!(f[0], 0.5 * FRAC_1_PI);
        assert!(BxDF::f(&lambert, wo, vec3f!(0.6, 0, -0.8)).is_black());
    }

    #[test]
    fn test_oren_nayar_zero_sigma_is_lambertian() {
        let on = OrenNayar::new(Spectrum::uniform(0.8), 0.0);
        let f = BxDF::f(&on, vec3f!(0.6, 0, 0.8), vec3f!(0, 0.6, 0.8));
        assert_abs_diff_eq!(f[1], 0.8 * FRAC_1_PI, epsilon = 1.0e-6);
    }

    #[test]
    fn test_cosine_sampling_pdf_matches() {
        let lambert = LambertianReflection::new(Spectrum::uniform(1.0));
        let wo = vec3f!(0, 0, 1);
        let sample = lambert.sample_f(wo, Point2f::new(0.3, 0.7)).unwrap();
        assert!(sample.wi.z > 0.0);
        assert_abs_diff_eq!(sample.pdf, sample.wi.z * FRAC_1_PI, epsilon = 1.0e-6);
        assert_eq!(sample.sampled_type, BxDFType::REFLECTION | BxDFType::DIFFUSE);
    }
}
