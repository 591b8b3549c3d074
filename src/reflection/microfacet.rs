use crate::{Vec3f, Float, Point2f, spherical_direction, abs_dot};
use crate::reflection::{
    BxDF, BxDFType, ScatterSample, tan2_theta, cos2_theta, cos_theta, abs_cos_theta, same_hemisphere, reflect, refract,
};
use crate::spectrum::Spectrum;
use crate::fresnel::{Fresnel, FresnelConductor, FresnelDielectric};
use crate::consts::{PI, INV_2_PI, TWO_PI};
use cgmath::InnerSpace;

pub trait MicrofacetDistribution {
    /// Find the differential area of microfacets oriented with the given normal vector `wh`
    fn d(&self, wh: Vec3f) -> Float;

    /// Sample a microfacet normal proportionally to `d(wh) * cos(theta_h)`, on the same side
    /// as `wo`.
    fn sample_wh(&self, wo: Vec3f, u: Point2f) -> Vec3f;

    fn pdf(&self, _wo: Vec3f, wh: Vec3f) -> Float {
        self.d(wh) * abs_cos_theta(wh)
    }
}

fn orient_like(wo: Vec3f, wh: Vec3f) -> Vec3f {
    if same_hemisphere(wo, wh) { wh } else { -wh }
}

/// Normalized Blinn-Phong distribution, with the exponent derived from the roughness.
#[derive(Debug, Clone, Copy)]
pub struct Blinn {
    exp: Float,
}

impl Blinn {
    pub fn new(roughness: Float) -> Self {
        let alpha = roughness * roughness;
        Blinn { exp: (2.0 / (alpha * alpha) - 2.0).max(0.0) }
    }
}

impl MicrofacetDistribution for Blinn {
    fn d(&self, wh: Vec3f) -> Float {
        (self.exp + 2.0) * INV_2_PI * abs_cos_theta(wh).powf(self.exp)
    }

    fn sample_wh(&self, wo: Vec3f, u: Point2f) -> Vec3f {
        let cos_theta = u[0].powf(1.0 / (self.exp + 2.0));
        let sin_theta = Float::sqrt(Float::max(0.0, 1.0 - sq!(cos_theta)));
        orient_like(wo, spherical_direction(sin_theta, cos_theta, TWO_PI * u[1]))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Beckmann {
    alpha: Float,
}

impl Beckmann {
    pub fn new(roughness: Float) -> Self {
        Beckmann { alpha: roughness * roughness }
    }
}

impl MicrofacetDistribution for Beckmann {
    fn d(&self, wh: Vec3f) -> Float {
        let tan2_theta = tan2_theta(wh);
        if tan2_theta.is_infinite() {
            return 0.0
        }

        let alpha2 = self.alpha * self.alpha;
        let cos4_theta = cos2_theta(wh) * cos2_theta(wh);
        Float::exp(-tan2_theta / alpha2) / (PI * alpha2 * cos4_theta)
    }

    fn sample_wh(&self, wo: Vec3f, u: Point2f) -> Vec3f {
        let log_sample = Float::ln(1.0 - u[0]);
        debug_assert!(log_sample.is_finite());
        let tan2_theta = -self.alpha * self.alpha * log_sample;

        // map sampled angles to normal direction wh
        let cos_theta = 1.0 / (1.0 + tan2_theta).sqrt();
        let sin_theta = Float::sqrt(Float::max(0.0, 1.0 - sq!(cos_theta)));
        orient_like(wo, spherical_direction(sin_theta, cos_theta, TWO_PI * u[1]))
    }
}

/// Also known as Trowbridge-Reitz
#[derive(Debug, Clone, Copy)]
pub struct Ggx {
    alpha: Float,
}

impl Ggx {
    pub fn new(roughness: Float) -> Self {
        Ggx { alpha: roughness * roughness }
    }
}

impl MicrofacetDistribution for Ggx {
    fn d(&self, wh: Vec3f) -> Float {
        let tan2_theta = tan2_theta(wh);
        if tan2_theta.is_infinite() {
            return 0.0
        }

        let alpha2 = self.alpha * self.alpha;
        let cos4_theta = cos2_theta(wh) * cos2_theta(wh);
        alpha2 / (PI * cos4_theta * sq!(alpha2 + tan2_theta))
    }

    fn sample_wh(&self, wo: Vec3f, u: Point2f) -> Vec3f {
        let tan2_theta = sq!(self.alpha) * u[0] / (1.0 - u[0]);
        let cos_theta = 1.0 / Float::sqrt(1.0 + tan2_theta);
        let sin_theta = Float::sqrt(Float::max(0.0, 1.0 - sq!(cos_theta)));
        orient_like(wo, spherical_direction(sin_theta, cos_theta, TWO_PI * u[1]))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Distribution {
    Blinn(Blinn),
    Beckmann(Beckmann),
    Ggx(Ggx),
}

impl MicrofacetDistribution for Distribution {
    fn d(&self, wh: Vec3f) -> Float {
        match self {
            Distribution::Blinn(d) => d.d(wh),
            Distribution::Beckmann(d) => d.d(wh),
            Distribution::Ggx(d) => d.d(wh),
        }
    }

    fn sample_wh(&self, wo: Vec3f, u: Point2f) -> Vec3f {
        match self {
            Distribution::Blinn(d) => d.sample_wh(wo, u),
            Distribution::Beckmann(d) => d.sample_wh(wo, u),
            Distribution::Ggx(d) => d.sample_wh(wo, u),
        }
    }
}

/// Named choice of microfacet distribution, as configured on a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Blinn,
    Beckmann,
    Ggx,
}

impl Default for DistributionKind {
    fn default() -> Self {
        DistributionKind::Ggx
    }
}

impl DistributionKind {
    /// Unrecognized names select GGX.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Blinn" => DistributionKind::Blinn,
            "Beckmann" => DistributionKind::Beckmann,
            _ => DistributionKind::Ggx,
        }
    }

    pub fn build(self, roughness: Float) -> Distribution {
        match self {
            DistributionKind::Blinn => Distribution::Blinn(Blinn::new(roughness)),
            DistributionKind::Beckmann => Distribution::Beckmann(Beckmann::new(roughness)),
            DistributionKind::Ggx => Distribution::Ggx(Ggx::new(roughness)),
        }
    }
}

/// Shadowing-masking term `G` of a microfacet model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VisibilityTerm {
    Implicit,
    Neumann,
    Kelemen,
    Schlick { k: Float },
    Smith { alpha: Float },
    SmithJointApprox { alpha: Float },
    CookTorrance,
}

impl VisibilityTerm {
    pub fn g(&self, wo: Vec3f, wi: Vec3f, wh: Vec3f) -> Float {
        let n_dot_l = abs_cos_theta(wi);
        let n_dot_v = abs_cos_theta(wo);
        let n_dot_h = abs_cos_theta(wh);
        let v_dot_h = abs_dot(wo, wh);

        match *self {
            VisibilityTerm::Implicit => 1.0,
            VisibilityTerm::Neumann => {
                let m = n_dot_l.max(n_dot_v);
                if m == 0.0 { 0.0 } else { n_dot_l * n_dot_v / m }
            },
            VisibilityTerm::Kelemen => {
                if v_dot_h == 0.0 { 0.0 } else { n_dot_l * n_dot_v / (v_dot_h * v_dot_h) }
            },
            VisibilityTerm::Schlick { k } => {
                let g1 = |x: Float| x / (x * (1.0 - k) + k);
                g1(n_dot_l) * g1(n_dot_v)
            },
            VisibilityTerm::Smith { alpha } => {
                let alpha2 = alpha * alpha;
                let g1 = |x: Float| 2.0 * x / (x + Float::sqrt(alpha2 + (1.0 - alpha2) * x * x));
                g1(n_dot_l) * g1(n_dot_v)
            },
            VisibilityTerm::SmithJointApprox { alpha } => {
                let v = n_dot_l * (n_dot_v * (1.0 - alpha) + alpha);
                let l = n_dot_v * (n_dot_l * (1.0 - alpha) + alpha);
                if v + l == 0.0 { 0.0 } else { 2.0 * n_dot_l * n_dot_v / (v + l) }
            },
            VisibilityTerm::CookTorrance => {
                if v_dot_h == 0.0 {
                    return 0.0;
                }
                let masking = 2.0 * n_dot_h * n_dot_v / v_dot_h;
                let shadowing = 2.0 * n_dot_h * n_dot_l / v_dot_h;
                Float::min(1.0, Float::min(masking, shadowing))
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityKind {
    Implicit,
    Neumann,
    Kelemen,
    Schlick,
    Smith,
    SmithJointApprox,
    CookTorrance,
}

impl Default for VisibilityKind {
    fn default() -> Self {
        VisibilityKind::Implicit
    }
}

impl VisibilityKind {
    /// Unrecognized names select the implicit term.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Neumann" => VisibilityKind::Neumann,
            "Kelemen" => VisibilityKind::Kelemen,
            "Schlick" => VisibilityKind::Schlick,
            "Smith" => VisibilityKind::Smith,
            "SmithJointApprox" => VisibilityKind::SmithJointApprox,
            "CookTorrance" => VisibilityKind::CookTorrance,
            _ => VisibilityKind::Implicit,
        }
    }

    pub fn build(self, roughness: Float) -> VisibilityTerm {
        let alpha = roughness * roughness;
        match self {
            VisibilityKind::Implicit => VisibilityTerm::Implicit,
            VisibilityKind::Neumann => VisibilityTerm::Neumann,
            VisibilityKind::Kelemen => VisibilityTerm::Kelemen,
            VisibilityKind::Schlick => VisibilityTerm::Schlick { k: alpha * 0.5 },
            VisibilityKind::Smith => VisibilityTerm::Smith { alpha },
            VisibilityKind::SmithJointApprox => VisibilityTerm::SmithJointApprox { alpha },
            VisibilityKind::CookTorrance => VisibilityTerm::CookTorrance,
        }
    }
}

/// Torrance-Sparrow style glossy reflection from a microfacet surface.
#[derive(Debug)]
pub struct MicrofacetReflection<F: Fresnel = FresnelConductor> {
    pub r: Spectrum,
    pub distribution: Distribution,
    pub visibility: VisibilityTerm,
    pub fresnel: F,
}

impl<F: Fresnel> MicrofacetReflection<F> {
    pub fn new(r: Spectrum, fresnel: F, distribution: Distribution, visibility: VisibilityTerm) -> Self {
        MicrofacetReflection { r, distribution, visibility, fresnel }
    }
}

impl<F: Fresnel + std::fmt::Debug> BxDF for MicrofacetReflection<F> {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::GLOSSY
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        if !same_hemisphere(wo, wi) {
            return Spectrum::uniform(0.0);
        }
        let cos_theta_o = abs_cos_theta(wo);
        let cos_theta_i = abs_cos_theta(wi);
        let wh = wi + wo;

        // handle degenerate cases
        if cos_theta_i == 0.0 || cos_theta_o == 0.0 || wh == Vec3f::new(0.0, 0.0, 0.0) {
            return Spectrum::uniform(0.0)
        }
        let wh = wh.normalize();

        let f = self.fresnel.evaluate(wi.dot(wh), wo.dot(wh));

        self.r * self.distribution.d(wh) * self.visibility.g(wo, wi, wh) * f
            / (4.0 * cos_theta_i * cos_theta_o)
    }

    fn sample_f(&self, wo: Vec3f, sample: Point2f) -> Option<ScatterSample> {
        if wo.z == 0.0 {
            return None;
        }
        let wh = self.distribution.sample_wh(wo, sample);
        let wi = reflect(wo, wh);
        if !same_hemisphere(wo, wi) {
            return None;
        }

        let pdf = self.distribution.pdf(wo, wh) / (4.0 * wo.dot(wh));
        ScatterSample {
            f: self.f(wo, wi),
            wi,
            pdf,
            sampled_type: self.get_type()
        }.into()
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f) -> Float {
        if !same_hemisphere(wo, wi) {
            return 0.0
        }
        let wh = (wo + wi).normalize();
        self.distribution.pdf(wo, wh) / (4.0 * wo.dot(wh))
    }
}

/// Rough dielectric transmission through a microfacet interface.
#[derive(Debug)]
pub struct MicrofacetRefraction {
    pub t: Spectrum,
    pub distribution: Distribution,
    pub visibility: VisibilityTerm,
    pub fresnel: FresnelDielectric,

    /// Index of refraction on the side opposite the normal
    pub eta_in: Float,

    /// Index of refraction on the side of the normal
    pub eta_ext: Float,
}

impl MicrofacetRefraction {
    pub fn new(
        t: Spectrum,
        fresnel: FresnelDielectric,
        distribution: Distribution,
        visibility: VisibilityTerm,
        eta_in: Float,
        eta_ext: Float,
    ) -> Self {
        MicrofacetRefraction { t, distribution, visibility, fresnel, eta_in, eta_ext }
    }

    /// Relative index of refraction for light leaving along `wo`.
    fn get_eta(&self, wo: Vec3f) -> Float {
        if cos_theta(wo) > 0.0 { self.eta_in / self.eta_ext } else { self.eta_ext / self.eta_in }
    }
}

impl BxDF for MicrofacetRefraction {
    fn get_type(&self) -> BxDFType {
        BxDFType::TRANSMISSION | BxDFType::GLOSSY
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        if same_hemisphere(wo, wi) {
            return Spectrum::uniform(0.0);
        }
        let cos_theta_o = cos_theta(wo);
        let cos_theta_i = cos_theta(wi);
        if cos_theta_o == 0.0 || cos_theta_i == 0.0 {
            return Spectrum::uniform(0.0);
        }

        let eta = self.get_eta(wo);
        let wh = (wo + wi * eta).normalize();
        let wh = if wh.z < 0.0 { -wh } else { wh };

        let sqrt_denom = wo.dot(wh) + eta * wi.dot(wh);
        if sqrt_denom == 0.0 {
            return Spectrum::uniform(0.0);
        }

        let f = self.fresnel.evaluate(wo.dot(wh), wi.dot(wh));
        (Spectrum::uniform(1.0) - f) * self.t *
            Float::abs(self.distribution.d(wh) * self.visibility.g(wo, wi, wh) * sq!(eta) * abs_dot(wi, wh) * abs_dot(wo, wh)
            / (cos_theta_i * cos_theta_o * sq!(sqrt_denom)))
    }

    fn sample_f(&self, wo: Vec3f, sample: Point2f) -> Option<ScatterSample> {
        if wo.z == 0.0 {
            return None;
        }
        let wh = self.distribution.sample_wh(wo, sample);
        if wo.dot(wh) < 0.0 {
            return None;
        }
        let wi = refract(wo, wh, 1.0 / self.get_eta(wo))?;
        ScatterSample {
            f: self.f(wo, wi),
            wi,
            pdf: self.pdf(wo, wi),
            sampled_type: self.get_type()
        }.into()
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f) -> Float {
        if same_hemisphere(wo, wi) {
            return 0.0
        }
        let eta = self.get_eta(wo);
        let wh = (wo + wi * eta).normalize();
        let sqrt_denom = wo.dot(wh) + eta * wi.dot(wh);
        if sqrt_denom == 0.0 {
            return 0.0;
        }
        let dwh_dwi = Float::abs((sq!(eta) * wi.dot(wh)) / sq!(sqrt_denom));
        self.distribution.pdf(wo, wh) * dwh_dwi
    }
}
