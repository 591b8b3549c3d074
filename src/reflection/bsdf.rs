use crate::{Float, Normal3, Vec3f, Point2f, coordinate_system};
use arrayvec::ArrayVec;
use crate::reflection::{BxDF, BxDFType, ScatterSample};
use crate::interaction::SurfaceInteraction;
use cgmath::InnerSpace;
use crate::spectrum::Spectrum;
use tracing::warn;

pub const MAX_BSDF_TERMS: usize = 8;

/// A reflectance term together with the weight it contributes with.
#[derive(Clone, Copy, Debug)]
pub struct WeightedBxdf<'a> {
    pub bxdf: &'a dyn BxDF,
    pub weight: Spectrum,
}

pub struct Bsdf<'a> {
    /// Shading normal
    ns: Normal3,

    /// Geometry normal
    ng: Normal3,

    /// s orthonormal basis vector with the shading normal
    ss: Vec3f,

    /// t orthonormal basis vector with the shading normal
    ts: Vec3f,

    terms: ArrayVec<WeightedBxdf<'a>, MAX_BSDF_TERMS>,
}

impl<'a> Bsdf<'a> {

    pub fn new(si: &SurfaceInteraction) -> Self {
        let ns = si.n;
        let ng = si.n;

        // Gram-Schmidt dpdu against the normal, falling back to an arbitrary tangent
        let tangent = si.dpdu - ns.0 * si.dpdu.dot(ns.0);
        let (ss, ts) = if tangent.magnitude2() > 1.0e-12 {
            let ss = tangent.normalize();
            (ss, ns.cross(ss))
        } else {
            coordinate_system(ns.0)
        };

        Self {
            ns,
            ng,
            ss,
            ts,
            terms: ArrayVec::new(),
        }
    }

    /// Append a term. Terms past the capacity are dropped.
    pub fn add(&mut self, bxdf: &'a dyn BxDF, weight: Spectrum) {
        if self.terms.try_push(WeightedBxdf { bxdf, weight }).is_err() {
            warn!(?bxdf, "too many reflectance terms at one shading point, dropping");
        }
    }

    pub fn terms(&self) -> &[WeightedBxdf<'a>] {
        self.terms.as_slice()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_components(&self, flags: BxDFType) -> usize {
        self.terms.iter().filter(|term| term.bxdf.matches_flags(flags)).count()
    }

    pub fn world_to_local(&self, v: Vec3f) -> Vec3f {
        Vec3f::new(v.dot(self.ss), v.dot(self.ts), v.dot(self.ns.0))
    }

    pub fn local_to_world(&self, v: Vec3f) -> Vec3f {
        let x = self.ss.x * v.x + self.ts.x * v.y + self.ns.x * v.z;
        let y = self.ss.y * v.x + self.ts.y * v.y + self.ns.y * v.z;
        let z = self.ss.z * v.x + self.ts.z * v.y + self.ns.z * v.z;
        Vec3f::new(x, y, z)
    }

    /// Weighted sum of every matching term. Whether reflection or transmission terms are
    /// considered is decided by the geometric normal.
    pub fn f(&self, wo_world: Vec3f, wi_world: Vec3f, flags: BxDFType) -> Spectrum {
        let wi = self.world_to_local(wi_world);
        let wo = self.world_to_local(wo_world);
        if wo.z == 0.0 { return Spectrum::uniform(0.0) }

        let reflect = wi_world.dot(self.ng.0) * wo_world.dot(self.ng.0) > 0.0;

        self.terms.iter()
            .filter(|term| term.bxdf.matches_flags(flags))
            .filter(|term| {
                let ty = term.bxdf.get_type();
                (reflect && ty.contains(BxDFType::REFLECTION))
                || (!reflect && ty.contains(BxDFType::TRANSMISSION))
            })
            .map(|term| term.weight * term.bxdf.f(wo, wi))
            .sum()
    }

    /// Pick one matching term uniformly with `u[0]` and sample it. The returned direction is
    /// in world space; for non-specular terms `f` and `pdf` account for every matching term.
    pub fn sample_f(&self, wo_world: Vec3f, u: Point2f, flags: BxDFType) -> Option<ScatterSample> {
        let matching_comps = self.num_components(flags);
        if matching_comps == 0 { return None }
        let n = matching_comps as Float;

        let comp = (u[0] * n).floor().min(n - 1.0) as usize;
        let chosen = self.terms.iter()
            .filter(|term| term.bxdf.matches_flags(flags))
            .nth(comp)?;

        // remap the sample so the chosen term gets a uniform value again
        let u_remapped = Point2f::new((u[0] * n - comp as Float).min(1.0 - Float::EPSILON), u[1]);

        let wo = self.world_to_local(wo_world);
        if wo.z == 0.0 { return None }

        let sample = chosen.bxdf.sample_f(wo, u_remapped)?;
        if sample.pdf == 0.0 { return None }
        let wi_world = self.local_to_world(sample.wi);

        if sample.sampled_type.contains(BxDFType::SPECULAR) {
            return Some(ScatterSample {
                f: chosen.weight * sample.f,
                wi: wi_world,
                pdf: sample.pdf / n,
                sampled_type: sample.sampled_type,
            });
        }

        let pdf = self.pdf(wo_world, wi_world, flags);
        let f = self.f(wo_world, wi_world, flags);

        Some(ScatterSample {
            f,
            wi: wi_world,
            pdf,
            sampled_type: sample.sampled_type,
        })
    }

    pub fn pdf(&self, wo_world: Vec3f, wi_world: Vec3f, flags: BxDFType) -> Float {
        let matching_comps = self.num_components(flags);
        if matching_comps == 0 { return 0.0 }

        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);
        if wo.z == 0.0 { return 0.0 }

        let total: Float = self.terms.iter()
            .filter(|term| term.bxdf.matches_flags(flags))
            .map(|term| term.bxdf.pdf(wo, wi))
            .sum();

        total / matching_comps as Float
    }
}

impl<'a> std::fmt::Debug for Bsdf<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bsdf")
            .field("ns", &self.ns)
            .field("terms", &self.terms.as_slice())
            .finish()
    }
}
