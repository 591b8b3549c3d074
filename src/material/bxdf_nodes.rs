use std::sync::Arc;
use crate::Float;
use crate::consts::FRAC_PI_2;
use crate::spectrum::Spectrum;
use crate::material::node::{GraphPath, PropertySlot, ShadingContext, Value};
use crate::reflection::bsdf::Bsdf;
use crate::reflection::{LambertianReflection, OrenNayar, MicrofacetReflection, MicrofacetRefraction};
use crate::reflection::microfacet::{DistributionKind, VisibilityKind};
use crate::reflection::measured::{self, MerlTable, MerlBxdf, FourierTable, FourierBxdf};
use crate::fresnel::{FresnelConductor, FresnelDielectric};
use tracing::debug;

/// Number of (sub-node, weight) pairs of a layered node.
pub const MAX_BXDF_COUNT: usize = 4;

const REFLECTION_ROUGHNESS_RANGE: (Float, Float) = (0.001, 1.0);
const REFRACTION_ROUGHNESS_RANGE: (Float, Float) = (0.05, 1.0);

pub struct LambertNode {
    pub base_color: PropertySlot,
}

impl LambertNode {
    pub fn new() -> Self {
        Self { base_color: PropertySlot::value(Spectrum::uniform(1.0)) }
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum, path: &GraphPath<'_>) {
        let r = ctx.resolve(&self.base_color, path).to_spectrum();
        bsdf.add(ctx.arena.alloc(LambertianReflection::new(r)), weight);
    }
}

impl Default for LambertNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(LambertNode { "BaseColor" => base_color });

pub struct OrenNayarNode {
    pub base_color: PropertySlot,
    pub roughness: PropertySlot,
}

impl OrenNayarNode {
    pub fn new() -> Self {
        Self {
            base_color: PropertySlot::value(Spectrum::uniform(1.0)),
            roughness: PropertySlot::value(0.0),
        }
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum, path: &GraphPath<'_>) {
        let r = ctx.resolve(&self.base_color, path).to_spectrum();
        // roughness in [0, 1] spans microfacet slopes up to a right angle
        let sigma = ctx.resolve(&self.roughness, path).to_float().clamp(0.0, 1.0) * FRAC_PI_2;
        bsdf.add(ctx.arena.alloc(OrenNayar::new(r, sigma)), weight);
    }
}

impl Default for OrenNayarNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(OrenNayarNode { "BaseColor" => base_color, "Roughness" => roughness });

/// Isotropic measured BRDF loaded from a MERL binary file.
pub struct MerlNode {
    pub filename: PropertySlot,
    table: Option<Arc<MerlTable>>,
    processed: bool,
}

impl MerlNode {
    pub fn new() -> Self {
        Self { filename: PropertySlot::setting(""), table: None, processed: false }
    }

    pub fn table(&self) -> Option<&MerlTable> {
        self.table.as_deref()
    }

    pub(crate) fn post_process(&mut self) -> anyhow::Result<()> {
        if self.processed {
            return Ok(());
        }
        let filename = self.filename.value.as_str();
        if !filename.is_empty() {
            debug!(filename, "loading MERL table");
            self.table = Some(measured::get_merl_table(filename)?);
        }
        self.processed = true;
        Ok(())
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum) {
        if let Some(table) = self.table.as_deref() {
            bsdf.add(ctx.arena.alloc(MerlBxdf::new(table)), weight);
        }
    }
}

impl Default for MerlNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(MerlNode { "Filename" => filename });

/// Measured BSDF stored as a Fourier series table.
pub struct FourierNode {
    pub filename: PropertySlot,
    table: Option<Arc<FourierTable>>,
    processed: bool,
}

impl FourierNode {
    pub fn new() -> Self {
        Self { filename: PropertySlot::setting(""), table: None, processed: false }
    }

    pub fn table(&self) -> Option<&FourierTable> {
        self.table.as_deref()
    }

    pub(crate) fn post_process(&mut self) -> anyhow::Result<()> {
        if self.processed {
            return Ok(());
        }
        let filename = self.filename.value.as_str();
        if !filename.is_empty() {
            debug!(filename, "loading Fourier BSDF table");
            self.table = Some(measured::get_fourier_table(filename)?);
        }
        self.processed = true;
        Ok(())
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum) {
        if let Some(table) = self.table.as_deref() {
            bsdf.add(ctx.arena.alloc(FourierBxdf::new(table)), weight);
        }
    }
}

impl Default for FourierNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(FourierNode { "Filename" => filename });

pub struct MicrofacetReflectionNode {
    pub base_color: PropertySlot,
    pub distribution_name: PropertySlot,
    pub visibility_name: PropertySlot,
    pub roughness: PropertySlot,
    pub eta: PropertySlot,
    pub k: PropertySlot,
    distribution: DistributionKind,
    visibility: VisibilityKind,
}

impl MicrofacetReflectionNode {
    pub fn new() -> Self {
        Self {
            base_color: PropertySlot::value(Spectrum::uniform(1.0)),
            distribution_name: PropertySlot::setting("GGX"),
            visibility_name: PropertySlot::setting(""),
            roughness: PropertySlot::value(0.5),
            // gold
            eta: PropertySlot::value(Spectrum::rgb(0.143, 0.374, 1.442)),
            k: PropertySlot::value(Spectrum::rgb(3.983, 2.385, 1.603)),
            distribution: DistributionKind::default(),
            visibility: VisibilityKind::default(),
        }
    }

    pub fn distribution(&self) -> DistributionKind {
        self.distribution
    }

    pub fn visibility(&self) -> VisibilityKind {
        self.visibility
    }

    fn settings_changed(&mut self, _name: &str) {
        self.distribution = DistributionKind::from_name(self.distribution_name.value.as_str());
        self.visibility = VisibilityKind::from_name(self.visibility_name.value.as_str());
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum, path: &GraphPath<'_>) {
        let (lo, hi) = REFLECTION_ROUGHNESS_RANGE;
        let rn = ctx.resolve(&self.roughness, path).to_float().clamp(lo, hi);
        let fresnel = FresnelConductor::new(
            ctx.resolve(&self.eta, path).to_spectrum(),
            ctx.resolve(&self.k, path).to_spectrum(),
        );
        let mf = MicrofacetReflection::new(
            ctx.resolve(&self.base_color, path).to_spectrum(),
            fresnel,
            self.distribution.build(rn),
            self.visibility.build(rn),
        );
        bsdf.add(ctx.arena.alloc(mf), weight);
    }
}

impl Default for MicrofacetReflectionNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(MicrofacetReflectionNode {
    "BaseColor" => base_color,
    "MicroFacetDistribution" => distribution_name,
    "Visibility" => visibility_name,
    "Roughness" => roughness,
    "eta" => eta,
    "k" => k,
}, on_change = settings_changed);

pub struct MicrofacetRefractionNode {
    pub base_color: PropertySlot,
    pub distribution_name: PropertySlot,
    pub visibility_name: PropertySlot,
    pub roughness: PropertySlot,
    pub in_ior: PropertySlot,
    pub ext_ior: PropertySlot,
    distribution: DistributionKind,
    visibility: VisibilityKind,
}

impl MicrofacetRefractionNode {
    pub fn new() -> Self {
        Self {
            base_color: PropertySlot::value(Spectrum::uniform(1.0)),
            distribution_name: PropertySlot::setting("GGX"),
            visibility_name: PropertySlot::setting(""),
            roughness: PropertySlot::value(0.5),
            in_ior: PropertySlot::value(1.5),
            ext_ior: PropertySlot::value(1.0),
            distribution: DistributionKind::default(),
            visibility: VisibilityKind::default(),
        }
    }

    pub fn distribution(&self) -> DistributionKind {
        self.distribution
    }

    pub fn visibility(&self) -> VisibilityKind {
        self.visibility
    }

    fn settings_changed(&mut self, _name: &str) {
        self.distribution = DistributionKind::from_name(self.distribution_name.value.as_str());
        self.visibility = VisibilityKind::from_name(self.visibility_name.value.as_str());
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum, path: &GraphPath<'_>) {
        let (lo, hi) = REFRACTION_ROUGHNESS_RANGE;
        let rn = ctx.resolve(&self.roughness, path).to_float().clamp(lo, hi);
        let in_eta = ctx.resolve(&self.in_ior, path).to_float();
        let ext_eta = ctx.resolve(&self.ext_ior, path).to_float();
        let mf = MicrofacetRefraction::new(
            ctx.resolve(&self.base_color, path).to_spectrum(),
            FresnelDielectric::new(in_eta, ext_eta),
            self.distribution.build(rn),
            self.visibility.build(rn),
            in_eta,
            ext_eta,
        );
        bsdf.add(ctx.arena.alloc(mf), weight);
    }
}

impl Default for MicrofacetRefractionNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(MicrofacetRefractionNode {
    "BaseColor" => base_color,
    "MicroFacetDistribution" => distribution_name,
    "Visibility" => visibility_name,
    "Roughness" => roughness,
    "in_ior" => in_ior,
    "ext_ior" => ext_ior,
}, on_change = settings_changed);

const BXDF_NAMES: [&str; MAX_BXDF_COUNT] = ["Bxdf0", "Bxdf1", "Bxdf2", "Bxdf3"];
const WEIGHT_NAMES: [&str; MAX_BXDF_COUNT] = ["Weight0", "Weight1", "Weight2", "Weight3"];

/// Weighted combination of up to [`MAX_BXDF_COUNT`] reflectance nodes.
pub struct LayeredBxdfNode {
    pub bxdfs: [PropertySlot; MAX_BXDF_COUNT],
    pub weights: [PropertySlot; MAX_BXDF_COUNT],
}

impl LayeredBxdfNode {
    pub fn new() -> Self {
        Self {
            bxdfs: [PropertySlot::bxdf(), PropertySlot::bxdf(), PropertySlot::bxdf(), PropertySlot::bxdf()],
            weights: [
                PropertySlot::constant(1.0),
                PropertySlot::constant(1.0),
                PropertySlot::constant(1.0),
                PropertySlot::constant(1.0),
            ],
        }
    }

    pub(crate) fn update_bsdf<'a>(&'a self, ctx: &ShadingContext<'a, '_>, bsdf: &mut Bsdf<'a>, weight: Spectrum, path: &GraphPath<'_>) {
        for (bxdf, w) in self.bxdfs.iter().zip(self.weights.iter()) {
            let id = match bxdf.link {
                Some(id) => id,
                None => continue,
            };
            let (sub, sub_path) = match (ctx.graph.node(id), path.enter(id)) {
                (Some(sub), Some(sub_path)) => (sub, sub_path),
                _ => continue,
            };
            let w = ctx.resolve(w, path).to_spectrum();
            sub.update_bsdf(ctx, bsdf, weight * w, &sub_path);
        }
    }
}

impl Default for LayeredBxdfNode {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::material::node::NodeProperties for LayeredBxdfNode {
    fn slots(&self) -> Vec<(&'static str, &PropertySlot)> {
        BXDF_NAMES.iter().cloned().zip(self.bxdfs.iter())
            .chain(WEIGHT_NAMES.iter().cloned().zip(self.weights.iter()))
            .collect()
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut PropertySlot> {
        if let Some(i) = BXDF_NAMES.iter().position(|n| *n == name) {
            return Some(&mut self.bxdfs[i]);
        }
        WEIGHT_NAMES.iter().position(|n| *n == name).map(move |i| &mut self.weights[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::node::NodeProperties;

    #[test]
    fn test_settings_parsed_when_set() {
        let mut node = MicrofacetReflectionNode::new();
        assert_eq!(node.distribution(), DistributionKind::Ggx);
        assert_eq!(node.visibility(), VisibilityKind::Implicit);

        node.slot_mut("MicroFacetDistribution").unwrap().value = Value::from("Beckmann");
        node.slot_mut("Visibility").unwrap().value = Value::from("Smith");
        node.property_changed("Visibility");
        assert_eq!(node.distribution(), DistributionKind::Beckmann);
        assert_eq!(node.visibility(), VisibilityKind::Smith);

        node.slot_mut("MicroFacetDistribution").unwrap().value = Value::from("Ward");
        node.property_changed("MicroFacetDistribution");
        assert_eq!(node.distribution(), DistributionKind::Ggx);
    }

    #[test]
    fn test_layered_slot_names() {
        let mut node = LayeredBxdfNode::new();
        assert!(node.slot_mut("Bxdf3").is_some());
        assert!(node.slot_mut("Weight0").is_some());
        assert!(node.slot_mut("Bxdf4").is_none());
        assert_eq!(node.slots().len(), 2 * MAX_BXDF_COUNT);
    }
}
