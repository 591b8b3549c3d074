//! Materials are graphs of nodes wired together when the scene is loaded. Value nodes produce
//! floats and colors, reflectance nodes append weighted terms to a [`Bsdf`] when a shading
//! point is evaluated.

#[macro_use]
pub mod node;
pub mod value_nodes;
pub mod bxdf_nodes;

use std::collections::HashSet;
use bumpalo::Bump;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{warn, debug_span};
use crate::SurfaceInteraction;
use crate::id_arena::{Id, IdArena};
use crate::reflection::bsdf::{Bsdf, MAX_BSDF_TERMS};
use crate::spectrum::Spectrum;

pub use node::{Value, NodeClass, Accepts, PropertySlot, MaterialNode, ShadingContext, GraphPath};
pub use value_nodes::*;
pub use bxdf_nodes::*;

pub type NodeId = Id<MaterialNode>;

/// Links deeper than this are not followed while shading.
pub const MAX_GRAPH_DEPTH: u32 = 32;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("node {0} does not exist in this material")]
    UnknownNode(NodeId),

    #[error("{kind} node {node} has no property {property:?}")]
    UnknownProperty { node: NodeId, kind: &'static str, property: String },

    #[error("property {property:?} of node {node} cannot be connected to another node")]
    NotLinkable { node: NodeId, property: String },

    #[error("property {property:?} of node {node} expects a {expected} value")]
    WrongValueType { node: NodeId, property: String, expected: &'static str },

    #[error("property {property:?} of node {node} does not accept {class:?} node {from}")]
    InvalidLink { node: NodeId, property: String, from: NodeId, class: NodeClass },

    #[error("node {0} is part of a cycle")]
    Cycle(NodeId),

    #[error("material has no output node")]
    NoOutput,

    #[error("output node {0} does not produce reflectance")]
    OutputNotBxdf(NodeId),

    #[error("material produces {count} reflectance terms, at most {max} fit in a BSDF")]
    TooManyTerms { count: usize, max: usize },
}

pub struct Material {
    pub name: String,
    nodes: IdArena<MaterialNode>,
    output: Option<NodeId>,
    post_processed: bool,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IdArena::new(),
            output: None,
            post_processed: false,
        }
    }

    /// A material made of a single reflectance node.
    pub fn from_node(name: impl Into<String>, node: impl Into<MaterialNode>) -> Self {
        let mut material = Self::new(name);
        let id = material.add_node(node);
        material.output = Some(id);
        material
    }

    pub fn add_node(&mut self, node: impl Into<MaterialNode>) -> NodeId {
        self.nodes.insert(node.into())
    }

    pub fn node(&self, id: NodeId) -> Option<&MaterialNode> {
        self.nodes.get(id)
    }

    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    pub fn set_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains(id) {
            return Err(GraphError::UnknownNode(id));
        }
        self.output = Some(id);
        Ok(())
    }

    fn slot_mut(&mut self, id: NodeId, property: &str) -> Result<&mut PropertySlot, GraphError> {
        let node = self.nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;
        let kind = node.type_name();
        node.slot_mut(property).ok_or_else(|| GraphError::UnknownProperty {
            node: id,
            kind,
            property: property.to_owned(),
        })
    }

    /// Store a constant in a property. Strings go to string properties, floats and colors to
    /// the others.
    pub fn set(&mut self, id: NodeId, property: &str, value: impl Into<Value>) -> Result<(), GraphError> {
        let value = value.into();
        let slot = self.slot_mut(id, property)?;
        if slot.value.is_str() != value.is_str() {
            let expected = if slot.value.is_str() { "string" } else { "numeric" };
            return Err(GraphError::WrongValueType { node: id, property: property.to_owned(), expected });
        }
        slot.value = value;
        self.nodes[id].property_changed(property);
        Ok(())
    }

    /// Take the value of a property from the output of node `from`. Whether that node is an
    /// acceptable source is checked by validation, not here.
    pub fn connect(&mut self, id: NodeId, property: &str, from: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains(from) {
            return Err(GraphError::UnknownNode(from));
        }
        let slot = self.slot_mut(id, property)?;
        if slot.accepts == Accepts::Setting {
            return Err(GraphError::NotLinkable { node: id, property: property.to_owned() });
        }
        slot.link = Some(from);
        Ok(())
    }

    /// The class of what a node produces. Arithmetic nodes vary over the surface as soon as
    /// one of their inputs does.
    pub fn class_of(&self, id: NodeId) -> Option<NodeClass> {
        self.class_at(id, &GraphPath::root())
    }

    fn class_at(&self, id: NodeId, path: &GraphPath<'_>) -> Option<NodeClass> {
        let node = self.nodes.get(id)?;
        let path = match path.enter(id) {
            Some(path) if node.inherits_class() => path,
            _ => return Some(node.class()),
        };
        let varying = node.links()
            .any(|from| self.class_at(from, &path) == Some(NodeClass::Texture));
        Some(if varying { NodeClass::Texture } else { NodeClass::Constant })
    }

    /// First property of `id` linked to a node it does not accept.
    fn invalid_link(&self, id: NodeId) -> Option<GraphError> {
        let node = self.nodes.get(id)?;
        for (property, slot) in node.slots() {
            let from = match slot.link {
                Some(from) => from,
                None => continue,
            };
            let class = match self.class_of(from) {
                Some(class) => class,
                None => return Some(GraphError::UnknownNode(from)),
            };
            if !slot.accepts.allows(class) {
                return Some(GraphError::InvalidLink { node: id, property: property.to_owned(), from, class });
            }
        }
        None
    }

    /// Checks the wiring of `id` and of every node upstream of it.
    pub fn check_validation(&self, id: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = match self.nodes.get(id) {
                Some(node) => node,
                None => return false,
            };
            if let Some(err) = self.invalid_link(id) {
                warn!(material = %self.name, %err, "invalid material node");
                return false;
            }
            stack.extend(node.links());
        }
        true
    }

    fn find_cycle(&self) -> Option<NodeId> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark { New, Active, Done }

        let mut marks = vec![Mark::New; self.nodes.len()];
        for (root, _) in self.nodes.iter() {
            if marks[root.index()] != Mark::New {
                continue;
            }
            // iterative depth first search, each frame holds the links still to visit
            let mut stack: Vec<(NodeId, SmallVec<[NodeId; 8]>)> = vec![(root, self.nodes[root].links().collect())];
            marks[root.index()] = Mark::Active;
            while let Some((id, pending)) = stack.last_mut() {
                match pending.pop() {
                    Some(next) => {
                        match marks.get(next.index()) {
                            Some(Mark::Active) => return Some(next),
                            Some(Mark::New) => {
                                marks[next.index()] = Mark::Active;
                                let links = self.nodes[next].links().collect();
                                stack.push((next, links));
                            },
                            _ => {},
                        }
                    },
                    None => {
                        marks[id.index()] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        None
    }

    /// Validate the whole graph. A material that fails must not be rendered.
    pub fn validate(&self) -> Result<(), GraphError> {
        if let Some(id) = self.find_cycle() {
            warn!(material = %self.name, node = %id, "cyclic material graph");
            return Err(GraphError::Cycle(id));
        }
        for (id, _) in self.nodes.iter() {
            if let Some(err) = self.invalid_link(id) {
                warn!(material = %self.name, %err, "invalid material node");
                return Err(err);
            }
        }
        let output = self.output.ok_or(GraphError::NoOutput)?;
        if self.class_of(output) != Some(NodeClass::Bxdf) {
            return Err(GraphError::OutputNotBxdf(output));
        }
        let count = self.term_count(output, &GraphPath::root());
        if count > MAX_BSDF_TERMS {
            warn!(material = %self.name, count, "too many reflectance terms");
            return Err(GraphError::TooManyTerms { count, max: MAX_BSDF_TERMS });
        }
        Ok(())
    }

    /// Number of terms `compute_bsdf` appends for node `id`. Measured nodes count even
    /// before their table is loaded.
    fn term_count(&self, id: NodeId, path: &GraphPath<'_>) -> usize {
        let (node, path) = match (self.nodes.get(id), path.enter(id)) {
            (Some(node), Some(path)) => (node, path),
            _ => return 0,
        };
        match node {
            MaterialNode::Layered(layered) => layered.bxdfs.iter()
                .filter_map(|slot| slot.link)
                .map(|sub| self.term_count(sub, &path))
                .sum(),
            _ if node.class() == NodeClass::Bxdf => 1,
            _ => 0,
        }
    }

    /// Load the data measured nodes refer to. Running it again does nothing.
    pub fn post_process(&mut self) -> anyhow::Result<()> {
        if self.post_processed {
            return Ok(());
        }
        let _span = debug_span!("post_process", material = %self.name).entered();
        for (_, node) in self.nodes.iter_mut() {
            node.post_process()?;
        }
        self.post_processed = true;
        Ok(())
    }

    /// Value of a property at the shading point, following its link if it has one.
    pub fn resolve(&self, slot: &PropertySlot, si: &SurfaceInteraction) -> Value {
        self.resolve_at(slot, si, &GraphPath::root())
    }

    pub(crate) fn resolve_at(&self, slot: &PropertySlot, si: &SurfaceInteraction, path: &GraphPath<'_>) -> Value {
        if let Some(id) = slot.link {
            if let (Some(node), Some(path)) = (self.nodes.get(id), path.enter(id)) {
                return node.evaluate(self, si, &path);
            }
        }
        slot.value.clone()
    }

    /// Materialize the reflectance at a shading point. Terms are allocated in `arena` and
    /// live as long as it is not reset.
    pub fn compute_bsdf<'a>(&'a self, si: &SurfaceInteraction, arena: &'a Bump) -> Bsdf<'a> {
        let mut bsdf = Bsdf::new(si);
        let output = match self.output {
            Some(id) => id,
            None => return bsdf,
        };
        let root_path = GraphPath::root();
        if let (Some(root), Some(path)) = (self.nodes.get(output), root_path.enter(output)) {
            let ctx = ShadingContext { graph: self, si, arena };
            root.update_bsdf(&ctx, &mut bsdf, Spectrum::uniform(1.0), &path);
        }
        bsdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point2f, Point3f, Normal3};
    use crate::reflection::BxDFType;
    use crate::reflection::measured::merl::tests::constant_merl_bytes;
    use crate::consts::FRAC_1_PI;
    use approx::assert_abs_diff_eq;
    use cgmath::InnerSpace;
    use pretty_assertions::assert_eq;

    fn interaction() -> SurfaceInteraction {
        SurfaceInteraction::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point2f::new(0.25, 0.25),
            vec3f!(0, 0, 1),
            Normal3::new(0.0, 0.0, 1.0),
            vec3f!(1, 0, 0),
        )
    }

    #[test]
    fn test_layered_rejects_value_node_as_bxdf() {
        let mut graph = Material::new("m");
        let layered = graph.add_node(LayeredBxdfNode::new());
        let color = graph.add_node(ConstantColorNode::new(Spectrum::uniform(0.5)));
        graph.connect(layered, "Bxdf0", color).unwrap();
        graph.set_output(layered).unwrap();

        assert!(!graph.check_validation(layered));
        assert!(matches!(graph.validate(), Err(GraphError::InvalidLink { .. })));
    }

    #[test]
    fn test_layered_weight_must_be_constant() {
        let mut graph = Material::new("m");
        let layered = graph.add_node(LayeredBxdfNode::new());
        let lambert = graph.add_node(LambertNode::new());
        let checker = graph.add_node(CheckerNode::new());
        graph.connect(layered, "Bxdf0", lambert).unwrap();
        graph.connect(layered, "Weight0", checker).unwrap();
        assert!(!graph.check_validation(layered));

        // arithmetic on a texture varies over the surface too
        let product = graph.add_node(MultiplyNode::new());
        graph.connect(product, "Src0", checker).unwrap();
        graph.connect(layered, "Weight0", product).unwrap();
        assert!(!graph.check_validation(layered));

        let constant = graph.add_node(ConstantFloatNode::new(0.3));
        graph.connect(layered, "Weight0", constant).unwrap();
        assert!(graph.check_validation(layered));
    }

    #[test]
    fn test_bxdf_inputs_reject_bxdf_nodes() {
        let mut graph = Material::new("m");
        let lambert = graph.add_node(LambertNode::new());
        let mf = graph.add_node(MicrofacetReflectionNode::new());
        graph.connect(mf, "Roughness", lambert).unwrap();
        assert!(!graph.check_validation(mf));

        let mut graph = Material::new("m");
        let on = graph.add_node(OrenNayarNode::new());
        let other = graph.add_node(OrenNayarNode::new());
        graph.connect(on, "BaseColor", other).unwrap();
        assert!(!graph.check_validation(on));
    }

    #[test]
    fn test_texture_inputs_are_valid() {
        let mut graph = Material::new("m");
        let lambert = graph.add_node(LambertNode::new());
        let checker = graph.add_node(CheckerNode::new());
        graph.connect(lambert, "BaseColor", checker).unwrap();
        graph.set_output(lambert).unwrap();
        assert!(graph.check_validation(lambert));
        assert_eq!(graph.validate(), Ok(()));
    }

    #[test]
    fn test_settings_cannot_be_linked() {
        let mut graph = Material::new("m");
        let mf = graph.add_node(MicrofacetRefractionNode::new());
        let value = graph.add_node(ConstantFloatNode::new(1.0));
        assert_eq!(
            graph.connect(mf, "Visibility", value),
            Err(GraphError::NotLinkable { node: mf, property: "Visibility".to_owned() })
        );
        assert!(matches!(graph.set(mf, "Roughness", "high"), Err(GraphError::WrongValueType { .. })));
        assert!(matches!(graph.set(mf, "Glossiness", 0.5), Err(GraphError::UnknownProperty { .. })));
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = Material::new("m");
        let lambert = graph.add_node(LambertNode::new());
        let a = graph.add_node(AddNode::new());
        let b = graph.add_node(MultiplyNode::new());
        graph.connect(lambert, "BaseColor", a).unwrap();
        graph.connect(a, "Src0", b).unwrap();
        graph.connect(b, "Src1", a).unwrap();
        graph.set_output(lambert).unwrap();
        assert!(matches!(graph.validate(), Err(GraphError::Cycle(_))));

        // shading an unvalidated cyclic graph still terminates
        let arena = Bump::new();
        let bsdf = graph.compute_bsdf(&interaction(), &arena);
        assert_eq!(bsdf.terms().len(), 1);
    }

    #[test]
    fn test_self_linked_nodes_are_not_reentered() {
        let mut graph = Material::new("m");
        let layered = graph.add_node(LayeredBxdfNode::new());
        for slot in &["Bxdf0", "Bxdf1", "Bxdf2", "Bxdf3"] {
            graph.connect(layered, slot, layered).unwrap();
        }
        graph.set_output(layered).unwrap();
        assert!(matches!(graph.validate(), Err(GraphError::Cycle(_))));

        let arena = Bump::new();
        assert!(graph.compute_bsdf(&interaction(), &arena).is_empty());

        let mut graph = Material::new("m");
        let lambert = graph.add_node(LambertNode::new());
        let sum = graph.add_node(AddNode::new());
        graph.connect(sum, "Src0", sum).unwrap();
        graph.connect(sum, "Src1", sum).unwrap();
        graph.connect(lambert, "BaseColor", sum).unwrap();
        graph.set_output(lambert).unwrap();
        assert_eq!(graph.class_of(sum), Some(NodeClass::Constant));
        assert!(graph.check_validation(lambert));
        assert!(matches!(graph.validate(), Err(GraphError::Cycle(_))));

        let bsdf = graph.compute_bsdf(&interaction(), &arena);
        assert_eq!(bsdf.terms().len(), 1);
        assert!(bsdf.f(vec3f!(0, 0, 1), vec3f!(0, 0, 1), BxDFType::all()).is_black());
    }

    fn nested_layers(children: usize) -> (Material, NodeId) {
        let mut graph = Material::new("nested");
        let root = graph.add_node(LayeredBxdfNode::new());
        for (i, outer_slot) in ["Bxdf0", "Bxdf1", "Bxdf2", "Bxdf3"].iter().take(children).enumerate() {
            let child = graph.add_node(LayeredBxdfNode::new());
            for inner_slot in &["Bxdf0", "Bxdf1", "Bxdf2", "Bxdf3"] {
                let leaf = graph.add_node(LambertNode::new());
                graph.set(leaf, "BaseColor", 0.1 * (i + 1) as crate::Float).unwrap();
                graph.connect(child, inner_slot, leaf).unwrap();
            }
            graph.connect(root, outer_slot, child).unwrap();
        }
        graph.set_output(root).unwrap();
        (graph, root)
    }

    #[test]
    fn test_term_capacity_is_validated() {
        let (graph, _) = nested_layers(4);
        assert_eq!(graph.validate(), Err(GraphError::TooManyTerms { count: 16, max: MAX_BSDF_TERMS }));

        let (graph, _) = nested_layers(2);
        assert_eq!(graph.validate(), Ok(()));
        let arena = Bump::new();
        let bsdf = graph.compute_bsdf(&interaction(), &arena);
        assert_eq!(bsdf.terms().len(), 8);
        let f = bsdf.f(vec3f!(0, 0, 1), vec3f!(0, 0.6, 0.8), BxDFType::all());
        assert_abs_diff_eq!(f[0], 4.0 * (0.1 + 0.2) * FRAC_1_PI, epsilon = 1.0e-6);
    }

    #[test]
    fn test_layered_weight_propagation() {
        let mut graph = Material::new("m");
        let outer = graph.add_node(LayeredBxdfNode::new());
        let inner = graph.add_node(LayeredBxdfNode::new());
        let lambert = graph.add_node(LambertNode::new());
        let w = graph.add_node(ConstantFloatNode::new(0.5));
        graph.connect(inner, "Bxdf2", lambert).unwrap();
        graph.connect(inner, "Weight2", w).unwrap();
        graph.connect(outer, "Bxdf0", inner).unwrap();
        graph.set(outer, "Weight0", Spectrum::rgb(0.2, 0.4, 0.8)).unwrap();
        graph.set_output(outer).unwrap();
        assert_eq!(graph.validate(), Ok(()));

        let arena = Bump::new();
        let bsdf = graph.compute_bsdf(&interaction(), &arena);
        assert_eq!(bsdf.terms().len(), 1);
        let weight = bsdf.terms()[0].weight;
        assert_abs_diff_eq!(weight[0], 0.1);
        assert_abs_diff_eq!(weight[1], 0.2);
        assert_abs_diff_eq!(weight[2], 0.4);
    }

    #[test]
    fn test_layered_sums_weighted_terms() {
        let mut graph = Material::new("m");
        let layered = graph.add_node(LayeredBxdfNode::new());
        let a = graph.add_node(LambertNode::new());
        let b = graph.add_node(LambertNode::new());
        graph.set(b, "BaseColor", Spectrum::uniform(0.5)).unwrap();
        graph.connect(layered, "Bxdf0", a).unwrap();
        graph.connect(layered, "Bxdf3", b).unwrap();
        graph.set(layered, "Weight0", 0.25).unwrap();
        graph.set_output(layered).unwrap();

        let arena = Bump::new();
        let bsdf = graph.compute_bsdf(&interaction(), &arena);
        assert_eq!(bsdf.terms().len(), 2);
        let f = bsdf.f(vec3f!(0, 0, 1), vec3f!(0, 0.6, 0.8), BxDFType::all());
        assert_abs_diff_eq!(f[0], (0.25 + 0.5) * FRAC_1_PI, epsilon = 1.0e-6);
    }

    #[test]
    fn test_unknown_distribution_behaves_like_ggx() {
        let build = |name: &str| {
            let mut graph = Material::from_node("mf", MicrofacetReflectionNode::new());
            let id = graph.output().unwrap();
            graph.set(id, "MicroFacetDistribution", name).unwrap();
            graph.set(id, "Roughness", 0.4).unwrap();
            graph
        };
        let ggx = build("GGX");
        let unknown = build("Phong");

        let arena = Bump::new();
        let si = interaction();
        let wo = vec3f!(0.3, 0.0, 0.95).normalize();
        let wi = vec3f!(-0.2, 0.1, 0.97).normalize();
        let a = ggx.compute_bsdf(&si, &arena).f(wo, wi, BxDFType::all());
        let b = unknown.compute_bsdf(&si, &arena).f(wo, wi, BxDFType::all());
        assert!(!a.is_black());
        assert_eq!(a, b);
    }

    #[test]
    fn test_property_tables() {
        let names = |node: MaterialNode| node.property_names();
        assert_eq!(names(LambertNode::new().into()), vec!["BaseColor"]);
        assert_eq!(names(OrenNayarNode::new().into()), vec!["BaseColor", "Roughness"]);
        assert_eq!(
            names(MicrofacetReflectionNode::new().into()),
            vec!["BaseColor", "MicroFacetDistribution", "Roughness", "Visibility", "eta", "k"]
        );
        assert_eq!(
            names(MicrofacetRefractionNode::new().into()),
            vec!["BaseColor", "MicroFacetDistribution", "Roughness", "Visibility", "ext_ior", "in_ior"]
        );
        assert_eq!(names(MerlNode::new().into()), vec!["Filename"]);
        assert_eq!(names(FourierNode::new().into()), vec!["Filename"]);
        assert_eq!(
            names(LayeredBxdfNode::new().into()),
            vec!["Bxdf0", "Bxdf1", "Bxdf2", "Bxdf3", "Weight0", "Weight1", "Weight2", "Weight3"]
        );
    }

    #[test]
    fn test_post_process_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.binary");
        std::fs::write(&path, constant_merl_bytes((2, 2, 4), [0.3, 0.3, 0.3])).unwrap();

        let mut graph = Material::from_node("merl", MerlNode::new());
        let id = graph.output().unwrap();
        graph.set(id, "Filename", path.to_str().unwrap()).unwrap();
        graph.post_process().unwrap();

        // a second pass must not look at the file name again
        graph.set(id, "Filename", dir.path().join("missing.binary").to_str().unwrap()).unwrap();
        graph.post_process().unwrap();

        let arena = Bump::new();
        let bsdf = graph.compute_bsdf(&interaction(), &arena);
        assert_eq!(bsdf.terms().len(), 1);
    }

    #[test]
    fn test_empty_filename_is_skipped() {
        let mut graph = Material::from_node("merl", MerlNode::new());
        graph.post_process().unwrap();
        match graph.node(graph.output().unwrap()) {
            Some(MaterialNode::Merl(node)) => assert!(node.table().is_none()),
            _ => panic!("expected a MERL node"),
        }
        let arena = Bump::new();
        assert!(graph.compute_bsdf(&interaction(), &arena).is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut graph = Material::from_node("fourier", FourierNode::new());
        let id = graph.output().unwrap();
        graph.set(id, "Filename", dir.path().join("nope.bsdf").to_str().unwrap()).unwrap();
        assert!(graph.post_process().is_err());
    }
}
