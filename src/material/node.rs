use crate::{Float, SurfaceInteraction};
use crate::spectrum::Spectrum;
use crate::material::{Material, NodeId, MAX_GRAPH_DEPTH};
use crate::material::value_nodes::*;
use crate::material::bxdf_nodes::*;
use crate::reflection::bsdf::Bsdf;
use bumpalo::Bump;

/// Value stored in, or produced for, a property.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Float(Float),
    Color(Spectrum),
    Str(String),
}

impl Value {
    pub fn to_spectrum(&self) -> Spectrum {
        match self {
            Value::Float(x) => Spectrum::uniform(*x),
            Value::Color(c) => *c,
            Value::Str(_) => Spectrum::uniform(0.0),
        }
    }

    /// Colors reduce to their first channel.
    pub fn to_float(&self) -> Float {
        match self {
            Value::Float(x) => *x,
            Value::Color(c) => c[0],
            Value::Str(_) => 0.0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Value::Str(s) => s,
            _ => "",
        }
    }

    pub(crate) fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }
}

impl From<Float> for Value {
    fn from(x: Float) -> Self {
        Value::Float(x)
    }
}

impl From<Spectrum> for Value {
    fn from(c: Spectrum) -> Self {
        Value::Color(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// What a node produces, which decides where it may be connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClass {
    /// Values that are the same at every shading point
    Constant,
    /// Values that vary over the surface
    Texture,
    /// Reflectance
    Bxdf,
}

/// Which upstream nodes a property can take its value from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accepts {
    /// Any node producing a value
    Values,
    ConstantOnly,
    BxdfOnly,
    /// Configuration that is never connected
    Setting,
}

impl Accepts {
    pub fn allows(self, class: NodeClass) -> bool {
        match self {
            Accepts::Values => class != NodeClass::Bxdf,
            Accepts::ConstantOnly => class == NodeClass::Constant,
            Accepts::BxdfOnly => class == NodeClass::Bxdf,
            Accepts::Setting => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropertySlot {
    pub value: Value,
    pub link: Option<NodeId>,
    pub accepts: Accepts,
}

impl PropertySlot {
    pub fn value(value: impl Into<Value>) -> Self {
        Self { value: value.into(), link: None, accepts: Accepts::Values }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Self { value: value.into(), link: None, accepts: Accepts::ConstantOnly }
    }

    pub fn bxdf() -> Self {
        Self { value: Value::Float(0.0), link: None, accepts: Accepts::BxdfOnly }
    }

    pub fn setting(value: impl Into<Value>) -> Self {
        Self { value: value.into(), link: None, accepts: Accepts::Setting }
    }
}

/// The property table of a node kind.
pub trait NodeProperties {
    fn slots(&self) -> Vec<(&'static str, &PropertySlot)>;

    fn slot_mut(&mut self, name: &str) -> Option<&mut PropertySlot>;

    /// Called after the value of `name` changed.
    fn property_changed(&mut self, _name: &str) {}
}

/// Implements [`NodeProperties`] for a node whose properties are plain fields.
macro_rules! node_properties {
    ($node:ty { $($name:literal => $field:ident),* $(,)? } $(, on_change = $hook:ident)?) => {
        impl $crate::material::node::NodeProperties for $node {
            fn slots(&self) -> Vec<(&'static str, &$crate::material::node::PropertySlot)> {
                vec![$(($name, &self.$field)),*]
            }

            fn slot_mut(&mut self, name: &str) -> Option<&mut $crate::material::node::PropertySlot> {
                match name {
                    $($name => Some(&mut self.$field),)*
                    _ => None,
                }
            }

            $(fn property_changed(&mut self, name: &str) {
                self.$hook(name)
            })?
        }
    };
}

/// Per-evaluation state handed down while materializing a BSDF.
pub struct ShadingContext<'a, 's> {
    pub graph: &'a Material,
    pub si: &'s SurfaceInteraction,
    pub arena: &'a Bump,
}

impl<'a, 's> ShadingContext<'a, 's> {
    pub fn resolve(&self, slot: &PropertySlot, path: &GraphPath<'_>) -> Value {
        self.graph.resolve_at(slot, self.si, path)
    }
}

/// The chain of nodes currently being evaluated, innermost first. A link back into the
/// chain is never followed, so evaluation of a cyclic graph still finishes.
#[derive(Clone, Copy, Debug)]
pub struct GraphPath<'p> {
    node: Option<NodeId>,
    parent: Option<&'p GraphPath<'p>>,
    depth: u32,
}

impl<'p> GraphPath<'p> {
    pub fn root() -> Self {
        Self { node: None, parent: None, depth: 0 }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        let mut cur = Some(self);
        while let Some(p) = cur {
            if p.node == Some(id) {
                return true;
            }
            cur = p.parent;
        }
        false
    }

    /// Step into node `id`. `None` if it is already on the path or the path is too long.
    pub fn enter(&'p self, id: NodeId) -> Option<GraphPath<'p>> {
        if self.depth >= MAX_GRAPH_DEPTH || self.contains(id) {
            return None;
        }
        Some(GraphPath { node: Some(id), parent: Some(self), depth: self.depth + 1 })
    }
}

pub enum MaterialNode {
    ConstantFloat(ConstantFloatNode),
    ConstantColor(ConstantColorNode),
    Add(AddNode),
    Multiply(MultiplyNode),
    Lerp(LerpNode),
    Checker(CheckerNode),
    Lambert(LambertNode),
    OrenNayar(OrenNayarNode),
    Merl(MerlNode),
    Fourier(FourierNode),
    MicrofacetReflection(MicrofacetReflectionNode),
    MicrofacetRefraction(MicrofacetRefractionNode),
    Layered(LayeredBxdfNode),
}

macro_rules! dispatch {
    ($self:expr, $n:ident => $e:expr) => {
        match $self {
            MaterialNode::ConstantFloat($n) => $e,
            MaterialNode::ConstantColor($n) => $e,
            MaterialNode::Add($n) => $e,
            MaterialNode::Multiply($n) => $e,
            MaterialNode::Lerp($n) => $e,
            MaterialNode::Checker($n) => $e,
            MaterialNode::Lambert($n) => $e,
            MaterialNode::OrenNayar($n) => $e,
            MaterialNode::Merl($n) => $e,
            MaterialNode::Fourier($n) => $e,
            MaterialNode::MicrofacetReflection($n) => $e,
            MaterialNode::MicrofacetRefraction($n) => $e,
            MaterialNode::Layered($n) => $e,
        }
    };
}

impl MaterialNode {
    pub fn type_name(&self) -> &'static str {
        match self {
            MaterialNode::ConstantFloat(_) => "ConstantFloat",
            MaterialNode::ConstantColor(_) => "ConstantColor",
            MaterialNode::Add(_) => "Add",
            MaterialNode::Multiply(_) => "Multiply",
            MaterialNode::Lerp(_) => "Lerp",
            MaterialNode::Checker(_) => "Checker",
            MaterialNode::Lambert(_) => "Lambert",
            MaterialNode::OrenNayar(_) => "OrenNayar",
            MaterialNode::Merl(_) => "Merl",
            MaterialNode::Fourier(_) => "Fourier",
            MaterialNode::MicrofacetReflection(_) => "MicrofacetReflection",
            MaterialNode::MicrofacetRefraction(_) => "MicrofacetRefraction",
            MaterialNode::Layered(_) => "LayeredBxdf",
        }
    }

    /// The class this node kind produces on its own. Arithmetic nodes report `Constant`;
    /// the graph refines that by looking at their inputs.
    pub fn class(&self) -> NodeClass {
        match self {
            MaterialNode::ConstantFloat(_)
            | MaterialNode::ConstantColor(_)
            | MaterialNode::Add(_)
            | MaterialNode::Multiply(_)
            | MaterialNode::Lerp(_) => NodeClass::Constant,
            MaterialNode::Checker(_) => NodeClass::Texture,
            MaterialNode::Lambert(_)
            | MaterialNode::OrenNayar(_)
            | MaterialNode::Merl(_)
            | MaterialNode::Fourier(_)
            | MaterialNode::MicrofacetReflection(_)
            | MaterialNode::MicrofacetRefraction(_)
            | MaterialNode::Layered(_) => NodeClass::Bxdf,
        }
    }

    /// Whether the class depends on what the inputs are connected to.
    pub(crate) fn inherits_class(&self) -> bool {
        matches!(self, MaterialNode::Add(_) | MaterialNode::Multiply(_) | MaterialNode::Lerp(_))
    }

    pub fn slots(&self) -> Vec<(&'static str, &PropertySlot)> {
        dispatch!(self, n => n.slots())
    }

    pub fn slot(&self, name: &str) -> Option<&PropertySlot> {
        self.slots().into_iter().find(|(n, _)| *n == name).map(|(_, slot)| slot)
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut PropertySlot> {
        dispatch!(self, n => n.slot_mut(name))
    }

    pub(crate) fn property_changed(&mut self, name: &str) {
        dispatch!(self, n => n.property_changed(name))
    }

    /// Names of every property this node kind recognizes, sorted.
    pub fn property_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots().into_iter().map(|(name, _)| name).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn links(&self) -> impl Iterator<Item=NodeId> + '_ {
        self.slots().into_iter().filter_map(|(_, slot)| slot.link)
    }

    /// Output of a value node at the shading point. Reflectance nodes have no value.
    pub(crate) fn evaluate(&self, graph: &Material, si: &SurfaceInteraction, path: &GraphPath<'_>) -> Value {
        match self {
            MaterialNode::ConstantFloat(n) => n.evaluate(),
            MaterialNode::ConstantColor(n) => n.evaluate(),
            MaterialNode::Add(n) => n.evaluate(graph, si, path),
            MaterialNode::Multiply(n) => n.evaluate(graph, si, path),
            MaterialNode::Lerp(n) => n.evaluate(graph, si, path),
            MaterialNode::Checker(n) => n.evaluate(graph, si, path),
            _ => Value::Float(0.0),
        }
    }

    /// Append this node's reflectance terms to `bsdf`, each scaled by `weight`.
    pub(crate) fn update_bsdf<'a>(
        &'a self,
        ctx: &ShadingContext<'a, '_>,
        bsdf: &mut Bsdf<'a>,
        weight: Spectrum,
        path: &GraphPath<'_>,
    ) {
        match self {
            MaterialNode::Lambert(n) => n.update_bsdf(ctx, bsdf, weight, path),
            MaterialNode::OrenNayar(n) => n.update_bsdf(ctx, bsdf, weight, path),
            MaterialNode::Merl(n) => n.update_bsdf(ctx, bsdf, weight),
            MaterialNode::Fourier(n) => n.update_bsdf(ctx, bsdf, weight),
            MaterialNode::MicrofacetReflection(n) => n.update_bsdf(ctx, bsdf, weight, path),
            MaterialNode::MicrofacetRefraction(n) => n.update_bsdf(ctx, bsdf, weight, path),
            MaterialNode::Layered(n) => n.update_bsdf(ctx, bsdf, weight, path),
            _ => {},
        }
    }

    pub(crate) fn post_process(&mut self) -> anyhow::Result<()> {
        match self {
            MaterialNode::Merl(n) => n.post_process(),
            MaterialNode::Fourier(n) => n.post_process(),
            _ => Ok(()),
        }
    }
}

macro_rules! impl_from_node {
    ($($variant:ident($node:ty)),* $(,)?) => {
        $(impl From<$node> for MaterialNode {
            fn from(n: $node) -> Self {
                MaterialNode::$variant(n)
            }
        })*
    };
}

impl_from_node!(
    ConstantFloat(ConstantFloatNode),
    ConstantColor(ConstantColorNode),
    Add(AddNode),
    Multiply(MultiplyNode),
    Lerp(LerpNode),
    Checker(CheckerNode),
    Lambert(LambertNode),
    OrenNayar(OrenNayarNode),
    Merl(MerlNode),
    Fourier(FourierNode),
    MicrofacetReflection(MicrofacetReflectionNode),
    MicrofacetRefraction(MicrofacetRefractionNode),
    Layered(LayeredBxdfNode),
);
