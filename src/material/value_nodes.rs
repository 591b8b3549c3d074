use crate::SurfaceInteraction;
use crate::spectrum::Spectrum;
use crate::material::Material;
use crate::material::node::{GraphPath, PropertySlot, Value};

pub struct ConstantFloatNode {
    pub value: PropertySlot,
}

impl ConstantFloatNode {
    pub fn new(value: crate::Float) -> Self {
        Self { value: PropertySlot::setting(value) }
    }

    pub(crate) fn evaluate(&self) -> Value {
        Value::Float(self.value.value.to_float())
    }
}

node_properties!(ConstantFloatNode { "Value" => value });

pub struct ConstantColorNode {
    pub color: PropertySlot,
}

impl ConstantColorNode {
    pub fn new(color: Spectrum) -> Self {
        Self { color: PropertySlot::setting(color) }
    }

    pub(crate) fn evaluate(&self) -> Value {
        Value::Color(self.color.value.to_spectrum())
    }
}

node_properties!(ConstantColorNode { "Color" => color });

pub struct AddNode {
    pub src0: PropertySlot,
    pub src1: PropertySlot,
}

impl AddNode {
    pub fn new() -> Self {
        Self { src0: PropertySlot::value(0.0), src1: PropertySlot::value(0.0) }
    }

    pub(crate) fn evaluate(&self, graph: &Material, si: &SurfaceInteraction, path: &GraphPath<'_>) -> Value {
        let a = graph.resolve_at(&self.src0, si, path).to_spectrum();
        let b = graph.resolve_at(&self.src1, si, path).to_spectrum();
        Value::Color(a + b)
    }
}

impl Default for AddNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(AddNode { "Src0" => src0, "Src1" => src1 });

pub struct MultiplyNode {
    pub src0: PropertySlot,
    pub src1: PropertySlot,
}

impl MultiplyNode {
    pub fn new() -> Self {
        Self { src0: PropertySlot::value(1.0), src1: PropertySlot::value(1.0) }
    }

    pub(crate) fn evaluate(&self, graph: &Material, si: &SurfaceInteraction, path: &GraphPath<'_>) -> Value {
        let a = graph.resolve_at(&self.src0, si, path).to_spectrum();
        let b = graph.resolve_at(&self.src1, si, path).to_spectrum();
        Value::Color(a * b)
    }
}

impl Default for MultiplyNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(MultiplyNode { "Src0" => src0, "Src1" => src1 });

/// Linear blend from `Src0` to `Src1` by `Factor`.
pub struct LerpNode {
    pub src0: PropertySlot,
    pub src1: PropertySlot,
    pub factor: PropertySlot,
}

impl LerpNode {
    pub fn new() -> Self {
        Self {
            src0: PropertySlot::value(0.0),
            src1: PropertySlot::value(1.0),
            factor: PropertySlot::value(0.5),
        }
    }

    pub(crate) fn evaluate(&self, graph: &Material, si: &SurfaceInteraction, path: &GraphPath<'_>) -> Value {
        let a = graph.resolve_at(&self.src0, si, path).to_spectrum();
        let b = graph.resolve_at(&self.src1, si, path).to_spectrum();
        let t = graph.resolve_at(&self.factor, si, path).to_float();
        Value::Color(Spectrum::lerp(t, a, b))
    }
}

impl Default for LerpNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(LerpNode { "Src0" => src0, "Src1" => src1, "Factor" => factor });

/// Checkerboard over the surface (u, v) parametrization.
pub struct CheckerNode {
    pub color0: PropertySlot,
    pub color1: PropertySlot,
    pub scale: PropertySlot,
}

impl CheckerNode {
    pub fn new() -> Self {
        Self {
            color0: PropertySlot::value(Spectrum::uniform(0.0)),
            color1: PropertySlot::value(Spectrum::uniform(1.0)),
            scale: PropertySlot::value(10.0),
        }
    }

    pub(crate) fn evaluate(&self, graph: &Material, si: &SurfaceInteraction, path: &GraphPath<'_>) -> Value {
        let scale = graph.resolve_at(&self.scale, si, path).to_float();
        let s = si.uv.x * scale;
        let t = si.uv.y * scale;
        if (s.floor() as i32 + t.floor() as i32) % 2 == 0 {
            Value::Color(graph.resolve_at(&self.color0, si, path).to_spectrum())
        } else {
            Value::Color(graph.resolve_at(&self.color1, si, path).to_spectrum())
        }
    }
}

impl Default for CheckerNode {
    fn default() -> Self {
        Self::new()
    }
}

node_properties!(CheckerNode { "Color0" => color0, "Color1" => color1, "Scale" => scale });

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point2f, Point3f, Normal3};
    use approx::assert_abs_diff_eq;

    fn interaction_at(u: crate::Float, v: crate::Float) -> SurfaceInteraction {
        SurfaceInteraction::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point2f::new(u, v),
            vec3f!(0, 0, 1),
            Normal3::new(0.0, 0.0, 1.0),
            vec3f!(1, 0, 0),
        )
    }

    #[test]
    fn test_arithmetic_chain() {
        let mut graph = Material::new("arith");
        let two = graph.add_node(ConstantFloatNode::new(2.0));
        let three = graph.add_node(ConstantFloatNode::new(3.0));
        let sum = graph.add_node(AddNode::new());
        graph.connect(sum, "Src0", two).unwrap();
        graph.connect(sum, "Src1", three).unwrap();
        let product = graph.add_node(MultiplyNode::new());
        graph.connect(product, "Src0", sum).unwrap();
        graph.set(product, "Src1", 0.5).unwrap();

        let slot = PropertySlot { link: Some(product), ..PropertySlot::value(0.0) };
        let v = graph.resolve(&slot, &interaction_at(0.0, 0.0));
        assert_abs_diff_eq!(v.to_float(), 2.5);
    }

    #[test]
    fn test_lerp_blends() {
        let mut graph = Material::new("lerp");
        let lerp = graph.add_node(LerpNode::new());
        graph.set(lerp, "Src0", Spectrum::rgb(0.0, 0.0, 1.0)).unwrap();
        graph.set(lerp, "Src1", Spectrum::rgb(1.0, 0.0, 0.0)).unwrap();
        graph.set(lerp, "Factor", 0.25).unwrap();

        let slot = PropertySlot { link: Some(lerp), ..PropertySlot::value(0.0) };
        let v = graph.resolve(&slot, &interaction_at(0.0, 0.0)).to_spectrum();
        assert_abs_diff_eq!(v[0], 0.25);
        assert_abs_diff_eq!(v[2], 0.75);
    }

    #[test]
    fn test_checker_alternates() {
        let mut graph = Material::new("checker");
        let checker = graph.add_node(CheckerNode::new());
        graph.set(checker, "Scale", 2.0).unwrap();
        let slot = PropertySlot { link: Some(checker), ..PropertySlot::value(0.0) };

        let a = graph.resolve(&slot, &interaction_at(0.1, 0.1)).to_spectrum();
        let b = graph.resolve(&slot, &interaction_at(0.6, 0.1)).to_spectrum();
        assert_eq!(a, Spectrum::uniform(0.0));
        assert_eq!(b, Spectrum::uniform(1.0));
    }
}
