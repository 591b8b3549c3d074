use std::sync::Arc;
use crate::{Float, Vec3f};
use crate::geometry::Ray;
use crate::geometry::bounds::Bounds3f;
use crate::interaction::SurfaceInteraction;
use crate::light::area::DiffuseAreaLight;
use crate::material::Material;
use crate::shapes::Shape;
use crate::spectrum::Spectrum;

/// A shape together with what is needed to shade it.
pub struct GeometricPrimitive {
    pub shape: Arc<dyn Shape>,
    pub material: Option<Arc<Material>>,
    pub area_light: Option<Arc<DiffuseAreaLight>>,
}

impl GeometricPrimitive {
    pub fn new(shape: Arc<dyn Shape>, material: Option<Arc<Material>>) -> Self {
        Self { shape, material, area_light: None }
    }

    /// A primitive whose surface also emits `intensity`.
    pub fn emissive(shape: Arc<dyn Shape>, material: Option<Arc<Material>>, intensity: Spectrum) -> Self {
        let area_light = Arc::new(DiffuseAreaLight::new(intensity, shape.clone()));
        Self { shape, material, area_light: Some(area_light) }
    }

    pub fn world_bound(&self) -> Bounds3f {
        self.shape.world_bound()
    }
}

pub struct Intersection<'s> {
    pub t: Float,
    pub si: SurfaceInteraction,
    pub primitive: &'s GeometricPrimitive,
}

impl<'s> Intersection<'s> {
    pub fn material(&self) -> Option<&'s Material> {
        self.primitive.material.as_deref()
    }

    /// Radiance emitted from the hit point towards `w`, zero unless the primitive is a light.
    pub fn emitted_radiance(&self, w: Vec3f) -> Spectrum {
        match &self.primitive.area_light {
            Some(light) => light.le(&self.si, w).radiance,
            None => Spectrum::uniform(0.0),
        }
    }
}

pub trait Aggregate: Sync + Send {
    fn world_bound(&self) -> Bounds3f;

    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>>;

    fn intersect_test(&self, ray: &Ray) -> bool;

    fn primitives(&self) -> &[GeometricPrimitive];
}

/// Tests every primitive in turn.
pub struct PrimitiveList {
    prims: Vec<GeometricPrimitive>,
    bounds: Bounds3f,
}

impl PrimitiveList {
    pub fn new(prims: Vec<GeometricPrimitive>) -> Self {
        let bounds = prims.iter()
            .fold(Bounds3f::empty(), |b, prim| b.join(&prim.world_bound()));
        Self { prims, bounds }
    }
}

impl Aggregate for PrimitiveList {
    fn world_bound(&self) -> Bounds3f {
        self.bounds
    }

    fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        let mut ray = *ray;
        let mut closest = None;
        for prim in &self.prims {
            if let Some((t, si)) = prim.shape.intersect(&ray) {
                ray.t_max = t;
                closest = Some(Intersection { t, si, primitive: prim });
            }
        }
        closest
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.prims.iter().any(|prim| prim.shape.intersect_test(ray))
    }

    fn primitives(&self) -> &[GeometricPrimitive] {
        &self.prims
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Sphere, Disk};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_closest_hit_wins() {
        let far = GeometricPrimitive::new(Arc::new(Sphere::new(point3f!(0, 0, 10), 1.0)), None);
        let near = GeometricPrimitive::new(Arc::new(Disk::new(point3f!(0, 0, 4), vec3f!(0, 0, -1), 2.0)), None);
        let list = PrimitiveList::new(vec![far, near]);

        let hit = list.intersect(&Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1))).unwrap();
        assert_abs_diff_eq!(hit.t, 4.0);
        assert!(hit.material().is_none());
        assert!(hit.emitted_radiance(vec3f!(0, 0, -1)).is_black());

        assert_eq!(list.world_bound().max, point3f!(2, 2, 11));
    }
}
