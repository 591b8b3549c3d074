use std::sync::Arc;
use crate::geometry::Ray;
use crate::geometry::bounds::Bounds3f;
use crate::light::Light;
use crate::primitive::{Aggregate, Intersection};
use crate::spectrum::Spectrum;

pub struct Scene {
    pub aggregate: Box<dyn Aggregate>,
    pub lights: Vec<Arc<dyn Light>>,
}

impl Scene {
    /// Lights are preprocessed against the geometry bounds, then the area lights of the
    /// emissive primitives are appended.
    pub fn new(aggregate: Box<dyn Aggregate>, lights: Vec<Box<dyn Light>>) -> Self {
        let bounds = aggregate.world_bound();
        let mut scene_lights: Vec<Arc<dyn Light>> = Vec::with_capacity(lights.len());
        for mut light in lights {
            light.preprocess(&bounds);
            scene_lights.push(Arc::from(light));
        }

        for prim in aggregate.primitives() {
            if let Some(light) = &prim.area_light {
                scene_lights.push(light.clone());
            }
        }

        Self {
            aggregate,
            lights: scene_lights,
        }
    }

    pub fn intersect(&self, ray: &Ray) -> Option<Intersection<'_>> {
        self.aggregate.intersect(ray)
    }

    pub fn intersect_test(&self, ray: &Ray) -> bool {
        self.aggregate.intersect_test(ray)
    }

    pub fn world_bound(&self) -> Bounds3f {
        self.aggregate.world_bound()
    }

    /// Radiance carried by a ray that leaves the scene.
    pub fn environment_emitted_radiance(&self, ray: &Ray) -> Spectrum {
        self.lights.iter()
            .map(|light| light.environment_emitted_radiance(ray))
            .sum()
    }
}
