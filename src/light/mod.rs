use crate::{Point2f, Point3f, Vec3f, Float};
use crate::geometry::{Ray, Normal3};
use crate::geometry::bounds::Bounds3f;
use crate::interaction::SHADOW_EPSILON;
use crate::spectrum::Spectrum;
use crate::scene::Scene;
use num::Zero;

pub mod point;
pub mod distant;
pub mod area;
pub mod sky;

pub use point::PointLight;
pub use distant::DistantLight;
pub use area::DiffuseAreaLight;
pub use sky::SkyLight;

pub trait Light: Sync + Send {
    fn flags(&self) -> LightFlags;

    fn is_delta(&self) -> bool {
        self.flags().is_delta_light()
    }

    /// Called once with the bounds of the scene geometry before rendering.
    fn preprocess(&mut self, _world_bound: &Bounds3f) {}

    fn sample_incident_radiance(&self, reference: Point3f, u: Point2f) -> LiSample;

    /// The probability density with respect to solid angle for the light's
    /// `sample_incident_radiance` method to sample the direction `wi` from the reference
    /// point `reference`.
    fn pdf_incident_radiance(&self, reference: Point3f, wi: Vec3f) -> Float;

    /// Sample a ray leaving the light, for algorithms that trace paths from the lights.
    fn sample_emitted_ray(&self, u_pos: Point2f, u_dir: Point2f) -> EmittedRaySample;

    /// Total emitted power.
    fn power(&self) -> Spectrum;

    fn environment_emitted_radiance(&self, _ray: &Ray) -> Spectrum {
        Spectrum::uniform(0.0)
    }
}

pub struct LiSample {
    pub radiance: Spectrum,

    /// The direction *towards* the illumination
    pub wi: Vec3f,

    pub pdf: Float,

    /// Distance to the sampled point on the light
    pub distance: Float,

    /// Density of emitting along `-wi` from the sampled point
    pub emission_pdf: Float,

    pub cos_at_light: Float,

    pub vis: VisibilityTester,
}

impl LiSample {
    /// A sample carrying no light. Everything but the radiance and pdf is meaningless.
    pub fn black(reference: Point3f) -> Self {
        Self {
            radiance: Spectrum::uniform(0.0),
            wi: Vec3f::zero(),
            pdf: 0.0,
            distance: 0.0,
            emission_pdf: 0.0,
            cos_at_light: 0.0,
            vis: VisibilityTester { ray: Ray::segment(reference, Vec3f::new(0.0, 0.0, 1.0), 0.0, 0.0) },
        }
    }
}

pub struct EmittedRaySample {
    pub radiance: Spectrum,
    pub ray: Ray,
    pub normal: Normal3,

    /// Density of the ray origin with respect to area
    pub pdf_pos: Float,

    /// Density of the ray direction with respect to solid angle
    pub pdf_dir: Float,

    pub cos_at_light: Float,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightFlags {
    DeltaPosition, DeltaDirection, Area, Infinite
}

impl LightFlags {
    pub fn is_delta_light(&self) -> bool {
        match self {
            LightFlags::DeltaDirection | LightFlags::DeltaPosition => true,
            _ => false
        }
    }
}

/// Shadow ray between a shading point and a sampled light point.
pub struct VisibilityTester {
    pub ray: Ray,
}

impl VisibilityTester {
    /// Segment from `from` towards `wi` of length `distance`, pulled in by
    /// [`SHADOW_EPSILON`] at both ends.
    pub fn segment(from: Point3f, wi: Vec3f, distance: Float) -> Self {
        Self { ray: Ray::segment(from, wi, SHADOW_EPSILON, distance - SHADOW_EPSILON) }
    }

    /// Unbounded shadow ray, for lights at infinity.
    pub fn towards_infinity(from: Point3f, wi: Vec3f) -> Self {
        Self { ray: Ray::segment(from, wi, SHADOW_EPSILON, Float::INFINITY) }
    }

    pub fn unoccluded(&self, scene: &Scene) -> bool {
        !scene.intersect_test(&self.ray)
    }
}
