use std::sync::Arc;

use approx::assert_abs_diff_eq;
use bumpalo::Bump;
use cgmath::Point2;

use lumen::{point3f, vec3f, Float};
use lumen::consts::{FRAC_1_PI, TWO_PI, PI};
use lumen::geometry::Ray;
use lumen::integrator::{IntegratorRadiance, SamplerIntegrator, WhittedIntegrator};
use lumen::light::{Light, PointLight, SkyLight, DiffuseAreaLight};
use lumen::material::{Material, LambertNode};
use lumen::primitive::{GeometricPrimitive, PrimitiveList};
use lumen::sampler::{PixelSample, RandomSampler};
use lumen::scene::Scene;
use lumen::shapes::{Disk, Sphere, Shape};
use lumen::spectrum::Spectrum;

fn grey_floor() -> GeometricPrimitive {
    let mut material = Material::from_node("grey", LambertNode::new());
    let out = material.output().unwrap();
    material.set(out, "BaseColor", 0.5).unwrap();
    material.validate().unwrap();
    GeometricPrimitive::new(
        Arc::new(Disk::new(point3f!(0, 0, 0), vec3f!(0, 0, 1), 5.0)),
        Some(Arc::new(material)),
    )
}

fn overhead_point() -> Box<dyn Light> {
    Box::new(PointLight::new(point3f!(0, 0, 2), Spectrum::uniform(4.0)))
}

fn scene(prims: Vec<GeometricPrimitive>, lights: Vec<Box<dyn Light>>) -> Scene {
    Scene::new(Box::new(PrimitiveList::new(prims)), lights)
}

fn pixel_sample() -> PixelSample {
    PixelSample { light: Point2::new(0.5, 0.5), bsdf: Point2::new(0.5, 0.5) }
}

fn down_ray() -> Ray {
    Ray::new(point3f!(0, 0, 1), vec3f!(0, 0, -1))
}

fn estimate(scene: &Scene, ray: &Ray) -> Spectrum {
    let arena = Bump::new();
    WhittedIntegrator::new(3).incident_radiance(ray, scene, &pixel_sample(), &arena)
}

#[test]
fn point_light_over_diffuse_floor() {
    let scene = scene(vec![grey_floor()], vec![overhead_point()]);
    let l = estimate(&scene, &down_ray());
    // I / d^2 * R / pi * cos
    for i in 0..3 {
        assert_abs_diff_eq!(l[i], 0.5 * FRAC_1_PI, epsilon = 1e-5);
    }
}

#[test]
fn depth_past_limit_is_black() {
    let scene = scene(vec![grey_floor()], vec![overhead_point()]);
    let integrator = WhittedIntegrator::new(3);
    let arena = Bump::new();

    let at_limit = integrator.incident_radiance(&down_ray().with_depth(3), &scene, &pixel_sample(), &arena);
    assert!(!at_limit.is_black());

    let past_limit = integrator.incident_radiance(&down_ray().with_depth(4), &scene, &pixel_sample(), &arena);
    assert!(past_limit.is_black());
}

#[test]
fn miss_returns_environment() {
    let sky = Spectrum::rgb(0.2, 0.3, 0.4);
    let scene = scene(vec![grey_floor()], vec![overhead_point(), Box::new(SkyLight::new(sky))]);
    let up = Ray::new(point3f!(0, 0, 1), vec3f!(0, 0, 1));
    assert_eq!(estimate(&scene, &up), sky);
    assert_eq!(estimate(&scene, &up), scene.environment_emitted_radiance(&up));

    // the sky is not a delta light and adds nothing to the direct estimate
    let l = estimate(&scene, &down_ray());
    assert_abs_diff_eq!(l[0], 0.5 * FRAC_1_PI, epsilon = 1e-5);
}

#[test]
fn area_lights_are_ignored() {
    let point_only = scene(vec![grey_floor()], vec![overhead_point()]);
    let lamp = GeometricPrimitive::emissive(
        Arc::new(Sphere::new(point3f!(3, 0, 1), 0.5)),
        None,
        Spectrum::uniform(100.0),
    );
    let with_area = scene(vec![grey_floor(), lamp], vec![overhead_point()]);
    assert_eq!(with_area.lights.len(), 2);

    assert_eq!(estimate(&point_only, &down_ray()), estimate(&with_area, &down_ray()));
}

#[test]
fn hit_without_material_is_black() {
    let lamp = GeometricPrimitive::emissive(
        Arc::new(Sphere::new(point3f!(0, 0, 0), 0.5)),
        None,
        Spectrum::uniform(100.0),
    );
    let scene = scene(vec![lamp], vec![overhead_point()]);
    assert!(estimate(&scene, &down_ray()).is_black());
}

#[test]
fn occluded_light_contributes_nothing() {
    let blocker = GeometricPrimitive::new(Arc::new(Sphere::new(point3f!(0, 0, 1.5), 0.2)), None);
    let scene = scene(vec![grey_floor(), blocker], vec![overhead_point()]);
    assert!(estimate(&scene, &down_ray()).is_black());
}

#[test]
fn light_below_surface_contributes_nothing() {
    let below: Box<dyn Light> = Box::new(PointLight::new(point3f!(1, 0, -2), Spectrum::uniform(4.0)));
    let scene = scene(vec![grey_floor()], vec![below]);
    assert!(estimate(&scene, &down_ray()).is_black());
}

#[test]
fn area_light_power_and_degenerate_sample() {
    let radius: Float = 0.5;
    let disk = Arc::new(Disk::new(point3f!(0, 0, 1), vec3f!(0, 0, -1), radius));
    let light = DiffuseAreaLight::new(Spectrum::uniform(2.0), disk.clone());
    assert_abs_diff_eq!(light.power()[0], 2.0 * PI * radius * radius * TWO_PI, epsilon = 1e-4);
    assert_abs_diff_eq!(disk.area(), PI * radius * radius, epsilon = 1e-6);

    // reference point in the plane of the disk sees it edge-on
    let ls = light.sample_incident_radiance(point3f!(2, 0, 1), Point2::new(0.25, 0.75));
    assert_eq!(ls.pdf, 0.0);
    assert!(ls.radiance.is_black());
}

#[test]
fn parallel_rays_match_single_evaluation() {
    let scene = scene(vec![grey_floor()], vec![overhead_point()]);
    let integrator = SamplerIntegrator::new(
        Box::new(RandomSampler::new_with_seed(1)),
        WhittedIntegrator::new(3),
    );
    let rays: Vec<Ray> = (0..200)
        .map(|i| {
            let x = (i as Float / 200.0 - 0.5) * 4.0;
            Ray::new(point3f!(x, 0, 1), vec3f!(0, 0, -1))
        })
        .collect();

    let out = integrator.render_rays(&scene, &rays);
    assert_eq!(out.len(), rays.len());
    for (ray, l) in rays.iter().zip(out) {
        assert_eq!(l, estimate(&scene, ray));
    }
}
