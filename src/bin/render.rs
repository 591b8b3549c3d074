use std::env::args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use cgmath::InnerSpace;
use tracing::info;

use lumen::{point3f, vec3f, Float, Vec3f};
use lumen::geometry::Ray;
use lumen::integrator::{IntegratorRadiance, SamplerIntegrator, WhittedIntegrator};
use lumen::light::{Light, PointLight, DistantLight, SkyLight};
use lumen::material::{Material, LambertNode, CheckerNode, LayeredBxdfNode, MicrofacetReflectionNode, MultiplyNode};
use lumen::primitive::{GeometricPrimitive, PrimitiveList};
use lumen::sampler::RandomSampler;
use lumen::scene::Scene;
use lumen::shapes::{Disk, Sphere};
use lumen::spectrum::{Spectrum, spectrum_into_rgb8};

const WIDTH: usize = 320;
const HEIGHT: usize = 240;

fn floor_material() -> anyhow::Result<Material> {
    let mut material = Material::new("floor");
    let checker = material.add_node(CheckerNode::new());
    material.set(checker, "Color0", Spectrum::rgb(0.2, 0.2, 0.25))?;
    material.set(checker, "Color1", Spectrum::rgb(0.8, 0.8, 0.75))?;
    material.set(checker, "Scale", 8.0)?;
    let lambert = material.add_node(LambertNode::new());
    material.connect(lambert, "BaseColor", checker)?;
    material.set_output(lambert)?;
    Ok(material)
}

/// Diffuse base with a glossy gold coat.
fn coated_material() -> anyhow::Result<Material> {
    let mut material = Material::new("coated");
    let base = material.add_node(LambertNode::new());
    material.set(base, "BaseColor", Spectrum::rgb(0.6, 0.1, 0.1))?;
    let coat = material.add_node(MicrofacetReflectionNode::new());
    material.set(coat, "Roughness", 0.3)?;
    material.set(coat, "Visibility", "SmithJointApprox")?;

    let tint = material.add_node(MultiplyNode::new());
    material.set(tint, "Src0", 0.5)?;
    material.set(tint, "Src1", 0.8)?;

    let layered = material.add_node(LayeredBxdfNode::new());
    material.connect(layered, "Bxdf0", base)?;
    material.connect(layered, "Bxdf1", coat)?;
    material.connect(layered, "Weight1", tint)?;
    material.set_output(layered)?;
    Ok(material)
}

fn build_scene() -> anyhow::Result<Scene> {
    let mut materials = vec![floor_material()?, coated_material()?];
    for material in &mut materials {
        material.validate().with_context(|| format!("invalid material {:?}", material.name))?;
        material.post_process()?;
    }
    let coated = Arc::new(materials.pop().context("missing material")?);
    let floor = Arc::new(materials.pop().context("missing material")?);

    let prims = vec![
        GeometricPrimitive::new(Arc::new(Disk::new(point3f!(0, 0, 0), vec3f!(0, 1, 0), 10.0)), Some(floor)),
        GeometricPrimitive::new(Arc::new(Sphere::new(point3f!(0, 1, 0), 1.0)), Some(coated)),
        GeometricPrimitive::emissive(
            Arc::new(Sphere::new(point3f!(-2.5, 3, -1), 0.3)),
            None,
            Spectrum::uniform(10.0),
        ),
    ];

    let lights: Vec<Box<dyn Light>> = vec![
        Box::new(PointLight::new(point3f!(2, 4, 3), Spectrum::uniform(20.0))),
        Box::new(DistantLight::new(Spectrum::rgb(0.4, 0.4, 0.35), vec3f!(-1, 2, 1))),
        Box::new(SkyLight::new(Spectrum::rgb(0.1, 0.15, 0.3))),
    ];

    Ok(Scene::new(Box::new(PrimitiveList::new(prims)), lights))
}

/// One ray per pixel through a pinhole at `eye` looking at `target`.
fn camera_rays(eye: lumen::Point3f, target: lumen::Point3f, fov_degrees: Float) -> Vec<Ray> {
    let forward = (target - eye).normalize();
    let right = forward.cross(Vec3f::unit_y()).normalize();
    let up = right.cross(forward);
    let half_height = (fov_degrees.to_radians() / 2.0).tan();
    let half_width = half_height * WIDTH as Float / HEIGHT as Float;

    let mut rays = Vec::with_capacity(WIDTH * HEIGHT);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let sx = (2.0 * (x as Float + 0.5) / WIDTH as Float - 1.0) * half_width;
            let sy = (1.0 - 2.0 * (y as Float + 0.5) / HEIGHT as Float) * half_height;
            let dir = (forward + right * sx + up * sy).normalize();
            rays.push(Ray::new(eye, dir));
        }
    }
    rays
}

fn write_ppm(path: &PathBuf, pixels: &[Spectrum]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write!(out, "P6\n{} {}\n255\n", WIDTH, HEIGHT)?;
    for &p in pixels {
        out.write_all(&spectrum_into_rgb8(p))?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let path = PathBuf::from(args().nth(1).unwrap_or_else(|| "render.ppm".to_string()));

    let scene = build_scene()?;
    let integrator = SamplerIntegrator::new(
        Box::new(RandomSampler::new_with_seed(0)),
        WhittedIntegrator::new(5),
    );
    integrator.radiance.output_log();

    let rays = camera_rays(point3f!(0, 2.5, 6), point3f!(0, 0.8, 0), 45.0);
    let start = Instant::now();
    let pixels = integrator.render_rays(&scene, &rays);
    info!(elapsed = ?start.elapsed(), rays = rays.len(), "render finished");

    write_ppm(&path, &pixels)?;
    info!(path = %path.display(), "wrote image");
    Ok(())
}
