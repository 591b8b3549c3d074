use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use anyhow::{anyhow, ensure, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use ndarray::Array4;
use cgmath::InnerSpace;
use crate::{Float, Vec3f};
use crate::consts::{PI, FRAC_PI_2};
use crate::reflection::{BxDFType, DefaultSampleF, cos_theta, same_hemisphere};
use crate::spectrum::Spectrum;

const RED_SCALE: f64 = 1.0 / 1500.0;
const GREEN_SCALE: f64 = 1.15 / 1500.0;
const BLUE_SCALE: f64 = 1.66 / 1500.0;

/// Entries per channel of the standard 90x90x180 table.
const STANDARD_ENTRIES: usize = 90 * 90 * 180;
/// Largest table accepted, in entries per channel.
const MAX_ENTRIES: usize = 4 * STANDARD_ENTRIES;

/// Isotropic BRDF measured in the half/difference angle parametrization.
#[derive(Debug)]
pub struct MerlTable {
    /// Indexed by (channel, theta_half, theta_diff, phi_diff)
    data: Array4<Float>,
}

impl MerlTable {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open MERL file {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(mut reader: impl Read) -> anyhow::Result<Self> {
        let n_theta_h = reader.read_i32::<LittleEndian>()?;
        let n_theta_d = reader.read_i32::<LittleEndian>()?;
        let n_phi_d = reader.read_i32::<LittleEndian>()?;
        ensure!(n_theta_h > 0 && n_theta_d > 0 && n_phi_d > 0,
            "invalid MERL dimensions {}x{}x{}", n_theta_h, n_theta_d, n_phi_d);

        let (n_theta_h, n_theta_d, n_phi_d) = (n_theta_h as usize, n_theta_d as usize, n_phi_d as usize);
        let n = n_theta_h.checked_mul(n_theta_d)
            .and_then(|n| n.checked_mul(n_phi_d))
            .filter(|&n| n <= MAX_ENTRIES)
            .ok_or_else(|| anyhow!("MERL table {}x{}x{} is too large", n_theta_h, n_theta_d, n_phi_d))?;

        let mut raw = vec![0.0f64; 3 * n];
        reader.read_f64_into::<LittleEndian>(&mut raw)
            .context("MERL file is truncated")?;

        let data = raw.iter().enumerate()
            .map(|(i, &v)| {
                let scale = match i / n {
                    0 => RED_SCALE,
                    1 => GREEN_SCALE,
                    _ => BLUE_SCALE,
                };
                (v * scale) as Float
            })
            .collect();
        let data = Array4::from_shape_vec((3, n_theta_h, n_theta_d, n_phi_d), data)?;

        Ok(Self { data })
    }

    /// Look up the reflectance for a pair of directions in the local shading frame.
    pub fn lookup(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        let (_, n_theta_h, n_theta_d, n_phi_d) = self.data.dim();
        let (theta_half, theta_diff, phi_diff) = half_diff_coords(wo, wi);

        // theta_half is sampled non-linearly, denser near the normal
        let th = index((theta_half / FRAC_PI_2).max(0.0).sqrt(), n_theta_h);
        let td = index(theta_diff / FRAC_PI_2, n_theta_d);

        // reciprocity folds phi_diff into [0, pi)
        let phi_diff = if phi_diff < 0.0 { phi_diff + PI } else { phi_diff };
        let pd = index(phi_diff / PI, n_phi_d);

        Spectrum::new_with(|c| self.data[[c, th, td, pd]]).clamp_positive()
    }
}

fn index(fraction: Float, n: usize) -> usize {
    ((fraction * n as Float) as isize).clamp(0, n as isize - 1) as usize
}

fn rotate_z(v: Vec3f, angle: Float) -> Vec3f {
    let (sin, cos) = angle.sin_cos();
    Vec3f::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos, v.z)
}

fn rotate_y(v: Vec3f, angle: Float) -> Vec3f {
    let (sin, cos) = angle.sin_cos();
    Vec3f::new(v.x * cos + v.z * sin, v.y, -v.x * sin + v.z * cos)
}

/// Convert a pair of directions to (theta_half, theta_diff, phi_diff).
fn half_diff_coords(wo: Vec3f, wi: Vec3f) -> (Float, Float, Float) {
    let half = (wo + wi).normalize();
    let theta_half = half.z.clamp(-1.0, 1.0).acos();
    let phi_half = half.y.atan2(half.x);

    let diff = rotate_y(rotate_z(wi, -phi_half), -theta_half);
    let theta_diff = diff.z.clamp(-1.0, 1.0).acos();
    let phi_diff = diff.y.atan2(diff.x);

    (theta_half, theta_diff, phi_diff)
}

#[derive(Debug)]
pub struct MerlBxdf<'a> {
    table: &'a MerlTable,
}

impl<'a> MerlBxdf<'a> {
    pub fn new(table: &'a MerlTable) -> Self {
        Self { table }
    }
}

impl<'a> DefaultSampleF for MerlBxdf<'a> {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::GLOSSY
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        if !same_hemisphere(wo, wi) || cos_theta(wo) == 0.0 || cos_theta(wi) == 0.0 {
            return Spectrum::uniform(0.0);
        }
        // measurements only cover the upper hemisphere
        let (wo, wi) = if wo.z < 0.0 { (-wo, -wi) } else { (wo, wi) };
        self.table.lookup(wo, wi)
    }
}
