use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use anyhow::{anyhow, bail, ensure, Context};
use byteorder::{LittleEndian, ReadBytesExt};
use crate::{Float, Vec3f};
use crate::reflection::{BxDFType, DefaultSampleF, cos_theta};
use crate::spectrum::Spectrum;

const MAGIC: &[u8; 8] = b"SCATFUN\x01";

/// Largest number of elevation nodes accepted.
const MAX_MU: usize = 1024;
/// Largest number of series terms per cell and channel.
const MAX_ORDER: usize = 4096;
/// Largest total coefficient count accepted.
const MAX_COEFFS: usize = 1 << 26;

/// BSDF stored as Fourier series in the azimuthal difference angle, tabulated over pairs of
/// elevation cosines.
#[derive(Debug)]
pub struct FourierTable {
    pub eta: Float,
    m_max: usize,
    n_channels: usize,

    /// Sorted elevation cosines the table is tabulated at
    mu: Vec<Float>,
    a_offset: Vec<usize>,
    m: Vec<usize>,
    a: Vec<Float>,
}

fn read_i32s(reader: &mut impl Read, n: usize) -> std::io::Result<Vec<i32>> {
    let mut buf = vec![0; n];
    reader.read_i32_into::<LittleEndian>(&mut buf)?;
    Ok(buf)
}

fn read_f32s(reader: &mut impl Read, n: usize) -> std::io::Result<Vec<Float>> {
    let mut buf = vec![0.0; n];
    reader.read_f32_into::<LittleEndian>(&mut buf)?;
    Ok(buf)
}

impl FourierTable {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open Fourier BSDF file {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(mut reader: impl Read) -> anyhow::Result<Self> {
        let mut header = [0u8; 8];
        reader.read_exact(&mut header)?;
        if &header != MAGIC {
            bail!("not a Fourier BSDF file");
        }

        let fields = read_i32s(&mut reader, 9)?;
        let (flags, n_mu, n_coeffs, m_max, n_channels, n_bases) =
            (fields[0], fields[1], fields[2], fields[3], fields[4], fields[5]);
        let eta = reader.read_f32::<LittleEndian>()?;
        let _unused = read_i32s(&mut reader, 4)?;

        // only uniform monochromatic or RGB tables are supported
        ensure!(flags == 1 && (n_channels == 1 || n_channels == 3) && n_bases == 1,
            "unsupported Fourier BSDF layout (flags {}, {} channels, {} bases)", flags, n_channels, n_bases);
        ensure!(n_mu >= 2 && n_coeffs >= 0 && m_max >= 0, "invalid Fourier BSDF dimensions");

        let (n_mu, n_coeffs, m_max) = (n_mu as usize, n_coeffs as usize, m_max as usize);
        ensure!(n_mu <= MAX_MU && n_coeffs <= MAX_COEFFS && m_max <= MAX_ORDER,
            "Fourier BSDF dimensions too large ({} nodes, {} coefficients, order {})", n_mu, n_coeffs, m_max);
        let n_cells = n_mu.checked_mul(n_mu)
            .ok_or_else(|| anyhow!("Fourier BSDF has too many cells"))?;

        let mu = read_f32s(&mut reader, n_mu)?;
        let _cdf = read_f32s(&mut reader, n_cells)?;
        let offset_and_length = read_i32s(&mut reader, n_cells * 2)?;
        let a = read_f32s(&mut reader, n_coeffs).context("Fourier BSDF file is truncated")?;

        let mut a_offset = Vec::with_capacity(n_cells);
        let mut m = Vec::with_capacity(n_cells);
        for pair in offset_and_length.chunks_exact(2) {
            let (offset, length) = (pair[0], pair[1]);
            ensure!(offset >= 0 && length >= 0, "negative coefficient range");
            let (offset, length) = (offset as usize, length as usize);
            ensure!(length <= m_max, "cell has {} terms, more than the maximum order {}", length, m_max);
            let end = length.checked_mul(n_channels as usize)
                .and_then(|len| len.checked_add(offset));
            ensure!(matches!(end, Some(end) if end <= n_coeffs), "coefficient range out of bounds");
            a_offset.push(offset);
            m.push(length);
        }

        Ok(Self {
            eta,
            m_max,
            n_channels: n_channels as usize,
            mu,
            a_offset,
            m,
            a,
        })
    }

    /// Coefficients of the cell for the given pair of elevation indices, laid out by channel.
    fn get_ak(&self, offset_i: usize, offset_o: usize) -> (&[Float], usize) {
        let idx = offset_o * self.mu.len() + offset_i;
        let m = self.m[idx];
        let start = self.a_offset[idx];
        (&self.a[start..start + m * self.n_channels], m)
    }

    /// Catmull-Rom spline weights for interpolating at `x` between the elevation nodes.
    fn weights_and_offset(&self, x: Float) -> Option<(isize, [Float; 4])> {
        catmull_rom_weights(&self.mu, x)
    }
}

fn find_interval(size: usize, pred: impl Fn(usize) -> bool) -> usize {
    let (mut first, mut len) = (0, size);
    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if pred(middle) {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }
    first.saturating_sub(1).min(size - 2)
}

pub(crate) fn catmull_rom_weights(nodes: &[Float], x: Float) -> Option<(isize, [Float; 4])> {
    let size = nodes.len();
    if !(x >= nodes[0] && x <= nodes[size - 1]) {
        return None;
    }

    let idx = find_interval(size, |i| nodes[i] <= x);
    let offset = idx as isize - 1;
    let (x0, x1) = (nodes[idx], nodes[idx + 1]);

    let t = (x - x0) / (x1 - x0);
    let t2 = t * t;
    let t3 = t2 * t;

    let mut weights = [0.0; 4];
    weights[1] = 2.0 * t3 - 3.0 * t2 + 1.0;
    weights[2] = -2.0 * t3 + 3.0 * t2;

    if idx > 0 {
        let w0 = (t3 - 2.0 * t2 + t) * (x1 - x0) / (x1 - nodes[idx - 1]);
        weights[0] = -w0;
        weights[2] += w0;
    } else {
        let w0 = t3 - 2.0 * t2 + t;
        weights[0] = 0.0;
        weights[1] -= w0;
        weights[2] += w0;
    }

    if idx + 2 < size {
        let w3 = (t3 - t2) * (x1 - x0) / (nodes[idx + 2] - x0);
        weights[1] -= w3;
        weights[3] = w3;
    } else {
        let w3 = t3 - t2;
        weights[1] -= w3;
        weights[2] += w3;
        weights[3] = 0.0;
    }

    Some((offset, weights))
}

/// Evaluate a cosine series with coefficients `a` at the angle whose cosine is `cos_phi`.
fn fourier(a: &[Float], cos_phi: Float) -> Float {
    let mut value = 0.0f64;
    let cos_phi = cos_phi as f64;
    let mut cos_k_minus_one_phi = cos_phi;
    let mut cos_k_phi = 1.0f64;
    for &ak in a {
        value += ak as f64 * cos_k_phi;
        let cos_k_plus_one_phi = 2.0 * cos_phi * cos_k_phi - cos_k_minus_one_phi;
        cos_k_minus_one_phi = cos_k_phi;
        cos_k_phi = cos_k_plus_one_phi;
    }
    value as Float
}

fn cos_d_phi(wa: Vec3f, wb: Vec3f) -> Float {
    let waxy = wa.x * wa.x + wa.y * wa.y;
    let wbxy = wb.x * wb.x + wb.y * wb.y;
    if waxy == 0.0 || wbxy == 0.0 {
        return 1.0;
    }
    ((wa.x * wb.x + wa.y * wb.y) / Float::sqrt(waxy * wbxy)).clamp(-1.0, 1.0)
}

#[derive(Debug)]
pub struct FourierBxdf<'a> {
    table: &'a FourierTable,
}

impl<'a> FourierBxdf<'a> {
    pub fn new(table: &'a FourierTable) -> Self {
        Self { table }
    }
}

impl<'a> DefaultSampleF for FourierBxdf<'a> {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::TRANSMISSION | BxDFType::GLOSSY
    }

    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum {
        let table = self.table;

        // the table stores the incident direction pointing into the surface
        let mu_i = cos_theta(-wi);
        let mu_o = cos_theta(wo);
        let cos_phi = cos_d_phi(-wi, wo);

        let (offset_i, weights_i) = match table.weights_and_offset(mu_i) {
            Some(w) => w,
            None => return Spectrum::uniform(0.0),
        };
        let (offset_o, weights_o) = match table.weights_and_offset(mu_o) {
            Some(w) => w,
            None => return Spectrum::uniform(0.0),
        };

        // accumulate the interpolated coefficients over the 4x4 spline neighborhood
        let mut ak = vec![0.0 as Float; table.m_max * table.n_channels];
        let mut m_max = 0;
        for (b, &weight_o) in weights_o.iter().enumerate() {
            for (a, &weight_i) in weights_i.iter().enumerate() {
                let weight = weight_i * weight_o;
                if weight == 0.0 {
                    continue;
                }
                let (ap, m) = table.get_ak((offset_i + a as isize) as usize, (offset_o + b as isize) as usize);
                m_max = m_max.max(m);
                for c in 0..table.n_channels {
                    for k in 0..m {
                        ak[c * table.m_max + k] += weight * ap[c * m + k];
                    }
                }
            }
        }

        let y = Float::max(0.0, fourier(&ak[..m_max], cos_phi));
        let mut scale = if mu_i != 0.0 { 1.0 / mu_i.abs() } else { 0.0 };

        // radiance is scaled when it crosses the interface
        if mu_i * mu_o > 0.0 {
            let eta = if mu_i > 0.0 { 1.0 / table.eta } else { table.eta };
            scale *= eta * eta;
        }

        if table.n_channels == 1 {
            return Spectrum::uniform(y * scale);
        }

        let r = fourier(&ak[table.m_max..table.m_max + m_max], cos_phi);
        let b = fourier(&ak[2 * table.m_max..2 * table.m_max + m_max], cos_phi);
        let g = 1.39829 * y - 0.100913 * b - 0.297375 * r;
        Spectrum::rgb(r * scale, g * scale, b * scale).clamp_positive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use cgmath::InnerSpace;
    use approx::assert_abs_diff_eq;

    /// A monochromatic table over three elevation nodes whose every cell holds the single
    /// coefficient `value`.
    pub(crate) fn constant_fourier_bytes(value: f32) -> Vec<u8> {
        let n_mu = 3;
        let mut bytes = MAGIC.to_vec();
        for field in &[1, n_mu, n_mu * n_mu, 1, 1, 1, 0, 0, 0] {
            bytes.write_i32::<LittleEndian>(*field).unwrap();
        }
        bytes.write_f32::<LittleEndian>(1.5).unwrap();
        for _ in 0..4 {
            bytes.write_i32::<LittleEndian>(0).unwrap();
        }
        for mu in &[-1.0f32, 0.0, 1.0] {
            bytes.write_f32::<LittleEndian>(*mu).unwrap();
        }
        for _ in 0..n_mu * n_mu {
            bytes.write_f32::<LittleEndian>(0.0).unwrap();
        }
        for i in 0..n_mu * n_mu {
            bytes.write_i32::<LittleEndian>(i).unwrap();
            bytes.write_i32::<LittleEndian>(1).unwrap();
        }
        for _ in 0..n_mu * n_mu {
            bytes.write_f32::<LittleEndian>(value).unwrap();
        }
        bytes
    }

    #[test]
    fn test_catmull_rom_partition_of_unity() {
        let nodes = [-1.0, -0.3, 0.2, 0.7, 1.0];
        for &x in &[-1.0, -0.8, 0.0, 0.5, 0.95, 1.0] {
            let (_, weights) = catmull_rom_weights(&nodes, x).unwrap();
            assert_abs_diff_eq!(weights.iter().sum::<Float>(), 1.0, epsilon = 1.0e-5);
        }
        assert!(catmull_rom_weights(&nodes, 1.5).is_none());
    }

    #[test]
    fn test_constant_table_divides_by_cosine() {
        let bytes = constant_fourier_bytes(0.2);
        let table = FourierTable::from_reader(bytes.as_slice()).unwrap();
        assert_abs_diff_eq!(table.eta, 1.5);

        let bxdf = FourierBxdf::new(&table);
        let wo = vec3f!(0.3, 0.0, 0.8).normalize();
        let wi = vec3f!(-0.4, 0.1, 0.6).normalize();
        let f = bxdf.f(wo, wi);
        assert_abs_diff_eq!(f[0], 0.2 / wi.z, epsilon = 1.0e-4);
    }

    fn patch_i32(bytes: &mut [u8], pos: usize, value: i32) {
        bytes[pos..pos + 4].copy_from_slice(&value.to_le_bytes());
    }

    // byte positions in the table written by `constant_fourier_bytes`
    const N_MU_POS: usize = 12;
    const N_COEFFS_POS: usize = 16;
    const FIRST_LENGTH_POS: usize = 116;

    #[test]
    fn test_oversized_header_is_error() {
        let mut bytes = constant_fourier_bytes(1.0);
        patch_i32(&mut bytes, N_MU_POS, i32::MAX);
        assert!(FourierTable::from_reader(bytes.as_slice()).is_err());

        let mut bytes = constant_fourier_bytes(1.0);
        patch_i32(&mut bytes, N_COEFFS_POS, i32::MAX);
        assert!(FourierTable::from_reader(bytes.as_slice()).is_err());
    }

    #[test]
    fn test_cell_longer_than_max_order_is_error() {
        let mut bytes = constant_fourier_bytes(1.0);
        // in bounds of the coefficient array, but longer than the declared order of 1
        patch_i32(&mut bytes, FIRST_LENGTH_POS, 2);
        let err = FourierTable::from_reader(bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("maximum order"));
    }

    #[test]
    fn test_bad_magic_is_error() {
        let mut bytes = constant_fourier_bytes(1.0);
        bytes[0] = b'X';
        assert!(FourierTable::from_reader(bytes.as_slice()).is_err());
    }
}
