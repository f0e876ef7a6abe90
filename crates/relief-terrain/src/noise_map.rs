//! Multi-octave Perlin height field sampling.
//!
//! Composites several octaves of Perlin noise into a normalized height field.
//! Each octave is shifted by a seeded random offset so that different seeds
//! sample different regions of the same noise function.

use glam::Vec2;
use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::height_field::HeightField;

/// Range of the per-octave random offsets.
const OCTAVE_OFFSET_RANGE: i32 = 100_000;

/// Divisor applied to the theoretical maximum in [`NormalizeMode::Global`].
/// Real fields rarely approach the theoretical maximum, so this stretches the
/// typical range back toward `[0, 1]`.
const GLOBAL_ESTIMATE_DIVISOR: f32 = 1.75;

/// `noise::Perlin` hashes lattice corners modulo 256, so it repeats every
/// 256 units along each axis.
const PERLIN_PERIOD: f64 = 256.0;

/// Fold a sample coordinate into one Perlin period. The result is identical
/// to sampling the unwrapped coordinate, but keeps the lattice index small
/// enough for `noise` to convert. Non-finite coordinates sample the origin.
fn wrap_lattice(coordinate: f64) -> f64 {
    if coordinate.is_finite() {
        coordinate.rem_euclid(PERLIN_PERIOD)
    } else {
        0.0
    }
}

/// How raw noise sums are mapped into `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizeMode {
    /// Stretch each field between its own minimum and maximum. Adjacent
    /// chunks will not line up at their seams.
    #[default]
    Local,
    /// Normalize against an estimate of the maximum possible height, so
    /// adjacent chunks share one scale and their seams match.
    Global,
}

/// Parameters for one height field sample.
#[derive(Clone, Debug, PartialEq)]
pub struct NoiseRequest {
    pub width: usize,
    pub height: usize,
    pub seed: i32,
    /// Distance in samples covered by one noise period. Must be positive.
    pub scale: f32,
    pub octaves: u32,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f32,
    /// World-space offset, already including the chunk center.
    pub offset: Vec2,
    pub normalize_mode: NormalizeMode,
}

/// Produces height fields from noise parameters.
///
/// Implementations must be pure: identical requests give bit-identical
/// fields, no shared state is mutated, and no I/O is performed. They are
/// called concurrently from worker threads.
pub trait NoiseSampler: Send + Sync {
    fn sample(&self, request: &NoiseRequest) -> HeightField;
}

/// Default sampler: fractal Perlin noise from the `noise` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerlinNoiseSampler;

impl PerlinNoiseSampler {
    fn octave_offsets(request: &NoiseRequest) -> Vec<Vec2> {
        let mut rng = ChaCha8Rng::seed_from_u64(request.seed as i64 as u64);
        (0..request.octaves)
            .map(|_| {
                let x = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
                let y = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
                Vec2::new(x + request.offset.x, y - request.offset.y)
            })
            .collect()
    }

    /// Sum of all octave amplitudes: the largest absolute raw value possible.
    pub fn max_possible_height(octaves: u32, persistence: f32) -> f32 {
        let mut sum = 0.0;
        let mut amplitude = 1.0;
        for _ in 0..octaves {
            sum += amplitude;
            amplitude *= persistence;
        }
        sum
    }
}

impl NoiseSampler for PerlinNoiseSampler {
    fn sample(&self, request: &NoiseRequest) -> HeightField {
        let perlin = Perlin::new(request.seed as u32);
        let offsets = Self::octave_offsets(request);
        let scale = request.scale;
        let half_width = request.width as f32 / 2.0;
        let half_height = request.height as f32 / 2.0;

        let mut raw = Vec::with_capacity(request.width * request.height);
        let mut local_min = f32::MAX;
        let mut local_max = f32::MIN;

        for y in 0..request.height {
            for x in 0..request.width {
                let mut amplitude = 1.0_f32;
                let mut frequency = 1.0_f32;
                let mut total = 0.0_f32;

                for offset in &offsets {
                    let sx = f64::from(x as f32 - half_width + offset.x) / f64::from(scale)
                        * f64::from(frequency);
                    let sy = f64::from(y as f32 - half_height + offset.y) / f64::from(scale)
                        * f64::from(frequency);
                    let value = perlin.get([wrap_lattice(sx), wrap_lattice(sy)]) as f32;
                    total += value * amplitude;

                    amplitude *= request.persistence;
                    frequency *= request.lacunarity;
                }

                local_min = local_min.min(total);
                local_max = local_max.max(total);
                raw.push(total);
            }
        }

        match request.normalize_mode {
            NormalizeMode::Local => {
                let range = local_max - local_min;
                for v in &mut raw {
                    *v = if range > 0.0 {
                        (*v - local_min) / range
                    } else {
                        0.0
                    };
                }
            }
            NormalizeMode::Global => {
                let max_possible =
                    Self::max_possible_height(request.octaves, request.persistence);
                let denom = 2.0 * max_possible / GLOBAL_ESTIMATE_DIVISOR;
                for v in &mut raw {
                    *v = if denom > 0.0 {
                        ((*v + 1.0) / denom).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                }
            }
        }

        HeightField::from_values(request.width, request.height, raw)
            .unwrap_or_else(|| HeightField::filled(request.width, request.height, 0.0))
    }
}
