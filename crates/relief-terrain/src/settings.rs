//! Terrain generation settings and their validation.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;
use crate::height_curve::HeightCurve;
use crate::noise_map::NormalizeMode;
use crate::region::{RegionThreshold, default_regions};

/// Side length of a generated chunk in cells. `MAP_CHUNK_SIZE + 1` is divisible
/// by every supported mesh simplification increment.
pub const MAP_CHUNK_SIZE: u32 = 239;

/// Smallest noise scale accepted; lower values are clamped up to this.
pub const MIN_NOISE_SCALE: f32 = 0.0001;

/// Most octaves sampled; higher counts are clamped down to this.
pub const MAX_OCTAVES: u32 = 16;

/// Noise parameters shared by every chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NoiseSettings {
    pub seed: i32,
    /// Samples per noise period. Larger values zoom in.
    pub scale: f32,
    pub octaves: u32,
    /// Amplitude multiplier between octaves, in `[0, 1]`.
    pub persistence: f32,
    /// Frequency multiplier between octaves, at least 1.
    pub lacunarity: f32,
    /// World-space offset added to every chunk center.
    pub offset: [f32; 2],
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 25.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: [0.0, 0.0],
            normalize_mode: NormalizeMode::Local,
        }
    }
}

/// Mesh shaping parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MeshSettings {
    /// Vertical scale applied after the height curve.
    pub height_multiplier: f32,
    pub height_curve: HeightCurve,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            height_multiplier: 30.0,
            height_curve: HeightCurve::linear(),
        }
    }
}

/// Everything needed to build map data and meshes for a chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainSettings {
    pub chunk_size: u32,
    pub noise: NoiseSettings,
    /// Region table, lowest threshold first.
    pub regions: Vec<RegionThreshold>,
    /// Subtract the falloff mask from every chunk.
    pub use_falloff: bool,
    pub mesh: MeshSettings,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            chunk_size: MAP_CHUNK_SIZE,
            noise: NoiseSettings::default(),
            regions: default_regions(),
            use_falloff: false,
            mesh: MeshSettings::default(),
        }
    }
}

impl TerrainSettings {
    /// Clamp degenerate noise parameters and reject malformed tables.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for a zero chunk size, an infinite lacunarity
    /// or offset, octaves whose frequency overflows, a region table that is
    /// not sorted ascending or has non-finite thresholds, or a height curve
    /// with unsorted or non-finite keys.
    pub fn validate(mut self) -> Result<Self, SettingsError> {
        if self.chunk_size == 0 {
            return Err(SettingsError::ZeroChunkSize);
        }

        let noise = &mut self.noise;
        if noise.lacunarity.is_infinite() {
            return Err(SettingsError::NonFiniteNoise {
                parameter: "lacunarity",
            });
        }
        if !noise.offset.iter().all(|v| v.is_finite()) {
            return Err(SettingsError::NonFiniteNoise { parameter: "offset" });
        }
        if noise.octaves > MAX_OCTAVES {
            warn!(octaves = noise.octaves, "octaves clamped to {MAX_OCTAVES}");
            noise.octaves = MAX_OCTAVES;
        }
        if !noise.scale.is_finite() || noise.scale <= 0.0 {
            warn!(scale = noise.scale, "noise scale clamped to {MIN_NOISE_SCALE}");
            noise.scale = MIN_NOISE_SCALE;
        }
        if noise.lacunarity.is_nan() || noise.lacunarity < 1.0 {
            warn!(lacunarity = noise.lacunarity, "lacunarity clamped to 1");
            noise.lacunarity = 1.0;
        }
        if !(0.0..=1.0).contains(&noise.persistence) {
            let clamped = if noise.persistence > 1.0 { 1.0 } else { 0.0 };
            warn!(persistence = noise.persistence, clamped, "persistence clamped");
            noise.persistence = clamped;
        }
        let exponent = noise.octaves.saturating_sub(1) as i32;
        if !noise.lacunarity.powi(exponent).is_finite() {
            return Err(SettingsError::FrequencyOverflow {
                lacunarity: noise.lacunarity,
                octaves: noise.octaves,
            });
        }

        for (index, region) in self.regions.iter().enumerate() {
            if !region.min_height.is_finite() {
                return Err(SettingsError::InvalidRegionHeight {
                    index,
                    name: region.name.clone(),
                });
            }
            if index > 0 && region.min_height < self.regions[index - 1].min_height {
                return Err(SettingsError::UnsortedRegions {
                    index,
                    name: region.name.clone(),
                });
            }
        }
        match self.regions.first() {
            None => warn!("region table is empty; every cell gets the default color"),
            Some(lowest) if lowest.min_height > 0.0 => warn!(
                min_height = lowest.min_height,
                "lowest region starts above 0; lower heights get the default color"
            ),
            Some(_) => {}
        }

        if let Some(index) = self.mesh.height_curve.first_non_finite_key() {
            return Err(SettingsError::InvalidCurveKey { index });
        }
        if let Some(index) = self.mesh.height_curve.first_unsorted_key() {
            return Err(SettingsError::UnsortedCurve { index });
        }

        Ok(self)
    }

    /// Side length of the sampled height field, including the one-cell border.
    pub fn bordered_size(&self) -> usize {
        self.chunk_size as usize + 2
    }
}
