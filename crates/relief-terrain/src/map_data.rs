//! Per-chunk map data: a sampled height field plus its classified color map.

use std::sync::Arc;

use glam::Vec2;

use crate::error::SettingsError;
use crate::falloff::FalloffField;
use crate::height_field::{ColorMap, HeightField};
use crate::noise_map::{NoiseRequest, NoiseSampler, PerlinNoiseSampler};
use crate::region::RegionClassifier;
use crate::settings::TerrainSettings;

/// Generated data for one chunk. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct MapData {
    /// Padded `(chunk_size + 2)²` field; the padding lets meshes bake edge normals.
    height_field: HeightField,
    color_map: ColorMap,
}

impl MapData {
    /// The full padded height field, as consumed by mesh builders.
    pub fn height_field(&self) -> &HeightField {
        &self.height_field
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    pub fn chunk_size(&self) -> usize {
        self.color_map.size()
    }

    /// Height at a chunk cell `(x, y)` in `[0, chunk_size)²`.
    pub fn height_at(&self, x: usize, y: usize) -> f32 {
        self.height_field.get(x, y)
    }

    /// The `chunk_size × chunk_size` heights without padding.
    pub fn trimmed_heights(&self) -> HeightField {
        self.height_field.trimmed(self.chunk_size())
    }
}

/// Builds [`MapData`] for chunk centers from fixed, validated settings.
///
/// The falloff mask is computed once at construction and shared by every
/// chunk built afterwards.
#[derive(Clone)]
pub struct TerrainDataBuilder {
    settings: TerrainSettings,
    sampler: Arc<dyn NoiseSampler>,
    classifier: RegionClassifier,
    falloff: Option<Arc<FalloffField>>,
}

impl TerrainDataBuilder {
    /// Builder using [`PerlinNoiseSampler`]. `settings` must already be validated.
    pub fn new(settings: TerrainSettings) -> Self {
        Self::with_sampler(settings, Arc::new(PerlinNoiseSampler))
    }

    pub fn with_sampler(settings: TerrainSettings, sampler: Arc<dyn NoiseSampler>) -> Self {
        let falloff = settings
            .use_falloff
            .then(|| Arc::new(FalloffField::generate(settings.chunk_size as usize)));
        Self::from_parts(settings, sampler, falloff)
    }

    /// Replace the falloff mask. Has no effect unless falloff is enabled.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::FalloffSizeMismatch`] if the mask is not
    /// `chunk_size` cells wide.
    pub fn with_falloff(mut self, falloff: Arc<FalloffField>) -> Result<Self, SettingsError> {
        let expected = self.settings.chunk_size as usize;
        if falloff.size() != expected {
            return Err(SettingsError::FalloffSizeMismatch {
                expected,
                actual: falloff.size(),
            });
        }
        if self.settings.use_falloff {
            self.falloff = Some(falloff);
        }
        Ok(self)
    }

    fn from_parts(
        settings: TerrainSettings,
        sampler: Arc<dyn NoiseSampler>,
        falloff: Option<Arc<FalloffField>>,
    ) -> Self {
        let classifier = RegionClassifier::new(settings.regions.clone());
        Self {
            settings,
            sampler,
            classifier,
            falloff,
        }
    }

    /// A builder for new settings that keeps this builder's sampler, and its
    /// falloff mask when the chunk size is unchanged.
    pub fn reconfigured(&self, settings: TerrainSettings) -> Self {
        let falloff = if !settings.use_falloff {
            None
        } else {
            match &self.falloff {
                Some(existing) if existing.size() == settings.chunk_size as usize => {
                    Some(Arc::clone(existing))
                }
                _ => Some(Arc::new(FalloffField::generate(settings.chunk_size as usize))),
            }
        };
        Self::from_parts(settings, Arc::clone(&self.sampler), falloff)
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    pub fn falloff(&self) -> Option<&Arc<FalloffField>> {
        self.falloff.as_ref()
    }

    fn noise_request(&self, center: Vec2) -> NoiseRequest {
        let noise = &self.settings.noise;
        let size = self.settings.bordered_size();
        NoiseRequest {
            width: size,
            height: size,
            seed: noise.seed,
            scale: noise.scale,
            octaves: noise.octaves,
            persistence: noise.persistence,
            lacunarity: noise.lacunarity,
            offset: Vec2::from(noise.offset) + center,
            normalize_mode: noise.normalize_mode,
        }
    }

    /// Sample, attenuate, and classify the chunk centered at `center`.
    pub fn build(&self, center: Vec2) -> MapData {
        let chunk_size = self.settings.chunk_size as usize;
        let mut height_field = self.sampler.sample(&self.noise_request(center));
        let mut color_map = ColorMap::new(chunk_size);

        for y in 0..chunk_size {
            for x in 0..chunk_size {
                if let Some(falloff) = &self.falloff {
                    let attenuated = (height_field.get(x, y) - falloff.get(x, y)).clamp(0.0, 1.0);
                    height_field.set(x, y, attenuated);
                }
                color_map.set(x, y, self.classifier.classify(height_field.get(x, y)));
            }
        }

        MapData {
            height_field,
            color_map,
        }
    }
}

impl std::fmt::Debug for TerrainDataBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerrainDataBuilder")
            .field("settings", &self.settings)
            .field("falloff", &self.falloff.is_some())
            .finish_non_exhaustive()
    }
}
