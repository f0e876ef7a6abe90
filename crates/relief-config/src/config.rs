//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use relief_terrain::{MAX_LOD, PipelineOptions, TerrainSettings};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Noise, region, falloff, and mesh settings.
    pub terrain: TerrainSettings,
    /// Worker pool and consumer loop settings.
    pub pipeline: PipelineConfig,
    /// Which chunks to generate and what to export.
    pub preview: PreviewConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Worker pool and consumer loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Worker threads (0 = based on CPU count).
    pub worker_threads: usize,
    /// Maximum queued or running requests before new ones are rejected (0 = unlimited).
    pub max_in_flight: usize,
    /// Delay between consumer ticks, in milliseconds.
    pub tick_interval_ms: u64,
    /// Give up waiting for deliveries after this many seconds.
    pub timeout_seconds: u64,
}

/// What the preview renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum DrawMode {
    /// Grayscale height field.
    NoiseMap,
    /// Region-classified colors.
    #[default]
    ColorMap,
    /// Mesh statistics only.
    Mesh,
    /// Grayscale falloff mask.
    FalloffMap,
}

/// Preview generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Chunks generated in each direction around the origin chunk.
    pub chunk_radius: u32,
    /// Level of detail for preview meshes (0 - 6).
    pub lod: u32,
    pub draw_mode: DrawMode,
    /// Directory preview images are written to.
    pub output_dir: String,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for PipelineConfig {
    fn default() -> Self {
        let options = PipelineOptions::default();
        Self {
            worker_threads: options.worker_threads,
            max_in_flight: options.max_in_flight,
            tick_interval_ms: 16,
            timeout_seconds: 60,
        }
    }
}

impl PipelineConfig {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            worker_threads: self.worker_threads,
            max_in_flight: self.max_in_flight,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            chunk_radius: 1,
            lod: 0,
            draw_mode: DrawMode::ColorMap,
            output_dir: "previews".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Validation ---

impl Config {
    /// Validate terrain settings and clamp the preview level of detail.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Settings`] if the terrain settings are invalid.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.terrain = self.terrain.validate()?;
        if self.preview.lod > MAX_LOD {
            log::warn!("preview lod {} clamped to {MAX_LOD}", self.preview.lod);
            self.preview.lod = MAX_LOD;
        }
        Ok(self)
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Re-read the file: returns `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief_terrain::{Color, MAP_CHUNK_SIZE, RegionThreshold, SettingsError};

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(4))
                .unwrap();
        assert!(ron_str.contains("chunk_size: 239"));
        assert!(ron_str.contains("max_in_flight: 64"));
        assert!(ron_str.contains("draw_mode: ColorMap"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(pipeline: (worker_threads: 3), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.pipeline.worker_threads, 3);
        assert_eq!(config.pipeline.max_in_flight, 64);
        assert_eq!(config.terrain.chunk_size, MAP_CHUNK_SIZE);
        assert_eq!(config.preview, PreviewConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_region_table_from_ron() {
        let ron_str = r#"(terrain: (regions: [
            (name: "water", min_height: 0.0, color: (r: 0, g: 0, b: 255, a: 255)),
            (name: "land", min_height: 0.4, color: (r: 0, g: 255, b: 0, a: 255)),
        ]))"#;
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(
            config.terrain.regions,
            vec![
                RegionThreshold::new("water", 0.0, Color::BLUE),
                RegionThreshold::new("land", 0.4, Color::GREEN),
            ]
        );
    }

    #[test]
    fn test_validate_rejects_unsorted_regions() {
        let mut config = Config::default();
        config.terrain.regions.reverse();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Settings(SettingsError::UnsortedRegions { .. }))
        ));
    }

    #[test]
    fn test_validate_clamps_preview_lod() {
        let mut config = Config::default();
        config.preview.lod = 40;
        assert_eq!(config.validate().unwrap().preview.lod, MAX_LOD);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.noise.seed = 77;
        config.terrain.use_falloff = true;
        config.preview.draw_mode = DrawMode::FalloffMap;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.terrain.noise.octaves = 6;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().terrain.noise.octaves, 6);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
