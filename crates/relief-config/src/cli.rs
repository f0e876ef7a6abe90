//! Command-line argument parsing for the terrain previewer.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, DrawMode};

/// Relief command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "relief", about = "Procedural terrain chunk generator")]
pub struct CliArgs {
    /// Noise seed.
    #[arg(long)]
    pub seed: Option<i32>,

    /// Chunks generated in each direction around the origin.
    #[arg(long)]
    pub chunk_radius: Option<u32>,

    /// Worker thread count (0 = based on CPU count).
    #[arg(long)]
    pub workers: Option<usize>,

    /// Subtract the falloff mask from every chunk.
    #[arg(long)]
    pub falloff: Option<bool>,

    /// Mesh level of detail (0 - 6).
    #[arg(long)]
    pub lod: Option<u32>,

    /// Preview to export.
    #[arg(long, value_enum)]
    pub draw_mode: Option<DrawMode>,

    /// Directory for preview images.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.terrain.noise.seed = seed;
        }
        if let Some(radius) = args.chunk_radius {
            self.preview.chunk_radius = radius;
        }
        if let Some(workers) = args.workers {
            self.pipeline.worker_threads = workers;
        }
        if let Some(falloff) = args.falloff {
            self.terrain.use_falloff = falloff;
        }
        if let Some(lod) = args.lod {
            self.preview.lod = lod;
        }
        if let Some(mode) = args.draw_mode {
            self.preview.draw_mode = mode;
        }
        if let Some(ref output) = args.output {
            self.preview.output_dir = output.display().to_string();
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
