//! Configuration system for the Relief terrain generator.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, DrawMode, PipelineConfig, PreviewConfig};
pub use error::ConfigError;
