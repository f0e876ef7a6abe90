//! The binary entry point for the `relief` terrain previewer.

use clap::Parser;
use relief_app::platform::PlatformDirs;
use relief_app::{AppError, run};
use relief_config::{CliArgs, Config};
use tracing::info;

fn main() {
    if let Err(e) = try_main() {
        eprintln!("relief: {e}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let mut dirs = PlatformDirs::resolve()?;
    if let Some(config_dir) = args.config.clone() {
        dirs = dirs.with_config_dir(config_dir);
    }
    dirs.create_dirs()?;

    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(&args);

    relief_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    let config = config.validate()?;
    info!(config_dir = %dirs.config_dir.display(), "configuration loaded");

    let summary = run(&config, &dirs)?;
    if let Some(path) = summary.preview_path {
        println!("{}", path.display());
    }
    Ok(())
}
