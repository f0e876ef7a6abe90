//! OS-specific directory resolution.

use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while resolving or creating directories.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,
    /// Directory creation failed.
    #[error("platform I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Directories used by the `relief` binary.
///
/// Follows OS conventions (XDG on Linux, Known Folders on Windows, Library on
/// macOS).
#[derive(Debug, Clone)]
pub struct PlatformDirs {
    /// Holds `config.ron`.
    pub config_dir: PathBuf,
    /// Default parent for exported previews.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "relief";

impl PlatformDirs {
    /// Resolve directories without creating them.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::NoConfigDir`] if the OS does not expose a
    /// configuration directory.
    pub fn resolve() -> Result<Self, PlatformError> {
        let app_config = dirs::config_dir()
            .ok_or(PlatformError::NoConfigDir)?
            .join(APP_NAME);
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .unwrap_or_else(|| app_config.join("data"));

        Ok(Self {
            config_dir: app_config.join("config"),
            data_dir,
            log_dir: app_config.join("logs"),
        })
    }

    /// Directories rooted under `root`, for tests and portable installs.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            data_dir: app_dir.join("data"),
            log_dir: app_dir.join("logs"),
        }
    }

    /// Replace the config directory, as `--config` does.
    pub fn with_config_dir(mut self, config_dir: PathBuf) -> Self {
        self.config_dir = config_dir;
        self
    }

    /// Create every directory on disk.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Io`] if any directory cannot be created.
    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }

    /// Resolve a preview output directory. Relative paths live under `data_dir`.
    pub fn output_dir(&self, configured: &str) -> PathBuf {
        let path = Path::new(configured);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}
