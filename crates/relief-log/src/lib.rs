//! Structured logging for the Relief terrain generator.
//!
//! Console output carries uptime timestamps and thread names so worker
//! activity (`terrain-gen-worker-N`) can be told apart from the consumer
//! thread. Debug builds can additionally write JSON lines to a file.

use std::path::Path;

use relief_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info";

/// File name of the JSON log written in debug builds.
pub const LOG_FILE_NAME: &str = "relief.log";

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.debug.log_level`, which wins over
/// [`DEFAULT_FILTER`]. When `debug_build` is set and `log_dir` can be
/// created, a JSON file layer is added.
///
/// # Examples
///
/// ```no_run
/// use relief_config::Config;
/// use relief_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter_str = filter_directives(config);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(log_dir.join(LOG_FILE_NAME))
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Filter directives derived from the config, ignoring `RUST_LOG`.
pub fn filter_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => {
            config.debug.log_level.trim().to_string()
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// An `EnvFilter` built from [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}
