//! One generation run: submit chunks, drive deliveries, export the preview.

use std::path::PathBuf;
use std::time::Duration;

use relief_config::{Config, ConfigError, DrawMode};
use relief_terrain::{GenerationPipeline, PipelineError};
use tracing::{info, warn};

use crate::consumer_loop::{ConsumerLoop, LoopOutcome};
use crate::platform::{PlatformDirs, PlatformError};
use crate::preview::{PreviewError, PreviewImage, preview_file_name};
use crate::session::{ChunkSession, SessionReport};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start generation pipeline: {0}")]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
}

/// What a run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: LoopOutcome,
    pub report: SessionReport,
    /// Written preview image, if the draw mode has one and the origin chunk arrived.
    pub preview_path: Option<PathBuf>,
}

/// Generate the configured chunks and export a preview of the origin chunk.
///
/// `config` must already be validated.
pub fn run(config: &Config, dirs: &PlatformDirs) -> Result<RunSummary, AppError> {
    let mut pipeline =
        GenerationPipeline::new(config.terrain.clone(), config.pipeline.options())?;
    info!(
        workers = pipeline.worker_count(),
        chunk_size = config.terrain.chunk_size,
        seed = config.terrain.noise.seed,
        "generation pipeline started"
    );

    let session = ChunkSession::new(config.preview.chunk_radius, config.preview.lod);
    session.submit(&pipeline);
    info!(chunks = session.coords().len(), "chunk requests submitted");

    let mut consumer = ConsumerLoop::new(
        Duration::from_millis(config.pipeline.tick_interval_ms),
        Duration::from_secs(config.pipeline.timeout_seconds),
    );
    let outcome = consumer.run(|| {
        pipeline.tick();
        session.is_complete()
    });

    pipeline.shutdown();
    // Shutdown can settle requests that were still queued.
    pipeline.tick();

    let report = session.report();
    match outcome {
        LoopOutcome::Finished { ticks } => info!(
            ticks,
            maps = report.maps.len(),
            meshes = report.meshes.len(),
            failures = report.failures.len(),
            "all chunks settled"
        ),
        LoopOutcome::TimedOut { ticks } => warn!(
            ticks,
            settled = session.settled(),
            expected = session.coords().len(),
            "timed out waiting for chunks"
        ),
    }

    let preview_path = export_preview(config, dirs, &report)?;
    Ok(RunSummary {
        outcome,
        report,
        preview_path,
    })
}

fn export_preview(
    config: &Config,
    dirs: &PlatformDirs,
    report: &SessionReport,
) -> Result<Option<PathBuf>, AppError> {
    let mode = config.preview.draw_mode;
    if mode == DrawMode::Mesh {
        info!(
            meshes = report.meshes.len(),
            vertices = report.total_vertices(),
            triangles = report.total_triangles(),
            lod = config.preview.lod,
            "mesh statistics"
        );
        return Ok(None);
    }

    let Some(map_data) = report.origin_map() else {
        warn!("origin chunk was not generated, skipping preview");
        return Ok(None);
    };
    let (Some(image), Some(file_name)) =
        (PreviewImage::render(mode, map_data), preview_file_name(mode))
    else {
        return Ok(None);
    };

    let path = dirs.output_dir(&config.preview.output_dir).join(file_name);
    image.save_png(&path)?;
    info!(path = %path.display(), ?mode, "preview written");
    Ok(Some(path))
}
