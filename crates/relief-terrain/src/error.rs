//! Error types for terrain settings, generation, and pipeline setup.

/// Invalid terrain settings, detected at configuration time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// The chunk must contain at least one cell.
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    /// Region thresholds must be sorted ascending by `min_height`.
    #[error("region {index} ({name:?}) has a lower threshold than the region before it")]
    UnsortedRegions { index: usize, name: String },

    /// A region threshold is NaN or infinite.
    #[error("region {index} ({name:?}) has a non-finite threshold")]
    InvalidRegionHeight { index: usize, name: String },

    /// Height curve keys must be sorted by time.
    #[error("height curve key {index} is earlier than the key before it")]
    UnsortedCurve { index: usize },

    /// A height curve key has a NaN or infinite time or value.
    #[error("height curve key {index} is not finite")]
    InvalidCurveKey { index: usize },

    /// A noise parameter is NaN or infinite.
    #[error("noise {parameter} must be finite")]
    NonFiniteNoise { parameter: &'static str },

    /// The last octave's frequency does not fit in an `f32`.
    #[error("lacunarity {lacunarity} over {octaves} octaves overflows the noise frequency")]
    FrequencyOverflow { lacunarity: f32, octaves: u32 },

    /// A falloff mask does not cover the chunk exactly.
    #[error("falloff mask is {actual} cells wide, chunk is {expected}")]
    FalloffSizeMismatch { expected: usize, actual: usize },
}

/// Why a generation request produced no payload.
///
/// Delivered to the request's completion callback in place of the result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    /// Too many requests were already in flight when this one was submitted.
    #[error("request rejected: {in_flight} requests already in flight (limit {limit})")]
    Rejected { in_flight: usize, limit: usize },

    /// The level of detail does not evenly divide the height field.
    #[error("level of detail {lod} is not supported for a {bordered_size}-sample height field")]
    UnsupportedLod { lod: u32, bordered_size: usize },

    /// The worker panicked while building the result.
    #[error("generation worker panicked: {message}")]
    WorkerPanicked { message: String },

    /// The pipeline was shut down before the request could be scheduled.
    #[error("generation pipeline is shut down")]
    ShutDown,
}

/// Errors raised while constructing a generation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid terrain settings: {0}")]
    Settings(#[from] SettingsError),

    /// The OS refused to start a worker thread.
    #[error("failed to spawn generation worker: {0}")]
    SpawnWorker(#[source] std::io::Error),
}
