//! Procedural terrain chunks: noise height fields, region color maps, meshes,
//! and a worker pipeline that delivers them to a single consumer thread.

mod error;
mod falloff;
mod height_curve;
mod height_field;
mod map_data;
mod mesh;
mod noise_map;
mod pipeline;
mod region;
mod result_queue;
mod settings;
mod worker_pool;

pub use error::{GenerationError, PipelineError, SettingsError};
pub use falloff::FalloffField;
pub use height_curve::{CurveKey, HeightCurve};
pub use height_field::{ColorMap, HeightField};
pub use map_data::{MapData, TerrainDataBuilder};
pub use mesh::{MAX_LOD, MeshBuilder, MeshData, TerrainMeshBuilder, simplification_increment};
pub use noise_map::{NoiseRequest, NoiseSampler, NormalizeMode, PerlinNoiseSampler};
pub use pipeline::{DrainStats, GenerationPipeline, PipelineHandle, PipelineOptions};
pub use region::{Color, RegionClassifier, RegionThreshold, default_regions};
pub use result_queue::{Completion, PendingResult, RequestId, ResultQueue};
pub use settings::{
    MAP_CHUNK_SIZE, MAX_OCTAVES, MIN_NOISE_SCALE, MeshSettings, NoiseSettings, TerrainSettings,
};
pub use worker_pool::{Job, JobSender, WorkerPool, default_worker_count};
