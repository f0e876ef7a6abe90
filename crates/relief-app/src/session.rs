//! A batch of chunk requests around the origin and the results delivered for them.
//!
//! Each chunk goes through two stages: map data, then a mesh built from that
//! map data. The mesh request is submitted from the map callback, so both
//! stages finish on the consumer thread.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::Vec2;
use relief_terrain::{GenerationError, GenerationPipeline, MapData, MeshData, PipelineHandle};
use tracing::{debug, warn};

/// Integer chunk position. Chunk `(0, 0)` is centered on the origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World-space center. Neighbouring chunks share one row of samples, so
    /// centers are `chunk_size - 1` apart.
    pub fn center(self, chunk_size: u32) -> Vec2 {
        let spacing = chunk_size.saturating_sub(1) as f32;
        Vec2::new(self.x as f32, self.y as f32) * spacing
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Every chunk within `radius` of the origin, row by row.
pub fn chunk_coords(radius: u32) -> Vec<ChunkCoord> {
    let r = i32::try_from(radius).unwrap_or(i32::MAX / 2);
    (-r..=r)
        .flat_map(|y| (-r..=r).map(move |x| ChunkCoord::new(x, y)))
        .collect()
}

/// Which request failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Map,
    Mesh,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChunkFailure {
    pub coord: ChunkCoord,
    pub stage: Stage,
    pub error: GenerationError,
}

/// Size of a delivered mesh. The mesh itself is dropped after counting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshStats {
    pub vertices: usize,
    pub triangles: usize,
    pub lod: u32,
}

impl MeshStats {
    fn of(mesh: &MeshData) -> Self {
        Self {
            vertices: mesh.vertices.len(),
            triangles: mesh.triangle_count(),
            lod: mesh.lod,
        }
    }
}

/// Results collected so far.
#[derive(Clone, Debug, Default)]
pub struct SessionReport {
    pub maps: BTreeMap<ChunkCoord, Arc<MapData>>,
    pub meshes: BTreeMap<ChunkCoord, MeshStats>,
    pub failures: Vec<ChunkFailure>,
}

impl SessionReport {
    pub fn origin_map(&self) -> Option<&Arc<MapData>> {
        self.maps.get(&ChunkCoord::ORIGIN)
    }

    pub fn total_vertices(&self) -> usize {
        self.meshes.values().map(|stats| stats.vertices).sum()
    }

    pub fn total_triangles(&self) -> usize {
        self.meshes.values().map(|stats| stats.triangles).sum()
    }
}

#[derive(Default)]
struct Collected {
    report: SessionReport,
    /// Chunks with a mesh delivered or a failure at either stage.
    settled: usize,
}

/// Requests a square of chunks and tracks their deliveries.
pub struct ChunkSession {
    coords: Vec<ChunkCoord>,
    lod: u32,
    collected: Arc<Mutex<Collected>>,
}

impl ChunkSession {
    pub fn new(radius: u32, lod: u32) -> Self {
        Self {
            coords: chunk_coords(radius),
            lod,
            collected: Arc::default(),
        }
    }

    pub fn coords(&self) -> &[ChunkCoord] {
        &self.coords
    }

    /// Submit a map request for every chunk.
    pub fn submit(&self, pipeline: &GenerationPipeline) {
        let chunk_size = pipeline.settings().chunk_size;
        let handle = pipeline.handle();
        for &coord in &self.coords {
            let collected = Arc::clone(&self.collected);
            let mesh_handle = handle.clone();
            let lod = self.lod;
            let id = handle.request_map_data(coord.center(chunk_size), move |result| {
                on_map_data(coord, lod, result, &mesh_handle, &collected);
            });
            debug!(request = %id, chunk = %coord, "map data requested");
        }
    }

    /// Whether every chunk has a mesh or a failure.
    pub fn is_complete(&self) -> bool {
        lock(&self.collected).settled >= self.coords.len()
    }

    pub fn settled(&self) -> usize {
        lock(&self.collected).settled
    }

    /// A copy of everything delivered so far.
    pub fn report(&self) -> SessionReport {
        lock(&self.collected).report.clone()
    }
}

fn lock(collected: &Mutex<Collected>) -> MutexGuard<'_, Collected> {
    collected.lock().unwrap_or_else(PoisonError::into_inner)
}

fn on_map_data(
    coord: ChunkCoord,
    lod: u32,
    result: Result<MapData, GenerationError>,
    handle: &PipelineHandle,
    collected: &Arc<Mutex<Collected>>,
) {
    match result {
        Ok(map_data) => {
            let map_data = Arc::new(map_data);
            lock(collected)
                .report
                .maps
                .insert(coord, Arc::clone(&map_data));

            let collected = Arc::clone(collected);
            let id = handle.request_mesh_data(map_data, lod, move |result| {
                on_mesh_data(coord, result, &collected);
            });
            debug!(request = %id, chunk = %coord, lod, "mesh data requested");
        }
        Err(error) => record_failure(collected, coord, Stage::Map, error),
    }
}

fn on_mesh_data(
    coord: ChunkCoord,
    result: Result<MeshData, GenerationError>,
    collected: &Mutex<Collected>,
) {
    match result {
        Ok(mesh) => {
            let mut collected = lock(collected);
            collected.report.meshes.insert(coord, MeshStats::of(&mesh));
            collected.settled += 1;
        }
        Err(error) => record_failure(collected, coord, Stage::Mesh, error),
    }
}

fn record_failure(
    collected: &Mutex<Collected>,
    coord: ChunkCoord,
    stage: Stage,
    error: GenerationError,
) {
    warn!(chunk = %coord, ?stage, %error, "chunk generation failed");
    let mut collected = lock(collected);
    collected.report.failures.push(ChunkFailure {
        coord,
        stage,
        error,
    });
    collected.settled += 1;
}
