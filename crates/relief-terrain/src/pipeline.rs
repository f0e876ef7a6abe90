//! Asynchronous terrain generation with single-thread delivery.
//!
//! Map and mesh requests are built on a fixed pool of worker threads.
//! Completed results wait in one [`ResultQueue`] per payload type until the
//! consumer thread (the one that created the pipeline) calls
//! [`GenerationPipeline::tick`], which invokes every pending callback on
//! that thread. Callbacks always receive a `Result`: rejected, panicked, or
//! abandoned requests are reported rather than dropped.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use glam::Vec2;
use tracing::{debug, error, trace, warn};

use crate::error::{GenerationError, PipelineError, SettingsError};
use crate::map_data::{MapData, TerrainDataBuilder};
use crate::mesh::{MeshBuilder, MeshData, TerrainMeshBuilder};
use crate::result_queue::{Completion, PendingResult, RequestId, ResultQueue};
use crate::settings::TerrainSettings;
use crate::worker_pool::{Job, JobSender, WorkerPool};

/// Pool sizing and admission limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Worker thread count. `0` picks one based on the CPU count.
    pub worker_threads: usize,
    /// Requests allowed to be queued or running at once. Requests beyond this
    /// are rejected. `0` disables the limit.
    pub max_in_flight: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_in_flight: 64,
        }
    }
}

/// Number of callbacks invoked by one [`GenerationPipeline::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub maps: usize,
    pub meshes: usize,
}

impl DrainStats {
    pub fn total(&self) -> usize {
        self.maps + self.meshes
    }
}

/// Immutable generator state captured by each request at submit time.
struct Generators {
    data: TerrainDataBuilder,
    mesher: Arc<dyn MeshBuilder>,
}

struct Shared {
    map_queue: ResultQueue<MapData>,
    mesh_queue: ResultQueue<MeshData>,
    generators: RwLock<Arc<Generators>>,
    /// Replaces the settings-derived mesh builder when set.
    custom_mesher: Option<Arc<dyn MeshBuilder>>,
    in_flight: AtomicUsize,
    max_in_flight: usize,
    next_id: AtomicU64,
}

impl Shared {
    fn snapshot(&self) -> Arc<Generators> {
        Arc::clone(
            &self
                .generators
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn mesher_for(&self, settings: &TerrainSettings) -> Arc<dyn MeshBuilder> {
        match &self.custom_mesher {
            Some(mesher) => Arc::clone(mesher),
            None => Arc::new(TerrainMeshBuilder::from_settings(&settings.mesh)),
        }
    }
}

fn map_queue(shared: &Shared) -> &ResultQueue<MapData> {
    &shared.map_queue
}

fn mesh_queue(shared: &Shared) -> &ResultQueue<MeshData> {
    &shared.mesh_queue
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct GenerationJob<T, W> {
    id: RequestId,
    shared: Arc<Shared>,
    generators: Arc<Generators>,
    queue: fn(&Shared) -> &ResultQueue<T>,
    work: W,
    callback: Completion<T>,
}

/// Report a finished request. The request stops counting as in flight
/// before its result becomes visible to the consumer.
fn complete<T>(
    shared: &Shared,
    queue: fn(&Shared) -> &ResultQueue<T>,
    id: RequestId,
    outcome: Result<T, GenerationError>,
    callback: Completion<T>,
) {
    shared.in_flight.fetch_sub(1, Ordering::AcqRel);
    queue(shared).push(PendingResult::new(id, outcome, callback));
}

impl<T, W> Job for GenerationJob<T, W>
where
    T: Send + 'static,
    W: FnOnce(&Generators) -> Result<T, GenerationError> + Send + 'static,
{
    fn run(self: Box<Self>) {
        let GenerationJob {
            id,
            shared,
            generators,
            queue,
            work,
            callback,
        } = *self;

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| work(&generators))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(request = %id, %message, "generation worker panicked");
                Err(GenerationError::WorkerPanicked { message })
            }
        };
        complete(&shared, queue, id, outcome, callback);
    }

    fn abandon(self: Box<Self>) {
        let GenerationJob {
            id,
            shared,
            queue,
            callback,
            ..
        } = *self;
        debug!(request = %id, "pipeline shut down; request abandoned");
        complete(&shared, queue, id, Err(GenerationError::ShutDown), callback);
    }
}

/// Cloneable, thread-safe submitter for a [`GenerationPipeline`].
///
/// Completion callbacks may hold a handle and submit follow-up requests;
/// those are delivered on a later tick.
#[derive(Clone)]
pub struct PipelineHandle {
    shared: Arc<Shared>,
    jobs: JobSender,
}

impl PipelineHandle {
    /// Build map data for the chunk centered at `center` in the background.
    ///
    /// Returns immediately. `on_complete` runs exactly once, on the consumer
    /// thread, during a later [`GenerationPipeline::tick`].
    pub fn request_map_data<F>(&self, center: Vec2, on_complete: F) -> RequestId
    where
        F: FnOnce(Result<MapData, GenerationError>) + Send + 'static,
    {
        self.submit(
            map_queue,
            move |generators: &Generators| Ok(generators.data.build(center)),
            Box::new(on_complete),
        )
    }

    /// Build a mesh from `map_data` at level of detail `lod` in the background.
    ///
    /// Same delivery guarantees as [`request_map_data`](Self::request_map_data).
    pub fn request_mesh_data<F>(
        &self,
        map_data: Arc<MapData>,
        lod: u32,
        on_complete: F,
    ) -> RequestId
    where
        F: FnOnce(Result<MeshData, GenerationError>) + Send + 'static,
    {
        self.submit(
            mesh_queue,
            move |generators: &Generators| generators.mesher.build(map_data.height_field(), lod),
            Box::new(on_complete),
        )
    }

    fn submit<T, W>(
        &self,
        queue: fn(&Shared) -> &ResultQueue<T>,
        work: W,
        callback: Completion<T>,
    ) -> RequestId
    where
        T: Send + 'static,
        W: FnOnce(&Generators) -> Result<T, GenerationError> + Send + 'static,
    {
        let shared = &self.shared;
        let id = RequestId(shared.next_id.fetch_add(1, Ordering::Relaxed));

        let in_flight = shared.in_flight.fetch_add(1, Ordering::AcqRel);
        if shared.max_in_flight > 0 && in_flight >= shared.max_in_flight {
            shared.in_flight.fetch_sub(1, Ordering::AcqRel);
            let limit = shared.max_in_flight;
            warn!(request = %id, in_flight, limit, "generation request rejected");
            queue(shared).push(PendingResult::new(
                id,
                Err(GenerationError::Rejected { in_flight, limit }),
                callback,
            ));
            return id;
        }

        trace!(request = %id, "generation request submitted");
        self.jobs.submit(Box::new(GenerationJob {
            id,
            shared: Arc::clone(shared),
            generators: shared.snapshot(),
            queue,
            work,
            callback,
        }));
        id
    }

    /// Requests queued or running on workers.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }
}

/// Owns the worker pool and delivers results on the thread that created it.
pub struct GenerationPipeline {
    handle: PipelineHandle,
    pool: WorkerPool,
    consumer: ThreadId,
}

impl GenerationPipeline {
    /// Validate `settings` and start a pipeline with the default noise
    /// sampler and mesh builder.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Settings`] for invalid settings, or
    /// [`PipelineError::SpawnWorker`] if the worker threads cannot start.
    pub fn new(settings: TerrainSettings, options: PipelineOptions) -> Result<Self, PipelineError> {
        let data = TerrainDataBuilder::new(settings.validate()?);
        Self::start(data, None, options)
    }

    /// Start a pipeline around an existing data builder, optionally
    /// overriding the mesh builder. The builder's settings must be validated.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SpawnWorker`] if the worker threads cannot start.
    pub fn with_builders(
        data: TerrainDataBuilder,
        mesher: Option<Arc<dyn MeshBuilder>>,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        Self::start(data, mesher, options)
    }

    fn start(
        data: TerrainDataBuilder,
        custom_mesher: Option<Arc<dyn MeshBuilder>>,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let pool = WorkerPool::new(options.worker_threads)?;
        let mesher = match &custom_mesher {
            Some(mesher) => Arc::clone(mesher),
            None => Arc::new(TerrainMeshBuilder::from_settings(&data.settings().mesh)),
        };
        let shared = Arc::new(Shared {
            map_queue: ResultQueue::new(),
            mesh_queue: ResultQueue::new(),
            generators: RwLock::new(Arc::new(Generators { data, mesher })),
            custom_mesher,
            in_flight: AtomicUsize::new(0),
            max_in_flight: options.max_in_flight,
            next_id: AtomicU64::new(0),
        });

        debug!(
            workers = pool.thread_count(),
            max_in_flight = options.max_in_flight,
            "generation pipeline started"
        );
        Ok(Self {
            handle: PipelineHandle {
                shared,
                jobs: pool.sender(),
            },
            pool,
            consumer: thread::current().id(),
        })
    }

    /// A submitter that can be moved into callbacks or other threads.
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// See [`PipelineHandle::request_map_data`].
    pub fn request_map_data<F>(&self, center: Vec2, on_complete: F) -> RequestId
    where
        F: FnOnce(Result<MapData, GenerationError>) + Send + 'static,
    {
        self.handle.request_map_data(center, on_complete)
    }

    /// See [`PipelineHandle::request_mesh_data`].
    pub fn request_mesh_data<F>(
        &self,
        map_data: Arc<MapData>,
        lod: u32,
        on_complete: F,
    ) -> RequestId
    where
        F: FnOnce(Result<MeshData, GenerationError>) + Send + 'static,
    {
        self.handle.request_mesh_data(map_data, lod, on_complete)
    }

    /// Deliver every result completed so far. Call once per frame on the
    /// thread that created the pipeline.
    ///
    /// Each queue is delivered oldest first; map results are delivered before
    /// mesh results. Requests submitted by callbacks are delivered on a later
    /// tick.
    pub fn tick(&self) -> DrainStats {
        debug_assert_eq!(
            thread::current().id(),
            self.consumer,
            "GenerationPipeline::tick called off the consumer thread"
        );
        let shared = &self.handle.shared;
        let stats = DrainStats {
            maps: shared.map_queue.deliver_all(),
            meshes: shared.mesh_queue.deliver_all(),
        };
        if stats.total() > 0 {
            trace!(maps = stats.maps, meshes = stats.meshes, "delivered results");
        }
        stats
    }

    /// Replace the generation settings for requests submitted from now on.
    ///
    /// Requests already submitted finish with the settings they captured.
    /// The falloff mask is reused unless the chunk size changed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] and keeps the current settings if `settings`
    /// are invalid.
    pub fn reconfigure(&self, settings: TerrainSettings) -> Result<(), SettingsError> {
        let settings = settings.validate()?;
        let shared = &self.handle.shared;
        let current = shared.snapshot();
        let next = Generators {
            mesher: shared.mesher_for(&settings),
            data: current.data.reconfigured(settings),
        };
        *shared
            .generators
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        debug!("generation settings replaced");
        Ok(())
    }

    /// The settings new requests are built with.
    pub fn settings(&self) -> TerrainSettings {
        self.handle.shared.snapshot().data.settings().clone()
    }

    /// Build map data on the calling thread, bypassing the workers.
    pub fn generate_map_data_sync(&self, center: Vec2) -> MapData {
        self.handle.shared.snapshot().data.build(center)
    }

    /// Requests queued or running on workers.
    pub fn in_flight(&self) -> usize {
        self.handle.in_flight()
    }

    /// Results waiting for the next [`tick`](Self::tick).
    pub fn pending_deliveries(&self) -> usize {
        let shared = &self.handle.shared;
        shared.map_queue.len() + shared.mesh_queue.len()
    }

    pub fn worker_count(&self) -> usize {
        self.pool.thread_count()
    }

    /// Stop the workers after they finish queued requests.
    ///
    /// Later submissions are delivered as [`GenerationError::ShutDown`].
    pub fn shutdown(&mut self) {
        self.pool.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use crossbeam_channel::{Receiver, bounded};
    use rand::Rng;

    use crate::height_field::HeightField;
    use crate::map_data::tests::ConstantNoise;
    use crate::noise_map::{NoiseRequest, NoiseSampler};
    use crate::region::{Color, RegionThreshold};

    type Log<T> = Arc<Mutex<Vec<T>>>;

    fn small_settings() -> TerrainSettings {
        TerrainSettings {
            chunk_size: 23,
            ..Default::default()
        }
    }

    fn options(worker_threads: usize) -> PipelineOptions {
        PipelineOptions {
            worker_threads,
            max_in_flight: 0,
        }
    }

    fn pipeline_with(
        sampler: Arc<dyn NoiseSampler>,
        opts: PipelineOptions,
    ) -> GenerationPipeline {
        let data = TerrainDataBuilder::with_sampler(small_settings(), sampler);
        GenerationPipeline::with_builders(data, None, opts).unwrap()
    }

    /// Tick until `done` returns true, failing after a few seconds.
    fn tick_until(pipeline: &GenerationPipeline, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !done() {
            assert!(Instant::now() < deadline, "Timed out waiting for deliveries");
            pipeline.tick();
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Sleeps a random few milliseconds before returning a flat field.
    struct JitteryNoise;

    impl NoiseSampler for JitteryNoise {
        fn sample(&self, request: &NoiseRequest) -> HeightField {
            let delay = rand::rng().random_range(0..5);
            thread::sleep(Duration::from_millis(delay));
            HeightField::filled(request.width, request.height, 0.5)
        }
    }

    /// Blocks every sample until the test sends a token.
    struct GatedNoise(Receiver<()>);

    impl NoiseSampler for GatedNoise {
        fn sample(&self, request: &NoiseRequest) -> HeightField {
            let _ = self.0.recv();
            HeightField::filled(request.width, request.height, 0.5)
        }
    }

    struct PanickingNoise;

    impl NoiseSampler for PanickingNoise {
        fn sample(&self, _request: &NoiseRequest) -> HeightField {
            panic!("noise exploded");
        }
    }

    #[test]
    fn test_callback_runs_on_consumer_thread_during_tick() {
        let pipeline = pipeline_with(Arc::new(ConstantNoise(0.5)), options(2));
        let seen: Log<ThreadId> = Arc::default();

        let log = Arc::clone(&seen);
        pipeline.request_map_data(Vec2::ZERO, move |result| {
            assert!(result.is_ok());
            log.lock().unwrap().push(thread::current().id());
        });

        // Finished work is still not delivered without a tick.
        let deadline = Instant::now() + Duration::from_secs(10);
        while pipeline.pending_deliveries() == 0 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        assert!(seen.lock().unwrap().is_empty());

        let stats = pipeline.tick();
        assert_eq!(stats, DrainStats { maps: 1, meshes: 0 });
        assert_eq!(*seen.lock().unwrap(), vec![thread::current().id()]);
    }

    #[test]
    fn test_every_request_delivered_exactly_once_under_jitter() {
        let pipeline = pipeline_with(Arc::new(JitteryNoise), options(4));
        let delivered: Log<RequestId> = Arc::default();
        let total = 64;

        let mut submitted = Vec::new();
        for i in 0..total {
            let log = Arc::clone(&delivered);
            let center = Vec2::new(i as f32 * 22.0, 0.0);
            let id = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&id);
            let request = pipeline.request_map_data(center, move |result| {
                assert!(result.is_ok());
                let own = slot.lock().unwrap().expect("id recorded before delivery");
                log.lock().unwrap().push(own);
            });
            *id.lock().unwrap() = Some(request);
            submitted.push(request);
        }

        tick_until(&pipeline, || delivered.lock().unwrap().len() >= total);
        // Nothing further should arrive.
        thread::sleep(Duration::from_millis(20));
        pipeline.tick();

        let mut counts: HashMap<RequestId, usize> = HashMap::new();
        for id in delivered.lock().unwrap().iter() {
            *counts.entry(*id).or_default() += 1;
        }
        assert_eq!(counts.len(), total);
        assert!(counts.values().all(|&c| c == 1));
        assert!(submitted.iter().all(|id| counts.contains_key(id)));
    }

    #[test]
    fn test_single_queue_delivers_in_completion_order() {
        // One worker completes requests in submission order.
        let pipeline = pipeline_with(Arc::new(ConstantNoise(0.2)), options(1));
        let order: Log<&'static str> = Arc::default();

        for name in ["a", "b", "c"] {
            let log = Arc::clone(&order);
            pipeline.request_map_data(Vec2::ZERO, move |_| log.lock().unwrap().push(name));
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while pipeline.pending_deliveries() < 3 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(pipeline.tick().maps, 3);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_uniform_noise_scenario_through_pipeline() {
        let settings = TerrainSettings {
            regions: vec![
                RegionThreshold::new("water", 0.0, Color::BLUE),
                RegionThreshold::new("land", 0.4, Color::GREEN),
                RegionThreshold::new("snow", 0.8, Color::WHITE),
            ],
            ..Default::default()
        };
        let data = TerrainDataBuilder::with_sampler(settings, Arc::new(ConstantNoise(0.5)));
        let pipeline = GenerationPipeline::with_builders(data, None, options(1)).unwrap();

        let result: Log<MapData> = Arc::default();
        let slot = Arc::clone(&result);
        pipeline.request_map_data(Vec2::new(100.0, 100.0), move |map| {
            slot.lock().unwrap().push(map.unwrap());
        });
        tick_until(&pipeline, || !result.lock().unwrap().is_empty());

        let maps = result.lock().unwrap();
        assert_eq!(maps[0].chunk_size(), 239);
        assert!(maps[0].color_map().colors().iter().all(|&c| c == Color::GREEN));
        assert!(maps[0].trimmed_heights().values().iter().all(|&h| h == 0.5));
    }

    #[test]
    fn test_requests_over_limit_rejected_not_dropped() {
        let (gate_tx, gate_rx) = bounded(16);
        let pipeline = pipeline_with(
            Arc::new(GatedNoise(gate_rx)),
            PipelineOptions {
                worker_threads: 1,
                max_in_flight: 1,
            },
        );
        let outcomes: Log<Result<(), GenerationError>> = Arc::default();

        for _ in 0..3 {
            let log = Arc::clone(&outcomes);
            pipeline.request_map_data(Vec2::ZERO, move |r| {
                log.lock().unwrap().push(r.map(|_| ()));
            });
        }
        assert_eq!(pipeline.in_flight(), 1);

        // Rejections arrive on the next tick even while the worker is blocked.
        assert_eq!(pipeline.tick().maps, 2);
        {
            let got = outcomes.lock().unwrap();
            assert!(got.iter().all(|r| matches!(
                r,
                Err(GenerationError::Rejected { in_flight: 1, limit: 1 })
            )));
        }

        gate_tx.send(()).unwrap();
        tick_until(&pipeline, || outcomes.lock().unwrap().len() == 3);
        assert_eq!(outcomes.lock().unwrap()[2], Ok(()));
    }

    #[test]
    fn test_worker_panic_delivered_as_error() {
        let pipeline = pipeline_with(Arc::new(PanickingNoise), options(1));
        let outcomes: Log<Result<(), GenerationError>> = Arc::default();

        for _ in 0..2 {
            let log = Arc::clone(&outcomes);
            pipeline.request_map_data(Vec2::ZERO, move |r| {
                log.lock().unwrap().push(r.map(|_| ()));
            });
        }
        tick_until(&pipeline, || outcomes.lock().unwrap().len() == 2);

        // The worker survives the first panic and handles the second request.
        for outcome in outcomes.lock().unwrap().iter() {
            match outcome {
                Err(GenerationError::WorkerPanicked { message }) => {
                    assert_eq!(message, "noise exploded");
                }
                other => panic!("expected panic error, got {other:?}"),
            }
        }
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[test]
    fn test_panicking_callback_leaves_later_results_queued() {
        let pipeline = pipeline_with(Arc::new(ConstantNoise(0.5)), options(1));
        let delivered: Log<usize> = Arc::default();

        pipeline.request_map_data(Vec2::ZERO, |_| panic!("callback failed"));
        for i in 1..4 {
            let log = Arc::clone(&delivered);
            pipeline.request_map_data(Vec2::ZERO, move |_| log.lock().unwrap().push(i));
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while pipeline.pending_deliveries() < 4 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(1));
        }
        assert!(panic::catch_unwind(AssertUnwindSafe(|| pipeline.tick())).is_err());
        assert_eq!(pipeline.pending_deliveries(), 3);

        assert_eq!(pipeline.tick().maps, 3);
        assert_eq!(*delivered.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_mesh_request_from_map_callback() {
        let pipeline = pipeline_with(Arc::new(ConstantNoise(0.5)), options(2));
        let handle = pipeline.handle();
        let meshes: Log<MeshData> = Arc::default();

        let log = Arc::clone(&meshes);
        pipeline.request_map_data(Vec2::ZERO, move |map| {
            let map = Arc::new(map.unwrap());
            handle.request_mesh_data(map, 0, move |mesh| log.lock().unwrap().push(mesh.unwrap()));
        });

        tick_until(&pipeline, || !meshes.lock().unwrap().is_empty());
        let meshes = meshes.lock().unwrap();
        assert_eq!(meshes[0].vertices.len(), 23 * 23);
        assert_eq!(meshes[0].lod, 0);
    }

    #[test]
    fn test_unsupported_lod_delivered_as_error() {
        let pipeline = pipeline_with(Arc::new(ConstantNoise(0.5)), options(1));
        let map = Arc::new(pipeline.generate_map_data_sync(Vec2::ZERO));
        let outcome: Log<Result<MeshData, GenerationError>> = Arc::default();

        let log = Arc::clone(&outcome);
        // 24 is not a multiple of 2 * 5.
        pipeline.request_mesh_data(map, 5, move |r| log.lock().unwrap().push(r));
        tick_until(&pipeline, || !outcome.lock().unwrap().is_empty());

        assert_eq!(
            outcome.lock().unwrap()[0],
            Err(GenerationError::UnsupportedLod {
                lod: 5,
                bordered_size: 25
            })
        );
    }

    #[test]
    fn test_reconfigure_applies_to_new_requests() {
        let pipeline = GenerationPipeline::new(small_settings(), options(2)).unwrap();
        let before = pipeline.generate_map_data_sync(Vec2::ZERO);

        let mut reseeded = small_settings();
        reseeded.noise.seed = 1234;
        pipeline.reconfigure(reseeded.clone()).unwrap();
        assert_eq!(pipeline.settings().noise.seed, 1234);

        let result: Log<MapData> = Arc::default();
        let slot = Arc::clone(&result);
        pipeline.request_map_data(Vec2::ZERO, move |m| slot.lock().unwrap().push(m.unwrap()));
        tick_until(&pipeline, || !result.lock().unwrap().is_empty());

        let expected = TerrainDataBuilder::new(reseeded).build(Vec2::ZERO);
        assert_eq!(result.lock().unwrap()[0], expected);
        assert_ne!(result.lock().unwrap()[0], before);
    }

    #[test]
    fn test_invalid_reconfigure_keeps_current_settings() {
        let pipeline = GenerationPipeline::new(small_settings(), options(1)).unwrap();
        let bad = TerrainSettings {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(pipeline.reconfigure(bad), Err(SettingsError::ZeroChunkSize));
        assert_eq!(pipeline.settings().chunk_size, 23);
    }

    #[test]
    fn test_invalid_settings_rejected_at_construction() {
        let mut settings = small_settings();
        settings.regions.reverse();
        assert!(matches!(
            GenerationPipeline::new(settings, options(1)),
            Err(PipelineError::Settings(SettingsError::UnsortedRegions { .. }))
        ));
    }

    #[test]
    fn test_requests_after_shutdown_report_shut_down() {
        let mut pipeline = pipeline_with(Arc::new(ConstantNoise(0.5)), options(1));
        pipeline.shutdown();

        let outcome: Log<Result<(), GenerationError>> = Arc::default();
        let log = Arc::clone(&outcome);
        pipeline.request_map_data(Vec2::ZERO, move |r| {
            log.lock().unwrap().push(r.map(|_| ()));
        });

        assert_eq!(pipeline.tick().maps, 1);
        assert_eq!(
            *outcome.lock().unwrap(),
            vec![Err(GenerationError::ShutDown)]
        );
        assert_eq!(pipeline.in_flight(), 0);
    }

    #[test]
    fn test_tick_with_nothing_pending() {
        let pipeline = pipeline_with(Arc::new(ConstantNoise(0.5)), options(1));
        assert_eq!(pipeline.tick(), DrainStats::default());
        assert_eq!(pipeline.worker_count(), 1);
    }
}
