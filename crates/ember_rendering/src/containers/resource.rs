//! # Image Resources
//!
//! Every image the manifest knows about is stored as a record. `ON_INIT`
//! images are uploaded during init, either on the calling thread or with a
//! pool of decoding workers feeding the calling thread. `ON_DEMAND` images
//! are reference counted: the first load requests an upload, the last unload
//! requests destruction.
//!
//! The update thread owns the reference counts and issues commands; the
//! render thread owns the textures.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ember_core::{KeyedContainer, PopOutcome};
use ember_shared::Rectangle;
use parking_lot::RwLock;

use super::loader::{hardware_threads, resolve_loading_threads, LoadJob, LoaderPool, WORKER_POLL};
use super::slots::texture_bytes;
use crate::backend::{BackendResult, GraphicsBackend, Surface, SurfaceDecoder, TextureId};
use crate::command::{CommandSink, RenderCommand, RendererCmd};
use crate::config::join_resource_path;
use crate::error::{RenderError, RenderResult};
use crate::manifest::{ResourceData, TextureLoadType};

#[derive(Debug)]
struct StoredResource {
    data: ResourceData,
    ref_count: u32,
}

/// Image records, their textures and the loader pool.
pub struct ResourceContainer {
    decoder: Arc<dyn SurfaceDecoder>,
    resources_folder: String,
    max_loading_threads: usize,
    records: RwLock<HashMap<u64, StoredResource>>,
    textures: KeyedContainer<TextureId>,
    pool: LoaderPool,
    multithreaded: AtomicBool,
}

impl std::fmt::Debug for ResourceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceContainer")
            .field("records", &self.records.read().len())
            .field("textures", &self.textures.len())
            .field("pool", &self.pool)
            .field("multithreaded", &self.is_multithreaded())
            .finish_non_exhaustive()
    }
}

impl ResourceContainer {
    /// Creates an empty container sized for `capacity` records.
    #[must_use]
    pub fn new(
        decoder: Arc<dyn SurfaceDecoder>,
        resources_folder: impl Into<String>,
        max_loading_threads: usize,
        capacity: usize,
    ) -> Self {
        Self {
            decoder,
            resources_folder: resources_folder.into(),
            max_loading_threads,
            records: RwLock::new(HashMap::with_capacity(capacity)),
            textures: KeyedContainer::with_capacity(capacity),
            pool: LoaderPool::new(),
            multithreaded: AtomicBool::new(false),
        }
    }

    /// Reserves room for `additional` records and textures.
    pub fn reserve(&self, additional: usize) {
        self.records.write().reserve(additional);
        self.textures.reserve(additional);
    }

    /// Stores a manifest record. A record with the same id is replaced.
    pub fn store(&self, data: ResourceData) {
        let id = data.header.hash_value;
        self.records
            .write()
            .insert(id, StoredResource { data, ref_count: 0 });
    }

    /// Number of stored records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Frame rectangle of an image, for building draw records.
    #[must_use]
    pub fn image_rect(&self, id: u64) -> Option<Rectangle> {
        self.records.read().get(&id).map(|stored| stored.data.image_rect)
    }

    /// Current reference count of an on-demand image.
    #[must_use]
    pub fn ref_count(&self, id: u64) -> Option<u32> {
        self.records.read().get(&id).map(|stored| stored.ref_count)
    }

    /// True while on-demand decodes go through the worker pool.
    #[must_use]
    pub fn is_multithreaded(&self) -> bool {
        self.multithreaded.load(Ordering::Acquire)
    }

    /// Number of running decoding workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.pool.worker_count()
    }

    // ========================================================================
    // INIT LOADING (render thread, before the loop starts)
    // ========================================================================

    /// Uploads every `ON_INIT` image. `on_loaded` receives the backend and
    /// the bytes accounted for after each step, for progress reporting.
    ///
    /// Returns the number of uploaded images.
    ///
    /// # Errors
    ///
    /// A decode or upload failure, [`RenderError::ThreadSpawn`], or
    /// [`RenderError::LoadingAborted`] if the workers stopped early.
    pub fn load_all_stored<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        on_loaded: impl FnMut(&mut B, u64),
    ) -> RenderResult<usize> {
        let jobs: Vec<(LoadJob, u64)> = self
            .records
            .read()
            .values()
            .filter(|stored| stored.data.load_type == TextureLoadType::OnInit)
            .map(|stored| {
                let header = &stored.data.header;
                (
                    LoadJob {
                        id: header.hash_value,
                        path: join_resource_path(&self.resources_folder, &header.path),
                    },
                    header.file_size,
                )
            })
            .collect();

        if self.max_loading_threads == 1 {
            tracing::info!("Starting Single Core resource loading");
            return self.load_single_core(jobs, backend, on_loaded);
        }

        let threads = resolve_loading_threads(self.max_loading_threads, hardware_threads());
        if threads == 1 {
            tracing::info!(
                "Multi Threading is not supported on this hardware. \
                 Starting Single Core resource loading"
            );
            return self.load_single_core(jobs, backend, on_loaded);
        }

        let workers = threads - 1;
        tracing::info!("Starting Multi Core resource loading on {threads} threads");
        if workers > 1 {
            self.multithreaded.store(true, Ordering::Release);
        }
        self.load_multi_core(workers, jobs, backend, on_loaded)
    }

    fn load_single_core<B: GraphicsBackend + ?Sized>(
        &self,
        jobs: Vec<(LoadJob, u64)>,
        backend: &mut B,
        mut on_loaded: impl FnMut(&mut B, u64),
    ) -> RenderResult<usize> {
        // decode and upload each count for half of the file size
        let mut decoded = Vec::with_capacity(jobs.len());
        for (job, file_size) in jobs {
            let surface = self.decoder.decode(&job.path).map_err(|e| {
                tracing::error!("Error decoding surface for file {}: {e}", job.path);
                RenderError::from(e)
            })?;
            on_loaded(backend, file_size / 2);
            decoded.push((job.id, surface, file_size));
        }

        let count = decoded.len();
        for (id, surface, file_size) in decoded {
            self.upload(backend, id, &surface)?;
            on_loaded(backend, file_size / 2);
        }
        Ok(count)
    }

    fn load_multi_core<B: GraphicsBackend + ?Sized>(
        &self,
        workers: usize,
        jobs: Vec<(LoadJob, u64)>,
        backend: &mut B,
        mut on_loaded: impl FnMut(&mut B, u64),
    ) -> RenderResult<usize> {
        let count = jobs.len();
        let mut sizes = HashMap::with_capacity(count);
        for (job, file_size) in jobs {
            sizes.insert(job.id, file_size);
            self.pool.push_job(job);
        }
        self.pool.spawn_workers(workers, &self.decoder)?;

        let mut remaining = count;
        while remaining > 0 {
            match self.pool.next_surface(WORKER_POLL) {
                PopOutcome::Item((id, Ok(surface))) => {
                    if let Err(e) = self.upload(backend, id, &surface) {
                        tracing::error!("Error uploading rsrcId: {id:#018X}: {e}");
                        return Err(self.abort_init(remaining));
                    }
                    remaining -= 1;
                    on_loaded(backend, sizes.get(&id).copied().unwrap_or(0));
                }
                PopOutcome::Item((id, Err(e))) => {
                    tracing::error!("Terminating resource loading, rsrcId: {id:#018X}: {e}");
                    return Err(self.abort_init(remaining));
                }
                PopOutcome::TimedOut if self.pool.jobs_stopped() => {
                    return Err(self.abort_init(remaining));
                }
                PopOutcome::TimedOut => {}
                PopOutcome::Shutdown => return Err(self.abort_init(remaining)),
            }
        }
        Ok(count)
    }

    fn abort_init(&self, remaining: usize) -> RenderError {
        self.pool.stop_jobs();
        tracing::error!("Resource loading aborted with {remaining} textures outstanding");
        RenderError::LoadingAborted { remaining }
    }

    fn upload<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        id: u64,
        surface: &Surface,
    ) -> BackendResult<()> {
        let texture = backend.create_texture_from_surface(surface)?;
        let usage = texture_bytes(surface.width, surface.height);
        if let Some(previous) = self.textures.insert(id, texture, usage) {
            backend.destroy_texture(previous);
        }
        Ok(())
    }

    // ========================================================================
    // ON-DEMAND (update thread)
    // ========================================================================

    /// Takes a reference to an on-demand image, requesting its upload on the
    /// first reference.
    ///
    /// # Errors
    ///
    /// [`RenderError::ResourceNotFound`] or [`RenderError::CommandDropped`].
    /// An `ON_INIT` image is logged and left alone.
    pub fn load_on_demand(&self, sink: &mut dyn CommandSink, id: u64) -> RenderResult<()> {
        let mut records = self.records.write();
        let stored = Self::on_demand_record(&mut records, id)?;
        let Some(stored) = stored else {
            return Ok(());
        };

        if stored.ref_count > 0 {
            stored.ref_count += 1;
            return Ok(());
        }

        if !sink.submit(&RenderCommand::LoadTextureSingle(id)) {
            return Err(RenderError::CommandDropped(RendererCmd::LoadTextureSingle));
        }
        stored.ref_count = 1;
        if self.is_multithreaded() {
            self.pool.push_job(self.job_for(&stored.data));
        }
        Ok(())
    }

    /// Takes a reference to every image in `ids`. Images reaching their
    /// first reference are uploaded as one batch, reported back under
    /// `batch_id` once complete. Unknown and `ON_INIT` ids are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`RenderError::CommandDropped`]. No reference is taken in that case.
    pub fn load_on_demand_multiple(
        &self,
        sink: &mut dyn CommandSink,
        ids: &[u64],
        batch_id: i32,
    ) -> RenderResult<()> {
        let mut records = self.records.write();
        let mut to_upload = Vec::with_capacity(ids.len());
        let mut already_loaded = Vec::new();

        for &id in ids {
            let Ok(Some(stored)) = Self::on_demand_record(&mut records, id) else {
                continue;
            };
            if stored.ref_count > 0 || to_upload.contains(&id) {
                already_loaded.push(id);
            } else {
                to_upload.push(id);
            }
        }

        let command = RenderCommand::LoadTextureMultiple {
            batch_id,
            ids: Cow::Borrowed(to_upload.as_slice()),
        };
        if !sink.submit(&command) {
            return Err(RenderError::CommandDropped(RendererCmd::LoadTextureMultiple));
        }

        let multithreaded = self.is_multithreaded();
        for id in to_upload.iter().chain(&already_loaded) {
            if let Some(stored) = records.get_mut(id) {
                stored.ref_count += 1;
            }
        }
        if multithreaded {
            for id in &to_upload {
                if let Some(stored) = records.get(id) {
                    self.pool.push_job(self.job_for(&stored.data));
                }
            }
        }
        Ok(())
    }

    /// Drops a reference, requesting destruction when the last one goes.
    ///
    /// # Errors
    ///
    /// [`RenderError::ResourceNotFound`], [`RenderError::ResourceNotLoaded`]
    /// or [`RenderError::CommandDropped`].
    pub fn unload_on_demand(&self, sink: &mut dyn CommandSink, id: u64) -> RenderResult<()> {
        let mut records = self.records.write();
        let Some(stored) = records.get_mut(&id) else {
            tracing::error!("Error, trying to unload rsrcId: {id:#018X} which is not existing");
            return Err(RenderError::ResourceNotFound(id));
        };
        if stored.ref_count == 0 {
            tracing::error!("Error, trying to unload rsrcId: {id:#018X} that is not loaded");
            return Err(RenderError::ResourceNotLoaded(id));
        }

        if stored.ref_count == 1 && !sink.submit(&RenderCommand::DestroyTexture(id)) {
            return Err(RenderError::CommandDropped(RendererCmd::DestroyTexture));
        }
        stored.ref_count -= 1;
        Ok(())
    }

    /// [`ResourceContainer::unload_on_demand`] for every id. Every id is
    /// attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// The first error any id produced.
    pub fn unload_on_demand_multiple(
        &self,
        sink: &mut dyn CommandSink,
        ids: &[u64],
    ) -> RenderResult<()> {
        let mut first_error = None;
        for &id in ids {
            if let Err(e) = self.unload_on_demand(sink, id) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// `Ok(None)` for an `ON_INIT` record, which is never loaded on demand.
    fn on_demand_record(
        records: &mut HashMap<u64, StoredResource>,
        id: u64,
    ) -> RenderResult<Option<&mut StoredResource>> {
        let Some(stored) = records.get_mut(&id) else {
            tracing::error!("Error, rsrcData for rsrcId: {id:#018X} not found. will not create Image");
            return Err(RenderError::ResourceNotFound(id));
        };
        if stored.data.load_type == TextureLoadType::OnInit {
            tracing::warn!(
                "Invoking dynamic load on a resource with ID: {id:#018X} that has \
                 TextureLoadType::ON_INIT. Will not load resource!"
            );
            return Ok(None);
        }
        Ok(Some(stored))
    }

    fn job_for(&self, data: &ResourceData) -> LoadJob {
        LoadJob {
            id: data.header.hash_value,
            path: join_resource_path(&self.resources_folder, &data.header.path),
        }
    }

    /// Switches on-demand decodes between the worker pool and the render
    /// thread. The render thread is told through the command stream.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] when enabling without running workers,
    /// [`RenderError::CommandDropped`].
    pub fn set_multithreaded(&self, sink: &mut dyn CommandSink, enable: bool) -> RenderResult<()> {
        if enable && self.pool.worker_count() == 0 {
            tracing::error!(
                "Multithreaded texture loading requested but no resource loading threads are running"
            );
            return Err(RenderError::InvalidConfig(
                "multithreaded texture loading needs loader workers".to_string(),
            ));
        }
        if !sink.submit(&RenderCommand::EnableDisableMultithreadTextureLoading(enable)) {
            return Err(RenderError::CommandDropped(
                RendererCmd::EnableDisableMultithreadTextureLoading,
            ));
        }
        self.multithreaded.store(enable, Ordering::Release);
        Ok(())
    }

    // ========================================================================
    // RENDER THREAD
    // ========================================================================

    /// Decodes (or collects from the workers) and uploads one image.
    ///
    /// # Errors
    ///
    /// [`RenderError::ResourceNotFound`], a decode or upload failure, or
    /// [`RenderError::LoadingAborted`] if the workers shut down first.
    pub fn upload_on_demand<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        id: u64,
        from_workers: bool,
    ) -> RenderResult<()> {
        let surface = if from_workers {
            match self.pool.wait_for_surface(id) {
                Some(surface) => surface?,
                None => {
                    tracing::error!("Loader shut down while waiting for rsrcId: {id:#018X}");
                    return Err(RenderError::LoadingAborted { remaining: 1 });
                }
            }
        } else {
            let job = self
                .records
                .read()
                .get(&id)
                .map(|stored| self.job_for(&stored.data))
                .ok_or(RenderError::ResourceNotFound(id))?;
            self.decoder.decode(&job.path)?
        };

        self.upload(backend, id, &surface)?;
        Ok(())
    }

    /// Frees the texture of an image.
    ///
    /// # Errors
    ///
    /// [`RenderError::ResourceNotFound`] if it has no texture.
    pub fn destroy_texture<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        id: u64,
    ) -> RenderResult<()> {
        let texture = self
            .textures
            .remove(id)
            .ok_or(RenderError::ResourceNotFound(id))?;
        backend.destroy_texture(texture);
        Ok(())
    }

    /// Texture of an uploaded image.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<TextureId> {
        self.textures.get(id)
    }

    /// Number of uploaded images.
    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// GPU bytes held by images.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        self.textures.memory_usage()
    }

    /// Stops and joins the workers, then frees every texture and record.
    pub fn deinit<B: GraphicsBackend + ?Sized>(&self, backend: &mut B) {
        self.pool.shutdown();
        self.multithreaded.store(false, Ordering::Release);
        for (_, texture) in self.textures.drain() {
            backend.destroy_texture(texture);
        }
        self.records.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessBackend, HeadlessDecoder};
    use crate::defines::RendererFlags;
    use crate::manifest::ResourceHeader;

    #[derive(Default)]
    struct Recorder {
        opcodes: Vec<RendererCmd>,
        full: bool,
    }

    impl CommandSink for Recorder {
        fn submit(&mut self, command: &RenderCommand<'_>) -> bool {
            if self.full {
                return false;
            }
            self.opcodes.push(command.opcode());
            true
        }
    }

    fn record(id: u64, load_type: TextureLoadType) -> ResourceData {
        ResourceData {
            header: ResourceHeader {
                path: format!("img_{id}.png"),
                file_size: 100,
                hash_value: id,
            },
            image_rect: Rectangle::new(0, 0, 4, 4),
            load_type,
        }
    }

    fn container(max_threads: usize) -> ResourceContainer {
        let decoder: Arc<dyn SurfaceDecoder> = Arc::new(HeadlessDecoder::new(4, 4));
        let container = ResourceContainer::new(decoder, "res", max_threads, 8);
        container.store(record(1, TextureLoadType::OnInit));
        container.store(record(2, TextureLoadType::OnInit));
        container.store(record(3, TextureLoadType::OnDemand));
        container
    }

    #[test]
    fn test_single_core_loads_only_on_init() {
        let resources = container(1);
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let mut progress = 0;

        let loaded = resources
            .load_all_stored(&mut backend, |_, bytes| progress += bytes)
            .unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(progress, 200);
        assert!(resources.get(1).is_some());
        assert!(resources.get(3).is_none());
        assert_eq!(resources.memory_usage(), 2 * 4 * 4 * 4);
        assert!(!resources.is_multithreaded());
    }

    #[test]
    fn test_multi_core_loads_through_workers() {
        let resources = container(3);
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);

        let loaded = resources.load_all_stored(&mut backend, |_, _| {}).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(resources.texture_count(), 2);
        resources.deinit(&mut backend);
        assert_eq!(resources.texture_count(), 0);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_single_core_decode_failure_is_fatal() {
        let decoder: Arc<dyn SurfaceDecoder> =
            Arc::new(HeadlessDecoder::new(4, 4).failing("img_1.png"));
        let resources = ResourceContainer::new(decoder, "", 1, 2);
        resources.store(record(1, TextureLoadType::OnInit));
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);

        assert!(resources.load_all_stored(&mut backend, |_, _| {}).is_err());
    }

    #[test]
    fn test_on_demand_ref_counting() {
        let resources = container(1);
        let mut sink = Recorder::default();

        resources.load_on_demand(&mut sink, 3).unwrap();
        resources.load_on_demand(&mut sink, 3).unwrap();
        assert_eq!(resources.ref_count(3), Some(2));
        assert_eq!(sink.opcodes, vec![RendererCmd::LoadTextureSingle]);

        resources.unload_on_demand(&mut sink, 3).unwrap();
        assert_eq!(sink.opcodes.len(), 1);
        resources.unload_on_demand(&mut sink, 3).unwrap();
        assert_eq!(sink.opcodes[1], RendererCmd::DestroyTexture);

        assert_eq!(
            resources.unload_on_demand(&mut sink, 3),
            Err(RenderError::ResourceNotLoaded(3))
        );
    }

    #[test]
    fn test_on_demand_rejects_unknown_and_on_init() {
        let resources = container(1);
        let mut sink = Recorder::default();

        assert_eq!(
            resources.load_on_demand(&mut sink, 99),
            Err(RenderError::ResourceNotFound(99))
        );
        resources.load_on_demand(&mut sink, 1).unwrap();
        assert!(sink.opcodes.is_empty());
        assert_eq!(resources.ref_count(1), Some(0));
    }

    #[test]
    fn test_dropped_command_takes_no_reference() {
        let resources = container(1);
        let mut sink = Recorder {
            full: true,
            ..Recorder::default()
        };

        assert_eq!(
            resources.load_on_demand(&mut sink, 3),
            Err(RenderError::CommandDropped(RendererCmd::LoadTextureSingle))
        );
        assert_eq!(resources.ref_count(3), Some(0));
    }

    #[test]
    fn test_multiple_batch_skips_invalid_ids() {
        let resources = container(1);
        resources.store(record(4, TextureLoadType::OnDemand));
        let mut sink = Recorder::default();

        resources
            .load_on_demand_multiple(&mut sink, &[3, 4, 1, 42], 7)
            .unwrap();

        assert_eq!(sink.opcodes, vec![RendererCmd::LoadTextureMultiple]);
        assert_eq!(resources.ref_count(3), Some(1));
        assert_eq!(resources.ref_count(4), Some(1));
        assert_eq!(resources.ref_count(1), Some(0));

        resources.unload_on_demand_multiple(&mut sink, &[3, 4]).unwrap();
        assert_eq!(
            sink.opcodes[1..],
            [RendererCmd::DestroyTexture, RendererCmd::DestroyTexture]
        );
    }

    #[test]
    fn test_enable_multithread_needs_workers() {
        let resources = container(1);
        let mut sink = Recorder::default();

        assert!(resources.set_multithreaded(&mut sink, true).is_err());
        resources.set_multithreaded(&mut sink, false).unwrap();
        assert_eq!(
            sink.opcodes,
            vec![RendererCmd::EnableDisableMultithreadTextureLoading]
        );
    }

    #[test]
    fn test_upload_on_demand_on_render_thread() {
        let resources = container(1);
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);

        resources.upload_on_demand(&mut backend, 3, false).unwrap();
        assert!(resources.get(3).is_some());

        resources.destroy_texture(&mut backend, 3).unwrap();
        assert!(resources.get(3).is_none());
        assert_eq!(
            resources.destroy_texture(&mut backend, 3),
            Err(RenderError::ResourceNotFound(3))
        );
    }
}
