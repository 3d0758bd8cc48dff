//! Surface decoding workers.
//!
//! Only the render thread may touch the GPU, so workers stop at the decoded
//! surface and hand it over through a queue. Results arrive in completion
//! order, not submission order.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use ember_core::{PopOutcome, ThreadSafeQueue};
use parking_lot::Mutex;

use crate::backend::{BackendResult, Surface, SurfaceDecoder};
use crate::error::{RenderError, RenderResult};

/// How long a worker waits for a job before re-checking for shutdown.
pub const WORKER_POLL: Duration = Duration::from_millis(10);

/// Delay between signalling shutdown and joining the workers.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(2);

/// A decode request. The path is already resolved against the resources
/// folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadJob {
    /// Resource id.
    pub id: u64,
    /// Image path.
    pub path: String,
}

/// A decoded surface, or why it could not be decoded.
pub type DecodedSurface = (u64, BackendResult<Surface>);

/// Total loading threads, the calling thread included, for a configured
/// maximum and the detected hardware concurrency.
///
/// `max == 0` means "use all hardware threads". A maximum above what the
/// hardware offers is capped.
#[must_use]
pub fn resolve_loading_threads(max: usize, hardware: usize) -> usize {
    let hardware = hardware.max(1);
    if max < hardware {
        if max == 0 {
            hardware
        } else {
            max
        }
    } else {
        if max > hardware {
            tracing::info!(
                "maxResourceThreads requested: {max} but hardware only supports up to: \
                 {hardware} threads. Will use: {hardware} resource loading threads"
            );
        }
        hardware
    }
}

/// Detected hardware concurrency, 1 if unknown.
#[must_use]
pub fn hardware_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Job and result queues plus the workers draining them.
pub(crate) struct LoaderPool {
    jobs: Arc<ThreadSafeQueue<LoadJob>>,
    surfaces: Arc<ThreadSafeQueue<DecodedSurface>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for LoaderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoaderPool")
            .field("pending_jobs", &self.jobs.len())
            .field("pending_surfaces", &self.surfaces.len())
            .field("workers", &self.workers.lock().len())
            .finish()
    }
}

impl LoaderPool {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Arc::new(ThreadSafeQueue::new()),
            surfaces: Arc::new(ThreadSafeQueue::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Starts `count` workers. They live until [`LoaderPool::shutdown`].
    pub(crate) fn spawn_workers(
        &self,
        count: usize,
        decoder: &Arc<dyn SurfaceDecoder>,
    ) -> RenderResult<()> {
        let mut workers = self.workers.lock();
        for index in 0..count {
            let jobs = Arc::clone(&self.jobs);
            let surfaces = Arc::clone(&self.surfaces);
            let decoder = Arc::clone(decoder);

            let handle = std::thread::Builder::new()
                .name(format!("ember-loader-{index}"))
                .spawn(move || worker_loop(&jobs, &surfaces, decoder.as_ref()))
                .map_err(|e| {
                    tracing::error!("Failed to spawn resource loading thread {index}: {e}");
                    RenderError::ThreadSpawn(e.to_string())
                })?;
            workers.push(handle);
        }
        Ok(())
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    pub(crate) fn push_job(&self, job: LoadJob) {
        self.jobs.push(job);
    }

    /// Stops handing out jobs. Workers exit at their next poll.
    pub(crate) fn stop_jobs(&self) {
        self.jobs.shutdown();
    }

    pub(crate) fn jobs_stopped(&self) -> bool {
        self.jobs.is_shutdown()
    }

    pub(crate) fn next_surface(&self, timeout: Duration) -> PopOutcome<DecodedSurface> {
        self.surfaces.wait_and_pop(timeout)
    }

    /// Blocks until the surface for `id` arrives. `None` after shutdown.
    pub(crate) fn wait_for_surface(&self, id: u64) -> Option<BackendResult<Surface>> {
        self.surfaces
            .wait_for_matching(|(decoded, _)| *decoded == id)
            .map(|(_, surface)| surface)
    }

    /// Shuts both queues down and joins every worker.
    pub(crate) fn shutdown(&self) {
        self.jobs.shutdown();
        self.surfaces.shutdown();
        std::thread::sleep(SHUTDOWN_GRACE);

        for handle in self.workers.lock().drain(..) {
            if handle.join().is_err() {
                tracing::error!("A resource loading thread panicked");
            }
        }
    }
}

fn worker_loop(
    jobs: &ThreadSafeQueue<LoadJob>,
    surfaces: &ThreadSafeQueue<DecodedSurface>,
    decoder: &dyn SurfaceDecoder,
) {
    loop {
        match jobs.wait_and_pop(WORKER_POLL) {
            PopOutcome::Item(job) => {
                let decoded = decoder.decode(&job.path);
                if let Err(e) = &decoded {
                    tracing::error!("Error decoding surface for file {}: {e}", job.path);
                }
                surfaces.push((job.id, decoded));
            }
            PopOutcome::TimedOut => {}
            PopOutcome::Shutdown => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessDecoder;

    #[test]
    fn test_resolve_loading_threads() {
        assert_eq!(resolve_loading_threads(0, 8), 8);
        assert_eq!(resolve_loading_threads(3, 8), 3);
        assert_eq!(resolve_loading_threads(1, 8), 1);
        assert_eq!(resolve_loading_threads(16, 8), 8);
        assert_eq!(resolve_loading_threads(8, 8), 8);
        assert_eq!(resolve_loading_threads(0, 0), 1);
    }

    #[test]
    fn test_workers_decode_out_of_order() {
        let decoder: Arc<dyn SurfaceDecoder> =
            Arc::new(HeadlessDecoder::new(4, 4).with_size("b.png", 2, 3));
        let pool = LoaderPool::new();
        for (id, path) in [(1_u64, "a.png"), (2, "b.png"), (3, "c.png")] {
            pool.push_job(LoadJob {
                id,
                path: path.to_string(),
            });
        }
        pool.spawn_workers(2, &decoder).unwrap();
        assert_eq!(pool.worker_count(), 2);

        let surface = pool.wait_for_surface(2).unwrap().unwrap();
        assert_eq!((surface.width, surface.height), (2, 3));
        assert!(pool.wait_for_surface(3).unwrap().is_ok());
        assert!(pool.wait_for_surface(1).unwrap().is_ok());

        pool.shutdown();
        assert_eq!(pool.worker_count(), 0);
        assert!(pool.wait_for_surface(1).is_none());
    }

    #[test]
    fn test_decode_failure_is_forwarded() {
        let decoder: Arc<dyn SurfaceDecoder> =
            Arc::new(HeadlessDecoder::new(4, 4).failing("broken.png"));
        let pool = LoaderPool::new();
        pool.spawn_workers(1, &decoder).unwrap();
        pool.push_job(LoadJob {
            id: 9,
            path: "broken.png".to_string(),
        });

        assert!(pool.wait_for_surface(9).unwrap().is_err());
        pool.shutdown();
    }
}
