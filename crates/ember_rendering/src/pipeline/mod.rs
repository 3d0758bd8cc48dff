//! # Render Command Pipeline
//!
//! The update thread records frames through a [`Renderer`]; a
//! [`RenderExecutor`] owning the graphics backend replays them.
//!
//! ```text
//! update thread                      render thread
//! ┌──────────────┐   swap (1/frame)  ┌────────────────┐
//! │   Renderer   │ ────────────────▶ │ RenderExecutor │ ──▶ GraphicsBackend
//! │ add_draw     │                   │ decode opcode  │
//! │ add_command  │ ◀──────────────── │ dispatch       │
//! └──────────────┘   batch ids       └────────────────┘
//! ```
//!
//! Under [`RendererPolicy::SingleThreaded`] both halves live on the update
//! thread inside a [`LocalRenderer`], which executes each frame right after
//! the swap. Under [`RendererPolicy::MultiThreaded`] the executor moves to
//! its own thread with [`spawn_render_thread`].

mod executor;
mod renderer;
mod stats;

pub use executor::{FrameOutcome, RenderExecutor};
pub use renderer::Renderer;
pub use stats::RenderStats;

use std::ops::Deref;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use ember_core::DoubleBuffer;

use crate::backend::GraphicsBackend;
use crate::config::RendererConfig;
use crate::containers::Containers;
use crate::defines::RendererPolicy;
use crate::error::{RenderError, RenderResult};
use crate::state::RenderState;
use stats::PipelineStats;

/// State both halves of a pipeline hold.
#[derive(Debug)]
pub(crate) struct PipelineShared {
    pub(crate) buffers: DoubleBuffer<RenderState>,
    pub(crate) stats: PipelineStats,
    /// Renderer lock as the update thread sees it. Only the producer writes
    /// it; a forced lock on the render thread stays in the drained frame.
    pub(crate) locked: AtomicBool,
    pub(crate) shutdown: AtomicBool,
}

/// Builds connected producer and consumer halves.
#[derive(Debug)]
pub struct RenderPipeline;

impl RenderPipeline {
    /// Allocates both frame buffers at the configured capacities.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] for a zero capacity.
    pub fn create<B: GraphicsBackend>(
        config: RendererConfig,
        containers: Arc<Containers>,
        backend: B,
    ) -> RenderResult<(Renderer, RenderExecutor<B>)> {
        let config = config.validated()?;
        tracing::info!(
            "Creating render pipeline with {} execution policy",
            config.execution_policy.name()
        );

        let shared = Arc::new(PipelineShared {
            buffers: DoubleBuffer::new(RenderState::new(&config), RenderState::new(&config)),
            stats: PipelineStats::default(),
            locked: AtomicBool::new(true),
            shutdown: AtomicBool::new(false),
        });
        let (batch_tx, batch_rx) = crossbeam_channel::unbounded();

        let renderer = Renderer::new(Arc::clone(&shared), batch_rx);
        let executor = RenderExecutor::new(
            shared,
            containers,
            backend,
            config.window.monitor_rect(),
            batch_tx,
        );
        Ok((renderer, executor))
    }

    /// Builds a [`LocalRenderer`]. Fails unless the policy is
    /// [`RendererPolicy::SingleThreaded`].
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`].
    pub fn create_local<B: GraphicsBackend>(
        config: RendererConfig,
        containers: Arc<Containers>,
        backend: B,
    ) -> RenderResult<LocalRenderer<B>> {
        if config.execution_policy != RendererPolicy::SingleThreaded {
            return Err(RenderError::InvalidConfig(format!(
                "a local renderer needs the SINGLE_THREADED policy, got {}",
                config.execution_policy.name()
            )));
        }
        let (renderer, executor) = Self::create(config, containers, backend)?;
        Ok(LocalRenderer { renderer, executor })
    }
}

/// Moves `executor` to a render thread that runs until
/// `EXIT_RENDERING_LOOP`, then frees the containers' native resources and
/// hands the backend back through the join handle.
///
/// # Errors
///
/// [`RenderError::ThreadSpawn`].
pub fn spawn_render_thread<B>(mut executor: RenderExecutor<B>) -> RenderResult<JoinHandle<B>>
where
    B: GraphicsBackend + Send + 'static,
{
    thread::Builder::new()
        .name("ember-render".to_owned())
        .spawn(move || {
            executor.log_renderer_info();
            executor.run();
            executor.deinit()
        })
        .map_err(|e| RenderError::ThreadSpawn(e.to_string()))
}

/// Both pipeline halves on the calling thread.
///
/// Derefs to the [`Renderer`]; [`LocalRenderer::finish_frame`] executes the
/// frame right after handing it over.
#[derive(Debug)]
pub struct LocalRenderer<B: GraphicsBackend> {
    renderer: Renderer,
    executor: RenderExecutor<B>,
}

impl<B: GraphicsBackend> LocalRenderer<B> {
    /// Ends the frame and executes it.
    pub fn finish_frame(&mut self, override_lock_check: bool) {
        self.renderer.finish_frame(override_lock_check);
        self.executor.execute_pending();
    }

    /// Executes the final frame and frees every native resource.
    pub fn shutdown(mut self) -> B {
        self.renderer.shutdown_renderer();
        self.executor.execute_pending();
        self.executor.deinit()
    }

    /// The producer half, for container requests.
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// The consumer half.
    pub fn executor(&self) -> &RenderExecutor<B> {
        &self.executor
    }

    /// The consumer half, mutably. Used for asset loading before the
    /// first frame.
    pub fn executor_mut(&mut self) -> &mut RenderExecutor<B> {
        &mut self.executor
    }
}

impl<B: GraphicsBackend> Deref for LocalRenderer<B> {
    type Target = Renderer;

    fn deref(&self) -> &Renderer {
        &self.renderer
    }
}
