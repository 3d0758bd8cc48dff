//! Render-thread side of the pipeline.
//!
//! Owns the graphics backend. Drains each swapped frame, decoding and
//! dispatching every opcode in queue order.

use std::sync::Arc;

use crossbeam_channel::Sender;
use ember_shared::{Color, Point, Rectangle};

use super::PipelineShared;
use crate::backend::{GraphicsBackend, TextureId};
use crate::command::{RenderCommand, RendererCmd, TextPayload};
use crate::containers::{Containers, PopulateReport};
use crate::defines::BlendMode;
use crate::draw::{draw_widget, opacity_to_alpha};
use crate::draw_params::{DrawParams, Widget};
use crate::error::RenderResult;
use crate::manifest::ManifestReader;
use crate::state::RenderState;

/// What a drained frame asked the loop to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Keep waiting for frames.
    Continue,
    /// `EXIT_RENDERING_LOOP` was dispatched.
    Exit,
}

/// Consumer handle of a render pipeline.
pub struct RenderExecutor<B: GraphicsBackend> {
    shared: Arc<PipelineShared>,
    containers: Arc<Containers>,
    backend: B,
    monitor: Rectangle,
    multithread_loading: bool,
    loaded_batches: Sender<i32>,
}

impl<B: GraphicsBackend> std::fmt::Debug for RenderExecutor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderExecutor")
            .field("monitor", &self.monitor)
            .field("multithread_loading", &self.multithread_loading)
            .finish_non_exhaustive()
    }
}

impl<B: GraphicsBackend> RenderExecutor<B> {
    pub(crate) fn new(
        shared: Arc<PipelineShared>,
        containers: Arc<Containers>,
        backend: B,
        monitor: Rectangle,
        loaded_batches: Sender<i32>,
    ) -> Self {
        Self {
            shared,
            containers,
            backend,
            monitor,
            multithread_loading: false,
            loaded_batches,
        }
    }

    /// Populates the containers from `manifest` and adopts the loading
    /// strategy the resources settled on. Call before the loop starts.
    ///
    /// # Errors
    ///
    /// See [`Containers::populate`].
    pub fn load_stored_assets(
        &mut self,
        manifest: &mut dyn ManifestReader,
    ) -> RenderResult<PopulateReport> {
        let report = self.containers.populate(manifest, &mut self.backend)?;
        self.multithread_loading = self.containers.resources().is_multithreaded();
        Ok(report)
    }

    /// Logs what the backend reports about itself.
    pub fn log_renderer_info(&self) {
        let info = self.backend.renderer_info();
        tracing::info!(
            "Renderer: {} flags: {:#06b} max texture: {}x{}",
            info.name,
            info.flags.bits(),
            info.max_texture_width,
            info.max_texture_height
        );
    }

    /// Blocks on frames until `EXIT_RENDERING_LOOP`. For a dedicated
    /// render thread.
    pub fn run(&mut self) {
        let shared = Arc::clone(&self.shared);
        loop {
            let outcome = shared.buffers.wait_and_drain(|state| self.execute_frame(state));
            if outcome == FrameOutcome::Exit {
                tracing::info!("Exiting rendering loop");
                return;
            }
        }
    }

    /// Executes the swapped frame if there is one. Used when commands run
    /// on the update thread.
    pub fn execute_pending(&mut self) -> Option<FrameOutcome> {
        let shared = Arc::clone(&self.shared);
        shared.buffers.try_drain(|state| self.execute_frame(state))
    }

    /// Dispatches every opcode of `state`, then resets it.
    pub fn execute_frame(&mut self, state: &mut RenderState) -> FrameOutcome {
        let mut outcome = FrameOutcome::Continue;
        let locked = state.is_locked();
        let offset = state.global_offset();
        let (commands, widgets, data) = state.parts_mut();
        let mut frame = FrameContext {
            widgets,
            locked,
            offset,
        };

        for (index, &opcode) in commands.iter().enumerate() {
            let command = match RenderCommand::decode(opcode, data) {
                Ok(command) => command,
                Err(e) => {
                    tracing::error!("Skipping renderer command at index {index}: {e}");
                    self.shared.stats.decode_error();
                    continue;
                }
            };
            self.shared.stats.command_executed();
            if command.opcode() == RendererCmd::ExitRenderingLoop {
                outcome = FrameOutcome::Exit;
                break;
            }
            self.dispatch(command, &mut frame);
        }

        let locked = frame.locked;
        state.set_locked(locked);
        state.reset();
        outcome
    }

    fn dispatch(&mut self, command: RenderCommand<'static>, frame: &mut FrameContext<'_>) {
        tracing::trace!("Executing {:?}", command.opcode());
        match command {
            RenderCommand::ClearScreen => {
                if let Err(e) = self.backend.clear() {
                    tracing::error!("Error in clear(): {e}");
                }
            }
            RenderCommand::FinishFrame {
                override_lock_check,
            } => self.finish_frame(frame, override_lock_check),
            RenderCommand::ChangeClearColor(color) => {
                if let Err(e) = self.backend.set_draw_color(color) {
                    tracing::error!("Error in set_draw_color(): {e}");
                }
            }
            RenderCommand::LoadTextureSingle(id) => {
                self.load_texture(id);
            }
            RenderCommand::LoadTextureMultiple { batch_id, ids } => {
                self.load_texture_batch(batch_id, &ids);
            }
            RenderCommand::DestroyTexture(id) => {
                if let Err(e) = self
                    .containers
                    .resources()
                    .destroy_texture(&mut self.backend, id)
                {
                    tracing::error!("Error in destroy_texture(): {e}");
                }
            }
            RenderCommand::CreateFbo { width, height, id } => self.create_fbo(width, height, id),
            RenderCommand::DestroyFbo(id) => {
                if let Some(texture) = self.containers.fbos().detach(id) {
                    self.backend.destroy_texture(texture);
                } else {
                    tracing::error!("Error, DESTROY_FBO for empty sprite buffer slot {id}");
                }
            }
            RenderCommand::ChangeRendererTarget(id) => self.change_target(id),
            RenderCommand::ResetRendererTarget => self.reset_target(),
            RenderCommand::ClearRendererTarget(color) => self.clear_target(color),
            RenderCommand::UpdateRendererTarget(records) => {
                for params in records.iter() {
                    self.draw_record(params);
                }
            }
            RenderCommand::ChangeTextureBlendmode { widget, mode } => {
                self.change_blend_mode(widget, mode);
            }
            RenderCommand::ChangeTextureOpacity { widget, opacity } => {
                self.change_opacity(widget, opacity);
            }
            RenderCommand::CreateTtfText(payload) => self.create_text(&payload, false),
            RenderCommand::ReloadTtfText(payload) => self.create_text(&payload, true),
            RenderCommand::DestroyTtfText(id) => {
                if let Some(texture) = self.containers.texts().detach(id) {
                    self.backend.destroy_texture(texture);
                } else {
                    tracing::error!("Error, DESTROY_TTF_TEXT for empty text slot {id}");
                }
            }
            RenderCommand::EnableDisableMultithreadTextureLoading(enabled) => {
                tracing::debug!("Multithread texture loading: {enabled}");
                self.multithread_loading = enabled;
            }
            RenderCommand::TakeScreenshot {
                path,
                container,
                quality,
            } => {
                if let Err(e) = self.backend.take_screenshot(&path, container, quality) {
                    tracing::error!("Error in take_screenshot() for {path}: {e}");
                }
            }
            RenderCommand::ExitRenderingLoop => {}
        }
    }

    // ========================================================================
    // FRAME
    // ========================================================================

    fn finish_frame(&mut self, frame: &mut FrameContext<'_>, override_lock_check: bool) {
        if !override_lock_check && !frame.locked {
            tracing::error!(
                "WARNING, finish_frame() called while the renderer is left unlocked! \
                 Forcing lock and resetting the renderer target"
            );
            frame.locked = true;
            self.reset_target();
        }

        if frame.widgets.is_empty() {
            tracing::error!(
                "Critical Error, queued widgets for drawing is 0! \
                 Update and render threads are out of sync"
            );
            return;
        }

        for params in frame.widgets.iter_mut() {
            params.apply_global_offset(frame.offset);
        }
        for params in frame.widgets.iter() {
            self.draw_record(params);
        }
        self.backend.present();
        self.shared.stats.frame_presented(frame.widgets.len());
    }

    fn texture_of(&self, widget: Widget) -> Option<TextureId> {
        match widget {
            Widget::Image(id) => self.containers.resources().get(id),
            Widget::Text(id) => self.containers.texts().get(id),
            Widget::SpriteBuffer(id) => self.containers.fbos().get(id),
        }
    }

    fn draw_record(&mut self, params: &DrawParams) {
        let Some(widget) = params.widget() else {
            tracing::error!("Skipping draw record of unknown widget kind");
            return;
        };
        let Some(texture) = self.texture_of(widget) else {
            tracing::error!("Skipping draw of {widget:?}: no texture attached");
            return;
        };
        match draw_widget(&mut self.backend, texture, params, self.monitor) {
            Ok(()) => self.shared.stats.draw_call(),
            Err(e) => tracing::error!("Error drawing {widget:?}: {e}"),
        }
    }

    // ========================================================================
    // TEXTURES
    // ========================================================================

    fn load_texture(&mut self, id: u64) -> bool {
        let result = self.containers.resources().upload_on_demand(
            &mut self.backend,
            id,
            self.multithread_loading,
        );
        if let Err(e) = result {
            tracing::error!("Error, could not load texture for rsrcId: {id:#018X}: {e}");
            return false;
        }
        true
    }

    fn load_texture_batch(&mut self, batch_id: i32, ids: &[u64]) {
        for &id in ids {
            if !self.load_texture(id) {
                tracing::error!("Batch {batch_id} aborted, completion will not be reported");
                return;
            }
        }
        if self.loaded_batches.send(batch_id).is_err() {
            tracing::warn!("Batch {batch_id} loaded but the producer handle is gone");
        }
    }

    fn change_blend_mode(&mut self, widget: Widget, mode: BlendMode) {
        let Some(texture) = self.texture_of(widget) else {
            tracing::error!("Error, CHANGE_TEXTURE_BLENDMODE for {widget:?} without texture");
            return;
        };
        if let Err(e) = self.backend.set_texture_blend_mode(texture, mode) {
            tracing::error!("Error in set_texture_blend_mode() for blend mode {mode:?}: {e}");
        }
    }

    fn change_opacity(&mut self, widget: Widget, opacity: i32) {
        if matches!(widget, Widget::Image(_)) {
            tracing::error!(
                "Error, CHANGE_TEXTURE_OPACITY on an image. Alpha changes are only \
                 made for texts and sprite buffers"
            );
            return;
        }
        let Some(texture) = self.texture_of(widget) else {
            tracing::error!("Error, CHANGE_TEXTURE_OPACITY for {widget:?} without texture");
            return;
        };
        let alpha = opacity_to_alpha(opacity);
        if let Err(e) = self.backend.set_texture_alpha(texture, alpha) {
            tracing::error!("Error in set_texture_alpha(): {e}");
        }
    }

    fn create_text(&mut self, payload: &TextPayload<'_>, reload: bool) {
        let Some((texture, width, height)) = self.rasterize(payload) else {
            // a failed reload keeps the previous texture
            if !reload && self.containers.texts().release_reservation(payload.id) {
                tracing::error!("Released text slot {} after a failed create", payload.id);
            }
            return;
        };

        let texts = self.containers.texts();
        if reload {
            if texts.get(payload.id).is_none() {
                tracing::error!("Error, RELOAD_TTF_TEXT for empty text slot {}", payload.id);
                self.backend.destroy_texture(texture);
            } else if let Some(previous) = texts.replace(payload.id, texture, width, height) {
                self.backend.destroy_texture(previous);
            }
        } else if !texts.attach(payload.id, texture, width, height) {
            tracing::error!("Error, text slot {} was not reserved", payload.id);
            self.backend.destroy_texture(texture);
        }
    }

    fn rasterize(&mut self, payload: &TextPayload<'_>) -> Option<(TextureId, i32, i32)> {
        let Some(font) = self.containers.fonts().get(payload.font_id) else {
            tracing::error!("Error, fontId: {:#018X} not found", payload.font_id);
            return None;
        };
        self.backend
            .create_text_texture(font, &payload.text, payload.color)
            .map_err(|e| {
                tracing::error!(
                    "Error in create_text_texture() for fontId: {:#018X}: {e}",
                    payload.font_id
                );
            })
            .ok()
    }

    // ========================================================================
    // OFF-SCREEN TARGETS
    // ========================================================================

    fn create_fbo(&mut self, width: i32, height: i32, id: i32) {
        let texture = match self.backend.create_target_texture(width, height) {
            Ok(texture) => texture,
            Err(e) => {
                tracing::error!("Error in create_target_texture() {width}x{height}: {e}");
                self.containers.fbos().release_reservation(id);
                return;
            }
        };
        if !self.containers.fbos().attach(id, texture, width, height) {
            tracing::error!("Error, sprite buffer slot {id} was not reserved");
            self.backend.destroy_texture(texture);
        }
    }

    fn change_target(&mut self, id: i32) {
        let Some(texture) = self.containers.fbos().get(id) else {
            tracing::error!("Error, CHANGE_RENDERER_TARGET for empty sprite buffer slot {id}");
            return;
        };
        if let Err(e) = self.backend.set_render_target(Some(texture)) {
            tracing::error!("Error, set_render_target() failed: {e}");
        }
    }

    fn reset_target(&mut self) {
        if let Err(e) = self.backend.set_render_target(None) {
            tracing::error!("Error, default renderer target could not be set: {e}");
        }
    }

    fn clear_target(&mut self, color: Color) {
        let previous = self.backend.draw_color();
        let result = self
            .backend
            .set_draw_color(color)
            .and_then(|()| self.backend.clear())
            .and_then(|()| self.backend.set_draw_color(previous));
        if let Err(e) = result {
            tracing::error!("Error clearing the current renderer target: {e}");
        }
    }

    // ========================================================================
    // ACCESS
    // ========================================================================

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Shared containers.
    pub fn containers(&self) -> &Arc<Containers> {
        &self.containers
    }

    /// Whether `LOAD_TEXTURE_*` collects surfaces from the loader workers.
    #[must_use]
    pub const fn is_multithread_loading(&self) -> bool {
        self.multithread_loading
    }

    /// Frees every native resource the containers hold and returns the
    /// backend.
    pub fn deinit(mut self) -> B {
        self.containers.deinit(&mut self.backend);
        self.backend
    }
}

struct FrameContext<'a> {
    widgets: &'a mut [DrawParams],
    locked: bool,
    offset: Point,
}
