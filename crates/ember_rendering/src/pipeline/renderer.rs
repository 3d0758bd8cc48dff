//! Update-thread side of the pipeline.
//!
//! Records draws and commands into the producer buffer and hands the frame
//! over at [`Renderer::finish_frame`]. Nothing here touches the backend.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use ember_shared::{Color, Point};

use super::stats::RenderStats;
use super::PipelineShared;
use crate::command::{CommandSink, RenderCommand};
use crate::defines::{BlendMode, ScreenshotContainer};
use crate::draw_params::{DrawParams, Widget};
use crate::error::{RenderError, RenderResult};
use crate::state::AppendError;

/// Producer handle of a render pipeline.
#[derive(Debug)]
pub struct Renderer {
    shared: Arc<PipelineShared>,
    loaded_batches: Receiver<i32>,
}

impl Renderer {
    pub(crate) fn new(shared: Arc<PipelineShared>, loaded_batches: Receiver<i32>) -> Self {
        Self {
            shared,
            loaded_batches,
        }
    }

    // ========================================================================
    // RECORDING
    // ========================================================================

    /// Queues a draw record for this frame. Dropped with an error log when
    /// the frame is full.
    pub fn add_draw(&self, params: &DrawParams) -> bool {
        let result = self.shared.buffers.with_producer(|state| {
            state
                .add_draw(params)
                .map_err(|_| state.widget_capacity())
        });

        match result {
            Ok(()) => true,
            Err(capacity) => {
                tracing::error!(
                    "Critical Problem: maxRunTimeWidgets value: {capacity} is reached! \
                     Increase it's value from the configuration or reduce the number of \
                     active widgets. Widget will not be drawn"
                );
                self.shared.stats.draw_dropped();
                false
            }
        }
    }

    /// Queues a command with its payload. Dropped with an error log when the
    /// frame has no room for it.
    pub fn add_command(&self, command: &RenderCommand<'_>) -> bool {
        let result = self.shared.buffers.with_producer(|state| {
            state
                .add_command(command)
                .map_err(|e| (e, state.command_capacity()))
        });

        let Err((error, capacity)) = result else {
            return true;
        };
        match error {
            AppendError::DataFull { needed, remaining } => tracing::error!(
                "Circular buffer overflow for {needed} bytes ({remaining} bytes free). \
                 Renderer command: {:?} will not be executed",
                command.opcode()
            ),
            AppendError::CommandsFull | AppendError::WidgetsFull => tracing::error!(
                "Critical Problem: maxRunTimeRendererCommands value: {capacity} is reached! \
                 Increase it's value from the configuration or reduce the number of renderer \
                 calls. Renderer command: {:?} will not be executed",
                command.opcode()
            ),
        }
        self.shared.stats.command_dropped(command.payload_len());
        false
    }

    // ========================================================================
    // FRAME CONTROL
    // ========================================================================

    /// Clears the default target.
    pub fn clear_screen(&self) {
        self.add_command(&RenderCommand::ClearScreen);
    }

    /// Ends the frame and hands it to the render thread. Blocks while the
    /// previous frame is still executing.
    ///
    /// `override_lock_check` skips the unlocked-renderer check, for frames
    /// that end while an off-screen buffer is intentionally targeted.
    pub fn finish_frame(&self, override_lock_check: bool) {
        if self.is_shutdown() {
            tracing::error!("finish_frame() called after the renderer was shut down");
            return;
        }
        let locked = self.shared.locked.load(Ordering::Acquire);
        self.shared
            .buffers
            .with_producer(|state| state.set_locked(locked));
        self.add_command(&RenderCommand::FinishFrame {
            override_lock_check,
        });
        self.swap_back_buffers();
    }

    /// Asks the render loop to exit and hands over the final frame. Later
    /// frames are ignored.
    pub fn shutdown_renderer(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            tracing::error!("shutdown_renderer() called twice");
            return;
        }
        self.add_command(&RenderCommand::ExitRenderingLoop);
        self.shared
            .buffers
            .swap_back_buffers(|fresh, next| next.carry_from(fresh));
    }

    /// True once [`Renderer::shutdown_renderer`] ran.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    fn swap_back_buffers(&self) {
        self.shared
            .buffers
            .swap_back_buffers(|fresh, next| next.carry_from(fresh));
    }

    // ========================================================================
    // RENDERER LOCK
    // ========================================================================

    /// Gives the update thread control of the render target, for drawing
    /// into off-screen buffers.
    ///
    /// # Errors
    ///
    /// [`RenderError::AlreadyUnlocked`].
    pub fn unlock_renderer(&self) -> RenderResult<()> {
        if !self.shared.locked.swap(false, Ordering::AcqRel) {
            tracing::error!("Error, trying to unlock the main renderer, when it's already unlocked");
            return Err(RenderError::AlreadyUnlocked);
        }
        Ok(())
    }

    /// Takes the render target back and resets it to the default target.
    ///
    /// # Errors
    ///
    /// [`RenderError::AlreadyLocked`].
    pub fn lock_renderer(&self) -> RenderResult<()> {
        if self.shared.locked.swap(true, Ordering::AcqRel) {
            tracing::error!("Error, trying to lock the main renderer, when it's already locked");
            return Err(RenderError::AlreadyLocked);
        }
        self.add_command(&RenderCommand::ResetRendererTarget);
        Ok(())
    }

    /// True while the update thread does not own the render target.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.shared.locked.load(Ordering::Acquire)
    }

    // ========================================================================
    // RENDERER STATE
    // ========================================================================

    /// Color used by subsequent clears.
    pub fn set_renderer_clear_color(&self, color: Color) {
        self.add_command(&RenderCommand::ChangeClearColor(color));
    }

    /// Saves the next presented frame to `path`.
    pub fn take_screenshot(&self, path: &str, container: ScreenshotContainer, quality: i32) {
        self.add_command(&RenderCommand::TakeScreenshot {
            path: path.into(),
            container,
            quality,
        });
    }

    /// Draw records in the last presented frame.
    #[must_use]
    pub fn get_total_widget_count(&self) -> u64 {
        self.shared.stats.last_total_widgets()
    }

    /// Counters of both pipeline sides.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        self.shared.stats.snapshot()
    }

    /// Changes a texture's blend mode.
    pub fn change_texture_blend_mode(&self, widget: Widget, mode: BlendMode) {
        self.add_command(&RenderCommand::ChangeTextureBlendmode { widget, mode });
    }

    /// Changes the alpha of a text or off-screen buffer texture. Images take
    /// their opacity from each draw record instead.
    pub fn change_texture_opacity(&self, widget: Widget, opacity: i32) {
        self.add_command(&RenderCommand::ChangeTextureOpacity { widget, opacity });
    }

    // ========================================================================
    // GLOBAL MOVEMENT
    // ========================================================================

    /// Offset added to every record of every following frame.
    pub fn set_absolute_global_movement(&self, x: i32, y: i32) {
        self.shared
            .buffers
            .with_producer(|state| state.set_global_offset(Point::new(x, y)));
    }

    /// Removes the global offset.
    pub fn reset_absolute_global_movement(&self) {
        self.set_absolute_global_movement(0, 0);
    }

    /// Shifts the global offset horizontally.
    pub fn move_global_x(&self, dx: i32) {
        self.shared.buffers.with_producer(|state| {
            let offset = state.global_offset();
            state.set_global_offset(Point::new(offset.x + dx, offset.y));
        });
    }

    /// Shifts the global offset vertically.
    pub fn move_global_y(&self, dy: i32) {
        self.shared.buffers.with_producer(|state| {
            let offset = state.global_offset();
            state.set_global_offset(Point::new(offset.x, offset.y + dy));
        });
    }

    /// Current global offset.
    #[must_use]
    pub fn global_movement(&self) -> Point {
        self.shared.buffers.with_producer(|state| state.global_offset())
    }

    // ========================================================================
    // OFF-SCREEN TARGETS
    // ========================================================================

    /// Draws into off-screen buffer `id` until reset. The renderer must be
    /// unlocked.
    pub fn change_renderer_target(&self, id: i32) {
        self.add_command(&RenderCommand::ChangeRendererTarget(id));
    }

    /// Draws into the default target again.
    pub fn reset_renderer_target(&self) {
        self.add_command(&RenderCommand::ResetRendererTarget);
    }

    /// Clears the current target with `color`, leaving the clear color as
    /// it was.
    pub fn clear_renderer_target(&self, color: Color) {
        self.add_command(&RenderCommand::ClearRendererTarget(color));
    }

    /// Draws `records` into the current target right away, outside the
    /// frame's draw pass.
    pub fn update_renderer_target(&self, records: &[DrawParams]) {
        self.add_command(&RenderCommand::UpdateRendererTarget(records.into()));
    }

    // ========================================================================
    // FEEDBACK
    // ========================================================================

    /// Batch ids of every `LOAD_TEXTURE_MULTIPLE` completed since the last
    /// call.
    pub fn poll_loaded_batches(&self) -> Vec<i32> {
        self.loaded_batches.try_iter().collect()
    }
}

impl CommandSink for Renderer {
    fn submit(&mut self, command: &RenderCommand<'_>) -> bool {
        self.add_command(command)
    }
}
