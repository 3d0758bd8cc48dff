//! # Render State Buffer
//!
//! One frame worth of work: draw records, opcodes and the payload ring.
//! Allocated once at pipeline creation and reset after every consumption.
//! Two of these live in the pipeline's double buffer.

use bytemuck::Zeroable;
use ember_core::RingBuffer;
use ember_shared::Point;

use crate::command::{RenderCommand, RendererCmd};
use crate::config::RendererConfig;
use crate::draw_params::DrawParams;

/// Why a producer-side append was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendError {
    /// No draw record slot left this frame.
    WidgetsFull,
    /// No opcode slot left this frame.
    CommandsFull,
    /// The payload does not fit in the ring.
    DataFull {
        /// Bytes requested.
        needed: usize,
        /// Bytes free.
        remaining: usize,
    },
}

/// A single frame's state.
#[derive(Debug)]
pub struct RenderState {
    widgets: Box<[DrawParams]>,
    widget_count: usize,
    commands: Box<[RendererCmd]>,
    command_count: usize,
    data: RingBuffer,
    is_locked: bool,
    global_offset: Point,
}

impl RenderState {
    /// Allocates every array at the configured capacity.
    #[must_use]
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            widgets: vec![DrawParams::zeroed(); config.max_runtime_widgets].into_boxed_slice(),
            widget_count: 0,
            commands: vec![RendererCmd::ClearScreen; config.max_runtime_renderer_commands]
                .into_boxed_slice(),
            command_count: 0,
            data: RingBuffer::new(config.max_renderer_back_buffer_data_size),
            is_locked: true,
            global_offset: Point::ZERO,
        }
    }

    /// Appends a draw record.
    ///
    /// # Errors
    ///
    /// [`AppendError::WidgetsFull`] when the frame is full. Records already
    /// appended are untouched.
    pub fn add_draw(&mut self, params: &DrawParams) -> Result<(), AppendError> {
        let slot = self
            .widgets
            .get_mut(self.widget_count)
            .ok_or(AppendError::WidgetsFull)?;
        *slot = *params;
        self.widget_count += 1;
        Ok(())
    }

    /// Appends an opcode and its whole payload, or nothing.
    ///
    /// # Errors
    ///
    /// [`AppendError::CommandsFull`] or [`AppendError::DataFull`].
    pub fn add_command(&mut self, command: &RenderCommand<'_>) -> Result<(), AppendError> {
        if self.command_count >= self.commands.len() {
            return Err(AppendError::CommandsFull);
        }
        self.add_data(command)?;
        self.commands[self.command_count] = command.opcode();
        self.command_count += 1;
        Ok(())
    }

    /// Encodes the payload of `command` into the ring, all or nothing.
    /// Private so that no payload is written without its opcode.
    fn add_data(&mut self, command: &RenderCommand<'_>) -> Result<(), AppendError> {
        let needed = command.payload_len();
        let remaining = self.data.remaining();
        if needed > remaining {
            return Err(AppendError::DataFull { needed, remaining });
        }
        command.encode_payload(&mut self.data);
        Ok(())
    }

    /// Zeroes the counters and drops unread payload. Memory is kept.
    pub fn reset(&mut self) {
        self.widget_count = 0;
        self.command_count = 0;
        self.data.clear();
    }

    /// Copies the state that outlives a frame from the previous producer
    /// buffer.
    pub fn carry_from(&mut self, previous: &Self) {
        self.is_locked = previous.is_locked;
        self.global_offset = previous.global_offset;
    }

    /// Draw records appended this frame.
    #[must_use]
    pub const fn widget_count(&self) -> usize {
        self.widget_count
    }

    /// Draw record capacity.
    #[must_use]
    pub fn widget_capacity(&self) -> usize {
        self.widgets.len()
    }

    /// Opcodes appended this frame.
    #[must_use]
    pub const fn command_count(&self) -> usize {
        self.command_count
    }

    /// Opcode capacity.
    #[must_use]
    pub fn command_capacity(&self) -> usize {
        self.commands.len()
    }

    /// Unread payload bytes.
    #[must_use]
    pub const fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Valid draw records.
    #[must_use]
    pub fn widgets(&self) -> &[DrawParams] {
        &self.widgets[..self.widget_count]
    }

    /// Valid draw records, mutable for the global offset pass.
    pub fn widgets_mut(&mut self) -> &mut [DrawParams] {
        &mut self.widgets[..self.widget_count]
    }

    /// Valid opcodes.
    #[must_use]
    pub fn commands(&self) -> &[RendererCmd] {
        &self.commands[..self.command_count]
    }

    /// Split borrow used by the executor: opcodes, records and payload.
    pub fn parts_mut(&mut self) -> (&[RendererCmd], &mut [DrawParams], &mut RingBuffer) {
        (
            &self.commands[..self.command_count],
            &mut self.widgets[..self.widget_count],
            &mut self.data,
        )
    }

    /// Whether off-screen drawing is closed.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.is_locked
    }

    /// Opens or closes off-screen drawing.
    pub fn set_locked(&mut self, locked: bool) {
        self.is_locked = locked;
    }

    /// Offset applied to every record at finish frame.
    #[must_use]
    pub const fn global_offset(&self) -> Point {
        self.global_offset
    }

    /// Replaces the global offset.
    pub fn set_global_offset(&mut self, offset: Point) {
        self.global_offset = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw_params::Widget;
    use ember_shared::Rectangle;

    fn config(widgets: usize, commands: usize, data: usize) -> RendererConfig {
        RendererConfig {
            max_runtime_widgets: widgets,
            max_runtime_renderer_commands: commands,
            max_renderer_back_buffer_data_size: data,
            ..RendererConfig::headless()
        }
    }

    fn record(x: i32) -> DrawParams {
        DrawParams::new(Widget::Image(1), Point::new(x, 0), Rectangle::new(0, 0, 4, 4))
    }

    #[test]
    fn test_widget_overflow_keeps_existing_records() {
        let mut state = RenderState::new(&config(2, 4, 64));
        assert!(state.add_draw(&record(1)).is_ok());
        assert!(state.add_draw(&record(2)).is_ok());
        assert_eq!(state.add_draw(&record(3)), Err(AppendError::WidgetsFull));

        assert_eq!(state.widget_count(), 2);
        assert_eq!(state.widgets()[1].pos.x, 2);
    }

    #[test]
    fn test_command_never_half_written() {
        let mut state = RenderState::new(&config(2, 4, 6));
        assert!(state.add_command(&RenderCommand::DestroyFbo(1)).is_ok());

        let result = state.add_command(&RenderCommand::DestroyTexture(9));
        assert_eq!(
            result,
            Err(AppendError::DataFull {
                needed: 8,
                remaining: 2
            })
        );
        assert_eq!(state.command_count(), 1);
        assert_eq!(state.data_len(), 4);
    }

    #[test]
    fn test_command_capacity() {
        let mut state = RenderState::new(&config(2, 1, 64));
        assert!(state.add_command(&RenderCommand::ClearScreen).is_ok());
        assert_eq!(
            state.add_command(&RenderCommand::ClearScreen),
            Err(AppendError::CommandsFull)
        );
    }

    #[test]
    fn test_reset_and_carry() {
        let mut state = RenderState::new(&config(2, 2, 64));
        state.add_draw(&record(1)).unwrap();
        state.add_command(&RenderCommand::ChangeRendererTarget(0)).unwrap();
        state.set_locked(false);
        state.set_global_offset(Point::new(3, 4));
        state.reset();

        assert_eq!(state.widget_count(), 0);
        assert_eq!(state.command_count(), 0);
        assert_eq!(state.data_len(), 0);

        let mut next = RenderState::new(&config(2, 2, 64));
        next.carry_from(&state);
        assert!(!next.is_locked());
        assert_eq!(next.global_offset(), Point::new(3, 4));
    }
}
