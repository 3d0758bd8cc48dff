//! Off-screen render targets (sprite buffers).

use super::slots::SessionSlots;
use crate::backend::TextureId;
use crate::command::{CommandSink, RenderCommand, RendererCmd};
use crate::error::{RenderError, RenderResult};

/// Fixed-capacity off-screen buffer slots.
#[derive(Debug)]
pub struct FboContainer {
    slots: SessionSlots,
}

impl FboContainer {
    /// Creates `capacity` free slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: SessionSlots::new(capacity, "sprite buffers", "maxRunTimeSpriteBuffers"),
        }
    }

    /// Reserves a slot and requests a `width` x `height` target in it.
    ///
    /// # Errors
    ///
    /// [`RenderError::CapacityExhausted`] or [`RenderError::CommandDropped`].
    pub fn create(&self, sink: &mut dyn CommandSink, width: i32, height: i32) -> RenderResult<i32> {
        let id = self.slots.reserve()?;
        if !sink.submit(&RenderCommand::CreateFbo { width, height, id }) {
            self.slots.release(id);
            return Err(RenderError::CommandDropped(RendererCmd::CreateFbo));
        }
        Ok(id)
    }

    /// Requests destruction. `-1` is a logged no-op.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidHandle`] or [`RenderError::CommandDropped`].
    pub fn destroy(&self, sink: &mut dyn CommandSink, id: i32) -> RenderResult<()> {
        self.slots.validate_for_destroy(id)?;
        if !sink.submit(&RenderCommand::DestroyFbo(id)) {
            return Err(RenderError::CommandDropped(RendererCmd::DestroyFbo));
        }
        Ok(())
    }

    /// Stores a created target into its reserved slot.
    pub fn attach(&self, id: i32, texture: TextureId, width: i32, height: i32) -> bool {
        self.slots.attach(id, texture, width, height)
    }

    /// Target texture of a ready buffer.
    #[must_use]
    pub fn get(&self, id: i32) -> Option<TextureId> {
        self.slots.get(id)
    }

    /// Frees a slot, returning its texture for destruction.
    pub fn detach(&self, id: i32) -> Option<TextureId> {
        self.slots.detach(id)
    }

    /// Gives back a reservation whose sprite buffer texture could not be created.
    /// False if the slot was not reserved.
    pub fn release_reservation(&self, id: i32) -> bool {
        self.slots.release_reserved(id)
    }

    /// Slot count.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Reserved or ready slots.
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.slots.occupied_count()
    }

    /// GPU bytes held by off-screen buffers.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        self.slots.memory_usage()
    }

    /// Frees every slot, returning the textures for destruction.
    pub fn drain(&self) -> Vec<TextureId> {
        self.slots.drain()
    }
}
