//! Runtime text textures.
//!
//! The update thread measures the text, reserves a slot and asks the render
//! thread to rasterize into it. The render thread attaches, replaces and
//! detaches the real textures.

use ember_shared::Color;

use super::font::FontContainer;
use super::slots::SessionSlots;
use crate::backend::TextureId;
use crate::command::{CommandSink, RenderCommand, RendererCmd, TextPayload};
use crate::error::{RenderError, RenderResult};

/// A text whose creation was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedText {
    /// Slot id, used for reload, draw and unload.
    pub id: i32,
    /// Measured width.
    pub width: i32,
    /// Measured height.
    pub height: i32,
}

/// Fixed-capacity text slots.
#[derive(Debug)]
pub struct TextContainer {
    slots: SessionSlots,
}

impl TextContainer {
    /// Creates `capacity` free slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: SessionSlots::new(capacity, "texts", "maxRunTimeTexts"),
        }
    }

    /// Measures `text` and requests its creation in a fresh slot.
    ///
    /// # Errors
    ///
    /// [`RenderError::FontNotFound`], [`RenderError::CapacityExhausted`] or
    /// [`RenderError::CommandDropped`]. No slot is held on error.
    pub fn load_text(
        &self,
        fonts: &FontContainer,
        sink: &mut dyn CommandSink,
        font_id: u64,
        text: &str,
        color: Color,
    ) -> RenderResult<LoadedText> {
        let (width, height) = fonts.measure(font_id, text)?;
        let id = self.slots.reserve()?;

        let command = RenderCommand::CreateTtfText(TextPayload {
            id,
            font_id,
            color,
            text: text.into(),
        });
        if !sink.submit(&command) {
            self.slots.release(id);
            return Err(RenderError::CommandDropped(RendererCmd::CreateTtfText));
        }

        Ok(LoadedText { id, width, height })
    }

    /// Measures new content for an existing text and requests a re-render.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidHandle`], [`RenderError::FontNotFound`] or
    /// [`RenderError::CommandDropped`].
    pub fn reload_text(
        &self,
        fonts: &FontContainer,
        sink: &mut dyn CommandSink,
        id: i32,
        font_id: u64,
        text: &str,
        color: Color,
    ) -> RenderResult<(i32, i32)> {
        self.slots.validate_for_destroy(id)?;
        let size = fonts.measure(font_id, text)?;

        let command = RenderCommand::ReloadTtfText(TextPayload {
            id,
            font_id,
            color,
            text: text.into(),
        });
        if !sink.submit(&command) {
            return Err(RenderError::CommandDropped(RendererCmd::ReloadTtfText));
        }
        Ok(size)
    }

    /// Requests destruction of a text. `-1` is a logged no-op.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidHandle`] or [`RenderError::CommandDropped`].
    pub fn unload_text(&self, sink: &mut dyn CommandSink, id: i32) -> RenderResult<()> {
        self.slots.validate_for_destroy(id)?;
        if !sink.submit(&RenderCommand::DestroyTtfText(id)) {
            return Err(RenderError::CommandDropped(RendererCmd::DestroyTtfText));
        }
        Ok(())
    }

    /// Stores a rasterized text into its reserved slot.
    pub fn attach(&self, id: i32, texture: TextureId, width: i32, height: i32) -> bool {
        self.slots.attach(id, texture, width, height)
    }

    /// Swaps in a re-rendered texture, returning the old one.
    pub fn replace(&self, id: i32, texture: TextureId, width: i32, height: i32) -> Option<TextureId> {
        self.slots.replace(id, texture, width, height)
    }

    /// Texture of a ready text.
    #[must_use]
    pub fn get(&self, id: i32) -> Option<TextureId> {
        self.slots.get(id)
    }

    /// Frees a slot, returning its texture for destruction.
    pub fn detach(&self, id: i32) -> Option<TextureId> {
        self.slots.detach(id)
    }

    /// Gives back a reservation whose text texture could not be created.
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

    /// GPU bytes held by texts.
    #[must_use]
    pub fn memory_usage(&self) -> u64 {
        self.slots.memory_usage()
    }

    /// Frees every slot, returning the textures for destruction.
    pub fn drain(&self) -> Vec<TextureId> {
        self.slots.drain()
    }
}
