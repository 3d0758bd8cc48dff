//! Session-local texture slots shared by texts and off-screen buffers.

use ember_core::{SlotContainer, SlotState};
use ember_shared::{INVALID_HANDLE, RGBA_BYTE_SIZE};

use crate::backend::TextureId;
use crate::error::{RenderError, RenderResult};

/// Bytes of GPU memory for an RGBA texture.
#[must_use]
pub fn texture_bytes(width: i32, height: i32) -> u64 {
    u64::try_from(width).unwrap_or(0) * u64::try_from(height).unwrap_or(0) * RGBA_BYTE_SIZE
}

/// Slot container addressed by `i32` ids.
#[derive(Debug)]
pub(crate) struct SessionSlots {
    slots: SlotContainer<TextureId>,
    what: &'static str,
    limit: &'static str,
}

impl SessionSlots {
    pub(crate) fn new(capacity: usize, what: &'static str, limit: &'static str) -> Self {
        Self {
            slots: SlotContainer::new(capacity),
            what,
            limit,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Reserves a free slot.
    pub(crate) fn reserve(&self) -> RenderResult<i32> {
        let capacity = self.slots.capacity();
        let Some(index) = self.slots.create_slot() else {
            tracing::error!(
                "Critical Problem: {} value: {capacity} is reached! Increase it's value \
                 from the configuration or reduce the number of active {}. The new one \
                 will not be created",
                self.limit,
                self.what
            );
            return Err(RenderError::CapacityExhausted {
                what: self.what,
                capacity,
            });
        };
        // capacity is bounded by a config usize; ids beyond i32 are unusable
        i32::try_from(index).map_err(|_| {
            self.slots.detach(index);
            RenderError::CapacityExhausted {
                what: self.what,
                capacity,
            }
        })
    }

    /// Gives back a reservation whose creation request was dropped.
    pub(crate) fn release(&self, id: i32) {
        if let Some(index) = self.index(id) {
            self.slots.detach(index);
        }
    }

    /// Frees `id` only while it is still waiting for its texture. Ready and
    /// free slots are left alone.
    pub(crate) fn release_reserved(&self, id: i32) -> bool {
        let Some(index) = self.index(id) else {
            return false;
        };
        if !matches!(self.slots.state(index), Some(SlotState::Reserved)) {
            return false;
        }
        self.slots.detach(index);
        true
    }

    /// Checks an id before a destroy request is issued.
    pub(crate) fn validate_for_destroy(&self, id: i32) -> RenderResult<usize> {
        if id == INVALID_HANDLE {
            tracing::warn!(
                "Trying to destroy {} with non-existent id: {id}",
                self.what
            );
            return Err(RenderError::InvalidHandle(id));
        }
        self.index(id).ok_or_else(|| {
            tracing::error!(
                "Critical Error, id: {id} is outside of the {} container size! \
                 There is an error in the business logic. It will not be destroyed",
                self.what
            );
            RenderError::InvalidHandle(id)
        })
    }

    pub(crate) fn attach(&self, id: i32, texture: TextureId, width: i32, height: i32) -> bool {
        self.index(id)
            .is_some_and(|index| self.slots.attach(index, texture, texture_bytes(width, height)))
    }

    pub(crate) fn replace(
        &self,
        id: i32,
        texture: TextureId,
        width: i32,
        height: i32,
    ) -> Option<TextureId> {
        self.slots
            .replace(self.index(id)?, texture, texture_bytes(width, height))
    }

    pub(crate) fn get(&self, id: i32) -> Option<TextureId> {
        self.slots.get(self.index(id)?)
    }

    pub(crate) fn detach(&self, id: i32) -> Option<TextureId> {
        self.slots.detach(self.index(id)?)
    }

    pub(crate) fn memory_usage(&self) -> u64 {
        self.slots.memory_usage()
    }

    pub(crate) fn occupied_count(&self) -> usize {
        self.slots.occupied_count()
    }

    pub(crate) fn drain(&self) -> Vec<TextureId> {
        self.slots
            .drain_ready()
            .into_iter()
            .map(|(_, texture)| texture)
            .collect()
    }

    fn index(&self, id: i32) -> Option<usize> {
        usize::try_from(id)
            .ok()
            .filter(|index| *index < self.slots.capacity())
    }
}
