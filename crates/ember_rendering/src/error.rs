//! # Rendering Error Types
//!
//! All errors that can surface from the render pipeline and its containers.
//!
//! Capacity overflow inside a frame is NOT an error here: it is logged and
//! the command is dropped. These variants are for init paths and for the
//! immediate caller of a producer-side operation.

use thiserror::Error;

use crate::backend::BackendError;
use crate::command::RendererCmd;

/// Errors that can occur in the rendering system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The native backend reported a failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A fixed-capacity container has no free slot left.
    #[error("capacity exhausted: {what} (capacity {capacity})")]
    CapacityExhausted {
        /// Which container overflowed.
        what: &'static str,
        /// Its configured capacity.
        capacity: usize,
    },

    /// The frame had no room left for a command.
    #[error("{0:?} was dropped, the frame is full")]
    CommandDropped(RendererCmd),

    /// No resource record with this id was stored.
    #[error("resource not found: {0:#018X}")]
    ResourceNotFound(u64),

    /// Unload requested for a resource whose reference count is already 0.
    #[error("resource not loaded: {0:#018X}")]
    ResourceNotLoaded(u64),

    /// No font with this id was loaded.
    #[error("font not found: {0:#018X}")]
    FontNotFound(u64),

    /// No sound with this id was loaded.
    #[error("sound not found: {0:#018X}")]
    SoundNotFound(u64),

    /// A volume outside [0, 128].
    #[error("invalid volume {0}, volume must be in range 0-128")]
    InvalidVolume(i32),

    /// The mixer allocated a different channel count than requested.
    #[error("requested {requested} sound channels, got {allocated}")]
    ChannelAllocation {
        /// Requested count.
        requested: i32,
        /// Count the mixer ended up with.
        allocated: i32,
    },

    /// A session-local handle is unset or out of range.
    #[error("invalid handle: {0}")]
    InvalidHandle(i32),

    /// Unlock requested while already unlocked.
    #[error("renderer is already unlocked")]
    AlreadyUnlocked,

    /// Lock requested while already locked.
    #[error("renderer is already locked")]
    AlreadyLocked,

    /// The resource manifest could not be read.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// A loader worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    ThreadSpawn(String),

    /// Resource loading was aborted before every record was uploaded.
    #[error("resource loading aborted with {remaining} textures outstanding")]
    LoadingAborted {
        /// Textures still missing.
        remaining: usize,
    },
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
