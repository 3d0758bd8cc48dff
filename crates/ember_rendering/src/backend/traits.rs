//! # Native Library Boundary
//!
//! Traits a native multimedia binding implements so the pipeline never
//! touches the native API directly.
//!
//! ```text
//! ember_rendering defines:      A binding implements:
//! ┌────────────────────┐        ┌────────────────────┐
//! │ trait GraphicsBackend │ ←─  │ impl for renderer  │
//! │ trait SurfaceDecoder  │ ←─  │ impl for image lib │
//! │ trait FontBackend     │ ←─  │ impl for ttf lib   │
//! │ trait AudioBackend    │ ←─  │ impl for mixer     │
//! └────────────────────┘        └────────────────────┘
//! ```
//!
//! Handles are opaque `u64` newtypes. The binding decides what they map to.

use ember_shared::{Color, Point, Rectangle};
use thiserror::Error;

use crate::defines::{BlendMode, RendererFlags, ScreenshotContainer, WidgetFlip};

/// A failure reported by the native library.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{op} failed: {diagnostic}")]
pub struct BackendError {
    /// The native call that failed.
    pub op: &'static str,
    /// Diagnostic string reported by the native library.
    pub diagnostic: String,
}

impl BackendError {
    /// Creates a new backend error.
    #[must_use]
    pub fn new(op: &'static str, diagnostic: impl Into<String>) -> Self {
        Self {
            op,
            diagnostic: diagnostic.into(),
        }
    }
}

/// Result type for native calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// GPU texture handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// Opened font handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontHandle(pub u64);

/// Loaded music stream handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MusicHandle(pub u64);

/// Loaded sound effect handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle(pub u64);

/// Custom cursor handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CursorHandle(pub u64);

/// Decoded CPU-side image, RGBA8.
///
/// Surfaces are produced on loader workers and consumed on the render
/// thread, so they own their pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Pixel data, `width * height * 4` bytes.
    pub pixels: Box<[u8]>,
}

impl Surface {
    /// Creates a zeroed surface.
    #[must_use]
    pub fn blank(width: i32, height: i32) -> Self {
        let len = usize::try_from(width.max(0)).unwrap_or(0)
            * usize::try_from(height.max(0)).unwrap_or(0)
            * 4;
        Self {
            width,
            height,
            pixels: vec![0; len].into_boxed_slice(),
        }
    }
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// What the native renderer reports about itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererInfo {
    /// Driver name.
    pub name: String,
    /// Capabilities the renderer was created with.
    pub flags: RendererFlags,
    /// Largest texture width supported.
    pub max_texture_width: i32,
    /// Largest texture height supported.
    pub max_texture_height: i32,
}

// ============================================================================
// RENDER THREAD
// ============================================================================

/// The hardware renderer.
///
/// Only the render thread calls into it. Every method mirrors one native
/// call; the pipeline decides ordering.
pub trait GraphicsBackend {
    /// Uploads a decoded surface.
    fn create_texture_from_surface(&mut self, surface: &Surface) -> BackendResult<TextureId>;

    /// Creates a texture usable as a render target.
    fn create_target_texture(&mut self, width: i32, height: i32) -> BackendResult<TextureId>;

    /// Rasterizes `text` and uploads it. Returns the texture and its size.
    fn create_text_texture(
        &mut self,
        font: FontHandle,
        text: &str,
        color: Color,
    ) -> BackendResult<(TextureId, i32, i32)>;

    /// Frees a texture.
    fn destroy_texture(&mut self, texture: TextureId);

    /// `None` targets the default framebuffer.
    fn set_render_target(&mut self, target: Option<TextureId>) -> BackendResult<()>;

    /// Clears the current target with the current draw color.
    fn clear(&mut self) -> BackendResult<()>;

    /// Current draw color.
    fn draw_color(&self) -> Color;

    /// Sets the draw color used by [`GraphicsBackend::clear`].
    fn set_draw_color(&mut self, color: Color) -> BackendResult<()>;

    /// `None` disables clipping.
    fn set_clip_rect(&mut self, clip: Option<Rectangle>) -> BackendResult<()>;

    /// Copies `src` of `texture` into `dst` of the current target.
    #[allow(clippy::too_many_arguments)]
    fn copy(
        &mut self,
        texture: TextureId,
        src: Rectangle,
        dst: Rectangle,
        angle: f64,
        center: Point,
        flip: WidgetFlip,
    ) -> BackendResult<()>;

    /// Alpha modulation of a texture.
    fn set_texture_alpha(&mut self, texture: TextureId, alpha: u8) -> BackendResult<()>;

    /// Blend mode of a texture.
    fn set_texture_blend_mode(&mut self, texture: TextureId, mode: BlendMode)
        -> BackendResult<()>;

    /// Shows the back buffer.
    fn present(&mut self);

    /// Saves the current default framebuffer to `path`.
    fn take_screenshot(
        &mut self,
        path: &str,
        container: ScreenshotContainer,
        quality: i32,
    ) -> BackendResult<()>;

    /// Driver information.
    fn renderer_info(&self) -> RendererInfo;
}

// ============================================================================
// LOADER WORKERS
// ============================================================================

/// Image decoding. Called concurrently from loader workers.
pub trait SurfaceDecoder: Send + Sync {
    /// Decodes the image at `path`.
    fn decode(&self, path: &str) -> BackendResult<Surface>;
}

// ============================================================================
// UPDATE THREAD
// ============================================================================

/// Font loading and text measurement.
pub trait FontBackend: Send + Sync {
    /// Opens `path` at `point_size`.
    fn open_font(&self, path: &str, point_size: i32) -> BackendResult<FontHandle>;

    /// Size `text` would occupy when rendered with `font`.
    fn measure_text(&self, font: FontHandle, text: &str) -> BackendResult<(i32, i32)>;

    /// Closes a font.
    fn close_font(&self, font: FontHandle);
}

/// Called with the channel index whenever a channel stops playing.
pub type ChannelFinished = Box<dyn FnMut(i32) + Send>;

/// Music and sound effect loading and playback.
///
/// Channel arguments taking `None` address every channel, or the first
/// free one for [`AudioBackend::play_chunk`]. Volumes are in [0, 128].
pub trait AudioBackend: Send {
    /// Loads a music stream.
    fn load_music(&mut self, path: &str) -> BackendResult<MusicHandle>;

    /// Loads a sound effect.
    fn load_chunk(&mut self, path: &str) -> BackendResult<ChunkHandle>;

    /// Sets the volume of a music stream.
    fn set_music_volume(&mut self, music: MusicHandle, volume: i32);

    /// Volume of a music stream.
    fn music_volume(&self, music: MusicHandle) -> i32;

    /// Sets the volume of a sound effect.
    fn set_chunk_volume(&mut self, chunk: ChunkHandle, volume: i32);

    /// Volume of a sound effect.
    fn chunk_volume(&self, chunk: ChunkHandle) -> i32;

    /// Frees a music stream, halting it if it plays.
    fn free_music(&mut self, music: MusicHandle);

    /// Frees a sound effect, halting every channel playing it.
    fn free_chunk(&mut self, chunk: ChunkHandle);

    // ------------------------------------------------------------------
    // music playback, one stream at a time
    // ------------------------------------------------------------------

    /// Starts `music`, replacing the current stream. `loops == -1` repeats
    /// forever.
    fn play_music(&mut self, music: MusicHandle, loops: i32) -> BackendResult<()>;

    /// Pauses the current stream.
    fn pause_music(&mut self);

    /// Resumes a paused stream.
    fn resume_music(&mut self);

    /// Restarts the current stream from the beginning.
    fn rewind_music(&mut self);

    /// Stops the current stream.
    fn halt_music(&mut self);

    /// True while a stream is started, paused or not.
    fn is_music_playing(&self) -> bool;

    /// True while the started stream is paused.
    fn is_music_paused(&self) -> bool;

    // ------------------------------------------------------------------
    // effect channels
    // ------------------------------------------------------------------

    /// Resizes the channel pool. Returns the channel count now allocated.
    fn allocate_channels(&mut self, count: i32) -> i32;

    /// Plays `chunk` on `channel`. Returns the channel used.
    fn play_chunk(
        &mut self,
        chunk: ChunkHandle,
        channel: Option<i32>,
        loops: i32,
    ) -> BackendResult<i32>;

    /// Sets the volume of one or every channel.
    fn set_channel_volume(&mut self, channel: Option<i32>, volume: i32);

    /// Volume of a channel. 0 for an unknown channel.
    fn channel_volume(&self, channel: i32) -> i32;

    /// Pauses one or every channel.
    fn pause_channel(&mut self, channel: Option<i32>);

    /// Resumes one or every channel.
    fn resume_channel(&mut self, channel: Option<i32>);

    /// Stops one or every channel.
    fn halt_channel(&mut self, channel: Option<i32>);

    /// True while `channel` has an effect, paused or not.
    fn is_channel_playing(&self, channel: i32) -> bool;

    /// True while `channel` is paused.
    fn is_channel_paused(&self, channel: i32) -> bool;

    /// Per-side volume of a channel, 255 being unattenuated.
    fn set_channel_panning(&mut self, channel: i32, left: u8, right: u8) -> BackendResult<()>;

    /// Installs the channel-finished callback. It runs while the mixer is
    /// locked and must not call back into it.
    fn set_channel_finished(&mut self, callback: ChannelFinished);
}

/// Mouse cursor control.
pub trait CursorBackend {
    /// `Some` shows or hides the cursor, `None` only queries.
    /// Returns whether the cursor was visible before the call.
    fn show_cursor(&mut self, visible: Option<bool>) -> bool;

    /// Builds a color cursor with its click point at `hot_spot`.
    fn create_color_cursor(&mut self, surface: &Surface, hot_spot: Point)
        -> BackendResult<CursorHandle>;

    /// Makes `cursor` the active cursor.
    fn set_cursor(&mut self, cursor: CursorHandle);

    /// Frees a cursor.
    fn free_cursor(&mut self, cursor: CursorHandle);
}
