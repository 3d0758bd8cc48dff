//! # Backend Boundary
//!
//! Everything the pipeline needs from a native multimedia library, plus a
//! headless implementation that records calls.

mod headless;
mod traits;

pub use headless::{
    BackendCall, CallLog, HeadlessAudio, HeadlessBackend, HeadlessCursor, HeadlessDecoder,
    HeadlessFonts, HEADLESS_MAX_TEXTURE_SIZE,
};
pub use traits::{
    AudioBackend, BackendError, BackendResult, ChannelFinished, ChunkHandle, CursorBackend,
    CursorHandle, FontBackend, FontHandle, GraphicsBackend, MusicHandle, RendererInfo, Surface,
    SurfaceDecoder, TextureId,
};
