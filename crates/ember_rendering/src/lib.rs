//! # EMBER Rendering
//!
//! Cross-thread render command pipeline over a native 2D multimedia
//! library. The application records draws, texts and resource requests on
//! its update thread; a render thread replays them against the hardware
//! renderer once per frame.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     UPDATE THREAD                           │
//! │  Renderer::add_draw / add_command → RenderState (producer)  │
//! │  Containers: reserve slots, ref count images                │
//! ├──────────────────────── swap ───────────────────────────────┤
//! │                     RENDER THREAD                           │
//! │  RenderExecutor: decode opcode → dispatch → GraphicsBackend │
//! │  FINISH_FRAME: global offsets → draw records → present      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - One synchronisation point per frame
//! - Frame capacities are fixed at creation, overflow is logged and dropped
//! - The native library is only reached through [`backend`] traits

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod backend;
pub mod command;
pub mod config;
pub mod containers;
pub mod cursor;
pub mod defines;
pub mod draw;
pub mod draw_params;
pub mod error;
pub mod loading_screen;
pub mod manifest;
pub mod pipeline;
pub mod state;

pub use command::{CommandSink, RenderCommand, RendererCmd};
pub use config::{ContainersConfig, LoadingScreenConfig, RendererConfig};
pub use containers::{Containers, PopulateReport, SoundMixer};
pub use cursor::CursorContext;
pub use defines::{BlendMode, RendererFlags, RendererPolicy, ScreenshotContainer, WidgetFlip};
pub use draw_params::{DrawParams, Widget};
pub use error::{RenderError, RenderResult};
pub use loading_screen::LoadingScreen;
pub use manifest::{ManifestReader, TomlManifest};
pub use pipeline::{
    spawn_render_thread, LocalRenderer, RenderExecutor, RenderPipeline, RenderStats, Renderer,
};
pub use state::RenderState;
