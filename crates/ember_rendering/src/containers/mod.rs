//! # Resource Containers
//!
//! Fixed-capacity and content-addressed stores for every native handle the
//! renderer draws with. Composed in [`Containers`].
//!
//! | Container | Keyed by | Loaded |
//! |-----------|----------|--------|
//! | [`ResourceContainer`] | content hash | init or on demand |
//! | [`FontContainer`] | content hash | init |
//! | [`SoundContainer`] | content hash | init |
//! | [`TextContainer`] | slot id | runtime |
//! | [`FboContainer`] | slot id | runtime |

mod facade;
mod fbo;
mod font;
mod loader;
mod mixer;
mod resource;
mod slots;
mod sound;
mod text;

pub use facade::{Containers, PopulateReport};
pub use fbo::FboContainer;
pub use font::FontContainer;
pub use loader::{hardware_threads, resolve_loading_threads};
pub use mixer::{SoundMixer, LOOP_FOREVER, MAX_VOLUME};
pub use resource::ResourceContainer;
pub use slots::texture_bytes;
pub use sound::SoundContainer;
pub use text::{LoadedText, TextContainer};
