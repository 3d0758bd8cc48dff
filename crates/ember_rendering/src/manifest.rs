//! # Resource Manifest
//!
//! Records describing every image, font and sound the application ships,
//! and the reader the containers pull them from.
//!
//! The on-disk format is owned by the asset tooling. [`TomlManifest`] is the
//! in-memory implementation used by tools and tests:
//!
//! ```toml
//! [[resources]]
//! path = "p/background.png"
//! file_size = 4096
//! image_rect = { x = 0, y = 0, w = 1920, h = 1080 }
//! load_type = "ON_INIT"
//!
//! [[fonts]]
//! path = "f/mono.ttf"
//! file_size = 1024
//! font_size = 24
//!
//! [[sounds]]
//! path = "s/click.wav"
//! file_size = 512
//! sound_type = "CHUNK"
//! sound_level = "HIGH"
//! ```

use std::collections::VecDeque;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher24;

use ember_shared::Rectangle;

use crate::error::{RenderError, RenderResult};

/// Content hash used as the id of a manifest entry without an explicit id.
#[must_use]
pub fn resource_id(path: &str) -> u64 {
    let mut hasher = SipHasher24::new();
    hasher.write(path.as_bytes());
    hasher.finish()
}

/// When an image is uploaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TextureLoadType {
    /// Uploaded while the containers initialize.
    #[default]
    OnInit,
    /// Uploaded on request and reference counted.
    OnDemand,
}

/// Music stream or sound effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoundType {
    /// Streamed music.
    Music,
    /// Fully decoded effect.
    #[default]
    Chunk,
}

/// Initial volume of a sound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SoundLevel {
    /// Muted.
    None,
    /// Quarter volume.
    Low,
    /// Half volume.
    Medium,
    /// Three quarters volume.
    High,
    /// Full volume.
    #[default]
    VeryHigh,
    /// Not set by the tooling.
    Unknown,
}

impl SoundLevel {
    /// Mixer volume in [0, 128]. `None` for [`SoundLevel::Unknown`].
    #[must_use]
    pub const fn volume(self) -> Option<i32> {
        match self {
            Self::None => Some(0),
            Self::Low => Some(32),
            Self::Medium => Some(64),
            Self::High => Some(96),
            Self::VeryHigh => Some(128),
            Self::Unknown => None,
        }
    }
}

/// Fields every record carries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceHeader {
    /// Path relative to the resources folder.
    pub path: String,
    /// Size on disk, drives loading progress.
    pub file_size: u64,
    /// Content-addressed id.
    pub hash_value: u64,
}

/// An image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceData {
    /// Common fields.
    pub header: ResourceHeader,
    /// Full image rectangle.
    pub image_rect: Rectangle,
    /// When the image is uploaded.
    pub load_type: TextureLoadType,
}

/// A font at one point size.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FontData {
    /// Common fields.
    pub header: ResourceHeader,
    /// Point size.
    pub font_size: i32,
}

/// A sound.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SoundData {
    /// Common fields.
    pub header: ResourceHeader,
    /// Music or effect.
    pub sound_type: SoundType,
    /// Initial volume.
    pub sound_level: SoundLevel,
}

/// Totals read before any record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManifestHeaders {
    /// Images uploaded at init.
    pub static_widgets_count: usize,
    /// Images uploaded on demand.
    pub dynamic_widgets_count: usize,
    /// Fonts.
    pub fonts_count: usize,
    /// Music streams.
    pub musics_count: usize,
    /// Sound effects.
    pub chunks_count: usize,
    /// Bytes of ON_INIT images.
    pub widgets_file_size: u64,
    /// Bytes of fonts.
    pub fonts_file_size: u64,
    /// Bytes of sounds.
    pub sounds_file_size: u64,
}

impl ManifestHeaders {
    /// Bytes loaded while initializing, the loading screen's 100%.
    #[must_use]
    pub const fn total_init_file_size(&self) -> u64 {
        self.widgets_file_size + self.fonts_file_size + self.sounds_file_size
    }
}

/// Source of manifest records.
///
/// Chunk readers return `None` once their section is exhausted.
pub trait ManifestReader {
    /// Reads the totals. Called once, before any chunk.
    ///
    /// # Errors
    ///
    /// [`RenderError::Manifest`] if the headers are unreadable.
    fn read_engine_bin_headers(&mut self) -> RenderResult<ManifestHeaders>;

    /// Next image record.
    fn read_resource_chunk(&mut self) -> Option<ResourceData>;

    /// Next font record.
    fn read_font_chunk(&mut self) -> Option<FontData>;

    /// Next sound record.
    fn read_sound_chunk(&mut self) -> Option<SoundData>;
}

#[derive(Deserialize)]
struct RawResource {
    path: String,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    file_size: u64,
    image_rect: Rectangle,
    #[serde(default)]
    load_type: TextureLoadType,
}

#[derive(Deserialize)]
struct RawFont {
    path: String,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    file_size: u64,
    font_size: i32,
}

#[derive(Deserialize)]
struct RawSound {
    path: String,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    file_size: u64,
    sound_type: SoundType,
    #[serde(default)]
    sound_level: SoundLevel,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawManifest {
    resources: Vec<RawResource>,
    fonts: Vec<RawFont>,
    sounds: Vec<RawSound>,
}

fn header(path: String, id: Option<u64>, file_size: u64) -> ResourceHeader {
    let hash_value = id.unwrap_or_else(|| resource_id(&path));
    ResourceHeader {
        path,
        file_size,
        hash_value,
    }
}

/// Manifest parsed from TOML into memory.
#[derive(Debug, Default)]
pub struct TomlManifest {
    headers: ManifestHeaders,
    resources: VecDeque<ResourceData>,
    fonts: VecDeque<FontData>,
    sounds: VecDeque<SoundData>,
}

impl TomlManifest {
    /// Parses a manifest document.
    ///
    /// # Errors
    ///
    /// [`RenderError::Manifest`] on malformed TOML.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let raw: RawManifest =
            toml::from_str(source).map_err(|e| RenderError::Manifest(e.to_string()))?;

        let mut manifest = Self::default();
        for raw in raw.resources {
            manifest.push_resource(ResourceData {
                header: header(raw.path, raw.id, raw.file_size),
                image_rect: raw.image_rect,
                load_type: raw.load_type,
            });
        }
        for raw in raw.fonts {
            manifest.push_font(FontData {
                header: header(raw.path, raw.id, raw.file_size),
                font_size: raw.font_size,
            });
        }
        for raw in raw.sounds {
            manifest.push_sound(SoundData {
                header: header(raw.path, raw.id, raw.file_size),
                sound_type: raw.sound_type,
                sound_level: raw.sound_level,
            });
        }
        Ok(manifest)
    }

    /// Appends an image record and updates the totals.
    pub fn push_resource(&mut self, data: ResourceData) {
        match data.load_type {
            TextureLoadType::OnInit => {
                self.headers.static_widgets_count += 1;
                self.headers.widgets_file_size += data.header.file_size;
            }
            TextureLoadType::OnDemand => self.headers.dynamic_widgets_count += 1,
        }
        self.resources.push_back(data);
    }

    /// Appends a font record and updates the totals.
    pub fn push_font(&mut self, data: FontData) {
        self.headers.fonts_count += 1;
        self.headers.fonts_file_size += data.header.file_size;
        self.fonts.push_back(data);
    }

    /// Appends a sound record and updates the totals.
    pub fn push_sound(&mut self, data: SoundData) {
        match data.sound_type {
            SoundType::Music => self.headers.musics_count += 1,
            SoundType::Chunk => self.headers.chunks_count += 1,
        }
        self.headers.sounds_file_size += data.header.file_size;
        self.sounds.push_back(data);
    }
}

impl ManifestReader for TomlManifest {
    fn read_engine_bin_headers(&mut self) -> RenderResult<ManifestHeaders> {
        Ok(self.headers)
    }

    fn read_resource_chunk(&mut self) -> Option<ResourceData> {
        self.resources.pop_front()
    }

    fn read_font_chunk(&mut self) -> Option<FontData> {
        self.fonts.pop_front()
    }

    fn read_sound_chunk(&mut self) -> Option<SoundData> {
        self.sounds.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
        [[resources]]
        path = "p/a.png"
        file_size = 100
        image_rect = { x = 0, y = 0, w = 32, h = 32 }

        [[resources]]
        path = "p/b.png"
        id = 77
        file_size = 50
        image_rect = { x = 0, y = 0, w = 8, h = 8 }
        load_type = "ON_DEMAND"

        [[fonts]]
        path = "f/mono.ttf"
        file_size = 30
        font_size = 24

        [[sounds]]
        path = "s/theme.ogg"
        file_size = 20
        sound_type = "MUSIC"
        sound_level = "LOW"
    "#;

    #[test]
    fn test_headers_totals() {
        let mut manifest = TomlManifest::from_toml_str(MANIFEST).unwrap();
        let headers = manifest.read_engine_bin_headers().unwrap();

        assert_eq!(headers.static_widgets_count, 1);
        assert_eq!(headers.dynamic_widgets_count, 1);
        assert_eq!(headers.musics_count, 1);
        assert_eq!(headers.widgets_file_size, 100);
        assert_eq!(headers.total_init_file_size(), 150);
    }

    #[test]
    fn test_chunks_in_order_with_ids() {
        let mut manifest = TomlManifest::from_toml_str(MANIFEST).unwrap();

        let first = manifest.read_resource_chunk().unwrap();
        assert_eq!(first.header.hash_value, resource_id("p/a.png"));
        let second = manifest.read_resource_chunk().unwrap();
        assert_eq!(second.header.hash_value, 77);
        assert_eq!(second.load_type, TextureLoadType::OnDemand);
        assert!(manifest.read_resource_chunk().is_none());

        assert_eq!(manifest.read_font_chunk().unwrap().font_size, 24);
        assert_eq!(
            manifest.read_sound_chunk().unwrap().sound_level.volume(),
            Some(32)
        );
    }

    #[test]
    fn test_resource_id_is_stable() {
        assert_eq!(resource_id("p/a.png"), resource_id("p/a.png"));
        assert_ne!(resource_id("p/a.png"), resource_id("p/b.png"));
        assert_eq!(SoundLevel::Unknown.volume(), None);
    }

    #[test]
    fn test_malformed_manifest() {
        let result = TomlManifest::from_toml_str("[[resources]]\npath = 3");
        assert!(matches!(result, Err(RenderError::Manifest(_))));
    }
}
