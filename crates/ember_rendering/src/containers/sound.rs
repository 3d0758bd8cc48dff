//! Music streams and sound effects, loaded once at init.

use ember_core::KeyedContainer;
use parking_lot::Mutex;

use super::mixer::SoundMixer;
use crate::backend::{AudioBackend, ChunkHandle, MusicHandle};
use crate::error::{RenderError, RenderResult};
use crate::manifest::{SoundData, SoundLevel, SoundType};

/// Loaded sounds.
pub struct SoundContainer {
    backend: Mutex<Box<dyn AudioBackend>>,
    musics: KeyedContainer<MusicHandle>,
    chunks: KeyedContainer<ChunkHandle>,
}

impl std::fmt::Debug for SoundContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundContainer")
            .field("musics", &self.musics.len())
            .field("chunks", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

impl SoundContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new(backend: Box<dyn AudioBackend>, musics: usize, chunks: usize) -> Self {
        Self {
            backend: Mutex::new(backend),
            musics: KeyedContainer::with_capacity(musics),
            chunks: KeyedContainer::with_capacity(chunks),
        }
    }

    /// Reserves room for more music streams and sound effects.
    pub fn reserve(&self, musics: usize, chunks: usize) {
        self.musics.reserve(musics);
        self.chunks.reserve(chunks);
    }

    /// Loads every record and applies its volume. A sound that fails to
    /// load, or carries an unknown level, is logged and skipped.
    pub fn load_all(
        &self,
        records: Vec<SoundData>,
        resolve: impl Fn(&str) -> String,
        mut on_loaded: impl FnMut(u64),
    ) -> usize {
        let mut backend = self.backend.lock();
        let mut loaded = 0;

        for record in records {
            let id = record.header.hash_value;
            let path = resolve(&record.header.path);
            let Some(volume) = record.sound_level.volume() else {
                tracing::error!(
                    "UNKNOWN sound level for soundId: {id:#018X} ({path}). Sound will not be loaded"
                );
                continue;
            };

            let stored = match record.sound_type {
                SoundType::Music => backend.load_music(&path).map(|music| {
                    backend.set_music_volume(music, volume);
                    if let Some(previous) = self.musics.insert(id, music, 0) {
                        backend.free_music(previous);
                    }
                }),
                SoundType::Chunk => backend.load_chunk(&path).map(|chunk| {
                    backend.set_chunk_volume(chunk, volume);
                    if let Some(previous) = self.chunks.insert(id, chunk, 0) {
                        backend.free_chunk(previous);
                    }
                }),
            };

            match stored {
                Ok(()) => {
                    on_loaded(record.header.file_size);
                    loaded += 1;
                }
                Err(e) => tracing::error!("Error loading soundId: {id:#018X}: {e}"),
            }
        }
        loaded
    }

    /// Music stream by id.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`].
    pub fn music(&self, id: u64) -> RenderResult<MusicHandle> {
        self.musics.get(id).ok_or_else(|| {
            tracing::error!("Music for rsrcId: {id:#018X} not found");
            RenderError::SoundNotFound(id)
        })
    }

    /// Sound effect by id.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`].
    pub fn chunk(&self, id: u64) -> RenderResult<ChunkHandle> {
        self.chunks.get(id).ok_or_else(|| {
            tracing::error!("Chunk for rsrcId: {id:#018X} not found");
            RenderError::SoundNotFound(id)
        })
    }

    /// Changes the volume of a loaded sound.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`] or [`RenderError::InvalidConfig`] for
    /// an unknown level.
    pub fn set_volume(&self, id: u64, level: SoundLevel) -> RenderResult<()> {
        let volume = level
            .volume()
            .ok_or_else(|| RenderError::InvalidConfig("UNKNOWN sound level".to_string()))?;
        let mut backend = self.backend.lock();
        if let Some(music) = self.musics.get(id) {
            backend.set_music_volume(music, volume);
        } else if let Some(chunk) = self.chunks.get(id) {
            backend.set_chunk_volume(chunk, volume);
        } else {
            return Err(RenderError::SoundNotFound(id));
        }
        Ok(())
    }

    /// Playback control over the loaded sounds.
    #[must_use]
    pub fn mixer(&self) -> SoundMixer<'_> {
        SoundMixer::new(self)
    }

    pub(crate) fn with_backend<R>(&self, f: impl FnOnce(&mut dyn AudioBackend) -> R) -> R {
        let mut backend = self.backend.lock();
        f(backend.as_mut())
    }

    /// Number of loaded music streams.
    #[must_use]
    pub fn music_count(&self) -> usize {
        self.musics.len()
    }

    /// Number of loaded sound effects.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Frees everything.
    pub fn free_all(&self) {
        let mut backend = self.backend.lock();
        for (_, music) in self.musics.drain() {
            backend.free_music(music);
        }
        for (_, chunk) in self.chunks.drain() {
            backend.free_chunk(chunk);
        }
    }
}
