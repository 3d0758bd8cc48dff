//! Playback control over the loaded sounds.
//!
//! Sounds are addressed by their content id. Channel and music state lives
//! in the [`AudioBackend`](crate::backend::AudioBackend); this layer only
//! validates arguments and resolves ids.

use super::sound::SoundContainer;
use crate::error::{RenderError, RenderResult};

/// Loudest volume a channel, music or chunk accepts.
pub const MAX_VOLUME: i32 = 128;

/// Loop count that repeats until stopped.
pub const LOOP_FOREVER: i32 = -1;

/// Borrowed view of a [`SoundContainer`] that plays its sounds.
#[derive(Debug, Clone, Copy)]
pub struct SoundMixer<'a> {
    sounds: &'a SoundContainer,
}

impl<'a> SoundMixer<'a> {
    pub(crate) fn new(sounds: &'a SoundContainer) -> Self {
        Self { sounds }
    }

    // ========================================================================
    // CHANNELS
    // ========================================================================

    /// Resizes the effect channel pool. Shrinking stops the removed channels.
    ///
    /// # Errors
    ///
    /// [`RenderError::ChannelAllocation`] when the mixer ends up with a
    /// different count.
    pub fn allocate_sound_channels(&self, requested: i32) -> RenderResult<()> {
        let allocated = self
            .sounds
            .with_backend(|backend| backend.allocate_channels(requested));
        if allocated != requested {
            tracing::error!(
                "Error in allocate_sound_channels() for requested: {requested}, \
                 but only {allocated} channels were allocated"
            );
            return Err(RenderError::ChannelAllocation {
                requested,
                allocated,
            });
        }
        Ok(())
    }

    /// Called with the channel index whenever an effect stops. The callback
    /// runs while the mixer is locked and must not use the mixer.
    pub fn set_callback_on_channel_finish(&self, callback: impl FnMut(i32) + Send + 'static) {
        self.sounds
            .with_backend(|backend| backend.set_channel_finished(Box::new(callback)));
    }

    /// Sets the volume of one channel.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidVolume`].
    pub fn set_channel_volume(&self, channel: i32, volume: i32) -> RenderResult<()> {
        check_volume(volume)?;
        self.sounds
            .with_backend(|backend| backend.set_channel_volume(Some(channel), volume));
        Ok(())
    }

    /// Sets the volume of every channel.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidVolume`].
    pub fn set_all_channels_volume(&self, volume: i32) -> RenderResult<()> {
        check_volume(volume)?;
        self.sounds
            .with_backend(|backend| backend.set_channel_volume(None, volume));
        Ok(())
    }

    /// Volume of a channel.
    #[must_use]
    pub fn channel_volume(&self, channel: i32) -> i32 {
        self.sounds
            .with_backend(|backend| backend.channel_volume(channel))
    }

    /// Pauses a channel.
    pub fn pause_channel(&self, channel: i32) {
        self.sounds
            .with_backend(|backend| backend.pause_channel(Some(channel)));
    }

    /// Resumes a paused channel.
    pub fn resume_channel(&self, channel: i32) {
        self.sounds
            .with_backend(|backend| backend.resume_channel(Some(channel)));
    }

    /// Stops a channel.
    pub fn stop_channel(&self, channel: i32) {
        self.sounds
            .with_backend(|backend| backend.halt_channel(Some(channel)));
    }

    /// Stops every channel.
    pub fn stop_all_channels(&self) {
        self.sounds.with_backend(|backend| backend.halt_channel(None));
    }

    /// True while `channel` has an effect, paused or not.
    #[must_use]
    pub fn is_channel_playing(&self, channel: i32) -> bool {
        self.sounds
            .with_backend(|backend| backend.is_channel_playing(channel))
    }

    /// True while `channel` is paused.
    #[must_use]
    pub fn is_channel_paused(&self, channel: i32) -> bool {
        self.sounds
            .with_backend(|backend| backend.is_channel_paused(channel))
    }

    /// Attenuates each side of a channel, 255 leaving the side untouched.
    ///
    /// # Errors
    ///
    /// [`RenderError::Backend`] for an unknown channel.
    pub fn set_channel_panning(&self, channel: i32, left: u8, right: u8) -> RenderResult<()> {
        self.sounds
            .with_backend(|backend| backend.set_channel_panning(channel, left, right))
            .map_err(|e| {
                tracing::error!("Error in set_channel_panning() for channel: {channel}: {e}");
                RenderError::from(e)
            })
    }

    /// Restores full volume on both sides of a channel.
    ///
    /// # Errors
    ///
    /// [`RenderError::Backend`] for an unknown channel.
    pub fn reset_channel_panning(&self, channel: i32) -> RenderResult<()> {
        self.set_channel_panning(channel, u8::MAX, u8::MAX)
    }

    // ========================================================================
    // MUSIC
    // ========================================================================

    /// Starts music `id`, replacing whatever music plays.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`] or [`RenderError::Backend`].
    pub fn play_music(&self, id: u64, loops: i32) -> RenderResult<()> {
        let music = self.sounds.music(id)?;
        self.sounds
            .with_backend(|backend| backend.play_music(music, loops))
            .map_err(|e| {
                tracing::error!("Error in play_music() for rsrcId: {id:#018X}: {e}");
                RenderError::from(e)
            })
    }

    /// Pauses the music.
    pub fn pause_music(&self) {
        self.sounds.with_backend(|backend| backend.pause_music());
    }

    /// Resumes paused music.
    pub fn resume_music(&self) {
        self.sounds.with_backend(|backend| backend.resume_music());
    }

    /// Restarts the music from the beginning.
    pub fn rewind_music(&self) {
        self.sounds.with_backend(|backend| backend.rewind_music());
    }

    /// Stops the music.
    pub fn stop_music(&self) {
        self.sounds.with_backend(|backend| backend.halt_music());
    }

    /// True while music is started, paused or not.
    #[must_use]
    pub fn is_music_playing(&self) -> bool {
        self.sounds.with_backend(|backend| backend.is_music_playing())
    }

    /// True while the music is paused.
    #[must_use]
    pub fn is_music_paused(&self) -> bool {
        self.sounds.with_backend(|backend| backend.is_music_paused())
    }

    /// Sets the volume of music `id`.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidVolume`] or [`RenderError::SoundNotFound`].
    pub fn set_music_volume(&self, id: u64, volume: i32) -> RenderResult<()> {
        check_volume(volume)?;
        let music = self.sounds.music(id)?;
        self.sounds
            .with_backend(|backend| backend.set_music_volume(music, volume));
        Ok(())
    }

    /// Volume of music `id`.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`].
    pub fn music_volume(&self, id: u64) -> RenderResult<i32> {
        let music = self.sounds.music(id)?;
        Ok(self.sounds.with_backend(|backend| backend.music_volume(music)))
    }

    // ========================================================================
    // CHUNKS
    // ========================================================================

    /// Plays effect `id` on `channel`, or on the first free channel for
    /// `None`. Returns the channel used.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`] or [`RenderError::Backend`] when no
    /// channel is available.
    pub fn play_chunk(&self, id: u64, channel: Option<i32>, loops: i32) -> RenderResult<i32> {
        let chunk = self.sounds.chunk(id)?;
        self.sounds
            .with_backend(|backend| backend.play_chunk(chunk, channel, loops))
            .map_err(|e| {
                tracing::error!("Error in play_chunk() for rsrcId: {id:#018X}: {e}");
                RenderError::from(e)
            })
    }

    /// Sets the volume of effect `id`.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidVolume`] or [`RenderError::SoundNotFound`].
    pub fn set_chunk_volume(&self, id: u64, volume: i32) -> RenderResult<()> {
        check_volume(volume)?;
        let chunk = self.sounds.chunk(id)?;
        self.sounds
            .with_backend(|backend| backend.set_chunk_volume(chunk, volume));
        Ok(())
    }

    /// Volume of effect `id`.
    ///
    /// # Errors
    ///
    /// [`RenderError::SoundNotFound`].
    pub fn chunk_volume(&self, id: u64) -> RenderResult<i32> {
        let chunk = self.sounds.chunk(id)?;
        Ok(self.sounds.with_backend(|backend| backend.chunk_volume(chunk)))
    }
}

fn check_volume(volume: i32) -> RenderResult<()> {
    if (0..=MAX_VOLUME).contains(&volume) {
        return Ok(());
    }
    tracing::error!(
        "Warning, invalid volume value provided {volume}. Volume must be in range 0-{MAX_VOLUME}"
    );
    Err(RenderError::InvalidVolume(volume))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::backend::HeadlessAudio;
    use crate::manifest::{ResourceHeader, SoundData, SoundLevel, SoundType};

    const THEME: u64 = 0x11;
    const HIT: u64 = 0x22;

    fn record(path: &str, id: u64, sound_type: SoundType, sound_level: SoundLevel) -> SoundData {
        SoundData {
            header: ResourceHeader {
                path: path.to_string(),
                file_size: 1,
                hash_value: id,
            },
            sound_type,
            sound_level,
        }
    }

    fn sounds() -> SoundContainer {
        let sounds = SoundContainer::new(Box::new(HeadlessAudio::new()), 1, 1);
        let loaded = sounds.load_all(
            vec![
                record("theme.ogg", THEME, SoundType::Music, SoundLevel::Medium),
                record("hit.wav", HIT, SoundType::Chunk, SoundLevel::High),
            ],
            str::to_string,
            |_| {},
        );
        assert_eq!(loaded, 2);
        sounds
    }

    #[test]
    fn test_music_playback_state() {
        let sounds = sounds();
        let mixer = sounds.mixer();

        assert!(!mixer.is_music_playing());
        mixer.play_music(THEME, LOOP_FOREVER).unwrap();
        assert!(mixer.is_music_playing());

        mixer.pause_music();
        assert!(mixer.is_music_paused());
        mixer.resume_music();
        assert!(!mixer.is_music_paused());
        mixer.rewind_music();
        assert!(mixer.is_music_playing());

        mixer.stop_music();
        assert!(!mixer.is_music_playing());
        assert!(!mixer.is_music_paused());
    }

    #[test]
    fn test_unknown_or_mismatched_ids_are_rejected() {
        let sounds = sounds();
        let mixer = sounds.mixer();

        assert!(matches!(
            mixer.play_music(0x99, 0),
            Err(RenderError::SoundNotFound(0x99))
        ));
        // an effect id is not a music id
        assert!(matches!(
            mixer.play_music(HIT, 0),
            Err(RenderError::SoundNotFound(HIT))
        ));
        assert!(matches!(
            mixer.play_chunk(THEME, None, 0),
            Err(RenderError::SoundNotFound(THEME))
        ));
    }

    #[test]
    fn test_chunks_fill_free_channels_and_report_finish() {
        let sounds = sounds();
        let mixer = sounds.mixer();
        let finished = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&finished);
        mixer.set_callback_on_channel_finish(move |channel| sink.lock().push(channel));

        mixer.allocate_sound_channels(2).unwrap();
        assert_eq!(mixer.play_chunk(HIT, None, 0).unwrap(), 0);
        assert_eq!(mixer.play_chunk(HIT, None, 0).unwrap(), 1);
        assert!(matches!(
            mixer.play_chunk(HIT, None, 0),
            Err(RenderError::Backend(_))
        ));
        assert!(matches!(
            mixer.play_chunk(HIT, Some(5), 0),
            Err(RenderError::Backend(_))
        ));

        mixer.pause_channel(1);
        assert!(mixer.is_channel_paused(1));
        assert!(mixer.is_channel_playing(1));
        mixer.resume_channel(1);
        assert!(!mixer.is_channel_paused(1));

        mixer.stop_channel(0);
        assert!(!mixer.is_channel_playing(0));
        assert_eq!(*finished.lock(), vec![0]);

        // only the channel still playing reports
        mixer.stop_all_channels();
        assert_eq!(*finished.lock(), vec![0, 1]);
        assert_eq!(mixer.play_chunk(HIT, None, 0).unwrap(), 0);
    }

    #[test]
    fn test_volumes_start_at_level_and_are_range_checked() {
        let sounds = sounds();
        let mixer = sounds.mixer();

        assert_eq!(mixer.music_volume(THEME).unwrap(), 64);
        assert_eq!(mixer.chunk_volume(HIT).unwrap(), 96);

        assert!(matches!(
            mixer.set_chunk_volume(HIT, MAX_VOLUME + 1),
            Err(RenderError::InvalidVolume(129))
        ));
        assert_eq!(mixer.chunk_volume(HIT).unwrap(), 96);
        mixer.set_chunk_volume(HIT, 40).unwrap();
        assert_eq!(mixer.chunk_volume(HIT).unwrap(), 40);
        mixer.set_music_volume(THEME, 0).unwrap();
        assert_eq!(mixer.music_volume(THEME).unwrap(), 0);

        mixer.set_all_channels_volume(10).unwrap();
        assert_eq!(mixer.channel_volume(0), 10);
        assert_eq!(mixer.channel_volume(7), 10);
        assert!(matches!(
            mixer.set_channel_volume(0, -1),
            Err(RenderError::InvalidVolume(-1))
        ));
        mixer.set_channel_volume(0, MAX_VOLUME).unwrap();
        assert_eq!(mixer.channel_volume(0), MAX_VOLUME);
        assert_eq!(mixer.channel_volume(1), 10);
    }

    #[test]
    fn test_panning_needs_an_existing_channel() {
        let sounds = sounds();
        let mixer = sounds.mixer();

        mixer.set_channel_panning(0, 10, 200).unwrap();
        mixer.reset_channel_panning(0).unwrap();
        assert!(matches!(
            mixer.set_channel_panning(99, 0, 0),
            Err(RenderError::Backend(_))
        ));

        mixer.allocate_sound_channels(0).unwrap();
        assert!(mixer.reset_channel_panning(0).is_err());
    }

    #[test]
    fn test_freeing_sounds_stops_their_playback() {
        let sounds = sounds();
        let mixer = sounds.mixer();
        mixer.play_music(THEME, 1).unwrap();
        let channel = mixer.play_chunk(HIT, None, 0).unwrap();

        sounds.free_all();
        assert!(!mixer.is_music_playing());
        assert!(!mixer.is_channel_playing(channel));
    }
}
