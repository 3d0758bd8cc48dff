//! Headless implementations of the native boundary.
//!
//! They run the whole pipeline without a GPU, window or audio device and
//! record every call so tests can assert on exact sequences.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use ember_shared::{Color, Point, Rectangle};
use parking_lot::Mutex;

use super::traits::{
    AudioBackend, BackendError, BackendResult, ChannelFinished, ChunkHandle, CursorBackend,
    CursorHandle,
    FontBackend, FontHandle, GraphicsBackend, MusicHandle, RendererInfo, Surface,
    SurfaceDecoder, TextureId,
};
use crate::defines::{BlendMode, RendererFlags, ScreenshotContainer, WidgetFlip};

/// Largest texture the headless renderer accepts.
pub const HEADLESS_MAX_TEXTURE_SIZE: i32 = 16_384;

/// One recorded call into [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// Surface upload.
    CreateTexture {
        /// Assigned texture.
        texture: TextureId,
        /// Surface width.
        width: i32,
        /// Surface height.
        height: i32,
    },
    /// Render target creation.
    CreateTargetTexture {
        /// Assigned texture.
        texture: TextureId,
        /// Target width.
        width: i32,
        /// Target height.
        height: i32,
    },
    /// Text rasterization.
    CreateTextTexture {
        /// Assigned texture.
        texture: TextureId,
        /// Rendered text.
        text: String,
        /// Text color.
        color: Color,
    },
    /// Texture release.
    DestroyTexture(TextureId),
    /// Target switch.
    SetRenderTarget(Option<TextureId>),
    /// Target clear.
    Clear,
    /// Draw color change.
    SetDrawColor(Color),
    /// Clip change.
    SetClipRect(Option<Rectangle>),
    /// Texture copy.
    Copy {
        /// Source texture.
        texture: TextureId,
        /// Source rectangle.
        src: Rectangle,
        /// Destination rectangle.
        dst: Rectangle,
        /// Rotation in degrees.
        angle: f64,
        /// Rotation center.
        center: Point,
        /// Mirroring.
        flip: WidgetFlip,
    },
    /// Alpha modulation.
    SetTextureAlpha {
        /// Target texture.
        texture: TextureId,
        /// New alpha.
        alpha: u8,
    },
    /// Blend mode change.
    SetTextureBlendMode {
        /// Target texture.
        texture: TextureId,
        /// New mode.
        mode: BlendMode,
    },
    /// Back buffer flip.
    Present,
    /// Screenshot request.
    TakeScreenshot {
        /// Output file.
        path: String,
        /// Image container.
        container: ScreenshotContainer,
        /// Quality for lossy containers.
        quality: i32,
    },
}

/// Shared, cloneable view of the recorded calls.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<BackendCall>>>);

impl CallLog {
    fn record(&self, call: BackendCall) {
        self.0.lock().push(call);
    }

    /// Copy of every call so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BackendCall> {
        self.0.lock().clone()
    }

    /// Only the texture copies, in order.
    #[must_use]
    pub fn copies(&self) -> Vec<BackendCall> {
        self.0
            .lock()
            .iter()
            .filter(|call| matches!(call, BackendCall::Copy { .. }))
            .cloned()
            .collect()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.0.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Renderer that records calls instead of drawing.
#[derive(Debug)]
pub struct HeadlessBackend {
    log: CallLog,
    fonts: Option<HeadlessFonts>,
    textures: HashMap<TextureId, (i32, i32)>,
    next_texture: u64,
    draw_color: Color,
    flags: RendererFlags,
}

impl HeadlessBackend {
    /// Creates a renderer reporting `flags`.
    #[must_use]
    pub fn new(flags: RendererFlags) -> Self {
        Self {
            log: CallLog::default(),
            fonts: None,
            textures: HashMap::new(),
            next_texture: 1,
            draw_color: Color::BLACK,
            flags,
        }
    }

    /// Uses `fonts` to size text textures.
    #[must_use]
    pub fn with_fonts(mut self, fonts: HeadlessFonts) -> Self {
        self.fonts = Some(fonts);
        self
    }

    /// Handle to the recorded calls. Stays valid after the backend moves
    /// to the render thread.
    #[must_use]
    pub fn call_log(&self) -> CallLog {
        self.log.clone()
    }

    /// Number of live textures.
    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn allocate(&mut self, width: i32, height: i32) -> BackendResult<TextureId> {
        if width <= 0
            || height <= 0
            || width > HEADLESS_MAX_TEXTURE_SIZE
            || height > HEADLESS_MAX_TEXTURE_SIZE
        {
            return Err(BackendError::new(
                "create_texture",
                format!("unsupported texture size {width}x{height}"),
            ));
        }
        let texture = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(texture, (width, height));
        Ok(texture)
    }

    fn check_live(&self, op: &'static str, texture: TextureId) -> BackendResult<()> {
        if self.textures.contains_key(&texture) {
            Ok(())
        } else {
            Err(BackendError::new(op, format!("invalid texture {}", texture.0)))
        }
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_texture_from_surface(&mut self, surface: &Surface) -> BackendResult<TextureId> {
        let texture = self.allocate(surface.width, surface.height)?;
        self.log.record(BackendCall::CreateTexture {
            texture,
            width: surface.width,
            height: surface.height,
        });
        Ok(texture)
    }

    fn create_target_texture(&mut self, width: i32, height: i32) -> BackendResult<TextureId> {
        if !self.flags.contains(RendererFlags::FBO_ENABLE) {
            return Err(BackendError::new(
                "create_target_texture",
                "renderer was created without FBO support",
            ));
        }
        let texture = self.allocate(width, height)?;
        self.log.record(BackendCall::CreateTargetTexture {
            texture,
            width,
            height,
        });
        Ok(texture)
    }

    fn create_text_texture(
        &mut self,
        font: FontHandle,
        text: &str,
        color: Color,
    ) -> BackendResult<(TextureId, i32, i32)> {
        let (width, height) = match &self.fonts {
            Some(fonts) => fonts.measure_text(font, text)?,
            None => HeadlessFonts::measure_with(DEFAULT_POINT_SIZE, text),
        };
        let texture = self.allocate(width, height)?;
        self.log.record(BackendCall::CreateTextTexture {
            texture,
            text: text.to_owned(),
            color,
        });
        Ok((texture, width, height))
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        self.log.record(BackendCall::DestroyTexture(texture));
    }

    fn set_render_target(&mut self, target: Option<TextureId>) -> BackendResult<()> {
        if let Some(texture) = target {
            self.check_live("set_render_target", texture)?;
        }
        self.log.record(BackendCall::SetRenderTarget(target));
        Ok(())
    }

    fn clear(&mut self) -> BackendResult<()> {
        self.log.record(BackendCall::Clear);
        Ok(())
    }

    fn draw_color(&self) -> Color {
        self.draw_color
    }

    fn set_draw_color(&mut self, color: Color) -> BackendResult<()> {
        self.draw_color = color;
        self.log.record(BackendCall::SetDrawColor(color));
        Ok(())
    }

    fn set_clip_rect(&mut self, clip: Option<Rectangle>) -> BackendResult<()> {
        self.log.record(BackendCall::SetClipRect(clip));
        Ok(())
    }

    fn copy(
        &mut self,
        texture: TextureId,
        src: Rectangle,
        dst: Rectangle,
        angle: f64,
        center: Point,
        flip: WidgetFlip,
    ) -> BackendResult<()> {
        self.check_live("copy", texture)?;
        self.log.record(BackendCall::Copy {
            texture,
            src,
            dst,
            angle,
            center,
            flip,
        });
        Ok(())
    }

    fn set_texture_alpha(&mut self, texture: TextureId, alpha: u8) -> BackendResult<()> {
        self.check_live("set_texture_alpha", texture)?;
        self.log.record(BackendCall::SetTextureAlpha { texture, alpha });
        Ok(())
    }

    fn set_texture_blend_mode(
        &mut self,
        texture: TextureId,
        mode: BlendMode,
    ) -> BackendResult<()> {
        self.check_live("set_texture_blend_mode", texture)?;
        self.log
            .record(BackendCall::SetTextureBlendMode { texture, mode });
        Ok(())
    }

    fn present(&mut self) {
        self.log.record(BackendCall::Present);
    }

    fn take_screenshot(
        &mut self,
        path: &str,
        container: ScreenshotContainer,
        quality: i32,
    ) -> BackendResult<()> {
        if path.is_empty() {
            return Err(BackendError::new("take_screenshot", "empty file path"));
        }
        self.log.record(BackendCall::TakeScreenshot {
            path: path.to_owned(),
            container,
            quality,
        });
        Ok(())
    }

    fn renderer_info(&self) -> RendererInfo {
        RendererInfo {
            name: "headless".to_owned(),
            flags: self.flags,
            max_texture_width: HEADLESS_MAX_TEXTURE_SIZE,
            max_texture_height: HEADLESS_MAX_TEXTURE_SIZE,
        }
    }
}

// ============================================================================
// DECODER
// ============================================================================

/// Decoder producing blank surfaces of configurable size.
#[derive(Debug)]
pub struct HeadlessDecoder {
    default_size: (i32, i32),
    sizes: HashMap<String, (i32, i32)>,
    failing: HashSet<String>,
    decoded: AtomicUsize,
}

impl HeadlessDecoder {
    /// Every path decodes to `width` x `height`.
    #[must_use]
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            default_size: (width, height),
            sizes: HashMap::new(),
            failing: HashSet::new(),
            decoded: AtomicUsize::new(0),
        }
    }

    /// Overrides the size for one path.
    #[must_use]
    pub fn with_size(mut self, path: &str, width: i32, height: i32) -> Self {
        self.sizes.insert(path.to_owned(), (width, height));
        self
    }

    /// Makes decoding `path` fail.
    #[must_use]
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_owned());
        self
    }

    /// Successful decodes so far.
    #[must_use]
    pub fn decoded_count(&self) -> usize {
        self.decoded.load(Ordering::Acquire)
    }
}

impl SurfaceDecoder for HeadlessDecoder {
    fn decode(&self, path: &str) -> BackendResult<Surface> {
        if self.failing.contains(path) {
            return Err(BackendError::new("decode", format!("couldn't open {path}")));
        }
        let (width, height) = self.sizes.get(path).copied().unwrap_or(self.default_size);
        self.decoded.fetch_add(1, Ordering::AcqRel);
        Ok(Surface::blank(width, height))
    }
}

// ============================================================================
// FONTS
// ============================================================================

const DEFAULT_POINT_SIZE: i32 = 16;

/// Fonts with fixed metrics: every glyph is `point_size / 2` wide and
/// `point_size` tall.
#[derive(Clone, Debug, Default)]
pub struct HeadlessFonts {
    inner: Arc<HeadlessFontsInner>,
}

#[derive(Debug, Default)]
struct HeadlessFontsInner {
    open: Mutex<HashMap<FontHandle, i32>>,
    failing: Mutex<HashSet<String>>,
    next: AtomicU64,
}

impl HeadlessFonts {
    /// Creates an empty font set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes opening `path` fail.
    #[must_use]
    pub fn failing(self, path: &str) -> Self {
        self.inner.failing.lock().insert(path.to_owned());
        self
    }

    /// Number of open fonts.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.inner.open.lock().len()
    }

    fn measure_with(point_size: i32, text: &str) -> (i32, i32) {
        let glyphs = i32::try_from(text.chars().count()).unwrap_or(i32::MAX);
        (glyphs.saturating_mul((point_size / 2).max(1)), point_size)
    }
}

impl FontBackend for HeadlessFonts {
    fn open_font(&self, path: &str, point_size: i32) -> BackendResult<FontHandle> {
        if self.inner.failing.lock().contains(path) {
            return Err(BackendError::new("open_font", format!("couldn't open {path}")));
        }
        if point_size <= 0 {
            return Err(BackendError::new(
                "open_font",
                format!("invalid point size {point_size}"),
            ));
        }
        let handle = FontHandle(self.inner.next.fetch_add(1, Ordering::AcqRel) + 1);
        self.inner.open.lock().insert(handle, point_size);
        Ok(handle)
    }

    fn measure_text(&self, font: FontHandle, text: &str) -> BackendResult<(i32, i32)> {
        let size = self
            .inner
            .open
            .lock()
            .get(&font)
            .copied()
            .ok_or_else(|| BackendError::new("measure_text", "font is not open"))?;
        Ok(Self::measure_with(size, text))
    }

    fn close_font(&self, font: FontHandle) {
        self.inner.open.lock().remove(&font);
    }
}

// ============================================================================
// AUDIO
// ============================================================================

/// Audio backend tracking handles, volumes and what each channel plays.
/// Nothing ever finishes on its own.
pub struct HeadlessAudio {
    failing: HashSet<String>,
    next: u64,
    music_volumes: HashMap<MusicHandle, i32>,
    chunk_volumes: HashMap<ChunkHandle, i32>,
    channels: Vec<HeadlessChannel>,
    music: Option<MusicHandle>,
    music_paused: bool,
    on_finished: Option<ChannelFinished>,
}

/// Channel count before the first `allocate_channels`.
const DEFAULT_CHANNELS: usize = 8;

#[derive(Debug, Clone, Copy)]
struct HeadlessChannel {
    chunk: Option<ChunkHandle>,
    paused: bool,
    volume: i32,
    panning: (u8, u8),
}

impl Default for HeadlessChannel {
    fn default() -> Self {
        Self {
            chunk: None,
            paused: false,
            volume: 128,
            panning: (u8::MAX, u8::MAX),
        }
    }
}

impl Default for HeadlessAudio {
    fn default() -> Self {
        Self {
            failing: HashSet::new(),
            next: 0,
            music_volumes: HashMap::new(),
            chunk_volumes: HashMap::new(),
            channels: vec![HeadlessChannel::default(); DEFAULT_CHANNELS],
            music: None,
            music_paused: false,
            on_finished: None,
        }
    }
}

impl std::fmt::Debug for HeadlessAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessAudio")
            .field("musics", &self.music_volumes.len())
            .field("chunks", &self.chunk_volumes.len())
            .field("channels", &self.channels)
            .field("music", &self.music)
            .field("music_paused", &self.music_paused)
            .finish_non_exhaustive()
    }
}

impl HeadlessAudio {
    /// Creates an empty mixer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes loading `path` fail.
    #[must_use]
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_owned());
        self
    }

    /// Left and right volume of a channel.
    #[must_use]
    pub fn channel_panning(&self, channel: i32) -> Option<(u8, u8)> {
        self.channel(channel).map(|c| c.panning)
    }

    fn next_handle(&mut self, path: &str, op: &'static str) -> BackendResult<u64> {
        if self.failing.contains(path) {
            return Err(BackendError::new(op, format!("couldn't open {path}")));
        }
        self.next += 1;
        Ok(self.next)
    }

    fn channel(&self, channel: i32) -> Option<&HeadlessChannel> {
        usize::try_from(channel)
            .ok()
            .and_then(|index| self.channels.get(index))
    }

    /// Indices addressed by `channel`, empty for an unknown one.
    fn selected(&self, channel: Option<i32>) -> std::ops::Range<usize> {
        match channel {
            None => 0..self.channels.len(),
            Some(c) => match usize::try_from(c) {
                Ok(index) if index < self.channels.len() => index..index + 1,
                _ => 0..0,
            },
        }
    }

    fn finish(&mut self, index: usize) {
        let Some(state) = self.channels.get_mut(index) else {
            return;
        };
        if state.chunk.take().is_none() {
            return;
        }
        state.paused = false;
        if let (Some(callback), Ok(channel)) = (self.on_finished.as_mut(), i32::try_from(index)) {
            callback(channel);
        }
    }
}

impl AudioBackend for HeadlessAudio {
    fn load_music(&mut self, path: &str) -> BackendResult<MusicHandle> {
        let handle = MusicHandle(self.next_handle(path, "load_music")?);
        self.music_volumes.insert(handle, 128);
        Ok(handle)
    }

    fn load_chunk(&mut self, path: &str) -> BackendResult<ChunkHandle> {
        let handle = ChunkHandle(self.next_handle(path, "load_chunk")?);
        self.chunk_volumes.insert(handle, 128);
        Ok(handle)
    }

    fn set_music_volume(&mut self, music: MusicHandle, volume: i32) {
        self.music_volumes.insert(music, volume);
    }

    fn music_volume(&self, music: MusicHandle) -> i32 {
        self.music_volumes.get(&music).copied().unwrap_or(0)
    }

    fn set_chunk_volume(&mut self, chunk: ChunkHandle, volume: i32) {
        self.chunk_volumes.insert(chunk, volume);
    }

    fn chunk_volume(&self, chunk: ChunkHandle) -> i32 {
        self.chunk_volumes.get(&chunk).copied().unwrap_or(0)
    }

    fn free_music(&mut self, music: MusicHandle) {
        if self.music == Some(music) {
            self.halt_music();
        }
        self.music_volumes.remove(&music);
    }

    fn free_chunk(&mut self, chunk: ChunkHandle) {
        for index in 0..self.channels.len() {
            if self.channels[index].chunk == Some(chunk) {
                self.finish(index);
            }
        }
        self.chunk_volumes.remove(&chunk);
    }

    fn play_music(&mut self, music: MusicHandle, _loops: i32) -> BackendResult<()> {
        if !self.music_volumes.contains_key(&music) {
            return Err(BackendError::new("play_music", "music is not loaded"));
        }
        self.music = Some(music);
        self.music_paused = false;
        Ok(())
    }

    fn pause_music(&mut self) {
        self.music_paused = self.music.is_some();
    }

    fn resume_music(&mut self) {
        self.music_paused = false;
    }

    fn rewind_music(&mut self) {}

    fn halt_music(&mut self) {
        self.music = None;
        self.music_paused = false;
    }

    fn is_music_playing(&self) -> bool {
        self.music.is_some()
    }

    fn is_music_paused(&self) -> bool {
        self.music.is_some() && self.music_paused
    }

    fn allocate_channels(&mut self, count: i32) -> i32 {
        let count = usize::try_from(count).unwrap_or(0);
        for index in count..self.channels.len() {
            self.finish(index);
        }
        self.channels.resize(count, HeadlessChannel::default());
        i32::try_from(self.channels.len()).unwrap_or(i32::MAX)
    }

    fn play_chunk(
        &mut self,
        chunk: ChunkHandle,
        channel: Option<i32>,
        _loops: i32,
    ) -> BackendResult<i32> {
        if !self.chunk_volumes.contains_key(&chunk) {
            return Err(BackendError::new("play_chunk", "chunk is not loaded"));
        }
        let index = match channel {
            None => self
                .channels
                .iter()
                .position(|c| c.chunk.is_none())
                .ok_or_else(|| BackendError::new("play_chunk", "No free channels available"))?,
            Some(_) => {
                let range = self.selected(channel);
                if range.is_empty() {
                    return Err(BackendError::new("play_chunk", "Invalid channel"));
                }
                range.start
            }
        };
        let state = &mut self.channels[index];
        state.chunk = Some(chunk);
        state.paused = false;
        i32::try_from(index).map_err(|_| BackendError::new("play_chunk", "Invalid channel"))
    }

    fn set_channel_volume(&mut self, channel: Option<i32>, volume: i32) {
        for index in self.selected(channel) {
            self.channels[index].volume = volume;
        }
    }

    fn channel_volume(&self, channel: i32) -> i32 {
        self.channel(channel).map_or(0, |c| c.volume)
    }

    fn pause_channel(&mut self, channel: Option<i32>) {
        for index in self.selected(channel) {
            let state = &mut self.channels[index];
            state.paused = state.chunk.is_some();
        }
    }

    fn resume_channel(&mut self, channel: Option<i32>) {
        for index in self.selected(channel) {
            self.channels[index].paused = false;
        }
    }

    fn halt_channel(&mut self, channel: Option<i32>) {
        for index in self.selected(channel) {
            self.finish(index);
        }
    }

    fn is_channel_playing(&self, channel: i32) -> bool {
        self.channel(channel).is_some_and(|c| c.chunk.is_some())
    }

    fn is_channel_paused(&self, channel: i32) -> bool {
        self.channel(channel)
            .is_some_and(|c| c.chunk.is_some() && c.paused)
    }

    fn set_channel_panning(&mut self, channel: i32, left: u8, right: u8) -> BackendResult<()> {
        let range = self.selected(Some(channel));
        if range.is_empty() {
            return Err(BackendError::new("set_channel_panning", "Invalid channel"));
        }
        self.channels[range.start].panning = (left, right);
        Ok(())
    }

    fn set_channel_finished(&mut self, callback: ChannelFinished) {
        self.on_finished = Some(callback);
    }
}

// ============================================================================
// CURSOR
// ============================================================================

/// Cursor state without a window.
#[derive(Debug)]
pub struct HeadlessCursor {
    visible: bool,
    active: Option<CursorHandle>,
    live: HashSet<CursorHandle>,
    next: u64,
}

impl Default for HeadlessCursor {
    fn default() -> Self {
        Self {
            visible: true,
            active: None,
            live: HashSet::new(),
            next: 0,
        }
    }
}

impl HeadlessCursor {
    /// Cursor currently set, if any.
    #[must_use]
    pub fn active(&self) -> Option<CursorHandle> {
        self.active
    }

    /// Cursors created and not yet freed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl CursorBackend for HeadlessCursor {
    fn show_cursor(&mut self, visible: Option<bool>) -> bool {
        let previous = self.visible;
        if let Some(visible) = visible {
            self.visible = visible;
        }
        previous
    }

    fn create_color_cursor(
        &mut self,
        surface: &Surface,
        hot_spot: Point,
    ) -> BackendResult<CursorHandle> {
        if hot_spot.x < 0
            || hot_spot.y < 0
            || hot_spot.x >= surface.width
            || hot_spot.y >= surface.height
        {
            return Err(BackendError::new(
                "create_color_cursor",
                format!("hot spot ({}, {}) outside the image", hot_spot.x, hot_spot.y),
            ));
        }
        self.next += 1;
        let cursor = CursorHandle(self.next);
        self.live.insert(cursor);
        Ok(cursor)
    }

    fn set_cursor(&mut self, cursor: CursorHandle) {
        self.active = Some(cursor);
    }

    fn free_cursor(&mut self, cursor: CursorHandle) {
        self.live.remove(&cursor);
        if self.active == Some(cursor) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_records_calls() {
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let log = backend.call_log();

        let texture = backend
            .create_texture_from_surface(&Surface::blank(4, 4))
            .unwrap();
        backend
            .copy(
                texture,
                Rectangle::new(0, 0, 4, 4),
                Rectangle::new(10, 10, 4, 4),
                0.0,
                Point::ZERO,
                WidgetFlip::None,
            )
            .unwrap();
        backend.present();

        assert_eq!(log.copies().len(), 1);
        assert_eq!(log.snapshot().len(), 3);
        assert_eq!(log.snapshot()[2], BackendCall::Present);
    }

    #[test]
    fn test_backend_rejects_dead_texture() {
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let texture = backend.create_target_texture(8, 8).unwrap();
        backend.destroy_texture(texture);

        assert!(backend.set_texture_alpha(texture, 10).is_err());
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_target_texture_requires_fbo_flag() {
        let mut backend = HeadlessBackend::new(RendererFlags::HARDWARE);
        assert!(backend.create_target_texture(8, 8).is_err());
    }

    #[test]
    fn test_fonts_measure() {
        let fonts = HeadlessFonts::new().failing("missing.ttf");
        assert!(fonts.open_font("missing.ttf", 20).is_err());

        let font = fonts.open_font("ok.ttf", 20).unwrap();
        assert_eq!(fonts.measure_text(font, "abcd").unwrap(), (40, 20));

        fonts.close_font(font);
        assert!(fonts.measure_text(font, "abcd").is_err());
    }

    #[test]
    fn test_decoder_sizes_and_failures() {
        let decoder = HeadlessDecoder::new(2, 2)
            .with_size("big.png", 64, 32)
            .failing("broken.png");

        assert_eq!(decoder.decode("any.png").unwrap().width, 2);
        assert_eq!(decoder.decode("big.png").unwrap().pixels.len(), 64 * 32 * 4);
        assert!(decoder.decode("broken.png").is_err());
        assert_eq!(decoder.decoded_count(), 2);
    }
}
