//! One owner for every container.
//!
//! Built once, populated from a manifest on the render thread before the
//! loop starts, then shared between the update thread (requests) and the
//! render thread (textures).

use std::sync::Arc;

use ember_shared::Color;

use super::fbo::FboContainer;
use super::font::FontContainer;
use super::mixer::SoundMixer;
use super::resource::ResourceContainer;
use super::sound::SoundContainer;
use super::text::{LoadedText, TextContainer};
use crate::backend::{AudioBackend, FontBackend, GraphicsBackend, SurfaceDecoder};
use crate::command::CommandSink;
use crate::config::ContainersConfig;
use crate::error::RenderResult;
use crate::loading_screen::LoadingScreen;
use crate::manifest::ManifestReader;

/// What [`Containers::populate`] loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    /// Sounds loaded.
    pub sounds: usize,
    /// Fonts opened.
    pub fonts: usize,
    /// Images stored, whatever their load type.
    pub resources_stored: usize,
    /// `ON_INIT` images uploaded.
    pub resources_uploaded: usize,
    /// Bytes the loading screen accounted for.
    pub total_bytes: u64,
}

/// Every container plus the configuration they were built from.
pub struct Containers {
    config: ContainersConfig,
    decoder: Arc<dyn SurfaceDecoder>,
    resources: ResourceContainer,
    fonts: FontContainer,
    sounds: SoundContainer,
    texts: TextContainer,
    fbos: FboContainer,
}

impl std::fmt::Debug for Containers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Containers")
            .field("resources", &self.resources)
            .field("fonts", &self.fonts)
            .field("sounds", &self.sounds)
            .field("texts", &self.texts)
            .field("fbos", &self.fbos)
            .finish_non_exhaustive()
    }
}

impl Containers {
    /// Builds empty containers.
    ///
    /// # Errors
    ///
    /// [`crate::RenderError::InvalidConfig`] for a zero capacity.
    pub fn new(
        config: ContainersConfig,
        decoder: Arc<dyn SurfaceDecoder>,
        font_backend: Arc<dyn FontBackend>,
        audio_backend: Box<dyn AudioBackend>,
    ) -> RenderResult<Self> {
        let config = config.validated()?;
        Ok(Self {
            resources: ResourceContainer::new(
                Arc::clone(&decoder),
                config.resources_folder.clone(),
                config.max_resource_loading_threads,
                0,
            ),
            fonts: FontContainer::new(font_backend, 0),
            sounds: SoundContainer::new(audio_backend, 0, 0),
            texts: TextContainer::new(config.max_runtime_texts),
            fbos: FboContainer::new(config.max_runtime_sprite_buffers),
            decoder,
            config,
        })
    }

    /// Reads the whole manifest and loads sounds, fonts and `ON_INIT`
    /// images, in that order, with the loading screen showing progress.
    /// Must run on the render thread.
    ///
    /// Sounds and fonts that fail are skipped; an image failure is fatal.
    ///
    /// # Errors
    ///
    /// Unreadable headers, a loading screen failure, or an image failure.
    pub fn populate<B: GraphicsBackend + ?Sized>(
        &self,
        manifest: &mut dyn ManifestReader,
        backend: &mut B,
    ) -> RenderResult<PopulateReport> {
        let headers = manifest.read_engine_bin_headers().map_err(|e| {
            tracing::error!("Error in read_engine_bin_headers() -> Terminating ...");
            e
        })?;
        self.sounds
            .reserve(headers.musics_count, headers.chunks_count);
        self.fonts.reserve(headers.fonts_count);
        self.resources
            .reserve(headers.static_widgets_count + headers.dynamic_widgets_count);

        let total_bytes = headers.total_init_file_size();
        let mut screen = LoadingScreen::new(self.config.loading_screen.clone());
        screen.init(backend, self.decoder.as_ref(), total_bytes)?;

        let resolve = |path: &str| self.config.resolve_path(path);
        let mut report = PopulateReport {
            total_bytes,
            ..PopulateReport::default()
        };

        let sounds = std::iter::from_fn(|| manifest.read_sound_chunk()).collect();
        report.sounds = self.sounds.load_all(sounds, resolve, |bytes| {
            screen.on_new_resource_loaded(backend, bytes);
        });

        let fonts = std::iter::from_fn(|| manifest.read_font_chunk()).collect();
        report.fonts = self.fonts.load_all(fonts, resolve, |bytes| {
            screen.on_new_resource_loaded(backend, bytes);
        });

        while let Some(record) = manifest.read_resource_chunk() {
            self.resources.store(record);
            report.resources_stored += 1;
        }
        let uploaded = self.resources.load_all_stored(backend, |backend, bytes| {
            screen.on_new_resource_loaded(backend, bytes);
        });
        screen.deinit(backend);
        report.resources_uploaded = uploaded?;

        tracing::info!(
            "Containers populated: {} sounds, {} fonts, {} images ({} uploaded)",
            report.sounds,
            report.fonts,
            report.resources_stored,
            report.resources_uploaded
        );
        Ok(report)
    }

    // ========================================================================
    // UPDATE THREAD REQUESTS
    // ========================================================================

    /// See [`TextContainer::load_text`].
    ///
    /// # Errors
    ///
    /// As [`TextContainer::load_text`].
    pub fn load_text(
        &self,
        sink: &mut dyn CommandSink,
        font_id: u64,
        text: &str,
        color: Color,
    ) -> RenderResult<LoadedText> {
        self.texts
            .load_text(&self.fonts, sink, font_id, text, color)
    }

    /// See [`TextContainer::reload_text`].
    ///
    /// # Errors
    ///
    /// As [`TextContainer::reload_text`].
    pub fn reload_text(
        &self,
        sink: &mut dyn CommandSink,
        id: i32,
        font_id: u64,
        text: &str,
        color: Color,
    ) -> RenderResult<(i32, i32)> {
        self.texts
            .reload_text(&self.fonts, sink, id, font_id, text, color)
    }

    /// See [`TextContainer::unload_text`].
    ///
    /// # Errors
    ///
    /// As [`TextContainer::unload_text`].
    pub fn unload_text(&self, sink: &mut dyn CommandSink, id: i32) -> RenderResult<()> {
        self.texts.unload_text(sink, id)
    }

    /// See [`FboContainer::create`].
    ///
    /// # Errors
    ///
    /// As [`FboContainer::create`].
    pub fn create_fbo(&self, sink: &mut dyn CommandSink, width: i32, height: i32) -> RenderResult<i32> {
        self.fbos.create(sink, width, height)
    }

    /// See [`FboContainer::destroy`].
    ///
    /// # Errors
    ///
    /// As [`FboContainer::destroy`].
    pub fn destroy_fbo(&self, sink: &mut dyn CommandSink, id: i32) -> RenderResult<()> {
        self.fbos.destroy(sink, id)
    }

    /// See [`ResourceContainer::load_on_demand`].
    ///
    /// # Errors
    ///
    /// As [`ResourceContainer::load_on_demand`].
    pub fn load_resource(&self, sink: &mut dyn CommandSink, id: u64) -> RenderResult<()> {
        self.resources.load_on_demand(sink, id)
    }

    /// See [`ResourceContainer::load_on_demand_multiple`].
    ///
    /// # Errors
    ///
    /// As [`ResourceContainer::load_on_demand_multiple`].
    pub fn load_resources(
        &self,
        sink: &mut dyn CommandSink,
        ids: &[u64],
        batch_id: i32,
    ) -> RenderResult<()> {
        self.resources.load_on_demand_multiple(sink, ids, batch_id)
    }

    /// See [`ResourceContainer::unload_on_demand`].
    ///
    /// # Errors
    ///
    /// As [`ResourceContainer::unload_on_demand`].
    pub fn unload_resource(&self, sink: &mut dyn CommandSink, id: u64) -> RenderResult<()> {
        self.resources.unload_on_demand(sink, id)
    }

    /// See [`ResourceContainer::unload_on_demand_multiple`].
    ///
    /// # Errors
    ///
    /// As [`ResourceContainer::unload_on_demand_multiple`].
    pub fn unload_resources(&self, sink: &mut dyn CommandSink, ids: &[u64]) -> RenderResult<()> {
        self.resources.unload_on_demand_multiple(sink, ids)
    }

    /// See [`ResourceContainer::set_multithreaded`].
    ///
    /// # Errors
    ///
    /// As [`ResourceContainer::set_multithreaded`].
    pub fn set_multithread_texture_loading(
        &self,
        sink: &mut dyn CommandSink,
        enable: bool,
    ) -> RenderResult<()> {
        self.resources.set_multithreaded(sink, enable)
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Image records and textures.
    #[must_use]
    pub fn resources(&self) -> &ResourceContainer {
        &self.resources
    }

    /// Open fonts.
    #[must_use]
    pub fn fonts(&self) -> &FontContainer {
        &self.fonts
    }

    /// Loaded sounds.
    #[must_use]
    pub fn sounds(&self) -> &SoundContainer {
        &self.sounds
    }

    /// Playback control over the loaded sounds.
    #[must_use]
    pub fn mixer(&self) -> SoundMixer<'_> {
        self.sounds.mixer()
    }

    /// Runtime texts.
    #[must_use]
    pub fn texts(&self) -> &TextContainer {
        &self.texts
    }

    /// Off-screen buffers.
    #[must_use]
    pub fn fbos(&self) -> &FboContainer {
        &self.fbos
    }

    /// Configuration the containers were built from.
    #[must_use]
    pub fn config(&self) -> &ContainersConfig {
        &self.config
    }

    /// GPU bytes held by images, texts and off-screen buffers.
    #[must_use]
    pub fn gpu_memory_usage(&self) -> u64 {
        self.resources.memory_usage() + self.texts.memory_usage() + self.fbos.memory_usage()
    }

    /// Frees everything. Must run on the render thread after the loop ended.
    pub fn deinit<B: GraphicsBackend + ?Sized>(&self, backend: &mut B) {
        self.resources.deinit(backend);
        for texture in self.texts.drain() {
            backend.destroy_texture(texture);
        }
        for texture in self.fbos.drain() {
            backend.destroy_texture(texture);
        }
        self.fonts.close_all();
        self.sounds.free_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessAudio, HeadlessBackend, HeadlessDecoder, HeadlessFonts};
    use crate::command::{RenderCommand, RendererCmd};
    use crate::defines::RendererFlags;
    use crate::error::RenderError;
    use crate::manifest::{resource_id, TomlManifest};

    const MANIFEST: &str = r#"
        [[resources]]
        path = "bg.png"
        file_size = 400
        image_rect = { x = 0, y = 0, w = 64, h = 32 }

        [[resources]]
        path = "late.png"
        file_size = 100
        image_rect = { x = 0, y = 0, w = 8, h = 8 }
        load_type = "ON_DEMAND"

        [[fonts]]
        path = "mono.ttf"
        file_size = 50
        font_size = 20

        [[sounds]]
        path = "theme.ogg"
        file_size = 70
        sound_type = "MUSIC"
        sound_level = "MEDIUM"

        [[sounds]]
        path = "click.wav"
        file_size = 10
        sound_type = "CHUNK"
        sound_level = "UNKNOWN"
    "#;

    struct Opcodes(Vec<RendererCmd>);

    impl CommandSink for Opcodes {
        fn submit(&mut self, command: &RenderCommand<'_>) -> bool {
            self.0.push(command.opcode());
            true
        }
    }

    fn containers(config: ContainersConfig) -> Containers {
        Containers::new(
            config,
            Arc::new(HeadlessDecoder::new(64, 32)),
            Arc::new(HeadlessFonts::new()),
            Box::new(HeadlessAudio::new()),
        )
        .unwrap()
    }

    fn single_core() -> ContainersConfig {
        ContainersConfig {
            resources_folder: "assets/".to_string(),
            max_resource_loading_threads: 1,
            max_runtime_texts: 2,
            max_runtime_sprite_buffers: 1,
            ..ContainersConfig::default()
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = ContainersConfig {
            max_runtime_texts: 0,
            ..ContainersConfig::default()
        };
        let result = Containers::new(
            config,
            Arc::new(HeadlessDecoder::new(1, 1)),
            Arc::new(HeadlessFonts::new()),
            Box::new(HeadlessAudio::new()),
        );
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
    }

    #[test]
    fn test_populate_from_manifest() {
        let containers = containers(single_core());
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let mut manifest = TomlManifest::from_toml_str(MANIFEST).unwrap();

        let report = containers.populate(&mut manifest, &mut backend).unwrap();

        assert_eq!(report.sounds, 1);
        assert_eq!(report.fonts, 1);
        assert_eq!(report.resources_stored, 2);
        assert_eq!(report.resources_uploaded, 1);
        assert!(containers.resources().get(resource_id("bg.png")).is_some());
        assert_eq!(containers.gpu_memory_usage(), 64 * 32 * 4);
        assert!(containers.sounds().music(resource_id("theme.ogg")).is_ok());
        assert!(containers.sounds().chunk(resource_id("click.wav")).is_err());

        containers.deinit(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_text_and_fbo_requests() {
        let containers = containers(single_core());
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let mut manifest = TomlManifest::from_toml_str(MANIFEST).unwrap();
        containers.populate(&mut manifest, &mut backend).unwrap();
        let font = resource_id("mono.ttf");
        let mut sink = Opcodes(Vec::new());

        let text = containers
            .load_text(&mut sink, font, "abc", Color::WHITE)
            .unwrap();
        assert_eq!((text.width, text.height), (30, 20));
        assert_eq!(
            containers.load_text(&mut sink, 7, "abc", Color::WHITE),
            Err(RenderError::FontNotFound(7))
        );

        let fbo = containers.create_fbo(&mut sink, 32, 32).unwrap();
        assert!(matches!(
            containers.create_fbo(&mut sink, 32, 32),
            Err(RenderError::CapacityExhausted { .. })
        ));
        containers.destroy_fbo(&mut sink, fbo).unwrap();
        containers.unload_text(&mut sink, text.id).unwrap();
        assert_eq!(
            containers.unload_text(&mut sink, -1),
            Err(RenderError::InvalidHandle(-1))
        );

        assert_eq!(
            sink.0,
            vec![
                RendererCmd::CreateTtfText,
                RendererCmd::CreateFbo,
                RendererCmd::DestroyFbo,
                RendererCmd::DestroyTtfText,
            ]
        );
    }
}
