//! Progress bar shown while init resources load.
//!
//! Drawn straight through the backend on the loading thread, outside the
//! frame pipeline. Redraws only when the whole-number percentage changes.

use ember_shared::{Point, Rectangle, ZERO_ANGLE};

use crate::backend::{BackendResult, GraphicsBackend, SurfaceDecoder, TextureId};
use crate::config::{LoadingScreenConfig, LoadingScreenUsage};
use crate::defines::{RendererFlags, WidgetFlip};
use crate::error::RenderResult;

/// Left edge of the progress bar.
pub const PROGRESS_BAR_X: i32 = 1150;
/// Top edge of the progress bar.
pub const PROGRESS_BAR_Y: i32 = 300;
/// Progress bar height.
pub const PROGRESS_BAR_HEIGHT: i32 = 60;
/// Bar pixels per percent.
pub const PIXELS_PER_PERCENT: i32 = 5;

#[derive(Clone, Copy, Debug)]
struct ScreenTexture {
    texture: TextureId,
    size: Rectangle,
}

#[derive(Clone, Copy, Debug)]
struct ScreenTextures {
    background: ScreenTexture,
    bar_on: ScreenTexture,
    bar_off: ScreenTexture,
}

/// Loading progress context.
#[derive(Debug)]
pub struct LoadingScreen {
    config: LoadingScreenConfig,
    total_bytes: u64,
    loaded_bytes: u64,
    last_percent: i32,
    textures: Option<ScreenTextures>,
}

impl LoadingScreen {
    /// Creates an inactive screen.
    #[must_use]
    pub fn new(config: LoadingScreenConfig) -> Self {
        Self {
            config,
            total_bytes: 0,
            loaded_bytes: 0,
            last_percent: 0,
            textures: None,
        }
    }

    /// Uploads the three images and draws 0%. A disabled screen, or one on
    /// a software renderer, stays inactive.
    ///
    /// # Errors
    ///
    /// The first failing decode or upload.
    pub fn init<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        decoder: &dyn SurfaceDecoder,
        total_bytes: u64,
    ) -> RenderResult<()> {
        if self.config.usage == LoadingScreenUsage::Disabled {
            return Ok(());
        }
        if backend.renderer_info().flags.contains(RendererFlags::SOFTWARE) {
            tracing::warn!(
                "Loading screen and loading progress bar are not supported for Software renderer!"
            );
            return Ok(());
        }

        self.total_bytes = total_bytes;
        self.loaded_bytes = 0;
        self.last_percent = 0;

        let paths = [
            &self.config.background_image_path,
            &self.config.progress_bar_on_image_path,
            &self.config.progress_bar_off_image_path,
        ];
        let mut uploaded = Vec::with_capacity(paths.len());
        for path in paths {
            match upload(backend, decoder, path) {
                Ok(texture) => uploaded.push(texture),
                Err(e) => {
                    for texture in uploaded {
                        backend.destroy_texture(texture.texture);
                    }
                    return Err(e);
                }
            }
        }

        self.textures = Some(ScreenTextures {
            background: uploaded[0],
            bar_on: uploaded[1],
            bar_off: uploaded[2],
        });
        self.draw(backend, 0);
        Ok(())
    }

    /// True between a successful [`LoadingScreen::init`] and
    /// [`LoadingScreen::deinit`].
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.textures.is_some()
    }

    /// Last drawn percentage.
    #[must_use]
    pub const fn percent(&self) -> i32 {
        self.last_percent
    }

    /// Accounts `bytes` and redraws if the percentage moved.
    pub fn on_new_resource_loaded<B: GraphicsBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        bytes: u64,
    ) {
        if self.textures.is_none() || self.total_bytes == 0 {
            return;
        }

        self.loaded_bytes += bytes;
        let percent = loaded_percent(self.loaded_bytes, self.total_bytes);
        if percent != self.last_percent {
            self.last_percent = percent;
            self.draw(backend, percent);
        }
    }

    fn draw<B: GraphicsBackend + ?Sized>(&self, backend: &mut B, percent: i32) {
        if let Err(e) = self.try_draw(backend, percent) {
            tracing::error!("Error drawing the loading screen: {e}");
        }
    }

    fn try_draw<B: GraphicsBackend + ?Sized>(
        &self,
        backend: &mut B,
        percent: i32,
    ) -> BackendResult<()> {
        let Some(textures) = self.textures else {
            return Ok(());
        };

        backend.clear()?;
        let screen = Rectangle::new(0, 0, self.config.monitor_width, self.config.monitor_height);
        blit(backend, textures.background, screen)?;

        let loaded_width = PIXELS_PER_PERCENT * percent;
        let mut bar = Rectangle::new(
            PROGRESS_BAR_X,
            PROGRESS_BAR_Y,
            loaded_width,
            PROGRESS_BAR_HEIGHT,
        );
        if bar.w > 0 {
            blit(backend, textures.bar_on, bar)?;
        }

        bar.x += loaded_width;
        bar.w = (100 - percent) * PIXELS_PER_PERCENT;
        if bar.w > 0 {
            blit(backend, textures.bar_off, bar)?;
        }

        backend.present();
        Ok(())
    }

    /// Frees the three textures.
    pub fn deinit<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        if let Some(textures) = self.textures.take() {
            backend.destroy_texture(textures.background.texture);
            backend.destroy_texture(textures.bar_on.texture);
            backend.destroy_texture(textures.bar_off.texture);
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn loaded_percent(loaded: u64, total: u64) -> i32 {
    ((loaded as f64 / total as f64) * 100.0).min(100.0) as i32
}

fn upload<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    decoder: &dyn SurfaceDecoder,
    path: &str,
) -> RenderResult<ScreenTexture> {
    let surface = decoder.decode(path).map_err(|e| {
        tracing::error!("Error, could not load loading screen image {path}: {e}");
        e
    })?;
    let texture = backend.create_texture_from_surface(&surface)?;
    Ok(ScreenTexture {
        texture,
        size: Rectangle::new(0, 0, surface.width, surface.height),
    })
}

fn blit<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    texture: ScreenTexture,
    dst: Rectangle,
) -> BackendResult<()> {
    backend.copy(
        texture.texture,
        texture.size,
        dst,
        ZERO_ANGLE,
        Point::new(dst.w / 2, dst.h / 2),
        WidgetFlip::None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, HeadlessBackend, HeadlessDecoder};

    fn enabled_config() -> LoadingScreenConfig {
        LoadingScreenConfig {
            background_image_path: "bg.png".to_string(),
            progress_bar_on_image_path: "on.png".to_string(),
            progress_bar_off_image_path: "off.png".to_string(),
            monitor_width: 1920,
            monitor_height: 1080,
            usage: LoadingScreenUsage::Enabled,
        }
    }

    #[test]
    fn test_disabled_screen_is_noop() {
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let decoder = HeadlessDecoder::new(8, 8);
        let mut screen = LoadingScreen::new(LoadingScreenConfig::default());

        screen.init(&mut backend, &decoder, 100).unwrap();
        screen.on_new_resource_loaded(&mut backend, 50);

        assert!(!screen.is_active());
        assert!(backend.call_log().snapshot().is_empty());
    }

    #[test]
    fn test_redraw_only_on_percent_change() {
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let log = backend.call_log();
        let decoder = HeadlessDecoder::new(8, 8);
        let mut screen = LoadingScreen::new(enabled_config());

        screen.init(&mut backend, &decoder, 1000).unwrap();
        let presents = || log.count(|call| matches!(call, BackendCall::Present));
        assert_eq!(presents(), 1);

        screen.on_new_resource_loaded(&mut backend, 5);
        assert_eq!(presents(), 1);

        screen.on_new_resource_loaded(&mut backend, 495);
        assert_eq!(screen.percent(), 50);
        assert_eq!(presents(), 2);

        let copies = log.copies();
        let Some(BackendCall::Copy { dst, .. }) = copies.last() else {
            panic!("expected a copy");
        };
        assert_eq!(*dst, Rectangle::new(PROGRESS_BAR_X + 250, PROGRESS_BAR_Y, 250, 60));

        screen.deinit(&mut backend);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_failed_image_frees_uploaded_ones() {
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let decoder = HeadlessDecoder::new(8, 8).failing("off.png");
        let mut screen = LoadingScreen::new(enabled_config());

        assert!(screen.init(&mut backend, &decoder, 10).is_err());
        assert_eq!(backend.live_textures(), 0);
    }
}
