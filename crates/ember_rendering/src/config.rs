//! # Renderer and Container Configuration
//!
//! Loaded once at startup, usually from TOML:
//!
//! ```toml
//! execution_policy = "MULTI_THREADED"
//! flags = 10
//! max_runtime_widgets = 2048
//!
//! [window]
//! name = "demo"
//! width = 1920
//! height = 1080
//! ```

use serde::{Deserialize, Serialize};

use ember_shared::{Point, Rectangle};

use crate::defines::{RendererFlags, RendererPolicy, WindowBorderMode, WindowDisplayMode};
use crate::error::{RenderError, RenderResult};

/// Texture filtering used when scaling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleQuality {
    /// Nearest pixel sampling.
    #[default]
    Nearest,
    /// Linear filtering.
    Linear,
    /// Anisotropic filtering where supported.
    Best,
}

/// Window and monitor description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorWindowConfig {
    /// Window title.
    pub name: String,
    /// Optional window icon image.
    pub icon_path: Option<String>,
    /// `None` centers the window.
    pub pos: Option<Point>,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Fullscreen or windowed.
    pub display_mode: WindowDisplayMode,
    /// Decorations.
    pub border_mode: WindowBorderMode,
}

impl MonitorWindowConfig {
    /// Monitor rectangle anchored at the origin.
    #[must_use]
    pub const fn monitor_rect(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width, self.height)
    }
}

impl Default for MonitorWindowConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            icon_path: None,
            pos: None,
            width: 1920,
            height: 1080,
            display_mode: WindowDisplayMode::Windowed,
            border_mode: WindowBorderMode::WithBorder,
        }
    }
}

/// Configuration of the render pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Window the renderer draws into.
    pub window: MonitorWindowConfig,
    /// Requested renderer capabilities.
    pub flags: RendererFlags,
    /// Where commands are executed.
    pub execution_policy: RendererPolicy,
    /// Draw records per frame.
    pub max_runtime_widgets: usize,
    /// Opcodes per frame.
    pub max_runtime_renderer_commands: usize,
    /// Payload bytes per frame.
    pub max_renderer_back_buffer_data_size: usize,
    /// Texture filtering.
    pub scale_quality: ScaleQuality,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            window: MonitorWindowConfig::default(),
            flags: RendererFlags::DEFAULT,
            execution_policy: RendererPolicy::SingleThreaded,
            max_runtime_widgets: 2048,
            max_runtime_renderer_commands: 1024,
            max_renderer_back_buffer_data_size: 1 << 20,
            scale_quality: ScaleQuality::Nearest,
        }
    }
}

impl RendererConfig {
    /// Small single-threaded preset for running without a window.
    #[must_use]
    pub const fn headless() -> Self {
        Self {
            window: MonitorWindowConfig {
                name: String::new(),
                icon_path: None,
                pos: None,
                width: 800,
                height: 600,
                display_mode: WindowDisplayMode::Windowed,
                border_mode: WindowBorderMode::Borderless,
            },
            flags: RendererFlags::DEFAULT,
            execution_policy: RendererPolicy::SingleThreaded,
            max_runtime_widgets: 256,
            max_runtime_renderer_commands: 256,
            max_renderer_back_buffer_data_size: 64 * 1024,
            scale_quality: ScaleQuality::Nearest,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] on malformed TOML or a rejected value.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| RenderError::InvalidConfig(format!("renderer config: {e}")))?;
        config.validated()
    }

    /// Rejects zero capacities and an empty monitor. An unsupported flags
    /// mask is logged and replaced with the default.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] naming the first rejected field.
    pub fn validated(mut self) -> RenderResult<Self> {
        if self.max_runtime_widgets == 0 {
            return Err(RenderError::InvalidConfig(
                "max_runtime_widgets must be greater than 0".to_string(),
            ));
        }
        if self.max_runtime_renderer_commands == 0 {
            return Err(RenderError::InvalidConfig(
                "max_runtime_renderer_commands must be greater than 0".to_string(),
            ));
        }
        if self.max_renderer_back_buffer_data_size == 0 {
            return Err(RenderError::InvalidConfig(
                "max_renderer_back_buffer_data_size must be greater than 0".to_string(),
            ));
        }
        if self.window.width <= 0 || self.window.height <= 0 {
            return Err(RenderError::InvalidConfig(format!(
                "invalid monitor size {}x{}",
                self.window.width, self.window.height
            )));
        }
        self.flags = RendererFlags::validated(self.flags.bits());
        Ok(self)
    }
}

/// Whether a loading screen is drawn while ON_INIT resources load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingScreenUsage {
    /// Draw progress.
    Enabled,
    /// Load silently.
    #[default]
    Disabled,
}

/// Loading screen images.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingScreenConfig {
    /// Full screen background.
    pub background_image_path: String,
    /// Filled part of the progress bar.
    pub progress_bar_on_image_path: String,
    /// Remaining part of the progress bar.
    pub progress_bar_off_image_path: String,
    /// Monitor width the background is stretched to.
    pub monitor_width: i32,
    /// Monitor height the background is stretched to.
    pub monitor_height: i32,
    /// Enabled or disabled.
    pub usage: LoadingScreenUsage,
}

/// Configuration of the resource containers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainersConfig {
    /// Loading screen shown during init.
    pub loading_screen: LoadingScreenConfig,
    /// Prefix joined with every manifest path.
    pub resources_folder: String,
    /// 1 loads on the calling thread, 0 uses every hardware thread.
    pub max_resource_loading_threads: usize,
    /// Text slots.
    pub max_runtime_texts: usize,
    /// Off-screen buffer slots.
    pub max_runtime_sprite_buffers: usize,
}

impl Default for ContainersConfig {
    fn default() -> Self {
        Self {
            loading_screen: LoadingScreenConfig::default(),
            resources_folder: String::new(),
            max_resource_loading_threads: 0,
            max_runtime_texts: 256,
            max_runtime_sprite_buffers: 32,
        }
    }
}

impl ContainersConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] on malformed TOML or a rejected value.
    pub fn from_toml_str(source: &str) -> RenderResult<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| RenderError::InvalidConfig(format!("containers config: {e}")))?;
        config.validated()
    }

    /// Rejects zero capacities.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidConfig`] naming the first rejected field.
    pub fn validated(self) -> RenderResult<Self> {
        if self.max_runtime_texts == 0 {
            return Err(RenderError::InvalidConfig(
                "max_runtime_texts must be greater than 0".to_string(),
            ));
        }
        if self.max_runtime_sprite_buffers == 0 {
            return Err(RenderError::InvalidConfig(
                "max_runtime_sprite_buffers must be greater than 0".to_string(),
            ));
        }
        Ok(self)
    }

    /// Joins `path` onto the resources folder.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> String {
        join_resource_path(&self.resources_folder, path)
    }
}

pub(crate) fn join_resource_path(folder: &str, path: &str) -> String {
    if folder.is_empty() {
        return path.to_owned();
    }
    let folder = folder.trim_end_matches('/');
    format!("{folder}/{path}")
}
