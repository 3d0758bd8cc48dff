//! Renderer enums and flag masks.

use serde::{Deserialize, Serialize};

/// Bit mask of requested renderer capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RendererFlags(u32);

impl RendererFlags {
    /// Software rasterizer.
    pub const SOFTWARE: Self = Self(1 << 0);
    /// Hardware accelerated renderer.
    pub const HARDWARE: Self = Self(1 << 1);
    /// Present synchronized with the monitor refresh rate.
    pub const VSYNC_ENABLE: Self = Self(1 << 2);
    /// Render-to-texture support, needed by off-screen buffers.
    pub const FBO_ENABLE: Self = Self(1 << 3);

    /// Every supported bit.
    pub const ALL: Self = Self(
        Self::SOFTWARE.0 | Self::HARDWARE.0 | Self::VSYNC_ENABLE.0 | Self::FBO_ENABLE.0,
    );

    /// Fallback used when a mask is rejected.
    pub const DEFAULT: Self = Self(Self::HARDWARE.0 | Self::FBO_ENABLE.0);

    /// Wraps a raw mask without validation.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Validates a raw mask. Unknown bits fall back to [`Self::DEFAULT`].
    #[must_use]
    pub fn validated(bits: u32) -> Self {
        if bits > Self::ALL.0 {
            tracing::error!(
                "Received unsupported renderer flags mask: [{bits}]. \
                 Defaulting to HARDWARE | FBO_ENABLE"
            );
            return Self::DEFAULT;
        }
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `flag` is set.
    #[must_use]
    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl Default for RendererFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::ops::BitOr for RendererFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Where render commands are executed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RendererPolicy {
    /// Commands run on the update thread at the end of each frame.
    #[default]
    SingleThreaded,
    /// A dedicated render thread blocks in the render loop until shutdown.
    MultiThreaded,
}

impl RendererPolicy {
    /// Converts a raw value. Unknown values fall back to `SingleThreaded`.
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::SingleThreaded,
            1 => Self::MultiThreaded,
            other => {
                tracing::error!(
                    "Received unsupported renderer policy: [{other}]. \
                     Defaulting to SINGLE_THREADED execution policy"
                );
                Self::SingleThreaded
            }
        }
    }

    /// Human readable policy name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SingleThreaded => "SINGLE_THREADED",
            Self::MultiThreaded => "MULTI_THREADED",
        }
    }
}

/// The kind of texture a draw record refers to.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetType {
    /// Content-addressed image resource.
    Image = 0,
    /// Runtime text texture.
    Text = 1,
    /// Off-screen render target.
    SpriteBuffer = 2,
}

impl WidgetType {
    /// Decodes the wire value.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Image),
            1 => Some(Self::Text),
            2 => Some(Self::SpriteBuffer),
            _ => None,
        }
    }
}

/// Texture blending modes.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    /// No blending.
    None = 0,
    /// Alpha blending.
    #[default]
    Blend = 1,
    /// Additive blending.
    Add = 2,
    /// Color modulation.
    Mod = 3,
}

impl BlendMode {
    /// Decodes the wire value.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Blend),
            2 => Some(Self::Add),
            3 => Some(Self::Mod),
            _ => None,
        }
    }
}

/// Mirroring applied at draw time.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WidgetFlip {
    /// Drawn as is.
    #[default]
    None = 0,
    /// Mirrored left to right.
    Horizontal = 1,
    /// Mirrored top to bottom.
    Vertical = 2,
}

impl WidgetFlip {
    /// Decodes the wire value. Unknown values draw unflipped.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Horizontal,
            2 => Self::Vertical,
            _ => Self::None,
        }
    }
}

/// Image container used for screenshots.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenshotContainer {
    /// Lossless, quality is ignored.
    Png = 0,
    /// Lossy, quality in [0, 100].
    Jpg = 1,
}

impl ScreenshotContainer {
    /// Decodes the wire value.
    #[must_use]
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Png),
            1 => Some(Self::Jpg),
            _ => None,
        }
    }
}

/// Fullscreen or windowed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowDisplayMode {
    /// Exclusive fullscreen.
    FullScreen,
    /// Regular window.
    #[default]
    Windowed,
}

/// Window decoration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowBorderMode {
    /// Decorated window.
    #[default]
    WithBorder,
    /// No decorations.
    Borderless,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_validation() {
        let mask = RendererFlags::HARDWARE | RendererFlags::VSYNC_ENABLE;
        assert_eq!(RendererFlags::validated(mask.bits()), mask);
        assert_eq!(RendererFlags::validated(0xFF), RendererFlags::DEFAULT);
        assert!(RendererFlags::DEFAULT.contains(RendererFlags::FBO_ENABLE));
        assert!(!RendererFlags::DEFAULT.contains(RendererFlags::SOFTWARE));
    }

    #[test]
    fn test_policy_from_raw() {
        assert_eq!(RendererPolicy::from_raw(1), RendererPolicy::MultiThreaded);
        assert_eq!(RendererPolicy::from_raw(7), RendererPolicy::SingleThreaded);
        assert_eq!(RendererPolicy::MultiThreaded.name(), "MULTI_THREADED");
    }

    #[test]
    fn test_wire_values() {
        assert_eq!(WidgetType::from_u8(2), Some(WidgetType::SpriteBuffer));
        assert_eq!(WidgetType::from_u8(9), None);
        assert_eq!(BlendMode::from_u8(BlendMode::Mod as u8), Some(BlendMode::Mod));
        assert_eq!(WidgetFlip::from_u8(200), WidgetFlip::None);
    }
}
