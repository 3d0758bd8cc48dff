//! # Render Commands
//!
//! Opcodes plus their payloads, and the byte protocol that carries the
//! payloads through a frame's [`RingBuffer`].
//!
//! The layout is in-process only and uses native endianness. The consumer
//! decodes in exactly the order and types the producer wrote.

use std::borrow::Cow;

use bytemuck::Pod;
use ember_core::RingBuffer;
use ember_shared::Color;
use thiserror::Error;

use crate::defines::{BlendMode, ScreenshotContainer, WidgetType};
use crate::draw_params::{DrawParams, Widget};

/// Opcode tags, in wire order.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RendererCmd {
    ClearScreen = 0,
    FinishFrame,
    ChangeClearColor,
    LoadTextureSingle,
    LoadTextureMultiple,
    DestroyTexture,
    CreateFbo,
    DestroyFbo,
    ChangeRendererTarget,
    ResetRendererTarget,
    ClearRendererTarget,
    UpdateRendererTarget,
    ChangeTextureBlendmode,
    ChangeTextureOpacity,
    CreateTtfText,
    ReloadTtfText,
    DestroyTtfText,
    EnableDisableMultithreadTextureLoading,
    TakeScreenshot,
    ExitRenderingLoop,
}

impl RendererCmd {
    const ALL: [Self; 20] = [
        Self::ClearScreen,
        Self::FinishFrame,
        Self::ChangeClearColor,
        Self::LoadTextureSingle,
        Self::LoadTextureMultiple,
        Self::DestroyTexture,
        Self::CreateFbo,
        Self::DestroyFbo,
        Self::ChangeRendererTarget,
        Self::ResetRendererTarget,
        Self::ClearRendererTarget,
        Self::UpdateRendererTarget,
        Self::ChangeTextureBlendmode,
        Self::ChangeTextureOpacity,
        Self::CreateTtfText,
        Self::ReloadTtfText,
        Self::DestroyTtfText,
        Self::EnableDisableMultithreadTextureLoading,
        Self::TakeScreenshot,
        Self::ExitRenderingLoop,
    ];

    /// Decodes an opcode byte.
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.get(usize::from(raw)).copied()
    }
}

/// Failure while reading a payload back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The ring ran dry before the payload was complete.
    #[error("payload underflow for {opcode:?} while reading {what}")]
    Underflow {
        /// Command being decoded.
        opcode: RendererCmd,
        /// Field being read.
        what: &'static str,
    },
    /// A field held a value outside its domain.
    #[error("invalid {what} for {opcode:?}: {value}")]
    InvalidValue {
        /// Command being decoded.
        opcode: RendererCmd,
        /// Field being read.
        what: &'static str,
        /// Raw value.
        value: u64,
    },
}

/// A render command with its payload.
///
/// Producer side commands borrow their variable-size payloads; decoded
/// commands own them.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand<'a> {
    /// Clear the default target.
    ClearScreen,
    /// Draw every record, present, end the frame.
    FinishFrame {
        /// Skip the renderer lock check.
        override_lock_check: bool,
    },
    /// New clear color.
    ChangeClearColor(Color),
    /// Upload one on-demand image.
    LoadTextureSingle(u64),
    /// Upload a batch of on-demand images.
    LoadTextureMultiple {
        /// Reported back once the whole batch is uploaded.
        batch_id: i32,
        /// Images in the batch.
        ids: Cow<'a, [u64]>,
    },
    /// Free one image.
    DestroyTexture(u64),
    /// Create an off-screen buffer in a reserved slot.
    CreateFbo {
        /// Width in pixels.
        width: i32,
        /// Height in pixels.
        height: i32,
        /// Reserved slot.
        id: i32,
    },
    /// Free an off-screen buffer.
    DestroyFbo(i32),
    /// Draw into an off-screen buffer.
    ChangeRendererTarget(i32),
    /// Draw into the default target again.
    ResetRendererTarget,
    /// Clear the current target with a temporary color.
    ClearRendererTarget(Color),
    /// Draw records into the current target.
    UpdateRendererTarget(Cow<'a, [DrawParams]>),
    /// Change a texture's blend mode.
    ChangeTextureBlendmode {
        /// Target texture.
        widget: Widget,
        /// New mode.
        mode: BlendMode,
    },
    /// Change a text or off-screen buffer texture's alpha.
    ChangeTextureOpacity {
        /// Target texture.
        widget: Widget,
        /// Opacity in [0, 255].
        opacity: i32,
    },
    /// Rasterize a text into a reserved slot.
    CreateTtfText(TextPayload<'a>),
    /// Rasterize new content for an existing text.
    ReloadTtfText(TextPayload<'a>),
    /// Free a text.
    DestroyTtfText(i32),
    /// Toggle multi-threaded surface decoding.
    EnableDisableMultithreadTextureLoading(bool),
    /// Save the screen.
    TakeScreenshot {
        /// Output file.
        path: Cow<'a, str>,
        /// Image container.
        container: ScreenshotContainer,
        /// Quality for lossy containers.
        quality: i32,
    },
    /// Leave the render loop.
    ExitRenderingLoop,
}

/// Anything that appends commands to the frame being recorded.
///
/// Containers issue their creation and destruction requests through it.
pub trait CommandSink {
    /// Appends `command` with its payload. False if the frame had no room
    /// and the command was dropped.
    fn submit(&mut self, command: &RenderCommand<'_>) -> bool;
}

/// Payload shared by text creation and reload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextPayload<'a> {
    /// Text slot.
    pub id: i32,
    /// Font used to rasterize.
    pub font_id: u64,
    /// Text color.
    pub color: Color,
    /// Content.
    pub text: Cow<'a, str>,
}

const SIZE_U8: usize = 1;
const SIZE_I32: usize = 4;
const SIZE_U32: usize = 4;
const SIZE_U64: usize = 8;
const SIZE_COLOR: usize = 4;

impl RenderCommand<'_> {
    /// Opcode tag.
    #[must_use]
    pub const fn opcode(&self) -> RendererCmd {
        match self {
            Self::ClearScreen => RendererCmd::ClearScreen,
            Self::FinishFrame { .. } => RendererCmd::FinishFrame,
            Self::ChangeClearColor(_) => RendererCmd::ChangeClearColor,
            Self::LoadTextureSingle(_) => RendererCmd::LoadTextureSingle,
            Self::LoadTextureMultiple { .. } => RendererCmd::LoadTextureMultiple,
            Self::DestroyTexture(_) => RendererCmd::DestroyTexture,
            Self::CreateFbo { .. } => RendererCmd::CreateFbo,
            Self::DestroyFbo(_) => RendererCmd::DestroyFbo,
            Self::ChangeRendererTarget(_) => RendererCmd::ChangeRendererTarget,
            Self::ResetRendererTarget => RendererCmd::ResetRendererTarget,
            Self::ClearRendererTarget(_) => RendererCmd::ClearRendererTarget,
            Self::UpdateRendererTarget(_) => RendererCmd::UpdateRendererTarget,
            Self::ChangeTextureBlendmode { .. } => RendererCmd::ChangeTextureBlendmode,
            Self::ChangeTextureOpacity { .. } => RendererCmd::ChangeTextureOpacity,
            Self::CreateTtfText(_) => RendererCmd::CreateTtfText,
            Self::ReloadTtfText(_) => RendererCmd::ReloadTtfText,
            Self::DestroyTtfText(_) => RendererCmd::DestroyTtfText,
            Self::EnableDisableMultithreadTextureLoading(_) => {
                RendererCmd::EnableDisableMultithreadTextureLoading
            }
            Self::TakeScreenshot { .. } => RendererCmd::TakeScreenshot,
            Self::ExitRenderingLoop => RendererCmd::ExitRenderingLoop,
        }
    }

    /// Exact number of payload bytes [`Self::encode_payload`] writes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        match self {
            Self::ClearScreen | Self::ResetRendererTarget | Self::ExitRenderingLoop => 0,
            Self::FinishFrame { .. } | Self::EnableDisableMultithreadTextureLoading(_) => SIZE_U8,
            Self::ChangeClearColor(_) | Self::ClearRendererTarget(_) => SIZE_COLOR,
            Self::LoadTextureSingle(_) | Self::DestroyTexture(_) => SIZE_U64,
            Self::LoadTextureMultiple { ids, .. } => SIZE_U32 + SIZE_I32 + ids.len() * SIZE_U64,
            Self::CreateFbo { .. } => 3 * SIZE_I32,
            Self::DestroyFbo(_) | Self::ChangeRendererTarget(_) | Self::DestroyTtfText(_) => {
                SIZE_I32
            }
            Self::UpdateRendererTarget(records) => {
                SIZE_U32 + records.len() * std::mem::size_of::<DrawParams>()
            }
            Self::ChangeTextureBlendmode { widget, .. } => {
                2 * SIZE_U8
                    + match widget {
                        Widget::Image(_) => SIZE_U64,
                        Widget::Text(_) | Widget::SpriteBuffer(_) => SIZE_I32,
                    }
            }
            Self::ChangeTextureOpacity { .. } => SIZE_U8 + 2 * SIZE_I32,
            Self::CreateTtfText(text) | Self::ReloadTtfText(text) => {
                SIZE_I32 + SIZE_U64 + SIZE_COLOR + SIZE_U64 + text.text.len()
            }
            Self::TakeScreenshot { path, .. } => SIZE_U64 + path.len() + SIZE_U8 + SIZE_I32,
        }
    }

    /// Writes the payload into `ring`.
    ///
    /// Returns false on a short write. Callers check
    /// [`Self::payload_len`] against the free space first so a command is
    /// never half written.
    pub fn encode_payload(&self, ring: &mut RingBuffer) -> bool {
        let mut ok = true;
        let mut put = |bytes: &[u8]| ok &= ring.write(bytes) == bytes.len();
        match self {
            Self::ClearScreen | Self::ResetRendererTarget | Self::ExitRenderingLoop => {}
            Self::FinishFrame {
                override_lock_check: flag,
            }
            | Self::EnableDisableMultithreadTextureLoading(flag) => put(&[u8::from(*flag)]),
            Self::ChangeClearColor(color) | Self::ClearRendererTarget(color) => {
                put(bytemuck::bytes_of(color));
            }
            Self::LoadTextureSingle(id) | Self::DestroyTexture(id) => put(&id.to_ne_bytes()),
            Self::LoadTextureMultiple { batch_id, ids } => {
                put(&count_u32(ids.len()).to_ne_bytes());
                put(&batch_id.to_ne_bytes());
                put(bytemuck::cast_slice(ids));
            }
            Self::CreateFbo { width, height, id } => {
                put(&width.to_ne_bytes());
                put(&height.to_ne_bytes());
                put(&id.to_ne_bytes());
            }
            Self::DestroyFbo(id) | Self::ChangeRendererTarget(id) | Self::DestroyTtfText(id) => {
                put(&id.to_ne_bytes());
            }
            Self::UpdateRendererTarget(records) => {
                put(&count_u32(records.len()).to_ne_bytes());
                put(bytemuck::cast_slice(records));
            }
            Self::ChangeTextureBlendmode { widget, mode } => {
                put(&[widget.kind() as u8, *mode as u8]);
                match widget {
                    Widget::Image(id) => put(&id.to_ne_bytes()),
                    Widget::Text(id) | Widget::SpriteBuffer(id) => put(&id.to_ne_bytes()),
                }
            }
            Self::ChangeTextureOpacity { widget, opacity } => {
                put(&[widget.kind() as u8]);
                put(&opacity.to_ne_bytes());
                let id = match widget {
                    Widget::Image(_) => ember_shared::INVALID_HANDLE,
                    Widget::Text(id) | Widget::SpriteBuffer(id) => *id,
                };
                put(&id.to_ne_bytes());
            }
            Self::CreateTtfText(text) | Self::ReloadTtfText(text) => {
                put(&text.id.to_ne_bytes());
                put(&text.font_id.to_ne_bytes());
                put(bytemuck::bytes_of(&text.color));
                put(&(text.text.len() as u64).to_ne_bytes());
                put(text.text.as_bytes());
            }
            Self::TakeScreenshot {
                path,
                container,
                quality,
            } => {
                put(&(path.len() as u64).to_ne_bytes());
                put(path.as_bytes());
                put(&[*container as u8]);
                put(&quality.to_ne_bytes());
            }
        }
        ok
    }
}

impl RenderCommand<'static> {
    /// Reads the payload of `opcode` back from `ring`.
    ///
    /// # Errors
    ///
    /// [`DecodeError`] if the ring runs dry or a field is out of range. The
    /// bytes read so far are consumed.
    pub fn decode(opcode: RendererCmd, ring: &mut RingBuffer) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader { ring, opcode };
        let command = match opcode {
            RendererCmd::ClearScreen => Self::ClearScreen,
            RendererCmd::FinishFrame => Self::FinishFrame {
                override_lock_check: reader.flag("override_lock_check")?,
            },
            RendererCmd::ChangeClearColor => Self::ChangeClearColor(reader.value("color")?),
            RendererCmd::LoadTextureSingle => Self::LoadTextureSingle(reader.value("id")?),
            RendererCmd::LoadTextureMultiple => {
                let count: u32 = reader.value("count")?;
                let batch_id = reader.value("batch_id")?;
                let mut ids = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    ids.push(reader.value("id")?);
                }
                Self::LoadTextureMultiple {
                    batch_id,
                    ids: Cow::Owned(ids),
                }
            }
            RendererCmd::DestroyTexture => Self::DestroyTexture(reader.value("id")?),
            RendererCmd::CreateFbo => Self::CreateFbo {
                width: reader.value("width")?,
                height: reader.value("height")?,
                id: reader.value("id")?,
            },
            RendererCmd::DestroyFbo => Self::DestroyFbo(reader.value("id")?),
            RendererCmd::ChangeRendererTarget => Self::ChangeRendererTarget(reader.value("id")?),
            RendererCmd::ResetRendererTarget => Self::ResetRendererTarget,
            RendererCmd::ClearRendererTarget => Self::ClearRendererTarget(reader.value("color")?),
            RendererCmd::UpdateRendererTarget => {
                let count: u32 = reader.value("count")?;
                let mut records = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    records.push(reader.value::<DrawParams>("draw params")?);
                }
                Self::UpdateRendererTarget(Cow::Owned(records))
            }
            RendererCmd::ChangeTextureBlendmode => {
                let kind = reader.widget_kind()?;
                let raw_mode: u8 = reader.value("blend mode")?;
                let mode = BlendMode::from_u8(raw_mode)
                    .ok_or_else(|| reader.invalid("blend mode", u64::from(raw_mode)))?;
                let widget = match kind {
                    WidgetType::Image => Widget::Image(reader.value("id")?),
                    WidgetType::Text => Widget::Text(reader.value("id")?),
                    WidgetType::SpriteBuffer => Widget::SpriteBuffer(reader.value("id")?),
                };
                Self::ChangeTextureBlendmode { widget, mode }
            }
            RendererCmd::ChangeTextureOpacity => {
                let kind = reader.widget_kind()?;
                let opacity = reader.value("opacity")?;
                let id: i32 = reader.value("id")?;
                let widget = match kind {
                    WidgetType::Image => Widget::Image(u64::MAX),
                    WidgetType::Text => Widget::Text(id),
                    WidgetType::SpriteBuffer => Widget::SpriteBuffer(id),
                };
                Self::ChangeTextureOpacity { widget, opacity }
            }
            RendererCmd::CreateTtfText => Self::CreateTtfText(reader.text_payload()?),
            RendererCmd::ReloadTtfText => Self::ReloadTtfText(reader.text_payload()?),
            RendererCmd::DestroyTtfText => Self::DestroyTtfText(reader.value("id")?),
            RendererCmd::EnableDisableMultithreadTextureLoading => {
                Self::EnableDisableMultithreadTextureLoading(reader.flag("enabled")?)
            }
            RendererCmd::TakeScreenshot => {
                let path = reader.string("path")?;
                let raw: u8 = reader.value("container")?;
                let container = ScreenshotContainer::from_u8(raw)
                    .ok_or_else(|| reader.invalid("container", u64::from(raw)))?;
                Self::TakeScreenshot {
                    path: Cow::Owned(path),
                    container,
                    quality: reader.value("quality")?,
                }
            }
            RendererCmd::ExitRenderingLoop => Self::ExitRenderingLoop,
        };
        Ok(command)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn count_u32(len: usize) -> u32 {
    len.min(u32::MAX as usize) as u32
}

struct PayloadReader<'r> {
    ring: &'r mut RingBuffer,
    opcode: RendererCmd,
}

impl PayloadReader<'_> {
    fn value<T: Pod>(&mut self, what: &'static str) -> Result<T, DecodeError> {
        self.ring.read_value().ok_or(DecodeError::Underflow {
            opcode: self.opcode,
            what,
        })
    }

    fn flag(&mut self, what: &'static str) -> Result<bool, DecodeError> {
        Ok(self.value::<u8>(what)? != 0)
    }

    fn invalid(&self, what: &'static str, value: u64) -> DecodeError {
        DecodeError::InvalidValue {
            opcode: self.opcode,
            what,
            value,
        }
    }

    fn widget_kind(&mut self) -> Result<WidgetType, DecodeError> {
        let raw: u8 = self.value("widget kind")?;
        WidgetType::from_u8(raw).ok_or_else(|| self.invalid("widget kind", u64::from(raw)))
    }

    fn string(&mut self, what: &'static str) -> Result<String, DecodeError> {
        let len: u64 = self.value(what)?;
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.ring.len())
            .ok_or(DecodeError::Underflow {
                opcode: self.opcode,
                what,
            })?;
        let mut bytes = vec![0_u8; len];
        self.ring.read(&mut bytes);
        String::from_utf8(bytes).map_err(|e| self.invalid(what, e.utf8_error().valid_up_to() as u64))
    }

    fn text_payload(&mut self) -> Result<TextPayload<'static>, DecodeError> {
        Ok(TextPayload {
            id: self.value("id")?,
            font_id: self.value("font id")?,
            color: self.value("color")?,
            text: Cow::Owned(self.string("text")?),
        })
    }
}
