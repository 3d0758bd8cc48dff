//! # Draw Records
//!
//! One [`DrawParams`] per widget per frame. Records are plain old data: they
//! are copied by value into the state buffer and, for off-screen buffer
//! updates, byte-copied through the payload ring.

use bytemuck::{Pod, Zeroable};
use ember_shared::{Point, Rectangle, FULL_OPACITY, ZERO_ANGLE};

use crate::defines::{WidgetFlip, WidgetType};

/// What a draw record draws. Exactly one kind per record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Widget {
    /// Content-addressed image resource.
    Image(u64),
    /// Runtime text slot.
    Text(i32),
    /// Off-screen buffer slot.
    SpriteBuffer(i32),
}

impl Widget {
    /// The widget kind.
    #[must_use]
    pub const fn kind(self) -> WidgetType {
        match self {
            Self::Image(_) => WidgetType::Image,
            Self::Text(_) => WidgetType::Text,
            Self::SpriteBuffer(_) => WidgetType::SpriteBuffer,
        }
    }

    /// Raw (kind, id) pair as stored in a record.
    #[must_use]
    pub const fn to_raw(self) -> (u8, u64) {
        match self {
            Self::Image(id) => (WidgetType::Image as u8, id),
            #[allow(clippy::cast_sign_loss)]
            Self::Text(id) => (WidgetType::Text as u8, id as u32 as u64),
            #[allow(clippy::cast_sign_loss)]
            Self::SpriteBuffer(id) => (WidgetType::SpriteBuffer as u8, id as u32 as u64),
        }
    }

    /// Rebuilds a widget from a raw pair. `None` for an unknown kind.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub const fn from_raw(kind: u8, id: u64) -> Option<Self> {
        match WidgetType::from_u8(kind) {
            Some(WidgetType::Image) => Some(Self::Image(id)),
            Some(WidgetType::Text) => Some(Self::Text(id as u32 as i32)),
            Some(WidgetType::SpriteBuffer) => Some(Self::SpriteBuffer(id as u32 as i32)),
            None => None,
        }
    }
}

/// Fixed-size draw record.
///
/// Field order keeps the layout free of padding so the record is `Pod`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawParams {
    widget_id: u64,
    /// Rotation in degrees.
    pub angle: f64,
    /// Top-left destination.
    pub pos: Point,
    /// Rotation center, relative to the destination.
    pub rot_center: Point,
    /// Source rectangle inside the texture.
    pub frame_rect: Rectangle,
    /// Destination override used when cropping.
    pub frame_crop_rect: Rectangle,
    /// Destination width when scaling.
    pub scaled_width: i32,
    /// Destination height when scaling.
    pub scaled_height: i32,
    /// Opacity in [0, 255].
    pub opacity: i32,
    widget_kind: u8,
    flip: u8,
    has_crop: u8,
    has_scaling: u8,
}

impl DrawParams {
    /// Fully opaque, unrotated, unscaled record drawing `frame_rect` of
    /// `widget` at `pos`.
    #[must_use]
    pub const fn new(widget: Widget, pos: Point, frame_rect: Rectangle) -> Self {
        let (widget_kind, widget_id) = widget.to_raw();
        Self {
            widget_id,
            angle: ZERO_ANGLE,
            pos,
            rot_center: Point::new(frame_rect.w / 2, frame_rect.h / 2),
            frame_rect,
            frame_crop_rect: Rectangle::ZERO,
            scaled_width: frame_rect.w,
            scaled_height: frame_rect.h,
            opacity: FULL_OPACITY,
            widget_kind,
            flip: WidgetFlip::None as u8,
            has_crop: 0,
            has_scaling: 0,
        }
    }

    /// The widget, or `None` if the record holds an unknown kind.
    #[must_use]
    pub const fn widget(&self) -> Option<Widget> {
        Widget::from_raw(self.widget_kind, self.widget_id)
    }

    /// Retargets the record.
    pub fn set_widget(&mut self, widget: Widget) {
        (self.widget_kind, self.widget_id) = widget.to_raw();
    }

    /// Mirroring.
    #[must_use]
    pub const fn flip(&self) -> WidgetFlip {
        WidgetFlip::from_u8(self.flip)
    }

    /// True when `frame_crop_rect` is the destination.
    #[must_use]
    pub const fn has_crop(&self) -> bool {
        self.has_crop != 0
    }

    /// True when the scaled size is the destination size.
    #[must_use]
    pub const fn has_scaling(&self) -> bool {
        self.has_scaling != 0
    }

    /// Sets the opacity, clamped to [0, 255].
    #[must_use]
    pub const fn with_opacity(mut self, opacity: i32) -> Self {
        self.opacity = if opacity < 0 {
            0
        } else if opacity > FULL_OPACITY {
            FULL_OPACITY
        } else {
            opacity
        };
        self
    }

    /// Sets rotation and its center.
    #[must_use]
    pub const fn with_rotation(mut self, angle: f64, center: Point) -> Self {
        self.angle = angle;
        self.rot_center = center;
        self
    }

    /// Sets mirroring.
    #[must_use]
    pub const fn with_flip(mut self, flip: WidgetFlip) -> Self {
        self.flip = flip as u8;
        self
    }

    /// Draws into `crop` instead of at `pos`.
    #[must_use]
    pub const fn with_crop(mut self, crop: Rectangle) -> Self {
        self.frame_crop_rect = crop;
        self.has_crop = 1;
        self
    }

    /// Stretches the destination to `width` x `height`.
    #[must_use]
    pub const fn with_scaling(mut self, width: i32, height: i32) -> Self {
        self.scaled_width = width;
        self.scaled_height = height;
        self.has_scaling = 1;
        self
    }

    /// Moves the record by the frame's global offset.
    ///
    /// Uncropped records move `pos`, cropped records move the crop rect.
    /// A zero axis is left alone.
    pub fn apply_global_offset(&mut self, offset: Point) {
        let target = if self.has_crop() {
            &mut self.frame_crop_rect.x
        } else {
            &mut self.pos.x
        };
        if offset.x != 0 {
            *target += offset.x;
        }
        let target = if self.has_crop() {
            &mut self.frame_crop_rect.y
        } else {
            &mut self.pos.y
        };
        if offset.y != 0 {
            *target += offset.y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_is_padding_free() {
        assert_eq!(std::mem::size_of::<DrawParams>(), 80);
    }

    #[test]
    fn test_widget_raw_pairs() {
        for widget in [Widget::Image(u64::MAX), Widget::Text(-1), Widget::SpriteBuffer(7)] {
            let (kind, id) = widget.to_raw();
            assert_eq!(Widget::from_raw(kind, id), Some(widget));
        }
        assert_eq!(Widget::from_raw(42, 0), None);
    }

    #[test]
    fn test_builders() {
        let params = DrawParams::new(Widget::Text(3), Point::new(1, 2), Rectangle::new(0, 0, 10, 20))
            .with_opacity(300)
            .with_crop(Rectangle::new(5, 5, 4, 4))
            .with_flip(WidgetFlip::Vertical);

        assert_eq!(params.widget(), Some(Widget::Text(3)));
        assert_eq!(params.opacity, FULL_OPACITY);
        assert!(params.has_crop());
        assert!(!params.has_scaling());
        assert_eq!(params.flip(), WidgetFlip::Vertical);
        assert_eq!(params.rot_center, Point::new(5, 10));
    }

    #[test]
    fn test_global_offset_targets() {
        let frame = Rectangle::new(0, 0, 8, 8);
        let mut plain = DrawParams::new(Widget::Image(1), Point::new(10, 10), frame);
        plain.apply_global_offset(Point::new(5, 0));
        assert_eq!(plain.pos, Point::new(15, 10));

        let mut cropped = DrawParams::new(Widget::Image(1), Point::new(10, 10), frame)
            .with_crop(Rectangle::new(0, 0, 4, 4));
        cropped.apply_global_offset(Point::new(-2, 3));
        assert_eq!(cropped.pos, Point::new(10, 10));
        assert_eq!(cropped.frame_crop_rect, Rectangle::new(-2, 3, 4, 4));
    }
}
