//! # Hardware Draw Translation
//!
//! Turns one [`DrawParams`] into backend calls. Stateless.
//!
//! Destination selection:
//!
//! | crop | scaling | destination |
//! |------|---------|-------------|
//! | yes  | no      | crop rect |
//! | yes  | yes     | crop rect grown to the scaled size, clipped to the crop |
//! | no   | yes     | `pos` + scaled size |
//! | no   | no      | `pos` + frame size |

use ember_shared::{Rectangle, FULL_OPACITY};

use crate::backend::{BackendResult, GraphicsBackend, TextureId};
use crate::draw_params::{DrawParams, Widget};

/// Draws `params` with `texture`.
///
/// A destination with zero width or height issues no backend call. When the
/// destination had to be clipped, the clip is reset to `monitor` afterwards.
///
/// # Errors
///
/// The first failing backend call.
pub fn draw_texture<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    texture: TextureId,
    params: &DrawParams,
    monitor: Rectangle,
) -> BackendResult<()> {
    let mut clipped = false;

    let quad = if params.has_crop() {
        let mut quad = params.frame_crop_rect;
        if params.has_scaling() {
            // crop without a common intersection
            if quad.w == 0 || quad.h == 0 {
                return Ok(());
            }
            if params.scaled_width > quad.w {
                backend.set_clip_rect(Some(quad))?;
                clipped = true;
                quad.w = params.scaled_width;
            }
            if params.scaled_height > quad.h {
                if !clipped {
                    backend.set_clip_rect(Some(quad))?;
                    clipped = true;
                }
                quad.h = params.scaled_height;
            }
        }
        quad
    } else if params.has_scaling() {
        Rectangle::new(
            params.pos.x,
            params.pos.y,
            params.scaled_width,
            params.scaled_height,
        )
    } else {
        Rectangle::new(
            params.pos.x,
            params.pos.y,
            params.frame_rect.w,
            params.frame_rect.h,
        )
    };

    let result = if quad.w == 0 || quad.h == 0 {
        Ok(())
    } else {
        backend.copy(
            texture,
            params.frame_rect,
            quad,
            params.angle,
            params.rot_center,
            params.flip(),
        )
    };

    if clipped {
        backend.set_clip_rect(Some(monitor))?;
    }
    result
}

/// Draws a widget, applying per-draw opacity to images.
///
/// Images share one texture between every widget that shows them, so a
/// non-opaque image draw is bracketed by alpha set and restore. Texts and
/// off-screen buffers own their texture and keep the alpha set through
/// `ChangeTextureOpacity`.
///
/// # Errors
///
/// The first failing backend call. The image alpha is restored even when
/// the copy fails.
pub fn draw_widget<B: GraphicsBackend + ?Sized>(
    backend: &mut B,
    texture: TextureId,
    params: &DrawParams,
    monitor: Rectangle,
) -> BackendResult<()> {
    if !matches!(params.widget(), Some(Widget::Image(_))) || params.opacity == FULL_OPACITY {
        return draw_texture(backend, texture, params, monitor);
    }

    backend.set_texture_alpha(texture, opacity_to_alpha(params.opacity))?;
    let result = draw_texture(backend, texture, params, monitor);
    backend.set_texture_alpha(texture, u8::MAX)?;
    result
}

/// Clamps an opacity to the alpha range.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn opacity_to_alpha(opacity: i32) -> u8 {
    opacity.clamp(0, FULL_OPACITY) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, HeadlessBackend, Surface};
    use crate::defines::RendererFlags;
    use ember_shared::Point;

    const MONITOR: Rectangle = Rectangle::new(0, 0, 800, 600);

    fn setup() -> (HeadlessBackend, TextureId) {
        let mut backend = HeadlessBackend::new(RendererFlags::DEFAULT);
        let texture = backend
            .create_texture_from_surface(&Surface::blank(32, 32))
            .unwrap();
        backend.call_log().clear();
        (backend, texture)
    }

    fn image(pos: Point) -> DrawParams {
        DrawParams::new(Widget::Image(1), pos, Rectangle::new(0, 0, 32, 32))
    }

    fn dst(call: &BackendCall) -> Rectangle {
        match call {
            BackendCall::Copy { dst, .. } => *dst,
            other => panic!("expected copy, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_destination() {
        let (mut backend, texture) = setup();
        draw_texture(&mut backend, texture, &image(Point::new(5, 6)), MONITOR).unwrap();

        let copies = backend.call_log().copies();
        assert_eq!(dst(&copies[0]), Rectangle::new(5, 6, 32, 32));
    }

    #[test]
    fn test_scaled_destination() {
        let (mut backend, texture) = setup();
        let params = image(Point::new(5, 6)).with_scaling(64, 16);
        draw_texture(&mut backend, texture, &params, MONITOR).unwrap();

        assert_eq!(dst(&backend.call_log().copies()[0]), Rectangle::new(5, 6, 64, 16));
    }

    #[test]
    fn test_crop_with_larger_scale_is_clipped() {
        let (mut backend, texture) = setup();
        let crop = Rectangle::new(10, 10, 20, 20);
        let params = image(Point::ZERO).with_crop(crop).with_scaling(40, 50);
        draw_texture(&mut backend, texture, &params, MONITOR).unwrap();

        let calls = backend.call_log().snapshot();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], BackendCall::SetClipRect(Some(crop)));
        assert_eq!(dst(&calls[1]), Rectangle::new(10, 10, 40, 50));
        assert_eq!(calls[2], BackendCall::SetClipRect(Some(MONITOR)));
    }

    #[test]
    fn test_degenerate_destination_issues_no_call() {
        let (mut backend, texture) = setup();
        let cropped = image(Point::ZERO).with_crop(Rectangle::new(3, 3, 0, 10));
        let scaled = image(Point::ZERO).with_scaling(10, 0);
        let empty_crop_scaled_up = image(Point::ZERO)
            .with_crop(Rectangle::new(10, 10, 0, 20))
            .with_scaling(40, 40);

        for params in [cropped, scaled, empty_crop_scaled_up] {
            draw_texture(&mut backend, texture, &params, MONITOR).unwrap();
        }
        assert!(backend.call_log().snapshot().is_empty());
    }

    #[test]
    fn test_crop_with_zero_scale_keeps_crop_size() {
        let (mut backend, texture) = setup();
        let crop = Rectangle::new(3, 3, 5, 5);
        let params = image(Point::ZERO).with_crop(crop).with_scaling(0, 7);
        draw_texture(&mut backend, texture, &params, MONITOR).unwrap();

        let calls = backend.call_log().snapshot();
        // only the height grows, so the clip is set once
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], BackendCall::SetClipRect(Some(crop)));
        assert_eq!(dst(&calls[1]), Rectangle::new(3, 3, 5, 7));
        assert_eq!(calls[2], BackendCall::SetClipRect(Some(MONITOR)));
    }

    #[test]
    fn test_opacity_isolation() {
        let (mut backend, texture) = setup();
        let first = image(Point::ZERO).with_opacity(100);
        let second = image(Point::new(40, 0)).with_opacity(30);

        draw_widget(&mut backend, texture, &first, MONITOR).unwrap();
        draw_widget(&mut backend, texture, &second, MONITOR).unwrap();

        let calls = backend.call_log().snapshot();
        let alpha = |alpha| BackendCall::SetTextureAlpha { texture, alpha };
        assert_eq!(calls.len(), 6);
        assert_eq!(calls[0], alpha(100));
        assert!(matches!(calls[1], BackendCall::Copy { .. }));
        assert_eq!(calls[2], alpha(255));
        assert_eq!(calls[3], alpha(30));
        assert!(matches!(calls[4], BackendCall::Copy { .. }));
        assert_eq!(calls[5], alpha(255));
    }

    #[test]
    fn test_text_opacity_is_not_bracketed() {
        let (mut backend, texture) = setup();
        let params = DrawParams::new(Widget::Text(0), Point::ZERO, Rectangle::new(0, 0, 8, 8))
            .with_opacity(10);
        draw_widget(&mut backend, texture, &params, MONITOR).unwrap();

        assert_eq!(backend.call_log().snapshot().len(), 1);
    }
}
