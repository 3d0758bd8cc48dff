//! Mouse cursor context.

use std::sync::Arc;

use ember_shared::Point;

use crate::backend::{CursorBackend, CursorHandle, SurfaceDecoder};
use crate::error::RenderResult;

/// Owns the cursor backend and every custom cursor it created.
pub struct CursorContext<C: CursorBackend> {
    backend: C,
    decoder: Arc<dyn SurfaceDecoder>,
    custom: Vec<CursorHandle>,
}

impl<C: CursorBackend> CursorContext<C> {
    /// Wraps `backend`. Images are decoded with `decoder`.
    pub fn new(backend: C, decoder: Arc<dyn SurfaceDecoder>) -> Self {
        Self {
            backend,
            decoder,
            custom: Vec::new(),
        }
    }

    /// Shows or hides the cursor. Returns the previous visibility.
    pub fn toggle(&mut self, visible: bool) -> bool {
        self.backend.show_cursor(Some(visible))
    }

    /// Current visibility.
    pub fn is_visible(&mut self) -> bool {
        self.backend.show_cursor(None)
    }

    /// Builds a cursor from the image at `path` and makes it active.
    /// `(click_x, click_y)` is the pixel that registers clicks.
    ///
    /// # Errors
    ///
    /// A decode failure or a hot spot the backend rejects.
    pub fn create_cursor_from_img(
        &mut self,
        path: &str,
        click_x: i32,
        click_y: i32,
    ) -> RenderResult<CursorHandle> {
        let surface = self.decoder.decode(path).map_err(|e| {
            tracing::error!("Error, could not load cursor image {path}: {e}");
            e
        })?;
        let cursor = self
            .backend
            .create_color_cursor(&surface, Point::new(click_x, click_y))
            .map_err(|e| {
                tracing::error!("Error in create_color_cursor() for {path}: {e}");
                e
            })?;

        self.backend.set_cursor(cursor);
        self.custom.push(cursor);
        Ok(cursor)
    }

    /// Frees a custom cursor. Unknown handles are ignored.
    pub fn free_cursor(&mut self, cursor: CursorHandle) {
        if let Some(position) = self.custom.iter().position(|&owned| owned == cursor) {
            self.custom.swap_remove(position);
            self.backend.free_cursor(cursor);
        }
    }

    /// Underlying backend.
    pub fn backend(&self) -> &C {
        &self.backend
    }
}

impl<C: CursorBackend> Drop for CursorContext<C> {
    fn drop(&mut self) {
        for cursor in self.custom.drain(..) {
            self.backend.free_cursor(cursor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HeadlessCursor, HeadlessDecoder};

    fn context() -> CursorContext<HeadlessCursor> {
        CursorContext::new(
            HeadlessCursor::default(),
            Arc::new(HeadlessDecoder::new(16, 16).failing("missing.png")),
        )
    }

    #[test]
    fn test_toggle_reports_previous() {
        let mut cursor = context();
        assert!(cursor.toggle(false));
        assert!(!cursor.is_visible());
        assert!(!cursor.toggle(true));
        assert!(cursor.is_visible());
    }

    #[test]
    fn test_custom_cursor_lifecycle() {
        let mut cursor = context();
        let handle = cursor.create_cursor_from_img("arrow.png", 2, 3).unwrap();
        assert_eq!(cursor.backend().active(), Some(handle));

        cursor.free_cursor(handle);
        assert_eq!(cursor.backend().live_count(), 0);
        assert_eq!(cursor.backend().active(), None);
    }

    #[test]
    fn test_invalid_cursor_requests() {
        let mut cursor = context();
        assert!(cursor.create_cursor_from_img("missing.png", 0, 0).is_err());
        assert!(cursor.create_cursor_from_img("arrow.png", 16, 0).is_err());
        assert_eq!(cursor.backend().live_count(), 0);
    }
}
