//! Fonts, keyed by content hash and loaded once at init.

use std::sync::Arc;

use ember_core::KeyedContainer;

use crate::backend::{FontBackend, FontHandle};
use crate::error::{RenderError, RenderResult};
use crate::manifest::FontData;

/// Open fonts.
pub struct FontContainer {
    backend: Arc<dyn FontBackend>,
    fonts: KeyedContainer<FontHandle>,
}

impl std::fmt::Debug for FontContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontContainer")
            .field("fonts", &self.fonts.len())
            .finish_non_exhaustive()
    }
}

impl FontContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new(backend: Arc<dyn FontBackend>, capacity: usize) -> Self {
        Self {
            backend,
            fonts: KeyedContainer::with_capacity(capacity),
        }
    }

    /// Reserves room for `additional` fonts.
    pub fn reserve(&self, additional: usize) {
        self.fonts.reserve(additional);
    }

    /// Opens every record. A font that fails to open is logged and skipped.
    /// `on_loaded` receives the file size of each opened font.
    pub fn load_all(
        &self,
        records: Vec<FontData>,
        resolve: impl Fn(&str) -> String,
        mut on_loaded: impl FnMut(u64),
    ) -> usize {
        let mut loaded = 0;
        for record in records {
            let path = resolve(&record.header.path);
            match self.backend.open_font(&path, record.font_size) {
                Ok(font) => {
                    if let Some(previous) = self.fonts.insert(record.header.hash_value, font, 0) {
                        self.backend.close_font(previous);
                    }
                    on_loaded(record.header.file_size);
                    loaded += 1;
                }
                Err(e) => tracing::error!("Failed to load {path} font: {e}"),
            }
        }
        loaded
    }

    /// Handle of an open font.
    #[must_use]
    pub fn get(&self, font_id: u64) -> Option<FontHandle> {
        self.fonts.get(font_id)
    }

    /// Size `text` takes when rendered with `font_id`.
    ///
    /// # Errors
    ///
    /// [`RenderError::FontNotFound`] or the backend's measurement failure.
    pub fn measure(&self, font_id: u64, text: &str) -> RenderResult<(i32, i32)> {
        let font = self.fonts.get(font_id).ok_or_else(|| {
            tracing::error!(
                "Non-existent fontId: {font_id:#018X} for text: [{text}]. Text will not be created"
            );
            RenderError::FontNotFound(font_id)
        })?;
        self.backend.measure_text(font, text).map_err(|e| {
            tracing::error!("Error in measure_text() for fontId: {font_id:#018X}: {e}");
            RenderError::from(e)
        })
    }

    /// Number of open fonts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// True if no font is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Closes every font.
    pub fn close_all(&self) {
        for (_, font) in self.fonts.drain() {
            self.backend.close_font(font);
        }
    }
}
