//! PDF rasterizer backed by the system pdfium library.

use std::path::Path;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::warn;

use crate::error::{Result, TemplarError};
use crate::render::PageRenderer;

/// Raster width every page is rendered at. Held fixed so fingerprints are
/// comparable across runs and across the bytes/path input forms.
const TARGET_WIDTH: i32 = 1024;

/// Renders PDF first pages via pdfium.
///
/// The library is bound per call; the dynamic loader caches the shared
/// object, so repeated binds are cheap.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    _private: (),
}

impl PdfiumRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&self, document: &[u8]) -> Result<Option<DynamicImage>> {
        let pdfium = Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| TemplarError::Unrenderable(format!("failed to bind pdfium: {e}")))?;

        let document = match pdfium.load_pdf_from_byte_slice(document, None) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "document failed to parse as PDF");
                return Ok(None);
            }
        };

        if document.pages().len() == 0 {
            return Ok(None);
        }

        let page = match document.pages().first() {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "first page inaccessible");
                return Ok(None);
            }
        };

        let render_config = PdfRenderConfig::new().set_target_width(TARGET_WIDTH);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| TemplarError::Unrenderable(format!("page render failed: {e}")))?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let pixels = bitmap.as_rgba_bytes();

        let image = image::RgbaImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgba8)
            .ok_or_else(|| {
                TemplarError::Unrenderable(format!(
                    "bitmap buffer did not match {width}x{height} RGBA dimensions"
                ))
            })?;

        Ok(Some(image))
    }
}

impl PageRenderer for PdfiumRenderer {
    fn render_first_page_bytes(&self, document: &[u8]) -> Result<Option<DynamicImage>> {
        self.render(document)
    }

    fn render_first_page_path(&self, path: &Path) -> Result<Option<DynamicImage>> {
        // Same code path as bytes input; pdfium sees identical content
        // either way, so the rendered page is identical.
        let bytes = std::fs::read(path)?;
        self.render(&bytes)
    }
}
