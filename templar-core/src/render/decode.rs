//! Renderer that treats the document payload as an already-encoded image.
//!
//! Useful for buckets that store page scans (PNG/JPEG) rather than PDFs,
//! and as the deterministic renderer in tests — no external rasterizer
//! library is involved.

use image::DynamicImage;

use crate::error::Result;
use crate::render::PageRenderer;

#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeRenderer;

impl DecodeRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for DecodeRenderer {
    fn render_first_page_bytes(&self, document: &[u8]) -> Result<Option<DynamicImage>> {
        // An undecodable payload is a corrupt document, not an error.
        Ok(image::load_from_memory(document).ok())
    }
}
