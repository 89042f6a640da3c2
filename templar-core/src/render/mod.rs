//! Page rendering capability.
//!
//! Discovery only ever looks at the first page of a document. A renderer
//! turns a document (bytes or a local path) into that page's bitmap, or
//! reports that the document has no renderable page.
//!
//! Contract: `Ok(None)` means the document itself is unusable (corrupt,
//! empty) — callers skip the candidate and continue. `Err` is reserved for
//! environmental failures such as a missing rasterizer library. Byte input
//! and path input must produce the same bitmap for the same content so
//! fingerprints from both paths stay comparable.

mod decode;
#[cfg(feature = "pdfium")]
mod pdfium;

pub use decode::DecodeRenderer;
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRenderer;

use std::path::Path;

use image::DynamicImage;

use crate::error::Result;

/// Renders the first page of a document. Implementations must be
/// thread-safe (`Send + Sync`); rendering is blocking work and is invoked
/// from the blocking thread pool.
pub trait PageRenderer: Send + Sync {
    /// Render the first page of an in-memory document.
    fn render_first_page_bytes(&self, document: &[u8]) -> Result<Option<DynamicImage>>;

    /// Render the first page of a document on disk.
    ///
    /// The default implementation reads the file and delegates to the bytes
    /// path, which guarantees identical output for identical content.
    fn render_first_page_path(&self, path: &Path) -> Result<Option<DynamicImage>> {
        let bytes = std::fs::read(path)?;
        self.render_first_page_bytes(&bytes)
    }
}
