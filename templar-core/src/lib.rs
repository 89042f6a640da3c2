//! Templar core — streaming discovery of visually-distinct document templates.
//!
//! This crate implements an online, memory-bounded, crash-resumable
//! near-duplicate discovery engine. It streams candidate documents from a
//! remote object collection, renders a representative first page for each,
//! fingerprints that page with a perceptual hash, and decides online
//! whether the candidate is a near-duplicate of any template accepted so
//! far. Accepted documents are persisted locally; the local directory *is*
//! the durable state, so an interrupted run resumes by re-fingerprinting
//! whatever is already on disk.
//!
//! # Components
//!
//! - [`fingerprint`]: 64-bit perceptual fingerprints of rendered pages
//! - [`similarity`]: the fixed-threshold Hamming distance decision rule
//! - [`templates`]: the bounded, append-only working set
//! - [`bootstrap`]: working-set reconstruction from backing files
//! - [`discovery`]: the scan/evaluate/persist control loop
//! - [`store`], [`render`]: capability seams for the object store and the
//!   page rasterizer, with production and in-memory/test implementations
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use templar_core::{
//!     bootstrap, DiscoveryConfig, DiscoveryDriver, PageFingerprinter,
//!     PdfiumRenderer, S3ObjectStore, Shutdown, SimilarityOracle,
//! };
//!
//! # async fn example() -> templar_core::Result<()> {
//! let config = DiscoveryConfig::from_env();
//! config.validate()?;
//!
//! let fingerprinter = PageFingerprinter::new(Arc::new(PdfiumRenderer::new()));
//! let oracle = SimilarityOracle::new(config.hash_threshold);
//!
//! let mut set = bootstrap::load(&config, &fingerprinter, &oracle).await?;
//! let store = Arc::new(S3ObjectStore::from_env(&config.bucket).await?);
//!
//! let driver = DiscoveryDriver::new(&config, store, &fingerprinter, &oracle, Shutdown::new());
//! let report = driver.run(&mut set).await?;
//! println!("accepted {} templates", report.accepted);
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod render;
pub mod similarity;
pub mod store;
pub mod templates;

#[cfg(test)]
mod test_images;

// Re-export main types for convenience
pub use config::{DiscoveryConfig, DEFAULT_HASH_THRESHOLD, DEFAULT_TARGET_LIMIT};
pub use discovery::{
    set_satisfies_invariant, template_file_name, DiscoveryDriver, Outcome, RejectReason,
    ScanReport, Shutdown, SkipReason, Termination,
};
pub use error::{Result, TemplarError};
pub use fingerprint::{Fingerprint, PageFingerprinter, FINGERPRINT_BYTES};
pub use render::{DecodeRenderer, PageRenderer};
pub use similarity::{DuplicateMatch, SimilarityOracle};
pub use store::{MemoryObjectStore, ObjectPage, ObjectRef, ObjectStore};
pub use templates::{TemplateEntry, TemplateSet};

#[cfg(feature = "pdfium")]
pub use render::PdfiumRenderer;

#[cfg(feature = "s3")]
pub use store::S3ObjectStore;
