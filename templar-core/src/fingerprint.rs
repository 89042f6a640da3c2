//! Perceptual fingerprints for rendered document pages.
//!
//! A fingerprint is a 64-bit perceptual hash (DCT-preprocessed mean hash,
//! the pHash family) of the first rendered page of a document. Visually
//! similar pages produce fingerprints with a small Hamming distance even
//! when the underlying bytes differ, which is what makes template-level
//! deduplication possible.
//!
//! The hash parameters are fixed: every fingerprint in the system is
//! computed with the same 8x8 hash size regardless of whether the source
//! was a freshly retrieved byte payload or a previously persisted local
//! file. Fingerprints from the two paths are therefore directly comparable.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};
use tracing::debug;

use crate::error::{Result, TemplarError};
use crate::render::PageRenderer;

/// Fixed fingerprint width in bytes (64 bits).
pub const FINGERPRINT_BYTES: usize = 8;

/// Hash grid edge length. 8x8 = 64 bits after DCT preprocessing.
const HASH_SIZE: u32 = 8;

/// A 64-bit perceptual hash of a rendered page.
///
/// Immutable once computed. Two fingerprints are compared by Hamming
/// distance (count of differing bits).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_BYTES]);

impl Fingerprint {
    /// Create a fingerprint from raw hash bytes.
    ///
    /// Fails if the slice is not exactly [`FINGERPRINT_BYTES`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let fixed: [u8; FINGERPRINT_BYTES] = bytes.try_into().map_err(|_| {
            TemplarError::InvalidFingerprint(format!(
                "expected {} bytes, got {}",
                FINGERPRINT_BYTES,
                bytes.len()
            ))
        })?;
        Ok(Self(fixed))
    }

    /// Compute the fingerprint of an already-rendered page image.
    pub fn of_image(image: &DynamicImage) -> Result<Self> {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .hash_size(HASH_SIZE, HASH_SIZE)
            .to_hasher();
        let hash = hasher.hash_image(image);
        Self::from_bytes(hash.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_BYTES] {
        &self.0
    }

    /// Count of differing bits between two fingerprints.
    pub fn hamming_distance(&self, other: &Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a fingerprint from its hex form.
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TemplarError::InvalidFingerprint(format!("invalid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Renders the first page of a document and fingerprints it.
///
/// The rendered bitmap lives only for the duration of one call; it is
/// dropped before the fingerprint is returned so large pages never outlive
/// the evaluation that produced them. Rendering and hashing are blocking
/// work and run on the blocking thread pool.
pub struct PageFingerprinter {
    renderer: Arc<dyn PageRenderer>,
}

impl PageFingerprinter {
    pub fn new(renderer: Arc<dyn PageRenderer>) -> Self {
        Self { renderer }
    }

    /// Fingerprint a document from an in-memory byte payload.
    ///
    /// Returns [`TemplarError::Unrenderable`] when the document is corrupt
    /// or has no first page. Callers treat that as "skip this candidate",
    /// never as a reason to abort a run.
    pub async fn fingerprint_bytes(&self, document: Bytes) -> Result<Fingerprint> {
        let renderer = Arc::clone(&self.renderer);
        run_blocking(move || {
            let image = renderer
                .render_first_page_bytes(&document)?
                .ok_or_else(|| TemplarError::Unrenderable("no renderable first page".into()))?;
            Fingerprint::of_image(&image)
        })
        .await
    }

    /// Fingerprint a document already persisted on disk.
    ///
    /// Behaves identically to [`fingerprint_bytes`](Self::fingerprint_bytes)
    /// for the same content, so fingerprints computed during bootstrap are
    /// comparable with fingerprints computed during discovery.
    pub async fn fingerprint_path(&self, path: &Path) -> Result<Fingerprint> {
        let renderer = Arc::clone(&self.renderer);
        let path = path.to_path_buf();
        run_blocking(move || {
            let image = renderer
                .render_first_page_path(&path)?
                .ok_or_else(|| TemplarError::Unrenderable("no renderable first page".into()))?;
            let fingerprint = Fingerprint::of_image(&image)?;
            debug!(file = %path.display(), hash = %fingerprint, "fingerprinted local file");
            Ok(fingerprint)
        })
        .await
    }
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TemplarError::Task(format!("fingerprint task failed: {e}")))?
}
