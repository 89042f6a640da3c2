//! The in-memory working set of accepted templates.
//!
//! The set is append-only within a process lifetime and bounded by a target
//! capacity. It is the single source of truth for "is this new document
//! unique": every candidate is compared against every entry before it can
//! be accepted. The set is never serialized — it is reconstructed from the
//! backing directory on every run (see [`crate::bootstrap`]).
//!
//! Invariant: for any two entries `a != b`,
//! `a.fingerprint.hamming_distance(&b.fingerprint)` exceeds the similarity
//! threshold. The set itself does not re-validate this on `accept` —
//! callers consult the [`crate::similarity::SimilarityOracle`] first.
//! There is exactly one writer (the discovery driver), so no locking is
//! needed.

use crate::fingerprint::Fingerprint;

/// One accepted template: a fingerprint and the local file backing it.
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub fingerprint: Fingerprint,
    /// File name of the backing document inside the templates directory,
    /// derived from the source object key's base name.
    pub file_name: String,
}

impl TemplateEntry {
    pub fn new(fingerprint: Fingerprint, file_name: String) -> Self {
        Self {
            fingerprint,
            file_name,
        }
    }
}

/// Ordered, append-only set of accepted templates, bounded by a target.
#[derive(Debug, Default)]
pub struct TemplateSet {
    entries: Vec<TemplateEntry>,
    target: usize,
}

impl TemplateSet {
    /// Create an empty set that is considered full at `target` entries.
    pub fn with_capacity_target(target: usize) -> Self {
        Self {
            entries: Vec::new(),
            target,
        }
    }

    /// Append an entry unconditionally.
    ///
    /// The caller must already have confirmed non-duplication through the
    /// oracle; the set performs no re-validation.
    pub fn accept(&mut self, entry: TemplateEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the set has reached its target capacity.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.target
    }

    pub fn capacity_target(&self) -> usize {
        self.target
    }

    pub fn entries(&self) -> &[TemplateEntry] {
        &self.entries
    }

    /// Fingerprints in insertion order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &Fingerprint> {
        self.entries.iter().map(|e| &e.fingerprint)
    }
}
