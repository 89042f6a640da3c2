//! Near-duplicate decision rule.
//!
//! A candidate is a near-duplicate of the working set when its Hamming
//! distance to *any* accepted fingerprint is at or below a fixed threshold.
//! The scan is a deliberate O(n) linear pass over the set in insertion
//! order — the set is capped at a small target size, so a sub-linear index
//! would buy nothing here. Keeping the rule behind this type means a
//! bucketed index could replace the scan later without touching the driver
//! or the template set.

use serde::Serialize;

use crate::fingerprint::Fingerprint;
use crate::templates::TemplateSet;

/// A matched entry within the threshold, reported for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    /// Insertion-order index of the matched template.
    pub index: usize,
    /// Hamming distance to the matched template's fingerprint.
    pub distance: u32,
}

/// Applies the fixed-threshold Hamming distance rule against a template set.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityOracle {
    threshold: u32,
}

impl SimilarityOracle {
    /// Create an oracle with the given maximum bit distance for a match.
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// First entry whose fingerprint is within the threshold, in insertion
    /// order. Short-circuits at the first match; order affects only which
    /// entry is reported, never whether one is found.
    pub fn first_match(&self, candidate: &Fingerprint, set: &TemplateSet) -> Option<DuplicateMatch> {
        set.fingerprints().enumerate().find_map(|(index, existing)| {
            let distance = candidate.hamming_distance(existing);
            (distance <= self.threshold).then_some(DuplicateMatch { index, distance })
        })
    }

    /// Whether the candidate is a near-duplicate of any accepted template.
    pub fn is_duplicate(&self, candidate: &Fingerprint, set: &TemplateSet) -> bool {
        self.first_match(candidate, set).is_some()
    }
}
