//! Resume support: reconstruct the working set from backing files.
//!
//! The template set is never serialized. Every run starts by fingerprinting
//! whatever documents already sit in the templates directory, which makes
//! an interrupted run resumable for free: accepted files are on disk, so a
//! fresh process rebuilds the same working set and the scan's fast-skip
//! check keeps it from re-downloading them.
//!
//! Individual files that fail to fingerprint are logged and excluded — one
//! corrupt local file must never block resumption. Reconstructed entries
//! are re-checked against the oracle so the loaded set satisfies the same
//! pairwise-distance invariant discovery maintains; a local file that
//! duplicates an earlier one stays on disk (its key still fast-skips) but
//! does not occupy a slot in the working set.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::fingerprint::PageFingerprinter;
use crate::similarity::SimilarityOracle;
use crate::templates::{TemplateEntry, TemplateSet};

/// Extension of backing files, matched case-insensitively.
pub const TEMPLATE_EXTENSION: &str = "pdf";

/// Rebuild the template set from the configured backing directory.
///
/// Creates the directory if it does not exist yet.
pub async fn load(
    config: &DiscoveryConfig,
    fingerprinter: &PageFingerprinter,
    oracle: &SimilarityOracle,
) -> Result<TemplateSet> {
    std::fs::create_dir_all(&config.templates_dir)?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(&config.templates_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
        })
        .collect();
    // Deterministic reconstruction order regardless of directory iteration.
    files.sort();

    if !files.is_empty() {
        info!(
            files = files.len(),
            dir = %config.templates_dir.display(),
            "found existing templates, fingerprinting to resume"
        );
    }

    let mut set = TemplateSet::with_capacity_target(config.target_limit);
    for path in files {
        let fingerprint = match fingerprinter.fingerprint_path(&path).await {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                warn!(
                    file = %path.display(),
                    error = %err,
                    "existing template failed to fingerprint, excluded from working set"
                );
                continue;
            }
        };

        if let Some(found) = oracle.first_match(&fingerprint, &set) {
            warn!(
                file = %path.display(),
                distance = found.distance,
                "existing template duplicates an earlier one, excluded from working set"
            );
            continue;
        }

        let Some(file_name) = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        set.accept(TemplateEntry::new(fingerprint, file_name));
    }

    info!(templates = set.len(), "bootstrap complete");
    Ok(set)
}
