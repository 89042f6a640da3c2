//! The discovery control loop.
//!
//! Drives the scan over the remote collection: enumerate candidate keys
//! page by page, evaluate each candidate against the working set, persist
//! accepted templates, stop at the target or when the source runs dry.
//!
//! The loop is strictly sequential. Every acceptance must be visible to
//! the very next candidate's duplicate check, otherwise two mutually
//! near-duplicate documents evaluated against a stale set could both be
//! accepted. Parallel fingerprinting would require serializing the
//! acceptance decision; this driver does not attempt it.
//!
//! Per-candidate failures (retrieval, rendering) never abort a run; they
//! are surfaced as [`Outcome`]s and counted. Errors acquiring the
//! candidate stream itself always abort with partial progress preserved
//! on disk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::DiscoveryConfig;
use crate::error::Result;
use crate::fingerprint::PageFingerprinter;
use crate::similarity::SimilarityOracle;
use crate::store::{ObjectRef, ObjectStore};
use crate::templates::{TemplateEntry, TemplateSet};

/// Cooperative interruption flag, shared with a signal handler.
///
/// Observed between candidate evaluations; an in-flight retrieval or
/// render is never preempted.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The working set reached its target capacity.
    TargetReached,
    /// The enumeration yielded no more pages.
    SourceExhausted,
    /// A user-initiated interruption was observed.
    Interrupted,
}

/// Per-candidate evaluation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Unique template: persisted and added to the working set.
    Accepted { file_name: String },
    /// Evaluated and found to duplicate an accepted template.
    Rejected(RejectReason),
    /// Not evaluated against the set at all.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Within the similarity threshold of an existing entry.
    NearDuplicate { distance: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Key does not carry the accepted document extension.
    NotADocument,
    /// A backing file with the derived name already exists locally.
    AlreadyLocal,
    /// Retrieval from the object store failed.
    RetrievalFailed(String),
    /// The document could not be rendered or fingerprinted.
    Unrenderable(String),
    /// The accepted payload could not be written to disk.
    PersistFailed(String),
}

/// Aggregated counters for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub termination: Termination,
    /// Objects considered by the evaluation step.
    pub scanned: u64,
    /// Unique templates accepted and persisted this run.
    pub accepted: u64,
    /// Candidates rejected as near-duplicates.
    pub duplicates: u64,
    /// Candidates fast-skipped because their backing file already existed.
    pub already_local: u64,
    /// Keys filtered out by extension.
    pub filtered: u64,
    /// Retrieval, render, or persistence failures (run continued).
    pub failed: u64,
    /// Final working set size.
    pub templates_total: usize,
}

#[derive(Debug, Default)]
struct Counters {
    scanned: u64,
    accepted: u64,
    duplicates: u64,
    already_local: u64,
    filtered: u64,
    failed: u64,
}

impl Counters {
    fn record(&mut self, outcome: &Outcome) {
        self.scanned += 1;
        match outcome {
            Outcome::Accepted { .. } => self.accepted += 1,
            Outcome::Rejected(RejectReason::NearDuplicate { .. }) => self.duplicates += 1,
            Outcome::Skipped(SkipReason::NotADocument) => self.filtered += 1,
            Outcome::Skipped(SkipReason::AlreadyLocal) => self.already_local += 1,
            Outcome::Skipped(
                SkipReason::RetrievalFailed(_)
                | SkipReason::Unrenderable(_)
                | SkipReason::PersistFailed(_),
            ) => self.failed += 1,
        }
    }
}

/// Derive the local backing file name from an object key.
///
/// Returns `None` for keys with an empty base name (e.g. a bare "directory"
/// marker key ending in `/`).
pub fn template_file_name(key: &str) -> Option<String> {
    let base = key.rsplit('/').next().unwrap_or(key);
    (!base.is_empty()).then(|| base.to_string())
}

fn has_document_extension(key: &str) -> bool {
    std::path::Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(crate::bootstrap::TEMPLATE_EXTENSION))
}

/// Sequential scan/accumulate loop over one object store.
pub struct DiscoveryDriver<'a> {
    config: &'a DiscoveryConfig,
    store: Arc<dyn ObjectStore>,
    fingerprinter: &'a PageFingerprinter,
    oracle: &'a SimilarityOracle,
    shutdown: Shutdown,
}

impl<'a> DiscoveryDriver<'a> {
    pub fn new(
        config: &'a DiscoveryConfig,
        store: Arc<dyn ObjectStore>,
        fingerprinter: &'a PageFingerprinter,
        oracle: &'a SimilarityOracle,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            config,
            store,
            fingerprinter,
            oracle,
            shutdown,
        }
    }

    /// Run discovery until the target is reached, the source is exhausted,
    /// or an interruption is observed.
    ///
    /// The set passed in is normally the bootstrap loader's output; when it
    /// is already full, no remote call is made at all.
    #[instrument(level = "info", skip_all, fields(bucket = %self.config.bucket, prefix = %self.config.prefix))]
    pub async fn run(&self, set: &mut TemplateSet) -> Result<ScanReport> {
        let mut counters = Counters::default();

        let termination = if set.is_full() {
            info!(
                templates = set.len(),
                target = set.capacity_target(),
                "target already reached, nothing to discover"
            );
            Termination::TargetReached
        } else {
            self.scan(set, &mut counters).await?
        };

        let report = ScanReport {
            termination,
            scanned: counters.scanned,
            accepted: counters.accepted,
            duplicates: counters.duplicates,
            already_local: counters.already_local,
            filtered: counters.filtered,
            failed: counters.failed,
            templates_total: set.len(),
        };
        info!(
            termination = ?report.termination,
            scanned = report.scanned,
            accepted = report.accepted,
            templates = report.templates_total,
            "discovery finished"
        );
        Ok(report)
    }

    async fn scan(&self, set: &mut TemplateSet, counters: &mut Counters) -> Result<Termination> {
        let mut continuation: Option<String> = None;

        let termination = 'scan: loop {
            if self.shutdown.is_requested() {
                break 'scan Termination::Interrupted;
            }

            // Enumeration failures are fatal: without the candidate stream
            // there is nothing left to drive. Partial progress stays on disk.
            let page = self
                .store
                .list_page(&self.config.prefix, continuation.take())
                .await?;
            debug!(objects = page.objects.len(), "scanning page");

            for object in &page.objects {
                // Checked per object, not per page, so the scan can stop
                // mid-page the moment the cap is hit.
                if set.is_full() {
                    break 'scan Termination::TargetReached;
                }
                if self.shutdown.is_requested() {
                    break 'scan Termination::Interrupted;
                }

                let outcome = self.evaluate(object, set).await;
                counters.record(&outcome);
            }

            if set.is_full() {
                break 'scan Termination::TargetReached;
            }

            match page.continuation {
                Some(token) => continuation = Some(token),
                None => break 'scan Termination::SourceExhausted,
            }
        };

        Ok(termination)
    }

    /// Evaluate one candidate. All transient buffers (payload, decoded
    /// page) are scoped to this call and released before the next
    /// iteration.
    async fn evaluate(&self, object: &ObjectRef, set: &mut TemplateSet) -> Outcome {
        let key = object.key.as_str();

        if !has_document_extension(key) {
            return Outcome::Skipped(SkipReason::NotADocument);
        }
        let Some(file_name) = template_file_name(key) else {
            return Outcome::Skipped(SkipReason::NotADocument);
        };

        // Fast skip: an existing backing file means this exact object was
        // accepted by a prior run. Strictly precedes any network cost.
        let local_path = self.config.templates_dir.join(&file_name);
        if local_path.exists() {
            debug!(key, "backing file already present, skipping retrieval");
            return Outcome::Skipped(SkipReason::AlreadyLocal);
        }

        let document = match self.store.get(key).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!(key, error = %err, "retrieval failed, skipping candidate");
                return Outcome::Skipped(SkipReason::RetrievalFailed(err.to_string()));
            }
        };

        let fingerprint = match self.fingerprinter.fingerprint_bytes(document.clone()).await {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                warn!(key, error = %err, "candidate not fingerprintable, skipping");
                return Outcome::Skipped(SkipReason::Unrenderable(err.to_string()));
            }
        };

        if let Some(found) = self.oracle.first_match(&fingerprint, set) {
            debug!(key, distance = found.distance, "near-duplicate rejected");
            return Outcome::Rejected(RejectReason::NearDuplicate {
                distance: found.distance,
            });
        }

        if let Err(err) = tokio::fs::write(&local_path, &document).await {
            warn!(key, error = %err, "failed to persist accepted template");
            return Outcome::Skipped(SkipReason::PersistFailed(err.to_string()));
        }

        set.accept(TemplateEntry::new(fingerprint, file_name.clone()));
        info!(
            key,
            file = %file_name,
            templates = set.len(),
            target = set.capacity_target(),
            "accepted new template"
        );
        Outcome::Accepted { file_name }
    }
}

/// Convenience for tests and diagnostics: verify the pairwise-distance
/// invariant over a set.
pub fn set_satisfies_invariant(set: &TemplateSet, threshold: u32) -> bool {
    let fingerprints: Vec<_> = set.fingerprints().collect();
    for (i, a) in fingerprints.iter().enumerate() {
        for b in &fingerprints[i + 1..] {
            if a.hamming_distance(b) <= threshold {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::DecodeRenderer;
    use crate::store::MemoryObjectStore;
    use crate::test_images;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        config: DiscoveryConfig,
        fingerprinter: PageFingerprinter,
        oracle: SimilarityOracle,
    }

    impl Harness {
        fn new(target_limit: usize) -> Self {
            let dir = TempDir::new().unwrap();
            let config = DiscoveryConfig {
                bucket: "test".into(),
                templates_dir: dir.path().to_path_buf(),
                target_limit,
                ..Default::default()
            };
            Self {
                _dir: dir,
                config,
                fingerprinter: PageFingerprinter::new(Arc::new(DecodeRenderer::new())),
                oracle: SimilarityOracle::new(12),
            }
        }

        async fn run(&self, store: Arc<MemoryObjectStore>) -> (ScanReport, TemplateSet) {
            self.run_with_shutdown(store, Shutdown::new()).await
        }

        async fn run_with_shutdown(
            &self,
            store: Arc<MemoryObjectStore>,
            shutdown: Shutdown,
        ) -> (ScanReport, TemplateSet) {
            let mut set = crate::bootstrap::load(&self.config, &self.fingerprinter, &self.oracle)
                .await
                .unwrap();
            let driver = DiscoveryDriver::new(
                &self.config,
                store,
                &self.fingerprinter,
                &self.oracle,
                shutdown,
            );
            let report = driver.run(&mut set).await.unwrap();
            (report, set)
        }
    }

    #[tokio::test]
    async fn test_accepts_distinct_rejects_near_duplicate() {
        let harness = Harness::new(100);
        let store = Arc::new(
            MemoryObjectStore::new()
                .insert("inv/a.pdf", test_images::page(1))
                .insert("inv/b.pdf", test_images::page_speckled(1))
                .insert("inv/c.pdf", test_images::page(2)),
        );

        let (report, set) = harness.run(Arc::clone(&store)).await;

        assert_eq!(report.termination, Termination::SourceExhausted);
        assert_eq!(report.accepted, 2);
        assert_eq!(report.duplicates, 1);
        assert_eq!(set.len(), 2);
        assert!(harness.config.templates_dir.join("a.pdf").exists());
        assert!(!harness.config.templates_dir.join("b.pdf").exists());
        assert!(harness.config.templates_dir.join("c.pdf").exists());
        assert!(set_satisfies_invariant(&set, 12));
    }

    #[tokio::test]
    async fn test_fast_skip_makes_no_retrieval() {
        let harness = Harness::new(100);
        // a.pdf is already on disk from a previous run.
        std::fs::write(
            harness.config.templates_dir.join("a.pdf"),
            test_images::page(1),
        )
        .unwrap();

        let store = Arc::new(
            MemoryObjectStore::new()
                .insert("inv/a.pdf", test_images::page(1))
                .insert("inv/b.pdf", test_images::page(2)),
        );

        let (report, set) = harness.run(Arc::clone(&store)).await;

        assert_eq!(report.already_local, 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(set.len(), 2);
        // The pre-existing key was never fetched.
        assert_eq!(store.fetched_keys(), vec!["inv/b.pdf"]);
    }

    #[tokio::test]
    async fn test_cap_stops_mid_page() {
        let harness = Harness::new(1);
        let store = Arc::new(
            MemoryObjectStore::new()
                .insert("inv/a.pdf", test_images::page(1))
                .insert("inv/b.pdf", test_images::page(2))
                .insert("inv/c.pdf", test_images::page(3)),
        );

        let (report, set) = harness.run(Arc::clone(&store)).await;

        assert_eq!(report.termination, Termination::TargetReached);
        assert_eq!(report.accepted, 1);
        assert_eq!(set.len(), 1);
        // Remaining candidates in the page were never touched.
        assert_eq!(store.fetched_keys(), vec!["inv/a.pdf"]);
    }

    #[tokio::test]
    async fn test_full_bootstrap_makes_zero_remote_calls() {
        let harness = Harness::new(2);
        std::fs::write(
            harness.config.templates_dir.join("a.pdf"),
            test_images::page(1),
        )
        .unwrap();
        std::fs::write(
            harness.config.templates_dir.join("b.pdf"),
            test_images::page(2),
        )
        .unwrap();

        let store = Arc::new(MemoryObjectStore::new().insert("inv/c.pdf", test_images::page(3)));

        let (report, set) = harness.run(Arc::clone(&store)).await;

        assert_eq!(report.termination, Termination::TargetReached);
        assert_eq!(set.len(), 2);
        assert_eq!(store.list_calls(), 0);
        assert!(store.fetched_keys().is_empty());
    }

    #[tokio::test]
    async fn test_empty_source_exhausts() {
        let harness = Harness::new(10);
        let store = Arc::new(MemoryObjectStore::new());

        let (report, set) = harness.run(store).await;

        assert_eq!(report.termination, Termination::SourceExhausted);
        assert_eq!(report.scanned, 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_per_candidate_failures_do_not_abort() {
        let harness = Harness::new(10);
        let store = Arc::new(
            MemoryObjectStore::new()
                .insert("inv/bad-payload.pdf", b"garbage".to_vec())
                .insert("inv/unreachable.pdf", test_images::page(1))
                .failing_get("inv/unreachable.pdf")
                .insert("inv/good.pdf", test_images::page(2))
                .insert("inv/readme.txt", b"not a document".to_vec()),
        );

        let (report, set) = harness.run(store).await;

        assert_eq!(report.termination, Termination::SourceExhausted);
        assert_eq!(report.failed, 2);
        assert_eq!(report.filtered, 1);
        assert_eq!(report.accepted, 1);
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_interruption_observed_between_candidates() {
        let harness = Harness::new(10);
        let store = Arc::new(MemoryObjectStore::new().insert("inv/a.pdf", test_images::page(1)));

        let shutdown = Shutdown::new();
        shutdown.request();
        let (report, set) = harness.run_with_shutdown(store, shutdown).await;

        assert_eq!(report.termination, Termination::Interrupted);
        assert_eq!(report.scanned, 0);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_spans_pages() {
        let harness = Harness::new(100);
        let store = Arc::new(
            MemoryObjectStore::new()
                .with_page_size(1)
                .insert("inv/a.pdf", test_images::page(1))
                .insert("inv/b.pdf", test_images::page(2))
                .insert("inv/c.pdf", test_images::page(3)),
        );

        let (report, set) = harness.run(Arc::clone(&store)).await;

        assert_eq!(report.termination, Termination::SourceExhausted);
        assert_eq!(set.len(), 3);
        assert_eq!(store.list_calls(), 3);
        assert!(set_satisfies_invariant(&set, 12));
    }

    #[test]
    fn test_template_file_name_uses_base_name() {
        assert_eq!(
            template_file_name("scans/2024/invoice_001.pdf").as_deref(),
            Some("invoice_001.pdf")
        );
        assert_eq!(template_file_name("flat.pdf").as_deref(), Some("flat.pdf"));
        assert_eq!(template_file_name("scans/2024/"), None);
    }

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        assert!(has_document_extension("a.pdf"));
        assert!(has_document_extension("a.PDF"));
        assert!(!has_document_extension("a.pdf.bak"));
        assert!(!has_document_extension("a.txt"));
    }
}
