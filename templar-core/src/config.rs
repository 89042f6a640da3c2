//! Discovery configuration.
//!
//! All knobs are read once at startup into an immutable value object and
//! passed by reference into the driver, the oracle, and the bootstrap
//! loader. No component reads ambient environment state after startup.

use std::path::PathBuf;

use crate::error::{Result, TemplarError};

/// Default number of templates to accumulate before stopping.
pub const DEFAULT_TARGET_LIMIT: usize = 1000;

/// Default maximum Hamming distance (bits) for two pages to count as the
/// same template. The single tunable controlling dedup precision: lower
/// values keep more near-identical layouts, higher values collapse more.
pub const DEFAULT_HASH_THRESHOLD: u32 = 12;

/// Immutable configuration for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Source bucket name.
    pub bucket: String,
    /// Key prefix to scan (empty scans the whole bucket).
    pub prefix: String,
    /// Local directory holding one file per accepted template.
    pub templates_dir: PathBuf,
    /// Stop once this many templates are accepted.
    pub target_limit: usize,
    /// Maximum bit distance for the near-duplicate rule.
    pub hash_threshold: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            templates_dir: PathBuf::from("./templates"),
            target_limit: DEFAULT_TARGET_LIMIT,
            hash_threshold: DEFAULT_HASH_THRESHOLD,
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables: `S3_BUCKET_NAME`, `S3_PREFIX`, `TEMPLATES_DIR`,
    /// `TARGET_LIMIT`, `HASH_THRESHOLD`. Unset or unparseable values fall
    /// back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bucket = std::env::var("S3_BUCKET_NAME").unwrap_or(defaults.bucket);
        let prefix = std::env::var("S3_PREFIX").unwrap_or(defaults.prefix);

        let templates_dir = std::env::var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.templates_dir);

        let target_limit = std::env::var("TARGET_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.target_limit);

        let hash_threshold = std::env::var("HASH_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.hash_threshold);

        Self {
            bucket,
            prefix,
            templates_dir,
            target_limit,
            hash_threshold,
        }
    }

    /// Validate that the configuration can drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(TemplarError::Config(
                "no source bucket configured (set S3_BUCKET_NAME or pass --bucket)".into(),
            ));
        }
        if self.target_limit == 0 {
            return Err(TemplarError::Config("target limit must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.target_limit, 1000);
        assert_eq!(config.hash_threshold, 12);
        assert_eq!(config.templates_dir, PathBuf::from("./templates"));
        assert!(config.bucket.is_empty());
        assert!(config.prefix.is_empty());
    }

    #[test]
    fn test_validate_requires_bucket() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_err());

        let config = DiscoveryConfig {
            bucket: "invoices".into(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_target() {
        let config = DiscoveryConfig {
            bucket: "invoices".into(),
            target_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_reads_all_fields() {
        std::env::set_var("S3_BUCKET_NAME", "test-bucket");
        std::env::set_var("S3_PREFIX", "scans/2024/");
        std::env::set_var("TEMPLATES_DIR", "/tmp/templar-test");
        std::env::set_var("TARGET_LIMIT", "25");
        std::env::set_var("HASH_THRESHOLD", "9");

        let config = DiscoveryConfig::from_env();
        assert_eq!(config.bucket, "test-bucket");
        assert_eq!(config.prefix, "scans/2024/");
        assert_eq!(config.templates_dir, PathBuf::from("/tmp/templar-test"));
        assert_eq!(config.target_limit, 25);
        assert_eq!(config.hash_threshold, 9);

        std::env::remove_var("S3_BUCKET_NAME");
        std::env::remove_var("S3_PREFIX");
        std::env::remove_var("TEMPLATES_DIR");
        std::env::remove_var("TARGET_LIMIT");
        std::env::remove_var("HASH_THRESHOLD");
    }
}
