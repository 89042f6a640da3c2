//! Hash command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use colored::Colorize;

use templar_core::{PageFingerprinter, PdfiumRenderer, DEFAULT_HASH_THRESHOLD};

pub async fn execute(file: PathBuf, other: Option<PathBuf>) -> Result<()> {
    ensure_readable(&file)?;
    if let Some(other) = &other {
        ensure_readable(other)?;
    }

    let fingerprinter = PageFingerprinter::new(Arc::new(PdfiumRenderer::new()));

    let fingerprint = fingerprinter
        .fingerprint_path(&file)
        .await
        .with_context(|| format!("Failed to fingerprint {}", file.display()))?;
    println!("{}  {}", fingerprint, file.display());

    if let Some(other) = other {
        let other_fingerprint = fingerprinter
            .fingerprint_path(&other)
            .await
            .with_context(|| format!("Failed to fingerprint {}", other.display()))?;
        println!("{}  {}", other_fingerprint, other.display());

        let distance = fingerprint.hamming_distance(&other_fingerprint);
        let verdict = if distance <= DEFAULT_HASH_THRESHOLD {
            "same template".green().bold()
        } else {
            "different templates".bold()
        };
        println!();
        println!(
            "   {} {} bits ({})",
            "Hamming distance:".dimmed(),
            distance,
            verdict
        );
    }

    Ok(())
}

fn ensure_readable(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("Failed to read file: {}", path.display());
    }
    Ok(())
}
