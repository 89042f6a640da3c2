//! Discover command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use templar_core::{
    bootstrap, DiscoveryConfig, DiscoveryDriver, PageFingerprinter, PdfiumRenderer, S3ObjectStore,
    ScanReport, Shutdown, SimilarityOracle, Termination,
};

pub async fn execute(
    bucket: Option<String>,
    prefix: Option<String>,
    templates_dir: Option<PathBuf>,
    limit: Option<usize>,
    threshold: Option<u32>,
    json: bool,
) -> Result<()> {
    let mut config = DiscoveryConfig::from_env();
    if let Some(bucket) = bucket {
        config.bucket = bucket;
    }
    if let Some(prefix) = prefix {
        config.prefix = prefix;
    }
    if let Some(dir) = templates_dir {
        config.templates_dir = dir;
    }
    if let Some(limit) = limit {
        config.target_limit = limit;
    }
    if let Some(threshold) = threshold {
        config.hash_threshold = threshold;
    }
    config.validate()?;

    info!(
        bucket = %config.bucket,
        prefix = %config.prefix,
        dir = %config.templates_dir.display(),
        target = config.target_limit,
        threshold = config.hash_threshold,
        "starting discovery"
    );

    let fingerprinter = PageFingerprinter::new(Arc::new(PdfiumRenderer::new()));
    let oracle = SimilarityOracle::new(config.hash_threshold);

    let mut set = bootstrap::load(&config, &fingerprinter, &oracle)
        .await
        .context("Failed to bootstrap local template set")?;

    if !json {
        if set.is_empty() {
            println!("Starting from an empty template set.");
        } else {
            println!(
                "Resuming with {} template(s) already on disk.",
                set.len().to_string().bold()
            );
        }
    }

    let store = Arc::new(
        S3ObjectStore::from_env(&config.bucket)
            .await
            .context("Failed to initialize object store client")?,
    );

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!(
                    "\n{}",
                    "Interrupt received, finishing the current candidate...".yellow()
                );
                shutdown.request();
            }
        });
    }

    let driver = DiscoveryDriver::new(&config, store, &fingerprinter, &oracle, shutdown);
    let report = driver.run(&mut set).await.context("Discovery scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&config, &report);
    }

    Ok(())
}

fn print_summary(config: &DiscoveryConfig, report: &ScanReport) {
    println!();
    match report.termination {
        Termination::TargetReached => {
            println!(
                "{}",
                format!("Target of {} templates reached.", config.target_limit)
                    .green()
                    .bold()
            );
        }
        Termination::SourceExhausted => {
            println!("{}", "Source exhausted, scan complete.".green().bold());
        }
        Termination::Interrupted => {
            println!(
                "{}",
                "Interrupted. Progress is saved; run again to resume.".yellow()
            );
        }
    }
    println!();
    println!(
        "   {} {}",
        "Templates on disk:".dimmed(),
        report.templates_total
    );
    println!("   {} {}", "Objects scanned:".dimmed(), report.scanned);
    println!("   {} {}", "Accepted this run:".dimmed(), report.accepted);
    println!("   {} {}", "Near-duplicates:".dimmed(), report.duplicates);
    println!("   {} {}", "Already local:".dimmed(), report.already_local);
    if report.failed > 0 {
        println!("   {} {}", "Failed candidates:".dimmed(), report.failed);
    }
    println!(
        "   {} {}",
        "Directory:".dimmed(),
        config.templates_dir.display()
    );
    println!(
        "   {} {}",
        "Finished:".dimmed(),
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
}
