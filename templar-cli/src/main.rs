//! Templar CLI - discover visually-distinct document templates.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;
mod exit_codes;

use exit_codes::ExitCode;

const AFTER_HELP: &str = "\
Exit codes:
  0   success
  1   general error
  64  usage error
  66  cannot open input file
  69  object store unavailable
  74  I/O error";

#[derive(Parser)]
#[command(name = "templar")]
#[command(author, version, about = "Discover visually-distinct document templates", long_about = None)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the remote collection and accumulate unique templates locally
    Discover {
        /// Source bucket (overrides S3_BUCKET_NAME)
        #[arg(long)]
        bucket: Option<String>,

        /// Key prefix to scan (overrides S3_PREFIX)
        #[arg(long)]
        prefix: Option<String>,

        /// Local directory for accepted templates (overrides TEMPLATES_DIR)
        #[arg(long, value_name = "DIR")]
        templates_dir: Option<PathBuf>,

        /// Stop after this many accepted templates (overrides TARGET_LIMIT)
        #[arg(long)]
        limit: Option<usize>,

        /// Maximum Hamming distance for a near-duplicate (overrides HASH_THRESHOLD)
        #[arg(long)]
        threshold: Option<u32>,

        /// Print the scan report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fingerprint a local document, optionally comparing it with a second
    Hash {
        /// Path to the document
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Optional second document to compare against
        #[arg(value_name = "OTHER")]
        other: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Pick up a local .env before anything reads the environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Discover {
            bucket,
            prefix,
            templates_dir,
            limit,
            threshold,
            json,
        } => {
            commands::discover::execute(bucket, prefix, templates_dir, limit, threshold, json).await
        }
        Commands::Hash { file, other } => commands::hash::execute(file, other).await,
    };

    if let Err(err) = result {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(ExitCode::from_anyhow(&err).code);
    }
}
