// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tilebook — download a tile-scrambled e-book as a single PDF.
//
// Entry point. Parses arguments, initialises logging and configuration, then
// runs the download with Ctrl-C mapped to a page-boundary cancellation.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tilebook_core::AppConfig;
use tilebook_core::error::Result;

use services::book_url::normalize_book_url;
use services::download::download_book;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "tilebook", version, about = "Download an e-book as a single PDF")]
struct Cli {
    /// URL of the e-book you wish to download
    #[arg(long)]
    url: String,

    /// JSON configuration file (endpoints, timeouts, tile geometry)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write `book-<id>.pdf` into
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Log per-request detail
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Tilebook starting");

    match run(cli).await {
        Ok(path) => {
            println!("File saved successfully: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "download failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<PathBuf> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    let book_url = normalize_book_url(&cli.url, &config.book_host_suffix)?;
    tracing::info!(url = %book_url, "Downloading book");

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            flag.store(true, Ordering::SeqCst);
        }
    });

    download_book(&config, &book_url, cancel).await
}
