// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end book download: manifest -> pages -> PDF on disk.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tempfile::NamedTempFile;
use tilebook_core::AppConfig;
use tilebook_core::error::Result;
use tilebook_document::{Descrambler, PdfReader};
use tilebook_fetch::{BookClient, ConsoleProgress, PageSequencer};
use tracing::{info, warn};

/// Download the book at `book_url` and write it to the configured output
/// directory. Returns the path of the written PDF.
///
/// Nothing is written unless every page succeeded.
pub async fn download_book(
    config: &AppConfig,
    book_url: &str,
    cancel: Arc<AtomicBool>,
) -> Result<PathBuf> {
    let client = BookClient::new(config)?;
    let manifest = client.fetch_manifest(book_url).await?;

    let descrambler = Descrambler::new(config.geometry).with_background(config.background);
    let sequencer = PageSequencer::new(&client, &client, descrambler)
        .with_jpeg_quality(config.jpeg_quality)
        .with_cancel_flag(cancel);

    let mut progress = ConsoleProgress::stdout();
    let document = sequencer.build_document(&manifest, &mut progress).await?;
    let bytes = document.finalize()?;

    let path = write_document(&config.output_dir, &manifest.output_file_name(), &bytes)?;
    log_summary(&path);
    Ok(path)
}

/// Write `bytes` to `dir/file_name`, creating `dir` if needed.
///
/// The data goes to a temporary file in `dir` that is renamed into place, so
/// a failed write never leaves a truncated PDF under the final name and the
/// temporary file is removed on every error path.
pub fn write_document(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);

    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(&path).map_err(|err| err.error)?;

    info!("Wrote book PDF to {}", path.display());
    Ok(path)
}

/// Re-open the written file and log what it contains.
fn log_summary(path: &Path) {
    match PdfReader::open(path).and_then(|reader| reader.page_sizes()) {
        Ok(sizes) => info!(pages = sizes.len(), path = %path.display(), "PDF ready"),
        Err(err) => warn!(%err, "Could not re-read the written PDF"),
    }
}
