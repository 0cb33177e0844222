// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Book URL validation and normalisation.

use reqwest::Url;
use tilebook_core::error::{Result, TilebookError};

const DETAIL_PREFIX: &str = "/ebooks/detail/";
const READER_PREFIX: &str = "/ebooks/";

/// Check that `raw` points at a book on a host ending in `host_suffix` and
/// return the URL of its reader page.
///
/// Detail pages (`/ebooks/detail/<slug>`) do not embed the page manifest, so
/// they are rewritten to the reader page (`/ebooks/<slug>`).
pub fn normalize_book_url(raw: &str, host_suffix: &str) -> Result<String> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| TilebookError::InvalidUrl(format!("{raw}: {e}")))?;

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if !host.ends_with(&host_suffix.to_ascii_lowercase()) {
        return Err(TilebookError::InvalidUrl(format!(
            "{raw}: you must use a book URL from {host_suffix}"
        )));
    }

    if let Some(slug) = url.path().strip_prefix(DETAIL_PREFIX) {
        let path = format!("{READER_PREFIX}{slug}");
        url.set_path(&path);
    }

    Ok(url.to_string())
}
