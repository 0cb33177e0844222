// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::TileGeometry;
use crate::error::Result;

/// Downloader settings. Every field has a default, so a config file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Book URLs must have a host ending in this suffix.
    pub book_host_suffix: String,
    /// Scrambled images live at `{image_base_url}/{book_id}/{page_ref}`.
    pub image_base_url: String,
    /// Page descriptors live at `{page_data_url}{page_id}`.
    pub page_data_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Tile size and source padding.
    pub geometry: TileGeometry,
    /// RGB fill for canvas regions no tile covers.
    pub background: [u8; 3],
    /// JPEG quality (1-100) of the page images embedded in the PDF.
    pub jpeg_quality: u8,
    /// Directory the finished PDF is written to.
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            book_host_suffix: "rekhta.org".into(),
            image_base_url: "https://ebooksapi.rekhta.org/images".into(),
            page_data_url:
                "https://ebooksapi.rekhta.org/api_getebookpagebyid_websiteapp/?wref=from-site&pgid="
                    .into(),
            request_timeout_secs: 60,
            geometry: TileGeometry::default(),
            background: [255, 255, 255],
            jpeg_quality: 92,
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&raw)?)
    }
}
