// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP client for the e-book service.
//
// Three endpoints are used: the public book page (HTML with the embedded
// manifest), the raw scrambled page images, and the page-data API that returns
// each page's permutation descriptor as JSON. No retries are attempted; a
// failed request fails the page.

use std::time::Duration;

use reqwest::Client;
use tilebook_core::error::{Result, TilebookError};
use tilebook_core::{AppConfig, BookManifest, PermutationDescriptor};
use tracing::{debug, info, instrument};

use crate::manifest;
use crate::source::{DescriptorSource, ImageSource};

/// Retrieval client for manifests, scrambled images and descriptors.
#[derive(Debug, Clone)]
pub struct BookClient {
    http: Client,
    image_base_url: String,
    page_data_url: String,
    /// Grid cell size used when a descriptor gives no pixel dimensions.
    cell_size: u32,
}

impl BookClient {
    /// Build a client from the endpoints and timeout in `config`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("tilebook/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TilebookError::Http(format!("cannot build HTTP client: {e}")))?;

        Ok(Self::with_http(http, config))
    }

    /// Use an already configured `reqwest::Client`.
    pub fn with_http(http: Client, config: &AppConfig) -> Self {
        Self {
            http,
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
            page_data_url: config.page_data_url.clone(),
            cell_size: config.geometry.tile_size,
        }
    }

    /// URL of the scrambled image for `page_ref` of `book_id`.
    pub fn image_url(&self, book_id: &str, page_ref: &str) -> String {
        format!("{}/{}/{}", self.image_base_url, book_id, page_ref)
    }

    /// URL of the descriptor for `page_id`.
    pub fn descriptor_url(&self, page_id: &str) -> String {
        format!("{}{}", self.page_data_url, page_id)
    }

    /// Download the book page at `book_url` and extract its manifest.
    #[instrument(skip(self))]
    pub async fn fetch_manifest(&self, book_url: &str) -> Result<BookManifest> {
        let body = self.get(book_url).await?;
        let html = String::from_utf8_lossy(&body);
        let manifest = manifest::parse_book_page(&html)?;
        info!(
            book_id = %manifest.book_id,
            pages = manifest.len(),
            "Book manifest extracted"
        );
        Ok(manifest)
    }

    /// GET `url` and return the body, treating non-2xx statuses as errors.
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TilebookError::Http(format!("GET {url}: {e}")))?
            .error_for_status()
            .map_err(|e| TilebookError::Http(format!("GET {url}: {e}")))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| TilebookError::Http(format!("reading body of {url}: {e}")))?;
        debug!(url, bytes = body.len(), "GET complete");
        Ok(body.to_vec())
    }
}

impl ImageSource for BookClient {
    async fn fetch_scrambled_image(&self, book_id: &str, page_ref: &str) -> Result<Vec<u8>> {
        self.get(&self.image_url(book_id, page_ref)).await
    }
}

impl DescriptorSource for BookClient {
    async fn fetch_descriptor(&self, page_id: &str) -> Result<PermutationDescriptor> {
        let body = self.get(&self.descriptor_url(page_id)).await?;
        PermutationDescriptor::from_json(&body, self.cell_size)
    }
}
