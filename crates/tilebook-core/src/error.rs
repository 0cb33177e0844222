// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Tilebook.

use thiserror::Error;

/// Top-level error type for all Tilebook operations.
#[derive(Debug, Error)]
pub enum TilebookError {
    // -- Input errors --
    #[error("book manifest is malformed: {0}")]
    ManifestMalformed(String),

    #[error("invalid book URL: {0}")]
    InvalidUrl(String),

    #[error("permutation descriptor is invalid: {0}")]
    InvalidDescriptor(String),

    // -- Retrieval errors --
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A page could not be fetched or decoded. Aborts the whole run.
    #[error("page {index} failed: {source}")]
    Page {
        index: usize,
        #[source]
        source: Box<TilebookError>,
    },

    #[error("cancelled after {completed} page(s)")]
    Cancelled { completed: usize },

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TilebookError {
    /// Attach the 1-based page index to a per-page failure.
    pub fn at_page(self, index: usize) -> Self {
        Self::Page {
            index,
            source: Box::new(self),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TilebookError>;
