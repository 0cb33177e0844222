// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// tilebook-document — Page reconstruction and document assembly.
//
// Provides the tile descrambler (scrambled source image + permutation
// descriptor -> legible page) and the PDF side: an append-only page
// accumulator and a reader for inspecting finished documents.

pub mod image;
pub mod pdf;

// Re-export the primary structs so callers can use `tilebook_document::BookDocument` etc.
pub use crate::image::descrambler::{Descrambler, RecoveredPage};
pub use crate::pdf::reader::{EmbeddedImage, PdfReader};
pub use crate::pdf::writer::{BookDocument, PageHandle};
