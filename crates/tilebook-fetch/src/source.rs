// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability traits the page sequencer depends on.
//
// Retrieval is injected rather than hard-wired so the sequencer can run
// against the live service (`BookClient`) or in-memory fakes.

use std::future::Future;

use tilebook_core::error::Result;
use tilebook_core::{PermutationDescriptor, ProgressUpdate};

/// Supplies the raw, still scrambled image bytes of a page.
pub trait ImageSource {
    fn fetch_scrambled_image(
        &self,
        book_id: &str,
        page_ref: &str,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Supplies the tile permutation for a page.
pub trait DescriptorSource {
    fn fetch_descriptor(
        &self,
        page_id: &str,
    ) -> impl Future<Output = Result<PermutationDescriptor>> + Send;
}

/// Receives a progress snapshot after each page is appended.
pub trait ProgressSink {
    fn report(&mut self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressUpdate),
{
    fn report(&mut self, update: ProgressUpdate) {
        self(update)
    }
}
