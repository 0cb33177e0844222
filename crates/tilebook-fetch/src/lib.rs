// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tilebook Fetch — drives page reconstruction for a whole book. The page
// sequencer pulls each scrambled image and its permutation descriptor through
// injected sources, descrambles it and appends it to the book document. The
// HTTP client here is the production implementation of those sources.

pub mod client;
pub mod manifest;
pub mod progress;
pub mod sequencer;
pub mod source;

pub use client::BookClient;
pub use progress::ConsoleProgress;
pub use sequencer::PageSequencer;
pub use source::{DescriptorSource, ImageSource, ProgressSink};
