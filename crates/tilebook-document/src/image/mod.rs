// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — tile descrambling of scrambled page images.

pub mod descrambler;

pub use descrambler::{Descrambler, RecoveredPage};
