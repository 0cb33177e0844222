// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Console progress reporting.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tilebook_core::ProgressUpdate;

use crate::source::ProgressSink;

/// Render the status line for `update`:
/// `Page 3/10 (30.00%) downloaded. 00:01:10 remaining`.
///
/// The last page drops the estimate.
pub fn format_status_line(update: &ProgressUpdate) -> String {
    let head = format!(
        "Page {}/{} ({:.2}%) downloaded.",
        update.current,
        update.total,
        update.fraction() * 100.0
    );
    match update.remaining() {
        Some(remaining) => format!("{head} {} remaining", format_hms(remaining)),
        None => head,
    }
}

/// `hh:mm:ss`, hours unbounded.
fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Terminal progress bar whose message is the status line.
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// Draw on stdout, leaving stderr to the log output.
    pub fn stdout() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stdout());
        bar.set_style(
            ProgressStyle::with_template("[{bar:30.cyan/blue}] {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Track progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn report(&mut self, update: ProgressUpdate) {
        self.bar.set_length(update.total as u64);
        self.bar.set_position(update.current as u64);

        let line = format_status_line(&update);
        if update.is_complete() {
            self.bar.finish_with_message(line);
        } else {
            self.bar.set_message(line);
        }
    }
}
