// Copyright (c) 2025-2026 the territory contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use console::Term;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Stage name constants for consistent progress tracking.
pub mod stages {
    /// Per-translation-unit compiler probes.
    pub const COLLECTING: &str = "collecting";
    /// Writing captured files into the archive.
    pub const COMPRESSING: &str = "compressing";
    /// Archive upload (spinner-based, no determinate progress).
    pub const UPLOADING: &str = "uploading";
}

/// Manager for multi-stage progress bars.
///
/// Each stage gets its own bar in a shared `MultiProgress`. When stdout is
/// not a TTY the bars are hidden so piped and CI output stays clean.
///
/// ```no_run
/// use territory::utils::progress::{ProgressManager, stages};
///
/// let mut manager = ProgressManager::new();
/// let bar = manager.add_stage(stages::COLLECTING, 2);
/// bar.inc(1);
/// manager.finish(stages::COLLECTING, "collected 2 translation units");
/// ```
pub struct ProgressManager {
    multi: MultiProgress,
    bars: HashMap<String, ProgressBar>,
    is_tty: bool,
}

impl ProgressManager {
    #[must_use]
    pub fn new() -> Self {
        let is_tty = Term::stdout().is_term();
        Self {
            multi: MultiProgress::new(),
            bars: HashMap::new(),
            is_tty,
        }
    }

    /// Adds a new progress stage with a stage-specific style.
    ///
    /// Returns the bar so workers can be handed a clone of it.
    #[must_use]
    pub fn add_stage(&mut self, name: &str, total: u64) -> ProgressBar {
        let pb = if self.is_tty {
            if name == stages::UPLOADING {
                let spinner = ProgressBar::new_spinner();
                spinner.enable_steady_tick(std::time::Duration::from_millis(100));
                self.multi.add(spinner)
            } else {
                self.multi.add(ProgressBar::new(total))
            }
        } else {
            ProgressBar::hidden()
        };

        pb.set_style(Self::style_for_stage(name));
        self.bars.insert(name.to_string(), pb.clone());
        pb
    }

    /// Marks a stage as complete and prints `message` above remaining bars.
    ///
    /// Unknown stages are ignored.
    pub fn finish(&self, stage: &str, message: &str) {
        if let Some(pb) = self.bars.get(stage) {
            pb.finish_and_clear();
            if self.is_tty {
                let _ = self.multi.println(message);
            }
        }
    }

    pub fn abandon(&self, stage: &str) {
        if let Some(pb) = self.bars.get(stage) {
            pb.abandon();
        }
    }

    fn style_for_stage(name: &str) -> ProgressStyle {
        let template = match name {
            stages::COLLECTING => {
                "[{bar:40.cyan/blue}] {pos}/{len} collecting compilation details {msg}"
            }
            stages::COMPRESSING => "[{bar:40.cyan/blue}] {pos}/{len} compressing {msg}",
            stages::UPLOADING => "{spinner:.green} uploading {msg}",
            _ => "[{bar:40.cyan/blue}] {pos}/{len} {msg}",
        };

        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|e| {
                tracing::warn!(
                    "Failed to parse progress style template for stage '{}': {e}",
                    name
                );
                ProgressStyle::default_bar()
            })
            .progress_chars("#>-")
    }

    #[must_use]
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressManager")
            .field("stages", &self.bars.keys().collect::<Vec<_>>())
            .field("is_tty", &self.is_tty)
            .finish_non_exhaustive()
    }
}
