//! Append-only diagnostic logs kept next to the tracing output.
//!
//! Writes here are best effort. A failure to append is reported through
//! `tracing` and otherwise ignored, so a full disk never stops the world.

use std::backtrace::Backtrace;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};
use world_codec::CategoryStats;
use world_entity::{EntityKind, Serial};

#[derive(Debug, Clone, Default)]
pub(crate) struct Diagnostics {
    safety_log: Option<PathBuf>,
    error_log: Option<PathBuf>,
}

impl Diagnostics {
    pub(crate) fn new(safety_log: Option<PathBuf>, error_log: Option<PathBuf>) -> Self {
        Self {
            safety_log,
            error_log,
        }
    }

    /// Record an add or remove issued while the snapshot pass was running,
    /// with the caller's stack.
    pub(crate) fn safety(&self, action: &str, kind: EntityKind, serial: Serial) {
        warn!(%kind, %serial, action, "entity mutated while the world is saving");
        let Some(path) = &self.safety_log else {
            return;
        };
        let entry = format!(
            "{} Warning: Attempted to {action} {kind} {serial} during world save.\n{}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            Backtrace::force_capture()
        );
        append(path, &entry);
    }

    /// Record a failed save attempt.
    pub(crate) fn save_error(&self, error: &dyn std::error::Error) {
        let Some(path) = &self.error_log else {
            return;
        };
        let mut entry = format!(
            "Exception Caught in World.Save: {}\n{error}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let mut source = error.source();
        while let Some(cause) = source {
            entry.push_str(&format!("  caused by: {cause}\n"));
            source = cause.source();
        }
        entry.push('\n');
        append(path, &entry);
    }
}

fn append(path: &Path, entry: &str) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(entry.as_bytes()));
    if let Err(error) = result {
        warn!(path = %path.display(), %error, "failed to append diagnostic log");
    }
}

/// Log what a finished write put on disk.
pub(crate) fn log_save_stats(stats: &[CategoryStats]) {
    for category in stats {
        for (type_name, count) in &category.per_type {
            debug!(category = %category.kind, type_name, count, "saved");
        }
    }
    let entities: usize = stats.iter().map(|c| c.entities).sum();
    let bytes: u64 = stats.iter().map(|c| c.bytes).sum();
    info!(entities, bytes, "save statistics");
}
