//! Background snapshot writer.
//!
//! The writer owns only the serialised bytes. It never sees the live maps,
//! so the control thread keeps running while the files are written.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;
use world_codec::{CategorySnapshot, CategoryStats, write_category};

use crate::error::SaveError;
use crate::promote::{promote, timestamp};

/// Everything the writer needs for one save.
pub(crate) struct WriteJob {
    pub(crate) snapshots: Vec<CategorySnapshot>,
    pub(crate) temp_root: PathBuf,
    pub(crate) save_dir: PathBuf,
    pub(crate) backup_root: PathBuf,
    pub(crate) backups_to_keep: usize,
}

/// What a successful write produced.
#[derive(Debug, Clone)]
pub struct WriteSummary {
    /// Per-category statistics, in save order.
    pub stats: Vec<CategoryStats>,
    /// The save directory now holding this snapshot.
    pub save_dir: PathBuf,
    /// Where the previous save was archived, if there was one.
    pub backup: Option<PathBuf>,
    /// Time spent writing and promoting.
    pub elapsed: Duration,
}

/// The writer's answer. The snapshots come back so their buffers can be
/// returned to the entities.
pub(crate) struct WriteReport {
    pub(crate) result: Result<WriteSummary, SaveError>,
    pub(crate) snapshots: Vec<CategorySnapshot>,
}

impl WriteReport {
    fn lost() -> Self {
        Self {
            result: Err(SaveError::WriterLost),
            snapshots: Vec::new(),
        }
    }
}

/// A write in flight.
pub(crate) struct PendingWrite {
    rx: Receiver<WriteReport>,
    handle: Option<JoinHandle<()>>,
}

impl PendingWrite {
    /// The report, if the writer has finished. A writer that exited without
    /// reporting counts as a failed write.
    pub(crate) fn try_finish(&mut self) -> Option<WriteReport> {
        let report = match self.rx.try_recv() {
            Ok(report) => report,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => WriteReport::lost(),
        };
        self.join();
        Some(report)
    }

    /// Block until the writer reports.
    pub(crate) fn wait(mut self) -> WriteReport {
        let report = self.rx.recv().unwrap_or_else(|_| WriteReport::lost());
        self.join();
        report
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("save writer panicked");
        }
    }
}

/// Start writing `job` on its own thread.
pub(crate) fn dispatch(job: WriteJob) -> Result<PendingWrite, SaveError> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let handle = thread::Builder::new()
        .name("world-save-writer".into())
        .spawn(move || {
            let report = run(job);
            if tx.send(report).is_err() {
                warn!("world dropped before the save writer reported");
            }
        })
        .map_err(SaveError::Spawn)?;
    Ok(PendingWrite {
        rx,
        handle: Some(handle),
    })
}

fn run(job: WriteJob) -> WriteReport {
    let start = Instant::now();
    let temp_dir = job
        .temp_root
        .join(format!("{}-{}", timestamp(), Uuid::new_v4().simple()));
    debug!(path = %temp_dir.display(), "writing snapshot");

    let result = write_all(&job, &temp_dir).and_then(|stats| {
        let backup = promote(&temp_dir, &job.save_dir, &job.backup_root, job.backups_to_keep)?;
        Ok(WriteSummary {
            stats,
            save_dir: job.save_dir.clone(),
            backup,
            elapsed: start.elapsed(),
        })
    });

    if result.is_err()
        && temp_dir.exists()
        && let Err(error) = fs::remove_dir_all(&temp_dir)
    {
        warn!(path = %temp_dir.display(), %error, "failed to remove partial snapshot");
    }

    WriteReport {
        result,
        snapshots: job.snapshots,
    }
}

fn write_all(job: &WriteJob, temp_dir: &Path) -> Result<Vec<CategoryStats>, SaveError> {
    job.snapshots
        .iter()
        .map(|snapshot| write_category(temp_dir, snapshot).map_err(SaveError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use world_codec::{CategoryPaths, SnapshotRecord};
    use world_entity::{EntityKind, Serial};

    use super::*;

    fn job(root: &Path) -> WriteJob {
        WriteJob {
            snapshots: vec![CategorySnapshot {
                kind: EntityKind::Item,
                types: vec!["Items.Gold".into()],
                records: vec![SnapshotRecord {
                    type_index: 0,
                    serial: Serial(0x4000_0001),
                    body: vec![1, 2, 3, 4],
                }],
            }],
            temp_root: root.join("temp"),
            save_dir: root.join("Saves"),
            backup_root: root.join("Backups"),
            backups_to_keep: 2,
        }
    }

    #[test]
    fn test_write_and_promote() {
        let root = tempfile::tempdir().unwrap();
        let report = dispatch(job(root.path())).unwrap().wait();
        let summary = report.result.unwrap();
        assert_eq!(summary.stats[0].entities, 1);
        assert!(summary.backup.is_none());
        assert!(CategoryPaths::new(&root.path().join("Saves"), EntityKind::Item).exists());
        assert_eq!(report.snapshots[0].records[0].body, vec![1, 2, 3, 4]);
        assert_eq!(fs::read_dir(root.path().join("temp")).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_temp_root_fails_cleanly() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("temp"), b"not a directory").unwrap();
        let report = dispatch(job(root.path())).unwrap().wait();
        assert!(matches!(report.result, Err(SaveError::Codec(_))));
        assert!(!root.path().join("Saves").exists());
        assert_eq!(report.snapshots.len(), 1);
    }

    #[test]
    fn test_try_finish_eventually_reports() {
        let root = tempfile::tempdir().unwrap();
        let mut pending = dispatch(job(root.path())).unwrap();
        let report = loop {
            if let Some(report) = pending.try_finish() {
                break report;
            }
            thread::sleep(Duration::from_millis(5));
        };
        assert!(report.result.is_ok());
    }
}
