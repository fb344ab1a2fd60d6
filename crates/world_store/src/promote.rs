//! Adopting a written snapshot as the save directory, and keeping backups.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

use crate::error::{LoadError, SaveError};

const STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Length of a formatted stamp, e.g. `2024-01-31-23-59-59`.
const STAMP_LEN: usize = 19;

/// Directory name stamp for backups and temporary saves.
pub(crate) fn timestamp() -> String {
    Local::now().format(STAMP_FORMAT).to_string()
}

/// Swap `temp_dir` in as `save_dir`.
///
/// An existing save is first moved to a fresh directory under `backup_root`.
/// If the snapshot cannot then be moved into place the old save is moved
/// back, so `save_dir` is either the old save or the new one. Returns the
/// backup directory, if one was made.
pub(crate) fn promote(
    temp_dir: &Path,
    save_dir: &Path,
    backup_root: &Path,
    backups_to_keep: usize,
) -> Result<Option<PathBuf>, SaveError> {
    if let Some(parent) = save_dir.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SaveError::Promote {
            from: temp_dir.to_path_buf(),
            to: save_dir.to_path_buf(),
            source,
        })?;
    }

    let backup = if save_dir.exists() {
        fs::create_dir_all(backup_root).map_err(|source| SaveError::Promote {
            from: save_dir.to_path_buf(),
            to: backup_root.to_path_buf(),
            source,
        })?;
        let target = unique_dir(backup_root, &timestamp());
        fs::rename(save_dir, &target).map_err(|source| SaveError::Promote {
            from: save_dir.to_path_buf(),
            to: target.clone(),
            source,
        })?;
        Some(target)
    } else {
        None
    };

    if let Err(source) = fs::rename(temp_dir, save_dir) {
        if let Some(backup) = &backup
            && let Err(error) = fs::rename(backup, save_dir)
        {
            warn!(
                backup = %backup.display(),
                save = %save_dir.display(),
                %error,
                "failed to restore previous save after a failed promotion"
            );
        }
        return Err(SaveError::Promote {
            from: temp_dir.to_path_buf(),
            to: save_dir.to_path_buf(),
            source,
        });
    }

    if backup.is_some() {
        prune_backups(backup_root, backups_to_keep);
    }
    Ok(backup)
}

fn unique_dir(root: &Path, stem: &str) -> PathBuf {
    let mut candidate = root.join(stem);
    let mut n = 1;
    while candidate.exists() {
        candidate = root.join(format!("{stem}-{n}"));
        n += 1;
    }
    candidate
}

/// Subdirectories of `root`, oldest name first. Missing `root` is empty.
fn sorted_subdirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(error),
    };
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort_by_cached_key(|dir| stamp_order(dir));
    Ok(dirs)
}

/// Sort key for a stamped directory: the name without its collision suffix,
/// then the suffix as a number, so `stem-10` follows `stem-9`.
fn stamp_order(dir: &Path) -> (String, u32) {
    let name = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some((stem, suffix)) = name.split_at_checked(STAMP_LEN)
        && let Some(n) = suffix.strip_prefix('-').and_then(|n| n.parse().ok())
    {
        return (stem.to_owned(), n);
    }
    (name, 0)
}

/// Delete the oldest backups so at most `keep` remain.
pub(crate) fn prune_backups(backup_root: &Path, keep: usize) {
    let dirs = match sorted_subdirs(backup_root) {
        Ok(dirs) => dirs,
        Err(error) => {
            warn!(path = %backup_root.display(), %error, "failed to list backups");
            return;
        }
    };
    let excess = dirs.len().saturating_sub(keep);
    for dir in &dirs[..excess] {
        match fs::remove_dir_all(dir) {
            Ok(()) => info!(path = %dir.display(), "pruned old backup"),
            Err(error) => warn!(path = %dir.display(), %error, "failed to prune backup"),
        }
    }
}

/// If `save_dir` is missing but a backup exists, move the newest backup into
/// place. Returns the restored backup's path.
pub(crate) fn recover_missing_save(
    save_dir: &Path,
    backup_root: &Path,
) -> Result<Option<PathBuf>, LoadError> {
    if save_dir.exists() {
        return Ok(None);
    }
    let newest = match sorted_subdirs(backup_root) {
        Ok(mut dirs) => dirs.pop(),
        Err(source) => {
            return Err(LoadError::Restore {
                from: backup_root.to_path_buf(),
                to: save_dir.to_path_buf(),
                source,
            });
        }
    };
    let Some(newest) = newest else {
        return Ok(None);
    };
    warn!(
        save = %save_dir.display(),
        backup = %newest.display(),
        "save directory missing, restoring newest backup"
    );
    if let Some(parent) = save_dir.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| LoadError::Restore {
            from: newest.clone(),
            to: save_dir.to_path_buf(),
            source,
        })?;
    }
    fs::rename(&newest, save_dir).map_err(|source| LoadError::Restore {
        from: newest.clone(),
        to: save_dir.to_path_buf(),
        source,
    })?;
    Ok(Some(newest))
}

/// Temporary save directories left behind by an interrupted writer. They are
/// reported and otherwise ignored.
pub(crate) fn stale_temp_dirs(temp_root: &Path) -> Vec<PathBuf> {
    match sorted_subdirs(temp_root) {
        Ok(dirs) => {
            for dir in &dirs {
                warn!(path = %dir.display(), "ignoring incomplete save from a previous run");
            }
            dirs
        }
        Err(error) => {
            warn!(path = %temp_root.display(), %error, "failed to list temporary saves");
            Vec::new()
        }
    }
}
