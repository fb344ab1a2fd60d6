//! World store configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use world_entity::{EntityKind, SerialRange};

use crate::error::WorldError;

/// Serial ranges per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialRanges {
    pub mobile: SerialRange,
    pub item: SerialRange,
    pub guild: SerialRange,
}

impl SerialRanges {
    /// The range for `kind`.
    #[must_use]
    pub const fn get(&self, kind: EntityKind) -> SerialRange {
        match kind {
            EntityKind::Mobile => self.mobile,
            EntityKind::Item => self.item,
            EntityKind::Guild => self.guild,
        }
    }

    /// Replace the range for `kind`.
    pub fn set(&mut self, kind: EntityKind, range: SerialRange) {
        match kind {
            EntityKind::Mobile => self.mobile = range,
            EntityKind::Item => self.item = range,
            EntityKind::Guild => self.guild = range,
        }
    }
}

impl Default for SerialRanges {
    fn default() -> Self {
        Self {
            mobile: EntityKind::Mobile.default_range(),
            item: EntityKind::Item.default_range(),
            guild: EntityKind::Guild.default_range(),
        }
    }
}

/// Configuration for a [`crate::World`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Directory holding the committed save.
    pub save_path: PathBuf,
    /// Parent of the per-save temporary directories.
    pub temp_save_path: PathBuf,
    /// Where the previous save is archived when a new one is promoted.
    pub backup_path: PathBuf,
    /// Number of archived saves to keep.
    pub backups_to_keep: usize,
    /// Serialisation worker threads (0 = one per core).
    pub save_threads: usize,
    /// Saves slower than this announce their duration to everyone.
    pub broadcast_threshold_ms: u64,
    /// Where adds/removes issued during a save are recorded.
    pub safety_log_path: Option<PathBuf>,
    /// Where failed save writes are recorded.
    pub error_log_path: Option<PathBuf>,
    /// Allocation ranges per category.
    pub serial_ranges: SerialRanges,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            save_path: PathBuf::from("Saves"),
            temp_save_path: PathBuf::from("temp"),
            backup_path: PathBuf::from("Backups/Automatic"),
            backups_to_keep: 3,
            save_threads: 0,
            broadcast_threshold_ms: 150,
            safety_log_path: Some(PathBuf::from("world-save-errors.log")),
            error_log_path: Some(PathBuf::from("save-errors.log")),
            serial_ranges: SerialRanges::default(),
        }
    }
}

impl WorldConfig {
    /// Default configuration with every relative path resolved against
    /// `base_dir`.
    #[must_use]
    pub fn rooted_at(base_dir: &Path) -> Self {
        Self::default().resolve_paths(base_dir)
    }

    /// Resolve every relative path against `base_dir`. Absolute paths are
    /// left alone.
    #[must_use]
    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        let join = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base_dir.join(p)
            }
        };
        self.save_path = join(&self.save_path);
        self.temp_save_path = join(&self.temp_save_path);
        self.backup_path = join(&self.backup_path);
        self.safety_log_path = self.safety_log_path.as_deref().map(join);
        self.error_log_path = self.error_log_path.as_deref().map(join);
        self
    }

    /// Read a JSON configuration file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the file cannot be read, does not
    /// parse, or fails [`WorldConfig::validate`].
    pub fn from_json_file(path: &Path) -> Result<Self, WorldError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WorldError::Config(format!("{}: {e}", path.display())))?;
        let config: WorldConfig = serde_json::from_str(&text)
            .map_err(|e| WorldError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if a serial range is empty or starts
    /// at zero, or if the save and temporary paths coincide.
    pub fn validate(&self) -> Result<(), WorldError> {
        for kind in EntityKind::ALL {
            let range = self.serial_ranges.get(kind);
            if range.min == 0 || range.capacity() == 0 {
                return Err(WorldError::Config(format!(
                    "{kind} serial range {}..={} is empty or includes zero",
                    range.min, range.max
                )));
            }
        }
        if self.save_path == self.temp_save_path {
            return Err(WorldError::Config(
                "save path and temporary save path must differ".into(),
            ));
        }
        Ok(())
    }

    /// [`WorldConfig::broadcast_threshold_ms`] as a [`Duration`].
    #[must_use]
    pub fn broadcast_threshold(&self) -> Duration {
        Duration::from_millis(self.broadcast_threshold_ms)
    }

    #[must_use]
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = path.into();
        self
    }

    #[must_use]
    pub fn with_temp_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.temp_save_path = path.into();
        self
    }

    #[must_use]
    pub fn with_backup_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_path = path.into();
        self
    }

    #[must_use]
    pub fn with_backups_to_keep(mut self, count: usize) -> Self {
        self.backups_to_keep = count;
        self
    }

    #[must_use]
    pub fn with_save_threads(mut self, threads: usize) -> Self {
        self.save_threads = threads;
        self
    }

    #[must_use]
    pub fn with_broadcast_threshold(mut self, threshold: Duration) -> Self {
        self.broadcast_threshold_ms = threshold.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_serial_range(mut self, kind: EntityKind, range: SerialRange) -> Self {
        self.serial_ranges.set(kind, range);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldConfig::default();
        assert_eq!(config.save_path, PathBuf::from("Saves"));
        assert_eq!(config.broadcast_threshold(), Duration::from_millis(150));
        assert_eq!(config.serial_ranges.item.min, 0x4000_0000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rooted_paths() {
        let config = WorldConfig::rooted_at(Path::new("/srv/shard"))
            .with_backup_path("/mnt/backups");
        assert_eq!(config.save_path, PathBuf::from("/srv/shard/Saves"));
        assert_eq!(config.temp_save_path, PathBuf::from("/srv/shard/temp"));
        assert_eq!(config.backup_path, PathBuf::from("/mnt/backups"));
        assert_eq!(
            config.safety_log_path,
            Some(PathBuf::from("/srv/shard/world-save-errors.log"))
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(
            &path,
            r#"{ "save_path": "/data/Saves", "backups_to_keep": 7,
                 "serial_ranges": { "guild": { "min": 1, "max": 100 } } }"#,
        )
        .unwrap();
        let config = WorldConfig::from_json_file(&path).unwrap();
        assert_eq!(config.save_path, PathBuf::from("/data/Saves"));
        assert_eq!(config.backups_to_keep, 7);
        assert_eq!(config.temp_save_path, PathBuf::from("temp"));
        assert_eq!(config.serial_ranges.guild, SerialRange::new(1, 100));
        assert_eq!(config.serial_ranges.mobile, EntityKind::Mobile.default_range());
    }

    #[test]
    fn test_bad_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            WorldConfig::from_json_file(&path),
            Err(WorldError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_range() {
        let config =
            WorldConfig::default().with_serial_range(EntityKind::Item, SerialRange::new(0, 10));
        assert!(config.validate().is_err());
        let config = WorldConfig::default().with_temp_save_path("Saves");
        assert!(config.validate().is_err());
    }
}
