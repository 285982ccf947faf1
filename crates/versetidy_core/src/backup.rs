//! Backup policy for rewritten documents.
//!
//! Before a document is overwritten its original bytes are copied to a
//! sibling file so a bad rewrite can be recovered by hand. The policy is
//! explicit: backups can be switched off, the suffix changed, and an
//! existing backup either replaced or kept.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fs::FileSystem;

/// Whether and where backups are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackupMode {
    /// No backups are written
    Disabled,
    /// A sibling file with the backup suffix in place of the extension
    #[default]
    Sibling,
}

/// What to do when a backup file already exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Retention {
    /// Replace it with the current original
    #[default]
    Overwrite,
    /// Leave it, so the earliest original survives repeated runs
    KeepOldest,
}

/// Outcome of [`BackupPolicy::backup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The original bytes were written to this path
    Written(PathBuf),
    /// A backup already existed and was retained
    Retained(PathBuf),
    /// Backups are disabled
    Skipped,
}

/// Configuration for backups taken before a rewrite.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupPolicy {
    /// Whether backups are written at all
    pub mode: BackupMode,
    /// Extension used for the backup file (without the dot)
    pub suffix: String,
    /// Handling of an existing backup
    pub retention: Retention,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            mode: BackupMode::Sibling,
            suffix: "bak".to_string(),
            retention: Retention::Overwrite,
        }
    }
}

impl BackupPolicy {
    /// A policy that never writes backups
    pub fn disabled() -> Self {
        Self {
            mode: BackupMode::Disabled,
            ..Self::default()
        }
    }

    /// Whether this policy writes anything
    pub fn is_enabled(&self) -> bool {
        self.mode != BackupMode::Disabled
    }

    /// Where the backup of `path` goes: `poem.md` -> `poem.bak`.
    pub fn backup_path_for(&self, path: &Path) -> PathBuf {
        path.with_extension(self.suffix.trim_start_matches('.'))
    }

    /// Copy `original` (the pre-rewrite bytes of `path`) to its backup file.
    pub fn backup<FS: FileSystem>(
        &self,
        fs: &FS,
        path: &Path,
        original: &[u8],
    ) -> io::Result<BackupOutcome> {
        if !self.is_enabled() {
            return Ok(BackupOutcome::Skipped);
        }

        let backup_path = self.backup_path_for(path);
        if backup_path == path {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "backup suffix '{}' would overwrite the document itself",
                    self.suffix
                ),
            ));
        }

        if self.retention == Retention::KeepOldest && fs.exists(&backup_path) {
            log::debug!("Keeping existing backup {}", backup_path.display());
            return Ok(BackupOutcome::Retained(backup_path));
        }

        fs.write_binary(&backup_path, original)?;
        Ok(BackupOutcome::Written(backup_path))
    }
}
