//! Batch runner: normalize every document under the content directory.
//!
//! Each document is read once, normalized in memory and, only if something
//! changed, backed up and then overwritten. Per-document failures are
//! collected in the [`RunSummary`]; they never stop the batch.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::backup::{BackupOutcome, BackupPolicy};
use crate::config::Config;
use crate::error::{DefectKind, DocumentError, Result, TidyError};
use crate::fs::FileSystem;
use crate::normalize::{Fix, Normalizer};

/// Which documents a run touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Sections and pages
    #[default]
    All,
    /// Only section documents
    SectionsOnly,
    /// Only page documents
    PagesOnly,
}

impl Scope {
    fn includes(&self, is_section: bool) -> bool {
        match self {
            Scope::All => true,
            Scope::SectionsOnly => is_section,
            Scope::PagesOnly => !is_section,
        }
    }
}

/// Options for a batch run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute changes without writing anything
    pub dry_run: bool,
    /// Which documents to process
    pub scope: Scope,
}

/// What happened to one document.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum DocumentStatus {
    /// Already normalized
    Unchanged,
    /// Rewritten on disk; `backup` is where the original went, if anywhere
    Rewritten { backup: Option<PathBuf> },
    /// Would be rewritten (dry run)
    WouldRewrite,
    /// Left untouched because of a defect
    Failed { error: DocumentError },
}

/// Per-document result.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    /// Document path
    pub path: PathBuf,
    /// Whether it was treated as a section
    pub is_section: bool,
    /// Result
    #[serde(flatten)]
    pub status: DocumentStatus,
    /// Corrections applied (or that would be applied)
    pub fixes: Vec<Fix>,
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Number of documents examined
    pub checked: usize,
    /// Number of documents rewritten (or that would be, on a dry run)
    pub rewritten: usize,
    /// Number of documents already normalized
    pub unchanged: usize,
    /// Every per-document failure, in discovery order
    pub errors: Vec<DocumentError>,
    /// Every document's outcome, in discovery order
    pub outcomes: Vec<DocumentOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: DocumentOutcome) {
        self.checked += 1;
        match &outcome.status {
            DocumentStatus::Unchanged => self.unchanged += 1,
            DocumentStatus::Rewritten { .. } | DocumentStatus::WouldRewrite => {
                self.rewritten += 1
            }
            DocumentStatus::Failed { error } => self.errors.push(error.clone()),
        }
        self.outcomes.push(outcome);
    }

    /// Returns true if any document failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Runs the normalizer over a set of documents.
pub struct BatchRunner<FS: FileSystem> {
    fs: FS,
    normalizer: Normalizer,
    backup: BackupPolicy,
    config: Config,
}

impl<FS: FileSystem> BatchRunner<FS> {
    /// Create a runner using the rules, backup policy and section file name
    /// from `config`
    pub fn new(fs: FS, config: &Config) -> Self {
        Self {
            fs,
            normalizer: Normalizer::new(config.normalize.clone()),
            backup: config.backup.clone(),
            config: config.clone(),
        }
    }

    /// Override the backup policy
    pub fn with_backup(mut self, backup: BackupPolicy) -> Self {
        self.backup = backup;
        self
    }

    /// Normalize every Markdown file under `content_dir`.
    ///
    /// Fails only if the directory cannot be listed.
    pub fn run(&self, content_dir: &Path, options: RunOptions) -> Result<RunSummary> {
        let paths = self
            .fs
            .list_md_files(content_dir)
            .map_err(|e| TidyError::FileRead {
                path: content_dir.to_path_buf(),
                source: e,
            })?;
        log::info!(
            "Found {} markdown files under {}",
            paths.len(),
            content_dir.display()
        );
        Ok(self.run_paths(&paths, options))
    }

    /// Normalize an explicit list of documents.
    pub fn run_paths(&self, paths: &[PathBuf], options: RunOptions) -> RunSummary {
        let mut summary = RunSummary {
            dry_run: options.dry_run,
            ..RunSummary::default()
        };

        for path in paths {
            let is_section = self.config.is_section(path);
            if !options.scope.includes(is_section) {
                continue;
            }
            summary.record(self.process_document(path, is_section, options.dry_run));
        }

        summary
    }

    /// Read, normalize and (unless `dry_run`) back up and rewrite one document.
    pub fn process_document(&self, path: &Path, is_section: bool, dry_run: bool) -> DocumentOutcome {
        log::debug!("Checking {}", path.display());
        let outcome = |status, fixes| DocumentOutcome {
            path: path.to_path_buf(),
            is_section,
            status,
            fixes,
        };
        let failed = |kind, message: String| {
            let error = DocumentError::new(path, kind, message);
            log::warn!("{}", error);
            outcome(DocumentStatus::Failed { error }, Vec::new())
        };

        let bytes = match self.fs.read_binary(path) {
            Ok(bytes) => bytes,
            Err(e) => return failed(DefectKind::IoError, format!("read failed: {}", e)),
        };

        let text = match std::str::from_utf8(&bytes) {
            Ok(text) => text,
            Err(e) => return failed(DefectKind::DecodeError, format!("not valid UTF-8: {}", e)),
        };

        let normalized = match self.normalizer.normalize(text, is_section) {
            Ok(normalized) => normalized,
            Err(kind) => return failed(kind, defect_message(kind).to_string()),
        };

        if !normalized.changed {
            return outcome(DocumentStatus::Unchanged, normalized.fixes);
        }

        if dry_run {
            return outcome(DocumentStatus::WouldRewrite, normalized.fixes);
        }

        // The backup must land before the original is replaced
        let backup = match self.backup.backup(&self.fs, path, &bytes) {
            Ok(BackupOutcome::Written(p)) | Ok(BackupOutcome::Retained(p)) => Some(p),
            Ok(BackupOutcome::Skipped) => None,
            Err(e) => {
                return failed(
                    DefectKind::IoError,
                    format!("backup failed, document left untouched: {}", e),
                );
            }
        };

        if let Err(e) = self.fs.write_file(path, &normalized.text) {
            return failed(DefectKind::IoError, format!("write failed: {}", e));
        }

        log::info!(
            "Rewrote {} ({} fix(es))",
            path.display(),
            normalized.fixes.len()
        );
        outcome(DocumentStatus::Rewritten { backup }, normalized.fixes)
    }
}

fn defect_message(kind: DefectKind) -> &'static str {
    match kind {
        DefectKind::MissingFrontMatter => "does not start with a +++ or --- front matter fence",
        DefectKind::UnterminatedBlock => "front matter block has no closing fence",
        DefectKind::DecodeError => "not valid UTF-8",
        DefectKind::IoError => "I/O error",
    }
}
