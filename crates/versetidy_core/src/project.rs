//! The site project a run operates on.
//!
//! A project root is recognized by the site generator's `config.toml`; the
//! tools refuse to run anywhere else so a stray invocation cannot rewrite an
//! unrelated Markdown tree.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Result, TidyError};
use crate::fs::FileSystem;

/// File whose presence marks the project root
pub const SITE_CONFIG_FILE: &str = "config.toml";

/// A validated project root with its settings.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Open the project at `root`, loading `versetidy.toml` if present.
    pub fn open<FS: FileSystem>(fs: &FS, root: &Path) -> Result<Self> {
        if !fs.exists(&root.join(SITE_CONFIG_FILE)) {
            return Err(TidyError::NotProjectRoot(root.to_path_buf()));
        }
        let config = Config::load_or_default(fs, root)?;
        Ok(Self::with_config(root, config))
    }

    /// Build a project from explicit settings, without touching the disk.
    pub fn with_config(root: &Path, config: Config) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
        }
    }

    /// The project root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The settings in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access to the settings, for command-line overrides
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Absolute content directory
    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.config.content_dir)
    }

    /// Content directory, verified to exist
    pub fn require_content_dir<FS: FileSystem>(&self, fs: &FS) -> Result<PathBuf> {
        let dir = self.content_dir();
        if !fs.is_dir(&dir) {
            return Err(TidyError::ContentDirNotFound(dir));
        }
        Ok(dir)
    }

    /// Path relative to the project root, for display
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}
