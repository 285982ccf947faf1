//! Configuration types for versetidy.
//!
//! Settings are read from an optional `versetidy.toml` at the project root,
//! next to the site generator's own `config.toml`. Every field has a
//! default, so most projects need no file at all.
//!
//! # Example
//!
//! ```toml
//! content_dir = "content"
//!
//! [backup]
//! mode = "sibling"
//! suffix = "bak"
//! retention = "keep-oldest"
//!
//! [normalize]
//! section_disallowed_fields = ["date", "template"]
//! section_disallowed_tables = ["taxonomies"]
//!
//! # The defaults; a table given here replaces them
//! [normalize.table_renames]
//! "extra.oldlist" = "extra"
//! "extra.__oldlist" = "extra"
//!
//! [search]
//! output = "static/search-index.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backup::BackupPolicy;
use crate::error::{Result, TidyError};
use crate::fs::FileSystem;
use crate::normalize::NormalizeRules;

/// Name of the optional settings file at the project root
pub const CONFIG_FILE: &str = "versetidy.toml";

/// `Config` holds everything about a run that the user can configure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Content directory, relative to the project root
    pub content_dir: PathBuf,

    /// File name that marks a directory's section document
    pub section_file: String,

    /// Backups taken before a document is rewritten
    pub backup: BackupPolicy,

    /// Rules applied by the normalizer
    pub normalize: NormalizeRules,

    /// Search index settings
    pub search: SearchConfig,
}

/// Settings for the search index builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Output file, relative to the project root
    pub output: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("static/search-index.json"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            section_file: "_index.md".to_string(),
            backup: BackupPolicy::default(),
            normalize: NormalizeRules::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a specific path.
    pub fn load_from<FS: FileSystem>(fs: &FS, path: &Path) -> Result<Self> {
        let contents = fs
            .read_to_string(path)
            .map_err(|e| TidyError::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;

        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load `versetidy.toml` from the project root, or the defaults if the
    /// file does not exist. A file that exists but does not parse is an error.
    pub fn load_or_default<FS: FileSystem>(fs: &FS, root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !fs.exists(&path) {
            log::debug!("No {} at {}, using defaults", CONFIG_FILE, root.display());
            return Ok(Self::default());
        }
        Self::load_from(fs, &path)
    }

    /// Whether `path` names a section document
    pub fn is_section(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name.to_string_lossy() == self.section_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{BackupMode, Retention};
    use crate::test_utils::MockFileSystem;

    #[test]
    fn test_defaults_when_file_missing() {
        let fs = MockFileSystem::new();
        let config = Config::load_or_default(&fs, Path::new("/site")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.content_dir, PathBuf::from("content"));
        assert_eq!(config.backup.suffix, "bak");
        assert_eq!(
            config.normalize.table_renames.get("extra.__oldlist"),
            Some(&"extra".to_string())
        );
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let fs = MockFileSystem::new().with_file(
            "/site/versetidy.toml",
            "content_dir = \"pages\"\n\n[backup]\nretention = \"keep-oldest\"\n\n[normalize.table_renames]\n\"extra.oldlist\" = \"extra\"\n",
        );
        let config = Config::load_or_default(&fs, Path::new("/site")).unwrap();
        assert_eq!(config.content_dir, PathBuf::from("pages"));
        assert_eq!(config.backup.mode, BackupMode::Sibling);
        assert_eq!(config.backup.retention, Retention::KeepOldest);
        assert_eq!(
            config.normalize.table_renames.get("extra.oldlist"),
            Some(&"extra".to_string())
        );
        assert_eq!(config.normalize.table_renames.len(), 1);
        assert_eq!(config.normalize.section_disallowed_tables, vec!["taxonomies"]);
    }

    #[test]
    fn test_disabled_backups() {
        let fs = MockFileSystem::new()
            .with_file("/site/versetidy.toml", "[backup]\nmode = \"disabled\"\n");
        let config = Config::load_or_default(&fs, Path::new("/site")).unwrap();
        assert!(!config.backup.is_enabled());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let fs = MockFileSystem::new().with_file("/site/versetidy.toml", "content_dir = [");
        assert!(matches!(
            Config::load_or_default(&fs, Path::new("/site")),
            Err(TidyError::Toml(_))
        ));
    }

    #[test]
    fn test_is_section() {
        let config = Config::default();
        assert!(config.is_section(Path::new("content/book/_index.md")));
        assert!(!config.is_section(Path::new("content/book/poem.md")));
        assert!(!config.is_section(Path::new("content/book/my_index.md")));
    }
}
