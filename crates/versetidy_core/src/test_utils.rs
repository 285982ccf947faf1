//! Test utilities for versetidy_core
//!
//! This module provides shared testing infrastructure, including a mock filesystem
//! that can be used across all test modules.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::fs::FileSystem;

/// A mock filesystem for testing.
///
/// Uses `Arc<Mutex<..>>` for thread-safety and allows cloning
/// while sharing the same underlying file storage. Every write is also
/// appended to a journal so tests can assert on ordering.
#[derive(Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
    failing_writes: Arc<Mutex<HashSet<PathBuf>>>,
    journal: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockFileSystem {
    /// Create a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the mock filesystem (builder pattern).
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.with_bytes(path, content.as_bytes())
    }

    /// Add a file with raw bytes (builder pattern).
    pub fn with_bytes(self, path: &str, content: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), content.to_vec());
        self
    }

    /// Make every write to `path` fail with a permission error.
    pub fn with_failing_write(self, path: &str) -> Self {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(PathBuf::from(path));
        self
    }

    /// Get the content of a file (for test assertions).
    pub fn get_content(&self, path: &str) -> Option<String> {
        self.get_bytes(path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// Get the raw bytes of a file (for test assertions).
    pub fn get_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(&PathBuf::from(path))
            .cloned()
    }

    /// Paths written so far, in order.
    pub fn writes(&self) -> Vec<PathBuf> {
        self.journal.lock().unwrap().clone()
    }
}

impl FileSystem for MockFileSystem {
    fn read_binary(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "File not found"))
    }

    fn write_binary(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        if self.failing_writes.lock().unwrap().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Permission denied",
            ));
        }
        self.journal.lock().unwrap().push(path.to_path_buf());
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn create_new(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.files.lock().unwrap().contains_key(path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "File exists"));
        }
        self.write_binary(path, content.as_bytes())
    }

    fn list_md_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .keys()
            .filter(|p| p.starts_with(dir) && p.extension().is_some_and(|ext| ext == "md"))
            .cloned()
            .collect())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path) || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        // Directories are implicit: any prefix of a stored file
        self.files
            .lock()
            .unwrap()
            .keys()
            .any(|p| p != path && p.starts_with(path))
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        // Mock implementation - directories are implicit
        Ok(())
    }
}
