#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Backup copies taken before a rewrite
pub mod backup;

/// Batch runs over the content tree
pub mod batch;

/// Configuration options
pub mod config;

/// Error (common error types)
pub mod error;

/// Filesystem abstraction
pub mod fs;

/// Front matter splitting and parsing
pub mod frontmatter;

/// Front matter normalization
pub mod normalize;

/// Project root detection
pub mod project;

/// Chapter and poem page scaffolding
pub mod scaffold;

/// Search index generation
pub mod search_index;

#[cfg(test)]
pub mod test_utils;
