//! Scaffold command - creates missing chapter and poem pages

use std::path::Path;

use versetidy_core::fs::RealFileSystem;
use versetidy_core::project::Project;
use versetidy_core::scaffold::{BookManifest, Scaffolder};

/// Cover images live under `<covers>/<book dir>/`
const COVERS_DIR: &str = "static/images/covers";

/// Handle the scaffold command
/// Returns true on success, false on error
pub fn handle_scaffold(fs: &RealFileSystem, project: &Project, manifest_path: &Path) -> bool {
    let book = match BookManifest::load(fs, manifest_path) {
        Ok(book) => book,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let content_dir = match project.require_content_dir(fs) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let scaffolder = Scaffolder::new(fs, project.config())
        .with_covers_dir(project.root().join(COVERS_DIR));
    let summary = match scaffolder.scaffold(&content_dir, &book) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    for dir in &summary.missing_chapters {
        eprintln!(
            "✗ Chapter directory not found: {}",
            project.relative(dir).display()
        );
    }
    for path in summary.chapters_created.iter().chain(&summary.poems_created) {
        println!("✓ Created {}", project.relative(path).display());
    }

    if let Some(dir) = &summary.cover_dir {
        println!("✓ Cover directory {}", project.relative(dir).display());
    }

    println!();
    println!("Summary for 《{}》:", book.title);
    println!(
        "  Chapters: {} created, {} existing",
        summary.chapters_created.len(),
        summary.chapters_existing.len()
    );
    println!(
        "  Poems: {} created, {} existing",
        summary.poems_created.len(),
        summary.poems_existing.len()
    );
    if !summary.missing_chapters.is_empty() {
        println!(
            "  Missing chapter directories: {}",
            summary.missing_chapters.len()
        );
    }

    true
}
