//! Index command - builds the JSON search index

use std::path::PathBuf;

use versetidy_core::fs::RealFileSystem;
use versetidy_core::project::Project;
use versetidy_core::search_index::SearchIndexBuilder;

/// Handle the index command
/// Returns true on success, false on error
pub fn handle_index(fs: &RealFileSystem, project: &Project, output: Option<PathBuf>) -> bool {
    let content_dir = match project.require_content_dir(fs) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let output = output.unwrap_or_else(|| project.config().search.output.clone());
    let output = if output.is_relative() {
        project.root().join(output)
    } else {
        output
    };

    let builder = SearchIndexBuilder::new(fs);
    let (index, bytes) = match builder.build_and_write(&content_dir, &output) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    for failure in &index.failures {
        eprintln!(
            "✗ {} [{}]: {}",
            project.relative(&failure.path).display(),
            failure.kind,
            failure.message
        );
    }

    println!(
        "✓ Wrote {} entries to {} ({:.1} KB)",
        index.entries.len(),
        project.relative(&output).display(),
        bytes as f64 / 1024.0
    );
    println!(
        "  {} files found, {} drafts skipped",
        index.files_found, index.drafts_skipped
    );

    let warnings = index.validate();
    if warnings.is_empty() {
        println!("✓ Index validated");
    } else {
        for warning in &warnings {
            println!("⚠ {}", warning);
        }
    }

    println!("Sections:");
    for (section, count) in index.section_counts() {
        println!("  {}: {}", section, count);
    }

    true
}
