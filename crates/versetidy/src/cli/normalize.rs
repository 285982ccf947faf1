//! Normalize command - repairs front matter across the content directory

use std::fmt::Write;

use versetidy_core::backup::BackupPolicy;
use versetidy_core::batch::{BatchRunner, DocumentStatus, RunOptions, RunSummary};
use versetidy_core::fs::RealFileSystem;
use versetidy_core::project::Project;

use super::args::NormalizeArgs;

/// How many errors the summary lists before eliding the rest
const MAX_LISTED_ERRORS: usize = 10;

/// Handle the normalize command
/// Returns true when the run completed, even if some documents failed
pub fn handle_normalize(fs: &RealFileSystem, mut project: Project, args: &NormalizeArgs) -> bool {
    if args.no_backup {
        project.config_mut().backup = BackupPolicy::disabled();
    }

    let content_dir = match project.require_content_dir(fs) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    let runner = BatchRunner::new(fs, project.config());
    let options = RunOptions {
        dry_run: args.dry_run,
        scope: args.scope(),
    };

    let summary = match runner.run(&content_dir, options) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("✗ Could not serialize summary: {}", e);
                return false;
            }
        }
    } else {
        print!("{}", render_summary(&summary, &project, args.verbose));
    }
    true
}

/// Human-readable report of a run
pub fn render_summary(summary: &RunSummary, project: &Project, verbose: bool) -> String {
    let mut out = String::new();

    if verbose {
        for outcome in &summary.outcomes {
            let path = project.relative(&outcome.path).display();
            match &outcome.status {
                DocumentStatus::Rewritten { backup } => {
                    let _ = write!(out, "✓ Fixed {}", path);
                    if let Some(backup) = backup {
                        let _ = write!(out, " (backup: {})", project.relative(backup).display());
                    }
                    out.push('\n');
                }
                DocumentStatus::WouldRewrite => {
                    let _ = writeln!(out, "Would fix {}", path);
                }
                DocumentStatus::Unchanged | DocumentStatus::Failed { .. } => continue,
            }
            for fix in &outcome.fixes {
                let _ = writeln!(out, "    {}", fix);
            }
        }
        if !summary.outcomes.is_empty() {
            out.push('\n');
        }
    }

    if summary.dry_run {
        out.push_str("Dry run: no files were written\n");
    }
    out.push_str("Summary:\n");
    let _ = writeln!(out, "  Total files checked: {}", summary.checked);
    if summary.dry_run {
        let _ = writeln!(out, "  Files that would be fixed: {}", summary.rewritten);
    } else {
        let _ = writeln!(out, "  Files fixed: {}", summary.rewritten);
    }
    let _ = writeln!(out, "  Files unchanged: {}", summary.unchanged);
    let _ = writeln!(out, "  Errors: {}", summary.errors.len());

    if summary.has_errors() {
        out.push_str("\nErrors:\n");
        for error in summary.errors.iter().take(MAX_LISTED_ERRORS) {
            let _ = writeln!(
                out,
                "  ✗ {} [{}]: {}",
                project.relative(&error.path).display(),
                error.kind,
                error.message
            );
        }
        if summary.errors.len() > MAX_LISTED_ERRORS {
            let _ = writeln!(
                out,
                "  ... and {} more",
                summary.errors.len() - MAX_LISTED_ERRORS
            );
        }
    }

    out
}
