//! Command dispatch for the `versetidy` binary.

/// Clap argument definitions
mod args;

/// `index` command
mod index;

/// `normalize` command (the default)
mod normalize;

/// `scaffold` command
mod scaffold;

use clap::Parser;
use std::path::PathBuf;

use versetidy_core::fs::RealFileSystem;
use versetidy_core::project::Project;

use args::{Cli, Commands};

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();

    // RUST_LOG overrides; by default only errors are logged so the summary stays readable
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let fs = RealFileSystem;
    let project = match open_project(&fs, cli.root) {
        Some(project) => project,
        None => std::process::exit(1),
    };

    let success = match cli.command {
        None => normalize::handle_normalize(&fs, project, &cli.normalize),
        Some(Commands::Normalize(args)) => normalize::handle_normalize(&fs, project, &args),
        Some(Commands::Index { output }) => index::handle_index(&fs, &project, output),
        Some(Commands::Scaffold { manifest }) => {
            scaffold::handle_scaffold(&fs, &project, &manifest)
        }
    };

    if !success {
        std::process::exit(1);
    }
}

/// Open the project at `--root` or the current directory.
/// Prints the error and returns None if it is not a site root.
fn open_project(fs: &RealFileSystem, root: Option<PathBuf>) -> Option<Project> {
    let root = match root {
        Some(root) => root,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                eprintln!("✗ Could not determine current directory: {}", e);
                return None;
            }
        },
    };

    match Project::open(fs, &root) {
        Ok(project) => {
            log::debug!("Project root: {}", project.root().display());
            Some(project)
        }
        Err(e) => {
            eprintln!("✗ {}", e);
            None
        }
    }
}
