//! Command-line argument structures and enums

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use versetidy_core::batch::Scope;

#[derive(Parser, Debug)]
#[command(name = "versetidy")]
#[command(version)]
#[command(about = "Repair front matter and maintain content for a Zola poetry site", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for the default `normalize` command
    #[command(flatten)]
    pub normalize: NormalizeArgs,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fix front matter in every document under the content directory
    #[command(alias = "fix")]
    Normalize(NormalizeArgs),

    /// Build the JSON search index
    Index {
        /// Output file (default: static/search-index.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create missing chapter and poem pages from a book manifest
    Scaffold {
        /// Path to the book manifest (TOML)
        manifest: PathBuf,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct NormalizeArgs {
    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Do not write .bak copies before rewriting
    #[arg(long)]
    pub no_backup: bool,

    /// Only process section documents (_index.md)
    #[arg(long, conflicts_with = "pages_only")]
    pub sections_only: bool,

    /// Only process page documents
    #[arg(long)]
    pub pages_only: bool,

    /// List every fix applied to each document
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl NormalizeArgs {
    /// Which documents the flags select
    pub fn scope(&self) -> Scope {
        if self.sections_only {
            Scope::SectionsOnly
        } else if self.pages_only {
            Scope::PagesOnly
        } else {
            Scope::All
        }
    }
}
