//! `versetidy` command line tool.

/// CLI module - command-line interface for versetidy
mod cli;

fn main() {
    cli::run_cli();
}
