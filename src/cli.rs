//! CLI argument parsing.
//!
//! The CLI is intentionally thin: everything of substance lives behind
//! `patch::process_string`, which takes text in and hands text back.
use clap::Parser;
use std::path::PathBuf;

/// Add a context for the given platform to a modulemd-packager document.
#[derive(Parser, Debug)]
#[command(
    name = "modulemd-add-platform",
    version,
    about = "Add a build configuration for a new platform to a modulemd-packager document"
)]
pub struct Cli {
    /// A file with a modulemd-packager document to edit
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Old platform whose configurations are used as templates
    #[arg(long, value_name = "PLATFORM")]
    pub old: String,

    /// New platform to add configurations for
    #[arg(long, value_name = "PLATFORM")]
    pub new: String,

    /// Ignore documents without a context for the old platform and
    /// modulemd-v2 documents
    #[arg(long)]
    pub skip: bool,

    /// Print the edited document to standard output instead of rewriting FILE
    #[arg(long)]
    pub stdout: bool,

    /// Log parsing and editing
    #[arg(long)]
    pub debug: bool,
}
