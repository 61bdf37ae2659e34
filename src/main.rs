use std::fs;
use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod context;
mod model;
mod patch;
mod rewrite;
mod scalar;
mod scanner;

use cli::Cli;
use patch::{Outcome, PatchRequest};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let content = fs::read_to_string(&cli.file).with_context(|| {
        format!(
            "could not read the modulemd-packager file {}",
            cli.file.display()
        )
    })?;

    let request = PatchRequest {
        old_platform: &cli.old,
        new_platform: &cli.new,
        skip_unsuitable: cli.skip,
    };
    let outcome = patch::process_string(&content, &request)
        .with_context(|| cli.file.display().to_string())?;

    match outcome {
        Outcome::Skipped(reason) => {
            eprintln!("{}: Skipped: {reason}", cli.file.display());
            Ok(())
        }
        Outcome::Applied(text) if cli.stdout => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(text.as_bytes())
                .context("could not write to standard output")?;
            Ok(())
        }
        Outcome::Applied(text) => rewrite::replace_file(&cli.file, &text),
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "modulemd_add_platform=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
