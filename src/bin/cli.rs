use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::subscriber as tracing_subscriber_global;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use tag_pattern_print as lib;
use lib::pattern::{self, MIN_PATTERN_LEN};
use lib::tag::{self, Verbosity};

#[derive(Parser)]
#[command(name = "tag-pattern-print", version)]
#[command(about = "Fill a pattern file with audio tag metadata and print the result")]
struct Cli {
    /// Path to the pattern file
    pattern_file: PathBuf,

    /// Path to the audio file
    audio_file: PathBuf,

    /// Surface decoder diagnostics on stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit();
        }
        Err(e) => {
            // Exit code 2 is reserved for pattern-file errors, so every
            // argument failure maps to 1 instead of clap's default.
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Initialize the log->tracing bridge and structured logging on stderr;
    // stdout carries nothing but the substituted pattern. The decoder logs
    // its recoverable complaints through `log`, so the filter level is what
    // keeps them quiet unless --verbose (or RUST_LOG) asks for them.
    let _ = LogTracer::init();
    let default_filter = if cli.verbose { "debug" } else { "error" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    let pattern = pattern::load_pattern(&cli.pattern_file)?;
    if pattern.chars().count() < MIN_PATTERN_LEN {
        eprintln!(
            "Error: pattern file {} holds fewer than {} characters; is it truncated?",
            cli.pattern_file.display(),
            MIN_PATTERN_LEN
        );
        std::process::exit(2);
    }

    let verbosity = if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Quiet
    };
    let track_tag = tag::extract(&cli.audio_file, verbosity)
        .with_context(|| format!("loading tags from {}", cli.audio_file.display()))?;

    println!("{}", pattern::substitute(&pattern, &track_tag));
    Ok(())
}
