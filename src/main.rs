use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pipewright::{check, describe, render_json, render_text, Assembly, BusManifest};

#[derive(Parser, Debug)]
#[command(name = "pipewright")]
#[command(about = "Check message pipeline manifests before an endpoint goes live")]
struct Args {
    /// Log configuration steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate every endpoint in a manifest
    Check {
        /// Path to the manifest (TOML, JSON or YAML)
        manifest: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the resolved specifications of every endpoint
    Describe {
        /// Path to the manifest (TOML, JSON or YAML)
        manifest: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Check { manifest, format } => {
            let assembly = load(&manifest)?;
            let reports = check(&assembly);

            let output = match format {
                Format::Text => render_text(&reports),
                Format::Json => render_json(&reports)?,
            };
            print!("{}", output);
            if format == Format::Json {
                println!();
            }

            if reports.iter().any(|r| r.has_errors()) {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Command::Describe { manifest } => {
            let assembly = load(&manifest)?;
            print!("{}", describe(&assembly));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(path: &Path) -> Result<Assembly> {
    let manifest = BusManifest::load(path)?;
    info!(
        path = %path.display(),
        endpoints = manifest.endpoints.len(),
        "manifest loaded"
    );
    Assembly::from_manifest(&manifest)
}

/// Install a stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
