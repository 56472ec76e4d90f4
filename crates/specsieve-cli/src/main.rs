//! specsieve
//!
//! Loads a converted specification (document.json, tables_data.json and the
//! optional markdown/plaintext exports), extracts its requirements and
//! writes them as JSON lines and CSV.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::info;

mod cli;
mod input;
mod output;

use cli::{Cli, Commands, LogFormat};
use specsieve_extract::{CoverageReport, ExtractionConfig, Extractor};

const LOG_TARGETS: [&str; 3] = ["specsieve", "specsieve_core", "specsieve_extract"];

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    let config = match &cli.config {
        Some(path) => ExtractionConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ExtractionConfig::default(),
    };
    let extractor = Extractor::new(config);

    match cli.command {
        Commands::Extract {
            input,
            output: output_dir,
            filename,
            audit,
        } => {
            let document = input::load_input(&input, filename)?;
            let outcome = extractor.extract(&document);
            for phase in &outcome.phases {
                info!(
                    phase = %phase.phase,
                    produced = phase.produced,
                    failed = phase.outcome.is_failed(),
                    latency_us = phase.latency_us,
                    "phase result"
                );
            }

            let out_dir = output_dir.as_deref().unwrap_or(input.as_path());
            let written = output::write_outputs(&outcome, out_dir, audit)?;
            info!(
                requirements = outcome.requirements.len(),
                doc_type = %outcome.doc_type(),
                jsonl = %written.jsonl.display(),
                csv = %written.csv.display(),
                "requirements written"
            );
            if let Some(path) = written.coverage {
                info!(coverage = %path.display(), "coverage audit written");
            }
        }

        Commands::Audit { input, filename } => {
            let document = input::load_input(&input, filename)?;
            let outcome = extractor.extract(&document);
            print_json(&outcome.coverage(), &input)?;
        }
    }

    Ok(())
}

fn print_json(report: &CoverageReport, input: &Path) -> Result<()> {
    let rendered = serde_json::to_string_pretty(report)
        .with_context(|| format!("rendering audit for {}", input.display()))?;
    println!("{rendered}");
    Ok(())
}

/// Initialize tracing
///
/// Logs go to stderr so `audit` output on stdout stays machine readable.
fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = if verbose { "debug" } else { "info" };
    let directives = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let filter = if verbose {
        EnvFilter::new(directives)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}
