//! `depgate` — scan dependency manifests, enrich them from registries, and enforce policy.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load tool config ([`config::load_config`]); `--policy`/`--offline` override it.
//! 3. Detect languages and analyze their manifests ([`orchestrator::run`]).
//! 4. Enrich from package registries unless offline ([`registry::RegistrySet`]).
//! 5. Evaluate the policy document ([`policy`]).
//! 6. Render the requested report ([`report`]).
//! 7. Exit `0` (passed), `1` (failing issues) or `2` (aborted).

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use depgate::cli::{Cli, ReportFormat};
use depgate::config::load_config;
use depgate::enrich::EnrichOptions;
use depgate::models::Language;
use depgate::orchestrator::{self, RunOptions};
use depgate::registry::RegistrySet;
use depgate::report;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) => {
            eprintln!("{} {error:#}", "depgate error:".red().bold());
            ExitCode::from(2)
        }
    }
}

/// Returns whether the analysis passed.
async fn run(cli: Cli) -> Result<bool> {
    let path = cli
        .path
        .canonicalize()
        .unwrap_or_else(|_| cli.path.clone());

    let mut config = load_config(&path, cli.config.as_deref())?;
    if cli.offline {
        config.registry.online = false;
    }
    let policy_path = match &cli.policy {
        Some(policy) => Some(policy.clone()),
        None => config.policy_path(&path),
    };

    let mut options = RunOptions {
        excluded: cli.exclude_lang.iter().copied().map(Language::from).collect(),
        policy_path,
        ..Default::default()
    };
    let languages = orchestrator::languages(&path, &options);
    options.languages = languages.clone();

    if !cli.quiet && cli.report == ReportFormat::Terminal {
        for language in &languages {
            eprintln!("  {} {}", "Detected".cyan(), language);
        }
    }

    let result = if config.registry.online {
        let registry = RegistrySet::new(&config.registry).context("building registry clients")?;
        options.enrich = Some(EnrichOptions::from_config(
            &config.registry,
            !cli.quiet && cli.report == ReportFormat::Terminal,
        ));
        orchestrator::run(&path, &options, Some(&registry)).await?
    } else {
        orchestrator::run(&path, &options, None::<&RegistrySet>).await?
    };

    match cli.report {
        ReportFormat::Terminal => match &cli.output {
            Some(output) => {
                let text = report::terminal::format_report(&result, &path, cli.verbose, cli.quiet);
                write_output(output, &text)?;
            }
            None => report::terminal::render(&result, &path, cli.verbose, cli.quiet),
        },
        ReportFormat::Json => {
            let json = report::json::render(&result, &path, &languages, cli.sbom_metadata)?;
            match &cli.output {
                Some(output) => write_output(output, &json)?,
                None => println!("{json}"),
            }
        }
    }

    Ok(result.passed)
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("writing report {}", path.display()))?;
    eprintln!("{} {}", "Report written to".green(), path.display());
    Ok(())
}

fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("DEPGATE_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
