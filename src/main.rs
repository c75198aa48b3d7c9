use adflint::report::{self, OutputFormat, Summary};
use adflint::{RuleEngine, lint_resources, load_template};
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("adflint")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("adflint.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn build_engine(config: &Config, checks: &[String]) -> Result<RuleEngine> {
    let engine = RuleEngine::with_defaults(config.rules.clone());
    if checks.is_empty() {
        Ok(engine.disable(&config.checks.disabled))
    } else {
        // Explicitly requested checks run even when disabled in config
        Ok(engine.select(checks)?)
    }
}

fn run_application(cli: &Cli, config: &Config) -> Result<i32> {
    info!("Starting application");

    match &cli.command {
        Commands::Lint {
            template,
            checks,
            format,
            no_assert,
        } => handle_lint_command(template, checks, *format, !*no_assert, cli.is_verbose(), config),
        Commands::ListChecks => handle_list_checks_command(cli.is_verbose(), config),
    }
}

fn handle_lint_command(
    template: &Path,
    checks: &[String],
    format: OutputFormat,
    assert: bool,
    verbose: bool,
    config: &Config,
) -> Result<i32> {
    info!("Linting template: {}", template.display());
    let engine = build_engine(config, checks).context("Failed to select checks")?;

    let resources =
        load_template(template).context(format!("Failed to load template {}", template.display()))?;
    if verbose && format == OutputFormat::Table {
        for (kind, count) in resources.count_by_kind() {
            println!("{} {}", format!("{}:", kind).cyan(), count);
        }
        println!();
    }

    let findings = lint_resources(&resources, &engine);
    let summary = Summary::new(&findings, &engine);

    match format {
        OutputFormat::Table => print!("{}", report::render_table(&findings, &summary, verbose)),
        OutputFormat::Json => println!(
            "{}",
            report::render_json(&findings, &summary).context("Failed to render report")?
        ),
    }

    Ok(report::exit_code(&findings, assert))
}

fn handle_list_checks_command(verbose: bool, config: &Config) -> Result<i32> {
    info!("Listing checks");
    let engine = RuleEngine::with_defaults(config.rules.clone());

    for rule in engine.rules() {
        let disabled = config.checks.disabled.iter().any(|id| id == rule.id());
        let id = if disabled {
            rule.id().dimmed()
        } else {
            rule.id().green()
        };
        if verbose {
            println!("{:<40} {:<8} {}", id, rule.severity().to_string(), rule.description());
        } else {
            println!("{}", id);
        }
    }
    Ok(0)
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the configured level is known
    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    let code = run_application(&cli, &config).context("Application failed")?;
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
