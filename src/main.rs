use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cultural_url_analyzer::analyzer::Analyzer;
use cultural_url_analyzer::batch::{parse_seed_file, BatchRunner, CancelSignal, SeedPlan};
use cultural_url_analyzer::cli::{Cli, Commands};
use cultural_url_analyzer::concepts::ConceptLibrary;
use cultural_url_analyzer::config::{self, AppConfig, ConfigError};
use cultural_url_analyzer::export;
use cultural_url_analyzer::fetcher::HttpTransport;
use cultural_url_analyzer::known_orgs::KnownOrganizations;
use cultural_url_analyzer::logger::{AnalysisLogger, VerbosityLevel};
use cultural_url_analyzer::report;

/// Set on the first Ctrl-C; a second one exits immediately.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("❌ {}", e);
        std::process::exit(2);
    }

    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(config::CONFIG_PATH));

    if cli.init {
        match AppConfig::create_default_config_at(&config_path) {
            Ok(path) => {
                println!("✅ Created default configuration file at: {}", path.display());
                println!("   Edit this file to customize settings, then run cultural-url-analyzer again.");
            }
            Err(e) => {
                eprintln!("❌ Failed to create configuration file: {}", e);
                std::process::exit(1);
            }
        }
        if cli.command.is_none() {
            return Ok(());
        }
    }

    let Some(command) = cli.command else {
        return Ok(());
    };

    let verbosity = VerbosityLevel::from_verbose_count(cli.verbose);
    let logger = Arc::new(match &cli.log_file {
        Some(path) => AnalysisLogger::with_log_file(verbosity, path.clone()),
        None => AnalysisLogger::new(verbosity),
    });

    let outcome = match command {
        Commands::Analyze { input, output, parallel_jobs, groups } => {
            let app_config = load_config(&config_path, cli.config.is_some());
            run_analyze(&app_config, &input, &output, parallel_jobs, &groups, logger.clone()).await
        }
        Commands::Check { group, url } => {
            let app_config = load_config(&config_path, cli.config.is_some());
            run_check(&app_config, &group, &url).await
        }
        Commands::Reanalyze { results, output, parallel_jobs } => {
            let app_config = load_config(&config_path, cli.config.is_some());
            let output = output.unwrap_or_else(|| results.clone());
            run_reanalyze(&app_config, &results, &output, parallel_jobs, logger.clone()).await
        }
        Commands::Summarize { results } => run_summarize(&results),
        Commands::Filter { results, remove, output } => run_filter(&results, &remove, &output),
    };

    if let Err(e) = logger.export_logs() {
        eprintln!("⚠️  {:#}", e);
    }
    outcome
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load configuration, offering to create it when missing.
fn load_config(path: &Path, explicit: bool) -> AppConfig {
    match AppConfig::load_from_path(path) {
        Ok(cfg) => cfg,
        Err(ConfigError::FileNotFound(missing)) if !explicit => {
            if !AppConfig::is_interactive() {
                tracing::warn!("No configuration at {}, using built-in defaults", missing.display());
                return embedded_config();
            }
            match AppConfig::prompt_create_config() {
                Ok(Some(created_path)) => {
                    println!("✅ Created default configuration file at: {}", created_path.display());
                    embedded_config()
                }
                Ok(None) => {
                    eprintln!("❌ Configuration file not found at: {}", missing.display());
                    eprintln!("   Run with --init to create a default configuration file.");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("❌ Failed to create configuration file: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn embedded_config() -> AppConfig {
    match AppConfig::embedded_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("❌ Built-in configuration is invalid: {}", e);
            std::process::exit(1);
        }
    }
}

/// Cancel signal fired by the first Ctrl-C.
fn interrupt_signal() -> CancelSignal {
    let cancel = CancelSignal::new();
    let handler_signal = cancel.clone();
    ctrlc::set_handler(move || {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            eprintln!("\n⚠️  Second interrupt, exiting without writing results.");
            std::process::exit(130);
        }
        eprintln!("\n⚠️  Interrupt received. Writing completed results (Ctrl+C again to abort)...");
        handler_signal.cancel();
    })
    .unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to set Ctrl-C handler: {}. Interrupt signals may not be handled gracefully.", e);
    });
    cancel
}

fn build_analyzer(app_config: &AppConfig) -> Result<Arc<Analyzer>> {
    let registry = Arc::new(KnownOrganizations::load(app_config.data.known_organizations())?);
    let concepts = Arc::new(ConceptLibrary::load(app_config.data.concepts())?);
    let transport = Arc::new(HttpTransport::new(&app_config.http)?);
    Ok(Arc::new(Analyzer::new(app_config, transport, registry, concepts)))
}

async fn run_analyze(
    app_config: &AppConfig,
    input: &Path,
    output: &Path,
    parallel_jobs: Option<usize>,
    groups: &[String],
    logger: Arc<AnalysisLogger>,
) -> Result<()> {
    let analyzer = build_analyzer(app_config)?;

    let seeds = parse_seed_file(input)?;
    let plan = SeedPlan::build(seeds, |g| analyzer.concepts().dictionary(g).is_some(), groups);
    for (seed, reason) in &plan.rejected {
        logger.log_seed_rejected(&seed.group, &seed.url, &reason.to_string());
    }

    let cancel = interrupt_signal();
    let concurrency = parallel_jobs.unwrap_or(app_config.analysis.concurrency);
    let runner = BatchRunner::new(analyzer, concurrency, logger.clone(), cancel);
    let outcome = runner.run(&plan).await?;

    export::export_json(&outcome.results, output)?;
    logger.log_export_success(&output.display().to_string());

    outcome.summary.print();
    logger.print_final_summary();
    Ok(())
}

async fn run_reanalyze(
    app_config: &AppConfig,
    results: &Path,
    output: &Path,
    parallel_jobs: Option<usize>,
    logger: Arc<AnalysisLogger>,
) -> Result<()> {
    let existing = export::read_results(results)?;
    let analyzer = build_analyzer(app_config)?;

    let plan = SeedPlan::from_working(&existing, |g| analyzer.concepts().dictionary(g).is_some());
    for (seed, reason) in &plan.rejected {
        logger.log_seed_rejected(&seed.group, &seed.url, &reason.to_string());
    }
    if plan.entries.is_empty() {
        bail!("No working records to re-evaluate in {}", results.display());
    }

    let cancel = interrupt_signal();
    let concurrency = parallel_jobs.unwrap_or(app_config.analysis.concurrency);
    let runner = BatchRunner::new(analyzer, concurrency, logger.clone(), cancel);
    let outcome = runner.run(&plan).await?;

    let (merged, changes) = report::merge_reanalyzed(&existing, &outcome.results);
    export::export_json(&merged, output)
        .with_context(|| format!("Failed to write updated results to {}", output.display()))?;
    logger.log_export_success(&output.display().to_string());

    report::print_reanalysis(&report::summarize(&existing), &report::summarize(&merged), &changes);
    outcome.summary.print();
    logger.print_final_summary();
    Ok(())
}

async fn run_check(app_config: &AppConfig, group: &str, url: &str) -> Result<()> {
    let analyzer = build_analyzer(app_config)?;
    let record = analyzer.analyze(group, url).await?;
    println!("{}", export::record_to_json(&record)?);
    Ok(())
}

fn run_summarize(results: &Path) -> Result<()> {
    let grouped = export::read_results(results)?;
    report::print_summary(&report::summarize(&grouped));
    Ok(())
}

fn run_filter(results: &Path, remove: &Path, output: &Path) -> Result<()> {
    let grouped = export::read_results(results)?;
    let urls = report::read_url_list(remove)?;
    let (filtered, counts) = report::filter_urls(&grouped, &urls);

    export::export_json(&filtered, output)
        .with_context(|| format!("Failed to write filtered results to {}", output.display()))?;

    for count in &counts {
        println!(
            "{}: {} -> {} URLs (removed {})",
            count.group,
            count.before,
            count.before - count.removed,
            count.removed
        );
    }
    println!("Saved to: {}", output.display());
    Ok(())
}
