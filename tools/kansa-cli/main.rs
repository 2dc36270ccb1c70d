use anyhow::Context;
use clap::{Parser, Subcommand};
use kansa::config::{KansaConfig, LogFormat, LogSettings};
use kansa::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Audit workflow definitions and diagnose iteration loops in execution traces
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter, overrides KANSA_LOG (e.g. "info" or "kansa=debug")
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit the structure of one or more workflow definitions
    Audit {
        /// Workflow definition files (YAML or JSON)
        #[arg(required = true)]
        workflows: Vec<PathBuf>,

        /// Configuration file with required nodes and audit limits
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print reports as JSON instead of text
        #[arg(long)]
        json: bool,

        /// Also write the JSON reports to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diagnose feedback loops in a recorded execution trace
    AnalyzeIterations {
        /// Execution trace file (JSON)
        trace: PathBuf,

        /// Configuration file with the workflow's routing vocabulary
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the analysis as JSON instead of the text report
        #[arg(long)]
        json: bool,

        /// Do not write the text report next to the trace
        #[arg(long)]
        no_write: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = LogSettings::from_env();
    if let Some(level) = &cli.log_level {
        settings.level = level.clone();
    }
    init_logging(&settings);

    match cli.command {
        Command::Audit {
            workflows,
            config,
            json,
            output,
        } => run_audit(&workflows, config.as_deref(), json, output.as_deref()),
        Command::AnalyzeIterations {
            trace,
            config,
            json,
            no_write,
        } => run_analysis(&trace, config.as_deref(), json, no_write),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<KansaConfig> {
    match path {
        Some(path) => KansaConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration '{}'", path.display())),
        None => Ok(KansaConfig::default()),
    }
}

fn run_audit(
    workflows: &[PathBuf],
    config: Option<&Path>,
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let auditor = Auditor::new(config.audit);

    let mut reports = Vec::new();
    let mut failed = false;
    for (path, result) in workflows.iter().zip(auditor.audit_files(workflows)) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                error!(path = %path.display(), error = %e, "workflow could not be audited");
                eprintln!("Error: {}", e);
                failed = true;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}\n", report);
        }
    }

    if let Some(output) = output {
        std::fs::write(output, serde_json::to_string_pretty(&reports)?)
            .with_context(|| format!("Failed to write '{}'", output.display()))?;
        info!(path = %output.display(), "audit reports written");
    }

    if failed || reports.iter().any(|r| !r.is_valid) {
        std::process::exit(1);
    }
    Ok(())
}

fn run_analysis(
    trace: &Path,
    config: Option<&Path>,
    json: bool,
    no_write: bool,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let analyzer = IterationAnalyzer::new(config.diagnosis)?;
    let analysis = analyzer
        .analyze_file(trace)
        .with_context(|| format!("Failed to analyze '{}'", trace.display()))?;

    if json {
        println!("{}", analysis.to_json()?);
    } else {
        println!("{}", analyzer.render(&analysis));
    }

    if !no_write {
        let path = analyzer.write_report(&analysis, trace)?;
        eprintln!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn init_logging(settings: &LogSettings) {
    let env_filter =
        EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match settings.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
