use action_flow::{RunReport, StepResult};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use flow_resolver::DependencyResolver;
use flow_store::{FsDefinitionStore, FsReportStore};
use flowrunner_cli::{commands, Settings};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Flowrunner - declarative browser test flows
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored flows
    Flows,

    /// Check dependencies of every stored flow and action
    Validate,

    /// Print the execution order of a flow's dependencies, or of all flows
    Order(OrderArgs),

    /// Expand `${...}` placeholders in a template
    Interpolate(InterpolateArgs),

    /// Inspect stored run reports
    #[command(subcommand)]
    Reports(ReportsCommand),

    /// Print the effective configuration
    Config,
}

#[derive(Args)]
struct OrderArgs {
    /// Flow id; all flows when omitted
    flow: Option<String>,
}

#[derive(Args)]
struct InterpolateArgs {
    /// Template text
    template: String,

    /// Extra custom variable, NAME=VALUE (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Seed for random and generated values
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum ReportsCommand {
    /// List a flow's reports, newest first
    List { flow: String },

    /// Show one report
    Show { flow: String, run: String },

    /// Delete one report and its artifacts
    Delete { flow: String, run: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug, cli.log_format)?;
    info!("Starting flowrun v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::Flows => cmd_flows(&settings, cli.output).await,
        Commands::Validate => cmd_validate(&settings, cli.output).await,
        Commands::Order(args) => cmd_order(args, &settings, cli.output).await,
        Commands::Interpolate(args) => cmd_interpolate(args, &settings),
        Commands::Reports(cmd) => cmd_reports(cmd, &settings, cli.output).await,
        Commands::Config => emit(&settings, OutputFormat::Yaml),
    };

    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(level: &str, debug: bool, format: LogFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}

fn open_definitions(settings: &Settings) -> Result<FsDefinitionStore> {
    let dir = settings.definitions_dir();
    FsDefinitionStore::open(&dir)
        .with_context(|| format!("Failed to load definitions from {}", dir.display()))
}

async fn cmd_flows(settings: &Settings, output: OutputFormat) -> Result<()> {
    let definitions = open_definitions(settings)?;
    let flows = commands::list_flows(&definitions).await?;
    match output {
        OutputFormat::Human => {
            if flows.is_empty() {
                println!("No flows in {}", settings.definitions_dir().display());
            }
            for flow in &flows {
                let deps = if flow.dependencies.is_empty() {
                    String::new()
                } else {
                    format!("  (after {})", flow.dependencies.join(", "))
                };
                println!("{}  {}  {} step(s){}", flow.id, flow.name, flow.steps, deps);
            }
            Ok(())
        }
        format => emit(&flows, format),
    }
}

async fn cmd_validate(settings: &Settings, output: OutputFormat) -> Result<()> {
    let definitions = open_definitions(settings)?;
    let resolver = DependencyResolver::new(settings.runner.max_dependency_depth);
    let summary = commands::validate_definitions(&definitions, &resolver).await?;

    match output {
        OutputFormat::Human => {
            for entry in &summary.entries {
                let status = if entry.validation.valid { "ok" } else { "INVALID" };
                println!("{} {}: {}", entry.kind, entry.id, status);
                for err in &entry.validation.errors {
                    println!("  error: {}", err);
                }
                for warning in &entry.validation.warnings {
                    println!("  warning: {}", warning);
                }
            }
        }
        format => emit(&summary, format)?,
    }

    if !summary.is_valid() {
        bail!("{} dependency error(s) found", summary.error_count());
    }
    Ok(())
}

async fn cmd_order(args: OrderArgs, settings: &Settings, output: OutputFormat) -> Result<()> {
    let definitions = open_definitions(settings)?;
    let order = commands::flow_order(&definitions, args.flow.as_deref()).await?;
    match output {
        OutputFormat::Human => {
            for (position, id) in order.iter().enumerate() {
                println!("{:>3}. {}", position + 1, id);
            }
            Ok(())
        }
        format => emit(&order, format),
    }
}

fn cmd_interpolate(args: InterpolateArgs, settings: &Settings) -> Result<()> {
    let vars = args
        .vars
        .iter()
        .map(|raw| commands::parse_variable(raw))
        .collect::<Result<Vec<_>>>()?;
    println!(
        "{}",
        commands::interpolate(&settings.runner, &args.template, vars, args.seed)
    );
    Ok(())
}

async fn cmd_reports(cmd: ReportsCommand, settings: &Settings, output: OutputFormat) -> Result<()> {
    let reports = FsReportStore::new(settings.reports_dir());
    match cmd {
        ReportsCommand::List { flow } => {
            let listed = commands::list_reports(&reports, &flow).await?;
            match output {
                OutputFormat::Human => {
                    if listed.is_empty() {
                        println!("No reports for '{}'", flow);
                    }
                    for report in &listed {
                        println!("{}  {}", report.started_at.to_rfc3339(), report.summary());
                    }
                    Ok(())
                }
                format => emit(&listed, format),
            }
        }
        ReportsCommand::Show { flow, run } => {
            let report = commands::show_report(&reports, &flow, &run).await?;
            match output {
                OutputFormat::Human => {
                    print_report(&report);
                    Ok(())
                }
                format => emit(&report, format),
            }
        }
        ReportsCommand::Delete { flow, run } => {
            commands::delete_report(&reports, &flow, &run).await?;
            println!("Deleted report {}/{}", flow, run);
            Ok(())
        }
    }
}

fn print_report(report: &RunReport) {
    println!("{}", report.summary());
    println!(
        "device: {} ({})  started: {}",
        report.device,
        report.viewport,
        report.started_at.to_rfc3339()
    );
    for dep in &report.dependencies {
        let status = if dep.success() { "passed" } else { "failed" };
        println!("dependency {} ({}): {}", dep.flow_id, dep.run_id, status);
    }
    for step in &report.steps {
        print_step(step);
    }
    if let Some(dir) = &report.artifact_dir {
        println!("artifacts: {}", dir);
    }
}

fn print_step(step: &StepResult) {
    let status = if step.passed { "PASS" } else { "FAIL" };
    println!("  [{}] {} ({}ms)", status, step.label(), step.duration_ms);
    if let Some(err) = &step.navigation_error {
        println!("      navigation: {}", err);
    }
    for err in &step.errors {
        println!("      error: {}", err);
    }
    for assertion in step.assertions.iter().filter(|a| !a.passed) {
        println!("      assertion: {}", assertion.describe());
    }
    for artifact in &step.artifacts {
        println!("      artifact: {}", artifact.location);
    }
}

fn emit<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Human => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(value)?);
        }
    }
    Ok(())
}
