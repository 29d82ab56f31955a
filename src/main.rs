use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use surefoot_cli::{build_plan, init_logging, load_config, model_collaborators, run_task, AppConfig};
use tracing::{error, info};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser)]
#[command(name = "surefoot", version, long_version = LONG_VERSION)]
#[command(about = "Run browser tasks step by step with escalating recovery")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and execute a task in Chromium
    Run(RunArgs),

    /// Print the plan for a task without opening a browser
    Plan(PlanArgs),

    /// Configuration management
    Config(ConfigArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Task in natural language
    #[arg(short, long)]
    task: String,

    /// Start URL
    #[arg(short, long)]
    url: String,

    /// Use the deterministic mock provider instead of a model API
    #[arg(long)]
    offline: bool,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Write the execution result JSON here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Directory for the replay artifact
    #[arg(long, value_name = "DIR")]
    artifact_dir: Option<PathBuf>,
}

#[derive(Args)]
struct PlanArgs {
    #[arg(short, long)]
    task: String,

    #[arg(short, long)]
    url: String,

    #[arg(long)]
    offline: bool,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err:#}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).await?;
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    init_logging(&level, cli.debug)?;
    info!("Starting surefoot v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run(args) => cmd_run(args, config).await,
        Commands::Plan(args) => cmd_plan(args, &config).await,
        Commands::Config(args) => match args.action {
            ConfigAction::Show => cmd_config_show(&config),
        },
    }
}

async fn cmd_run(args: RunArgs, mut config: AppConfig) -> Result<()> {
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(dir) = args.artifact_dir {
        config.execution.artifact_dir = Some(dir);
    }
    let models = model_collaborators(&config, args.offline)?;
    let result = run_task(&config, models, &args.task, &args.url).await?;

    info!(
        succeeded = result.succeeded_steps(),
        failed = result.failed_steps(),
        skipped = result.skipped_steps(),
        elapsed_ms = result.elapsed_ms,
        "run finished"
    );
    let json = result.to_json().context("Failed to serialize result")?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Result written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn cmd_plan(args: PlanArgs, config: &AppConfig) -> Result<()> {
    let models = model_collaborators(config, args.offline)?;
    let plan = build_plan(&models, &args.task, &args.url).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?
    );
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
