//! melted-scenario コマンド
//!
//! # サブコマンド
//!
//! - `deploy` - デプロイシナリオをシミュレーター上で対話的に実行
//! - `steps` - デプロイシナリオのステップ一覧を表示（実行しない）
//! - `config` - 実効設定を TOML で表示

use clap::{Parser, Subcommand};
use melted_scenario::collaborator::{EndpointProbe, HttpProbe, SimulatedCloud};
use melted_scenario::config::ScenarioConfig;
use melted_scenario::engine::{ScenarioError, ScenarioRunner, TerminalIo};
use melted_scenario::error::{CollaboratorError, ConfigError, LoggingError};
use melted_scenario::logging;
use melted_scenario::scenario::{DeployEnv, DeployResources, deploy_scenario};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Interactive scenario runner for deploying a resilient web service
#[derive(Parser, Debug)]
#[command(name = "melted-scenario")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run interactive, step-by-step deployment scenarios", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(global = true, long = "config", short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the deploy scenario against the simulated cloud
    Deploy {
        /// Answer yes to every confirmation prompt
        #[arg(long = "yes", short = 'y')]
        yes: bool,

        /// Use real HTTP requests for the IP lookup and endpoint check
        #[arg(long = "live-probe")]
        live_probe: bool,

        /// Write the run report as JSON to this path
        #[arg(long = "report", value_name = "PATH")]
        report: Option<PathBuf>,
    },

    /// List the steps of the deploy scenario without running them
    Steps,

    /// Print the effective configuration as TOML
    Config,
}

/// コマンド実行時のエラー
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("実行結果の書き出しに失敗しました: {0}")]
    Report(#[from] std::io::Error),

    #[error("実行結果を JSON に変換できません: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("エラー: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Deploy {
            yes,
            live_probe,
            report,
        } => deploy(config, yes, live_probe, report).await,
        Commands::Steps => {
            list_steps(&config);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!("{}", config.to_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ScenarioConfig, ConfigError> {
    match path {
        Some(path) => ScenarioConfig::from_file(path),
        None => Ok(ScenarioConfig::default()),
    }
}

async fn deploy(
    config: ScenarioConfig,
    assume_yes: bool,
    live_probe: bool,
    report_path: Option<PathBuf>,
) -> Result<ExitCode, CliError> {
    let _guard = logging::init(&config.logging)?;

    let resources = DeployResources::load(&config.paths).await?;
    let cloud = Arc::new(SimulatedCloud::new());
    let probe: Arc<dyn EndpointProbe> = if live_probe {
        Arc::new(HttpProbe::new(config.probe.check_ip_url.clone())?)
    } else {
        cloud.clone()
    };
    info!(prefix = %config.prefix, live_probe, "デプロイシナリオを開始します");

    let env = Arc::new(DeployEnv::new(&config, cloud, probe, resources));
    let scenario = deploy_scenario(env);
    let mut runner = ScenarioRunner::new(TerminalIo::new().with_assume_yes(assume_yes));

    let report = runner.run(&scenario).await?;

    if let Some(path) = report_path {
        tokio::fs::write(&path, report.to_json()?).await?;
        info!(path = %path.display(), "実行結果を書き出しました");
    }
    if let Some(cause) = report.abort_reason() {
        println!("\nシナリオを中断しました: {cause}");
    }
    Ok(ExitCode::SUCCESS)
}

fn list_steps(config: &ScenarioConfig) {
    let cloud = Arc::new(SimulatedCloud::new());
    let env = Arc::new(DeployEnv::new(config, cloud.clone(), cloud, DeployResources::default()));
    let scenario = deploy_scenario(env);

    for (index, step) in scenario.steps().iter().enumerate() {
        println!("{index:>3}  {:<6}  {}", step.kind().to_string(), step.name());
    }
}
