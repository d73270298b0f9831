use clap::{Parser, Subcommand};
use config::{Config, ConfigError, Service};
use shared::db::{self, StoreError};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod observability;

#[derive(Parser)]
#[command(name = "coverage", about = "Coverage telemetry services")]
struct Cli {
    /// Path to the YAML configuration file. Defaults apply when omitted.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone, Copy)]
enum CliCommand {
    /// Issue API keys to devices.
    KeyService,
    /// Accept coverage measurements.
    DataService,
    /// Serve the upload speed probe.
    UploadService,
}

impl CliCommand {
    fn service(self) -> Service {
        match self {
            CliCommand::KeyService => Service::Key,
            CliCommand::DataService => Service::Data,
            CliCommand::UploadService => Service::Upload,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] observability::MetricsSetupError),
    #[error("could not open store: {0}")]
    Store(#[from] StoreError),
    #[error("could not start runtime: {0}")]
    Runtime(std::io::Error),
    #[error(transparent)]
    KeyService(#[from] key_service::KeyServiceError),
    #[error(transparent)]
    DataService(#[from] data_service::DataServiceError),
    #[error(transparent)]
    UploadService(#[from] upload_service::UploadServiceError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let _sentry = observability::init_logging(&config.logging);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Service exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides(cli.command.service(), |name| std::env::var(name).ok())?;
    Ok(config)
}

fn run(command: CliCommand, config: Config) -> Result<(), CliError> {
    if let Some(metrics) = &config.metrics {
        observability::init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    rt.block_on(async {
        let store = db::from_config(&config.database).await?;

        let result = match command {
            CliCommand::KeyService => key_service::run(&config.key_service, store.clone())
                .await
                .map_err(CliError::from),
            CliCommand::DataService => data_service::run(&config.data_service, store.clone())
                .await
                .map_err(CliError::from),
            CliCommand::UploadService => upload_service::run(&config.upload_service, store.clone())
                .await
                .map_err(CliError::from),
        };

        store.close().await;
        tracing::info!("Store closed");
        result
    })
}
