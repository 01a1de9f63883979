//! `demandcast` -- command-line front end for the forecast service.
//!
//! Submits demand datasets for forecasting (single job or partitioned
//! batch), follows progress until a terminal status, and retrieves
//! results.  Ctrl-C during a run cancels the active job server-side
//! before exiting.
//!
//! Service endpoint and poll intervals come from the environment; see
//! `ClientConfig::from_env` for the variable table.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use demandcast_core::config::{ForecastConfig, RoundingMode};
use demandcast_core::status::JobStatus;
use demandcast_core::types::JobId;

mod commands;
mod render;

#[derive(Parser, Debug)]
#[command(name = "demandcast", version, about = "Demand forecast service client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a dataset as a single forecast job and follow it to completion.
    Run {
        /// Input CSV dataset.
        file: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Where to save the result on completion (default:
        /// `forecast_result_<job_id>.csv`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Submit a dataset as a partitioned batch and follow it to completion.
    RunBatch {
        /// Input CSV dataset.
        file: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// How the server splits the input into partitions.
        #[arg(long, value_enum, default_value = "site")]
        strategy: StrategyArg,

        /// Maximum rows per partition.
        #[arg(long, default_value_t = 2000)]
        max_rows: u32,

        /// Per-partition execution timeout in seconds.
        #[arg(long, default_value_t = 300)]
        partition_timeout: u32,

        /// Where to save the combined result on completion (default:
        /// `batch_forecast_<batch_id>.csv`).
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List past jobs.
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 20)]
        page_size: u32,

        /// Filter by status, e.g. `completed` or `failed`.
        #[arg(long, value_parser = parse_status)]
        status: Option<JobStatus>,
    },

    /// Download a finished job's result by job ID.
    Download {
        job_id: JobId,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Download a finished batch's combined result by batch ID.
    DownloadBatch {
        batch_id: String,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Delete a job server-side.
    Delete {
        job_id: JobId,

        /// Delete even if the job is still queued or processing.
        #[arg(long)]
        force: bool,
    },

    /// Probe service health.
    Health,
}

/// Forecast configuration flags shared by `run` and `run-batch`.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Days to forecast (1-90).
    #[arg(long, default_value_t = 7)]
    horizon: u32,

    /// Comma-separated site codes to forecast.  Batch mode forecasts all
    /// sites and warns if this is set.
    #[arg(long, value_delimiter = ',')]
    sites: Vec<String>,

    /// First forecast date, DD/MM/YYYY (default: server-chosen).
    #[arg(long)]
    start_date: Option<String>,

    /// Forecasts below this threshold are zeroed (0-10).
    #[arg(long, default_value_t = 0.5)]
    zero_threshold: f64,

    #[arg(long, value_enum, default_value = "half-up")]
    rounding: RoundingArg,

    /// Model seed for reproducibility.
    #[arg(long, default_value_t = 42)]
    seed: i64,
}

impl ConfigArgs {
    fn to_config(&self) -> anyhow::Result<ForecastConfig> {
        let forecast_start_date = self
            .start_date
            .as_deref()
            .map(|raw| {
                chrono::NaiveDate::parse_from_str(raw, "%d/%m/%Y")
                    .map_err(|e| anyhow::anyhow!("invalid --start-date {raw:?} (DD/MM/YYYY): {e}"))
            })
            .transpose()?;

        Ok(ForecastConfig {
            forecast_horizon: self.horizon,
            forecast_site_codes: if self.sites.is_empty() {
                None
            } else {
                Some(self.sites.clone())
            },
            forecast_start_date,
            zero_threshold: self.zero_threshold,
            rounding_mode: self.rounding.into(),
            random_state: self.seed,
            ..Default::default()
        })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum RoundingArg {
    HalfUp,
    Round,
    Ceil,
    Floor,
}

impl From<RoundingArg> for RoundingMode {
    fn from(value: RoundingArg) -> Self {
        match value {
            RoundingArg::HalfUp => Self::HalfUp,
            RoundingArg::Round => Self::Round,
            RoundingArg::Ceil => Self::Ceil,
            RoundingArg::Floor => Self::Floor,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum StrategyArg {
    Site,
    Auto,
}

fn parse_status(raw: &str) -> Result<JobStatus, String> {
    match raw.to_ascii_uppercase().as_str() {
        "QUEUED" => Ok(JobStatus::Queued),
        "PROCESSING" => Ok(JobStatus::Processing),
        "COMPLETED" => Ok(JobStatus::Completed),
        "FAILED" => Ok(JobStatus::Failed),
        "CANCELLED" => Ok(JobStatus::Cancelled),
        other => Err(format!("unknown status {other:?}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demandcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            file,
            config,
            output,
        } => commands::run_job(&file, config.to_config()?, output).await,

        Command::RunBatch {
            file,
            config,
            strategy,
            max_rows,
            partition_timeout,
            output,
        } => {
            commands::run_batch(
                &file,
                config.to_config()?,
                commands::batch_options(strategy, max_rows, partition_timeout),
                output,
            )
            .await
        }

        Command::History {
            page,
            page_size,
            status,
        } => commands::history(page, page_size, status).await,

        Command::Download { job_id, output } => commands::download_job(job_id, output).await,

        Command::DownloadBatch { batch_id, output } => {
            commands::download_batch(&batch_id, output).await
        }

        Command::Delete { job_id, force } => commands::delete_job(job_id, force).await,

        Command::Health => commands::health().await,
    }
}
