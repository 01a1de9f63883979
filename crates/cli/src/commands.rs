//! Command implementations.
//!
//! `run` and `run-batch` drive a [`SessionController`] and follow its
//! event stream; the remaining commands are single API calls.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use demandcast_client::{
    batch_result_filename, job_result_filename, BatchOptions, ClientConfig, ForecastApi,
    PartitionStrategy,
};
use demandcast_core::config::ForecastConfig;
use demandcast_core::status::JobStatus;
use demandcast_core::types::JobId;
use demandcast_session::{CancelOutcome, PollIntervals, SessionController, SessionEvent};

use crate::render;
use crate::StrategyArg;

pub(crate) fn batch_options(
    strategy: StrategyArg,
    max_rows: u32,
    partition_timeout: u32,
) -> BatchOptions {
    BatchOptions {
        partition_strategy: match strategy {
            StrategyArg::Site => PartitionStrategy::Site,
            StrategyArg::Auto => PartitionStrategy::Auto,
        },
        max_rows_per_partition: max_rows,
        partition_timeout_seconds: partition_timeout,
    }
}

/// Submit a single job and follow it until a terminal status.
pub(crate) async fn run_job(
    file: &Path,
    config: ForecastConfig,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let controller = session()?;
    let mut events = controller.subscribe();

    let (file_name, data) = read_dataset(file).await?;
    let receipt = controller.submit_job(&file_name, data, config).await?;
    println!(
        "Submitted job {} (task {})",
        receipt.job_id, receipt.task_id
    );

    let record = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Cancelling...");
                match controller.cancel().await? {
                    CancelOutcome::Job(record) => break record,
                    CancelOutcome::Batch(_) => unreachable!("job session cannot hold a batch"),
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::JobUpdated(record)) => {
                    println!("  {:<10} {:>3}%", record.status.as_str(), record.progress);
                    if record.status.is_terminal() {
                        break record;
                    }
                }
                Ok(SessionEvent::PollFailed { message }) => {
                    anyhow::bail!("status polling failed: {message}");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(e) => return Err(e).context("session event stream closed"),
            }
        }
    };

    render::job_summary(&record);

    if record.status == JobStatus::Completed {
        let dest = output.unwrap_or_else(|| PathBuf::from(job_result_filename(record.job_id)));
        let written = controller.download(&dest).await?;
        println!("Saved {written} bytes to {}", dest.display());
    }
    Ok(())
}

/// Submit a batch and follow it until a terminal status.
pub(crate) async fn run_batch(
    file: &Path,
    config: ForecastConfig,
    options: BatchOptions,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let controller = session()?;
    let mut events = controller.subscribe();

    let (file_name, data) = read_dataset(file).await?;
    let receipt = controller
        .submit_batch(&file_name, data, config, options)
        .await?;
    println!("Submitted batch {}", receipt.batch_id);
    render::batch_analysis(&receipt.analysis);

    let record = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Cancelling...");
                match controller.cancel().await? {
                    CancelOutcome::Batch(record) => break record,
                    CancelOutcome::Job(_) => unreachable!("batch session cannot hold a job"),
                }
            }
            event = events.recv() => match event {
                Ok(SessionEvent::BatchUpdated(record)) => {
                    println!(
                        "  {:<12} {:>3}%  {}/{} partitions",
                        record.status.as_str(),
                        record.progress,
                        record.completed_partitions,
                        record.total_partitions,
                    );
                    if record.status.is_terminal() {
                        break record;
                    }
                }
                Ok(SessionEvent::Warning { message }) => eprintln!("warning: {message}"),
                Ok(SessionEvent::PollFailed { message }) => {
                    anyhow::bail!("status polling failed: {message}");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(e) => return Err(e).context("session event stream closed"),
            }
        }
    };

    let downloadable = render::batch_summary(&record);

    if downloadable {
        let dest = output.unwrap_or_else(|| PathBuf::from(batch_result_filename(&record.batch_id)));
        let written = controller.download(&dest).await?;
        println!("Saved {written} bytes to {}", dest.display());
    }
    Ok(())
}

pub(crate) async fn history(
    page: u32,
    page_size: u32,
    status: Option<JobStatus>,
) -> anyhow::Result<()> {
    let api = api()?;
    let history = api.history(page, page_size, status).await?;
    render::history_page(&history);
    Ok(())
}

pub(crate) async fn download_job(job_id: JobId, output: Option<PathBuf>) -> anyhow::Result<()> {
    let api = api()?;
    let dest = output.unwrap_or_else(|| PathBuf::from(job_result_filename(job_id)));
    let written = api.download_job(job_id, &dest).await?;
    println!("Saved {written} bytes to {}", dest.display());
    Ok(())
}

pub(crate) async fn download_batch(batch_id: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    let api = api()?;
    let dest = output.unwrap_or_else(|| PathBuf::from(batch_result_filename(batch_id)));
    let written = api.download_batch(batch_id, &dest).await?;
    println!("Saved {written} bytes to {}", dest.display());
    Ok(())
}

pub(crate) async fn delete_job(job_id: JobId, force: bool) -> anyhow::Result<()> {
    let api = api()?;
    api.delete_job(job_id, force).await?;
    println!("Deleted job {job_id}");
    Ok(())
}

pub(crate) async fn health() -> anyhow::Result<()> {
    let api = api()?;
    let report = api.health().await?;
    println!(
        "status: {}  database: {}  celery: {}  version: {}",
        report.status, report.database, report.celery, report.version
    );
    Ok(())
}

// ---- private helpers ----

fn api() -> anyhow::Result<ForecastApi> {
    let config = ClientConfig::from_env();
    Ok(ForecastApi::from_config(&config)?)
}

fn session() -> anyhow::Result<SessionController> {
    let config = ClientConfig::from_env();
    let api = ForecastApi::from_config(&config)?;
    Ok(SessionController::new(
        Arc::new(api),
        PollIntervals::from_client_config(&config),
    ))
}

async fn read_dataset(file: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .context("dataset path has no usable file name")?
        .to_string();
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    Ok((file_name, data))
}
