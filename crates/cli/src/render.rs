//! Plain-text rendering of records for terminal output.

use demandcast_client::HistoryPage;
use demandcast_core::aggregate;
use demandcast_core::batch::{BatchAnalysis, BatchJobRecord};
use demandcast_core::job::JobRecord;

/// Print the final state of a single job, including model evaluation
/// metrics when present.
pub(crate) fn job_summary(record: &JobRecord) {
    println!("Job {} finished: {}", record.job_id, record.status.as_str());
    if let Some(message) = &record.error_message {
        println!("  error: {message}");
    }

    let Some(metrics) = &record.metrics else {
        return;
    };
    println!("  best model: {}", metrics.best_model);
    for (name, eval) in &metrics.all_models {
        println!(
            "  {:<16} MAE {:.3}  RMSE {:.3}  MAPE {}",
            name,
            eval.rounded.mae,
            eval.rounded.rmse,
            eval.rounded
                .mape_percent
                .map_or_else(|| "-".to_string(), |v| format!("{v:.1}%")),
        );
    }
}

/// Print the server's partition-planning summary for a batch submission.
pub(crate) fn batch_analysis(analysis: &BatchAnalysis) {
    println!(
        "  {} rows, {} sites, {} part numbers -> {} partitions (~{:.0} min, {:.1}x speedup)",
        analysis.total_rows,
        analysis.unique_sites,
        analysis.unique_partnumbers,
        analysis.total_partitions,
        analysis.estimated_time_minutes,
        analysis.speedup_factor,
    );
}

/// Print the final state of a batch.  Returns whether the combined
/// result is downloadable.
pub(crate) fn batch_summary(record: &BatchJobRecord) -> bool {
    let view = aggregate::aggregate(record);
    println!(
        "Batch {} finished: {} ({}/{} partitions completed, {} failed)",
        record.batch_id,
        view.status.as_str(),
        view.completed_partitions,
        view.total_partitions,
        view.failed_partitions,
    );
    if let Some(message) = &record.error_message {
        println!("  error: {message}");
    }

    for partition in &view.failed {
        println!(
            "  partition {} {}: {}",
            partition.partition_id,
            match partition.status {
                demandcast_core::status::PartitionStatus::Timeout => "timed out",
                _ => "failed",
            },
            partition.error.as_deref().unwrap_or("no error detail"),
        );
    }

    if !view.downloadable {
        println!("  no downloadable result for this batch");
    }
    view.downloadable
}

/// Print one page of job history.
pub(crate) fn history_page(page: &HistoryPage) {
    println!(
        "{} jobs (page {}, {} per page)",
        page.total, page.page, page.page_size
    );
    for job in &page.jobs {
        println!(
            "  #{:<6} {:<10} {:>3}%  {}",
            job.job_id,
            job.status.as_str(),
            job.progress,
            job.filename.as_deref().unwrap_or("-"),
        );
    }
}
