//! Single-job records and model evaluation metrics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::status::JobStatus;
use crate::types::{JobId, Timestamp};

/// One forecast job as reported by the status endpoint.
///
/// Created on submission and mutated only by polling responses; the
/// client never updates these fields speculatively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    /// Remote execution task identifier used for status polling.
    pub task_id: Option<String>,
    pub status: JobStatus,
    /// Completion percentage, 0-100.
    pub progress: u8,
    pub filename: Option<String>,
    pub created_at: Option<Timestamp>,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    /// Model evaluation summary, present once the job completes.
    pub metrics: Option<JobMetrics>,
    /// In-band failure detail for FAILED jobs.
    pub error_message: Option<String>,
}

/// Evaluation summary produced by the model selection step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMetrics {
    /// Name of the selected model.
    pub best_model: String,
    /// Raw and rounded scores keyed by candidate model name.
    pub all_models: BTreeMap<String, ModelEvaluation>,
}

/// Scores for one candidate model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub raw: ScoreSet,
    pub rounded: ScoreSet,
}

/// One set of evaluation scores.  The wire keys are the service's
/// upper-case metric names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    #[serde(rename = "MAE")]
    pub mae: f64,
    #[serde(rename = "RMSE")]
    pub rmse: f64,
    #[serde(rename = "MAPE%")]
    pub mape_percent: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_record_deserializes_service_payload() {
        let json = r#"{
            "job_id": 12,
            "task_id": "abc-123",
            "status": "PROCESSING",
            "progress": 40,
            "filename": "demand.csv",
            "created_at": "2025-06-01T08:00:00Z",
            "started_at": "2025-06-01T08:00:05Z",
            "completed_at": null,
            "metrics": null,
            "error_message": null
        }"#;
        let record: JobRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.job_id, 12);
        assert_eq!(record.status, JobStatus::Processing);
        assert_eq!(record.progress, 40);
        assert!(record.metrics.is_none());
    }

    #[test]
    fn metrics_use_service_metric_keys() {
        let json = r#"{
            "best_model": "Ridge_log",
            "all_models": {
                "Ridge_log": {
                    "raw": {"MAE": 1.2, "RMSE": 2.4, "MAPE%": 18.5},
                    "rounded": {"MAE": 1.0, "RMSE": 2.2, "MAPE%": 17.9}
                }
            }
        }"#;
        let metrics: JobMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(metrics.best_model, "Ridge_log");
        let eval = &metrics.all_models["Ridge_log"];
        assert_eq!(eval.rounded.mape_percent, Some(17.9));

        let back = serde_json::to_value(&metrics).unwrap();
        assert_eq!(back["all_models"]["Ridge_log"]["raw"]["MAPE%"], 18.5);
    }
}
