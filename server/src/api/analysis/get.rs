use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use menuguard_core::{AnalysisJob, ClassifiedItem, JobError, JobStatus, StageTimings};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::{ErrorResponse, CODE_NOT_FOUND};
use crate::SharedState;

/// Polling response for an analysis job.
///
/// PENDING carries the optional quick result; FINAL adds the result and
/// completion time; ERROR carries the error message instead.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisStatusResponse {
    pub success: bool,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_result: Option<Vec<ClassifiedItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<ClassifiedItem>>,
    pub timings: StageTimings,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<AnalysisJob> for AnalysisStatusResponse {
    fn from(job: AnalysisJob) -> Self {
        Self {
            success: true,
            status: job.status,
            quick_result: job.quick_result,
            result: job.result,
            timings: job.timings,
            created_at: job.created_at,
            completed_at: job.completed_at,
            error_message: job.error_message,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/analysis/{job_id}",
    tag = "analysis",
    params(
        ("job_id" = Uuid, Path, description = "Analysis job ID")
    ),
    responses(
        (status = 200, description = "Analysis job status", body = AnalysisStatusResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    )
)]
pub async fn get_analysis(
    State(state): State<SharedState>,
    Path(job_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.coordinator.get_job(job_id) {
        Ok(job) => (StatusCode::OK, Json(AnalysisStatusResponse::from(job))).into_response(),
        Err(JobError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::with_code(
                "Analysis job not found",
                CODE_NOT_FOUND,
            )),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to get analysis job {}: {}", job_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to get analysis job")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use menuguard_core::SafetyStatus;

    fn job() -> AnalysisJob {
        AnalysisJob {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            quick_result: None,
            result: None,
            timings: StageTimings::new(),
            created_at: Utc::now(),
            completed_at: None,
            error_message: None,
        }
    }

    fn item(status: SafetyStatus) -> ClassifiedItem {
        ClassifiedItem {
            id: Uuid::new_v4(),
            original_name: "김치찌개".to_string(),
            translated_name: "Kimchi stew".to_string(),
            safety_status: status,
            reason: String::new(),
            ingredients: Vec::new(),
        }
    }

    #[test]
    fn test_pending_response_omits_terminal_fields() {
        let response = AnalysisStatusResponse::from(job());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "PENDING");
        assert!(json.get("result").is_none());
        assert!(json.get("completed_at").is_none());
        assert!(json.get("error_message").is_none());
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn test_final_response_carries_result() {
        let mut final_job = job();
        final_job.status = JobStatus::Final;
        final_job.quick_result = Some(vec![item(SafetyStatus::Danger)]);
        final_job.result = Some(vec![item(SafetyStatus::Caution)]);
        final_job.completed_at = Some(Utc::now());

        let json = serde_json::to_value(AnalysisStatusResponse::from(final_job)).unwrap();
        assert_eq!(json["status"], "FINAL");
        assert_eq!(json["result"][0]["safety_status"], "CAUTION");
        assert_eq!(json["quick_result"][0]["safety_status"], "DANGER");
        assert!(json.get("completed_at").is_some());
    }

    #[test]
    fn test_error_response_carries_message() {
        let mut failed = job();
        failed.status = JobStatus::Error;
        failed.error_message = Some("OCR failed".to_string());
        failed.completed_at = Some(Utc::now());

        let json = serde_json::to_value(AnalysisStatusResponse::from(failed)).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["error_message"], "OCR failed");
        assert!(json.get("result").is_none());
    }
}
