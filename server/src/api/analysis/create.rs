use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use base64::{engine::general_purpose, Engine as _};
use menuguard_core::{JobStatus, OcrFragment, UserSafetyContext};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::analysis::{self, AnalysisInput};
use crate::api::ErrorResponse;
use crate::SharedState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateAnalysisRequest {
    /// OCR fragments, if the caller already ran recognition.
    #[serde(default)]
    pub ocr_results: Option<Vec<OcrFragment>>,
    /// Base64-encoded menu photo, recognized server-side.
    #[serde(default)]
    pub image_base64: Option<String>,
    /// Allergy tokens from the user profile.
    #[serde(default)]
    pub allergies: Vec<String>,
    /// Diet-restriction tokens from the user profile.
    #[serde(default)]
    pub diets: Vec<String>,
    /// Language for reasons and translated names.
    #[serde(default = "default_language")]
    pub language: String,
    /// Run the detailed tri-state pass after the fast screening pass.
    #[serde(default)]
    pub detailed: bool,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateAnalysisResponse {
    pub success: bool,
    /// The analysis job ID to poll.
    pub job_id: Uuid,
    /// Current job status.
    pub status: JobStatus,
}

#[utoipa::path(
    post,
    path = "/api/analysis",
    tag = "analysis",
    request_body = CreateAnalysisRequest,
    responses(
        (status = 202, description = "Analysis job accepted", body = CreateAnalysisResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
pub async fn create_analysis(
    State(state): State<SharedState>,
    Json(request): Json<CreateAnalysisRequest>,
) -> impl IntoResponse {
    let input = match resolve_input(&state, &request) {
        Ok(input) => input,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response();
        }
    };

    let context = UserSafetyContext {
        allergy_tokens: request.allergies.iter().cloned().collect(),
        diet_tokens: request.diets.iter().cloned().collect(),
        language: request.language.clone(),
    };

    let job = match state.coordinator.create_job() {
        Ok(job) => job,
        Err(e) => {
            tracing::error!("Failed to create analysis job: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to create analysis job")),
            )
                .into_response();
        }
    };

    let job_id = job.job_id;
    let detailed = request.detailed;
    let state_clone = state.clone();
    tokio::spawn(async move {
        analysis::run_analysis_job(state_clone, job_id, input, context, detailed).await;
    });

    (
        StatusCode::ACCEPTED,
        Json(CreateAnalysisResponse {
            success: true,
            job_id,
            status: job.status,
        }),
    )
        .into_response()
}

/// Validate the request input up front: bad input is rejected before any
/// job is created.
fn resolve_input(
    state: &SharedState,
    request: &CreateAnalysisRequest,
) -> Result<AnalysisInput, String> {
    match (&request.ocr_results, &request.image_base64) {
        (Some(fragments), _) => Ok(AnalysisInput::Fragments(fragments.clone())),
        (None, Some(encoded)) => {
            if state.ocr.is_none() {
                return Err("OCR provider not configured on this server".to_string());
            }
            let bytes = general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| format!("Invalid image_base64: {}", e))?;
            Ok(AnalysisInput::Image(bytes))
        }
        (None, None) => Err("Either ocr_results or image_base64 is required".to_string()),
    }
}
