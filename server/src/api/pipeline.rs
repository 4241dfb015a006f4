//! Synchronous stage-selector endpoint.
//!
//! Runs any subset of the pipeline stages over caller-supplied OCR
//! fragments and returns only the requested stages' outputs. Useful for
//! debugging recognition quality without creating a job.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use menuguard_core::{run_stages, ClassificationMode, OcrFragment, Stage, UserSafetyContext};
use serde::Deserialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::ErrorResponse;
use crate::SharedState;

#[derive(OpenApi)]
#[openapi(
    paths(run_pipeline),
    components(schemas(
        PipelineRequest,
        menuguard_core::pipeline::Stage,
        menuguard_core::pipeline::PipelineOutput,
        menuguard_core::types::CleansedFragment,
        menuguard_core::types::NormalizedItem,
    ))
)]
pub struct ApiDoc;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PipelineRequest {
    pub ocr_results: Vec<OcrFragment>,
    /// Which stages to run. Later stages implicitly run earlier ones.
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub diets: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Use the detailed classification tier instead of the fast one.
    #[serde(default)]
    pub detailed: bool,
}

#[utoipa::path(
    post,
    path = "/api/pipeline",
    tag = "pipeline",
    request_body = PipelineRequest,
    responses(
        (status = 200, description = "Requested stage outputs", body = menuguard_core::pipeline::PipelineOutput),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    )
)]
pub async fn run_pipeline(
    State(state): State<SharedState>,
    Json(request): Json<PipelineRequest>,
) -> impl IntoResponse {
    if request.stages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("At least one stage is required")),
        )
            .into_response();
    }

    let context = UserSafetyContext {
        allergy_tokens: request.allergies.iter().cloned().collect(),
        diet_tokens: request.diets.iter().cloned().collect(),
        language: request.language.clone().unwrap_or_else(|| "en".to_string()),
    };

    let mode = if request.detailed {
        ClassificationMode::Detailed
    } else {
        ClassificationMode::Fast
    };

    match run_stages(
        &request.ocr_results,
        &request.stages,
        Some(&context),
        Some(state.classifier.as_ref()),
        mode,
    )
    .await
    {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}
