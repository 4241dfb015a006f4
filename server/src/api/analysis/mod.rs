pub mod create;
pub mod get;

use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

use crate::SharedState;

#[derive(OpenApi)]
#[openapi(
    paths(create::create_analysis, get::get_analysis),
    components(schemas(
        create::CreateAnalysisRequest,
        create::CreateAnalysisResponse,
        get::AnalysisStatusResponse,
        menuguard_core::types::OcrFragment,
        menuguard_core::types::BoundingBox,
        menuguard_core::types::ClassifiedItem,
        menuguard_core::types::SafetyStatus,
        menuguard_core::jobs::JobStatus,
    ))
)]
pub struct ApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create::create_analysis))
        .route("/:job_id", get(get::get_analysis))
}
