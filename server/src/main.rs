mod analysis;
mod api;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::MatchedPath;
use axum::http::Request;
use axum::routing::post;
use axum::Router;
use menuguard_core::{
    create_client_from_env, GenerativeClient, HttpOcrProvider, InMemoryJobStore, JobCoordinator,
    OcrProvider,
};
use tower_http::trace::TraceLayer;
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across all handlers.
pub struct AppState {
    pub coordinator: JobCoordinator,
    pub classifier: Arc<dyn GenerativeClient>,
    pub ocr: Option<Arc<dyn OcrProvider>>,
}

pub type SharedState = Arc<AppState>;

fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn job_ttl() -> Duration {
    let secs = env::var("JOB_TTL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() {
    // Check for --openapi flag to dump spec and exit
    if env::args().any(|arg| arg == "--openapi") {
        let spec = api::openapi().to_pretty_json().unwrap();
        println!("{}", spec);
        return;
    }

    init_telemetry();

    let classifier: Arc<dyn GenerativeClient> = create_client_from_env()
        .expect("failed to configure classifier provider")
        .into();
    tracing::info!(
        "Classifier provider: {} ({})",
        classifier.provider_name(),
        classifier.model_name()
    );

    let ocr: Option<Arc<dyn OcrProvider>> = match HttpOcrProvider::from_env() {
        Some(provider) => Some(Arc::new(provider)),
        None => {
            tracing::info!("OCR_ENDPOINT not set, image requests will be rejected");
            None
        }
    };

    let store = Arc::new(InMemoryJobStore::new(job_ttl()));
    menuguard_core::spawn_sweeper(store.clone(), Duration::from_secs(60));

    let state: SharedState = Arc::new(AppState {
        coordinator: JobCoordinator::new(store),
        classifier,
        ocr,
    });

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());

    let app = Router::new()
        .nest("/api/analysis", api::analysis::router())
        .route("/api/pipeline", post(api::pipeline::run_pipeline))
        .merge(swagger_ui)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                ),
        );

    let bind = env::var("MENUGUARD_BIND").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await.unwrap();

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());
    tracing::info!("Swagger UI available at http://localhost:3000/swagger-ui/");

    axum::serve(listener, app).await.unwrap();
}
