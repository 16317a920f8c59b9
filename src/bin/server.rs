use axum::{
    extract::{DefaultBodyLimit, Multipart, State, Json},
    http::{header, StatusCode},
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::{get, post},
    Router,
};
use docforge::{
    api::{AiRequest, DocForgeService, ExportRequest, GitHubRepoRequest},
    Config, DocForgeError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    service: Arc<DocForgeService>,
}

/// Maps service errors to `{ "error": ... }` bodies
struct ApiError(DocForgeError);

impl From<DocForgeError> for ApiError {
    fn from(e: DocForgeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            warn!("Rejected request: {}", self.0);
            StatusCode::BAD_REQUEST
        } else {
            error!("Request failed: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, ResponseJson(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Config::load()?;
    config.validate().await?;

    info!("docforge server starting...");
    info!("Upload directory: {}", config.sources.upload_dir.display());
    info!("Model: {}", config.llm.model);

    let service = DocForgeService::from_config(config)?;
    let state = AppState { service: Arc::new(service) };
    let app = create_app(state);

    let addr = std::env::var("DOCFORGE_BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application with all routes
fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/upload", post(upload))
        .route("/api/analyze-github-repo", post(analyze_github_repo))
        .route("/api/github-repos", get(github_repos))
        .route("/api/ai", post(generate))
        .route("/api/export", post(export))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> ResponseJson<Value> {
    ResponseJson(json!(state.service.health()))
}

/// Multipart upload with a single `file` field holding a ZIP archive
async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<ResponseJson<Value>, ApiError> {
    let mut archive = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DocForgeError::Validation(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| DocForgeError::Validation(e.to_string()))?;
            archive = Some(bytes);
            break;
        }
    }

    let archive = archive.ok_or_else(|| DocForgeError::Validation("No file provided".into()))?;
    info!("Received upload of {} bytes", archive.len());

    let service = state.service.clone();
    let project = tokio::task::spawn_blocking(move || service.upload(&archive))
        .await
        .map_err(|e| DocForgeError::new(&e.to_string()))??;
    Ok(ResponseJson(json!(project)))
}

async fn analyze_github_repo(
    State(state): State<AppState>,
    Json(request): Json<GitHubRepoRequest>,
) -> Result<ResponseJson<Value>, ApiError> {
    info!("Cloning repository: {}", request.repo);
    let project = state.service.analyze_github_repo(&request.repo).await?;
    Ok(ResponseJson(json!(project)))
}

async fn github_repos(State(state): State<AppState>) -> Result<ResponseJson<Value>, ApiError> {
    let repos = state.service.github_repos().await?;
    Ok(ResponseJson(json!(repos)))
}

async fn generate(
    State(state): State<AppState>,
    Json(request): Json<AiRequest>,
) -> Result<ResponseJson<Value>, ApiError> {
    let response = state.service.generate(&request).await?;
    Ok(ResponseJson(json!(response)))
}

async fn export(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, ApiError> {
    let file = state.service.export(&request)?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name.replace('"', "'"));
    Ok((
        [
            (header::CONTENT_TYPE, file.mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}
