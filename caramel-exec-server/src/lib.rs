use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use caramel_exec::{CodeExecutionService, ExecutionRequest, ExecutionResult, ExecutionStatus};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server error: {0}")]
    ServerError(String),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExecRequest {
    pub language: String,
    pub code: String,
    #[serde(default)]
    pub input: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecResponse {
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ExecResponse {
    fn rejected(message: String) -> Self {
        Self {
            status: ExecutionStatus::Error,
            result: Some(message),
        }
    }
}

impl From<ExecutionResult> for ExecResponse {
    fn from(result: ExecutionResult) -> Self {
        let output = match result.status {
            ExecutionStatus::Timeout => None,
            ExecutionStatus::Active | ExecutionStatus::Error => Some(result.output),
        };
        Self {
            status: result.status,
            result: output,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ExecutionStatus,
    pub hostname: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LanguagesResponse {
    pub languages: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    service: Arc<CodeExecutionService>,
}

pub fn create_app(service: CodeExecutionService) -> Router {
    let state = AppState {
        service: Arc::new(service),
    };

    Router::new()
        .route("/api/compiler/exec", post(execute))
        .route("/api/compiler/status", get(status))
        .route("/api/compiler/languages", get(languages))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), ServerError> {
    info!("Starting code execution server on {}", addr);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::ServerError(e.to_string()))?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl-c received, shutting down...");
}

async fn execute(
    State(state): State<AppState>,
    payload: Result<Json<ExecRequest>, JsonRejection>,
) -> (StatusCode, Json<ExecResponse>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecResponse::rejected(rejection.body_text())),
            )
        }
    };

    let request = ExecutionRequest::new(payload.language, payload.code, payload.input);
    if let Err(e) = state.service.validate(&request) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ExecResponse::rejected(e.to_string())),
        );
    }

    let result = state.service.execute(request).await;
    (StatusCode::OK, Json(result.into()))
}

async fn status() -> Json<StatusResponse> {
    let hostname = nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Json(StatusResponse {
        status: ExecutionStatus::Active,
        hostname,
    })
}

async fn languages(State(state): State<AppState>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: state
            .service
            .languages()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
