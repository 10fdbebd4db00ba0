use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use backend_application::queries::task_queries;
use backend_application::AppState;

use crate::error::HttpError;

pub async fn health_live() -> StatusCode {
    StatusCode::OK
}

pub async fn health_ready(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    match state.kill_repo.ping().await {
        Ok(()) => Ok(Json(json!({"status": "ready"}))),
        Err(err) => Err(HttpError::Internal(format!("database not ready: {}", err))),
    }
}

pub async fn metrics_prometheus(State(state): State<AppState>) -> String {
    state.metrics.render_prometheus()
}

pub async fn list_tasks(State(state): State<AppState>) -> Json<Value> {
    let overview = task_queries::task_overview(&state).await;
    Json(json!(overview))
}

pub async fn alert_target_check(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    match state.alert_dispatcher.check_alert_target(&state.config).await {
        Ok(()) => Ok(Json(json!({"status": "ok"}))),
        Err(err) => Err(HttpError::Internal(err.to_string())),
    }
}
