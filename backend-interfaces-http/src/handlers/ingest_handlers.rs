use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::error;

use backend_application::commands::ingest_commands::{self, IngestError};
use backend_application::AppState;

use crate::error::HttpError;
use crate::middleware::{authorize, parse_killmails};

#[derive(Serialize)]
pub struct IngestResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub killmail_id: Option<u64>,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct IngestResponse {
    pub ok: usize,
    pub failed: usize,
    pub results: Vec<IngestResult>,
}

pub async fn ingest_killmails(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<Json<IngestResponse>, HttpError> {
    if !authorize(&state.config, &headers) {
        return Err(HttpError::Unauthorized);
    }

    let payloads = parse_killmails(&headers, &body).map_err(|err| {
        error!("failed to parse ingest body: {}", err);
        HttpError::BadRequest(err.to_string())
    })?;
    if payloads.is_empty() {
        return Err(HttpError::BadRequest("no killmails in envelope".to_string()));
    }

    let outcomes = ingest_commands::process_killmail_batch(&state, payloads, Some("api")).await;
    let results: Vec<IngestResult> = outcomes
        .iter()
        .map(|outcome| match outcome {
            Ok(killmail_id) => IngestResult {
                killmail_id: Some(*killmail_id),
                status: "ok",
                error: None,
            },
            Err(err) => IngestResult {
                killmail_id: None,
                status: status_of(err),
                error: Some(err.to_string()),
            },
        })
        .collect();

    let ok = results.iter().filter(|result| result.status == "ok").count();
    Ok(Json(IngestResponse {
        ok,
        failed: results.len() - ok,
        results,
    }))
}

fn status_of(err: &IngestError) -> &'static str {
    match err {
        IngestError::Poison(_) | IngestError::Validation(_) => "dropped",
        IngestError::Capacity => "capacity",
        IngestError::Timeout => "timeout",
        IngestError::Storage(_) | IngestError::Internal(_) => "failed",
    }
}
