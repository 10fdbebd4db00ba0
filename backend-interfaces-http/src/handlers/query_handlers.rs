use axum::extract::{Path, Query, State};
use axum::Json;

use backend_application::queries::kill_queries;
use backend_application::AppState;
use backend_domain::{KillmailEnrichedRow, RecentKillQuery};

use crate::error::HttpError;

pub async fn recent_kills(
    State(state): State<AppState>,
    Query(query): Query<RecentKillQuery>,
) -> Result<Json<Vec<KillmailEnrichedRow>>, HttpError> {
    let rows = kill_queries::recent_kills(&state, query).await?;
    Ok(Json(rows))
}

pub async fn kill_by_id(
    State(state): State<AppState>,
    Path(killmail_id): Path<u64>,
) -> Result<Json<KillmailEnrichedRow>, HttpError> {
    let row = kill_queries::kill_by_id(&state, killmail_id).await?;
    Ok(Json(row))
}
