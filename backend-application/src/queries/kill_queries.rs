use tracing::error;

use backend_domain::{KillmailEnrichedRow, RecentKillQuery};

use crate::{AppError, AppState};

pub async fn recent_kills(
    state: &AppState,
    query: RecentKillQuery,
) -> Result<Vec<KillmailEnrichedRow>, AppError> {
    state.kill_repo.fetch_recent(&query).await.map_err(|err| {
        error!("failed to fetch recent kills: {}", err);
        AppError::Internal(err)
    })
}

pub async fn kill_by_id(state: &AppState, killmail_id: u64) -> Result<KillmailEnrichedRow, AppError> {
    state
        .kill_repo
        .fetch_by_id(killmail_id)
        .await
        .map_err(|err| {
            error!("failed to fetch killmail {}: {}", killmail_id, err);
            AppError::Internal(err)
        })?
        .ok_or(AppError::NotFound)
}
