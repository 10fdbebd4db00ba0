use tracing::{info, warn};

use backend_domain::validate_criteria;

use crate::{AppError, AppState};

/// Reloads watch profiles from the external profile store. Criteria are
/// validated on load; invalid criteria are dropped with a logged error and
/// the valid remainder is kept. A profile left without criteria is skipped.
pub async fn reload_profiles(state: &AppState) -> Result<usize, AppError> {
    let loaded = state
        .profile_repo
        .load_profiles(&state.config.profiles_path)
        .await
        .map_err(AppError::Internal)?;

    let mut profiles = Vec::with_capacity(loaded.len());
    for mut profile in loaded {
        profile.criteria.retain(|criterion| match validate_criteria(criterion) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    "profile {}: dropping invalid criterion: {}",
                    profile.profile_id, err
                );
                false
            }
        });
        if profile.criteria.is_empty() {
            warn!("profile {} has no valid criteria, skipping", profile.profile_id);
            continue;
        }
        profiles.push(profile);
    }

    let count = profiles.len();
    *state.watch_profiles.write().await = profiles;
    info!("loaded {} watch profiles", count);
    Ok(count)
}
