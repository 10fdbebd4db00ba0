use thiserror::Error;

use crate::entities::{Alert, AlertMetadata, AlertType, MatchResult};
use crate::utils::current_millis;

const CRITICAL_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("match result carries no matched criteria")]
    EmptyMatch,
}

/// Derives a classified, prioritized alert from a match result.
/// Pure; dispatch is the caller's concern.
pub fn generate_alert(source: MatchResult, total_value: f64) -> Result<Alert, AlertError> {
    if source.matched_criteria.is_empty() {
        return Err(AlertError::EmptyMatch);
    }

    let has_victim = source.has_victim_match();
    let has_attacker = source.has_attacker_match();

    let alert_type = if has_victim {
        AlertType::TargetKilled
    } else if has_attacker {
        AlertType::TargetActive
    } else {
        AlertType::LocationActivity
    };

    let priority = if source.confidence_score >= CRITICAL_CONFIDENCE {
        1
    } else if has_victim {
        2
    } else if has_attacker {
        3
    } else {
        4
    };

    let metadata = AlertMetadata {
        criteria_count: source.matched_criteria.len(),
        has_victim_match: has_victim,
        has_attacker_match: has_attacker,
        total_value,
    };

    Ok(Alert {
        alert_type,
        priority,
        metadata,
        source_match: source,
        created_at: current_millis(),
    })
}
