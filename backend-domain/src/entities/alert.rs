// Alert entity

use serde::{Deserialize, Serialize};

use crate::entities::match_result::MatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    TargetKilled,
    TargetActive,
    LocationActivity,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::TargetKilled => "target_killed",
            AlertType::TargetActive => "target_active",
            AlertType::LocationActivity => "location_activity",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMetadata {
    pub criteria_count: usize,
    pub has_victim_match: bool,
    pub has_attacker_match: bool,
    pub total_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    /// 1..=4, 1 is critical.
    pub priority: u8,
    pub metadata: AlertMetadata,
    pub source_match: MatchResult,
    pub created_at: i64,
}
