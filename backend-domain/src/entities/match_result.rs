// Match result entity
// Ephemeral: produced per evaluation, consumed by alert generation

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionTag {
    VictimCharacter,
    VictimCorporation,
    AttackerCharacter,
    AttackerCorporation,
    ChainSystem,
    IskValue,
    ParticipantCount,
}

impl CriterionTag {
    pub fn is_victim(&self) -> bool {
        matches!(self, CriterionTag::VictimCharacter | CriterionTag::VictimCorporation)
    }

    pub fn is_attacker(&self) -> bool {
        matches!(
            self,
            CriterionTag::AttackerCharacter | CriterionTag::AttackerCorporation
        )
    }

    pub fn is_location(&self) -> bool {
        matches!(self, CriterionTag::ChainSystem)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub profile_id: String,
    pub killmail_id: u64,
    /// In [0, 1]. >= 0.9 escalates the derived alert to critical.
    pub confidence_score: f64,
    pub matched_criteria: Vec<CriterionTag>,
    pub matched_at: i64,
}

impl MatchResult {
    pub fn has_victim_match(&self) -> bool {
        self.matched_criteria.iter().any(CriterionTag::is_victim)
    }

    pub fn has_attacker_match(&self) -> bool {
        self.matched_criteria.iter().any(CriterionTag::is_attacker)
    }

    pub fn has_location_match(&self) -> bool {
        self.matched_criteria.iter().any(CriterionTag::is_location)
    }
}
