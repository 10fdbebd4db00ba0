// Watch criterion entities
// User-defined predicates evaluated against every enriched killmail

use serde::{Deserialize, Serialize};

use crate::value_objects::CompareOp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchCriterion {
    CharacterWatch {
        ids: Vec<u64>,
    },
    CorporationWatch {
        ids: Vec<u64>,
    },
    ChainWatch {
        map_id: String,
        filter_type: ChainFilterType,
        #[serde(default)]
        max_jumps: Option<u32>,
    },
    Custom {
        logic_operator: LogicOperator,
        conditions: Vec<Condition>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFilterType {
    InChain,
    WithinJumps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicOperator {
    And,
    Or,
}

/// A leaf of a composite criterion: either a numeric comparison over a
/// derived scalar, or a nested simple criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Numeric(NumericCondition),
    Nested(WatchCriterion),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NumericCondition {
    IskValue { operator: CompareOp, value: f64 },
    ParticipantCount { operator: CompareOp, value: u64 },
}

/// Owned by an external watch profile; read-only to the matching engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchProfile {
    pub profile_id: String,
    #[serde(default)]
    pub name: String,
    pub criteria: Vec<WatchCriterion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn criterion_round_trips_through_tagged_json() {
        let criterion: WatchCriterion = serde_json::from_value(json!({
            "type": "character_watch",
            "ids": [123456789]
        }))
        .expect("criterion");
        assert_eq!(
            criterion,
            WatchCriterion::CharacterWatch {
                ids: vec![123456789]
            }
        );
    }

    #[test]
    fn custom_criterion_parses_numeric_and_nested_conditions() {
        let criterion: WatchCriterion = serde_json::from_value(json!({
            "type": "custom",
            "logic_operator": "and",
            "conditions": [
                {"type": "isk_value", "operator": "greater_than", "value": 100000000.0},
                {"type": "corporation_watch", "ids": [98000001]}
            ]
        }))
        .expect("criterion");
        let WatchCriterion::Custom { conditions, .. } = criterion else {
            panic!("expected custom criterion");
        };
        assert!(matches!(conditions[0], Condition::Numeric(_)));
        assert!(matches!(conditions[1], Condition::Nested(_)));
    }

    #[test]
    fn chain_watch_parses_filter_types() {
        let criterion: WatchCriterion = serde_json::from_value(json!({
            "type": "chain_watch",
            "map_id": "map-7",
            "filter_type": "within_jumps",
            "max_jumps": 3
        }))
        .expect("criterion");
        assert!(matches!(
            criterion,
            WatchCriterion::ChainWatch {
                filter_type: ChainFilterType::WithinJumps,
                max_jumps: Some(3),
                ..
            }
        ));
    }
}
