use thiserror::Error;

use crate::entities::{
    ChainFilterType, ChainSnapshot, Condition, CriterionTag, LogicOperator, MatchResult,
    NumericCondition, RawKillmail, WatchCriterion, WatchProfile,
};
use crate::utils::current_millis;

/// The slice of an enriched killmail the matching engine reads.
#[derive(Debug, Clone, Copy)]
pub struct EventView<'a> {
    pub raw: &'a RawKillmail,
    pub total_value: f64,
}

impl<'a> EventView<'a> {
    pub fn new(raw: &'a RawKillmail, total_value: f64) -> Self {
        Self { raw, total_value }
    }

    fn victim_character_in(&self, ids: &[u64]) -> bool {
        self.raw
            .victim
            .character_id
            .map(|id| ids.contains(&id))
            .unwrap_or(false)
    }

    fn victim_corporation_in(&self, ids: &[u64]) -> bool {
        self.raw
            .victim
            .corporation_id
            .map(|id| ids.contains(&id))
            .unwrap_or(false)
    }

    fn attacker_character_in(&self, ids: &[u64]) -> bool {
        self.raw.attackers.iter().any(|attacker| {
            attacker
                .character_id
                .map(|id| ids.contains(&id))
                .unwrap_or(false)
        })
    }

    fn attacker_corporation_in(&self, ids: &[u64]) -> bool {
        self.raw.attackers.iter().any(|attacker| {
            attacker
                .corporation_id
                .map(|id| ids.contains(&id))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Error)]
pub enum CriteriaError {
    #[error("invalid criteria: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default)]
pub struct CriteriaOutcome {
    pub matches: bool,
    pub matched_criteria: Vec<CriterionTag>,
}

/// Structural validation. Pure; run at criterion creation time and again
/// defensively before evaluation.
pub fn validate_criteria(criterion: &WatchCriterion) -> Result<(), CriteriaError> {
    match criterion {
        WatchCriterion::CharacterWatch { ids } => {
            if ids.is_empty() {
                return Err(CriteriaError::Invalid(
                    "character_watch requires at least one id".to_string(),
                ));
            }
            Ok(())
        }
        WatchCriterion::CorporationWatch { ids } => {
            if ids.is_empty() {
                return Err(CriteriaError::Invalid(
                    "corporation_watch requires at least one id".to_string(),
                ));
            }
            Ok(())
        }
        WatchCriterion::ChainWatch {
            map_id,
            filter_type,
            max_jumps,
        } => {
            if map_id.trim().is_empty() {
                return Err(CriteriaError::Invalid(
                    "chain_watch requires a map_id".to_string(),
                ));
            }
            if *filter_type == ChainFilterType::WithinJumps {
                match max_jumps {
                    Some(jumps) if *jumps >= 1 => {}
                    Some(_) => {
                        return Err(CriteriaError::Invalid(
                            "within_jumps requires max_jumps >= 1".to_string(),
                        ));
                    }
                    None => {
                        return Err(CriteriaError::Invalid(
                            "within_jumps requires max_jumps".to_string(),
                        ));
                    }
                }
            }
            Ok(())
        }
        WatchCriterion::Custom { conditions, .. } => {
            if conditions.is_empty() {
                return Err(CriteriaError::Invalid(
                    "custom criterion requires at least one condition".to_string(),
                ));
            }
            for condition in conditions {
                match condition {
                    Condition::Numeric(_) => {}
                    Condition::Nested(WatchCriterion::Custom { .. }) => {
                        return Err(CriteriaError::Invalid(
                            "custom conditions cannot nest another custom criterion".to_string(),
                        ));
                    }
                    Condition::Nested(nested) => validate_criteria(nested)?,
                }
            }
            Ok(())
        }
    }
}

/// Evaluates one criterion against one event. The decision for composite
/// criteria short-circuits left to right, but `matched_criteria` lists every
/// condition that individually evaluated true, so callers can explain the
/// match.
pub fn test_criteria(
    criterion: &WatchCriterion,
    view: &EventView<'_>,
    chain: Option<&ChainSnapshot>,
) -> Result<CriteriaOutcome, CriteriaError> {
    validate_criteria(criterion)?;
    Ok(evaluate(criterion, view, chain))
}

fn evaluate(
    criterion: &WatchCriterion,
    view: &EventView<'_>,
    chain: Option<&ChainSnapshot>,
) -> CriteriaOutcome {
    let mut outcome = CriteriaOutcome::default();
    match criterion {
        WatchCriterion::CharacterWatch { ids } => {
            if view.victim_character_in(ids) {
                outcome.matched_criteria.push(CriterionTag::VictimCharacter);
            }
            if view.attacker_character_in(ids) {
                outcome
                    .matched_criteria
                    .push(CriterionTag::AttackerCharacter);
            }
            outcome.matches = !outcome.matched_criteria.is_empty();
        }
        WatchCriterion::CorporationWatch { ids } => {
            if view.victim_corporation_in(ids) {
                outcome
                    .matched_criteria
                    .push(CriterionTag::VictimCorporation);
            }
            if view.attacker_corporation_in(ids) {
                outcome
                    .matched_criteria
                    .push(CriterionTag::AttackerCorporation);
            }
            outcome.matches = !outcome.matched_criteria.is_empty();
        }
        WatchCriterion::ChainWatch {
            map_id,
            filter_type,
            max_jumps,
        } => {
            let snapshot = chain.filter(|snapshot| snapshot.map_id == *map_id);
            let hit = match (filter_type, snapshot) {
                (ChainFilterType::InChain, Some(snapshot)) => {
                    snapshot.contains(view.raw.solar_system_id)
                }
                (ChainFilterType::WithinJumps, Some(snapshot)) => snapshot
                    .jumps_to(view.raw.solar_system_id)
                    .map(|jumps| jumps <= max_jumps.unwrap_or(0))
                    .unwrap_or(false),
                (_, None) => false,
            };
            if hit {
                outcome.matched_criteria.push(CriterionTag::ChainSystem);
                outcome.matches = true;
            }
        }
        WatchCriterion::Custom {
            logic_operator,
            conditions,
        } => {
            let mut decisions = Vec::with_capacity(conditions.len());
            for condition in conditions {
                let hit = evaluate_condition(condition, view, chain, &mut outcome.matched_criteria);
                decisions.push(hit);
            }
            outcome.matches = match logic_operator {
                LogicOperator::And => decisions.iter().all(|hit| *hit),
                LogicOperator::Or => decisions.iter().any(|hit| *hit),
            };
        }
    }
    outcome
}

fn evaluate_condition(
    condition: &Condition,
    view: &EventView<'_>,
    chain: Option<&ChainSnapshot>,
    tags: &mut Vec<CriterionTag>,
) -> bool {
    match condition {
        Condition::Numeric(NumericCondition::IskValue { operator, value }) => {
            let hit = operator.evaluate_f64(view.total_value, *value);
            if hit {
                tags.push(CriterionTag::IskValue);
            }
            hit
        }
        Condition::Numeric(NumericCondition::ParticipantCount { operator, value }) => {
            let hit = operator.evaluate_u64(view.raw.participant_count(), *value);
            if hit {
                tags.push(CriterionTag::ParticipantCount);
            }
            hit
        }
        Condition::Nested(nested) => {
            let nested_outcome = evaluate(nested, view, chain);
            tags.extend(nested_outcome.matched_criteria);
            nested_outcome.matches
        }
    }
}

/// Evaluates every criterion of a profile; returns a match result when at
/// least one criterion matched. Confidence is the matched fraction, floored
/// at 0.5; a victim hit on a plain character/corporation watch is 1.0.
pub fn evaluate_profile(
    profile: &WatchProfile,
    view: &EventView<'_>,
    chain: Option<&ChainSnapshot>,
) -> Result<Option<MatchResult>, CriteriaError> {
    if profile.criteria.is_empty() {
        return Ok(None);
    }

    let mut matched = 0usize;
    let mut tags: Vec<CriterionTag> = Vec::new();
    let mut victim_watch_hit = false;
    for criterion in &profile.criteria {
        let outcome = test_criteria(criterion, view, chain)?;
        if !outcome.matches {
            continue;
        }
        matched += 1;
        if matches!(
            criterion,
            WatchCriterion::CharacterWatch { .. } | WatchCriterion::CorporationWatch { .. }
        ) && outcome.matched_criteria.iter().any(CriterionTag::is_victim)
        {
            victim_watch_hit = true;
        }
        for tag in outcome.matched_criteria {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
    }

    if matched == 0 {
        return Ok(None);
    }

    let mut confidence = matched as f64 / profile.criteria.len() as f64;
    if confidence < 0.5 {
        confidence = 0.5;
    }
    if victim_watch_hit {
        confidence = 1.0;
    }

    Ok(Some(MatchResult {
        profile_id: profile.profile_id.clone(),
        killmail_id: view.raw.killmail_id,
        confidence_score: confidence,
        matched_criteria: tags,
        matched_at: current_millis(),
    }))
}
