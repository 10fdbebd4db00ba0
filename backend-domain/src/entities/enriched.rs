// Enriched killmail and participant entities

use serde::{Deserialize, Serialize};

use crate::entities::killmail::RawKillmail;
use crate::value_objects::ValueSource;

/// One-to-one with a raw killmail; mutable only by re-enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedKillmail {
    pub killmail_id: u64,
    pub kill_time: i64,
    pub solar_system_id: u64,
    pub total_value: f64,
    pub ship_value: f64,
    pub fitted_value: f64,
    pub destroyed_value: f64,
    pub dropped_value: f64,
    pub value_source: ValueSource,
    pub victim_name: String,
    pub victim_corporation_name: String,
    pub victim_ship_name: String,
    pub system_name: String,
    pub final_blow_name: String,
    pub attacker_count: u64,
}

impl EnrichedKillmail {
    pub fn identity(&self) -> (u64, i64) {
        (self.killmail_id, self.kill_time)
    }
}

/// One row per victim or attacker per killmail.
/// Exactly one victim row, at most one final-blow row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub killmail_id: u64,
    pub kill_time: i64,
    pub character_id: Option<u64>,
    pub corporation_id: Option<u64>,
    pub alliance_id: Option<u64>,
    pub ship_type_id: Option<u64>,
    pub damage: u64,
    pub is_victim: bool,
    pub final_blow: bool,
}

/// Normalizes a raw killmail into its participant rows.
pub fn participants_of(raw: &RawKillmail) -> Vec<Participant> {
    let mut rows = Vec::with_capacity(raw.attackers.len() + 1);
    rows.push(Participant {
        killmail_id: raw.killmail_id,
        kill_time: raw.kill_time,
        character_id: raw.victim.character_id,
        corporation_id: raw.victim.corporation_id,
        alliance_id: raw.victim.alliance_id,
        ship_type_id: Some(raw.victim.ship_type_id),
        damage: raw.victim.damage_taken,
        is_victim: true,
        final_blow: false,
    });
    let mut final_blow_seen = false;
    for attacker in &raw.attackers {
        let final_blow = attacker.final_blow && !final_blow_seen;
        final_blow_seen |= final_blow;
        rows.push(Participant {
            killmail_id: raw.killmail_id,
            kill_time: raw.kill_time,
            character_id: attacker.character_id,
            corporation_id: attacker.corporation_id,
            alliance_id: attacker.alliance_id,
            ship_type_id: attacker.ship_type_id,
            damage: attacker.damage_done,
            is_victim: false,
            final_blow,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::killmail::{Attacker, Victim};

    fn raw_with_attackers(attackers: Vec<Attacker>) -> RawKillmail {
        RawKillmail {
            killmail_id: 9,
            kill_time: 1_700_000_000_000,
            solar_system_id: 31000005,
            victim: Victim {
                character_id: Some(11),
                ship_type_id: 587,
                damage_taken: 4200,
                ..Victim::default()
            },
            attackers,
            zkb_total_value: None,
        }
    }

    #[test]
    fn exactly_one_victim_row() {
        let rows = participants_of(&raw_with_attackers(vec![
            Attacker {
                final_blow: true,
                ..Attacker::default()
            },
            Attacker::default(),
        ]));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|row| row.is_victim).count(), 1);
        assert_eq!(rows.iter().filter(|row| row.final_blow).count(), 1);
    }

    #[test]
    fn duplicate_final_blow_flags_collapse_to_one() {
        let rows = participants_of(&raw_with_attackers(vec![
            Attacker {
                final_blow: true,
                ..Attacker::default()
            },
            Attacker {
                final_blow: true,
                ..Attacker::default()
            },
        ]));
        assert_eq!(rows.iter().filter(|row| row.final_blow).count(), 1);
    }
}
