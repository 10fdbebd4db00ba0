// Killmail entities
// Raw events as received from the feed

use serde::{Deserialize, Serialize};

/// One message from the inbound stream: a type tag plus a serialized payload.
/// Messages whose tag is not `killmail` are discarded by the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub const KILLMAIL_EVENT_KIND: &str = "killmail";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawKillmail {
    pub killmail_id: u64,
    /// Kill timestamp, milliseconds UTC. Part of the identity key.
    pub kill_time: i64,
    pub solar_system_id: u64,
    pub victim: Victim,
    #[serde(default)]
    pub attackers: Vec<Attacker>,
    /// Trusted aggregate value precomputed by the feed, when present.
    #[serde(default)]
    pub zkb_total_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Victim {
    #[serde(default)]
    pub character_id: Option<u64>,
    #[serde(default)]
    pub corporation_id: Option<u64>,
    #[serde(default)]
    pub alliance_id: Option<u64>,
    pub ship_type_id: u64,
    #[serde(default)]
    pub damage_taken: u64,
    #[serde(default)]
    pub items: Vec<ItemLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemLine {
    pub type_id: u64,
    #[serde(default)]
    pub quantity_destroyed: u64,
    #[serde(default)]
    pub quantity_dropped: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attacker {
    #[serde(default)]
    pub character_id: Option<u64>,
    #[serde(default)]
    pub corporation_id: Option<u64>,
    #[serde(default)]
    pub alliance_id: Option<u64>,
    #[serde(default)]
    pub ship_type_id: Option<u64>,
    #[serde(default)]
    pub damage_done: u64,
    #[serde(default)]
    pub final_blow: bool,
}

impl RawKillmail {
    /// Identity key. Re-delivery of the same identity upserts, never duplicates.
    pub fn identity(&self) -> (u64, i64) {
        (self.killmail_id, self.kill_time)
    }

    /// Victim plus attackers.
    pub fn participant_count(&self) -> u64 {
        self.attackers.len() as u64 + 1
    }

    pub fn final_blow_attacker(&self) -> Option<&Attacker> {
        self.attackers.iter().find(|attacker| attacker.final_blow)
    }

    /// Every distinct type id the valuation pass needs a price for:
    /// the victim ship, all fitted item types, all attacker ships.
    pub fn referenced_type_ids(&self) -> Vec<u64> {
        let mut ids = Vec::with_capacity(1 + self.victim.items.len() + self.attackers.len());
        ids.push(self.victim.ship_type_id);
        for line in &self.victim.items {
            ids.push(line.type_id);
        }
        for attacker in &self.attackers {
            if let Some(ship) = attacker.ship_type_id {
                ids.push(ship);
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids.retain(|id| *id != 0);
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn referenced_type_ids_are_distinct() {
        let raw: RawKillmail = serde_json::from_value(json!({
            "killmail_id": 1,
            "kill_time": 1_700_000_000_000i64,
            "solar_system_id": 30000142,
            "victim": {
                "ship_type_id": 587,
                "items": [
                    {"type_id": 2048, "quantity_destroyed": 1},
                    {"type_id": 2048, "quantity_dropped": 2},
                    {"type_id": 3082, "quantity_destroyed": 4}
                ]
            },
            "attackers": [
                {"ship_type_id": 587, "final_blow": true},
                {"damage_done": 10}
            ]
        }))
        .expect("raw killmail");

        assert_eq!(raw.referenced_type_ids(), vec![587, 2048, 3082]);
        assert_eq!(raw.participant_count(), 3);
        assert!(raw.final_blow_attacker().is_some());
    }
}
