// Chain topology snapshot
// Supplied by the external mapping collaborator, read-only here

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub map_id: String,
    /// System id -> jump distance from the chain home.
    pub systems: HashMap<u64, u32>,
    pub fetched_at: i64,
}

impl ChainSnapshot {
    pub fn contains(&self, system_id: u64) -> bool {
        self.systems.contains_key(&system_id)
    }

    pub fn jumps_to(&self, system_id: u64) -> Option<u32> {
        self.systems.get(&system_id).copied()
    }
}
