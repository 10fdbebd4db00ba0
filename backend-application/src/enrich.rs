use std::sync::Arc;

use backend_domain::{
    compute_values, EnrichedKillmail, EntityKind, RawKillmail, ValueBreakdown, ValueSource,
};

use crate::names::NameCache;
use crate::pricing::ValuationChain;

/// Turns a raw killmail into its enriched form. Must not fail the pipeline:
/// valuation gaps degrade to zero values, name gaps to placeholders.
pub struct Enricher {
    chain: Arc<ValuationChain>,
    names: Arc<NameCache>,
}

impl Enricher {
    pub fn new(chain: Arc<ValuationChain>, names: Arc<NameCache>) -> Self {
        Self { chain, names }
    }

    pub async fn enrich(&self, raw: &RawKillmail) -> EnrichedKillmail {
        let breakdown = self.value_breakdown(raw).await;

        let mut character_ids = Vec::new();
        if let Some(id) = raw.victim.character_id {
            character_ids.push(id);
        }
        let final_blow_id = raw.final_blow_attacker().and_then(|attacker| attacker.character_id);
        if let Some(id) = final_blow_id {
            character_ids.push(id);
        }
        let characters = self
            .names
            .resolve_many(EntityKind::Character, &character_ids)
            .await;

        let victim_name = raw
            .victim
            .character_id
            .and_then(|id| characters.get(&id).cloned())
            .unwrap_or_default();
        let final_blow_name = final_blow_id
            .and_then(|id| characters.get(&id).cloned())
            .unwrap_or_default();
        let victim_corporation_name = match raw.victim.corporation_id {
            Some(id) => self.names.resolve_one(EntityKind::Corporation, id).await,
            None => String::new(),
        };
        let victim_ship_name = self
            .names
            .resolve_one(EntityKind::ShipType, raw.victim.ship_type_id)
            .await;
        let system_name = self
            .names
            .resolve_one(EntityKind::SolarSystem, raw.solar_system_id)
            .await;

        EnrichedKillmail {
            killmail_id: raw.killmail_id,
            kill_time: raw.kill_time,
            solar_system_id: raw.solar_system_id,
            total_value: breakdown.total_value,
            ship_value: breakdown.ship_value,
            fitted_value: breakdown.fitted_value,
            destroyed_value: breakdown.destroyed_value,
            dropped_value: breakdown.dropped_value,
            value_source: breakdown.value_source,
            victim_name,
            victim_corporation_name,
            victim_ship_name,
            system_name,
            final_blow_name,
            attacker_count: raw.attackers.len() as u64,
        }
    }

    /// The feed's precomputed aggregate is trusted and skips the whole price
    /// resolution pass; the full computation runs only when it is absent.
    async fn value_breakdown(&self, raw: &RawKillmail) -> ValueBreakdown {
        if let Some(total) = raw.zkb_total_value.filter(|total| *total > 0.0) {
            return ValueBreakdown {
                total_value: total,
                value_source: ValueSource::Precomputed,
                ..ValueBreakdown::zero()
            };
        }
        let prices = self.chain.resolve_many(&raw.referenced_type_ids()).await;
        compute_values(raw, &prices)
    }
}
