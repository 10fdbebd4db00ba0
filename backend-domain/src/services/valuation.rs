use std::collections::HashMap;

use crate::entities::{PriceEstimate, RawKillmail};
use crate::value_objects::ValueSource;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueBreakdown {
    pub ship_value: f64,
    pub destroyed_value: f64,
    pub dropped_value: f64,
    pub fitted_value: f64,
    pub total_value: f64,
    pub value_source: ValueSource,
}

impl ValueBreakdown {
    pub fn zero() -> Self {
        Self {
            value_source: ValueSource::Unknown,
            ..Self::default()
        }
    }
}

/// Computes the ISK breakdown for one killmail from resolved prices.
/// Missing prices count as zero; `value_source` is the majority source among
/// the estimates actually used, ties broken by first encounter.
pub fn compute_values(raw: &RawKillmail, prices: &HashMap<u64, PriceEstimate>) -> ValueBreakdown {
    let mut used_sources: Vec<&str> = Vec::new();
    let mut use_price = |type_id: u64| -> f64 {
        match prices.get(&type_id) {
            Some(estimate) => {
                used_sources.push(estimate.source_strategy.as_str());
                estimate.unit_value()
            }
            None => 0.0,
        }
    };

    let ship_value = use_price(raw.victim.ship_type_id);
    let mut destroyed_value = 0.0;
    let mut dropped_value = 0.0;
    for line in &raw.victim.items {
        let unit = use_price(line.type_id);
        destroyed_value += unit * line.quantity_destroyed as f64;
        dropped_value += unit * line.quantity_dropped as f64;
    }

    let fitted_value = destroyed_value + dropped_value;
    ValueBreakdown {
        ship_value,
        destroyed_value,
        dropped_value,
        fitted_value,
        total_value: ship_value + fitted_value,
        value_source: majority_source(&used_sources),
    }
}

fn majority_source(sources: &[&str]) -> ValueSource {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for source in sources {
        match counts.iter_mut().find(|(name, _)| name == source) {
            Some((_, count)) => *count += 1,
            None => counts.push((source, 1)),
        }
    }
    // First-encountered order wins ties.
    counts
        .iter()
        .max_by_key(|(_, count)| *count)
        .map(|(name, _)| ValueSource::from(*name))
        .unwrap_or(ValueSource::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ItemLine, Victim};

    fn estimate(type_id: u64, sell: f64, source: &str) -> PriceEstimate {
        PriceEstimate {
            type_id,
            buy_price: 0.0,
            sell_price: sell,
            source_strategy: source.to_string(),
            resolved_at: 0,
        }
    }

    fn raw() -> RawKillmail {
        RawKillmail {
            killmail_id: 7,
            kill_time: 1_700_000_000_000,
            solar_system_id: 30000142,
            victim: Victim {
                ship_type_id: 587,
                items: vec![
                    ItemLine {
                        type_id: 2048,
                        quantity_destroyed: 2,
                        quantity_dropped: 1,
                    },
                    ItemLine {
                        type_id: 3082,
                        quantity_destroyed: 0,
                        quantity_dropped: 4,
                    },
                ],
                ..Victim::default()
            },
            attackers: Vec::new(),
            zkb_total_value: None,
        }
    }

    #[test]
    fn sums_partitioned_by_destroyed_and_dropped() {
        let mut prices = HashMap::new();
        prices.insert(587, estimate(587, 1_000_000.0, "market"));
        prices.insert(2048, estimate(2048, 100.0, "market"));
        prices.insert(3082, estimate(3082, 50.0, "static"));

        let breakdown = compute_values(&raw(), &prices);
        assert_eq!(breakdown.ship_value, 1_000_000.0);
        assert_eq!(breakdown.destroyed_value, 200.0);
        assert_eq!(breakdown.dropped_value, 300.0);
        assert_eq!(breakdown.fitted_value, 500.0);
        assert_eq!(breakdown.total_value, 1_000_500.0);
        assert_eq!(breakdown.value_source, ValueSource::Market);
    }

    #[test]
    fn missing_prices_degrade_to_zero() {
        let breakdown = compute_values(&raw(), &HashMap::new());
        assert_eq!(breakdown.total_value, 0.0);
        assert_eq!(breakdown.value_source, ValueSource::Unknown);
    }

    #[test]
    fn majority_vote_ties_break_on_first_encounter() {
        let mut prices = HashMap::new();
        prices.insert(587, estimate(587, 1.0, "static"));
        prices.insert(2048, estimate(2048, 1.0, "market"));
        // static encountered first (victim ship), one vote each
        let breakdown = compute_values(&raw(), &prices);
        assert_eq!(breakdown.value_source, ValueSource::Static);
    }
}
