use async_trait::async_trait;
use std::collections::HashMap;

use crate::entities::{Alert, ChainSnapshot, PriceEstimate, RuntimeConfig, TypeAttributes};
use crate::value_objects::EntityKind;

/// One pluggable valuation strategy. Strategies are tried in ascending
/// `priority` order; the first success wins.
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> u32;
    fn supports(&self, type_id: u64, attributes: Option<&TypeAttributes>) -> bool;

    /// An Err here means "no estimate from this source" and falls through to
    /// the next strategy in the chain.
    async fn get_price(
        &self,
        type_id: u64,
        attributes: Option<&TypeAttributes>,
    ) -> anyhow::Result<PriceEstimate>;

    /// Bulk fetch; sources with a real batch API override this.
    async fn get_prices(&self, type_ids: &[u64]) -> anyhow::Result<HashMap<u64, PriceEstimate>> {
        let mut out = HashMap::new();
        for type_id in type_ids {
            if let Ok(estimate) = self.get_price(*type_id, None).await {
                out.insert(*type_id, estimate);
            }
        }
        Ok(out)
    }
}

/// Bulk name lookup for volatile entity kinds.
#[async_trait]
pub trait NameSource: Send + Sync {
    /// Upstream batch cap for one call of this kind.
    fn max_batch(&self, kind: EntityKind) -> usize;
    async fn bulk_lookup(
        &self,
        kind: EntityKind,
        ids: &[u64],
    ) -> anyhow::Result<HashMap<u64, String>>;
}

/// Chain-map topology collaborator.
#[async_trait]
pub trait ChainTopology: Send + Sync {
    async fn snapshot(&self, map_id: &str) -> anyhow::Result<ChainSnapshot>;
}

#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Fire-and-forget delivery to the configured alert target.
    fn spawn_dispatch(&self, config: RuntimeConfig, alerts: Vec<Alert>);
    async fn check_alert_target(&self, config: &RuntimeConfig) -> anyhow::Result<()>;
}

#[async_trait]
pub trait HealthCheckService: Send + Sync {
    async fn check_database(&self) -> anyhow::Result<bool>;
    async fn check_alert_target(&self) -> anyhow::Result<bool>;
}
