use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use backend_domain::{current_millis, PriceEstimate, PriceSource, TypeAttributes};

#[derive(Debug, Error)]
#[error("no price source could resolve type {0}")]
pub struct PriceNotFound(pub u64);

/// Ordered chain of pluggable price sources with a shared TTL cache.
/// Sources are tried in ascending priority; the first success wins and stops
/// the chain. A source failure falls through, it never aborts the chain.
pub struct ValuationChain {
    sources: Vec<Arc<dyn PriceSource>>,
    cache: RwLock<HashMap<u64, PriceEstimate>>,
    ttl: Duration,
}

impl ValuationChain {
    pub fn new(mut sources: Vec<Arc<dyn PriceSource>>, ttl: Duration) -> Self {
        sources.sort_by_key(|source| source.priority());
        Self {
            sources,
            cache: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_fresh(&self, estimate: &PriceEstimate) -> bool {
        let age_ms = current_millis().saturating_sub(estimate.resolved_at);
        age_ms >= 0 && (age_ms as u128) < self.ttl.as_millis()
    }

    pub async fn resolve(
        &self,
        type_id: u64,
        attributes: Option<&TypeAttributes>,
    ) -> Result<PriceEstimate, PriceNotFound> {
        if let Some(hit) = self.cache.read().await.get(&type_id) {
            if self.is_fresh(hit) {
                return Ok(hit.clone());
            }
        }

        for source in &self.sources {
            if !source.supports(type_id, attributes) {
                continue;
            }
            match source.get_price(type_id, attributes).await {
                Ok(estimate) => {
                    self.cache.write().await.insert(type_id, estimate.clone());
                    return Ok(estimate);
                }
                Err(err) => {
                    debug!("price source {} missed type {}: {}", source.name(), type_id, err);
                }
            }
        }
        Err(PriceNotFound(type_id))
    }

    /// Batch resolve: cached entries are reused, the misses go through the
    /// chain one source at a time with that source's bulk fetch. Ids no
    /// source can price are simply absent from the result.
    pub async fn resolve_many(&self, type_ids: &[u64]) -> HashMap<u64, PriceEstimate> {
        let mut resolved = HashMap::new();
        let mut missing: Vec<u64> = Vec::new();
        {
            let cache = self.cache.read().await;
            for type_id in type_ids {
                match cache.get(type_id) {
                    Some(hit) if self.is_fresh(hit) => {
                        resolved.insert(*type_id, hit.clone());
                    }
                    _ => missing.push(*type_id),
                }
            }
        }
        missing.sort_unstable();
        missing.dedup();

        for source in &self.sources {
            if missing.is_empty() {
                break;
            }
            let candidates: Vec<u64> = missing
                .iter()
                .copied()
                .filter(|type_id| source.supports(*type_id, None))
                .collect();
            if candidates.is_empty() {
                continue;
            }
            match source.get_prices(&candidates).await {
                Ok(found) => {
                    missing.retain(|type_id| !found.contains_key(type_id));
                    resolved.extend(found);
                }
                Err(err) => {
                    debug!("price source {} batch miss: {}", source.name(), err);
                }
            }
        }

        if !resolved.is_empty() {
            let mut cache = self.cache.write().await;
            for (type_id, estimate) in &resolved {
                cache.insert(*type_id, estimate.clone());
            }
        }
        resolved
    }
}
