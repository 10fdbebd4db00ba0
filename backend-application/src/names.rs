use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use backend_domain::{current_millis, EntityKind, NameSource, StaticDataRepository};

#[derive(Debug, Clone)]
struct CachedName {
    name: String,
    cached_at: i64,
}

/// Two-tier name resolution: static kinds hit the local static-data tables,
/// volatile kinds go through the bulk lookup API in chunks. Never fails;
/// unresolved ids get a synthetic placeholder. Concurrent population races
/// are last-write-wins by design tolerance.
pub struct NameCache {
    static_data: Arc<dyn StaticDataRepository>,
    source: Arc<dyn NameSource>,
    ttl: Duration,
    cache: RwLock<HashMap<(EntityKind, u64), CachedName>>,
}

impl NameCache {
    pub fn new(
        static_data: Arc<dyn StaticDataRepository>,
        source: Arc<dyn NameSource>,
        ttl: Duration,
    ) -> Self {
        Self {
            static_data,
            source,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn resolve_one(&self, kind: EntityKind, id: u64) -> String {
        self.resolve_many(kind, &[id])
            .await
            .remove(&id)
            .unwrap_or_else(|| kind.placeholder(id))
    }

    /// Partition into cached/missing, one batched fetch for the misses,
    /// placeholder for anything still unresolved. The cache never holds an
    /// empty entry.
    pub async fn resolve_many(&self, kind: EntityKind, ids: &[u64]) -> HashMap<u64, String> {
        let mut out = HashMap::new();
        let mut missing: Vec<u64> = Vec::new();
        let now = current_millis();
        {
            let cache = self.cache.read().await;
            for id in ids {
                match cache.get(&(kind, *id)) {
                    Some(entry)
                        if (now.saturating_sub(entry.cached_at) as u128)
                            < self.ttl.as_millis() =>
                    {
                        out.insert(*id, entry.name.clone());
                    }
                    _ => missing.push(*id),
                }
            }
        }
        missing.sort_unstable();
        missing.dedup();
        if missing.is_empty() {
            return out;
        }

        let fetched = self.fetch(kind, &missing).await;
        let mut cache = self.cache.write().await;
        for id in missing {
            let name = fetched
                .get(&id)
                .cloned()
                .unwrap_or_else(|| kind.placeholder(id));
            cache.insert(
                (kind, id),
                CachedName {
                    name: name.clone(),
                    cached_at: now,
                },
            );
            out.insert(id, name);
        }
        out
    }

    async fn fetch(&self, kind: EntityKind, ids: &[u64]) -> HashMap<u64, String> {
        if kind.is_static() {
            let lookup = match kind {
                EntityKind::ShipType => self.static_data.type_names(ids).await,
                _ => self.static_data.system_names(ids).await,
            };
            return match lookup {
                Ok(names) => names,
                Err(err) => {
                    warn!("static name lookup failed for {}: {}", kind.as_str(), err);
                    HashMap::new()
                }
            };
        }

        let mut fetched = HashMap::new();
        let batch = self.source.max_batch(kind).max(1);
        for chunk in ids.chunks(batch) {
            match self.source.bulk_lookup(kind, chunk).await {
                Ok(names) => fetched.extend(names),
                Err(err) => {
                    warn!("bulk name lookup failed for {}: {}", kind.as_str(), err);
                }
            }
        }
        fetched
    }
}
