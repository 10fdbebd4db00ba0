use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use backend_domain::{current_millis, ChainSnapshot, ChainTopology};

/// Chain-map snapshots from the external mapping service, cached per map
/// with a short TTL. Staleness inside the TTL is tolerated.
pub struct MapChainTopology {
    client: Client,
    base_url: String,
    ttl_ms: i64,
    cache: RwLock<HashMap<String, ChainSnapshot>>,
}

#[derive(Debug, Deserialize)]
struct ChainSystemDto {
    system_id: u64,
    #[serde(default)]
    jumps: u32,
}

#[derive(Debug, Deserialize)]
struct ChainDto {
    #[serde(default)]
    systems: Vec<ChainSystemDto>,
}

impl MapChainTopology {
    pub fn new(client: Client, base_url: String, ttl_seconds: u64) -> Self {
        Self {
            client,
            base_url,
            ttl_ms: ttl_seconds as i64 * 1000,
            cache: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ChainTopology for MapChainTopology {
    async fn snapshot(&self, map_id: &str) -> Result<ChainSnapshot> {
        let now = current_millis();
        if let Some(cached) = self.cache.read().await.get(map_id) {
            if now - cached.fetched_at < self.ttl_ms {
                return Ok(cached.clone());
            }
        }

        let url = format!("{}/maps/{}/chain", self.base_url.trim_end_matches('/'), map_id);
        let dto: ChainDto = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let snapshot = ChainSnapshot {
            map_id: map_id.to_string(),
            systems: dto
                .systems
                .into_iter()
                .map(|system| (system.system_id, system.jumps))
                .collect(),
            fetched_at: now,
        };
        self.cache
            .write()
            .await
            .insert(map_id.to_string(), snapshot.clone());
        Ok(snapshot)
    }
}

/// Stand-in when no chain map service is configured; chain criteria then
/// never match.
pub struct DisabledChainTopology;

#[async_trait]
impl ChainTopology for DisabledChainTopology {
    async fn snapshot(&self, _map_id: &str) -> Result<ChainSnapshot> {
        Err(anyhow!("chain map service not configured"))
    }
}
