use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use backend_domain::{EntityKind, NameSource};

/// ESI-style bulk name resolution for volatile entity kinds.
pub struct EsiNameSource {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ResolvedName {
    category: String,
    id: u64,
    name: String,
}

impl EsiNameSource {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl NameSource for EsiNameSource {
    fn max_batch(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Character => 1000,
            _ => 50,
        }
    }

    async fn bulk_lookup(&self, kind: EntityKind, ids: &[u64]) -> Result<HashMap<u64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/universe/names/", self.base_url.trim_end_matches('/'));
        let resolved: Vec<ResolvedName> = self
            .client
            .post(&url)
            .json(&ids)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resolved
            .into_iter()
            .filter(|entry| entry.category == kind.as_str())
            .map(|entry| (entry.id, entry.name))
            .collect())
    }
}
