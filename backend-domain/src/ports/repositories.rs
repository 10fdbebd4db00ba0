use async_trait::async_trait;
use std::collections::HashMap;

use crate::entities::{
    EnrichedKillmail, KillmailEnrichedRow, Participant, RawKillmail, RecentKillQuery, WatchProfile,
};

#[async_trait]
pub trait KillmailRepository: Send + Sync {
    /// Administrative: tables and partitioning are prepared here, never on
    /// the write path.
    async fn ensure_schema(&self) -> anyhow::Result<()>;

    /// Conflict-aware write keyed on `(killmail_id, kill_time)`: re-delivery
    /// of the same identity leaves exactly one logical record.
    async fn upsert_raw(&self, raw: &RawKillmail, payload_json: &str) -> anyhow::Result<()>;

    /// Writes the enriched record and its participant rows. Safe to retry;
    /// upsert semantics make partial-failure retries duplicate-free.
    async fn upsert_enriched(
        &self,
        enriched: &EnrichedKillmail,
        participants: &[Participant],
    ) -> anyhow::Result<()>;

    async fn fetch_by_id(&self, killmail_id: u64) -> anyhow::Result<Option<KillmailEnrichedRow>>;

    async fn fetch_recent(&self, query: &RecentKillQuery)
        -> anyhow::Result<Vec<KillmailEnrichedRow>>;

    async fn ping(&self) -> anyhow::Result<()>;
}

/// Batch lookups against the local static-data tables (types, systems).
#[async_trait]
pub trait StaticDataRepository: Send + Sync {
    async fn type_names(&self, ids: &[u64]) -> anyhow::Result<HashMap<u64, String>>;
    async fn system_names(&self, ids: &[u64]) -> anyhow::Result<HashMap<u64, String>>;
    async fn base_prices(&self, ids: &[u64]) -> anyhow::Result<HashMap<u64, f64>>;
}

/// Read-only source of watch profiles, owned externally.
#[async_trait]
pub trait WatchProfileRepository: Send + Sync {
    async fn load_profiles(&self, path: &str) -> anyhow::Result<Vec<WatchProfile>>;
}
