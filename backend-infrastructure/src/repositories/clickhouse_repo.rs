use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use clickhouse::Client;

use backend_domain::{
    EnrichedKillmail, KillmailEnrichedRow, KillmailRawRow, KillmailRepository, Participant,
    ParticipantRow, RawKillmail, RecentKillQuery, StaticDataRepository,
};

const DEFAULT_RECENT_LIMIT: usize = 100;
const MAX_RECENT_LIMIT: usize = 1000;

const ENRICHED_COLUMNS: &str = "kill_time, killmail_id, solar_system_id, total_value, ship_value, \
     fitted_value, destroyed_value, dropped_value, value_source, victim_name, \
     victim_corporation_name, victim_ship_name, system_name, final_blow_name, attacker_count, \
     enriched_at";

/// ClickHouse-backed killmail store. Identity conflicts resolve through the
/// ReplacingMergeTree engine: re-inserting the same `(kill_time, killmail_id)`
/// key collapses to the newest version, so writers never block each other.
#[derive(Clone)]
pub struct ClickhouseRepo {
    client: Client,
    database: String,
}

impl ClickhouseRepo {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }
}

#[async_trait]
impl KillmailRepository for ClickhouseRepo {
    async fn ensure_schema(&self) -> Result<()> {
        let create_db = format!("CREATE DATABASE IF NOT EXISTS {}", self.database);
        self.client.query(&create_db).execute().await?;

        let create_raw = r#"
CREATE TABLE IF NOT EXISTS killmails_raw (
    kill_time DateTime64(3),
    killmail_id UInt64,
    solar_system_id UInt64,
    victim_character_id UInt64,
    victim_corporation_id UInt64,
    victim_alliance_id UInt64,
    victim_ship_type_id UInt64,
    damage_taken UInt64,
    attacker_count UInt64,
    zkb_total_value Float64,
    payload_json String,
    ingested_at DateTime64(3)
) ENGINE = ReplacingMergeTree(ingested_at)
PARTITION BY toYYYYMM(kill_time)
ORDER BY (kill_time, killmail_id)
"#;
        self.client.query(create_raw).execute().await?;

        let create_enriched = r#"
CREATE TABLE IF NOT EXISTS killmails_enriched (
    kill_time DateTime64(3),
    killmail_id UInt64,
    solar_system_id UInt64,
    total_value Float64,
    ship_value Float64,
    fitted_value Float64,
    destroyed_value Float64,
    dropped_value Float64,
    value_source String,
    victim_name String,
    victim_corporation_name String,
    victim_ship_name String,
    system_name String,
    final_blow_name String,
    attacker_count UInt64,
    enriched_at DateTime64(3)
) ENGINE = ReplacingMergeTree(enriched_at)
PARTITION BY toYYYYMM(kill_time)
ORDER BY (kill_time, killmail_id)
"#;
        self.client.query(create_enriched).execute().await?;

        let create_participants = r#"
CREATE TABLE IF NOT EXISTS participants (
    kill_time DateTime64(3),
    killmail_id UInt64,
    character_id UInt64,
    corporation_id UInt64,
    alliance_id UInt64,
    ship_type_id UInt64,
    damage UInt64,
    is_victim UInt8,
    final_blow UInt8,
    ingested_at DateTime64(3)
) ENGINE = ReplacingMergeTree(ingested_at)
PARTITION BY toYYYYMM(kill_time)
ORDER BY (kill_time, killmail_id, is_victim, character_id, ship_type_id)
"#;
        self.client.query(create_participants).execute().await?;

        let create_types = r#"
CREATE TABLE IF NOT EXISTS inv_types (
    type_id UInt64,
    type_name String,
    base_price Float64,
    is_abyssal UInt8
) ENGINE = ReplacingMergeTree
ORDER BY type_id
"#;
        self.client.query(create_types).execute().await?;

        let create_systems = r#"
CREATE TABLE IF NOT EXISTS map_solar_systems (
    system_id UInt64,
    system_name String
) ENGINE = ReplacingMergeTree
ORDER BY system_id
"#;
        self.client.query(create_systems).execute().await?;
        Ok(())
    }

    async fn upsert_raw(&self, raw: &RawKillmail, payload_json: &str) -> Result<()> {
        let mut insert = self.client.insert("killmails_raw")?;
        insert.write(&KillmailRawRow::from_raw(raw, payload_json)).await?;
        insert.end().await?;
        Ok(())
    }

    async fn upsert_enriched(
        &self,
        enriched: &EnrichedKillmail,
        participants: &[Participant],
    ) -> Result<()> {
        let mut insert = self.client.insert("killmails_enriched")?;
        insert.write(&KillmailEnrichedRow::from(enriched)).await?;
        insert.end().await?;

        let mut insert = self.client.insert("participants")?;
        for participant in participants {
            insert.write(&ParticipantRow::from(participant)).await?;
        }
        insert.end().await?;
        Ok(())
    }

    async fn fetch_by_id(&self, killmail_id: u64) -> Result<Option<KillmailEnrichedRow>> {
        let query = format!(
            "SELECT {ENRICHED_COLUMNS} FROM killmails_enriched FINAL WHERE killmail_id = {} LIMIT 1",
            killmail_id
        );
        let rows = self
            .client
            .query(&query)
            .fetch_all::<KillmailEnrichedRow>()
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_recent(&self, query: &RecentKillQuery) -> Result<Vec<KillmailEnrichedRow>> {
        let mut sql = format!(
            "SELECT {ENRICHED_COLUMNS} FROM killmails_enriched FINAL \
             WHERE kill_time > now() - INTERVAL 7 DAY"
        );
        if let Some(system) = query.system {
            sql.push_str(&format!(" AND solar_system_id = {}", system));
        }
        if let Some(character) = query.character {
            sql.push_str(&format!(
                " AND killmail_id IN (SELECT killmail_id FROM participants WHERE character_id = {})",
                character
            ));
        }
        if let Some(min_value) = query.min_value {
            sql.push_str(&format!(" AND total_value >= {}", min_value));
        }
        let limit = query
            .limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .min(MAX_RECENT_LIMIT);
        sql.push_str(&format!(" ORDER BY kill_time DESC LIMIT {}", limit));

        let rows = self
            .client
            .query(&sql)
            .fetch_all::<KillmailEnrichedRow>()
            .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<()> {
        let _: u8 = self.client.query("SELECT toUInt8(1)").fetch_one().await?;
        Ok(())
    }
}

#[async_trait]
impl StaticDataRepository for ClickhouseRepo {
    async fn type_names(&self, ids: &[u64]) -> Result<HashMap<u64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!(
            "SELECT type_id, type_name FROM inv_types FINAL WHERE type_id IN ({})",
            join_ids(ids)
        );
        let rows = self.client.query(&query).fetch_all::<(u64, String)>().await?;
        Ok(rows.into_iter().collect())
    }

    async fn system_names(&self, ids: &[u64]) -> Result<HashMap<u64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!(
            "SELECT system_id, system_name FROM map_solar_systems FINAL WHERE system_id IN ({})",
            join_ids(ids)
        );
        let rows = self.client.query(&query).fetch_all::<(u64, String)>().await?;
        Ok(rows.into_iter().collect())
    }

    async fn base_prices(&self, ids: &[u64]) -> Result<HashMap<u64, f64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!(
            "SELECT type_id, base_price FROM inv_types FINAL \
             WHERE base_price > 0 AND type_id IN ({})",
            join_ids(ids)
        );
        let rows = self.client.query(&query).fetch_all::<(u64, f64)>().await?;
        Ok(rows.into_iter().collect())
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_ids_renders_an_in_list() {
        assert_eq!(join_ids(&[1, 2, 3]), "1,2,3");
        assert_eq!(join_ids(&[]), "");
    }
}
