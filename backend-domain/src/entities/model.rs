use clickhouse::Row;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::entities::enriched::{EnrichedKillmail, Participant};
use crate::entities::killmail::RawKillmail;
use crate::utils::{current_millis, millis_to_utc};
use crate::value_objects::ValueSource;

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct KillmailRawRow {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub kill_time: OffsetDateTime,
    pub killmail_id: u64,
    pub solar_system_id: u64,
    pub victim_character_id: u64,
    pub victim_corporation_id: u64,
    pub victim_alliance_id: u64,
    pub victim_ship_type_id: u64,
    pub damage_taken: u64,
    pub attacker_count: u64,
    pub zkb_total_value: f64,
    pub payload_json: String,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub ingested_at: OffsetDateTime,
}

impl KillmailRawRow {
    pub fn from_raw(raw: &RawKillmail, payload_json: &str) -> Self {
        Self {
            kill_time: millis_to_utc(raw.kill_time),
            killmail_id: raw.killmail_id,
            solar_system_id: raw.solar_system_id,
            victim_character_id: raw.victim.character_id.unwrap_or_default(),
            victim_corporation_id: raw.victim.corporation_id.unwrap_or_default(),
            victim_alliance_id: raw.victim.alliance_id.unwrap_or_default(),
            victim_ship_type_id: raw.victim.ship_type_id,
            damage_taken: raw.victim.damage_taken,
            attacker_count: raw.attackers.len() as u64,
            zkb_total_value: raw.zkb_total_value.unwrap_or_default(),
            payload_json: payload_json.to_string(),
            ingested_at: millis_to_utc(current_millis()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct KillmailEnrichedRow {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub kill_time: OffsetDateTime,
    pub killmail_id: u64,
    pub solar_system_id: u64,
    pub total_value: f64,
    pub ship_value: f64,
    pub fitted_value: f64,
    pub destroyed_value: f64,
    pub dropped_value: f64,
    pub value_source: String,
    pub victim_name: String,
    pub victim_corporation_name: String,
    pub victim_ship_name: String,
    pub system_name: String,
    pub final_blow_name: String,
    pub attacker_count: u64,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub enriched_at: OffsetDateTime,
}

impl From<&EnrichedKillmail> for KillmailEnrichedRow {
    fn from(enriched: &EnrichedKillmail) -> Self {
        Self {
            kill_time: millis_to_utc(enriched.kill_time),
            killmail_id: enriched.killmail_id,
            solar_system_id: enriched.solar_system_id,
            total_value: enriched.total_value,
            ship_value: enriched.ship_value,
            fitted_value: enriched.fitted_value,
            destroyed_value: enriched.destroyed_value,
            dropped_value: enriched.dropped_value,
            value_source: enriched.value_source.as_str().to_string(),
            victim_name: enriched.victim_name.clone(),
            victim_corporation_name: enriched.victim_corporation_name.clone(),
            victim_ship_name: enriched.victim_ship_name.clone(),
            system_name: enriched.system_name.clone(),
            final_blow_name: enriched.final_blow_name.clone(),
            attacker_count: enriched.attacker_count,
            enriched_at: millis_to_utc(current_millis()),
        }
    }
}

impl KillmailEnrichedRow {
    pub fn value_source(&self) -> ValueSource {
        ValueSource::from(self.value_source.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Row)]
pub struct ParticipantRow {
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub kill_time: OffsetDateTime,
    pub killmail_id: u64,
    pub character_id: u64,
    pub corporation_id: u64,
    pub alliance_id: u64,
    pub ship_type_id: u64,
    pub damage: u64,
    pub is_victim: u8,
    pub final_blow: u8,
    #[serde(with = "clickhouse::serde::time::datetime64::millis")]
    pub ingested_at: OffsetDateTime,
}

impl From<&Participant> for ParticipantRow {
    fn from(participant: &Participant) -> Self {
        Self {
            kill_time: millis_to_utc(participant.kill_time),
            killmail_id: participant.killmail_id,
            character_id: participant.character_id.unwrap_or_default(),
            corporation_id: participant.corporation_id.unwrap_or_default(),
            alliance_id: participant.alliance_id.unwrap_or_default(),
            ship_type_id: participant.ship_type_id.unwrap_or_default(),
            damage: participant.damage,
            is_victim: u8::from(participant.is_victim),
            final_blow: u8::from(participant.final_blow),
            ingested_at: millis_to_utc(current_millis()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentKillQuery {
    pub system: Option<u64>,
    pub character: Option<u64>,
    pub min_value: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub feed_url: Option<String>,
    pub names_api_url: String,
    pub market_api_url: String,
    pub abyssal_api_url: String,
    pub chain_map_url: Option<String>,
    pub profiles_path: String,
    pub profile_reload_seconds: u64,
    pub manual_prices: std::collections::HashMap<u64, f64>,
    pub alert_webhook_url: Option<String>,
    pub alert_webhook_template: Option<String>,
    pub alert_webhook_token: Option<String>,
    pub alert_min_priority: u8,
    pub persist_retry_attempts: u32,
    pub persist_retry_delay_ms: u64,
    pub max_concurrent_tasks: usize,
    pub max_tasks_per_user: Option<usize>,
    pub task_max_duration_seconds: u64,
    pub task_warning_seconds: u64,
    pub price_ttl_seconds: u64,
    pub name_ttl_seconds: u64,
    pub chain_ttl_seconds: u64,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
}
