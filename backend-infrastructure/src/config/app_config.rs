use std::collections::HashMap;
use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use backend_domain::{DbConfig, RuntimeConfig};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub feed_url: Option<String>,
    pub names_api_url: String,
    pub market_api_url: String,
    pub abyssal_api_url: String,
    pub chain_map_url: Option<String>,
    pub profiles_path: String,
    pub profile_reload_seconds: u64,
    pub manual_prices: HashMap<String, f64>,
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

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3240".to_string(),
            api_token: None,
            clickhouse_url: "http://127.0.0.1:8123".to_string(),
            clickhouse_database: "vigil".to_string(),
            clickhouse_user: None,
            clickhouse_password: None,
            feed_url: None,
            names_api_url: "https://esi.evetech.net/latest".to_string(),
            market_api_url: "https://market.fuzzwork.co.uk/aggregates".to_string(),
            abyssal_api_url: "https://mutamarket.com/api/modules".to_string(),
            chain_map_url: None,
            profiles_path: "./watch_profiles.yaml".to_string(),
            profile_reload_seconds: 300,
            manual_prices: HashMap::new(),
            alert_webhook_url: None,
            alert_webhook_template: None,
            alert_webhook_token: None,
            alert_min_priority: 2,
            persist_retry_attempts: 3,
            persist_retry_delay_ms: 250,
            max_concurrent_tasks: 64,
            max_tasks_per_user: None,
            task_max_duration_seconds: 30,
            task_warning_seconds: 10,
            price_ttl_seconds: 1800,
            name_ttl_seconds: 86_400,
            chain_ttl_seconds: 60,
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout_seconds: 15,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("VIGIL_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        if !file_path.exists() {
            warn!("config.toml not found, using defaults");
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config.resolve_paths(base_dir);
            config.normalize();
            config.validate()?;
            return Ok(config);
        }
        let content = fs::read_to_string(file_path).await?;
        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        for field in [
            &mut self.api_token,
            &mut self.clickhouse_user,
            &mut self.clickhouse_password,
            &mut self.feed_url,
            &mut self.chain_map_url,
            &mut self.alert_webhook_url,
            &mut self.alert_webhook_template,
            &mut self.alert_webhook_token,
        ] {
            if let Some(value) = field {
                if value.trim().is_empty() {
                    *field = None;
                }
            }
        }
        if self.alert_min_priority == 0 || self.alert_min_priority > 4 {
            self.alert_min_priority = 2;
        }
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.profiles_path = resolve_path(base, &self.profiles_path);
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|err| anyhow!("invalid bind_addr: {}", err))?;
        if self.max_body_bytes == 0 {
            return Err(anyhow!("max_body_bytes must be greater than 0"));
        }
        if self.max_concurrent_tasks == 0 {
            return Err(anyhow!("max_concurrent_tasks must be greater than 0"));
        }
        if self.task_warning_seconds >= self.task_max_duration_seconds {
            return Err(anyhow!(
                "task_warning_seconds must be below task_max_duration_seconds"
            ));
        }
        if self.persist_retry_attempts == 0 {
            return Err(anyhow!("persist_retry_attempts must be greater than 0"));
        }
        for type_id in self.manual_prices.keys() {
            if type_id.trim().parse::<u64>().is_err() {
                return Err(anyhow!("invalid manual price type id '{}'", type_id));
            }
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: self.bind_addr.clone(),
            api_token: self.api_token.clone(),
            feed_url: self.feed_url.clone(),
            names_api_url: self.names_api_url.clone(),
            market_api_url: self.market_api_url.clone(),
            abyssal_api_url: self.abyssal_api_url.clone(),
            chain_map_url: self.chain_map_url.clone(),
            profiles_path: self.profiles_path.clone(),
            profile_reload_seconds: self.profile_reload_seconds,
            manual_prices: self
                .manual_prices
                .iter()
                .filter_map(|(type_id, price)| {
                    type_id.trim().parse::<u64>().ok().map(|id| (id, *price))
                })
                .collect(),
            alert_webhook_url: self.alert_webhook_url.clone(),
            alert_webhook_template: self.alert_webhook_template.clone(),
            alert_webhook_token: self.alert_webhook_token.clone(),
            alert_min_priority: self.alert_min_priority,
            persist_retry_attempts: self.persist_retry_attempts,
            persist_retry_delay_ms: self.persist_retry_delay_ms,
            max_concurrent_tasks: self.max_concurrent_tasks,
            max_tasks_per_user: self.max_tasks_per_user,
            task_max_duration_seconds: self.task_max_duration_seconds,
            task_warning_seconds: self.task_warning_seconds,
            price_ttl_seconds: self.price_ttl_seconds,
            name_ttl_seconds: self.name_ttl_seconds,
            chain_ttl_seconds: self.chain_ttl_seconds,
            max_body_bytes: self.max_body_bytes,
            request_timeout_seconds: self.request_timeout_seconds,
        }
    }

    pub fn to_db_config(&self) -> DbConfig {
        DbConfig {
            clickhouse_url: self.clickhouse_url.clone(),
            clickhouse_database: self.clickhouse_database.clone(),
            clickhouse_user: self.clickhouse_user.clone(),
            clickhouse_password: self.clickhouse_password.clone(),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("VIGIL_BIND_ADDR") {
            self.bind_addr = value;
        }
        if let Ok(value) = env::var("VIGIL_API_TOKEN") {
            self.api_token = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_URL") {
            self.clickhouse_url = value;
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_DATABASE") {
            self.clickhouse_database = value;
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_USER") {
            self.clickhouse_user = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_CLICKHOUSE_PASSWORD") {
            self.clickhouse_password = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_FEED_URL") {
            self.feed_url = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_NAMES_API_URL") {
            self.names_api_url = value;
        }
        if let Ok(value) = env::var("VIGIL_MARKET_API_URL") {
            self.market_api_url = value;
        }
        if let Ok(value) = env::var("VIGIL_ABYSSAL_API_URL") {
            self.abyssal_api_url = value;
        }
        if let Ok(value) = env::var("VIGIL_CHAIN_MAP_URL") {
            self.chain_map_url = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_PROFILES_PATH") {
            self.profiles_path = value;
        }
        if let Ok(value) = env::var("VIGIL_PROFILE_RELOAD_SECONDS") {
            self.profile_reload_seconds = value.parse().unwrap_or(self.profile_reload_seconds);
        }
        if let Ok(value) = env::var("VIGIL_ALERT_WEBHOOK_URL") {
            self.alert_webhook_url = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_ALERT_WEBHOOK_TEMPLATE") {
            self.alert_webhook_template = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_ALERT_WEBHOOK_TOKEN") {
            self.alert_webhook_token = Some(value);
        }
        if let Ok(value) = env::var("VIGIL_ALERT_MIN_PRIORITY") {
            self.alert_min_priority = value.parse().unwrap_or(self.alert_min_priority);
        }
        if let Ok(value) = env::var("VIGIL_PERSIST_RETRY_ATTEMPTS") {
            self.persist_retry_attempts = value.parse().unwrap_or(self.persist_retry_attempts);
        }
        if let Ok(value) = env::var("VIGIL_PERSIST_RETRY_DELAY_MS") {
            self.persist_retry_delay_ms = value.parse().unwrap_or(self.persist_retry_delay_ms);
        }
        if let Ok(value) = env::var("VIGIL_MAX_CONCURRENT_TASKS") {
            self.max_concurrent_tasks = value.parse().unwrap_or(self.max_concurrent_tasks);
        }
        if let Ok(value) = env::var("VIGIL_MAX_TASKS_PER_USER") {
            self.max_tasks_per_user = value.parse().ok();
        }
        if let Ok(value) = env::var("VIGIL_TASK_MAX_DURATION_SECONDS") {
            self.task_max_duration_seconds =
                value.parse().unwrap_or(self.task_max_duration_seconds);
        }
        if let Ok(value) = env::var("VIGIL_TASK_WARNING_SECONDS") {
            self.task_warning_seconds = value.parse().unwrap_or(self.task_warning_seconds);
        }
        if let Ok(value) = env::var("VIGIL_PRICE_TTL_SECONDS") {
            self.price_ttl_seconds = value.parse().unwrap_or(self.price_ttl_seconds);
        }
        if let Ok(value) = env::var("VIGIL_NAME_TTL_SECONDS") {
            self.name_ttl_seconds = value.parse().unwrap_or(self.name_ttl_seconds);
        }
        if let Ok(value) = env::var("VIGIL_CHAIN_TTL_SECONDS") {
            self.chain_ttl_seconds = value.parse().unwrap_or(self.chain_ttl_seconds);
        }
        if let Ok(value) = env::var("VIGIL_MAX_BODY_BYTES") {
            self.max_body_bytes = value.parse().unwrap_or(self.max_body_bytes);
        }
        if let Ok(value) = env::var("VIGIL_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds = value.parse().unwrap_or(self.request_timeout_seconds);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_blanks_optional_fields() {
        let mut config = AppConfig {
            api_token: Some("  ".to_string()),
            alert_webhook_url: Some(String::new()),
            alert_min_priority: 9,
            ..AppConfig::default()
        };
        config.normalize();
        assert!(config.api_token.is_none());
        assert!(config.alert_webhook_url.is_none());
        assert_eq!(config.alert_min_priority, 2);
    }

    #[test]
    fn validate_rejects_inverted_task_timers() {
        let config = AppConfig {
            task_warning_seconds: 60,
            task_max_duration_seconds: 30,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn manual_prices_parse_into_runtime_config() {
        let mut config = AppConfig::default();
        config.manual_prices.insert("47800".to_string(), 2.5e9);
        let runtime = config.to_runtime_config();
        assert_eq!(runtime.manual_prices.get(&47800), Some(&2.5e9));
    }

    #[test]
    fn validate_rejects_non_numeric_manual_price_keys() {
        let mut config = AppConfig::default();
        config.manual_prices.insert("abyssal-gun".to_string(), 1.0);
        assert!(config.validate().is_err());
    }
}
