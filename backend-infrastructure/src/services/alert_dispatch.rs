use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde_json::json;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tracing::warn;

use backend_domain::ports::AlertDispatcher;
use backend_domain::{Alert, RuntimeConfig};

#[derive(Default)]
pub struct WebhookAlertDispatcher;

impl WebhookAlertDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertDispatcher for WebhookAlertDispatcher {
    fn spawn_dispatch(&self, config: RuntimeConfig, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }
        tokio::spawn(async move {
            if let Err(err) = send_alerts(&config, &alerts).await {
                warn!("alert webhook failed: {}", err);
            }
        });
    }

    async fn check_alert_target(&self, config: &RuntimeConfig) -> Result<()> {
        check_alert_target(config).await
    }
}

pub async fn check_alert_target(config: &RuntimeConfig) -> Result<()> {
    let url = resolve_alert_url(config)?;
    if url.starts_with("ws://") || url.starts_with("wss://") {
        check_ws_target(config, &url).await
    } else {
        check_http_target(config, &url).await
    }
}

async fn send_alerts(config: &RuntimeConfig, alerts: &[Alert]) -> Result<()> {
    let url = resolve_alert_url(config)?;
    if url.starts_with("ws://") || url.starts_with("wss://") {
        send_ws_alerts(config, &url, alerts).await
    } else {
        send_http_alerts(config, &url, alerts).await
    }
}

async fn send_http_alerts(config: &RuntimeConfig, url: &str, alerts: &[Alert]) -> Result<()> {
    let template = config
        .alert_webhook_template
        .as_deref()
        .unwrap_or(r#"{"message":"{total} watch alerts\n{lines}"}"#);

    let payload = build_payload(alerts, template);
    let client = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
        .build()?;

    client
        .post(url)
        .header("Content-Type", "application/json")
        .body(payload)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn check_http_target(config: &RuntimeConfig, url: &str) -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
        .build()?;
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("alert webhook responded {}", response.status());
    }
    Ok(())
}

async fn check_ws_target(config: &RuntimeConfig, url: &str) -> Result<()> {
    let token = config.alert_webhook_token.clone();
    let payload = json!({
        "type": "ping",
        "echo": format!("vigil-check-{}", chrono::Utc::now().timestamp_millis()),
    })
    .to_string();
    if let Err(err) = try_ws_send(url, token.as_deref(), &payload, false).await {
        if token.as_ref().is_some() {
            return try_ws_send(url, token.as_deref(), &payload, true).await;
        }
        return Err(err);
    }
    Ok(())
}

async fn send_ws_alerts(config: &RuntimeConfig, url: &str, alerts: &[Alert]) -> Result<()> {
    let payload = json!({
        "type": "alerts",
        "alerts": alerts,
        "echo": format!("vigil-{}", chrono::Utc::now().timestamp_millis()),
    })
    .to_string();

    let token = config.alert_webhook_token.clone();
    if let Err(err) = try_ws_send(url, token.as_deref(), &payload, false).await {
        if token.as_ref().is_some() {
            try_ws_send(url, token.as_deref(), &payload, true).await?;
        } else {
            return Err(err);
        }
    }
    Ok(())
}

async fn try_ws_send(url: &str, token: Option<&str>, payload: &str, use_query: bool) -> Result<()> {
    let mut request = if use_query {
        add_access_token_query(url, token).into_client_request()?
    } else {
        url.into_client_request()?
    };

    if let Some(token) = token {
        if !use_query {
            request
                .headers_mut()
                .insert(AUTHORIZATION, format!("Bearer {}", token).parse()?);
        }
    }

    let (mut ws, _) = tokio_tungstenite::connect_async(request).await?;
    ws.send(Message::Text(payload.to_string())).await?;
    let _ = timeout(Duration::from_secs(2), ws.next()).await.ok();
    let _ = ws.close(None).await;
    Ok(())
}

fn add_access_token_query(url: &str, token: Option<&str>) -> String {
    let token = match token {
        Some(value) if !value.trim().is_empty() => value,
        _ => return url.to_string(),
    };
    if url.contains("access_token=") {
        return url.to_string();
    }
    if url.contains('?') {
        format!("{}&access_token={}", url, token)
    } else {
        format!("{}?access_token={}", url, token)
    }
}

fn resolve_alert_url(config: &RuntimeConfig) -> Result<String> {
    if let Some(url) = &config.alert_webhook_url {
        if !url.trim().is_empty() {
            return Ok(url.clone());
        }
    }
    anyhow::bail!("alert webhook url not configured")
}

fn build_lines(alerts: &[Alert]) -> Vec<String> {
    alerts
        .iter()
        .take(8)
        .map(|alert| {
            format!(
                "P{} {} killmail {} (profile {})",
                alert.priority,
                alert.alert_type.as_str(),
                alert.source_match.killmail_id,
                alert.source_match.profile_id
            )
        })
        .collect()
}

fn build_payload(alerts: &[Alert], template: &str) -> String {
    let mut line_text = build_lines(alerts).join("\\n");
    if alerts.len() > 8 {
        line_text.push_str(&format!("\\n... and {} more", alerts.len() - 8));
    }
    template
        .replace("{total}", &alerts.len().to_string())
        .replace("{lines}", &line_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_domain::{AlertMetadata, AlertType, CriterionTag, MatchResult};

    fn alert(priority: u8) -> Alert {
        Alert {
            alert_type: AlertType::TargetKilled,
            priority,
            metadata: AlertMetadata {
                criteria_count: 1,
                has_victim_match: true,
                has_attacker_match: false,
                total_value: 1.0e9,
            },
            source_match: MatchResult {
                profile_id: "profile-1".to_string(),
                killmail_id: 42,
                confidence_score: 1.0,
                matched_criteria: vec![CriterionTag::VictimCharacter],
                matched_at: 0,
            },
            created_at: 0,
        }
    }

    #[test]
    fn payload_template_substitutes_totals_and_lines() {
        let payload = build_payload(&[alert(1)], r#"{"message":"{total} alerts: {lines}"}"#);
        assert!(payload.contains("1 alerts"));
        assert!(payload.contains("P1 target_killed killmail 42 (profile profile-1)"));
    }

    #[test]
    fn payload_truncates_after_eight_lines() {
        let alerts: Vec<Alert> = (0..10).map(|_| alert(2)).collect();
        let payload = build_payload(&alerts, "{lines}");
        assert!(payload.contains("... and 2 more"));
    }

    #[test]
    fn unconfigured_target_is_an_error() {
        let mut config = test_config();
        config.alert_webhook_url = None;
        assert!(resolve_alert_url(&config).is_err());
    }

    fn test_config() -> RuntimeConfig {
        RuntimeConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            api_token: None,
            feed_url: None,
            names_api_url: String::new(),
            market_api_url: String::new(),
            abyssal_api_url: String::new(),
            chain_map_url: None,
            profiles_path: String::new(),
            profile_reload_seconds: 300,
            manual_prices: std::collections::HashMap::new(),
            alert_webhook_url: Some("https://hooks.example.net/vigil".to_string()),
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
