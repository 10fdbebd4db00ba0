use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use backend_application::commands::ingest_commands::{self, IngestError};
use backend_application::AppState;
use backend_domain::{StreamEnvelope, KILLMAIL_EVENT_KIND};

const RECONNECT_DELAY_SECONDS: u64 = 5;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Consumes the inbound killmail stream over websocket. Reconnects forever;
/// the pipeline's idempotent identity makes redelivery after a reconnect
/// safe.
pub fn spawn_feed_consumer(state: AppState) {
    let Some(feed_url) = state.config.feed_url.clone() else {
        info!("feed consumer disabled: no feed_url configured");
        return;
    };

    tokio::spawn(async move {
        loop {
            match tokio_tungstenite::connect_async(feed_url.as_str()).await {
                Ok((mut ws, _)) => {
                    info!("killmail feed connected: {}", feed_url);
                    if let Err(err) = subscribe(&mut ws).await {
                        warn!("feed subscribe failed: {}", err);
                    } else if let Err(err) = run_feed_loop(&state, &mut ws).await {
                        warn!("feed loop exited: {}", err);
                    }
                }
                Err(err) => {
                    warn!("feed connect failed: url={}, err={}", feed_url, err);
                }
            }
            sleep(Duration::from_secs(RECONNECT_DELAY_SECONDS)).await;
        }
    });
}

async fn subscribe(ws: &mut WsStream) -> Result<()> {
    let payload = json!({"action": "sub", "channel": "killstream"}).to_string();
    ws.send(Message::Text(payload)).await?;
    Ok(())
}

async fn run_feed_loop(state: &AppState, ws: &mut WsStream) -> Result<()> {
    while let Some(next) = ws.next().await {
        match next {
            Ok(Message::Text(text)) => {
                let Some(payload) = extract_killmail(text.as_ref()) else {
                    continue;
                };
                let results =
                    ingest_commands::process_killmail_batch(state, vec![payload], Some("feed"))
                        .await;
                for result in results {
                    match result {
                        Ok(_) => {}
                        // Drops are already counted by the pipeline.
                        Err(IngestError::Poison(_)) | Err(IngestError::Validation(_)) => {}
                        Err(err) => warn!("feed event failed: {}", err),
                    }
                }
            }
            Ok(Message::Ping(bytes)) => {
                ws.send(Message::Pong(bytes)).await?;
            }
            Ok(Message::Close(frame)) => {
                return Err(anyhow::anyhow!("feed closed by peer: {:?}", frame));
            }
            Ok(_) => {}
            Err(err) => {
                return Err(anyhow::anyhow!("feed stream error: {}", err));
            }
        }
    }
    Err(anyhow::anyhow!("feed stream ended"))
}

/// Messages whose type tag is not `killmail` are discarded quietly; an
/// unexpected kind on a shared feed is routine, not an error.
fn extract_killmail(raw_text: &str) -> Option<Value> {
    let envelope: StreamEnvelope = serde_json::from_str(raw_text).ok()?;
    if !envelope.kind.eq_ignore_ascii_case(KILLMAIL_EVENT_KIND) {
        debug!("discarding stream message of kind '{}'", envelope.kind);
        return None;
    }
    if envelope.payload.is_null() {
        return None;
    }
    Some(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killmail_envelope_is_extracted() {
        let payload = extract_killmail(
            r#"{"type":"killmail","payload":{"killmail_id":1,"kill_time":1700000000000}}"#,
        )
        .expect("payload");
        assert_eq!(payload["killmail_id"], 1);
    }

    #[test]
    fn other_event_kinds_are_discarded() {
        assert!(extract_killmail(r#"{"type":"heartbeat","payload":{}}"#).is_none());
        assert!(extract_killmail(r#"{"payload":{"killmail_id":1}}"#).is_none());
    }

    #[test]
    fn garbage_is_discarded() {
        assert!(extract_killmail("not json").is_none());
        assert!(extract_killmail(r#"{"type":"killmail"}"#).is_none());
    }
}
