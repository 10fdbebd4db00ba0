use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{broadcast, RwLock};

const CHANNEL_BUFFER: usize = 64;

pub const KILLS_TOPIC: &str = "kills";
pub const ALERTS_TOPIC: &str = "alerts";

/// Topic-keyed broadcast hub for downstream consumers. Publishing is
/// best-effort: no subscribers, or a lagging subscriber, never fails the
/// publisher.
#[derive(Default)]
pub struct StreamHub {
    channels: RwLock<HashMap<String, broadcast::Sender<Value>>>,
}

impl StreamHub {
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<Value> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| {
                let (tx, _rx) = broadcast::channel(CHANNEL_BUFFER);
                tx
            })
            .subscribe()
    }

    pub async fn publish(&self, topic: &str, payload: Value) {
        let mut channels = self.channels.write().await;
        let tx = channels.entry(topic.to_string()).or_insert_with(|| {
            let (tx, _rx) = broadcast::channel(CHANNEL_BUFFER);
            tx
        });
        let _ = tx.send(payload);
    }
}
