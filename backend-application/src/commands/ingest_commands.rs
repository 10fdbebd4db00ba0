use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use backend_domain::{
    evaluate_profile, generate_alert, participants_of, Alert, ChainSnapshot, Condition,
    EnrichedKillmail, EventView, RawKillmail, WatchCriterion, WatchProfile,
};

use crate::ops::{ALERTS_TOPIC, KILLS_TOPIC};
use crate::supervisor::{SupervisorError, TaskError};
use crate::AppState;

/// Per-event pipeline failure classes. Poison and validation drops are never
/// retried; storage exhaustion is surfaced because silent data loss is not
/// acceptable; capacity and timeout are retryable-later signals.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("poison payload: {0}")]
    Poison(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage unavailable: {0}")]
    Storage(String),
    #[error("pipeline at capacity")]
    Capacity,
    #[error("pipeline task timed out")]
    Timeout,
    #[error("internal failure: {0}")]
    Internal(String),
}

/// Runs a batch through the pipeline. Each event is isolated: one event's
/// failure never fails its siblings, and the batch returns one result per
/// input in order.
pub async fn process_killmail_batch(
    state: &AppState,
    payloads: Vec<Value>,
    user_tag: Option<&str>,
) -> Vec<Result<u64, IngestError>> {
    state.metrics.record_received(payloads.len());
    let mut results = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let task_state = state.clone();
        let started = state
            .supervisor
            .start_task("ingest", user_tag, async move {
                process_one(task_state, payload).await
            })
            .await;
        let result = match started {
            Ok(handle) => match handle.outcome().await {
                Ok(result) => result,
                Err(TaskError::TimedOut) => Err(IngestError::Timeout),
                Err(TaskError::Failed(message)) => Err(IngestError::Internal(message)),
            },
            Err(SupervisorError::CapacityExceeded) => Err(IngestError::Capacity),
        };
        results.push(result);
    }
    results
}

/// received -> parsed -> validated -> enriched -> persisted -> published.
async fn process_one(state: AppState, payload: Value) -> Result<u64, IngestError> {
    let raw: RawKillmail = serde_json::from_value(payload.clone()).map_err(|err| {
        state.metrics.record_poison();
        warn!("dropping malformed killmail payload: {}", err);
        IngestError::Poison(err.to_string())
    })?;

    validate_raw(&raw).map_err(|reason| {
        state.metrics.record_invalid();
        warn!("dropping invalid killmail {}: {}", raw.killmail_id, reason);
        IngestError::Validation(reason)
    })?;

    // Enrichment cannot fail the event; it degrades internally.
    let enriched = state.enricher.enrich(&raw).await;
    state.metrics.record_enriched();

    let payload_json = payload.to_string();
    persist_with_retry(&state, &raw, &payload_json, &enriched).await?;
    state.metrics.record_persisted();

    // Persistence is the durability boundary; everything below is
    // best-effort and never rolls the write back.
    publish_kill(&state, &enriched).await;
    match_and_alert(&state, &raw, &enriched).await;

    Ok(raw.killmail_id)
}

fn validate_raw(raw: &RawKillmail) -> Result<(), String> {
    if raw.killmail_id == 0 {
        return Err("missing killmail id".to_string());
    }
    if raw.kill_time <= 0 {
        return Err("missing kill time".to_string());
    }
    if raw.victim.ship_type_id == 0 {
        return Err("missing victim ship".to_string());
    }
    if raw.attackers.is_empty() {
        return Err("no attackers".to_string());
    }
    Ok(())
}

async fn persist_with_retry(
    state: &AppState,
    raw: &RawKillmail,
    payload_json: &str,
    enriched: &EnrichedKillmail,
) -> Result<(), IngestError> {
    let participants = participants_of(raw);
    let attempts = state.config.persist_retry_attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        let write = async {
            state.kill_repo.upsert_raw(raw, payload_json).await?;
            state.kill_repo.upsert_enriched(enriched, &participants).await
        };
        match write.await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(
                    "persist attempt {}/{} failed for killmail {}: {}",
                    attempt, attempts, raw.killmail_id, err
                );
                last_error = err.to_string();
                if attempt < attempts {
                    state.metrics.record_persist_retry();
                    tokio::time::sleep(Duration::from_millis(state.config.persist_retry_delay_ms))
                        .await;
                }
            }
        }
    }
    state.metrics.record_persist_failure();
    Err(IngestError::Storage(last_error))
}

async fn publish_kill(state: &AppState, enriched: &EnrichedKillmail) {
    if let Ok(payload) = serde_json::to_value(enriched) {
        state.hub.publish(KILLS_TOPIC, payload).await;
        state.metrics.record_published();
    }
}

async fn match_and_alert(state: &AppState, raw: &RawKillmail, enriched: &EnrichedKillmail) {
    let profiles = { state.watch_profiles.read().await.clone() };
    if profiles.is_empty() {
        return;
    }

    let view = EventView::new(raw, enriched.total_value);
    let mut alerts: Vec<Alert> = Vec::new();
    for profile in &profiles {
        let chain = chain_snapshot_for(state, profile).await;
        match evaluate_profile(profile, &view, chain.as_ref()) {
            Ok(Some(result)) => match generate_alert(result, enriched.total_value) {
                Ok(alert) => alerts.push(alert),
                Err(err) => warn!("alert generation failed for {}: {}", profile.profile_id, err),
            },
            Ok(None) => {}
            Err(err) => {
                warn!(
                    "profile {} has invalid criteria, skipping: {}",
                    profile.profile_id, err
                );
            }
        }
    }
    if alerts.is_empty() {
        return;
    }

    state.metrics.record_matches(alerts.len());
    state.metrics.record_alerts(alerts.len());
    for alert in &alerts {
        if let Ok(payload) = serde_json::to_value(alert) {
            state.hub.publish(ALERTS_TOPIC, payload).await;
        }
    }

    let deliverable: Vec<Alert> = alerts
        .into_iter()
        .filter(|alert| alert.priority <= state.config.alert_min_priority)
        .collect();
    if !deliverable.is_empty() {
        state
            .alert_dispatcher
            .spawn_dispatch(state.config.clone(), deliverable);
    }
}

fn first_map_id(criteria: &[WatchCriterion]) -> Option<&str> {
    for criterion in criteria {
        match criterion {
            WatchCriterion::ChainWatch { map_id, .. } => return Some(map_id),
            WatchCriterion::Custom { conditions, .. } => {
                for condition in conditions {
                    if let Condition::Nested(WatchCriterion::ChainWatch { map_id, .. }) = condition
                    {
                        return Some(map_id);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

async fn chain_snapshot_for(state: &AppState, profile: &WatchProfile) -> Option<ChainSnapshot> {
    let map_id = first_map_id(&profile.criteria)?;
    match state.chain_topology.snapshot(map_id).await {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            debug!("chain snapshot unavailable for {}: {}", map_id, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use backend_domain::{
        EntityKind, KillmailEnrichedRow, NameSource, Participant, PriceEstimate, PriceSource,
        RecentKillQuery, RuntimeConfig, StaticDataRepository, TypeAttributes,
        WatchProfileRepository,
    };
    use backend_domain::ports::{AlertDispatcher, ChainTopology, KillmailRepository};

    use crate::enrich::Enricher;
    use crate::names::NameCache;
    use crate::ops::StreamHub;
    use crate::pricing::ValuationChain;
    use crate::supervisor::{SupervisorLimits, TaskSupervisor};
    use crate::Metrics;

    #[derive(Default)]
    struct MemoryKillRepo {
        raw: RwLock<HashMap<(u64, i64), String>>,
        enriched: RwLock<HashMap<(u64, i64), EnrichedKillmail>>,
        participants: RwLock<HashMap<(u64, i64), Vec<Participant>>>,
        fail_enriched_writes: AtomicUsize,
    }

    impl MemoryKillRepo {
        fn failing(times: usize) -> Self {
            let repo = Self::default();
            repo.fail_enriched_writes.store(times, Ordering::SeqCst);
            repo
        }
    }

    #[async_trait]
    impl KillmailRepository for MemoryKillRepo {
        async fn ensure_schema(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn upsert_raw(&self, raw: &RawKillmail, payload_json: &str) -> anyhow::Result<()> {
            self.raw
                .write()
                .await
                .insert(raw.identity(), payload_json.to_string());
            Ok(())
        }

        async fn upsert_enriched(
            &self,
            enriched: &EnrichedKillmail,
            participants: &[Participant],
        ) -> anyhow::Result<()> {
            let remaining = self.fail_enriched_writes.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_enriched_writes.store(remaining - 1, Ordering::SeqCst);
                anyhow::bail!("storage briefly unavailable");
            }
            self.enriched
                .write()
                .await
                .insert(enriched.identity(), enriched.clone());
            self.participants
                .write()
                .await
                .insert(enriched.identity(), participants.to_vec());
            Ok(())
        }

        async fn fetch_by_id(
            &self,
            _killmail_id: u64,
        ) -> anyhow::Result<Option<KillmailEnrichedRow>> {
            Ok(None)
        }

        async fn fetch_recent(
            &self,
            _query: &RecentKillQuery,
        ) -> anyhow::Result<Vec<KillmailEnrichedRow>> {
            Ok(Vec::new())
        }

        async fn ping(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct NoProfiles;

    #[async_trait]
    impl WatchProfileRepository for NoProfiles {
        async fn load_profiles(&self, _path: &str) -> anyhow::Result<Vec<WatchProfile>> {
            Ok(Vec::new())
        }
    }

    struct NoChain;

    #[async_trait]
    impl ChainTopology for NoChain {
        async fn snapshot(&self, _map_id: &str) -> anyhow::Result<ChainSnapshot> {
            anyhow::bail!("no chain map configured")
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        dispatched: AtomicUsize,
    }

    #[async_trait]
    impl AlertDispatcher for RecordingDispatcher {
        fn spawn_dispatch(&self, _config: RuntimeConfig, alerts: Vec<Alert>) {
            self.dispatched.fetch_add(alerts.len(), Ordering::SeqCst);
        }

        async fn check_alert_target(&self, _config: &RuntimeConfig) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FlatPrices;

    #[async_trait]
    impl PriceSource for FlatPrices {
        fn name(&self) -> &'static str {
            "static"
        }

        fn priority(&self) -> u32 {
            10
        }

        fn supports(&self, _type_id: u64, _attributes: Option<&TypeAttributes>) -> bool {
            true
        }

        async fn get_price(
            &self,
            type_id: u64,
            _attributes: Option<&TypeAttributes>,
        ) -> anyhow::Result<PriceEstimate> {
            Ok(PriceEstimate {
                type_id,
                buy_price: 0.0,
                sell_price: 1_000_000.0,
                source_strategy: "static".to_string(),
                resolved_at: backend_domain::current_millis(),
            })
        }
    }

    struct StubNames;

    #[async_trait]
    impl NameSource for StubNames {
        fn max_batch(&self, _kind: EntityKind) -> usize {
            50
        }

        async fn bulk_lookup(
            &self,
            _kind: EntityKind,
            ids: &[u64],
        ) -> anyhow::Result<HashMap<u64, String>> {
            Ok(ids.iter().map(|id| (*id, format!("Pilot {id}"))).collect())
        }
    }

    struct StubStatic;

    #[async_trait]
    impl StaticDataRepository for StubStatic {
        async fn type_names(&self, ids: &[u64]) -> anyhow::Result<HashMap<u64, String>> {
            Ok(ids.iter().map(|id| (*id, format!("Type {id}"))).collect())
        }

        async fn system_names(&self, ids: &[u64]) -> anyhow::Result<HashMap<u64, String>> {
            Ok(ids.iter().map(|id| (*id, format!("System {id}"))).collect())
        }

        async fn base_prices(&self, _ids: &[u64]) -> anyhow::Result<HashMap<u64, f64>> {
            Ok(HashMap::new())
        }
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
            manual_prices: HashMap::new(),
            alert_webhook_url: None,
            alert_webhook_template: None,
            alert_webhook_token: None,
            alert_min_priority: 2,
            persist_retry_attempts: 2,
            persist_retry_delay_ms: 1,
            max_concurrent_tasks: 8,
            max_tasks_per_user: None,
            task_max_duration_seconds: 5,
            task_warning_seconds: 2,
            price_ttl_seconds: 300,
            name_ttl_seconds: 300,
            chain_ttl_seconds: 60,
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 5,
        }
    }

    fn test_state(repo: Arc<MemoryKillRepo>) -> (AppState, Arc<RecordingDispatcher>) {
        let config = test_config();
        let metrics = Arc::new(Metrics::default());
        let chain = Arc::new(ValuationChain::new(
            vec![Arc::new(FlatPrices)],
            Duration::from_secs(300),
        ));
        let names = Arc::new(NameCache::new(
            Arc::new(StubStatic),
            Arc::new(StubNames),
            Duration::from_secs(300),
        ));
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let supervisor = Arc::new(TaskSupervisor::new(
            SupervisorLimits {
                max_concurrent: config.max_concurrent_tasks,
                max_per_user: config.max_tasks_per_user,
                max_duration: Duration::from_secs(config.task_max_duration_seconds),
                warning_time: Duration::from_secs(config.task_warning_seconds),
            },
            Arc::clone(&metrics),
        ));
        let state = AppState {
            config,
            kill_repo: repo,
            profile_repo: Arc::new(NoProfiles),
            chain_topology: Arc::new(NoChain),
            alert_dispatcher: dispatcher.clone(),
            enricher: Arc::new(Enricher::new(chain, names)),
            watch_profiles: Arc::new(RwLock::new(Vec::new())),
            hub: Arc::new(StreamHub::default()),
            supervisor,
            metrics,
        };
        (state, dispatcher)
    }

    fn killmail_payload(killmail_id: u64, victim_character: u64) -> Value {
        json!({
            "killmail_id": killmail_id,
            "kill_time": 1_700_000_000_000i64,
            "solar_system_id": 30000142,
            "victim": {
                "character_id": victim_character,
                "corporation_id": 98000001,
                "ship_type_id": 587,
                "damage_taken": 1200,
                "items": [{"type_id": 2048, "quantity_destroyed": 1}]
            },
            "attackers": [
                {"character_id": 9001, "damage_done": 1200, "final_blow": true}
            ]
        })
    }

    #[tokio::test]
    async fn batch_isolates_a_bad_event_from_its_siblings() {
        let repo = Arc::new(MemoryKillRepo::default());
        let (state, _) = test_state(repo.clone());

        let mut payloads: Vec<Value> = (1..=2).map(|id| killmail_payload(id, 100 + id)).collect();
        payloads.push(json!({"killmail_id": 3, "kill_time": 1_700_000_000_000i64}));
        payloads.push(killmail_payload(4, 104));
        payloads.push(killmail_payload(5, 105));

        let results = process_killmail_batch(&state, payloads, None).await;
        assert_eq!(results.len(), 5);
        assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 4);
        assert!(matches!(results[2], Err(IngestError::Poison(_))));
        assert_eq!(repo.enriched.read().await.len(), 4);
    }

    #[tokio::test]
    async fn event_without_attackers_fails_validation() {
        let repo = Arc::new(MemoryKillRepo::default());
        let (state, _) = test_state(repo.clone());

        let mut payload = killmail_payload(7, 100);
        payload["attackers"] = json!([]);
        let results = process_killmail_batch(&state, vec![payload], None).await;
        assert!(matches!(results[0], Err(IngestError::Validation(_))));
        assert!(repo.raw.read().await.is_empty());
    }

    #[tokio::test]
    async fn ingesting_the_same_identity_twice_stores_one_record() {
        let repo = Arc::new(MemoryKillRepo::default());
        let (state, _) = test_state(repo.clone());

        let payload = killmail_payload(42, 100);
        process_killmail_batch(&state, vec![payload.clone()], None).await;
        process_killmail_batch(&state, vec![payload], None).await;

        assert_eq!(repo.raw.read().await.len(), 1);
        assert_eq!(repo.enriched.read().await.len(), 1);
        assert_eq!(repo.participants.read().await.len(), 1);
    }

    #[tokio::test]
    async fn transient_storage_failure_is_retried() {
        let repo = Arc::new(MemoryKillRepo::failing(1));
        let (state, _) = test_state(repo.clone());

        let results = process_killmail_batch(&state, vec![killmail_payload(8, 100)], None).await;
        assert!(results[0].is_ok());
        assert_eq!(repo.enriched.read().await.len(), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_a_storage_failure() {
        let repo = Arc::new(MemoryKillRepo::failing(10));
        let (state, _) = test_state(repo.clone());

        let results = process_killmail_batch(&state, vec![killmail_payload(9, 100)], None).await;
        assert!(matches!(results[0], Err(IngestError::Storage(_))));
        assert_eq!(state.metrics.persist_failures(), 1);
    }

    #[tokio::test]
    async fn matching_event_publishes_an_alert() {
        let repo = Arc::new(MemoryKillRepo::default());
        let (state, dispatcher) = test_state(repo);
        {
            let mut profiles = state.watch_profiles.write().await;
            profiles.push(WatchProfile {
                profile_id: "profile-1".to_string(),
                name: "hunters".to_string(),
                criteria: vec![WatchCriterion::CharacterWatch {
                    ids: vec![123456789],
                }],
            });
        }

        let mut alerts_rx = state.hub.subscribe(ALERTS_TOPIC).await;
        let results =
            process_killmail_batch(&state, vec![killmail_payload(77, 123456789)], None).await;
        assert!(results[0].is_ok());

        let alert = alerts_rx.recv().await.expect("alert payload");
        assert_eq!(alert["alert_type"], "target_killed");
        assert_eq!(alert["priority"], 1);
        // Victim watch hit is critical, so it clears the dispatch threshold.
        assert_eq!(dispatcher.dispatched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_failure_does_not_affect_persistence() {
        // No subscribers at all: broadcast send has no receivers, which is
        // the publish-failure mode of the hub. The event must still persist.
        let repo = Arc::new(MemoryKillRepo::default());
        let (state, _) = test_state(repo.clone());
        let results = process_killmail_batch(&state, vec![killmail_payload(11, 100)], None).await;
        assert!(results[0].is_ok());
        assert_eq!(repo.enriched.read().await.len(), 1);
    }
}
