use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clickhouse::Client;
use tokio::sync::RwLock;

use backend_application::enrich::Enricher;
use backend_application::names::NameCache;
use backend_application::ops::StreamHub;
use backend_application::pricing::ValuationChain;
use backend_application::supervisor::{SupervisorLimits, TaskSupervisor};
use backend_application::{AppState, Metrics};
use backend_domain::ports::{
    ChainTopology, KillmailRepository, PriceSource, StaticDataRepository,
};
use backend_infrastructure::{
    AbyssalPriceSource, AppConfig, ClickhouseRepo, DisabledChainTopology, EsiNameSource,
    ManualPriceSource, MapChainTopology, MarketPriceSource, ProfileFileRepository,
    StaticPriceSource, WebhookAlertDispatcher,
};

pub struct AppContext {
    pub state: AppState,
}

impl AppContext {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::load().await?;
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();

        let mut clickhouse = Client::default()
            .with_url(&db_config.clickhouse_url)
            .with_database(&db_config.clickhouse_database);
        if let Some(user) = &db_config.clickhouse_user {
            clickhouse = clickhouse.with_user(user);
        }
        if let Some(password) = &db_config.clickhouse_password {
            clickhouse = clickhouse.with_password(password);
        }

        let repo = Arc::new(ClickhouseRepo::new(
            clickhouse,
            db_config.clickhouse_database.clone(),
        ));
        repo.ensure_schema().await?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(runtime_config.request_timeout_seconds))
            .build()?;

        let static_data: Arc<dyn StaticDataRepository> = repo.clone();
        let price_sources: Vec<Arc<dyn PriceSource>> = vec![
            Arc::new(StaticPriceSource::new(static_data.clone())),
            Arc::new(MarketPriceSource::new(
                http.clone(),
                runtime_config.market_api_url.clone(),
            )),
            Arc::new(AbyssalPriceSource::new(
                http.clone(),
                runtime_config.abyssal_api_url.clone(),
            )),
            Arc::new(ManualPriceSource::new(runtime_config.manual_prices.clone())),
        ];
        let chain = Arc::new(ValuationChain::new(
            price_sources,
            Duration::from_secs(runtime_config.price_ttl_seconds),
        ));
        let names = Arc::new(NameCache::new(
            static_data,
            Arc::new(EsiNameSource::new(
                http.clone(),
                runtime_config.names_api_url.clone(),
            )),
            Duration::from_secs(runtime_config.name_ttl_seconds),
        ));

        let chain_topology: Arc<dyn ChainTopology> = match &runtime_config.chain_map_url {
            Some(url) => Arc::new(MapChainTopology::new(
                http,
                url.clone(),
                runtime_config.chain_ttl_seconds,
            )),
            None => Arc::new(DisabledChainTopology),
        };

        let metrics = Arc::new(Metrics::default());
        let supervisor = Arc::new(TaskSupervisor::new(
            SupervisorLimits {
                max_concurrent: runtime_config.max_concurrent_tasks,
                max_per_user: runtime_config.max_tasks_per_user,
                max_duration: Duration::from_secs(runtime_config.task_max_duration_seconds),
                warning_time: Duration::from_secs(runtime_config.task_warning_seconds),
            },
            Arc::clone(&metrics),
        ));

        let state = AppState {
            config: runtime_config,
            kill_repo: repo,
            profile_repo: Arc::new(ProfileFileRepository::new()),
            chain_topology,
            alert_dispatcher: Arc::new(WebhookAlertDispatcher::new()),
            enricher: Arc::new(Enricher::new(chain, names)),
            watch_profiles: Arc::new(RwLock::new(Vec::new())),
            hub: Arc::new(StreamHub::default()),
            supervisor,
            metrics,
        };

        Ok(Self { state })
    }
}
