use std::sync::Arc;

use async_trait::async_trait;
use backend_domain::ports::{AlertDispatcher, HealthCheckService, KillmailRepository};
use backend_domain::RuntimeConfig;

pub struct DefaultHealthService {
    kill_repo: Arc<dyn KillmailRepository>,
    alert_dispatcher: Arc<dyn AlertDispatcher>,
    config: RuntimeConfig,
}

impl DefaultHealthService {
    pub fn new(
        kill_repo: Arc<dyn KillmailRepository>,
        alert_dispatcher: Arc<dyn AlertDispatcher>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            kill_repo,
            alert_dispatcher,
            config,
        }
    }
}

#[async_trait]
impl HealthCheckService for DefaultHealthService {
    async fn check_database(&self) -> anyhow::Result<bool> {
        self.kill_repo.ping().await.map(|_| true)
    }

    async fn check_alert_target(&self) -> anyhow::Result<bool> {
        self.alert_dispatcher
            .check_alert_target(&self.config)
            .await
            .map(|_| true)
    }
}
