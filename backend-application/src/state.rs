use std::sync::Arc;

use tokio::sync::RwLock;

use backend_domain::ports::{
    AlertDispatcher, ChainTopology, KillmailRepository, WatchProfileRepository,
};
use backend_domain::{RuntimeConfig, WatchProfile};

use crate::enrich::Enricher;
use crate::ops::StreamHub;
use crate::supervisor::TaskSupervisor;
use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub kill_repo: Arc<dyn KillmailRepository>,
    pub profile_repo: Arc<dyn WatchProfileRepository>,
    pub chain_topology: Arc<dyn ChainTopology>,
    pub alert_dispatcher: Arc<dyn AlertDispatcher>,
    pub enricher: Arc<Enricher>,
    pub watch_profiles: Arc<RwLock<Vec<WatchProfile>>>,
    pub hub: Arc<StreamHub>,
    pub supervisor: Arc<TaskSupervisor>,
    pub metrics: Arc<Metrics>,
}
