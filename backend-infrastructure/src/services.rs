pub mod alert_dispatch;
pub mod chain_service;
pub mod feed_consumer;
pub mod health_service;
pub mod name_service;
pub mod price_sources;

pub use alert_dispatch::*;
pub use chain_service::*;
pub use feed_consumer::*;
pub use health_service::*;
pub use name_service::*;
pub use price_sources::*;
