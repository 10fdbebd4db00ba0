// Backend Application Layer

pub mod commands;
pub mod enrich;
pub mod error;
pub mod metrics;
pub mod names;
pub mod ops;
pub mod pricing;
pub mod queries;
pub mod state;
pub mod supervisor;

pub use error::AppError;
pub use metrics::Metrics;
pub use state::AppState;
