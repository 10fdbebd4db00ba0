// Domain entities

pub mod alert;
pub mod chain;
pub mod enriched;
pub mod killmail;
pub mod match_result;
pub mod model;
pub mod price;
pub mod watch;

pub use alert::*;
pub use chain::*;
pub use enriched::*;
pub use killmail::*;
pub use match_result::*;
pub use model::*;
pub use price::*;
pub use watch::*;
