// Domain services
// Pure evaluation logic, no I/O

pub mod alerts;
pub mod matcher;
pub mod valuation;

pub use alerts::*;
pub use matcher::*;
pub use valuation::*;
