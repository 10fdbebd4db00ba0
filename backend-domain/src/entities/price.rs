// Price estimate entity

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceEstimate {
    pub type_id: u64,
    pub buy_price: f64,
    pub sell_price: f64,
    /// Name of the strategy that produced this estimate.
    pub source_strategy: String,
    pub resolved_at: i64,
}

impl PriceEstimate {
    /// Unit value used by the valuation math: sell side, buy as fallback.
    pub fn unit_value(&self) -> f64 {
        if self.sell_price > 0.0 {
            self.sell_price
        } else {
            self.buy_price
        }
    }
}

/// Optional per-type hints handed to price sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeAttributes {
    pub abyssal: bool,
}
