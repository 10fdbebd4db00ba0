// Comparison operator for numeric watch conditions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Equal,
}

impl CompareOp {
    pub fn evaluate_f64(&self, value: f64, threshold: f64) -> bool {
        match self {
            CompareOp::GreaterThan => value > threshold,
            CompareOp::LessThan => value < threshold,
            CompareOp::GreaterThanOrEqual => value >= threshold,
            CompareOp::LessThanOrEqual => value <= threshold,
            CompareOp::Equal => (value - threshold).abs() < f64::EPSILON,
        }
    }

    pub fn evaluate_u64(&self, value: u64, threshold: u64) -> bool {
        match self {
            CompareOp::GreaterThan => value > threshold,
            CompareOp::LessThan => value < threshold,
            CompareOp::GreaterThanOrEqual => value >= threshold,
            CompareOp::LessThanOrEqual => value <= threshold,
            CompareOp::Equal => value == threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_compare_as_expected() {
        assert!(CompareOp::GreaterThan.evaluate_f64(500_000_000.0, 100_000_000.0));
        assert!(!CompareOp::GreaterThan.evaluate_f64(50_000_000.0, 100_000_000.0));
        assert!(CompareOp::LessThan.evaluate_u64(3, 5));
        assert!(CompareOp::GreaterThanOrEqual.evaluate_u64(5, 5));
        assert!(CompareOp::LessThanOrEqual.evaluate_f64(5.0, 5.0));
        assert!(CompareOp::Equal.evaluate_u64(7, 7));
    }
}
