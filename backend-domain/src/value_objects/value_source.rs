// Value source value object

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Static,
    Market,
    Abyssal,
    Manual,
    Precomputed,
    #[default]
    Unknown,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::Static => "static",
            ValueSource::Market => "market",
            ValueSource::Abyssal => "abyssal",
            ValueSource::Manual => "manual",
            ValueSource::Precomputed => "precomputed",
            ValueSource::Unknown => "unknown",
        }
    }
}

impl From<&str> for ValueSource {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "static" => ValueSource::Static,
            "market" => ValueSource::Market,
            "abyssal" => ValueSource::Abyssal,
            "manual" => ValueSource::Manual,
            "precomputed" => ValueSource::Precomputed,
            _ => ValueSource::Unknown,
        }
    }
}
