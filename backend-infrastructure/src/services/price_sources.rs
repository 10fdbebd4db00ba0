use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use backend_domain::{
    current_millis, PriceEstimate, PriceSource, StaticDataRepository, TypeAttributes,
};

// Mutated/abyssal modules live in their own SDE type-id band and are only
// priceable by the specialist appraisal service.
fn is_abyssal_type(type_id: u64) -> bool {
    (47408..=49738).contains(&type_id)
}

fn attrs_abyssal(attributes: Option<&TypeAttributes>) -> bool {
    attributes.map(|attrs| attrs.abyssal).unwrap_or(false)
}

/// Base prices from the local static-data table. Cheapest tier, tried first.
pub struct StaticPriceSource {
    static_data: Arc<dyn StaticDataRepository>,
}

impl StaticPriceSource {
    pub fn new(static_data: Arc<dyn StaticDataRepository>) -> Self {
        Self { static_data }
    }

    fn estimate(type_id: u64, base_price: f64) -> PriceEstimate {
        PriceEstimate {
            type_id,
            buy_price: base_price,
            sell_price: base_price,
            source_strategy: "static".to_string(),
            resolved_at: current_millis(),
        }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &'static str {
        "static"
    }

    fn priority(&self) -> u32 {
        10
    }

    fn supports(&self, type_id: u64, attributes: Option<&TypeAttributes>) -> bool {
        !is_abyssal_type(type_id) && !attrs_abyssal(attributes)
    }

    async fn get_price(
        &self,
        type_id: u64,
        _attributes: Option<&TypeAttributes>,
    ) -> Result<PriceEstimate> {
        let prices = self.static_data.base_prices(&[type_id]).await?;
        prices
            .get(&type_id)
            .map(|base| Self::estimate(type_id, *base))
            .ok_or_else(|| anyhow!("no base price for type {}", type_id))
    }

    async fn get_prices(&self, type_ids: &[u64]) -> Result<HashMap<u64, PriceEstimate>> {
        let prices = self.static_data.base_prices(type_ids).await?;
        Ok(prices
            .into_iter()
            .map(|(type_id, base)| (type_id, Self::estimate(type_id, base)))
            .collect())
    }
}

/// Live order aggregates from the external market API. Bulk endpoint.
pub struct MarketPriceSource {
    client: Client,
    base_url: String,
}

impl MarketPriceSource {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn parse_price(value: &Value) -> Option<f64> {
        match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }
}

#[async_trait]
impl PriceSource for MarketPriceSource {
    fn name(&self) -> &'static str {
        "market"
    }

    fn priority(&self) -> u32 {
        20
    }

    fn supports(&self, type_id: u64, attributes: Option<&TypeAttributes>) -> bool {
        !is_abyssal_type(type_id) && !attrs_abyssal(attributes)
    }

    async fn get_price(
        &self,
        type_id: u64,
        _attributes: Option<&TypeAttributes>,
    ) -> Result<PriceEstimate> {
        let mut prices = self.get_prices(&[type_id]).await?;
        prices
            .remove(&type_id)
            .ok_or_else(|| anyhow!("no market aggregate for type {}", type_id))
    }

    async fn get_prices(&self, type_ids: &[u64]) -> Result<HashMap<u64, PriceEstimate>> {
        let types = type_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/?types={}", self.base_url.trim_end_matches('/'), types);
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut out = HashMap::new();
        for type_id in type_ids {
            let Some(aggregate) = body.get(type_id.to_string()) else {
                continue;
            };
            let buy = aggregate
                .pointer("/buy/max")
                .and_then(Self::parse_price)
                .unwrap_or(0.0);
            let sell = aggregate
                .pointer("/sell/min")
                .and_then(Self::parse_price)
                .unwrap_or(0.0);
            if buy <= 0.0 && sell <= 0.0 {
                continue;
            }
            out.insert(
                *type_id,
                PriceEstimate {
                    type_id: *type_id,
                    buy_price: buy,
                    sell_price: sell,
                    source_strategy: "market".to_string(),
                    resolved_at: current_millis(),
                },
            );
        }
        Ok(out)
    }
}

/// Specialist appraisal service for mutated/abyssal items only.
pub struct AbyssalPriceSource {
    client: Client,
    base_url: String,
}

impl AbyssalPriceSource {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl PriceSource for AbyssalPriceSource {
    fn name(&self) -> &'static str {
        "abyssal"
    }

    fn priority(&self) -> u32 {
        30
    }

    fn supports(&self, type_id: u64, attributes: Option<&TypeAttributes>) -> bool {
        is_abyssal_type(type_id) || attrs_abyssal(attributes)
    }

    async fn get_price(
        &self,
        type_id: u64,
        _attributes: Option<&TypeAttributes>,
    ) -> Result<PriceEstimate> {
        let url = format!(
            "{}/type/{}/appraisal",
            self.base_url.trim_end_matches('/'),
            type_id
        );
        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let price = body
            .get("price")
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("no appraisal for type {}", type_id))?;
        Ok(PriceEstimate {
            type_id,
            buy_price: 0.0,
            sell_price: price,
            source_strategy: "abyssal".to_string(),
            resolved_at: current_millis(),
        })
    }
}

/// Operator-supplied overrides from config; the last resort in the chain.
pub struct ManualPriceSource {
    overrides: HashMap<u64, f64>,
}

impl ManualPriceSource {
    pub fn new(overrides: HashMap<u64, f64>) -> Self {
        Self { overrides }
    }
}

#[async_trait]
impl PriceSource for ManualPriceSource {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn priority(&self) -> u32 {
        40
    }

    fn supports(&self, type_id: u64, _attributes: Option<&TypeAttributes>) -> bool {
        self.overrides.contains_key(&type_id)
    }

    async fn get_price(
        &self,
        type_id: u64,
        _attributes: Option<&TypeAttributes>,
    ) -> Result<PriceEstimate> {
        let price = self
            .overrides
            .get(&type_id)
            .ok_or_else(|| anyhow!("no manual price for type {}", type_id))?;
        Ok(PriceEstimate {
            type_id,
            buy_price: *price,
            sell_price: *price,
            source_strategy: "manual".to_string(),
            resolved_at: current_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubStaticData;

    #[async_trait]
    impl StaticDataRepository for StubStaticData {
        async fn type_names(&self, _ids: &[u64]) -> Result<HashMap<u64, String>> {
            Ok(HashMap::new())
        }

        async fn system_names(&self, _ids: &[u64]) -> Result<HashMap<u64, String>> {
            Ok(HashMap::new())
        }

        async fn base_prices(&self, ids: &[u64]) -> Result<HashMap<u64, f64>> {
            Ok(ids
                .iter()
                .filter(|id| **id == 587)
                .map(|id| (*id, 1_200_000.0))
                .collect())
        }
    }

    #[tokio::test]
    async fn static_source_resolves_base_prices_in_bulk() {
        let source = StaticPriceSource::new(Arc::new(StubStaticData));
        let prices = source.get_prices(&[587, 999]).await.expect("prices");
        assert_eq!(prices.len(), 1);
        assert_eq!(prices[&587].sell_price, 1_200_000.0);
        assert!(source.get_price(999, None).await.is_err());
    }

    #[test]
    fn abyssal_band_routes_to_the_specialist_source_only() {
        let static_source = StaticPriceSource::new(Arc::new(StubStaticData));
        assert!(static_source.supports(587, None));
        assert!(!static_source.supports(48000, None));

        let abyssal = AbyssalPriceSource::new(Client::new(), String::new());
        assert!(abyssal.supports(48000, None));
        assert!(!abyssal.supports(587, None));
        assert!(abyssal.supports(587, Some(&TypeAttributes { abyssal: true })));
    }

    #[tokio::test]
    async fn manual_source_serves_only_configured_overrides() {
        let mut overrides = HashMap::new();
        overrides.insert(48000_u64, 3.2e9);
        let source = ManualPriceSource::new(overrides);
        assert!(source.supports(48000, None));
        assert!(!source.supports(587, None));
        let estimate = source.get_price(48000, None).await.expect("estimate");
        assert_eq!(estimate.sell_price, 3.2e9);
        assert_eq!(estimate.source_strategy, "manual");
    }

    #[test]
    fn market_prices_parse_numbers_and_strings() {
        assert_eq!(
            MarketPriceSource::parse_price(&serde_json::json!("5.28")),
            Some(5.28)
        );
        assert_eq!(
            MarketPriceSource::parse_price(&serde_json::json!(5.28)),
            Some(5.28)
        );
        assert_eq!(MarketPriceSource::parse_price(&serde_json::json!(null)), None);
    }
}
