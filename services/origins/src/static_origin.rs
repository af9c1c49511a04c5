//! Constant prices from configuration

use crate::context::FetchContext;
use crate::error::{OriginError, Result};
use crate::origin::Origin;
use async_trait::async_trait;
use bn::DecFloatPointNumber;
use chrono::Utc;
use node_config::StaticConfig;
use std::collections::HashMap;
use types::{Pair, Point, PointError, Tick};

/// Serves pegs and other fixed prices; the inverse of a configured pair is derived
#[derive(Debug, Clone)]
pub struct StaticOrigin {
    name: String,
    prices: HashMap<Pair, DecFloatPointNumber>,
}

impl StaticOrigin {
    pub fn new(name: impl Into<String>, config: &StaticConfig) -> Result<Self> {
        let name = name.into();
        let mut prices = HashMap::with_capacity(config.prices.len());
        for entry in &config.prices {
            if entry.price.is_zero() || entry.price.is_negative() {
                return Err(OriginError::Configuration(format!(
                    "{name}: price of {} must be positive",
                    entry.pair
                )));
            }
            prices.insert(entry.pair.clone(), entry.price.clone());
        }
        Ok(Self { name, prices })
    }

    fn price(&self, pair: &Pair) -> std::result::Result<DecFloatPointNumber, PointError> {
        if let Some(price) = self.prices.get(pair) {
            return Ok(price.clone());
        }
        match self.prices.get(&pair.invert()) {
            Some(price) => Ok(price.inv()?),
            None => Err(PointError::configuration(format!("no static price configured for {pair}"))),
        }
    }
}

#[async_trait]
impl Origin for StaticOrigin {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_data_points(&self, ctx: &FetchContext, pairs: &[Pair]) -> Result<HashMap<Pair, Point>> {
        if ctx.is_cancelled() {
            return Err(OriginError::Cancelled);
        }
        let now = Utc::now();
        Ok(pairs
            .iter()
            .map(|pair| {
                let point = match self.price(pair) {
                    Ok(price) => Point::new(Tick::new(pair.clone(), price), now).with_meta("origin", self.name.as_str()),
                    Err(err) => Point::from_error(err.context(format!("{} {pair}", self.name))),
                };
                (pair.clone(), point)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_config::StaticPrice;
    use types::ErrorKind;

    fn origin() -> StaticOrigin {
        let config = StaticConfig {
            prices: vec![StaticPrice {
                pair: Pair::new("USDC", "USD"),
                price: "1".parse().unwrap(),
            }],
        };
        StaticOrigin::new("pegs", &config).unwrap()
    }

    #[tokio::test]
    async fn test_configured_and_inverse_pairs() {
        let usdc = Pair::new("USDC", "USD");
        let usd = Pair::new("USD", "USDC");
        let points = origin()
            .fetch_data_points(&FetchContext::background(), &[usdc.clone(), usd.clone()])
            .await
            .unwrap();
        assert_eq!(points[&usdc].tick().unwrap().price, Some("1".parse().unwrap()));
        assert_eq!(points[&usd].tick().unwrap().price, Some("1".parse().unwrap()));
        assert_eq!(points[&usdc].meta["origin"], "pegs");
    }

    #[tokio::test]
    async fn test_unknown_pair_is_configuration_error() {
        let pair = Pair::new("DAI", "USD");
        let points = origin()
            .fetch_data_points(&FetchContext::background(), &[pair.clone()])
            .await
            .unwrap();
        let error = points[&pair].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Configuration);
        assert_eq!(error.message, "pegs DAI/USD: no static price configured for DAI/USD");
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let config = StaticConfig {
            prices: vec![StaticPrice {
                pair: Pair::new("USDC", "USD"),
                price: "0".parse().unwrap(),
            }],
        };
        assert!(matches!(
            StaticOrigin::new("pegs", &config),
            Err(OriginError::Configuration(_))
        ));
    }
}
