//! Data points and the values they carry

use crate::error::PointError;
use crate::pair::Pair;
use bn::DecFloatPointNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Free-form point and node metadata
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Price observation for one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub pair: Pair,
    pub price: Option<DecFloatPointNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume24h: Option<DecFloatPointNumber>,
}

impl Tick {
    pub fn new(pair: Pair, price: DecFloatPointNumber) -> Self {
        Self {
            pair,
            price: Some(price),
            volume24h: None,
        }
    }

    pub fn with_volume(mut self, volume: DecFloatPointNumber) -> Self {
        self.volume24h = Some(volume);
        self
    }

    /// A tick is valid when both symbols are set, the price is strictly positive and
    /// the volume, if any, is not negative
    pub fn validate(&self) -> Result<(), PointError> {
        if !self.pair.is_valid() {
            return Err(PointError::validation(format!("tick pair '{}' is incomplete", self.pair)));
        }
        match &self.price {
            None => return Err(PointError::validation(format!("tick {} has no price", self.pair))),
            Some(price) if price.sign() <= 0 => {
                return Err(PointError::validation(format!(
                    "tick {} price must be positive, got {price}",
                    self.pair
                )))
            }
            Some(_) => {}
        }
        if let Some(volume) = &self.volume24h {
            if volume.is_negative() {
                return Err(PointError::validation(format!(
                    "tick {} volume must not be negative, got {volume}",
                    self.pair
                )));
            }
        }
        Ok(())
    }
}

/// Value carried by a point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Tick(Tick),
    Static { value: DecFloatPointNumber },
}

impl Value {
    pub fn validate(&self) -> Result<(), PointError> {
        match self {
            Value::Tick(tick) => tick.validate(),
            Value::Static { .. } => Ok(()),
        }
    }

    pub fn as_tick(&self) -> Option<&Tick> {
        match self {
            Value::Tick(tick) => Some(tick),
            Value::Static { .. } => None,
        }
    }
}

impl From<Tick> for Value {
    fn from(tick: Tick) -> Self {
        Value::Tick(tick)
    }
}

fn serialize_error<S: Serializer>(error: &Option<PointError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.message),
        None => serializer.serialize_none(),
    }
}

/// One observation, with the points it was derived from
///
/// A point carrying an `error` is not authoritative; read it through
/// [`validate`](Point::validate) or [`tick`](Point::tick).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub value: Option<Value>,
    pub time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_points: Vec<Point>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Meta,
    #[serde(serialize_with = "serialize_error", skip_serializing_if = "Option::is_none")]
    pub error: Option<PointError>,
}

impl Point {
    pub fn new(value: impl Into<Value>, time: DateTime<Utc>) -> Self {
        Self {
            value: Some(value.into()),
            time,
            sub_points: Vec::new(),
            meta: Meta::new(),
            error: None,
        }
    }

    /// Point that only reports a failure
    pub fn from_error(error: PointError) -> Self {
        Self {
            value: None,
            time: DateTime::<Utc>::default(),
            sub_points: Vec::new(),
            meta: Meta::new(),
            error: Some(error),
        }
    }

    pub fn with_sub_points(mut self, sub_points: Vec<Point>) -> Self {
        self.sub_points = sub_points;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    /// The recorded error, or a validation error for a missing or invalid value
    pub fn validate(&self) -> Result<(), PointError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match &self.value {
            None => Err(PointError::validation("point has no value")),
            Some(value) => value.validate(),
        }
    }

    /// The validated tick, or an error if the point fails or carries another value
    pub fn tick(&self) -> Result<&Tick, PointError> {
        self.validate()?;
        self.value
            .as_ref()
            .and_then(Value::as_tick)
            .ok_or_else(|| PointError::aggregation("point value is not a tick"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    fn dec(s: &str) -> DecFloatPointNumber {
        s.parse().unwrap()
    }

    fn eth_usd(price: &str) -> Tick {
        Tick::new(Pair::new("ETH", "USD"), dec(price))
    }

    #[test]
    fn test_tick_validation() {
        assert!(eth_usd("3000.5").validate().is_ok());
        assert!(eth_usd("0").validate().is_err());
        assert!(eth_usd("-1").validate().is_err());
        assert!(eth_usd("1").with_volume(dec("-5")).validate().is_err());
        assert!(eth_usd("1").with_volume(dec("0")).validate().is_ok());

        let mut no_price = eth_usd("1");
        no_price.price = None;
        assert_eq!(no_price.validate().unwrap_err().kind, ErrorKind::Validation);
    }

    #[test]
    fn test_point_errors_take_precedence() {
        let err = PointError::transient("timeout");
        let mut point = Point::new(eth_usd("1"), Utc::now());
        point.error = Some(err.clone());
        assert_eq!(point.validate(), Err(err.clone()));
        assert_eq!(point.tick(), Err(err));
    }

    #[test]
    fn test_static_value_is_not_a_tick() {
        let point = Point::new(Value::Static { value: dec("1") }, Utc::now());
        assert!(point.validate().is_ok());
        assert_eq!(point.tick().unwrap_err().kind, ErrorKind::Aggregation);
    }

    #[test]
    fn test_json_shape() {
        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let point = Point::new(eth_usd("3000.5"), time).with_meta("type", "origin");
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "value": {"type": "tick", "pair": "ETH/USD", "price": "3000.5"},
                "time": "2024-05-01T12:00:00Z",
                "meta": {"type": "origin"},
            })
        );

        let failed = serde_json::to_value(Point::from_error(PointError::configuration("no address"))).unwrap();
        assert_eq!(failed["error"], "no address");
        assert!(failed["value"].is_null());
    }
}
