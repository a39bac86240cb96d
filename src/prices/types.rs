use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::add_hours;
use crate::error::Result;

/// Data resolution; only hourly points are supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1h")]
    OneHour,
}

/// One hourly price as delivered by the price service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPricePoint {
    #[serde(rename = "date")]
    pub instant: DateTime<Utc>,
    pub price: f64,
    pub resolution: Resolution,
    #[serde(
        default,
        deserialize_with = "truthy",
        skip_serializing_if = "Option::is_none"
    )]
    pub forecast: Option<bool>,
}

impl RawPricePoint {
    pub fn is_forecast(&self) -> bool {
        self.forecast.unwrap_or(false)
    }
}

// `forecast` is loosely typed upstream; coerce it the way a truthiness check would
fn truthy<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(b),
        Some(Value::Number(n)) => Some(n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan())),
        Some(Value::String(s)) => Some(!s.is_empty()),
        Some(Value::Array(_) | Value::Object(_)) => Some(true),
    })
}

/// Display-ready record derived from a raw point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPoint {
    pub instant: DateTime<Utc>,
    pub label: String,
    pub price: f64,
    pub is_forecast: bool,
    pub is_current_hour: bool,
}

/// Half-open `[from, to)` request window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl FetchRange {
    /// Window starting at `from` spanning `hours` whole hours
    pub fn starting_at(from: DateTime<Utc>, hours: u32) -> Result<Self> {
        Ok(Self {
            from,
            to: add_hours(from, i64::from(hours))?,
        })
    }

    pub fn span(&self) -> TimeDelta {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}
