//! Wire decoding for analysis service responses
//!
//! The service answers with one of two JSON shapes:
//!
//! ```text
//! { "summary": {...}, "monthly_production": [...], "power_curve": [...], "turbine_performance": [...] }
//! { "error": "unsupported file format" }
//! ```
//!
//! Field names are snake_case on the wire. Everything except the `summary`
//! object is optional; missing or `null` series decode as empty.

use crate::error::{ErrorDetail, TransportError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Named scalar metrics. Absent means "not applicable".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub gross_aep: Option<f64>,
    #[serde(default)]
    pub net_aep: Option<f64>,
    /// Ratio in [0, 1].
    #[serde(default)]
    pub availability: Option<f64>,
    /// Ratio in [0, 1].
    #[serde(default)]
    pub wake_loss: Option<f64>,
    #[serde(default)]
    pub capacity_factor: Option<f64>,
    #[serde(default)]
    pub electrical_loss: Option<f64>,
    #[serde(default)]
    pub eya_gap: Option<f64>,
    /// Degrees.
    #[serde(default)]
    pub yaw_misalignment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyEnergy {
    pub month: String,
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurvePoint {
    pub wind_speed: f64,
    pub power: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineEnergy {
    #[serde(alias = "id", alias = "turbine")]
    pub turbine_id: String,
    pub energy: f64,
}

/// A successful analysis, as decoded from the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: Summary,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub monthly_production: Vec<MonthlyEnergy>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub power_curve: Vec<PowerCurvePoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub turbine_performance: Vec<TurbineEnergy>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Classify a raw response.
///
/// Order matters: an `error` marker wins over the status code, and the
/// status code wins over a result-shaped body.
pub fn decode(raw: &RawResponse) -> Result<AnalysisResult, ErrorDetail> {
    let value: Value = serde_json::from_slice(&raw.body)
        .map_err(|e| ErrorDetail::transport(TransportError::Body(e.to_string())))?;

    let Value::Object(map) = &value else {
        return Err(ErrorDetail::transport(TransportError::Shape(format!(
            "expected a JSON object, got {}",
            kind_of(&value)
        ))));
    };

    match map.get("error") {
        Some(Value::String(reason)) => return Err(ErrorDetail::application(reason.clone())),
        None | Some(Value::Null) => {}
        Some(other) => {
            return Err(ErrorDetail::transport(TransportError::Shape(format!(
                "`error` must be a string, got {}",
                kind_of(other)
            ))))
        }
    }

    if !raw.is_success() {
        return Err(ErrorDetail::transport(TransportError::Status(raw.status)));
    }

    if !matches!(map.get("summary"), Some(Value::Object(_))) {
        return Err(ErrorDetail::transport(TransportError::Shape(
            "missing `summary` object".to_string(),
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| ErrorDetail::transport(TransportError::Shape(e.to_string())))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
