#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Flood-risk zone types and risk value parsing.
//!
//! Flood-risk polygons carry a `TYPE` code that decides which of two
//! numeric attributes holds the authoritative risk level: observed risk
//! (`FLOODRISK`) or forecast risk (`FLOODFCST`). Camera features carry the
//! derived `FLOODRISK` level after tagging.

use serde_json::{Map, Value};

/// Property holding the zone type code on risk polygons.
pub const TYPE_PROPERTY: &str = "TYPE";

/// Property holding observed risk on zones, and the derived level on cameras.
pub const FLOODRISK_PROPERTY: &str = "FLOODRISK";

/// Property holding forecast risk on zones.
pub const FLOODFCST_PROPERTY: &str = "FLOODFCST";

/// Risk level assigned to a camera that falls inside no zone.
pub const NO_RISK: i64 = 0;

/// Which risk attribute a flood-risk zone is authoritative for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskZoneKind {
    /// `TYPE` 1: observed flood risk, read from `FLOODRISK`.
    Observed = 1,
    /// `TYPE` 2: forecast flood risk, read from `FLOODFCST`.
    Forecast = 2,
}

impl RiskZoneKind {
    /// Maps a numeric `TYPE` code to a zone kind.
    ///
    /// Returns `None` for codes other than 1 and 2.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Observed),
            2 => Some(Self::Forecast),
            _ => None,
        }
    }

    /// Reads the zone kind from a `TYPE` property value.
    ///
    /// Source data encodes the code either as a string (`"1"`) or as an
    /// integer (`1`). Anything else, including `null`, is unrecognized.
    #[must_use]
    pub fn from_property(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => match s.as_str() {
                "1" => Some(Self::Observed),
                "2" => Some(Self::Forecast),
                _ => None,
            },
            Value::Number(n) => n.as_i64().and_then(Self::from_code),
            _ => None,
        }
    }

    /// The property that holds this zone's risk level.
    #[must_use]
    pub const fn value_property(self) -> &'static str {
        match self {
            Self::Observed => FLOODRISK_PROPERTY,
            Self::Forecast => FLOODFCST_PROPERTY,
        }
    }
}

/// Error returned when a risk attribute is present but not numeric.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid risk value {value}: expected an integer")]
pub struct InvalidRiskValueError {
    /// The offending value, rendered as JSON.
    pub value: String,
}

impl InvalidRiskValueError {
    fn new(value: &Value) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// Parses a risk attribute into an integer level.
///
/// `null` means "no value" and yields `Ok(None)`. Integers are taken as-is,
/// fractional numbers are truncated toward zero, and numeric strings are
/// parsed the same way.
///
/// # Errors
///
/// Returns [`InvalidRiskValueError`] for non-numeric strings, non-finite
/// numbers, booleans, arrays and objects.
pub fn parse_risk_value(value: &Value) -> Result<Option<i64>, InvalidRiskValueError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(truncate))
            .map(Some)
            .ok_or_else(|| InvalidRiskValueError::new(value)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
                .map(Some)
                .ok_or_else(|| InvalidRiskValueError::new(value))
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
            Err(InvalidRiskValueError::new(value))
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn truncate(f: f64) -> Option<i64> {
    let t = f.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64).then_some(t as i64)
}

/// Selects the authoritative risk level of a flood-risk zone.
///
/// Returns `Ok(None)` when the zone's `TYPE` is missing or unrecognized, or
/// when the selected attribute is missing or `null`.
///
/// # Errors
///
/// Returns [`InvalidRiskValueError`] if the selected attribute is present
/// but not numeric.
pub fn zone_risk(properties: &Map<String, Value>) -> Result<Option<i64>, InvalidRiskValueError> {
    let Some(kind) = properties
        .get(TYPE_PROPERTY)
        .and_then(RiskZoneKind::from_property)
    else {
        return Ok(None);
    };

    properties
        .get(kind.value_property())
        .map_or(Ok(None), parse_risk_value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: &Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn reads_string_and_integer_type_codes() {
        assert_eq!(
            RiskZoneKind::from_property(&json!("1")),
            Some(RiskZoneKind::Observed)
        );
        assert_eq!(
            RiskZoneKind::from_property(&json!(2)),
            Some(RiskZoneKind::Forecast)
        );
        assert_eq!(RiskZoneKind::from_property(&json!("99")), None);
        assert_eq!(RiskZoneKind::from_property(&json!(null)), None);
    }

    #[test]
    fn observed_zone_reads_floodrisk() {
        let p = props(&json!({ "TYPE": "1", "FLOODRISK": 4, "FLOODFCST": 9 }));
        assert_eq!(zone_risk(&p), Ok(Some(4)));
    }

    #[test]
    fn forecast_zone_reads_floodfcst() {
        let p = props(&json!({ "TYPE": "2", "FLOODRISK": 4, "FLOODFCST": 9 }));
        assert_eq!(zone_risk(&p), Ok(Some(9)));
    }

    #[test]
    fn unknown_type_has_no_risk() {
        let p = props(&json!({ "TYPE": "99", "FLOODRISK": 100 }));
        assert_eq!(zone_risk(&p), Ok(None));
    }

    #[test]
    fn null_value_has_no_risk() {
        let p = props(&json!({ "TYPE": "1", "FLOODRISK": null }));
        assert_eq!(zone_risk(&p), Ok(None));

        let p = props(&json!({ "TYPE": "2" }));
        assert_eq!(zone_risk(&p), Ok(None));
    }

    #[test]
    fn parses_numeric_strings_and_floats() {
        assert_eq!(parse_risk_value(&json!("3")), Ok(Some(3)));
        assert_eq!(parse_risk_value(&json!(" 5 ")), Ok(Some(5)));
        assert_eq!(parse_risk_value(&json!(3.9)), Ok(Some(3)));
        assert_eq!(parse_risk_value(&json!("2.0")), Ok(Some(2)));
    }

    #[test]
    fn rejects_non_numeric_values() {
        assert!(parse_risk_value(&json!("high")).is_err());
        assert!(parse_risk_value(&json!(true)).is_err());
        assert!(parse_risk_value(&json!([1])).is_err());
    }
}
