//! Run parameters with numbers normalized to a single decimal type.
//!
//! Hosts hand over numbers in whatever representation they use internally.
//! Every number is converted to [`Decimal`] the moment it enters a
//! [`Parameters`] map, so nothing downstream mixes integer, float and
//! decimal arithmetic.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::ser::{Serialize, Serializer};
use serde_json::{Number, Value};

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Bool(bool),
    Decimal(Decimal),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ParamValue::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(value) => Some(value),
            _ => None,
        }
    }

    fn from_json(key: &str, value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(ParamValue::Bool(b)),
            Value::Number(n) => decimal_from_number(&n)
                .map(ParamValue::Decimal)
                .with_context(|| format!("parameter {key}")),
            Value::String(s) => Ok(ParamValue::Text(s)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| ParamValue::from_json(key, item))
                .collect::<Result<Vec<_>>>()
                .map(ParamValue::List),
            Value::Null => bail!("parameter {key} is null"),
            Value::Object(_) => bail!("parameter {key} is a nested object"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Decimal> for ParamValue {
    fn from(value: Decimal) -> Self {
        ParamValue::Decimal(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Decimal(Decimal::from(value))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Decimal(d) => {
                // Integral values stay integers so R sees 3, not 3.0.
                if d.fract().is_zero()
                    && let Some(int) = d.to_i64()
                {
                    return serializer.serialize_i64(int);
                }
                match d.to_f64() {
                    Some(float) => serializer.serialize_f64(float),
                    None => Err(serde::ser::Error::custom(format!(
                        "decimal {d} has no float representation"
                    ))),
                }
            }
            ParamValue::Text(s) => serializer.serialize_str(s),
            ParamValue::List(items) => serializer.collect_seq(items),
        }
    }
}

/// Parse the textual form of a JSON number into a decimal.
///
/// Goes through the shortest decimal text of the number, so a float like
/// `0.1` becomes exactly `0.1` rather than its binary approximation.
fn decimal_from_number(number: &Number) -> Result<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|err| anyhow!("number {text} does not fit a decimal: {err}"))
}

/// Ordered mapping of parameter name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from a JSON object, normalizing every number.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            bail!("parameters must be a JSON object");
        };
        let mut params = Self::new();
        for (key, value) in map {
            let converted = ParamValue::from_json(&key, value)?;
            params.0.insert(key, converted);
        }
        Ok(params)
    }

    /// Read parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let value: Value =
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
        Self::from_json(value).with_context(|| format!("load parameters {}", path.display()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Parameters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_become_decimals() {
        let params = Parameters::from_json(json!({
            "count": 3,
            "rate": 0.1,
            "big": 12345678901234_i64,
            "negative": -2.5,
        }))
        .expect("params");

        assert_eq!(params.get("count").and_then(ParamValue::as_decimal), Some(Decimal::from(3)));
        assert_eq!(
            params.get("rate").and_then(ParamValue::as_decimal),
            Some(Decimal::from_str("0.1").expect("decimal"))
        );
        assert_eq!(
            params.get("big").and_then(ParamValue::as_decimal),
            Some(Decimal::from(12345678901234_i64))
        );
        assert_eq!(
            params.get("negative").and_then(ParamValue::as_decimal),
            Some(Decimal::from_str("-2.5").expect("decimal"))
        );
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        let params = Parameters::from_json(json!({"a": 0.1, "b": 0.2})).expect("params");
        let a = params.get("a").and_then(ParamValue::as_decimal).expect("a");
        let b = params.get("b").and_then(ParamValue::as_decimal).expect("b");
        assert_eq!(a + b, Decimal::from_str("0.3").expect("decimal"));
        assert_eq!(a * Decimal::from(3), Decimal::from_str("0.3").expect("decimal"));
    }

    #[test]
    fn scientific_notation_is_accepted() {
        let params = Parameters::from_json(json!({"tiny": 1e-5})).expect("params");
        assert_eq!(
            params.get("tiny").and_then(ParamValue::as_decimal),
            Some(Decimal::from_str("0.00001").expect("decimal"))
        );
    }

    #[test]
    fn lists_convert_each_element() {
        let params = Parameters::from_json(json!({"weights": [1, 0.5, "x", true]})).expect("params");
        assert_eq!(
            params.get("weights"),
            Some(&ParamValue::List(vec![
                ParamValue::Decimal(Decimal::from(1)),
                ParamValue::Decimal(Decimal::from_str("0.5").expect("decimal")),
                ParamValue::Text("x".to_string()),
                ParamValue::Bool(true),
            ]))
        );
    }

    #[test]
    fn rejects_null_and_nested_objects() {
        let err = Parameters::from_json(json!({"missing": null})).unwrap_err();
        assert!(err.to_string().contains("missing"));
        let err = Parameters::from_json(json!({"nested": {"a": 1}})).unwrap_err();
        assert!(err.to_string().contains("nested"));
        assert!(Parameters::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn serializes_decimals_as_json_numbers() {
        let mut params = Parameters::new();
        params.insert("count", 4_i64);
        params.insert("rate", Decimal::from_str("0.25").expect("decimal"));
        params.insert("name", "baseline");
        params.insert("enabled", false);

        let value = serde_json::to_value(&params).expect("serialize");
        assert_eq!(
            value,
            json!({"count": 4, "rate": 0.25, "name": "baseline", "enabled": false})
        );
    }

    #[test]
    fn load_reads_json_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("params.json");
        fs::write(&path, r#"{"alpha": 2, "label": "a"}"#).expect("write");

        let params = Parameters::load(&path).expect("load");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("label").and_then(ParamValue::as_str), Some("a"));
    }
}
