use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a lookup decides that a stored value should give way to the rule default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultingPolicy {
    /// Only a missing key falls back; a present zero is kept.
    #[default]
    PresenceBased,
    /// Zero, NaN and empty text fall back as if the key were missing.
    LegacyFalsy,
}

impl DefaultingPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "presence" | "presence-based" => Some(Self::PresenceBased),
            "legacy" | "falsy" | "legacy-falsy" => Some(Self::LegacyFalsy),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DefaultingPolicy::PresenceBased => "presence",
            DefaultingPolicy::LegacyFalsy => "legacy",
        }
    }
}

/// Single attribute value as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    /// Null, boolean or structured JSON; never numeric.
    Other(serde_json::Value),
}

impl AttributeValue {
    /// Numeric reading of the value; numeric text is coerced, anything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(value) => Some(*value),
            AttributeValue::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
            AttributeValue::Other(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Other(serde_json::Value::Null))
    }

    fn is_falsy(&self) -> bool {
        match self {
            AttributeValue::Number(value) => *value == 0.0 || value.is_nan(),
            AttributeValue::Text(raw) => raw.is_empty(),
            AttributeValue::Other(value) => matches!(
                value,
                serde_json::Value::Null | serde_json::Value::Bool(false)
            ),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Read-only attribute map handed to a rule, keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<String, AttributeValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Layers `self` on top of `base`; keys present in `self` win.
    pub fn merged_over(&self, base: &Attributes) -> Attributes {
        let mut merged = base.0.clone();
        merged.extend(
            self.0
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        Attributes(merged)
    }

    /// Numeric lookup that never fails: absent, policy-falsy and non-numeric values
    /// all resolve to `default`.
    pub fn number_or(&self, key: &str, default: f64, policy: DefaultingPolicy) -> f64 {
        let Some(value) = self.0.get(key).filter(|value| !value.is_null()) else {
            return default;
        };

        if policy == DefaultingPolicy::LegacyFalsy && value.is_falsy() {
            return default;
        }

        match value.as_number() {
            Some(number) => number,
            None => {
                warn!(
                    attribute = key,
                    ?value,
                    fallback = default,
                    "non-numeric attribute ignored"
                );
                default
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Attributes(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_under_both_policies() {
        let attributes = Attributes::new();

        for policy in [DefaultingPolicy::PresenceBased, DefaultingPolicy::LegacyFalsy] {
            assert_eq!(attributes.number_or("baseRate", 0.05, policy), 0.05);
        }
    }

    #[test]
    fn presence_policy_keeps_explicit_zero() {
        let attributes = Attributes::new().with("baseRate", 0.0);

        assert_eq!(
            attributes.number_or("baseRate", 0.05, DefaultingPolicy::PresenceBased),
            0.0
        );
        assert_eq!(
            attributes.number_or("baseRate", 0.05, DefaultingPolicy::LegacyFalsy),
            0.05
        );
    }

    #[test]
    fn legacy_policy_treats_empty_text_as_missing() {
        let attributes = Attributes::new().with("targetAmount", "");

        assert_eq!(
            attributes.number_or("targetAmount", 10_000.0, DefaultingPolicy::LegacyFalsy),
            10_000.0
        );
    }

    #[test]
    fn numeric_text_is_coerced() {
        let attributes = Attributes::new().with("salesAmount", " 12000.5 ");

        assert_eq!(
            attributes.number_or("salesAmount", 0.0, DefaultingPolicy::PresenceBased),
            12_000.5
        );
    }

    #[test]
    fn garbage_text_degrades_to_default() {
        let attributes = Attributes::new()
            .with("salesAmount", "twelve thousand")
            .with("baseRate", "NaN");

        assert_eq!(
            attributes.number_or("salesAmount", 0.0, DefaultingPolicy::PresenceBased),
            0.0
        );
        assert_eq!(
            attributes.number_or("baseRate", 0.05, DefaultingPolicy::PresenceBased),
            0.05
        );
    }

    #[test]
    fn null_and_boolean_values_fall_back_to_default() {
        let attributes: Attributes = serde_json::from_str(
            r#"{"baseRate": null, "targetAmount": true, "salesAmount": {"q1": 10}}"#,
        )
        .expect("json");

        for policy in [DefaultingPolicy::PresenceBased, DefaultingPolicy::LegacyFalsy] {
            assert_eq!(attributes.number_or("baseRate", 0.05, policy), 0.05);
            assert_eq!(attributes.number_or("targetAmount", 10_000.0, policy), 10_000.0);
            assert_eq!(attributes.number_or("salesAmount", 0.0, policy), 0.0);
        }
        assert!(attributes.get("baseRate").is_some_and(AttributeValue::is_null));
    }

    #[test]
    fn request_values_override_stored_values() {
        let stored = Attributes::new()
            .with("baseRate", 0.04)
            .with("region", "north");
        let request = Attributes::new().with("baseRate", 0.06);

        let merged = request.merged_over(&stored);

        assert_eq!(merged.get("baseRate"), Some(&AttributeValue::Number(0.06)));
        assert_eq!(merged.get("region"), Some(&AttributeValue::from("north")));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn deserializes_mixed_json_values() {
        let attributes: Attributes =
            serde_json::from_str(r#"{"salesAmount": 1200, "note": "q3"}"#).expect("json");

        assert_eq!(
            attributes.get("salesAmount"),
            Some(&AttributeValue::Number(1200.0))
        );
        assert_eq!(attributes.get("note"), Some(&AttributeValue::from("q3")));
    }
}
