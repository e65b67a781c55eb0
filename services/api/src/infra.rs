use kpi_commission::kpi::{AttributeValue, Cadence, Level};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_cadence(raw: &str) -> Result<Cadence, String> {
    Cadence::parse(raw).ok_or_else(|| {
        format!("unknown cadence '{raw}' (expected DAILY, WEEKLY, MONTHLY, QUARTERLY or YEARLY)")
    })
}

pub(crate) fn parse_level(raw: &str) -> Result<Level, String> {
    Level::parse(raw).ok_or_else(|| {
        format!("unknown level '{raw}' (expected INDIVIDUAL, TEAM, REGION or COMPANY)")
    })
}

/// Parses `key=value`; values that read as finite numbers become numeric attributes.
pub(crate) fn parse_attribute(raw: &str) -> Result<(String, AttributeValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("attribute '{raw}' must look like key=value"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("attribute '{raw}' is missing a key"));
    }

    let value = value.trim();
    let value = match value.parse::<f64>() {
        Ok(number) if number.is_finite() => AttributeValue::Number(number),
        _ => AttributeValue::Text(value.to_string()),
    };

    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_attributes_parse_as_numbers() {
        let (key, value) = parse_attribute("salesAmount=12000").expect("valid attribute");
        assert_eq!(key, "salesAmount");
        assert_eq!(value, AttributeValue::Number(12_000.0));
    }

    #[test]
    fn other_attributes_stay_text() {
        let (_, value) = parse_attribute("region = north ").expect("valid attribute");
        assert_eq!(value, AttributeValue::Text("north".to_string()));
    }

    #[test]
    fn malformed_attributes_are_rejected() {
        assert!(parse_attribute("salesAmount").is_err());
        assert!(parse_attribute("=12").is_err());
    }

    #[test]
    fn enum_tokens_report_choices() {
        assert_eq!(parse_cadence("monthly"), Ok(Cadence::Monthly));
        let err = parse_level("division").expect_err("unknown level");
        assert!(err.contains("TEAM"));
    }
}
