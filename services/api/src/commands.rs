use crate::infra::{parse_attribute, parse_cadence, parse_level};
use clap::Args;
use kpi_commission::config::{AppConfig, KpiConfig, TelemetryConfig};
use kpi_commission::error::AppError;
use kpi_commission::kpi::{
    keys, AttributeValue, Cadence, CommissionBatch, KpiOutcome, KpiProcessor, KpiSubmission,
    Level, SALES_COMMISSION_KPI,
};
use kpi_commission::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// KPI to evaluate
    #[arg(long, default_value = SALES_COMMISSION_KPI)]
    pub(crate) kpi: String,
    /// Reporting cadence passed through to the result (e.g. MONTHLY)
    #[arg(long, value_parser = parse_cadence)]
    pub(crate) cadence: Option<Cadence>,
    /// Reporting level passed through to the result (e.g. TEAM)
    #[arg(long, value_parser = parse_level)]
    pub(crate) level: Option<Level>,
    /// Request attribute as key=value; repeat for several
    #[arg(long = "attr", value_parser = parse_attribute)]
    pub(crate) attributes: Vec<(String, AttributeValue)>,
    /// Print the result record as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// CSV export with a kpi_name column plus attribute columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// Print each result record as a JSON line
    #[arg(long)]
    pub(crate) json: bool,
}

/// Installs logging for a one-shot command and builds its processor.
fn start_command(
    telemetry_config: &TelemetryConfig,
    kpi_config: &KpiConfig,
) -> Result<KpiProcessor, AppError> {
    telemetry::init(telemetry_config)?;
    Ok(KpiProcessor::from_config(kpi_config))
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let processor = start_command(&config.telemetry, &config.kpi)?;

    let submission = submission_from_args(&args);
    let outcome = processor.process(&submission)?;

    if args.json {
        println!("{}", to_json(&outcome)?);
    } else {
        println!("{}", render_outcome(&outcome));
    }

    Ok(())
}

pub(crate) fn run_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let processor = start_command(&config.telemetry, &config.kpi)?;

    let batch = CommissionBatch::from_path(&args.csv)?;
    let outcomes = batch.process(&processor)?;

    if !args.json {
        println!(
            "Evaluated {} row(s) from {}",
            outcomes.len(),
            args.csv.display()
        );
    }
    for (index, outcome) in outcomes.iter().enumerate() {
        if args.json {
            println!("{}", to_json(outcome)?);
        } else {
            println!("- row {}: {}", index + 1, render_outcome(outcome));
        }
    }

    Ok(())
}

fn submission_from_args(args: &EvaluateArgs) -> KpiSubmission {
    let mut submission = KpiSubmission::new(args.kpi.clone());
    submission.cadence = args.cadence;
    submission.level = args.level;
    for (key, value) in &args.attributes {
        submission.attributes.insert(key.clone(), value.clone());
    }
    submission
}

fn to_json(outcome: &KpiOutcome) -> Result<String, AppError> {
    Ok(serde_json::to_string(outcome)?)
}

fn render_outcome(outcome: &KpiOutcome) -> String {
    let scope = match (outcome.cadence, outcome.level) {
        (Some(cadence), Some(level)) => format!(" [{} / {}]", cadence.label(), level.label()),
        (Some(cadence), None) => format!(" [{}]", cadence.label()),
        (None, Some(level)) => format!(" [{}]", level.label()),
        (None, None) => String::new(),
    };

    let amount = |key: &str| {
        outcome
            .number(key)
            .map(|value| format!("{value:.2}"))
            .unwrap_or_else(|| "n/a".to_string())
    };

    format!(
        "{}{}: sales {} vs target {}, commission {} ({})",
        outcome.kpi_name,
        scope,
        amount(keys::SALES_AMOUNT),
        amount(keys::TARGET_AMOUNT),
        amount(keys::COMMISSION_EARNED),
        outcome.text(keys::NOTE).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(attributes: &[&str]) -> EvaluateArgs {
        EvaluateArgs {
            kpi: SALES_COMMISSION_KPI.to_string(),
            cadence: Some(Cadence::Monthly),
            level: None,
            attributes: attributes
                .iter()
                .map(|raw| parse_attribute(raw).expect("valid attribute"))
                .collect(),
            json: false,
        }
    }

    #[test]
    fn renders_bonus_outcome_on_one_line() {
        let processor = KpiProcessor::from_config(&KpiConfig::default());
        let submission = submission_from_args(&args(&[
            "salesAmount=12000",
            "targetAmount=10000",
            "baseRate=0.05",
        ]));

        let outcome = processor.process(&submission).expect("known kpi");
        let line = render_outcome(&outcome);

        assert!(line.starts_with("SalesCommission [MONTHLY]: sales 12000.00 vs target 10000.00"));
        assert!(line.contains("commission 640.00"));
        assert!(line.contains("Target Exceeded!"));
    }

    #[test]
    fn commands_install_logging_before_processing() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let telemetry_config = TelemetryConfig {
            log_level: "kpi_commission=verbose".to_string(),
        };

        let err = start_command(&telemetry_config, &KpiConfig::default())
            .expect_err("malformed filter");

        assert!(matches!(err, AppError::Telemetry(_)));
    }

    #[test]
    fn json_output_carries_the_result_record() {
        let processor = KpiProcessor::from_config(&KpiConfig::default());
        let submission = submission_from_args(&args(&["salesAmount=2500"]));
        let outcome = processor.process(&submission).expect("known kpi");

        let line = to_json(&outcome).expect("serializable outcome");
        let payload: serde_json::Value = serde_json::from_str(&line).expect("json line");

        assert_eq!(payload["cadence"], serde_json::json!("MONTHLY"));
        assert_eq!(payload["data"][0]["rate_applied"], serde_json::json!(0.04));
    }

    #[test]
    fn later_attribute_flags_win() {
        let submission = submission_from_args(&args(&["baseRate=0.03", "baseRate=0.06"]));

        assert_eq!(
            submission.attributes.get("baseRate"),
            Some(&AttributeValue::Number(0.06))
        );
    }
}
