//! Sales commission rule: a base rate on all sales plus a flat bonus on sales above target.

use std::fmt;

use chrono::{DateTime, Local, TimeZone};
use serde_json::{json, Map};
use tracing::debug;

use super::attributes::{Attributes, DefaultingPolicy};
use super::request::KpiRequest;
use super::result::{keys, DataEntry, KpiResultRecord};

pub const SALES_AMOUNT_ATTR: &str = "salesAmount";
pub const TARGET_AMOUNT_ATTR: &str = "targetAmount";
pub const BASE_RATE_ATTR: &str = "baseRate";

pub const DEFAULT_SALES_AMOUNT: f64 = 0.0;
pub const DEFAULT_TARGET_AMOUNT: f64 = 10_000.0;
pub const DEFAULT_BASE_RATE: f64 = 0.05;

/// Extra rate paid on the portion of sales above target.
pub const BONUS_RATE: f64 = 0.02;

/// Resolved numeric inputs after defaulting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommissionInputs {
    pub sales: f64,
    pub target: f64,
    pub rate: f64,
}

impl CommissionInputs {
    pub fn from_attributes(attributes: &Attributes, policy: DefaultingPolicy) -> Self {
        Self {
            sales: attributes.number_or(SALES_AMOUNT_ATTR, DEFAULT_SALES_AMOUNT, policy),
            target: attributes.number_or(TARGET_AMOUNT_ATTR, DEFAULT_TARGET_AMOUNT, policy),
            rate: attributes.number_or(BASE_RATE_ATTR, DEFAULT_BASE_RATE, policy),
        }
    }
}

/// Bonus earned when sales strictly exceed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBonus {
    pub excess: f64,
    pub amount: f64,
}

/// Full computation trail for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionBreakdown {
    pub inputs: CommissionInputs,
    pub standard: f64,
    pub bonus: Option<TargetBonus>,
    pub commission: f64,
    pub note: String,
}

pub fn compute(inputs: CommissionInputs) -> CommissionBreakdown {
    let CommissionInputs {
        sales,
        target,
        rate,
    } = inputs;

    let standard = sales * rate;
    let mut commission = standard;
    let mut note = format!("Standard Rate ({}%) applied.", fixed(rate * 100.0, 1));

    let bonus = if sales > target {
        let excess = sales - target;
        let amount = excess * BONUS_RATE;
        commission += amount;
        note.push_str(&format!(
            " Target Exceeded! 2% Bonus applied on excess {}",
            fixed(excess, 2)
        ));
        Some(TargetBonus { excess, amount })
    } else {
        None
    };

    CommissionBreakdown {
        inputs,
        standard,
        bonus,
        commission,
        note,
    }
}

impl CommissionBreakdown {
    pub fn into_entry(self, calculated_at: String) -> DataEntry {
        let mut entry = Map::new();
        entry.insert(keys::SALES_AMOUNT.to_string(), json!(self.inputs.sales));
        entry.insert(keys::TARGET_AMOUNT.to_string(), json!(self.inputs.target));
        entry.insert(keys::COMMISSION_EARNED.to_string(), json!(self.commission));
        entry.insert(keys::RATE_APPLIED.to_string(), json!(self.inputs.rate));
        entry.insert(keys::NOTE.to_string(), json!(self.note));
        entry.insert(keys::CALCULATED_AT.to_string(), json!(calculated_at));
        entry
    }
}

/// Display rounding, half away from zero at `decimals` places.
fn fixed(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return format!("{value:.decimals$}");
    }
    let rounded = scaled.round() / factor;
    format!("{rounded:.decimals$}")
}

/// Stateless evaluator for the sales commission KPI.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommissionEvaluator {
    policy: DefaultingPolicy,
}

impl CommissionEvaluator {
    pub fn new(policy: DefaultingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DefaultingPolicy {
        self.policy
    }

    /// Evaluate `request`, stamping the result with the current local time.
    pub fn evaluate<C, L, R, F>(&self, request: &KpiRequest<C, L>, result_factory: F) -> R
    where
        C: Clone,
        L: Clone,
        R: KpiResultRecord<C, L>,
        F: FnOnce() -> R,
    {
        self.evaluate_at(request, result_factory, Local::now())
    }

    pub fn evaluate_at<C, L, R, F, Tz>(
        &self,
        request: &KpiRequest<C, L>,
        result_factory: F,
        now: DateTime<Tz>,
    ) -> R
    where
        C: Clone,
        L: Clone,
        R: KpiResultRecord<C, L>,
        F: FnOnce() -> R,
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        let mut result = result_factory();
        result.set_kpi_name(request.kpi_name.clone());
        if let Some(cadence) = &request.cadence {
            result.set_cadence(cadence.clone());
        }
        if let Some(level) = &request.level {
            result.set_level(level.clone());
        }

        let inputs = CommissionInputs::from_attributes(&request.attributes, self.policy);
        let breakdown = compute(inputs);

        debug!(
            kpi = %request.kpi_name,
            sales = inputs.sales,
            target = inputs.target,
            rate = inputs.rate,
            commission = breakdown.commission,
            bonus = breakdown.bonus.map(|bonus| bonus.amount),
            "commission evaluated"
        );

        result.set_data(vec![breakdown.into_entry(now.to_rfc3339())]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(sales: f64, target: f64, rate: f64) -> CommissionInputs {
        CommissionInputs {
            sales,
            target,
            rate,
        }
    }

    #[test]
    fn below_target_pays_standard_rate_only() {
        let breakdown = compute(inputs(8_000.0, 10_000.0, 0.05));

        assert_eq!(breakdown.commission, 8_000.0 * 0.05);
        assert!(breakdown.bonus.is_none());
        assert_eq!(breakdown.note, "Standard Rate (5.0%) applied.");
    }

    #[test]
    fn above_target_adds_bonus_on_excess() {
        let breakdown = compute(inputs(12_000.0, 10_000.0, 0.05));

        let bonus = breakdown.bonus.expect("bonus applied");
        assert_eq!(bonus.excess, 2_000.0);
        assert!((bonus.amount - 40.0).abs() < 1e-9);
        assert!((breakdown.standard - 600.0).abs() < 1e-9);
        assert!((breakdown.commission - 640.0).abs() < 1e-9);
        assert_eq!(
            breakdown.note,
            "Standard Rate (5.0%) applied. Target Exceeded! 2% Bonus applied on excess 2000.00"
        );
    }

    #[test]
    fn meeting_target_exactly_earns_no_bonus() {
        let breakdown = compute(inputs(10_000.0, 10_000.0, 0.05));

        assert!(breakdown.bonus.is_none());
        assert_eq!(breakdown.commission, 10_000.0 * 0.05);
        assert!(!breakdown.note.contains("Target Exceeded"));
    }

    #[test]
    fn note_rounds_rate_and_excess_for_display() {
        let breakdown = compute(inputs(10_000.125, 10_000.0, 0.0425));

        assert!(breakdown.note.starts_with("Standard Rate (4.3%) applied."));
        assert!(breakdown.note.ends_with("excess 0.13"));
        assert_eq!(breakdown.inputs.rate, 0.0425);
    }

    #[test]
    fn fixed_pads_and_rounds() {
        assert_eq!(fixed(5.000000000000001, 1), "5.0");
        assert_eq!(fixed(2_000.0, 2), "2000.00");
        assert_eq!(fixed(0.25, 1), "0.3");
        assert_eq!(fixed(12.345, 0), "12");
    }

    #[test]
    fn huge_excess_keeps_a_finite_note() {
        assert_eq!(fixed(1e307, 2), format!("{:.2}", 1e307));

        let breakdown = compute(inputs(1e307, 0.0, 0.05));
        assert!(breakdown.note.contains("Target Exceeded!"));
        assert!(!breakdown.note.contains("inf"));
    }
}
