use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of rule output, keyed by field name.
pub type DataEntry = Map<String, Value>;

/// Field names written into a commission data entry.
pub mod keys {
    pub const SALES_AMOUNT: &str = "sales_amount";
    pub const TARGET_AMOUNT: &str = "target_amount";
    pub const COMMISSION_EARNED: &str = "commission_earned";
    pub const RATE_APPLIED: &str = "rate_applied";
    pub const NOTE: &str = "note";
    pub const CALCULATED_AT: &str = "calculated_at";
}

/// Result shape the host expects back from a rule.
///
/// Hosts bring their own record type and hand the rule a factory for it, so a rule never
/// names a concrete result struct.
pub trait KpiResultRecord<C, L> {
    fn set_kpi_name(&mut self, kpi_name: String);
    fn set_cadence(&mut self, cadence: C);
    fn set_level(&mut self, level: L);
    fn set_data(&mut self, data: Vec<DataEntry>);
}

/// Stock result record used by the bundled processor and HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult<C, L> {
    pub kpi_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<C>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<L>,
    #[serde(default)]
    pub data: Vec<DataEntry>,
}

impl<C, L> Default for KpiResult<C, L> {
    fn default() -> Self {
        Self {
            kpi_name: String::new(),
            cadence: None,
            level: None,
            data: Vec::new(),
        }
    }
}

impl<C, L> KpiResult<C, L> {
    /// First data entry, which is the only one for the commission rule.
    pub fn entry(&self) -> Option<&DataEntry> {
        self.data.first()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.entry()?.get(key)?.as_f64()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.entry()?.get(key)?.as_str()
    }
}

impl<C, L> KpiResultRecord<C, L> for KpiResult<C, L> {
    fn set_kpi_name(&mut self, kpi_name: String) {
        self.kpi_name = kpi_name;
    }

    fn set_cadence(&mut self, cadence: C) {
        self.cadence = Some(cadence);
    }

    fn set_level(&mut self, level: L) {
        self.level = Some(level);
    }

    fn set_data(&mut self, data: Vec<DataEntry>) {
        self.data = data;
    }
}
