use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::attributes::Attributes;
use super::commission::{CommissionEvaluator, BASE_RATE_ATTR};
use super::request::KpiRequest;
use super::result::KpiResult;
use crate::config::KpiConfig;

pub const SALES_COMMISSION_KPI: &str = "SalesCommission";

/// Reporting period attached to a KPI request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cadence {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Cadence {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Cadence::Daily => "DAILY",
            Cadence::Weekly => "WEEKLY",
            Cadence::Monthly => "MONTHLY",
            Cadence::Quarterly => "QUARTERLY",
            Cadence::Yearly => "YEARLY",
        }
    }
}

/// Organizational scope a KPI is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    Individual,
    Team,
    Region,
    Company,
}

impl Level {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INDIVIDUAL" => Some(Self::Individual),
            "TEAM" => Some(Self::Team),
            "REGION" => Some(Self::Region),
            "COMPANY" => Some(Self::Company),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Level::Individual => "INDIVIDUAL",
            Level::Team => "TEAM",
            Level::Region => "REGION",
            Level::Company => "COMPANY",
        }
    }
}

pub type KpiSubmission = KpiRequest<Cadence, Level>;
pub type KpiOutcome = KpiResult<Cadence, Level>;

/// Stored KPI registration with its extended attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiDefinition {
    pub name: String,
    pub description: String,
    pub extended_attributes: Attributes,
}

/// Registry of KPIs the processor will accept.
#[derive(Debug, Clone, Default)]
pub struct KpiCatalog {
    definitions: BTreeMap<String, KpiDefinition>,
}

impl KpiCatalog {
    pub fn standard(config: &KpiConfig) -> Self {
        let mut catalog = Self::default();
        catalog.register(KpiDefinition {
            name: SALES_COMMISSION_KPI.to_string(),
            description: "Base-rate commission with a 2% bonus on sales above target".to_string(),
            extended_attributes: Attributes::new().with(BASE_RATE_ATTR, config.stored_base_rate),
        });
        catalog
    }

    pub fn register(&mut self, definition: KpiDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&KpiDefinition> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &KpiDefinition> {
        self.definitions.values()
    }
}

/// Host side of the rule: resolves the KPI, layers request attributes over stored ones,
/// and runs the evaluator with the stock result record.
#[derive(Debug, Clone)]
pub struct KpiProcessor {
    catalog: KpiCatalog,
    evaluator: CommissionEvaluator,
}

impl KpiProcessor {
    pub fn new(catalog: KpiCatalog, evaluator: CommissionEvaluator) -> Self {
        Self { catalog, evaluator }
    }

    pub fn from_config(config: &KpiConfig) -> Self {
        Self::new(
            KpiCatalog::standard(config),
            CommissionEvaluator::new(config.defaulting),
        )
    }

    pub fn catalog(&self) -> &KpiCatalog {
        &self.catalog
    }

    pub fn process(&self, submission: &KpiSubmission) -> Result<KpiOutcome, ProcessorError> {
        self.process_at(submission, Local::now())
    }

    pub fn process_at(
        &self,
        submission: &KpiSubmission,
        now: DateTime<Local>,
    ) -> Result<KpiOutcome, ProcessorError> {
        let definition = self
            .catalog
            .get(&submission.kpi_name)
            .ok_or_else(|| ProcessorError::UnknownKpi(submission.kpi_name.clone()))?;

        let request = KpiRequest {
            kpi_name: submission.kpi_name.clone(),
            cadence: submission.cadence,
            level: submission.level,
            attributes: submission
                .attributes
                .merged_over(&definition.extended_attributes),
        };

        let outcome = self.evaluator.evaluate_at(&request, KpiOutcome::default, now);

        info!(
            kpi = %outcome.kpi_name,
            cadence = submission.cadence.map(|cadence| cadence.label()),
            level = submission.level.map(|level| level.label()),
            policy = self.evaluator.policy().label(),
            "kpi request processed"
        );

        Ok(outcome)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("unknown KPI '{0}'")]
    UnknownKpi(String),
}
