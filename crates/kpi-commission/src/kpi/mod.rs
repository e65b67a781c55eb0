//! KPI rule evaluation: the sales commission rule and the host pieces that feed it.

mod attributes;
pub mod batch;
pub mod commission;
pub mod processor;
mod request;
mod result;
pub mod router;

pub use attributes::{AttributeValue, Attributes, DefaultingPolicy};
pub use batch::{BatchError, CommissionBatch};
pub use commission::{CommissionBreakdown, CommissionEvaluator, CommissionInputs, TargetBonus};
pub use processor::{
    Cadence, KpiCatalog, KpiDefinition, KpiOutcome, KpiProcessor, KpiSubmission, Level,
    ProcessorError, SALES_COMMISSION_KPI,
};
pub use request::KpiRequest;
pub use result::{keys, DataEntry, KpiResult, KpiResultRecord};
pub use router::kpi_router;
