use serde::{Deserialize, Serialize};

use super::attributes::{AttributeValue, Attributes};

/// Named KPI request as handed over by the host.
///
/// `cadence` and `level` belong to the host's own enumerations; rules copy them through
/// without looking inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiRequest<C, L> {
    pub kpi_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<C>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<L>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl<C, L> KpiRequest<C, L> {
    pub fn new(kpi_name: impl Into<String>) -> Self {
        Self {
            kpi_name: kpi_name.into(),
            cadence: None,
            level: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_cadence(mut self, cadence: C) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn with_level(mut self, level: L) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key, value);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }
}
