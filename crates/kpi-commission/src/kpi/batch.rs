use std::io::Read;
use std::path::Path;

use tracing::info;

use super::attributes::AttributeValue;
use super::processor::{Cadence, KpiOutcome, KpiProcessor, KpiSubmission, Level, ProcessorError};

const KPI_NAME_COLUMN: &str = "kpi_name";
const CADENCE_COLUMN: &str = "cadence";
const LEVEL_COLUMN: &str = "level";

/// KPI submissions loaded from a CSV export, one per row.
///
/// `kpi_name` is required; `cadence` and `level` are optional; every other column is an
/// attribute. Blank cells are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct CommissionBatch {
    submissions: Vec<KpiSubmission>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read batch file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid batch CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("batch CSV is missing the '{0}' column")]
    MissingColumn(&'static str),
    #[error("row {row}: unrecognized {field} '{value}'")]
    UnknownToken {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("row {row}: {source}")]
    Processor {
        row: usize,
        #[source]
        source: ProcessorError,
    },
}

impl CommissionBatch {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, BatchError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, BatchError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if !headers.iter().any(|header| header == KPI_NAME_COLUMN) {
            return Err(BatchError::MissingColumn(KPI_NAME_COLUMN));
        }

        let mut submissions = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            let row = index + 1;
            let mut submission = KpiSubmission::new(String::new());

            for (header, cell) in headers.iter().zip(record.iter()) {
                if cell.is_empty() {
                    continue;
                }
                match header {
                    KPI_NAME_COLUMN => submission.kpi_name = cell.to_string(),
                    CADENCE_COLUMN => {
                        let cadence = Cadence::parse(cell).ok_or_else(|| BatchError::UnknownToken {
                            row,
                            field: CADENCE_COLUMN,
                            value: cell.to_string(),
                        })?;
                        submission.cadence = Some(cadence);
                    }
                    LEVEL_COLUMN => {
                        let level = Level::parse(cell).ok_or_else(|| BatchError::UnknownToken {
                            row,
                            field: LEVEL_COLUMN,
                            value: cell.to_string(),
                        })?;
                        submission.level = Some(level);
                    }
                    attribute => submission.attributes.insert(attribute, cell_value(cell)),
                }
            }

            submissions.push(submission);
        }

        Ok(Self { submissions })
    }

    pub fn submissions(&self) -> &[KpiSubmission] {
        &self.submissions
    }

    pub fn len(&self) -> usize {
        self.submissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.submissions.is_empty()
    }

    /// Runs every row through `processor`, stopping at the first rejected row.
    pub fn process(&self, processor: &KpiProcessor) -> Result<Vec<KpiOutcome>, BatchError> {
        let outcomes = self
            .submissions
            .iter()
            .enumerate()
            .map(|(index, submission)| {
                processor
                    .process(submission)
                    .map_err(|source| BatchError::Processor {
                        row: index + 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(rows = outcomes.len(), "commission batch processed");
        Ok(outcomes)
    }
}

fn cell_value(cell: &str) -> AttributeValue {
    match cell.parse::<f64>() {
        Ok(number) if number.is_finite() => AttributeValue::Number(number),
        _ => AttributeValue::Text(cell.to_string()),
    }
}
