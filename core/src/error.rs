use crate::types::{AdmId, AgentId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdmError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Import rejected: {0}")]
    StructuralImport(#[from] StructuralImportError),

    #[error("Agent {agent_id} not found")]
    AgentNotFound { agent_id: AgentId },

    #[error("ADM {adm_id} not found")]
    AdmNotFound { adm_id: AdmId },

    #[error("Invalid max_capacity {value} for ADM {adm_id}: must be a positive integer")]
    InvalidCapacity { adm_id: AdmId, value: i64 },

    #[error("Agent {agent_id} is no longer assigned to ADM {expected_adm_id}; rebalance batch aborted")]
    StaleMove { agent_id: AgentId, expected_adm_id: AdmId },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Whole-batch import failures. Nothing from the batch is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralImportError {
    #[error("No data supplied: paste CSV or tab-separated text")]
    EmptyInput,

    #[error("Data must have a header row and at least one data row")]
    NoDataRows,

    #[error("Missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Row {row_index}: expected {expected} columns but found {found}; values containing the delimiter are not supported")]
    ColumnCountMismatch {
        row_index: usize,
        expected:  usize,
        found:     usize,
    },

    #[error("Row {row_index}: uses a different delimiter than the header; mixed delimiters are not supported")]
    MixedDelimiter { row_index: usize },
}

pub type AdmResult<T> = Result<T, AdmError>;
