//! Shared primitive types used across the roster core.

/// Database identity of an Agent row.
pub type AgentId = i64;

/// Database identity of an ADM row.
pub type AdmId = i64;

/// Correlation id stamped on every bulk import report.
pub type BatchId = String;
