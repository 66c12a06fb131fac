//! Bulk import validator: comma or tab separated rosters.
//!
//! RULES:
//!   - The delimiter is chosen once, from the header line only.
//!   - Structural problems (missing columns, a row split by the wrong
//!     delimiter) reject the whole batch before anything is persisted.
//!   - A tab inside a comma document is always a mixed-delimiter error. A
//!     comma inside a tab document is one only when the row's width is off.
//!   - A bad value rejects only its own row. Every row is evaluated and
//!     every row error is collected.
//!   - There is no quoting. Values containing the delimiter are unsupported.

use crate::{
    capacity::CapacityWarning,
    config::{FieldParser, ImportSchema, OptionalField},
    error::StructuralImportError,
    roster::{LifecycleState, NewAdm, NewAgent},
    types::BatchId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fallback when a configured ADM schema carries no max_capacity default.
pub const DEFAULT_MAX_CAPACITY: u32 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    /// A tab anywhere in the header makes the whole document tab-separated.
    pub fn detect(header_line: &str) -> Self {
        if header_line.contains('\t') {
            Self::Tab
        } else {
            Self::Comma
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Comma => ',',
            Self::Tab   => '\t',
        }
    }

    fn other(self) -> char {
        match self {
            Self::Comma => '\t',
            Self::Tab   => ',',
        }
    }
}

/// "  Max   Capacity " -> "max_capacity"
pub fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// One accepted data line, with defaults applied and blank optionals removed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportRow {
    /// 1-based position of the line below the header.
    pub row_index: usize,
    pub fields:    BTreeMap<String, String>,
}

impl ImportRow {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    fn text(&self, field: &str) -> String {
        self.get(field).unwrap_or_default().to_string()
    }

    fn opt(&self, field: &str) -> Option<String> {
        self.get(field).map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowErrorKind {
    MissingFields { fields: Vec<String> },
    InvalidField { field: String, value: String, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowError {
    pub row_index: usize,
    pub phone:     Option<String>,
    pub error:     RowErrorKind,
}

impl RowError {
    pub fn reason(&self) -> String {
        match &self.error {
            RowErrorKind::MissingFields { fields } => {
                format!("Row {}: missing required value(s): {}", self.row_index, fields.join(", "))
            }
            RowErrorKind::InvalidField { field, value, reason } => {
                format!("Row {}: invalid {field} '{value}': {reason}", self.row_index)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedBatch {
    pub delimiter:  Delimiter,
    pub headers:    Vec<String>,
    /// Non-blank data lines seen, valid or not.
    pub total_rows: usize,
    pub valid:      Vec<ImportRow>,
    pub errors:     Vec<RowError>,
}

/// Split `raw` into typed candidate rows under `schema`.
///
/// Returns Err only for whole-batch structural problems; per-row problems
/// land in `ParsedBatch::errors`.
pub fn parse(raw: &str, schema: &ImportSchema) -> Result<ParsedBatch, StructuralImportError> {
    let mut lines = raw
        .lines()
        .enumerate()
        .skip_while(|(_, line)| line.trim().is_empty());

    let (header_pos, header_line) = lines.next().ok_or(StructuralImportError::EmptyInput)?;
    let delimiter = Delimiter::detect(header_line);
    let headers: Vec<String> = header_line
        .split(delimiter.as_char())
        .map(normalize_header)
        .collect();

    let missing: Vec<String> = schema
        .required
        .iter()
        .filter(|f| !headers.contains(*f))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(StructuralImportError::MissingColumns { missing });
    }

    let data: Vec<(usize, &str)> = lines
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(pos, line)| (pos - header_pos, line))
        .collect();
    if data.is_empty() {
        return Err(StructuralImportError::NoDataRows);
    }

    let mut batch = ParsedBatch {
        delimiter,
        headers,
        total_rows: data.len(),
        valid: Vec::new(),
        errors: Vec::new(),
    };

    for (row_index, line) in data {
        let values = split_row(line, row_index, delimiter, batch.headers.len())?;
        match validate_row(row_index, &batch.headers, &values, schema) {
            Ok(row) => batch.valid.push(row),
            Err(err) => batch.errors.push(err),
        }
    }

    log::debug!(
        "import: parsed {} rows ({:?}), {} valid, {} rejected",
        batch.total_rows,
        batch.delimiter,
        batch.valid.len(),
        batch.errors.len(),
    );
    Ok(batch)
}

fn split_row(
    line: &str,
    row_index: usize,
    delimiter: Delimiter,
    expected: usize,
) -> Result<Vec<String>, StructuralImportError> {
    let values: Vec<String> = line
        .split(delimiter.as_char())
        .map(|v| v.trim().to_string())
        .collect();

    // Trailing empty cells from spreadsheet exports are tolerated.
    let overflow = values.iter().skip(expected).any(|v| !v.is_empty());
    let short = values.len() < expected;

    // Tabs never appear inside a value; commas may (language lists).
    let mixed = match delimiter {
        Delimiter::Comma => line.contains(delimiter.other()),
        Delimiter::Tab => (short || overflow) && line.contains(delimiter.other()),
    };
    if mixed {
        return Err(StructuralImportError::MixedDelimiter { row_index });
    }
    if overflow {
        return Err(StructuralImportError::ColumnCountMismatch {
            row_index,
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

fn validate_row(
    row_index: usize,
    headers: &[String],
    values: &[String],
    schema: &ImportSchema,
) -> Result<ImportRow, RowError> {
    let mut fields = BTreeMap::new();
    for (i, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        let value = values.get(i).map(String::as_str).unwrap_or_default();
        // First non-blank value wins when a column name repeats.
        if !value.is_empty() || !fields.contains_key(header) {
            fields.insert(header.clone(), value.to_string());
        }
    }

    let phone = fields.get("phone").filter(|p| !p.is_empty()).cloned();

    let missing: Vec<String> = schema
        .required
        .iter()
        .filter(|f| fields.get(*f).map_or(true, |v| v.is_empty()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(RowError {
            row_index,
            phone,
            error: RowErrorKind::MissingFields { fields: missing },
        });
    }

    for spec in &schema.optional {
        let raw = fields.get(&spec.name).map(String::as_str).unwrap_or_default();
        match resolve_optional(spec, raw) {
            Ok(Some(value)) => {
                fields.insert(spec.name.clone(), value);
            }
            Ok(None) => {
                fields.remove(&spec.name);
            }
            Err(reason) => {
                return Err(RowError {
                    row_index,
                    phone,
                    error: RowErrorKind::InvalidField {
                        field: spec.name.clone(),
                        value: raw.to_string(),
                        reason,
                    },
                });
            }
        }
    }

    fields.retain(|_, v| !v.is_empty());
    Ok(ImportRow { row_index, fields })
}

fn resolve_optional(spec: &OptionalField, raw: &str) -> Result<Option<String>, String> {
    if raw.is_empty() {
        return Ok(spec.default.clone());
    }
    match spec.parser {
        FieldParser::Text => Ok(Some(raw.to_string())),
        FieldParser::PositiveInteger => Ok(raw
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(|n| n.to_string())
            .or_else(|| spec.default.clone())),
        FieldParser::Lifecycle => raw
            .parse::<LifecycleState>()
            .map(|s| Some(s.as_str().to_string())),
        FieldParser::Integer => Ok(raw.parse::<i64>().ok().map(|n| n.to_string())),
    }
}

/// Build the Agent creation payload from a validated row.
pub fn agent_payload(row: &ImportRow) -> NewAgent {
    NewAgent {
        name:            row.text("name"),
        phone:           row.text("phone"),
        email:           row.opt("email"),
        location:        row.text("location"),
        state:           row.opt("state"),
        language:        row.text("language"),
        lifecycle_state: row
            .get("lifecycle_state")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default(),
        dormancy_reason: row.opt("dormancy_reason"),
        assigned_adm_id: row.get("assigned_adm_id").and_then(|s| s.parse().ok()),
        license_number:  row.opt("license_number"),
        specialization:  row.opt("specialization"),
    }
}

/// Build the ADM creation payload from a validated row.
pub fn adm_payload(row: &ImportRow) -> NewAdm {
    NewAdm {
        name:         row.text("name"),
        phone:        row.text("phone"),
        email:        row.opt("email"),
        region:       row.text("region"),
        language:     row.text("language"),
        max_capacity: row
            .get("max_capacity")
            .and_then(|s| s.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_CAPACITY),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MissingFields,
    InvalidField,
    DuplicatePhone,
    UnknownAdm,
    Persistence,
}

/// One failed row, from either the parse step or the create step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportIssue {
    pub row_index: usize,
    pub phone:     Option<String>,
    pub kind:      IssueKind,
    pub message:   String,
}

impl From<RowError> for ImportIssue {
    fn from(err: RowError) -> Self {
        let kind = match err.error {
            RowErrorKind::MissingFields { .. } => IssueKind::MissingFields,
            RowErrorKind::InvalidField { .. }  => IssueKind::InvalidField,
        };
        Self {
            message: err.reason(),
            row_index: err.row_index,
            phone: err.phone,
            kind,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportReport {
    pub batch_id:        BatchId,
    pub created:         usize,
    pub total_submitted: usize,
    pub errors_count:    usize,
    pub errors:          Vec<ImportIssue>,
    /// ADMs this batch pushed past max_capacity through assigned_adm_id.
    #[serde(default)]
    pub capacity_warnings: Vec<CapacityWarning>,
}

impl ImportReport {
    /// Start a report seeded with the parse-time row errors.
    pub fn from_batch(batch_id: BatchId, batch: &ParsedBatch) -> Self {
        let errors: Vec<ImportIssue> = batch.errors.iter().cloned().map(Into::into).collect();
        Self {
            batch_id,
            created: 0,
            total_submitted: batch.total_rows,
            errors_count: errors.len(),
            errors,
            capacity_warnings: Vec::new(),
        }
    }

    pub fn record_created(&mut self) {
        self.created += 1;
    }

    pub fn record_issue(&mut self, issue: ImportIssue) {
        self.errors.push(issue);
        self.errors_count = self.errors.len();
    }

    /// Order errors by source row so operators can walk the file top-down.
    pub fn finish(mut self) -> Self {
        self.errors.sort_by_key(|e| e.row_index);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents() -> ImportSchema {
        ImportSchema::agents()
    }

    #[test]
    fn header_normalization_collapses_whitespace() {
        assert_eq!(normalize_header("  Max   Capacity "), "max_capacity");
        assert_eq!(normalize_header("PHONE"), "phone");
        assert_eq!(normalize_header("max_capacity"), "max_capacity");
    }

    #[test]
    fn one_row_missing_phone_rejects_only_that_row() {
        let raw = "name,phone,location\n\
                   Ravi Kumar,9000000001,Mumbai\n\
                   Neha Shah,9000000002,Pune\n\
                   Amit Rao,,Delhi\n\
                   Priya Nair,9000000004,Kochi\n\
                   Sunil Das,9000000005,Kolkata";
        let batch = parse(raw, &agents()).unwrap();

        assert_eq!(batch.total_rows, 5);
        assert_eq!(batch.valid.len(), 4);
        assert_eq!(batch.errors.len(), 1);
        let err = &batch.errors[0];
        assert_eq!(err.row_index, 3);
        assert_eq!(
            err.error,
            RowErrorKind::MissingFields { fields: vec!["phone".into()] }
        );
        assert!(err.reason().contains("phone"));
    }

    #[test]
    fn missing_required_column_fails_whole_batch() {
        let raw = "name,location\nRavi,Mumbai";
        let err = parse(raw, &agents()).unwrap_err();
        assert_eq!(
            err,
            StructuralImportError::MissingColumns { missing: vec!["phone".into()] }
        );
    }

    #[test]
    fn tab_header_splits_every_line_on_tabs() {
        let raw = "Name\tPhone\tLocation\tState\n\
                   Ravi Kumar\t9000000001\tMumbai, Andheri\tMaharashtra\n\
                   Neha Shah\t9000000002\tPune\tMaharashtra";
        let batch = parse(raw, &agents()).unwrap();

        assert_eq!(batch.delimiter, Delimiter::Tab);
        assert!(batch.errors.is_empty());
        assert_eq!(batch.valid[0].get("location"), Some("Mumbai, Andheri"));
        assert_eq!(batch.valid[0].get("state"), Some("Maharashtra"));
    }

    #[test]
    fn comma_header_splits_on_commas() {
        let raw = "name,phone,location\nRavi Kumar,9000000001,Mumbai";
        let batch = parse(raw, &agents()).unwrap();
        assert_eq!(batch.delimiter, Delimiter::Comma);
        assert_eq!(batch.valid[0].get("name"), Some("Ravi Kumar"));
    }

    #[test]
    fn extra_cell_on_comma_document_is_structural() {
        let raw = "name,phone,location\nRavi Kumar,9000000001,Mumbai, Andheri";
        let err = parse(raw, &agents()).unwrap_err();
        assert_eq!(
            err,
            StructuralImportError::ColumnCountMismatch { row_index: 1, expected: 3, found: 4 }
        );
    }

    #[test]
    fn trailing_empty_cells_are_tolerated() {
        let raw = "name,phone,location\nRavi Kumar,9000000001,Mumbai,,";
        let batch = parse(raw, &agents()).unwrap();
        assert_eq!(batch.valid.len(), 1);
    }

    #[test]
    fn tab_row_under_comma_header_is_mixed_delimiter() {
        let raw = "name,phone,location\nRavi Kumar\t9000000001\tMumbai";
        let err = parse(raw, &agents()).unwrap_err();
        assert_eq!(err, StructuralImportError::MixedDelimiter { row_index: 1 });
    }

    #[test]
    fn tab_row_with_a_stray_comma_is_still_mixed_delimiter() {
        // Two cells against three headers.
        let raw = "name,phone,location\n\
                   Ravi Kumar\t9000000001\tMumbai, Andheri\n\
                   Neha,9000000002,Pune";
        let err = parse(raw, &agents()).unwrap_err();
        assert_eq!(err, StructuralImportError::MixedDelimiter { row_index: 1 });

        // Exactly three cells, so only the embedded tab gives it away.
        let raw = "name,phone,location\n\
                   Neha,9000000002,Pune\n\
                   Ravi Kumar\t9000000001\tMumbai, Andheri, West";
        let err = parse(raw, &agents()).unwrap_err();
        assert_eq!(err, StructuralImportError::MixedDelimiter { row_index: 2 });
    }

    #[test]
    fn short_tab_row_containing_commas_is_mixed_delimiter() {
        let raw = "name\tphone\tlocation\tstate\n\
                   Ravi Kumar\t9000000001,Mumbai\tMaharashtra";
        let err = parse(raw, &agents()).unwrap_err();
        assert_eq!(err, StructuralImportError::MixedDelimiter { row_index: 1 });
    }

    #[test]
    fn defaults_fill_blank_optionals() {
        let raw = "name,phone,location,language,lifecycle_state,email\nRavi,9000000001,Mumbai,,,";
        let batch = parse(raw, &agents()).unwrap();
        let row = &batch.valid[0];
        assert_eq!(row.get("language"), Some("Hindi"));
        assert_eq!(row.get("lifecycle_state"), Some("dormant"));
        assert_eq!(row.get("email"), None);
    }

    #[test]
    fn unknown_lifecycle_is_a_row_error() {
        let raw = "name,phone,location,lifecycle_state\nRavi,9000000001,Mumbai,sleeping\nNeha,9000000002,Pune,At Risk";
        let batch = parse(raw, &agents()).unwrap();
        assert_eq!(batch.valid.len(), 1);
        assert_eq!(batch.valid[0].get("lifecycle_state"), Some("at_risk"));
        assert_eq!(batch.errors[0].phone.as_deref(), Some("9000000001"));
        assert!(matches!(
            batch.errors[0].error,
            RowErrorKind::InvalidField { ref field, .. } if field == "lifecycle_state"
        ));
    }

    #[test]
    fn bad_capacity_falls_back_to_default() {
        let raw = "Name,Phone,Region,Max Capacity\n\
                   Rajiv,9800000001,West - Mumbai,abc\n\
                   Priyanka,9800000002,North - Delhi,0\n\
                   Suresh,9800000003,South - Bangalore,40";
        let batch = parse(raw, &ImportSchema::adms()).unwrap();
        let caps: Vec<u32> = batch.valid.iter().map(|r| adm_payload(r).max_capacity).collect();
        assert_eq!(caps, vec![50, 50, 40]);
        assert_eq!(batch.valid[0].get("language"), Some("Hindi,English"));
    }

    #[test]
    fn blank_lines_are_skipped_but_keep_row_positions() {
        let raw = "\nname,phone,location\nRavi,9000000001,Mumbai\n\n,9000000003,Pune\n";
        let batch = parse(raw, &agents()).unwrap();
        assert_eq!(batch.total_rows, 2);
        assert_eq!(batch.errors[0].row_index, 3);
    }

    #[test]
    fn header_only_is_structural() {
        assert_eq!(
            parse("name,phone,location\n", &agents()).unwrap_err(),
            StructuralImportError::NoDataRows
        );
        assert_eq!(parse("  \n", &agents()).unwrap_err(), StructuralImportError::EmptyInput);
    }

    #[test]
    fn unparsable_adm_reference_is_dropped() {
        let raw = "name,phone,location,assigned_adm_id\nRavi,9000000001,Mumbai,abc\nNeha,9000000002,Pune,7";
        let batch = parse(raw, &agents()).unwrap();
        assert_eq!(agent_payload(&batch.valid[0]).assigned_adm_id, None);
        assert_eq!(agent_payload(&batch.valid[1]).assigned_adm_id, Some(7));
    }

    #[test]
    fn report_counts_parse_errors() {
        let raw = "name,phone,location\nRavi,,Mumbai\nNeha,9000000002,";
        let batch = parse(raw, &agents()).unwrap();
        let report = ImportReport::from_batch("b-1".into(), &batch).finish();
        assert_eq!(report.total_submitted, 2);
        assert_eq!(report.errors_count, 2);
        assert_eq!(report.errors[1].kind, IssueKind::MissingFields);
        assert_eq!(report.errors[1].phone.as_deref(), Some("9000000002"));
    }
}
