//! Completeness checks shared by sheet rows and event records.

use linea_core::{EventColumn, EventRecord, NormalizedRow, REQUIRED_EVENT_COLUMNS};

/// Placeholder strings spreadsheets and exports leave in empty cells.
const MISSING_MARKERS: &[&str] = &["nan", "none", "null"];

/// Named text lookup over a record-like value.
pub trait Fields {
    fn field(&self, name: &str) -> Option<&str>;
}

impl Fields for NormalizedRow {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl Fields for EventRecord {
    fn field(&self, name: &str) -> Option<&str> {
        EventColumn::from_name(name).and_then(|column| self.text(column))
    }
}

/// A value is missing when blank after trimming or a placeholder such as `NaN`.
pub fn is_missing(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || MISSING_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

/// Check `required` against `record`; absent fields count as missing.
///
/// Returns whether the record is complete and the missing field names in
/// `required` order.
pub fn is_complete<R: Fields + ?Sized>(record: &R, required: &[&str]) -> (bool, Vec<String>) {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| record.field(name).map_or(true, is_missing))
        .map(|name| name.to_string())
        .collect();
    (missing.is_empty(), missing)
}

/// Column names enforced by strict ingestion.
pub fn required_event_fields() -> Vec<&'static str> {
    REQUIRED_EVENT_COLUMNS.iter().map(|c| c.name()).collect()
}
