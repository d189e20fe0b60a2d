//! Raw row → trimmed text row.

use linea_core::{NormalizedRow, RawRow};

/// Stringify every cell and trim surrounding whitespace. Header names and
/// column order are kept as read; no validation happens here.
pub fn normalize(row: &RawRow) -> NormalizedRow {
    row.iter()
        .map(|(column, cell)| (column.clone(), cell.to_text().trim().to_string()))
        .collect()
}
