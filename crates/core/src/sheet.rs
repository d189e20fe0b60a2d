//! Column layout of the polled stoppage spreadsheet.
//!
//! Sheet headers are space-separated ("Fecha de inicio") while persisted
//! columns are underscored ("Fecha_de_inicio"). The consequence is entered as
//! three yes/no question columns; the answered question becomes `Consecuencia`.

use crate::event::{EventColumn, EventRecord};
use crate::row::NormalizedRow;

pub const RAW_MATERIAL_FLAG: &str = "Se rechazo la materia prima?";
pub const DOUGH_FLAG: &str = "Se rechazo la masa?";
pub const PACKAGING_FLAG: &str = "Se rechazo el packaging?";

/// Mutually exclusive consequence flags, in declared order.
pub const CONSEQUENCE_FLAGS: [&str; 3] = [RAW_MATERIAL_FLAG, DOUGH_FLAG, PACKAGING_FLAG];

/// Headers that must be filled for a sheet row to be eligible. The order is
/// part of the fingerprint contract.
pub const SHEET_REQUIRED_COLUMNS: [&str; 12] = [
    "Planta",
    "Periodo",
    "Fecha de inicio",
    "Material",
    "Descripcion del material",
    "Batch",
    "Vendedor",
    "Complain Qty",
    "Tiempo de parada",
    RAW_MATERIAL_FLAG,
    DOUGH_FLAG,
    PACKAGING_FLAG,
];

/// Sheet header → persisted column.
pub const SHEET_COLUMN_MAP: [(&str, EventColumn); 10] = [
    ("Planta", EventColumn::Planta),
    ("Periodo", EventColumn::Periodo),
    ("Fecha de inicio", EventColumn::FechaDeInicio),
    ("Fecha de termino", EventColumn::FechaDeTermino),
    ("Material", EventColumn::Material),
    ("Descripcion del material", EventColumn::DescripcionDelMaterial),
    ("Batch", EventColumn::Batch),
    ("Vendedor", EventColumn::Vendedor),
    ("Complain Qty", EventColumn::ComplainQty),
    ("Tiempo de parada", EventColumn::TiempoDeParada),
];

const AFFIRMATIVE: &[&str] = &["si", "sí", "s", "yes", "y", "true", "1", "x"];

/// Whether a flag cell answers "yes".
pub fn is_affirmative(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    AFFIRMATIVE.contains(&v.as_str())
}

/// The consequence answered "yes" on a sheet row, if any.
///
/// When more than one flag is set the first in declared order wins.
pub fn consequence_of(row: &NormalizedRow) -> Option<&'static str> {
    let answered: Vec<&'static str> = CONSEQUENCE_FLAGS
        .into_iter()
        .filter(|flag| row.get(*flag).is_some_and(|v| is_affirmative(v)))
        .collect();

    if answered.len() > 1 {
        tracing::warn!(
            flags = ?answered,
            "more than one consequence flag set, keeping the first"
        );
    }
    answered.first().copied()
}

/// Map a normalized sheet row onto an event record owned by `user`.
pub fn to_event_record(row: &NormalizedRow, user: &str) -> EventRecord {
    let mut record = EventRecord {
        usuario: user.to_string(),
        ..Default::default()
    };
    for (header, column) in SHEET_COLUMN_MAP {
        if let (Some(value), Some(slot)) = (row.get(header), record.text_mut(column)) {
            *slot = value.clone();
        }
    }
    record.consecuencia = consequence_of(row).unwrap_or_default().to_string();
    record
}
