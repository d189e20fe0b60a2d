use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Store-assigned event identifier (SQLite `INTEGER PRIMARY KEY AUTOINCREMENT`).
pub type EventId = i64;

/// The persisted columns of the `events` table, in declared order.
///
/// `id` is not listed: it is the surrogate key assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventColumn {
    Usuario,
    Planta,
    Periodo,
    FechaDeInicio,
    FechaDeTermino,
    Material,
    DescripcionDelMaterial,
    Batch,
    Vendedor,
    ComplainQty,
    TiempoDeParada,
    Consecuencia,
    IdOrigen,
}

impl EventColumn {
    pub const ALL: [EventColumn; 13] = [
        EventColumn::Usuario,
        EventColumn::Planta,
        EventColumn::Periodo,
        EventColumn::FechaDeInicio,
        EventColumn::FechaDeTermino,
        EventColumn::Material,
        EventColumn::DescripcionDelMaterial,
        EventColumn::Batch,
        EventColumn::Vendedor,
        EventColumn::ComplainQty,
        EventColumn::TiempoDeParada,
        EventColumn::Consecuencia,
        EventColumn::IdOrigen,
    ];

    /// SQL column name.
    pub const fn name(self) -> &'static str {
        match self {
            EventColumn::Usuario => "Usuario",
            EventColumn::Planta => "Planta",
            EventColumn::Periodo => "Periodo",
            EventColumn::FechaDeInicio => "Fecha_de_inicio",
            EventColumn::FechaDeTermino => "Fecha_de_termino",
            EventColumn::Material => "Material",
            EventColumn::DescripcionDelMaterial => "Descripcion_del_material",
            EventColumn::Batch => "Batch",
            EventColumn::Vendedor => "Vendedor",
            EventColumn::ComplainQty => "Complain_Qty",
            EventColumn::TiempoDeParada => "Tiempo_de_parada",
            EventColumn::Consecuencia => "Consecuencia",
            EventColumn::IdOrigen => "id_origen",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl std::fmt::Display for EventColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Event columns that must be filled for a record to be accepted under
/// strict validation.
pub const REQUIRED_EVENT_COLUMNS: [EventColumn; 9] = [
    EventColumn::Planta,
    EventColumn::Periodo,
    EventColumn::FechaDeInicio,
    EventColumn::Material,
    EventColumn::DescripcionDelMaterial,
    EventColumn::Batch,
    EventColumn::Vendedor,
    EventColumn::ComplainQty,
    EventColumn::TiempoDeParada,
];

/// A stoppage event as submitted for ingestion.
///
/// Every text column defaults to the empty string. `id_origen` links an edit
/// to the report it supersedes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    #[serde(rename = "Usuario")]
    pub usuario: String,
    #[serde(rename = "Planta")]
    pub planta: String,
    #[serde(rename = "Periodo")]
    pub periodo: String,
    #[serde(rename = "Fecha_de_inicio")]
    pub fecha_de_inicio: String,
    #[serde(rename = "Fecha_de_termino")]
    pub fecha_de_termino: String,
    #[serde(rename = "Material")]
    pub material: String,
    #[serde(rename = "Descripcion_del_material")]
    pub descripcion_del_material: String,
    #[serde(rename = "Batch")]
    pub batch: String,
    #[serde(rename = "Vendedor")]
    pub vendedor: String,
    #[serde(rename = "Complain_Qty")]
    pub complain_qty: String,
    #[serde(rename = "Tiempo_de_parada")]
    pub tiempo_de_parada: String,
    #[serde(rename = "Consecuencia")]
    pub consecuencia: String,
    pub id_origen: Option<EventId>,
}

impl EventRecord {
    /// Text value of a column. `IdOrigen` has no text form here, see [`Self::id_origen`].
    pub fn text(&self, column: EventColumn) -> Option<&str> {
        let value = match column {
            EventColumn::Usuario => &self.usuario,
            EventColumn::Planta => &self.planta,
            EventColumn::Periodo => &self.periodo,
            EventColumn::FechaDeInicio => &self.fecha_de_inicio,
            EventColumn::FechaDeTermino => &self.fecha_de_termino,
            EventColumn::Material => &self.material,
            EventColumn::DescripcionDelMaterial => &self.descripcion_del_material,
            EventColumn::Batch => &self.batch,
            EventColumn::Vendedor => &self.vendedor,
            EventColumn::ComplainQty => &self.complain_qty,
            EventColumn::TiempoDeParada => &self.tiempo_de_parada,
            EventColumn::Consecuencia => &self.consecuencia,
            EventColumn::IdOrigen => return None,
        };
        Some(value.as_str())
    }

    /// Mutable text slot of a column; `None` for `IdOrigen`.
    pub(crate) fn text_mut(&mut self, column: EventColumn) -> Option<&mut String> {
        let slot = match column {
            EventColumn::Usuario => &mut self.usuario,
            EventColumn::Planta => &mut self.planta,
            EventColumn::Periodo => &mut self.periodo,
            EventColumn::FechaDeInicio => &mut self.fecha_de_inicio,
            EventColumn::FechaDeTermino => &mut self.fecha_de_termino,
            EventColumn::Material => &mut self.material,
            EventColumn::DescripcionDelMaterial => &mut self.descripcion_del_material,
            EventColumn::Batch => &mut self.batch,
            EventColumn::Vendedor => &mut self.vendedor,
            EventColumn::ComplainQty => &mut self.complain_qty,
            EventColumn::TiempoDeParada => &mut self.tiempo_de_parada,
            EventColumn::Consecuencia => &mut self.consecuencia,
            EventColumn::IdOrigen => return None,
        };
        Some(slot)
    }

    /// Set a column from its text form. `IdOrigen` is parsed as an event id;
    /// a blank value clears it.
    pub fn set(&mut self, column: EventColumn, value: &str) -> Result<(), CoreError> {
        match self.text_mut(column) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => {
                self.id_origen = parse_lineage(value)?;
                Ok(())
            }
        }
    }

    /// Build a record from a column-name keyed map. Unknown keys are rejected,
    /// missing ones stay empty.
    pub fn from_columns(columns: &IndexMap<String, String>) -> Result<Self, CoreError> {
        let mut record = Self::default();
        for (name, value) in columns {
            let column =
                EventColumn::from_name(name).ok_or_else(|| CoreError::UnknownColumn(name.clone()))?;
            record.set(column, value)?;
        }
        Ok(record)
    }

    pub fn with_origin(mut self, origin: Option<EventId>) -> Self {
        self.id_origen = origin;
        self
    }
}

/// Parse the text form of a lineage reference. Blank means "no origin".
pub fn parse_lineage(value: &str) -> Result<Option<EventId>, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<EventId>()
        .map(Some)
        .map_err(|_| CoreError::InvalidLineage(trimmed.to_string()))
}

/// A persisted event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub id: EventId,
    #[serde(flatten)]
    pub record: EventRecord,
}

impl StoredEvent {
    /// Root of this event's lineage chain: its origin, or itself.
    pub fn lineage_root(&self) -> EventId {
        self.record.id_origen.unwrap_or(self.id)
    }
}
