//! Static description of the `events` table and the SQL derived from it.
//!
//! Identifiers only ever come from [`TableSchema`] constants; values are
//! always bound as parameters.

use linea_core::EventColumn;

/// A table with an integer surrogate key and text columns.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    pub name: &'static str,
    pub key: &'static str,
    pub columns: &'static [EventColumn],
    /// Columns that get a secondary index.
    pub indexed: &'static [EventColumn],
}

pub const EVENTS: TableSchema = TableSchema {
    name: "events",
    key: "id",
    columns: &EventColumn::ALL,
    indexed: &[EventColumn::Usuario],
};

impl TableSchema {
    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `CREATE TABLE IF NOT EXISTS` with every declared column as TEXT.
    pub fn create_table_sql(&self) -> String {
        let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", self.key)];
        columns.extend(self.columns.iter().map(|c| format!("{} TEXT", c.name())));
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            columns.join(",\n    ")
        )
    }

    /// One `CREATE INDEX IF NOT EXISTS` statement per indexed column.
    pub fn create_index_sql(&self) -> Vec<String> {
        self.indexed
            .iter()
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table} ({col})",
                    table = self.name,
                    col = c.name()
                )
            })
            .collect()
    }

    /// Parameterized single-row insert binding every declared column in order.
    pub fn insert_sql(&self) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_list(),
            placeholders
        )
    }

    /// Single-statement insert of an edit. Every column but `id_origen` is
    /// bound in order, followed by the requested origin's key. The origin is
    /// rewritten to that row's own origin when it has one; no row is inserted
    /// when the origin does not exist. Returns the new key and stored origin.
    pub fn insert_edit_sql(&self) -> String {
        let origin = EventColumn::IdOrigen.name();
        let values = self
            .columns
            .iter()
            .map(|c| match c {
                EventColumn::IdOrigen => format!(
                    "COALESCE(o.{origin}, CAST(o.{key} AS TEXT))",
                    key = self.key
                ),
                _ => "?".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {table} ({columns}) SELECT {values} FROM {table} AS o WHERE o.{key} = ? RETURNING {key}, {origin}",
            table = self.name,
            columns = self.column_list(),
            key = self.key,
        )
    }

    /// `SELECT key, columns... FROM table`, optionally filtered by one column
    /// bound as a parameter.
    pub fn select_sql(&self, filter: Option<&str>) -> String {
        let mut sql = format!(
            "SELECT {}, {} FROM {}",
            self.key,
            self.column_list(),
            self.name
        );
        if let Some(column) = filter {
            sql.push_str(&format!(" WHERE {} = ?", column));
        }
        sql
    }

    /// Lineage ordering: chains grouped by root (newest root first), newest
    /// edit first inside a chain.
    pub fn lineage_order_sql(&self) -> String {
        format!(
            " ORDER BY COALESCE(CAST({origin} AS INTEGER), {key}) DESC, {key} DESC",
            origin = EventColumn::IdOrigen.name(),
            key = self.key
        )
    }

    /// Origin lookup for one row by key.
    pub fn origin_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?",
            EventColumn::IdOrigen.name(),
            self.name,
            self.key
        )
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_declares_all_columns() {
        let sql = EVENTS.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS events ("));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        for column in EventColumn::ALL {
            assert!(sql.contains(&format!("{} TEXT", column.name())), "{column}");
        }
    }

    #[test]
    fn insert_binds_every_column() {
        let sql = EVENTS.insert_sql();
        assert_eq!(sql.matches('?').count(), EventColumn::ALL.len());
        assert!(sql.contains("Usuario, Planta, Periodo, Fecha_de_inicio"));
        assert!(sql.ends_with("id_origen) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"));
    }

    #[test]
    fn insert_edit_resolves_origin_in_statement() {
        let sql = EVENTS.insert_edit_sql();
        assert_eq!(sql.matches('?').count(), EventColumn::ALL.len());
        assert!(sql.contains("COALESCE(o.id_origen, CAST(o.id AS TEXT))"));
        assert!(sql.contains("FROM events AS o WHERE o.id = ?"));
        assert!(sql.ends_with("RETURNING id, id_origen"));
    }

    #[test]
    fn select_with_filter() {
        let sql = EVENTS.select_sql(Some(EventColumn::Usuario.name()));
        assert!(sql.starts_with("SELECT id, Usuario,"));
        assert!(sql.ends_with("FROM events WHERE Usuario = ?"));
    }

    #[test]
    fn index_statements() {
        assert_eq!(
            EVENTS.create_index_sql(),
            vec!["CREATE INDEX IF NOT EXISTS idx_events_Usuario ON events (Usuario)".to_string()]
        );
    }
}
