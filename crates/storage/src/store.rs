use std::time::Duration;

use linea_core::config::StorageConfig;
use linea_core::{parse_lineage, EventColumn, EventId, EventRecord, StoredEvent};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::schema::EVENTS;

/// How long a writer waits on SQLite's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed event store. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open (creating if needed) the database file and provision the schema.
    ///
    /// Fails if the store is unusable; callers should not start without it.
    pub async fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        info!(path = %config.database_path.display(), "event store opened");

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Create the events table and its indexes if absent. Safe to repeat and
    /// to call concurrently.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(&EVENTS.create_table_sql()).execute(&mut *tx).await?;
        for statement in EVENTS.create_index_sql() {
            sqlx::query(&statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        debug!(table = EVENTS.name, "schema checked/created");
        Ok(())
    }

    /// Insert one event in its own transaction and return its id.
    ///
    /// A supplied `id_origen` must name an existing row. If that row is itself
    /// an edit, the new row is linked to its origin instead, so lineage always
    /// points at the oldest report.
    pub async fn insert(&self, record: &EventRecord) -> Result<EventId, StoreError> {
        Ok(self.insert_event(record).await?.id)
    }

    /// Same as [`Self::insert`], returning the row as stored (with the
    /// resolved origin).
    ///
    /// One statement per insert: SQLite takes the write lock when the
    /// statement starts, so writers queue on `busy_timeout`.
    pub async fn insert_event(&self, record: &EventRecord) -> Result<StoredEvent, StoreError> {
        let (id, origin) = match record.id_origen {
            None => (self.insert_original(record).await?, None),
            Some(requested) => {
                let (id, root) = self.insert_edit(record, requested).await?;
                if root != requested {
                    debug!(requested, root, "origin is an edit, linked to its root");
                }
                (id, Some(root))
            }
        };

        info!(id, origin = ?origin, user = %record.usuario, "event saved");
        Ok(StoredEvent {
            id,
            record: record.clone().with_origin(origin),
        })
    }

    async fn insert_original(&self, record: &EventRecord) -> Result<EventId, StoreError> {
        let sql = EVENTS.insert_sql();
        let mut query = sqlx::query(&sql);
        for column in EVENTS.columns {
            query = match column {
                EventColumn::IdOrigen => query.bind(None::<String>),
                other => query.bind(record.text(*other).unwrap_or_default().to_string()),
            };
        }
        Ok(query.execute(&self.pool).await?.last_insert_rowid())
    }

    /// Insert an edit of `requested`, returning the new id and the root it was
    /// linked to.
    async fn insert_edit(
        &self,
        record: &EventRecord,
        requested: EventId,
    ) -> Result<(EventId, EventId), StoreError> {
        let sql = EVENTS.insert_edit_sql();
        let mut query = sqlx::query(&sql);
        for column in EVENTS.columns {
            if let Some(text) = record.text(*column) {
                query = query.bind(text.to_string());
            }
        }
        let row = query
            .bind(requested)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::OriginNotFound(requested))?;

        let id: EventId = row.try_get(EVENTS.key)?;
        let stored: Option<String> = row.try_get(EventColumn::IdOrigen.name())?;
        let root = parse_lineage(stored.as_deref().unwrap_or_default())
            .map_err(|source| StoreError::MalformedRow { id, source })?
            .unwrap_or(requested);
        Ok((id, root))
    }

    /// Every event, grouped by lineage (see [`crate::schema::TableSchema::lineage_order_sql`]).
    pub async fn fetch_all(&self) -> Result<Vec<StoredEvent>, StoreError> {
        let sql = format!("{}{}", EVENTS.select_sql(None), EVENTS.lineage_order_sql());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    /// Events reported by one user, in lineage order.
    pub async fn fetch_by_user(&self, user: &str) -> Result<Vec<StoredEvent>, StoreError> {
        let sql = format!(
            "{}{}",
            EVENTS.select_sql(Some(EventColumn::Usuario.name())),
            EVENTS.lineage_order_sql()
        );
        let rows = sqlx::query(&sql).bind(user).fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    pub async fn fetch_by_id(&self, id: EventId) -> Result<Option<StoredEvent>, StoreError> {
        let row = sqlx::query(&EVENTS.select_sql(Some(EVENTS.key)))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(event_from_row).transpose()
    }

    /// Lineage lookup: `None` if the row does not exist, `Some(None)` for an
    /// original report, `Some(Some(origin))` for an edit.
    pub async fn origin_of(&self, id: EventId) -> Result<Option<Option<EventId>>, StoreError> {
        let origin = sqlx::query_scalar::<_, Option<String>>(&EVENTS.origin_sql())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match origin {
            None => Ok(None),
            Some(text) => {
                let parsed = parse_lineage(text.as_deref().unwrap_or_default())
                    .map_err(|source| StoreError::MalformedRow { id, source })?;
                Ok(Some(parsed))
            }
        }
    }

    /// The record to pre-fill when editing event `id`: same values, linked to
    /// the lineage root.
    pub async fn edit_template(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.fetch_by_id(id).await?.map(|event| {
            let root = event.lineage_root();
            event.record.with_origin(Some(root))
        }))
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar::<_, i64>(&EVENTS.count_sql())
            .fetch_one(&self.pool)
            .await?)
    }

    /// Names of the columns SQLite reports for the events table.
    pub async fn table_columns(&self) -> Result<Vec<String>, StoreError> {
        Ok(sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?)")
            .bind(EVENTS.name)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn event_from_row(row: &SqliteRow) -> Result<StoredEvent, StoreError> {
    let id: EventId = row.try_get(EVENTS.key)?;
    let mut record = EventRecord::default();
    for column in EVENTS.columns {
        let value: Option<String> = row.try_get(column.name())?;
        record
            .set(*column, value.as_deref().unwrap_or_default())
            .map_err(|source| StoreError::MalformedRow { id, source })?;
    }
    Ok(StoredEvent { id, record })
}
