use linea_core::{CoreError, EventId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("origin event {0} does not exist")]
    OriginNotFound(EventId),

    #[error("malformed row {id}: {source}")]
    MalformedRow {
        id: EventId,
        #[source]
        source: CoreError,
    },
}
