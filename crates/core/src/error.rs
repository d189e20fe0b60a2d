use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid lineage reference '{0}': expected an event id")]
    InvalidLineage(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),
}
