//! Stoppage event ingestion: sheet sources, validation, dedup, the single
//! ingest path and scenario dispatch.

pub mod dedup;
pub mod error;
pub mod normalize;
pub mod orchestrator;
pub mod scenario;
pub mod source;
pub mod validate;
pub mod watcher;

pub use error::{IngestError, SourceError, WatcherError};
pub use orchestrator::{IngestReceipt, Ingestor, ValidationPolicy};
pub use scenario::{Scenario, ScenarioDispatcher, ScenarioHandler};
pub use source::{open_source, TabularSource};
pub use watcher::{PollReport, SourceWatcher, WatcherState, WatcherStats};
