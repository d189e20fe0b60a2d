//! Single ingestion path shared by the watcher and direct submissions.
//!
//! Flow: optional completeness check → store insert (committed) → scenario
//! dispatch. Dispatch runs after commit and its failures never undo the insert.

use std::sync::Arc;

use linea_core::{EventId, EventRecord};
use linea_storage::EventStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::scenario::{Scenario, ScenarioDispatcher};
use crate::validate::{is_complete, required_event_fields};

/// How much the caller's record is trusted before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Reject the record unless every required event column is filled.
    Strict,
    /// The caller already enforced completeness (e.g. a form that requires
    /// every field); write as given.
    TrustCaller,
}

/// Outcome of one successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub id: EventId,
    /// `None` if dispatch failed.
    pub scenario: Option<Scenario>,
    pub dispatch_error: Option<String>,
}

/// Persists events and hands them to the scenario dispatcher.
#[derive(Clone)]
pub struct Ingestor {
    store: EventStore,
    dispatcher: Arc<ScenarioDispatcher>,
}

impl Ingestor {
    pub fn new(store: EventStore, dispatcher: ScenarioDispatcher) -> Self {
        Self {
            store,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Validate per `policy`, insert, then dispatch.
    ///
    /// Errors only when the record is rejected or the insert fails; a dispatch
    /// failure is reported in the receipt.
    pub async fn ingest(
        &self,
        record: EventRecord,
        policy: ValidationPolicy,
    ) -> Result<IngestReceipt, IngestError> {
        debug!(?policy, user = %record.usuario, "received event");

        if policy == ValidationPolicy::Strict {
            let (complete, missing) = is_complete(&record, &required_event_fields());
            if !complete {
                return Err(IngestError::Incomplete { missing });
            }
        }

        let event = self.store.insert_event(&record).await?;

        let receipt = match self.dispatcher.dispatch(&event).await {
            Ok(scenario) => IngestReceipt {
                id: event.id,
                scenario: Some(scenario),
                dispatch_error: None,
            },
            Err(e) => {
                warn!(event_id = event.id, error = %e, "scenario dispatch failed, event kept");
                IngestReceipt {
                    id: event.id,
                    scenario: None,
                    dispatch_error: Some(e.to_string()),
                }
            }
        };

        info!(event_id = receipt.id, scenario = ?receipt.scenario, "event ingested");
        if tracing::enabled!(tracing::Level::DEBUG) {
            match self.store.count().await {
                Ok(total) => debug!(total, "events in store"),
                Err(e) => debug!(error = %e, "could not count events"),
            }
        }
        Ok(receipt)
    }

    /// Entry point for form submissions: no completeness check, lineage is
    /// still resolved by the store.
    pub async fn ingest_direct(&self, record: EventRecord) -> Result<IngestReceipt, IngestError> {
        self.ingest(record, ValidationPolicy::TrustCaller).await
    }
}
