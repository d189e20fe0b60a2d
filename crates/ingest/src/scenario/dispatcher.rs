//! Routes persisted events to scenario handlers.
//!
//! Classification lives in [`Scenario::classify`]; handlers can be swapped per
//! scenario without touching it. Events with no or an unrecognized
//! consequence are logged and left alone.

use std::collections::HashMap;
use std::sync::Arc;

use linea_core::StoredEvent;

use super::traits::{Scenario, ScenarioError, ScenarioHandler};

/// Default handler: records that the scenario was reached.
pub struct LoggingHandler {
    scenario: Scenario,
    name: String,
}

impl LoggingHandler {
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            name: format!("log:{scenario}"),
        }
    }
}

#[async_trait::async_trait]
impl ScenarioHandler for LoggingHandler {
    async fn handle(&self, event: &StoredEvent) -> Result<(), ScenarioError> {
        tracing::info!(
            event_id = event.id,
            material = %event.record.material,
            batch = %event.record.batch,
            "Handling {}...",
            self.scenario
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Dispatches a stored event to the handler of its scenario.
pub struct ScenarioDispatcher {
    handlers: HashMap<Scenario, Arc<dyn ScenarioHandler>>,
}

impl ScenarioDispatcher {
    /// Dispatcher with a [`LoggingHandler`] for every handled scenario.
    pub fn new() -> Self {
        let handlers = Scenario::HANDLED
            .into_iter()
            .map(|s| (s, Arc::new(LoggingHandler::new(s)) as Arc<dyn ScenarioHandler>))
            .collect();
        Self { handlers }
    }

    /// Replace the handler for one scenario. `NoConsequence` and `Unknown`
    /// never reach a handler, so registering one for them has no effect.
    pub fn with_handler(mut self, scenario: Scenario, handler: Arc<dyn ScenarioHandler>) -> Self {
        if Scenario::HANDLED.contains(&scenario) {
            self.handlers.insert(scenario, handler);
        } else {
            tracing::warn!(%scenario, handler = handler.name(), "scenario has no handler slot, ignoring");
        }
        self
    }

    /// Classify `event` and run its handler.
    ///
    /// Returns the scenario on success. An unknown consequence is not an error.
    pub async fn dispatch(&self, event: &StoredEvent) -> Result<Scenario, ScenarioError> {
        let scenario = Scenario::classify(&event.record.consecuencia);

        match scenario {
            Scenario::NoConsequence => {
                tracing::info!(event_id = event.id, "No consequence to evaluate");
            }
            Scenario::Unknown => {
                tracing::warn!(
                    event_id = event.id,
                    consequence = %event.record.consecuencia,
                    "Unknown consequence, skipping"
                );
            }
            handled => match self.handlers.get(&handled) {
                Some(handler) => {
                    let start = std::time::Instant::now();
                    handler.handle(event).await?;
                    tracing::debug!(
                        event_id = event.id,
                        handler = handler.name(),
                        duration_ms = start.elapsed().as_millis() as u64,
                        "scenario handled"
                    );
                }
                None => {
                    tracing::debug!(event_id = event.id, %handled, "no handler registered");
                }
            },
        }

        Ok(scenario)
    }
}

impl Default for ScenarioDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
