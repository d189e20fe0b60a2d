//! Scenario classification and handler trait.

use linea_core::sheet::{DOUGH_FLAG, PACKAGING_FLAG, RAW_MATERIAL_FLAG};
use linea_core::StoredEvent;
use serde::Serialize;

/// Consequence of a stoppage, derived from `Consecuencia`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Scenario {
    RawMaterialRejection,
    DoughRejection,
    PackagingRejection,
    NoConsequence,
    Unknown,
}

impl Scenario {
    /// Scenarios that have a handler.
    pub const HANDLED: [Scenario; 3] = [
        Scenario::RawMaterialRejection,
        Scenario::DoughRejection,
        Scenario::PackagingRejection,
    ];

    /// Classify a `Consecuencia` value (trimmed, case-insensitive).
    pub fn classify(consequence: &str) -> Self {
        let value = consequence.trim().to_lowercase();
        if value.is_empty() || value == "none" {
            Scenario::NoConsequence
        } else if value == RAW_MATERIAL_FLAG.to_lowercase() {
            Scenario::RawMaterialRejection
        } else if value == DOUGH_FLAG.to_lowercase() {
            Scenario::DoughRejection
        } else if value == PACKAGING_FLAG.to_lowercase() {
            Scenario::PackagingRejection
        } else {
            Scenario::Unknown
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scenario::RawMaterialRejection => write!(f, "raw material rejection"),
            Scenario::DoughRejection => write!(f, "dough rejection"),
            Scenario::PackagingRejection => write!(f, "packaging rejection"),
            Scenario::NoConsequence => write!(f, "no consequence"),
            Scenario::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("{scenario} handler '{handler}' failed: {reason}")]
    Handler {
        scenario: Scenario,
        handler: String,
        reason: String,
    },
}

/// Work to run after an event of one scenario is persisted.
#[async_trait::async_trait]
pub trait ScenarioHandler: Send + Sync {
    async fn handle(&self, event: &StoredEvent) -> Result<(), ScenarioError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
