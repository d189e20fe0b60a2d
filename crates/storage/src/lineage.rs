//! Edit-history grouping for report listings.

use indexmap::IndexMap;
use linea_core::{EventId, StoredEvent};

/// Group events by lineage root, keeping the order rows arrive in.
///
/// Fed from [`crate::EventStore::fetch_all`] or `fetch_by_user`, each group
/// lists a report's edits newest first, groups ordered by newest root.
pub fn group_by_origin(events: Vec<StoredEvent>) -> IndexMap<EventId, Vec<StoredEvent>> {
    let mut grouped: IndexMap<EventId, Vec<StoredEvent>> = IndexMap::new();
    for event in events {
        grouped.entry(event.lineage_root()).or_default().push(event);
    }
    grouped
}
