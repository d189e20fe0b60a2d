use std::num::NonZeroUsize;

use linea_core::sheet::SHEET_REQUIRED_COLUMNS;
use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::validate::Fields;

/// Fingerprint of a sheet row over the required columns in declared order.
pub fn fingerprint<R: Fields + ?Sized>(row: &R) -> String {
    fingerprint_fields(row, &SHEET_REQUIRED_COLUMNS)
}

/// SHA-256 hex over `<byte-len>:<value>` for each field, so values containing
/// any separator cannot collide. Absent fields hash as empty.
pub fn fingerprint_fields<R: Fields + ?Sized>(row: &R, fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for name in fields {
        let value = row.field(name).unwrap_or_default().trim();
        hasher.update(value.len().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Bounded set of fingerprints already handled by a watcher.
///
/// Least recently observed fingerprints are evicted first once `capacity` is
/// reached; an evicted row that is still in the sheet is treated as new again.
pub struct SeenSet {
    cache: LruCache<String, ()>,
    evictions: u64,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            evictions: 0,
        }
    }

    /// Whether `fingerprint` was seen. A hit refreshes its recency.
    pub fn seen(&mut self, fingerprint: &str) -> bool {
        self.cache.get(fingerprint).is_some()
    }

    /// Remember `fingerprint`, evicting the stalest entry when full.
    pub fn mark_seen(&mut self, fingerprint: impl Into<String>) {
        let fingerprint = fingerprint.into();
        if self.cache.contains(&fingerprint) {
            self.cache.promote(&fingerprint);
            return;
        }
        if self.cache.push(fingerprint, ()).is_some() {
            self.evictions += 1;
        }
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linea_core::NormalizedRow;

    fn row(values: &[(&str, &str)]) -> NormalizedRow {
        values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn fingerprint_ignores_non_required_columns() {
        let a = row(&[("Planta", "Lima"), ("Batch", "B1"), ("Usuario", "ana"), ("id_origen", "1")]);
        let b = row(&[("Batch", "B1"), ("Planta", "Lima"), ("Usuario", "luis")]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_differs_on_any_required_field() {
        let base = row(&[("Planta", "Lima"), ("Batch", "B1")]);
        let changed = row(&[("Planta", "Lima"), ("Batch", "B2")]);
        assert_ne!(fingerprint(&base), fingerprint(&changed));
    }

    #[test]
    fn fingerprint_has_no_delimiter_collisions() {
        let a = row(&[("Planta", "a|b"), ("Periodo", "c")]);
        let b = row(&[("Planta", "a"), ("Periodo", "b|c")]);
        assert_ne!(fingerprint(&a), fingerprint(&b));

        let c = row(&[("Planta", "1:x"), ("Periodo", "")]);
        let d = row(&[("Planta", ""), ("Periodo", "1:x")]);
        assert_ne!(fingerprint(&c), fingerprint(&d));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = fingerprint(&row(&[]));
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn seen_and_mark() {
        let mut seen = SeenSet::new(10);
        assert!(!seen.seen("a"));
        seen.mark_seen("a");
        assert!(seen.seen("a"));
        seen.mark_seen("a");
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn bounded_with_oldest_eviction() {
        let mut seen = SeenSet::new(2);
        seen.mark_seen("a");
        seen.mark_seen("b");
        assert!(seen.seen("a")); // refresh "a", "b" is now oldest
        seen.mark_seen("c");

        assert_eq!(seen.len(), 2);
        assert_eq!(seen.evictions(), 1);
        assert!(seen.seen("a"));
        assert!(!seen.seen("b"));
        assert!(seen.seen("c"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let seen = SeenSet::new(0);
        assert_eq!(seen.capacity(), 1);
        assert!(seen.is_empty());
    }
}
