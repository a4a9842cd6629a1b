use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{BoundingBox, Geocache};

/// Counts from a single `merge` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Session-lifetime collection of geocache summaries, keyed by code.
///
/// Entries are only ever inserted or overwritten; the store never shrinks.
/// Snapshots list entries in first-insertion order and an overwrite keeps
/// the entry's original position.
#[derive(Debug, Default)]
pub struct GeocacheStore {
    entries: Vec<Geocache>,
    index: HashMap<String, usize>,
    last_merged_at: Option<DateTime<Utc>>,
}

impl GeocacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite each entry by code (last merge wins).
    pub fn merge<I>(&mut self, entries: I) -> MergeStats
    where
        I: IntoIterator<Item = (String, Geocache)>,
    {
        let mut stats = MergeStats::default();
        for (code, geocache) in entries {
            match self.index.get(&code) {
                Some(&slot) => {
                    self.entries[slot] = geocache;
                    stats.updated += 1;
                }
                None => {
                    self.index.insert(code, self.entries.len());
                    self.entries.push(geocache);
                    stats.inserted += 1;
                }
            }
        }
        self.last_merged_at = Some(Utc::now());
        stats
    }

    /// Current values, in first-insertion order.
    pub fn snapshot(&self) -> Vec<Geocache> {
        self.entries.clone()
    }

    pub fn get(&self, code: &str) -> Option<&Geocache> {
        self.index.get(code).map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Geocache> {
        self.entries.iter()
    }

    /// Entries whose location lies inside `bbox`.
    pub fn within<'a>(&'a self, bbox: &'a BoundingBox) -> impl Iterator<Item = &'a Geocache> + 'a {
        self.entries.iter().filter(move |g| bbox.contains(&g.location))
    }

    pub fn last_merged_at(&self) -> Option<DateTime<Utc>> {
        self.last_merged_at
    }

    pub fn age_minutes(&self) -> Option<i64> {
        self.last_merged_at
            .map(|at| (Utc::now() - at).num_minutes())
    }

    /// Human readable age of the most recent merge ("never" before the first).
    pub fn age_display(&self) -> String {
        match self.age_minutes() {
            None => "never".to_string(),
            Some(minutes) => format_age(minutes),
        }
    }
}

fn format_age(minutes: i64) -> String {
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        format!("{}d ago", minutes / 1440)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeocacheStatus, GeocacheType, Location};

    fn cache(code: &str, name: &str) -> Geocache {
        Geocache {
            code: code.to_string(),
            name: name.to_string(),
            location: Location::new(50.0, 18.0),
            status: GeocacheStatus::Available,
            kind: GeocacheType::Traditional,
        }
    }

    fn batch(items: &[(&str, &str)]) -> Vec<(String, Geocache)> {
        items
            .iter()
            .map(|(code, name)| (code.to_string(), cache(code, name)))
            .collect()
    }

    #[test]
    fn test_merge_inserts() {
        let mut store = GeocacheStore::new();
        assert!(store.is_empty());
        assert_eq!(store.age_display(), "never");

        let stats = store.merge(batch(&[("GC1", "One"), ("GC2", "Two")]));
        assert_eq!(stats, MergeStats { inserted: 2, updated: 0 });
        assert_eq!(store.len(), 2);
        assert!(store.contains("GC1"));
        assert_eq!(store.get("GC2").map(|g| g.name.as_str()), Some("Two"));
        assert_eq!(store.age_display(), "just now");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = GeocacheStore::new();
        once.merge(batch(&[("GC1", "One"), ("GC2", "Two")]));

        let mut twice = GeocacheStore::new();
        twice.merge(batch(&[("GC1", "One"), ("GC2", "Two")]));
        let stats = twice.merge(batch(&[("GC1", "One"), ("GC2", "Two")]));

        assert_eq!(stats, MergeStats { inserted: 0, updated: 2 });
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn test_merge_commutes_on_disjoint_keys() {
        let a = batch(&[("GC1", "One")]);
        let b = batch(&[("GC2", "Two")]);

        let mut ab = GeocacheStore::new();
        ab.merge(a.clone());
        ab.merge(b.clone());

        let mut ba = GeocacheStore::new();
        ba.merge(b);
        ba.merge(a);

        let mut left = ab.snapshot();
        let mut right = ba.snapshot();
        left.sort_by(|x, y| x.code.cmp(&y.code));
        right.sort_by(|x, y| x.code.cmp(&y.code));
        assert_eq!(left, right);
    }

    #[test]
    fn test_merge_overwrites_by_code() {
        let mut store = GeocacheStore::new();
        store.merge(batch(&[("C", "X")]));
        store.merge(batch(&[("C", "Y")]));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].code, "C");
        assert_eq!(snapshot[0].name, "Y");
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let mut store = GeocacheStore::new();
        store.merge(batch(&[("A", "a")]));
        store.merge(batch(&[("B", "b")]));
        store.merge(batch(&[("A", "a2"), ("C", "c")]));

        let codes: Vec<String> = store.snapshot().into_iter().map(|g| g.code).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
        assert_eq!(store.get("A").map(|g| g.name.as_str()), Some("a2"));
    }

    #[test]
    fn test_merge_keeps_previous_non_overlapping_codes() {
        let mut store = GeocacheStore::new();
        store.merge(batch(&[("OLD", "old")]));
        store.merge(batch(&[("GC1", "one"), ("GC2", "two")]));

        let mut codes: Vec<String> = store.iter().map(|g| g.code.clone()).collect();
        codes.sort();
        assert_eq!(codes, vec!["GC1", "GC2", "OLD"]);
    }

    #[test]
    fn test_within() {
        let mut store = GeocacheStore::new();
        let mut far = cache("FAR", "far");
        far.location = Location::new(10.0, 10.0);
        store.merge(vec![("NEAR".to_string(), cache("NEAR", "near")), ("FAR".to_string(), far)]);

        let bbox = BoundingBox::new(49.0, 17.0, 51.0, 19.0);
        let inside: Vec<&str> = store.within(&bbox).map(|g| g.code.as_str()).collect();
        assert_eq!(inside, vec!["NEAR"]);
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(-3), "just now");
        assert_eq!(format_age(0), "just now");
        assert_eq!(format_age(5), "5m ago");
        assert_eq!(format_age(89), "1h ago");
        assert_eq!(format_age(90), "2h ago");
        assert_eq!(format_age(3000), "2d ago");
    }
}
