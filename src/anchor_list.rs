//! Distance-sorted lists of training points, one per anchor.

use std::cmp::Ordering;

/// A training point's distance to some reference point.
///
/// Used both for the per-anchor lists (distance to the anchor) and for the
/// neighbors found by a query (distance to the query point).
#[derive(Debug, Clone, Copy)]
pub struct AnchorEntry {
    pub distance: f64,
    pub index: usize,
}

impl AnchorEntry {
    pub fn new(index: usize, distance: f64) -> Self {
        Self { distance, index }
    }
}

impl PartialEq for AnchorEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AnchorEntry {}

impl PartialOrd for AnchorEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Ascending distance, then ascending index.
impl Ord for AnchorEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.index.cmp(&other.index))
    }
}

/// Entries kept in ascending `(distance, index)` order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorList {
    entries: Vec<AnchorEntry>,
}

impl AnchorList {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Sort a full set of entries in one go.
    pub fn from_unsorted(mut entries: Vec<AnchorEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Insert at the sorted position, after any entry that compares equal.
    ///
    /// Returns the position the entry landed at.
    pub fn insert(&mut self, entry: AnchorEntry) -> usize {
        let pos = self.entries.partition_point(|e| *e <= entry);
        self.entries.insert(pos, entry);
        pos
    }

    /// Keep only the first `len` entries.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn get(&self, pos: usize) -> Option<&AnchorEntry> {
        self.entries.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorEntry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[AnchorEntry] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<AnchorEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_order() {
        let mut list = AnchorList::new();
        list.insert(AnchorEntry::new(0, 3.0));
        list.insert(AnchorEntry::new(1, 1.0));
        list.insert(AnchorEntry::new(2, 2.0));

        let distances: Vec<f64> = list.iter().map(|e| e.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_equal_distances_keep_insertion_order() {
        let mut list = AnchorList::new();
        list.insert(AnchorEntry::new(0, 1.0));
        list.insert(AnchorEntry::new(1, 1.0));
        let pos = list.insert(AnchorEntry::new(2, 1.0));

        assert_eq!(pos, 2);
        let indices: Vec<usize> = list.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_from_unsorted_matches_incremental() {
        let entries = vec![
            AnchorEntry::new(0, 0.0),
            AnchorEntry::new(1, 5.0),
            AnchorEntry::new(2, 2.5),
            AnchorEntry::new(3, 2.5),
            AnchorEntry::new(4, 1.0),
        ];

        let mut incremental = AnchorList::new();
        for e in &entries {
            incremental.insert(*e);
        }

        assert_eq!(AnchorList::from_unsorted(entries), incremental);
    }

    #[test]
    fn test_truncate() {
        let mut list = AnchorList::from_unsorted(vec![
            AnchorEntry::new(0, 4.0),
            AnchorEntry::new(1, 1.0),
            AnchorEntry::new(2, 3.0),
        ]);
        list.truncate(2);
        assert_eq!(list.len(), 2);
        assert_eq!(list.get(1).map(|e| e.index), Some(2));
    }
}
