//! Bounded cache of blind-merged-mining linking data.

use std::collections::{BTreeMap, VecDeque};

use drivechain_primitives::buf::Buf32;
use drivechain_primitives::sidechain::SIDECHAIN_MAX_LD;

/// FIFO-bounded multimap from critical hash to the heights it was seen at.
///
/// Insertion order is remembered separately so that overflow always evicts
/// the oldest surviving entry, one at a time. The same hash may be present
/// several times with different heights.
#[derive(Clone, Debug, Default)]
pub struct LinkingDataCache {
    entries: BTreeMap<Buf32, Vec<i32>>,
    order: VecDeque<Buf32>,
    len: usize,
}

impl LinkingDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Heights at which a critical hash was seen, oldest first.
    pub fn heights(&self, critical_hash: &Buf32) -> &[i32] {
        self.entries
            .get(critical_hash)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Remember a critical hash discovered at the given height.
    pub fn insert(&mut self, critical_hash: Buf32, height: i32) {
        self.order.push_back(critical_hash);
        self.entries.entry(critical_hash).or_default().push(height);
        self.len += 1;

        while self.len > SIDECHAIN_MAX_LD {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&mut self) {
        let Some(oldest) = self.order.pop_front() else {
            return;
        };
        if let Some(heights) = self.entries.get_mut(&oldest) {
            heights.remove(0);
            if heights.is_empty() {
                self.entries.remove(&oldest);
            }
            self.len -= 1;
        }
    }

    /// Copy of the cache as `(critical hash, height)` pairs, keyed order.
    pub fn to_vec(&self) -> Vec<(Buf32, i32)> {
        self.entries
            .iter()
            .flat_map(|(hash, heights)| heights.iter().map(|h| (*hash, *h)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use drivechain_primitives::buf::Buf32;
    use drivechain_primitives::sidechain::SIDECHAIN_MAX_LD;

    use super::LinkingDataCache;

    fn hash(n: u8) -> Buf32 {
        Buf32::from([n; 32])
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut cache = LinkingDataCache::new();
        cache.insert(hash(1), 10);
        cache.insert(hash(2), 11);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.heights(&hash(1)), &[10]);
        assert_eq!(cache.heights(&hash(3)), &[] as &[i32]);
    }

    #[test]
    fn test_duplicate_hash_keeps_both_heights() {
        let mut cache = LinkingDataCache::new();
        cache.insert(hash(1), 10);
        cache.insert(hash(1), 12);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.heights(&hash(1)), &[10, 12]);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut cache = LinkingDataCache::new();
        for i in 0..SIDECHAIN_MAX_LD {
            cache.insert(hash(i as u8), i as i32);
        }
        cache.insert(hash(200), 999);

        assert_eq!(cache.len(), SIDECHAIN_MAX_LD);
        assert!(cache.heights(&hash(0)).is_empty());
        assert_eq!(cache.heights(&hash(200)), &[999]);
    }

    #[test]
    fn test_overflow_evicts_oldest_height_of_duplicate() {
        let mut cache = LinkingDataCache::new();
        cache.insert(hash(1), 5);
        for i in 0..SIDECHAIN_MAX_LD {
            cache.insert(hash(1), 100 + i as i32);
        }

        assert_eq!(cache.len(), SIDECHAIN_MAX_LD);
        assert_eq!(cache.heights(&hash(1)).first(), Some(&100));
    }
}
