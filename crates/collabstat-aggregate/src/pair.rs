//! Unordered pair keys and the weight maps built on them
//!
//! `(X, Y)` and `(Y, X)` compare and hash equal, so a map keyed by
//! `UnorderedPair` resolves either orientation to the single stored entry.
//! The stored key keeps the orientation it was first inserted with.

use indexmap::{Equivalent, IndexMap};
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{PoisonError, RwLock};

/// Insertion-ordered map with the Fx hasher
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Pair of names whose equality ignores orientation
#[derive(Debug, Clone)]
pub struct UnorderedPair {
    first: String,
    second: String,
}

/// Pair of entity names, keyed in first-inserted orientation
pub type EntityPair = UnorderedPair;

impl UnorderedPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        UnorderedPair {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// The same pair in the opposite orientation
    pub fn swapped(&self) -> Self {
        UnorderedPair::new(self.second.clone(), self.first.clone())
    }

    pub fn as_pair_ref(&self) -> PairRef<'_> {
        PairRef::new(&self.first, &self.second)
    }
}

impl PartialEq for UnorderedPair {
    fn eq(&self, other: &Self) -> bool {
        self.as_pair_ref().matches(&other.first, &other.second)
    }
}

impl Eq for UnorderedPair {}

impl Hash for UnorderedPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_pair_ref().hash(state);
    }
}

impl fmt::Display for UnorderedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// Borrowed lookup key; avoids allocating on the accumulation hot path
#[derive(Debug, Clone, Copy)]
pub struct PairRef<'a> {
    first: &'a str,
    second: &'a str,
}

impl<'a> PairRef<'a> {
    pub fn new(first: &'a str, second: &'a str) -> Self {
        PairRef { first, second }
    }

    fn matches(&self, first: &str, second: &str) -> bool {
        (self.first == first && self.second == second)
            || (self.first == second && self.second == first)
    }

    pub fn to_owned_pair(&self) -> UnorderedPair {
        UnorderedPair::new(self.first, self.second)
    }
}

impl Hash for PairRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash in sorted order so both orientations land in the same bucket
        let (lo, hi) = if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        };
        lo.hash(state);
        hi.hash(state);
    }
}

impl Equivalent<UnorderedPair> for PairRef<'_> {
    fn equivalent(&self, key: &UnorderedPair) -> bool {
        self.matches(&key.first, &key.second)
    }
}

/// Accumulated weight per unordered entity pair
///
/// Iteration follows insertion order, which makes matrix rendering
/// reproducible for maps built by a single thread.
#[derive(Debug, Clone, Default)]
pub struct EntityPairWeightMap {
    weights: FxIndexMap<EntityPair, i64>,
}

impl EntityPairWeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `weight` to the pair `(first, second)`.
    ///
    /// Accumulates into whichever orientation is already stored; when the pair
    /// is new it is inserted as given.
    pub fn add(&mut self, first: &str, second: &str, weight: i64) {
        let key = PairRef::new(first, second);
        if let Some(total) = self.weights.get_mut(&key) {
            *total += weight;
        } else {
            self.weights.insert(key.to_owned_pair(), weight);
        }
    }

    fn add_pair(&mut self, pair: &EntityPair, weight: i64) {
        if let Some(total) = self.weights.get_mut(pair) {
            *total += weight;
        } else {
            self.weights.insert(pair.clone(), weight);
        }
    }

    /// Stored weight for the pair in either orientation
    pub fn get(&self, first: &str, second: &str) -> Option<i64> {
        self.weights.get(&PairRef::new(first, second)).copied()
    }

    /// Stored weight, or 0 when the pair was never seen
    pub fn weight(&self, first: &str, second: &str) -> i64 {
        self.get(first, second).unwrap_or(0)
    }

    /// The key as stored, revealing which orientation won
    pub fn stored_key(&self, first: &str, second: &str) -> Option<&EntityPair> {
        self.weights
            .get_key_value(&PairRef::new(first, second))
            .map(|(k, _)| k)
    }

    /// Merge another map into this one, entry by entry, with the same
    /// orientation rule as `add`.
    pub fn merge_from(&mut self, other: &EntityPairWeightMap) {
        for (pair, weight) in other.iter() {
            self.add_pair(pair, weight);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityPair, i64)> + '_ {
        self.weights.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityPair> + '_ {
        self.weights.keys()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_weight(&self) -> i64 {
        self.weights.values().sum()
    }
}

impl FromIterator<(EntityPair, i64)> for EntityPairWeightMap {
    fn from_iter<T: IntoIterator<Item = (EntityPair, i64)>>(iter: T) -> Self {
        let mut map = EntityPairWeightMap::new();
        for (pair, weight) in iter {
            map.add_pair(&pair, weight);
        }
        map
    }
}

/// Weight map shared by concurrently running category tasks
///
/// Every merge holds the write lock for its whole batch, so the
/// exact-key / swapped-key / insert decision for each entry is atomic with
/// respect to other writers.
#[derive(Debug, Default)]
pub struct SharedWeightMap {
    inner: RwLock<EntityPairWeightMap>,
}

impl SharedWeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a finished per-category map
    pub fn merge(&self, part: &EntityPairWeightMap) {
        // Each upsert is one map operation, so a poisoned map is still consistent
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.merge_from(part);
        tracing::debug!("Merged {} pairs, global map now holds {}", part.len(), inner.len());
    }

    pub fn weight(&self, first: &str, second: &str) -> i64 {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.weight(first, second)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> EntityPairWeightMap {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.clone()
    }

    pub fn into_inner(self) -> EntityPairWeightMap {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_pair_equality_ignores_orientation() {
        let ab = UnorderedPair::new("A", "B");
        let ba = UnorderedPair::new("B", "A");
        assert_eq!(ab, ba);
        assert_ne!(ab, UnorderedPair::new("A", "C"));
        assert_eq!(ab.swapped().first(), "B");
    }

    #[test]
    fn test_add_keeps_first_orientation() {
        let mut map = EntityPairWeightMap::new();
        map.add("Alpha", "Beta", 3);
        map.add("Beta", "Alpha", 4);
        map.add("Alpha", "Beta", 1);

        assert_eq!(map.len(), 1);
        assert_eq!(map.weight("Beta", "Alpha"), 8);
        let key = map.stored_key("Beta", "Alpha").unwrap();
        assert_eq!((key.first(), key.second()), ("Alpha", "Beta"));
    }

    #[test]
    fn test_missing_pair_is_zero() {
        let mut map = EntityPairWeightMap::new();
        map.add("A", "B", 2);
        assert_eq!(map.weight("A", "C"), 0);
        assert_eq!(map.get("C", "A"), None);
    }

    #[test]
    fn test_merge_opposite_orientations_sums_into_one_entry() {
        let mut left = EntityPairWeightMap::new();
        left.add("X", "Y", 5);
        let mut right = EntityPairWeightMap::new();
        right.add("Y", "X", 7);

        let mut global = EntityPairWeightMap::new();
        global.merge_from(&left);
        global.merge_from(&right);

        assert_eq!(global.len(), 1);
        assert_eq!(global.weight("X", "Y"), 12);
        let key = global.stored_key("Y", "X").unwrap();
        assert_eq!(key.first(), "X");
    }

    #[test]
    fn test_merge_inserts_new_pairs_as_is() {
        let mut part = EntityPairWeightMap::new();
        part.add("Q", "P", 1);

        let mut global = EntityPairWeightMap::new();
        global.merge_from(&part);

        let key = global.stored_key("P", "Q").unwrap();
        assert_eq!((key.first(), key.second()), ("Q", "P"));
    }

    #[test]
    fn test_shared_map_concurrent_merges() {
        let shared = Arc::new(SharedWeightMap::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                let mut part = EntityPairWeightMap::new();
                // Alternate orientation per thread
                if i % 2 == 0 {
                    part.add("A", "B", 1);
                } else {
                    part.add("B", "A", 1);
                }
                part.add("C", &format!("D{}", i), 2);
                shared.merge(&part);
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let global = Arc::try_unwrap(shared).unwrap().into_inner();
        assert_eq!(global.weight("A", "B"), 8);
        assert_eq!(global.len(), 9);
        assert_eq!(global.total_weight(), 8 + 16);
    }
}
