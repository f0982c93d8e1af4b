use std::collections::hash_map::Entry;
use std::collections::HashMap;

use flamecache_labels::{LabelHash, LabelSet};
use thiserror::Error;

/// Identifies what a sample measures, e.g. CPU time or allocated bytes.
pub type SampleType = i64;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CacheError {
    #[error("labels {incoming} collide with {existing} at hash {hash:#018x} for sample type {sample_type}")]
    HashCollision {
        sample_type: SampleType,
        hash: LabelHash,
        existing: LabelSet,
        incoming: LabelSet,
    },
}

/// A cached value together with the labels identifying its series.
#[derive(Debug)]
pub struct CacheEntry<T> {
    labels: LabelSet,
    hash: LabelHash,
    pub value: T,
}

impl<T> CacheEntry<T> {
    pub fn new(labels: &LabelSet, value: T) -> Self {
        Self::with_hash(labels, labels.hash(), value)
    }

    /// Keeps a copy of `labels`, never the caller's set itself.
    pub fn with_hash(labels: &LabelSet, hash: LabelHash, value: T) -> Self {
        CacheEntry {
            labels: labels.copy(),
            hash,
            value,
        }
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn hash(&self) -> LabelHash {
        self.hash
    }

    pub fn into_parts(self) -> (LabelSet, LabelHash, T) {
        (self.labels, self.hash, self.value)
    }
}

/// Two level index: sample type -> label hash -> entry.
///
/// Holds at most one entry per (sample type, hash). A sample type only has a
/// bucket while it has entries, so memory follows the active series rather
/// than every series ever seen.
///
/// When a hash is already taken, the stored labels are compared with the
/// incoming ones (in any order). A mismatch is a [`CacheError::HashCollision`]
/// and the cache is left as it was.
#[derive(Debug)]
pub struct LabelsCache<T> {
    buckets: HashMap<SampleType, HashMap<LabelHash, CacheEntry<T>>>,
}

impl<T> Default for LabelsCache<T> {
    fn default() -> Self {
        LabelsCache {
            buckets: HashMap::new(),
        }
    }
}

impl<T> LabelsCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_tree(
        &mut self,
        sample_type: SampleType,
        labels: &LabelSet,
    ) -> Result<&mut CacheEntry<T>, CacheError>
    where
        T: Default,
    {
        self.get_or_create_tree_with(sample_type, labels, labels.hash(), T::default)
    }

    /// Same as [`LabelsCache::get_or_create_tree`] with a hash computed
    /// upstream, e.g. while decoding the labels.
    pub fn get_or_create_tree_by_hash(
        &mut self,
        sample_type: SampleType,
        labels: &LabelSet,
        hash: LabelHash,
    ) -> Result<&mut CacheEntry<T>, CacheError>
    where
        T: Default,
    {
        self.get_or_create_tree_with(sample_type, labels, hash, T::default)
    }

    /// Returns the entry at (`sample_type`, `hash`), creating it with `init`
    /// and a copy of `labels` if absent.
    pub fn get_or_create_tree_with<F>(
        &mut self,
        sample_type: SampleType,
        labels: &LabelSet,
        hash: LabelHash,
        init: F,
    ) -> Result<&mut CacheEntry<T>, CacheError>
    where
        F: FnOnce() -> T,
    {
        match self.buckets.entry(sample_type).or_default().entry(hash) {
            Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                if !entry.labels.same_series(labels) {
                    return Err(CacheError::HashCollision {
                        sample_type,
                        hash,
                        existing: entry.labels.clone(),
                        incoming: labels.copy(),
                    });
                }
                Ok(entry)
            }
            Entry::Vacant(vacant) => Ok(vacant.insert(CacheEntry::with_hash(labels, hash, init()))),
        }
    }

    pub fn get(&self, sample_type: SampleType, hash: LabelHash) -> Option<&CacheEntry<T>> {
        self.buckets.get(&sample_type)?.get(&hash)
    }

    pub fn get_mut(&mut self, sample_type: SampleType, hash: LabelHash) -> Option<&mut CacheEntry<T>> {
        self.buckets.get_mut(&sample_type)?.get_mut(&hash)
    }

    /// Inserts `entry` under its own hash, returning the entry it replaced.
    pub fn put(&mut self, sample_type: SampleType, entry: CacheEntry<T>) -> Option<CacheEntry<T>> {
        self.buckets
            .entry(sample_type)
            .or_default()
            .insert(entry.hash, entry)
    }

    /// Removes an entry, and its sample type bucket once that is empty.
    pub fn remove(&mut self, sample_type: SampleType, hash: LabelHash) -> Option<CacheEntry<T>> {
        let bucket = self.buckets.get_mut(&sample_type)?;
        let removed = bucket.remove(&hash);
        if bucket.is_empty() {
            self.buckets.remove(&sample_type);
        }
        removed
    }

    /// Number of entries across all sample types.
    pub fn len(&self) -> usize {
        self.buckets.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn contains_sample_type(&self, sample_type: SampleType) -> bool {
        self.buckets.contains_key(&sample_type)
    }

    pub fn sample_types(&self) -> impl Iterator<Item = SampleType> + '_ {
        self.buckets.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SampleType, &CacheEntry<T>)> + '_ {
        self.buckets.iter().flat_map(|(sample_type, bucket)| {
            bucket.values().map(move |entry| (*sample_type, entry))
        })
    }

    /// Removes and yields every entry, leaving the cache empty.
    pub fn drain(&mut self) -> impl Iterator<Item = (SampleType, CacheEntry<T>)> + '_ {
        self.buckets.drain().flat_map(|(sample_type, bucket)| {
            bucket.into_values().map(move |entry| (sample_type, entry))
        })
    }
}
