use std::borrow::Cow;
use std::fmt;

use allocator_api2::alloc::{Allocator, Global};
use bumpalo::Bump;
use flamecache_labels::{LabelHash, LabelSet};
use thiserror::Error;
use tracing::{debug, span, warn, Level};

use crate::cache::{CacheEntry, CacheError, LabelsCache, SampleType};
use crate::region::Region;
use crate::sample::Sample;
use crate::tree::{CallTree, InsertError};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum IngestError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Insert(#[from] InsertError),
}

#[derive(Debug, Clone, Default)]
pub struct WindowConfig {
    /// Label keys removed before a sample's series identity is computed,
    /// such as internal bookkeeping labels.
    pub dropped_label_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct WindowStats {
    pub samples: u64,
    pub weight: u64,
    pub failed_samples: u64,
}

impl fmt::Display for WindowStats {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "samples={}, weight={}, failed_samples={}",
            self.samples, self.weight, self.failed_samples
        )
    }
}

/// A finished series, handed to storage at flush.
#[derive(Debug)]
pub struct FlushedTree<A: Allocator = Global> {
    pub sample_type: SampleType,
    pub hash: LabelHash,
    pub labels: LabelSet,
    pub tree: CallTree<A>,
}

/// Aggregation state for one time window: a [`LabelsCache`] of call trees
/// plus the allocator those trees are built with.
///
/// A window over a [`Region`] borrows it, so the region can only be reset
/// once the window has been flushed and every flushed tree dropped.
pub struct AggregationWindow<A: Allocator + Clone = Global> {
    config: WindowConfig,
    cache: LabelsCache<CallTree<A>>,
    alloc: A,
    stats: WindowStats,
}

impl AggregationWindow<Global> {
    pub fn new(config: WindowConfig) -> Self {
        Self::new_in(Global, config)
    }
}

impl<'r> AggregationWindow<&'r Bump> {
    pub fn in_region(region: &'r Region, config: WindowConfig) -> Self {
        Self::new_in(region.allocator(), config)
    }
}

impl<A: Allocator + Clone> AggregationWindow<A> {
    pub fn new_in(alloc: A, config: WindowConfig) -> Self {
        AggregationWindow {
            config,
            cache: LabelsCache::new(),
            alloc,
            stats: WindowStats::default(),
        }
    }

    /// Labels identifying the series of `labels`, with the configured keys
    /// cut out.
    pub fn series_labels<'l>(&self, labels: &'l LabelSet) -> Cow<'l, LabelSet> {
        let mut labels = Cow::Borrowed(labels);
        for key in &self.config.dropped_label_keys {
            while let Some(index) = labels.position(key) {
                match labels.cut_at(index) {
                    Ok(cut) => labels = Cow::Owned(cut),
                    Err(_) => break,
                }
            }
        }
        labels
    }

    /// Adds a sample to the tree of its series and returns the series hash.
    pub fn ingest(&mut self, sample: &Sample) -> Result<LabelHash, IngestError> {
        let labels = self.series_labels(&sample.labels);
        let hash = labels.hash();
        self.ingest_with_hash(
            sample.sample_type,
            &labels,
            hash,
            sample.stack.as_slice(),
            sample.weight,
        )?;
        Ok(hash)
    }

    /// Adds a stack to the series identified by `labels`, whose hash has
    /// already been computed. `labels` are used as given.
    pub fn ingest_with_hash<S: AsRef<[u8]>>(
        &mut self,
        sample_type: SampleType,
        labels: &LabelSet,
        hash: LabelHash,
        stack: &[S],
        weight: u64,
    ) -> Result<(), IngestError> {
        let existed = self.cache.get(sample_type, hash).is_some();
        let alloc = &self.alloc;
        let entry = match self.cache.get_or_create_tree_with(sample_type, labels, hash, || {
            CallTree::new_in(alloc.clone())
        }) {
            Ok(entry) => entry,
            Err(err) => {
                self.stats.failed_samples += 1;
                warn!("dropping sample for sample_type={}: {}", sample_type, err);
                return Err(err.into());
            }
        };

        if let Err(err) = entry.value.insert(stack, weight) {
            let abandoned = !existed && entry.value.is_empty();
            self.stats.failed_samples += 1;
            warn!(
                "dropping sample for sample_type={} labels={}: {}",
                sample_type, labels, err
            );
            if abandoned {
                self.cache.remove(sample_type, hash);
            }
            return Err(err.into());
        }

        self.stats.samples += 1;
        self.stats.weight = self.stats.weight.saturating_add(weight);
        Ok(())
    }

    /// Merges a whole tree, e.g. one read back from storage, into the series
    /// identified by `labels`.
    pub fn merge_tree<B: Allocator>(
        &mut self,
        sample_type: SampleType,
        labels: &LabelSet,
        tree: &CallTree<B>,
    ) -> Result<LabelHash, IngestError> {
        let labels = self.series_labels(labels).into_owned();
        let hash = labels.hash();
        let alloc = &self.alloc;
        let entry = self
            .cache
            .get_or_create_tree_with(sample_type, &labels, hash, || {
                CallTree::new_in(alloc.clone())
            })?;
        entry.value.merge(tree)?;
        Ok(hash)
    }

    pub fn get(&self, sample_type: SampleType, hash: LabelHash) -> Option<&CacheEntry<CallTree<A>>> {
        self.cache.get(sample_type, hash)
    }

    pub fn cache(&self) -> &LabelsCache<CallTree<A>> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LabelsCache<CallTree<A>> {
        &mut self.cache
    }

    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Ends the window, returning every series ordered by sample type and
    /// hash.
    pub fn flush(mut self) -> Vec<FlushedTree<A>> {
        let _span = span!(Level::DEBUG, "AggregationWindow.flush").entered();

        let mut flushed: Vec<FlushedTree<A>> = self
            .cache
            .drain()
            .map(|(sample_type, entry)| {
                let (labels, hash, tree) = entry.into_parts();
                FlushedTree {
                    sample_type,
                    hash,
                    labels,
                    tree,
                }
            })
            .collect();
        flushed.sort_by_key(|series| (series.sample_type, series.hash));

        debug!("flushed {} series, {}", flushed.len(), self.stats);
        flushed
    }
}
