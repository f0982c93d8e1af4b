use std::fmt::{Display, Formatter};

use itertools::Itertools;
use thiserror::Error;

use crate::hash::hash_labels;
use crate::{Label, LabelHash};

#[derive(Debug, Error, Eq, PartialEq)]
pub enum LabelError {
    #[error("label index {index} out of bounds for a set of {len} labels")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Ordered labels identifying a profile series (service, job, ...).
///
/// The storage order is kept as given, but series identity is
/// order-insensitive: two sets holding the same labels in a different order
/// hash identically and are the [`LabelSet::same_series`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LabelSet {
    labels: Vec<Label>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: Label) {
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.labels.iter()
    }

    /// Index of the first label with the given key.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.labels.iter().position(|label| label.key == key)
    }

    /// Returns a fully independent copy. Cache entries keep one of these so
    /// later changes to the caller's set are never observed.
    pub fn copy(&self) -> LabelSet {
        self.clone()
    }

    /// Returns a copy without the label at `index`, keeping the relative
    /// order of the rest.
    pub fn cut_at(&self, index: usize) -> Result<LabelSet, LabelError> {
        if index >= self.labels.len() {
            return Err(LabelError::IndexOutOfBounds {
                index,
                len: self.labels.len(),
            });
        }

        let mut labels = Vec::with_capacity(self.labels.len() - 1);
        for (i, label) in self.labels.iter().enumerate() {
            if i != index {
                labels.push(label.clone());
            }
        }
        Ok(LabelSet { labels })
    }

    /// Content hash used as a cache key. Independent of label order.
    pub fn hash(&self) -> LabelHash {
        hash_labels(self.labels.iter().sorted())
    }

    /// Whether both sets hold the same labels, in any order.
    pub fn same_series(&self, other: &LabelSet) -> bool {
        self.labels.len() == other.labels.len()
            && self.labels.iter().sorted().eq(other.labels.iter().sorted())
    }
}

impl From<Vec<Label>> for LabelSet {
    fn from(labels: Vec<Label>) -> Self {
        LabelSet { labels }
    }
}

impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        LabelSet {
            labels: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl Display for LabelSet {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{{{}}}", self.labels.iter().join(", "))
    }
}
