use bumpalo::Bump;
use thiserror::Error;

use crate::tree::CallTree;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum RegionError {
    #[error("could not reserve {bytes} bytes for the region")]
    Reserve { bytes: usize },
}

/// A call tree whose nodes live in a [`Region`].
pub type RegionTree<'r> = CallTree<&'r Bump>;

/// Bump-allocated memory shared by every tree built in one aggregation
/// window. Nodes are never freed one by one; [`Region::reset`] releases all
/// of them at once.
///
/// Trees borrow the region they allocate from, so the region cannot be reset
/// or dropped while any of them, or any window or reader holding them, is
/// still alive.
#[derive(Debug, Default)]
pub struct Region {
    bump: Bump,
    capacity: Option<usize>,
}

impl Region {
    /// A region that grows as needed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A region that reserves at least `bytes` up front and never grows past
    /// the block it reserved. Once exhausted, tree insertions fail with
    /// [`crate::tree::InsertError::AllocationFailed`].
    pub fn with_capacity(bytes: usize) -> Result<Self, RegionError> {
        let bump = Bump::try_with_capacity(bytes).map_err(|_| RegionError::Reserve { bytes })?;
        // The block is rounded up, and a limit below what is already held
        // would be ignored.
        let capacity = bump.allocated_bytes();
        bump.set_allocation_limit(Some(capacity));

        Ok(Region {
            bump,
            capacity: Some(capacity),
        })
    }

    /// Allocator handle to build trees with, see [`CallTree::new_in`].
    pub fn allocator(&self) -> &Bump {
        &self.bump
    }

    pub fn new_tree(&self) -> RegionTree<'_> {
        CallTree::new_in(&self.bump)
    }

    /// Bytes currently held from the system, including unused space in the
    /// current block. For a fixed region this is its whole block from the
    /// start, so it equals [`Region::capacity`] and says nothing about how
    /// much room is left.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    /// Hard cap of a fixed region: the size of the block actually reserved,
    /// which may be larger than the size requested. `None` for a growable
    /// region.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Releases every tree allocated so far. Keeps the most recent block for
    /// reuse by the next window.
    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::tree::InsertError;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_region_and_heap_trees_are_equal() {
        let region = Region::new();
        let mut region_tree = region.new_tree();
        let mut heap_tree = CallTree::new();

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let depth = rng.gen_range(0..10);
            let stack: Vec<String> = (0..depth)
                .map(|_| format!("frame_{}", rng.gen_range(0..8)))
                .collect();
            let weight = rng.gen_range(0..20);

            region_tree.insert(&stack, weight).unwrap();
            heap_tree.insert(&stack, weight).unwrap();
        }

        assert_eq!(region_tree, heap_tree);
        assert_eq!(region_tree.fold(), heap_tree.fold());
    }

    #[test]
    fn test_exhausted_region_leaves_tree_untouched() {
        let region = Region::with_capacity(4096).unwrap();
        let mut tree = region.new_tree();
        let mut mirror = CallTree::new();

        let mut failure = None;
        for i in 0..100_000 {
            let stack = ["main".to_string(), format!("handler_{i}"), format!("leaf_{i}")];
            match tree.insert(&stack, 1) {
                Ok(()) => mirror.insert(&stack, 1).unwrap(),
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }

        assert_eq!(failure, Some(InsertError::AllocationFailed));
        assert_eq!(tree, mirror);

        // Paths that already exist need no memory and still work.
        tree.insert(&["main", "handler_0", "leaf_0"], 5).unwrap();
        mirror.insert(&["main", "handler_0", "leaf_0"], 5).unwrap();
        assert_eq!(tree, mirror);
    }

    #[test]
    fn test_fixed_region_does_not_grow() {
        let region = Region::with_capacity(4096).unwrap();
        let capacity = region.capacity().unwrap();
        assert!(capacity >= 4096);
        assert_eq!(region.allocated_bytes(), capacity);

        let mut tree = region.new_tree();
        let mut failed = false;
        for i in 0..100_000 {
            if tree.insert(&[format!("frame_{i}")], 1).is_err() {
                failed = true;
                break;
            }
        }

        assert!(failed);
        assert_eq!(region.allocated_bytes(), capacity);
    }

    #[test]
    fn test_zero_capacity_region() {
        let region = Region::with_capacity(0).unwrap();
        let mut tree = region.new_tree();
        let empty: [&str; 0] = [];

        assert_eq!(tree.insert(&["a"], 1), Err(InsertError::AllocationFailed));
        tree.insert(&empty, 3).unwrap();
        assert_eq!(tree.total(), 3);
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn test_reset_allows_reuse() {
        let mut region = Region::new();
        {
            let mut tree = region.new_tree();
            tree.insert(&["a", "b", "c"], 1).unwrap();
            assert!(region.allocated_bytes() > 0);
        }
        region.reset();

        let mut tree = region.new_tree();
        tree.insert(&["x"], 2).unwrap();
        assert_eq!(tree.root().child(b"x").unwrap().self_value(), 2);
    }

    #[test]
    fn test_copy_between_region_and_heap() {
        let region = Region::new();
        let mut heap_tree = CallTree::new();
        heap_tree.insert(&["a", "b"], 3).unwrap();

        let mut region_tree = heap_tree.try_clone_in(region.allocator()).unwrap();
        assert_eq!(region_tree, heap_tree);

        region_tree.merge(&heap_tree).unwrap();
        assert_eq!(region_tree.total(), 6);
        assert_eq!(region.capacity(), None);
    }
}
