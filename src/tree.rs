mod iter;
mod node;

pub use iter::Iter;
pub use node::Node;

use std::fmt;

use allocator_api2::alloc::{Allocator, Global};
use allocator_api2::collections::{TryReserveError, TryReserveErrorKind};
use itertools::Itertools;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum InsertError {
    #[error("allocator could not provide memory for the call tree")]
    AllocationFailed,
    #[error("call tree capacity overflow")]
    CapacityOverflow,
    #[error("call tree total would exceed u64::MAX")]
    WeightOverflow,
}

impl From<TryReserveError> for InsertError {
    fn from(err: TryReserveError) -> InsertError {
        match err.kind() {
            TryReserveErrorKind::CapacityOverflow => InsertError::CapacityOverflow,
            TryReserveErrorKind::AllocError { .. } => InsertError::AllocationFailed,
        }
    }
}

/// Weighted prefix tree over stack frames, the aggregation unit for one
/// (sample type, label set) series.
///
/// Nodes are allocated with `A`. The default is the global heap; a tree
/// created with [`CallTree::new_in`] over a [`crate::region::Region`]
/// allocator borrows the region and every node lives as long as it does.
pub struct CallTree<A: Allocator = Global> {
    root: Node<A>,
    alloc: A,
}

impl CallTree<Global> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl Default for CallTree<Global> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Allocator + Clone> CallTree<A> {
    pub fn new_in(alloc: A) -> Self {
        CallTree {
            root: Node::root_in(alloc.clone()),
            alloc,
        }
    }

    /// Adds `weight` along `stack`, ordered from the outermost frame to the
    /// innermost one. Missing frames are created in sorted position.
    ///
    /// New nodes are built and room for them is reserved before any counter
    /// changes, so on error the tree is exactly as it was before the call.
    /// Zero-weight insertions are no-ops and never create nodes. No node
    /// total exceeds the root's, so checking the root is enough to rule out
    /// overflow anywhere on the path.
    pub fn insert<S: AsRef<[u8]>>(&mut self, stack: &[S], weight: u64) -> Result<(), InsertError> {
        if weight == 0 {
            return Ok(());
        }
        self.root
            .total()
            .checked_add(weight)
            .ok_or(InsertError::WeightOverflow)?;

        let depth = self.root.existing_depth(stack);
        let mut suffix = Node::try_new_chain_in(&stack[depth..], weight, &self.alloc)?;
        if suffix.is_some() {
            self.root.descend_mut(&stack[..depth]).reserve_child()?;
        }

        let mut node = &mut self.root;
        for name in stack {
            node.add_weight(weight);
            match node.search(name.as_ref()) {
                Ok(i) => node = node.child_at_mut(i),
                Err(i) => {
                    if let Some(chain) = suffix.take() {
                        node.insert_child(i, chain);
                    }
                    return Ok(());
                }
            }
        }

        node.add_self_weight(weight);
        Ok(())
    }

    /// Merges another tree, possibly built with a different allocator, into
    /// this one. On allocation failure the Total/Self invariants still hold
    /// but only part of `other` has been added. A merge whose total would
    /// not fit in a `u64` is refused before anything changes.
    pub fn merge<B: Allocator>(&mut self, other: &CallTree<B>) -> Result<(), InsertError> {
        self.root
            .total()
            .checked_add(other.total())
            .ok_or(InsertError::WeightOverflow)?;
        self.root.try_merge(&other.root, &self.alloc)?;
        Ok(())
    }
}

impl<A: Allocator> CallTree<A> {
    pub fn root(&self) -> &Node<A> {
        &self.root
    }

    /// Sum of all inserted weights.
    pub fn total(&self) -> u64 {
        self.root.total()
    }

    pub fn is_empty(&self) -> bool {
        self.root.total() == 0 && self.root.children().is_empty()
    }

    /// Pre-order walk in sorted order, root included.
    pub fn iter(&self) -> Iter<'_, A> {
        Iter::new(&self.root)
    }

    /// Number of frames in the tree, not counting the root.
    pub fn node_count(&self) -> usize {
        self.iter().count() - 1
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Copies the whole tree into another allocator.
    pub fn try_clone_in<B: Allocator + Clone>(&self, alloc: B) -> Result<CallTree<B>, InsertError> {
        Ok(CallTree {
            root: self.root.try_clone_in(alloc.clone())?,
            alloc,
        })
    }

    /// Calls `f` with the full stack and self weight of every node that
    /// terminated at least one insertion, in sorted order. Samples with an
    /// empty stack are reported with an empty path.
    pub fn walk_stacks<F>(&self, mut f: F)
    where
        F: FnMut(&[&[u8]], u64),
    {
        fn walk<'t, A: Allocator, F: FnMut(&[&[u8]], u64)>(
            node: &'t Node<A>,
            path: &mut Vec<&'t [u8]>,
            f: &mut F,
        ) {
            for child in node.children() {
                path.push(child.name());
                if child.self_value() > 0 {
                    f(path.as_slice(), child.self_value());
                }
                walk(child, path, f);
                path.pop();
            }
        }

        if self.root.self_value() > 0 {
            f(&[], self.root.self_value());
        }
        let mut path = Vec::new();
        walk(&self.root, &mut path, &mut f);
    }

    /// Collapsed-stack lines (`a;b;c 42`), one per stack with self weight,
    /// as consumed by flamegraph renderers. Empty stacks are left out.
    pub fn fold(&self) -> String {
        let mut lines = Vec::new();
        self.walk_stacks(|path, self_value| {
            if path.is_empty() {
                return;
            }
            let stack = path
                .iter()
                .map(|name| String::from_utf8_lossy(name))
                .join(";");
            lines.push(format!("{stack} {self_value}"));
        });
        lines.join("\n")
    }
}

impl<A: Allocator, B: Allocator> PartialEq<CallTree<B>> for CallTree<A> {
    fn eq(&self, other: &CallTree<B>) -> bool {
        self.root == other.root
    }
}

impl<A: Allocator> fmt::Debug for CallTree<A> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("CallTree")
            .field("root", &self.root)
            .finish()
    }
}
