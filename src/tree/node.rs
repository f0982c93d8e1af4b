use std::fmt;

use allocator_api2::alloc::{Allocator, Global};
use allocator_api2::collections::TryReserveError;
use allocator_api2::vec::Vec as AllocVec;

/// One stack frame in a [`crate::tree::CallTree`].
///
/// `total` is the weight of every insertion that passed through this node and
/// `self_value` the weight of insertions that ended here, so
/// `total == self_value + sum(children.total)` always holds. Children are
/// strictly sorted by name.
pub struct Node<A: Allocator = Global> {
    name: AllocVec<u8, A>,
    total: u64,
    self_value: u64,
    children: AllocVec<Node<A>, A>,
}

impl<A: Allocator + Clone> Node<A> {
    pub(crate) fn root_in(alloc: A) -> Self {
        Node {
            name: AllocVec::new_in(alloc.clone()),
            total: 0,
            self_value: 0,
            children: AllocVec::new_in(alloc),
        }
    }

    pub(crate) fn try_new_in(name: &[u8], alloc: A) -> Result<Self, TryReserveError> {
        let mut bytes = AllocVec::new_in(alloc.clone());
        bytes.try_reserve_exact(name.len())?;
        bytes.extend_from_slice(name);

        Ok(Node {
            name: bytes,
            total: 0,
            self_value: 0,
            children: AllocVec::new_in(alloc),
        })
    }

    /// Builds the detached path for `frames`, bottom up, with every node
    /// already carrying `weight`. Nothing is linked to an existing tree, so a
    /// failure here leaves that tree untouched.
    pub(crate) fn try_new_chain_in<S: AsRef<[u8]>>(
        frames: &[S],
        weight: u64,
        alloc: &A,
    ) -> Result<Option<Self>, TryReserveError> {
        let Some((leaf, parents)) = frames.split_last() else {
            return Ok(None);
        };

        let mut node = Node::try_new_in(leaf.as_ref(), alloc.clone())?;
        node.total = weight;
        node.self_value = weight;

        for name in parents.iter().rev() {
            let mut parent = Node::try_new_in(name.as_ref(), alloc.clone())?;
            parent.children.try_reserve_exact(1)?;
            parent.children.push(node);
            parent.total = weight;
            node = parent;
        }

        Ok(Some(node))
    }

    /// Adds `other`'s weights into this node, walking both sorted child lists
    /// together. Counters are updated as each child completes, so if an
    /// allocation fails half way the invariants still hold and the tree holds
    /// a partial merge.
    pub(crate) fn try_merge<B: Allocator>(
        &mut self,
        other: &Node<B>,
        alloc: &A,
    ) -> Result<(), TryReserveError> {
        self.self_value += other.self_value;
        self.total += other.self_value;

        for child in other.children.iter() {
            match self.search(child.name()) {
                Ok(i) => {
                    let existing = &mut self.children[i];
                    let before = existing.total;
                    let merged = existing.try_merge(child, alloc);
                    let after = existing.total;
                    self.total += after - before;
                    merged?;
                }
                Err(i) => {
                    let copy = child.try_clone_in(alloc.clone())?;
                    self.children.try_reserve(1)?;
                    self.total += copy.total;
                    self.children.insert(i, copy);
                }
            }
        }

        Ok(())
    }
}

impl<A: Allocator> Node<A> {
    /// Frame name. Empty for the root.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn self_value(&self) -> u64 {
        self.self_value
    }

    /// Children sorted ascending by name.
    pub fn children(&self) -> &[Node<A>] {
        &self.children
    }

    pub fn child(&self, name: &[u8]) -> Option<&Node<A>> {
        self.search(name).ok().map(|i| &self.children[i])
    }

    /// Binary search over the sorted children. `Err` carries the position a
    /// child with this name must be inserted at.
    pub(crate) fn search(&self, name: &[u8]) -> Result<usize, usize> {
        self.children
            .binary_search_by(|child| child.name[..].cmp(name))
    }

    /// Number of leading frames of `stack` that already exist below this node.
    pub(crate) fn existing_depth<S: AsRef<[u8]>>(&self, stack: &[S]) -> usize {
        let mut node = self;
        for (depth, name) in stack.iter().enumerate() {
            match node.search(name.as_ref()) {
                Ok(i) => node = &node.children[i],
                Err(_) => return depth,
            }
        }
        stack.len()
    }

    /// Follows `path` as far as it exists and returns the deepest node reached.
    pub(crate) fn descend_mut<S: AsRef<[u8]>>(&mut self, path: &[S]) -> &mut Node<A> {
        let mut node = self;
        for name in path {
            match node.search(name.as_ref()) {
                Ok(i) => node = &mut node.children[i],
                Err(_) => break,
            }
        }
        node
    }

    /// Deep copy into another allocator.
    pub fn try_clone_in<B: Allocator + Clone>(&self, alloc: B) -> Result<Node<B>, TryReserveError> {
        let mut node = Node::try_new_in(&self.name, alloc.clone())?;
        node.total = self.total;
        node.self_value = self.self_value;
        node.children.try_reserve_exact(self.children.len())?;
        for child in self.children.iter() {
            node.children.push(child.try_clone_in(alloc.clone())?);
        }
        Ok(node)
    }

    pub(crate) fn add_weight(&mut self, weight: u64) {
        self.total += weight;
    }

    pub(crate) fn add_self_weight(&mut self, weight: u64) {
        self.total += weight;
        self.self_value += weight;
    }

    pub(crate) fn reserve_child(&mut self) -> Result<(), TryReserveError> {
        self.children.try_reserve(1)
    }

    /// Inserts a child at a position obtained from [`Node::search`]. The
    /// caller must have reserved room with [`Node::reserve_child`] for this
    /// not to allocate.
    pub(crate) fn insert_child(&mut self, index: usize, child: Node<A>) {
        self.children.insert(index, child);
    }

    pub(crate) fn child_at_mut(&mut self, index: usize) -> &mut Node<A> {
        &mut self.children[index]
    }
}

impl<A: Allocator, B: Allocator> PartialEq<Node<B>> for Node<A> {
    fn eq(&self, other: &Node<B>) -> bool {
        self.name() == other.name()
            && self.total == other.total
            && self.self_value == other.self_value
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(other.children.iter())
                .all(|(a, b)| a == b)
    }
}

impl<A: Allocator> fmt::Debug for Node<A> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Node")
            .field("name", &String::from_utf8_lossy(&self.name))
            .field("total", &self.total)
            .field("self", &self.self_value)
            .field("children", &self.children())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_carries_weight_on_every_node() {
        let chain = Node::try_new_chain_in(&["a", "b", "c"], 7, &Global)
            .unwrap()
            .unwrap();

        assert_eq!(chain.name(), b"a");
        assert_eq!((chain.total(), chain.self_value()), (7, 0));
        let b = &chain.children()[0];
        assert_eq!((b.name(), b.total(), b.self_value()), (&b"b"[..], 7, 0));
        let c = &b.children()[0];
        assert_eq!((c.name(), c.total(), c.self_value()), (&b"c"[..], 7, 7));
        assert!(c.children().is_empty());
    }

    #[test]
    fn test_empty_chain() {
        let frames: [&str; 0] = [];
        assert!(Node::try_new_chain_in(&frames, 7, &Global)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_search_reports_insertion_point() {
        let mut root = Node::root_in(Global);
        for name in ["b", "d"] {
            let i = root.search(name.as_bytes()).unwrap_err();
            root.insert_child(i, Node::try_new_in(name.as_bytes(), Global).unwrap());
        }

        assert_eq!(root.search(b"a"), Err(0));
        assert_eq!(root.search(b"b"), Ok(0));
        assert_eq!(root.search(b"c"), Err(1));
        assert_eq!(root.search(b"d"), Ok(1));
        assert_eq!(root.search(b"e"), Err(2));
    }

    #[test]
    fn test_existing_depth() {
        let mut root = Node::root_in(Global);
        let chain = Node::try_new_chain_in(&["a", "b"], 1, &Global)
            .unwrap()
            .unwrap();
        root.insert_child(0, chain);

        assert_eq!(root.existing_depth(&["a", "b", "c"]), 2);
        assert_eq!(root.existing_depth(&["a", "x"]), 1);
        assert_eq!(root.existing_depth(&["x"]), 0);
        assert_eq!(root.descend_mut(&["a", "b", "c"]).name(), b"b");
    }
}
