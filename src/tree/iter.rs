use allocator_api2::alloc::Allocator;

use crate::tree::Node;

/// Pre-order walk over a tree, visiting children in name order. Yields each
/// node with its depth, the root being at depth 0.
pub struct Iter<'t, A: Allocator> {
    pending: Vec<(usize, &'t Node<A>)>,
}

impl<'t, A: Allocator> Iter<'t, A> {
    pub(crate) fn new(root: &'t Node<A>) -> Self {
        Iter {
            pending: vec![(0, root)],
        }
    }
}

impl<'t, A: Allocator> Iterator for Iter<'t, A> {
    type Item = (usize, &'t Node<A>);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.pending.pop()?;
        self.pending
            .extend(node.children().iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}
