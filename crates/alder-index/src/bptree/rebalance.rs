//! Deletion and underflow rebalancing.
//!
//! Removal descends with a stack of `(ancestor, child index)` pairs, takes
//! the entry out of its leaf, and cures underflows on the way back up: a
//! node below its minimum first tries to borrow an entry from the richer
//! of its siblings and otherwise merges with one, dropping a separator
//! from the parent. An internal root left without keys is replaced by its
//! only child, shrinking the tree by a level.
//!
//! Siblings are always located through the parent, never through the leaf
//! chain; the chain neighbor of a leaf may hang off a different parent.

use alder_common::types::{Key, PageId};

use super::error::{IndexError, IndexResult};
use super::node::{InternalEntry, Node};
use super::tree::BPlusTree;

impl<const FANOUT: usize> BPlusTree<FANOUT> {
    /// Removes `key` and its record pointer.
    ///
    /// Removing a key that is not present is a no-op.
    pub fn remove(&mut self, key: Key) -> IndexResult<()> {
        let Some(root_id) = self.root else {
            return Ok(());
        };
        let Some(leaf_id) = self.find_leaf(key)? else {
            return Ok(());
        };
        if !self.leaf(leaf_id)?.contains_key(key) {
            return Ok(());
        }
        if self.height == 0 {
            return self.remove_from_root_leaf(root_id, key);
        }
        let mut ancestors = Vec::new();
        self.remove_recursive(root_id, key, &mut ancestors)?;
        self.stats.entry_count -= 1;
        self.collapse_root_if_empty(root_id)
    }

    /// Removal when the root is the only leaf.
    fn remove_from_root_leaf(&mut self, root_id: PageId, key: Key) -> IndexResult<()> {
        let now_empty = {
            let leaf = self.leaf_mut(root_id)?;
            leaf.remove(key);
            leaf.is_empty()
        };
        self.stats.entry_count -= 1;
        if now_empty {
            self.nodes.remove(&root_id);
            self.allocator.free(root_id);
            self.root = None;
            self.stats.leaf_count -= 1;
        }
        Ok(())
    }

    /// Replaces an internal root that lost its last separator with its
    /// only remaining child.
    fn collapse_root_if_empty(&mut self, root_id: PageId) -> IndexResult<()> {
        let new_root = match self.node(root_id)? {
            Node::Internal(internal) if internal.key_count() == 0 => internal.leftmost_child,
            _ => return Ok(()),
        };
        self.nodes.remove(&root_id);
        self.allocator.free(root_id);
        self.root = Some(new_root);
        self.height -= 1;
        self.stats.internal_count -= 1;
        tracing::debug!(root = %new_root, height = self.height, "tree lost a level");
        Ok(())
    }

    /// Recursive removal. Rebalances this node on the way back up when the
    /// removal below left it underfull.
    fn remove_recursive(
        &mut self,
        node_id: PageId,
        key: Key,
        ancestors: &mut Vec<(PageId, usize)>,
    ) -> IndexResult<()> {
        if self.node(node_id)?.is_leaf() {
            return self.remove_in_leaf(node_id, key, ancestors);
        }
        let (child_id, child_index) = {
            let node = self.internal(node_id)?;
            let index = node.child_index_for(key);
            (node.child(index), index)
        };
        ancestors.push((node_id, child_index));
        self.remove_recursive(child_id, key, ancestors)?;
        ancestors.pop();

        if self.root == Some(node_id) {
            return Ok(());
        }
        if self.internal(node_id)?.key_count() >= Self::INTERNAL_MIN_KEYS {
            return Ok(());
        }
        self.rebalance_internal(node_id, ancestors)
    }

    /// Looks up the left and right siblings of `parent`'s child number
    /// `child_index`.
    fn siblings(
        &self,
        parent_id: PageId,
        child_index: usize,
    ) -> IndexResult<(Option<PageId>, Option<PageId>)> {
        let parent = self.internal(parent_id)?;
        let left = (child_index > 0).then(|| parent.child(child_index - 1));
        let right = (child_index < parent.key_count()).then(|| parent.child(child_index + 1));
        Ok((left, right))
    }

    // =========================================================================
    // Internal-node rebalancing
    // =========================================================================

    /// Cures an underflowing internal node against a sibling. Prefers the
    /// sibling with more keys, the left one on ties.
    fn rebalance_internal(
        &mut self,
        node_id: PageId,
        ancestors: &[(PageId, usize)],
    ) -> IndexResult<()> {
        let &(parent_id, child_index) = ancestors
            .last()
            .ok_or_else(|| IndexError::structure("underflowing internal node has no parent"))?;
        let (left_id, right_id) = self.siblings(parent_id, child_index)?;
        match (left_id, right_id) {
            (Some(left), Some(right)) => {
                if self.internal(left)?.key_count() >= self.internal(right)?.key_count() {
                    self.rebalance_internal_with_left(node_id, left, parent_id, child_index)
                } else {
                    self.rebalance_internal_with_right(node_id, right, parent_id, child_index)
                }
            }
            (Some(left), None) => {
                self.rebalance_internal_with_left(node_id, left, parent_id, child_index)
            }
            (None, Some(right)) => {
                self.rebalance_internal_with_right(node_id, right, parent_id, child_index)
            }
            (None, None) => Err(IndexError::structure(
                "underflowing internal node has no siblings",
            )),
        }
    }

    fn rebalance_internal_with_left(
        &mut self,
        node_id: PageId,
        left_id: PageId,
        parent_id: PageId,
        child_index: usize,
    ) -> IndexResult<()> {
        if self.internal(left_id)?.key_count() > Self::INTERNAL_MIN_KEYS {
            // borrow: the parent separator comes down as this node's first
            // key and the left sibling's last key replaces it in the parent
            let donated = self
                .internal_mut(left_id)?
                .entries
                .pop()
                .ok_or_else(|| IndexError::structure("left sibling has no separator to donate"))?;
            let old_separator = {
                let parent = self.internal_mut(parent_id)?;
                std::mem::replace(&mut parent.entries[child_index - 1].key, donated.key)
            };
            let node = self.internal_mut(node_id)?;
            let old_leftmost = node.leftmost_child;
            node.entries
                .insert(0, InternalEntry::new(old_separator, old_leftmost));
            node.leftmost_child = donated.child;
            self.stats.borrows += 1;
            return Ok(());
        }
        // merge this node into the left sibling
        let Node::Internal(node) = self.take_node(node_id)? else {
            return Err(IndexError::structure("expected internal node during merge"));
        };
        let separator = {
            let parent = self.internal_mut(parent_id)?;
            parent.entries.remove(child_index - 1).key
        };
        self.internal_mut(left_id)?.merge(separator, node);
        self.allocator.free(node_id);
        self.stats.internal_count -= 1;
        self.stats.merges += 1;
        tracing::trace!(
            target: "alder_index::merge",
            survivor = %left_id,
            removed = %node_id,
            "merged internal node into left sibling"
        );
        Ok(())
    }

    fn rebalance_internal_with_right(
        &mut self,
        node_id: PageId,
        right_id: PageId,
        parent_id: PageId,
        child_index: usize,
    ) -> IndexResult<()> {
        if self.internal(right_id)?.key_count() > Self::INTERNAL_MIN_KEYS {
            // borrow: the parent separator comes down as this node's last
            // key over the right sibling's old leftmost child, and the
            // right sibling's first key replaces it in the parent
            let (first, right_old_leftmost) = {
                let right = self.internal_mut(right_id)?;
                let first = right.entries.remove(0);
                let old = std::mem::replace(&mut right.leftmost_child, first.child);
                (first, old)
            };
            let old_separator = {
                let parent = self.internal_mut(parent_id)?;
                std::mem::replace(&mut parent.entries[child_index].key, first.key)
            };
            self.internal_mut(node_id)?
                .entries
                .push(InternalEntry::new(old_separator, right_old_leftmost));
            self.stats.borrows += 1;
            return Ok(());
        }
        // merge the right sibling into this node
        let Node::Internal(right) = self.take_node(right_id)? else {
            return Err(IndexError::structure("expected internal node during merge"));
        };
        let separator = {
            let parent = self.internal_mut(parent_id)?;
            parent.entries.remove(child_index).key
        };
        self.internal_mut(node_id)?.merge(separator, right);
        self.allocator.free(right_id);
        self.stats.internal_count -= 1;
        self.stats.merges += 1;
        tracing::trace!(
            target: "alder_index::merge",
            survivor = %node_id,
            removed = %right_id,
            "merged right sibling into internal node"
        );
        Ok(())
    }

    // =========================================================================
    // Leaf rebalancing
    // =========================================================================

    /// Leaf-level removal. Rebalances against a sibling when the leaf
    /// would drop below its minimum occupancy.
    fn remove_in_leaf(
        &mut self,
        leaf_id: PageId,
        key: Key,
        ancestors: &[(PageId, usize)],
    ) -> IndexResult<()> {
        if self.leaf(leaf_id)?.len() > Self::LEAF_MIN_KEYS {
            return self.remove_leaf_entry(leaf_id, key, ancestors);
        }
        let &(parent_id, child_index) = ancestors
            .last()
            .ok_or_else(|| IndexError::structure("underflowing leaf has no parent"))?;
        let (left_id, right_id) = self.siblings(parent_id, child_index)?;
        match (left_id, right_id) {
            (Some(left), Some(right)) => {
                if self.leaf(left)?.len() >= self.leaf(right)?.len() {
                    self.rebalance_leaf_with_left(leaf_id, left, parent_id, child_index, key)
                } else {
                    self.rebalance_leaf_with_right(
                        leaf_id,
                        right,
                        parent_id,
                        child_index,
                        key,
                        ancestors,
                    )
                }
            }
            (Some(left), None) => {
                self.rebalance_leaf_with_left(leaf_id, left, parent_id, child_index, key)
            }
            (None, Some(right)) => self.rebalance_leaf_with_right(
                leaf_id,
                right,
                parent_id,
                child_index,
                key,
                ancestors,
            ),
            (None, None) => Err(IndexError::structure("underflowing leaf has no siblings")),
        }
    }

    /// Removes the entry from its leaf, repairing the separator copy of
    /// the leaf's old first key held by an ancestor when the first entry
    /// goes.
    fn remove_leaf_entry(
        &mut self,
        leaf_id: PageId,
        key: Key,
        ancestors: &[(PageId, usize)],
    ) -> IndexResult<()> {
        let (position, replacement) = {
            let leaf = self.leaf(leaf_id)?;
            let position = leaf.entries.partition_point(|entry| entry.key < key);
            debug_assert!(position < leaf.len() && leaf.entries[position].key == key);
            let replacement = if position == 0 {
                // the next smallest key this subtree will hold
                if leaf.len() > 1 {
                    Some(leaf.entries[1].key)
                } else if leaf.next_leaf.is_valid() {
                    Some(
                        self.leaf(leaf.next_leaf)?
                            .first_key()
                            .ok_or_else(|| IndexError::structure("empty leaf in chain"))?,
                    )
                } else {
                    None
                }
            } else {
                None
            };
            (position, replacement)
        };
        if let Some(new_key) = replacement {
            self.update_ancestor_separator(ancestors, new_key)?;
        }
        self.leaf_mut(leaf_id)?.entries.remove(position);
        Ok(())
    }

    /// Rewrites the separator in the nearest ancestor holding a copy of
    /// the leaf's old first key.
    ///
    /// Ancestors entered through their leftmost child hold no such copy;
    /// if every ancestor was, the removed key was the tree's minimum and
    /// nothing references it.
    fn update_ancestor_separator(
        &mut self,
        ancestors: &[(PageId, usize)],
        new_key: Key,
    ) -> IndexResult<()> {
        for &(ancestor_id, child_index) in ancestors.iter().rev() {
            if child_index != 0 {
                self.internal_mut(ancestor_id)?.entries[child_index - 1].key = new_key;
                return Ok(());
            }
        }
        Ok(())
    }

    fn rebalance_leaf_with_left(
        &mut self,
        leaf_id: PageId,
        left_id: PageId,
        parent_id: PageId,
        child_index: usize,
        key: Key,
    ) -> IndexResult<()> {
        if self.leaf(left_id)?.len() > Self::LEAF_MIN_KEYS {
            // borrow: the left sibling's last entry becomes this leaf's
            // first, and the parent separator follows it down
            let donated = self
                .leaf_mut(left_id)?
                .entries
                .pop()
                .ok_or_else(|| IndexError::structure("left sibling has no entry to donate"))?;
            {
                let leaf = self.leaf_mut(leaf_id)?;
                leaf.remove(key);
                leaf.entries.insert(0, donated);
            }
            self.internal_mut(parent_id)?.entries[child_index - 1].key = donated.key;
            self.stats.borrows += 1;
            return Ok(());
        }
        // merge the survivors of this leaf into the left sibling
        let Node::Leaf(mut leaf) = self.take_node(leaf_id)? else {
            return Err(IndexError::structure("expected leaf during merge"));
        };
        leaf.remove(key);
        let old_next = leaf.next_leaf;
        self.leaf_mut(left_id)?.merge(leaf);
        if old_next.is_valid() {
            self.leaf_mut(old_next)?.prev_leaf = left_id;
        }
        {
            let parent = self.internal_mut(parent_id)?;
            parent.entries.remove(child_index - 1);
        }
        self.allocator.free(leaf_id);
        self.stats.leaf_count -= 1;
        self.stats.merges += 1;
        tracing::trace!(
            target: "alder_index::merge",
            survivor = %left_id,
            removed = %leaf_id,
            "merged leaf into left sibling"
        );
        Ok(())
    }

    fn rebalance_leaf_with_right(
        &mut self,
        leaf_id: PageId,
        right_id: PageId,
        parent_id: PageId,
        child_index: usize,
        key: Key,
        ancestors: &[(PageId, usize)],
    ) -> IndexResult<()> {
        self.remove_leaf_entry(leaf_id, key, ancestors)?;
        if self.leaf(right_id)?.len() > Self::LEAF_MIN_KEYS {
            // borrow the right sibling's first entry; the sibling's new
            // first key becomes the separator
            let donated = self.leaf_mut(right_id)?.entries.remove(0);
            let new_separator = self
                .leaf(right_id)?
                .first_key()
                .ok_or_else(|| IndexError::structure("right sibling drained during borrow"))?;
            self.leaf_mut(leaf_id)?.entries.push(donated);
            self.internal_mut(parent_id)?.entries[child_index].key = new_separator;
            self.stats.borrows += 1;
            return Ok(());
        }
        // merge the right sibling into this leaf
        let Node::Leaf(right) = self.take_node(right_id)? else {
            return Err(IndexError::structure("expected leaf during merge"));
        };
        let old_next = right.next_leaf;
        self.leaf_mut(leaf_id)?.merge(right);
        if old_next.is_valid() {
            self.leaf_mut(old_next)?.prev_leaf = leaf_id;
        }
        {
            let parent = self.internal_mut(parent_id)?;
            parent.entries.remove(child_index);
        }
        self.allocator.free(right_id);
        self.stats.leaf_count -= 1;
        self.stats.merges += 1;
        tracing::trace!(
            target: "alder_index::merge",
            survivor = %leaf_id,
            removed = %right_id,
            "merged right sibling into leaf"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alder_common::types::{RecordId, RecordPointer};

    fn pointer(key: Key) -> RecordPointer {
        RecordPointer::new(PageId::new(key as u64), RecordId::new(key as u64))
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut tree = BPlusTree::<4>::new();
        tree.remove(1).unwrap();
        assert!(tree.is_empty());

        tree.insert(1, pointer(1)).unwrap();
        tree.remove(2).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(1).unwrap(), Some(pointer(1)));
    }

    #[test]
    fn test_remove_from_root_leaf() {
        let mut tree = BPlusTree::<4>::new();
        tree.insert(1, pointer(1)).unwrap();
        tree.insert(2, pointer(2)).unwrap();

        tree.remove(1).unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(1).unwrap(), None);
        assert_eq!(tree.get(2).unwrap(), Some(pointer(2)));
    }

    #[test]
    fn test_removing_last_key_frees_the_root() {
        let mut tree = BPlusTree::<4>::new();
        tree.insert(42, pointer(42)).unwrap();
        tree.remove(42).unwrap();

        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.stats().leaf_count, 0);
        assert_eq!(tree.get(42).unwrap(), None);
    }

    #[test]
    fn test_ascending_removal_merges_right() {
        let mut tree = BPlusTree::<4>::new();
        for key in 0..32 {
            tree.insert(key, pointer(key)).unwrap();
        }
        for key in 0..32 {
            tree.remove(key).unwrap();
            tree.verify().unwrap();
        }
        assert!(tree.is_empty());
        assert!(tree.stats().merges > 0);
    }

    #[test]
    fn test_descending_removal_merges_left() {
        let mut tree = BPlusTree::<4>::new();
        for key in 0..32 {
            tree.insert(key, pointer(key)).unwrap();
        }
        for key in (0..32).rev() {
            tree.remove(key).unwrap();
            tree.verify().unwrap();
        }
        assert!(tree.is_empty());
        assert!(tree.stats().merges > 0);
    }

    #[test]
    fn test_removal_borrows_before_merging() {
        let mut tree = BPlusTree::<4>::new();
        for key in 0..12 {
            tree.insert(key, pointer(key)).unwrap();
        }
        // leave a sibling one entry above the minimum, then underflow next
        // to it; redistribution must kick in before any further merge
        for key in [5, 0, 11, 7, 10] {
            tree.remove(key).unwrap();
            tree.verify().unwrap();
        }
        assert!(tree.stats().borrows > 0);
        assert!(tree.stats().merges > 0);

        tree.insert(5, pointer(5)).unwrap();
        tree.remove(9).unwrap();
        tree.remove(8).unwrap();
        tree.verify().unwrap();

        let scanned = tree.range_scan(0, 20).unwrap();
        let expected: Vec<_> = [1, 2, 3, 4, 5, 6].into_iter().map(pointer).collect();
        assert_eq!(scanned, expected);
    }

    #[test]
    fn test_height_shrinks_back() {
        let mut tree = BPlusTree::<4>::new();
        for key in 0..64 {
            tree.insert(key, pointer(key)).unwrap();
        }
        assert!(tree.height() >= 2);

        for key in 0..60 {
            tree.remove(key).unwrap();
            tree.verify().unwrap();
        }
        assert!(tree.height() < 2);
        assert_eq!(tree.len(), 4);
    }
}
