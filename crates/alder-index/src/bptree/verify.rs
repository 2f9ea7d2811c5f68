//! On-demand structural verification.
//!
//! [`BPlusTree::verify`] walks the whole tree and checks every invariant
//! the operations are supposed to preserve: balance, node occupancy,
//! separator bounds, strict key order inside leaves, leaf-chain integrity,
//! and the bookkeeping counters. It exists for tests and debugging; a
//! healthy tree never fails it.

use alder_common::types::{Key, PageId};

use super::error::{IndexError, IndexResult};
use super::node::Node;
use super::tree::BPlusTree;

#[derive(Default)]
struct Walk {
    leaves: Vec<PageId>,
    entry_count: usize,
    internal_count: usize,
}

impl<const FANOUT: usize> BPlusTree<FANOUT> {
    /// Checks every structural invariant of the tree.
    ///
    /// Returns the first violation found as an
    /// [`IndexError::TreeStructure`] describing it.
    pub fn verify(&self) -> IndexResult<()> {
        let Some(root_id) = self.root else {
            if !self.nodes.is_empty() {
                return Err(IndexError::structure("empty tree still owns nodes"));
            }
            if self.stats.entry_count != 0 || self.height != 0 {
                return Err(IndexError::structure("empty tree reports entries or height"));
            }
            return Ok(());
        };

        let mut walk = Walk::default();
        self.verify_subtree(root_id, 0, None, None, &mut walk)?;
        self.verify_leaf_chain(&walk.leaves)?;

        if walk.entry_count != self.stats.entry_count {
            return Err(IndexError::structure(format!(
                "entry count mismatch: counted {}, recorded {}",
                walk.entry_count, self.stats.entry_count
            )));
        }
        if walk.leaves.len() != self.stats.leaf_count {
            return Err(IndexError::structure(format!(
                "leaf count mismatch: counted {}, recorded {}",
                walk.leaves.len(),
                self.stats.leaf_count
            )));
        }
        if walk.internal_count != self.stats.internal_count {
            return Err(IndexError::structure(format!(
                "internal count mismatch: counted {}, recorded {}",
                walk.internal_count, self.stats.internal_count
            )));
        }
        if walk.leaves.len() + walk.internal_count != self.nodes.len() {
            return Err(IndexError::structure("unreachable nodes left in the arena"));
        }
        Ok(())
    }

    /// Checks one subtree. `lower` is an inclusive bound and `upper` an
    /// exclusive one on every key the subtree may hold.
    fn verify_subtree(
        &self,
        node_id: PageId,
        depth: usize,
        lower: Option<Key>,
        upper: Option<Key>,
        walk: &mut Walk,
    ) -> IndexResult<()> {
        let is_root = self.root == Some(node_id);
        match self.node(node_id)? {
            Node::Leaf(leaf) => {
                if depth != self.height {
                    return Err(IndexError::structure(format!(
                        "leaf {} at depth {depth}, expected {}",
                        leaf.page_id, self.height
                    )));
                }
                let min = if is_root { 1 } else { Self::LEAF_MIN_KEYS };
                if leaf.len() < min || leaf.len() > Self::MAX_KEYS {
                    return Err(IndexError::structure(format!(
                        "leaf {} holds {} entries, allowed {min}..={}",
                        leaf.page_id,
                        leaf.len(),
                        Self::MAX_KEYS
                    )));
                }
                let mut previous: Option<Key> = None;
                for entry in &leaf.entries {
                    if previous.is_some_and(|prev| entry.key <= prev) {
                        return Err(IndexError::structure(format!(
                            "leaf {} keys not strictly ascending",
                            leaf.page_id
                        )));
                    }
                    if lower.is_some_and(|bound| entry.key < bound)
                        || upper.is_some_and(|bound| entry.key >= bound)
                    {
                        return Err(IndexError::structure(format!(
                            "key {} escapes the bounds of leaf {}",
                            entry.key, leaf.page_id
                        )));
                    }
                    previous = Some(entry.key);
                }
                walk.entry_count += leaf.len();
                walk.leaves.push(node_id);
            }
            Node::Internal(node) => {
                if depth >= self.height {
                    return Err(IndexError::structure(format!(
                        "internal node {} at leaf depth {depth}",
                        node.page_id
                    )));
                }
                let min = if is_root { 1 } else { Self::INTERNAL_MIN_KEYS };
                if node.key_count() < min || node.key_count() > Self::MAX_KEYS {
                    return Err(IndexError::structure(format!(
                        "internal node {} holds {} keys, allowed {min}..={}",
                        node.page_id,
                        node.key_count(),
                        Self::MAX_KEYS
                    )));
                }
                for window in node.entries.windows(2) {
                    if window[1].key <= window[0].key {
                        return Err(IndexError::structure(format!(
                            "separators of internal node {} not strictly ascending",
                            node.page_id
                        )));
                    }
                }
                walk.internal_count += 1;
                for index in 0..node.child_count() {
                    let child_lower = if index == 0 {
                        lower
                    } else {
                        Some(node.entries[index - 1].key)
                    };
                    let child_upper = if index < node.key_count() {
                        Some(node.entries[index].key)
                    } else {
                        upper
                    };
                    self.verify_subtree(node.child(index), depth + 1, child_lower, child_upper, walk)?;
                }
            }
        }
        Ok(())
    }

    /// Checks that the leaf chain links exactly match the left-to-right
    /// order the tree walk produced.
    fn verify_leaf_chain(&self, leaves: &[PageId]) -> IndexResult<()> {
        for (index, &leaf_id) in leaves.iter().enumerate() {
            let leaf = self.leaf(leaf_id)?;
            let expected_prev = if index == 0 {
                PageId::INVALID
            } else {
                leaves[index - 1]
            };
            let expected_next = if index + 1 == leaves.len() {
                PageId::INVALID
            } else {
                leaves[index + 1]
            };
            if leaf.prev_leaf != expected_prev {
                return Err(IndexError::structure(format!(
                    "leaf {leaf_id} prev link is {}, expected {expected_prev}",
                    leaf.prev_leaf
                )));
            }
            if leaf.next_leaf != expected_next {
                return Err(IndexError::structure(format!(
                    "leaf {leaf_id} next link is {}, expected {expected_next}",
                    leaf.next_leaf
                )));
            }
        }
        Ok(())
    }
}
