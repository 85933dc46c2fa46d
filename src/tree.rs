//! Compressed radix tree keyed by byte strings.

use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;
use smallvec::SmallVec;

use crate::config::TreeConfig;
use crate::iter::{Cursor, SeekIterator, SeekOp};
use crate::node::{Node, NodeId, NodeStore};

static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

#[inline]
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// An ordered map from byte strings to `V`, stored as a path-compressed trie.
///
/// Keys iterate in byte-wise lexicographic order. Every node that holds no
/// value has at least two children, so the number of nodes is bounded by
/// twice the number of keys.
///
/// Cursors keep node indices into the tree. Each structural mutation bumps a
/// generation counter; a detached [`Cursor`] created before the mutation
/// reports [`Error::StaleIterator`](crate::Error::StaleIterator) instead of
/// reading through a reshaped path.
pub struct RadixTree<V> {
    pub(crate) store: NodeStore<V>,
    pub(crate) root: Option<NodeId>,
    len: usize,
    generation: u64,
    id: u64,
}

impl<V> RadixTree<V> {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            store: NodeStore::with_capacity(config.initial_capacity),
            root: None,
            len: 0,
            generation: 0,
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of nodes currently allocated.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.store.len()
    }

    /// Counter bumped by every mutation that adds or removes a key.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub(crate) fn identity(&self) -> u64 {
        self.id
    }

    pub fn memory_usage(&self) -> usize {
        self.store.memory_usage()
    }

    pub fn shrink_to_fit(&mut self) {
        self.store.shrink_to_fit();
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.root = None;
        self.len = 0;
        self.generation += 1;
    }

    fn grew(&mut self) {
        self.len += 1;
        self.generation += 1;
    }

    fn relink(&mut self, link: Option<(NodeId, usize)>, to: NodeId) {
        match link {
            Some((parent, slot)) => self.store.get_mut(parent).children[slot].1 = to,
            None => self.root = Some(to),
        }
    }

    /// Exact-match descent.
    fn find_node(&self, key: &[u8]) -> Option<NodeId> {
        let mut id = self.root?;
        let mut depth = 0;
        loop {
            let node = self.store.get(id);
            if !key[depth..].starts_with(&node.label) {
                return None;
            }
            depth += node.label.len();
            if depth == key.len() {
                return Some(id);
            }
            let slot = node.find_child(key[depth]).ok()?;
            id = node.children[slot].1;
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let id = self.find_node(key)?;
        self.store.get(id).value.as_ref()
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let id = self.find_node(key)?;
        self.store.get_mut(id).value.as_mut()
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Insert `value` under `key`, returning the value it replaced.
    ///
    /// Replacing the value of an existing key does not reshape the tree and
    /// leaves the generation unchanged.
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        let Some(root) = self.root else {
            self.root = Some(self.store.alloc(Node::leaf(key, value)));
            self.grew();
            return None;
        };

        // Link from the parent to `id`; `None` means `id` is the root.
        let mut link: Option<(NodeId, usize)> = None;
        let mut id = root;
        let mut depth = 0;

        loop {
            let label = &self.store.get(id).label;
            let common = common_prefix_len(label, &key[depth..]);

            if common < label.len() {
                // Key leaves (or ends inside) this edge: split it.
                let branch = self.store.split(id, common);
                self.relink(link, branch);
                depth += common;
                if depth == key.len() {
                    self.store.get_mut(branch).value = Some(value);
                } else {
                    let leaf = self.store.alloc(Node::leaf(&key[depth..], value));
                    self.store.add_child(branch, leaf);
                }
                self.grew();
                return None;
            }

            depth += common;
            if depth == key.len() {
                let old = self.store.get_mut(id).value.replace(value);
                if old.is_none() {
                    self.grew();
                }
                return old;
            }

            match self.store.get(id).find_child(key[depth]) {
                Ok(slot) => {
                    link = Some((id, slot));
                    id = self.store.get(id).children[slot].1;
                }
                Err(_) => {
                    let leaf = self.store.alloc(Node::leaf(&key[depth..], value));
                    self.store.add_child(id, leaf);
                    self.grew();
                    return None;
                }
            }
        }
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let mut id = self.root?;
        let mut parent: Option<(NodeId, usize)> = None;
        let mut depth = 0;
        loop {
            let node = self.store.get(id);
            if !key[depth..].starts_with(&node.label) {
                return None;
            }
            depth += node.label.len();
            if depth == key.len() {
                break;
            }
            let slot = node.find_child(key[depth]).ok()?;
            parent = Some((id, slot));
            id = node.children[slot].1;
        }

        let old = self.store.get_mut(id).value.take()?;
        self.len -= 1;
        self.generation += 1;

        match self.store.get(id).children.len() {
            0 => {
                self.store.free(id);
                match parent {
                    None => self.root = None,
                    Some((p, slot)) => {
                        self.store.remove_child(p, slot);
                        let p_node = self.store.get(p);
                        if !p_node.is_key() && p_node.children.len() == 1 {
                            self.store.merge_child(p);
                        }
                    }
                }
                trace!("pruned leaf for key of {} bytes", key.len());
            }
            1 => self.store.merge_child(id),
            _ => {}
        }

        Some(old)
    }

    /// A detached cursor bound to this tree, positioned before the first key.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self)
    }

    /// Iterate all entries in ascending key order.
    pub fn iter(&self) -> SeekIterator<'_, V> {
        self.seek(SeekOp::Min, &[])
    }

    /// An iterator positioned by `op` relative to `key`.
    pub fn seek(&self, op: SeekOp, key: &[u8]) -> SeekIterator<'_, V> {
        let mut it = SeekIterator::new(self);
        it.seek(op, key);
        it
    }

    pub fn first(&self) -> Option<(Vec<u8>, &V)> {
        self.seek(SeekOp::Min, &[]).current_owned()
    }

    pub fn last(&self) -> Option<(Vec<u8>, &V)> {
        self.seek(SeekOp::Max, &[]).current_owned()
    }

    /// Walk every node depth-first, passing the reconstructed key prefix
    /// (including the node's own label) and the nesting depth.
    pub(crate) fn walk(&self, mut visit: impl FnMut(NodeId, &[u8], usize)) {
        let Some(root) = self.root else { return };
        let mut key = Vec::new();
        // (node, depth, key length before this node's label)
        let mut stack: SmallVec<[(NodeId, usize, usize); 32]> = SmallVec::new();
        stack.push((root, 0, 0));
        while let Some((id, depth, base)) = stack.pop() {
            let node = self.store.get(id);
            key.truncate(base);
            key.extend_from_slice(&node.label);
            visit(id, &key, depth);
            for &(_, child) in node.children.iter().rev() {
                stack.push((child, depth + 1, key.len()));
            }
        }
    }
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for RadixTree<V> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            root: self.root,
            len: self.len,
            generation: 0,
            id: NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl<V: std::fmt::Debug> std::fmt::Debug for RadixTree<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> Extend<(Vec<u8>, V)> for RadixTree<V> {
    fn extend<I: IntoIterator<Item = (Vec<u8>, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(&key, value);
        }
    }
}

impl<V> FromIterator<(Vec<u8>, V)> for RadixTree<V> {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, V)>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}
