//! Node arena for the radix tree.
//!
//! Nodes live in a slot vector and refer to each other by [`NodeId`]. The
//! tree only ever reshapes itself through [`NodeStore::split`] and
//! [`NodeStore::merge_child`], so the path-compression invariant is enforced
//! in one place:
//!
//! - a node without a value has at least two children
//! - a node without a value and without children exists only transiently
//!   inside a removal and is freed before it returns

use log::trace;
use smallvec::{smallvec, SmallVec};

/// Inline capacity of an edge label. Large enough for an encoded stream ID.
pub(crate) const INLINE_LABEL: usize = 16;

pub(crate) type Label = SmallVec<[u8; INLINE_LABEL]>;

/// Index of a node inside a [`NodeStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone)]
pub(crate) struct Node<V> {
    /// Compressed edge leading into this node. Except for the root, the first
    /// byte is the branching byte the parent indexes this node by.
    pub(crate) label: Label,
    /// `(branching byte, child)` sorted ascending by byte.
    pub(crate) children: SmallVec<[(u8, NodeId); 4]>,
    /// Present iff a key ends at this node.
    pub(crate) value: Option<V>,
}

impl<V> Node<V> {
    pub(crate) fn leaf(label: &[u8], value: V) -> Self {
        Self {
            label: Label::from_slice(label),
            children: SmallVec::new(),
            value: Some(value),
        }
    }

    #[inline]
    pub(crate) fn is_key(&self) -> bool {
        self.value.is_some()
    }

    /// `Ok(slot)` of the child branching on `byte`, or `Err(slot)` where such
    /// a child would be inserted.
    #[inline]
    pub(crate) fn find_child(&self, byte: u8) -> Result<usize, usize> {
        self.children.binary_search_by_key(&byte, |&(b, _)| b)
    }

    #[inline]
    pub(crate) fn child(&self, slot: usize) -> Option<NodeId> {
        self.children.get(slot).map(|&(_, id)| id)
    }
}

#[derive(Clone)]
pub(crate) struct NodeStore<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<NodeId>,
    live: usize,
}

impl<V> NodeStore<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live nodes.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    pub(crate) fn alloc(&mut self, node: Node<V>) -> NodeId {
        self.live += 1;
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = Some(node);
            return id;
        }
        let idx = u32::try_from(self.slots.len()).expect("node arena exhausted");
        self.slots.push(Some(node));
        NodeId(idx)
    }

    pub(crate) fn free(&mut self, id: NodeId) -> Node<V> {
        let node = self.slots[id.index()]
            .take()
            .expect("freeing a vacant node slot");
        self.free.push(id);
        self.live -= 1;
        node
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<V> {
        self.slots[id.index()].as_ref().expect("dangling node id")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<V> {
        self.slots[id.index()].as_mut().expect("dangling node id")
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        // Trailing vacant slots can go; interior holes stay on the free list.
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|id| id.index() < len);
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }

    /// Approximate heap bytes held by the arena, excluding spilled labels.
    pub(crate) fn memory_usage(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Option<Node<V>>>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    /// Link `child` under `parent`, keeping children sorted.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) {
        let byte = self.get(child).label[0];
        let node = self.get_mut(parent);
        match node.find_child(byte) {
            Ok(_) => panic!("duplicate branching byte {byte:#04x}"),
            Err(slot) => node.children.insert(slot, (byte, child)),
        }
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, slot: usize) -> NodeId {
        self.get_mut(parent).children.remove(slot).1
    }

    /// Split `id` so that its label ends after `at` bytes.
    ///
    /// A new node takes `label[..at]` and adopts `id`, which keeps
    /// `label[at..]`. Returns the new node; the caller relinks it where `id`
    /// used to hang. `at` is zero only when splitting the root.
    pub(crate) fn split(&mut self, id: NodeId, at: usize) -> NodeId {
        let node = self.get_mut(id);
        debug_assert!(at < node.label.len());
        let head = Label::from_slice(&node.label[..at]);
        node.label = Label::from_slice(&node.label[at..]);
        let branch = node.label[0];
        let parent = self.alloc(Node {
            label: head,
            children: smallvec![(branch, id)],
            value: None,
        });
        trace!("split {id:?} at {at}, new parent {parent:?}");
        parent
    }

    /// Fold the only child of a valueless node into it.
    ///
    /// `id` survives with the concatenated label and the child's value and
    /// children, so links pointing at `id` stay valid.
    pub(crate) fn merge_child(&mut self, id: NodeId) {
        let child_id = {
            let node = self.get(id);
            debug_assert!(!node.is_key() && node.children.len() == 1);
            node.children[0].1
        };
        let child = self.free(child_id);
        let node = self.get_mut(id);
        node.label.extend_from_slice(&child.label);
        node.children = child.children;
        node.value = child.value;
        trace!("merged {child_id:?} into {id:?}");
    }
}
