//! Seekable cursors over a [`RadixTree`].
//!
//! A cursor keeps the path from the root to its current node as a stack of
//! frames, together with the key bytes spelled by that path. Stepping moves
//! through siblings and ancestors on the stack, so it never restarts from the
//! root.
//!
//! Two front ends share the same traversal code:
//!
//! - [`SeekIterator`] borrows the tree. The borrow rules out mutation while
//!   it is alive, and it implements [`Iterator`].
//! - [`Cursor`] is detached: it stores node indices plus the tree identity and
//!   generation it was positioned at, and takes the tree on every call. Using
//!   it after the tree changed shape returns
//!   [`Error::StaleIterator`](crate::Error::StaleIterator).

use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::key::RadixKey;
use crate::node::NodeId;
use crate::tree::{common_prefix_len, RadixTree};

/// Seek operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum SeekOp {
    /// `=`: exactly the target.
    Eq,
    /// `>`: smallest key strictly greater than the target.
    Gt,
    /// `>=`: smallest key greater than or equal to the target.
    Ge,
    /// `<`: largest key strictly less than the target.
    Lt,
    /// `<=`: largest key less than or equal to the target.
    Le,
    /// `^`: smallest key; the target is ignored.
    Min,
    /// `$`: largest key; the target is ignored.
    Max,
}

impl SeekOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SeekOp::Eq => "=",
            SeekOp::Gt => ">",
            SeekOp::Ge => ">=",
            SeekOp::Lt => "<",
            SeekOp::Le => "<=",
            SeekOp::Min => "^",
            SeekOp::Max => "$",
        }
    }

    /// Whether a key ordered `ord` relative to a target satisfies this
    /// operator. `Min` and `Max` are positions, not comparisons, and never match.
    pub fn matches(self, ord: Ordering) -> bool {
        match self {
            SeekOp::Eq => ord == Ordering::Equal,
            SeekOp::Gt => ord == Ordering::Greater,
            SeekOp::Ge => ord != Ordering::Less,
            SeekOp::Lt => ord == Ordering::Less,
            SeekOp::Le => ord != Ordering::Greater,
            SeekOp::Min | SeekOp::Max => false,
        }
    }
}

impl std::fmt::Display for SeekOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeekOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "=" | "==" => SeekOp::Eq,
            ">" => SeekOp::Gt,
            ">=" => SeekOp::Ge,
            "<" => SeekOp::Lt,
            "<=" => SeekOp::Le,
            "^" => SeekOp::Min,
            "$" => SeekOp::Max,
            other => return Err(Error::UnknownSeekOp(other.to_owned())),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorState {
    BeforeFirst,
    Positioned,
    AfterLast,
}

/// Which side of the target the seek resolves towards.
#[derive(Clone, Copy)]
enum Bias {
    Up { strict: bool },
    Down { strict: bool },
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    node: NodeId,
    /// Index of `node` among its parent's children; 0 for the root.
    slot: usize,
}

/// Detached cursor. See the [module docs](self).
#[derive(Clone, Debug)]
pub struct Cursor {
    stack: Vec<Frame>,
    key: Vec<u8>,
    state: CursorState,
    tree: u64,
    generation: u64,
}

impl Cursor {
    /// A cursor bound to `tree`, positioned before the first key.
    pub fn new<V>(tree: &RadixTree<V>) -> Self {
        Self {
            stack: Vec::new(),
            key: Vec::new(),
            state: CursorState::BeforeFirst,
            tree: tree.identity(),
            generation: tree.generation(),
        }
    }

    /// Size of a cursor value, independent of tree contents or position.
    ///
    /// The path stack and key buffer live on the heap.
    pub const fn inline_size() -> usize {
        std::mem::size_of::<Self>()
    }

    #[inline]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// True when the cursor has run off either end.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.state != CursorState::Positioned
    }

    /// Key at the cursor, if positioned.
    pub fn key(&self) -> Option<&[u8]> {
        (self.state == CursorState::Positioned).then_some(self.key.as_slice())
    }

    /// Compare the current key against `target` with `op`. False when not positioned.
    pub fn compare(&self, op: SeekOp, target: &[u8]) -> bool {
        self.key().is_some_and(|key| op.matches(key.cmp(target)))
    }

    fn check_tree<V>(&self, tree: &RadixTree<V>) -> Result<()> {
        if self.tree != tree.identity() {
            return Err(Error::ForeignTree);
        }
        Ok(())
    }

    fn check<V>(&self, tree: &RadixTree<V>) -> Result<()> {
        self.check_tree(tree)?;
        if self.generation != tree.generation() {
            return Err(Error::StaleIterator {
                bound: self.generation,
                current: tree.generation(),
            });
        }
        Ok(())
    }

    /// Position by `op` relative to `target`. Re-seeking is how a stale
    /// cursor is brought back in sync. Returns whether it landed on a key.
    pub fn seek<V>(&mut self, tree: &RadixTree<V>, op: SeekOp, target: &[u8]) -> Result<bool> {
        self.check_tree(tree)?;
        self.generation = tree.generation();
        self.seek_in(tree, op, target);
        Ok(self.state == CursorState::Positioned)
    }

    /// Move one key in `dir`. Returns whether it landed on a key.
    pub fn step<V>(&mut self, tree: &RadixTree<V>, dir: Direction) -> Result<bool> {
        self.check(tree)?;
        self.step_in(tree, dir);
        Ok(self.state == CursorState::Positioned)
    }

    /// Key and value at the cursor.
    pub fn current<'c, 't, V>(
        &'c self,
        tree: &'t RadixTree<V>,
    ) -> Result<Option<(&'c [u8], &'t V)>> {
        self.check(tree)?;
        Ok(self.current_in(tree))
    }

    /// Decode the current key as `K`.
    pub fn key_as<K: RadixKey>(&self) -> Option<Result<K>> {
        self.key().map(K::decode)
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    fn reset(&mut self, state: CursorState) {
        self.stack.clear();
        self.key.clear();
        self.state = state;
    }

    #[inline]
    fn top(&self) -> Option<NodeId> {
        self.stack.last().map(|f| f.node)
    }

    fn push<V>(&mut self, tree: &RadixTree<V>, node: NodeId, slot: usize) {
        self.key.extend_from_slice(&tree.store.get(node).label);
        self.stack.push(Frame { node, slot });
    }

    fn pop<V>(&mut self, tree: &RadixTree<V>) -> Option<Frame> {
        let frame = self.stack.pop()?;
        let label_len = tree.store.get(frame.node).label.len();
        self.key.truncate(self.key.len() - label_len);
        Some(frame)
    }

    pub(crate) fn current_in<'t, V>(&self, tree: &'t RadixTree<V>) -> Option<(&[u8], &'t V)> {
        if self.state != CursorState::Positioned {
            return None;
        }
        let node = self.top()?;
        let value = tree.store.get(node).value.as_ref()?;
        Some((self.key.as_slice(), value))
    }

    /// Smallest key in the subtree of the top node.
    fn descend_min<V>(&mut self, tree: &RadixTree<V>) {
        while let Some(id) = self.top() {
            let node = tree.store.get(id);
            if node.is_key() {
                self.state = CursorState::Positioned;
                return;
            }
            // Valueless nodes always have at least two children.
            let child = node.child(0).expect("valueless node without children");
            self.push(tree, child, 0);
        }
        self.reset(CursorState::AfterLast);
    }

    /// Largest key in the subtree of the top node.
    fn descend_max<V>(&mut self, tree: &RadixTree<V>) {
        while let Some(id) = self.top() {
            let node = tree.store.get(id);
            match node.children.len().checked_sub(1) {
                Some(last) => self.push(tree, node.children[last].1, last),
                None => {
                    self.state = CursorState::Positioned;
                    return;
                }
            }
        }
        self.reset(CursorState::BeforeFirst);
    }

    /// Leave the subtree of the top node and land on the smallest key after it.
    fn ascend_next<V>(&mut self, tree: &RadixTree<V>) {
        while let Some(frame) = self.pop(tree) {
            let Some(parent) = self.top() else { break };
            if let Some(next) = tree.store.get(parent).child(frame.slot + 1) {
                self.push(tree, next, frame.slot + 1);
                self.descend_min(tree);
                return;
            }
        }
        self.reset(CursorState::AfterLast);
    }

    /// Leave the subtree of the top node and land on the largest key before it.
    fn ascend_prev<V>(&mut self, tree: &RadixTree<V>) {
        while let Some(frame) = self.pop(tree) {
            let Some(parent) = self.top() else { break };
            let parent_node = tree.store.get(parent);
            if frame.slot > 0 {
                let prev = parent_node.children[frame.slot - 1].1;
                self.push(tree, prev, frame.slot - 1);
                self.descend_max(tree);
                return;
            }
            // A parent's own key sorts before all of its children.
            if parent_node.is_key() {
                self.state = CursorState::Positioned;
                return;
            }
        }
        self.reset(CursorState::BeforeFirst);
    }

    fn start<V>(&mut self, tree: &RadixTree<V>) -> bool {
        match tree.root {
            Some(root) => {
                self.push(tree, root, 0);
                true
            }
            None => false,
        }
    }

    pub(crate) fn step_in<V>(&mut self, tree: &RadixTree<V>, dir: Direction) {
        match (dir, self.state) {
            (Direction::Forward, CursorState::BeforeFirst) => self.seek_in(tree, SeekOp::Min, &[]),
            (Direction::Backward, CursorState::AfterLast) => self.seek_in(tree, SeekOp::Max, &[]),
            (Direction::Forward, CursorState::AfterLast)
            | (Direction::Backward, CursorState::BeforeFirst) => {}
            (Direction::Forward, CursorState::Positioned) => self.forward_from_key(tree),
            (Direction::Backward, CursorState::Positioned) => self.ascend_prev(tree),
        }
    }

    fn forward_from_key<V>(&mut self, tree: &RadixTree<V>) {
        let first_child = self.top().and_then(|id| tree.store.get(id).child(0));
        match first_child {
            Some(child) => {
                self.push(tree, child, 0);
                self.descend_min(tree);
            }
            None => self.ascend_next(tree),
        }
    }

    pub(crate) fn seek_in<V>(&mut self, tree: &RadixTree<V>, op: SeekOp, target: &[u8]) {
        self.reset(CursorState::BeforeFirst);

        let bias = match op {
            SeekOp::Min => {
                if self.start(tree) {
                    self.descend_min(tree);
                }
                return;
            }
            SeekOp::Max => {
                if self.start(tree) {
                    self.descend_max(tree);
                } else {
                    self.state = CursorState::AfterLast;
                }
                return;
            }
            SeekOp::Eq => None,
            SeekOp::Gt => Some(Bias::Up { strict: true }),
            SeekOp::Ge => Some(Bias::Up { strict: false }),
            SeekOp::Lt => Some(Bias::Down { strict: true }),
            SeekOp::Le => Some(Bias::Down { strict: false }),
        };

        if !self.start(tree) {
            self.state = match bias {
                Some(Bias::Down { .. }) => CursorState::BeforeFirst,
                _ => CursorState::AfterLast,
            };
            return;
        }

        let mut depth = 0;
        while let Some(id) = self.top() {
            let node = tree.store.get(id);
            let rest = &target[depth..];
            let common = common_prefix_len(&node.label, rest);

            if common < node.label.len() {
                // Target diverges inside this edge. The whole subtree sorts
                // after the target if the target ran out or has a smaller byte.
                let subtree_after = common == rest.len() || rest[common] < node.label[common];
                match bias {
                    None => self.reset(CursorState::AfterLast),
                    Some(Bias::Up { .. }) if subtree_after => self.descend_min(tree),
                    Some(Bias::Up { .. }) => self.ascend_next(tree),
                    Some(Bias::Down { .. }) if subtree_after => self.ascend_prev(tree),
                    Some(Bias::Down { .. }) => self.descend_max(tree),
                }
                return;
            }

            depth += node.label.len();
            if depth == target.len() {
                // The path spells the target exactly.
                let is_key = node.is_key();
                match bias {
                    None if is_key => self.state = CursorState::Positioned,
                    None => self.reset(CursorState::AfterLast),
                    Some(Bias::Up { strict: false }) | Some(Bias::Down { strict: false })
                        if is_key =>
                    {
                        self.state = CursorState::Positioned
                    }
                    Some(Bias::Up { .. }) if is_key => self.forward_from_key(tree),
                    Some(Bias::Up { .. }) => self.descend_min(tree),
                    Some(Bias::Down { .. }) => self.ascend_prev(tree),
                }
                return;
            }

            match node.find_child(target[depth]) {
                Ok(slot) => {
                    let child = node.children[slot].1;
                    self.push(tree, child, slot);
                }
                Err(slot) => {
                    // Target continues past this node between two children.
                    let is_key = node.is_key();
                    let below = slot.checked_sub(1).and_then(|s| node.child(s).map(|c| (c, s)));
                    let above = node.child(slot);
                    match bias {
                        None => self.reset(CursorState::AfterLast),
                        Some(Bias::Up { .. }) => match above {
                            Some(child) => {
                                self.push(tree, child, slot);
                                self.descend_min(tree);
                            }
                            None => self.ascend_next(tree),
                        },
                        Some(Bias::Down { .. }) => match below {
                            Some((child, s)) => {
                                self.push(tree, child, s);
                                self.descend_max(tree);
                            }
                            None if is_key => self.state = CursorState::Positioned,
                            None => self.ascend_prev(tree),
                        },
                    }
                    return;
                }
            }
        }
    }
}

/// Cursor that borrows its tree.
///
/// Seeking positions the iterator on an element; the [`Iterator`]
/// implementation yields that element first and then steps in the configured
/// [`Direction`]. Once it runs off an end it stays exhausted until the next
/// seek.
pub struct SeekIterator<'a, V> {
    tree: &'a RadixTree<V>,
    cursor: Cursor,
    direction: Direction,
    just_seeked: bool,
}

impl<'a, V> SeekIterator<'a, V> {
    /// An unpositioned iterator over `tree`. Call [`seek`](Self::seek) before iterating.
    pub fn new(tree: &'a RadixTree<V>) -> Self {
        Self {
            tree,
            cursor: Cursor::new(tree),
            direction: Direction::Forward,
            just_seeked: false,
        }
    }

    /// Set the direction used by [`Iterator::next`].
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn seek(&mut self, op: SeekOp, target: &[u8]) -> bool {
        self.cursor.seek_in(self.tree, op, target);
        self.just_seeked = true;
        !self.cursor.is_exhausted()
    }

    pub fn step(&mut self, dir: Direction) -> bool {
        self.just_seeked = false;
        self.cursor.step_in(self.tree, dir);
        !self.cursor.is_exhausted()
    }

    #[inline]
    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    pub fn current(&self) -> Option<(&[u8], &'a V)> {
        self.cursor.current_in(self.tree)
    }

    pub(crate) fn current_owned(&self) -> Option<(Vec<u8>, &'a V)> {
        self.current().map(|(k, v)| (k.to_vec(), v))
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.cursor.key()
    }

    /// Value at the current position.
    pub fn value(&self) -> Option<&'a V> {
        self.current().map(|(_, v)| v)
    }

    pub fn key_as<K: RadixKey>(&self) -> Option<Result<K>> {
        self.cursor.key_as()
    }

    pub fn compare(&self, op: SeekOp, target: &[u8]) -> bool {
        self.cursor.compare(op, target)
    }

    /// Release the borrow, keeping the position.
    pub fn into_cursor(self) -> Cursor {
        self.cursor
    }
}

impl<'a, V> Iterator for SeekIterator<'a, V> {
    type Item = (Vec<u8>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.just_seeked {
            self.just_seeked = false;
        } else if self.cursor.is_exhausted() {
            return None;
        } else {
            self.cursor.step_in(self.tree, self.direction);
        }
        self.current_owned()
    }
}
