//! Structural introspection: a textual dump and an invariant checker.

use std::fmt::Write;

use crate::tree::RadixTree;

fn escape(bytes: &[u8]) -> String {
    bytes.escape_ascii().to_string()
}

impl<V> RadixTree<V> {
    /// Render the node structure, one node per line, indented by depth.
    ///
    /// ```text
    /// "" branch
    ///   "fo" branch
    ///     "o" key
    ///     "x" key
    /// ```
    pub fn dump(&self) -> String {
        let mut out = String::new();
        if self.root.is_none() {
            out.push_str("(empty)\n");
            return out;
        }
        self.walk(|id, _, depth| {
            let node = self.store.get(id);
            let kind = if node.is_key() { "key" } else { "branch" };
            let _ = writeln!(
                out,
                "{:indent$}\"{}\" {kind}",
                "",
                escape(&node.label),
                indent = depth * 2
            );
        });
        out
    }

    /// Check every structural invariant, returning one message per violation.
    /// An empty result means the tree is well formed.
    pub fn verify_integrity(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut reachable = 0usize;
        let mut keys = 0usize;
        let root = self.root;

        self.walk(|id, path, _| {
            reachable += 1;
            let node = self.store.get(id);
            let at = escape(path);
            if node.is_key() {
                keys += 1;
            } else if node.children.len() < 2 {
                errors.push(format!(
                    "valueless node at {at:?} has {} children",
                    node.children.len()
                ));
            }
            if Some(id) != root && node.label.is_empty() {
                errors.push(format!("non-root node at {at:?} has an empty label"));
            }
            if !node.children.windows(2).all(|w| w[0].0 < w[1].0) {
                errors.push(format!("children of {at:?} are not strictly sorted"));
            }
            for &(byte, child) in &node.children {
                let first = self.store.get(child).label.first().copied();
                if first != Some(byte) {
                    errors.push(format!(
                        "child of {at:?} indexed by {byte:#04x} starts with {first:?}"
                    ));
                }
            }
        });

        if reachable != self.store.len() {
            errors.push(format!(
                "{} nodes allocated but {reachable} reachable",
                self.store.len()
            ));
        }
        if keys != self.len() {
            errors.push(format!("len is {} but {keys} keys found", self.len()));
        }
        errors
    }
}
