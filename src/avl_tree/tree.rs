use crate::arena::{Arena, Handle};
use crate::avl_tree::node::{Node, Side};
use crate::entry::Entry;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;

/// An arena-backed avl tree.
///
/// Nodes refer to their parent and children through arena handles, so
/// rotations are O(1) index relinks. Every structural edit goes through the
/// plain binary-search-tree mechanics first and is then followed by an
/// iterative fixup walk toward the root that restores the balance invariant.
pub struct Tree<T, U> {
    pub nodes: Arena<Node<T, U>>,
    pub root: Option<Handle>,
}

impl<T, U> Tree<T, U> {
    pub fn new() -> Self {
        Tree {
            nodes: Arena::new(),
            root: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    fn side_of(&self, handle: Handle) -> Option<Side> {
        self.nodes[handle].parent.map(|parent| {
            if self.nodes[parent].left == Some(handle) {
                Side::Left
            } else {
                Side::Right
            }
        })
    }

    /// Links `child` into `parent`'s slot on `side` and fixes the back link.
    fn set_child(&mut self, parent: Handle, side: Side, child: Option<Handle>) {
        *self.nodes[parent].child_mut(side) = child;
        if let Some(child) = child {
            self.nodes[child].parent = Some(parent);
        }
    }

    pub fn find<V>(&self, key: &V) -> Option<Handle>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(handle) = current {
            let node = &self.nodes[handle];
            match key.cmp(node.entry.key.borrow()) {
                Ordering::Less => current = node.left,
                Ordering::Greater => current = node.right,
                Ordering::Equal => return Some(handle),
            }
        }
        None
    }

    /// The node holding the largest key smaller than `handle`'s key.
    fn predecessor(&self, handle: Handle) -> Option<Handle> {
        if let Some(mut current) = self.nodes[handle].left {
            while let Some(right) = self.nodes[current].right {
                current = right;
            }
            return Some(current);
        }
        let mut current = handle;
        while let Some(parent) = self.nodes[current].parent {
            if self.nodes[parent].right == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    /// Exchanges the tree positions of two nodes.
    ///
    /// Only the navigational links move; each node's entry stays attached to
    /// its own handle. Balance factors describe tree positions rather than
    /// node identities, so they travel with the swap; the fixup case
    /// analysis after a removal would otherwise read stale balances.
    fn swap_positions(&mut self, n1: Handle, n2: Handle) {
        if n1 == n2 {
            return;
        }

        let n1_parent = self.nodes[n1].parent;
        let n1_left = self.nodes[n1].left;
        let n1_right = self.nodes[n1].right;
        let n1_side = self.side_of(n1);
        let n2_parent = self.nodes[n2].parent;
        let n2_left = self.nodes[n2].left;
        let n2_right = self.nodes[n2].right;
        let n2_side = self.side_of(n2);

        self.nodes[n1].parent = n2_parent;
        self.nodes[n2].parent = n1_parent;
        self.nodes[n1].left = n2_left;
        self.nodes[n2].left = n1_left;
        self.nodes[n1].right = n2_right;
        self.nodes[n2].right = n1_right;

        // A blind exchange leaves adjacent nodes pointing at themselves.
        if n1_left == Some(n2) {
            self.nodes[n2].left = Some(n1);
            self.nodes[n1].parent = Some(n2);
        } else if n1_right == Some(n2) {
            self.nodes[n2].right = Some(n1);
            self.nodes[n1].parent = Some(n2);
        } else if n2_left == Some(n1) {
            self.nodes[n1].left = Some(n2);
            self.nodes[n2].parent = Some(n1);
        } else if n2_right == Some(n1) {
            self.nodes[n1].right = Some(n2);
            self.nodes[n2].parent = Some(n1);
        }

        if let (Some(parent), Some(side)) = (n1_parent, n1_side) {
            if parent != n2 {
                *self.nodes[parent].child_mut(side) = Some(n2);
            }
        }
        if let (Some(parent), Some(side)) = (n2_parent, n2_side) {
            if parent != n1 {
                *self.nodes[parent].child_mut(side) = Some(n1);
            }
        }

        for child in &[n1_left, n1_right] {
            if let Some(child) = *child {
                if child != n2 {
                    self.nodes[child].parent = Some(n2);
                }
            }
        }
        for child in &[n2_left, n2_right] {
            if let Some(child) = *child {
                if child != n1 {
                    self.nodes[child].parent = Some(n1);
                }
            }
        }

        if self.root == Some(n1) {
            self.root = Some(n2);
        } else if self.root == Some(n2) {
            self.root = Some(n1);
        }

        let balance = self.nodes[n1].balance;
        self.nodes[n1].balance = self.nodes[n2].balance;
        self.nodes[n2].balance = balance;
    }

    /// Rotates the subtree rooted at `node` in direction `dir`, raising the
    /// child on the opposite side to the subtree root.
    ///
    /// The rising child's `dir`-side subtree crosses over to `node`, and the
    /// new subtree root is relinked to `node`'s former parent, or becomes the
    /// tree root. No node is allocated or freed and the in-order key sequence
    /// is unchanged.
    fn rotate(&mut self, node: Handle, dir: Side) {
        let up = self.nodes[node]
            .child(dir.opposite())
            .expect("Error: expected a child on the rising side of a rotation.");
        let inner = self.nodes[up].child(dir);

        self.set_child(node, dir.opposite(), inner);

        let parent = self.nodes[node].parent;
        self.nodes[up].parent = parent;
        match parent {
            None => self.root = Some(up),
            Some(parent) => {
                let side = if self.nodes[parent].left == Some(node) {
                    Side::Left
                } else {
                    Side::Right
                };
                *self.nodes[parent].child_mut(side) = Some(up);
            }
        }

        self.set_child(up, dir, Some(node));
    }

    /// Inserts a key-value pair, rebalancing if the new node tipped an
    /// ancestor out of balance. A duplicate key overwrites the value in place
    /// and returns the old entry; the tree shape is untouched in that case,
    /// so no fixup runs.
    pub fn insert(&mut self, key: T, value: U) -> Option<Entry<T, U>>
    where
        T: Ord,
    {
        let mut current = match self.root {
            None => {
                let handle = self.nodes.allocate(Node::new(key, value));
                self.root = Some(handle);
                return None;
            }
            Some(handle) => handle,
        };

        loop {
            let side = match key.cmp(&self.nodes[current].entry.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => {
                    let entry = Entry { key, value };
                    return Some(mem::replace(&mut self.nodes[current].entry, entry));
                }
            };
            match self.nodes[current].child(side) {
                Some(child) => current = child,
                None => {
                    let new = self.nodes.allocate(Node::new(key, value));
                    self.set_child(current, side, Some(new));
                    self.nodes[current].balance += side.sign();
                    if self.nodes[current].balance != 0 {
                        self.insert_fix(current, new);
                    }
                    return None;
                }
            }
        }
    }

    /// Propagates a height increase from a freshly grown subtree toward the
    /// root, one ancestor level per iteration.
    ///
    /// Entered with `parent` one taller than before the insert and `child`
    /// the taller of `parent`'s children. Terminates on reaching the root, on
    /// absorbing the growth at a node whose shorter side was filled in, or
    /// after one rotation, which restores the subtree to its pre-insert
    /// height.
    fn insert_fix(&mut self, parent: Handle, child: Handle) {
        let mut parent = parent;
        let mut child = child;
        loop {
            let grandparent = match self.nodes[parent].parent {
                None => return,
                Some(handle) => handle,
            };
            let side = if self.nodes[grandparent].left == Some(parent) {
                Side::Left
            } else {
                Side::Right
            };
            let sign = side.sign();

            self.nodes[grandparent].balance += sign;
            let balance = self.nodes[grandparent].balance;
            if balance == 0 {
                // The insert filled in the grandparent's shorter side.
                return;
            }
            if balance == sign {
                child = parent;
                parent = grandparent;
                continue;
            }

            // balance is now 2 * sign.
            if self.nodes[parent].balance == sign {
                // Zig-zig: one rotation against the lean levels all three.
                self.rotate(grandparent, side.opposite());
                self.nodes[parent].balance = 0;
                self.nodes[grandparent].balance = 0;
            } else {
                // Zig-zag: the inner node rises two levels; its old balance
                // decides which of the other two keeps a one-node surplus.
                let inner_balance = self.nodes[child].balance;
                self.rotate(parent, side);
                self.rotate(grandparent, side.opposite());
                let (parent_balance, grandparent_balance) = if inner_balance == sign {
                    (0, -sign)
                } else if inner_balance == 0 {
                    (0, 0)
                } else {
                    (sign, 0)
                };
                self.nodes[parent].balance = parent_balance;
                self.nodes[grandparent].balance = grandparent_balance;
                self.nodes[child].balance = 0;
            }
            return;
        }
    }

    /// Removes a key, rebalancing the ancestors of the vacated position.
    /// Returns `None` without touching the tree if the key is absent.
    pub fn remove<V>(&mut self, key: &V) -> Option<Entry<T, U>>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let target = self.find(key)?;

        if self.nodes[target].left.is_some() && self.nodes[target].right.is_some() {
            let predecessor = self
                .predecessor(target)
                .expect("Error: expected a predecessor for a node with two children.");
            self.swap_positions(target, predecessor);
        }

        // At most one child remains below the target after the swap.
        let parent = self.nodes[target].parent;
        let child = self.nodes[target].left.or(self.nodes[target].right);

        match parent {
            None => {
                self.root = child;
                if let Some(child) = child {
                    self.nodes[child].parent = None;
                }
                Some(self.nodes.free(target).entry)
            }
            Some(parent) => {
                let side = if self.nodes[parent].left == Some(target) {
                    Side::Left
                } else {
                    Side::Right
                };
                self.set_child(parent, side, child);
                let entry = self.nodes.free(target).entry;
                self.remove_fix(parent, -side.sign());
                Some(entry)
            }
        }
    }

    /// Propagates a height decrease from below `node` toward the root.
    ///
    /// `diff` is the balance delta `node` owes to the subtree that shrank:
    /// +1 when the loss was on its left, -1 when on its right. Each level
    /// either absorbs the change (the shorter side shrank, or a rotation
    /// restored the old height) or shortens its own subtree and passes the
    /// delta to the next ancestor.
    fn remove_fix(&mut self, node: Handle, diff: i8) {
        let mut node = node;
        let mut diff = diff;
        loop {
            let parent = self.nodes[node].parent;
            // Delta for the next level, taken before any rotation below
            // changes who this node's parent is.
            let next_diff = match parent {
                Some(parent) if self.nodes[parent].left == Some(node) => 1,
                Some(_) => -1,
                None => 0,
            };

            let balance = self.nodes[node].balance + diff;
            if balance == -1 || balance == 1 {
                // The shrunken side was the taller one or they were level;
                // the subtree height seen from above is unchanged.
                self.nodes[node].balance = balance;
                return;
            }
            if balance == 0 {
                self.nodes[node].balance = 0;
                match parent {
                    None => return,
                    Some(handle) => {
                        node = handle;
                        diff = next_diff;
                        continue;
                    }
                }
            }

            // balance is +-2: the shrink exposed an imbalance toward the
            // other side, whose child must exist and decides the rotation.
            let side = if balance < 0 { Side::Left } else { Side::Right };
            let sign = side.sign();
            let child = self.nodes[node]
                .child(side)
                .expect("Error: expected a child on the taller side of an imbalanced node.");
            let child_balance = self.nodes[child].balance;

            if child_balance == -sign {
                // Zig-zag: same double rotation and balance table as the
                // insert fixup, keyed on the rising grandchild.
                let grandchild = self.nodes[child]
                    .child(side.opposite())
                    .expect("Error: expected an inner grandchild for a double rotation.");
                let grandchild_balance = self.nodes[grandchild].balance;
                self.rotate(child, side);
                self.rotate(node, side.opposite());
                let (child_new_balance, node_new_balance) = if grandchild_balance == sign {
                    (0, -sign)
                } else if grandchild_balance == 0 {
                    (0, 0)
                } else {
                    (sign, 0)
                };
                self.nodes[child].balance = child_new_balance;
                self.nodes[node].balance = node_new_balance;
                self.nodes[grandchild].balance = 0;
            } else {
                self.rotate(node, side.opposite());
                if child_balance == 0 {
                    // The rising child keeps a surplus on the inner side, so
                    // the subtree is as tall as before the removal.
                    self.nodes[node].balance = sign;
                    self.nodes[child].balance = -sign;
                    return;
                }
                // child_balance == sign: the rotation levels both nodes and
                // the subtree ends up one shorter, like the zig-zag case.
                self.nodes[node].balance = 0;
                self.nodes[child].balance = 0;
            }

            match parent {
                None => return,
                Some(handle) => {
                    node = handle;
                    diff = next_diff;
                }
            }
        }
    }

    pub fn get<V>(&self, key: &V) -> Option<&Entry<T, U>>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        self.find(key).map(move |handle| &self.nodes[handle].entry)
    }

    pub fn get_mut<V>(&mut self, key: &V) -> Option<&mut Entry<T, U>>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        match self.find(key) {
            Some(handle) => Some(&mut self.nodes[handle].entry),
            None => None,
        }
    }

    fn extreme(&self, side: Side) -> Option<Handle> {
        let mut current = self.root?;
        while let Some(next) = self.nodes[current].child(side) {
            current = next;
        }
        Some(current)
    }

    pub fn min(&self) -> Option<&Entry<T, U>> {
        self.extreme(Side::Left)
            .map(move |handle| &self.nodes[handle].entry)
    }

    pub fn max(&self) -> Option<&Entry<T, U>> {
        self.extreme(Side::Right)
            .map(move |handle| &self.nodes[handle].entry)
    }

    pub fn floor<V>(&self, key: &V) -> Option<&Entry<T, U>>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let mut current = self.root;
        let mut result = None;
        while let Some(handle) = current {
            let node = &self.nodes[handle];
            match key.cmp(node.entry.key.borrow()) {
                Ordering::Less => current = node.left,
                Ordering::Greater => {
                    result = Some(handle);
                    current = node.right;
                }
                Ordering::Equal => return Some(&node.entry),
            }
        }
        result.map(move |handle| &self.nodes[handle].entry)
    }

    pub fn ceil<V>(&self, key: &V) -> Option<&Entry<T, U>>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let mut current = self.root;
        let mut result = None;
        while let Some(handle) = current {
            let node = &self.nodes[handle];
            match key.cmp(node.entry.key.borrow()) {
                Ordering::Greater => current = node.right,
                Ordering::Less => {
                    result = Some(handle);
                    current = node.left;
                }
                Ordering::Equal => return Some(&node.entry),
            }
        }
        result.map(move |handle| &self.nodes[handle].entry)
    }
}

impl<T, U> Default for Tree<T, U> {
    fn default() -> Self {
        Self::new()
    }
}

// O(n) cross-checks of the incrementally maintained state. Test-only; the
// operational code never recomputes heights.
#[cfg(test)]
impl<T, U> Tree<T, U>
where
    T: Ord,
{
    pub fn assert_invariants(&self) {
        if let Some(root) = self.root {
            assert_eq!(self.nodes[root].parent, None);
            self.verify_subtree(root);
            let mut keys = Vec::new();
            self.collect_keys(root, &mut keys);
            for window in keys.windows(2) {
                assert!(window[0] < window[1]);
            }
            assert_eq!(keys.len(), self.len());
        } else {
            assert_eq!(self.len(), 0);
        }
    }

    pub fn height(&self) -> usize {
        self.root.map_or(0, |root| self.subtree_height(root))
    }

    fn subtree_height(&self, handle: Handle) -> usize {
        let node = &self.nodes[handle];
        let left = node.left.map_or(0, |child| self.subtree_height(child));
        let right = node.right.map_or(0, |child| self.subtree_height(child));
        std::cmp::max(left, right) + 1
    }

    fn verify_subtree(&self, handle: Handle) -> usize {
        let node = &self.nodes[handle];
        for &side in &[Side::Left, Side::Right] {
            if let Some(child) = node.child(side) {
                assert_eq!(self.nodes[child].parent, Some(handle));
            }
        }
        let left = node.left.map_or(0, |child| self.verify_subtree(child));
        let right = node.right.map_or(0, |child| self.verify_subtree(child));
        assert!(node.balance >= -1 && node.balance <= 1);
        assert_eq!(i64::from(node.balance), right as i64 - left as i64);
        std::cmp::max(left, right) + 1
    }

    fn collect_keys<'a>(&'a self, handle: Handle, keys: &mut Vec<&'a T>) {
        let node = &self.nodes[handle];
        if let Some(left) = node.left {
            self.collect_keys(left, keys);
        }
        keys.push(&node.entry.key);
        if let Some(right) = node.right {
            self.collect_keys(right, keys);
        }
    }
}
