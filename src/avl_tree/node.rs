use crate::arena::Handle;
use crate::entry::Entry;

/// The side of a child relative to its parent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// The contribution of a subtree on this side to a right-minus-left
    /// balance factor.
    pub fn sign(self) -> i8 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

/// A struct representing an internal node of an avl tree.
///
/// The balance factor is maintained incrementally by the tree; it is kept in
/// {-1, 0, 1} between operations and only leaves that range transiently in
/// the middle of a fixup.
pub struct Node<T, U> {
    pub entry: Entry<T, U>,
    pub balance: i8,
    pub parent: Option<Handle>,
    pub left: Option<Handle>,
    pub right: Option<Handle>,
}

impl<T, U> Node<T, U> {
    pub fn new(key: T, value: U) -> Self {
        Node {
            entry: Entry { key, value },
            balance: 0,
            parent: None,
            left: None,
            right: None,
        }
    }

    pub fn child(&self, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn child_mut(&mut self, side: Side) -> &mut Option<Handle> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}
