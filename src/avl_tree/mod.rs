//! Self-balancing binary search tree where the heights of the two child
//! subtrees of any node differ by at most one. Balance factors are maintained
//! incrementally per edit rather than recomputed from subtree heights, and
//! nodes live in an index arena, so rebalancing is pure handle surgery.

mod map;
mod node;
mod set;
mod tree;

pub use self::map::{AvlMap, AvlMapIntoIter, AvlMapIter};
pub use self::set::{AvlSet, AvlSetIntoIter, AvlSetIter};
