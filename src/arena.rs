//! Slab allocator that hands out stable, copyable handles.

use std::mem;
use std::ops::{Index, IndexMut};

/// A handle to an object in an `Arena<T>`.
///
/// Handles are plain indices: copying one never copies the object it refers
/// to, and a handle stays valid until the object it was returned for is
/// freed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Handle(usize);

enum Slot<T> {
    Occupied(T),
    Vacant(Option<Handle>),
}

/// A fast, but limited allocator that only allocates a single type of object.
///
/// All objects inside the arena are destroyed when the arena is destroyed.
/// Freed slots are threaded into an intrusive free list and reused by later
/// allocations, so a long-lived arena does not grow past its high-water mark.
/// The underlying container is simply a `Vec` and no unsafe code is used.
///
/// # Examples
///
/// ```
/// use avl_collections::arena::Arena;
///
/// let mut arena = Arena::new();
///
/// let x = arena.allocate(1);
/// assert_eq!(arena[x], 1);
///
/// arena[x] += 1;
/// assert_eq!(arena[x], 2);
///
/// assert_eq!(arena.free(x), 2);
/// ```
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    head: Option<Handle>,
    len: usize,
}

impl<T> Arena<T> {
    /// Constructs a new, empty `Arena<T>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let arena: Arena<u32> = Arena::new();
    /// ```
    pub fn new() -> Self {
        Arena {
            slots: Vec::new(),
            head: None,
            len: 0,
        }
    }

    /// Constructs a new, empty `Arena<T>` with space for `capacity` objects
    /// before reallocating.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let arena: Arena<u32> = Arena::with_capacity(1024);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            slots: Vec::with_capacity(capacity),
            head: None,
            len: 0,
        }
    }

    /// Allocates an object in the arena and returns a handle to it. The
    /// handle can later be used to retrieve references to the object and to
    /// free it.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// let x = arena.allocate(0);
    /// assert_eq!(arena[x], 0);
    /// ```
    pub fn allocate(&mut self, value: T) -> Handle {
        self.len += 1;
        match self.head {
            None => {
                self.slots.push(Slot::Occupied(value));
                Handle(self.slots.len() - 1)
            }
            Some(handle) => {
                let slot = mem::replace(&mut self.slots[handle.0], Slot::Occupied(value));
                match slot {
                    Slot::Vacant(next) => {
                        self.head = next;
                        handle
                    }
                    Slot::Occupied(_) => unreachable!(),
                }
            }
        }
    }

    /// Frees the object associated with a handle and returns it.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not refer to a live object.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// let x = arena.allocate(1);
    /// assert_eq!(arena.free(x), 1);
    /// ```
    pub fn free(&mut self, handle: Handle) -> T {
        let slot = mem::replace(&mut self.slots[handle.0], Slot::Vacant(self.head));
        match slot {
            Slot::Occupied(value) => {
                self.head = Some(handle);
                self.len -= 1;
                value
            }
            Slot::Vacant(next) => {
                self.slots[handle.0] = Slot::Vacant(next);
                panic!("Error: slot is already vacant.")
            }
        }
    }

    /// Returns an immutable reference to the object associated with a handle.
    /// Returns `None` if the handle does not refer to a live object.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.get(x), Some(&0));
    /// ```
    pub fn get(&self, handle: Handle) -> Option<&T> {
        match self.slots.get(handle.0) {
            Some(&Slot::Occupied(ref value)) => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the object associated with a handle.
    /// Returns `None` if the handle does not refer to a live object.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// let x = arena.allocate(0);
    /// assert_eq!(arena.get_mut(x), Some(&mut 0));
    /// ```
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        match self.slots.get_mut(handle.0) {
            Some(&mut Slot::Occupied(ref mut value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the number of live objects in the arena.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// arena.allocate(0);
    /// assert_eq!(arena.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the arena contains no live objects.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let arena: Arena<u32> = Arena::new();
    /// assert!(arena.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Clears the arena, dropping all live objects and discarding the free
    /// list.
    ///
    /// # Examples
    ///
    /// ```
    /// use avl_collections::arena::Arena;
    ///
    /// let mut arena = Arena::new();
    /// arena.allocate(0);
    /// arena.clear();
    /// assert!(arena.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.len = 0;
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Handle> for Arena<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &Self::Output {
        self.get(handle).expect("Error: handle out of bounds.")
    }
}

impl<T> IndexMut<Handle> for Arena<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut Self::Output {
        self.get_mut(handle).expect("Error: handle out of bounds.")
    }
}

#[cfg(test)]
mod tests {
    use super::{Arena, Handle};

    #[test]
    #[should_panic]
    fn test_free_invalid_slot() {
        let mut arena: Arena<u32> = Arena::new();
        arena.allocate(0);
        arena.free(Handle(1));
    }

    #[test]
    #[should_panic]
    fn test_free_vacant_slot() {
        let mut arena = Arena::new();
        let handle = arena.allocate(0);
        arena.free(handle);
        arena.free(handle);
    }

    #[test]
    fn test_allocate() {
        let mut arena = Arena::new();
        assert_eq!(arena.allocate(0), Handle(0));
        assert_eq!(arena.allocate(0), Handle(1));
        assert_eq!(arena.allocate(0), Handle(2));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_free_reuses_slot() {
        let mut arena = Arena::new();
        let handle = arena.allocate(1);
        assert_eq!(arena.free(handle), 1);
        assert_eq!(arena.allocate(2), handle);
        assert_eq!(arena[handle], 2);
    }

    #[test]
    fn test_free_list_order() {
        let mut arena = Arena::new();
        let first = arena.allocate(1);
        let second = arena.allocate(2);
        arena.free(first);
        arena.free(second);
        assert_eq!(arena.allocate(3), second);
        assert_eq!(arena.allocate(4), first);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_get() {
        let mut arena = Arena::new();
        let handle = arena.allocate(0);
        assert_eq!(arena.get(handle), Some(&0));
    }

    #[test]
    fn test_get_invalid_slot() {
        let arena: Arena<u32> = Arena::new();
        assert_eq!(arena.get(Handle(0)), None);
    }

    #[test]
    fn test_get_mut() {
        let mut arena = Arena::new();
        let handle = arena.allocate(0);
        *arena.get_mut(handle).unwrap() = 1;
        assert_eq!(arena[handle], 1);
    }

    #[test]
    fn test_clear() {
        let mut arena = Arena::new();
        arena.allocate(0);
        arena.allocate(1);
        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.get(Handle(0)), None);
    }
}
