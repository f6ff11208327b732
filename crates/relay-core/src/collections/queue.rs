//! Doubly-linked FIFO queue backed by an index arena.
//!
//! Nodes live in a `Vec` of slots and link to each other by index, so head and tail
//! operations are O(1) without `unsafe` or reference counting. Freed slots are
//! recycled, which keeps the arena no larger than the high-water mark of the queue.
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `append`, `prepend`, `remove_head`, `remove_tail` | O(1) |
//! | `insert_after`, `remove`, `contains` | O(n) scan |
//! | `*_unique` insertions | O(n) duplicate scan, then as above |
//!
//! The queue carries no capacity of its own. Bounded structures built on it
//! ([`DispatcherPool`](crate::dispatch::DispatcherPool),
//! [`SessionCache`](crate::session::SessionCache)) enforce their limits by evicting
//! from the head.

use std::{fmt, iter::FusedIterator};

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<usize>,
    next: Option<usize>,
}

/// FIFO queue with O(1) insertion and removal at both ends.
pub struct Queue<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), head: None, tail: None, len: 0 }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the oldest element.
    #[must_use]
    pub fn head(&self) -> Option<&T> {
        self.head.and_then(|idx| self.node(idx)).map(|node| &node.value)
    }

    /// Returns the newest element.
    #[must_use]
    pub fn tail(&self) -> Option<&T> {
        self.tail.and_then(|idx| self.node(idx)).map(|node| &node.value)
    }

    /// Appends `value` at the tail.
    pub fn append(&mut self, value: T) {
        let idx = self.alloc(Node { value, prev: self.tail, next: None });
        match self.tail {
            Some(tail) => {
                if let Some(node) = self.node_mut(tail) {
                    node.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    /// Inserts `value` at the head.
    pub fn prepend(&mut self, value: T) {
        let idx = self.alloc(Node { value, prev: None, next: self.head });
        match self.head {
            Some(head) => {
                if let Some(node) = self.node_mut(head) {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;
    }

    /// Removes and returns the oldest element.
    pub fn remove_head(&mut self) -> Option<T> {
        self.head.and_then(|idx| self.unlink(idx))
    }

    /// Removes and returns the newest element.
    pub fn remove_tail(&mut self) -> Option<T> {
        self.tail.and_then(|idx| self.unlink(idx))
    }

    /// FIFO alias for [`append`](Self::append).
    pub fn enqueue(&mut self, value: T) {
        self.append(value);
    }

    /// FIFO alias for [`remove_head`](Self::remove_head).
    pub fn dequeue(&mut self) -> Option<T> {
        self.remove_head()
    }

    /// Removes the first element matching `predicate` and returns it.
    pub fn remove_first_where<F>(&mut self, mut predicate: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let idx = self.find_index(|value| predicate(value))?;
        self.unlink(idx)
    }

    /// Keeps only the elements for which `predicate` returns `true`, preserving order.
    pub fn retain<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&T) -> bool,
    {
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(node) = self.node(idx) else { break };
            cursor = node.next;
            if !predicate(&node.value) {
                self.unlink(idx);
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates from head to tail.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { queue: self, cursor: self.head, remaining: self.len }
    }

    fn node(&self, idx: usize) -> Option<&Node<T>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<T>> {
        self.slots.get_mut(idx).and_then(Option::as_mut)
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            self.slots.len() - 1
        }
    }

    fn find_index<F>(&self, mut predicate: F) -> Option<usize>
    where
        F: FnMut(&T) -> bool,
    {
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx)?;
            if predicate(&node.value) {
                return Some(idx);
            }
            cursor = node.next;
        }
        None
    }

    fn unlink(&mut self, idx: usize) -> Option<T> {
        let node = self.slots.get_mut(idx)?.take()?;

        match node.prev {
            Some(prev) => {
                if let Some(prev_node) = self.node_mut(prev) {
                    prev_node.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => {
                if let Some(next_node) = self.node_mut(next) {
                    next_node.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }

        self.free.push(idx);
        self.len -= 1;
        Some(node.value)
    }
}

impl<T: PartialEq> Queue<T> {
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.find_index(|candidate| candidate == value).is_some()
    }

    /// Appends `value` unless an equal element is already queued.
    ///
    /// Returns `false` without modifying the queue on a duplicate.
    pub fn append_unique(&mut self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.append(value);
        true
    }

    /// Prepends `value` unless an equal element is already queued.
    pub fn prepend_unique(&mut self, value: T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.prepend(value);
        true
    }

    /// Inserts `value` directly after the first element equal to `target`.
    ///
    /// Returns `false` if `target` is not queued.
    pub fn insert_after(&mut self, value: T, target: &T) -> bool {
        let Some(target_idx) = self.find_index(|candidate| candidate == target) else {
            return false;
        };
        let next = self.node(target_idx).and_then(|node| node.next);

        let idx = self.alloc(Node { value, prev: Some(target_idx), next });
        if let Some(node) = self.node_mut(target_idx) {
            node.next = Some(idx);
        }
        match next {
            Some(next) => {
                if let Some(node) = self.node_mut(next) {
                    node.prev = Some(idx);
                }
            }
            None => self.tail = Some(idx),
        }
        self.len += 1;
        true
    }

    /// Like [`insert_after`](Self::insert_after), but also refuses duplicates of `value`.
    pub fn insert_after_unique(&mut self, value: T, target: &T) -> bool {
        if self.contains(&value) {
            return false;
        }
        self.insert_after(value, target)
    }

    /// Removes the first element equal to `value` and returns it.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        self.remove_first_where(|candidate| candidate == value)
    }
}

impl<T: Clone> Queue<T> {
    /// Copies the queue into a `Vec`, head first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for Queue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::new();
        queue.extend(iter);
        queue
    }
}

impl<T> Extend<T> for Queue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }
}

impl<T> From<Vec<T>> for Queue<T> {
    fn from(values: Vec<T>) -> Self {
        values.into_iter().collect()
    }
}

/// Borrowing iterator over a [`Queue`], head to tail.
pub struct Iter<'a, T> {
    queue: &'a Queue<T>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.node(self.cursor?)?;
        self.cursor = node.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a Queue<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator that drains a [`Queue`] from the head.
pub struct IntoIter<T>(Queue<T>);

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.remove_head()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.0.len(), Some(self.0.len()))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> IntoIterator for Queue<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter(self)
    }
}
