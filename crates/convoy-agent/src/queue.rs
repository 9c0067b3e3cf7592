//! The command queue: a stack of batches, FIFO within each batch.
//!
//! Handlers decompose one command into several sub-commands and push the
//! whole batch ahead of everything already queued. The batch keeps its own
//! order, so decomposition runs depth-first: `push(["a", "b"])` then
//! `push(["c"])` pops `c, a, b`.

use std::collections::VecDeque;

/// An explicit double-ended command queue.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    inner: VecDeque<String>,
}

impl CommandQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a whole batch ahead of everything queued, preserving the
    /// batch's internal order.
    pub fn push_batch_front<I, S>(&mut self, batch: I)
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: DoubleEndedIterator,
        S: Into<String>,
    {
        for command in batch.into_iter().rev() {
            self.inner.push_front(command.into());
        }
    }

    /// Take the next command to process.
    pub fn pop_front(&mut self) -> Option<String> {
        self.inner.pop_front()
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Discard everything queued.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Iterate queued commands front to back without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.inner.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_keeps_internal_order() {
        let mut queue = CommandQueue::new();
        queue.push_batch_front(vec!["a", "b"]);
        assert_eq!(queue.pop_front().as_deref(), Some("a"));
        assert_eq!(queue.pop_front().as_deref(), Some("b"));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_later_batch_jumps_ahead() {
        let mut queue = CommandQueue::new();
        queue.push_batch_front(vec!["a", "b"]);
        queue.push_batch_front(vec!["c"]);
        let popped: Vec<String> = std::iter::from_fn(|| queue.pop_front()).collect();
        assert_eq!(popped, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_nested_decomposition_runs_depth_first() {
        let mut queue = CommandQueue::new();
        queue.push_batch_front(vec!["outer-1", "outer-2"]);
        // Processing outer-1 expands into two sub-steps.
        assert_eq!(queue.pop_front().as_deref(), Some("outer-1"));
        queue.push_batch_front(vec!["sub-1", "sub-2"]);
        let popped: Vec<String> = std::iter::from_fn(|| queue.pop_front()).collect();
        assert_eq!(popped, vec!["sub-1", "sub-2", "outer-2"]);
    }

    #[test]
    fn test_clear() {
        let mut queue = CommandQueue::new();
        queue.push_batch_front(vec!["a"]);
        queue.clear();
        assert!(queue.is_empty());
    }
}
