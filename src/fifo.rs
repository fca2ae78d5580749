use serde::{Deserialize, Serialize};

/// What a push does when the FIFO is already full.
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Keep the queued events, discard the incoming one.
    #[default]
    DropNewest,
    /// Evict the head to make room for the incoming one.
    DropOldest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome<T> {
    Queued,
    DroppedNewest(T),
    EvictedOldest(T),
}

impl<T> PushOutcome<T> {
    pub fn is_queued(&self) -> bool {
        matches!(self, PushOutcome::Queued)
    }
}

/// Fixed-capacity ring buffer. `N` must be a power of two.
#[derive(Debug, Clone)]
pub struct Fifo<T, const N: usize> {
    storage: [T; N],
    head: usize,
    tail: usize,
    len: usize,
    policy: OverflowPolicy,
    dropped: u32,
}

impl<T: Copy + Default, const N: usize> Default for Fifo<T, N> {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

impl<T: Copy + Default, const N: usize> Fifo<T, N> {
    const CAPACITY_CHECK: () = assert!(N > 0 && N.is_power_of_two(), "FIFO depth must be a power of two");
    const INDEX_MASK: usize = N - 1;

    pub fn new(policy: OverflowPolicy) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_CHECK;
        Self {
            storage: [T::default(); N],
            head: 0,
            tail: 0,
            len: 0,
            policy,
            dropped: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    /// Events lost to overflow since construction (not cleared by `clear`).
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn push(&mut self, item: T) -> PushOutcome<T> {
        if self.is_full() {
            self.dropped = self.dropped.wrapping_add(1);
            match self.policy {
                OverflowPolicy::DropNewest => return PushOutcome::DroppedNewest(item),
                OverflowPolicy::DropOldest => {
                    let evicted = self.storage[self.head];
                    self.head = (self.head + 1) & Self::INDEX_MASK;
                    self.storage[self.tail] = item;
                    self.tail = (self.tail + 1) & Self::INDEX_MASK;
                    return PushOutcome::EvictedOldest(evicted);
                }
            }
        }
        self.storage[self.tail] = item;
        self.tail = (self.tail + 1) & Self::INDEX_MASK;
        self.len += 1;
        PushOutcome::Queued
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.storage[self.head];
        self.storage[self.head] = T::default();
        self.head = (self.head + 1) & Self::INDEX_MASK;
        self.len -= 1;
        Some(item)
    }

    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            Some(&self.storage[self.head])
        }
    }

    pub fn clear(&mut self) {
        self.storage = [T::default(); N];
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Queued items, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |offset| &self.storage[(self.head + offset) & Self::INDEX_MASK])
    }

    pub fn head_index(&self) -> usize {
        self.head
    }

    pub fn tail_index(&self) -> usize {
        self.tail
    }
}
