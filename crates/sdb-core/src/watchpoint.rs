//! Fixed-capacity watchpoint pool.
//!
//! Slots live in one arena and are threaded onto either the active list or
//! the free list through index links. Both lists are head-inserted, so the
//! newest watchpoint is listed first and the most recently freed slot is the
//! next one handed out.

use std::fmt;

use tracing::debug;

use crate::SWord;

/// Number of slots in the pool.
pub const WATCHPOINT_POOL_SIZE: usize = 32;

/// Stable watchpoint number, equal to its slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WatchId(usize);

impl WatchId {
    /// Wraps a slot index; `None` outside the pool.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < WATCHPOINT_POOL_SIZE {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active watchpoint contents.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WatchRecord {
    /// Watchpoint number.
    pub id: WatchId,
    /// Expression text as entered.
    pub expression: String,
    /// Value observed at creation or at the last change.
    pub last_value: SWord,
}

#[derive(Debug, Clone)]
struct Slot {
    record: WatchRecord,
    next: Option<usize>,
}

/// Arena of [`WATCHPOINT_POOL_SIZE`] slots split into active and free lists.
#[derive(Debug, Clone)]
pub struct WatchPool {
    slots: Vec<Slot>,
    active_head: Option<usize>,
    free_head: Option<usize>,
}

impl Default for WatchPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchPool {
    /// Builds the pool with every slot free, ascending by id.
    #[must_use]
    pub fn new() -> Self {
        let slots = (0..WATCHPOINT_POOL_SIZE)
            .map(|index| Slot {
                record: WatchRecord {
                    id: WatchId(index),
                    expression: String::new(),
                    last_value: 0,
                },
                next: (index + 1 < WATCHPOINT_POOL_SIZE).then_some(index + 1),
            })
            .collect();
        Self {
            slots,
            active_head: None,
            free_head: Some(0),
        }
    }

    /// Moves the free-list head onto the active list and fills it.
    ///
    /// Returns `None` when all slots are in use.
    pub fn allocate(&mut self, expression: impl Into<String>, value: SWord) -> Option<WatchId> {
        let index = self.free_head?;
        let slot = &mut self.slots[index];
        self.free_head = slot.next;
        slot.next = self.active_head;
        slot.record.expression = expression.into();
        slot.record.last_value = value;
        self.active_head = Some(index);
        debug!(id = index, "watchpoint allocated");
        Some(slot.record.id)
    }

    /// Moves `id` from the active list to the free-list head.
    ///
    /// Returns `false`, changing nothing, when `id` is not active.
    pub fn release(&mut self, id: WatchId) -> bool {
        let target = id.index();
        let mut previous: Option<usize> = None;
        let mut cursor = self.active_head;

        while let Some(index) = cursor {
            if index == target {
                let next = self.slots[index].next;
                match previous {
                    Some(prev) => self.slots[prev].next = next,
                    None => self.active_head = next,
                }
                let slot = &mut self.slots[index];
                slot.next = self.free_head;
                slot.record.expression.clear();
                slot.record.last_value = 0;
                self.free_head = Some(index);
                debug!(id = index, "watchpoint released");
                return true;
            }
            previous = cursor;
            cursor = self.slots[index].next;
        }
        false
    }

    /// Looks `id` up on the active list.
    #[must_use]
    pub fn find(&self, id: WatchId) -> Option<&WatchRecord> {
        self.active().find(|record| record.id == id)
    }

    /// Mutable lookup on the active list.
    pub fn find_mut(&mut self, id: WatchId) -> Option<&mut WatchRecord> {
        let index = self.active_indices().find(|&index| index == id.index())?;
        Some(&mut self.slots[index].record)
    }

    /// Active records, newest first.
    pub fn active(&self) -> impl Iterator<Item = &WatchRecord> + '_ {
        self.active_indices().map(|index| &self.slots[index].record)
    }

    /// Active ids, newest first.
    #[must_use]
    pub fn active_ids(&self) -> Vec<WatchId> {
        self.active().map(|record| record.id).collect()
    }

    /// Number of active watchpoints.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active_indices().count()
    }

    /// Number of free slots.
    #[must_use]
    pub fn free_count(&self) -> usize {
        Links::new(&self.slots, self.free_head).count()
    }

    /// `true` when no watchpoint is active.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.active_head.is_none()
    }

    fn active_indices(&self) -> Links<'_> {
        Links::new(&self.slots, self.active_head)
    }
}

struct Links<'a> {
    slots: &'a [Slot],
    cursor: Option<usize>,
}

impl<'a> Links<'a> {
    const fn new(slots: &'a [Slot], head: Option<usize>) -> Self {
        Self {
            slots,
            cursor: head,
        }
    }
}

impl Iterator for Links<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let index = self.cursor?;
        self.cursor = self.slots[index].next;
        Some(index)
    }
}
