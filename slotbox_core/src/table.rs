use thiserror::Error;

/// Errors raised by handle-table operations.
///
/// Every variant is recoverable at the scope of one command; the dispatch
/// loop reports it and keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The index is negative or at/past the configured slot cap, so no slot
    /// could ever live there.
    #[error("index {index} out of range (max {max} slots)")]
    IndexOutOfRange { index: i64, max: usize },

    /// The index is addressable but holds no slot: never created, or already
    /// freed.
    #[error("slot {index} not allocated")]
    NotAllocated { index: usize },

    /// An offset/count/start/end argument does not fit the slot's actual
    /// size.
    #[error("range {start}..{end} invalid for slot of size {size}")]
    InvalidRange {
        start: i64,
        end: i64,
        size: usize,
    },
}

/// Validated conversion of a parsed integer into a table index.
pub fn to_index(value: i64, max: usize) -> Result<usize, TableError> {
    if value < 0 || value as u64 >= max as u64 {
        return Err(TableError::IndexOutOfRange { index: value, max });
    }
    Ok(value as usize)
}

/// Validates an inclusive-exclusive range against a slot size, returning it
/// as `usize` bounds.
pub fn checked_range(start: i64, end: i64, size: usize) -> Result<(usize, usize), TableError> {
    if start < 0 || end < start || end as u64 > size as u64 {
        return Err(TableError::InvalidRange { start, end, size });
    }
    Ok((start as usize, end as usize))
}

/// Index-addressed, lazily growing collection of owned slots.
///
/// The table is the exclusive owner of all slot storage. Slots come into
/// existence only through `create`, are handed out by validated accessors,
/// and leave through `free` — a second `free` of the same index is an error,
/// not a double release.
///
/// Growth is driven by the highest index passed to `create` and bounded by
/// `max_slots`; indices at or beyond the cap are rejected before any
/// allocation happens.
#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Option<T>>,
    max_slots: usize,
}

impl<T> HandleTable<T> {
    pub fn new(max_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_slots,
        }
    }

    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Number of currently allocated slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    /// Places `slot` at `index`, growing the table as needed. Replaces and
    /// drops any slot already there.
    pub fn create(&mut self, index: usize, slot: T) -> Result<(), TableError> {
        if index >= self.max_slots {
            return Err(TableError::IndexOutOfRange {
                index: index as i64,
                max: self.max_slots,
            });
        }
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(slot);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&T, TableError> {
        self.slots
            .get(index)
            .and_then(|s| s.as_ref())
            .ok_or(TableError::NotAllocated { index })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, TableError> {
        self.slots
            .get_mut(index)
            .and_then(|s| s.as_mut())
            .ok_or(TableError::NotAllocated { index })
    }

    pub fn is_allocated(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    /// Removes and returns the slot at `index`. Freeing an absent slot is an
    /// error, never a silent no-op.
    pub fn free(&mut self, index: usize) -> Result<T, TableError> {
        match self.slots.get_mut(index).and_then(|slot| slot.take()) {
            Some(slot) => Ok(slot),
            None => Err(TableError::NotAllocated { index }),
        }
    }

    /// Iterates over allocated `(index, &slot)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|slot| (i, slot)))
    }
}
