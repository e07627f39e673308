//! Scoped tracker state
//!
//! A boot sub-phase (or a test) pushes the tracker state and works on a
//! fresh one; popping rolls everything back. Pop is a full state
//! replacement, not a diff.

use core::mem;

use crate::error::{Error, Result};
use crate::region::RegionList;
use crate::tracker::MemoryTracker;

/// One saved `(available, used)` pair.
#[derive(Debug)]
pub(crate) struct SavedState {
    available: RegionList,
    used: RegionList,
}

impl MemoryTracker {
    /// Saves the current state onto the internal stack and leaves the
    /// tracker empty.
    pub fn push(&mut self) {
        log::trace!("push called, depth={}", self.saved.len());

        let state = SavedState {
            available: mem::take(&mut self.available),
            used: mem::take(&mut self.used),
        };
        self.saved.push(state);
    }

    /// Discards the current state and restores the most recently pushed one,
    /// including all reservations made in between.
    pub fn pop(&mut self) -> Result<()> {
        log::trace!("pop called, depth={}", self.saved.len());

        let state = self.saved.pop().ok_or(Error::InvalidState)?;
        self.available = state.available;
        self.used = state.used;

        Ok(())
    }

    /// Returns how many states are currently saved.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}
