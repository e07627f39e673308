//! Physical memory tracking
//!
//! The tracker owns two region lists: the memory declared available by board
//! bring-up, and the ranges currently reserved out of it. All mutations go
//! through the operations defined here and in [`crate::allocator`]; callers
//! only ever receive `Region` values copied out of the lists.

extern crate alloc;

use alloc::vec::Vec;

use crate::context::SavedState;
use crate::error::{Error, Result};
use crate::region::{Region, RegionFlags, RegionList};

/// Tracks available physical memory and the reservations carved out of it.
///
/// Exactly one tracker is threaded through a boot; board bring-up populates
/// the available list with [`MemoryTracker::add_memory`], then consumers
/// reserve, allocate and free ranges until an operating system takes over.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    pub(crate) available: RegionList,
    pub(crate) used: RegionList,
    pub(crate) saved: Vec<SavedState>,
}

impl MemoryTracker {
    /// Creates an empty tracker with no memory declared.
    pub const fn new() -> Self {
        Self {
            available: RegionList::new(),
            used: RegionList::new(),
            saved: Vec::new(),
        }
    }

    /// Returns the list of available memory banks.
    pub fn available(&self) -> &RegionList {
        &self.available
    }

    /// Returns the list of reserved ranges.
    pub fn used(&self) -> &RegionList {
        &self.used
    }

    /// Declares `[base, base + size)` as available physical memory.
    ///
    /// Called once per detected RAM bank at early boot. Banks that touch or
    /// overlap previously declared memory are fused into one entry.
    pub fn add_memory(&mut self, base: u64, size: u64) -> Result<Region> {
        log::trace!("add_memory called with: base={:#x}, size={:#x}", base, size);

        let bank = checked_region(base, size, RegionFlags::empty())?;
        // The available list only ever holds unflagged entries, so the
        // insertion cannot collide.
        self.available
            .insert_or_merge(bank)
            .map_err(|_| Error::Conflict)
    }

    /// Marks `[base, base + size)` as used.
    ///
    /// The range must lie inside one declared memory bank. A true overlap
    /// with an existing reservation is allowed only when both sides carry no
    /// flags, in which case the regions coalesce; any flagged overlap is
    /// rejected, including an exact duplicate. Touching ranges never
    /// conflict and fuse only when their flags are equal. On failure the
    /// used list is left unchanged.
    pub fn reserve(&mut self, base: u64, size: u64, flags: RegionFlags) -> Result<Region> {
        log::trace!(
            "reserve called with: base={:#x}, size={:#x}, flags={:?}",
            base,
            size,
            flags
        );

        let region = checked_region(base, size, flags)?;
        if !self.available.covers(base, size) {
            log::debug!("reserve: {:#x}..{:#x} outside declared memory", base, base + size);
            return Err(Error::InvalidRange);
        }

        for entry in &self.used {
            if entry.overlaps(&region) && !(entry.flags.is_empty() && flags.is_empty()) {
                log::debug!(
                    "reserve conflict: {:#x}..{:#x} overlaps {:#x}..{:#x} ({:?})",
                    base,
                    base + size,
                    entry.base,
                    entry.end(),
                    entry.flags
                );
                return Err(Error::Conflict);
            }
        }

        // Remaining overlaps are unflagged on both sides, so the insertion
        // can only merge.
        self.used.insert_or_merge(region).map_err(|_| Error::Conflict)
    }

    /// Removes exactly `[base, base + size)` from the used list.
    ///
    /// Every reservation the range intersects is trimmed; a range lying
    /// strictly inside a reservation splits it in two, and a range covering
    /// one exactly deletes it. Freeing a range with no corresponding
    /// reservation is an error and leaves the list unchanged. `flags` is
    /// informational and not validated against the stored reservation.
    pub fn free(&mut self, base: u64, size: u64, flags: RegionFlags) -> Result<()> {
        log::trace!(
            "free called with: base={:#x}, size={:#x}, flags={:?}",
            base,
            size,
            flags
        );

        checked_region(base, size, flags)?;
        if !self.available.covers(base, size) {
            return Err(Error::InvalidRange);
        }
        if !self.used.remove_range(base, size) {
            log::debug!("free: {:#x}..{:#x} is not reserved", base, base + size);
            return Err(Error::NotReserved);
        }

        Ok(())
    }

    /// Returns the number of contiguous free bytes starting at `addr`.
    ///
    /// The run ends at the next reservation or at the end of the memory bank
    /// containing `addr`. An address outside declared memory or inside a
    /// reservation is an error.
    pub fn get_free_size(&self, addr: u64) -> Result<u64> {
        let bank = self
            .available
            .iter()
            .find(|r| r.contains(addr))
            .ok_or(Error::InvalidRange)?;

        let mut limit = bank.end();
        for entry in &self.used {
            if entry.contains(addr) {
                return Err(Error::InvalidRange);
            }
            if entry.base > addr {
                limit = limit.min(entry.base);
                break;
            }
        }

        Ok(limit - addr)
    }
}

/// Validates a caller-supplied range before it reaches a list.
fn checked_region(base: u64, size: u64, flags: RegionFlags) -> Result<Region> {
    if size == 0 || base.checked_add(size).is_none() {
        return Err(Error::InvalidRange);
    }
    Ok(Region::new(base, size, flags))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAM: u64 = 0x4000_0000;
    const RAM_SIZE: u64 = 0x2000_0000;

    fn tracker() -> MemoryTracker {
        let mut t = MemoryTracker::new();
        t.add_memory(RAM, RAM_SIZE).unwrap();
        t
    }

    #[test]
    fn test_add_memory_fuses_banks() {
        let mut t = MemoryTracker::new();
        t.add_memory(0x1000_0000, 0x1000_0000).unwrap();
        t.add_memory(0x2000_0000, 0x1000_0000).unwrap();
        t.add_memory(0x1800_0000, 0x1000_0000).unwrap();

        assert_eq!(t.available().len(), 1);
        assert_eq!(
            t.available().get(0).unwrap(),
            &Region::new(0x1000_0000, 0x2000_0000, RegionFlags::empty())
        );
    }

    #[test]
    fn test_reserve_rejects_zero_size() {
        let mut t = tracker();
        assert_eq!(
            t.reserve(RAM, 0, RegionFlags::empty()),
            Err(Error::InvalidRange)
        );
    }

    #[test]
    fn test_reserve_outside_memory() {
        let mut t = tracker();
        assert_eq!(
            t.reserve(RAM + RAM_SIZE, 4, RegionFlags::empty()),
            Err(Error::InvalidRange)
        );
        assert_eq!(
            t.reserve(RAM - 1, 4, RegionFlags::empty()),
            Err(Error::InvalidRange)
        );
    }

    #[test]
    fn test_reserve_free_round_trip() {
        let mut t = tracker();
        t.reserve(RAM + 0x1000, 0x1000, RegionFlags::NOMAP).unwrap();
        t.free(RAM + 0x1000, 0x1000, RegionFlags::NOMAP).unwrap();
        assert!(t.used().is_empty());
    }

    #[test]
    fn test_free_unreserved() {
        let mut t = tracker();
        assert_eq!(
            t.free(RAM, 4, RegionFlags::empty()),
            Err(Error::NotReserved)
        );
    }

    #[test]
    fn test_free_spanning_reservations() {
        let mut t = tracker();
        t.reserve(RAM, 0x1000, RegionFlags::empty()).unwrap();
        t.reserve(RAM + 0x2000, 0x1000, RegionFlags::NOMAP).unwrap();

        t.free(RAM + 0x800, 0x2000, RegionFlags::empty()).unwrap();
        assert_eq!(
            t.used().as_slice(),
            &[
                Region::new(RAM, 0x800, RegionFlags::empty()),
                Region::new(RAM + 0x2800, 0x800, RegionFlags::NOMAP),
            ]
        );
    }

    #[test]
    fn test_get_free_size_errors() {
        let mut t = tracker();
        t.reserve(RAM + 0x1000, 0x1000, RegionFlags::empty()).unwrap();

        assert_eq!(t.get_free_size(RAM - 1), Err(Error::InvalidRange));
        assert_eq!(t.get_free_size(RAM + 0x1800), Err(Error::InvalidRange));
        assert_eq!(t.get_free_size(RAM), Ok(0x1000));
        assert_eq!(t.get_free_size(RAM + 0x2000), Ok(RAM_SIZE - 0x2000));
    }
}
