//! Range allocation
//!
//! Allocation is a pure top-down first-fit search over the available list;
//! every winning candidate is committed through [`MemoryTracker::reserve`],
//! never by touching a list directly. Because reservations coalesce with
//! touching same-flag neighbours, repeated allocate/free cycles near an
//! existing reservation keep the used list compact.

use crate::error::{Error, Result};
use crate::region::{Region, RegionFlags};
use crate::tracker::MemoryTracker;

/// Align address down to the given power-of-2 alignment
#[inline]
const fn align_down(addr: u64, align: u64) -> u64 {
    addr & !(align - 1)
}

impl MemoryTracker {
    /// Allocates `size` bytes at the highest free address, aligned to
    /// `align`.
    ///
    /// The reservation carries no flags. Fails with [`Error::Exhausted`]
    /// when no candidate exists; address `0` is never a valid result, so a
    /// search whose only fit starts at `0` fails as well.
    pub fn alloc_anywhere(&mut self, size: u64, align: u64) -> Result<u64> {
        self.alloc_top_down(size, align, None, RegionFlags::empty())
    }

    /// Allocates `size` bytes aligned to `align`, constrained to
    /// `start + size <= ceiling`, reserving with the caller's `flags`.
    pub fn alloc_below(
        &mut self,
        size: u64,
        align: u64,
        ceiling: u64,
        flags: RegionFlags,
    ) -> Result<u64> {
        self.alloc_top_down(size, align, Some(ceiling), flags)
    }

    /// Reserves exactly `[addr, addr + size)` with `flags`.
    ///
    /// Address-directed allocation follows the reservation conflict rule to
    /// the letter; see [`MemoryTracker::reserve`].
    pub fn alloc_at(&mut self, addr: u64, size: u64, flags: RegionFlags) -> Result<u64> {
        self.reserve(addr, size, flags).map(|_| addr)
    }

    fn alloc_top_down(
        &mut self,
        size: u64,
        align: u64,
        ceiling: Option<u64>,
        flags: RegionFlags,
    ) -> Result<u64> {
        log::trace!(
            "alloc called with: size={:#x}, align={:#x}, ceiling={:?}, flags={:?}",
            size,
            align,
            ceiling,
            flags
        );

        if size == 0 || align == 0 || !align.is_power_of_two() {
            return Err(Error::InvalidRange);
        }

        let base = self
            .find_top_down(size, align, ceiling)
            .ok_or(Error::Exhausted)?;
        self.reserve(base, size, flags)?;

        Ok(base)
    }

    /// Walks the available banks from the highest address downward and
    /// returns the highest candidate base that fits `size` without
    /// intersecting any reservation.
    fn find_top_down(&self, size: u64, align: u64, ceiling: Option<u64>) -> Option<u64> {
        for bank in self.available.iter().rev() {
            let mut window_end = bank.end();
            if let Some(limit) = ceiling {
                if bank.base >= limit {
                    continue;
                }
                window_end = window_end.min(limit);
            }

            let Some(top) = window_end.checked_sub(size) else {
                continue;
            };
            let mut base = align_down(top, align);

            while base >= bank.base {
                let candidate = Region::new(base, size, RegionFlags::empty());
                let Some(hit) = self.used.iter().find(|e| e.overlaps(&candidate)) else {
                    if base == 0 {
                        // Address 0 is the failure sentinel, never a valid
                        // result.
                        break;
                    }
                    return Some(base);
                };

                // Step to just below the lowest-based entry in the way.
                let Some(next_top) = hit.base.checked_sub(size) else {
                    break;
                };
                let next = align_down(next_top, align);
                if next >= base {
                    break;
                }
                base = next;
            }
        }

        None
    }
}
