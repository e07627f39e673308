//! Boot-time physical memory region tracking
//!
//! This crate tracks which physical memory ranges are free and which are
//! already carved out during firmware boot, and hands out new
//! non-conflicting ranges to image loaders, page-table builders and boot
//! services before an operating system takes over.
//!
//! Board bring-up declares detected RAM banks with
//! [`MemoryTracker::add_memory`]. Consumers then reserve explicit ranges or
//! allocate top-down under size, alignment and ceiling constraints, freeing
//! what they no longer need. The whole state can be pushed and popped for
//! transaction-like rollback of a boot sub-phase.
//!
//! Firmware runs one logical thread of control with no preemption during
//! these calls, so every operation is a bounded, synchronous list scan and
//! nothing here takes a lock.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]

extern crate alloc;

pub mod allocator;
pub mod context;
pub mod error;
pub mod region;
pub mod tracker;

pub use error::{Error, Result};
pub use region::{Region, RegionFlags, RegionList};
pub use tracker::MemoryTracker;
