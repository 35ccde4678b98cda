//! # Physical Address Types for the Payload Loader
//!
//! Strongly typed wrappers for the raw physical addresses a firmware-stage
//! loader juggles: where an image was linked, where it was actually placed,
//! where the device tree buffer lives, and how far apart those are.
//!
//! ## Overview
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PhysicalAddress`] | A 64-bit physical address (RAM or MMIO). |
//! | [`PageSize`] / [`Size4K`] | Page granularity of the firmware page allocator. |
//! | [`AddressDelta`] | Signed distance between two addresses, kept as magnitude plus direction. |
//!
//! The delta type mirrors how relocation is applied: firmware arithmetic is
//! done on unsigned 64-bit values, so the distance is stored as an unsigned
//! magnitude and a [`Direction`] instead of an `i64` that could not represent
//! every pair of addresses.
//!
//! ```rust
//! # use payload_addresses::*;
//! let linked = PhysicalAddress::new(0x1000);
//! let loaded = PhysicalAddress::new(0x5000);
//!
//! let delta = AddressDelta::between(linked, loaded);
//! assert_eq!(delta.magnitude(), 0x4000);
//! assert_eq!(delta.direction(), Direction::Up);
//! assert_eq!(delta.apply(0x1008), 0x5008);
//!
//! assert_eq!(Size4K::pages_for(0x2001), 3);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

use core::fmt;
use core::hash::Hash;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;

    /// Number of pages needed to hold `bytes` bytes, rounding up.
    #[inline]
    #[must_use]
    fn pages_for(bytes: u64) -> u64 {
        bytes.div_ceil(Self::SIZE)
    }
}

/// 4 KiB page (4096 bytes), the granularity of the firmware page allocator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
}

/// Physical memory address.
///
/// Carries intent and keeps link-time addresses, load-time addresses and
/// plain lengths from being mixed up in the loader's arithmetic.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether the address is aligned to page size `S`.
    #[inline]
    #[must_use]
    pub const fn is_aligned<S: PageSize>(self) -> bool {
        self.0 & (S::SIZE - 1) == 0
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl fmt::UpperHex for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysicalAddress> for u64 {
    #[inline]
    fn from(v: PhysicalAddress) -> Self {
        v.0
    }
}

/// Direction in which an [`AddressDelta`] moves addresses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// Target lies at or above the origin; values are increased.
    Up,
    /// Target lies below the origin; values are decreased.
    Down,
}

/// Distance from one address to another, as unsigned magnitude plus sign.
///
/// A zero delta is [`Direction::Up`] with magnitude zero and applies as the
/// identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AddressDelta {
    magnitude: u64,
    direction: Direction,
}

impl AddressDelta {
    /// Delta that moves `from` onto `to`.
    #[must_use]
    pub const fn between(from: PhysicalAddress, to: PhysicalAddress) -> Self {
        if to.0 >= from.0 {
            Self {
                magnitude: to.0 - from.0,
                direction: Direction::Up,
            }
        } else {
            Self {
                magnitude: from.0 - to.0,
                direction: Direction::Down,
            }
        }
    }

    #[inline]
    #[must_use]
    pub const fn magnitude(self) -> u64 {
        self.magnitude
    }

    #[inline]
    #[must_use]
    pub const fn direction(self) -> Direction {
        self.direction
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.magnitude == 0
    }

    /// Shift a raw 64-bit value by this delta, wrapping like the firmware's
    /// unsigned arithmetic does.
    #[inline]
    #[must_use]
    pub const fn apply(self, value: u64) -> u64 {
        match self.direction {
            Direction::Up => value.wrapping_add(self.magnitude),
            Direction::Down => value.wrapping_sub(self.magnitude),
        }
    }

    /// Shift an address by this delta.
    #[inline]
    #[must_use]
    pub const fn apply_to(self, addr: PhysicalAddress) -> PhysicalAddress {
        PhysicalAddress(self.apply(addr.0))
    }
}

impl fmt::Display for AddressDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.direction {
            Direction::Up => '+',
            Direction::Down => '-',
        };
        write!(f, "{sign}0x{:X}", self.magnitude)
    }
}
