//! # Page Allocation
//!
//! The loader asks for whole 4 KiB pages and never gives them back: both the
//! relocated payload and the device tree are owned by the next boot stage.

#![allow(unsafe_code)]

use payload_addresses::{PageSize, PhysicalAddress, Size4K};

/// Page-granular physical memory allocator provided by the firmware.
pub trait PageAllocator {
    /// Allocate `pages` contiguous 4 KiB pages; `None` if memory is exhausted.
    fn allocate_pages(&mut self, pages: usize) -> Option<PageAllocation>;
}

/// A run of pages handed out by a [`PageAllocator`].
///
/// Pairs the physical base address with a writable view of the same bytes.
#[derive(Debug)]
pub struct PageAllocation {
    base: PhysicalAddress,
    bytes: &'static mut [u8],
}

impl PageAllocation {
    /// Wraps `pages` pages starting at `base` in an identity-mapped address
    /// space.
    ///
    /// # Safety
    /// `base` must be page aligned and point at `pages` pages of memory that
    /// are identity mapped, writable, and owned exclusively by the caller for
    /// the rest of the boot.
    #[must_use]
    pub unsafe fn from_identity_mapped(base: PhysicalAddress, pages: usize) -> Self {
        debug_assert!(base.is_aligned::<Size4K>());
        let len = pages * page_bytes();
        #[allow(clippy::cast_possible_truncation)]
        let ptr = base.as_u64() as usize as *mut u8;
        // SAFETY: guaranteed by the caller.
        let bytes = unsafe { core::slice::from_raw_parts_mut(ptr, len) };
        Self { base, bytes }
    }

    /// Pairs an already-owned buffer with the physical address it stands for.
    #[must_use]
    pub const fn from_parts(base: PhysicalAddress, bytes: &'static mut [u8]) -> Self {
        Self { base, bytes }
    }

    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        self.base
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &*self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn page_bytes() -> usize {
    Size4K::SIZE as usize
}

/// Number of pages that hold `bytes` bytes, or `None` if that does not fit
/// the address width.
#[must_use]
pub fn pages_for(bytes: u64) -> Option<usize> {
    usize::try_from(Size4K::pages_for(bytes)).ok()
}
