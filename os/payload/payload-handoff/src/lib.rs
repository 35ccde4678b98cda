//! # Boot-Stage Hand-off Records
//!
//! This crate defines the records that earlier boot stages leave behind for
//! the payload loader, and the ones the loader leaves behind for the payload.
//! It is the boundary contract between the loader and the record store; the
//! store itself (how records are laid out in memory and walked) belongs to
//! the surrounding firmware and is abstracted by [`HandoffList`].
//!
//! ## Record classes
//!
//! ```text
//! Hand-off list
//!   ├─ Resource descriptor   (one per physical range: RAM, MMIO, reserved, ...)
//!   ├─ Memory allocation     (base, length, memory type, optional GUID tag)
//!   ├─ CPU                   (physical / I/O address width)
//!   └─ GUID extension        (opaque blob, named by GUID)
//!        └─ Universal payload: { revision: u32, length: u32 } + fields
//! ```
//!
//! Typed records live in [`records`]; the versioned GUID payloads and their
//! validation rules in [`payload`]; well-known GUIDs in [`guids`].
//!
//! ## Validation
//!
//! GUID payloads are self-describing. Before any field is trusted, the
//! consumer checks that the blob holds a generic header, that the header's
//! `length` fits in the blob and covers the fields it needs, and that the
//! `revision` matches. A payload that fails any of these is treated as
//! absent; see [`payload::read_payload`].
//!
//! ```rust
//! use payload_addresses::PhysicalAddress;
//! use payload_handoff::payload::AcpiTable;
//! use payload_handoff::{HandoffList, MemoryHandoffList};
//!
//! let mut list = MemoryHandoffList::new(PhysicalAddress::new(0x7f00_0000));
//! list.push_payload(&AcpiTable::new(0xe_0000));
//!
//! let acpi: AcpiTable = list.find_payload().expect("ACPI record");
//! assert_eq!(acpi.rsdp, 0xe_0000);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod guids;
mod list;
pub mod payload;
pub mod records;

pub use list::{HandoffList, MemoryHandoffList};
pub use records::{
    AllocationTag, CpuInfo, GuidExtension, MemoryAllocation, Record, ResourceAttribute,
    ResourceDescriptor, ResourceType,
};
pub use uefi::Guid;
pub use uefi::boot::MemoryType;
