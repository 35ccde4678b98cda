//! # Device Tree Assembly
//!
//! Describes the machine to the payload as a flattened device tree built
//! from the hand-off list:
//!
//! ```text
//! /                         #address-cells = 2, #size-cells = 2, acpi
//! ├─ memory@<start>         system memory ranges
//! ├─ reserved-memory/       mmio@, reserved@, unknown@ ranges
//! ├─ memory-allocation/     <type>@<base>, stackhob@, bspstore@
//! ├─ cpu-info               address_width
//! ├─ pcirbinfo              count, ResourceAssigned
//! ├─ hoblistptr             hoblistptr
//! └─ DebugPrintErrorLevel   errorlevel
//! ```
//!
//! The tree is serialized with [`vm_fdt::FdtWriter`] and copied into a
//! buffer of [`FDT_PAGES`] pages. That size is assumed to fit any tree; a
//! larger tree, like a missing ACPI or CPU record, is a broken boot and
//! panics.

mod allocation;
mod memory;
mod required;
mod reserved;

use crate::config::DebugLevel;
use crate::memory::PageAllocator;
use crate::tracing::dump_device_tree;
use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use log::info;
use payload_addresses::PhysicalAddress;
use payload_handoff::HandoffList;
use payload_handoff::payload::{AcpiTable, DeviceTree, PayloadError};
use uefi::Status;
use vm_fdt::FdtWriter;

/// Size of the device tree buffer in pages.
pub const FDT_PAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceTreeError {
    #[error("Could not allocate {pages} pages for the device tree")]
    AllocationFailed { pages: usize },
    #[error("The device tree record could not be published")]
    Publish(#[source] PayloadError),
}

impl From<DeviceTreeError> for Status {
    fn from(value: DeviceTreeError) -> Self {
        match value {
            DeviceTreeError::AllocationFailed { .. } | DeviceTreeError::Publish(_) => {
                Self::NOT_FOUND
            }
        }
    }
}

/// Builds the device tree and publishes its address as a [`DeviceTree`]
/// record.
///
/// Returns the physical address of the tree.
///
/// # Errors
/// A [`DeviceTreeError`] if the buffer cannot be allocated or the record
/// cannot be published.
///
/// # Panics
/// If `records` lacks a valid ACPI table record or a CPU record, or if the
/// tree does not fit into [`FDT_PAGES`] pages.
pub fn build_device_tree<H, A>(
    records: &mut H,
    allocator: &mut A,
    debug_level: DebugLevel,
) -> Result<PhysicalAddress, DeviceTreeError>
where
    H: HandoffList + ?Sized,
    A: PageAllocator + ?Sized,
{
    let mut buffer = allocator
        .allocate_pages(FDT_PAGES)
        .ok_or(DeviceTreeError::AllocationFailed { pages: FDT_PAGES })?;
    let address = buffer.base();

    let blob = assemble(&*records, debug_level);
    let capacity = buffer.bytes().len();
    let Some(target) = buffer.bytes_mut().get_mut(..blob.len()) else {
        panic!(
            "The device tree needs {} bytes but only {capacity} fit into {FDT_PAGES} pages",
            blob.len()
        );
    };
    target.copy_from_slice(&blob);
    dump_device_tree(address.as_u64(), &blob);

    records
        .publish_payload(&DeviceTree::new(address.as_u64()))
        .map_err(DeviceTreeError::Publish)?;
    info!("Published device tree at {address} ({} bytes)", blob.len());

    Ok(address)
}

/// Serializes the whole tree; the subtrees are emitted in a fixed order.
fn assemble<H: HandoffList + ?Sized>(records: &H, debug_level: DebugLevel) -> Vec<u8> {
    let acpi = match records.find_payload::<AcpiTable>() {
        Ok(acpi) => acpi,
        Err(err) => panic!("The ACPI table record is required: {err}"),
    };

    let mut fdt = must(FdtWriter::new(), "the header");
    let root = must(fdt.begin_node(""), "/");
    set_cells(&mut fdt, "/");
    must(fdt.property_u64("acpi", acpi.rsdp), "acpi");

    memory::build_memory_nodes(&mut fdt, records);
    reserved::build_reserved_memory(&mut fdt, records);
    allocation::build_memory_allocations(&mut fdt, records);
    required::build_required_nodes(&mut fdt, records, debug_level);

    must(fdt.end_node(root), "/");
    must(fdt.finish(), "the blob")
}

/// Sets `#address-cells` and `#size-cells` of the open node to two cells
/// each.
fn set_cells(fdt: &mut FdtWriter, node: &str) {
    must(fdt.property_u32("#address-cells", 2), node);
    must(fdt.property_u32("#size-cells", 2), node);
}

/// Writes a `reg` property of one address and one size cell pair.
fn set_reg(fdt: &mut FdtWriter, node: &str, start: u64, length: u64) {
    must(fdt.property_array_u64("reg", &[start, length]), node);
}

/// Node names already emitted below one parent.
#[derive(Debug, Default)]
struct Siblings(BTreeSet<String>);

impl Siblings {
    /// Records `name`; `false` if a sibling already carries it.
    fn claim(&mut self, name: &str) -> bool {
        self.0.insert(String::from(name))
    }
}

/// Unwraps a tree mutation that must not fail.
#[track_caller]
fn must<T>(result: Result<T, vm_fdt::Error>, what: impl fmt::Display) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Failed to write {what} into the device tree: {err}"),
    }
}
