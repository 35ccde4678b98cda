//! MMIO and reserved ranges below `reserved-memory`.

use super::{Siblings, must, set_cells, set_reg};
use alloc::format;
use log::{debug, warn};
use payload_handoff::{HandoffList, ResourceDescriptor, ResourceType};
use vm_fdt::FdtWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Mmio,
    Reserved,
    Unknown,
}

impl Bucket {
    /// `None` for ranges that do not belong in `reserved-memory`.
    const fn classify(resource_type: ResourceType) -> Option<Self> {
        match resource_type {
            ResourceType::SystemMemory | ResourceType::Io | ResourceType::IoReserved => None,
            ResourceType::MemoryMappedIo | ResourceType::MemoryMappedIoPort => Some(Self::Mmio),
            ResourceType::MemoryReserved => Some(Self::Reserved),
            ResourceType::FirmwareDevice | ResourceType::Other(_) => Some(Self::Unknown),
        }
    }

    const fn prefix(self) -> &'static str {
        match self {
            Self::Mmio => "mmio",
            Self::Reserved => "reserved",
            Self::Unknown => "unknown",
        }
    }
}

pub(super) fn build_reserved_memory<H: HandoffList + ?Sized>(fdt: &mut FdtWriter, records: &H) {
    let parent = must(fdt.begin_node("reserved-memory"), "reserved-memory");
    set_cells(fdt, "reserved-memory");

    let mut siblings = Siblings::default();
    let (mut mmio, mut reserved, mut unknown) = (0_usize, 0_usize, 0_usize);
    for resource in records.resource_descriptors() {
        let Some(bucket) = Bucket::classify(resource.resource_type) else {
            continue;
        };
        if !add_range(fdt, &mut siblings, bucket, &resource) {
            continue;
        }
        match bucket {
            Bucket::Mmio => mmio += 1,
            Bucket::Reserved => reserved += 1,
            Bucket::Unknown => unknown += 1,
        }
    }

    must(fdt.end_node(parent), "reserved-memory");
    debug!("Reserved memory: {mmio} mmio, {reserved} reserved, {unknown} unknown");
}

/// Emits one range; `false` if an earlier range already took its name.
fn add_range(
    fdt: &mut FdtWriter,
    siblings: &mut Siblings,
    bucket: Bucket,
    resource: &ResourceDescriptor,
) -> bool {
    let start = resource.physical_start.as_u64();
    let name = format!("{}@{start:X}", bucket.prefix());

    // Two descriptors for the same start address: keep the first.
    if !siblings.claim(&name) {
        warn!("Skipping duplicate reserved range {name}");
        return false;
    }

    let node = must(fdt.begin_node(&name), &name);
    set_reg(fdt, &name, start, resource.length);
    if !resource.attribute.is_default() {
        must(
            fdt.property_u32("Attribute", resource.attribute.into_bits()),
            &name,
        );
    }
    must(fdt.end_node(node), &name);
    true
}
