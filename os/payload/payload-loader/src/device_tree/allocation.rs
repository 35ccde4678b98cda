//! Memory allocated by earlier stages, below `memory-allocation`.

use super::{Siblings, must, set_cells, set_reg};
use alloc::format;
use log::debug;
use payload_handoff::{AllocationTag, Guid, HandoffList, MemoryType};
use vm_fdt::FdtWriter;

/// Node-name prefixes indexed by memory type.
const MEMORY_TYPE_NAMES: [&str; 15] = [
    "Reserved",
    "LoaderCode",
    "LoaderData",
    "BootServicesCode",
    "BootServicesData",
    "RuntimeServicesCode",
    "RuntimeServicesData",
    "ConventionalMemory",
    "UnusableMemory",
    "ACPIReclaimMemory",
    "ACPIMemoryNVS",
    "MemoryMappedIO",
    "MemoryMappedIOPortSpace",
    "PalCode",
    "PersistentMemory",
];

fn memory_type_name(memory_type: MemoryType) -> &'static str {
    usize::try_from(memory_type.0)
        .ok()
        .and_then(|index| MEMORY_TYPE_NAMES.get(index))
        .copied()
        .unwrap_or("Unknown")
}

/// The tag as stored in the tree: the 32- and 16-bit leading fields are
/// big-endian, the trailing eight bytes unchanged.
fn guid_property(guid: Guid) -> [u8; 16] {
    let mut bytes = guid.to_bytes();
    bytes[0..4].reverse();
    bytes[4..6].reverse();
    bytes[6..8].reverse();
    bytes
}

pub(super) fn build_memory_allocations<H: HandoffList + ?Sized>(
    fdt: &mut FdtWriter,
    records: &H,
) {
    let parent = must(fdt.begin_node("memory-allocation"), "memory-allocation");
    set_cells(fdt, "memory-allocation");

    let mut siblings = Siblings::default();
    let mut count = 0_usize;
    for allocation in records.memory_allocations() {
        let tag = allocation.tag();
        let prefix = match tag {
            AllocationTag::Module => continue,
            AllocationTag::Stack => "stackhob",
            AllocationTag::BspStore => "bspstore",
            AllocationTag::Untagged | AllocationTag::Other(_) => {
                memory_type_name(allocation.memory_type)
            }
        };

        let base = allocation.base.as_u64();
        let name = format!("{prefix}@{base:X}");
        assert!(siblings.claim(&name), "Two allocations are named {name}");

        let node = must(fdt.begin_node(&name), &name);
        set_reg(fdt, &name, base, allocation.length);
        must(fdt.property_u32("type", allocation.memory_type.0), &name);
        if tag != AllocationTag::Untagged {
            must(fdt.property("guid", &guid_property(allocation.name)), &name);
        }
        must(fdt.end_node(node), &name);
        count += 1;
    }

    must(fdt.end_node(parent), "memory-allocation");
    debug!("Added {count} memory allocation nodes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use uefi::guid;

    #[test]
    fn names_follow_memory_type() {
        assert_eq!(memory_type_name(MemoryType::RESERVED), "Reserved");
        assert_eq!(memory_type_name(MemoryType::BOOT_SERVICES_DATA), "BootServicesData");
        assert_eq!(memory_type_name(MemoryType::PERSISTENT_MEMORY), "PersistentMemory");
    }

    #[test]
    fn out_of_table_types_are_unknown() {
        assert_eq!(memory_type_name(MemoryType(15)), "Unknown");
        assert_eq!(memory_type_name(MemoryType(0x8000_0001)), "Unknown");
    }

    #[test]
    fn guid_leading_fields_are_big_endian() {
        let bytes = guid_property(guid!("4ed4bf27-4092-42e9-807d-527b1d00c9bd"));
        assert_eq!(
            bytes,
            [
                0x4e, 0xd4, 0xbf, 0x27, 0x40, 0x92, 0x42, 0xe9, 0x80, 0x7d, 0x52, 0x7b, 0x1d,
                0x00, 0xc9, 0xbd
            ]
        );
    }
}
