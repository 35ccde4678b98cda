use payload_addresses::PhysicalAddress;
use payload_handoff::guids::{DEBUG_PRINT_ERROR_LEVEL, MEMORY_ALLOC_STACK};
use payload_handoff::payload::{AcpiTable, DebugPrintErrorLevel, DeviceTree, PayloadError};
use payload_handoff::{
    AllocationTag, CpuInfo, HandoffList, MemoryAllocation, MemoryHandoffList, MemoryType,
    ResourceAttribute, ResourceDescriptor, ResourceType,
};

fn sample_list() -> MemoryHandoffList {
    let mut list = MemoryHandoffList::new(PhysicalAddress::new(0x7fe0_0000));
    list.push_resource(ResourceDescriptor::new(
        ResourceType::SystemMemory,
        PhysicalAddress::new(0),
        0x8000_0000,
        ResourceAttribute::DEFAULT,
    ))
    .push_allocation(
        MemoryAllocation::new(
            PhysicalAddress::new(0x7f00_0000),
            0x2_0000,
            MemoryType::BOOT_SERVICES_DATA,
        )
        .with_name(MEMORY_ALLOC_STACK),
    )
    .push_resource(ResourceDescriptor::new(
        ResourceType::MemoryMappedIo,
        PhysicalAddress::new(0xfec0_0000),
        0x1000,
        ResourceAttribute::new().with_present(true).with_uncacheable(true),
    ))
    .push_cpu(CpuInfo {
        size_of_memory_space: 39,
        size_of_io_space: 16,
    })
    .push_payload(&AcpiTable::new(0x000e_0000));
    list
}

#[test]
fn typed_walks_filter_by_class() {
    let list = sample_list();
    assert_eq!(list.len(), 5);
    assert_eq!(list.list_address(), PhysicalAddress::new(0x7fe0_0000));

    let resources: Vec<_> = list.resource_descriptors().collect();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0].resource_type, ResourceType::SystemMemory);
    assert_eq!(resources[1].resource_type, ResourceType::MemoryMappedIo);

    let allocations: Vec<_> = list.memory_allocations().collect();
    assert_eq!(allocations.len(), 1);
    assert_eq!(allocations[0].tag(), AllocationTag::Stack);

    assert_eq!(list.cpu().map(|cpu| cpu.size_of_memory_space), Some(39));
}

#[test]
fn payload_lookup() {
    let list = sample_list();
    let acpi: AcpiTable = list.find_payload().expect("ACPI record");
    assert_eq!(acpi.rsdp, 0x000e_0000);

    assert_eq!(
        list.find_payload::<DeviceTree>(),
        Err(PayloadError::NotPresent)
    );
}

#[test]
fn malformed_payload_is_reported() {
    let mut list = MemoryHandoffList::new(PhysicalAddress::zero());
    // revision 3, length 12, level
    let mut raw = Vec::new();
    raw.extend_from_slice(&3u32.to_ne_bytes());
    raw.extend_from_slice(&12u32.to_ne_bytes());
    raw.extend_from_slice(&0x40u32.to_ne_bytes());
    list.push_guid(DEBUG_PRINT_ERROR_LEVEL, raw);

    assert_eq!(
        list.find_payload::<DebugPrintErrorLevel>(),
        Err(PayloadError::RevisionMismatch {
            expected: 1,
            found: 3
        })
    );
}

#[test]
fn first_matching_guid_wins() {
    let mut list = MemoryHandoffList::new(PhysicalAddress::zero());
    list.push_payload(&DebugPrintErrorLevel::new(0x8000_0000))
        .push_payload(&DebugPrintErrorLevel::new(0x8000_0040));

    let level: DebugPrintErrorLevel = list.find_payload().expect("level");
    assert_eq!(level.error_level, 0x8000_0000);
}

#[test]
fn published_payload_reads_back() {
    let mut list = MemoryHandoffList::new(PhysicalAddress::zero());
    list.publish_payload(&DeviceTree::new(0x7e00_0000))
        .expect("publish");

    assert_eq!(list.len(), 1);
    let tree: DeviceTree = list.find_payload().expect("device tree record");
    assert_eq!(tree.device_tree_address, 0x7e00_0000);
    assert_eq!(tree.header.revision, 1);
    assert_eq!(tree.header.length, 16);
}
