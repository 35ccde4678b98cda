//! System memory: one `memory@<start>` node per RAM range.

use super::{Siblings, must, set_reg};
use alloc::format;
use log::debug;
use payload_handoff::{HandoffList, ResourceType};
use vm_fdt::FdtWriter;

pub(super) fn build_memory_nodes<H: HandoffList + ?Sized>(fdt: &mut FdtWriter, records: &H) {
    let mut siblings = Siblings::default();
    let mut count = 0_usize;

    for resource in records
        .resource_descriptors()
        .filter(|resource| resource.resource_type == ResourceType::SystemMemory)
    {
        let start = resource.physical_start.as_u64();
        let name = format!("memory@{start:X}");
        assert!(
            siblings.claim(&name),
            "Two system memory ranges start at {start:#X}"
        );

        let node = must(fdt.begin_node(&name), &name);
        must(fdt.property_string("type", "memory"), &name);
        set_reg(fdt, &name, start, resource.length);
        if !resource.attribute.is_default() {
            must(
                fdt.property_u32("Attribute", resource.attribute.into_bits()),
                &name,
            );
        }
        must(fdt.end_node(node), &name);
        count += 1;
    }

    debug!("Added {count} system memory nodes");
}
