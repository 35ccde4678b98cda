//! Boot metadata every payload expects.

use super::must;
use crate::config::DebugLevel;
use payload_handoff::HandoffList;
use vm_fdt::FdtWriter;

const DEBUG_LEVEL_NODE: &str = "DebugPrintErrorLevel";

pub(super) fn build_required_nodes<H: HandoffList + ?Sized>(
    fdt: &mut FdtWriter,
    records: &H,
    debug_level: DebugLevel,
) {
    let Some(cpu) = records.cpu() else {
        panic!("The CPU record is required");
    };
    let node = must(fdt.begin_node("cpu-info"), "cpu-info");
    must(
        fdt.property_u32("address_width", u32::from(cpu.size_of_memory_space)),
        "cpu-info",
    );
    must(fdt.end_node(node), "cpu-info");

    // Root bridges are not enumerated yet; the payload scans PCI itself.
    let node = must(fdt.begin_node("pcirbinfo"), "pcirbinfo");
    must(fdt.property_u32("count", 0), "pcirbinfo");
    must(fdt.property_u32("ResourceAssigned", 0), "pcirbinfo");
    must(fdt.end_node(node), "pcirbinfo");

    let node = must(fdt.begin_node("hoblistptr"), "hoblistptr");
    must(
        fdt.property_u64("hoblistptr", records.list_address().as_u64()),
        "hoblistptr",
    );
    must(fdt.end_node(node), "hoblistptr");

    let node = must(fdt.begin_node(DEBUG_LEVEL_NODE), DEBUG_LEVEL_NODE);
    must(
        fdt.property_u32("errorlevel", debug_level.mask()),
        DEBUG_LEVEL_NODE,
    );
    must(fdt.end_node(node), DEBUG_LEVEL_NODE);
}
