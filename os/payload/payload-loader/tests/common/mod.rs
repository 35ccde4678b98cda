#![allow(dead_code)]

use payload_addresses::PhysicalAddress;
use payload_loader::fit::relocate::RelocationEntry;
use payload_loader::memory::{PageAllocation, PageAllocator};
use vm_fdt::FdtWriter;
use zerocopy::IntoBytes;

pub const PAGE_SIZE: usize = 4096;

/// Hands out leaked heap pages that pretend to live at `next`.
pub struct FakeAllocator {
    next: u64,
    pub requests: Vec<usize>,
    regions: Vec<(*const u8, usize)>,
}

impl FakeAllocator {
    pub fn at(base: u64) -> Self {
        Self {
            next: base,
            requests: Vec::new(),
            regions: Vec::new(),
        }
    }

    /// Bytes of the `index`-th allocation.
    pub fn region(&self, index: usize) -> &[u8] {
        let (ptr, len) = self.regions[index];
        // SAFETY: the allocation was leaked and the loader is done with it.
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

impl PageAllocator for FakeAllocator {
    fn allocate_pages(&mut self, pages: usize) -> Option<PageAllocation> {
        self.requests.push(pages);
        let bytes = Box::leak(vec![0u8; pages * PAGE_SIZE].into_boxed_slice());
        self.regions.push((bytes.as_ptr(), bytes.len()));
        let base = PhysicalAddress::new(self.next);
        self.next += (pages * PAGE_SIZE) as u64;
        Some(PageAllocation::from_parts(base, bytes))
    }
}

/// An allocator that is always out of memory.
pub struct ExhaustedAllocator;

impl PageAllocator for ExhaustedAllocator {
    fn allocate_pages(&mut self, _pages: usize) -> Option<PageAllocation> {
        None
    }
}

/// One image inside a FIT blob.
pub struct FitImage<'a> {
    pub name: &'a str,
    pub load: u64,
    pub entry: u64,
    pub data: &'a [u8],
    pub reloc_start: Option<u32>,
}

/// Builds a FIT blob with `images` stored back to back after the tree.
pub fn fit_blob(images: &[FitImage<'_>], default_firmware: Option<&str>) -> Vec<u8> {
    // Offsets are fixed-size cells, so the tree keeps its size once they
    // are filled in.
    let placeholder = vec![0; images.len()];
    let tree_size = fit_tree(images, default_firmware, &placeholder).len() as u32;

    let mut offsets = Vec::with_capacity(images.len());
    let mut offset = tree_size;
    for image in images {
        offsets.push(offset);
        offset += image.data.len() as u32;
    }

    let mut blob = fit_tree(images, default_firmware, &offsets);
    assert_eq!(blob.len() as u32, tree_size);
    for image in images {
        blob.extend_from_slice(image.data);
    }
    blob
}

fn fit_tree(images: &[FitImage<'_>], default_firmware: Option<&str>, offsets: &[u32]) -> Vec<u8> {
    let mut fdt = FdtWriter::new().unwrap();
    let root = fdt.begin_node("").unwrap();
    fdt.property_string("description", "Universal payload").unwrap();
    fdt.property_u32("#address-cells", 1).unwrap();

    let images_node = fdt.begin_node("images").unwrap();
    for (image, &offset) in images.iter().zip(offsets) {
        let node = fdt.begin_node(image.name).unwrap();
        fdt.property_string("type", "firmware").unwrap();
        fdt.property_u32("data-offset", offset).unwrap();
        fdt.property_u32("data-size", image.data.len() as u32).unwrap();
        fdt.property_u64("load", image.load).unwrap();
        fdt.property_u64("entry-start", image.entry).unwrap();
        if let Some(reloc_start) = image.reloc_start {
            fdt.property_u32("reloc-start", reloc_start).unwrap();
        }
        fdt.end_node(node).unwrap();
    }
    fdt.end_node(images_node).unwrap();

    if let Some(firmware) = default_firmware {
        let configurations = fdt.begin_node("configurations").unwrap();
        fdt.property_string("default", "conf-1").unwrap();
        let conf = fdt.begin_node("conf-1").unwrap();
        fdt.property_string("firmware", firmware).unwrap();
        fdt.end_node(conf).unwrap();
        fdt.end_node(configurations).unwrap();
    }

    fdt.end_node(root).unwrap();
    fdt.finish().unwrap()
}

/// Image data of `size` bytes with `fixups` pre-filled and a relocation
/// table made of `entries` at its very end.
///
/// Returns the data and the table offset.
pub fn image_data(
    size: usize,
    fixups: &[(usize, u64)],
    entries: &[RelocationEntry],
) -> (Vec<u8>, u32) {
    let table = entries.as_bytes();
    let reloc_start = size - table.len();
    let mut data = vec![0u8; size];
    for &(at, value) in fixups {
        data[at..at + 8].copy_from_slice(&value.to_le_bytes());
    }
    data[reloc_start..].copy_from_slice(table);
    (data, reloc_start as u32)
}

pub fn read_u64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
}
