//! # Image Relocation
//!
//! Rebases a copied image from its link address to the address it was
//! actually loaded at. The relocation table lives inside the image data and
//! holds `{ kind, offset }` pairs; only the two absolute-address kinds are
//! rewritten, everything else is inert.

use crate::fit::parser::{ImageDescriptor, RELOCATION_ENTRY_SIZE};
use log::{debug, trace};
use payload_addresses::{AddressDelta, PhysicalAddress};
use uefi::Status;
use zerocopy::byteorder::little_endian::U64;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// 32-bit absolute address; rewritten as a 64-bit value like [`IMAGE_REL_BASED_DIR64`].
pub const IMAGE_REL_BASED_HIGHLOW: u64 = 3;
/// 64-bit absolute address.
pub const IMAGE_REL_BASED_DIR64: u64 = 10;

/// One entry of the relocation table.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RelocationEntry {
    pub kind: U64,
    /// Offset of the fixup from the start of the image.
    pub offset: U64,
}

impl RelocationEntry {
    #[must_use]
    pub const fn new(kind: u64, offset: u64) -> Self {
        Self {
            kind: U64::new(kind),
            offset: U64::new(offset),
        }
    }

    /// Whether this entry patches an absolute address.
    #[must_use]
    pub fn is_absolute(&self) -> bool {
        matches!(
            self.kind.get(),
            IMAGE_REL_BASED_HIGHLOW | IMAGE_REL_BASED_DIR64
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelocationError {
    #[error("The relocation table at {offset:#x} does not fit the {size:#x}-byte image")]
    TableOutOfBounds { offset: u64, size: usize },
    #[error("Relocation entry {index} targets {offset:#x}, outside of the {size:#x}-byte image")]
    OutOfBounds { index: u64, offset: u64, size: usize },
}

impl From<RelocationError> for Status {
    fn from(_: RelocationError) -> Self {
        Self::LOAD_ERROR
    }
}

/// Rebases `image`, which has been copied to `load_base`.
///
/// Every absolute-address fixup is shifted by the distance between the link
/// base and `load_base`, and so is the descriptor's entry point. A zero
/// distance still walks the whole table.
///
/// # Errors
/// A [`RelocationError`] if the table or one of its targets leaves the
/// image. Entries before the offending one have already been applied; the
/// descriptor is left untouched.
pub fn relocate(
    image: &mut [u8],
    load_base: PhysicalAddress,
    descriptor: &mut ImageDescriptor,
) -> Result<AddressDelta, RelocationError> {
    let delta = AddressDelta::between(descriptor.link_base, load_base);
    let table_start = table_start(image, descriptor)?;
    debug!(
        "Relocating image by {delta} ({} table entries)",
        descriptor.relocation_count
    );

    let mut applied = 0_usize;
    for index in 0..descriptor.relocation_count {
        let at = table_start + entry_offset(index);
        let entry = RelocationEntry::read_from_bytes(&image[at..at + size_of::<RelocationEntry>()])
            .map_err(|_| RelocationError::TableOutOfBounds {
                offset: descriptor.relocation_offset,
                size: image.len(),
            })?;
        if !entry.is_absolute() {
            continue;
        }

        let offset = entry.offset.get();
        let Some(target) = fixup_range(offset, image.len()) else {
            return Err(RelocationError::OutOfBounds {
                index,
                offset,
                size: image.len(),
            });
        };

        let mut value = [0u8; size_of::<u64>()];
        value.copy_from_slice(&image[target.clone()]);
        let relocated = delta.apply(u64::from_le_bytes(value));
        image[target].copy_from_slice(&relocated.to_le_bytes());
        applied += 1;
    }
    trace!("Applied {applied} absolute fixups");

    descriptor.entry_point = delta.apply_to(descriptor.entry_point);
    descriptor.load_base = load_base;
    Ok(delta)
}

fn table_start(image: &[u8], descriptor: &ImageDescriptor) -> Result<usize, RelocationError> {
    let out_of_bounds = RelocationError::TableOutOfBounds {
        offset: descriptor.relocation_offset,
        size: image.len(),
    };
    let start = usize::try_from(descriptor.relocation_offset).map_err(|_| out_of_bounds)?;
    let count = usize::try_from(descriptor.relocation_count).map_err(|_| out_of_bounds)?;
    let fits = count
        .checked_mul(size_of::<RelocationEntry>())
        .and_then(|len| start.checked_add(len))
        .is_some_and(|end| end <= image.len());
    if fits { Ok(start) } else { Err(out_of_bounds) }
}

#[allow(clippy::cast_possible_truncation)]
const fn entry_offset(index: u64) -> usize {
    (index * RELOCATION_ENTRY_SIZE) as usize
}

fn fixup_range(offset: u64, image_len: usize) -> Option<core::ops::Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(size_of::<u64>())?;
    (end <= image_len).then_some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(link_base: u64, size: u64, relocation_offset: u64) -> ImageDescriptor {
        ImageDescriptor {
            load_base: PhysicalAddress::new(link_base),
            link_base: PhysicalAddress::new(link_base),
            size,
            entry_point: PhysicalAddress::new(link_base + 0x100),
            data_offset: 0,
            relocation_offset,
            relocation_count: (size - relocation_offset) / RELOCATION_ENTRY_SIZE,
        }
    }

    fn image_with(entries: &[RelocationEntry], fixups: &[(usize, u64)]) -> Vec<u8> {
        let mut image = vec![0u8; 0x100];
        for &(at, value) in fixups {
            image[at..at + 8].copy_from_slice(&value.to_le_bytes());
        }
        image.extend_from_slice(entries.as_bytes());
        image
    }

    fn read(image: &[u8], at: usize) -> u64 {
        u64::from_le_bytes(image[at..at + 8].try_into().unwrap())
    }

    #[test]
    fn entry_layout_is_sixteen_bytes() {
        assert_eq!(size_of::<RelocationEntry>() as u64, RELOCATION_ENTRY_SIZE);
        let entry = RelocationEntry::new(IMAGE_REL_BASED_DIR64, 0x10);
        assert_eq!(entry.as_bytes()[..8], 10u64.to_le_bytes());
        assert_eq!(entry.as_bytes()[8..], 0x10u64.to_le_bytes());
    }

    #[test]
    fn relocates_upwards() {
        let entries = [RelocationEntry::new(IMAGE_REL_BASED_DIR64, 0x10)];
        let mut image = image_with(&entries, &[(0x10, 0x1008)]);
        let mut desc = descriptor(0x1000, image.len() as u64, 0x100);

        let delta = relocate(&mut image, PhysicalAddress::new(0x5000), &mut desc).unwrap();
        assert_eq!(delta.magnitude(), 0x4000);
        assert_eq!(read(&image, 0x10), 0x5008);
        assert_eq!(desc.entry_point, PhysicalAddress::new(0x5100));
        assert_eq!(desc.load_base, PhysicalAddress::new(0x5000));
    }

    #[test]
    fn relocates_downwards() {
        let entries = [RelocationEntry::new(IMAGE_REL_BASED_HIGHLOW, 0x20)];
        let mut image = image_with(&entries, &[(0x20, 0x9_0040)]);
        let mut desc = descriptor(0x9_0000, image.len() as u64, 0x100);

        relocate(&mut image, PhysicalAddress::new(0x1_0000), &mut desc).unwrap();
        assert_eq!(read(&image, 0x20), 0x1_0040);
        assert_eq!(desc.entry_point, PhysicalAddress::new(0x1_0100));
    }

    #[test]
    fn zero_delta_is_identity() {
        let entries = [RelocationEntry::new(IMAGE_REL_BASED_DIR64, 0x30)];
        let mut image = image_with(&entries, &[(0x30, 0xDEAD_BEEF)]);
        let before = image.clone();
        let mut desc = descriptor(0x2000, image.len() as u64, 0x100);

        let delta = relocate(&mut image, PhysicalAddress::new(0x2000), &mut desc).unwrap();
        assert!(delta.is_zero());
        assert_eq!(image, before);
        assert_eq!(desc.entry_point, PhysicalAddress::new(0x2100));
    }

    #[test]
    fn other_kinds_are_untouched() {
        let entries = [
            RelocationEntry::new(0, 0x10),
            RelocationEntry::new(IMAGE_REL_BASED_DIR64, 0x18),
            RelocationEntry::new(4, 0x20),
        ];
        let mut image = image_with(&entries, &[(0x10, 0x1111), (0x18, 0x1000), (0x20, 0x2222)]);
        let mut desc = descriptor(0x1000, image.len() as u64, 0x100);

        relocate(&mut image, PhysicalAddress::new(0x3000), &mut desc).unwrap();
        assert_eq!(read(&image, 0x10), 0x1111);
        assert_eq!(read(&image, 0x18), 0x3000);
        assert_eq!(read(&image, 0x20), 0x2222);
    }

    #[test]
    fn target_outside_image_is_rejected() {
        let entries = [RelocationEntry::new(IMAGE_REL_BASED_DIR64, 0x1000)];
        let mut image = image_with(&entries, &[]);
        let mut desc = descriptor(0x1000, image.len() as u64, 0x100);
        let before = desc;

        let err = relocate(&mut image, PhysicalAddress::new(0x8000), &mut desc).unwrap_err();
        assert!(matches!(err, RelocationError::OutOfBounds { index: 0, offset: 0x1000, .. }));
        assert_eq!(desc, before);
    }

    #[test]
    fn table_outside_image_is_rejected() {
        let mut image = vec![0u8; 0x40];
        let mut desc = descriptor(0x1000, 0x40, 0x30);
        desc.relocation_count = 2;

        let err = relocate(&mut image, PhysicalAddress::new(0x8000), &mut desc).unwrap_err();
        assert!(matches!(err, RelocationError::TableOutOfBounds { offset: 0x30, .. }));
    }
}
