//! # Universal Payload Records
//!
//! GUID-named hand-off records that start with a [`GenericHeader`]. The
//! header versions the layout that follows it; a consumer only trusts the
//! fields after it has checked the header against the blob it came in.

use crate::guids::{
    DEBUG_PRINT_ERROR_LEVEL, UNIVERSAL_PAYLOAD_ACPI_TABLE, UNIVERSAL_PAYLOAD_DEVICE_TREE,
};
use core::mem::size_of;
use uefi::Guid;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Leading header of every universal payload record.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct GenericHeader {
    pub revision: u32,
    /// Length of the record in bytes, header included.
    pub length: u32,
}

impl GenericHeader {
    /// Header describing a complete `P` at its current revision.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn for_payload<P: UniversalPayload>() -> Self {
        Self {
            revision: P::REVISION,
            length: size_of::<P>() as u32,
        }
    }
}

/// A versioned record layout identified by GUID.
pub trait UniversalPayload: FromBytes + IntoBytes + Immutable + KnownLayout + Sized {
    /// Name under which the record is stored.
    const GUID: Guid;
    /// The only revision this loader understands.
    const REVISION: u32;
    /// Bytes up to and including the last field a consumer relies on.
    const REQUIRED_LENGTH: usize = size_of::<Self>();
}

/// Why a payload record was not usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("No record with the requested GUID exists")]
    NotPresent,
    #[error("The record holds {available} bytes, fewer than a generic header")]
    MissingHeader { available: usize },
    #[error("The header claims {length} bytes but the record holds only {available}")]
    LengthExceedsRecord { length: usize, available: usize },
    #[error("Expected revision {expected}, found {found}")]
    RevisionMismatch { expected: u32, found: u32 },
    #[error("The header covers {length} bytes but {required} are required")]
    TooShort { length: usize, required: usize },
    #[error("The record store could not allocate a new record")]
    PublishFailed,
}

/// Validate `data` as a `P` record and copy the payload out of it.
///
/// # Errors
/// Any failed header check; see [`PayloadError`]. Callers treat every one of
/// them as "record absent".
pub fn read_payload<P: UniversalPayload>(data: &[u8]) -> Result<P, PayloadError> {
    let Ok((header, _)) = GenericHeader::read_from_prefix(data) else {
        return Err(PayloadError::MissingHeader {
            available: data.len(),
        });
    };

    let length = header.length as usize;
    if length > data.len() {
        return Err(PayloadError::LengthExceedsRecord {
            length,
            available: data.len(),
        });
    }

    if header.revision != P::REVISION {
        return Err(PayloadError::RevisionMismatch {
            expected: P::REVISION,
            found: header.revision,
        });
    }

    if length < P::REQUIRED_LENGTH {
        return Err(PayloadError::TooShort {
            length,
            required: P::REQUIRED_LENGTH,
        });
    }

    P::read_from_prefix(data)
        .map(|(payload, _)| payload)
        .map_err(|_| PayloadError::TooShort {
            length: data.len(),
            required: size_of::<P>(),
        })
}

/// Location of the ACPI root pointer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct AcpiTable {
    pub header: GenericHeader,
    /// Physical address of the RSDP.
    pub rsdp: u64,
}

impl AcpiTable {
    #[must_use]
    pub const fn new(rsdp: u64) -> Self {
        Self {
            header: GenericHeader::for_payload::<Self>(),
            rsdp,
        }
    }
}

impl UniversalPayload for AcpiTable {
    const GUID: Guid = UNIVERSAL_PAYLOAD_ACPI_TABLE;
    const REVISION: u32 = 1;
}

/// Location of the flattened device tree handed to the payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DeviceTree {
    pub header: GenericHeader,
    pub device_tree_address: u64,
}

impl DeviceTree {
    #[must_use]
    pub const fn new(device_tree_address: u64) -> Self {
        Self {
            header: GenericHeader::for_payload::<Self>(),
            device_tree_address,
        }
    }
}

impl UniversalPayload for DeviceTree {
    const GUID: Guid = UNIVERSAL_PAYLOAD_DEVICE_TREE;
    const REVISION: u32 = 1;
}

/// Debug print verbosity mask chosen by the platform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct DebugPrintErrorLevel {
    pub header: GenericHeader,
    pub error_level: u32,
}

impl DebugPrintErrorLevel {
    #[must_use]
    pub const fn new(error_level: u32) -> Self {
        Self {
            header: GenericHeader::for_payload::<Self>(),
            error_level,
        }
    }
}

impl UniversalPayload for DebugPrintErrorLevel {
    const GUID: Guid = DEBUG_PRINT_ERROR_LEVEL;
    const REVISION: u32 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(revision: u32, length: u32, tail: &[u8]) -> alloc::vec::Vec<u8> {
        let mut bytes = alloc::vec::Vec::new();
        bytes.extend_from_slice(&revision.to_ne_bytes());
        bytes.extend_from_slice(&length.to_ne_bytes());
        bytes.extend_from_slice(tail);
        bytes
    }

    #[test]
    fn header_sizes() {
        assert_eq!(size_of::<GenericHeader>(), 8);
        assert_eq!(size_of::<AcpiTable>(), 16);
        assert_eq!(size_of::<DeviceTree>(), 16);
        assert_eq!(size_of::<DebugPrintErrorLevel>(), 12);
        assert_eq!(DeviceTree::new(0).header.length, 16);
        assert_eq!(DeviceTree::new(0).header.revision, 1);
    }

    #[test]
    fn valid_record_is_read() {
        let bytes = raw(1, 16, &0xfeed_0000_u64.to_ne_bytes());
        let acpi: AcpiTable = read_payload(&bytes).expect("valid");
        assert_eq!(acpi.rsdp, 0xfeed_0000);
    }

    #[test]
    fn record_shorter_than_header() {
        assert_eq!(
            read_payload::<AcpiTable>(&[1, 0, 0]),
            Err(PayloadError::MissingHeader { available: 3 })
        );
    }

    #[test]
    fn length_larger_than_record() {
        let bytes = raw(1, 32, &0u64.to_ne_bytes());
        assert_eq!(
            read_payload::<AcpiTable>(&bytes),
            Err(PayloadError::LengthExceedsRecord {
                length: 32,
                available: 16
            })
        );
    }

    #[test]
    fn revision_mismatch_is_rejected() {
        let bytes = raw(2, 12, &7u32.to_ne_bytes());
        assert_eq!(
            read_payload::<DebugPrintErrorLevel>(&bytes),
            Err(PayloadError::RevisionMismatch {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn length_not_covering_required_fields() {
        let bytes = raw(1, 10, &7u32.to_ne_bytes());
        assert_eq!(
            read_payload::<DebugPrintErrorLevel>(&bytes),
            Err(PayloadError::TooShort {
                length: 10,
                required: 12
            })
        );
    }

    #[test]
    fn record_larger_than_layout_is_accepted() {
        let mut tail = 0x8000_0042_u32.to_ne_bytes().to_vec();
        tail.extend_from_slice(&[0xAA; 4]);
        let bytes = raw(1, 16, &tail);
        let level: DebugPrintErrorLevel = read_payload(&bytes).expect("valid");
        assert_eq!(level.error_level, 0x8000_0042);
    }
}
