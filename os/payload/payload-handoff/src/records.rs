//! # Typed Hand-off Records

use crate::guids::{MEMORY_ALLOC_BSP_STORE, MEMORY_ALLOC_MODULE, MEMORY_ALLOC_STACK};
use payload_addresses::PhysicalAddress;
use uefi::Guid;
use uefi::boot::MemoryType;

/// One record of the hand-off list, as seen by the loader.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    ResourceDescriptor(ResourceDescriptor),
    MemoryAllocation(MemoryAllocation),
    Cpu(CpuInfo),
    GuidExtension(GuidExtension<'a>),
}

/// Classification of a physical address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    SystemMemory,
    MemoryMappedIo,
    Io,
    FirmwareDevice,
    MemoryMappedIoPort,
    MemoryReserved,
    IoReserved,
    /// Any value this loader has no name for.
    Other(u32),
}

impl ResourceType {
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::SystemMemory,
            1 => Self::MemoryMappedIo,
            2 => Self::Io,
            3 => Self::FirmwareDevice,
            4 => Self::MemoryMappedIoPort,
            5 => Self::MemoryReserved,
            6 => Self::IoReserved,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn into_raw(self) -> u32 {
        match self {
            Self::SystemMemory => 0,
            Self::MemoryMappedIo => 1,
            Self::Io => 2,
            Self::FirmwareDevice => 3,
            Self::MemoryMappedIoPort => 4,
            Self::MemoryReserved => 5,
            Self::IoReserved => 6,
            Self::Other(raw) => raw,
        }
    }
}

/// Resource attribute flags of a [`ResourceDescriptor`].
///
/// Layout (LSB→MSB):
/// - bits 0..=2: present, initialized, tested
/// - bits 3..=6: ECC capabilities
/// - bits 7..=9: read / write / execution protection
/// - bits 10..=13: cacheability
/// - bits 14..=16: I/O access widths
/// - bit 17: uncached exported
/// - bits 18..31: not named here, preserved as-is
#[bitfield_struct::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct ResourceAttribute {
    pub present: bool,
    pub initialized: bool,
    pub tested: bool,
    pub single_bit_ecc: bool,
    pub multiple_bit_ecc: bool,
    pub ecc_reserved_1: bool,
    pub ecc_reserved_2: bool,
    pub read_protected: bool,
    pub write_protected: bool,
    pub execution_protected: bool,
    pub uncacheable: bool,
    pub write_combineable: bool,
    pub write_through_cacheable: bool,
    pub write_back_cacheable: bool,
    pub sixteen_bit_io: bool,
    pub thirty_two_bit_io: bool,
    pub sixty_four_bit_io: bool,
    pub uncached_exported: bool,
    #[bits(14)]
    __: u16,
}

impl ResourceAttribute {
    /// Attributes of plain, tested, fully cacheable RAM. Ranges carrying
    /// exactly these attributes need no explicit `Attribute` property.
    pub const DEFAULT: Self = Self::new()
        .with_present(true)
        .with_initialized(true)
        .with_tested(true)
        .with_uncacheable(true)
        .with_write_combineable(true)
        .with_write_through_cacheable(true)
        .with_write_back_cacheable(true);

    #[must_use]
    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }
}

/// One physical memory or I/O range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub resource_type: ResourceType,
    pub attribute: ResourceAttribute,
    pub physical_start: PhysicalAddress,
    pub length: u64,
}

impl ResourceDescriptor {
    #[must_use]
    pub const fn new(
        resource_type: ResourceType,
        physical_start: PhysicalAddress,
        length: u64,
        attribute: ResourceAttribute,
    ) -> Self {
        Self {
            resource_type,
            attribute,
            physical_start,
            length,
        }
    }
}

/// What a memory allocation's GUID says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationTag {
    /// Zero GUID.
    Untagged,
    Module,
    Stack,
    BspStore,
    Other(Guid),
}

/// Memory allocated before the loader ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAllocation {
    /// Identifying tag; [`Guid::ZERO`] when the allocation is anonymous.
    pub name: Guid,
    pub base: PhysicalAddress,
    pub length: u64,
    pub memory_type: MemoryType,
}

impl MemoryAllocation {
    #[must_use]
    pub const fn new(base: PhysicalAddress, length: u64, memory_type: MemoryType) -> Self {
        Self {
            name: Guid::ZERO,
            base,
            length,
            memory_type,
        }
    }

    #[must_use]
    pub const fn with_name(mut self, name: Guid) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub fn tag(&self) -> AllocationTag {
        match self.name {
            name if name == Guid::ZERO => AllocationTag::Untagged,
            name if name == MEMORY_ALLOC_MODULE => AllocationTag::Module,
            name if name == MEMORY_ALLOC_STACK => AllocationTag::Stack,
            name if name == MEMORY_ALLOC_BSP_STORE => AllocationTag::BspStore,
            name => AllocationTag::Other(name),
        }
    }
}

/// CPU address-space widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuInfo {
    /// Physical address width in bits.
    pub size_of_memory_space: u8,
    /// I/O port address width in bits.
    pub size_of_io_space: u8,
}

/// An opaque record named by GUID.
#[derive(Debug, Clone, Copy)]
pub struct GuidExtension<'a> {
    pub name: Guid,
    pub data: &'a [u8],
}
