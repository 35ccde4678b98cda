//! # Hand-off List Access

use crate::payload::{PayloadError, UniversalPayload, read_payload};
use crate::records::{CpuInfo, GuidExtension, MemoryAllocation, Record, ResourceDescriptor};
use alloc::vec;
use alloc::vec::Vec;
use payload_addresses::PhysicalAddress;
use uefi::Guid;
use zerocopy::IntoBytes;

/// Read and append access to the boot-stage hand-off list.
///
/// Implementors provide the walk over the raw list and record creation;
/// the typed lookups are derived from those.
pub trait HandoffList {
    /// Physical address of the list itself, so a later stage can keep
    /// walking it.
    fn list_address(&self) -> PhysicalAddress;

    /// All records in list order.
    fn records(&self) -> impl Iterator<Item = Record<'_>>;

    /// Append a zeroed GUID record of `size` bytes and hand out its data for
    /// filling in. `None` if the list has no room left.
    fn build_guid_record(&mut self, name: Guid, size: usize) -> Option<&mut [u8]>;

    fn resource_descriptors(&self) -> impl Iterator<Item = ResourceDescriptor> {
        self.records().filter_map(|record| match record {
            Record::ResourceDescriptor(resource) => Some(resource),
            _ => None,
        })
    }

    fn memory_allocations(&self) -> impl Iterator<Item = MemoryAllocation> {
        self.records().filter_map(|record| match record {
            Record::MemoryAllocation(allocation) => Some(allocation),
            _ => None,
        })
    }

    /// The first CPU record, if any.
    fn cpu(&self) -> Option<CpuInfo> {
        self.records().find_map(|record| match record {
            Record::Cpu(cpu) => Some(cpu),
            _ => None,
        })
    }

    /// Data of the first GUID record named `name`.
    fn find_first_guid(&self, name: &Guid) -> Option<&[u8]> {
        self.records().find_map(|record| match record {
            Record::GuidExtension(extension) if extension.name == *name => Some(extension.data),
            _ => None,
        })
    }

    /// Look up and validate the first `P` record.
    ///
    /// # Errors
    /// [`PayloadError::NotPresent`] if there is none, otherwise whatever
    /// [`read_payload`] rejects it for.
    fn find_payload<P: UniversalPayload>(&self) -> Result<P, PayloadError> {
        let data = self
            .find_first_guid(&P::GUID)
            .ok_or(PayloadError::NotPresent)?;
        read_payload(data)
    }

    /// Append `payload` as a new GUID record.
    ///
    /// # Errors
    /// [`PayloadError::PublishFailed`] if the record could not be created.
    fn publish_payload<P: UniversalPayload>(&mut self, payload: &P) -> Result<(), PayloadError> {
        let bytes = payload.as_bytes();
        let slot = self
            .build_guid_record(P::GUID, bytes.len())
            .ok_or(PayloadError::PublishFailed)?;
        slot.copy_from_slice(bytes);
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Resource(ResourceDescriptor),
    Allocation(MemoryAllocation),
    Cpu(CpuInfo),
    Guid { name: Guid, data: Vec<u8> },
}

/// Heap-backed hand-off list for hosted tools and tests.
#[derive(Debug, Clone)]
pub struct MemoryHandoffList {
    address: PhysicalAddress,
    entries: Vec<Entry>,
}

impl MemoryHandoffList {
    /// An empty list that reports itself as living at `address`.
    #[must_use]
    pub const fn new(address: PhysicalAddress) -> Self {
        Self {
            address,
            entries: Vec::new(),
        }
    }

    pub fn push_resource(&mut self, resource: ResourceDescriptor) -> &mut Self {
        self.entries.push(Entry::Resource(resource));
        self
    }

    pub fn push_allocation(&mut self, allocation: MemoryAllocation) -> &mut Self {
        self.entries.push(Entry::Allocation(allocation));
        self
    }

    pub fn push_cpu(&mut self, cpu: CpuInfo) -> &mut Self {
        self.entries.push(Entry::Cpu(cpu));
        self
    }

    pub fn push_guid(&mut self, name: Guid, data: impl Into<Vec<u8>>) -> &mut Self {
        self.entries.push(Entry::Guid {
            name,
            data: data.into(),
        });
        self
    }

    pub fn push_payload<P: UniversalPayload>(&mut self, payload: &P) -> &mut Self {
        self.push_guid(P::GUID, payload.as_bytes())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl HandoffList for MemoryHandoffList {
    fn list_address(&self) -> PhysicalAddress {
        self.address
    }

    fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.entries.iter().map(|entry| match entry {
            Entry::Resource(resource) => Record::ResourceDescriptor(*resource),
            Entry::Allocation(allocation) => Record::MemoryAllocation(*allocation),
            Entry::Cpu(cpu) => Record::Cpu(*cpu),
            Entry::Guid { name, data } => Record::GuidExtension(GuidExtension {
                name: *name,
                data: data.as_slice(),
            }),
        })
    }

    fn build_guid_record(&mut self, name: Guid, size: usize) -> Option<&mut [u8]> {
        self.entries.push(Entry::Guid {
            name,
            data: vec![0; size],
        });
        match self.entries.last_mut() {
            Some(Entry::Guid { data, .. }) => Some(data.as_mut_slice()),
            _ => None,
        }
    }
}
