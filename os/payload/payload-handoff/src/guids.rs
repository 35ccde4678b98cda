//! # Well-known record GUIDs

use uefi::{Guid, guid};

/// Memory allocation tag of the module image allocations. Not memory the
/// payload needs to know about.
pub const MEMORY_ALLOC_MODULE: Guid = guid!("f8e21975-0899-4f58-a4be-5525a9c6d77a");

/// Memory allocation tag of the boot-stage stack.
pub const MEMORY_ALLOC_STACK: Guid = guid!("4ed4bf27-4092-42e9-807d-527b1d00c9bd");

/// Memory allocation tag of the IPF backing store.
pub const MEMORY_ALLOC_BSP_STORE: Guid = guid!("564b33cd-c92a-4593-90bf-2473e43c6322");

/// [`AcpiTable`](crate::payload::AcpiTable) payload.
pub const UNIVERSAL_PAYLOAD_ACPI_TABLE: Guid = guid!("9f9a9506-5597-4515-bab6-8bcde784ba87");

/// [`DeviceTree`](crate::payload::DeviceTree) payload.
pub const UNIVERSAL_PAYLOAD_DEVICE_TREE: Guid = guid!("6784b889-b13c-4c3f-ae6c-0c6f0a7f6d26");

/// [`DebugPrintErrorLevel`](crate::payload::DebugPrintErrorLevel) payload.
pub const DEBUG_PRINT_ERROR_LEVEL: Guid = guid!("23e8ba0c-80d6-4d4f-a260-389f2b91740f");
