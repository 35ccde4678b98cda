//! # FIT Header Parsing

use fdt::Fdt;
use fdt::node::FdtNode;
use log::{debug, trace};
use payload_addresses::PhysicalAddress;
use uefi::Status;

/// Size in bytes of one relocation table entry.
pub const RELOCATION_ENTRY_SIZE: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FitError {
    #[error("The blob is not a flattened device tree")]
    NotDeviceTree,
    #[error("The image tree has no images")]
    NoImages,
    #[error("The payload image lacks the `{0}` property")]
    MissingProperty(&'static str),
    #[error("The `{0}` property has an unexpected size")]
    MalformedProperty(&'static str),
    #[error("The payload image is empty")]
    EmptyImage,
    #[error("Image data at {offset:#x} with {size:#x} bytes exceeds the {blob:#x}-byte blob")]
    DataOutOfBounds { offset: u64, size: u64, blob: u64 },
    #[error("The relocation table at {offset:#x} starts beyond the {size:#x}-byte image")]
    RelocationTableOutOfBounds { offset: u64, size: u64 },
    #[error("The entry point {entry} lies outside the image linked at {base}")]
    EntryOutsideImage {
        entry: PhysicalAddress,
        base: PhysicalAddress,
    },
}

impl From<FitError> for Status {
    fn from(value: FitError) -> Self {
        match value {
            FitError::NotDeviceTree | FitError::NoImages => Self::NOT_FOUND,
            FitError::MissingProperty(_)
            | FitError::MalformedProperty(_)
            | FitError::EmptyImage => Self::UNSUPPORTED,
            FitError::DataOutOfBounds { .. }
            | FitError::RelocationTableOutOfBounds { .. }
            | FitError::EntryOutsideImage { .. } => Self::LOAD_ERROR,
        }
    }
}

/// Geometry of the payload image.
///
/// Until [`relocate`](super::relocate) runs, `load_base` equals `link_base`
/// and `entry_point` is the linked entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Where the image currently lives (or is about to).
    pub load_base: PhysicalAddress,
    /// Where the image was linked to run.
    pub link_base: PhysicalAddress,
    /// Size of the image data in bytes.
    pub size: u64,
    pub entry_point: PhysicalAddress,
    /// Offset of the image data from the start of the FIT blob.
    pub data_offset: u64,
    /// Offset of the relocation table from the start of the image data.
    pub relocation_offset: u64,
    pub relocation_count: u64,
}

impl ImageDescriptor {
    /// The blob range holding the image data.
    ///
    /// Always in bounds for the blob the descriptor was parsed from.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn data_range(&self) -> core::ops::Range<usize> {
        let start = self.data_offset as usize;
        start..start + self.size as usize
    }
}

/// Reads the payload geometry out of the FIT `blob`.
///
/// # Errors
/// Any [`FitError`]; none of them leave side effects, so the caller may go
/// on with the next candidate blob.
pub fn parse_fit_image(blob: &[u8]) -> Result<ImageDescriptor, FitError> {
    let fdt = Fdt::new(blob).map_err(|err| {
        trace!("Candidate blob is not an FDT: {err:?}");
        FitError::NotDeviceTree
    })?;

    let image = payload_image(&fdt)?;
    debug!("Using FIT image node /images/{}", image.name);

    let data_offset = cell_property(&image, "data-offset")?;
    let size = cell_property(&image, "data-size")?;
    let link_base = PhysicalAddress::new(cell_property(&image, "load")?);
    let entry_point = PhysicalAddress::new(cell_property(&image, "entry-start")?);

    if size == 0 {
        return Err(FitError::EmptyImage);
    }

    let blob_len = blob.len() as u64;
    if data_offset.checked_add(size).is_none_or(|end| end > blob_len) {
        return Err(FitError::DataOutOfBounds {
            offset: data_offset,
            size,
            blob: blob_len,
        });
    }

    let relocation_offset = match image.property("reloc-start") {
        Some(_) => cell_property(&image, "reloc-start")?,
        None => size,
    };
    if relocation_offset > size {
        return Err(FitError::RelocationTableOutOfBounds {
            offset: relocation_offset,
            size,
        });
    }

    if entry_point < link_base || entry_point.as_u64() - link_base.as_u64() >= size {
        return Err(FitError::EntryOutsideImage {
            entry: entry_point,
            base: link_base,
        });
    }

    Ok(ImageDescriptor {
        load_base: link_base,
        link_base,
        size,
        entry_point,
        data_offset,
        relocation_offset,
        relocation_count: (size - relocation_offset) / RELOCATION_ENTRY_SIZE,
    })
}

/// Picks the image named by the default configuration, or the first image.
fn payload_image<'b, 'a>(fdt: &'b Fdt<'a>) -> Result<FdtNode<'b, 'a>, FitError> {
    let images = fdt.find_node("/images").ok_or(FitError::NoImages)?;

    let configured = default_firmware(fdt)
        .and_then(|firmware| images.children().find(|image| image.name == firmware));
    if let Some(image) = configured {
        return Ok(image);
    }

    images.children().next().ok_or(FitError::NoImages)
}

fn default_firmware<'a>(fdt: &Fdt<'a>) -> Option<&'a str> {
    let configurations = fdt.find_node("/configurations")?;
    let default = configurations.property("default")?.as_str()?;
    let configuration = configurations
        .children()
        .find(|configuration| configuration.name == default)?;
    configuration.property("firmware")?.as_str()
}

/// Reads a one- or two-cell big-endian integer property.
fn cell_property(node: &FdtNode<'_, '_>, name: &'static str) -> Result<u64, FitError> {
    let property = node
        .property(name)
        .ok_or(FitError::MissingProperty(name))?;
    match *property.value {
        [a, b, c, d] => Ok(u64::from(u32::from_be_bytes([a, b, c, d]))),
        [a, b, c, d, e, f, g, h] => Ok(u64::from_be_bytes([a, b, c, d, e, f, g, h])),
        _ => Err(FitError::MalformedProperty(name)),
    }
}
