//! # FIT Payload Loader

use crate::fit::parser::{FitError, ImageDescriptor, parse_fit_image};
use crate::fit::relocate::{RelocationError, relocate};
use crate::memory::{PageAllocator, pages_for};
use log::{debug, info, warn};
use payload_addresses::PhysicalAddress;
use uefi::Status;

/// The raw sections of one firmware file.
pub trait SectionSource {
    /// Data of the `instance`-th raw section.
    ///
    /// # Errors
    /// The status that ended the walk, typically [`Status::NOT_FOUND`] once
    /// `instance` runs past the last section.
    fn raw_section(&self, instance: usize) -> Result<&[u8], Status>;
}

impl<T: AsRef<[u8]>> SectionSource for [T] {
    fn raw_section(&self, instance: usize) -> Result<&[u8], Status> {
        self.get(instance)
            .map(AsRef::as_ref)
            .ok_or(Status::NOT_FOUND)
    }
}

/// Where the payload ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadedImage {
    pub base: PhysicalAddress,
    pub size: u64,
    pub entry_point: PhysicalAddress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("Raw section {instance} is unavailable: {status:?}")]
    Section { instance: usize, status: Status },
    #[error("No raw section holds a usable FIT image")]
    NoImage(#[source] FitError),
    #[error("Could not allocate {pages} pages for the payload")]
    AllocationFailed { pages: usize },
    #[error("The {size:#x}-byte payload does not fit the address space")]
    ImageTooLarge { size: u64 },
    #[error("The payload could not be relocated")]
    Relocation(#[from] RelocationError),
}

impl From<LoaderError> for Status {
    fn from(value: LoaderError) -> Self {
        match value {
            LoaderError::Section { status, .. } => status,
            LoaderError::NoImage(_) | LoaderError::AllocationFailed { .. } => Self::NOT_FOUND,
            LoaderError::ImageTooLarge { .. } => Self::BAD_BUFFER_SIZE,
            LoaderError::Relocation(err) => err.into(),
        }
    }
}

/// Finds, copies and rebases the payload carried by `sections`.
///
/// Sections are tried in order until one parses as a FIT image. The image
/// data is copied into freshly allocated pages and relocated there.
///
/// # Errors
/// * [`LoaderError::NoImage`] with the last parse error if sections ran out
///   after at least one failed to parse.
/// * [`LoaderError::Section`] if the very first section is unavailable.
/// * [`LoaderError::AllocationFailed`], [`LoaderError::ImageTooLarge`] or
///   [`LoaderError::Relocation`] once an image was found.
pub fn load_payload<S, A>(sections: &S, allocator: &mut A) -> Result<LoadedImage, LoaderError>
where
    S: SectionSource + ?Sized,
    A: PageAllocator + ?Sized,
{
    let (blob, mut descriptor) = find_image(sections)?;
    info!(
        "Before rebase: payload base {}, size {:#X}, entry point {}",
        descriptor.load_base, descriptor.size, descriptor.entry_point
    );

    let size = usize::try_from(descriptor.size).map_err(|_| LoaderError::ImageTooLarge {
        size: descriptor.size,
    })?;
    let pages = pages_for(descriptor.size).ok_or(LoaderError::ImageTooLarge {
        size: descriptor.size,
    })?;
    let mut allocation = allocator
        .allocate_pages(pages)
        .ok_or(LoaderError::AllocationFailed { pages })?;

    let base = allocation.base();
    let image = allocation
        .bytes_mut()
        .get_mut(..size)
        .ok_or(LoaderError::AllocationFailed { pages })?;
    image.copy_from_slice(&blob[descriptor.data_range()]);
    relocate(image, base, &mut descriptor)?;

    info!(
        "After rebase: payload base {}, size {:#X}, entry point {}",
        descriptor.load_base, descriptor.size, descriptor.entry_point
    );

    Ok(LoadedImage {
        base: descriptor.load_base,
        size: descriptor.size,
        entry_point: descriptor.entry_point,
    })
}

/// Walks the sections until one parses.
fn find_image<S>(sections: &S) -> Result<(&[u8], ImageDescriptor), LoaderError>
where
    S: SectionSource + ?Sized,
{
    let mut last_error = None;
    let mut instance = 0;
    loop {
        let blob = match sections.raw_section(instance) {
            Ok(blob) => blob,
            Err(status) => {
                return Err(match last_error {
                    Some(err) => {
                        warn!("No FIT image in {instance} raw sections, last error: {err}");
                        LoaderError::NoImage(err)
                    }
                    None => LoaderError::Section { instance, status },
                });
            }
        };

        match parse_fit_image(blob) {
            Ok(descriptor) => {
                debug!("Raw section {instance} holds the FIT payload");
                return Ok((blob, descriptor));
            }
            Err(err) => {
                debug!("Raw section {instance} is not a FIT payload: {err}");
                last_error = Some(err);
            }
        }
        instance += 1;
    }
}
