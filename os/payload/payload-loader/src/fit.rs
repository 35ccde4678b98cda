//! # FIT Payload Images
//!
//! A FIT image is a flattened device tree that describes one or more images
//! stored behind it in the same blob:
//!
//! ```text
//! ┌──────────────────────┐ 0
//! │ FDT                  │  /images/<payload>: data-offset, data-size,
//! │                      │                     load, entry-start, reloc-start
//! ├──────────────────────┤ data-offset
//! │ image data           │
//! │   ...                │
//! │   relocation table   │ reloc-start .. data-size, 16-byte entries
//! └──────────────────────┘ data-offset + data-size
//! ```
//!
//! [`parser`] reads the geometry, [`relocate`] rebases a copied image, and
//! [`loader`] drives both against the sections of a firmware file.

pub mod loader;
pub mod parser;
pub mod relocate;

pub use loader::{LoadedImage, LoaderError, SectionSource, load_payload};
pub use parser::{FitError, ImageDescriptor, parse_fit_image};
pub use relocate::{RelocationEntry, RelocationError, relocate};
