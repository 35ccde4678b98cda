//! # FIT Payload Loader
//!
//! Loads a relocatable FIT payload out of a firmware file and describes the
//! machine to it through a flattened device tree.
//!
//! The crate is driven by the surrounding firmware in two independent
//! steps, each triggered by a boot-phase signal:
//!
//! ```text
//! load_file ─┬─ fit::load_payload   parse → allocate → copy → relocate
//!            └─ arm end-of-phase
//!
//! end-of-phase ──► raise ready-to-payload
//!
//! ready_to_payload ── device_tree::build_device_tree
//!                     hand-off records → FDT blob → DeviceTree record
//! ```
//!
//! Everything the firmware provides (raw file sections, the page allocator,
//! the hand-off record list, phase signalling) is reached through traits so
//! that the loader runs unchanged in hosted tests.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod config;
pub mod device_tree;
pub mod fit;
mod logger;
pub mod memory;
mod phases;
mod tracing;

pub use config::DebugLevel;
pub use logger::{LogSink, PayloadLogger};
pub use phases::{FitPayloadLoader, PhaseSignals};
