//! # Debug Verbosity
//!
//! The verbosity mask is resolved once from the hand-off list and then
//! handed to whoever needs it: the logger filters on it and the device tree
//! forwards it to the payload.

use core::fmt;
use log::{Level, LevelFilter, debug};
use payload_handoff::HandoffList;
use payload_handoff::payload::DebugPrintErrorLevel;

/// Firmware debug-print category mask.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct DebugLevel(u32);

impl DebugLevel {
    pub const INIT: u32 = 0x0000_0001;
    pub const WARN: u32 = 0x0000_0002;
    pub const LOAD: u32 = 0x0000_0004;
    pub const FS: u32 = 0x0000_0008;
    pub const POOL: u32 = 0x0000_0010;
    pub const PAGE: u32 = 0x0000_0020;
    pub const INFO: u32 = 0x0000_0040;
    pub const DISPATCH: u32 = 0x0000_0080;
    pub const VARIABLE: u32 = 0x0000_0100;
    pub const BM: u32 = 0x0000_0400;
    pub const BLKIO: u32 = 0x0000_1000;
    pub const NET: u32 = 0x0000_4000;
    pub const UNDI: u32 = 0x0001_0000;
    pub const LOADFILE: u32 = 0x0002_0000;
    pub const EVENT: u32 = 0x0008_0000;
    pub const GCD: u32 = 0x0010_0000;
    pub const CACHE: u32 = 0x0020_0000;
    pub const VERBOSE: u32 = 0x0040_0000;
    pub const ERROR: u32 = 0x8000_0000;

    /// Used when the hand-off list carries no usable level.
    pub const FALLBACK: Self = Self(0x8000_004F);

    #[must_use]
    pub const fn new(mask: u32) -> Self {
        Self(mask)
    }

    /// Reads the level published by an earlier stage, or [`Self::FALLBACK`].
    #[must_use]
    pub fn resolve<H: HandoffList + ?Sized>(records: &H) -> Self {
        match records.find_payload::<DebugPrintErrorLevel>() {
            Ok(payload) => Self(payload.error_level),
            Err(err) => {
                debug!("Using fallback debug level: {err}");
                Self::FALLBACK
            }
        }
    }

    #[must_use]
    pub const fn mask(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Whether records of `level` pass this mask.
    #[must_use]
    pub const fn enables(self, level: Level) -> bool {
        match level {
            Level::Error => self.contains(Self::ERROR),
            Level::Warn => self.contains(Self::WARN),
            Level::Info => self.contains(Self::INFO),
            Level::Debug | Level::Trace => self.contains(Self::VERBOSE),
        }
    }

    /// The most verbose `log` level this mask lets through.
    #[must_use]
    pub const fn max_level_filter(self) -> LevelFilter {
        if self.contains(Self::VERBOSE) {
            LevelFilter::Trace
        } else if self.contains(Self::INFO) {
            LevelFilter::Info
        } else if self.contains(Self::WARN) {
            LevelFilter::Warn
        } else if self.contains(Self::ERROR) {
            LevelFilter::Error
        } else {
            LevelFilter::Off
        }
    }
}

impl Default for DebugLevel {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Debug for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DebugLevel(0x{:08X})", self.0)
    }
}
