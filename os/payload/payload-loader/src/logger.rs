//! # Payload Logger
//!
//! Routes `log` records to a platform-provided sink, filtered by the
//! firmware debug mask.

use crate::config::DebugLevel;
use alloc::boxed::Box;
use core::fmt;
use log::{Log, Metadata, Record, SetLoggerError};

/// Writes one formatted line; typically a serial port or debug console.
pub type LogSink = fn(fmt::Arguments<'_>);

pub struct PayloadLogger {
    level: DebugLevel,
    sink: LogSink,
}

impl PayloadLogger {
    #[must_use]
    pub const fn new(level: DebugLevel, sink: LogSink) -> Self {
        Self { level, sink }
    }

    /// Installs the logger for the rest of the boot. Call this once.
    ///
    /// # Errors
    /// [`SetLoggerError`] if a logger is already installed.
    pub fn init(self) -> Result<&'static Self, SetLoggerError> {
        let max_level = self.level.max_level_filter();
        let logger: &'static Self = Box::leak(Box::new(self));
        log::set_logger(logger)?;
        log::set_max_level(max_level);
        Ok(logger)
    }

    #[must_use]
    pub const fn level(&self) -> DebugLevel {
        self.level
    }
}

impl Log for PayloadLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.level.enables(metadata.level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        (self.sink)(format_args!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}
