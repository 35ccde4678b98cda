//! # Trace output

use log::{Level, log_enabled, trace};

const BYTES_PER_LINE: usize = 16;

/// Dumps `blob` as hex at trace level, sixteen bytes per line.
///
/// Silent unless the debug mask has [`DebugLevel::VERBOSE`] set, which the
/// fallback mask does not.
///
/// [`DebugLevel::VERBOSE`]: crate::DebugLevel::VERBOSE
pub fn dump_device_tree(address: u64, blob: &[u8]) {
    if !log_enabled!(Level::Trace) {
        return;
    }

    trace!("FDT at {address:#x}, {} bytes:", blob.len());
    for (index, line) in blob.chunks(BYTES_PER_LINE).enumerate() {
        trace!("{:06x}: {}", index * BYTES_PER_LINE, HexLine(line));
    }
}

struct HexLine<'a>(&'a [u8]);

impl core::fmt::Display for HexLine<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (index, byte) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_line_is_space_separated() {
        let line = HexLine(&[0xd0, 0x0d, 0xfe, 0xed, 0x00]);
        assert_eq!(line.to_string(), "d0 0d fe ed 00");
    }
}
