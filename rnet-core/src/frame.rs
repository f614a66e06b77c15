use std::fmt;

use bytes::Bytes;

use crate::error::{RNetError, Result};

/// Sentinel byte ending every RNet frame.
pub const TERMINATOR: u8 = 0xF7;

/// Signature byte that opens every zone message.
pub const START_OF_MESSAGE: u8 = 0xF0;

/// One complete, terminator-delimited RNet message.
///
/// Frames are immutable; cloning only bumps a reference count.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// Wraps raw bytes, which must end with [`TERMINATOR`].
    pub fn new(bytes: impl Into<Bytes>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.last() != Some(&TERMINATOR) {
            return Err(RNetError::MalformedFrame("missing 0xF7 terminator"));
        }
        Ok(Self { bytes })
    }

    /// The codec only hands over slices that end at a terminator.
    pub(crate) fn from_terminated(bytes: Bytes) -> Self {
        debug_assert_eq!(bytes.last(), Some(&TERMINATOR));
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Byte at `index`, or `None` past the end of the frame.
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex rendering for logs.
    pub fn hex(&self) -> HexBytes<'_> {
        HexBytes(&self.bytes)
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.hex())
    }
}

// ── HexBytes ─────────────────────────────────────────────────────

/// Renders bytes as space-separated lowercase hex pairs: `f0 00 7f`.
#[derive(Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_requires_terminator() {
        assert!(Frame::new(vec![0xF0, 0x00, 0xF7]).is_ok());
        assert!(Frame::new(vec![0xF0, 0x00]).is_err());
        assert!(Frame::new(Vec::new()).is_err());
    }

    #[test]
    fn byte_access_is_bounds_checked() {
        let frame = Frame::new(vec![0xF0, 0x12, 0xF7]).unwrap();
        assert_eq!(frame.byte(1), Some(0x12));
        assert_eq!(frame.byte(3), None);
        assert_eq!(frame.len(), 3);
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(HexBytes(&[0xF0, 0x00, 0x7F]).to_string(), "f0 00 7f");
        assert_eq!(HexBytes(&[]).to_string(), "");
        let frame = Frame::new(vec![0x01, 0xF7]).unwrap();
        assert_eq!(format!("{frame:?}"), "Frame(01 f7)");
    }
}
