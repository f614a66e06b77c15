//! Frame parsers: one matcher/decoder pair per inbound message shape.
//!
//! # Signatures
//!
//! ```text
//! volume change   b0=F0 b10=F1 b11=6F          zone=(b1,b2)   volume=b8*2
//! power change    b0=F0 b10=F1 b11=23          zone=(b1,b2)   status=b8!=0
//! source change   b0=F0 b6=7F b7=06 b12=05     zone=(b1,b2)   source=b9+1
//! zone info       b0=F0 b3=70 b9=04 b10=02     zone=(b4,b12)  five channels
//! ```
//!
//! Receive-side checksums are not validated.

mod power;
mod source;
mod volume;
mod zone_info;

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::frame::Frame;
use crate::zone::ZoneStateUpdate;

pub use power::PowerChangeParser;
pub use source::SourceChangeParser;
pub use volume::VolumeChangeParser;
pub use zone_info::ZoneInfoParser;

/// Recognizes one message shape and decodes it.
///
/// Both methods are pure: they read the frame and nothing else.
pub trait FrameParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, frame: &Frame) -> bool;

    /// `None` when the frame does not match.
    fn decode(&self, frame: &Frame) -> Option<ZoneStateUpdate>;
}

/// `true` when every `(offset, byte)` pair is present in `frame`.
///
/// Offsets past the end of the frame never match.
pub(crate) fn has_signature(frame: &Frame, signature: &[(usize, u8)]) -> bool {
    signature
        .iter()
        .all(|&(offset, expected)| frame.byte(offset) == Some(expected))
}

// ── ParserSet ────────────────────────────────────────────────────

/// Ordered parser registry. The first parser whose `matches` returns
/// `true` decodes the frame; later parsers are not consulted.
#[derive(Clone)]
pub struct ParserSet {
    parsers: Vec<Arc<dyn FrameParser>>,
}

impl ParserSet {
    /// An empty set that decodes nothing.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Volume, power, source and zone-info parsers, in that order.
    pub fn standard() -> Self {
        Self::empty()
            .with(VolumeChangeParser)
            .with(PowerChangeParser)
            .with(SourceChangeParser)
            .with(ZoneInfoParser)
    }

    /// Appends a parser at the lowest priority.
    pub fn with(mut self, parser: impl FrameParser + 'static) -> Self {
        self.parsers.push(Arc::new(parser));
        self
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Name of the parser that would handle `frame`.
    pub fn find(&self, frame: &Frame) -> Option<&'static str> {
        self.parsers
            .iter()
            .find(|p| p.matches(frame))
            .map(|p| p.name())
    }

    pub fn decode(&self, frame: &Frame) -> Option<ZoneStateUpdate> {
        let Some(parser) = self.parsers.iter().find(|p| p.matches(frame)) else {
            trace!(frame = %frame.hex(), "no parser matched");
            return None;
        };
        let update = parser.decode(frame);
        trace!(parser = parser.name(), decoded = update.is_some(), "frame parsed");
        update
    }
}

impl Default for ParserSet {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ParserSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.parsers.iter().map(|p| p.name()))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::zone::{ChannelState, ZoneId, channel};

    /// Volume-change frame for zone (1,1) reporting 100%.
    pub(crate) const VOLUME_FRAME: [u8; 15] = [
        0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x70, 0x05, 0x32, 0x02, 0xF1, 0x6F, 0x00, 0x11, 0xF7,
    ];

    /// Builds a frame of `len` bytes (terminator included) with the
    /// given bytes set and zeros elsewhere.
    pub(crate) fn frame_with(len: usize, set: &[(usize, u8)]) -> Frame {
        let mut bytes = vec![0u8; len];
        for &(i, b) in set {
            bytes[i] = b;
        }
        bytes[len - 1] = 0xF7;
        Frame::new(bytes).unwrap()
    }

    #[test]
    fn standard_set_order() {
        let set = ParserSet::standard();
        assert_eq!(set.len(), 4);
        assert_eq!(
            format!("{set:?}"),
            r#"["volume change", "power change", "source change", "zone info"]"#
        );
    }

    #[test]
    fn volume_frame_decodes_to_zone_one_one_at_full_volume() {
        let frame = Frame::new(VOLUME_FRAME.to_vec()).unwrap();
        let update = ParserSet::standard().decode(&frame).unwrap();
        assert_eq!(update.zone(), ZoneId::new(1, 1).unwrap());
        assert_eq!(update.get(channel::VOLUME), Some(ChannelState::Percent(100)));
        assert_eq!(update.updates().len(), 1);
    }

    #[test]
    fn unrecognized_frame_is_dropped() {
        let frame = Frame::new(vec![0xF0, 0x01, 0x02, 0xF7]).unwrap();
        assert!(ParserSet::standard().decode(&frame).is_none());
        assert!(ParserSet::empty().decode(&Frame::new(VOLUME_FRAME.to_vec()).unwrap()).is_none());
    }

    #[test]
    fn first_match_wins() {
        struct Everything;
        impl FrameParser for Everything {
            fn name(&self) -> &'static str {
                "everything"
            }
            fn matches(&self, _: &Frame) -> bool {
                true
            }
            fn decode(&self, _: &Frame) -> Option<ZoneStateUpdate> {
                Some(ZoneStateUpdate::new(ZoneId::from_wire(5, 5), Vec::new()))
            }
        }

        let frame = Frame::new(VOLUME_FRAME.to_vec()).unwrap();
        let standard_first = ParserSet::standard().with(Everything);
        assert_eq!(standard_first.find(&frame), Some("volume change"));

        let catch_all_first = ParserSet::empty().with(Everything).with(VolumeChangeParser);
        let update = catch_all_first.decode(&frame).unwrap();
        assert_eq!(update.zone(), ZoneId::new(6, 6).unwrap());
    }

    #[test]
    fn matching_leaves_frame_untouched() {
        let frame = Frame::new(VOLUME_FRAME.to_vec()).unwrap();
        let before = frame.clone();
        let set = ParserSet::standard();
        for _ in 0..3 {
            set.find(&frame);
            set.decode(&frame);
        }
        assert_eq!(frame, before);
        assert_eq!(frame.as_bytes(), &VOLUME_FRAME);
    }

    #[test]
    fn short_frames_never_match() {
        let set = ParserSet::standard();
        for len in 1..VOLUME_FRAME.len() {
            let mut bytes = VOLUME_FRAME[..len].to_vec();
            *bytes.last_mut().unwrap() = 0xF7;
            let frame = Frame::new(bytes).unwrap();
            if len <= 11 {
                assert!(set.find(&frame).is_none(), "len {len}");
            }
        }
    }
}
