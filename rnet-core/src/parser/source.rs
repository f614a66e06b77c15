use super::{FrameParser, has_signature};
use crate::frame::{Frame, START_OF_MESSAGE};
use crate::zone::{ChannelState, ZoneId, ZoneStateUpdate, channel};

const SIGNATURE: [(usize, u8); 4] = [(0, START_OF_MESSAGE), (6, 0x7F), (7, 0x06), (12, 0x05)];

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceChangeParser;

impl FrameParser for SourceChangeParser {
    fn name(&self) -> &'static str {
        "source change"
    }

    fn matches(&self, frame: &Frame) -> bool {
        has_signature(frame, &SIGNATURE)
    }

    fn decode(&self, frame: &Frame) -> Option<ZoneStateUpdate> {
        if !self.matches(frame) {
            return None;
        }
        let zone = ZoneId::from_wire(frame.byte(1)?, frame.byte(2)?);
        let source = i32::from(frame.byte(9)?) + 1;
        Some(ZoneStateUpdate::single(
            zone,
            channel::SOURCE,
            ChannelState::Decimal(source),
        ))
    }
}
