use super::{FrameParser, has_signature};
use crate::frame::{Frame, START_OF_MESSAGE};
use crate::zone::{ChannelState, ZoneId, ZoneStateUpdate, channel};

const SIGNATURE: [(usize, u8); 3] = [(0, START_OF_MESSAGE), (10, 0xF1), (11, 0x23)];

/// Zone power on/off event. Same family as volume change, different event id.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerChangeParser;

impl FrameParser for PowerChangeParser {
    fn name(&self) -> &'static str {
        "power change"
    }

    fn matches(&self, frame: &Frame) -> bool {
        has_signature(frame, &SIGNATURE)
    }

    fn decode(&self, frame: &Frame) -> Option<ZoneStateUpdate> {
        if !self.matches(frame) {
            return None;
        }
        let zone = ZoneId::from_wire(frame.byte(1)?, frame.byte(2)?);
        let on = frame.byte(8)? != 0;
        Some(ZoneStateUpdate::single(
            zone,
            channel::STATUS,
            ChannelState::OnOff(on),
        ))
    }
}
