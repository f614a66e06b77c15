use tracing::debug;

use super::{FrameParser, has_signature};
use crate::frame::{Frame, START_OF_MESSAGE};
use crate::zone::{ChannelState, ZoneId, ZoneStateUpdate, channel};

const SIGNATURE: [(usize, u8); 3] = [(0, START_OF_MESSAGE), (10, 0xF1), (11, 0x6F)];

/// Volume-change event sent by a keypad or in reply to `VolumeSet`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeChangeParser;

impl FrameParser for VolumeChangeParser {
    fn name(&self) -> &'static str {
        "volume change"
    }

    fn matches(&self, frame: &Frame) -> bool {
        has_signature(frame, &SIGNATURE)
    }

    fn decode(&self, frame: &Frame) -> Option<ZoneStateUpdate> {
        if !self.matches(frame) {
            return None;
        }
        let zone = ZoneId::from_wire(frame.byte(1)?, frame.byte(2)?);
        // Devices report volume in steps of two percent.
        let volume = (u16::from(frame.byte(8)?) * 2).min(100) as u8;
        debug!(%zone, volume, "volume detected");
        Some(ZoneStateUpdate::single(
            zone,
            channel::VOLUME,
            ChannelState::Percent(volume),
        ))
    }
}
