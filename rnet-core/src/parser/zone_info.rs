use super::{FrameParser, has_signature};
use crate::frame::{Frame, START_OF_MESSAGE};
use crate::zone::{ChannelState, ChannelStateUpdate, ZoneId, ZoneStateUpdate, channel};

const SIGNATURE: [(usize, u8); 4] = [(0, START_OF_MESSAGE), (3, 0x70), (9, 0x04), (10, 0x02)];

/// Last byte read by the decoder.
const LAST_FIELD: usize = 26;

/// Full zone status, the reply to a `ZoneInfo` request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZoneInfoParser;

impl FrameParser for ZoneInfoParser {
    fn name(&self) -> &'static str {
        "zone info"
    }

    fn matches(&self, frame: &Frame) -> bool {
        frame.len() > LAST_FIELD && has_signature(frame, &SIGNATURE)
    }

    fn decode(&self, frame: &Frame) -> Option<ZoneStateUpdate> {
        if !self.matches(frame) {
            return None;
        }
        let zone = ZoneId::from_wire(frame.byte(4)?, frame.byte(12)?);
        let volume = (u16::from(frame.byte(22)?) * 2).min(100) as u8;

        let updates = vec![
            ChannelStateUpdate::new(channel::STATUS, ChannelState::OnOff(frame.byte(20)? == 1)),
            ChannelStateUpdate::new(channel::VOLUME, ChannelState::Percent(volume)),
            ChannelStateUpdate::new(
                channel::SOURCE,
                ChannelState::Decimal(i32::from(frame.byte(21)?) + 1),
            ),
            ChannelStateUpdate::new(
                channel::BALANCE,
                ChannelState::Decimal(i32::from(frame.byte(26)?) - 10),
            ),
            ChannelStateUpdate::new(channel::LOUDNESS, ChannelState::OnOff(frame.byte(25)? == 1)),
        ];
        Some(ZoneStateUpdate::new(zone, updates))
    }
}
