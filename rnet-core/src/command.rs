//! Outgoing command templates and the RNet checksum.
//!
//! Every command is a fixed byte template. Encoding copies the template,
//! writes the 0-based controller/zone bytes and the value byte, then
//! appends the checksum and the `0xF7` terminator.

use std::fmt;

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::frame::{Frame, HexBytes, TERMINATOR};
use crate::zone::ZoneId;

// ── Checksum ─────────────────────────────────────────────────────

/// RNet checksum: sum of the command bytes plus the command length,
/// masked to seven bits.
///
/// `command` excludes the checksum and terminator bytes.
pub fn checksum(command: &[u8]) -> u8 {
    let sum = command
        .iter()
        .fold(command.len() as u32, |acc, &b| acc.wrapping_add(u32::from(b)));
    (sum & 0x7F) as u8
}

// ── CommandTemplate ──────────────────────────────────────────────

/// A read-only byte template plus the offsets that encoding overwrites.
#[derive(Debug)]
pub struct CommandTemplate {
    bytes: &'static [u8],
    controller_offsets: &'static [usize],
    zone_offsets: &'static [usize],
    value_offset: usize,
}

impl CommandTemplate {
    const fn new(
        bytes: &'static [u8],
        controller_offsets: &'static [usize],
        zone_offsets: &'static [usize],
        value_offset: usize,
    ) -> Self {
        Self {
            bytes,
            controller_offsets,
            zone_offsets,
            value_offset,
        }
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }

    pub fn controller_offsets(&self) -> &'static [usize] {
        self.controller_offsets
    }

    pub fn zone_offsets(&self) -> &'static [usize] {
        self.zone_offsets
    }

    pub fn value_offset(&self) -> usize {
        self.value_offset
    }

    /// Template bytes with zone and value substituted, without checksum
    /// or terminator.
    pub fn fill(&self, zone: ZoneId, value: u8) -> Vec<u8> {
        let mut command = self.bytes.to_vec();
        for &offset in self.controller_offsets {
            command[offset] = zone.controller_byte();
        }
        for &offset in self.zone_offsets {
            command[offset] = zone.zone_byte();
        }
        command[self.value_offset] = value;
        command
    }

    /// A ready-to-send frame: filled command, checksum, terminator.
    pub fn encode(&self, zone: ZoneId, value: u8) -> Frame {
        let command = self.fill(zone, value);
        let mut out = BytesMut::with_capacity(command.len() + 2);
        out.put_slice(&command);
        out.put_u8(checksum(&command));
        out.put_u8(TERMINATOR);
        trace!(zone = %zone, value, bytes = %HexBytes(&out[..]), "encoded command");
        Frame::from_terminated(out.freeze())
    }

    /// Reads the zone and value back out of a frame built from this
    /// template. Returns `None` when the frame is too short.
    pub fn decode(&self, frame: &Frame) -> Option<(ZoneId, u8)> {
        let controller = frame.byte(*self.controller_offsets.first()?)?;
        let zone = frame.byte(*self.zone_offsets.first()?)?;
        let value = frame.byte(self.value_offset)?;
        Some((ZoneId::from_wire(controller, zone), value))
    }
}

// ── Templates ────────────────────────────────────────────────────

const VOLUME_BYTES: [u8; 20] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x05, 0x02, 0x02, 0x00, 0x00, 0xF1, 0x21, 0x00, 0x12,
    0x00, 0x00, 0x00, 0x01,
];
const POWER_BYTES: [u8; 20] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x05, 0x02, 0x02, 0x00, 0x00, 0xF1, 0x23, 0x00, 0x00,
    0x00, 0x05, 0x00, 0x01,
];
const SOURCE_BYTES: [u8; 20] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x05, 0x02, 0x00, 0x00, 0x00, 0xF1, 0x3E, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x01,
];
const BASS_BYTES: [u8; 22] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x01, 0x00, 0x01,
];
const ZONE_INFO_BYTES: [u8; 15] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x01, 0x04, 0x02, 0x00, 0x00, 0x07, 0x00, 0x00,
];
const BALANCE_BYTES: [u8; 22] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
];
const LOUDNESS_BYTES: [u8; 22] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
];
const TREBLE_BYTES: [u8; 22] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
];
const TURN_ON_VOLUME_BYTES: [u8; 22] = [
    0xF0, 0x00, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x01, 0x00, 0x00,
];
// Byte 1 is the 0x7E broadcast address.
const ALL_ON_OFF_BYTES: [u8; 20] = [
    0xF0, 0x7E, 0x00, 0x7F, 0x00, 0x00, 0x70, 0x05, 0x02, 0x02, 0x00, 0x00, 0xF1, 0x22, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x01,
];

static VOLUME: CommandTemplate = CommandTemplate::new(&VOLUME_BYTES, &[1, 4], &[5, 17], 15);
static POWER: CommandTemplate = CommandTemplate::new(&POWER_BYTES, &[1, 4], &[5, 17], 15);
static SOURCE: CommandTemplate = CommandTemplate::new(&SOURCE_BYTES, &[1, 4], &[5], 17);
static BASS: CommandTemplate = CommandTemplate::new(&BASS_BYTES, &[1, 4], &[5, 11], 21);
static ZONE_INFO: CommandTemplate = CommandTemplate::new(&ZONE_INFO_BYTES, &[1], &[11], 2);
static BALANCE: CommandTemplate = CommandTemplate::new(&BALANCE_BYTES, &[1, 4], &[5, 11], 21);
static LOUDNESS: CommandTemplate = CommandTemplate::new(&LOUDNESS_BYTES, &[1, 4], &[5, 11], 21);
static TREBLE: CommandTemplate = CommandTemplate::new(&TREBLE_BYTES, &[1, 4], &[5, 11], 21);
static TURN_ON_VOLUME: CommandTemplate =
    CommandTemplate::new(&TURN_ON_VOLUME_BYTES, &[1, 4], &[5, 11], 21);
static ALL_ON_OFF: CommandTemplate = CommandTemplate::new(&ALL_ON_OFF_BYTES, &[4], &[5], 15);

// ── ZoneCommand ──────────────────────────────────────────────────

/// Every command the engine can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneCommand {
    VolumeSet,
    PowerSet,
    SourceSet,
    BassSet,
    /// Asks the controller to report a zone-info frame.
    ZoneInfo,
    BalanceSet,
    LoudnessSet,
    TrebleSet,
    TurnOnVolumeSet,
    /// Switches every zone on the bus on or off.
    AllOnOffSet,
}

impl ZoneCommand {
    pub const ALL: [ZoneCommand; 10] = [
        ZoneCommand::VolumeSet,
        ZoneCommand::PowerSet,
        ZoneCommand::SourceSet,
        ZoneCommand::BassSet,
        ZoneCommand::ZoneInfo,
        ZoneCommand::BalanceSet,
        ZoneCommand::LoudnessSet,
        ZoneCommand::TrebleSet,
        ZoneCommand::TurnOnVolumeSet,
        ZoneCommand::AllOnOffSet,
    ];

    pub fn template(self) -> &'static CommandTemplate {
        match self {
            ZoneCommand::VolumeSet => &VOLUME,
            ZoneCommand::PowerSet => &POWER,
            ZoneCommand::SourceSet => &SOURCE,
            ZoneCommand::BassSet => &BASS,
            ZoneCommand::ZoneInfo => &ZONE_INFO,
            ZoneCommand::BalanceSet => &BALANCE,
            ZoneCommand::LoudnessSet => &LOUDNESS,
            ZoneCommand::TrebleSet => &TREBLE,
            ZoneCommand::TurnOnVolumeSet => &TURN_ON_VOLUME,
            ZoneCommand::AllOnOffSet => &ALL_ON_OFF,
        }
    }

    pub fn encode(self, zone: ZoneId, value: u8) -> Frame {
        self.template().encode(zone, value)
    }
}

impl fmt::Display for ZoneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(c: u8, z: u8) -> ZoneId {
        ZoneId::new(c, z).unwrap()
    }

    #[test]
    fn checksum_table() {
        let cases: [(&[u8], u8); 4] = [
            (&[], 0x00),
            (&[0xFF; 10], 0x00),
            (&VOLUME_BYTES, 0x21),
            (&ALL_ON_OFF_BYTES, 0x0E),
        ];
        for (bytes, expected) in cases {
            assert_eq!(checksum(bytes), expected, "bytes {}", HexBytes(bytes));
        }
    }

    #[test]
    fn source_set_for_controller_two_zone_three() {
        let frame = ZoneCommand::SourceSet.encode(zone(2, 3), 4);
        let bytes = frame.as_bytes();

        assert_eq!(bytes.len(), 22);
        assert_eq!(bytes[1], 1);
        assert_eq!(bytes[4], 1);
        assert_eq!(bytes[5], 2);
        assert_eq!(bytes[17], 4);
        assert_eq!(bytes[20], checksum(&bytes[..20]));
        assert_eq!(bytes[20], 0x32);
        assert_eq!(bytes[21], TERMINATOR);
    }

    #[test]
    fn volume_set_known_frame() {
        let frame = ZoneCommand::VolumeSet.encode(zone(1, 1), 25);
        assert_eq!(
            frame.hex().to_string(),
            "f0 00 00 7f 00 00 70 05 02 02 00 00 f1 21 00 19 00 00 00 01 28 f7"
        );
    }

    #[test]
    fn zone_info_known_frame() {
        let frame = ZoneCommand::ZoneInfo.encode(zone(1, 4), 0);
        assert_eq!(
            frame.hex().to_string(),
            "f0 00 00 7f 00 00 70 01 04 02 00 03 07 00 00 7f f7"
        );
    }

    #[test]
    fn power_set_writes_every_offset() {
        let frame = ZoneCommand::PowerSet.encode(zone(3, 6), 1);
        let bytes = frame.as_bytes();
        assert_eq!((bytes[1], bytes[4]), (2, 2));
        assert_eq!((bytes[5], bytes[17]), (5, 5));
        assert_eq!(bytes[15], 1);
        assert_eq!(bytes[20], 0x20);
    }

    #[test]
    fn volume_set_writes_keypad_and_target_zone() {
        let frame = ZoneCommand::VolumeSet.encode(zone(3, 5), 10);
        let bytes = frame.as_bytes();
        assert_eq!((bytes[1], bytes[4]), (2, 2));
        // Byte 5 is the keypad zone; leaving it stale addresses the wrong keypad.
        assert_eq!((bytes[5], bytes[17]), (4, 4));
        assert_eq!(bytes[15], 10);
        assert_eq!(bytes[20], checksum(&bytes[..20]));
    }

    #[test]
    fn encoding_never_mutates_the_template() {
        let before = VOLUME.bytes().to_vec();
        let _ = ZoneCommand::VolumeSet.encode(zone(6, 6), 0x7F);
        assert_eq!(VOLUME.bytes(), &before[..]);
    }

    #[test]
    fn every_command_round_trips_zone_and_value() {
        for command in ZoneCommand::ALL {
            let template = command.template();
            for c in 1..=6 {
                for z in 1..=6 {
                    for value in 0..=u8::MAX {
                        let id = zone(c, z);
                        let frame = command.encode(id, value);
                        assert_eq!(
                            template.decode(&frame),
                            Some((id, value)),
                            "{command} {id} {value}"
                        );
                        assert_eq!(frame.len(), template.bytes().len() + 2);
                    }
                }
            }
        }
    }

    #[test]
    fn offsets_lie_inside_every_template() {
        for command in ZoneCommand::ALL {
            let t = command.template();
            let len = t.bytes().len();
            assert!(t.value_offset() < len, "{command}");
            assert!(t.controller_offsets().iter().all(|&o| o < len), "{command}");
            assert!(t.zone_offsets().iter().all(|&o| o < len), "{command}");
            assert!(!t.zone_offsets().contains(&t.value_offset()), "{command}");
        }
    }
}
