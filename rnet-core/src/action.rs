//! Domain-level zone actions.
//!
//! A [`ZoneAction`] carries a value in the units a user thinks in
//! (percent, 1-based source, signed tone offset) and knows how to turn it
//! into the `(ZoneCommand, value byte)` pair the encoder needs.

use std::fmt;
use std::str::FromStr;

use crate::command::ZoneCommand;
use crate::error::{RNetError, Result};
use crate::frame::Frame;
use crate::zone::ZoneId;

/// Offset applied to signed tone/balance values on the wire (`0` = -10).
const TONE_OFFSET: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneAction {
    /// Volume in percent, `0..=100`.
    Volume(u8),
    Power(bool),
    /// Source number, `1..=6`.
    Source(u8),
    /// `-10..=10`, 0 is flat.
    Bass(i8),
    /// `-10..=10`, 0 is flat.
    Treble(i8),
    /// `-10..=10`, negative is left.
    Balance(i8),
    Loudness(bool),
    /// Volume applied at power-on, in percent.
    TurnOnVolume(u8),
    /// Every zone on the bus on/off; the zone id only selects the keypad.
    AllZones(bool),
    /// Ask for a zone-info frame.
    RequestInfo,
}

impl ZoneAction {
    pub fn command(&self) -> ZoneCommand {
        match self {
            ZoneAction::Volume(_) => ZoneCommand::VolumeSet,
            ZoneAction::Power(_) => ZoneCommand::PowerSet,
            ZoneAction::Source(_) => ZoneCommand::SourceSet,
            ZoneAction::Bass(_) => ZoneCommand::BassSet,
            ZoneAction::Treble(_) => ZoneCommand::TrebleSet,
            ZoneAction::Balance(_) => ZoneCommand::BalanceSet,
            ZoneAction::Loudness(_) => ZoneCommand::LoudnessSet,
            ZoneAction::TurnOnVolume(_) => ZoneCommand::TurnOnVolumeSet,
            ZoneAction::AllZones(_) => ZoneCommand::AllOnOffSet,
            ZoneAction::RequestInfo => ZoneCommand::ZoneInfo,
        }
    }

    /// The wire value byte, after range checks.
    pub fn value(&self) -> Result<u8> {
        match *self {
            ZoneAction::Volume(p) => percent_to_wire("volume", p),
            ZoneAction::TurnOnVolume(p) => percent_to_wire("turn-on volume", p),
            ZoneAction::Power(on) | ZoneAction::Loudness(on) | ZoneAction::AllZones(on) => {
                Ok(u8::from(on))
            }
            ZoneAction::Source(s) => {
                check_range("source", i32::from(s), 1, 6)?;
                Ok(s - 1)
            }
            ZoneAction::Bass(v) => tone_to_wire("bass", v),
            ZoneAction::Treble(v) => tone_to_wire("treble", v),
            ZoneAction::Balance(v) => tone_to_wire("balance", v),
            ZoneAction::RequestInfo => Ok(0),
        }
    }

    pub fn encode(&self, zone: ZoneId) -> Result<Frame> {
        Ok(self.command().encode(zone, self.value()?))
    }
}

fn check_range(what: &'static str, value: i32, min: i32, max: i32) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(RNetError::ValueOutOfRange {
            what,
            value,
            min,
            max,
        })
    }
}

fn percent_to_wire(what: &'static str, percent: u8) -> Result<u8> {
    check_range(what, i32::from(percent), 0, 100)?;
    Ok(percent / 2)
}

fn tone_to_wire(what: &'static str, value: i8) -> Result<u8> {
    let value = i32::from(value);
    check_range(what, value, -TONE_OFFSET, TONE_OFFSET)?;
    Ok((value + TONE_OFFSET) as u8)
}

impl fmt::Display for ZoneAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        match self {
            ZoneAction::Volume(p) => write!(f, "volume={p}"),
            ZoneAction::Power(on) => write!(f, "power={}", on_off(*on)),
            ZoneAction::Source(s) => write!(f, "source={s}"),
            ZoneAction::Bass(v) => write!(f, "bass={v}"),
            ZoneAction::Treble(v) => write!(f, "treble={v}"),
            ZoneAction::Balance(v) => write!(f, "balance={v}"),
            ZoneAction::Loudness(on) => write!(f, "loudness={}", on_off(*on)),
            ZoneAction::TurnOnVolume(p) => write!(f, "turn-on-volume={p}"),
            ZoneAction::AllZones(on) => write!(f, "all={}", on_off(*on)),
            ZoneAction::RequestInfo => write!(f, "info"),
        }
    }
}

/// Parses the `Display` form: `volume=40`, `power=on`, `bass=-3`, `info`.
impl FromStr for ZoneAction {
    type Err = RNetError;

    fn from_str(s: &str) -> Result<Self> {
        let parse_err = || RNetError::Parse {
            what: "zone action",
            input: s.to_string(),
        };
        let s_trim = s.trim();
        if s_trim.eq_ignore_ascii_case("info") {
            return Ok(ZoneAction::RequestInfo);
        }

        let (name, value) = s_trim.split_once('=').ok_or_else(parse_err)?;
        let value = value.trim();
        let on_off = || match value.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            _ => Err(parse_err()),
        };

        let action = match name.trim().to_ascii_lowercase().as_str() {
            "volume" => ZoneAction::Volume(value.parse().map_err(|_| parse_err())?),
            "power" => ZoneAction::Power(on_off()?),
            "source" => ZoneAction::Source(value.parse().map_err(|_| parse_err())?),
            "bass" => ZoneAction::Bass(value.parse().map_err(|_| parse_err())?),
            "treble" => ZoneAction::Treble(value.parse().map_err(|_| parse_err())?),
            "balance" => ZoneAction::Balance(value.parse().map_err(|_| parse_err())?),
            "loudness" => ZoneAction::Loudness(on_off()?),
            "turn-on-volume" => ZoneAction::TurnOnVolume(value.parse().map_err(|_| parse_err())?),
            "all" => ZoneAction::AllZones(on_off()?),
            _ => return Err(parse_err()),
        };
        // Reject out-of-range values at parse time, not at send time.
        action.value()?;
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_is_halved_on_the_wire() {
        assert_eq!(ZoneAction::Volume(100).value().unwrap(), 50);
        assert_eq!(ZoneAction::Volume(41).value().unwrap(), 20);
        assert!(ZoneAction::Volume(101).value().is_err());
    }

    #[test]
    fn source_is_zero_based_on_the_wire() {
        assert_eq!(ZoneAction::Source(1).value().unwrap(), 0);
        assert_eq!(ZoneAction::Source(6).value().unwrap(), 5);
        assert!(ZoneAction::Source(0).value().is_err());
        assert!(ZoneAction::Source(7).value().is_err());
    }

    #[test]
    fn tone_values_are_offset_by_ten() {
        assert_eq!(ZoneAction::Balance(-10).value().unwrap(), 0);
        assert_eq!(ZoneAction::Bass(0).value().unwrap(), 10);
        assert_eq!(ZoneAction::Treble(10).value().unwrap(), 20);
        assert!(ZoneAction::Balance(11).value().is_err());
    }

    #[test]
    fn encode_uses_matching_template() {
        let zone = ZoneId::new(2, 3).unwrap();
        let frame = ZoneAction::Source(5).encode(zone).unwrap();
        assert_eq!(frame, ZoneCommand::SourceSet.encode(zone, 4));

        let frame = ZoneAction::RequestInfo.encode(zone).unwrap();
        assert_eq!(frame, ZoneCommand::ZoneInfo.encode(zone, 0));
    }

    #[test]
    fn parse_and_display_agree() {
        let actions = [
            ZoneAction::Volume(40),
            ZoneAction::Power(true),
            ZoneAction::Source(2),
            ZoneAction::Bass(-3),
            ZoneAction::Treble(4),
            ZoneAction::Balance(0),
            ZoneAction::Loudness(false),
            ZoneAction::TurnOnVolume(20),
            ZoneAction::AllZones(false),
            ZoneAction::RequestInfo,
        ];
        for action in actions {
            assert_eq!(action.to_string().parse::<ZoneAction>().unwrap(), action);
        }
    }

    #[test]
    fn parse_rejects_garbage_and_out_of_range() {
        assert!("volume".parse::<ZoneAction>().is_err());
        assert!("volume=loud".parse::<ZoneAction>().is_err());
        assert!("power=maybe".parse::<ZoneAction>().is_err());
        assert!("source=9".parse::<ZoneAction>().is_err());
        assert!("mute=on".parse::<ZoneAction>().is_err());
        assert_eq!("Power = ON".parse::<ZoneAction>().unwrap(), ZoneAction::Power(true));
    }
}
