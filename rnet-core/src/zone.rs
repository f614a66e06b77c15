//! Zone addressing and decoded zone-state types.
//!
//! Controller and zone indices are 1-based in every public type here.
//! Only the codec layers convert to and from the 0-based wire bytes.

use std::fmt;
use std::str::FromStr;

use crate::error::{RNetError, Result};

/// Highest controller index addressable on an RNet bus.
pub const MAX_CONTROLLERS: u8 = 6;

/// Highest zone index on a single controller.
pub const MAX_ZONES: u8 = 6;

/// Channel names carried by [`ChannelStateUpdate`].
pub mod channel {
    /// Zone power (on/off).
    pub const STATUS: &str = "status";
    /// Zone volume in percent.
    pub const VOLUME: &str = "volume";
    /// Selected source, 1-based.
    pub const SOURCE: &str = "source";
    /// Balance, `-10..=10`.
    pub const BALANCE: &str = "balance";
    /// Loudness contour (on/off).
    pub const LOUDNESS: &str = "loudness";
}

// ── ZoneId ───────────────────────────────────────────────────────

/// A zone on the bus: `(controller, zone)`, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId {
    controller: u8,
    zone: u8,
}

impl ZoneId {
    /// Builds a validated zone id. Both indices must lie in `1..=6`.
    pub fn new(controller: u8, zone: u8) -> Result<Self> {
        if !(1..=MAX_CONTROLLERS).contains(&controller) || !(1..=MAX_ZONES).contains(&zone) {
            return Err(RNetError::InvalidZone { controller, zone });
        }
        Ok(Self { controller, zone })
    }

    /// Builds a zone id from 0-based wire bytes, without range checks.
    ///
    /// Devices report whatever they report; decoding never rejects a frame
    /// because of an unusual index.
    pub fn from_wire(controller: u8, zone: u8) -> Self {
        Self {
            controller: controller.wrapping_add(1),
            zone: zone.wrapping_add(1),
        }
    }

    pub fn controller(&self) -> u8 {
        self.controller
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    /// The controller index as written on the wire.
    pub fn controller_byte(&self) -> u8 {
        self.controller.wrapping_sub(1)
    }

    /// The zone index as written on the wire.
    pub fn zone_byte(&self) -> u8 {
        self.zone.wrapping_sub(1)
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.controller, self.zone)
    }
}

/// Parses `"controller,zone"`, e.g. `"1,3"`.
impl FromStr for ZoneId {
    type Err = RNetError;

    fn from_str(s: &str) -> Result<Self> {
        let parse_err = || RNetError::Parse {
            what: "zone id",
            input: s.to_string(),
        };
        let (controller, zone) = s.split_once(',').ok_or_else(parse_err)?;
        let controller = controller.trim().parse().map_err(|_| parse_err())?;
        let zone = zone.trim().parse().map_err(|_| parse_err())?;
        Self::new(controller, zone)
    }
}

// ── ChannelState ─────────────────────────────────────────────────

/// The typed value of one decoded channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    OnOff(bool),
    Percent(u8),
    Decimal(i32),
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff(true) => write!(f, "ON"),
            Self::OnOff(false) => write!(f, "OFF"),
            Self::Percent(p) => write!(f, "{p}%"),
            Self::Decimal(d) => write!(f, "{d}"),
        }
    }
}

// ── Updates ──────────────────────────────────────────────────────

/// One decoded attribute change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStateUpdate {
    channel: &'static str,
    state: ChannelState,
}

impl ChannelStateUpdate {
    pub fn new(channel: &'static str, state: ChannelState) -> Self {
        Self { channel, state }
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }
}

/// Everything decoded from one frame: the zone it concerns and the
/// channel updates, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStateUpdate {
    zone: ZoneId,
    updates: Vec<ChannelStateUpdate>,
}

impl ZoneStateUpdate {
    pub fn new(zone: ZoneId, updates: Vec<ChannelStateUpdate>) -> Self {
        Self { zone, updates }
    }

    /// An update carrying a single channel.
    pub fn single(zone: ZoneId, channel: &'static str, state: ChannelState) -> Self {
        Self::new(zone, vec![ChannelStateUpdate::new(channel, state)])
    }

    pub fn zone(&self) -> ZoneId {
        self.zone
    }

    pub fn updates(&self) -> &[ChannelStateUpdate] {
        &self.updates
    }

    /// The state reported for `channel`, if this update carries it.
    pub fn get(&self, channel: &str) -> Option<ChannelState> {
        self.updates
            .iter()
            .find(|u| u.channel == channel)
            .map(|u| u.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn zone_id_validates_range() {
        assert!(ZoneId::new(1, 1).is_ok());
        assert!(ZoneId::new(6, 6).is_ok());
        assert!(ZoneId::new(0, 1).is_err());
        assert!(ZoneId::new(1, 7).is_err());
    }

    #[test]
    fn zone_id_wire_bytes_are_zero_based() {
        let id = ZoneId::new(2, 3).unwrap();
        assert_eq!(id.controller_byte(), 1);
        assert_eq!(id.zone_byte(), 2);
        assert_eq!(ZoneId::from_wire(1, 2), id);
    }

    #[test]
    fn zone_id_is_a_structural_map_key() {
        let mut names = HashMap::new();
        names.insert(ZoneId::new(1, 2).unwrap(), "kitchen");
        assert_eq!(names.get(&ZoneId::from_wire(0, 1)), Some(&"kitchen"));
        assert_eq!(names.get(&ZoneId::from_wire(1, 0)), None);
    }

    #[test]
    fn zone_id_parse() {
        assert_eq!("2, 5".parse::<ZoneId>().unwrap(), ZoneId::new(2, 5).unwrap());
        assert!("25".parse::<ZoneId>().is_err());
        assert!("1,9".parse::<ZoneId>().is_err());
        assert_eq!(ZoneId::new(3, 4).unwrap().to_string(), "3,4");
    }

    #[test]
    fn update_lookup_by_channel() {
        let zone = ZoneId::new(1, 1).unwrap();
        let update = ZoneStateUpdate::new(
            zone,
            vec![
                ChannelStateUpdate::new(channel::STATUS, ChannelState::OnOff(true)),
                ChannelStateUpdate::new(channel::VOLUME, ChannelState::Percent(40)),
            ],
        );
        assert_eq!(update.get(channel::VOLUME), Some(ChannelState::Percent(40)));
        assert_eq!(update.get(channel::SOURCE), None);
        assert_eq!(update.updates().len(), 2);
    }

    #[test]
    fn channel_state_display() {
        assert_eq!(ChannelState::OnOff(true).to_string(), "ON");
        assert_eq!(ChannelState::Percent(42).to_string(), "42%");
        assert_eq!(ChannelState::Decimal(-3).to_string(), "-3");
    }
}
