//! # rnet-core
//!
//! Protocol engine for Russound RNet audio controllers reached through a
//! serial-to-TCP bridge.
//!
//! This crate contains:
//! - **Framing**: `RNetCodec` and `FrameStream`, splitting the byte stream at `0xF7`
//! - **Commands**: `ZoneCommand` templates with the RNet checksum, and typed `ZoneAction`s
//! - **Parsers**: `ParserSet` turning inbound frames into `ZoneStateUpdate`s
//! - **Dispatch**: bounded queue, `Dispatcher` task and `EventBus` of listeners
//! - **Session**: `Session`, owning the socket plus the reconnect and ping tasks
//! - **Error**: `RNetError`, typed and `thiserror`-based

pub mod action;
pub mod codec;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod network;
pub mod parser;
pub mod state;
pub mod task;
pub mod zone;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use action::ZoneAction;
pub use codec::{FrameStream, Inbound, RNetCodec};
pub use command::{CommandTemplate, ZoneCommand, checksum};
pub use config::SessionConfig;
pub use dispatch::{
    Dispatcher, EventBus, ListenerId, QUEUE_CAPACITY, SessionEvent, SessionListener,
};
pub use error::{LinkError, RNetError, Result};
pub use frame::{Frame, HexBytes, START_OF_MESSAGE, TERMINATOR};
pub use network::Session;
pub use parser::{FrameParser, ParserSet};
pub use state::SessionPhase;
pub use task::TaskSlot;
pub use zone::{ChannelState, ChannelStateUpdate, ZoneId, ZoneStateUpdate, channel};
