//! Domain-specific error types for the RNet engine.
//!
//! All fallible operations return `Result<T, RNetError>`.
//! Malformed input never panics; unrecognized frames are not errors at all.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RNetError>;

/// The canonical error type for the RNet engine.
#[derive(Debug, Error)]
pub enum RNetError {
    // ── Addressing / Values ──────────────────────────────────────
    /// A controller or zone index fell outside `1..=6`.
    #[error("invalid zone id: controller {controller}, zone {zone} (both must be 1..=6)")]
    InvalidZone { controller: u8, zone: u8 },

    /// A domain value could not be mapped onto its wire byte.
    #[error("{what} out of range: {value} (expected {min}..={max})")]
    ValueOutOfRange {
        what: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    /// A byte sequence could not be treated as a frame.
    #[error("malformed frame: {0}")]
    MalformedFrame(&'static str),

    /// A textual zone id or action could not be parsed.
    #[error("cannot parse {what}: {input:?}")]
    Parse { what: &'static str, input: String },

    // ── Session Errors ───────────────────────────────────────────
    /// A command was issued while the session is not connected.
    #[error("cannot send message - disconnected")]
    NotConnected,

    /// The session state machine refused a transition.
    #[error("invalid session transition: {0}")]
    InvalidTransition(&'static str),

    /// The TCP connect did not complete in time.
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),

    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] io::Error),

    // ── Configuration ────────────────────────────────────────────
    /// Session configuration failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),
}

// ── LinkError ────────────────────────────────────────────────────

/// Terminal error of one connection, delivered to every listener.
///
/// Unlike [`RNetError`] this is cheap to clone, since the same failure is
/// fanned out to each registered listener.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct LinkError {
    kind: Option<io::ErrorKind>,
    message: String,
}

impl LinkError {
    /// The remote end closed the stream (read returned end-of-stream).
    pub fn closed() -> Self {
        Self {
            kind: Some(io::ErrorKind::UnexpectedEof),
            message: "server closed connection".into(),
        }
    }

    /// The I/O error kind behind this failure, if there was one.
    pub fn kind(&self) -> Option<io::ErrorKind> {
        self.kind
    }

    /// Whether the failure was an orderly close by the remote end.
    pub fn is_remote_closed(&self) -> bool {
        self.kind == Some(io::ErrorKind::UnexpectedEof)
    }
}

impl From<&io::Error> for LinkError {
    fn from(e: &io::Error) -> Self {
        Self {
            kind: Some(e.kind()),
            message: e.to_string(),
        }
    }
}

impl From<&RNetError> for LinkError {
    fn from(e: &RNetError) -> Self {
        match e {
            RNetError::Connection(io) => Self::from(io),
            other => Self {
                kind: None,
                message: other.to_string(),
            },
        }
    }
}
