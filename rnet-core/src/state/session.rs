//! Session lifecycle state machine.
//!
//! `SessionPhase` models the life of one RNet session, with validated
//! transitions that return `Result` instead of panicking.

use std::time::{Duration, Instant};

use crate::error::{RNetError, Result};

// ── SessionPhase ─────────────────────────────────────────────────

/// The current phase of an RNet session.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲                │              │
///       └────────────────┴──────────────┘
///          (failure, I/O error, disconnect)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No socket. Initial state, and where every failure lands.
    #[default]
    Disconnected,

    /// TCP connect in flight.
    Connecting,

    /// Socket up, reader and dispatcher running.
    Connected {
        /// When the session entered the `Connected` state.
        since: Instant,
    },
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
        }
    }
}

impl SessionPhase {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the session has been connected. `None` for other phases.
    pub fn connected_duration(&self) -> Option<Duration> {
        match self {
            Self::Connected { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<()> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(RNetError::InvalidTransition(
                "cannot connect: not in Disconnected state",
            )),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self) -> Result<()> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(RNetError::InvalidTransition(
                "cannot complete connect: not in Connecting state",
            )),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    ///
    /// Returns the phase that was left.
    pub fn force_disconnect(&mut self) -> SessionPhase {
        std::mem::take(self)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = SessionPhase::Disconnected;

        phase.begin_connect().unwrap();
        assert!(phase.is_connecting());

        phase.complete_connect().unwrap();
        assert!(phase.is_connected());
        assert!(phase.connected_duration().is_some());

        let left = phase.force_disconnect();
        assert!(left.is_connected());
        assert!(phase.is_disconnected());
    }

    #[test]
    fn connect_only_from_disconnected() {
        let mut phase = SessionPhase::Connecting;
        assert!(matches!(
            phase.begin_connect(),
            Err(RNetError::InvalidTransition(_))
        ));

        let mut phase = SessionPhase::Connected {
            since: Instant::now(),
        };
        assert!(phase.begin_connect().is_err());
    }

    #[test]
    fn complete_requires_connecting() {
        let mut phase = SessionPhase::Disconnected;
        assert!(phase.complete_connect().is_err());
        assert!(phase.is_disconnected());
    }

    #[test]
    fn failed_connect_returns_to_disconnected() {
        let mut phase = SessionPhase::Disconnected;
        phase.begin_connect().unwrap();
        phase.force_disconnect();
        assert!(phase.is_disconnected());
        assert!(phase.connected_duration().is_none());
    }

    #[test]
    fn display_format() {
        assert_eq!(SessionPhase::Disconnected.to_string(), "Disconnected");
        assert_eq!(SessionPhase::Connecting.to_string(), "Connecting");
        assert_eq!(
            SessionPhase::Connected {
                since: Instant::now()
            }
            .to_string(),
            "Connected"
        );
    }

    #[test]
    fn default_phase_is_disconnected() {
        assert!(SessionPhase::default().is_disconnected());
    }
}
