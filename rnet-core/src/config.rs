//! Session settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RNetError, Result};
use crate::zone::{MAX_CONTROLLERS, MAX_ZONES, ZoneId};

/// Where to connect and how to keep the connection alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Host name or address of the RNet serial-to-IP bridge.
    pub host: String,
    pub port: u16,
    /// Delay between reconnect attempts, in seconds.
    pub retry_interval_secs: u64,
    /// TCP connect timeout, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Zone-info poll interval, in seconds (0 = no polling).
    pub ping_interval_secs: u64,
    /// Number of controllers on the bus.
    pub controllers: u8,
    /// Zones on each controller.
    pub zones_per_controller: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7777,
            retry_interval_secs: 10,
            connect_timeout_ms: 2000,
            ping_interval_secs: 30,
            controllers: 1,
            zones_per_controller: 6,
        }
    }
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_retry_interval(mut self, secs: u64) -> Self {
        self.retry_interval_secs = secs;
        self
    }

    pub fn with_ping_interval(mut self, secs: u64) -> Self {
        self.ping_interval_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(RNetError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(RNetError::Config("port must be at least 1".into()));
        }
        if !(1..=MAX_CONTROLLERS).contains(&self.controllers) {
            return Err(RNetError::Config(format!(
                "controllers must be in 1..={MAX_CONTROLLERS}, got {}",
                self.controllers
            )));
        }
        if !(1..=MAX_ZONES).contains(&self.zones_per_controller) {
            return Err(RNetError::Config(format!(
                "zones_per_controller must be in 1..={MAX_ZONES}, got {}",
                self.zones_per_controller
            )));
        }
        Ok(())
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `None` when polling is disabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    /// Every configured zone, controller-major.
    pub fn zones(&self) -> Vec<ZoneId> {
        let controllers = self.controllers.min(MAX_CONTROLLERS);
        let zones = self.zones_per_controller.min(MAX_ZONES);
        (1..=controllers)
            .flat_map(|c| (1..=zones).filter_map(move |z| ZoneId::new(c, z).ok()))
            .collect()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Tests ────────────────────────────────────────────────────────
