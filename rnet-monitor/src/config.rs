//! Configuration for the RNet monitor.

use std::path::Path;

use serde::{Deserialize, Serialize};

use rnet_core::SessionConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Bridge address, retry and polling settings.
    pub session: SessionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive, e.g. "info" or "rnet_core=debug".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl MonitorConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn default_toml() -> std::io::Result<String> {
        toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = MonitorConfig::default_toml().unwrap();
        assert!(text.contains("[session]"));
        assert!(text.contains("retry_interval_secs"));
        assert!(text.contains("[logging]"));
    }

    #[test]
    fn roundtrip_config() {
        let text = MonitorConfig::default_toml().unwrap();
        let parsed: MonitorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.session, SessionConfig::default());
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let parsed: MonitorConfig =
            toml::from_str("[session]\nhost = \"192.168.1.50\"\ncontrollers = 2\n").unwrap();
        assert_eq!(parsed.session.host, "192.168.1.50");
        assert_eq!(parsed.session.controllers, 2);
        assert_eq!(parsed.session.port, 7777);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = MonitorConfig::load(Path::new("/nonexistent/rnet-monitor.toml"));
        assert_eq!(cfg.session, SessionConfig::default());
    }
}
