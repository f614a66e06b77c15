//! Monitor service core logic.
//!
//! Owns the RNet session, logs what the bus reports, and keeps running
//! until stopped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{error, info, warn};

use rnet_core::{LinkError, RNetError, Session, SessionListener, ZoneAction, ZoneId, ZoneStateUpdate};

use crate::config::MonitorConfig;

/// How long to wait for the first connection before giving up on the
/// one-shot action.
const ACTION_CONNECT_WAIT: Duration = Duration::from_secs(30);

// ── LogListener ──────────────────────────────────────────────────

/// Logs every update and connection error.
#[derive(Debug, Default)]
pub struct LogListener;

impl SessionListener for LogListener {
    fn on_update(&self, update: &ZoneStateUpdate) {
        let channels: Vec<String> = update
            .updates()
            .iter()
            .map(|u| format!("{}={}", u.channel(), u.state()))
            .collect();
        info!(zone = %update.zone(), "{}", channels.join(" "));
    }

    fn on_error(&self, error: &LinkError) {
        warn!("connection error: {error}");
    }
}

// ── MonitorService ───────────────────────────────────────────────

pub struct MonitorService {
    config: MonitorConfig,
    action: Option<(ZoneId, ZoneAction)>,
    running: Arc<AtomicBool>,
}

impl MonitorService {
    /// Create a new monitor with the given config.
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            action: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send `action` to `zone` once the first connection is up.
    pub fn with_action(mut self, zone: ZoneId, action: ZoneAction) -> Self {
        self.action = Some((zone, action));
        self
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until stopped.
    ///
    /// A failed first connect is not fatal: the session keeps retrying
    /// in the background.
    pub async fn run(&self) -> Result<(), RNetError> {
        self.running.store(true, Ordering::SeqCst);

        let session = Session::new(self.config.session.clone())?;
        session.subscribe(Arc::new(LogListener));

        if let Err(e) = session.connect().await {
            warn!("initial connect failed: {e}; retrying in the background");
        }

        if let Some((zone, action)) = self.action {
            tokio::select! {
                sent = Self::send_when_connected(&session, zone, action) => {
                    if let Err(e) = sent {
                        error!(%zone, %action, "action failed: {e}");
                    }
                }
                _ = Self::wait_for_stop(&self.running) => {}
            }
        }

        Self::wait_for_stop(&self.running).await;
        session.disconnect();
        self.running.store(false, Ordering::SeqCst);
        info!("RNet monitor stopped");
        Ok(())
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn send_when_connected(
        session: &Session,
        zone: ZoneId,
        action: ZoneAction,
    ) -> Result<(), RNetError> {
        let deadline = tokio::time::Instant::now() + ACTION_CONNECT_WAIT;
        while !session.is_connected() {
            if tokio::time::Instant::now() >= deadline {
                return Err(RNetError::Timeout(ACTION_CONNECT_WAIT));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        session.send_action(zone, action).await?;
        info!(%zone, %action, "action sent");
        Ok(())
    }

    /// Async helper: resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_creates_with_defaults() {
        let svc = MonitorService::new(MonitorConfig::default());
        assert!(!svc.is_running());
        assert!(svc.action.is_none());
    }

    #[test]
    fn stop_handle_works() {
        let svc = MonitorService::new(MonitorConfig::default());
        let handle = svc.stop_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(svc.is_running());
        svc.stop();
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn invalid_session_config_fails_fast() {
        let mut config = MonitorConfig::default();
        config.session.host.clear();
        let svc = MonitorService::new(config);
        assert!(matches!(svc.run().await, Err(RNetError::Config(_))));
    }

    #[tokio::test]
    async fn sends_action_once_connected() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut config = MonitorConfig::default();
        config.session.port = port;
        config.session.ping_interval_secs = 0;

        let zone = ZoneId::new(1, 2).unwrap();
        let svc = MonitorService::new(config).with_action(zone, ZoneAction::Power(true));
        let stop = svc.stop_handle();
        let run = tokio::spawn(async move { svc.run().await });

        let (mut server, _) = listener.accept().await.unwrap();
        let expected = ZoneAction::Power(true).encode(zone).unwrap();
        let mut received = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(5), server.read_exact(&mut received))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, expected.as_bytes());

        stop.store(false, Ordering::SeqCst);
        run.await.unwrap().unwrap();
    }
}
