//! The session controller: one TCP link to an RNet bridge, plus the tasks
//! that keep it alive.
//!
//! Per connected session there is a reader task (socket → queue), a
//! dispatcher task (queue → listeners) and, when enabled, a ping task.
//! A failed connect, a read error or a failed send drops the session to
//! `Disconnected` and schedules a single pending reconnect.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::action::ZoneAction;
use crate::codec::{FrameStream, Inbound};
use crate::command::ZoneCommand;
use crate::config::SessionConfig;
use crate::dispatch::{Dispatcher, EventBus, ListenerId, QUEUE_CAPACITY, SessionListener};
use crate::error::{LinkError, RNetError, Result};
use crate::frame::Frame;
use crate::parser::ParserSet;
use crate::state::SessionPhase;
use crate::task::TaskSlot;
use crate::zone::ZoneId;

/// Handle to an RNet session. Clones share the same connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Creates a disconnected session with the standard parsers.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_parsers(config, ParserSet::standard())
    }

    pub fn with_parsers(config: SessionConfig, parsers: ParserSet) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                phase: Mutex::new(SessionPhase::Disconnected),
                link: Mutex::new(None),
                retry: TaskSlot::new("retry"),
                ping: TaskSlot::new("ping"),
                bus: Arc::new(EventBus::new()),
                parsers,
                next_link: AtomicU64::new(1),
            }),
        })
    }

    /// Opens the connection. On failure the error is returned and a
    /// reconnect is scheduled after the configured retry interval.
    pub async fn connect(&self) -> Result<()> {
        self.inner.connect().await
    }

    /// Closes the connection and cancels any pending reconnect or ping.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    pub async fn send_command(&self, command: ZoneCommand, zone: ZoneId, value: u8) -> Result<()> {
        self.inner.send_frame(&command.encode(zone, value)).await
    }

    pub async fn send_action(&self, zone: ZoneId, action: ZoneAction) -> Result<()> {
        let frame = action.encode(zone)?;
        debug!(%zone, %action, "sending action");
        self.inner.send_frame(&frame).await
    }

    /// Writes an already encoded frame.
    pub async fn send_frame(&self, frame: &Frame) -> Result<()> {
        self.inner.send_frame(frame).await
    }

    pub fn subscribe(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        self.inner.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.phase_now()
    }

    pub fn is_connected(&self) -> bool {
        self.phase().is_connected()
    }

    pub fn has_pending_retry(&self) -> bool {
        self.inner.retry.is_pending()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.inner.config.address())
            .field("phase", &self.phase())
            .field("listeners", &self.inner.bus.len())
            .finish()
    }
}

// ── Link ─────────────────────────────────────────────────────────

/// Everything owned by one TCP connection.
struct Link {
    id: u64,
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl Link {
    fn close(self) {
        self.cancel.cancel();
        self.reader.abort();
        self.dispatcher.abort();
        debug!(link = self.id, "link closed");
    }
}

// ── SessionInner ─────────────────────────────────────────────────

struct SessionInner {
    config: SessionConfig,
    phase: Mutex<SessionPhase>,
    link: Mutex<Option<Link>>,
    retry: TaskSlot,
    ping: TaskSlot,
    bus: Arc<EventBus>,
    parsers: ParserSet,
    next_link: AtomicU64,
}

impl SessionInner {
    fn phase(&self) -> MutexGuard<'_, SessionPhase> {
        self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn phase_now(&self) -> SessionPhase {
        *self.phase()
    }

    fn link_slot(&self) -> MutexGuard<'_, Option<Link>> {
        self.link.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn close_link(&self) {
        let link = self.link_slot().take();
        if let Some(link) = link {
            link.close();
        }
    }

    async fn connect(self: &Arc<Self>) -> Result<()> {
        {
            let mut phase = self.phase();
            if phase.is_connecting() {
                return Err(RNetError::InvalidTransition("connect already in progress"));
            }
            phase.force_disconnect();
            phase.begin_connect()?;
        }
        self.ping.cancel();
        self.close_link();

        let timeout = self.config.connect_timeout();
        let address = (self.config.host.as_str(), self.config.port);
        info!(host = %self.config.host, port = self.config.port, "connecting");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(self.connect_failed(RNetError::Connection(e))),
            Err(_) => return Err(self.connect_failed(RNetError::Timeout(timeout))),
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("set_nodelay failed: {e}");
        }

        let (read_half, write_half) = stream.into_split();
        let id = self.next_link.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);

        let reader = tokio::spawn(read_loop(
            Arc::downgrade(self),
            id,
            read_half,
            tx,
            cancel.clone(),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&self.bus), self.parsers.clone(), rx);
        let dispatcher = tokio::spawn(dispatcher.run(cancel.clone()));

        let link = Link {
            id,
            writer: Arc::new(tokio::sync::Mutex::new(write_half)),
            cancel,
            reader,
            dispatcher,
        };
        let previous = self.link_slot().replace(link);
        if let Some(previous) = previous {
            previous.close();
        }

        self.finish_connect(id)?;
        info!(host = %self.config.host, port = self.config.port, link = id, "connected");
        self.start_ping();
        Ok(())
    }

    /// Moves `Connecting` to `Connected` if link `id` is still the current
    /// one. A disconnect() while the connect was in flight wins; a link
    /// that died before this point has already scheduled its retry.
    fn finish_connect(&self, id: u64) -> Result<()> {
        let mut phase = self.phase();
        let ours = self.link_slot().as_ref().map(|l| l.id) == Some(id);
        if !ours {
            debug!(link = id, "connect superseded by disconnect");
            return Err(RNetError::InvalidTransition("connect superseded"));
        }
        if phase.is_disconnected() {
            // The failed link stays in the slot so its error is still dispatched.
            debug!(link = id, "link lost while connecting");
            return Err(RNetError::Connection(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "connection lost while connecting",
            )));
        }
        phase.complete_connect()
    }

    /// Drops back to `Disconnected` after a failed attempt and schedules a
    /// retry, unless a disconnect happened meanwhile.
    fn connect_failed(self: &Arc<Self>, err: RNetError) -> RNetError {
        error!(host = %self.config.host, port = self.config.port, "error connecting: {err}");
        let was = self.phase().force_disconnect();
        if was.is_connecting() {
            self.schedule_reconnect();
        }
        err
    }

    /// Single pending-retry slot: a request while one is pending is ignored.
    fn schedule_reconnect(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let delay = self.config.retry_interval();

        let scheduled = self.retry.spawn_if_idle(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.retry.clear();
            if inner.phase_now().is_disconnected() {
                // A failure schedules the next attempt.
                let _ = inner.connect().await;
            }
        });

        if scheduled {
            info!(delay_secs = delay.as_secs(), "will try to reconnect");
        } else {
            debug!("reconnect requested while one is pending, ignoring");
        }
    }

    /// Called by the reader or a failed send. Only the current link can
    /// take the session down.
    fn link_lost(self: &Arc<Self>, link: u64, error: &LinkError) {
        let current = self.link_slot().as_ref().map(|l| l.id) == Some(link);
        if !current {
            trace!(link, "stale link reported failure, ignoring");
            return;
        }
        let was = self.phase().force_disconnect();
        if was.is_disconnected() {
            return;
        }
        // Also reached while still `Connecting`: the reader can see EOF
        // before connect() has completed.
        warn!(link, %error, "connection lost");
        self.ping.cancel();
        self.schedule_reconnect();
    }

    async fn send_frame(self: &Arc<Self>, frame: &Frame) -> Result<()> {
        let (id, writer) = {
            if !self.phase_now().is_connected() {
                return Err(RNetError::NotConnected);
            }
            let slot = self.link_slot();
            match slot.as_ref() {
                Some(link) => (link.id, Arc::clone(&link.writer)),
                None => return Err(RNetError::NotConnected),
            }
        };

        let written = {
            let mut writer = writer.lock().await;
            writer.write_all(frame.as_bytes()).await
        };
        match written {
            Ok(()) => {
                trace!(link = id, frame = %frame.hex(), "sent");
                Ok(())
            }
            Err(e) => {
                self.link_lost(id, &LinkError::from(&e));
                Err(RNetError::Connection(e))
            }
        }
    }

    /// Polls zone info for every configured zone while connected.
    fn start_ping(self: &Arc<Self>) {
        let Some(interval) = self.config.ping_interval() else {
            return;
        };
        let weak = Arc::downgrade(self);
        let zones = self.config.zones();

        self.ping.replace(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if !inner.phase_now().is_connected() {
                    return;
                }
                trace!(zones = zones.len(), "ping");
                for zone in &zones {
                    let frame = ZoneCommand::ZoneInfo.encode(*zone, 0);
                    if let Err(e) = inner.send_frame(&frame).await {
                        debug!(%zone, "ping failed: {e}");
                        return;
                    }
                }
            }
        });
    }

    fn disconnect(&self) {
        self.retry.cancel();
        self.ping.cancel();
        self.close_link();
        let was = self.phase().force_disconnect();
        if !was.is_disconnected() {
            info!(host = %self.config.host, port = self.config.port, "disconnected");
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.disconnect();
    }
}

// ── Reader task ──────────────────────────────────────────────────

/// Frames the socket and feeds the dispatch queue. The terminal error is
/// reported to the session before it is queued, so the reconnect path
/// starts even when nobody is listening.
async fn read_loop(
    session: Weak<SessionInner>,
    link: u64,
    reader: OwnedReadHalf,
    queue: mpsc::Sender<Inbound>,
    cancel: CancellationToken,
) {
    let mut frames = FrameStream::new(reader);
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => break,
            item = frames.next() => item,
        };
        let Some(item) = item else {
            break;
        };

        let terminal = if let Inbound::Failed(error) = &item {
            if let Some(inner) = session.upgrade() {
                inner.link_lost(link, error);
            }
            true
        } else {
            false
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = queue.send(item) => {
                if sent.is_err() {
                    break;
                }
            }
        }
        if terminal {
            break;
        }
    }
    debug!(link, "reader stopped");
}
