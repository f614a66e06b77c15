//! Delivery of decoded frames to listeners.
//!
//! The reader task pushes [`Inbound`] items onto a bounded queue; one
//! [`Dispatcher`] task drains it, runs frames through the [`ParserSet`]
//! and fans the results out over the [`EventBus`].
//!
//! While no listener is registered the dispatcher leaves the queue alone,
//! so frames that arrive before the first `subscribe` are not lost. Once
//! the queue fills the reader stops reading.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::codec::Inbound;
use crate::error::LinkError;
use crate::parser::ParserSet;
use crate::zone::ZoneStateUpdate;

/// Capacity of the reader → dispatcher queue.
pub const QUEUE_CAPACITY: usize = 50;

/// How long one queue poll waits before re-checking for cancellation.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Re-check interval while waiting for the first listener.
const IDLE_RECHECK: Duration = Duration::from_millis(250);

// ── Listener ─────────────────────────────────────────────────────

/// Receives decoded updates and the terminal connection error.
///
/// Callbacks run on the dispatcher task, one listener after another, so a
/// slow listener delays the ones registered after it.
pub trait SessionListener: Send + Sync {
    fn on_update(&self, update: &ZoneStateUpdate);

    /// Called once per connection, after which no more updates arrive from
    /// that connection.
    fn on_error(&self, error: &LinkError);
}

/// Event form of the listener callbacks, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Update(ZoneStateUpdate),
    Error(LinkError),
}

impl SessionListener for mpsc::UnboundedSender<SessionEvent> {
    fn on_update(&self, update: &ZoneStateUpdate) {
        let _ = self.send(SessionEvent::Update(update.clone()));
    }

    fn on_error(&self, error: &LinkError) {
        let _ = self.send(SessionEvent::Error(error.clone()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ── EventBus ─────────────────────────────────────────────────────

type Entry = (ListenerId, Arc<dyn SessionListener>);

/// Registered listeners, in registration order.
///
/// Publishing iterates over a snapshot, so listeners may subscribe or
/// unsubscribe from inside a callback.
pub struct EventBus {
    listeners: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    subscribed: Notify,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            subscribed: Notify::new(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Entry>> {
        self.listeners.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Entry>> {
        self.listeners.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn subscribe(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().push((id, listener));
        debug!(%id, "listener subscribed");
        self.subscribed.notify_waiters();
        id
    }

    /// Returns whether `id` was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        let removed = listeners.len() != before;
        if removed {
            debug!(%id, "listener unsubscribed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<dyn SessionListener>> {
        self.read().iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    /// Resolves once at least one listener is registered.
    pub async fn wait_for_listener(&self) {
        loop {
            let notified = self.subscribed.notified();
            tokio::pin!(notified);
            // Register interest before checking, so a concurrent subscribe
            // cannot slip between the check and the wait.
            notified.as_mut().enable();
            if !self.is_empty() {
                return;
            }
            let _ = tokio::time::timeout(IDLE_RECHECK, notified).await;
        }
    }

    pub fn publish_update(&self, update: &ZoneStateUpdate) {
        for listener in self.snapshot() {
            listener.on_update(update);
        }
    }

    pub fn publish_error(&self, error: &LinkError) {
        for listener in self.snapshot() {
            listener.on_error(error);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

// ── Dispatcher ───────────────────────────────────────────────────

pub struct Dispatcher {
    bus: Arc<EventBus>,
    parsers: ParserSet,
    queue: mpsc::Receiver<Inbound>,
}

impl Dispatcher {
    pub fn new(bus: Arc<EventBus>, parsers: ParserSet, queue: mpsc::Receiver<Inbound>) -> Self {
        Self {
            bus,
            parsers,
            queue,
        }
    }

    /// Runs until a terminal error has been delivered, the queue closes, or
    /// `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        // Taken off the queue while the last listener was leaving.
        let mut held: Option<Inbound> = None;
        loop {
            if self.bus.is_empty() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.bus.wait_for_listener() => continue,
                }
            }

            let item = match held.take() {
                Some(item) => item,
                None => {
                    let polled = tokio::select! {
                        _ = cancel.cancelled() => break,
                        polled = tokio::time::timeout(POLL_TIMEOUT, self.queue.recv()) => polled,
                    };
                    match polled {
                        Err(_) => continue,
                        Ok(None) => {
                            debug!("dispatch queue closed");
                            break;
                        }
                        Ok(Some(item)) => item,
                    }
                }
            };

            if self.bus.is_empty() {
                trace!("listeners left during poll, holding item");
                held = Some(item);
                continue;
            }

            match item {
                Inbound::Frame(frame) => {
                    if let Some(update) = self.parsers.decode(&frame) {
                        trace!(zone = %update.zone(), channels = update.updates().len(), "publishing update");
                        self.bus.publish_update(&update);
                    }
                }
                Inbound::Failed(error) => {
                    warn!(%error, "connection lost");
                    self.bus.publish_error(&error);
                    break;
                }
            }
        }
        debug!("dispatcher stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────
