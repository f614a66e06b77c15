//! Owned handles for the session's background tasks.
//!
//! A [`TaskSlot`] holds at most one spawned task. The retry and ping
//! schedulers each get their own slot, so each has its own lock.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::trace;

pub type Task = JoinHandle<()>;

#[derive(Debug)]
pub struct TaskSlot {
    name: &'static str,
    handle: Mutex<Option<Task>>,
}

impl TaskSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    // A panic while holding the lock leaves the slot in a usable state.
    fn lock(&self) -> MutexGuard<'_, Option<Task>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawns `fut` unless a task is already pending. Returns whether it
    /// was spawned.
    pub fn spawn_if_idle<F>(&self, fut: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            trace!(task = self.name, "already pending");
            return false;
        }
        *slot = Some(tokio::spawn(fut));
        true
    }

    /// Spawns `fut`, aborting whatever task held the slot before.
    pub fn replace<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let previous = self.lock().replace(tokio::spawn(fut));
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Aborts the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                if pending {
                    trace!(task = self.name, "cancelled");
                }
                pending
            }
            None => false,
        }
    }

    /// Empties the slot without aborting. Called by the task itself once
    /// it no longer counts as pending.
    pub fn clear(&self) {
        self.lock().take();
    }

    pub fn is_pending(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn only_one_task_pending_at_a_time() {
        let slot = TaskSlot::new("retry");
        assert!(slot.spawn_if_idle(tokio::time::sleep(Duration::from_secs(60))));
        assert!(!slot.spawn_if_idle(async {}));
        assert!(slot.is_pending());

        assert!(slot.cancel());
        assert!(!slot.is_pending());
        assert!(slot.spawn_if_idle(async {}));
    }

    #[tokio::test]
    async fn finished_task_frees_the_slot() {
        let slot = TaskSlot::new("ping");
        slot.spawn_if_idle(async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!slot.is_pending());
        assert!(slot.spawn_if_idle(async {}));
    }

    #[tokio::test]
    async fn replace_aborts_previous() {
        let slot = TaskSlot::new("ping");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        slot.replace(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let _ = tx.send(());
        });
        slot.replace(async {});
        // The first task was aborted, so its sender is dropped unsent.
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn clear_forgets_without_aborting() {
        let slot = TaskSlot::new("retry");
        let (tx, rx) = tokio::sync::oneshot::channel();
        slot.spawn_if_idle(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(7);
        });
        slot.clear();
        assert!(!slot.is_pending());
        assert!(!slot.cancel());
        assert_eq!(rx.await.unwrap(), 7);
    }
}
