//! Restartable debounce timer.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::{PushOutcome, PushTrigger};

pub type DebounceFuture = Pin<Box<dyn Future<Output = PushOutcome> + Send>>;

/// Work run when the timer expires or is fired early.
pub type DebounceAction = Arc<dyn Fn(PushTrigger) -> DebounceFuture + Send + Sync>;

#[derive(Default)]
struct Pending {
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Single-slot debounce: each `arm` restarts the delay.
///
/// Only the sleeping part of a timer is ever aborted. Once the delay has
/// elapsed the action runs to completion even if the scheduler is re-armed.
pub struct DebounceScheduler {
    delay: Duration,
    action: DebounceAction,
    pending: Arc<Mutex<Pending>>,
}

impl DebounceScheduler {
    pub fn new(delay: Duration, action: DebounceAction) -> Self {
        Self {
            delay,
            action,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Start (or restart) the countdown. Must be called inside a Tokio runtime.
    pub fn arm(&self) {
        let mut pending = lock(&self.pending);
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }
        pending.generation = pending.generation.wrapping_add(1);

        let generation = pending.generation;
        let slot = Arc::clone(&self.pending);
        let action = Arc::clone(&self.action);
        let delay = self.delay;
        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = lock(&slot);
                if pending.generation != generation {
                    return;
                }
                pending.timer = None;
            }
            action(PushTrigger::Debounce).await;
        }));
    }

    /// Drop the pending countdown, if any. Returns whether one was armed.
    pub fn cancel(&self) -> bool {
        let mut pending = lock(&self.pending);
        pending.generation = pending.generation.wrapping_add(1);
        pending.timer.take().is_some_and(|timer| {
            timer.abort();
            true
        })
    }

    /// Cancel the countdown and run the action right away.
    pub async fn fire_now(&self, trigger: PushTrigger) -> PushOutcome {
        self.cancel();
        (self.action)(trigger).await
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.pending).timer.is_some()
    }
}

impl Drop for DebounceScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for DebounceScheduler {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DebounceScheduler")
            .field("delay", &self.delay)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

fn lock(pending: &Mutex<Pending>) -> MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}
