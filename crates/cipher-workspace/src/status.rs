//! Transient user-visible status line and the busy flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use cipher_core::timer::{self, TimerHandle};
use cipher_core::{EventBus, StudioEvent};

#[derive(Default)]
struct StatusState {
    message: Option<String>,
    generation: u64,
    timer: Option<TimerHandle>,
}

struct StatusInner {
    events: EventBus,
    clear_after: Duration,
    state: Mutex<StatusState>,
    busy: AtomicBool,
}

/// A message that clears itself after `clear_after`. Setting a newer
/// message restarts the countdown; an older countdown never clears it.
#[derive(Clone)]
pub struct StatusLine {
    inner: Arc<StatusInner>,
}

impl StatusLine {
    pub fn new(events: EventBus, clear_after: Duration) -> Self {
        Self {
            inner: Arc::new(StatusInner {
                events,
                clear_after,
                state: Mutex::new(StatusState::default()),
                busy: AtomicBool::new(false),
            }),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.state().message.clone()
    }

    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        {
            let mut state = self.state();
            state.generation += 1;
            state.message = Some(message.clone());
            let generation = state.generation;

            let weak = Arc::downgrade(&self.inner);
            state.timer = Some(timer::spawn_after(self.inner.clear_after, move |_| async move {
                clear_if_current(weak, generation);
            }));
        }
        self.inner.events.emit(StudioEvent::StatusChanged {
            message: Some(message),
        });
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::SeqCst)
    }

    /// Raise the busy flag until the guard is dropped.
    pub fn busy(&self) -> BusyGuard {
        self.set_busy(true);
        BusyGuard {
            status: self.clone(),
        }
    }

    pub fn shutdown(&self) {
        if let Some(timer) = self.state().timer.take() {
            timer.cancel();
        }
    }

    fn set_busy(&self, busy: bool) {
        if self.inner.busy.swap(busy, Ordering::SeqCst) != busy {
            self.inner.events.emit(StudioEvent::BusyChanged { busy });
        }
    }

    fn state(&self) -> MutexGuard<'_, StatusState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn clear_if_current(weak: Weak<StatusInner>, generation: u64) {
    let Some(inner) = weak.upgrade() else {
        return;
    };
    {
        let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation != generation {
            return;
        }
        state.message = None;
    }
    inner.events.emit(StudioEvent::StatusChanged { message: None });
}

pub struct BusyGuard {
    status: StatusLine,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.status.set_busy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn message_clears_after_delay() {
        let status = StatusLine::new(EventBus::default(), Duration::from_secs(3));
        status.set("Saved");
        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(status.current().as_deref(), Some("Saved"));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(status.current(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn older_timer_never_clears_newer_message() {
        let status = StatusLine::new(EventBus::default(), Duration::from_secs(3));
        status.set("first");
        tokio::time::sleep(Duration::from_secs(2)).await;
        status.set("second");
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(status.current().as_deref(), Some("second"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(status.current(), None);
    }

    #[tokio::test]
    async fn busy_guard_emits_both_transitions() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let status = StatusLine::new(events, Duration::from_secs(3));
        {
            let _busy = status.busy();
            assert!(status.is_busy());
        }
        assert!(!status.is_busy());
        assert_eq!(rx.recv().await.unwrap(), StudioEvent::BusyChanged { busy: true });
        assert_eq!(rx.recv().await.unwrap(), StudioEvent::BusyChanged { busy: false });
    }
}
