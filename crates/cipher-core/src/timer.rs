//! Cancellable delayed and periodic tasks.
//!
//! Built on `tokio::time`, so tests can run them against paused virtual
//! time. Dropping a [`TimerHandle`] cancels its task; a cancelled timer
//! never fires again, although a callback that already started is allowed
//! to finish (it receives the token to check after its own await points).

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Run `callback` once after `delay` unless cancelled first.
pub fn spawn_after<F, Fut>(delay: Duration, callback: F) -> TimerHandle
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    let child = token.clone();
    let task = tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = child.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                if !child.is_cancelled() {
                    callback(child).await;
                }
            }
        }
    });
    TimerHandle { token, task }
}

/// Run `callback` every `period` (first run after one period) until
/// cancelled.
///
/// A zero period would spin; the returned handle is already cancelled and
/// the callback never runs.
pub fn spawn_every<F, Fut>(period: Duration, mut callback: F) -> TimerHandle
where
    F: FnMut(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = CancellationToken::new();
    if period.is_zero() {
        log::warn!("Refusing to start a periodic task with a zero period");
        token.cancel();
        return TimerHandle {
            token,
            task: tokio::spawn(async {}),
        };
    }
    let child = token.clone();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = child.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }
            if child.is_cancelled() {
                break;
            }
            callback(child.clone()).await;
        }
    });
    TimerHandle { token, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn delayed_task_fires_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _timer = spawn_after(Duration::from_millis(1500), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_fires() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let timer = spawn_after(Duration::from_secs(1), move |_| async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_never_fires() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let timer = spawn_every(Duration::ZERO, move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(timer.is_cancelled());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_task_stops_on_drop() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let timer = spawn_every(Duration::from_secs(10), move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        drop(timer);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
