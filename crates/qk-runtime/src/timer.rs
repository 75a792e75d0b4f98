//! Periodic runner callbacks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{Instrument, Span};

use crate::engine::TimerFn;

#[derive(Default)]
struct Inner {
    handles: Vec<JoinHandle<()>>,
    closed: bool,
}

/// Timer tasks owned by one engine. Closing aborts them all and refuses new
/// ones.
#[derive(Default)]
pub(crate) struct TimerSet {
    inner: Mutex<Inner>,
}

impl TimerSet {
    /// Spawn a task calling `timer` every `period`, first after one full
    /// period, skipping calls while `running` is false. Returns `false` once
    /// the set is closed.
    pub fn spawn(
        &self,
        runtime: &Handle,
        period: Duration,
        timer: TimerFn,
        running: Arc<AtomicBool>,
        span: Span,
    ) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed {
            return false;
        }
        let task = async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if running.load(Ordering::SeqCst) {
                    timer();
                }
            }
        };
        inner.handles.retain(|h| !h.is_finished());
        inner.handles.push(runtime.spawn(task.instrument(span)));
        true
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        for handle in inner.handles.drain(..) {
            handle.abort();
        }
    }

    /// Timers still alive.
    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .handles
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_timer(hits: &Arc<AtomicUsize>) -> TimerFn {
        let hits = hits.clone();
        Box::new(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fires_only_while_running() {
        let set = TimerSet::default();
        let running = Arc::new(AtomicBool::new(false));
        let hits = Arc::new(AtomicUsize::new(0));

        assert!(set.spawn(
            &Handle::current(),
            Duration::from_millis(50),
            counter_timer(&hits),
            running.clone(),
            Span::none(),
        ));

        time::sleep(Duration::from_millis(180)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0, "paused timers must not fire");

        running.store(true, Ordering::SeqCst);
        time::sleep(Duration::from_millis(250)).await;
        assert!(hits.load(Ordering::SeqCst) >= 2);
        assert_eq!(set.active(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn close_aborts_and_refuses_new_timers() {
        let set = TimerSet::default();
        let running = Arc::new(AtomicBool::new(true));
        let hits = Arc::new(AtomicUsize::new(0));

        set.spawn(
            &Handle::current(),
            Duration::from_millis(30),
            counter_timer(&hits),
            running.clone(),
            Span::none(),
        );
        set.close();
        time::sleep(Duration::from_millis(120)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(set.active(), 0);

        assert!(!set.spawn(
            &Handle::current(),
            Duration::from_millis(30),
            counter_timer(&hits),
            running,
            Span::none(),
        ));
    }
}
