use crate::actor::WeakSessionHandle;
use crate::session::time::{Clock, RealClock};
use tokio::time::{Duration, Instant};

/// KeepAliveTimerHandle drives the session's keep-alive cadence. A background
/// task posts tick events to the session loop; the session turns each tick
/// into a keep-alive request. Dropping the handle stops the task.
///
/// We use flume instead of tokio for the wake queue because the task needs a
/// non-blocking try_recv to distinguish "rescheduled" from "interval elapsed".
pub(crate) struct KeepAliveTimerHandle<C: Clock = RealClock> {
    wake_queue: flume::Sender<Instant>,
    interval: Duration,
    clock: C,
}

impl KeepAliveTimerHandle {
    pub fn spawn_background_task(interval: Duration, handle: WeakSessionHandle) -> Self {
        Self::spawn_background_task_with_clock(interval, handle, RealClock)
    }
}

impl<C: Clock + Send + Sync + 'static> KeepAliveTimerHandle<C> {
    // For tests
    fn spawn_background_task_with_clock(interval: Duration, handle: WeakSessionHandle, clock: C) -> Self {
        let (tx, rx) = flume::unbounded();

        let timer = KeepAliveTimerHandle {
            wake_queue: tx,
            interval,
            clock: clock.clone(),
        };

        tokio::task::spawn(Self::keep_alive_timer_task(rx, interval, handle, clock));

        timer
    }

    /// Pushes the next tick out a full interval, e.g. after a keep-alive
    /// round trip succeeded.
    pub fn reset(&self) {
        // Disconnected means the task already exited; nothing left to pace.
        let _ = self.wake_queue.try_send(self.clock.now() + self.interval);
    }

    async fn keep_alive_timer_task(
        queue: flume::Receiver<Instant>,
        interval: Duration,
        handle: WeakSessionHandle,
        mut clock: C,
    ) {
        // Notice: the queue starts empty, so the first iteration fires a tick
        // immediately. That is deliberate: a freshly opened session sends its
        // first keep-alive right away to confirm the lease and pick up the
        // current membership view.
        loop {
            match queue.try_recv() {
                Ok(wake_time) => {
                    // The session rescheduled us; sleep until then.
                    clock.sleep_until(wake_time).await;
                }
                Err(flume::TryRecvError::Empty) => {
                    if !handle.notify_keep_alive_tick() {
                        // Session loop is gone; stop pacing.
                        return;
                    }
                    let next = clock.now() + interval;
                    clock.sleep_until(next).await;
                }
                Err(flume::TryRecvError::Disconnected) => {
                    // Handle dropped: the session no longer wants keep-alives.
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Event, SessionHandle};
    use crate::session::time::mock::mocked_clock;
    use tokio::sync::mpsc;

    struct TestUtilTicks {
        receiver: mpsc::UnboundedReceiver<Event>,
    }

    impl TestUtilTicks {
        async fn assert_tick(&mut self) {
            match self.receiver.recv().await {
                Some(Event::KeepAliveTick) => {}
                other => panic!("Expected KeepAliveTick, got {:?}", other),
            }
        }

        async fn assert_no_tick(&mut self) {
            tokio::time::timeout(Duration::from_millis(10), self.receiver.recv())
                .await
                .expect_err("Expected no tick");
        }

        async fn assert_closed(&mut self) {
            if let Some(event) = self.receiver.recv().await {
                panic!("Expected closed channel, got {:?}", event);
            }
        }
    }

    #[tokio::test]
    async fn ticks_fire_at_each_interval() {
        // -- setup --
        let interval = Duration::from_millis(100);
        let (handle, receiver) = SessionHandle::new();
        let mut ticks = TestUtilTicks { receiver };
        let (mock_clock, mut controller) = mocked_clock();

        // -- execute & verify --

        // 1. First tick fires immediately.
        let timer =
            KeepAliveTimerHandle::spawn_background_task_with_clock(interval, handle.weak(), mock_clock);
        ticks.assert_tick().await;
        ticks.assert_no_tick().await;

        // 2. Each elapsed interval produces one tick.
        for _ in 0..3 {
            controller.advance(interval);
            ticks.assert_tick().await;
            ticks.assert_no_tick().await;
        }

        drop(timer);
    }

    #[tokio::test]
    async fn reset_defers_the_next_tick() {
        // -- setup --
        let interval = Duration::from_millis(100);
        let (handle, receiver) = SessionHandle::new();
        let mut ticks = TestUtilTicks { receiver };
        let (mock_clock, mut controller) = mocked_clock();

        let timer =
            KeepAliveTimerHandle::spawn_background_task_with_clock(interval, handle.weak(), mock_clock);
        ticks.assert_tick().await;

        // -- execute & verify --

        // Repeatedly resetting before the interval elapses suppresses ticks.
        for _ in 0..4 {
            controller.advance(interval / 2);
            timer.reset();
        }
        ticks.assert_no_tick().await;

        // Once a full interval passes without a reset, the tick arrives.
        controller.advance(interval / 2);
        ticks.assert_no_tick().await;
        controller.advance(interval / 2);
        ticks.assert_tick().await;
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_task() {
        // -- setup --
        let interval = Duration::from_millis(100);
        let (handle, receiver) = SessionHandle::new();
        let mut ticks = TestUtilTicks { receiver };
        let (mock_clock, mut controller) = mocked_clock();

        let timer =
            KeepAliveTimerHandle::spawn_background_task_with_clock(interval, handle.weak(), mock_clock);
        ticks.assert_tick().await;

        // -- execute & verify --
        drop(timer);
        drop(handle);
        controller.advance(interval * 2);
        ticks.assert_closed().await;
    }
}
