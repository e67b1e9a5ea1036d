use tokio::time::Instant;

#[async_trait::async_trait]
pub(crate) trait Clock: Clone {
    fn now(&self) -> Instant;
    async fn sleep_until(&mut self, deadline: Instant);
}

#[derive(Copy, Clone)]
pub(crate) struct RealClock;

#[async_trait::async_trait]
impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Clock;
    use tokio::sync::watch;
    use tokio::time::{Duration, Instant};

    pub fn mocked_clock() -> (MockClock, MockClockController) {
        let now = Instant::now();
        let (tx, rx) = watch::channel(now);
        let clock = MockClock { current_time: rx };
        let controller = MockClockController { current_time: tx };

        (clock, controller)
    }

    #[derive(Clone)]
    pub struct MockClock {
        current_time: watch::Receiver<Instant>,
    }

    #[async_trait::async_trait]
    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.current_time.borrow()
        }

        async fn sleep_until(&mut self, deadline: Instant) {
            loop {
                if *self.current_time.borrow() >= deadline {
                    return;
                }

                self.current_time.changed().await.expect("Controller dropped");
            }
        }
    }

    pub struct MockClockController {
        current_time: watch::Sender<Instant>,
    }

    impl MockClockController {
        /// Advance in increments smaller than whatever granularity the test
        /// observes; a sleeper only promises to wake once `now` has passed
        /// its deadline.
        pub fn advance(&mut self, duration: Duration) {
            let now = *self.current_time.borrow();
            self.current_time.send(now + duration).expect("MockClock dropped");
        }
    }
}
