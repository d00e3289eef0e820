use embassy_time::{Duration, Instant, Timer};

/// Time source for the tracker cycle, swapped out in tests for virtual time.
pub trait Clock {
    fn now(&self) -> Instant;

    async fn sleep(&mut self, duration: Duration);
}

/// Clock backed by the embassy time driver.
#[derive(Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&mut self, duration: Duration) {
        Timer::after(duration).await;
    }
}
