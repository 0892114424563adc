//! Embassy-backed [`Timebase`].

use embassy_time::{Instant, Timer};
use waterbot::time::Timebase;

#[derive(Clone, Copy, Default)]
pub struct EmbassyClock;

impl Timebase for EmbassyClock {
    fn now_ms(&self) -> u64 {
        Instant::now().as_millis()
    }

    async fn sleep_ms(&self, ms: u64) {
        Timer::after_millis(ms).await
    }
}
