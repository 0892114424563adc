//! Time source used by the control core.
//!
//! The core never touches a timer driver directly; the firmware plugs in
//! an Embassy-backed implementation and host tests a simulated clock.

use core::future::Future;

use embassy_futures::select::{select, Either};

/// Monotonic time plus coarse sleeping.
#[allow(async_fn_in_trait)]
pub trait Timebase {
    /// Milliseconds since boot.
    fn now_ms(&self) -> u64;

    /// Suspend the calling task for at least `ms` milliseconds.
    async fn sleep_ms(&self, ms: u64);
}

impl<T: Timebase> Timebase for &T {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await
    }
}

/// Run `fut`, giving up after `ms` milliseconds.
///
/// Returns `None` on timeout. `fut` is polled first, so an immediately
/// ready future always wins.
pub async fn within<T, F>(time: &T, ms: u64, fut: F) -> Option<F::Output>
where
    T: Timebase,
    F: Future,
{
    match select(fut, time.sleep_ms(ms)).await {
        Either::First(out) => Some(out),
        Either::Second(()) => None,
    }
}

/// Format seconds since boot as `HH:MM`, wrapping every 100 hours.
pub fn write_clock(out: &mut impl core::fmt::Write, secs: u64) -> core::fmt::Result {
    let mins = secs / 60;
    write!(out, "{:02}:{:02}", (mins / 60) % 100, mins % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimClock;
    use embassy_futures::block_on;

    #[test]
    fn within_returns_ready_output() {
        let clock = SimClock::new();
        let out = block_on(within(&clock, 100, async { 7 }));
        assert_eq!(out, Some(7));
        assert_eq!(clock.now_ms(), 0);
    }

    #[test]
    fn within_times_out_on_pending_future() {
        let clock = SimClock::new();
        let out = block_on(within(&clock, 250, core::future::pending::<()>()));
        assert_eq!(out, None);
        assert_eq!(clock.now_ms(), 250);
    }

    #[test]
    fn clock_formatting() {
        let mut s: heapless::String<8> = heapless::String::new();
        write_clock(&mut s, 3 * 3600 + 7 * 60 + 59).unwrap();
        assert_eq!(s.as_str(), "03:07");
    }
}
