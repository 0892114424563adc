//! Sprayer actuation - the only code that drives the servo.
//!
//! The actuator task sleeps until a spray is requested, moves the arm
//! neutral → deflected → neutral, then reports idle. Requests arriving
//! while a spray is in flight are coalesced into it.
//!
//! ```text
//!   request()          wait_idle()
//!      │                   ▲
//!      ▼                   │
//!   [Idle] ──signal──► [Spraying] ──done──► [Idle]
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;

use crate::config::{
    SERVO_DEFLECTED_DEG, SERVO_MOVE_MS, SERVO_NEUTRAL_DEG, SPRAY_POLL_MS,
};
use crate::error::Error;
use crate::time::{within, Timebase};

/// Position-controlled actuator (hobby servo).
pub trait Servo {
    /// Command the arm to `degrees`.
    fn set_position(&mut self, degrees: u8) -> Result<(), Error>;

    /// Last commanded position.
    fn position(&self) -> u8;
}

/// Fixed motion that squeezes the sprayer once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SprayMotion {
    pub neutral_deg: u8,
    pub deflected_deg: u8,
    /// Wait after each move for the arm to get there.
    pub move_ms: u64,
}

impl Default for SprayMotion {
    fn default() -> Self {
        Self {
            neutral_deg: SERVO_NEUTRAL_DEG,
            deflected_deg: SERVO_DEFLECTED_DEG,
            move_ms: SERVO_MOVE_MS,
        }
    }
}

/// Rendezvous between spray requesters and the actuator task.
///
/// At most one spray is in flight; `busy` is set by the requester that
/// starts it and cleared by the actuator when the arm is back at rest.
pub struct SprayTrigger<M: RawMutex> {
    request: Signal<M, ()>,
    done: Signal<M, ()>,
    busy: AtomicBool,
    completed: AtomicU32,
}

impl<M: RawMutex> SprayTrigger<M> {
    pub const fn new() -> Self {
        Self {
            request: Signal::new(),
            done: Signal::new(),
            busy: AtomicBool::new(false),
            completed: AtomicU32::new(0),
        }
    }

    /// Ask the actuator for a spray without waiting.
    ///
    /// Returns `false` if a spray was already pending or running; that
    /// spray serves this request too.
    pub fn request(&self) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            debug!("spray already in flight - coalesced");
            return false;
        }
        self.done.reset();
        self.request.signal(());
        true
    }

    /// `true` while a spray is pending or running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Number of sprays the actuator has finished since boot.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Wait until no spray is in flight, or `timeout_ms` has passed.
    pub async fn wait_idle<T: Timebase>(&self, time: &T, timeout_ms: u64) -> Result<(), Error> {
        let start = time.now_ms();
        while self.is_busy() {
            let elapsed = time.now_ms().saturating_sub(start);
            if elapsed >= timeout_ms {
                warn!("spray still running after {} ms", elapsed);
                return Err(Error::ActuationTimeout);
            }
            // The signal wakes us as soon as the arm is back; the poll
            // period only bounds how late a missed wake-up is noticed.
            let _ = within(time, SPRAY_POLL_MS.min(timeout_ms - elapsed), self.done.wait()).await;
        }
        Ok(())
    }

    /// Actuator side: wait for the next request.
    async fn next_request(&self) {
        self.request.wait().await
    }

    /// Actuator side: mark the current spray finished.
    fn finish(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        self.busy.store(false, Ordering::Release);
        self.done.signal(());
    }
}

impl<M: RawMutex> Default for SprayTrigger<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one spray motion on `servo`.
///
/// The first move is skipped when the arm already rests at neutral.
pub async fn spray_once<S: Servo, T: Timebase>(
    servo: &mut S,
    motion: &SprayMotion,
    time: &T,
) -> Result<(), Error> {
    if servo.position() != motion.neutral_deg {
        servo.set_position(motion.neutral_deg)?;
        time.sleep_ms(motion.move_ms).await;
    }

    servo.set_position(motion.deflected_deg)?;
    time.sleep_ms(motion.move_ms).await;

    servo.set_position(motion.neutral_deg)?;
    time.sleep_ms(motion.move_ms).await;
    Ok(())
}

/// Serve exactly one spray request.
pub async fn serve_one<M, S, T>(
    trigger: &SprayTrigger<M>,
    servo: &mut S,
    motion: &SprayMotion,
    time: &T,
) -> Result<(), Error>
where
    M: RawMutex,
    S: Servo,
    T: Timebase,
{
    trigger.next_request().await;
    debug!("spray started");
    let result = spray_once(servo, motion, time).await;
    match result {
        Ok(()) => info!("spray complete"),
        Err(e) => error!("spray aborted: {:?}", e),
    }
    // Idle is reported even on failure so requesters never hang.
    trigger.finish();
    result
}

/// Actuator task body - owns the servo for the lifetime of the firmware.
pub async fn run_actuator<M, S, T>(
    trigger: &SprayTrigger<M>,
    mut servo: S,
    motion: SprayMotion,
    time: T,
) -> !
where
    M: RawMutex,
    S: Servo,
    T: Timebase,
{
    info!("actuator task started");
    loop {
        let _ = serve_one(trigger, &mut servo, &motion, &time).await;
    }
}
