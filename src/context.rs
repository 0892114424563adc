//! Shared controller state and the watering schedule.
//!
//! One [`Context`] exists for the lifetime of the firmware. It owns the
//! soil sensor and the settings store behind a single async mutex, so a
//! sensor read always lands in a consistent record. Lock acquisition is
//! bounded by `LOCK_TIMEOUT_MS`; a timeout is a no-op the caller retries on
//! its next input or tick.
//!
//! The background loop ([`Context::run_watering`]) wakes once per
//! `OVERDUE_POLL_MS`, or immediately after [`Context::request_check_now`]:
//!
//! ```text
//! overdue? ──no──► sleep
//!    │yes
//!    ▼
//! check ──► drier than desired? ──no──► done
//!              │yes            ▲
//!              ▼               │
//!      spray (wait idle) ─► soak ─► check
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_sync::signal::Signal;

use crate::actuation::SprayTrigger;
use crate::config::{
    ControllerConfig, WateringPolicy, LOCK_TIMEOUT_MS, MAX_CHECK_INTERVAL_MINS,
    MIN_CHECK_INTERVAL_MINS, OVERDUE_POLL_MS, SETTINGS_NAMESPACE, SPRAY_TIMEOUT_MS,
};
use crate::error::Error;
use crate::menu::Control;
use crate::sensor::{SensorBinding, SoilSensor};
use crate::storage::{Namespace, PersistedSettings, SettingsStore};
use crate::time::{within, Timebase};

const MS_PER_MIN: u64 = 60 * 1000;

/// The device record guarded by the Context lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContextState {
    /// Last successful sensor reading.
    pub current_reading: u16,
    pub desired_reading: u16,
    pub check_interval_mins: u32,
    pub last_check_ms: u64,
    pub next_check_ms: u64,
    /// `current_reading` is not from the most recent check.
    pub stale: bool,
}

impl ContextState {
    fn reschedule(&mut self) {
        self.next_check_ms = self.last_check_ms + self.check_interval_mins as u64 * MS_PER_MIN;
    }

    fn settings(&self) -> PersistedSettings {
        PersistedSettings {
            check_interval_mins: self.check_interval_mins,
            desired_reading: self.desired_reading,
        }
    }
}

/// How one watering cycle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WateringOutcome {
    /// The reading reached the desired level.
    Satisfied,
    /// `max_sprays_per_check` sprays did not satisfy the soil.
    SprayCapReached,
    /// Sensor, actuator or lock failure; retried at the next scheduled check.
    Aborted(Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WateringReport {
    pub sprays: u32,
    pub outcome: WateringOutcome,
}

struct Inner<S, St> {
    state: ContextState,
    sensor: S,
    store: St,
}

pub struct Context<'a, M: RawMutex, S, St, T> {
    inner: Mutex<M, Inner<S, St>>,
    sprayer: &'a SprayTrigger<M>,
    wake: Signal<M, ()>,
    time: T,
    binding: SensorBinding,
    policy: WateringPolicy,
    namespace: Namespace,
    revision: AtomicU32,
}

impl<'a, M, S, St, T> Context<'a, M, S, St, T>
where
    M: RawMutex,
    S: SoilSensor,
    St: SettingsStore,
    T: Timebase,
{
    /// Build the Context with in-memory defaults. The first check is due
    /// immediately; call [`Context::load_settings`] before starting tasks.
    pub fn new(
        config: &ControllerConfig,
        sensor: S,
        store: St,
        sprayer: &'a SprayTrigger<M>,
        time: T,
    ) -> Self {
        let now = time.now_ms();
        let state = ContextState {
            current_reading: config.sensor.min_reading,
            desired_reading: config.default_desired_reading,
            check_interval_mins: config.default_check_interval_mins,
            last_check_ms: now,
            next_check_ms: now,
            stale: true,
        };

        Self {
            inner: Mutex::new(Inner {
                state,
                sensor,
                store,
            }),
            sprayer,
            wake: Signal::new(),
            time,
            binding: config.sensor,
            policy: config.watering,
            namespace: Namespace::open(SETTINGS_NAMESPACE),
            revision: AtomicU32::new(0),
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, M, Inner<S, St>>, Error> {
        match within(&self.time, LOCK_TIMEOUT_MS, self.inner.lock()).await {
            Some(guard) => Ok(guard),
            None => {
                warn!("context lock not acquired within {} ms", LOCK_TIMEOUT_MS);
                Err(Error::LockTimeout)
            }
        }
    }

    fn touch(&self) {
        self.revision.fetch_add(1, Ordering::Release);
    }

    /// Bumped on every change to the record; the UI redraws when it moves.
    pub fn revision(&self) -> u32 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn binding(&self) -> &SensorBinding {
        &self.binding
    }

    pub fn time(&self) -> &T {
        &self.time
    }

    /// Copy of the record.
    pub async fn snapshot(&self) -> Result<ContextState, Error> {
        Ok(self.lock().await?.state)
    }

    /// Replace the defaults with whatever the store holds.
    pub async fn load_settings(&self) -> Result<PersistedSettings, Error> {
        let mut guard = self.lock().await?;
        let inner = &mut *guard;
        let loaded =
            PersistedSettings::load(&mut inner.store, self.namespace, inner.state.settings()).await;

        let desired = self.binding.clamp(loaded.desired_reading);
        if desired != loaded.desired_reading {
            warn!("stored desired reading {} out of range", loaded.desired_reading);
        }
        inner.state.desired_reading = desired;
        inner.state.check_interval_mins = loaded
            .check_interval_mins
            .clamp(MIN_CHECK_INTERVAL_MINS, MAX_CHECK_INTERVAL_MINS);
        // A check that is already due (the one at boot) stays due.
        if self.time.now_ms() < inner.state.next_check_ms {
            inner.state.reschedule();
        }
        self.touch();
        Ok(inner.state.settings())
    }

    /// Write the current interval and desired reading to the store.
    pub async fn persist_settings(&self) -> Result<(), Error> {
        let mut guard = self.lock().await?;
        let inner = &mut *guard;
        inner
            .state
            .settings()
            .save(&mut inner.store, self.namespace)
            .await
    }

    pub async fn is_check_overdue(&self) -> bool {
        match self.lock().await {
            Ok(guard) => self.time.now_ms() >= guard.state.next_check_ms,
            Err(_) => false,
        }
    }

    /// Sample the sensor under the lock. Returns whether the soil is
    /// drier than desired.
    async fn measure(&self, update_schedule: bool) -> Result<bool, Error> {
        let mut guard = self.lock().await?;
        let inner = &mut *guard;
        let result = inner.sensor.read_raw().await;

        let state = &mut inner.state;
        state.last_check_ms = self.time.now_ms();
        if update_schedule {
            state.reschedule();
        }
        self.touch();

        match result {
            Ok(reading) => {
                state.current_reading = reading;
                state.stale = false;
                let dry = self.binding.is_drier(reading, state.desired_reading);
                info!(
                    "check: reading {} desired {} next at {} ms",
                    reading, state.desired_reading, state.next_check_ms
                );
                Ok(dry)
            }
            Err(e) => {
                state.stale = true;
                warn!("check: sensor read failed ({:?}) - reading stale", e);
                Err(e)
            }
        }
    }

    /// Read the sensor and record the time of the check.
    pub async fn check(&self, update_schedule: bool) -> Control {
        let _ = self.measure(update_schedule).await;
        Control::Release
    }

    /// `true` if the last reading is drier than desired. A stale reading
    /// never counts as dry.
    pub async fn is_below_desired(&self) -> bool {
        match self.lock().await {
            Ok(guard) => {
                let state = &guard.state;
                !state.stale && self.binding.is_drier(state.current_reading, state.desired_reading)
            }
            Err(_) => false,
        }
    }

    async fn spray_and_wait(&self) -> Result<(), Error> {
        self.sprayer.request();
        self.sprayer.wait_idle(&self.time, SPRAY_TIMEOUT_MS).await
    }

    /// Start a spray; with `blocking`, wait until the sprayer is idle again.
    pub async fn spray(&self, blocking: bool) -> Control {
        if blocking {
            if let Err(e) = self.spray_and_wait().await {
                warn!("spray: {:?}", e);
            }
        } else {
            self.sprayer.request();
        }
        Control::Release
    }

    /// Shift the check interval by `delta` minutes and reschedule from the
    /// last check.
    pub async fn add_to_check_interval(&self, delta: i32) -> Result<u32, Error> {
        let mut guard = self.lock().await?;
        let state = &mut guard.state;
        let mins = (state.check_interval_mins as i64 + delta as i64).clamp(
            MIN_CHECK_INTERVAL_MINS as i64,
            MAX_CHECK_INTERVAL_MINS as i64,
        ) as u32;
        state.check_interval_mins = mins;
        state.reschedule();
        self.touch();
        debug!("interval now {} min", mins);
        Ok(mins)
    }

    /// Shift the desired reading by `delta`, wrapping at the range ends.
    pub async fn add_to_desired(&self, delta: i32) -> Result<u16, Error> {
        let mut guard = self.lock().await?;
        let state = &mut guard.state;
        state.desired_reading = self.binding.step(state.desired_reading, delta);
        self.touch();
        debug!("desired now {}", state.desired_reading);
        Ok(state.desired_reading)
    }

    /// Adopt the last reading as the new goal and persist it.
    pub async fn set_desired_to_current(&self) -> Result<u16, Error> {
        let mut guard = self.lock().await?;
        let inner = &mut *guard;
        if inner.state.stale {
            warn!("no fresh reading to adopt as goal");
            return Err(Error::Sensor);
        }
        inner.state.desired_reading = self.binding.clamp(inner.state.current_reading);
        self.touch();
        info!("desired set to current: {}", inner.state.desired_reading);

        // Kept in memory even if the write fails.
        if let Err(e) = inner
            .state
            .settings()
            .save(&mut inner.store, self.namespace)
            .await
        {
            warn!("goal not persisted: {:?}", e);
        }
        Ok(inner.state.desired_reading)
    }

    /// Make a check due now without touching the check history.
    pub async fn request_check_now(&self) -> Result<(), Error> {
        let mut guard = self.lock().await?;
        guard.state.next_check_ms = self.time.now_ms();
        self.touch();
        drop(guard);
        self.wake.signal(());
        Ok(())
    }

    /// One overdue check: measure, then spray and soak until the soil is
    /// wet enough or the policy gives up.
    pub async fn water_until_satisfied(&self) -> WateringReport {
        let mut sprays = 0;
        let outcome = loop {
            match self.measure(true).await {
                Ok(false) => break WateringOutcome::Satisfied,
                Ok(true) => {}
                Err(e) => break WateringOutcome::Aborted(e),
            }
            if let Some(cap) = self.policy.max_sprays_per_check {
                if sprays >= cap {
                    warn!("still dry after {} sprays - giving up until next check", sprays);
                    break WateringOutcome::SprayCapReached;
                }
            }
            if let Err(e) = self.spray_and_wait().await {
                break WateringOutcome::Aborted(e);
            }
            sprays += 1;
            self.time.sleep_ms(self.policy.soak_delay_ms).await;
        };

        WateringReport { sprays, outcome }
    }

    /// Watering task body.
    pub async fn run_watering(&self) -> ! {
        info!("watering task started");
        loop {
            if self.is_check_overdue().await {
                let report = self.water_until_satisfied().await;
                info!("watering: {:?} after {} sprays", report.outcome, report.sprays);
            }
            let _ = within(&self.time, OVERDUE_POLL_MS, self.wake.wait()).await;
        }
    }
}
