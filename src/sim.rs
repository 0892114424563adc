//! Simulated peripherals for host runs and tests.
//!
//! `SimClock` advances virtual time instead of sleeping, so watering
//! cycles that take minutes on the device finish instantly. `SimPlant`
//! couples a soil probe and a sprayer: every squeeze of the sprayer adds
//! a fixed amount of moisture. `SimStore` and `SimDisplay` record what
//! the controller persisted and drew.

use core::cell::{Cell, RefCell};

use embassy_futures::yield_now;
use heapless::Vec;

use crate::actuation::Servo;
use crate::config::{DISPLAY_ROWS, SERVO_DEFLECTED_DEG, SERVO_NEUTRAL_DEG};
use crate::error::{Error, StorageError};
use crate::menu::frame::Row;
use crate::menu::Frame;
use crate::sensor::SoilSensor;
use crate::storage::{MemoryStore, SettingKey, SettingsStore};
use crate::time::Timebase;
use crate::ui::DisplaySink;

/// Virtual monotonic clock.
///
/// `sleep_ms` advances the clock and yields once, letting other futures
/// in the same `join`/`select` make progress.
#[derive(Default)]
pub struct SimClock {
    now_ms: Cell<u64>,
}

impl SimClock {
    pub const fn new() -> Self {
        Self { now_ms: Cell::new(0) }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }

    pub fn set_ms(&self, ms: u64) {
        self.now_ms.set(ms);
    }
}

impl Timebase for SimClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    async fn sleep_ms(&self, ms: u64) {
        self.advance_ms(ms);
        yield_now().await;
    }
}

/// Soil whose moisture rises with every spray.
pub struct SimPlant {
    moisture: Cell<u16>,
    gain_per_spray: Cell<u16>,
    sensor_fault: Cell<bool>,
    reads: Cell<u32>,
    sprays: Cell<u32>,
}

impl SimPlant {
    pub const fn new(moisture: u16, gain_per_spray: u16) -> Self {
        Self {
            moisture: Cell::new(moisture),
            gain_per_spray: Cell::new(gain_per_spray),
            sensor_fault: Cell::new(false),
            reads: Cell::new(0),
            sprays: Cell::new(0),
        }
    }

    pub fn moisture(&self) -> u16 {
        self.moisture.get()
    }

    pub fn set_moisture(&self, moisture: u16) {
        self.moisture.set(moisture);
    }

    /// Empty reservoir: sprays stop changing the reading.
    pub fn set_gain(&self, gain: u16) {
        self.gain_per_spray.set(gain);
    }

    /// Disconnected probe: every read fails.
    pub fn set_sensor_fault(&self, fault: bool) {
        self.sensor_fault.set(fault);
    }

    /// Successful and failed sensor reads so far.
    pub fn reads(&self) -> u32 {
        self.reads.get()
    }

    pub fn sprays(&self) -> u32 {
        self.sprays.get()
    }

    pub fn probe(&self) -> SimProbe<'_> {
        SimProbe { plant: self }
    }

    pub fn sprayer(&self) -> SimSprayer<'_> {
        SimSprayer {
            plant: self,
            position: SERVO_NEUTRAL_DEG,
            jammed: false,
            moves: Vec::new(),
        }
    }

    fn squeeze(&self) {
        self.sprays.set(self.sprays.get() + 1);
        self.moisture
            .set(self.moisture.get().saturating_add(self.gain_per_spray.get()));
    }
}

/// Soil probe reading a [`SimPlant`].
pub struct SimProbe<'a> {
    plant: &'a SimPlant,
}

impl SoilSensor for SimProbe<'_> {
    async fn read_raw(&mut self) -> Result<u16, Error> {
        self.plant.reads.set(self.plant.reads.get() + 1);
        if self.plant.sensor_fault.get() {
            Err(Error::Sensor)
        } else {
            Ok(self.plant.moisture.get())
        }
    }
}

/// Servo that waters a [`SimPlant`] whenever it reaches the deflected angle.
pub struct SimSprayer<'a> {
    plant: &'a SimPlant,
    position: u8,
    jammed: bool,
    moves: Vec<u8, 64>,
}

impl SimSprayer<'_> {
    /// Commanded positions, oldest first (the first 64 are kept).
    pub fn moves(&self) -> &[u8] {
        &self.moves
    }

    /// Make every further command fail.
    pub fn jam(&mut self) {
        self.jammed = true;
    }
}

impl Servo for SimSprayer<'_> {
    fn set_position(&mut self, degrees: u8) -> Result<(), Error> {
        if self.jammed {
            return Err(Error::Actuator);
        }
        if degrees == SERVO_DEFLECTED_DEG && self.position != SERVO_DEFLECTED_DEG {
            self.plant.squeeze();
        }
        self.position = degrees;
        let _ = self.moves.push(degrees);
        Ok(())
    }

    fn position(&self) -> u8 {
        self.position
    }
}

/// Settings store that can be told to fail.
///
/// Shares its contents through `&self` so a test can inspect what the
/// controller persisted while the controller owns a handle to it.
pub struct SimStore {
    inner: RefCell<MemoryStore>,
    fail_writes: Cell<bool>,
    writes: Cell<u32>,
}

impl SimStore {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(MemoryStore::new()),
            fail_writes: Cell::new(false),
            writes: Cell::new(0),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Successful writes so far.
    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

impl Default for SimStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for &SimStore {
    async fn get(&mut self, key: SettingKey, out: &mut [u8]) -> Result<usize, Error> {
        self.inner.borrow().read(key, out)
    }

    async fn set(&mut self, key: SettingKey, data: &[u8]) -> Result<(), Error> {
        if self.fail_writes.get() {
            return Err(StorageError::Flash.into());
        }
        self.inner.borrow_mut().write(key, data)?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Display that records what it was asked to show.
#[derive(Default)]
pub struct SimDisplay {
    rows: Vec<Row, DISPLAY_ROWS>,
    frames: u32,
    blank: bool,
}

impl SimDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames shown so far.
    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn row(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(|r| r.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }
}

impl DisplaySink for SimDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Error> {
        self.rows.clear();
        for text in frame.rows() {
            let mut row = Row::new();
            row.push_str(text).map_err(|_| Error::BufferOverflow)?;
            let _ = self.rows.push(row);
        }
        self.frames += 1;
        self.blank = false;
        Ok(())
    }

    fn blank(&mut self) -> Result<(), Error> {
        self.rows.clear();
        self.blank = true;
        Ok(())
    }
}
