//! Application-wide constants and startup configuration.
//!
//! All hardware pin assignments, timing parameters, and default settings
//! live here so they can be tuned in one place.

use crate::error::ConfigError;
use crate::sensor::{SensorBinding, SensorPolarity};

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   Button UP      → P0.11
//   Button CONFIRM → P0.12
//   Button DOWN    → P0.24
//   Button SLEEP   → P0.25  (wake input, never masked)
//   Soil sensor    → P0.02  (AIN0)
//   Servo PWM      → P0.13
//   I²C SDA        → P0.26
//   I²C SCL        → P0.27

// Input

/// Button debounce window (ms). Must exceed the switch's bounce time.
pub const BUTTON_DEBOUNCE_MS: u64 = 50;

/// Capacity of the menu input queue. Inputs beyond this are dropped.
pub const INPUT_QUEUE_CAPACITY: usize = 10;

/// Longest accepted remote command line (bytes, excluding the newline).
pub const REMOTE_LINE_MAX: usize = 32;

// Shared state

/// How long a task waits for the Context lock before giving up (ms).
pub const LOCK_TIMEOUT_MS: u64 = 1000;

// Watering

/// Period at which the watering task polls "is a check overdue" (ms).
pub const OVERDUE_POLL_MS: u64 = 60 * 1000;

/// Time for a spray to soak into the soil before re-reading (ms).
pub const SOAK_DELAY_MS: u64 = 5000;

/// Interval at which a blocking spray re-checks for completion (ms).
pub const SPRAY_POLL_MS: u64 = 500;

/// Upper bound on a blocking spray before it is reported as stuck (ms).
pub const SPRAY_TIMEOUT_MS: u64 = 30 * 1000;

/// Default cap on sprays issued for one overdue check.
pub const DEFAULT_MAX_SPRAYS_PER_CHECK: u32 = 20;

// Servo

/// Resting angle of the sprayer arm (degrees).
pub const SERVO_NEUTRAL_DEG: u8 = 0;

/// Angle that squeezes the sprayer trigger (degrees).
pub const SERVO_DEFLECTED_DEG: u8 = 90;

/// Time allowed for the servo to reach a commanded angle (ms).
pub const SERVO_MOVE_MS: u64 = 2000;

/// Pulse width at 0° and 180° (µs), standard hobby servo.
pub const SERVO_MIN_PULSE_US: u32 = 1000;
pub const SERVO_MAX_PULSE_US: u32 = 2000;

// Soil probe calibration (raw 12-bit SAADC counts)

/// Raw count with the probe in dry air.
pub const SOIL_RAW_DRY: i16 = 3000;

/// Raw count with the probe in water.
pub const SOIL_RAW_WET: i16 = 1200;

// Settings defaults (used whenever the store has no value)

/// Default desired soil reading.
pub const DEFAULT_DESIRED_READING: u16 = 25;

/// Default minutes between scheduled checks.
pub const DEFAULT_CHECK_INTERVAL_MINS: u32 = 100;

/// Shortest check interval the menu allows (minutes).
pub const MIN_CHECK_INTERVAL_MINS: u32 = 1;

/// Longest check interval the menu allows (minutes): one week.
pub const MAX_CHECK_INTERVAL_MINS: u32 = 7 * 24 * 60;

// Display

/// Text rows visible on the display.
pub const DISPLAY_ROWS: usize = 4;

/// Characters per row; longer lines are truncated.
pub const DISPLAY_COLS: usize = 20;

/// Maximum number of menu lines.
pub const MAX_MENU_LINES: usize = 8;

/// Enable automatic display power-off after inactivity.
pub const SCREEN_AUTO_OFF_ENABLED: bool = true;

/// Inactivity timeout before the display is turned off (seconds).
pub const SCREEN_AUTO_OFF_TIMEOUT_SECS: u64 = 120;

/// How often the UI task re-renders values changed in the background (ms).
pub const UI_REFRESH_MS: u64 = 1000;

// Settings storage

/// Namespace under which controller settings are stored.
pub const SETTINGS_NAMESPACE: &str = "context";

/// Flash page index where settings storage starts (4 KB per page on nRF52840).
pub const STORAGE_FLASH_PAGE_START: u32 = 240;

/// Number of flash pages reserved for settings storage.
pub const STORAGE_FLASH_PAGE_COUNT: u32 = 4;

/// Largest value the store accepts (bytes).
pub const MAX_VALUE_LEN: usize = 16;

// USB command link

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "waterbot";
pub const USB_PRODUCT: &str = "Plant Watering Controller";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// Max packet size of the CDC-ACM endpoints.
pub const USB_CDC_PACKET_SIZE: u16 = 64;

/// Limits on how many sprays one overdue check may issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WateringPolicy {
    /// `None` keeps spraying until the reading is satisfied.
    pub max_sprays_per_check: Option<u32>,
    pub soak_delay_ms: u64,
}

impl Default for WateringPolicy {
    fn default() -> Self {
        Self {
            max_sprays_per_check: Some(DEFAULT_MAX_SPRAYS_PER_CHECK),
            soak_delay_ms: SOAK_DELAY_MS,
        }
    }
}

/// Startup parameters of one deployment.
///
/// Rejected by [`ControllerConfig::validate`] when unusable; the firmware
/// refuses to run without a valid configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerConfig {
    pub sensor: SensorBinding,
    pub watering: WateringPolicy,
    pub default_desired_reading: u16,
    pub default_check_interval_mins: u32,
    pub debounce_ms: u64,
}

impl ControllerConfig {
    /// Configuration of the reference hardware: resistive probe scaled to
    /// 0..=100 by the SAADC driver, wetter soil reads higher.
    pub const fn reference() -> Self {
        Self {
            sensor: SensorBinding {
                polarity: SensorPolarity::HigherIsWetter,
                min_reading: 0,
                max_reading: 100,
            },
            watering: WateringPolicy {
                max_sprays_per_check: Some(DEFAULT_MAX_SPRAYS_PER_CHECK),
                soak_delay_ms: SOAK_DELAY_MS,
            },
            default_desired_reading: DEFAULT_DESIRED_READING,
            default_check_interval_mins: DEFAULT_CHECK_INTERVAL_MINS,
            debounce_ms: BUTTON_DEBOUNCE_MS,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor.min_reading >= self.sensor.max_reading {
            return Err(ConfigError::EmptyReadingRange);
        }
        if !self.sensor.contains(self.default_desired_reading) {
            return Err(ConfigError::DesiredOutOfRange);
        }
        if self.default_check_interval_mins == 0 {
            return Err(ConfigError::ZeroCheckInterval);
        }
        if self.watering.max_sprays_per_check == Some(0) {
            return Err(ConfigError::ZeroSprayCap);
        }
        if self.debounce_ms == 0 {
            return Err(ConfigError::ZeroDebounceWindow);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_config_is_valid() {
        assert_eq!(ControllerConfig::reference().validate(), Ok(()));
    }

    #[test]
    fn misuse_is_rejected() {
        let mut cfg = ControllerConfig::reference();
        cfg.default_check_interval_mins = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroCheckInterval));

        let mut cfg = ControllerConfig::reference();
        cfg.default_desired_reading = 101;
        assert_eq!(cfg.validate(), Err(ConfigError::DesiredOutOfRange));

        let mut cfg = ControllerConfig::reference();
        cfg.sensor.max_reading = cfg.sensor.min_reading;
        assert_eq!(cfg.validate(), Err(ConfigError::EmptyReadingRange));

        let mut cfg = ControllerConfig::reference();
        cfg.watering.max_sprays_per_check = Some(0);
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSprayCap));

        let mut cfg = ControllerConfig::reference();
        cfg.debounce_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroDebounceWindow));
    }

    #[test]
    fn unbounded_watering_is_a_valid_choice() {
        let mut cfg = ControllerConfig::reference();
        cfg.watering.max_sprays_per_check = None;
        assert!(cfg.validate().is_ok());
    }
}
