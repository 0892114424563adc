//! Control core of the waterbot plant-watering controller.
//!
//! Everything here is hardware-independent: peripherals are reached
//! through small traits ([`sensor::SoilSensor`], [`actuation::Servo`],
//! [`storage::SettingsStore`], [`ui::DisplaySink`], [`time::Timebase`]),
//! so the same code runs in the nRF52840 firmware (`src/main.rs`) and in
//! host tests against the doubles in `sim` (feature `sim`, on by default).
//!
//! Usage: `cargo test --lib` or `cargo test` for the integration tests.
//!
//! Note: the embedded binary uses main.rs with #![no_std] and #![no_main]
//! and needs `--features embedded`.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
mod fmt;

pub mod actuation;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod menu;
pub mod power;
pub mod sensor;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod storage;
pub mod time;
pub mod ui;

pub use error::{ConfigError, Error, StorageError};
