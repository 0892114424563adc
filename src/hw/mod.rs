//! nRF52840 bindings for the control core's peripheral traits.
//!
//! ## Components
//!
//! - **buttons**: GPIO edge tasks feeding the debouncer and input queue
//! - **soil**: SAADC soil probe
//! - **servo**: PWM hobby servo driving the sprayer
//! - **display**: SSD1306 128×64 OLED over I²C
//! - **flash**: settings store on internal flash (`sequential-storage`)
//! - **clock**: Embassy time base

pub mod buttons;
pub mod clock;
pub mod display;
pub mod flash;
pub mod servo;
pub mod soil;
