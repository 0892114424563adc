//! USB Device subsystem - a serial command link to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb`. The device exposes a single CDC-ACM interface; any
//! terminal can send `up`, `down` or `confirm` lines to drive the menu
//! remotely.

pub mod command_link;
