//! Low-power IO gate.
//!
//! The sleep button toggles between two modes:
//!
//! - **Active**: menu buttons and remote commands reach the menu, the
//!   display follows the inactivity policy.
//! - **Dormant**: menu inputs are masked at the button tasks and anything
//!   already queued is drained unread; the display is blanked. The sleep
//!   button stays armed as the only wake input. Watering continues.
//!
//! The gate is lock-free so button tasks can consult it on every edge.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::{SCREEN_AUTO_OFF_ENABLED, SCREEN_AUTO_OFF_TIMEOUT_SECS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    Active,
    Dormant,
}

/// When the display may stay lit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayPolicy {
    /// Seconds without input before the display turns off; `None` keeps it on.
    pub auto_off_secs: Option<u64>,
}

impl DisplayPolicy {
    pub const fn from_config() -> Self {
        Self {
            auto_off_secs: if SCREEN_AUTO_OFF_ENABLED {
                Some(SCREEN_AUTO_OFF_TIMEOUT_SECS)
            } else {
                None
            },
        }
    }

    /// Decide from the power mode and how long the user has been idle.
    pub fn allows(&self, mode: PowerMode, idle_secs: u64) -> bool {
        match (mode, self.auto_off_secs) {
            (PowerMode::Dormant, _) => false,
            (PowerMode::Active, Some(limit)) => idle_secs < limit,
            (PowerMode::Active, None) => true,
        }
    }
}

impl Default for DisplayPolicy {
    fn default() -> Self {
        Self::from_config()
    }
}

pub struct IoGate {
    dormant: AtomicBool,
    /// Seconds since boot of the last accepted input.
    last_activity_secs: AtomicU32,
    policy: DisplayPolicy,
}

impl IoGate {
    pub const fn new(policy: DisplayPolicy) -> Self {
        Self {
            dormant: AtomicBool::new(false),
            last_activity_secs: AtomicU32::new(0),
            policy,
        }
    }

    pub fn mode(&self) -> PowerMode {
        if self.dormant.load(Ordering::Acquire) {
            PowerMode::Dormant
        } else {
            PowerMode::Active
        }
    }

    /// `true` while menu inputs should be delivered.
    pub fn admits_input(&self) -> bool {
        self.mode() == PowerMode::Active
    }

    pub fn set_mode(&self, mode: PowerMode, now_ms: u64) {
        let dormant = mode == PowerMode::Dormant;
        if self.dormant.swap(dormant, Ordering::AcqRel) != dormant {
            info!("power: {:?}", mode);
        }
        if !dormant {
            // Waking counts as activity so the display comes back on.
            self.record_activity(now_ms);
        }
    }

    /// Sleep button: flip the mode and return the new one.
    pub fn toggle(&self, now_ms: u64) -> PowerMode {
        let next = match self.mode() {
            PowerMode::Active => PowerMode::Dormant,
            PowerMode::Dormant => PowerMode::Active,
        };
        self.set_mode(next, now_ms);
        next
    }

    pub fn record_activity(&self, now_ms: u64) {
        let secs = u32::try_from(now_ms / 1000).unwrap_or(u32::MAX);
        self.last_activity_secs.store(secs, Ordering::Relaxed);
    }

    pub fn idle_secs(&self, now_ms: u64) -> u64 {
        (now_ms / 1000).saturating_sub(self.last_activity_secs.load(Ordering::Relaxed) as u64)
    }

    pub fn display_should_be_on(&self, now_ms: u64) -> bool {
        self.policy.allows(self.mode(), self.idle_secs(now_ms))
    }
}

impl Default for IoGate {
    fn default() -> Self {
        Self::new(DisplayPolicy::from_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTO_OFF_120: DisplayPolicy = DisplayPolicy {
        auto_off_secs: Some(120),
    };

    #[test]
    fn display_turns_off_after_timeout() {
        assert!(AUTO_OFF_120.allows(PowerMode::Active, 119));
        assert!(!AUTO_OFF_120.allows(PowerMode::Active, 120));
        assert!(!AUTO_OFF_120.allows(PowerMode::Active, 240));
    }

    #[test]
    fn display_without_auto_off_stays_on() {
        let always = DisplayPolicy { auto_off_secs: None };
        assert!(always.allows(PowerMode::Active, 120));
        assert!(always.allows(PowerMode::Active, 3600));
    }

    #[test]
    fn dormant_display_is_off() {
        assert!(!AUTO_OFF_120.allows(PowerMode::Dormant, 0));
        assert!(!DisplayPolicy { auto_off_secs: None }.allows(PowerMode::Dormant, 999));
    }

    #[test]
    fn sleep_button_toggles_and_masks_inputs() {
        let gate = IoGate::new(AUTO_OFF_120);
        assert_eq!(gate.mode(), PowerMode::Active);
        assert!(gate.admits_input());

        assert_eq!(gate.toggle(1_000), PowerMode::Dormant);
        assert!(!gate.admits_input());
        assert!(!gate.display_should_be_on(1_000));

        assert_eq!(gate.toggle(500_000), PowerMode::Active);
        assert!(gate.admits_input());
        assert!(gate.display_should_be_on(500_000));
    }

    #[test]
    fn activity_resets_idle_time() {
        let gate = IoGate::new(AUTO_OFF_120);
        gate.record_activity(10_000);
        assert_eq!(gate.idle_secs(70_000), 60);
        assert!(gate.display_should_be_on(129_999));
        assert!(!gate.display_should_be_on(130_000));
        gate.record_activity(130_000);
        assert!(gate.display_should_be_on(130_000));
    }
}
