//! Edge debouncer for one push button.
//!
//! Every raw edge reported by the pin is fed to [`Debouncer::on_edge`].
//! The first edge after the quiet window flips the stable level and opens
//! a new window; edges inside the window are bounce and are dropped
//! without extending it:
//!
//! ```text
//! raw     ‾‾‾‾\_/‾\_/‾\________/‾\_/‾\_/‾‾‾‾‾
//! stable  ‾‾‾‾\___________________/‾‾‾‾‾‾‾‾‾‾
//!             |<-window->|        |<-window->|
//! ```
//!
//! The window must exceed the switch's physical bounce time.

/// Electrical level of a pressed button.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Pressed reads high (pull-down wiring).
    ActiveHigh,
    /// Pressed reads low (pull-up wiring).
    ActiveLow,
}

impl Polarity {
    /// Level the pin sits at while pressed.
    pub const fn pressed_level(self) -> bool {
        matches!(self, Polarity::ActiveHigh)
    }

    /// Level the pin sits at while released.
    pub const fn idle_level(self) -> bool {
        !self.pressed_level()
    }
}

/// Accepted change of a button's stable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transition {
    Pressed,
    Released,
}

/// Debounce state for one input. Never blocks and never allocates.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    last_stable_level: bool,
    next_valid_ms: u64,
    window_ms: u64,
    polarity: Polarity,
}

impl Debouncer {
    /// Start released, accepting the first edge immediately.
    pub const fn new(polarity: Polarity, window_ms: u64) -> Self {
        Self {
            last_stable_level: polarity.idle_level(),
            next_valid_ms: 0,
            window_ms,
            polarity,
        }
    }

    /// Feed one raw edge observed at `now_ms`.
    ///
    /// Returns the accepted transition, or `None` if the edge is noise.
    pub fn on_edge(&mut self, now_ms: u64) -> Option<Transition> {
        if now_ms < self.next_valid_ms {
            return None;
        }

        self.last_stable_level = !self.last_stable_level;
        self.next_valid_ms = now_ms.saturating_add(self.window_ms);

        Some(if self.is_pressed() {
            Transition::Pressed
        } else {
            Transition::Released
        })
    }

    pub fn is_pressed(&self) -> bool {
        self.last_stable_level == self.polarity.pressed_level()
    }

    pub fn stable_level(&self) -> bool {
        self.last_stable_level
    }

    /// Instant from which the next edge will be accepted.
    pub fn next_valid_ms(&self) -> u64 {
        self.next_valid_ms
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}
