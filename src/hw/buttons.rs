//! GPIO button tasks.
//!
//! Four buttons, active-low with internal pull-up:
//!   - UP / CONFIRM / DOWN - menu navigation, masked while dormant
//!   - SLEEP               - toggles the low-power mode, never masked
//!
//! Each task waits for any edge, timestamps it and hands it to the
//! button's [`Debouncer`]. Accepted presses are pushed onto the input
//! queue without waiting.

use defmt::{debug, info};
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::Instant;
use waterbot::input::debounce::{Debouncer, Polarity, Transition};
use waterbot::input::{InputQueue, MenuInput};
use waterbot::power::IoGate;

const POLARITY: Polarity = Polarity::ActiveLow;

fn pull() -> Pull {
    if POLARITY.idle_level() {
        Pull::Up
    } else {
        Pull::Down
    }
}

/// Run one menu button forever.
pub async fn menu_button(
    pin: AnyPin,
    symbol: MenuInput,
    debounce_ms: u64,
    queue: &InputQueue<CriticalSectionRawMutex>,
    gate: &IoGate,
) -> ! {
    let mut btn = Input::new(pin, pull());
    let mut debouncer = Debouncer::new(POLARITY, debounce_ms);

    loop {
        btn.wait_for_any_edge().await;
        let now = Instant::now().as_millis();

        if debouncer.on_edge(now) != Some(Transition::Pressed) {
            continue;
        }
        if gate.admits_input() {
            info!("Button: {}", symbol);
            queue.push(symbol);
        } else {
            debug!("Button {} masked (dormant)", symbol);
        }
    }
}

/// Run the sleep button forever.
pub async fn sleep_button(pin: AnyPin, debounce_ms: u64, gate: &IoGate) -> ! {
    let mut btn = Input::new(pin, pull());
    let mut debouncer = Debouncer::new(POLARITY, debounce_ms);

    loop {
        btn.wait_for_any_edge().await;
        let now = Instant::now().as_millis();

        if debouncer.on_edge(now) == Some(Transition::Pressed) {
            let mode = gate.toggle(now);
            info!("Sleep button: {}", mode);
        }
    }
}
