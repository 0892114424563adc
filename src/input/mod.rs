//! Input layer - debounced buttons and remote commands feeding one queue.
//!
//! ## Components
//!
//! - **Debouncer**: per-button edge filter, safe to run from the GPIO
//!   edge wake-up path (no blocking, no allocation)
//! - **InputQueue**: bounded FIFO from producers (buttons, USB commands)
//!   to the single UI consumer
//! - **Remote**: line-delimited text commands translated into inputs

pub mod debounce;
pub mod remote;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

use crate::config::INPUT_QUEUE_CAPACITY;

/// Discrete input symbol consumed by the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuInput {
    None,
    Up,
    Confirm,
    Down,
}

/// Bounded FIFO carrying inputs to the UI task.
///
/// `push` never waits, so button tasks and the USB command task cannot be
/// stalled by a slow consumer. When the queue is full the newest input is
/// dropped; the user simply presses again.
pub struct InputQueue<M: RawMutex, const N: usize = INPUT_QUEUE_CAPACITY> {
    channel: Channel<M, MenuInput, N>,
}

impl<M: RawMutex, const N: usize> InputQueue<M, N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Enqueue without blocking. Returns `false` if the input was dropped.
    pub fn push(&self, input: MenuInput) -> bool {
        match self.channel.try_send(input) {
            Ok(()) => {
                trace!("input queued: {:?}", input);
                true
            }
            Err(_) => {
                warn!("input queue full - dropping {:?}", input);
                false
            }
        }
    }

    /// Wait for the next input.
    pub async fn pop(&self) -> MenuInput {
        self.channel.receive().await
    }

    /// Take the next input if one is waiting.
    pub fn try_pop(&self) -> Option<MenuInput> {
        self.channel.try_receive().ok()
    }

    /// Discard everything queued.
    pub fn clear(&self) {
        self.channel.clear();
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }
}

impl<M: RawMutex, const N: usize> Default for InputQueue<M, N> {
    fn default() -> Self {
        Self::new()
    }
}
