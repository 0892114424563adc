//! The controller's menu lines, bound to the shared [`Context`].

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::RawMutex;

use super::{LineBinding, LineText, Reaction};
use crate::context::Context;
use crate::input::MenuInput;
use crate::sensor::SoilSensor;
use crate::storage::SettingsStore;
use crate::time::{write_clock, Timebase};

/// One line of the controller menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerLine {
    /// Desired reading; Up/Down edit, Confirm saves.
    Goal,
    /// Minutes between checks; Up/Down edit, Confirm saves.
    Interval,
    /// Latest soil reading.
    Reading,
    LastCheck,
    NextCheck,
    /// Confirm makes a check due immediately.
    CheckNow,
    /// Confirm squeezes the sprayer once.
    Spray,
    /// Confirm adopts the latest reading as the goal.
    GoalFromReading,
}

impl ControllerLine {
    /// Menu order on the device.
    pub const ALL: [ControllerLine; 8] = [
        ControllerLine::Goal,
        ControllerLine::Interval,
        ControllerLine::Reading,
        ControllerLine::LastCheck,
        ControllerLine::NextCheck,
        ControllerLine::CheckNow,
        ControllerLine::Spray,
        ControllerLine::GoalFromReading,
    ];
}

/// Step used by Up/Down on an editable line.
fn step(input: MenuInput) -> Option<i32> {
    match input {
        MenuInput::Up => Some(1),
        MenuInput::Down => Some(-1),
        _ => None,
    }
}

impl<'a, M, S, St, T> LineBinding<Context<'a, M, S, St, T>> for ControllerLine
where
    M: RawMutex,
    S: SoilSensor,
    St: SettingsStore,
    T: Timebase,
{
    async fn label(&self, ctx: &Context<'a, M, S, St, T>, out: &mut LineText) {
        let state = match self {
            ControllerLine::CheckNow => {
                let _ = out.push_str("Check now");
                return;
            }
            ControllerLine::Spray => {
                let _ = out.push_str("Spray");
                return;
            }
            ControllerLine::GoalFromReading => {
                let _ = out.push_str("Goal = soil");
                return;
            }
            _ => match ctx.snapshot().await {
                Ok(state) => state,
                Err(_) => {
                    let _ = out.push_str("...");
                    return;
                }
            },
        };

        let _ = match self {
            ControllerLine::Goal => write!(out, "Goal: {}", state.desired_reading),
            ControllerLine::Interval => write!(out, "Every: {} min", state.check_interval_mins),
            ControllerLine::Reading if state.stale => {
                write!(out, "Soil: {} stale", state.current_reading)
            }
            ControllerLine::Reading => write!(out, "Soil: {}", state.current_reading),
            ControllerLine::LastCheck => {
                write!(out, "Last: ").and_then(|_| write_clock(out, state.last_check_ms / 1000))
            }
            ControllerLine::NextCheck => {
                write!(out, "Next: ").and_then(|_| write_clock(out, state.next_check_ms / 1000))
            }
            _ => Ok(()),
        };
    }

    async fn on_input(
        &self,
        ctx: &Context<'a, M, S, St, T>,
        input: MenuInput,
    ) -> Option<Reaction> {
        match (self, input) {
            (ControllerLine::Goal, MenuInput::Confirm)
            | (ControllerLine::Interval, MenuInput::Confirm) => {
                if let Err(e) = ctx.persist_settings().await {
                    warn!("settings not saved: {:?}", e);
                }
                Some(Reaction::release(false))
            }
            (ControllerLine::Goal, _) => {
                let delta = step(input)?;
                let changed = ctx.add_to_desired(delta).await.is_ok();
                Some(Reaction::keep(changed))
            }
            (ControllerLine::Interval, _) => {
                let delta = step(input)?;
                let changed = ctx.add_to_check_interval(delta).await.is_ok();
                Some(Reaction::keep(changed))
            }
            (ControllerLine::CheckNow, MenuInput::Confirm) => {
                let changed = ctx.request_check_now().await.is_ok();
                Some(Reaction::release(changed))
            }
            (ControllerLine::Spray, MenuInput::Confirm) => {
                ctx.spray(false).await;
                Some(Reaction::release(false))
            }
            (ControllerLine::GoalFromReading, MenuInput::Confirm) => {
                let changed = ctx.set_desired_to_current().await.is_ok();
                Some(Reaction::release(changed))
            }
            // Read-outs and unhandled inputs release.
            _ => None,
        }
    }
}
