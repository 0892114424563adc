//! User interface task - input dispatch plus display refresh.
//!
//! The UI task is the single consumer of the [`InputQueue`]. It applies
//! each input to the [`Menu`], and redraws when the menu changed, when the
//! Context was modified in the background, or when the display power
//! state flips.
//!
//! ## Components
//!
//! - **Ui**: menu plus redraw bookkeeping
//! - **DisplaySink**: where frames end up (SSD1306 on target)

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::config::{MAX_MENU_LINES, UI_REFRESH_MS};
use crate::error::Error;
use crate::input::{InputQueue, MenuInput};
use crate::menu::{Frame, LineBinding, Menu};
use crate::power::IoGate;
use crate::time::{within, Timebase};

/// Text display showing one [`Frame`] at a time.
pub trait DisplaySink {
    fn show(&mut self, frame: &Frame) -> Result<(), Error>;

    /// Turn the panel off (or clear it).
    fn blank(&mut self) -> Result<(), Error>;
}

pub struct Ui<B, const N: usize = MAX_MENU_LINES> {
    menu: Menu<B, N>,
    seen_revision: Option<u32>,
    display_on: bool,
    needs_redraw: bool,
}

impl<B, const N: usize> Ui<B, N> {
    pub fn new(menu: Menu<B, N>) -> Self {
        Self {
            menu,
            seen_revision: None,
            display_on: false,
            needs_redraw: true,
        }
    }

    pub fn menu(&self) -> &Menu<B, N> {
        &self.menu
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on
    }

    /// Apply one input taken from the queue.
    ///
    /// While dormant the input is discarded; on waking the menu starts
    /// from browsing.
    pub async fn handle<C>(&mut self, input: MenuInput, target: &C, gate: &IoGate, now_ms: u64)
    where
        B: LineBinding<C>,
    {
        if !gate.admits_input() {
            trace!("dormant - dropping {:?}", input);
            self.menu.release();
            return;
        }
        gate.record_activity(now_ms);
        // An input that only wakes the panel is not applied.
        if !self.display_on {
            self.needs_redraw = true;
            return;
        }
        if self.menu.react(input, target).await {
            self.needs_redraw = true;
        }
    }

    /// Bring the display up to date with the menu and the Context.
    pub async fn render<C, D>(
        &mut self,
        target: &C,
        revision: u32,
        gate: &IoGate,
        sink: &mut D,
        now_ms: u64,
    ) -> Result<(), Error>
    where
        B: LineBinding<C>,
        D: DisplaySink,
    {
        let should_be_on = gate.display_should_be_on(now_ms);
        if !should_be_on {
            if self.display_on {
                debug!("display off");
                self.display_on = false;
                sink.blank()?;
            }
            return Ok(());
        }

        if !self.display_on {
            debug!("display on");
            self.display_on = true;
            self.needs_redraw = true;
        }
        if self.seen_revision != Some(revision) {
            self.seen_revision = Some(revision);
            self.menu.invalidate_all();
        }
        if self.menu.refresh(target).await > 0 {
            self.needs_redraw = true;
        }
        if self.needs_redraw {
            self.needs_redraw = false;
            sink.show(&self.menu.frame())?;
        }
        Ok(())
    }
}

/// UI task body.
///
/// `revision` reports the Context's change counter; the display is
/// refreshed at least every `UI_REFRESH_MS` to pick up background changes.
pub async fn run_ui<M, B, C, D, T, const Q: usize, const N: usize>(
    queue: &InputQueue<M, Q>,
    mut ui: Ui<B, N>,
    target: &C,
    revision: impl Fn(&C) -> u32,
    gate: &IoGate,
    mut sink: D,
    time: T,
) -> !
where
    M: RawMutex,
    B: LineBinding<C>,
    D: DisplaySink,
    T: Timebase,
{
    info!("ui task started");
    loop {
        if let Err(e) = ui
            .render(target, revision(target), gate, &mut sink, time.now_ms())
            .await
        {
            warn!("display update failed: {:?}", e);
        }
        if let Some(input) = within(&time, UI_REFRESH_MS, queue.pop()).await {
            ui.handle(input, target, gate, time.now_ms()).await;
        }
    }
}
