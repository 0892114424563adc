//! On-device menu: a fixed list of lines navigated with Up/Down/Confirm.
//!
//! ## States
//!
//! - **Browsing**: Up/Down move the hover cursor (wrapping), Confirm
//!   starts editing the hovered line.
//! - **Editing(i)**: every input goes to line `i`'s handler, which answers
//!   `Keep` (stay) or `Release` (back to browsing). A line without a
//!   handler for the input releases; the releasing input is consumed.
//!
//! Each line caches its text and only regenerates it when marked dirty,
//! either by its own handler or by [`Menu::invalidate_all`].

pub mod frame;
pub mod lines;


use heapless::{String, Vec};

use crate::config::MAX_MENU_LINES;
use crate::error::{ConfigError, Error};
use crate::input::MenuInput;

pub use frame::Frame;
pub use lines::ControllerLine;

/// Longest text a line may cache; the frame truncates further to the
/// display width.
pub const LINE_TEXT_MAX: usize = 32;

pub type LineText = String<LINE_TEXT_MAX>;

/// Whether a handler keeps focus on its line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    Keep,
    Release,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MenuState {
    Browsing,
    Editing(usize),
}

/// A handler's answer to one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reaction {
    pub control: Control,
    /// The value shown on the line changed.
    pub changed: bool,
}

impl Reaction {
    pub const fn keep(changed: bool) -> Self {
        Self {
            control: Control::Keep,
            changed,
        }
    }

    pub const fn release(changed: bool) -> Self {
        Self {
            control: Control::Release,
            changed,
        }
    }
}

/// Behaviour of one menu line against the state it edits (`C`).
#[allow(async_fn_in_trait)]
pub trait LineBinding<C> {
    /// Write the line's current text into `out` (cleared by the caller).
    async fn label(&self, target: &C, out: &mut LineText);

    /// Handle `input` while this line is being edited.
    ///
    /// `None` means the line has no handler for `input`.
    async fn on_input(&self, target: &C, input: MenuInput) -> Option<Reaction>;
}

struct MenuLine<B> {
    binding: B,
    cache: LineText,
    dirty: bool,
}

pub struct Menu<B, const N: usize = MAX_MENU_LINES> {
    lines: Vec<MenuLine<B>, N>,
    hover: usize,
    state: MenuState,
}

impl<B, const N: usize> Menu<B, N> {
    /// Build the menu from its line bindings. Every line starts dirty.
    pub fn new(bindings: impl IntoIterator<Item = B>) -> Result<Self, Error> {
        let mut lines = Vec::new();
        for binding in bindings {
            lines
                .push(MenuLine {
                    binding,
                    cache: String::new(),
                    dirty: true,
                })
                .map_err(|_| Error::BufferOverflow)?;
        }
        if lines.is_empty() {
            return Err(ConfigError::EmptyMenu.into());
        }
        Ok(Self {
            lines,
            hover: 0,
            state: MenuState::Browsing,
        })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn hover_index(&self) -> usize {
        self.hover
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, MenuState::Editing(_))
    }

    /// Cached text of line `index`, as of the last [`Menu::refresh`].
    pub fn line_text(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(|l| l.cache.as_str())
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        self.lines.get(index).is_some_and(|l| l.dirty)
    }

    /// Mark every line for regeneration (values changed elsewhere).
    pub fn invalidate_all(&mut self) {
        for line in self.lines.iter_mut() {
            line.dirty = true;
        }
    }

    /// Leave editing without running a handler.
    pub fn release(&mut self) {
        self.state = MenuState::Browsing;
    }

    /// Apply one input. Returns `true` if the display needs redrawing.
    pub async fn react<C>(&mut self, input: MenuInput, target: &C) -> bool
    where
        B: LineBinding<C>,
    {
        let n = self.lines.len();
        match (self.state, input) {
            (_, MenuInput::None) => false,
            (MenuState::Browsing, MenuInput::Up) => {
                self.hover = (self.hover + n - 1) % n;
                trace!("hover -> {}", self.hover);
                true
            }
            (MenuState::Browsing, MenuInput::Down) => {
                self.hover = (self.hover + 1) % n;
                trace!("hover -> {}", self.hover);
                true
            }
            (MenuState::Browsing, MenuInput::Confirm) => {
                self.state = MenuState::Editing(self.hover);
                debug!("editing line {}", self.hover);
                true
            }
            (MenuState::Editing(i), input) => {
                let Some(line) = self.lines.get_mut(i) else {
                    self.state = MenuState::Browsing;
                    return true;
                };
                let reaction = line
                    .binding
                    .on_input(target, input)
                    .await
                    .unwrap_or(Reaction::release(false));
                if reaction.changed {
                    line.dirty = true;
                }
                if reaction.control == Control::Release {
                    self.state = MenuState::Browsing;
                    debug!("released line {}", i);
                }
                true
            }
        }
    }

    /// Regenerate the text of every dirty line. Returns how many changed.
    pub async fn refresh<C>(&mut self, target: &C) -> usize
    where
        B: LineBinding<C>,
    {
        let mut regenerated = 0;
        for line in self.lines.iter_mut().filter(|l| l.dirty) {
            line.cache.clear();
            line.binding.label(target, &mut line.cache).await;
            line.dirty = false;
            regenerated += 1;
        }
        regenerated
    }

    /// Rows for the display: starting at the hovered line, with the
    /// cursor marker on the first row.
    pub fn frame(&self) -> Frame {
        Frame::compose(
            self.lines.iter().map(|l| l.cache.as_str()),
            self.hover,
            self.is_editing(),
        )
    }
}
