//! SSD1306 OLED display sink.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;
use waterbot::error::Error;
use waterbot::menu::Frame;
use waterbot::ui::DisplaySink;

/// Type alias for the concrete display driver.
///
/// Generic over the I²C implementation so callers pass in their HAL's
/// I²C peripheral.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Baseline of the first text row; rows are `ROW_PITCH` apart.
const FIRST_BASELINE: i32 = 10;
const ROW_PITCH: i32 = 14;

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let _ = display.init();
    display.clear_buffer();
    let _ = display.flush();
    display
}

fn text_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

/// Menu frames on the OLED; 6×10 glyphs fit the 20-column rows.
pub struct OledSink<I2C> {
    display: Display<I2C>,
    panel_on: bool,
}

impl<I2C> OledSink<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(display: Display<I2C>) -> Self {
        Self {
            display,
            panel_on: true,
        }
    }
}

impl<I2C> DisplaySink for OledSink<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn show(&mut self, frame: &Frame) -> Result<(), Error> {
        if !self.panel_on {
            self.display.set_display_on(true).map_err(|_| Error::Display)?;
            self.panel_on = true;
        }

        self.display.clear_buffer();
        for (row, text) in frame.rows().enumerate() {
            let y = FIRST_BASELINE + row as i32 * ROW_PITCH;
            let _ = Text::new(text, Point::new(0, y), text_style()).draw(&mut self.display);
        }
        self.display.flush().map_err(|_| Error::Display)
    }

    fn blank(&mut self) -> Result<(), Error> {
        self.display.clear_buffer();
        self.display.flush().map_err(|_| Error::Display)?;
        self.display.set_display_on(false).map_err(|_| Error::Display)?;
        self.panel_on = false;
        Ok(())
    }
}
