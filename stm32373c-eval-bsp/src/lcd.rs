//! Colour LCD
//!
//! The 240 x 320 TFT panel has an ILI9320 compatible controller (ILI9320 or
//! SPFD5408) on SPI3, chip select on PD2.
//!
//! Every transfer starts with a start byte that selects an index write, a
//! data write or a data read. Registers are 16 bits, MSB first. Pixel data
//! is written to GRAM through register `0x22` with auto-increment inside the
//! current window.
//!
//! [`Lcd`] implements [`DrawTarget`] for [`Rgb565`], text is drawn with the
//! `embedded-graphics` mono fonts.
//!
//! # Example
//!
//! ```no_run
//! use embedded_graphics::{
//!     mono_font::{ascii::FONT_6X10, MonoTextStyle},
//!     pixelcolor::Rgb565,
//!     prelude::*,
//!     text::Text,
//! };
//! use stm32373c_eval_bsp::{
//!     hal::{cortex_m, gpio::{PortC, PortD}, pac, spi::BaudDiv},
//!     lcd::Lcd,
//! };
//!
//! let mut cp: pac::CorePeripherals = pac::CorePeripherals::take().unwrap();
//! let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
//!
//! let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);
//! let gpiod: PortD = PortD::split(dp.GPIOD, &mut dp.RCC);
//! let spi = stm32373c_eval_bsp::new_spi(
//!     dp.SPI3,
//!     gpioc.c12,
//!     gpioc.c11,
//!     gpioc.c10,
//!     BaudDiv::Div4,
//!     &mut dp.RCC,
//! );
//! let cs = cortex_m::interrupt::free(|cs| stm32373c_eval_bsp::lcd_cs(gpiod.d2, cs));
//!
//! let mut delay = cortex_m::delay::Delay::new(cp.SYST, 72_000_000);
//! let mut lcd = Lcd::new(spi, cs);
//! lcd.init(&mut delay)?;
//! lcd.clear(Rgb565::BLUE)?;
//! let style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
//! Text::new("STM32373C-EVAL", Point::new(8, 16), style).draw(&mut lcd)?;
//! # Ok::<(), stm32373c_eval_bsp::lcd::Error<stm32373c_eval_bsp::hal::spi::Error>>(())
//! ```

use core::convert::Infallible;

use embedded_graphics::{
    Pixel,
    draw_target::DrawTarget,
    geometry::{Dimensions, OriginDimensions, Point, Size},
    pixelcolor::{IntoStorage, Rgb565},
    primitives::{ContainsPoint, Rectangle},
};
use stm32f3xx_hal as hal;

use hal::embedded_hal::{
    blocking::{
        delay::DelayMs,
        spi::{Transfer, Write},
    },
    digital::v2::OutputPin,
};

/// Panel width in pixels.
pub const WIDTH: u16 = 240;
/// Panel height in pixels.
pub const HEIGHT: u16 = 320;

const START_INDEX: u8 = 0x70;
const START_WRITE: u8 = 0x72;
const START_READ: u8 = 0x73;

/// Controller registers used by the driver.
pub mod reg {
    /// Device code read.
    pub const ID: u8 = 0x00;
    /// Entry mode.
    pub const ENTRY_MODE: u8 = 0x03;
    /// Display control 1.
    pub const DISPLAY_CTRL: u8 = 0x07;
    /// GRAM horizontal address.
    pub const GRAM_X: u8 = 0x20;
    /// GRAM vertical address.
    pub const GRAM_Y: u8 = 0x21;
    /// GRAM data.
    pub const GRAM: u8 = 0x22;
    /// Window horizontal start.
    pub const WIN_X_START: u8 = 0x50;
    /// Window horizontal end.
    pub const WIN_X_END: u8 = 0x51;
    /// Window vertical start.
    pub const WIN_Y_START: u8 = 0x52;
    /// Window vertical end.
    pub const WIN_Y_END: u8 = 0x53;
}

const DISPLAY_ON: u16 = 0x0173;
const DISPLAY_OFF: u16 = 0x0000;

// BGR, horizontal then vertical increment
const ENTRY_MODE: u16 = 0x1030;

/// Supported controllers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Controller {
    /// Ilitek ILI9320
    Ili9320,
    /// Orise SPFD5408
    Spfd5408,
}

impl Controller {
    /// Controller from the device code register.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32373c_eval_bsp::lcd::Controller;
    ///
    /// assert_eq!(Controller::from_id(0x9320), Some(Controller::Ili9320));
    /// assert_eq!(Controller::from_id(0x5408), Some(Controller::Spfd5408));
    /// assert_eq!(Controller::from_id(0xFFFF), None);
    /// ```
    pub const fn from_id(id: u16) -> Option<Controller> {
        match id {
            0x9320 => Some(Controller::Ili9320),
            0x5408 => Some(Controller::Spfd5408),
            _ => None,
        }
    }
}

enum Step {
    Reg(u8, u16),
    DelayMs(u16),
}

const INIT: &[Step] = &[
    Step::Reg(0xE5, 0x8000),
    Step::Reg(0x00, 0x0001),
    Step::Reg(0x01, 0x0100),
    Step::Reg(0x02, 0x0700),
    Step::Reg(reg::ENTRY_MODE, ENTRY_MODE),
    Step::Reg(0x04, 0x0000),
    Step::Reg(0x08, 0x0202),
    Step::Reg(0x09, 0x0000),
    Step::Reg(0x0A, 0x0000),
    Step::Reg(0x0C, 0x0000),
    Step::Reg(0x0D, 0x0000),
    Step::Reg(0x0F, 0x0000),
    // power on sequence
    Step::Reg(0x10, 0x0000),
    Step::Reg(0x11, 0x0000),
    Step::Reg(0x12, 0x0000),
    Step::Reg(0x13, 0x0000),
    Step::DelayMs(200),
    Step::Reg(0x10, 0x17B0),
    Step::Reg(0x11, 0x0137),
    Step::DelayMs(50),
    Step::Reg(0x12, 0x0139),
    Step::DelayMs(50),
    Step::Reg(0x13, 0x1D00),
    Step::Reg(0x29, 0x0013),
    Step::DelayMs(50),
    Step::Reg(reg::GRAM_X, 0x0000),
    Step::Reg(reg::GRAM_Y, 0x0000),
    // gamma
    Step::Reg(0x30, 0x0007),
    Step::Reg(0x31, 0x0007),
    Step::Reg(0x32, 0x0007),
    Step::Reg(0x35, 0x0007),
    Step::Reg(0x36, 0x0007),
    Step::Reg(0x37, 0x0700),
    Step::Reg(0x38, 0x0700),
    Step::Reg(0x39, 0x0700),
    Step::Reg(0x3C, 0x0700),
    Step::Reg(0x3D, 0x1F00),
    Step::Reg(reg::WIN_X_START, 0x0000),
    Step::Reg(reg::WIN_X_END, WIDTH - 1),
    Step::Reg(reg::WIN_Y_START, 0x0000),
    Step::Reg(reg::WIN_Y_END, HEIGHT - 1),
    // gate scan
    Step::Reg(0x60, 0x2700),
    Step::Reg(0x61, 0x0001),
    Step::Reg(0x6A, 0x0000),
    // partial display off
    Step::Reg(0x80, 0x0000),
    Step::Reg(0x81, 0x0000),
    Step::Reg(0x82, 0x0000),
    Step::Reg(0x83, 0x0000),
    Step::Reg(0x84, 0x0000),
    Step::Reg(0x85, 0x0000),
    // panel interface
    Step::Reg(0x90, 0x0010),
    Step::Reg(0x92, 0x0000),
    Step::Reg(0x93, 0x0003),
    Step::Reg(0x95, 0x0110),
    Step::Reg(0x97, 0x0000),
    Step::Reg(0x98, 0x0000),
    Step::Reg(reg::DISPLAY_CTRL, DISPLAY_ON),
    Step::DelayMs(50),
];

/// LCD errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// SPI bus error.
    Spi(E),
    /// The device code is not a supported controller.
    UnknownController(u16),
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Spi(e)
    }
}

/// LCD driver.
#[derive(Debug)]
pub struct Lcd<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS, E> Lcd<SPI, CS>
where
    SPI: Write<u8, Error = E> + Transfer<u8, Error = E>,
    CS: OutputPin<Error = Infallible>,
{
    /// Create a new LCD driver.
    ///
    /// The controller is not initialized, call [`init`](Self::init) before
    /// drawing.
    pub fn new(spi: SPI, mut cs: CS) -> Self {
        let Ok(()) = cs.set_high();
        Lcd { spi, cs }
    }

    /// Free the SPI bus and the chip select.
    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn frame(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        let Ok(()) = self.cs.set_low();
        let ret: Result<(), E> = self.spi.write(bytes);
        let Ok(()) = self.cs.set_high();
        Ok(ret?)
    }

    fn set_index(&mut self, reg: u8) -> Result<(), Error<E>> {
        self.frame(&[START_INDEX, 0x00, reg])
    }

    /// Write a controller register.
    pub fn write_reg(&mut self, reg: u8, val: u16) -> Result<(), Error<E>> {
        self.set_index(reg)?;
        let [hi, lo] = val.to_be_bytes();
        self.frame(&[START_WRITE, hi, lo])
    }

    /// Read a controller register.
    pub fn read_reg(&mut self, reg: u8) -> Result<u16, Error<E>> {
        self.set_index(reg)?;
        // start byte, dummy byte, MSB, LSB
        let mut buf: [u8; 4] = [START_READ, 0xFF, 0xFF, 0xFF];
        let Ok(()) = self.cs.set_low();
        let ret: Result<(), E> = self.spi.transfer(&mut buf).map(|_| ());
        let Ok(()) = self.cs.set_high();
        ret?;
        Ok(u16::from_be_bytes([buf[2], buf[3]]))
    }

    /// Read the device code and match it to a controller.
    pub fn controller(&mut self) -> Result<Controller, Error<E>> {
        let id: u16 = self.read_reg(reg::ID)?;
        Controller::from_id(id).ok_or(Error::UnknownController(id))
    }

    /// Initialize the controller and turn the display on.
    ///
    /// The display is not cleared, GRAM content is random after power on.
    pub fn init<D: DelayMs<u16>>(&mut self, delay: &mut D) -> Result<Controller, Error<E>> {
        let controller: Controller = self.controller()?;
        for step in INIT {
            match *step {
                Step::Reg(reg, val) => self.write_reg(reg, val)?,
                Step::DelayMs(ms) => delay.delay_ms(ms),
            }
        }
        Ok(controller)
    }

    /// Turn the display on.
    pub fn display_on(&mut self) -> Result<(), Error<E>> {
        self.write_reg(reg::DISPLAY_CTRL, DISPLAY_ON)
    }

    /// Turn the display off, GRAM is retained.
    pub fn display_off(&mut self) -> Result<(), Error<E>> {
        self.write_reg(reg::DISPLAY_CTRL, DISPLAY_OFF)
    }

    fn set_cursor(&mut self, x: u16, y: u16) -> Result<(), Error<E>> {
        self.write_reg(reg::GRAM_X, x)?;
        self.write_reg(reg::GRAM_Y, y)
    }

    fn set_window(&mut self, x0: u16, y0: u16, x1: u16, y1: u16) -> Result<(), Error<E>> {
        self.write_reg(reg::WIN_X_START, x0)?;
        self.write_reg(reg::WIN_X_END, x1)?;
        self.write_reg(reg::WIN_Y_START, y0)?;
        self.write_reg(reg::WIN_Y_END, y1)
    }

    /// Stream `count` pixels of one colour to GRAM at the cursor.
    fn write_repeated(&mut self, color: u16, count: u32) -> Result<(), Error<E>> {
        self.set_index(reg::GRAM)?;
        let Ok(()) = self.cs.set_low();
        let ret: Result<(), E> = stream_repeated(&mut self.spi, color, count);
        let Ok(()) = self.cs.set_high();
        Ok(ret?)
    }
}

fn stream_repeated<SPI>(spi: &mut SPI, color: u16, count: u32) -> Result<(), SPI::Error>
where
    SPI: Write<u8>,
{
    const CHUNK: u32 = 16;
    let mut buf: [u8; 2 * CHUNK as usize] = [0; 2 * CHUNK as usize];
    for pair in buf.chunks_exact_mut(2) {
        pair.copy_from_slice(&color.to_be_bytes());
    }

    spi.write(&[START_WRITE])?;
    let mut remain: u32 = count;
    while remain > 0 {
        let n: u32 = remain.min(CHUNK);
        spi.write(&buf[..2 * n as usize])?;
        remain -= n;
    }
    Ok(())
}

impl<SPI, CS> OriginDimensions for Lcd<SPI, CS> {
    fn size(&self) -> Size {
        Size::new(u32::from(WIDTH), u32::from(HEIGHT))
    }
}

impl<SPI, CS, E> DrawTarget for Lcd<SPI, CS>
where
    SPI: Write<u8, Error = E> + Transfer<u8, Error = E>,
    CS: OutputPin<Error = Infallible>,
{
    type Color = Rgb565;
    type Error = Error<E>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let bounds: Rectangle = self.bounding_box();
        for Pixel(point, color) in pixels {
            if !bounds.contains(point) {
                continue;
            }
            self.set_cursor(point.x as u16, point.y as u16)?;
            self.write_reg(reg::GRAM, color.into_storage())?;
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area: Rectangle = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else {
            return Ok(());
        };
        let Point { x: x0, y: y0 } = area.top_left;

        self.set_window(x0 as u16, y0 as u16, bottom_right.x as u16, bottom_right.y as u16)?;
        self.set_cursor(x0 as u16, y0 as u16)?;
        self.write_repeated(color.into_storage(), area.size.width * area.size.height)?;
        self.set_window(0, 0, WIDTH - 1, HEIGHT - 1)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill_solid(&self.bounding_box(), color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_graphics::{
        mono_font::{MonoTextStyle, ascii::FONT_6X10},
        prelude::*,
        text::{Baseline, Text},
    };
    use std::{cell::RefCell, rc::Rc};

    const W: usize = WIDTH as usize;
    const H: usize = HEIGHT as usize;

    struct Panel {
        regs: [u16; 256],
        gram: Vec<u16>,
        selected: bool,
        frame: Vec<u8>,
        index: u8,
        x: u16,
        y: u16,
    }

    impl Panel {
        fn new(id: u16) -> Rc<RefCell<Panel>> {
            let mut regs: [u16; 256] = [0; 256];
            regs[usize::from(reg::ID)] = id;
            Rc::new(RefCell::new(Panel {
                regs,
                gram: vec![0; W * H],
                selected: false,
                frame: Vec::new(),
                index: 0,
                x: 0,
                y: 0,
            }))
        }

        fn reg(&self, reg: u8) -> u16 {
            self.regs[usize::from(reg)]
        }

        fn pixel(&self, x: usize, y: usize) -> u16 {
            self.gram[y * W + x]
        }

        fn gram_write(&mut self, val: u16) {
            self.gram[usize::from(self.y) * W + usize::from(self.x)] = val;
            if self.x >= self.reg(reg::WIN_X_END) {
                self.x = self.reg(reg::WIN_X_START);
                self.y += 1;
            } else {
                self.x += 1;
            }
        }

        fn end_frame(&mut self) {
            let frame: Vec<u8> = core::mem::take(&mut self.frame);
            match frame[0] {
                START_INDEX => {
                    assert_eq!(frame.len(), 3);
                    self.index = frame[2];
                }
                START_WRITE => {
                    for pair in frame[1..].chunks_exact(2) {
                        let val: u16 = u16::from_be_bytes([pair[0], pair[1]]);
                        match self.index {
                            reg::GRAM => self.gram_write(val),
                            reg::GRAM_X => self.x = val,
                            reg::GRAM_Y => self.y = val,
                            _ => (),
                        }
                        self.regs[usize::from(self.index)] = val;
                    }
                }
                START_READ => (),
                other => panic!("bad start byte {other:#04X}"),
            }
        }
    }

    struct FakeSpi(Rc<RefCell<Panel>>);
    struct FakeCs(Rc<RefCell<Panel>>);

    impl Write<u8> for FakeSpi {
        type Error = ();

        fn write(&mut self, words: &[u8]) -> Result<(), ()> {
            let mut panel = self.0.borrow_mut();
            assert!(panel.selected);
            panel.frame.extend_from_slice(words);
            Ok(())
        }
    }

    impl Transfer<u8> for FakeSpi {
        type Error = ();

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], ()> {
            let mut panel = self.0.borrow_mut();
            assert!(panel.selected);
            for word in words.iter_mut() {
                panel.frame.push(*word);
                let val: [u8; 2] = panel.reg(panel.index).to_be_bytes();
                *word = match (panel.frame[0], panel.frame.len()) {
                    (START_READ, 3) => val[0],
                    (START_READ, 4) => val[1],
                    _ => 0,
                };
            }
            Ok(words)
        }
    }

    impl OutputPin for FakeCs {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().selected = true;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            let mut panel = self.0.borrow_mut();
            if panel.selected && !panel.frame.is_empty() {
                panel.end_frame();
            }
            panel.selected = false;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeDelay {
        total_ms: u32,
    }

    impl DelayMs<u16> for FakeDelay {
        fn delay_ms(&mut self, ms: u16) {
            self.total_ms += u32::from(ms);
        }
    }

    fn lcd(id: u16) -> (Lcd<FakeSpi, FakeCs>, Rc<RefCell<Panel>>) {
        let panel = Panel::new(id);
        let lcd = Lcd::new(FakeSpi(panel.clone()), FakeCs(panel.clone()));
        (lcd, panel)
    }

    #[test]
    fn init_ili9320() {
        let (mut lcd, panel) = lcd(0x9320);
        let mut delay = FakeDelay::default();
        assert_eq!(lcd.init(&mut delay), Ok(Controller::Ili9320));
        assert_eq!(delay.total_ms, 400);

        let panel = panel.borrow();
        assert_eq!(panel.reg(reg::ENTRY_MODE), ENTRY_MODE);
        assert_eq!(panel.reg(reg::WIN_X_END), WIDTH - 1);
        assert_eq!(panel.reg(reg::WIN_Y_END), HEIGHT - 1);
        assert_eq!(panel.reg(reg::DISPLAY_CTRL), DISPLAY_ON);
    }

    #[test]
    fn init_unknown_controller() {
        let (mut lcd, panel) = lcd(0x1234);
        let mut delay = FakeDelay::default();
        assert_eq!(lcd.init(&mut delay), Err(Error::UnknownController(0x1234)));
        assert_eq!(delay.total_ms, 0);
        assert_eq!(panel.borrow().reg(reg::DISPLAY_CTRL), 0);
    }

    #[test]
    fn display_off_on() {
        let (mut lcd, panel) = lcd(0x5408);
        lcd.display_on().unwrap();
        assert_eq!(panel.borrow().reg(reg::DISPLAY_CTRL), DISPLAY_ON);
        lcd.display_off().unwrap();
        assert_eq!(panel.borrow().reg(reg::DISPLAY_CTRL), DISPLAY_OFF);
    }

    #[test]
    fn fill_clipped_to_panel() {
        let (mut lcd, panel) = lcd(0x9320);
        let red: u16 = Rgb565::RED.into_storage();
        lcd.fill_solid(&Rectangle::new(Point::new(230, 310), Size::new(20, 20)), Rgb565::RED)
            .unwrap();

        let panel = panel.borrow();
        let painted: usize = panel.gram.iter().filter(|px| **px == red).count();
        assert_eq!(painted, 100);
        assert_eq!(panel.pixel(230, 310), red);
        assert_eq!(panel.pixel(239, 319), red);
        assert_eq!(panel.pixel(229, 319), 0);
        // window restored to the full panel
        assert_eq!(panel.reg(reg::WIN_X_START), 0);
        assert_eq!(panel.reg(reg::WIN_X_END), WIDTH - 1);
        assert_eq!(panel.reg(reg::WIN_Y_START), 0);
        assert_eq!(panel.reg(reg::WIN_Y_END), HEIGHT - 1);
    }

    #[test]
    fn fill_outside_panel() {
        let (mut lcd, panel) = lcd(0x9320);
        lcd.fill_solid(&Rectangle::new(Point::new(-30, 0), Size::new(20, 20)), Rgb565::RED)
            .unwrap();
        assert!(panel.borrow().frame.is_empty());
        assert!(panel.borrow().gram.iter().all(|px| *px == 0));
    }

    #[test]
    fn clear_fills_gram() {
        let (mut lcd, panel) = lcd(0x9320);
        lcd.clear(Rgb565::BLUE).unwrap();
        let blue: u16 = Rgb565::BLUE.into_storage();
        assert!(panel.borrow().gram.iter().all(|px| *px == blue));
    }

    #[test]
    fn print_text() {
        let (mut lcd, panel) = lcd(0x9320);
        let style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
        Text::with_baseline("Hi", Point::new(10, 20), style, Baseline::Top)
            .draw(&mut lcd)
            .unwrap();

        let white: u16 = Rgb565::WHITE.into_storage();
        let panel = panel.borrow();
        let mut lit: usize = 0;
        for y in 0..H {
            for x in 0..W {
                if panel.pixel(x, y) == white {
                    assert!((10..22).contains(&x) && (20..30).contains(&y), "({x}, {y})");
                    lit += 1;
                }
            }
        }
        assert!(lit > 10);
    }

    #[test]
    fn pixels_off_panel_skipped() {
        let (mut lcd, panel) = lcd(0x9320);
        Pixel(Point::new(-1, 5), Rgb565::GREEN).draw(&mut lcd).unwrap();
        Pixel(Point::new(5, 320), Rgb565::GREEN).draw(&mut lcd).unwrap();
        Pixel(Point::new(239, 0), Rgb565::GREEN).draw(&mut lcd).unwrap();

        let green: u16 = Rgb565::GREEN.into_storage();
        let panel = panel.borrow();
        assert_eq!(panel.gram.iter().filter(|px| **px == green).count(), 1);
        assert_eq!(panel.pixel(239, 0), green);
    }
}
