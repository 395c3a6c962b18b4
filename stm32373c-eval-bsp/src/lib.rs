//! STM32373C-EVAL board support package.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod eeprom;
pub mod lcd;
pub mod led;
pub mod lm75;
pub mod pb;
pub mod sdcard;

pub use stm32f3xx_hal as hal;

use core::cell::RefCell;

use hal::{
    cortex_m::interrupt::CriticalSection,
    embedded_hal::blocking::spi::{Transfer, Write},
    gpio::{self, Output, OutputArgs, PinState, pins},
    i2c::{self, I2c2},
    pac,
    spi::{BaudDiv, MODE_3, Spi3},
};

/// I2C2 bus of the LM75 and the EEPROM.
pub type I2c = I2c2<(pins::A9, pins::A10)>;

/// Create the on-board I2C bus.
///
/// The LM75 and the EEPROM are on I2C2, SCL on PA9 and SDA on PA10,
/// with pull-ups on the board.
///
/// # Example
///
/// ```no_run
/// use stm32373c_eval_bsp::{
///     hal::{cortex_m, gpio::PortA, pac},
///     lm75::{self, Lm75},
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
///
/// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
/// let i2c = cortex_m::interrupt::free(|cs| {
///     stm32373c_eval_bsp::new_i2c(dp.I2C2, gpioa.a9, gpioa.a10, &mut dp.RCC, cs)
/// })
/// .unwrap();
/// let mut lm75 = Lm75::new(i2c, lm75::DEFAULT_ADDR);
/// ```
pub fn new_i2c(
    i2c2: pac::I2C2,
    scl: pins::A9,
    sda: pins::A10,
    rcc: &mut pac::RCC,
    cs: &CriticalSection,
) -> Result<I2c, i2c::TimingError> {
    I2c2::new(i2c2, (scl, sda), 100_000, rcc, false, cs)
}

/// SPI3 bus of the LCD and the microSD socket.
pub type Spi = Spi3<pins::C12, pins::C11, pins::C10>;

/// LCD chip select.
pub type LcdCs = Output<pins::D2>;

/// microSD chip select.
pub type SdCs = Output<pins::E2>;

const CS_ARGS: OutputArgs = OutputArgs {
    speed: gpio::Speed::High,
    level: PinState::High,
    ot: gpio::OutputType::PushPull,
    pull: gpio::Pull::None,
};

/// Create the SPI bus shared by the LCD and the microSD socket.
///
/// SPI3 runs in mode 3, MOSI on PC12, MISO on PC11 and SCK on PC10.
/// SPI3 is clocked from PCLK1, [`BaudDiv::Div128`] keeps SCK below the
/// 400 kHz card identification limit with PCLK1 at 36 MHz.
pub fn new_spi(
    spi3: pac::SPI3,
    mosi: pins::C12,
    miso: pins::C11,
    sck: pins::C10,
    div: BaudDiv,
    rcc: &mut pac::RCC,
) -> Spi {
    Spi3::new(spi3, mosi, miso, sck, MODE_3, div, rcc)
}

/// LCD chip select, PD2, initially deselected.
pub fn lcd_cs(d2: pins::D2, cs: &CriticalSection) -> LcdCs {
    Output::new(d2, &CS_ARGS, cs)
}

/// microSD chip select, PE2, initially deselected.
pub fn sd_cs(e2: pins::E2, cs: &CriticalSection) -> SdCs {
    Output::new(e2, &CS_ARGS, cs)
}

/// Handle to a bus shared by drivers running in the same context.
///
/// The LCD and the microSD card each take a handle to the same SPI3 bus.
/// Every transfer borrows the bus for its duration only, handles must not
/// be used from interrupt handlers.
///
/// # Example
///
/// ```no_run
/// use core::cell::RefCell;
/// use stm32373c_eval_bsp::{
///     hal::{cortex_m, gpio::{PortC, PortD, PortE}, pac, spi::BaudDiv},
///     lcd::Lcd,
///     sdcard::SdCard,
///     SharedBus, Spi,
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
///
/// let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);
/// let gpiod: PortD = PortD::split(dp.GPIOD, &mut dp.RCC);
/// let gpioe: PortE = PortE::split(dp.GPIOE, &mut dp.RCC);
/// let (lcd_cs, sd_cs) = cortex_m::interrupt::free(|cs| {
///     (
///         stm32373c_eval_bsp::lcd_cs(gpiod.d2, cs),
///         stm32373c_eval_bsp::sd_cs(gpioe.e2, cs),
///     )
/// });
/// let bus: RefCell<Spi> = RefCell::new(stm32373c_eval_bsp::new_spi(
///     dp.SPI3,
///     gpioc.c12,
///     gpioc.c11,
///     gpioc.c10,
///     BaudDiv::Div128,
///     &mut dp.RCC,
/// ));
///
/// let mut card = SdCard::new(SharedBus::new(&bus), sd_cs);
/// let mut lcd = Lcd::new(SharedBus::new(&bus), lcd_cs);
/// ```
#[derive(Debug)]
pub struct SharedBus<'a, SPI> {
    bus: &'a RefCell<SPI>,
}

impl<'a, SPI> SharedBus<'a, SPI> {
    /// Create a new handle to `bus`.
    pub const fn new(bus: &'a RefCell<SPI>) -> Self {
        SharedBus { bus }
    }
}

impl<SPI: Write<u8>> Write<u8> for SharedBus<'_, SPI> {
    type Error = SPI::Error;

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.bus.borrow_mut().write(words)
    }
}

impl<SPI: Transfer<u8>> Transfer<u8> for SharedBus<'_, SPI> {
    type Error = SPI::Error;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        self.bus.borrow_mut().transfer(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Loopback {
        sent: Vec<u8>,
    }

    impl Write<u8> for Loopback {
        type Error = ();

        fn write(&mut self, words: &[u8]) -> Result<(), ()> {
            self.sent.extend_from_slice(words);
            Ok(())
        }
    }

    impl Transfer<u8> for Loopback {
        type Error = ();

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], ()> {
            self.sent.extend_from_slice(words);
            for word in words.iter_mut() {
                *word = !*word;
            }
            Ok(words)
        }
    }

    #[test]
    fn shared_bus_handles() {
        let bus: RefCell<Loopback> = RefCell::new(Loopback::default());
        let mut a = SharedBus::new(&bus);
        let mut b = SharedBus::new(&bus);

        a.write(&[1, 2]).unwrap();
        let mut buf: [u8; 2] = [0x0F, 0xF0];
        assert_eq!(b.transfer(&mut buf), Ok(&[0xF0, 0x0F][..]));
        a.write(&[3]).unwrap();

        assert_eq!(bus.into_inner().sent, [1, 2, 0x0F, 0xF0, 3]);
    }
}
