//! Serial peripheral interface
#![forbid(missing_docs)]

use crate::{gpio, pac, rcc};

use core::ptr::{addr_of, read_volatile, write_volatile};

pub use embedded_hal::spi::{MODE_0, MODE_1, MODE_2, MODE_3, Mode, Phase, Polarity};

/// SPI errors
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Frame format error
    Framing,
    /// CRC check error
    Crc,
    /// NSS mode fault
    ModeFault,
    /// RX FIFO overrun
    Overrun,
}

/// Baud rate divider of the APB clock.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudDiv {
    /// f<sub>PCLK</sub> / 2
    Div2 = 0b000,
    /// f<sub>PCLK</sub> / 4
    Div4 = 0b001,
    /// f<sub>PCLK</sub> / 8
    Div8 = 0b010,
    /// f<sub>PCLK</sub> / 16
    Div16 = 0b011,
    /// f<sub>PCLK</sub> / 32
    Div32 = 0b100,
    /// f<sub>PCLK</sub> / 64
    Div64 = 0b101,
    /// f<sub>PCLK</sub> / 128
    Div128 = 0b110,
    /// f<sub>PCLK</sub> / 256
    Div256 = 0b111,
}

impl BaudDiv {
    const ALL: [BaudDiv; 8] = [
        BaudDiv::Div2,
        BaudDiv::Div4,
        BaudDiv::Div8,
        BaudDiv::Div16,
        BaudDiv::Div32,
        BaudDiv::Div64,
        BaudDiv::Div128,
        BaudDiv::Div256,
    ];

    /// Division factor.
    pub const fn div(self) -> u32 {
        2 << (self as u32)
    }

    /// Smallest divider that keeps SCK at or below `max_hz`.
    ///
    /// Returns `None` if even the largest divider is too fast.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::spi::BaudDiv;
    ///
    /// assert_eq!(BaudDiv::for_hz(72_000_000, 10_000_000), Some(BaudDiv::Div8));
    /// assert_eq!(BaudDiv::for_hz(72_000_000, 36_000_000), Some(BaudDiv::Div2));
    /// assert_eq!(BaudDiv::for_hz(72_000_000, 1_000), None);
    /// ```
    pub const fn for_hz(pclk_hz: u32, max_hz: u32) -> Option<BaudDiv> {
        let mut idx: usize = 0;
        while idx < Self::ALL.len() {
            if pclk_hz / Self::ALL[idx].div() <= max_hz {
                return Some(Self::ALL[idx]);
            }
            idx += 1;
        }
        None
    }
}

const CR1_CPHA: u32 = 1 << 0;
const CR1_CPOL: u32 = 1 << 1;
const CR1_MSTR: u32 = 1 << 2;
const CR1_BR_SHIFT: u32 = 3;
const CR1_BR_MASK: u32 = 0b111 << CR1_BR_SHIFT;
const CR1_SPE: u32 = 1 << 6;
const CR1_SSI: u32 = 1 << 8;
const CR1_SSM: u32 = 1 << 9;

// 8-bit data size, RXNE on one byte
const CR2_DS_8BIT: u32 = 0b0111 << 8;
const CR2_FRXTH: u32 = 1 << 12;

const SR_RXNE: u32 = 1 << 0;
const SR_TXE: u32 = 1 << 1;
const SR_CRCERR: u32 = 1 << 4;
const SR_MODF: u32 = 1 << 5;
const SR_OVR: u32 = 1 << 6;
const SR_BSY: u32 = 1 << 7;
const SR_FRE: u32 = 1 << 8;

/// `CR1` value for a master with software slave management.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::spi::{cr1, BaudDiv, MODE_3};
///
/// assert_eq!(cr1(MODE_3, BaudDiv::Div8), 0x0357);
/// ```
pub const fn cr1(mode: Mode, div: BaudDiv) -> u32 {
    let cpha: u32 = match mode.phase {
        Phase::CaptureOnFirstTransition => 0,
        Phase::CaptureOnSecondTransition => CR1_CPHA,
    };
    let cpol: u32 = match mode.polarity {
        Polarity::IdleLow => 0,
        Polarity::IdleHigh => CR1_CPOL,
    };
    CR1_SSM | CR1_SSI | CR1_SPE | ((div as u32) << CR1_BR_SHIFT) | CR1_MSTR | cpol | cpha
}

macro_rules! spi {
    (
        $Spi:ident, $SPI:ident, $apb:ident, $EN:ident,
        $Mosi:ident, $Miso:ident, $Sck:ident,
        [$mosi:ident, $miso:ident, $sck:ident], $Port:ident, $GPIO:ident
    ) => {
        paste::paste! {
            #[doc = $SPI " driver"]
            #[derive(Debug)]
            pub struct $Spi<MOSI, MISO, SCK> {
                spi: pac::$SPI,
                mosi: MOSI,
                miso: MISO,
                sck: SCK,
            }

            impl<MOSI, MISO, SCK> $Spi<MOSI, MISO, SCK>
            where
                MOSI: gpio::sealed::$Mosi,
                MISO: gpio::sealed::$Miso,
                SCK: gpio::sealed::$Sck,
            {
                #[doc = "Create a new `" $Spi "` master."]
                ///
                #[doc = "This will enable clocks and reset the " $SPI " peripheral."]
                ///
                /// # Example
                ///
                /// ```no_run
                /// use stm32f3xx_hal::{
                #[doc = "    gpio::{pins, " $Port "},"]
                ///     pac,
                #[doc = "    spi::{BaudDiv, " $Spi ", MODE_0},"]
                /// };
                ///
                /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
                ///
                #[doc = "let port: " $Port " = " $Port "::split(dp." $GPIO ", &mut dp.RCC);"]
                #[doc = "let spi: " $Spi "<pins::" $mosi ", pins::" $miso ", pins::" $sck "> = " $Spi "::new("]
                #[doc = "    dp." $SPI ","]
                #[doc = "    port." [<$mosi:lower>] ","]
                #[doc = "    port." [<$miso:lower>] ","]
                #[doc = "    port." [<$sck:lower>] ","]
                ///     MODE_0,
                ///     BaudDiv::Div8,
                ///     &mut dp.RCC,
                /// );
                /// ```
                pub fn new(
                    spi: pac::$SPI,
                    mut mosi: MOSI,
                    mut miso: MISO,
                    mut sck: SCK,
                    mode: Mode,
                    div: BaudDiv,
                    rcc: &mut pac::RCC,
                ) -> $Spi<MOSI, MISO, SCK> {
                    Self::enable_clock(rcc);
                    rcc::en::[<$apb _reset>](rcc, rcc::en::$EN);

                    cortex_m::interrupt::free(|cs| {
                        mosi.[<set_ $Mosi:snake _af>](cs);
                        miso.[<set_ $Miso:snake _af>](cs);
                        sck.[<set_ $Sck:snake _af>](cs);
                    });

                    spi.cr2.write(|w| unsafe { w.bits(CR2_DS_8BIT | CR2_FRXTH) });
                    spi.cr1.write(|w| unsafe { w.bits(cr1(mode, div)) });

                    $Spi {
                        spi,
                        mosi,
                        miso,
                        sck,
                    }
                }

                /// Free the SPI peripheral and the GPIOs from the driver.
                pub fn free(self) -> (pac::$SPI, MOSI, MISO, SCK) {
                    clear_bits!(self.spi.cr1, CR1_SPE);
                    (self.spi, self.mosi, self.miso, self.sck)
                }

                #[doc = concat!("Disable the ", stringify!($SPI), " clock")]
                ///
                /// # Safety
                ///
                /// 1. You cannot use the SPI bus while the clock is disabled.
                pub unsafe fn disable_clock(rcc: &mut pac::RCC) {
                    rcc::en::[<$apb _disable>](rcc, rcc::en::$EN)
                }

                #[doc = concat!("Enable the ", stringify!($SPI), " clock")]
                pub fn enable_clock(rcc: &mut pac::RCC) {
                    rcc::en::$apb(rcc, rcc::en::$EN)
                }

                /// Change the SCK divider.
                ///
                /// This waits for the current frame to complete.
                pub fn set_baud_div(&mut self, div: BaudDiv) {
                    while self.is_busy() {}
                    clear_bits!(self.spi.cr1, CR1_SPE);
                    write_bits!(self.spi.cr1, CR1_BR_MASK, (div as u32) << CR1_BR_SHIFT);
                    set_bits!(self.spi.cr1, CR1_SPE);
                }

                /// Returns `true` if the bus is busy.
                pub fn is_busy(&self) -> bool {
                    self.spi.sr.read().bits() & SR_BSY != 0
                }

                #[inline(always)]
                fn status(&self) -> Result<u32, Error> {
                    status(self.spi.sr.read().bits())
                }

                // 8-bit access, a 16-bit access would pack two frames
                #[inline(always)]
                fn dr() -> *mut u8 {
                    unsafe { addr_of!((*pac::$SPI::ptr()).dr) }.cast::<u8>().cast_mut()
                }

                fn write_word(&mut self, word: u8) -> Result<(), Error> {
                    while self.status()? & SR_TXE == 0 {}
                    unsafe { write_volatile(Self::dr(), word) };
                    Ok(())
                }

                fn read_word(&mut self) -> Result<u8, Error> {
                    while self.status()? & SR_RXNE == 0 {}
                    Ok(unsafe { read_volatile(Self::dr()) })
                }
            }

            impl<MOSI, MISO, SCK> embedded_hal::blocking::spi::Transfer<u8>
                for $Spi<MOSI, MISO, SCK>
            where
                MOSI: gpio::sealed::$Mosi,
                MISO: gpio::sealed::$Miso,
                SCK: gpio::sealed::$Sck,
            {
                type Error = Error;

                fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
                    for word in words.iter_mut() {
                        self.write_word(*word)?;
                        *word = self.read_word()?;
                    }
                    Ok(words)
                }
            }

            impl<MOSI, MISO, SCK> embedded_hal::blocking::spi::Write<u8> for $Spi<MOSI, MISO, SCK>
            where
                MOSI: gpio::sealed::$Mosi,
                MISO: gpio::sealed::$Miso,
                SCK: gpio::sealed::$Sck,
            {
                type Error = Error;

                fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
                    for word in words.iter() {
                        self.write_word(*word)?;
                        let _: u8 = self.read_word()?;
                    }
                    Ok(())
                }
            }
        }
    };
}

/// Decode the error flags of a status register value.
const fn status(sr: u32) -> Result<u32, Error> {
    if sr & SR_OVR != 0 {
        Err(Error::Overrun)
    } else if sr & SR_FRE != 0 {
        Err(Error::Framing)
    } else if sr & SR_MODF != 0 {
        Err(Error::ModeFault)
    } else if sr & SR_CRCERR != 0 {
        Err(Error::Crc)
    } else {
        Ok(sr)
    }
}

spi!(Spi1, SPI1, apb2, APB2_SPI1, Spi1Mosi, Spi1Miso, Spi1Sck, [A7, A6, A5], PortA, GPIOA);
#[cfg(feature = "stm32f373")]
spi!(Spi3, SPI3, apb1, APB1_SPI3, Spi3Mosi, Spi3Miso, Spi3Sck, [C12, C11, C10], PortC, GPIOC);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn div_factor() {
        assert_eq!(BaudDiv::Div2.div(), 2);
        assert_eq!(BaudDiv::Div256.div(), 256);
    }

    #[test]
    fn status_flags() {
        assert_eq!(status(SR_TXE | SR_RXNE), Ok(SR_TXE | SR_RXNE));
        assert_eq!(status(SR_TXE | SR_OVR), Err(Error::Overrun));
        // overrun is reported ahead of the other faults
        assert_eq!(status(SR_OVR | SR_FRE | SR_MODF), Err(Error::Overrun));
        assert_eq!(status(SR_FRE | SR_MODF), Err(Error::Framing));
        assert_eq!(status(SR_CRCERR), Err(Error::Crc));
    }

    #[test]
    fn cr1_baud_field() {
        assert_eq!(cr1(MODE_0, BaudDiv::Div256) & CR1_BR_MASK, CR1_BR_MASK);
        assert_eq!(cr1(MODE_3, BaudDiv::Div2) & CR1_BR_MASK, 0);
    }

    #[test]
    fn cr1_mode0() {
        assert_eq!(cr1(MODE_0, BaudDiv::Div2), CR1_SSM | CR1_SSI | CR1_SPE | CR1_MSTR);
    }
}
