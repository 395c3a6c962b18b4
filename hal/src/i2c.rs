//! Inter-Integrated Circuit (I2C) bus
//!
//! Master mode only, 7-bit addresses.
//! Transfers longer than 255 bytes are split with the `RELOAD` mechanism.

use crate::{
    embedded_hal::blocking::i2c::{Read, Write, WriteRead},
    gpio::{OutputType, Pull},
    pac::{self, RCC},
    rcc::{self, HSI_HZ, sysclk_hz},
};

use cortex_m::interrupt::CriticalSection;

/// I2C error
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Arbitration loss
    Arbitration,
    /// Bus error
    Bus,
    /// Bus busy
    Busy,
    /// Not Acknowledge received
    Nack,
}

/// Timing calculation error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingError {
    /// Kernel clock frequency.
    pub clock_hz: u32,
    /// Requested bus frequency.
    pub freq_hz: u32,
}

/// Maximum bus frequency, fast-mode plus.
pub const MAX_FREQ_HZ: u32 = 1_000_000;

const CR1_PE: u32 = 1 << 0;

const CR2_RD_WRN: u32 = 1 << 10;
const CR2_START: u32 = 1 << 13;
const CR2_NBYTES_SHIFT: u32 = 16;
const CR2_RELOAD: u32 = 1 << 24;
const CR2_AUTOEND: u32 = 1 << 25;

const ISR_TXIS: u32 = 1 << 1;
const ISR_RXNE: u32 = 1 << 2;
const ISR_NACKF: u32 = 1 << 4;
const ISR_STOPF: u32 = 1 << 5;
const ISR_TC: u32 = 1 << 6;
const ISR_TCR: u32 = 1 << 7;
const ISR_BERR: u32 = 1 << 8;
const ISR_ARLO: u32 = 1 << 9;
const ISR_BUSY: u32 = 1 << 15;

const ICR_NACKCF: u32 = 1 << 4;
const ICR_STOPCF: u32 = 1 << 5;
const ICR_BERRCF: u32 = 1 << 8;
const ICR_ARLOCF: u32 = 1 << 9;

const CHUNK: usize = 0xFF;

/// End of a transfer chunk.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum End {
    /// More chunks follow in the same direction.
    Reload,
    /// Automatic STOP after the chunk.
    Stop,
    /// Software end, a repeated START follows.
    Software,
}

/// `CR2` value for one chunk of a transfer.
const fn cr2(addr: u8, read: bool, nbytes: usize, start: bool, end: End) -> u32 {
    let mut cr2: u32 = ((addr as u32) << 1) | ((nbytes as u32) << CR2_NBYTES_SHIFT);
    if read {
        cr2 |= CR2_RD_WRN;
    }
    if start {
        cr2 |= CR2_START;
    }
    match end {
        End::Reload => cr2 | CR2_RELOAD,
        End::Stop => cr2 | CR2_AUTOEND,
        End::Software => cr2,
    }
}

/// `TIMINGR` value for a bus frequency.
///
/// Standard mode up to 100 kHz uses SCLL = SCLH, fast mode and fast mode
/// plus use SCLL + 1 = 2 × (SCLH + 1).
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::i2c::timingr;
///
/// // 8 MHz HSI kernel clock
/// assert_eq!(timingr(8_000_000, 100_000), Ok(0x0094_2525));
/// assert_eq!(timingr(8_000_000, 400_000), Ok(0x0031_0409));
/// assert!(timingr(8_000_000, 2_000_000).is_err());
/// ```
pub fn timingr(clock_hz: u32, freq_hz: u32) -> Result<u32, TimingError> {
    let err = TimingError { clock_hz, freq_hz };
    if freq_hz == 0 || freq_hz > MAX_FREQ_HZ {
        return Err(err);
    }
    // t_SCL ~= t_SYNC1 + t_SYNC2 + t_SCLL + t_SCLH
    // with t_SYNC1 + t_SYNC2 > 4 * t_I2CCLK
    let ratio: u32 = (clock_hz / freq_hz).checked_sub(4).ok_or(err)?;
    let fast: bool = freq_hz > 100_000;
    let min_presc: u32 = if fast { ratio / 387 } else { ratio / 514 };

    // the data setup and hold delays may need a larger prescaler than SCL
    for presc in min_presc..=0xF {
        let (scll, sclh, sdadel, scldel): (u32, u32, u32, u32) = if fast {
            let sclh: u32 = (ratio / (presc + 1)).checked_sub(3).ok_or(err)? / 3;
            let scll: u32 = 2 * (sclh + 1) - 1;
            if freq_hz > 400_000 {
                (scll, sclh, 0, (clock_hz / 4_000_000 / (presc + 1)).saturating_sub(1))
            } else {
                (
                    scll,
                    sclh,
                    clock_hz / 8_000_000 / (presc + 1),
                    (clock_hz / 2_000_000 / (presc + 1)).saturating_sub(1),
                )
            }
        } else {
            let sclh: u32 = (ratio / (presc + 1)).checked_sub(2).ok_or(err)? / 2;
            (
                sclh,
                sclh,
                clock_hz / 2_000_000 / (presc + 1),
                (clock_hz / 800_000 / (presc + 1)).saturating_sub(1),
            )
        };
        if scldel <= 0xF && sdadel <= 0xF && scll <= 0xFF && sclh <= 0xFF {
            return Ok((presc << 28) | (scldel << 20) | (sdadel << 16) | (sclh << 8) | scll);
        }
    }
    Err(err)
}

fn wait(i2c: &pac::i2c1::RegisterBlock, flag: u32) -> Result<(), Error> {
    loop {
        let isr: u32 = i2c.isr.read().bits();
        if isr & ISR_ARLO != 0 {
            i2c.icr.write(|w| unsafe { w.bits(ICR_ARLOCF) });
            return Err(Error::Arbitration);
        } else if isr & ISR_BERR != 0 {
            i2c.icr.write(|w| unsafe { w.bits(ICR_BERRCF) });
            return Err(Error::Bus);
        } else if isr & ISR_NACKF != 0 {
            // a NACK is followed by an automatic STOP
            while i2c.isr.read().bits() & ISR_STOPF == 0 {}
            i2c.icr.write(|w| unsafe { w.bits(ICR_NACKCF | ICR_STOPCF) });
            return Err(Error::Nack);
        } else if isr & flag != 0 {
            return Ok(());
        }
    }
}

fn check_idle(i2c: &pac::i2c1::RegisterBlock) -> Result<(), Error> {
    if i2c.isr.read().bits() & ISR_BUSY != 0 {
        Err(Error::Busy)
    } else {
        Ok(())
    }
}

fn chunk_end(idx: usize, last: usize, end: End) -> End {
    if idx == last { end } else { End::Reload }
}

fn send(i2c: &pac::i2c1::RegisterBlock, addr: u8, bytes: &[u8], end: End) -> Result<(), Error> {
    if bytes.is_empty() {
        i2c.cr2
            .write(|w| unsafe { w.bits(cr2(addr, false, 0, true, end)) });
        return Ok(());
    }
    let last: usize = (bytes.len() - 1) / CHUNK;
    for (idx, chunk) in bytes.chunks(CHUNK).enumerate() {
        let cr2: u32 = cr2(addr, false, chunk.len(), idx == 0, chunk_end(idx, last, end));
        i2c.cr2.write(|w| unsafe { w.bits(cr2) });
        for byte in chunk {
            // START has been ACKed or the last byte went through
            wait(i2c, ISR_TXIS)?;
            i2c.txdr.write(|w| unsafe { w.bits(u32::from(*byte)) });
        }
        if idx != last {
            wait(i2c, ISR_TCR)?;
        }
    }
    Ok(())
}

fn receive(i2c: &pac::i2c1::RegisterBlock, addr: u8, buf: &mut [u8]) -> Result<(), Error> {
    let last: usize = buf.len().saturating_sub(1) / CHUNK;
    for (idx, chunk) in buf.chunks_mut(CHUNK).enumerate() {
        let cr2: u32 = cr2(addr, true, chunk.len(), idx == 0, chunk_end(idx, last, End::Stop));
        i2c.cr2.write(|w| unsafe { w.bits(cr2) });
        for byte in chunk.iter_mut() {
            wait(i2c, ISR_RXNE)?;
            *byte = i2c.rxdr.read().bits() as u8;
        }
        if idx != last {
            wait(i2c, ISR_TCR)?;
        }
    }
    Ok(())
}

fn finish(i2c: &pac::i2c1::RegisterBlock) -> Result<(), Error> {
    wait(i2c, ISR_STOPF)?;
    i2c.icr.write(|w| unsafe { w.bits(ICR_STOPCF) });
    Ok(())
}

fn read(i2c: &pac::i2c1::RegisterBlock, addr: u8, buf: &mut [u8]) -> Result<(), Error> {
    debug_assert!(!buf.is_empty());
    check_idle(i2c)?;
    receive(i2c, addr, buf)?;
    finish(i2c)
}

fn write(i2c: &pac::i2c1::RegisterBlock, addr: u8, bytes: &[u8]) -> Result<(), Error> {
    check_idle(i2c)?;
    send(i2c, addr, bytes, End::Stop)?;
    finish(i2c)
}

fn write_read(
    i2c: &pac::i2c1::RegisterBlock,
    addr: u8,
    bytes: &[u8],
    buf: &mut [u8],
) -> Result<(), Error> {
    debug_assert!(!bytes.is_empty() && !buf.is_empty());
    check_idle(i2c)?;
    send(i2c, addr, bytes, End::Software)?;
    wait(i2c, ISR_TC)?;
    // repeated START
    receive(i2c, addr, buf)?;
    finish(i2c)
}

/// I2C kernel clock source.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Clk {
    /// HSI 8 MHz, the reset value.
    Hsi,
    /// System clock.
    Sysclk,
}

macro_rules! i2c {
    ($I2cX:ident, $I2CX:ident, $en:expr, $sw:expr, $Scl:ident, $Sda:ident, $scl_af:ident, $sda_af:ident) => {
        #[doc = concat!(stringify!($I2CX), " peripheral operating in master mode")]
        #[derive(Debug)]
        pub struct $I2cX<PINS> {
            base: pac::$I2CX,
            pins: PINS,
        }

        impl<SCL, SDA> $I2cX<(SCL, SDA)>
        where
            SCL: crate::gpio::sealed::$Scl + crate::gpio::sealed::PinOps,
            SDA: crate::gpio::sealed::$Sda + crate::gpio::sealed::PinOps,
        {
            /// Configure the I2C peripheral as a master with the indicated
            /// frequency.
            ///
            /// This will enable clocks and reset the peripheral.
            /// The pins are set to open-drain with optional internal pull-ups.
            ///
            /// # Errors
            ///
            /// * [`TimingError`] if the frequency cannot be reached from the
            ///   kernel clock.
            pub fn new(
                i2c: pac::$I2CX,
                mut pins: (SCL, SDA),
                freq_hz: u32,
                rcc: &mut RCC,
                pullup: bool,
                cs: &CriticalSection,
            ) -> Result<Self, TimingError> {
                let timingr: u32 = timingr(Self::clock_hz(rcc), freq_hz)?;

                rcc::en::apb1(rcc, $en);
                rcc::en::apb1_reset(rcc, $en);

                let pull: Pull = if pullup { Pull::Up } else { Pull::None };
                unsafe {
                    pins.0.set_output_type(cs, OutputType::OpenDrain);
                    pins.1.set_output_type(cs, OutputType::OpenDrain);
                    pins.0.set_pull(cs, pull);
                    pins.1.set_pull(cs, pull);
                }
                pins.0.$scl_af(cs);
                pins.1.$sda_af(cs);

                i2c.timingr.write(|w| unsafe { w.bits(timingr) });
                i2c.cr1.write(|w| unsafe { w.bits(CR1_PE) });

                Ok(Self { base: i2c, pins })
            }

            /// Kernel clock frequency in hertz.
            pub fn clock_hz(rcc: &RCC) -> u32 {
                match Self::clk(rcc) {
                    Clk::Hsi => HSI_HZ,
                    Clk::Sysclk => sysclk_hz(rcc),
                }
            }

            /// Kernel clock source.
            pub fn clk(rcc: &RCC) -> Clk {
                if rcc.cfgr3.read().bits() & $sw != 0 {
                    Clk::Sysclk
                } else {
                    Clk::Hsi
                }
            }

            /// Select the kernel clock source.
            ///
            /// This must be called before [`new`](Self::new).
            pub fn set_clk(rcc: &mut RCC, clk: Clk) {
                match clk {
                    Clk::Hsi => clear_bits!(rcc.cfgr3, $sw),
                    Clk::Sysclk => set_bits!(rcc.cfgr3, $sw),
                }
            }

            /// Releases the I2C peripheral and associated pins
            pub fn free(self) -> (pac::$I2CX, (SCL, SDA)) {
                self.base.cr1.write(|w| unsafe { w.bits(0) });
                (self.base, self.pins)
            }
        }

        impl<PINS> Read for $I2cX<PINS> {
            type Error = Error;

            fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
                read(&self.base, addr, buffer)
            }
        }

        impl<PINS> Write for $I2cX<PINS> {
            type Error = Error;

            fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Self::Error> {
                write(&self.base, addr, bytes)
            }
        }

        impl<PINS> WriteRead for $I2cX<PINS> {
            type Error = Error;

            fn write_read(
                &mut self,
                addr: u8,
                bytes: &[u8],
                buffer: &mut [u8],
            ) -> Result<(), Self::Error> {
                write_read(&self.base, addr, bytes, buffer)
            }
        }
    };
}

i2c!(
    I2c1,
    I2C1,
    rcc::en::APB1_I2C1,
    1 << 4,
    I2c1Scl,
    I2c1Sda,
    set_i2c1_scl_af,
    set_i2c1_sda_af
);
#[cfg(feature = "stm32f373")]
i2c!(
    I2c2,
    I2C2,
    rcc::en::APB1_I2C2,
    1 << 5,
    I2c2Scl,
    I2c2Sda,
    set_i2c2_scl_af,
    set_i2c2_sda_af
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_72mhz() {
        let t: u32 = timingr(72_000_000, 400_000).unwrap();
        let presc: u32 = t >> 28;
        let sclh: u32 = (t >> 8) & 0xFF;
        let scll: u32 = t & 0xFF;
        let period: u32 = (presc + 1) * (scll + sclh + 2);
        // within 10 % of the target once the sync delays are added
        let ratio: u32 = 72_000_000 / 400_000;
        assert!(period <= ratio && period + ratio / 10 >= ratio, "{period} {ratio}");
    }

    /// SCL (high, low) times in nanoseconds.
    fn scl_ns(clock_hz: u32, t: u32) -> (u64, u64) {
        let presc: u64 = u64::from(t >> 28) + 1;
        let sclh: u64 = u64::from((t >> 8) & 0xFF) + 1;
        let scll: u64 = u64::from(t & 0xFF) + 1;
        let tick_ps: u64 = presc * 1_000_000_000_000 / u64::from(clock_hz);
        (sclh * tick_ps / 1000, scll * tick_ps / 1000)
    }

    #[test]
    fn timing_standard_mode_100khz() {
        for clock_hz in [8_000_000, 36_000_000, 64_000_000, 72_000_000] {
            let t: u32 = timingr(clock_hz, 100_000).unwrap();
            let (high, low) = scl_ns(clock_hz, t);
            assert!(high >= 4_000, "{clock_hz} {t:#010X} tHIGH={high}");
            assert!(low >= 4_700, "{clock_hz} {t:#010X} tLOW={low}");
        }
        assert_eq!(timingr(8_000_000, 100_000), Ok(0x0094_2525));
    }

    #[test]
    fn timing_fast_mode_400khz() {
        for clock_hz in [36_000_000, 72_000_000] {
            let t: u32 = timingr(clock_hz, 400_000).unwrap();
            let (high, low) = scl_ns(clock_hz, t);
            assert!(high >= 600, "{clock_hz} {t:#010X} tHIGH={high}");
            assert!(low >= 1_300, "{clock_hz} {t:#010X} tLOW={low}");
        }
    }

    #[test]
    fn timing_limits() {
        assert!(timingr(8_000_000, 0).is_err());
        assert!(timingr(72_000_000, 1_000_001).is_err());
        // too slow for the 4-bit prescaler
        assert!(timingr(72_000_000, 1_000).is_err());
    }

    #[test]
    fn cr2_chunks() {
        assert_eq!(
            cr2(0x48, true, 2, true, End::Stop),
            (0x48 << 1) | CR2_RD_WRN | CR2_START | (2 << 16) | CR2_AUTOEND
        );
        assert_eq!(
            cr2(0x50, false, 255, false, End::Reload),
            (0x50 << 1) | (255 << 16) | CR2_RELOAD
        );
        assert_eq!(chunk_end(0, 1, End::Stop), End::Reload);
        assert_eq!(chunk_end(1, 1, End::Software), End::Software);
    }
}
