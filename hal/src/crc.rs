//! Cyclic redundancy check calculation unit
//!
//! The hardware has a programmable polynomial of 7, 8, 16 or 32 bits, a
//! programmable initial value, and input/output bit reversal.
//! There is no final XOR, [`Crc::checksum`] applies it in software.
//!
//! [`CrcModel`] is a bitwise software implementation of the same
//! parameterised algorithms, used to check the hardware.

use crate::{pac, rcc};
use core::ptr::write_volatile;

/// CRC parameters, in the Rocksoft model.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::crc::CrcModel;
///
/// assert_eq!(CrcModel::CRC32_MPEG2.compute(b"123456789"), 0x0376_E6E7);
/// assert_eq!(CrcModel::CRC32_ISO_HDLC.compute(b"123456789"), 0xCBF4_3926);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrcModel {
    /// Width in bits, 1 to 32.
    pub width: u8,
    /// Polynomial, without the leading 1.
    pub poly: u32,
    /// Initial value.
    pub init: u32,
    /// Reflect input bytes.
    pub refin: bool,
    /// Reflect the result.
    pub refout: bool,
    /// Final XOR value.
    pub xorout: u32,
}

impl CrcModel {
    /// CRC-32/MPEG-2, the hardware reset configuration.
    pub const CRC32_MPEG2: CrcModel = CrcModel {
        width: 32,
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        refin: false,
        refout: false,
        xorout: 0,
    };

    /// CRC-32/ISO-HDLC, the Ethernet and zip CRC.
    pub const CRC32_ISO_HDLC: CrcModel = CrcModel {
        width: 32,
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        refin: true,
        refout: true,
        xorout: 0xFFFF_FFFF,
    };

    /// CRC-16/IBM-3740, also known as CRC-16/CCITT-FALSE.
    pub const CRC16_IBM_3740: CrcModel = CrcModel {
        width: 16,
        poly: 0x1021,
        init: 0xFFFF,
        refin: false,
        refout: false,
        xorout: 0,
    };

    /// CRC-8/SMBUS.
    pub const CRC8_SMBUS: CrcModel = CrcModel {
        width: 8,
        poly: 0x07,
        init: 0,
        refin: false,
        refout: false,
        xorout: 0,
    };

    /// CRC-7/MMC, the SD card command CRC.
    pub const CRC7_MMC: CrcModel = CrcModel {
        width: 7,
        poly: 0x09,
        init: 0,
        refin: false,
        refout: false,
        xorout: 0,
    };

    const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// Calculate the CRC of `data`.
    pub fn compute(&self, data: &[u8]) -> u32 {
        debug_assert!((1..=32).contains(&self.width));
        // work MSB aligned in a 32-bit register
        let shift: u32 = 32 - u32::from(self.width);
        let poly: u32 = (self.poly & self.mask()) << shift;
        let mut crc: u32 = (self.init & self.mask()) << shift;
        for &byte in data {
            let byte: u8 = if self.refin { byte.reverse_bits() } else { byte };
            crc ^= u32::from(byte) << 24;
            for _ in 0..8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ poly
                } else {
                    crc << 1
                };
            }
        }
        let mut crc: u32 = crc >> shift;
        if self.refout {
            crc = crc.reverse_bits() >> shift;
        }
        (crc ^ self.xorout) & self.mask()
    }

    /// Calculate the CRC-32/MPEG-2 of `data`.
    pub fn crc32_mpeg2(data: &[u8]) -> u32 {
        Self::CRC32_MPEG2.compute(data)
    }
}

/// Polynomial size.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PolySize {
    /// 32 bit polynomial.
    Bits32 = 0b00,
    /// 16 bit polynomial.
    Bits16 = 0b01,
    /// 8 bit polynomial.
    Bits8 = 0b10,
    /// 7 bit polynomial.
    Bits7 = 0b11,
}

impl PolySize {
    /// Polynomial size from a CRC width.
    pub const fn from_width(width: u8) -> Option<PolySize> {
        match width {
            32 => Some(PolySize::Bits32),
            16 => Some(PolySize::Bits16),
            8 => Some(PolySize::Bits8),
            7 => Some(PolySize::Bits7),
            _ => None,
        }
    }
}

/// Input bit reversal.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RevIn {
    /// No reversal.
    None = 0b00,
    /// Reversal by byte.
    Byte = 0b01,
    /// Reversal by half-word.
    HalfWord = 0b10,
    /// Reversal by word.
    Word = 0b11,
}

/// CRC unit configuration.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::crc::{Config, CrcModel};
///
/// let cfg: Config = Config::from_model(&CrcModel::CRC32_ISO_HDLC).unwrap();
/// assert_eq!(cfg.cr(), (0b01 << 5) | (1 << 7));
/// assert_eq!(Config::from_model(&CrcModel { width: 12, ..CrcModel::CRC8_SMBUS }), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    poly_size: PolySize,
    poly: u32,
    init: u32,
    rev_in: RevIn,
    rev_out: bool,
}

impl Config {
    /// Reset configuration, CRC-32/MPEG-2.
    pub const RESET: Config = Config {
        poly_size: PolySize::Bits32,
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        rev_in: RevIn::None,
        rev_out: false,
    };

    /// Hardware configuration of a CRC model, without the final XOR.
    ///
    /// Returns `None` if the width is not 7, 8, 16 or 32.
    pub const fn from_model(model: &CrcModel) -> Option<Config> {
        let poly_size: PolySize = match PolySize::from_width(model.width) {
            Some(size) => size,
            None => return None,
        };
        let mask: u32 = model.mask();
        Some(Config {
            poly_size,
            poly: model.poly & mask,
            init: model.init & mask,
            rev_in: if model.refin { RevIn::Byte } else { RevIn::None },
            rev_out: model.refout,
        })
    }

    /// Set the polynomial and its size.
    #[must_use = "set_poly returns a modified Config"]
    pub const fn set_poly(mut self, size: PolySize, poly: u32) -> Config {
        self.poly_size = size;
        self.poly = poly;
        self
    }

    /// Set the initial value.
    #[must_use = "set_init returns a modified Config"]
    pub const fn set_init(mut self, init: u32) -> Config {
        self.init = init;
        self
    }

    /// Set the input bit reversal.
    #[must_use = "set_rev_in returns a modified Config"]
    pub const fn set_rev_in(mut self, rev_in: RevIn) -> Config {
        self.rev_in = rev_in;
        self
    }

    /// Set the output bit reversal.
    #[must_use = "set_rev_out returns a modified Config"]
    pub const fn set_rev_out(mut self, rev_out: bool) -> Config {
        self.rev_out = rev_out;
        self
    }

    /// `CR` register value, without the reset bit.
    pub const fn cr(&self) -> u32 {
        ((self.poly_size as u32) << 3) | ((self.rev_in as u32) << 5) | ((self.rev_out as u32) << 7)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::RESET
    }
}

/// CRC errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The hardware does not support this CRC width.
    Width(u8),
}

const CR_RESET: u32 = 1;

/// CRC driver.
#[derive(Debug)]
pub struct Crc {
    crc: pac::CRC,
}

impl Crc {
    // 8-bit access to DR feeds a single byte
    const DR8: *mut u8 = 0x4002_3000 as *mut u8;

    /// Create a new CRC driver from a CRC peripheral.
    ///
    /// This will enable the clock, and load the reset configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{crc::Crc, pac};
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut crc: Crc = Crc::new(dp.CRC, &mut dp.RCC);
    /// crc.feed_bytes(b"123456789");
    /// assert_eq!(crc.result(), 0x0376_E6E7);
    /// ```
    pub fn new(crc: pac::CRC, rcc: &mut pac::RCC) -> Crc {
        Self::enable_clock(rcc);
        let mut crc: Crc = Crc { crc };
        crc.configure(&Config::RESET);
        crc
    }

    /// Free the CRC peripheral from the driver.
    pub fn free(self) -> pac::CRC {
        self.crc
    }

    /// Steal the CRC peripheral from whatever is currently using it.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the CRC has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. You are responsible for enabling the CRC clock.
    pub unsafe fn steal() -> Crc {
        Crc {
            crc: unsafe { pac::Peripherals::steal() }.CRC,
        }
    }

    /// Enable the CRC clock.
    pub fn enable_clock(rcc: &mut pac::RCC) {
        rcc::en::ahb(rcc, rcc::en::AHB_CRC)
    }

    /// Disable the CRC clock.
    ///
    /// # Safety
    ///
    /// You are responsible for re-enabling the clock before using the CRC.
    pub unsafe fn disable_clock(rcc: &mut pac::RCC) {
        rcc::en::ahb_disable(rcc, rcc::en::AHB_CRC)
    }

    /// Configure the unit, and reset the CRC to the initial value.
    pub fn configure(&mut self, cfg: &Config) {
        self.crc.pol.write(|w| unsafe { w.bits(cfg.poly) });
        self.crc.init.write(|w| unsafe { w.bits(cfg.init) });
        self.crc.cr.write(|w| unsafe { w.bits(cfg.cr()) });
        self.reset();
    }

    /// Reset the CRC to the initial value.
    pub fn reset(&mut self) {
        set_bits!(self.crc.cr, CR_RESET);
    }

    /// Feed bytes.
    pub fn feed_bytes(&mut self, data: &[u8]) {
        data.iter()
            .for_each(|byte| unsafe { write_volatile(Self::DR8, *byte) })
    }

    /// Feed words.
    pub fn feed_words(&mut self, data: &[u32]) {
        data.iter()
            .for_each(|word| self.crc.dr().write(|w| unsafe { w.bits(*word) }))
    }

    /// Current CRC value.
    pub fn result(&self) -> u32 {
        self.crc.dr().read().bits()
    }

    /// Calculate the CRC of `data` with a model in hardware.
    ///
    /// # Errors
    ///
    /// * [`Error::Width`] if the model width is not 7, 8, 16 or 32.
    pub fn checksum(&mut self, model: &CrcModel, data: &[u8]) -> Result<u32, Error> {
        let cfg: Config = Config::from_model(model).ok_or(Error::Width(model.width))?;
        self.configure(&cfg);
        self.feed_bytes(data);
        Ok((self.result() ^ model.xorout) & model.mask())
    }

    /// Write the independent data register, it is not touched by the CRC
    /// calculation.
    pub fn set_idr(&mut self, val: u8) {
        self.crc.idr.write(|w| unsafe { w.bits(u32::from(val)) })
    }

    /// Independent data register.
    pub fn idr(&self) -> u8 {
        self.crc.idr.read().bits() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK: &[u8] = b"123456789";

    #[test]
    fn check_values() {
        assert_eq!(CrcModel::crc32_mpeg2(CHECK), 0x0376_E6E7);
        assert_eq!(CrcModel::CRC16_IBM_3740.compute(CHECK), 0x29B1);
        assert_eq!(CrcModel::CRC8_SMBUS.compute(CHECK), 0xF4);
        assert_eq!(CrcModel::CRC7_MMC.compute(CHECK), 0x75);
    }

    #[test]
    fn empty_input_is_init() {
        assert_eq!(CrcModel::CRC32_MPEG2.compute(&[]), 0xFFFF_FFFF);
        assert_eq!(CrcModel::CRC32_ISO_HDLC.compute(&[]), 0);
    }

    #[test]
    fn config_from_model() {
        let cfg: Config = Config::from_model(&CrcModel::CRC7_MMC).unwrap();
        assert_eq!(cfg.cr(), 0b11 << 3);
        assert_eq!(Config::from_model(&CrcModel::CRC32_MPEG2), Some(Config::RESET));
    }
}
