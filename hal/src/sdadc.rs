//! Sigma-delta analog to digital converter (SDADC1, STM32F373)
//!
//! Quickstart:
//!
//! 1. [`Sdadc::new`] powers the analog part and selects the reference.
//! 2. [`Sdadc::configure`] sets the gain and input mode of a configuration
//!    slot and assigns it to a channel.
//! 3. [`Sdadc::calibrate`] measures the offset of every configuration.
//! 4. [`Sdadc::sample`] runs a regular software conversion.
//!
//! Convert the signed result with [`to_millivolts`].

use crate::{pac, pwr, rcc};

const CR1_REFV_SHIFT: u32 = 8;
const CR1_REFV_MASK: u32 = 0b11 << CR1_REFV_SHIFT;
const CR1_INIT: u32 = 1 << 31;

const CR2_ADON: u32 = 1 << 0;
const CR2_CALIBCNT_SHIFT: u32 = 1;
const CR2_CALIBCNT_MASK: u32 = 0b11 << CR2_CALIBCNT_SHIFT;
const CR2_STARTCALIB: u32 = 1 << 4;
const CR2_RCH_SHIFT: u32 = 16;
const CR2_RCH_MASK: u32 = 0b1111 << CR2_RCH_SHIFT;
const CR2_RCONT: u32 = 1 << 22;
const CR2_RSWSTART: u32 = 1 << 23;

const ISR_EOCALF: u32 = 1 << 0;
const ISR_REOCF: u32 = 1 << 3;
const ISR_ROVRF: u32 = 1 << 4;
const ISR_STABIP: u32 = 1 << 15;
const ISR_INITRDY: u32 = 1 << 31;

const CLRISR_CLREOCALF: u32 = 1 << 0;
const CLRISR_CLRROVRF: u32 = 1 << 4;

const CONF_OFFSET_MASK: u32 = 0xFFF;
const CONF_GAIN_SHIFT: u32 = 20;
const CONF_SE_SHIFT: u32 = 26;
const CONF_COMMON_SHIFT: u32 = 30;

// SDPRE in RCC_CFGR
const CFGR_SDPRE_SHIFT: u32 = 27;
const CFGR_SDPRE_MASK: u32 = 0b1_1111 << CFGR_SDPRE_SHIFT;

/// Maximum SDADC clock in slow mode is 1.5 MHz, in fast mode 6 MHz.
pub const MAX_CLK_HZ: u32 = 6_000_000;

/// Number of input channels.
pub const NUM_CH: u8 = 9;

/// Reference voltage selection.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefV {
    /// External reference on VREFSD+, applied voltage in millivolts.
    Ext(u16),
    /// Internal 1.22 V reference.
    Int1v22,
    /// Internal 1.8 V reference.
    Int1v8,
    /// VDDSD supply, supply voltage in millivolts.
    Vddsd(u16),
}

impl RefV {
    const fn bits(self) -> u32 {
        match self {
            RefV::Ext(_) => 0b00,
            RefV::Int1v22 => 0b01,
            RefV::Int1v8 => 0b10,
            RefV::Vddsd(_) => 0b11,
        }
    }

    /// Reference voltage in millivolts.
    pub const fn millivolts(self) -> u16 {
        match self {
            RefV::Ext(mv) => mv,
            RefV::Int1v22 => 1220,
            RefV::Int1v8 => 1800,
            RefV::Vddsd(mv) => mv,
        }
    }
}

/// Input gain.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// ×1
    X1 = 0b000,
    /// ×2
    X2 = 0b001,
    /// ×4
    X4 = 0b010,
    /// ×8
    X8 = 0b011,
    /// ×16
    X16 = 0b100,
    /// ×32
    X32 = 0b101,
    /// ×½
    Half = 0b111,
}

impl Gain {
    /// Twice the gain, to keep ×½ an integer.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::sdadc::Gain;
    ///
    /// assert_eq!(Gain::Half.times_two(), 1);
    /// assert_eq!(Gain::X32.times_two(), 64);
    /// ```
    pub const fn times_two(self) -> u32 {
        match self {
            Gain::Half => 1,
            g => 2 << (g as u32),
        }
    }
}

/// Input mode.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Differential between the P and N inputs.
    Differential = 0b00,
    /// Single ended with an offset, the negative input is tied to the
    /// common mode.
    SingleEndedOffset = 0b01,
    /// Single ended against a zero volt reference.
    SingleEndedZeroRef = 0b11,
}

/// Common mode for the conversions.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Common {
    /// VSSSD
    Vsssd = 0b00,
    /// VDDSD
    Vddsd = 0b01,
    /// VREFSD
    Vrefsd = 0b10,
}

/// One of three configuration slots.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    /// CONF0R
    Conf0 = 0,
    /// CONF1R
    Conf1 = 1,
    /// CONF2R
    Conf2 = 2,
}

/// Configuration slot register value.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::sdadc::{Common, Conf, Gain, Mode};
///
/// let conf: Conf = Conf::new(Gain::X1, Mode::SingleEndedZeroRef, Common::Vsssd);
/// assert_eq!(conf.raw(), 0b11 << 26);
/// assert_eq!(conf.gain(), Gain::X1);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Conf {
    gain: Gain,
    mode: Mode,
    common: Common,
    offset: u16,
}

impl Conf {
    /// Create a configuration with a zero offset.
    pub const fn new(gain: Gain, mode: Mode, common: Common) -> Conf {
        Conf {
            gain,
            mode,
            common,
            offset: 0,
        }
    }

    /// Set the 12-bit offset subtracted from every conversion.
    ///
    /// Values above `0xFFF` saturate.
    #[must_use = "set_offset returns a modified Conf"]
    pub const fn set_offset(mut self, offset: u16) -> Conf {
        self.offset = if offset > CONF_OFFSET_MASK as u16 {
            CONF_OFFSET_MASK as u16
        } else {
            offset
        };
        self
    }

    /// Gain
    pub const fn gain(&self) -> Gain {
        self.gain
    }

    /// Input mode
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Raw register value.
    pub const fn raw(&self) -> u32 {
        ((self.common as u32) << CONF_COMMON_SHIFT)
            | ((self.mode as u32) << CONF_SE_SHIFT)
            | ((self.gain as u32) << CONF_GAIN_SHIFT)
            | (self.offset as u32)
    }
}

/// SDADC errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel number out of range.
    Channel(u8),
    /// A regular conversion was overwritten before it was read.
    Overrun,
}

/// Convert a signed conversion result to millivolts.
///
/// Single ended modes map the full 16-bit range onto
/// 0..V<sub>REF</sub> / gain, differential mode maps it onto
/// ±V<sub>REF</sub> / (2 × gain).
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::sdadc::{to_millivolts, Gain, Mode};
///
/// // 3.3 V reference, single ended zero reference, gain ×1
/// assert_eq!(to_millivolts(-32768, 3300, Gain::X1, Mode::SingleEndedZeroRef), 0);
/// assert_eq!(to_millivolts(0, 3300, Gain::X1, Mode::SingleEndedZeroRef), 1650);
/// assert_eq!(to_millivolts(16384, 3300, Gain::X1, Mode::Differential), 825);
/// assert_eq!(to_millivolts(0, 3300, Gain::Half, Mode::SingleEndedOffset), 3300);
/// ```
pub const fn to_millivolts(sample: i16, vref_mv: u16, gain: Gain, mode: Mode) -> i32 {
    let vref: i64 = vref_mv as i64;
    let gain2: i64 = gain.times_two() as i64;
    let mv: i64 = match mode {
        Mode::Differential => (sample as i64) * vref * 2 / (gain2 * 65536),
        Mode::SingleEndedOffset | Mode::SingleEndedZeroRef => {
            ((sample as i64) + 32768) * vref * 2 / (gain2 * 65536)
        }
    };
    mv as i32
}

/// SDADC clock calculation error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockError {
    /// System clock frequency.
    pub sysclk_hz: u32,
    /// Maximum SDADC clock frequency.
    pub max_hz: u32,
}

/// `SDPRE` value for the largest SDADC clock at or below `max_hz`.
///
/// Returns the field value and the resulting SDADC clock.
///
/// # Errors
///
/// * [`ClockError`] if the largest divider (48) is not enough.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::sdadc::sdpre;
///
/// // 72 MHz / 12 = 6 MHz
/// assert_eq!(sdpre(72_000_000, 6_000_000), Ok((0b10101, 6_000_000)));
/// assert_eq!(sdpre(8_000_000, 6_000_000), Ok((0b10000, 4_000_000)));
/// assert!(sdpre(72_000_000, 1_000_000).is_err());
/// ```
pub const fn sdpre(sysclk_hz: u32, max_hz: u32) -> Result<(u8, u32), ClockError> {
    const DIVS: [u32; 16] = [2, 4, 6, 8, 10, 12, 14, 16, 20, 24, 28, 32, 36, 40, 44, 48];
    let mut idx: usize = 0;
    while idx < DIVS.len() {
        let hz: u32 = sysclk_hz / DIVS[idx];
        if hz <= max_hz {
            return Ok((0b10000 | idx as u8, hz));
        }
        idx += 1;
    }
    Err(ClockError { sysclk_hz, max_hz })
}

/// SDADC1 driver.
#[derive(Debug)]
pub struct Sdadc {
    sdadc: pac::SDADC1,
    refv: RefV,
    confs: [Option<Conf>; 3],
}

impl Sdadc {
    /// Create a new SDADC driver.
    ///
    /// This will enable the analog supply in the PWR block, enable clocks,
    /// reset the peripheral, select the reference and power up the
    /// converter.
    ///
    /// The SDADC clock is set to at most [`MAX_CLK_HZ`] from the system
    /// clock.
    ///
    /// # Errors
    ///
    /// * [`ClockError`] if the system clock is above 288 MHz. Nothing is
    ///   written to the PWR or RCC registers in that case.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     pac,
    ///     sdadc::{RefV, Sdadc},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let sdadc: Sdadc = Sdadc::new(dp.SDADC1, RefV::Vddsd(3300), &mut dp.PWR, &mut dp.RCC)?;
    /// # Ok::<(), stm32f3xx_hal::sdadc::ClockError>(())
    /// ```
    pub fn new(
        sdadc: pac::SDADC1,
        refv: RefV,
        pwr: &mut pac::PWR,
        rcc: &mut pac::RCC,
    ) -> Result<Sdadc, ClockError> {
        let (pre, _) = sdpre(rcc::sysclk_hz(rcc), MAX_CLK_HZ)?;

        pwr::enable_clock(rcc);
        pwr::set_sdadc_analog(pwr, pwr::Sdadc::Sdadc1, true);
        write_bits!(rcc.cfgr, CFGR_SDPRE_MASK, u32::from(pre) << CFGR_SDPRE_SHIFT);

        rcc::en::apb2(rcc, rcc::en::APB2_SDADC1);
        rcc::en::apb2_reset(rcc, rcc::en::APB2_SDADC1);

        let mut ret: Sdadc = Sdadc {
            sdadc,
            refv,
            confs: [None; 3],
        };
        ret.with_init(|sdadc| {
            write_bits!(sdadc.cr1, CR1_REFV_MASK, refv.bits() << CR1_REFV_SHIFT);
        });
        set_bits!(ret.sdadc.cr2, CR2_ADON);
        while ret.sdadc.isr.read().bits() & ISR_STABIP != 0 {}
        Ok(ret)
    }

    /// Free the SDADC peripheral from the driver.
    ///
    /// This powers down the converter.
    pub fn free(self) -> pac::SDADC1 {
        clear_bits!(self.sdadc.cr2, CR2_ADON);
        self.sdadc
    }

    /// Reference voltage.
    #[inline]
    pub const fn refv(&self) -> RefV {
        self.refv
    }

    // configuration registers are only writable in initialization mode
    fn with_init<F: FnOnce(&pac::SDADC1)>(&mut self, f: F) {
        set_bits!(self.sdadc.cr1, CR1_INIT);
        while self.sdadc.isr.read().bits() & ISR_INITRDY == 0 {}
        f(&self.sdadc);
        clear_bits!(self.sdadc.cr1, CR1_INIT);
    }

    /// Write a configuration slot and assign it to a channel.
    ///
    /// # Errors
    ///
    /// * [`Error::Channel`] if `ch` is not below [`NUM_CH`].
    pub fn configure(&mut self, slot: Slot, conf: Conf, ch: u8) -> Result<(), Error> {
        if ch >= NUM_CH {
            return Err(Error::Channel(ch));
        }
        self.with_init(|sdadc| {
            match slot {
                Slot::Conf0 => sdadc.conf0r.write(|w| unsafe { w.bits(conf.raw()) }),
                Slot::Conf1 => sdadc.conf1r.write(|w| unsafe { w.bits(conf.raw()) }),
                Slot::Conf2 => sdadc.conf2r.write(|w| unsafe { w.bits(conf.raw()) }),
            }
            let shift: u32 = 4 * u32::from(ch % 8);
            if ch < 8 {
                write_bits!(sdadc.confchr1, 0b11 << shift, (slot as u32) << shift);
            } else {
                write_bits!(sdadc.confchr2, 0b11, slot as u32);
            }
        });
        self.confs[slot as usize] = Some(conf);
        Ok(())
    }

    /// Configuration assigned to a channel.
    ///
    /// Returns `None` if the slot of the channel was not configured with
    /// this driver.
    pub fn conf(&self, ch: u8) -> Option<Conf> {
        if ch >= NUM_CH {
            return None;
        }
        let confchr: u32 = if ch < 8 {
            self.sdadc.confchr1.read().bits() >> (4 * u32::from(ch))
        } else {
            self.sdadc.confchr2.read().bits()
        };
        let slot: u32 = confchr & 0b11;
        self.confs.get(slot as usize).copied().flatten()
    }

    /// Calibrate the offset of the first `slots` configurations.
    ///
    /// The offsets are written into the configuration registers and
    /// subtracted from later conversions.
    /// Run this after every [`configure`](Self::configure).
    ///
    /// `slots` is clamped to 1..=3.
    pub fn calibrate(&mut self, slots: u8) {
        let cnt: u32 = u32::from(slots.clamp(1, 3) - 1);
        self.with_init(|sdadc| {
            write_bits!(sdadc.cr2, CR2_CALIBCNT_MASK, cnt << CR2_CALIBCNT_SHIFT);
        });
        set_bits!(self.sdadc.cr2, CR2_STARTCALIB);
        while self.sdadc.isr.read().bits() & ISR_EOCALF == 0 {}
        self.sdadc
            .clrisr
            .write(|w| unsafe { w.bits(CLRISR_CLREOCALF) });
    }

    /// Select the regular channel.
    ///
    /// # Errors
    ///
    /// * [`Error::Channel`] if `ch` is not below [`NUM_CH`].
    pub fn set_regular_ch(&mut self, ch: u8) -> Result<(), Error> {
        if ch >= NUM_CH {
            return Err(Error::Channel(ch));
        }
        write_bits!(self.sdadc.cr2, CR2_RCH_MASK, u32::from(ch) << CR2_RCH_SHIFT);
        Ok(())
    }

    /// Enable or disable continuous regular conversions.
    pub fn set_continuous(&mut self, en: bool) {
        if en {
            set_bits!(self.sdadc.cr2, CR2_RCONT);
        } else {
            clear_bits!(self.sdadc.cr2, CR2_RCONT);
        }
    }

    /// Start a regular conversion.
    #[inline]
    pub fn start_regular(&mut self) {
        set_bits!(self.sdadc.cr2, CR2_RSWSTART);
    }

    /// Read a regular conversion result if one is ready.
    ///
    /// # Errors
    ///
    /// * [`Error::Overrun`] if a result was lost, the overrun flag is cleared.
    pub fn read_regular(&mut self) -> nb::Result<i16, Error> {
        let isr: u32 = self.sdadc.isr.read().bits();
        if isr & ISR_ROVRF != 0 {
            self.sdadc
                .clrisr
                .write(|w| unsafe { w.bits(CLRISR_CLRROVRF) });
            Err(nb::Error::Other(Error::Overrun))
        } else if isr & ISR_REOCF != 0 {
            // reading the data clears REOCF
            Ok(self.sdadc.rdatar.read().bits() as u16 as i16)
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Sample a channel with a single software conversion.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     pac,
    ///     sdadc::{self, Common, Conf, Gain, Mode, RefV, Sdadc, Slot},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut sdadc: Sdadc =
    ///     Sdadc::new(dp.SDADC1, RefV::Vddsd(3300), &mut dp.PWR, &mut dp.RCC).unwrap();
    /// let conf: Conf = Conf::new(Gain::X1, Mode::SingleEndedZeroRef, Common::Vsssd);
    /// sdadc.configure(Slot::Conf0, conf, 5)?;
    /// sdadc.calibrate(1);
    /// let sample: i16 = sdadc.sample(5)?;
    /// let mv: i32 = sdadc::to_millivolts(sample, 3300, conf.gain(), conf.mode());
    /// # Ok::<(), sdadc::Error>(())
    /// ```
    pub fn sample(&mut self, ch: u8) -> Result<i16, Error> {
        self.set_regular_ch(ch)?;
        self.start_regular();
        nb::block!(self.read_regular())
    }

    /// Sample a channel and convert the result to millivolts with the
    /// channel configuration.
    ///
    /// # Errors
    ///
    /// * [`Error::Channel`] if the channel is out of range or its slot was
    ///   not configured with [`configure`](Self::configure).
    pub fn sample_millivolts(&mut self, ch: u8) -> Result<i32, Error> {
        let conf: Conf = self.conf(ch).ok_or(Error::Channel(ch))?;
        let sample: i16 = self.sample(ch)?;
        Ok(to_millivolts(
            sample,
            self.refv.millivolts(),
            conf.gain(),
            conf.mode(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conf_register() {
        let conf: Conf = Conf::new(Gain::Half, Mode::Differential, Common::Vrefsd).set_offset(0x1234);
        assert_eq!(conf.raw(), (0b10 << 30) | (0b111 << 20) | 0xFFF);
    }

    #[test]
    fn millivolts_gain() {
        // full scale with gain x8 is an eighth of the reference
        assert_eq!(to_millivolts(32767, 1800, Gain::X8, Mode::SingleEndedOffset), 224);
        assert_eq!(to_millivolts(-32768, 3300, Gain::X1, Mode::Differential), -1650);
    }

    #[test]
    fn prescaler_bounds() {
        assert_eq!(sdpre(288_000_000, MAX_CLK_HZ), Ok((0b11111, 6_000_000)));
        assert_eq!(sdpre(12_000_000, MAX_CLK_HZ), Ok((0b10000, 6_000_000)));
        assert_eq!(RefV::Int1v22.millivolts(), 1220);
    }

    #[test]
    fn prescaler_too_fast_sysclk() {
        // 289 MHz / 48 is just above the 6 MHz limit
        assert_eq!(
            sdpre(289_000_000, MAX_CLK_HZ),
            Err(ClockError {
                sysclk_hz: 289_000_000,
                max_hz: MAX_CLK_HZ
            })
        );
    }
}
