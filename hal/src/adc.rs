//! Analog to digital converter (ADC1, STM32F334)
//!
//! Quickstart:
//!
//! * [`Adc::calibrate`] Calibrate before enabling
//! * [`Adc::pin`] Sample an analog pin
//! * [`Adc::set_injected`] Injected sequence triggered by the HRTIM
//! * [`Adc::vdda`] Measure the analog supply with VREFINT

use crate::{gpio, pac, rcc};

use core::{ptr::read_volatile, time::Duration};
use embedded_hal::blocking::delay::DelayUs;

// DS9994 rev 9 table 29
// TS ADC raw data acquired at 30 °C, VDDA = 3.3 V
fn ts_cal1() -> u16 {
    unsafe { read_volatile(0x1FFF_F7B8 as *const u16) }
}

// DS9994 rev 9 table 29
// TS ADC raw data acquired at 110 °C, VDDA = 3.3 V
fn ts_cal2() -> u16 {
    unsafe { read_volatile(0x1FFF_F7C2 as *const u16) }
}

const TS_CAL1_TEMP: i32 = 30;
const TS_CAL2_TEMP: i32 = 110;

/// V<sub>DDA</sub> used for the factory calibration values, in millivolts.
pub const VDDA_CAL_MV: u32 = 3300;

/// Full scale value of a 12-bit conversion.
pub const FULL_SCALE: u16 = 4095;

/// Internal voltage reference ADC calibration.
///
/// This is raw ADC data acquired at 30 °C, V<sub>DDA</sub> = 3.3 V.
pub fn vref_cal() -> u16 {
    // DS9994 rev 9 table 30
    unsafe { read_volatile(0x1FFF_F7BA as *const u16) }
}

/// t<sub>S_temp</sub> temperature sensor minimum sampling time
///
/// Value from DS9994 table 67.
pub const TS_MIN_SAMPLE: Duration = Duration::from_nanos(2_200);
/// t<sub>START</sub> temperature sensor maximum startup time
///
/// Value from DS9994 table 67.
pub const TS_START_MAX: Duration = Duration::from_micros(10);

/// t<sub>ADCVREG_STUP</sub> ADC voltage regulator maximum startup time in
/// microseconds.
pub const T_ADCVREG_SETUP_MICROS: u8 = 10;

const CR_ADEN: u32 = 1 << 0;
const CR_ADDIS: u32 = 1 << 1;
const CR_ADSTART: u32 = 1 << 2;
const CR_JADSTART: u32 = 1 << 3;
const CR_ADSTP: u32 = 1 << 4;
const CR_JADSTP: u32 = 1 << 5;
const CR_ADVREGEN_MASK: u32 = 0b11 << 28;
const CR_ADVREGEN_EN: u32 = 0b01 << 28;
const CR_ADVREGEN_DIS: u32 = 0b10 << 28;
const CR_ADCALDIF: u32 = 1 << 30;
const CR_ADCAL: u32 = 1 << 31;

const CCR_CKMODE_MASK: u32 = 0b11 << 16;
const CCR_VREFEN: u32 = 1 << 22;
const CCR_TSEN: u32 = 1 << 23;
const CCR_VBATEN: u32 = 1 << 24;

const CFGR2_ADC12PRES_MASK: u32 = 0b1_1111 << 4;
const CFGR2_ADC12PRES_DIV1: u32 = 0b1_0000 << 4;

/// Interrupt masks
///
/// Used for [`Adc::set_isr`], [`Adc::set_ier`], and [`Adc::isr`].
pub mod irq {
    /// Injected context queue overflow
    pub const JQOVF: u32 = 1 << 10;
    /// Analog watchdog 3
    pub const AWD3: u32 = 1 << 9;
    /// Analog watchdog 2
    pub const AWD2: u32 = 1 << 8;
    /// Analog watchdog 1
    pub const AWD1: u32 = 1 << 7;
    /// End of injected sequence
    pub const JEOS: u32 = 1 << 6;
    /// End of injected conversion
    pub const JEOC: u32 = 1 << 5;
    /// ADC overrun
    pub const OVR: u32 = 1 << 4;
    /// End of regular sequence
    pub const EOS: u32 = 1 << 3;
    /// End of conversion
    pub const EOC: u32 = 1 << 2;
    /// End of sampling
    pub const EOSMP: u32 = 1 << 1;
    /// ADC ready
    pub const ADRDY: u32 = 1;

    /// All IRQs
    pub const ALL: u32 = JQOVF | AWD3 | AWD2 | AWD1 | JEOS | JEOC | OVR | EOS | EOC | EOSMP | ADRDY;
}

/// ADC clock mode
///
/// In the synchronous clock modes there is no jitter in the delay from a
/// timer trigger to the start of a conversion, use these with the HRTIM.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Clk {
    /// Asynchronous clock mode, PLL output
    PllDiv1,
    /// Synchronous clock mode, HCLK
    ///
    /// The AHB prescaler must be 1.
    HclkDiv1,
    /// Synchronous clock mode, HCLK/2
    HclkDiv2,
    /// Synchronous clock mode, HCLK/4
    HclkDiv4,
}

impl Clk {
    const fn ckmode(self) -> u32 {
        match self {
            Clk::PllDiv1 => 0b00,
            Clk::HclkDiv1 => 0b01,
            Clk::HclkDiv2 => 0b10,
            Clk::HclkDiv4 => 0b11,
        }
    }
}

/// ADC sample times
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Ts {
    /// 1.5 ADC clock cycles
    #[default]
    Cyc1 = 0b000,
    /// 2.5 ADC clock cycles
    Cyc2 = 0b001,
    /// 4.5 ADC clock cycles
    Cyc4 = 0b010,
    /// 7.5 ADC clock cycles
    Cyc7 = 0b011,
    /// 19.5 ADC clock cycles
    Cyc19 = 0b100,
    /// 61.5 ADC clock cycles
    Cyc61 = 0b101,
    /// 181.5 ADC clock cycles
    Cyc181 = 0b110,
    /// 601.5 ADC clock cycles
    Cyc601 = 0b111,
}

impl Ts {
    /// Maximum sample time, 601.5 ADC clock cycles.
    pub const MAX: Self = Self::Cyc601;

    /// Minimum sample time, 1.5 ADC clock cycles.
    pub const MIN: Self = Self::Cyc1;

    /// Number of cycles, times two.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::adc::Ts;
    ///
    /// assert_eq!(Ts::Cyc1.half_cycles(), 3);
    /// assert_eq!(Ts::Cyc601.half_cycles(), 1203);
    /// ```
    pub const fn half_cycles(&self) -> u16 {
        match self {
            Ts::Cyc1 => 3,
            Ts::Cyc2 => 5,
            Ts::Cyc4 => 9,
            Ts::Cyc7 => 15,
            Ts::Cyc19 => 39,
            Ts::Cyc61 => 123,
            Ts::Cyc181 => 363,
            Ts::Cyc601 => 1203,
        }
    }

    /// Get the sample time as a duration for an ADC clock frequency.
    ///
    /// # Example
    ///
    /// ```
    /// use core::time::Duration;
    /// use stm32f3xx_hal::adc::Ts;
    ///
    /// assert_eq!(Ts::Cyc61.as_duration(72_000_000).as_nanos(), 854);
    /// ```
    pub const fn as_duration(&self, hz: u32) -> Duration {
        let nanos: u64 = (self.half_cycles() as u64) * 1_000_000_000 / (2 * hz as u64);
        Duration::from_nanos(nanos)
    }

    /// Shortest sample time of at least `min` at `hz`.
    pub fn at_least(min: Duration, hz: u32) -> Ts {
        const ALL: [Ts; 8] = [
            Ts::Cyc1,
            Ts::Cyc2,
            Ts::Cyc4,
            Ts::Cyc7,
            Ts::Cyc19,
            Ts::Cyc61,
            Ts::Cyc181,
            Ts::Cyc601,
        ];
        ALL.iter()
            .copied()
            .find(|ts| ts.as_duration(hz) >= min)
            .unwrap_or(Ts::MAX)
    }
}

impl From<Ts> for u32 {
    fn from(ts: Ts) -> Self {
        ts as u32
    }
}

/// ADC1 channels
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Ch {
    /// ADC input 1.
    ///
    /// Connected to [`A0`](crate::gpio::pins::A0).
    In1 = 1,
    /// ADC input 2.
    ///
    /// Connected to [`A1`](crate::gpio::pins::A1).
    In2 = 2,
    /// ADC input 3.
    ///
    /// Connected to [`A2`](crate::gpio::pins::A2).
    In3 = 3,
    /// ADC input 4.
    ///
    /// Connected to [`A3`](crate::gpio::pins::A3).
    In4 = 4,
    /// ADC input 5, ADC2 only on this package.
    In5 = 5,
    /// ADC input 6.
    ///
    /// Connected to [`C0`](crate::gpio::pins::C0).
    In6 = 6,
    /// ADC input 7.
    ///
    /// Connected to [`C1`](crate::gpio::pins::C1).
    In7 = 7,
    /// ADC input 8.
    ///
    /// Connected to [`C2`](crate::gpio::pins::C2).
    In8 = 8,
    /// ADC input 9.
    ///
    /// Connected to [`C3`](crate::gpio::pins::C3).
    In9 = 9,
    /// ADC input 10, ADC2 only.
    In10 = 10,
    /// ADC input 11.
    ///
    /// Connected to [`B0`](crate::gpio::pins::B0).
    In11 = 11,
    /// ADC input 12.
    ///
    /// Connected to [`B1`](crate::gpio::pins::B1).
    In12 = 12,
    /// ADC input 13.
    ///
    /// Connected to [`B13`](crate::gpio::pins::B13).
    In13 = 13,
    /// ADC input 14.
    ///
    /// Connected to [`B11`](crate::gpio::pins::B11).
    In14 = 14,
    /// ADC input 15.
    ///
    /// Connected to [`B15`](crate::gpio::pins::B15).
    In15 = 15,
    /// Junction temperature sensor.
    Vts = 16,
    /// Battery voltage divided by 2.
    Vbat = 17,
    /// Internal voltage reference.
    Vref = 18,
}

impl Ch {
    /// Channel number.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::adc::Ch;
    ///
    /// assert_eq!(Ch::In1.number(), 1);
    /// assert_eq!(Ch::Vref.number(), 18);
    /// ```
    pub const fn number(self) -> u32 {
        self as u32
    }

    /// `SMPR1`/`SMPR2` register index and bit shift of the sample time.
    const fn smpr_location(self) -> (usize, u32) {
        let n: u32 = self as u32;
        if n < 10 { (0, 3 * n) } else { (1, 3 * (n - 10)) }
    }
}

/// Edge of an external trigger.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Edge {
    /// Rising edge.
    Rising = 0b01,
    /// Falling edge.
    Falling = 0b10,
    /// Both edges.
    Both = 0b11,
}

/// Injected conversion trigger.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InjTrigger {
    /// Software trigger, [`Adc::start_injected`].
    Software,
    /// HRTIM ADC trigger 2.
    HrtimTrg2(Edge),
    /// HRTIM ADC trigger 4.
    HrtimTrg4(Edge),
    /// Any other `JEXTSEL` event, 0 to 15.
    Ext(u8, Edge),
}

impl InjTrigger {
    const fn jext(self) -> u32 {
        let (sel, edge): (u8, Edge) = match self {
            InjTrigger::Software => return 0,
            InjTrigger::HrtimTrg2(edge) => (9, edge),
            InjTrigger::HrtimTrg4(edge) => (10, edge),
            InjTrigger::Ext(sel, edge) => (sel & 0xF, edge),
        };
        ((sel as u32) << 2) | ((edge as u32) << 6)
    }
}

/// Regular conversion trigger.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegTrigger {
    /// Software trigger, [`Adc::start_conversion`].
    #[default]
    Software,
    /// HRTIM ADC trigger 1.
    HrtimTrg1(Edge),
    /// HRTIM ADC trigger 3.
    HrtimTrg3(Edge),
}

impl RegTrigger {
    const fn ext(self) -> u32 {
        let (sel, edge): (u32, Edge) = match self {
            RegTrigger::Software => return 0,
            RegTrigger::HrtimTrg1(edge) => (7, edge),
            RegTrigger::HrtimTrg3(edge) => (8, edge),
        };
        (sel << 6) | ((edge as u32) << 10)
    }
}

/// ADC errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The injected sequence length is not in 1 to 4.
    InjectedLen {
        /// Requested length.
        len: usize,
        /// Maximum length.
        max: usize,
    },
}

/// Maximum injected sequence length.
pub const MAX_INJECTED: usize = 4;

/// Calculate the `JSQR` value for an injected sequence.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::adc::{Ch, Edge, InjTrigger, jsqr};
///
/// let val: u32 = jsqr(&[Ch::In2, Ch::In4], InjTrigger::HrtimTrg2(Edge::Rising))?;
/// assert_eq!(val, 0b1 | (9 << 2) | (0b01 << 6) | (2 << 8) | (4 << 14));
/// # Ok::<(), stm32f3xx_hal::adc::Error>(())
/// ```
pub fn jsqr(chs: &[Ch], trg: InjTrigger) -> Result<u32, Error> {
    if chs.is_empty() || chs.len() > MAX_INJECTED {
        return Err(Error::InjectedLen {
            len: chs.len(),
            max: MAX_INJECTED,
        });
    }
    let seq: u32 = chs
        .iter()
        .enumerate()
        .fold(0, |acc, (rank, ch)| acc | (ch.number() << (8 + 6 * rank as u32)));
    Ok(seq | trg.jext() | (chs.len() as u32 - 1))
}

#[inline]
fn check_rank(rank: usize) {
    debug_assert!(rank < MAX_INJECTED, "injected rank {} out of range", rank);
}

/// Convert a raw sample to millivolts.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::adc::to_millivolts;
///
/// assert_eq!(to_millivolts(4095, 3300), 3300);
/// assert_eq!(to_millivolts(2048, 3300), 1650);
/// ```
pub const fn to_millivolts(sample: u16, vdda_mv: u32) -> u32 {
    ((sample as u32) * vdda_mv + (FULL_SCALE as u32 / 2)) / (FULL_SCALE as u32)
}

/// Calculate V<sub>DDA</sub> in millivolts from the VREFINT calibration value
/// and a VREFINT sample.
///
/// Returns `None` if the sample is zero.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::adc::vdda_millivolts;
///
/// assert_eq!(vdda_millivolts(1500, 1500), Some(3300));
/// assert_eq!(vdda_millivolts(1500, 1650), Some(3000));
/// assert_eq!(vdda_millivolts(1500, 0), None);
/// ```
pub const fn vdda_millivolts(vref_cal: u16, vref_sample: u16) -> Option<u32> {
    if vref_sample == 0 {
        None
    } else {
        Some(VDDA_CAL_MV * (vref_cal as u32) / (vref_sample as u32))
    }
}

/// Calculate the temperature in degrees Celsius from a temperature sensor
/// sample, the two factory calibration points, and V<sub>DDA</sub>.
///
/// Returns `None` if the calibration points are equal.
pub const fn temperature_celsius(
    sample: u16,
    vdda_mv: u32,
    cal1: u16,
    cal2: u16,
) -> Option<i16> {
    if cal1 == cal2 {
        return None;
    }
    // scale the sample to the calibration VDDA
    let scaled: i32 = ((sample as u32) * vdda_mv / VDDA_CAL_MV) as i32;
    let num: i32 = (scaled - cal1 as i32) * (TS_CAL2_TEMP - TS_CAL1_TEMP);
    let den: i32 = cal2 as i32 - cal1 as i32;
    Some((num / den + TS_CAL1_TEMP) as i16)
}

/// Analog to digital converter driver.
#[derive(Debug)]
pub struct Adc {
    adc: pac::ADC1,
    common: pac::ADC1_2,
}

impl Adc {
    /// Create a new ADC driver from the ADC1 peripheral and the ADC1/ADC2
    /// common registers.
    ///
    /// This will enable the ADC clock, reset the ADC peripheral, and select
    /// the clock source.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     adc::{self, Adc},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);
    /// ```
    pub fn new(adc: pac::ADC1, common: pac::ADC1_2, clk: Clk, rcc: &mut pac::RCC) -> Self {
        unsafe { Self::pulse_reset(rcc) };
        Self::enable_clock(rcc);
        let mut adc: Self = Self { adc, common };
        adc.set_clock_source(clk, rcc);
        adc
    }

    /// Free the ADC peripherals from the driver.
    pub fn free(self) -> (pac::ADC1, pac::ADC1_2) {
        (self.adc, self.common)
    }

    /// Steal the ADC peripheral from whatever is currently using it.
    ///
    /// This will **not** initialize the ADC (unlike [`new`]).
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the ADC has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. Enable the ADC peripheral clock before using the ADC.
    ///
    /// [`new`]: Adc::new
    pub unsafe fn steal() -> Adc {
        let dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
        Adc {
            adc: dp.ADC1,
            common: dp.ADC1_2,
        }
    }

    /// Set the ADC clock source.
    ///
    /// # Panics
    ///
    /// * (debug) ADC is enabled
    pub fn set_clock_source(&mut self, clk: Clk, rcc: &mut pac::RCC) {
        debug_assert!(!self.is_enabled());
        let presc: u32 = match clk {
            Clk::PllDiv1 => CFGR2_ADC12PRES_DIV1,
            _ => 0,
        };
        write_bits!(rcc.cfgr2, CFGR2_ADC12PRES_MASK, presc);
        write_bits!(self.common.ccr, CCR_CKMODE_MASK, clk.ckmode() << 16);
    }

    /// Disable the ADC clock.
    ///
    /// # Safety
    ///
    /// 1. Ensure nothing is using the ADC before disabling the clock.
    /// 2. You are responsible for re-enabling the clock before using the ADC.
    pub unsafe fn disable_clock(rcc: &mut pac::RCC) {
        rcc::en::ahb_disable(rcc, rcc::en::AHB_ADC12)
    }

    /// Enable the ADC clock.
    ///
    /// [`new`](crate::adc::Adc::new) will enable clocks for you.
    pub fn enable_clock(rcc: &mut pac::RCC) {
        rcc::en::ahb(rcc, rcc::en::AHB_ADC12)
    }

    /// Pulse the ADC reset.
    ///
    /// [`new`](crate::adc::Adc::new) will pulse reset for you.
    ///
    /// # Safety
    ///
    /// 1. Ensure nothing is using the ADC before pulsing reset.
    /// 2. The calibration is lost.
    pub unsafe fn pulse_reset(rcc: &mut pac::RCC) {
        rcc::en::ahb_reset(rcc, rcc::en::AHB_ADC12)
    }

    fn modify_ccr(&mut self, mask: u32, set: bool) {
        if set {
            set_bits!(self.common.ccr, mask)
        } else {
            clear_bits!(self.common.ccr, mask)
        }
    }

    fn ccr(&self) -> u32 {
        self.common.ccr.read().bits()
    }

    /// Set the sample time of a channel.
    ///
    /// # Panics
    ///
    /// * (debug) a conversion is in-progress
    pub fn set_sample_time(&mut self, ch: Ch, ts: Ts) {
        debug_assert!(self.adc.cr.read().bits() & (CR_ADSTART | CR_JADSTART) == 0);
        let (idx, shift) = ch.smpr_location();
        let mask: u32 = 0b111 << shift;
        let val: u32 = u32::from(ts) << shift;
        if idx == 0 {
            write_bits!(self.adc.smpr1, mask, val);
        } else {
            write_bits!(self.adc.smpr2, mask, val);
        }
    }

    /// Set the maximum sample time for every channel.
    pub fn set_max_sample_time(&mut self) {
        // 601.5 cycles in every 3-bit field
        const SMPR1_MAX: u32 = 0o7777777770;
        const SMPR2_MAX: u32 = 0o777777777;
        self.adc.smpr1.write(|w| unsafe { w.bits(SMPR1_MAX) });
        self.adc.smpr2.write(|w| unsafe { w.bits(SMPR2_MAX) });
    }

    /// Clear interrupts.
    ///
    /// # Example
    ///
    /// Clear all interrupts.
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     adc::{self, Adc},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);
    /// adc.set_isr(adc::irq::ALL);
    /// ```
    pub fn set_isr(&mut self, isr: u32) {
        self.adc.isr.write(|w| unsafe { w.bits(isr) })
    }

    /// Read the interrupt status.
    pub fn isr(&self) -> u32 {
        self.adc.isr.read().bits()
    }

    /// Enable and disable interrupts.
    pub fn set_ier(&mut self, ier: u32) {
        self.adc.ier.write(|w| unsafe { w.bits(ier) })
    }

    /// Select the regular conversion trigger.
    ///
    /// # Panics
    ///
    /// * (debug) a regular conversion is in-progress
    pub fn set_regular_trigger(&mut self, trg: RegTrigger) {
        debug_assert!(self.adc.cr.read().bits() & CR_ADSTART == 0);
        // EXTSEL and EXTEN
        write_bits!(self.adc.cfgr, 0b11_1111 << 6, trg.ext());
    }

    /// Configure a single channel regular sequence, and start the conversion.
    pub fn start_chsel(&mut self, ch: Ch) {
        // L = 0, one conversion, SQ1 = ch
        self.adc.sqr1.write(|w| unsafe { w.bits(ch.number() << 6) });
        self.start_conversion();
    }

    /// Start a regular conversion.
    ///
    /// With a hardware trigger this arms the ADC for the next trigger.
    pub fn start_conversion(&mut self) {
        set_bits!(self.adc.cr, CR_ADSTART);
    }

    /// Stop a regular conversion.
    pub fn stop_conversion(&mut self) {
        if self.adc.cr.read().bits() & CR_ADSTART != 0 {
            set_bits!(self.adc.cr, CR_ADSTP);
            while self.adc.cr.read().bits() & CR_ADSTP != 0 {}
        }
    }

    /// Regular data.
    pub fn data(&self) -> u16 {
        self.adc.dr.read().bits() as u16
    }

    fn poll_data(&mut self) -> u16 {
        while self.isr() & irq::EOC == 0 {}
        // reading DR clears EOC
        self.data()
    }

    /// Configure an injected sequence of up to 4 channels and its trigger.
    ///
    /// # Errors
    ///
    /// * [`Error::InjectedLen`] if the sequence is empty or longer than 4.
    ///
    /// # Panics
    ///
    /// * (debug) an injected conversion is in-progress
    ///
    /// # Example
    ///
    /// Sample the buck-boost input and output voltages on HRTIM ADC trigger 2.
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     adc::{self, Adc, Ch, Edge, InjTrigger},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);
    /// adc.set_injected(&[Ch::In2, Ch::In4], InjTrigger::HrtimTrg2(Edge::Rising))?;
    /// adc.enable();
    /// adc.start_injected();
    /// # Ok::<(), adc::Error>(())
    /// ```
    pub fn set_injected(&mut self, chs: &[Ch], trg: InjTrigger) -> Result<(), Error> {
        debug_assert!(self.adc.cr.read().bits() & CR_JADSTART == 0);
        let val: u32 = jsqr(chs, trg)?;
        self.adc.jsqr.write(|w| unsafe { w.bits(val) });
        Ok(())
    }

    /// Start the injected sequence, or arm it for the hardware trigger.
    pub fn start_injected(&mut self) {
        set_bits!(self.adc.cr, CR_JADSTART);
    }

    /// Stop the injected sequence.
    pub fn stop_injected(&mut self) {
        if self.adc.cr.read().bits() & CR_JADSTART != 0 {
            set_bits!(self.adc.cr, CR_JADSTP);
            while self.adc.cr.read().bits() & CR_JADSTP != 0 {}
        }
    }

    /// Returns `true` if the injected sequence completed, and clears the flag.
    pub fn injected_complete(&mut self) -> bool {
        if self.isr() & irq::JEOS != 0 {
            self.set_isr(irq::JEOS | irq::JEOC);
            true
        } else {
            false
        }
    }

    /// Injected data of rank 0 to 3.
    ///
    /// # Panics
    ///
    /// * `rank` is not below [`MAX_INJECTED`], in debug builds.
    pub fn injected_data(&self, rank: usize) -> u16 {
        check_rank(rank);
        let val: u32 = match rank {
            0 => self.adc.jdr1.read().bits(),
            1 => self.adc.jdr2.read().bits(),
            2 => self.adc.jdr3.read().bits(),
            _ => self.adc.jdr4.read().bits(),
        };
        val as u16
    }

    /// Enable the temperature sensor.
    ///
    /// You **MUST** wait for the temperature sensor to start up
    /// ([`TS_START_MAX`]) before the samples will be accurate.
    pub fn enable_tsen(&mut self) {
        self.modify_ccr(CCR_TSEN, true)
    }

    /// Disable the temperature sensor.
    pub fn disable_tsen(&mut self) {
        self.modify_ccr(CCR_TSEN, false)
    }

    /// Returns `true` if the temperature sensor is enabled.
    #[must_use]
    pub fn is_tsen_enabled(&self) -> bool {
        self.ccr() & CCR_TSEN != 0
    }

    /// Enable the internal voltage reference.
    pub fn enable_vref(&mut self) {
        self.modify_ccr(CCR_VREFEN, true)
    }

    /// Disable the internal voltage reference.
    pub fn disable_vref(&mut self) {
        self.modify_ccr(CCR_VREFEN, false)
    }

    /// Returns `true` if the internal voltage reference is enabled.
    #[must_use]
    pub fn is_vref_enabled(&self) -> bool {
        self.ccr() & CCR_VREFEN != 0
    }

    /// Enable the V<sub>BAT</sub> bridge divider.
    pub fn enable_vbat(&mut self) {
        self.modify_ccr(CCR_VBATEN, true)
    }

    /// Disable the V<sub>BAT</sub> bridge divider.
    pub fn disable_vbat(&mut self) {
        self.modify_ccr(CCR_VBATEN, false)
    }

    /// Sample a channel with a software triggered regular conversion.
    ///
    /// # Panics
    ///
    /// * (debug) ADC is not enabled
    pub fn channel(&mut self, ch: Ch) -> u16 {
        debug_assert!(self.is_enabled());
        self.set_regular_trigger(RegTrigger::Software);
        self.start_chsel(ch);
        self.poll_data()
    }

    /// Sample the internal voltage reference.
    ///
    /// # Panics
    ///
    /// * (debug) ADC is not enabled
    /// * (debug) voltage reference is not enabled
    pub fn vref(&mut self) -> u16 {
        debug_assert!(self.is_vref_enabled());
        self.channel(Ch::Vref)
    }

    /// Measure V<sub>DDA</sub> in millivolts with the internal voltage
    /// reference.
    ///
    /// Returns `None` if the VREFINT sample is zero.
    pub fn vdda(&mut self) -> Option<u32> {
        vdda_millivolts(vref_cal(), self.vref())
    }

    /// Get the junction temperature in degrees Celsius.
    ///
    /// The sample time must be at least [`TS_MIN_SAMPLE`].
    ///
    /// # Panics
    ///
    /// * (debug) ADC is not enabled
    /// * (debug) temperature sensor is not enabled
    pub fn temperature(&mut self, vdda_mv: u32) -> Option<i16> {
        debug_assert!(self.is_tsen_enabled());
        let sample: u16 = self.channel(Ch::Vts);
        temperature_celsius(sample, vdda_mv, ts_cal1(), ts_cal2())
    }

    /// Sample a GPIO pin.
    ///
    /// # Panics
    ///
    /// * (debug) ADC is not enabled
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     adc::{self, Adc},
    ///     gpio::{pins::A1, Analog, PortA},
    ///     pac,
    ///     util::new_delay,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let cp: pac::CorePeripherals = pac::CorePeripherals::take().unwrap();
    ///
    /// let mut delay = new_delay(cp.SYST, &dp.RCC);
    ///
    /// let mut adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);
    /// adc.calibrate(&mut delay);
    /// adc.set_max_sample_time();
    /// adc.enable();
    ///
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    /// let a1: Analog<A1> = cortex_m::interrupt::free(|cs| Analog::new(gpioa.a1, cs));
    ///
    /// let sample: u16 = adc.pin(&a1);
    /// ```
    pub fn pin<P>(&mut self, _pin: &gpio::Analog<P>) -> u16
    where
        P: gpio::sealed::PinOps + gpio::sealed::AdcCh,
    {
        self.channel(P::ADC_CH)
    }
}

// enable and disable, RM0364 section 13.3.9
impl Adc {
    /// Returns `true` if the ADC is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.adc.cr.read().bits() & CR_ADEN != 0
    }

    /// Returns `true` if the ADC is disabled, and there is no disable command
    /// in-progress.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.adc.cr.read().bits() & (CR_ADEN | CR_ADDIS) == 0
    }

    /// Start the ADC enable procedure.
    ///
    /// Returns `true` if the caller should poll `ADRDY` for completion.
    #[must_use = "the return value indicates if you should wait for completion"]
    pub fn start_enable(&mut self) -> bool {
        if self.is_enabled() {
            false
        } else {
            self.set_isr(irq::ADRDY);
            set_bits!(self.adc.cr, CR_ADEN);
            true
        }
    }

    /// Enable the ADC and poll for completion.
    pub fn enable(&mut self) {
        if self.start_enable() {
            while self.isr() & irq::ADRDY == 0 {}
        }
    }

    /// Disable the ADC and poll for completion.
    ///
    /// This stops any conversions in-progress.
    pub fn disable(&mut self) {
        self.stop_conversion();
        self.stop_injected();
        if self.is_enabled() {
            set_bits!(self.adc.cr, CR_ADDIS);
        }
        while !self.is_disabled() {}
    }
}

// calibration, RM0364 section 13.3.8
impl Adc {
    /// Enable the voltage regulator and calibrate the ADC for single-ended
    /// inputs.
    ///
    /// This will disable the ADC if it is not already disabled.
    /// The calibration factor is lost when the ADC is reset or powered down.
    pub fn calibrate<D: DelayUs<u8>>(&mut self, delay: &mut D) {
        self.enable_vreg();
        delay.delay_us(T_ADCVREG_SETUP_MICROS);

        clear_bits!(self.adc.cr, CR_ADCALDIF);
        set_bits!(self.adc.cr, CR_ADCAL);
        while self.adc.cr.read().bits() & CR_ADCAL != 0 {}
    }

    /// Enable the ADC voltage regulator.
    ///
    /// You **MUST** wait [`T_ADCVREG_SETUP_MICROS`] before the regulator
    /// output is available. This delay is not performed for you.
    pub fn enable_vreg(&mut self) {
        self.disable();
        // ADVREGEN must pass through the intermediate state
        write_bits!(self.adc.cr, CR_ADVREGEN_MASK, 0);
        write_bits!(self.adc.cr, CR_ADVREGEN_MASK, CR_ADVREGEN_EN);
    }

    /// Disable the ADC voltage regulator.
    ///
    /// # Panics
    ///
    /// * (debug) ADC is enabled
    pub fn disable_vreg(&mut self) {
        debug_assert!(self.is_disabled());
        write_bits!(self.adc.cr, CR_ADVREGEN_MASK, 0);
        write_bits!(self.adc.cr, CR_ADVREGEN_MASK, CR_ADVREGEN_DIS);
    }

    /// Single-ended calibration factor.
    pub fn calfact(&self) -> u8 {
        (self.adc.calfact.read().bits() & 0x7F) as u8
    }

    /// Restore a saved single-ended calibration factor.
    ///
    /// # Panics
    ///
    /// * (debug) ADC is not enabled
    pub fn force_cal(&mut self, calfact: u8) {
        debug_assert!(self.is_enabled());
        write_bits!(self.adc.calfact, 0x7F, u32::from(calfact));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsqr_length() {
        assert_eq!(
            jsqr(&[], InjTrigger::Software),
            Err(Error::InjectedLen { len: 0, max: 4 })
        );
        assert_eq!(
            jsqr(&[Ch::In1; 5], InjTrigger::Software),
            Err(Error::InjectedLen { len: 5, max: 4 })
        );
        let four: u32 = jsqr(
            &[Ch::In1, Ch::In2, Ch::In3, Ch::Vref],
            InjTrigger::HrtimTrg4(Edge::Both),
        )
        .unwrap();
        assert_eq!(four & 0b11, 3);
        assert_eq!((four >> 2) & 0xF, 10);
        assert_eq!((four >> 6) & 0b11, 0b11);
        assert_eq!((four >> 26) & 0x1F, 18);
    }

    #[test]
    fn injected_ranks_in_range() {
        (0..MAX_INJECTED).for_each(check_rank);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "injected rank 4 out of range")]
    fn injected_rank_past_sequence() {
        check_rank(MAX_INJECTED);
    }

    #[test]
    fn regular_trigger_bits() {
        assert_eq!(RegTrigger::Software.ext(), 0);
        assert_eq!(
            RegTrigger::HrtimTrg3(Edge::Falling).ext(),
            (8 << 6) | (0b10 << 10)
        );
    }

    #[test]
    fn sample_time_locations() {
        assert_eq!(Ch::In1.smpr_location(), (0, 3));
        assert_eq!(Ch::In9.smpr_location(), (0, 27));
        assert_eq!(Ch::In11.smpr_location(), (1, 3));
        assert_eq!(Ch::Vref.smpr_location(), (1, 24));
    }

    #[test]
    fn sample_time_for_temperature() {
        // 2.2 µs at 72 MHz needs 158.4 cycles
        assert_eq!(Ts::at_least(TS_MIN_SAMPLE, 72_000_000), Ts::Cyc181);
        assert_eq!(Ts::at_least(TS_MIN_SAMPLE, 8_000_000), Ts::Cyc19);
        assert_eq!(Ts::at_least(Duration::from_secs(1), 72_000_000), Ts::MAX);
    }

    #[test]
    fn conversions() {
        assert_eq!(to_millivolts(0, 3300), 0);
        assert_eq!(to_millivolts(FULL_SCALE, 2900), 2900);
        assert_eq!(temperature_celsius(1000, 3300, 1000, 1000), None);
        assert_eq!(temperature_celsius(1000, 3300, 1000, 1400), Some(30));
        assert_eq!(temperature_celsius(1400, 3300, 1000, 1400), Some(110));
        assert_eq!(temperature_celsius(1200, 3300, 1000, 1400), Some(70));
    }
}
