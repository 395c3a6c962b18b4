//! Real-time clock
//!
//! The RTC is in the backup domain, it keeps running through system resets
//! and standby while V<sub>BAT</sub> or V<sub>DD</sub> is present.

mod alarm;

pub use alarm::{Alarm, AlarmDay};

use crate::{
    pac, pwr,
    rcc::{HSE_HZ, LSE_HZ, LSI_HZ},
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Binary coded decimal helpers.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::rtc::bcd;
///
/// assert_eq!(bcd::encode(59), 0x59);
/// assert_eq!(bcd::decode(0x59), 59);
/// ```
pub mod bcd {
    /// Encode a value in 0..=99 as two BCD digits.
    pub const fn encode(val: u8) -> u8 {
        ((val / 10) << 4) | (val % 10)
    }

    /// Decode two BCD digits.
    pub const fn decode(bcd: u8) -> u8 {
        (bcd >> 4) * 10 + (bcd & 0xF)
    }
}

/// RTC clock selection
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Clk {
    /// LSE oscillator clock selected.
    Lse = 0b01,
    /// LSI oscillator clock selected.
    Lsi = 0b10,
    /// HSE oscillator clock divided by 32 selected.
    Hse = 0b11,
}

impl Clk {
    const fn from_bits(bits: u32) -> Option<Clk> {
        match bits & 0b11 {
            0b01 => Some(Clk::Lse),
            0b10 => Some(Clk::Lsi),
            0b11 => Some(Clk::Hse),
            _ => None,
        }
    }

    /// Source clock frequency in hertz.
    pub const fn hz(self) -> u32 {
        match self {
            Clk::Lse => LSE_HZ,
            Clk::Lsi => LSI_HZ,
            Clk::Hse => HSE_HZ / 32,
        }
    }

    /// Asynchronous and synchronous prescalers for a 1 Hz calendar clock.
    ///
    /// The asynchronous prescaler is kept high to minimize consumption.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::rtc::Clk;
    ///
    /// let (a, s) = Clk::Lse.prescalers();
    /// assert_eq!((u32::from(a) + 1) * (u32::from(s) + 1), 32_768);
    /// ```
    pub const fn prescalers(self) -> (u8, u16) {
        match self {
            // (127 + 1) × (255 + 1) = 32_768 Hz
            Clk::Lse => (127, 255),
            // (99 + 1) × (399 + 1) = 40_000 Hz
            Clk::Lsi => (99, 399),
            // (124 + 1) × (1_999 + 1) = 250_000 Hz
            Clk::Hse => (124, 1_999),
        }
    }
}

/// Status (interrupt) masks of the `ISR` register.
///
/// Used for [`Rtc::clear_status`].
pub mod stat {
    /// Recalibration pending flag
    pub const RECALPF: u32 = 1 << 16;
    /// Tamper 3 flag
    pub const TAMP3: u32 = 1 << 15;
    /// Tamper 2 flag
    pub const TAMP2: u32 = 1 << 14;
    /// Tamper 1 flag
    pub const TAMP1: u32 = 1 << 13;
    /// Timestamp overflow flag
    pub const TSOV: u32 = 1 << 12;
    /// Timestamp flag
    pub const TS: u32 = 1 << 11;
    /// Wakeup timer flag
    pub const WUT: u32 = 1 << 10;
    /// Alarm B flag
    pub const ALRB: u32 = 1 << 9;
    /// Alarm A flag
    pub const ALRA: u32 = 1 << 8;

    /// All clearable status flags.
    pub const ALL: u32 = TAMP3 | TAMP2 | TAMP1 | TSOV | TS | WUT | ALRB | ALRA;

    /// Alarm A & B flags.
    pub const ALR_ALL: u32 = ALRA | ALRB;
}

const ISR_WUTWF: u32 = 1 << 2;
const ISR_INITS: u32 = 1 << 4;
const ISR_RSF: u32 = 1 << 5;
const ISR_INITF: u32 = 1 << 6;
const ISR_INIT: u32 = 1 << 7;

const CR_WUCKSEL_MASK: u32 = 0b111;
const CR_WUCKSEL_SPRE: u32 = 0b100;
const CR_WUCKSEL_SPRE_OFFSET: u32 = 0b110;
const CR_BYPSHAD: u32 = 1 << 5;
const CR_FMT: u32 = 1 << 6;
const CR_ALRAE: u32 = 1 << 8;
const CR_ALRBE: u32 = 1 << 9;
const CR_WUTE: u32 = 1 << 10;
const CR_ALRAIE: u32 = 1 << 12;
const CR_ALRBIE: u32 = 1 << 13;
const CR_WUTIE: u32 = 1 << 14;

const CALR_CALP: u32 = 1 << 15;

const BDCR_RTCSEL_SHIFT: u32 = 8;
const BDCR_RTCSEL_MASK: u32 = 0b11 << BDCR_RTCSEL_SHIFT;
const BDCR_RTCEN: u32 = 1 << 15;

const BKP_BASE: usize = 0x4000_2850;

/// Number of 32-bit backup registers.
#[cfg(feature = "stm32f334")]
pub const NUM_BKP: usize = 16;
/// Number of 32-bit backup registers.
#[cfg(feature = "stm32f373")]
pub const NUM_BKP: usize = 32;

/// Longest wakeup timer period in seconds, 2<sup>17</sup>.
pub const MAX_WAKEUP_SEC: u32 = 1 << 17;

/// RTC errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Year out of the 2000..=2099 calendar range.
    Year(i32),
    /// Backup domain write protection is enabled.
    WriteProtected,
}

/// Wakeup timer `WUCKSEL` and `WUT` values for a period of `sec` seconds.
///
/// Periods from 1 to 2<sup>16</sup> seconds use the 1 Hz clock directly,
/// longer periods add 2<sup>16</sup> to the reload value.
/// Values outside of 1..=2<sup>17</sup> saturate.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::rtc::wakeup_reload;
///
/// assert_eq!(wakeup_reload(1), (0b100, 0));
/// assert_eq!(wakeup_reload(3600), (0b100, 3599));
/// assert_eq!(wakeup_reload(65_537), (0b110, 0));
/// ```
pub const fn wakeup_reload(sec: u32) -> (u32, u16) {
    let sec: u32 = match sec {
        0 => 1,
        s if s > MAX_WAKEUP_SEC => MAX_WAKEUP_SEC,
        s => s,
    };
    let reload: u32 = sec - 1;
    if reload <= u16::MAX as u32 {
        (CR_WUCKSEL_SPRE, reload as u16)
    } else {
        (CR_WUCKSEL_SPRE_OFFSET, (reload - (1 << 16)) as u16)
    }
}

/// `RTC_TR` value of a time, in 24 hour format.
pub fn time_to_tr(time: &NaiveTime) -> u32 {
    (u32::from(bcd::encode(time.hour() as u8)) << 16)
        | (u32::from(bcd::encode(time.minute() as u8)) << 8)
        | u32::from(bcd::encode(time.second() as u8))
}

/// `RTC_DR` value of a date.
///
/// # Errors
///
/// * [`Error::Year`] if the year is outside of 2000..=2099.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use stm32f3xx_hal::rtc::{date_to_dr, Error};
///
/// let date: NaiveDate = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
/// // Thursday is weekday 4
/// assert_eq!(date_to_dr(&date), Ok(0x0024_8229));
/// let date: NaiveDate = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
/// assert_eq!(date_to_dr(&date), Err(Error::Year(2100)));
/// ```
pub fn date_to_dr(date: &NaiveDate) -> Result<u32, Error> {
    let year: i32 = date.year();
    if !(2000..2100).contains(&year) {
        return Err(Error::Year(year));
    }
    Ok((u32::from(bcd::encode((year - 2000) as u8)) << 16)
        | (date.weekday().number_from_monday() << 13)
        | (u32::from(bcd::encode(date.month() as u8)) << 8)
        | u32::from(bcd::encode(date.day() as u8)))
}

/// Calendar time from `RTC_TR` and the sub-second microseconds.
pub fn tr_to_time(tr: u32, micro: u32) -> Option<NaiveTime> {
    let mut hour: u32 = bcd::decode(((tr >> 16) & 0x3F) as u8).into();
    // PM bit, only set in 12 hour format
    if tr & (1 << 22) != 0 {
        hour += 12;
    }
    let minute: u32 = bcd::decode(((tr >> 8) & 0x7F) as u8).into();
    let second: u32 = bcd::decode((tr & 0x7F) as u8).into();
    NaiveTime::from_hms_micro_opt(hour, minute, second, micro)
}

/// Calendar date from `RTC_DR`.
pub fn dr_to_date(dr: u32) -> Option<NaiveDate> {
    let year: i32 = 2000 + i32::from(bcd::decode(((dr >> 16) & 0xFF) as u8));
    let month: u32 = bcd::decode(((dr >> 8) & 0x1F) as u8).into();
    let day: u32 = bcd::decode((dr & 0x3F) as u8).into();
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Sub-second fraction in microseconds.
///
/// fraction = (PREDIV_S - SS) / (PREDIV_S + 1)
pub const fn ss_to_us(ss: u32, prediv_s: u32) -> u32 {
    // SS is only larger than PREDIV_S after a shift operation
    let ss: u32 = if ss > prediv_s { prediv_s } else { ss };
    (((prediv_s - ss) * 100_000) / (prediv_s + 1)) * 10
}

/// Real-time clock driver.
#[derive(Debug)]
pub struct Rtc {
    rtc: pac::RTC,
}

impl Rtc {
    /// Create a new real-time clock driver.
    ///
    /// This will enable backup domain write access, select the clock source,
    /// and configure the prescalers for a 1 Hz calendar clock.
    /// This will **not** start the source clock.
    ///
    /// The RTC is in the backup domain; system resets will not reset the RTC.
    /// You are responsible for resetting the backup domain if required, the
    /// clock source can only be changed after a backup domain reset.
    ///
    /// # Panics
    ///
    /// * (debug) clock source is not ready.
    ///
    /// # Example
    ///
    /// LSI clock source:
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     pac,
    ///     rcc::{enable_lsi, pulse_reset_backup_domain},
    ///     rtc::{Clk, Rtc},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// unsafe { pulse_reset_backup_domain(&mut dp.RCC, &mut dp.PWR) };
    /// enable_lsi(&mut dp.RCC);
    ///
    /// let rtc: Rtc = Rtc::new(dp.RTC, Clk::Lsi, &mut dp.PWR, &mut dp.RCC);
    /// ```
    pub fn new(rtc: pac::RTC, clk: Clk, pwr: &mut pac::PWR, rcc: &mut pac::RCC) -> Rtc {
        pwr::enable_clock(rcc);
        pwr::enable_backup_access(pwr);

        debug_assert!(match clk {
            Clk::Lse => rcc.bdcr.read().bits() & (1 << 1) != 0,
            Clk::Lsi => rcc.csr.read().bits() & (1 << 1) != 0,
            Clk::Hse => rcc.cr.read().bits() & (1 << 17) != 0,
        });
        write_bits!(
            rcc.bdcr,
            BDCR_RTCSEL_MASK | BDCR_RTCEN,
            ((clk as u32) << BDCR_RTCSEL_SHIFT) | BDCR_RTCEN
        );

        let mut rtc: Rtc = Rtc { rtc };
        rtc.disable_write_protect();
        rtc.configure_prescaler(clk);
        rtc
    }

    /// Create a new real-time clock driver preserving backup domain values.
    ///
    /// If the RTC is not already running from the LSE this will start the
    /// LSE and configure the RTC for it.
    ///
    /// # Safety
    ///
    /// 1. This function relies on global hardware state in the backup domain.
    ///    The backup domain is **not** reset with normal system resets.
    ///    Reset the backup domain before calling this function if determinism
    ///    is required.
    pub unsafe fn renew(rtc: pac::RTC, pwr: &mut pac::PWR, rcc: &mut pac::RCC) -> Rtc {
        pwr::enable_clock(rcc);
        pwr::enable_backup_access(pwr);

        let bdcr: u32 = rcc.bdcr.read().bits();
        let running: bool = Clk::from_bits(bdcr >> BDCR_RTCSEL_SHIFT) == Some(Clk::Lse)
            && bdcr & BDCR_RTCEN != 0;
        crate::rcc::enable_lse(rcc);
        if running {
            let mut rtc: Rtc = Rtc { rtc };
            rtc.disable_write_protect();
            rtc
        } else {
            Rtc::new(rtc, Clk::Lse, pwr, rcc)
        }
    }

    /// Free the RTC peripheral from the driver.
    pub fn free(self) -> pac::RTC {
        self.rtc
    }

    /// Selected clock source, `None` if no clock is selected.
    #[inline]
    pub fn clk(rcc: &pac::RCC) -> Option<Clk> {
        Clk::from_bits(rcc.bdcr.read().bits() >> BDCR_RTCSEL_SHIFT)
    }

    /// Source clock frequency in hertz.
    #[inline]
    pub fn hz(rcc: &pac::RCC) -> u32 {
        Self::clk(rcc).map_or(0, Clk::hz)
    }

    /// Read the RTC status (interrupt) flags.
    ///
    /// Status flag masks can be found in [`stat`].
    #[inline]
    pub fn status() -> u32 {
        // safety: atomic read with no side-effects
        unsafe { (*pac::RTC::ptr()).isr.read().bits() }
    }

    /// Clear status (interrupt) flags.
    ///
    /// Status flag masks can be found in [`stat`].
    /// The flags are cleared by writing zero, this is safe to call from an
    /// interrupt handler.
    #[inline]
    pub fn clear_status(mask: u32) {
        // safety: flags are write zero to clear, ones are ignored
        unsafe {
            (*pac::RTC::ptr())
                .isr
                .modify(|r, w| w.bits((r.bits() & ISR_INIT) | (stat::ALL & !mask)))
        }
    }

    fn enter_init(&mut self) {
        set_bits!(self.rtc.isr, ISR_INIT);
        while self.rtc.isr.read().bits() & ISR_INITF == 0 {}
    }

    fn exit_init(&mut self) {
        clear_bits!(self.rtc.isr, ISR_INIT);
    }

    fn configure_prescaler(&mut self, clk: Clk) {
        let (a_pre, s_pre): (u8, u16) = clk.prescalers();
        self.enter_init();
        // 24 hour format, read the counters directly
        write_bits!(self.rtc.cr, CR_FMT | CR_BYPSHAD, CR_BYPSHAD);
        // PREDIV_S must be written before PREDIV_A
        self.rtc.prer.write(|w| unsafe { w.bits(u32::from(s_pre)) });
        self.rtc
            .prer
            .write(|w| unsafe { w.bits((u32::from(a_pre) << 16) | u32::from(s_pre)) });
        self.exit_init();
    }

    /// Set the date and time.
    ///
    /// The counting restarts 4 RTCCLK cycles after this function returns.
    ///
    /// # Errors
    ///
    /// * [`Error::Year`] if the year is outside of 2000..=2099.
    /// * [`Error::WriteProtected`] if backup domain write protection is
    ///   enabled.
    pub fn set_date_time(&mut self, date_time: NaiveDateTime) -> Result<(), Error> {
        // safety: atomic read with no side effects
        if !pwr::backup_access(unsafe { &*pac::PWR::ptr() }) {
            return Err(Error::WriteProtected);
        }
        let dr: u32 = date_to_dr(&date_time.date())?;
        let tr: u32 = time_to_tr(&date_time.time());

        self.enter_init();
        self.rtc.tr.write(|w| unsafe { w.bits(tr) });
        self.rtc.dr.write(|w| unsafe { w.bits(dr) });
        self.exit_init();
        Ok(())
    }

    /// Returns `None` if the calendar is uninitialized.
    #[inline]
    pub fn calendar_initialized(&self) -> Option<()> {
        (self.rtc.isr.read().bits() & ISR_INITS != 0).then_some(())
    }

    /// Returns `true` if the shadow registers are synchronized.
    #[inline]
    pub fn synchronized(&self) -> bool {
        self.rtc.isr.read().bits() & ISR_RSF != 0
    }

    /// Smooth digital calibration.
    ///
    /// The calibration argument is in units of 0.9537 ppm, positive values
    /// speed up the clock.
    /// The calibration range is -487.1 ppm to +488.5 ppm (-511 to 512), values
    /// outside of this range will saturate.
    pub fn calibrate(&mut self, calibration: i16) {
        while self.recalibration_pending() {}
        let calr: u32 = match u16::try_from(calibration) {
            Ok(pos) => CALR_CALP | u32::from(512_u16.saturating_sub(pos)),
            Err(_) => u32::from(calibration.unsigned_abs().min(511)),
        };
        self.rtc.calr.write(|w| unsafe { w.bits(calr) })
    }

    /// Returns `true` if recalibration is pending.
    #[inline]
    pub fn recalibration_pending(&self) -> bool {
        self.rtc.isr.read().bits() & stat::RECALPF != 0
    }

    /// Calendar date.
    ///
    /// Returns `None` if the calendar has not been initialized.
    pub fn date(&self) -> Option<NaiveDate> {
        self.calendar_initialized()?;
        dr_to_date(self.rtc.dr.read().bits())
    }

    fn prediv_s(&self) -> u32 {
        self.rtc.prer.read().bits() & 0x7FFF
    }

    /// Current time.
    ///
    /// Returns `None` if the calendar has not been initialized.
    pub fn time(&self) -> Option<NaiveTime> {
        self.date_time().map(|dt| dt.time())
    }

    /// Calendar date and time.
    ///
    /// Returns `None` if the calendar has not been initialized.
    pub fn date_time(&self) -> Option<NaiveDateTime> {
        let prediv_s: u32 = self.prediv_s();
        loop {
            self.calendar_initialized()?;
            let ss: u32 = self.rtc.ssr.read().bits() & 0xFFFF;
            let dr: u32 = self.rtc.dr.read().bits();
            let tr: u32 = self.rtc.tr.read().bits();

            // with the shadow registers bypassed an RTCCLK edge during the
            // reads gives inconsistent values, retry until SSR is stable
            let ss_after: u32 = self.rtc.ssr.read().bits() & 0xFFFF;
            if ss == ss_after {
                let date: NaiveDate = dr_to_date(dr)?;
                let time: NaiveTime = tr_to_time(tr, ss_to_us(ss, prediv_s))?;
                return Some(date.and_time(time));
            }
        }
    }

    /// Setup the periodic wakeup timer for `sec` seconds.
    ///
    /// `sec` can only go up to [`MAX_WAKEUP_SEC`] (36 hours), values greater
    /// than this will be set to the maximum.
    ///
    /// # Example
    ///
    /// Setup the wakeup timer to go off in 1 hour, without interrupts.
    ///
    /// ```no_run
    /// # use stm32f3xx_hal::{pac, rtc};
    /// # let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// # let mut rtc = rtc::Rtc::new(dp.RTC, rtc::Clk::Lsi, &mut dp.PWR, &mut dp.RCC);
    /// rtc.setup_wakeup_timer(3600, false);
    /// ```
    pub fn setup_wakeup_timer(&mut self, sec: u32, irq_en: bool) {
        clear_bits!(self.rtc.cr, CR_WUTE);
        while self.rtc.isr.read().bits() & ISR_WUTWF == 0 {}

        let (wucksel, wut): (u32, u16) = wakeup_reload(sec);
        self.rtc.wutr.write(|w| unsafe { w.bits(u32::from(wut)) });
        let ie: u32 = if irq_en { CR_WUTIE } else { 0 };
        write_bits!(
            self.rtc.cr,
            CR_WUCKSEL_MASK | CR_WUTIE | CR_WUTE,
            wucksel | ie | CR_WUTE
        );
    }

    /// Returns `true` if the wakeup timer is enabled.
    #[inline]
    pub fn is_wakeup_timer_en(&self) -> bool {
        self.rtc.cr.read().bits() & CR_WUTE != 0
    }

    /// Disable the wakeup timer.
    #[inline]
    pub fn disable_wakeup_timer(&mut self) {
        clear_bits!(self.rtc.cr, CR_WUTE | CR_WUTIE);
    }

    /// Wakeup timer period in seconds.
    pub fn wakeup_period_sec(&self) -> u32 {
        let wut: u32 = self.rtc.wutr.read().bits() & 0xFFFF;
        if self.rtc.cr.read().bits() & CR_WUCKSEL_MASK == CR_WUCKSEL_SPRE_OFFSET {
            wut + 0x1_0001
        } else {
            wut + 1
        }
    }

    /// Set alarm A.
    ///
    /// This will disable the alarm if previously enabled.
    ///
    /// This will not enable the alarm after setup.
    /// To enable the alarm use [`set_alarm_a_en`](Self::set_alarm_a_en).
    pub fn set_alarm_a(&mut self, alarm: &Alarm) {
        clear_bits!(self.rtc.cr, CR_ALRAE);
        self.rtc.alrmar().write(|w| unsafe { w.bits(alarm.val) });
        self.rtc.alrmassr().write(|w| unsafe { w.bits(alarm.ssr) });
    }

    /// Returns `true` if alarm A is enabled.
    #[inline]
    #[must_use]
    pub fn is_alarm_a_en(&self) -> bool {
        self.rtc.cr.read().bits() & CR_ALRAE != 0
    }

    /// Get the value of alarm A.
    #[inline]
    #[must_use]
    pub fn alarm_a(&self) -> Alarm {
        Alarm::from_raw(
            self.rtc.alrmar().read().bits(),
            self.rtc.alrmassr().read().bits(),
        )
    }

    /// Set the alarm A enable, and alarm A interrupt enable.
    ///
    /// The alarm interrupt is on EXTI line 17, it must be unmasked in EXTI
    /// with a rising edge trigger to reach the NVIC.
    #[inline]
    pub fn set_alarm_a_en(&mut self, en: bool, irq_en: bool) {
        let val: u32 = (if en { CR_ALRAE } else { 0 }) | (if irq_en { CR_ALRAIE } else { 0 });
        write_bits!(self.rtc.cr, CR_ALRAE | CR_ALRAIE, val);
    }

    /// Set alarm B.
    ///
    /// This will disable the alarm if previously enabled.
    ///
    /// This will not enable the alarm after setup.
    /// To enable the alarm use [`set_alarm_b_en`](Self::set_alarm_b_en).
    pub fn set_alarm_b(&mut self, alarm: &Alarm) {
        clear_bits!(self.rtc.cr, CR_ALRBE);
        self.rtc.alrmbr().write(|w| unsafe { w.bits(alarm.val) });
        self.rtc.alrmbssr().write(|w| unsafe { w.bits(alarm.ssr) });
    }

    /// Returns `true` if alarm B is enabled.
    #[inline]
    #[must_use]
    pub fn is_alarm_b_en(&self) -> bool {
        self.rtc.cr.read().bits() & CR_ALRBE != 0
    }

    /// Get the value of alarm B.
    #[inline]
    #[must_use]
    pub fn alarm_b(&self) -> Alarm {
        Alarm::from_raw(
            self.rtc.alrmbr().read().bits(),
            self.rtc.alrmbssr().read().bits(),
        )
    }

    /// Set the alarm B enable, and alarm B interrupt enable.
    #[inline]
    pub fn set_alarm_b_en(&mut self, en: bool, irq_en: bool) {
        let val: u32 = (if en { CR_ALRBE } else { 0 }) | (if irq_en { CR_ALRBIE } else { 0 });
        write_bits!(self.rtc.cr, CR_ALRBE | CR_ALRBIE, val);
    }

    /// Write a backup register.
    ///
    /// # Panics
    ///
    /// * `idx` is greater than or equal to [`NUM_BKP`].
    pub fn set_backup(&mut self, idx: usize, val: u32) {
        assert!(idx < NUM_BKP);
        unsafe { core::ptr::write_volatile((BKP_BASE + idx * 4) as *mut u32, val) }
    }

    /// Read a backup register.
    ///
    /// # Panics
    ///
    /// * `idx` is greater than or equal to [`NUM_BKP`].
    pub fn backup(&self, idx: usize) -> u32 {
        assert!(idx < NUM_BKP);
        unsafe { core::ptr::read_volatile((BKP_BASE + idx * 4) as *const u32) }
    }

    /// Disable the RTC write protection.
    #[inline]
    pub fn disable_write_protect(&mut self) {
        self.rtc.wpr.write(|w| unsafe { w.bits(0xCA) });
        self.rtc.wpr.write(|w| unsafe { w.bits(0x53) });
    }

    /// Enable the RTC write protection.
    ///
    /// # Safety
    ///
    /// * You must call [`disable_write_protect`] before using any other
    ///   `&mut self` RTC method.
    ///
    /// [`disable_write_protect`]: Self::disable_write_protect
    #[inline]
    pub unsafe fn enable_write_protect(&mut self) {
        self.rtc.wpr.write(|w| unsafe { w.bits(0xFF) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcd_all() {
        for val in 0..100 {
            assert_eq!(bcd::decode(bcd::encode(val)), val);
        }
    }

    #[test]
    fn prescalers_1hz() {
        for clk in [Clk::Lse, Clk::Lsi, Clk::Hse] {
            let (a, s) = clk.prescalers();
            assert_eq!((u32::from(a) + 1) * (u32::from(s) + 1), clk.hz());
        }
    }

    #[test]
    fn wakeup_saturates() {
        assert_eq!(wakeup_reload(0), (CR_WUCKSEL_SPRE, 0));
        assert_eq!(wakeup_reload(65_536), (CR_WUCKSEL_SPRE, u16::MAX));
        assert_eq!(wakeup_reload(u32::MAX), (CR_WUCKSEL_SPRE_OFFSET, u16::MAX));
    }

    #[test]
    fn calendar_registers() {
        let dt: NaiveDateTime = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let tr: u32 = time_to_tr(&dt.time());
        assert_eq!(tr, 0x0023_5959);
        let dr: u32 = date_to_dr(&dt.date()).unwrap();
        assert_eq!(dr_to_date(dr), Some(dt.date()));
        assert_eq!(tr_to_time(tr, 0), Some(dt.time()));
        // 12 hour format, 11 PM
        assert_eq!(
            tr_to_time((1 << 22) | 0x0011_0000, 0),
            NaiveTime::from_hms_opt(23, 0, 0)
        );
    }

    #[test]
    fn subseconds() {
        assert_eq!(ss_to_us(255, 255), 0);
        assert_eq!(ss_to_us(127, 255), 500_000);
        assert_eq!(ss_to_us(300, 255), 0);
    }
}
