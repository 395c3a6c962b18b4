//! Timers
//!
//! * [`Tim2`] is a blocking delay with microsecond resolution.
//! * [`Tim6`] is a periodic countdown with an update interrupt.

use embedded_hal::{
    blocking::delay::{DelayMs, DelayUs},
    timer::{Cancel, CountDown, Periodic},
};
use void::Void;

use crate::{pac, rcc};

const CR1_CEN: u32 = 1 << 0;
const CR1_URS: u32 = 1 << 2;
const CR1_OPM: u32 = 1 << 3;
const CR1_ARPE: u32 = 1 << 7;
const DIER_UIE: u32 = 1 << 0;
const SR_UIF: u32 = 1 << 0;
const EGR_UG: u32 = 1 << 0;

/// Timer errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The period does not fit in the 16-bit prescaler and reload registers,
    /// or is zero.
    Period,
    /// The timer was not running when cancelled.
    NotRunning,
}

/// Prescaler and auto-reload values for a period of `ticks` timer clocks.
///
/// The prescaler is kept as small as possible for the best resolution.
///
/// Returns `None` if `ticks` is zero or greater than 2<sup>32</sup>.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::tim::psc_arr;
///
/// // 1 kHz from a 72 MHz timer clock
/// assert_eq!(psc_arr(72_000), Some((1, 35_999)));
/// assert_eq!(psc_arr(1000), Some((0, 999)));
/// assert_eq!(psc_arr(0), None);
/// ```
pub const fn psc_arr(ticks: u64) -> Option<(u16, u16)> {
    const MAX: u64 = 1 << 16;
    if ticks == 0 || ticks > MAX * MAX {
        return None;
    }
    let psc: u64 = (ticks - 1) / MAX;
    let arr: u64 = ticks / (psc + 1) - 1;
    Some((psc as u16, arr as u16))
}

/// TIM2 microsecond delay.
///
/// TIM2 is a 32-bit timer, delays up to 2<sup>32</sup> µs (71 minutes) are
/// a single one-pulse count.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{embedded_hal::blocking::delay::DelayMs, pac, tim::Tim2};
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// let mut delay: Tim2 = Tim2::new(dp.TIM2, &mut dp.RCC);
/// delay.delay_ms(250_u32);
/// ```
#[derive(Debug)]
pub struct Tim2 {
    tim2: pac::TIM2,
}

impl Tim2 {
    /// Create a new delay timer.
    ///
    /// This will enable clocks and reset the timer.
    /// The prescaler is derived from the APB1 timer clock at the time of
    /// this call, create the timer again after changing clocks.
    pub fn new(tim2: pac::TIM2, rcc: &mut pac::RCC) -> Tim2 {
        rcc::en::apb1(rcc, rcc::en::APB1_TIM2);
        rcc::en::apb1_reset(rcc, rcc::en::APB1_TIM2);

        let psc: u32 = (rcc::apb1_timer_hz(rcc) / 1_000_000).max(1) - 1;
        tim2.psc.write(|w| unsafe { w.bits(psc) });
        // load the prescaler
        tim2.egr.write(|w| unsafe { w.bits(EGR_UG) });

        Tim2 { tim2 }
    }

    /// Free the timer peripheral from the driver.
    pub fn free(self) -> pac::TIM2 {
        self.tim2
    }
}

impl DelayUs<u32> for Tim2 {
    fn delay_us(&mut self, us: u32) {
        // an auto-reload of zero never updates
        self.tim2.arr.write(|w| unsafe { w.bits(us.max(1)) });

        // apply the reload without setting UIF
        set_bits!(self.tim2.cr1, CR1_URS);
        self.tim2.egr.write(|w| unsafe { w.bits(EGR_UG) });
        clear_bits!(self.tim2.cr1, CR1_URS);

        // the counter stops and clears CEN on the next update event
        self.tim2.cr1.write(|w| unsafe { w.bits(CR1_OPM | CR1_CEN) });
        while self.tim2.cr1.read().bits() & CR1_CEN != 0 {}
    }
}

impl DelayUs<u16> for Tim2 {
    fn delay_us(&mut self, us: u16) {
        self.delay_us(u32::from(us))
    }
}

impl DelayUs<u8> for Tim2 {
    fn delay_us(&mut self, us: u8) {
        self.delay_us(u32::from(us))
    }
}

impl DelayMs<u32> for Tim2 {
    fn delay_ms(&mut self, ms: u32) {
        // split to stay below the 32-bit limit
        const MAX_MS: u32 = u32::MAX / 1000;
        let mut ms: u32 = ms;
        while ms > MAX_MS {
            self.delay_us(MAX_MS * 1000);
            ms -= MAX_MS;
        }
        self.delay_us(ms * 1000)
    }
}

impl DelayMs<u16> for Tim2 {
    fn delay_ms(&mut self, ms: u16) {
        self.delay_ms(u32::from(ms))
    }
}

impl DelayMs<u8> for Tim2 {
    fn delay_ms(&mut self, ms: u8) {
        self.delay_ms(u32::from(ms))
    }
}

/// TIM6 basic timer, periodic countdown.
///
/// The [`CountDown`] time unit is microseconds.
///
/// # Example
///
/// Toggle something at 2 Hz from the update interrupt.
///
/// ```no_run
/// use stm32f3xx_hal::{pac, tim::Tim6};
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// let mut tim6: Tim6 = Tim6::new(dp.TIM6, &mut dp.RCC);
/// tim6.start_hz(2).unwrap();
/// tim6.listen();
/// unsafe { pac::NVIC::unmask(pac::Interrupt::TIM6_DAC1) };
/// ```
#[derive(Debug)]
pub struct Tim6 {
    tim6: pac::TIM6,
    clk_hz: u32,
}

impl Tim6 {
    /// Create a new TIM6 driver.
    ///
    /// This will enable clocks and reset the timer.
    pub fn new(tim6: pac::TIM6, rcc: &mut pac::RCC) -> Tim6 {
        rcc::en::apb1(rcc, rcc::en::APB1_TIM6);
        rcc::en::apb1_reset(rcc, rcc::en::APB1_TIM6);
        Tim6 {
            tim6,
            clk_hz: rcc::apb1_timer_hz(rcc),
        }
    }

    /// Free the timer peripheral from the driver.
    pub fn free(self) -> pac::TIM6 {
        self.tim6
    }

    /// Timer input clock in hertz.
    #[inline]
    pub const fn clk_hz(&self) -> u32 {
        self.clk_hz
    }

    fn start_ticks(&mut self, ticks: u64) -> Result<(), Error> {
        let (psc, arr): (u16, u16) = psc_arr(ticks).ok_or(Error::Period)?;
        clear_bits!(self.tim6.cr1, CR1_CEN);
        self.tim6.psc.write(|w| unsafe { w.bits(u32::from(psc)) });
        self.tim6.arr.write(|w| unsafe { w.bits(u32::from(arr)) });
        // load the prescaler and reset the counter without an interrupt
        set_bits!(self.tim6.cr1, CR1_URS);
        self.tim6.egr.write(|w| unsafe { w.bits(EGR_UG) });
        self.tim6.sr.write(|w| unsafe { w.bits(!SR_UIF) });
        set_bits!(self.tim6.cr1, CR1_ARPE | CR1_CEN);
        Ok(())
    }

    /// Start the timer with an update frequency in hertz.
    ///
    /// # Errors
    ///
    /// * [`Error::Period`] if the frequency is zero or too low for the
    ///   16-bit prescaler and reload.
    pub fn start_hz(&mut self, hz: u32) -> Result<(), Error> {
        if hz == 0 {
            return Err(Error::Period);
        }
        self.start_ticks(u64::from(self.clk_hz / hz))
    }

    /// Start the timer with a period in microseconds.
    ///
    /// # Errors
    ///
    /// * [`Error::Period`] if the period is zero or too long for the
    ///   16-bit prescaler and reload.
    pub fn start_us(&mut self, us: u32) -> Result<(), Error> {
        self.start_ticks(u64::from(self.clk_hz) * u64::from(us) / 1_000_000)
    }

    /// Returns `true` if the counter is enabled.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.tim6.cr1.read().bits() & CR1_CEN != 0
    }

    /// Enable the update interrupt.
    #[inline]
    pub fn listen(&mut self) {
        set_bits!(self.tim6.dier, DIER_UIE);
    }

    /// Disable the update interrupt.
    #[inline]
    pub fn unlisten(&mut self) {
        clear_bits!(self.tim6.dier, DIER_UIE);
    }

    /// Returns `true` if an update event is pending.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.tim6.sr.read().bits() & SR_UIF != 0
    }

    /// Clear the update flag.
    #[inline]
    pub fn clear_irq(&mut self) {
        self.tim6.sr.write(|w| unsafe { w.bits(!SR_UIF) });
    }

    /// Clear the update flag from an interrupt handler.
    ///
    /// # Safety
    ///
    /// 1. TIM6 must not be reconfigured concurrently.
    #[inline]
    pub unsafe fn clear_irq_from_isr() {
        unsafe { (*pac::TIM6::ptr()).sr.write(|w| w.bits(!SR_UIF)) }
    }
}

impl CountDown for Tim6 {
    type Time = u32;

    /// Start a periodic countdown of `count` microseconds.
    ///
    /// # Panics
    ///
    /// * (debug) the period cannot be represented.
    fn start<T>(&mut self, count: T)
    where
        T: Into<Self::Time>,
    {
        let result: Result<(), Error> = self.start_us(count.into());
        debug_assert!(result.is_ok());
    }

    fn wait(&mut self) -> nb::Result<(), Void> {
        if self.is_pending() {
            self.clear_irq();
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

impl Periodic for Tim6 {}

impl Cancel for Tim6 {
    type Error = Error;

    fn cancel(&mut self) -> Result<(), Self::Error> {
        if !self.is_running() {
            return Err(Error::NotRunning);
        }
        clear_bits!(self.tim6.cr1, CR1_CEN);
        self.clear_irq();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::psc_arr;

    #[test]
    fn psc_arr_limits() {
        assert_eq!(psc_arr(1), Some((0, 0)));
        assert_eq!(psc_arr(65_536), Some((0, 65_535)));
        assert_eq!(psc_arr(65_537), Some((1, 32_767)));
        assert_eq!(psc_arr(1 << 32), Some((65_535, 65_535)));
        assert_eq!(psc_arr((1 << 32) + 1), None);
    }

    #[test]
    fn period_error_small() {
        // 1 Hz from 72 MHz
        let (psc, arr) = psc_arr(72_000_000).unwrap();
        let actual: u64 = (u64::from(psc) + 1) * (u64::from(arr) + 1);
        assert!(72_000_000 - actual < u64::from(psc) + 1);
    }
}
