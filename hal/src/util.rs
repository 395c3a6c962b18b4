//! Miscellaneous utilities
use crate::pac;
use cortex_m::{delay::Delay, peripheral::syst::SystClkSource};

/// Create a new [`cortex_m::delay::Delay`] from the current CPU systick
/// frequency.
///
/// The delay is calibrated for the current clock, create it again after
/// changing the system clock.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, util::new_delay};
///
/// let dp = pac::Peripherals::take().unwrap();
/// let cp = pac::CorePeripherals::take().unwrap();
/// let delay = new_delay(cp.SYST, &dp.RCC);
/// ```
pub fn new_delay(syst: pac::SYST, rcc: &pac::RCC) -> Delay {
    Delay::new(
        syst,
        // Delay constructor will set SystClkSource::Core
        crate::rcc::cpu_systick_hz(rcc, SystClkSource::Core),
    )
}

/// Enable and zero the DWT cycle counter.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, util::start_cycle_counter};
///
/// let mut cp = pac::CorePeripherals::take().unwrap();
/// start_cycle_counter(&mut cp.DCB, &mut cp.DWT);
/// let start: u32 = pac::DWT::cycle_count();
/// ```
pub fn start_cycle_counter(dcb: &mut pac::DCB, dwt: &mut pac::DWT) {
    dcb.enable_trace();
    dwt.enable_cycle_counter();
    dwt.set_cycle_count(0);
}
