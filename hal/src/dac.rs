//! Digital to analog converter (DAC1 channel 1)

use crate::{pac, rcc};

use crate::gpio::{Analog, pins::A4};

/// Full scale value of the 12-bit right aligned data.
pub const FULL_SCALE: u16 = 4095;

const CR_EN1: u32 = 1 << 0;
const CR_BOFF1: u32 = 1 << 1;
const CR_TEN1: u32 = 1 << 2;
const CR_TSEL1_MASK: u32 = 0b111 << 3;
const CR_TSEL1_SW: u32 = 0b111 << 3;
const CH1_MASK: u32 = 0xFFFF;

/// DAC output buffer modes with the A4 output pin.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModePin {
    /// Output buffer enabled, for a high drive capability.
    Buf,
    /// Output buffer disabled, the output reaches the rails.
    NoBuf,
}

/// Convert millivolts to a 12-bit DAC code.
///
/// Values above V<sub>DDA</sub> saturate to full scale.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::dac::millivolts_to_code;
///
/// assert_eq!(millivolts_to_code(0, 3300), 0);
/// assert_eq!(millivolts_to_code(1650, 3300), 2048);
/// assert_eq!(millivolts_to_code(3300, 3300), 4095);
/// assert_eq!(millivolts_to_code(5000, 3300), 4095);
/// ```
pub const fn millivolts_to_code(mv: u32, vdda_mv: u32) -> u16 {
    if vdda_mv == 0 || mv >= vdda_mv {
        FULL_SCALE
    } else {
        ((mv * FULL_SCALE as u32 + vdda_mv / 2) / vdda_mv) as u16
    }
}

/// Digital to analog converter driver
#[derive(Debug)]
pub struct Dac {
    dac: pac::DAC1,
    out: Option<Analog<A4>>,
}

impl Dac {
    /// Create a new DAC driver from a DAC peripheral.
    ///
    /// This will enable clocks and reset the DAC peripheral.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{dac::Dac, pac};
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let mut dac = Dac::new(dp.DAC1, &mut dp.RCC);
    /// ```
    pub fn new(dac: pac::DAC1, rcc: &mut pac::RCC) -> Dac {
        Self::enable_clock(rcc);
        unsafe { Self::pulse_reset(rcc) };
        Dac { dac, out: None }
    }

    /// Steal the DAC peripheral from whatever is currently using it.
    ///
    /// This will **not** initialize the DAC peripheral (unlike [`new`]).
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the DAC has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. You are responsible for setting up the DAC correctly.
    ///
    /// [`new`]: Dac::new
    pub unsafe fn steal() -> Dac {
        Dac {
            dac: unsafe { pac::Peripherals::steal() }.DAC1,
            out: None,
        }
    }

    /// Free the DAC peripheral from the driver.
    pub fn free(self) -> (pac::DAC1, Option<Analog<A4>>) {
        (self.dac, self.out)
    }

    /// Enable the DAC clock.
    ///
    /// This is done for you in [`new`](Dac::new)
    pub fn enable_clock(rcc: &mut pac::RCC) {
        rcc::en::apb1(rcc, rcc::en::APB1_DAC1)
    }

    /// Disable the DAC clock.
    ///
    /// # Safety
    ///
    /// 1. You cannot use the DAC while the clock is disabled.
    /// 2. You are responsible for re-enabling the clock before resuming use
    ///    of the DAC.
    pub unsafe fn disable_clock(rcc: &mut pac::RCC) {
        rcc::en::apb1_disable(rcc, rcc::en::APB1_DAC1)
    }

    /// Reset the DAC.
    ///
    /// # Safety
    ///
    /// 1. The DAC must not be in-use.
    /// 2. You are responsible for setting up the DAC after a reset.
    pub unsafe fn pulse_reset(rcc: &mut pac::RCC) {
        rcc::en::apb1_reset(rcc, rcc::en::APB1_DAC1)
    }

    /// Drive the A4 pin.
    ///
    /// # Panics
    ///
    /// * (debug) DAC channel is enabled
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     dac::{Dac, ModePin},
    ///     gpio::{Analog, PortA},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    ///
    /// cortex_m::interrupt::free(|cs| dac.set_mode_pin(Analog::new(gpioa.a4, cs), ModePin::Buf));
    /// ```
    pub fn set_mode_pin(&mut self, a4: Analog<A4>, mode: ModePin) {
        debug_assert!(!self.is_enabled());
        match mode {
            ModePin::Buf => clear_bits!(self.dac.cr, CR_BOFF1),
            ModePin::NoBuf => set_bits!(self.dac.cr, CR_BOFF1),
        }
        self.out = Some(a4)
    }

    /// Use the DAC for on-chip peripherals only, the comparator inverting
    /// inputs.
    ///
    /// Returns the A4 pin if the DAC had ownership of it.
    ///
    /// # Panics
    ///
    /// * (debug) DAC channel is enabled
    pub fn set_mode_chip(&mut self) -> Option<Analog<A4>> {
        debug_assert!(!self.is_enabled());
        set_bits!(self.dac.cr, CR_BOFF1);
        self.out.take()
    }

    /// Returns `true` if the DAC channel is enabled.
    pub fn is_enabled(&self) -> bool {
        self.dac.cr.read().bits() & CR_EN1 != 0
    }

    /// Setup the DAC for use with a software trigger.
    ///
    /// This will enable the DAC.
    pub fn setup_soft_trigger(&mut self) {
        write_bits!(
            self.dac.cr,
            CR_TSEL1_MASK | CR_TEN1 | CR_EN1,
            CR_TSEL1_SW | CR_TEN1 | CR_EN1
        );
    }

    /// Enable the DAC without a trigger.
    ///
    /// Values written with [`set_value`](Self::set_value) are output one APB1
    /// clock cycle later.
    pub fn enable(&mut self) {
        write_bits!(self.dac.cr, CR_TEN1 | CR_EN1, CR_EN1);
    }

    /// Disable the DAC.
    pub fn disable(&mut self) {
        write_bits!(self.dac.cr, CH1_MASK, 0);
    }

    /// Write the 12-bit right aligned value.
    ///
    /// **Note:** Only the lower 12 bits of `val` are used.
    pub fn set_value(&mut self, val: u16) {
        self.dac
            .dhr12r1
            .write(|w| unsafe { w.bits(u32::from(val & FULL_SCALE)) });
    }

    /// Set the value of the DAC output with a software trigger.
    ///
    /// # Panics
    ///
    /// * (debug) DAC trigger is not set to software
    /// * (debug) DAC is not enabled
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{dac::Dac, pac};
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
    ///
    /// dac.setup_soft_trigger();
    /// dac.soft_trigger(1234);
    /// assert_eq!(dac.out(), 1234);
    /// ```
    pub fn soft_trigger(&mut self, val: u16) {
        let cr: u32 = self.dac.cr.read().bits();
        debug_assert_eq!(cr & CR_TSEL1_MASK, CR_TSEL1_SW);
        debug_assert!(cr & CR_EN1 != 0);
        self.set_value(val);
        self.dac.swtrigr.write(|w| unsafe { w.bits(1) });
    }

    /// Get the current DAC output.
    pub fn out(&self) -> u16 {
        (self.dac.dor1.read().bits() & u32::from(FULL_SCALE)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_rounding() {
        assert_eq!(millivolts_to_code(1, 3300), 1);
        assert_eq!(millivolts_to_code(1000, 3300), 1241);
        assert_eq!(millivolts_to_code(100, 0), FULL_SCALE);
    }
}
