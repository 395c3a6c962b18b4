//! Comparators (COMP2, COMP4, COMP6)
//!
//! The comparator outputs are permanently connected to the HRTIM:
//!
//! | Comparator | Fault input | External events |
//! |------------|-------------|-----------------|
//! | COMP2      | FLT1        | EEV1, EEV6      |
//! | COMP4      | FLT2        | EEV2, EEV7      |
//! | COMP6      | FLT3        | EEV3, EEV8      |
//!
//! Select the comparator on the HRTIM side with
//! [`FaultSource::Internal`](crate::hrtim::FaultSource::Internal) or
//! [`EevSrc::Src2`](crate::hrtim::EevSrc::Src2).

use crate::{pac, rcc};

/// Comparator inverting input.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvInput {
    /// ¼ V<sub>REFINT</sub>.
    VrefDiv4 = 0b000,
    /// ½ V<sub>REFINT</sub>.
    VrefDiv2 = 0b001,
    /// ¾ V<sub>REFINT</sub>.
    Vref3Div4 = 0b010,
    /// V<sub>REFINT</sub>.
    Vref = 0b011,
    /// DAC1 channel 1.
    Dac1Ch1 = 0b100,
    /// DAC1 channel 2.
    Dac1Ch2 = 0b101,
    /// The comparator inverting input pin.
    Io = 0b110,
}

impl InvInput {
    const fn from_bits(bits: u32) -> InvInput {
        match bits & 0b111 {
            0b000 => InvInput::VrefDiv4,
            0b001 => InvInput::VrefDiv2,
            0b010 => InvInput::Vref3Div4,
            0b011 => InvInput::Vref,
            0b100 => InvInput::Dac1Ch1,
            0b101 => InvInput::Dac1Ch2,
            _ => InvInput::Io,
        }
    }
}

/// Output redirection to a general purpose timer.
///
/// The HRTIM connection does not depend on this selection.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum OutSel {
    #[default]
    None = 0b0000,
    Tim1Bkin = 0b0001,
    Tim1Bkin2 = 0b0010,
    Tim1OcrefClr = 0b0110,
    Tim1Ic1 = 0b0111,
    Tim2Ic4 = 0b1000,
    Tim2OcrefClr = 0b1001,
    Tim3Ic1 = 0b1010,
    Tim3OcrefClr = 0b1011,
}

/// Output polarity.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Output high when the non-inverting input is above the inverting input.
    NonInverted = 0,
    /// Output low when the non-inverting input is above the inverting input.
    Inverted = 1,
}

const EN: u32 = 1 << 0;
const INMSEL_SHIFT: u32 = 4;
const OUTSEL_SHIFT: u32 = 10;
const POL: u32 = 1 << 15;
const BLANKING_SHIFT: u32 = 18;
const OUT: u32 = 1 << 30;
const LOCK: u32 = 1 << 31;

/// Comparator control and status register (`COMPx_CSR`).
///
/// # Example
///
/// Over-current comparator against DAC1 channel 1, inverted output.
///
/// ```
/// use stm32f3xx_hal::comp::{Csr, InvInput, Polarity};
///
/// const CSR: Csr = Csr::RESET
///     .set_inv_input(InvInput::Dac1Ch1)
///     .set_polarity(Polarity::Inverted)
///     .set_enable(true);
/// assert_eq!(CSR.raw(), (0b100 << 4) | (1 << 15) | 1);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Csr {
    val: u32,
}

impl Csr {
    /// Reset value of the register.
    pub const RESET: Csr = Csr::new(0);

    /// Create a new Csr register from a raw value.
    pub const fn new(val: u32) -> Csr {
        Csr { val }
    }

    /// Get the raw value of the register.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Enable the comparator.
    #[must_use = "set_enable returns a modified Csr"]
    pub const fn set_enable(mut self, en: bool) -> Csr {
        if en {
            self.val |= EN
        } else {
            self.val &= !EN
        }
        self
    }

    /// Returns `true` if the comparator is enabled.
    pub const fn enabled(&self) -> bool {
        self.val & EN != 0
    }

    /// Set the inverting input.
    #[must_use = "set_inv_input returns a modified Csr"]
    pub const fn set_inv_input(mut self, inp: InvInput) -> Csr {
        self.val = (self.val & !(0b111 << INMSEL_SHIFT)) | ((inp as u32) << INMSEL_SHIFT);
        self
    }

    /// Inverting input.
    pub const fn inv_input(&self) -> InvInput {
        InvInput::from_bits(self.val >> INMSEL_SHIFT)
    }

    /// Set the output redirection.
    #[must_use = "set_out_sel returns a modified Csr"]
    pub const fn set_out_sel(mut self, sel: OutSel) -> Csr {
        self.val = (self.val & !(0b1111 << OUTSEL_SHIFT)) | ((sel as u32) << OUTSEL_SHIFT);
        self
    }

    /// Set the output polarity.
    #[must_use = "set_polarity returns a modified Csr"]
    pub const fn set_polarity(mut self, pol: Polarity) -> Csr {
        match pol {
            Polarity::NonInverted => self.val &= !POL,
            Polarity::Inverted => self.val |= POL,
        }
        self
    }

    /// Output polarity.
    pub const fn polarity(&self) -> Polarity {
        if self.val & POL == 0 {
            Polarity::NonInverted
        } else {
            Polarity::Inverted
        }
    }

    /// Set the blanking source, 0 disables blanking.
    ///
    /// The sources are timer compare outputs and differ per comparator,
    /// refer to RM0364 section 17.5.
    /// Only the lower 3 bits are used.
    #[must_use = "set_blanking returns a modified Csr"]
    pub const fn set_blanking(mut self, src: u8) -> Csr {
        self.val =
            (self.val & !(0b111 << BLANKING_SHIFT)) | (((src & 0b111) as u32) << BLANKING_SHIFT);
        self
    }

    /// Blanking source.
    pub const fn blanking(&self) -> u8 {
        ((self.val >> BLANKING_SHIFT) & 0b111) as u8
    }

    /// Lock the register until the next reset.
    #[must_use = "set_lock returns a modified Csr"]
    pub const fn set_lock(mut self) -> Csr {
        self.val |= LOCK;
        self
    }

    /// Returns `true` if the register is locked.
    pub const fn locked(&self) -> bool {
        self.val & LOCK != 0
    }

    /// Output level, read-only.
    pub const fn output(&self) -> bool {
        self.val & OUT != 0
    }
}

impl From<u32> for Csr {
    fn from(val: u32) -> Self {
        Self { val }
    }
}

impl From<Csr> for u32 {
    fn from(csr: Csr) -> Self {
        csr.val
    }
}

impl Default for Csr {
    fn default() -> Self {
        Csr::RESET
    }
}

/// Comparator errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The comparator register is locked until the next reset.
    Locked,
}

/// Comparator `N`.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Comp<const N: u8> {
    _priv: (),
}

/// COMP2
pub type Comp2 = Comp<2>;
/// COMP4
pub type Comp4 = Comp<4>;
/// COMP6
pub type Comp6 = Comp<6>;

impl<const N: u8> Comp<N> {
    fn regs() -> &'static pac::comp::RegisterBlock {
        unsafe { &*pac::COMP::ptr() }
    }

    /// Steal the comparator.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the comparator has exclusive access
    ///    to its register.
    /// 2. The SYSCFG clock must be enabled.
    pub const unsafe fn steal() -> Comp<N> {
        Comp { _priv: () }
    }

    /// Current register value.
    pub fn csr(&self) -> Csr {
        let regs = Self::regs();
        Csr::new(match N {
            2 => regs.comp2_csr.read().bits(),
            4 => regs.comp4_csr.read().bits(),
            _ => regs.comp6_csr.read().bits(),
        })
    }

    /// Write the register.
    ///
    /// The output bit of `csr` is ignored.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is locked.
    pub fn set_csr(&mut self, csr: Csr) -> Result<(), Error> {
        if self.csr().locked() {
            Err(Error::Locked)
        } else {
            let val: u32 = csr.raw() & !OUT;
            let regs = Self::regs();
            match N {
                2 => regs.comp2_csr.write(|w| unsafe { w.bits(val) }),
                4 => regs.comp4_csr.write(|w| unsafe { w.bits(val) }),
                _ => regs.comp6_csr.write(|w| unsafe { w.bits(val) }),
            }
            Ok(())
        }
    }

    /// Enable the comparator.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is locked.
    pub fn enable(&mut self) -> Result<(), Error> {
        self.set_csr(self.csr().set_enable(true))
    }

    /// Disable the comparator.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is locked.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.set_csr(self.csr().set_enable(false))
    }

    /// Output level after polarity.
    pub fn output(&self) -> bool {
        self.csr().output()
    }

    /// Lock the configuration until the next reset.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is already locked.
    pub fn lock(&mut self) -> Result<(), Error> {
        self.set_csr(self.csr().set_lock())
    }
}

/// All comparators.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct Comps {
    pub comp2: Comp2,
    pub comp4: Comp4,
    pub comp6: Comp6,
}

impl Comps {
    /// Create the comparator handles.
    ///
    /// This enables the SYSCFG clock, the comparator registers are part of
    /// the SYSCFG.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     comp::{Comps, Csr, InvInput},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut comps: Comps = Comps::new(dp.COMP, &mut dp.RCC);
    /// comps
    ///     .comp4
    ///     .set_csr(Csr::RESET.set_inv_input(InvInput::Vref).set_enable(true))
    ///     .unwrap();
    /// let above: bool = comps.comp4.output();
    /// ```
    pub fn new(_comp: pac::COMP, rcc: &mut pac::RCC) -> Comps {
        rcc::en::apb2(rcc, rcc::en::APB2_SYSCFG);
        unsafe {
            Comps {
                comp2: Comp::steal(),
                comp4: Comp::steal(),
                comp6: Comp::steal(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_fields() {
        let csr = Csr::RESET
            .set_inv_input(InvInput::Io)
            .set_out_sel(OutSel::Tim1Bkin2)
            .set_blanking(0xFF)
            .set_polarity(Polarity::Inverted)
            .set_polarity(Polarity::NonInverted);
        assert_eq!(csr.inv_input(), InvInput::Io);
        assert_eq!(csr.blanking(), 0b111);
        assert_eq!(csr.polarity(), Polarity::NonInverted);
        assert!(!csr.enabled());
        assert!(!csr.locked());
        assert!(csr.set_lock().locked());
        assert!(Csr::new(1 << 30).output());
    }
}
