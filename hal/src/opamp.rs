//! Operational amplifier (OPAMP2)
//!
//! The output is on [`A6`](crate::gpio::pins::A6), and is internally
//! connected to ADC2 channel 3.

use crate::{pac, rcc};

/// Non-inverting input.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VpSel {
    /// [`B14`](crate::gpio::pins::B14)
    B14 = 0b00,
    /// [`B0`](crate::gpio::pins::B0)
    B0 = 0b01,
    /// [`A7`](crate::gpio::pins::A7)
    A7 = 0b10,
}

impl VpSel {
    const fn from_bits(bits: u32) -> VpSel {
        match bits & 0b11 {
            0b00 => VpSel::B14,
            0b01 => VpSel::B0,
            _ => VpSel::A7,
        }
    }
}

/// Inverting input pin for the external feedback mode.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VmSel {
    /// [`C5`](crate::gpio::pins::C5)
    C5 = 0b00,
    /// [`A5`](crate::gpio::pins::A5)
    A5 = 0b01,
}

/// Programmable gain amplifier non-inverting gain.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// × 2
    X2 = 0b00,
    /// × 4
    X4 = 0b01,
    /// × 8
    X8 = 0b10,
    /// × 16
    X16 = 0b11,
}

impl Gain {
    /// Gain as a factor.
    pub const fn factor(self) -> u8 {
        1 << (self as u8 + 1)
    }
}

/// Amplifier mode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Voltage follower, the output is connected to the inverting input.
    Follower,
    /// Programmable gain amplifier with internal feedback resistors.
    Pga(Gain),
    /// Standalone, external feedback on an inverting input pin.
    External(VmSel),
}

const EN: u32 = 1 << 0;
const VP_SHIFT: u32 = 2;
const VM_SHIFT: u32 = 5;
const VM_PGA: u32 = 0b10;
const VM_FOLLOWER: u32 = 0b11;
const GAIN_SHIFT: u32 = 14;
const OUTCAL: u32 = 1 << 30;
const LOCK: u32 = 1 << 31;

/// OPAMP2 control and status register (`OPAMP2_CSR`).
///
/// # Example
///
/// PGA with a gain of 8 on B0.
///
/// ```
/// use stm32f3xx_hal::opamp::{Csr, Gain, Mode, VpSel};
///
/// const CSR: Csr = Csr::RESET
///     .set_vp(VpSel::B0)
///     .set_mode(Mode::Pga(Gain::X8))
///     .set_enable(true);
/// assert_eq!(CSR.raw(), (0b01 << 2) | (0b10 << 5) | (0b10 << 14) | 1);
/// assert_eq!(CSR.mode(), Mode::Pga(Gain::X8));
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

    /// Enable the amplifier.
    #[must_use = "set_enable returns a modified Csr"]
    pub const fn set_enable(mut self, en: bool) -> Csr {
        if en {
            self.val |= EN
        } else {
            self.val &= !EN
        }
        self
    }

    /// Returns `true` if the amplifier is enabled.
    pub const fn enabled(&self) -> bool {
        self.val & EN != 0
    }

    /// Set the non-inverting input.
    #[must_use = "set_vp returns a modified Csr"]
    pub const fn set_vp(mut self, vp: VpSel) -> Csr {
        self.val = (self.val & !(0b11 << VP_SHIFT)) | ((vp as u32) << VP_SHIFT);
        self
    }

    /// Non-inverting input.
    pub const fn vp(&self) -> VpSel {
        VpSel::from_bits(self.val >> VP_SHIFT)
    }

    /// Set the amplifier mode.
    #[must_use = "set_mode returns a modified Csr"]
    pub const fn set_mode(mut self, mode: Mode) -> Csr {
        let (vm, gain): (u32, u32) = match mode {
            Mode::Follower => (VM_FOLLOWER, 0),
            Mode::Pga(gain) => (VM_PGA, gain as u32),
            Mode::External(vm) => (vm as u32, 0),
        };
        self.val &= !((0b11 << VM_SHIFT) | (0b1111 << GAIN_SHIFT));
        self.val |= (vm << VM_SHIFT) | (gain << GAIN_SHIFT);
        self
    }

    /// Amplifier mode.
    pub const fn mode(&self) -> Mode {
        match (self.val >> VM_SHIFT) & 0b11 {
            0b00 => Mode::External(VmSel::C5),
            0b01 => Mode::External(VmSel::A5),
            VM_FOLLOWER => Mode::Follower,
            _ => Mode::Pga(match (self.val >> GAIN_SHIFT) & 0b11 {
                0b00 => Gain::X2,
                0b01 => Gain::X4,
                0b10 => Gain::X8,
                _ => Gain::X16,
            }),
        }
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

    /// Calibration output, read-only.
    pub const fn outcal(&self) -> bool {
        self.val & OUTCAL != 0
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

/// OPAMP errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The register is locked until the next reset.
    Locked,
}

/// OPAMP2 driver.
#[derive(Debug)]
pub struct OpAmp {
    opamp: pac::OPAMP,
}

impl OpAmp {
    /// Create a new amplifier driver.
    ///
    /// This enables the SYSCFG clock, the amplifier register is part of the
    /// SYSCFG.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     opamp::{Csr, Gain, Mode, OpAmp, VpSel},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let mut opamp: OpAmp = OpAmp::new(dp.OPAMP, &mut dp.RCC);
    /// opamp
    ///     .set_csr(Csr::RESET.set_vp(VpSel::A7).set_mode(Mode::Pga(Gain::X4)).set_enable(true))
    ///     .unwrap();
    /// ```
    pub fn new(opamp: pac::OPAMP, rcc: &mut pac::RCC) -> OpAmp {
        rcc::en::apb2(rcc, rcc::en::APB2_SYSCFG);
        OpAmp { opamp }
    }

    /// Free the OPAMP peripheral from the driver.
    pub fn free(self) -> pac::OPAMP {
        self.opamp
    }

    /// Steal the amplifier.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the amplifier has exclusive access
    ///    to its register.
    /// 2. The SYSCFG clock must be enabled.
    pub unsafe fn steal() -> OpAmp {
        OpAmp {
            opamp: unsafe { pac::Peripherals::steal() }.OPAMP,
        }
    }

    /// Current register value.
    pub fn csr(&self) -> Csr {
        Csr::new(self.opamp.opamp2_csr.read().bits())
    }

    /// Write the register.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is locked.
    pub fn set_csr(&mut self, csr: Csr) -> Result<(), Error> {
        if self.csr().locked() {
            Err(Error::Locked)
        } else {
            self.opamp
                .opamp2_csr
                .write(|w| unsafe { w.bits(csr.raw() & !OUTCAL) });
            Ok(())
        }
    }

    /// Enable the amplifier.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is locked.
    pub fn enable(&mut self) -> Result<(), Error> {
        self.set_csr(self.csr().set_enable(true))
    }

    /// Disable the amplifier.
    ///
    /// # Errors
    ///
    /// * [`Error::Locked`] if the register is locked.
    pub fn disable(&mut self) -> Result<(), Error> {
        self.set_csr(self.csr().set_enable(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes() {
        for mode in [
            Mode::Follower,
            Mode::External(VmSel::C5),
            Mode::External(VmSel::A5),
            Mode::Pga(Gain::X2),
            Mode::Pga(Gain::X16),
        ] {
            assert_eq!(Csr::RESET.set_mode(mode).mode(), mode);
        }
        // switching from PGA clears the gain
        let csr = Csr::RESET.set_mode(Mode::Pga(Gain::X16)).set_mode(Mode::Follower);
        assert_eq!(csr.raw(), 0b11 << 5);
    }

    #[test]
    fn gain_factor() {
        assert_eq!(Gain::X2.factor(), 2);
        assert_eq!(Gain::X16.factor(), 16);
    }
}
