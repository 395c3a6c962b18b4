//! Power control
//!
//! The F3 has three low-power modes:
//!
//! * Sleep, the core clock is stopped, peripherals keep running.
//! * Stop, all clocks in the 1.8 V domain are stopped, SRAM and registers
//!   are retained. The sysclk is the HSI after wakeup.
//! * Standby, the 1.8 V domain is powered off. Wakeup is a reset, only the
//!   backup domain and the standby circuitry are retained.

use core::sync::atomic::{Ordering::SeqCst, compiler_fence};

use crate::{pac, rcc};

const SCB_SCR_SLEEPDEEP: u32 = 0x1 << 2;
const SCB_SCR_SLEEPONEXIT: u32 = 0x1 << 1;

const CR_LPDS: u32 = 1 << 0;
const CR_PDDS: u32 = 1 << 1;
const CR_CWUF: u32 = 1 << 2;
const CR_CSBF: u32 = 1 << 3;
const CR_PVDE: u32 = 1 << 4;
const CR_PLS_SHIFT: u32 = 5;
const CR_PLS_MASK: u32 = 0b111 << CR_PLS_SHIFT;
const CR_DBP: u32 = 1 << 8;
#[cfg(feature = "stm32f373")]
const CR_ENSD_SHIFT: u32 = 9;

const CSR_WUF: u32 = 1 << 0;
const CSR_SBF: u32 = 1 << 1;
const CSR_PVDO: u32 = 1 << 2;
const CSR_VREFINTRDYF: u32 = 1 << 3;
const CSR_EWUP_SHIFT: u32 = 8;

/// Enable the PWR peripheral clock.
///
/// The PWR registers ignore writes until the clock is enabled.
#[inline]
pub fn enable_clock(rcc: &mut pac::RCC) {
    rcc::en::apb1(rcc, rcc::en::APB1_PWR);
}

/// Enable write access to the backup domain.
///
/// The RTC, the RCC `BDCR` register, and the backup registers are write
/// protected after reset.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, pwr::enable_backup_access};
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// enable_backup_access(&mut dp.PWR);
/// ```
#[inline]
pub fn enable_backup_access(pwr: &mut pac::PWR) {
    set_bits!(pwr.cr, CR_DBP);
}

/// Disable write access to the backup domain.
#[inline]
pub fn disable_backup_access(pwr: &mut pac::PWR) {
    clear_bits!(pwr.cr, CR_DBP);
}

/// Returns `true` if the backup domain is writeable.
#[inline]
pub fn backup_access(pwr: &pac::pwr::RegisterBlock) -> bool {
    pwr.cr.read().bits() & CR_DBP != 0
}

/// Wakeup pins.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeupPin {
    /// WKUP1 on [`A0`](crate::gpio::pins::A0).
    Wkup1 = 0,
    /// WKUP2 on [`C13`](crate::gpio::pins::C13).
    Wkup2 = 1,
}

impl WakeupPin {
    const fn mask(self) -> u32 {
        1 << (CSR_EWUP_SHIFT + self as u32)
    }
}

/// Enable or disable a standby wakeup pin.
///
/// An enabled wakeup pin is forced into input pull-down and wakes the device
/// from standby on a rising edge.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{
///     pac,
///     pwr::{set_wakeup_pin, WakeupPin},
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// set_wakeup_pin(&mut dp.PWR, WakeupPin::Wkup1, true);
/// ```
#[inline]
pub fn set_wakeup_pin(pwr: &mut pac::PWR, pin: WakeupPin, en: bool) {
    if en {
        set_bits!(pwr.csr, pin.mask());
    } else {
        clear_bits!(pwr.csr, pin.mask());
    }
}

/// Programmable voltage detector threshold, for a falling V<sub>DD</sub>.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PvdLevel {
    /// 2.09 V
    V2p09 = 0b000,
    /// 2.18 V
    V2p18 = 0b001,
    /// 2.28 V
    V2p28 = 0b010,
    /// 2.38 V
    V2p38 = 0b011,
    /// 2.48 V
    V2p48 = 0b100,
    /// 2.58 V
    V2p58 = 0b101,
    /// 2.68 V
    V2p68 = 0b110,
    /// 2.78 V
    V2p78 = 0b111,
}

impl PvdLevel {
    /// Falling edge threshold in millivolts.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::pwr::PvdLevel;
    ///
    /// assert_eq!(PvdLevel::V2p09.millivolts(), 2090);
    /// assert_eq!(PvdLevel::V2p78.millivolts(), 2780);
    /// ```
    pub const fn millivolts(self) -> u16 {
        const MV: [u16; 8] = [2090, 2180, 2280, 2380, 2480, 2580, 2680, 2780];
        MV[self as usize]
    }

    /// Highest threshold at or below `mv`.
    ///
    /// Returns `None` if `mv` is below the lowest threshold.
    pub const fn at_most(mv: u16) -> Option<PvdLevel> {
        const LEVELS: [PvdLevel; 8] = [
            PvdLevel::V2p78,
            PvdLevel::V2p68,
            PvdLevel::V2p58,
            PvdLevel::V2p48,
            PvdLevel::V2p38,
            PvdLevel::V2p28,
            PvdLevel::V2p18,
            PvdLevel::V2p09,
        ];
        let mut idx: usize = 0;
        while idx < LEVELS.len() {
            if LEVELS[idx].millivolts() <= mv {
                return Some(LEVELS[idx]);
            }
            idx += 1;
        }
        None
    }
}

/// Enable the programmable voltage detector with a threshold.
///
/// The PVD output is on EXTI line 16.
#[inline]
pub fn enable_pvd(pwr: &mut pac::PWR, level: PvdLevel) {
    write_bits!(pwr.cr, CR_PLS_MASK, (level as u32) << CR_PLS_SHIFT);
    set_bits!(pwr.cr, CR_PVDE);
}

/// Disable the programmable voltage detector.
#[inline]
pub fn disable_pvd(pwr: &mut pac::PWR) {
    clear_bits!(pwr.cr, CR_PVDE);
}

/// Returns `true` if V<sub>DD</sub> is below the PVD threshold.
#[inline]
pub fn pvd_output(pwr: &pac::PWR) -> bool {
    pwr.csr.read().bits() & CSR_PVDO != 0
}

/// Returns `true` if the internal voltage reference is ready.
#[inline]
pub fn vrefint_ready(pwr: &pac::PWR) -> bool {
    pwr.csr.read().bits() & CSR_VREFINTRDYF != 0
}

/// Power status flags.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Flags {
    /// The device was in standby mode.
    pub standby: bool,
    /// A wakeup event was received from a wakeup pin or the RTC.
    pub wakeup: bool,
}

impl Flags {
    const fn from_csr(csr: u32) -> Flags {
        Flags {
            standby: csr & CSR_SBF != 0,
            wakeup: csr & CSR_WUF != 0,
        }
    }
}

/// Read the standby and wakeup flags.
///
/// # Example
///
/// Detect a wakeup from standby at startup.
///
/// ```no_run
/// use stm32f3xx_hal::{pac, pwr};
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// if pwr::flags(&dp.PWR).standby {
///     pwr::clear_flags(&mut dp.PWR);
/// }
/// ```
#[inline]
pub fn flags(pwr: &pac::PWR) -> Flags {
    Flags::from_csr(pwr.csr.read().bits())
}

/// Clear the standby and wakeup flags.
#[inline]
pub fn clear_flags(pwr: &mut pac::PWR) {
    set_bits!(pwr.cr, CR_CWUF | CR_CSBF);
}

/// Voltage regulator state in stop mode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopRegulator {
    /// Main regulator on, faster wakeup.
    On,
    /// Regulator in low-power mode, lower consumption.
    LowPower,
}

/// Sleep until the next interrupt.
///
/// This clears `SLEEPDEEP` then enters WFI.
#[inline]
pub fn sleep(scb: &mut pac::SCB) {
    scb.clear_sleepdeep();
    cortex_m::asm::wfi();
}

/// Enter sleep on return from every ISR.
#[inline]
pub fn enable_sleep_on_exit(scb: &mut pac::SCB) {
    unsafe { scb.scr.modify(|scr| scr | SCB_SCR_SLEEPONEXIT) };
}

/// Stop entering sleep on return from ISRs.
#[inline]
pub fn disable_sleep_on_exit(scb: &mut pac::SCB) {
    unsafe { scb.scr.modify(|scr| scr & !SCB_SCR_SLEEPONEXIT) };
}

/// Enter stop mode until the next EXTI interrupt.
///
/// The sysclk is the HSI after wakeup, the PLL must be setup again with
/// [`set_sysclk_pll`](crate::rcc::set_sysclk_pll) if required.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{
///     pac,
///     pwr::{stop, StopRegulator},
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// let mut cp: pac::CorePeripherals = pac::CorePeripherals::take().unwrap();
///
/// // ... setup an EXTI wakeup source
///
/// stop(&mut dp.PWR, &mut cp.SCB, StopRegulator::LowPower);
/// ```
#[inline]
pub fn stop(pwr: &mut pac::PWR, scb: &mut pac::SCB, reg: StopRegulator) {
    let lpds: u32 = match reg {
        StopRegulator::On => 0,
        StopRegulator::LowPower => CR_LPDS,
    };
    write_bits!(pwr.cr, CR_PDDS | CR_LPDS, lpds);
    scb.set_sleepdeep();
    cortex_m::asm::wfi();
    scb.clear_sleepdeep();
}

/// Enter standby mode immediately.
///
/// Wakeup pins should be configured with [`set_wakeup_pin`] unless
/// you intend to wakeup only via reset or the RTC.
///
/// This will:
///
/// 1. Disable interrupts.
/// 2. Clear the wakeup flag.
/// 3. Set `PWR.CR.PDDS`.
/// 4. Set `SCB.SCR.SLEEPDEEP`.
/// 5. Enter WFI.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{
///     pac,
///     pwr::{set_wakeup_pin, standby, WakeupPin},
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// set_wakeup_pin(&mut dp.PWR, WakeupPin::Wkup1, true);
/// standby();
/// ```
#[inline]
pub fn standby() -> ! {
    cortex_m::interrupt::disable();

    // safety: interrupts are disabled
    unsafe {
        let pwr: &pac::pwr::RegisterBlock = &*pac::PWR::ptr();
        set_bits!(pwr.cr, CR_CWUF);
        set_bits!(pwr.cr, CR_PDDS);
        (*pac::SCB::PTR).scr.modify(|scr| scr | SCB_SCR_SLEEPDEEP);
    }

    cortex_m::asm::wfi();

    // technically unreachable
    loop {
        compiler_fence(SeqCst)
    }
}

/// SDADC analog supply enable.
#[cfg(feature = "stm32f373")]
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sdadc {
    /// SDADC1
    Sdadc1 = 0,
    /// SDADC2
    Sdadc2 = 1,
    /// SDADC3
    Sdadc3 = 2,
}

/// Enable or disable the analog part of an SDADC.
///
/// The analog part must be enabled before the SDADC is used.
#[cfg(feature = "stm32f373")]
#[inline]
pub fn set_sdadc_analog(pwr: &mut pac::PWR, sdadc: Sdadc, en: bool) {
    let mask: u32 = 1 << (CR_ENSD_SHIFT + sdadc as u32);
    if en {
        set_bits!(pwr.cr, mask);
    } else {
        clear_bits!(pwr.cr, mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pvd_at_most() {
        assert_eq!(PvdLevel::at_most(3300), Some(PvdLevel::V2p78));
        assert_eq!(PvdLevel::at_most(2500), Some(PvdLevel::V2p48));
        assert_eq!(PvdLevel::at_most(2090), Some(PvdLevel::V2p09));
        assert_eq!(PvdLevel::at_most(2000), None);
    }

    #[test]
    fn flags() {
        assert_eq!(
            Flags::from_csr(CSR_SBF | CSR_PVDO),
            Flags {
                standby: true,
                wakeup: false
            }
        );
        assert_eq!(WakeupPin::Wkup2.mask(), 1 << 9);
    }
}
