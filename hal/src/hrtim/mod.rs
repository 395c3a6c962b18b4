//! High-resolution timer (HRTIM1)
//!
//! The HRTIM is a master timer and five timing units (A to E), each timing
//! unit driving two outputs through set/reset crossbars.
//! The counter runs from the PLL × 2 (144 MHz with a 72 MHz PLL), and the
//! DLL interpolates edges down to 1/32 of a clock period (217 ps).
//!
//! This module has three layers:
//!
//! * [`timing`] arithmetic, periods, duty cycles, and dead-times
//! * typed register values, [`TimCr`], [`Outr`], [`OutputEvents`], ...
//! * the [`Hrtim`] driver, split into [`Control`], [`Master`] and the
//!   timing units [`TimerA`] to [`TimerE`]
//!
//! # Fault latching
//!
//! A fault input trip disables the outputs that enabled it in hardware, and
//! latches the fault flag.
//! The outputs stay off until [`Control::rearm`] clears the flags and
//! re-enables them.
//! [`FaultSupervisor::rearm`] does the same behind a trip limit, and keeps the
//! outputs off once it locks out.
//!
//! # Example
//!
//! 100 kHz, 25 % duty cycle on output TA1.
//!
//! ```no_run
//! use stm32f3xx_hal::{
//!     hrtim::{self, Blocks, Duty, Hrtim, Out, OutputEvents, Outputs, Prescaler, TimCr, Timers},
//!     pac, rcc,
//! };
//!
//! let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
//!
//! let hrtim_hz: u32 = rcc::hrtim_hz(&dp.RCC);
//! let pre: Prescaler = Prescaler::finest_for(hrtim_hz, 100_000)?;
//! let period: u16 = hrtim::period_ticks(hrtim_hz, 100_000, pre)?;
//!
//! let blocks: Blocks = Blocks {
//!     common: dp.HRTIM_COMMON,
//!     master: dp.HRTIM_MASTER,
//!     tim_a: dp.HRTIM_TIMA,
//!     tim_b: dp.HRTIM_TIMB,
//!     tim_c: dp.HRTIM_TIMC,
//!     tim_d: dp.HRTIM_TIMD,
//!     tim_e: dp.HRTIM_TIME,
//! };
//! let hrtim: Hrtim = Hrtim::new(blocks, &mut dp.RCC)?;
//! let mut parts = hrtim.split();
//! parts
//!     .tim_a
//!     .configure(TimCr::RESET.set_prescaler(pre).set_continuous(true).set_preload(true));
//! parts.tim_a.set_period(period);
//! parts.tim_a.set_duty(hrtim::Compare::Cmp1, Duty::from_percent(25));
//! parts
//!     .tim_a
//!     .set_output_events(Out::One, OutputEvents::PERIOD, OutputEvents::CMP1);
//! parts.control.enable_outputs(Outputs::TA1);
//! parts.control.start(Timers::A);
//! # Ok::<(), hrtim::Error>(())
//! ```

mod cr;
mod event;
mod fault;
mod outr;
pub mod timing;

pub use cr::{AutoDelay, MasterCr, TimCr, update};
pub use event::{
    AdcTrigger, AdcTrigger13, AdcTrigger24, CaptureTriggers, OutputEvents, ResetEvents,
    TimerCaptureEvent,
};
pub use fault::{
    EevPolarity, EevSensitivity, EevSrc, ExternalEventConfig, Fault, FaultInputConfig,
    FaultLatch, FaultPolarity, FaultSource, FaultSupervisor, Faults, SupervisorState,
};
pub use outr::{FaultLevel, IdleLevel, Out, Outr, Polarity};
pub use timing::{
    DeadTime, Duty, Prescaler, compare_for_duty, ns_to_ticks, period_ticks,
};

use crate::{pac, rcc};
use core::ops::{BitOr, BitOrAssign};

/// HRTIM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The requested frequency is too high for the prescaler.
    PeriodTooShort,
    /// The requested frequency is too low for the prescaler.
    PeriodTooLong,
    /// The dead-time does not fit in 9 bits with the coarsest prescaler.
    DeadTimeTooLong,
    /// The DLL did not become ready after calibration.
    DllTimeout,
    /// The faults re-latched after clearing, the fault condition is still
    /// present.
    FaultActive(Faults),
    /// The fault supervisor locked the outputs out.
    LockedOut,
    /// External event number out of the 1 to 10 range.
    InvalidEvent(u8),
}

/// Timing unit identifier.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// Timer A.
    A = 0,
    /// Timer B.
    B = 1,
    /// Timer C.
    C = 2,
    /// Timer D.
    D = 3,
    /// Timer E.
    E = 4,
}

impl TimerId {
    /// All timing units.
    pub const ALL: [TimerId; 5] = [TimerId::A, TimerId::B, TimerId::C, TimerId::D, TimerId::E];
}

/// Set of timers, laid out like the counter enable bits of `MCR`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timers {
    val: u32,
}

impl Timers {
    /// No timers.
    pub const NONE: Timers = Timers { val: 0 };
    /// Master timer.
    pub const MASTER: Timers = Timers { val: 1 << 16 };
    /// Timer A.
    pub const A: Timers = Timers { val: 1 << 17 };
    /// Timer B.
    pub const B: Timers = Timers { val: 1 << 18 };
    /// Timer C.
    pub const C: Timers = Timers { val: 1 << 19 };
    /// Timer D.
    pub const D: Timers = Timers { val: 1 << 20 };
    /// Timer E.
    pub const E: Timers = Timers { val: 1 << 21 };
    /// Master timer and timers A to E.
    pub const ALL: Timers = Timers { val: 0b11_1111 << 16 };

    /// Get the raw value, in `MCR` bit positions.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Returns `true` if every timer in `other` is in the set.
    pub const fn contains(&self, other: Timers) -> bool {
        self.val & other.val == other.val
    }

    /// Bits 0 to 5 for master, A to E, the layout of the `CR1` and `CR2`
    /// common registers.
    const fn low(self) -> u32 {
        (self.val >> 16) & 0b11_1111
    }
}

impl From<TimerId> for Timers {
    fn from(id: TimerId) -> Self {
        Timers {
            val: 1 << (17 + id as u32),
        }
    }
}

impl BitOr for Timers {
    type Output = Timers;

    fn bitor(self, rhs: Timers) -> Timers {
        Timers {
            val: self.val | rhs.val,
        }
    }
}

impl BitOrAssign for Timers {
    fn bitor_assign(&mut self, rhs: Timers) {
        self.val |= rhs.val
    }
}

/// HRTIM output.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum Output {
    Ta1 = 0,
    Ta2 = 1,
    Tb1 = 2,
    Tb2 = 3,
    Tc1 = 4,
    Tc2 = 5,
    Td1 = 6,
    Td2 = 7,
    Te1 = 8,
    Te2 = 9,
}

impl Output {
    /// Output `out` of a timing unit.
    pub const fn of(timer: TimerId, out: Out) -> Output {
        let idx: u8 = (timer as u8) * 2 + matches!(out, Out::Two) as u8;
        match idx {
            0 => Output::Ta1,
            1 => Output::Ta2,
            2 => Output::Tb1,
            3 => Output::Tb2,
            4 => Output::Tc1,
            5 => Output::Tc2,
            6 => Output::Td1,
            7 => Output::Td2,
            8 => Output::Te1,
            _ => Output::Te2,
        }
    }
}

/// Set of outputs, laid out like `OENR`, `ODISR` and `ODSR`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Outputs {
    val: u32,
}

#[allow(missing_docs)]
impl Outputs {
    pub const NONE: Outputs = Outputs { val: 0 };
    pub const TA1: Outputs = Outputs { val: 1 << 0 };
    pub const TA2: Outputs = Outputs { val: 1 << 1 };
    pub const TB1: Outputs = Outputs { val: 1 << 2 };
    pub const TB2: Outputs = Outputs { val: 1 << 3 };
    pub const TC1: Outputs = Outputs { val: 1 << 4 };
    pub const TC2: Outputs = Outputs { val: 1 << 5 };
    pub const TD1: Outputs = Outputs { val: 1 << 6 };
    pub const TD2: Outputs = Outputs { val: 1 << 7 };
    pub const TE1: Outputs = Outputs { val: 1 << 8 };
    pub const TE2: Outputs = Outputs { val: 1 << 9 };
    pub const ALL: Outputs = Outputs { val: 0x3FF };
}

impl Outputs {
    /// Get the raw value.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Union of two sets, `|` in a `const` context.
    #[must_use = "union returns a new set"]
    pub const fn union(self, other: Outputs) -> Outputs {
        Outputs {
            val: self.val | other.val,
        }
    }

    /// Returns `true` if the output is in the set.
    pub const fn contains(&self, output: Output) -> bool {
        self.val & (1 << output as u32) != 0
    }

    /// Returns `true` if the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.val == 0
    }
}

impl From<Output> for Outputs {
    fn from(output: Output) -> Self {
        Outputs {
            val: 1 << output as u32,
        }
    }
}

impl BitOr for Outputs {
    type Output = Outputs;

    fn bitor(self, rhs: Outputs) -> Outputs {
        Outputs {
            val: self.val | rhs.val,
        }
    }
}

impl BitOrAssign for Outputs {
    fn bitor_assign(&mut self, rhs: Outputs) {
        self.val |= rhs.val
    }
}

/// Output state.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputState {
    /// Disabled by software, at the idle level.
    Idle,
    /// Enabled, driven by the set/reset crossbars.
    Run,
    /// Disabled by a fault, at the fault level.
    Fault,
}

impl OutputState {
    /// Decode the state of `output` from the `OENR` and `ODSR` values.
    pub const fn from_regs(output: Output, oenr: u32, odsr: u32) -> OutputState {
        let bit: u32 = 1 << output as u32;
        if oenr & bit != 0 {
            OutputState::Run
        } else if odsr & bit != 0 {
            OutputState::Fault
        } else {
            OutputState::Idle
        }
    }
}

/// Compare unit.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Compare {
    /// Compare 1.
    Cmp1,
    /// Compare 2, may be auto-delayed.
    Cmp2,
    /// Compare 3.
    Cmp3,
    /// Compare 4, may be auto-delayed.
    Cmp4,
}

/// Capture unit.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Capture {
    /// Capture 1.
    Cpt1,
    /// Capture 2.
    Cpt2,
}

/// Timer interrupts, laid out like the timer `ISR`, `ICR` and `DIER`.
///
/// The master timer has no capture or reset interrupt, and has
/// [`Irq::SYNC`] instead.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Irq {
    val: u32,
}

#[allow(missing_docs)]
impl Irq {
    pub const NONE: Irq = Irq { val: 0 };
    pub const CMP1: Irq = Irq { val: 1 << 0 };
    pub const CMP2: Irq = Irq { val: 1 << 1 };
    pub const CMP3: Irq = Irq { val: 1 << 2 };
    pub const CMP4: Irq = Irq { val: 1 << 3 };
    pub const REPETITION: Irq = Irq { val: 1 << 4 };
    pub const SYNC: Irq = Irq { val: 1 << 5 };
    pub const UPDATE: Irq = Irq { val: 1 << 6 };
    pub const CPT1: Irq = Irq { val: 1 << 7 };
    pub const CPT2: Irq = Irq { val: 1 << 8 };
    pub const RESET: Irq = Irq { val: 1 << 13 };
}

impl Irq {
    const MASK: u32 = 0x21FF;

    /// Create an interrupt set from a raw value.
    pub const fn new(val: u32) -> Irq {
        Irq {
            val: val & Self::MASK,
        }
    }

    /// Get the raw value.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Returns `true` if every interrupt in `other` is in the set.
    pub const fn contains(&self, other: Irq) -> bool {
        self.val & other.val == other.val
    }
}

impl BitOr for Irq {
    type Output = Irq;

    fn bitor(self, rhs: Irq) -> Irq {
        Irq {
            val: self.val | rhs.val,
        }
    }
}

/// ADC trigger update source, the timer whose update latches the
/// preloaded `ADCxR` value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcUpdateSource {
    /// Master timer.
    Master,
    /// Timing unit.
    Timer(TimerId),
}

impl AdcUpdateSource {
    const fn bits(self) -> u32 {
        match self {
            AdcUpdateSource::Master => 0,
            AdcUpdateSource::Timer(id) => id as u32 + 1,
        }
    }
}

const ISR_DLLRDY: u32 = 1 << 16;
const DLLCR_CAL: u32 = 1 << 0;
const DLLCR_CALEN: u32 = 1 << 1;
const FLT_LCK: u32 = 1 << 31;
const CR2_RST_SHIFT: u32 = 8;
const DLL_TIMEOUT_LOOPS: u32 = 100_000;

/// HRTIM register blocks owned by the driver.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct Blocks {
    pub common: pac::HRTIM_COMMON,
    pub master: pac::HRTIM_MASTER,
    pub tim_a: pac::HRTIM_TIMA,
    pub tim_b: pac::HRTIM_TIMB,
    pub tim_c: pac::HRTIM_TIMC,
    pub tim_d: pac::HRTIM_TIMD,
    pub tim_e: pac::HRTIM_TIME,
}

/// HRTIM1 driver.
///
/// Owns the HRTIM register blocks, and is split into independent handles
/// with [`split`](Hrtim::split).
#[derive(Debug)]
pub struct Hrtim {
    blocks: Blocks,
}

/// Handles returned by [`Hrtim::split`].
#[derive(Debug)]
#[allow(missing_docs)]
pub struct Parts {
    pub control: Control,
    pub master: Master,
    pub tim_a: TimerA,
    pub tim_b: TimerB,
    pub tim_c: TimerC,
    pub tim_d: TimerD,
    pub tim_e: TimerE,
}

impl Parts {
    /// Free the register blocks from the handles.
    pub fn free(self) -> Blocks {
        Blocks {
            common: self.control.free(),
            master: self.master.free(),
            tim_a: self.tim_a.free(),
            tim_b: self.tim_b.free(),
            tim_c: self.tim_c.free(),
            tim_d: self.tim_d.free(),
            tim_e: self.tim_e.free(),
        }
    }
}

impl Hrtim {
    /// Enable the HRTIM clock, reset the peripheral, and calibrate the DLL.
    ///
    /// The HRTIM clock is switched to the PLL × 2, the PLL must be the system
    /// clock source, see [`rcc::set_sysclk_pll`].
    ///
    /// # Errors
    ///
    /// * [`Error::DllTimeout`] if the DLL does not lock.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     hrtim::{Blocks, Hrtim},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// let hrtim: Hrtim = Hrtim::new(
    ///     Blocks {
    ///         common: dp.HRTIM_COMMON,
    ///         master: dp.HRTIM_MASTER,
    ///         tim_a: dp.HRTIM_TIMA,
    ///         tim_b: dp.HRTIM_TIMB,
    ///         tim_c: dp.HRTIM_TIMC,
    ///         tim_d: dp.HRTIM_TIMD,
    ///         tim_e: dp.HRTIM_TIME,
    ///     },
    ///     &mut dp.RCC,
    /// )?;
    /// # Ok::<(), stm32f3xx_hal::hrtim::Error>(())
    /// ```
    pub fn new(blocks: Blocks, rcc: &mut pac::RCC) -> Result<Hrtim, Error> {
        rcc::set_hrtim_clk_pll(rcc);
        rcc::en::apb2(rcc, rcc::en::APB2_HRTIM1);
        rcc::en::apb2_reset(rcc, rcc::en::APB2_HRTIM1);

        let mut hrtim: Hrtim = Hrtim { blocks };
        hrtim.calibrate()?;
        Ok(hrtim)
    }

    /// Steal the HRTIM from whatever is currently using it.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the HRTIM has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. You are responsible for setting up the HRTIM clock, and calibrating
    ///    the DLL.
    pub unsafe fn steal() -> Hrtim {
        let dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
        Hrtim {
            blocks: Blocks {
                common: dp.HRTIM_COMMON,
                master: dp.HRTIM_MASTER,
                tim_a: dp.HRTIM_TIMA,
                tim_b: dp.HRTIM_TIMB,
                tim_c: dp.HRTIM_TIMC,
                tim_d: dp.HRTIM_TIMD,
                tim_e: dp.HRTIM_TIME,
            },
        }
    }

    /// Free the HRTIM register blocks from the driver.
    pub fn free(self) -> Blocks {
        self.blocks
    }

    /// Run a single DLL calibration, and enable periodic re-calibration.
    ///
    /// # Errors
    ///
    /// * [`Error::DllTimeout`] if `DLLRDY` is not set after calibration.
    pub fn calibrate(&mut self) -> Result<(), Error> {
        let common: &pac::HRTIM_COMMON = &self.blocks.common;
        common.dllcr.write(|w| unsafe { w.bits(DLLCR_CAL) });
        let mut loops: u32 = DLL_TIMEOUT_LOOPS;
        while common.isr.read().bits() & ISR_DLLRDY == 0 {
            loops = loops.checked_sub(1).ok_or(Error::DllTimeout)?;
        }
        common.icr.write(|w| unsafe { w.bits(ISR_DLLRDY) });
        // periodic calibration, 14 µs rate
        common
            .dllcr
            .write(|w| unsafe { w.bits(DLLCR_CALEN | (0b11 << 2)) });
        Ok(())
    }

    /// Split the HRTIM into independent handles.
    pub fn split(self) -> Parts {
        let Blocks {
            common,
            master,
            tim_a,
            tim_b,
            tim_c,
            tim_d,
            tim_e,
        } = self.blocks;
        Parts {
            control: Control { common },
            master: Master { master },
            tim_a: TimerA { tim: tim_a },
            tim_b: TimerB { tim: tim_b },
            tim_c: TimerC { tim: tim_c },
            tim_d: TimerD { tim: tim_d },
            tim_e: TimerE { tim: tim_e },
        }
    }
}

/// Master timer.
#[derive(Debug)]
pub struct Master {
    master: pac::HRTIM_MASTER,
}

impl Master {
    /// Steal the master timer.
    ///
    /// # Safety
    ///
    /// Ensure the code stealing the master timer has exclusive access to its
    /// registers.
    pub unsafe fn steal() -> Master {
        Master {
            master: unsafe { pac::Peripherals::steal() }.HRTIM_MASTER,
        }
    }

    /// Free the master timer register block.
    pub fn free(self) -> pac::HRTIM_MASTER {
        self.master
    }

    /// Configure the master timer.
    ///
    /// The counter enable bits are controlled by [`Control::start`] and
    /// [`Control::stop`], and are left untouched.
    pub fn configure(&mut self, cr: MasterCr) {
        write_bits!(self.master.mcr, !MasterCr::CEN_MASK, cr.raw())
    }

    /// Current configuration.
    pub fn cr(&self) -> MasterCr {
        MasterCr::new(self.master.mcr.read().bits())
    }

    /// Set the period.
    pub fn set_period(&mut self, period: u16) {
        self.master
            .mper
            .write(|w| unsafe { w.bits(period.into()) })
    }

    /// Period.
    pub fn period(&self) -> u16 {
        self.master.mper.read().bits() as u16
    }

    /// Set the repetition counter.
    pub fn set_repetition(&mut self, rep: u8) {
        self.master.mrep.write(|w| unsafe { w.bits(rep.into()) })
    }

    /// Set a compare value.
    pub fn set_compare(&mut self, unit: Compare, val: u16) {
        let val: u32 = val.into();
        match unit {
            Compare::Cmp1 => self.master.mcmp1r.write(|w| unsafe { w.bits(val) }),
            Compare::Cmp2 => self.master.mcmp2r.write(|w| unsafe { w.bits(val) }),
            Compare::Cmp3 => self.master.mcmp3r.write(|w| unsafe { w.bits(val) }),
            Compare::Cmp4 => self.master.mcmp4r.write(|w| unsafe { w.bits(val) }),
        }
    }

    /// Compare value.
    pub fn compare(&self, unit: Compare) -> u16 {
        let bits: u32 = match unit {
            Compare::Cmp1 => self.master.mcmp1r.read().bits(),
            Compare::Cmp2 => self.master.mcmp2r.read().bits(),
            Compare::Cmp3 => self.master.mcmp3r.read().bits(),
            Compare::Cmp4 => self.master.mcmp4r.read().bits(),
        };
        bits as u16
    }

    /// Counter value.
    pub fn counter(&self) -> u16 {
        self.master.mcntr.read().bits() as u16
    }

    /// Enable interrupts.
    pub fn enable_irq(&mut self, irq: Irq) {
        set_bits!(self.master.mdier, irq.raw())
    }

    /// Disable interrupts.
    pub fn disable_irq(&mut self, irq: Irq) {
        clear_bits!(self.master.mdier, irq.raw())
    }

    /// Pending interrupt flags.
    pub fn status(&self) -> Irq {
        Irq::new(self.master.misr.read().bits())
    }

    /// Clear interrupt flags.
    pub fn clear_irq(&mut self, irq: Irq) {
        self.master.micr.write(|w| unsafe { w.bits(irq.raw()) })
    }
}

// The timing unit register blocks share one layout, with the unit letter in
// every register name.
macro_rules! hrtim_timer {
    ($Timer:ident, $PAC:ident, $id:ident, $x:ident) => {
        paste::paste! {
            #[doc = "Timing unit " $id "."]
            #[derive(Debug)]
            pub struct $Timer {
                tim: pac::$PAC,
            }

            impl $Timer {
                /// Timer identifier.
                pub const ID: TimerId = TimerId::$id;

                /// Steal the timing unit.
                ///
                /// # Safety
                ///
                /// Ensure the code stealing the timing unit has exclusive
                /// access to its registers.
                pub unsafe fn steal() -> $Timer {
                    $Timer {
                        tim: unsafe { pac::Peripherals::steal() }.$PAC,
                    }
                }

                /// Free the timing unit register block.
                pub fn free(self) -> pac::$PAC {
                    self.tim
                }

                /// Configure the timing unit.
                pub fn configure(&mut self, cr: TimCr) {
                    self.tim.[<tim $x cr>].write(|w| unsafe { w.bits(cr.raw()) })
                }

                /// Current configuration.
                pub fn cr(&self) -> TimCr {
                    TimCr::new(self.tim.[<tim $x cr>].read().bits())
                }

                /// Set the period.
                pub fn set_period(&mut self, period: u16) {
                    self.tim.[<per $x r>].write(|w| unsafe { w.bits(period.into()) })
                }

                /// Period.
                pub fn period(&self) -> u16 {
                    self.tim.[<per $x r>].read().bits() as u16
                }

                /// Set the repetition counter.
                pub fn set_repetition(&mut self, rep: u8) {
                    self.tim.[<rep $x r>].write(|w| unsafe { w.bits(rep.into()) })
                }

                /// Set a compare value.
                ///
                /// Values below the prescaler minimum are ignored by the
                /// hardware, use [`set_duty`](Self::set_duty) for a clamped
                /// value.
                pub fn set_compare(&mut self, unit: Compare, val: u16) {
                    let val: u32 = val.into();
                    match unit {
                        Compare::Cmp1 => self.tim.[<cmp1 $x r>].write(|w| unsafe { w.bits(val) }),
                        Compare::Cmp2 => self.tim.[<cmp2 $x r>].write(|w| unsafe { w.bits(val) }),
                        Compare::Cmp3 => self.tim.[<cmp3 $x r>].write(|w| unsafe { w.bits(val) }),
                        Compare::Cmp4 => self.tim.[<cmp4 $x r>].write(|w| unsafe { w.bits(val) }),
                    }
                }

                /// Compare value.
                pub fn compare(&self, unit: Compare) -> u16 {
                    let bits: u32 = match unit {
                        Compare::Cmp1 => self.tim.[<cmp1 $x r>].read().bits(),
                        Compare::Cmp2 => self.tim.[<cmp2 $x r>].read().bits(),
                        Compare::Cmp3 => self.tim.[<cmp3 $x r>].read().bits(),
                        Compare::Cmp4 => self.tim.[<cmp4 $x r>].read().bits(),
                    };
                    bits as u16
                }

                /// Set a compare unit to a duty cycle of the current period.
                ///
                /// Returns the compare value written.
                pub fn set_duty(&mut self, unit: Compare, duty: Duty) -> u16 {
                    let cmp: u16 = compare_for_duty(self.period(), duty, self.cr().prescaler());
                    self.set_compare(unit, cmp);
                    cmp
                }

                /// Set the events that set and reset an output.
                pub fn set_output_events(&mut self, out: Out, set: OutputEvents, reset: OutputEvents) {
                    match out {
                        Out::One => {
                            self.tim.[<set $x 1r>].write(|w| unsafe { w.bits(set.raw()) });
                            self.tim.[<rst $x 1r>].write(|w| unsafe { w.bits(reset.raw()) });
                        }
                        Out::Two => {
                            self.tim.[<set $x 2r>].write(|w| unsafe { w.bits(set.raw()) });
                            self.tim.[<rst $x 2r>].write(|w| unsafe { w.bits(reset.raw()) });
                        }
                    }
                }

                /// Set the output configuration.
                pub fn set_output_config(&mut self, outr: Outr) {
                    self.tim.[<out $x r>].write(|w| unsafe { w.bits(outr.raw()) })
                }

                /// Output configuration.
                pub fn output_config(&self) -> Outr {
                    Outr::new(self.tim.[<out $x r>].read().bits())
                }

                /// Set the dead-time.
                ///
                /// The dead-time generator is enabled with
                /// [`Outr::set_dead_time_en`].
                pub fn set_dead_time(&mut self, dt: DeadTime) {
                    self.tim.[<dt $x r>].write(|w| unsafe { w.bits(dt.raw()) })
                }

                /// Set the events that reset the counter.
                pub fn set_reset_events(&mut self, events: ResetEvents) {
                    self.tim.[<rst $x r>].write(|w| unsafe { w.bits(events.raw()) })
                }

                /// Select the fault inputs that disable the outputs of this
                /// timing unit.
                ///
                /// With `lock` set the selection is read-only until the next
                /// reset.
                pub fn enable_faults(&mut self, faults: Faults, lock: bool) {
                    let lck: u32 = if lock { FLT_LCK } else { 0 };
                    self.tim
                        .[<flt $x r>]
                        .write(|w| unsafe { w.bits(faults.inputs().raw() | lck) })
                }

                /// Set the capture triggers of a capture unit.
                pub fn set_capture_trigger(&mut self, cpt: Capture, triggers: CaptureTriggers) {
                    match cpt {
                        Capture::Cpt1 => self.tim.[<cpt1 $x cr>].write(|w| unsafe { w.bits(triggers.raw()) }),
                        Capture::Cpt2 => self.tim.[<cpt2 $x cr>].write(|w| unsafe { w.bits(triggers.raw()) }),
                    }
                }

                /// Captured counter value.
                pub fn capture(&self, cpt: Capture) -> u16 {
                    let bits: u32 = match cpt {
                        Capture::Cpt1 => self.tim.[<cpt1 $x r>].read().bits(),
                        Capture::Cpt2 => self.tim.[<cpt2 $x r>].read().bits(),
                    };
                    bits as u16
                }

                /// Counter value.
                pub fn counter(&self) -> u16 {
                    self.tim.[<cnt $x r>].read().bits() as u16
                }

                /// Enable interrupts.
                pub fn enable_irq(&mut self, irq: Irq) {
                    set_bits!(self.tim.[<tim $x dier>], irq.raw())
                }

                /// Disable interrupts.
                pub fn disable_irq(&mut self, irq: Irq) {
                    clear_bits!(self.tim.[<tim $x dier>], irq.raw())
                }

                /// Pending interrupt flags.
                pub fn status(&self) -> Irq {
                    Irq::new(self.tim.[<tim $x isr>].read().bits())
                }

                /// Clear interrupt flags.
                pub fn clear_irq(&mut self, irq: Irq) {
                    self.tim.[<tim $x icr>].write(|w| unsafe { w.bits(irq.raw()) })
                }
            }
        }
    };
}

hrtim_timer!(TimerA, HRTIM_TIMA, A, a);
hrtim_timer!(TimerB, HRTIM_TIMB, B, b);
hrtim_timer!(TimerC, HRTIM_TIMC, C, c);
hrtim_timer!(TimerD, HRTIM_TIMD, D, d);
hrtim_timer!(TimerE, HRTIM_TIME, E, e);

/// Common registers, the timer start/stop, outputs, faults, external events
/// and ADC triggers.
#[derive(Debug)]
pub struct Control {
    common: pac::HRTIM_COMMON,
}

impl Control {
    /// Steal the common registers.
    ///
    /// # Safety
    ///
    /// Ensure the code stealing the common registers has exclusive access to
    /// them, and to the master `MCR` counter enable bits.
    pub unsafe fn steal() -> Control {
        Control {
            common: unsafe { pac::Peripherals::steal() }.HRTIM_COMMON,
        }
    }

    /// Free the common register block.
    pub fn free(self) -> pac::HRTIM_COMMON {
        self.common
    }

    // The counter enable bits live in MCR. They belong to the control
    // handle, `Master::configure` leaves them untouched.
    fn mcr() -> &'static pac::hrtim_master::MCR {
        unsafe { &(*pac::HRTIM_MASTER::ptr()).mcr }
    }

    /// Start timer counters.
    pub fn start(&mut self, timers: Timers) {
        set_bits!(Self::mcr(), timers.raw())
    }

    /// Stop timer counters.
    pub fn stop(&mut self, timers: Timers) {
        clear_bits!(Self::mcr(), timers.raw())
    }

    /// Running timers.
    pub fn running(&self) -> Timers {
        Timers {
            val: Self::mcr().read().bits() & Timers::ALL.raw(),
        }
    }

    /// Transfer the preload registers of the timers to the active registers.
    pub fn software_update(&mut self, timers: Timers) {
        self.common.cr2.write(|w| unsafe { w.bits(timers.low()) })
    }

    /// Reset the timer counters.
    pub fn software_reset(&mut self, timers: Timers) {
        self.common
            .cr2
            .write(|w| unsafe { w.bits(timers.low() << CR2_RST_SHIFT) })
    }

    /// Disable or re-enable the register updates of timers.
    ///
    /// Used to update several registers of several timers atomically.
    pub fn set_update_disabled(&mut self, timers: Timers, disabled: bool) {
        let val: u32 = if disabled { timers.low() } else { 0 };
        write_bits!(self.common.cr1, timers.low(), val)
    }

    /// Enable outputs.
    pub fn enable_outputs(&mut self, outputs: Outputs) {
        self.common.oenr.write(|w| unsafe { w.bits(outputs.raw()) })
    }

    /// Disable outputs, they go to their idle level.
    pub fn disable_outputs(&mut self, outputs: Outputs) {
        self.common.odisr.write(|w| unsafe { w.bits(outputs.raw()) })
    }

    /// Enabled outputs.
    pub fn enabled_outputs(&self) -> Outputs {
        Outputs {
            val: self.common.oenr.read().bits() & Outputs::ALL.raw(),
        }
    }

    /// State of an output.
    pub fn output_state(&self, output: Output) -> OutputState {
        OutputState::from_regs(
            output,
            self.common.oenr.read().bits(),
            self.common.odsr.read().bits(),
        )
    }

    /// Configure a fault input.
    ///
    /// This has no effect on a fault input locked with
    /// [`FaultInputConfig::set_lock`].
    pub fn configure_fault_input(&mut self, fault: Fault, cfg: FaultInputConfig) {
        let (idx, shift) = fault.inr_location();
        let val: u32 = u32::from(cfg.raw()) << shift;
        // the enable bit must be cleared before the other fields change
        if idx == 0 {
            clear_bits!(self.common.fltinr1, 1 << shift);
            write_bits!(self.common.fltinr1, 0xFF << shift, val);
        } else {
            clear_bits!(self.common.fltinr2, 1 << shift);
            write_bits!(self.common.fltinr2, 0xFF << shift, val);
        }
    }

    /// Set the fault input filter sampling clock divider, `FLTSD`, 0 to 3.
    pub fn set_fault_sampling(&mut self, div: u8) {
        write_bits!(self.common.fltinr2, 0b11 << 24, u32::from(div) << 24)
    }

    /// Latched fault flags.
    pub fn fault_flags(&self) -> Faults {
        Faults::new(self.common.isr.read().bits())
    }

    /// Clear latched fault flags.
    ///
    /// This does not re-enable the outputs, see [`rearm`](Self::rearm).
    pub fn clear_faults(&mut self, faults: Faults) {
        self.common.icr.write(|w| unsafe { w.bits(faults.raw()) })
    }

    /// Enable fault interrupts (`HRTIM1_FLT`).
    pub fn enable_fault_irq(&mut self, faults: Faults) {
        set_bits!(self.common.ier, faults.raw())
    }

    /// Disable fault interrupts.
    pub fn disable_fault_irq(&mut self, faults: Faults) {
        clear_bits!(self.common.ier, faults.raw())
    }

    /// Configure external event `n`, 1 to 10.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidEvent`] if `n` is out of range.
    pub fn configure_external_event(
        &mut self,
        n: u8,
        cfg: ExternalEventConfig,
    ) -> Result<(), Error> {
        let (idx, shift, filter) = fault::eev_location(n).ok_or(Error::InvalidEvent(n))?;
        debug_assert!(!cfg.fast() || filter.is_none(), "fast mode is events 1 to 5");
        let field: u32 = if filter.is_none() {
            cfg.field()
        } else {
            cfg.field() & 0b1_1111
        };
        if idx == 0 {
            write_bits!(self.common.eecr1, 0b11_1111 << shift, field << shift);
        } else {
            write_bits!(self.common.eecr2, 0b11_1111 << shift, field << shift);
        }
        if let Some(fshift) = filter {
            write_bits!(
                self.common.eecr3,
                0xF << fshift,
                u32::from(cfg.filter()) << fshift
            );
        }
        Ok(())
    }

    /// Set the external event filter sampling clock divider, `EEVSD`, 0 to 3.
    pub fn set_external_event_sampling(&mut self, div: u8) {
        write_bits!(self.common.eecr3, 0b11 << 30, u32::from(div) << 30)
    }

    /// Set the sources of an ADC trigger.
    pub fn set_adc_trigger(&mut self, trg: AdcTrigger) {
        let raw: u32 = trg.raw();
        match trg.number() {
            1 => self.common.adc1r.write(|w| unsafe { w.bits(raw) }),
            2 => self.common.adc2r.write(|w| unsafe { w.bits(raw) }),
            3 => self.common.adc3r.write(|w| unsafe { w.bits(raw) }),
            _ => self.common.adc4r.write(|w| unsafe { w.bits(raw) }),
        }
    }

    /// Select the timer whose update latches ADC trigger `number` (1 to 4).
    pub fn set_adc_update_source(&mut self, number: u8, src: AdcUpdateSource) {
        debug_assert!((1..=4).contains(&number));
        let shift: u32 = 16 + 3 * u32::from(number.saturating_sub(1));
        write_bits!(self.common.cr1, 0b111 << shift, src.bits() << shift)
    }

    /// Returns `true` if the DLL is calibrated.
    pub fn dll_ready(&self) -> bool {
        self.common.isr.read().bits() & ISR_DLLRDY != 0
    }

    /// Clear fault flags, and re-enable outputs if the faults did not
    /// re-latch.
    ///
    /// This ignores any trip policy, a power stage that limits re-arming
    /// uses [`FaultSupervisor::rearm`] instead.
    ///
    /// # Errors
    ///
    /// * [`Error::FaultActive`] if a fault in `faults` is still present, the
    ///   outputs are left disabled.
    pub fn rearm(&mut self, faults: Faults, outputs: Outputs) -> Result<(), Error> {
        FaultLatch::clear(self, faults);
        let relatched: Faults = FaultLatch::latched(self, faults);
        if !relatched.is_empty() {
            return Err(Error::FaultActive(relatched));
        }
        self.enable_outputs(outputs);
        Ok(())
    }
}

impl FaultLatch for Control {
    fn latched(&self, faults: Faults) -> Faults {
        Faults::new(self.fault_flags().raw() & faults.raw())
    }

    fn clear(&mut self, faults: Faults) {
        self.clear_faults(faults)
    }

    fn enable(&mut self, outputs: Outputs) {
        self.enable_outputs(outputs)
    }

    fn disable(&mut self, outputs: Outputs) {
        self.disable_outputs(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::const_assert_eq;

    // MCR counter enables, and OENR/ODISR/ODSR
    const_assert_eq!(Timers::ALL.raw(), 0b11_1111 << 16);
    const_assert_eq!(Outputs::ALL.raw(), 0x3FF);
    const_assert_eq!(MasterCr::CEN_MASK, Timers::ALL.raw());

    #[test]
    fn timer_ids() {
        assert_eq!(TimerA::ID, TimerId::A);
        assert_eq!(TimerE::ID, TimerId::E);
        assert_eq!(Timers::from(TimerId::C), Timers::C);
        assert_eq!((Timers::MASTER | Timers::A).low(), 0b11);
        assert_eq!(Timers::ALL.low(), 0b11_1111);
        assert!(Timers::ALL.contains(Timers::E | Timers::MASTER));
    }

    #[test]
    fn outputs() {
        assert_eq!(Output::of(TimerId::A, Out::One), Output::Ta1);
        assert_eq!(Output::of(TimerId::B, Out::Two), Output::Tb2);
        assert_eq!(Output::of(TimerId::E, Out::Two), Output::Te2);
        assert_eq!(Outputs::from(Output::Td1), Outputs::TD1);
        let set = Outputs::TA1 | Outputs::TA2;
        assert!(set.contains(Output::Ta2));
        assert!(!set.contains(Output::Tb1));
    }

    #[test]
    fn output_state_decoding() {
        let oenr: u32 = Outputs::TA1.raw();
        let odsr: u32 = Outputs::TA2.raw();
        assert_eq!(OutputState::from_regs(Output::Ta1, oenr, odsr), OutputState::Run);
        assert_eq!(OutputState::from_regs(Output::Ta2, oenr, odsr), OutputState::Fault);
        assert_eq!(OutputState::from_regs(Output::Tb1, oenr, odsr), OutputState::Idle);
        // enable wins over a stale disable status
        assert_eq!(OutputState::from_regs(Output::Ta1, oenr, oenr), OutputState::Run);
    }

    #[test]
    fn adc_update_source_bits() {
        assert_eq!(AdcUpdateSource::Master.bits(), 0);
        assert_eq!(AdcUpdateSource::Timer(TimerId::A).bits(), 1);
        assert_eq!(AdcUpdateSource::Timer(TimerId::E).bits(), 5);
    }

    #[test]
    fn irq_mask() {
        assert_eq!(Irq::new(u32::MAX).raw(), 0x21FF);
        assert!((Irq::CMP1 | Irq::UPDATE).contains(Irq::UPDATE));
    }
}
