//! Fault inputs, external events, and fault supervision.

use super::{Error, Outputs};
use core::ops::{BitOr, BitOrAssign};

/// Fault input.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// Fault 1, pin PA12 or COMP2.
    F1 = 0,
    /// Fault 2, pin PA15 or COMP4.
    F2 = 1,
    /// Fault 3, pin PB10 or COMP6.
    F3 = 2,
    /// Fault 4, pin PB11.
    F4 = 3,
    /// Fault 5, pin PC7.
    F5 = 4,
}

impl Fault {
    /// All fault inputs.
    pub const ALL: [Fault; 5] = [Fault::F1, Fault::F2, Fault::F3, Fault::F4, Fault::F5];

    /// `FLTINR1`/`FLTINR2` register index (0 or 1) and bit shift of the
    /// fault configuration byte.
    pub(crate) const fn inr_location(self) -> (usize, u32) {
        match self {
            Fault::F5 => (1, 0),
            f => (0, 8 * (f as u32)),
        }
    }
}

/// Set of fault flags.
///
/// The bit layout is shared by the `ISR`, `ICR` and `IER` common registers,
/// and the fault enable bits of the `FLTxR` timer registers.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::{Fault, Faults};
///
/// let faults = Faults::from(Fault::F1) | Faults::from(Fault::F3);
/// assert!(faults.contains(Fault::F3));
/// assert!(!faults.contains(Fault::F2));
/// assert_eq!(faults.raw(), 0b101);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Faults {
    val: u32,
}

impl Faults {
    /// No faults.
    pub const NONE: Faults = Faults { val: 0 };
    /// Fault inputs 1 to 5.
    pub const ALL_INPUTS: Faults = Faults { val: 0b1_1111 };
    /// System fault, clock security system or SRAM parity error.
    pub const SYSTEM: Faults = Faults { val: 1 << 5 };

    const MASK: u32 = 0b11_1111;

    /// Create a fault set from a raw value, bits above the system fault are
    /// dropped.
    pub const fn new(val: u32) -> Faults {
        Faults {
            val: val & Self::MASK,
        }
    }

    /// Get the raw value.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Add a fault input to the set.
    #[must_use = "with returns a new set"]
    pub const fn with(self, fault: Fault) -> Faults {
        Faults {
            val: self.val | (1 << fault as u32),
        }
    }

    /// Returns `true` if the fault input is in the set.
    pub const fn contains(&self, fault: Fault) -> bool {
        self.val & (1 << fault as u32) != 0
    }

    /// Returns `true` if the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.val == 0
    }

    /// Fault inputs only, without the system fault.
    pub const fn inputs(&self) -> Faults {
        Faults {
            val: self.val & Self::ALL_INPUTS.val,
        }
    }
}

impl From<Fault> for Faults {
    fn from(fault: Fault) -> Self {
        Faults::NONE.with(fault)
    }
}

impl From<u32> for Faults {
    fn from(val: u32) -> Self {
        Faults::new(val)
    }
}

impl BitOr for Faults {
    type Output = Faults;

    fn bitor(self, rhs: Faults) -> Faults {
        Faults {
            val: self.val | rhs.val,
        }
    }
}

impl BitOrAssign for Faults {
    fn bitor_assign(&mut self, rhs: Faults) {
        self.val |= rhs.val
    }
}

/// Fault input polarity.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultPolarity {
    /// Fault active low.
    ActiveLow = 0,
    /// Fault active high.
    ActiveHigh = 1,
}

/// Fault input source.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultSource {
    /// The `HRTIM_FLTx` pin.
    Pin = 0,
    /// The on-chip comparator (COMP2, COMP4, COMP6 for faults 1 to 3).
    Internal = 1,
}

/// Fault input configuration, one byte of `FLTINR1` or `FLTINR2`.
///
/// # Example
///
/// Over-current comparator on fault 1, with a 4 sample digital filter.
///
/// ```
/// use stm32f3xx_hal::hrtim::{FaultInputConfig, FaultPolarity, FaultSource};
///
/// const FLT1: FaultInputConfig = FaultInputConfig::new()
///     .set_source(FaultSource::Internal)
///     .set_polarity(FaultPolarity::ActiveHigh)
///     .set_filter(0b0011)
///     .set_enable(true);
/// assert_eq!(FLT1.raw(), 0b0_0011_1_1_1);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultInputConfig {
    val: u8,
}

impl FaultInputConfig {
    /// Create a disabled, active low, pin sourced, unfiltered fault input.
    pub const fn new() -> FaultInputConfig {
        FaultInputConfig { val: 0 }
    }

    /// Configuration byte.
    pub const fn raw(&self) -> u8 {
        self.val
    }

    /// Enable the fault input.
    #[must_use = "set_enable returns a modified FaultInputConfig"]
    pub const fn set_enable(mut self, en: bool) -> FaultInputConfig {
        if en {
            self.val |= 1
        } else {
            self.val &= !1
        }
        self
    }

    /// Returns `true` if the fault input is enabled.
    pub const fn enabled(&self) -> bool {
        self.val & 1 != 0
    }

    /// Set the fault input polarity.
    #[must_use = "set_polarity returns a modified FaultInputConfig"]
    pub const fn set_polarity(mut self, pol: FaultPolarity) -> FaultInputConfig {
        self.val = (self.val & !(1 << 1)) | ((pol as u8) << 1);
        self
    }

    /// Set the fault input source.
    #[must_use = "set_source returns a modified FaultInputConfig"]
    pub const fn set_source(mut self, src: FaultSource) -> FaultInputConfig {
        self.val = (self.val & !(1 << 2)) | ((src as u8) << 2);
        self
    }

    /// Set the digital filter (`FLTxF`), 0 disables the filter.
    ///
    /// Only the lower 4 bits are used.
    #[must_use = "set_filter returns a modified FaultInputConfig"]
    pub const fn set_filter(mut self, filter: u8) -> FaultInputConfig {
        self.val = (self.val & !(0xF << 3)) | ((filter & 0xF) << 3);
        self
    }

    /// Digital filter.
    pub const fn filter(&self) -> u8 {
        (self.val >> 3) & 0xF
    }

    /// Lock the configuration until the next reset.
    #[must_use = "set_lock returns a modified FaultInputConfig"]
    pub const fn set_lock(mut self, lock: bool) -> FaultInputConfig {
        if lock {
            self.val |= 1 << 7
        } else {
            self.val &= !(1 << 7)
        }
        self
    }
}

impl Default for FaultInputConfig {
    fn default() -> Self {
        FaultInputConfig::new()
    }
}

/// External event source, the mapping to a signal is per event (RM0364 table 78).
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EevSrc {
    /// Source 1, the `HRTIM_EEVx` pin.
    Src1 = 0b00,
    /// Source 2.
    Src2 = 0b01,
    /// Source 3.
    Src3 = 0b10,
    /// Source 4.
    Src4 = 0b11,
}

/// External event polarity, used for level sensitivity only.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EevPolarity {
    /// Active high.
    ActiveHigh = 0,
    /// Active low.
    ActiveLow = 1,
}

/// External event sensitivity.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EevSensitivity {
    /// Active level, per [`EevPolarity`].
    Level = 0b00,
    /// Rising edge.
    Rising = 0b01,
    /// Falling edge.
    Falling = 0b10,
    /// Both edges.
    Both = 0b11,
}

/// External event conditioning.
///
/// # Example
///
/// Zero-cross detection on event 2 from COMP4, rising edge.
///
/// ```
/// use stm32f3xx_hal::hrtim::{EevSensitivity, EevSrc, ExternalEventConfig};
///
/// const EEV2: ExternalEventConfig = ExternalEventConfig::new(EevSrc::Src2)
///     .set_sensitivity(EevSensitivity::Rising);
/// assert_eq!(EEV2.field(), 0b0_01_0_01);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExternalEventConfig {
    src: EevSrc,
    polarity: EevPolarity,
    sensitivity: EevSensitivity,
    fast: bool,
    filter: u8,
}

impl ExternalEventConfig {
    /// Create a new level sensitive, active high external event.
    pub const fn new(src: EevSrc) -> ExternalEventConfig {
        ExternalEventConfig {
            src,
            polarity: EevPolarity::ActiveHigh,
            sensitivity: EevSensitivity::Level,
            fast: false,
            filter: 0,
        }
    }

    /// Set the polarity.
    #[must_use = "set_polarity returns a modified ExternalEventConfig"]
    pub const fn set_polarity(mut self, polarity: EevPolarity) -> ExternalEventConfig {
        self.polarity = polarity;
        self
    }

    /// Set the sensitivity.
    #[must_use = "set_sensitivity returns a modified ExternalEventConfig"]
    pub const fn set_sensitivity(mut self, sensitivity: EevSensitivity) -> ExternalEventConfig {
        self.sensitivity = sensitivity;
        self
    }

    /// Low latency mode, events 1 to 5 only.
    #[must_use = "set_fast returns a modified ExternalEventConfig"]
    pub const fn set_fast(mut self, fast: bool) -> ExternalEventConfig {
        self.fast = fast;
        self
    }

    /// Digital filter, events 6 to 10 only.
    ///
    /// Only the lower 4 bits are used.
    #[must_use = "set_filter returns a modified ExternalEventConfig"]
    pub const fn set_filter(mut self, filter: u8) -> ExternalEventConfig {
        self.filter = filter & 0xF;
        self
    }

    /// Low latency mode.
    pub const fn fast(&self) -> bool {
        self.fast
    }

    /// Digital filter.
    pub const fn filter(&self) -> u8 {
        self.filter
    }

    /// 6-bit `EExSRC`, `EExPOL`, `EExSNS`, `EExFAST` field of `EECR1`/`EECR2`.
    pub const fn field(&self) -> u32 {
        (self.src as u32)
            | ((self.polarity as u32) << 2)
            | ((self.sensitivity as u32) << 3)
            | ((self.fast as u32) << 5)
    }
}

/// `EECRx` register index (0 to 2) and shift of the configuration field and
/// of the filter field for external event `n`.
pub(crate) const fn eev_location(n: u8) -> Option<(usize, u32, Option<u32>)> {
    match n {
        1..=5 => Some((0, 6 * (n as u32 - 1), None)),
        6..=10 => Some((1, 6 * (n as u32 - 6), Some(6 * (n as u32 - 6)))),
        _ => None,
    }
}

/// State of a [`FaultSupervisor`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupervisorState {
    /// Outputs may run.
    Armed,
    /// A fault tripped the outputs.
    Tripped {
        /// Faults latched since the outputs tripped.
        faults: Faults,
        /// Number of trips since the last [`reset`](FaultSupervisor::reset).
        trips: u8,
    },
    /// Too many trips, the outputs stay off until a reset.
    LockedOut {
        /// Faults of the last trip.
        faults: Faults,
    },
}

/// Latched fault flags and output enables, the register side of a re-arm.
///
/// Implemented by [`Control`](super::Control).
pub trait FaultLatch {
    /// Latched flags among `faults`.
    fn latched(&self, faults: Faults) -> Faults;
    /// Clear latched flags.
    fn clear(&mut self, faults: Faults);
    /// Enable outputs.
    fn enable(&mut self, outputs: Outputs);
    /// Disable outputs.
    fn disable(&mut self, outputs: Outputs);
}

/// Fault trip and re-arm policy.
///
/// [`try_rearm`](Self::try_rearm) is the pure decision,
/// [`rearm`](Self::rearm) applies it to the outputs.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::{Error, Fault, FaultSupervisor, Faults, SupervisorState};
///
/// let mut sup = FaultSupervisor::new(2);
///
/// sup.on_trip(Faults::from(Fault::F1));
/// // the over-current is still present
/// assert_eq!(sup.try_rearm(true), Err(Error::FaultActive(Faults::from(Fault::F1))));
/// assert_eq!(sup.try_rearm(false), Ok(()));
/// assert_eq!(sup.state(), SupervisorState::Armed);
///
/// sup.on_trip(Faults::from(Fault::F1));
/// assert_eq!(sup.try_rearm(false), Err(Error::LockedOut));
///
/// sup.reset();
/// assert_eq!(sup.state(), SupervisorState::Armed);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultSupervisor {
    state: SupervisorState,
    trips: u8,
    max_trips: u8,
}

impl FaultSupervisor {
    /// Create a new supervisor that locks out on the `max_trips` trip.
    ///
    /// `max_trips == 0` never locks out.
    pub const fn new(max_trips: u8) -> FaultSupervisor {
        FaultSupervisor {
            state: SupervisorState::Armed,
            trips: 0,
            max_trips,
        }
    }

    /// Current state.
    pub const fn state(&self) -> SupervisorState {
        self.state
    }

    /// Number of trips since the last reset.
    pub const fn trips(&self) -> u8 {
        self.trips
    }

    /// Returns `true` if the outputs may run.
    pub const fn is_armed(&self) -> bool {
        matches!(self.state, SupervisorState::Armed)
    }

    /// Record a fault trip.
    ///
    /// Faults reported while already tripped are merged into the same trip.
    pub fn on_trip(&mut self, faults: Faults) -> SupervisorState {
        self.state = match self.state {
            SupervisorState::Armed => {
                self.trips = self.trips.saturating_add(1);
                SupervisorState::Tripped {
                    faults,
                    trips: self.trips,
                }
            }
            SupervisorState::Tripped {
                faults: prev,
                trips,
            } => SupervisorState::Tripped {
                faults: prev | faults,
                trips,
            },
            SupervisorState::LockedOut { faults: prev } => SupervisorState::LockedOut {
                faults: prev | faults,
            },
        };
        self.state
    }

    /// Decide whether the outputs can be re-armed.
    ///
    /// `still_active` is the fault state sampled after clearing the latched
    /// flags.
    ///
    /// # Errors
    ///
    /// * [`Error::FaultActive`] if the fault is still present, the state stays
    ///   tripped.
    /// * [`Error::LockedOut`] if the trip count reached the limit.
    pub fn try_rearm(&mut self, still_active: bool) -> Result<(), Error> {
        match self.state {
            SupervisorState::Armed => Ok(()),
            SupervisorState::Tripped { faults, .. } if still_active => {
                Err(Error::FaultActive(faults))
            }
            SupervisorState::Tripped { faults, trips } => {
                if self.max_trips != 0 && trips >= self.max_trips {
                    self.state = SupervisorState::LockedOut { faults };
                    Err(Error::LockedOut)
                } else {
                    self.state = SupervisorState::Armed;
                    Ok(())
                }
            }
            SupervisorState::LockedOut { .. } => Err(Error::LockedOut),
        }
    }

    /// Clear the latched faults of the current trip, and re-enable `outputs`
    /// only if the policy allows it.
    ///
    /// The outputs are never enabled on the trip that locks out.
    /// On any error they are disabled.
    ///
    /// # Errors
    ///
    /// * [`Error::FaultActive`] if a fault re-latched after clearing.
    /// * [`Error::LockedOut`] if the trip count reached the limit.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::hrtim::{Control, FaultSupervisor, Faults, Outputs};
    ///
    /// let mut control: Control = unsafe { Control::steal() };
    /// let mut supervisor: FaultSupervisor = FaultSupervisor::new(3);
    ///
    /// let faults: Faults = control.fault_flags().inputs();
    /// if !faults.is_empty() {
    ///     supervisor.on_trip(faults);
    ///     if supervisor.rearm(&mut control, Outputs::TA1 | Outputs::TA2).is_err() {
    ///         // the outputs are off
    ///     }
    /// }
    /// ```
    pub fn rearm<L: FaultLatch>(&mut self, latch: &mut L, outputs: Outputs) -> Result<(), Error> {
        let faults: Faults = match self.state {
            SupervisorState::Armed => Faults::NONE,
            SupervisorState::Tripped { faults, .. } | SupervisorState::LockedOut { faults } => {
                faults
            }
        };
        let still_active: bool = if matches!(self.state, SupervisorState::Tripped { .. }) {
            latch.clear(faults);
            !latch.latched(faults).is_empty()
        } else {
            false
        };
        match self.try_rearm(still_active) {
            Ok(()) => {
                latch.enable(outputs);
                Ok(())
            }
            Err(e) => {
                latch.disable(outputs);
                Err(e)
            }
        }
    }

    /// Clear a lockout and the trip count.
    pub fn reset(&mut self) {
        self.state = SupervisorState::Armed;
        self.trips = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_locations() {
        assert_eq!(Fault::F1.inr_location(), (0, 0));
        assert_eq!(Fault::F2.inr_location(), (0, 8));
        assert_eq!(Fault::F4.inr_location(), (0, 24));
        assert_eq!(Fault::F5.inr_location(), (1, 0));
    }

    #[test]
    fn faults_mask() {
        assert_eq!(Faults::new(u32::MAX).raw(), 0b11_1111);
        assert_eq!(Faults::new(u32::MAX).inputs(), Faults::ALL_INPUTS);
        assert!(Faults::NONE.is_empty());
        let all = Fault::ALL
            .iter()
            .fold(Faults::NONE, |acc, f| acc.with(*f));
        assert_eq!(all, Faults::ALL_INPUTS);
    }

    #[test]
    fn fault_input_fields() {
        let cfg = FaultInputConfig::new()
            .set_filter(0xFF)
            .set_lock(true)
            .set_polarity(FaultPolarity::ActiveHigh)
            .set_polarity(FaultPolarity::ActiveLow);
        assert_eq!(cfg.filter(), 0xF);
        assert!(!cfg.enabled());
        assert_eq!(cfg.raw(), 0b1_1111_0_0_0);
    }

    #[test]
    fn external_event_fields() {
        let cfg = ExternalEventConfig::new(EevSrc::Src4)
            .set_polarity(EevPolarity::ActiveLow)
            .set_sensitivity(EevSensitivity::Both)
            .set_fast(true)
            .set_filter(0x1F);
        assert_eq!(cfg.field(), 0b1_11_1_11);
        assert_eq!(cfg.filter(), 0xF);
        assert_eq!(eev_location(1), Some((0, 0, None)));
        assert_eq!(eev_location(5), Some((0, 24, None)));
        assert_eq!(eev_location(6), Some((1, 0, Some(0))));
        assert_eq!(eev_location(10), Some((1, 24, Some(24))));
        assert_eq!(eev_location(0), None);
        assert_eq!(eev_location(11), None);
    }

    #[test]
    fn supervisor_merges_faults_while_tripped() {
        let mut sup = FaultSupervisor::new(0);
        sup.on_trip(Faults::from(Fault::F1));
        let state = sup.on_trip(Faults::from(Fault::F2));
        assert_eq!(
            state,
            SupervisorState::Tripped {
                faults: Faults::from(Fault::F1) | Faults::from(Fault::F2),
                trips: 1
            }
        );
        assert_eq!(sup.trips(), 1);
    }

    #[test]
    fn supervisor_without_limit_never_locks_out() {
        let mut sup = FaultSupervisor::new(0);
        for _ in 0..300 {
            sup.on_trip(Faults::SYSTEM);
            assert_eq!(sup.try_rearm(false), Ok(()));
        }
        assert_eq!(sup.trips(), u8::MAX);
        assert!(sup.is_armed());
    }

    #[derive(Default)]
    struct FakeLatch {
        flags: u32,
        stuck: u32,
        oenr: u32,
        enables: u32,
    }

    impl FaultLatch for FakeLatch {
        fn latched(&self, faults: Faults) -> Faults {
            Faults::new(self.flags & faults.raw())
        }

        fn clear(&mut self, faults: Faults) {
            self.flags &= !faults.raw() | self.stuck;
        }

        fn enable(&mut self, outputs: Outputs) {
            self.enables += 1;
            self.oenr |= outputs.raw();
        }

        fn disable(&mut self, outputs: Outputs) {
            self.oenr &= !outputs.raw();
        }
    }

    const OUTS: Outputs = Outputs::TA1.union(Outputs::TA2);

    #[test]
    fn rearm_restores_outputs_below_limit() {
        let mut sup = FaultSupervisor::new(2);
        let mut latch = FakeLatch {
            flags: Faults::from(Fault::F1).raw(),
            ..Default::default()
        };
        sup.on_trip(Faults::from(Fault::F1));
        assert_eq!(sup.rearm(&mut latch, OUTS), Ok(()));
        assert_eq!(latch.flags, 0);
        assert_eq!(latch.oenr, OUTS.raw());
        assert!(sup.is_armed());
    }

    #[test]
    fn rearm_never_enables_on_lockout_trip() {
        let mut sup = FaultSupervisor::new(2);
        let mut latch = FakeLatch::default();
        sup.on_trip(Faults::from(Fault::F1));
        assert_eq!(sup.rearm(&mut latch, OUTS), Ok(()));
        assert_eq!(latch.enables, 1);

        // hardware tripped the outputs
        latch.oenr = 0;
        latch.flags = Faults::from(Fault::F1).raw();
        sup.on_trip(Faults::from(Fault::F1));
        assert_eq!(sup.rearm(&mut latch, OUTS), Err(Error::LockedOut));
        assert_eq!(latch.enables, 1);
        assert_eq!(latch.oenr, 0);

        assert_eq!(sup.rearm(&mut latch, OUTS), Err(Error::LockedOut));
        assert_eq!(latch.enables, 1);
    }

    #[test]
    fn rearm_keeps_outputs_off_while_fault_active() {
        let f2: Faults = Faults::from(Fault::F2);
        let mut sup = FaultSupervisor::new(0);
        let mut latch = FakeLatch {
            flags: f2.raw(),
            stuck: f2.raw(),
            ..Default::default()
        };
        sup.on_trip(f2);
        assert_eq!(sup.rearm(&mut latch, OUTS), Err(Error::FaultActive(f2)));
        assert_eq!(latch.enables, 0);
        assert!(!sup.is_armed());

        latch.stuck = 0;
        assert_eq!(sup.rearm(&mut latch, OUTS), Ok(()));
        assert_eq!(latch.oenr, OUTS.raw());
    }

    #[test]
    fn supervisor_lockout_is_sticky() {
        let mut sup = FaultSupervisor::new(1);
        assert_eq!(sup.try_rearm(false), Ok(()));
        sup.on_trip(Faults::from(Fault::F3));
        assert_eq!(sup.try_rearm(false), Err(Error::LockedOut));
        assert_eq!(
            sup.state(),
            SupervisorState::LockedOut {
                faults: Faults::from(Fault::F3)
            }
        );
        sup.on_trip(Faults::from(Fault::F4));
        assert_eq!(sup.try_rearm(false), Err(Error::LockedOut));
        assert!(!sup.is_armed());
        sup.reset();
        assert_eq!(sup.trips(), 0);
        assert_eq!(sup.try_rearm(true), Ok(()));
    }
}
