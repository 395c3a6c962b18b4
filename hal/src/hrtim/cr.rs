use super::Prescaler;

const CKPSC_MASK: u32 = 0b111;
const CONT: u32 = 1 << 3;
const RETRIG: u32 = 1 << 4;
const HALF: u32 = 1 << 5;
const PREEN: u32 = 1 << 27;

/// Auto-delayed compare mode for compare units 2 and 4 (`DELCMPx`).
///
/// In an auto-delayed mode the compare value is relative to the last capture
/// event instead of the counter start.
/// This is how a converter places an edge a fixed time after a zero-cross.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AutoDelay {
    /// Regular compare, always active.
    Standard = 0b00,
    /// Compare is relative to the capture, inactive until a capture occurs.
    Capture = 0b01,
    /// Compare is relative to the capture, or to the CMP1 match when no
    /// capture occurs first.
    CaptureOrCmp1 = 0b10,
    /// Compare is relative to the capture, or to the CMP3 match when no
    /// capture occurs first.
    CaptureOrCmp3 = 0b11,
}

impl AutoDelay {
    const fn from_bits(bits: u32) -> AutoDelay {
        match bits & 0b11 {
            0b01 => AutoDelay::Capture,
            0b10 => AutoDelay::CaptureOrCmp1,
            0b11 => AutoDelay::CaptureOrCmp3,
            _ => AutoDelay::Standard,
        }
    }
}

/// Master timer control register (`MCR`), configuration fields only.
///
/// The counter enable bits (`MCEN`, `TxCEN`) are owned by
/// [`Control::start`](super::Control::start) and are masked out of this value.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::{MasterCr, Prescaler};
///
/// const MCR: MasterCr = MasterCr::RESET
///     .set_prescaler(Prescaler::Mul32)
///     .set_continuous(true)
///     .set_preload(true);
/// assert_eq!(MCR.raw(), (1 << 27) | (1 << 3));
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MasterCr {
    val: u32,
}

impl MasterCr {
    /// Counter enable bits of the master and timers A to E.
    pub(crate) const CEN_MASK: u32 = 0b11_1111 << 16;

    /// Reset value of the register.
    pub const RESET: MasterCr = MasterCr::new(0);

    /// Create a new MasterCr register from a raw value.
    ///
    /// Counter enable bits are cleared.
    pub const fn new(val: u32) -> MasterCr {
        MasterCr {
            val: val & !Self::CEN_MASK,
        }
    }

    /// Get the raw value of the register.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Set the counter clock prescaler.
    #[must_use = "set_prescaler returns a modified MasterCr"]
    pub const fn set_prescaler(mut self, pre: Prescaler) -> MasterCr {
        self.val = (self.val & !CKPSC_MASK) | pre.bits();
        self
    }

    /// Counter clock prescaler.
    pub const fn prescaler(&self) -> Prescaler {
        Prescaler::from_bits(self.val)
    }

    /// Set continuous mode, the counter rolls over at the period.
    ///
    /// In single-shot mode the counter stops at the period.
    #[must_use = "set_continuous returns a modified MasterCr"]
    pub const fn set_continuous(mut self, cont: bool) -> MasterCr {
        if cont {
            self.val |= CONT
        } else {
            self.val &= !CONT
        }
        self
    }

    /// Returns `true` if the counter is in continuous mode.
    pub const fn continuous(&self) -> bool {
        self.val & CONT != 0
    }

    /// Allow a single-shot counter to be retriggered while running.
    #[must_use = "set_retrigger returns a modified MasterCr"]
    pub const fn set_retrigger(mut self, retrig: bool) -> MasterCr {
        if retrig {
            self.val |= RETRIG
        } else {
            self.val &= !RETRIG
        }
        self
    }

    /// Half mode, compare 1 follows half of the period.
    #[must_use = "set_half returns a modified MasterCr"]
    pub const fn set_half(mut self, half: bool) -> MasterCr {
        if half {
            self.val |= HALF
        } else {
            self.val &= !HALF
        }
        self
    }

    /// Enable the preload of period, repetition and compare registers.
    #[must_use = "set_preload returns a modified MasterCr"]
    pub const fn set_preload(mut self, preload: bool) -> MasterCr {
        if preload {
            self.val |= PREEN
        } else {
            self.val &= !PREEN
        }
        self
    }

    /// Returns `true` if preload is enabled.
    pub const fn preload(&self) -> bool {
        self.val & PREEN != 0
    }

    /// Transfer preloaded values on a repetition event (`MREPU`).
    #[must_use = "set_repetition_update returns a modified MasterCr"]
    pub const fn set_repetition_update(mut self, en: bool) -> MasterCr {
        if en {
            self.val |= 1 << 29
        } else {
            self.val &= !(1 << 29)
        }
        self
    }
}

impl From<u32> for MasterCr {
    fn from(val: u32) -> Self {
        MasterCr::new(val)
    }
}

impl From<MasterCr> for u32 {
    fn from(cr: MasterCr) -> Self {
        cr.val
    }
}

impl Default for MasterCr {
    fn default() -> Self {
        MasterCr::RESET
    }
}

/// Sources of a timing unit register update (`TxCR` bits 17 to 24).
///
/// The bit of a timer's own update is reserved in its control register.
pub mod update {
    /// Update on the repetition counter rollover (`TxREPU`).
    pub const REPETITION: u32 = 1 << 17;
    /// Update on a counter reset or roll-over (`TxRSTU`).
    pub const RESET: u32 = 1 << 18;
    /// Update when timer A updates (`TAU`).
    pub const TIMER_A: u32 = 1 << 19;
    /// Update when timer B updates (`TBU`).
    pub const TIMER_B: u32 = 1 << 20;
    /// Update when timer C updates (`TCU`).
    pub const TIMER_C: u32 = 1 << 21;
    /// Update when timer D updates (`TDU`).
    pub const TIMER_D: u32 = 1 << 22;
    /// Update when timer E updates (`TEU`).
    pub const TIMER_E: u32 = 1 << 23;
    /// Update when the master timer updates (`MSTU`).
    pub const MASTER: u32 = 1 << 24;

    pub(crate) const MASK: u32 = 0xFF << 17;
}

/// Timing unit control register (`TIMxCR`).
///
/// # Example
///
/// Continuous timer, full resolution, CMP2 auto-delayed from capture 1 with
/// CMP1 timeout.
/// This is the PFC configuration used to place an edge after a zero-cross.
///
/// ```
/// use stm32f3xx_hal::hrtim::{AutoDelay, Prescaler, TimCr};
///
/// const CR: TimCr = TimCr::RESET
///     .set_prescaler(Prescaler::Mul32)
///     .set_continuous(true)
///     .set_delayed_cmp2(AutoDelay::CaptureOrCmp1);
/// assert_eq!(CR.delayed_cmp2(), AutoDelay::CaptureOrCmp1);
/// assert_eq!(CR.raw(), (0b10 << 12) | (1 << 3));
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimCr {
    val: u32,
}

impl TimCr {
    /// Reset value of the register.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::TimCr;
    /// assert_eq!(TimCr::RESET.raw(), 0);
    /// ```
    pub const RESET: TimCr = TimCr::new(0);

    /// Create a new TimCr register from a raw value.
    pub const fn new(val: u32) -> TimCr {
        TimCr { val }
    }

    /// Get the raw value of the register.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Set the counter clock prescaler.
    #[must_use = "set_prescaler returns a modified TimCr"]
    pub const fn set_prescaler(mut self, pre: Prescaler) -> TimCr {
        self.val = (self.val & !CKPSC_MASK) | pre.bits();
        self
    }

    /// Counter clock prescaler.
    pub const fn prescaler(&self) -> Prescaler {
        Prescaler::from_bits(self.val)
    }

    /// Set continuous mode, the counter rolls over at the period.
    #[must_use = "set_continuous returns a modified TimCr"]
    pub const fn set_continuous(mut self, cont: bool) -> TimCr {
        if cont {
            self.val |= CONT
        } else {
            self.val &= !CONT
        }
        self
    }

    /// Returns `true` if the counter is in continuous mode.
    pub const fn continuous(&self) -> bool {
        self.val & CONT != 0
    }

    /// Allow a single-shot counter to be retriggered while running.
    #[must_use = "set_retrigger returns a modified TimCr"]
    pub const fn set_retrigger(mut self, retrig: bool) -> TimCr {
        if retrig {
            self.val |= RETRIG
        } else {
            self.val &= !RETRIG
        }
        self
    }

    /// Returns `true` if a single-shot counter can be retriggered.
    pub const fn retrigger(&self) -> bool {
        self.val & RETRIG != 0
    }

    /// Half mode, compare 1 follows half of the period.
    #[must_use = "set_half returns a modified TimCr"]
    pub const fn set_half(mut self, half: bool) -> TimCr {
        if half {
            self.val |= HALF
        } else {
            self.val &= !HALF
        }
        self
    }

    /// Push-pull mode, the outputs alternate every period.
    #[must_use = "set_push_pull returns a modified TimCr"]
    pub const fn set_push_pull(mut self, pshpll: bool) -> TimCr {
        if pshpll {
            self.val |= 1 << 6
        } else {
            self.val &= !(1 << 6)
        }
        self
    }

    /// Set the auto-delayed mode of compare unit 2, relative to capture 1.
    #[must_use = "set_delayed_cmp2 returns a modified TimCr"]
    pub const fn set_delayed_cmp2(mut self, mode: AutoDelay) -> TimCr {
        self.val = (self.val & !(0b11 << 12)) | ((mode as u32) << 12);
        self
    }

    /// Auto-delayed mode of compare unit 2.
    pub const fn delayed_cmp2(&self) -> AutoDelay {
        AutoDelay::from_bits(self.val >> 12)
    }

    /// Set the auto-delayed mode of compare unit 4, relative to capture 2.
    #[must_use = "set_delayed_cmp4 returns a modified TimCr"]
    pub const fn set_delayed_cmp4(mut self, mode: AutoDelay) -> TimCr {
        self.val = (self.val & !(0b11 << 14)) | ((mode as u32) << 14);
        self
    }

    /// Auto-delayed mode of compare unit 4.
    pub const fn delayed_cmp4(&self) -> AutoDelay {
        AutoDelay::from_bits(self.val >> 14)
    }

    /// Set the register update sources, a mask of [`update`] bits.
    #[must_use = "set_update_sources returns a modified TimCr"]
    pub const fn set_update_sources(mut self, sources: u32) -> TimCr {
        self.val = (self.val & !update::MASK) | (sources & update::MASK);
        self
    }

    /// Register update sources.
    pub const fn update_sources(&self) -> u32 {
        self.val & update::MASK
    }

    /// Enable the preload of period, repetition and compare registers.
    #[must_use = "set_preload returns a modified TimCr"]
    pub const fn set_preload(mut self, preload: bool) -> TimCr {
        if preload {
            self.val |= PREEN
        } else {
            self.val &= !PREEN
        }
        self
    }

    /// Returns `true` if preload is enabled.
    pub const fn preload(&self) -> bool {
        self.val & PREEN != 0
    }
}

impl From<u32> for TimCr {
    fn from(val: u32) -> Self {
        Self { val }
    }
}

impl From<TimCr> for u32 {
    fn from(cr: TimCr) -> Self {
        cr.val
    }
}

impl Default for TimCr {
    fn default() -> Self {
        TimCr::RESET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_cr_masks_counter_enables() {
        let cr = MasterCr::new(u32::MAX);
        assert_eq!(cr.raw() & MasterCr::CEN_MASK, 0);
        assert!(cr.continuous());
        assert_eq!(cr.prescaler(), Prescaler::Div4);
    }

    #[test]
    fn tim_cr_fields_do_not_overlap() {
        let cr = TimCr::RESET
            .set_prescaler(Prescaler::Div2)
            .set_delayed_cmp2(AutoDelay::CaptureOrCmp3)
            .set_delayed_cmp4(AutoDelay::Capture)
            .set_update_sources(update::RESET | update::REPETITION)
            .set_preload(true)
            .set_retrigger(true);
        assert_eq!(cr.prescaler(), Prescaler::Div2);
        assert_eq!(cr.delayed_cmp2(), AutoDelay::CaptureOrCmp3);
        assert_eq!(cr.delayed_cmp4(), AutoDelay::Capture);
        assert_eq!(cr.update_sources(), (1 << 17) | (1 << 18));
        assert!(cr.preload());
        assert!(cr.retrigger());
        assert!(!cr.continuous());

        let cr = cr
            .set_prescaler(Prescaler::Mul32)
            .set_delayed_cmp2(AutoDelay::Standard)
            .set_update_sources(0);
        assert_eq!(cr.raw(), (0b01 << 14) | PREEN | RETRIG);
    }

    #[test]
    fn update_sources_are_masked() {
        let cr = TimCr::RESET.set_update_sources(u32::MAX);
        assert_eq!(cr.raw(), update::MASK);
        assert_eq!(update::MASK & (1 << 23), 1 << 23);
        assert_eq!(update::MASK & (1 << 25), 0);
    }
}
