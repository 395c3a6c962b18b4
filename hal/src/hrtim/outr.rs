/// Output active polarity.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Active high.
    ActiveHigh = 0,
    /// Active low.
    ActiveLow = 1,
}

/// Output level in the idle and fault states.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdleLevel {
    /// Inactive.
    Inactive = 0,
    /// Active.
    Active = 1,
}

/// Output state when a fault is active (`FAULTx`).
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultLevel {
    /// The fault has no effect on the output.
    NoAction = 0b00,
    /// Output forced active.
    Active = 0b01,
    /// Output forced inactive.
    Inactive = 0b10,
    /// Output in high impedance.
    HighZ = 0b11,
}

impl FaultLevel {
    const fn from_bits(bits: u32) -> FaultLevel {
        match bits & 0b11 {
            0b01 => FaultLevel::Active,
            0b10 => FaultLevel::Inactive,
            0b11 => FaultLevel::HighZ,
            _ => FaultLevel::NoAction,
        }
    }
}

/// Output of a timing unit.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Out {
    /// Output 1.
    One = 0,
    /// Output 2.
    Two = 16,
}

const POL: u32 = 1 << 1;
const IDLES: u32 = 1 << 3;
const FAULT_SHIFT: u32 = 4;
const DTEN: u32 = 1 << 8;

/// Timing unit output register (`OUTxR`).
///
/// # Example
///
/// Complementary outputs with dead-time, both forced inactive on a fault.
///
/// ```
/// use stm32f3xx_hal::hrtim::{FaultLevel, Out, Outr, Polarity};
///
/// const OUTR: Outr = Outr::RESET
///     .set_fault_level(Out::One, FaultLevel::Inactive)
///     .set_fault_level(Out::Two, FaultLevel::Inactive)
///     .set_dead_time_en(true);
/// assert_eq!(OUTR.raw(), (0b10 << 4) | (0b10 << 20) | (1 << 8));
/// assert_eq!(OUTR.polarity(Out::Two), Polarity::ActiveHigh);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Outr {
    val: u32,
}

impl Outr {
    /// Reset value of the register.
    pub const RESET: Outr = Outr::new(0);

    /// Create a new Outr register from a raw value.
    pub const fn new(val: u32) -> Outr {
        Outr { val }
    }

    /// Get the raw value of the register.
    pub const fn raw(self) -> u32 {
        self.val
    }

    /// Set the output polarity.
    #[must_use = "set_polarity returns a modified Outr"]
    pub const fn set_polarity(mut self, out: Out, pol: Polarity) -> Outr {
        let bit: u32 = POL << (out as u32);
        match pol {
            Polarity::ActiveHigh => self.val &= !bit,
            Polarity::ActiveLow => self.val |= bit,
        }
        self
    }

    /// Output polarity.
    pub const fn polarity(&self, out: Out) -> Polarity {
        if self.val & (POL << (out as u32)) == 0 {
            Polarity::ActiveHigh
        } else {
            Polarity::ActiveLow
        }
    }

    /// Set the output level in the idle state.
    #[must_use = "set_idle_level returns a modified Outr"]
    pub const fn set_idle_level(mut self, out: Out, level: IdleLevel) -> Outr {
        let bit: u32 = IDLES << (out as u32);
        match level {
            IdleLevel::Inactive => self.val &= !bit,
            IdleLevel::Active => self.val |= bit,
        }
        self
    }

    /// Output level in the idle state.
    pub const fn idle_level(&self, out: Out) -> IdleLevel {
        if self.val & (IDLES << (out as u32)) == 0 {
            IdleLevel::Inactive
        } else {
            IdleLevel::Active
        }
    }

    /// Set the output state on a fault.
    ///
    /// This field is write-once when the fault lock of the timer is set.
    #[must_use = "set_fault_level returns a modified Outr"]
    pub const fn set_fault_level(mut self, out: Out, level: FaultLevel) -> Outr {
        let shift: u32 = FAULT_SHIFT + (out as u32);
        self.val = (self.val & !(0b11 << shift)) | ((level as u32) << shift);
        self
    }

    /// Output state on a fault.
    pub const fn fault_level(&self, out: Out) -> FaultLevel {
        FaultLevel::from_bits(self.val >> (FAULT_SHIFT + (out as u32)))
    }

    /// Enable the dead-time generator.
    ///
    /// Output 2 becomes the complement of output 1, the output 2 set and
    /// reset crossbars are ignored.
    #[must_use = "set_dead_time_en returns a modified Outr"]
    pub const fn set_dead_time_en(mut self, en: bool) -> Outr {
        if en {
            self.val |= DTEN
        } else {
            self.val &= !DTEN
        }
        self
    }

    /// Returns `true` if the dead-time generator is enabled.
    pub const fn dead_time_en(&self) -> bool {
        self.val & DTEN != 0
    }
}

impl From<u32> for Outr {
    fn from(val: u32) -> Self {
        Self { val }
    }
}

impl From<Outr> for u32 {
    fn from(outr: Outr) -> Self {
        outr.val
    }
}

impl Default for Outr {
    fn default() -> Self {
        Outr::RESET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_are_independent() {
        let outr = Outr::RESET
            .set_polarity(Out::Two, Polarity::ActiveLow)
            .set_idle_level(Out::One, IdleLevel::Active)
            .set_fault_level(Out::One, FaultLevel::HighZ);
        assert_eq!(outr.polarity(Out::One), Polarity::ActiveHigh);
        assert_eq!(outr.polarity(Out::Two), Polarity::ActiveLow);
        assert_eq!(outr.idle_level(Out::One), IdleLevel::Active);
        assert_eq!(outr.idle_level(Out::Two), IdleLevel::Inactive);
        assert_eq!(outr.fault_level(Out::One), FaultLevel::HighZ);
        assert_eq!(outr.fault_level(Out::Two), FaultLevel::NoAction);
        assert_eq!(outr.raw(), (1 << 17) | (1 << 3) | (0b11 << 4));
    }

    #[test]
    fn fault_level_overwrites() {
        let outr = Outr::RESET
            .set_fault_level(Out::Two, FaultLevel::HighZ)
            .set_fault_level(Out::Two, FaultLevel::Active);
        assert_eq!(outr.fault_level(Out::Two), FaultLevel::Active);
        assert_eq!(outr.raw(), 0b01 << 20);
        assert!(!outr.set_dead_time_en(true).set_dead_time_en(false).dead_time_en());
    }
}
