//! HRTIM timing arithmetic.
//!
//! All of this is pure, none of it touches a register.

use super::Error;
use num_integer::Integer;

/// Counter clock prescaler (`CKPSC`).
///
/// The HRTIM counters run at `f_HRTIM × 32` through the delay-locked loop,
/// divided by the prescaler.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> × 32, 217 ps at 144 MHz.
    Mul32 = 0,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> × 16.
    Mul16 = 1,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> × 8.
    Mul8 = 2,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> × 4.
    Mul4 = 3,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> × 2.
    Mul2 = 4,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub>.
    Div1 = 5,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> / 2.
    Div2 = 6,
    /// f<sub>HRCK</sub> = f<sub>HRTIM</sub> / 4.
    Div4 = 7,
}

impl Prescaler {
    /// All prescalers, finest resolution first.
    pub const ALL: [Prescaler; 8] = [
        Prescaler::Mul32,
        Prescaler::Mul16,
        Prescaler::Mul8,
        Prescaler::Mul4,
        Prescaler::Mul2,
        Prescaler::Div1,
        Prescaler::Div2,
        Prescaler::Div4,
    ];

    /// Create a prescaler from the `CKPSC` field value.
    ///
    /// Only the lower three bits are used.
    pub const fn from_bits(bits: u32) -> Prescaler {
        Self::ALL[(bits & 0b111) as usize]
    }

    /// `CKPSC` field value.
    pub const fn bits(self) -> u32 {
        self as u32
    }

    /// Minimum period and compare value, RM0364 table 82.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::Prescaler;
    ///
    /// assert_eq!(Prescaler::Mul32.min_value(), 0x60);
    /// assert_eq!(Prescaler::Div1.min_value(), 0x3);
    /// assert_eq!(Prescaler::Div4.min_value(), 0x3);
    /// ```
    pub const fn min_value(self) -> u16 {
        match self {
            Prescaler::Mul32 => 0x60,
            Prescaler::Mul16 => 0x30,
            Prescaler::Mul8 => 0x18,
            Prescaler::Mul4 => 0x0C,
            Prescaler::Mul2 => 0x06,
            Prescaler::Div1 | Prescaler::Div2 | Prescaler::Div4 => 0x03,
        }
    }

    /// Maximum period and compare value.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::Prescaler;
    ///
    /// assert_eq!(Prescaler::Mul32.max_value(), 0xFFDF);
    /// assert_eq!(Prescaler::Div2.max_value(), 0xFFFD);
    /// ```
    pub const fn max_value(self) -> u16 {
        match self {
            Prescaler::Div1 | Prescaler::Div2 | Prescaler::Div4 => 0xFFFD,
            _ => 0xFFDF,
        }
    }

    /// Counter clock frequency in hertz for a given HRTIM input clock.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::Prescaler;
    ///
    /// assert_eq!(Prescaler::Mul32.counter_hz(144_000_000), 4_608_000_000);
    /// assert_eq!(Prescaler::Div4.counter_hz(144_000_000), 36_000_000);
    /// ```
    pub const fn counter_hz(self, hrtim_hz: u32) -> u64 {
        ((hrtim_hz as u64) * 32) >> self.bits()
    }

    /// Select the finest prescaler able to generate `freq_hz`.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::{Error, Prescaler};
    ///
    /// // 250 kHz fits at the full resolution
    /// assert_eq!(Prescaler::finest_for(144_000_000, 250_000), Ok(Prescaler::Mul32));
    /// // 50 kHz does not
    /// assert_eq!(Prescaler::finest_for(144_000_000, 50_000), Ok(Prescaler::Mul16));
    /// ```
    pub fn finest_for(hrtim_hz: u32, freq_hz: u32) -> Result<Prescaler, Error> {
        let mut last: Error = Error::PeriodTooLong;
        for pre in Self::ALL {
            match period_ticks(hrtim_hz, freq_hz, pre) {
                Ok(_) => return Ok(pre),
                Err(Error::PeriodTooShort) => return Err(Error::PeriodTooShort),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

impl Default for Prescaler {
    fn default() -> Self {
        Prescaler::Mul32
    }
}

/// Round-to-nearest unsigned division.
fn div_round(num: u64, den: u64) -> u64 {
    let (q, r) = num.div_rem(&den);
    if r * 2 >= den { q + 1 } else { q }
}

/// Period register value for a switching frequency.
///
/// # Errors
///
/// * [`Error::PeriodTooShort`] when the period is below the prescaler minimum.
/// * [`Error::PeriodTooLong`] when the period does not fit the prescaler maximum.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::{period_ticks, Error, Prescaler};
///
/// // buck-boost switching frequency on the STM32F3348-DISCO
/// assert_eq!(period_ticks(144_000_000, 250_000, Prescaler::Mul32), Ok(18432));
/// assert_eq!(period_ticks(144_000_000, 100_000_000, Prescaler::Mul32), Err(Error::PeriodTooShort));
/// assert_eq!(period_ticks(144_000_000, 10_000, Prescaler::Mul32), Err(Error::PeriodTooLong));
/// ```
pub fn period_ticks(hrtim_hz: u32, freq_hz: u32, pre: Prescaler) -> Result<u16, Error> {
    if freq_hz == 0 {
        return Err(Error::PeriodTooLong);
    }
    let ticks: u64 = div_round(pre.counter_hz(hrtim_hz), u64::from(freq_hz));
    if ticks < u64::from(pre.min_value()) {
        Err(Error::PeriodTooShort)
    } else if ticks > u64::from(pre.max_value()) {
        Err(Error::PeriodTooLong)
    } else {
        Ok(ticks as u16)
    }
}

/// Convert a duration in nanoseconds to counter ticks, rounded to nearest.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::{ns_to_ticks, Prescaler};
///
/// // 217 ps per tick
/// assert_eq!(ns_to_ticks(144_000_000, 1_000, Prescaler::Mul32), 4608);
/// ```
pub fn ns_to_ticks(hrtim_hz: u32, ns: u32, pre: Prescaler) -> u64 {
    div_round(pre.counter_hz(hrtim_hz) * u64::from(ns), 1_000_000_000)
}

/// Duty cycle in per-mille.
///
/// Values above 1000 saturate to 100 %.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::Duty;
///
/// assert_eq!(Duty::from_permille(250).permille(), 250);
/// assert_eq!(Duty::from_permille(1500), Duty::FULL);
/// assert_eq!(Duty::from_percent(50), Duty::from_permille(500));
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Duty(u16);

impl Duty {
    /// 0 %.
    pub const ZERO: Duty = Duty(0);
    /// 100 %.
    pub const FULL: Duty = Duty(1000);

    /// Create a duty cycle from per-mille, saturating at 1000.
    pub const fn from_permille(permille: u16) -> Duty {
        if permille > 1000 {
            Duty::FULL
        } else {
            Duty(permille)
        }
    }

    /// Create a duty cycle from percent, saturating at 100.
    pub const fn from_percent(percent: u8) -> Duty {
        Duty::from_permille((percent as u16) * 10)
    }

    /// Duty cycle in per-mille.
    pub const fn permille(self) -> u16 {
        self.0
    }

    /// Saturating addition.
    #[must_use = "saturating_add returns a new Duty"]
    pub const fn saturating_add(self, permille: u16) -> Duty {
        Duty::from_permille(self.0.saturating_add(permille))
    }

    /// Saturating subtraction.
    #[must_use = "saturating_sub returns a new Duty"]
    pub const fn saturating_sub(self, permille: u16) -> Duty {
        Duty(self.0.saturating_sub(permille))
    }
}

/// Compare value for a duty cycle, clamped into the legal compare range.
///
/// The range is `[pre.min_value(), min(period, pre.max_value())]`.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::{compare_for_duty, Duty, Prescaler};
///
/// assert_eq!(compare_for_duty(18432, Duty::from_permille(500), Prescaler::Mul32), 9216);
/// // 0 % is clamped to the minimum compare value
/// assert_eq!(compare_for_duty(18432, Duty::ZERO, Prescaler::Mul32), 0x60);
/// assert_eq!(compare_for_duty(18432, Duty::FULL, Prescaler::Mul32), 18432);
/// ```
pub fn compare_for_duty(period: u16, duty: Duty, pre: Prescaler) -> u16 {
    let raw: u64 = div_round(u64::from(period) * u64::from(duty.permille()), 1000);
    let max: u16 = period.min(pre.max_value());
    let min: u16 = pre.min_value().min(max);
    (raw.min(u64::from(u16::MAX)) as u16).clamp(min, max)
}

/// Dead-time generator settings.
///
/// The dead-time tick is t<sub>DTG</sub> = t<sub>HRTIM</sub> × 2<sup>DTPRSC</sup> / 8,
/// rising and falling values are 9 bits.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeadTime {
    prescaler: u8,
    rising: u16,
    falling: u16,
}

impl DeadTime {
    /// Maximum rising or falling value.
    pub const MAX_VALUE: u16 = 0x1FF;

    /// No dead-time.
    pub const NONE: DeadTime = DeadTime {
        prescaler: 0,
        rising: 0,
        falling: 0,
    };

    /// Create dead-time settings from raw values.
    ///
    /// Returns `None` if `prescaler > 7` or a value is above
    /// [`MAX_VALUE`](Self::MAX_VALUE).
    pub const fn new(prescaler: u8, rising: u16, falling: u16) -> Option<DeadTime> {
        if prescaler > 7 || rising > Self::MAX_VALUE || falling > Self::MAX_VALUE {
            None
        } else {
            Some(DeadTime {
                prescaler,
                rising,
                falling,
            })
        }
    }

    /// Select the finest dead-time prescaler for the rising and falling
    /// dead-times in nanoseconds.
    ///
    /// # Errors
    ///
    /// [`Error::DeadTimeTooLong`] if a dead-time does not fit at the coarsest
    /// prescaler.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::{DeadTime, Error};
    ///
    /// let dt = DeadTime::from_ns(144_000_000, 100, 50)?;
    /// assert_eq!(dt.prescaler(), 0);
    /// assert_eq!(dt.rising(), 115);
    /// assert_eq!(dt.falling(), 58);
    ///
    /// let dt = DeadTime::from_ns(144_000_000, 1_000, 1_000)?;
    /// assert_eq!(dt.prescaler(), 2);
    /// assert_eq!(dt.rising(), 288);
    ///
    /// assert_eq!(DeadTime::from_ns(144_000_000, 100_000, 0), Err(Error::DeadTimeTooLong));
    /// # Ok::<(), stm32f3xx_hal::hrtim::Error>(())
    /// ```
    pub fn from_ns(hrtim_hz: u32, rising_ns: u32, falling_ns: u32) -> Result<DeadTime, Error> {
        (0..=7)
            .find_map(|prescaler: u8| {
                let rising: u64 = Self::ns_to_value(hrtim_hz, rising_ns, prescaler);
                let falling: u64 = Self::ns_to_value(hrtim_hz, falling_ns, prescaler);
                if rising <= u64::from(Self::MAX_VALUE) && falling <= u64::from(Self::MAX_VALUE)
                {
                    Some(DeadTime {
                        prescaler,
                        rising: rising as u16,
                        falling: falling as u16,
                    })
                } else {
                    None
                }
            })
            .ok_or(Error::DeadTimeTooLong)
    }

    fn ns_to_value(hrtim_hz: u32, ns: u32, prescaler: u8) -> u64 {
        div_round(
            u64::from(hrtim_hz) * 8 * u64::from(ns),
            1_000_000_000 << prescaler,
        )
    }

    /// Dead-time prescaler (`DTPRSC`).
    pub const fn prescaler(&self) -> u8 {
        self.prescaler
    }

    /// Rising edge dead-time value (`DTR`).
    pub const fn rising(&self) -> u16 {
        self.rising
    }

    /// Falling edge dead-time value (`DTF`).
    pub const fn falling(&self) -> u16 {
        self.falling
    }

    /// Rising edge dead-time in picoseconds.
    pub fn rising_ps(&self, hrtim_hz: u32) -> u64 {
        self.value_ps(hrtim_hz, self.rising)
    }

    /// Falling edge dead-time in picoseconds.
    pub fn falling_ps(&self, hrtim_hz: u32) -> u64 {
        self.value_ps(hrtim_hz, self.falling)
    }

    fn value_ps(&self, hrtim_hz: u32, value: u16) -> u64 {
        div_round(
            (u64::from(value) << self.prescaler) * 1_000_000_000_000,
            u64::from(hrtim_hz) * 8,
        )
    }

    /// Raw `DTxR` register value, positive dead-times, nothing locked.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::hrtim::DeadTime;
    ///
    /// let dt = DeadTime::new(3, 0x1FF, 0x0AA).unwrap();
    /// assert_eq!(dt.raw(), 0x00AA_0DFF);
    /// ```
    pub const fn raw(&self) -> u32 {
        (self.rising as u32) | ((self.prescaler as u32) << 10) | ((self.falling as u32) << 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F: u32 = 144_000_000;

    #[test]
    fn prescaler_round_trip() {
        for pre in Prescaler::ALL {
            assert_eq!(Prescaler::from_bits(pre.bits()), pre);
        }
        assert_eq!(Prescaler::from_bits(0b1_101), Prescaler::Div1);
    }

    #[test]
    fn period_boundaries() {
        // 0x60 ticks at 4.608 GHz is exactly 48 MHz
        assert_eq!(period_ticks(F, 48_000_000, Prescaler::Mul32), Ok(0x60));
        assert_eq!(
            period_ticks(F, 48_500_000, Prescaler::Mul32),
            Err(Error::PeriodTooShort)
        );
        // 4.608e9 / 0xFFDF = 70_347.6 Hz
        assert_eq!(
            period_ticks(F, 70_340, Prescaler::Mul32),
            Err(Error::PeriodTooLong)
        );
        assert!(period_ticks(F, 70_350, Prescaler::Mul32).is_ok());
        assert_eq!(period_ticks(F, 0, Prescaler::Div4), Err(Error::PeriodTooLong));
    }

    #[test]
    fn finest_prescaler() {
        assert_eq!(Prescaler::finest_for(F, 100_000), Ok(Prescaler::Mul32));
        assert_eq!(Prescaler::finest_for(F, 70_000), Ok(Prescaler::Mul16));
        assert_eq!(Prescaler::finest_for(F, 3_000), Ok(Prescaler::Div1));
        assert_eq!(Prescaler::finest_for(F, 1_000), Ok(Prescaler::Div4));
        assert_eq!(Prescaler::finest_for(F, 500), Err(Error::PeriodTooLong));
        assert_eq!(
            Prescaler::finest_for(F, 100_000_000),
            Err(Error::PeriodTooShort)
        );
    }

    #[test]
    fn duty_saturates() {
        assert_eq!(Duty::FULL.saturating_add(1), Duty::FULL);
        assert_eq!(Duty::ZERO.saturating_sub(1), Duty::ZERO);
        assert_eq!(Duty::from_permille(995).saturating_add(10), Duty::FULL);
        assert_eq!(Duty::from_percent(200), Duty::FULL);
    }

    #[test]
    fn compare_clamped() {
        assert_eq!(
            compare_for_duty(18432, Duty::from_permille(1), Prescaler::Mul32),
            0x60
        );
        assert_eq!(
            compare_for_duty(0xFFFD, Duty::FULL, Prescaler::Mul32),
            0xFFDF
        );
        assert_eq!(compare_for_duty(1000, Duty::from_permille(333), Prescaler::Div1), 333);
        // degenerate period below the minimum compare
        assert_eq!(compare_for_duty(2, Duty::FULL, Prescaler::Div1), 2);
    }

    #[test]
    fn dead_time_prescaler_selection() {
        let dt = DeadTime::from_ns(F, 443, 0).unwrap();
        assert_eq!(dt.prescaler(), 0);
        assert_eq!(dt.rising(), 510);

        let dt = DeadTime::from_ns(F, 445, 0).unwrap();
        assert_eq!(dt.prescaler(), 1);
        assert_eq!(dt.rising(), 256);

        let dt = DeadTime::from_ns(F, 0, 3_000).unwrap();
        assert_eq!(dt.prescaler(), 3);
        assert_eq!(dt.falling(), 432);
        assert_eq!(dt.falling_ps(F), 3_000_000);
    }

    #[test]
    fn dead_time_raw_values() {
        assert_eq!(DeadTime::NONE.raw(), 0);
        assert_eq!(DeadTime::new(8, 0, 0), None);
        assert_eq!(DeadTime::new(0, 0x200, 0), None);
        assert_eq!(DeadTime::new(7, 1, 2).map(|dt| dt.raw()), Some(0x0002_1C01));
    }
}
