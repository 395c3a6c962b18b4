//! Event sets of the HRTIM crossbars.
//!
//! Each set is a bit mask in the layout of its register, combine them with `|`.

use super::TimerId;
use core::ops::{BitOr, BitOrAssign};

macro_rules! event_set {
    ($name:ident, $reg:literal) => {
        #[doc = concat!("Event set of the `", $reg, "` register.")]
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub struct $name {
            val: u32,
        }

        impl $name {
            /// No events.
            pub const NONE: $name = $name::new(0);

            /// Create an event set from a raw register value.
            pub const fn new(val: u32) -> $name {
                $name { val }
            }

            /// Get the raw value of the register.
            pub const fn raw(self) -> u32 {
                self.val
            }

            /// Union of two event sets, `|` in a `const` context.
            #[must_use = "union returns a new set"]
            pub const fn union(self, other: $name) -> $name {
                $name::new(self.val | other.val)
            }

            /// Returns `true` if all events of `other` are in this set.
            pub const fn contains(&self, other: $name) -> bool {
                self.val & other.val == other.val
            }

            /// Returns `true` if the set is empty.
            pub const fn is_empty(&self) -> bool {
                self.val == 0
            }

            const fn bit(n: u32) -> $name {
                $name::new(1 << n)
            }
        }

        impl BitOr for $name {
            type Output = $name;

            fn bitor(self, rhs: $name) -> $name {
                self.union(rhs)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: $name) {
                self.val |= rhs.val
            }
        }

        impl From<u32> for $name {
            fn from(val: u32) -> Self {
                $name::new(val)
            }
        }

        impl From<$name> for u32 {
            fn from(set: $name) -> Self {
                set.val
            }
        }
    };
}

event_set!(OutputEvents, "SETxyR/RSTxyR");
event_set!(ResetEvents, "RSTxR");
event_set!(CaptureTriggers, "CPTxyCR");
event_set!(AdcTrigger13, "ADC1R/ADC3R");
event_set!(AdcTrigger24, "ADC2R/ADC4R");

/// Output set and reset crossbar.
///
/// # Example
///
/// Classic PWM: set the output on the period, reset it on compare 1.
///
/// ```
/// use stm32f3xx_hal::hrtim::OutputEvents;
///
/// const SET: OutputEvents = OutputEvents::PERIOD;
/// const RST: OutputEvents = OutputEvents::CMP1;
/// assert_eq!(SET.raw(), 1 << 2);
/// assert_eq!(RST.raw(), 1 << 3);
///
/// // reset on compare 1 or on external event 2
/// let rst = OutputEvents::CMP1 | OutputEvents::external(2).unwrap();
/// assert!(rst.contains(OutputEvents::CMP1));
/// assert_eq!(rst.raw(), (1 << 3) | (1 << 22));
/// ```
impl OutputEvents {
    /// Software set or reset.
    pub const SOFTWARE: OutputEvents = OutputEvents::bit(0);
    /// Timer counter reset or roll-over re-synchronisation.
    pub const RESYNC: OutputEvents = OutputEvents::bit(1);
    /// Timer period.
    pub const PERIOD: OutputEvents = OutputEvents::bit(2);
    /// Timer compare 1.
    pub const CMP1: OutputEvents = OutputEvents::bit(3);
    /// Timer compare 2.
    pub const CMP2: OutputEvents = OutputEvents::bit(4);
    /// Timer compare 3.
    pub const CMP3: OutputEvents = OutputEvents::bit(5);
    /// Timer compare 4.
    pub const CMP4: OutputEvents = OutputEvents::bit(6);
    /// Master timer period.
    pub const MASTER_PERIOD: OutputEvents = OutputEvents::bit(7);
    /// Master compare 1.
    pub const MASTER_CMP1: OutputEvents = OutputEvents::bit(8);
    /// Master compare 2.
    pub const MASTER_CMP2: OutputEvents = OutputEvents::bit(9);
    /// Master compare 3.
    pub const MASTER_CMP3: OutputEvents = OutputEvents::bit(10);
    /// Master compare 4.
    pub const MASTER_CMP4: OutputEvents = OutputEvents::bit(11);
    /// Register update.
    pub const UPDATE: OutputEvents = OutputEvents::bit(31);

    /// Timer event 1 to 9, compare events of the other timing units.
    ///
    /// The mapping of timer events to other timers' compares is per timer,
    /// RM0364 table 75.
    pub const fn timer_event(n: u8) -> Option<OutputEvents> {
        match n {
            1..=9 => Some(OutputEvents::bit(11 + n as u32)),
            _ => None,
        }
    }

    /// External event 1 to 10.
    pub const fn external(n: u8) -> Option<OutputEvents> {
        match n {
            1..=10 => Some(OutputEvents::bit(20 + n as u32)),
            _ => None,
        }
    }
}

/// Counter reset events of a timing unit.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::hrtim::ResetEvents;
///
/// // timer B follows the master period
/// assert_eq!(ResetEvents::MASTER_PERIOD.raw(), 1 << 4);
/// assert_eq!(ResetEvents::external(10).map(|e| e.raw()), Some(1 << 18));
/// assert_eq!(ResetEvents::other_timer_cmp(3, 4).map(|e| e.raw()), Some(1 << 30));
/// ```
impl ResetEvents {
    /// Timer update.
    pub const UPDATE: ResetEvents = ResetEvents::bit(1);
    /// Timer compare 2.
    pub const CMP2: ResetEvents = ResetEvents::bit(2);
    /// Timer compare 4.
    pub const CMP4: ResetEvents = ResetEvents::bit(3);
    /// Master timer period.
    pub const MASTER_PERIOD: ResetEvents = ResetEvents::bit(4);
    /// Master compare 1.
    pub const MASTER_CMP1: ResetEvents = ResetEvents::bit(5);
    /// Master compare 2.
    pub const MASTER_CMP2: ResetEvents = ResetEvents::bit(6);
    /// Master compare 3.
    pub const MASTER_CMP3: ResetEvents = ResetEvents::bit(7);
    /// Master compare 4.
    pub const MASTER_CMP4: ResetEvents = ResetEvents::bit(8);

    /// External event 1 to 10.
    pub const fn external(n: u8) -> Option<ResetEvents> {
        match n {
            1..=10 => Some(ResetEvents::bit(8 + n as u32)),
            _ => None,
        }
    }

    /// Compare 1, 2 or 4 of another timer.
    ///
    /// `slot` is the index (0 to 3) of the other timer in A to E order,
    /// skipping the timer being reset.
    pub const fn other_timer_cmp(slot: u8, cmp: u8) -> Option<ResetEvents> {
        let unit: u32 = match cmp {
            1 => 0,
            2 => 1,
            4 => 2,
            _ => return None,
        };
        if slot > 3 {
            None
        } else {
            Some(ResetEvents::bit(19 + 3 * slot as u32 + unit))
        }
    }
}

/// Events of another timing unit that can trigger a capture.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerCaptureEvent {
    /// Output 1 set.
    Output1Set = 0,
    /// Output 1 reset.
    Output1Reset = 1,
    /// Compare 1.
    Cmp1 = 2,
    /// Compare 2.
    Cmp2 = 3,
}

/// Capture triggers.
///
/// # Example
///
/// Capture the zero-cross comparator on external event 2.
///
/// ```
/// use stm32f3xx_hal::hrtim::{CaptureTriggers, TimerCaptureEvent, TimerId};
///
/// assert_eq!(CaptureTriggers::external(2).map(|c| c.raw()), Some(1 << 3));
/// assert_eq!(
///     CaptureTriggers::timer(TimerId::B, TimerCaptureEvent::Cmp1).raw(),
///     1 << 18
/// );
/// ```
impl CaptureTriggers {
    /// Software capture.
    pub const SOFTWARE: CaptureTriggers = CaptureTriggers::bit(0);
    /// Timer update.
    pub const UPDATE: CaptureTriggers = CaptureTriggers::bit(1);

    /// External event 1 to 10.
    pub const fn external(n: u8) -> Option<CaptureTriggers> {
        match n {
            1..=10 => Some(CaptureTriggers::bit(1 + n as u32)),
            _ => None,
        }
    }

    /// Event of another timing unit.
    ///
    /// The bits of the timer's own events are reserved.
    pub const fn timer(timer: TimerId, ev: TimerCaptureEvent) -> CaptureTriggers {
        CaptureTriggers::bit(12 + 4 * (timer as u32) + ev as u32)
    }
}

/// ADC trigger 1 and 3 sources.
impl AdcTrigger13 {
    /// Master compare 1.
    pub const MASTER_CMP1: AdcTrigger13 = AdcTrigger13::bit(0);
    /// Master compare 2.
    pub const MASTER_CMP2: AdcTrigger13 = AdcTrigger13::bit(1);
    /// Master compare 3.
    pub const MASTER_CMP3: AdcTrigger13 = AdcTrigger13::bit(2);
    /// Master compare 4.
    pub const MASTER_CMP4: AdcTrigger13 = AdcTrigger13::bit(3);
    /// Master period.
    pub const MASTER_PERIOD: AdcTrigger13 = AdcTrigger13::bit(4);
    /// Timer A compare 2.
    pub const TA_CMP2: AdcTrigger13 = AdcTrigger13::bit(10);
    /// Timer A compare 3.
    pub const TA_CMP3: AdcTrigger13 = AdcTrigger13::bit(11);
    /// Timer A compare 4.
    pub const TA_CMP4: AdcTrigger13 = AdcTrigger13::bit(12);
    /// Timer A period.
    pub const TA_PERIOD: AdcTrigger13 = AdcTrigger13::bit(13);
    /// Timer A reset.
    pub const TA_RESET: AdcTrigger13 = AdcTrigger13::bit(14);
    /// Timer B compare 2.
    pub const TB_CMP2: AdcTrigger13 = AdcTrigger13::bit(15);
    /// Timer B compare 3.
    pub const TB_CMP3: AdcTrigger13 = AdcTrigger13::bit(16);
    /// Timer B compare 4.
    pub const TB_CMP4: AdcTrigger13 = AdcTrigger13::bit(17);
    /// Timer B period.
    pub const TB_PERIOD: AdcTrigger13 = AdcTrigger13::bit(18);
    /// Timer B reset.
    pub const TB_RESET: AdcTrigger13 = AdcTrigger13::bit(19);
    /// Timer C compare 2.
    pub const TC_CMP2: AdcTrigger13 = AdcTrigger13::bit(20);
    /// Timer C compare 3.
    pub const TC_CMP3: AdcTrigger13 = AdcTrigger13::bit(21);
    /// Timer C compare 4.
    pub const TC_CMP4: AdcTrigger13 = AdcTrigger13::bit(22);
    /// Timer C period.
    pub const TC_PERIOD: AdcTrigger13 = AdcTrigger13::bit(23);
    /// Timer D compare 2.
    pub const TD_CMP2: AdcTrigger13 = AdcTrigger13::bit(24);
    /// Timer D compare 3.
    pub const TD_CMP3: AdcTrigger13 = AdcTrigger13::bit(25);
    /// Timer D compare 4.
    pub const TD_CMP4: AdcTrigger13 = AdcTrigger13::bit(26);
    /// Timer D period.
    pub const TD_PERIOD: AdcTrigger13 = AdcTrigger13::bit(27);
    /// Timer E compare 2.
    pub const TE_CMP2: AdcTrigger13 = AdcTrigger13::bit(28);
    /// Timer E compare 3.
    pub const TE_CMP3: AdcTrigger13 = AdcTrigger13::bit(29);
    /// Timer E compare 4.
    pub const TE_CMP4: AdcTrigger13 = AdcTrigger13::bit(30);
    /// Timer E period.
    pub const TE_PERIOD: AdcTrigger13 = AdcTrigger13::bit(31);

    /// External event 1 to 5.
    pub const fn external(n: u8) -> Option<AdcTrigger13> {
        match n {
            1..=5 => Some(AdcTrigger13::bit(4 + n as u32)),
            _ => None,
        }
    }
}

/// ADC trigger 2 and 4 sources.
impl AdcTrigger24 {
    /// Master compare 1.
    pub const MASTER_CMP1: AdcTrigger24 = AdcTrigger24::bit(0);
    /// Master compare 2.
    pub const MASTER_CMP2: AdcTrigger24 = AdcTrigger24::bit(1);
    /// Master compare 3.
    pub const MASTER_CMP3: AdcTrigger24 = AdcTrigger24::bit(2);
    /// Master compare 4.
    pub const MASTER_CMP4: AdcTrigger24 = AdcTrigger24::bit(3);
    /// Master period.
    pub const MASTER_PERIOD: AdcTrigger24 = AdcTrigger24::bit(4);
    /// Timer A compare 2.
    pub const TA_CMP2: AdcTrigger24 = AdcTrigger24::bit(10);
    /// Timer A compare 3.
    pub const TA_CMP3: AdcTrigger24 = AdcTrigger24::bit(11);
    /// Timer A compare 4.
    pub const TA_CMP4: AdcTrigger24 = AdcTrigger24::bit(12);
    /// Timer A period.
    pub const TA_PERIOD: AdcTrigger24 = AdcTrigger24::bit(13);
    /// Timer B compare 2.
    pub const TB_CMP2: AdcTrigger24 = AdcTrigger24::bit(14);
    /// Timer B compare 3.
    pub const TB_CMP3: AdcTrigger24 = AdcTrigger24::bit(15);
    /// Timer B compare 4.
    pub const TB_CMP4: AdcTrigger24 = AdcTrigger24::bit(16);
    /// Timer B period.
    pub const TB_PERIOD: AdcTrigger24 = AdcTrigger24::bit(17);
    /// Timer C compare 2.
    pub const TC_CMP2: AdcTrigger24 = AdcTrigger24::bit(18);
    /// Timer C compare 3.
    pub const TC_CMP3: AdcTrigger24 = AdcTrigger24::bit(19);
    /// Timer C compare 4.
    pub const TC_CMP4: AdcTrigger24 = AdcTrigger24::bit(20);
    /// Timer C period.
    pub const TC_PERIOD: AdcTrigger24 = AdcTrigger24::bit(21);
    /// Timer C reset.
    pub const TC_RESET: AdcTrigger24 = AdcTrigger24::bit(22);
    /// Timer D compare 2.
    pub const TD_CMP2: AdcTrigger24 = AdcTrigger24::bit(23);
    /// Timer D compare 3.
    pub const TD_CMP3: AdcTrigger24 = AdcTrigger24::bit(24);
    /// Timer D compare 4.
    pub const TD_CMP4: AdcTrigger24 = AdcTrigger24::bit(25);
    /// Timer D period.
    pub const TD_PERIOD: AdcTrigger24 = AdcTrigger24::bit(26);
    /// Timer D reset.
    pub const TD_RESET: AdcTrigger24 = AdcTrigger24::bit(27);
    /// Timer E compare 2.
    pub const TE_CMP2: AdcTrigger24 = AdcTrigger24::bit(28);
    /// Timer E compare 3.
    pub const TE_CMP3: AdcTrigger24 = AdcTrigger24::bit(29);
    /// Timer E compare 4.
    pub const TE_CMP4: AdcTrigger24 = AdcTrigger24::bit(30);
    /// Timer E reset.
    pub const TE_RESET: AdcTrigger24 = AdcTrigger24::bit(31);

    /// External event 6 to 10.
    pub const fn external(n: u8) -> Option<AdcTrigger24> {
        match n {
            6..=10 => Some(AdcTrigger24::bit(n as u32 - 1)),
            _ => None,
        }
    }
}

/// One of the four HRTIM ADC trigger outputs with its sources.
///
/// # Example
///
/// Trigger the ADC injected sequence on timer A compare 3.
///
/// ```
/// use stm32f3xx_hal::hrtim::{AdcTrigger, AdcTrigger24};
///
/// let trg = AdcTrigger::Trg2(AdcTrigger24::TA_CMP3);
/// assert_eq!(trg.number(), 2);
/// assert_eq!(trg.raw(), 1 << 11);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcTrigger {
    /// ADC trigger 1.
    Trg1(AdcTrigger13),
    /// ADC trigger 2.
    Trg2(AdcTrigger24),
    /// ADC trigger 3.
    Trg3(AdcTrigger13),
    /// ADC trigger 4.
    Trg4(AdcTrigger24),
}

impl AdcTrigger {
    /// Trigger number, 1 to 4.
    pub const fn number(&self) -> u8 {
        match self {
            AdcTrigger::Trg1(_) => 1,
            AdcTrigger::Trg2(_) => 2,
            AdcTrigger::Trg3(_) => 3,
            AdcTrigger::Trg4(_) => 4,
        }
    }

    /// Raw source register value.
    pub const fn raw(&self) -> u32 {
        match self {
            AdcTrigger::Trg1(s) | AdcTrigger::Trg3(s) => s.raw(),
            AdcTrigger::Trg2(s) | AdcTrigger::Trg4(s) => s.raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_events() {
        assert_eq!(OutputEvents::external(0), None);
        assert_eq!(OutputEvents::external(11), None);
        assert_eq!(OutputEvents::timer_event(10), None);
        assert_eq!(ResetEvents::external(11), None);
        assert_eq!(ResetEvents::other_timer_cmp(4, 1), None);
        assert_eq!(ResetEvents::other_timer_cmp(0, 3), None);
        assert_eq!(CaptureTriggers::external(0), None);
        assert_eq!(AdcTrigger13::external(6), None);
        assert_eq!(AdcTrigger24::external(5), None);
    }

    #[test]
    fn event_bit_positions() {
        assert_eq!(OutputEvents::timer_event(1).map(|e| e.raw()), Some(1 << 12));
        assert_eq!(OutputEvents::timer_event(9).map(|e| e.raw()), Some(1 << 20));
        assert_eq!(OutputEvents::external(1).map(|e| e.raw()), Some(1 << 21));
        assert_eq!(OutputEvents::external(10).map(|e| e.raw()), Some(1 << 30));
        assert_eq!(ResetEvents::external(1).map(|e| e.raw()), Some(1 << 9));
        assert_eq!(ResetEvents::other_timer_cmp(0, 1).map(|e| e.raw()), Some(1 << 19));
        assert_eq!(CaptureTriggers::external(10).map(|c| c.raw()), Some(1 << 11));
        assert_eq!(
            CaptureTriggers::timer(TimerId::E, TimerCaptureEvent::Cmp2).raw(),
            1 << 31
        );
        assert_eq!(AdcTrigger13::external(1).map(|e| e.raw()), Some(1 << 5));
        assert_eq!(AdcTrigger24::external(6).map(|e| e.raw()), Some(1 << 5));
        assert_eq!(AdcTrigger24::external(10).map(|e| e.raw()), Some(1 << 9));
    }

    #[test]
    fn set_operations() {
        let mut set = OutputEvents::NONE;
        assert!(set.is_empty());
        set |= OutputEvents::PERIOD;
        set |= OutputEvents::MASTER_CMP1;
        assert!(set.contains(OutputEvents::PERIOD | OutputEvents::MASTER_CMP1));
        assert!(!set.contains(OutputEvents::CMP1));
        assert_eq!(u32::from(set), (1 << 2) | (1 << 8));
        assert_eq!(OutputEvents::from(u32::from(set)), set);
    }

    #[test]
    fn adc_trigger_selection() {
        let trg = AdcTrigger::Trg3(AdcTrigger13::TE_PERIOD | AdcTrigger13::MASTER_CMP1);
        assert_eq!(trg.number(), 3);
        assert_eq!(trg.raw(), (1 << 31) | 1);
        assert_eq!(AdcTrigger::Trg4(AdcTrigger24::NONE).raw(), 0);
    }
}
