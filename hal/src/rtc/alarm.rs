use super::bcd;
use chrono::{Timelike, Weekday};

const SU_MASK: u32 = 0x7F;
const MNU_SHIFT: u32 = 8;
const HU_SHIFT: u32 = 16;
const PM: u32 = 1 << 22;
const DU_SHIFT: u32 = 24;
const WDSEL: u32 = 1 << 30;

const MSK_SECONDS: u32 = 1 << 7;
const MSK_MINUTES: u32 = 1 << 15;
const MSK_HOURS: u32 = 1 << 23;
const MSK_DAYS: u32 = 1 << 31;

const SS_MASK: u32 = 0x7FFF;
const MASKSS_MAX: u8 = 0xF;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Alarm day.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum AlarmDay {
    /// Day of the month.
    Day(u8),
    /// Weekday.
    Weekday(Weekday),
}

impl From<Weekday> for AlarmDay {
    #[inline]
    fn from(wd: Weekday) -> Self {
        Self::Weekday(wd)
    }
}

/// Alarm A or B register values (`RTC_ALRMxR` and `RTC_ALRMxSSR`).
///
/// By default the day, hour, minute, and second are compared, but not the
/// sub-seconds.
///
/// # Example
///
/// Alarm every minute, on second 30:
///
/// ```
/// use stm32f3xx_hal::rtc::Alarm;
///
/// const EVERY_MINUTE: Alarm = Alarm::DEFAULT
///     .set_seconds(30)
///     .set_days_mask(true)
///     .set_hours_mask(true)
///     .set_minutes_mask(true);
/// assert!(EVERY_MINUTE.hours_mask());
/// assert!(!EVERY_MINUTE.seconds_mask());
/// assert_eq!(EVERY_MINUTE.seconds(), 30);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alarm {
    pub(super) val: u32,
    pub(super) ssr: u32,
}

impl From<chrono::NaiveTime> for Alarm {
    fn from(time: chrono::NaiveTime) -> Self {
        Self::DEFAULT
            .set_hours(time.hour() as u8)
            .set_minutes(time.minute() as u8)
            .set_seconds(time.second() as u8)
    }
}

impl TryFrom<Alarm> for chrono::NaiveTime {
    type Error = ();

    fn try_from(alarm: Alarm) -> Result<Self, Self::Error> {
        Self::from_hms_opt(
            alarm.hours().into(),
            alarm.minutes().into(),
            alarm.seconds().into(),
        )
        .ok_or(())
    }
}

impl Default for Alarm {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

const fn set_mask(val: u32, mask: u32, set: bool) -> u32 {
    if set { val | mask } else { val & !mask }
}

impl Alarm {
    /// Default alarm settings, as a constant.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::rtc::Alarm;
    ///
    /// assert_eq!(Alarm::DEFAULT, Alarm::default());
    /// ```
    pub const DEFAULT: Self = Self { val: 0, ssr: 0 };

    /// Create an alarm from raw register values.
    pub const fn from_raw(alrmr: u32, alrmssr: u32) -> Alarm {
        Alarm {
            val: alrmr,
            ssr: alrmssr,
        }
    }

    /// Raw `RTC_ALRMxR` value.
    pub const fn raw(&self) -> u32 {
        self.val
    }

    /// Raw `RTC_ALRMxSSR` value.
    pub const fn raw_ssr(&self) -> u32 {
        self.ssr
    }

    /// Set the seconds, values greater than 59 saturate.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::rtc::Alarm;
    ///
    /// assert_eq!(Alarm::DEFAULT.set_seconds(31).seconds(), 31);
    /// assert_eq!(Alarm::DEFAULT.set_seconds(60).seconds(), 59);
    /// ```
    #[must_use = "set_seconds returns a modified Alarm"]
    pub const fn set_seconds(mut self, seconds: u8) -> Self {
        let su: u32 = bcd::encode(if seconds > 59 { 59 } else { seconds }) as u32;
        self.val = (self.val & !SU_MASK) | su;
        self
    }

    /// Seconds.
    pub const fn seconds(&self) -> u8 {
        bcd::decode((self.val & SU_MASK) as u8)
    }

    /// Set the seconds mask, `true` excludes seconds from the comparison.
    #[must_use = "set_seconds_mask returns a modified Alarm"]
    pub const fn set_seconds_mask(mut self, mask: bool) -> Self {
        self.val = set_mask(self.val, MSK_SECONDS, mask);
        self
    }

    /// Returns `true` if the seconds are not compared.
    pub const fn seconds_mask(&self) -> bool {
        self.val & MSK_SECONDS != 0
    }

    /// Set the minutes, values greater than 59 saturate.
    #[must_use = "set_minutes returns a modified Alarm"]
    pub const fn set_minutes(mut self, minutes: u8) -> Self {
        let mnu: u32 = bcd::encode(if minutes > 59 { 59 } else { minutes }) as u32;
        self.val = (self.val & !(0x7F << MNU_SHIFT)) | (mnu << MNU_SHIFT);
        self
    }

    /// Minutes.
    pub const fn minutes(&self) -> u8 {
        bcd::decode(((self.val >> MNU_SHIFT) & 0x7F) as u8)
    }

    /// Set the minutes mask, `true` excludes minutes from the comparison.
    #[must_use = "set_minutes_mask returns a modified Alarm"]
    pub const fn set_minutes_mask(mut self, mask: bool) -> Self {
        self.val = set_mask(self.val, MSK_MINUTES, mask);
        self
    }

    /// Returns `true` if the minutes are not compared.
    pub const fn minutes_mask(&self) -> bool {
        self.val & MSK_MINUTES != 0
    }

    /// Set the hours in 24 hour format, values greater than 23 saturate.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::rtc::Alarm;
    ///
    /// let alarm: Alarm = Alarm::DEFAULT.set_hours(21);
    /// assert_eq!(alarm.hours(), 21);
    /// assert_eq!(alarm.raw(), 0x21 << 16);
    /// ```
    #[must_use = "set_hours returns a modified Alarm"]
    pub const fn set_hours(mut self, hours: u8) -> Self {
        let hu: u32 = bcd::encode(if hours > 23 { 23 } else { hours }) as u32;
        self.val = (self.val & !((0x3F << HU_SHIFT) | PM)) | (hu << HU_SHIFT);
        self
    }

    /// Hours in 24 hour format.
    pub const fn hours(&self) -> u8 {
        bcd::decode(((self.val >> HU_SHIFT) & 0x3F) as u8)
    }

    /// Set the hours mask, `true` excludes hours from the comparison.
    #[must_use = "set_hours_mask returns a modified Alarm"]
    pub const fn set_hours_mask(mut self, mask: bool) -> Self {
        self.val = set_mask(self.val, MSK_HOURS, mask);
        self
    }

    /// Returns `true` if the hours are not compared.
    pub const fn hours_mask(&self) -> bool {
        self.val & MSK_HOURS != 0
    }

    /// Set the day of the month, values are clamped to 1..=31.
    #[must_use = "set_days returns a modified Alarm"]
    pub const fn set_days(mut self, day: u8) -> Self {
        let day: u8 = match day {
            0 => 1,
            32.. => 31,
            d => d,
        };
        self.val &= !(WDSEL | (0x3F << DU_SHIFT));
        self.val |= (bcd::encode(day) as u32) << DU_SHIFT;
        self
    }

    /// Set the weekday.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::Weekday;
    /// use stm32f3xx_hal::rtc::{Alarm, AlarmDay};
    ///
    /// let alarm: Alarm = Alarm::DEFAULT.set_weekday(Weekday::Sun);
    /// assert_eq!(alarm.day(), AlarmDay::Weekday(Weekday::Sun));
    /// assert_eq!(alarm.set_days(9).day(), AlarmDay::Day(9));
    /// ```
    #[must_use = "set_weekday returns a modified Alarm"]
    pub fn set_weekday(mut self, wd: Weekday) -> Self {
        self.val &= !(0x3F << DU_SHIFT);
        self.val |= WDSEL | (wd.number_from_monday() << DU_SHIFT);
        self
    }

    /// Weekday or day of the month.
    pub fn day(&self) -> AlarmDay {
        if self.val & WDSEL != 0 {
            let wdu: usize = ((self.val >> DU_SHIFT) & 0xF) as usize;
            AlarmDay::Weekday(WEEKDAYS[wdu.clamp(1, 7) - 1])
        } else {
            AlarmDay::Day(bcd::decode(((self.val >> DU_SHIFT) & 0x3F) as u8))
        }
    }

    /// Set the day mask, `true` excludes the day or weekday from the
    /// comparison.
    #[must_use = "set_days_mask returns a modified Alarm"]
    pub const fn set_days_mask(mut self, mask: bool) -> Self {
        self.val = set_mask(self.val, MSK_DAYS, mask);
        self
    }

    /// Returns `true` if the day is not compared.
    pub const fn days_mask(&self) -> bool {
        self.val & MSK_DAYS != 0
    }

    /// Set the sub-seconds value, only the lower 15 bits are used.
    #[must_use = "set_subseconds returns a modified Alarm"]
    pub const fn set_subseconds(mut self, ss: u16) -> Self {
        self.ssr = (self.ssr & !SS_MASK) | (ss as u32 & SS_MASK);
        self
    }

    /// Sub-seconds value.
    pub const fn subseconds(&self) -> u16 {
        (self.ssr & SS_MASK) as u16
    }

    /// Set the number of compared sub-second bits.
    ///
    /// * 0: sub-seconds are not compared, the alarm is set when the seconds
    ///   unit is incremented.
    /// * n in 1..=14: only `SS[n-1:0]` are compared.
    /// * 15: all 15 bits are compared.
    ///
    /// Values greater than 15 saturate.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::rtc::Alarm;
    ///
    /// assert_eq!(Alarm::DEFAULT.set_subseconds_mask(7).subseconds_mask(), 7);
    /// assert_eq!(Alarm::DEFAULT.set_subseconds_mask(63).subseconds_mask(), 15);
    /// ```
    #[must_use = "set_subseconds_mask returns a modified Alarm"]
    pub const fn set_subseconds_mask(mut self, mask: u8) -> Self {
        let mask: u32 = (if mask > MASKSS_MAX { MASKSS_MAX } else { mask }) as u32;
        self.ssr = (self.ssr & SS_MASK) | (mask << 24);
        self
    }

    /// Number of compared sub-second bits.
    pub const fn subseconds_mask(&self) -> u8 {
        ((self.ssr >> 24) & 0xF) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::{Alarm, AlarmDay};
    use chrono::{NaiveTime, Weekday};

    #[test]
    fn chrono_convert() {
        let time: NaiveTime = NaiveTime::from_hms_opt(12, 34, 56).unwrap();
        let alarm: Alarm = time.into();
        assert_eq!(alarm.hours(), 12);
        assert_eq!(alarm.minutes(), 34);
        assert_eq!(alarm.seconds(), 56);
        assert_eq!(NaiveTime::try_from(alarm), Ok(time));
    }

    #[test]
    fn register_layout() {
        let alarm: Alarm = Alarm::DEFAULT
            .set_days(25)
            .set_hours(23)
            .set_minutes(59)
            .set_seconds(58)
            .set_seconds_mask(true);
        assert_eq!(alarm.raw(), 0x2523_59D8);
        assert_eq!(alarm.day(), AlarmDay::Day(25));

        let alarm: Alarm = alarm.set_weekday(Weekday::Wed);
        assert_eq!(alarm.raw() >> 24, 0x43);
    }

    #[test]
    fn subseconds_fields_independent() {
        let alarm: Alarm = Alarm::DEFAULT
            .set_subseconds(0xFFFF)
            .set_subseconds_mask(3);
        assert_eq!(alarm.subseconds(), 0x7FFF);
        assert_eq!(alarm.raw_ssr(), (3 << 24) | 0x7FFF);
    }
}
