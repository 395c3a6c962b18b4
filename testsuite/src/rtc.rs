// On-target RTC tests for the STM32F3348-DISCO.
//
// The board has no 32.768 kHz crystal, the LSI and HSE / 32 are tested.

#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use stm32f3348_disco_bsp::hal::{
    chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike},
    cortex_m,
    pac::{self, DWT},
    pwr,
    rcc::{self, PllConfig, pulse_reset_backup_domain},
    rtc::{self, Alarm, Rtc},
    util::start_cycle_counter,
};

const FREQ: u32 = 72_000_000;
const CYC_PER_MILLI: u32 = FREQ / 1000;
const CYC_PER_MICRO: u32 = FREQ / 1000 / 1000;

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_MICRO);

fn spin_cycles(cycles: u32) {
    let start: u32 = DWT::cycle_count();
    while DWT::cycle_count().wrapping_sub(start) < cycles {}
}

fn set_dt() -> NaiveDateTime {
    unwrap!(
        NaiveDate::from_ymd_opt(2024, 2, 29).and_then(|date| date.and_hms_opt(23, 59, 58))
    )
}

fn test_set_date_time_with_clk(clk: rtc::Clk) {
    let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
    let mut rtc: Rtc = Rtc::new(dp.RTC, clk, &mut dp.PWR, &mut dp.RCC);

    let rtc_src_freq: u32 = Rtc::hz(&dp.RCC);
    defmt::assert_eq!(rtc_src_freq, clk.hz());
    defmt::assert_eq!(Rtc::clk(&dp.RCC), Some(clk));

    let four_rtc_clk_cycles: u32 = (FREQ / rtc_src_freq) * 4;
    defmt::trace!("four_rtc_clk_cycles={}", four_rtc_clk_cycles);

    let set_dt: NaiveDateTime = set_dt();
    unwrap!(rtc.set_date_time(set_dt));
    defmt::assert!(rtc.calendar_initialized().is_some());

    // wait 4 RTC clock cycles for the datetime to apply
    spin_cycles(four_rtc_clk_cycles);

    let rtc_time: NaiveTime = unwrap!(rtc.time());
    defmt::assert_eq!(rtc_time.hour(), set_dt.hour());
    defmt::assert_eq!(rtc_time.minute(), set_dt.minute());
    defmt::assert_eq!(rtc_time.second(), set_dt.second());

    let rtc_date: NaiveDate = unwrap!(rtc.date());
    defmt::assert_eq!(rtc_date.year(), set_dt.year());
    defmt::assert_eq!(rtc_date.month(), set_dt.month());
    defmt::assert_eq!(rtc_date.day(), set_dt.day());

    spin_cycles(CYC_PER_MILLI * 10);

    let rtc_date_time: NaiveDateTime = unwrap!(rtc.date_time());
    let before: i64 = set_dt.and_utc().timestamp_millis();
    let after: i64 = rtc_date_time.and_utc().timestamp_millis();
    defmt::debug!(
        "Timestamp before {} after {} delta {}",
        before,
        after,
        after - before
    );
    defmt::assert!(after > before);
    defmt::assert!(after - before < 1_000);
}

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        rcc: pac::RCC,
        pwr: pac::PWR,
    }

    #[init]
    fn init() -> TestArgs {
        let mut dp: pac::Peripherals = unwrap!(pac::Peripherals::take());
        let mut cp: pac::CorePeripherals = unwrap!(pac::CorePeripherals::take());

        cortex_m::interrupt::free(|cs| unsafe {
            rcc::set_sysclk_pll(
                &mut dp.FLASH,
                &mut dp.RCC,
                &PllConfig::HSE_BYPASS_72MHZ,
                cs,
            )
        });
        start_cycle_counter(&mut cp.DCB, &mut cp.DWT);
        defmt::assert_eq!(rcc::sysclk_hz(&dp.RCC), FREQ);

        TestArgs {
            rcc: dp.RCC,
            pwr: dp.PWR,
        }
    }

    #[test]
    fn set_date_time_lsi(ta: &mut TestArgs) {
        unsafe { pulse_reset_backup_domain(&mut ta.rcc, &mut ta.pwr) };
        rcc::enable_lsi(&mut ta.rcc);
        test_set_date_time_with_clk(rtc::Clk::Lsi)
    }

    #[test]
    fn set_date_time_hse(ta: &mut TestArgs) {
        // HSE is already running as the PLL source
        unsafe { pulse_reset_backup_domain(&mut ta.rcc, &mut ta.pwr) };
        test_set_date_time_with_clk(rtc::Clk::Hse)
    }

    #[test]
    fn write_protected(ta: &mut TestArgs) {
        let dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
        let mut rtc: Rtc = Rtc::new(dp.RTC, rtc::Clk::Hse, &mut ta.pwr, &mut ta.rcc);

        pwr::disable_backup_access(&mut ta.pwr);
        defmt::assert_eq!(
            rtc.set_date_time(set_dt()),
            Err(rtc::Error::WriteProtected)
        );
        pwr::enable_backup_access(&mut ta.pwr);

        let y2100: NaiveDateTime = unwrap!(
            NaiveDate::from_ymd_opt(2100, 1, 1).and_then(|date| date.and_hms_opt(0, 0, 0))
        );
        defmt::assert_eq!(rtc.set_date_time(y2100), Err(rtc::Error::Year(2100)));
    }

    #[test]
    fn backup_registers(_ta: &mut TestArgs) {
        let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
        let mut rtc: Rtc = Rtc::new(dp.RTC, rtc::Clk::Hse, &mut dp.PWR, &mut dp.RCC);

        (0..rtc::NUM_BKP).for_each(|idx| rtc.set_backup(idx, 0xA5A5_0000 | idx as u32));
        (0..rtc::NUM_BKP)
            .for_each(|idx| defmt::assert_eq!(rtc.backup(idx), 0xA5A5_0000 | idx as u32));
    }

    #[test]
    fn alarm_a(ta: &mut TestArgs) {
        unsafe { pulse_reset_backup_domain(&mut ta.rcc, &mut ta.pwr) };
        let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
        let mut rtc: Rtc = Rtc::new(dp.RTC, rtc::Clk::Hse, &mut dp.PWR, &mut dp.RCC);

        unwrap!(rtc.set_date_time(set_dt()));

        const ALARM: Alarm = Alarm::DEFAULT
            .set_seconds(0)
            .set_minutes_mask(true)
            .set_hours_mask(true)
            .set_days_mask(true);

        rtc.set_alarm_a(&ALARM);
        rtc.set_alarm_a_en(true, false);
        defmt::assert!(rtc.is_alarm_a_en());
        defmt::assert_eq!(rtc.alarm_a(), ALARM);

        Rtc::clear_status(rtc::stat::ALRA);
        defmt::assert_eq!(Rtc::status() & rtc::stat::ALRA, 0);

        // the calendar rolls over to 2024-03-01 00:00:00 after 2 seconds
        let start: u32 = DWT::cycle_count();
        while Rtc::status() & rtc::stat::ALRA == 0 {
            let elapsed: u32 = DWT::cycle_count().wrapping_sub(start);
            defmt::assert!(elapsed < CYC_PER_MILLI * 3_000, "alarm did not fire");
        }
        let elapsed: u32 = DWT::cycle_count().wrapping_sub(start);
        defmt::info!("alarm after {} ms", elapsed / CYC_PER_MILLI);
        defmt::assert!(elapsed > CYC_PER_MILLI * 1_000);

        let now: NaiveDateTime = unwrap!(rtc.date_time());
        defmt::assert_eq!(now.month(), 3);
        defmt::assert_eq!(now.day(), 1);
        defmt::assert_eq!(now.second(), 0);

        Rtc::clear_status(rtc::stat::ALRA);
        rtc.set_alarm_a_en(false, false);
        defmt::assert!(!rtc.is_alarm_a_en());
    }

    #[test]
    fn wakeup_timer(_ta: &mut TestArgs) {
        let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
        let mut rtc: Rtc = Rtc::new(dp.RTC, rtc::Clk::Hse, &mut dp.PWR, &mut dp.RCC);

        rtc.setup_wakeup_timer(1, false);
        defmt::assert!(rtc.is_wakeup_timer_en());
        defmt::assert_eq!(rtc.wakeup_period_sec(), 1);
        Rtc::clear_status(rtc::stat::WUT);

        let start: u32 = DWT::cycle_count();
        while Rtc::status() & rtc::stat::WUT == 0 {
            let elapsed: u32 = DWT::cycle_count().wrapping_sub(start);
            defmt::assert!(elapsed < CYC_PER_MILLI * 1_500, "wakeup timer did not fire");
        }
        let elapsed: u32 = DWT::cycle_count().wrapping_sub(start);
        defmt::info!("wakeup after {} ms", elapsed / CYC_PER_MILLI);

        rtc.disable_wakeup_timer();
        Rtc::clear_status(rtc::stat::WUT);
        defmt::assert!(!rtc.is_wakeup_timer_en());

        rtc.setup_wakeup_timer(rtc::MAX_WAKEUP_SEC + 1, false);
        defmt::assert_eq!(rtc.wakeup_period_sec(), rtc::MAX_WAKEUP_SEC);
        rtc.disable_wakeup_timer();
    }
}
