// RTC calendar and alarm A on the STM32F3348-DISCO.
//
// The calendar is set at startup. Alarm A fires twice a minute, on second 0
// and on second 30, and toggles the orange LED.
// The date and time are printed every second.
//
// The RTC runs from the LSI, expect a few percent of drift.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        chrono::{NaiveDate, NaiveDateTime},
        cortex_m::{self, delay::Delay},
        embedded_hal::blocking::delay::DelayMs,
        gpio::PortB,
        pac, rcc,
        rtc::{self, Alarm, Rtc},
        util::new_delay,
    },
    led::{self, Led},
};

const EVERY_HALF_MINUTE: Alarm = Alarm::DEFAULT
    .set_seconds(30)
    .set_seconds_mask(false)
    .set_days_mask(true)
    .set_hours_mask(true)
    .set_minutes_mask(true);

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut orange: led::Orange = cortex_m::interrupt::free(|cs| led::Orange::new(gpiob.b8, cs));

    unsafe { rcc::pulse_reset_backup_domain(&mut dp.RCC, &mut dp.PWR) };
    rcc::enable_lsi(&mut dp.RCC);
    let mut rtc: Rtc = Rtc::new(dp.RTC, rtc::Clk::Lsi, &mut dp.PWR, &mut dp.RCC);

    let start: NaiveDateTime = match NaiveDate::from_ymd_opt(2024, 3, 21)
        .and_then(|date| date.and_hms_opt(11, 59, 50))
    {
        Some(dt) => dt,
        None => error_handler("invalid start date"),
    };
    if let Err(e) = rtc.set_date_time(start) {
        error_handler(e)
    }

    // the seconds field alternates between 30 and 0 after each alarm
    let mut alarm: Alarm = EVERY_HALF_MINUTE;
    rtc.set_alarm_a(&alarm);
    rtc.set_alarm_a_en(true, false);

    loop {
        if Rtc::status() & rtc::stat::ALRA != 0 {
            Rtc::clear_status(rtc::stat::ALRA);
            orange.toggle();
            defmt::info!("alarm A on second {}", alarm.seconds());

            alarm = alarm.set_seconds(if alarm.seconds() == 30 { 0 } else { 30 });
            rtc.set_alarm_a(&alarm);
            rtc.set_alarm_a_en(true, false);
        }

        match rtc.date_time() {
            Some(dt) => defmt::info!("{}", defmt::Display2Format(&dt)),
            None => defmt::warn!("calendar not initialized"),
        }

        delay.delay_ms(1000_u16);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("rtc-alarm failed: {}", e);
    led::error_halt()
}
