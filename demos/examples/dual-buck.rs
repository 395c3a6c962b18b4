// Two interleaved buck legs on timer A of the STM32F3348-DISCO.
//
// TA1 (PA8) and TA2 (PA9) drive two independent buck converters at 100 kHz,
// the second leg is phase shifted by half a period.
// The user button steps the duty cycle of both legs by 10 %.
//
// Probe PA8 and PA9, the power stage of the board is not used.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        cortex_m::{self, delay::Delay},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{Alternate, PortA, PortB, pins},
        hrtim::{
            self, Blocks, Compare, Duty, FaultLevel, Hrtim, Out, OutputEvents, Outputs, Outr, Parts,
            Prescaler, TimCr, Timers, update,
        },
        pac, rcc,
        util::new_delay,
    },
    led::{self, Led},
    pb::PushButton,
};

const SWITCH_HZ: u32 = 100_000;
const STEP: u16 = 100;

const OUTR: Outr = Outr::RESET
    .set_fault_level(Out::One, FaultLevel::Inactive)
    .set_fault_level(Out::Two, FaultLevel::Inactive);

/// Program the phase shifted pulse of the second leg.
///
/// TA2 is set on CMP2 at half period, and reset on CMP3 after the on-time.
fn set_duty(tim: &mut hrtim::TimerA, period: u16, pre: Prescaler, duty: Duty) {
    tim.set_duty(Compare::Cmp1, duty);
    let half: u16 = period / 2;
    let on: u16 = hrtim::compare_for_duty(period, duty, pre);
    tim.set_compare(Compare::Cmp2, half);
    tim.set_compare(
        Compare::Cmp3,
        (u32::from(half) + u32::from(on)).min(u32::from(period)) as u16,
    );
}

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    cortex_m::interrupt::free(|cs| unsafe {
        rcc::set_sysclk_pll(
            &mut dp.FLASH,
            &mut dp.RCC,
            &rcc::PllConfig::HSE_BYPASS_72MHZ,
            cs,
        )
    });
    let hrtim_hz: u32 = rcc::hrtim_hz(&dp.RCC);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let (button, mut blue, _ta1, _ta2): (
        PushButton,
        led::Blue,
        Alternate<pins::A8>,
        Alternate<pins::A9>,
    ) = cortex_m::interrupt::free(|cs| {
        (
            PushButton::new(gpioa.a0, cs),
            led::Blue::new(gpiob.b7, cs),
            Alternate::hrtim_cha1(gpioa.a8, cs),
            Alternate::hrtim_cha2(gpioa.a9, cs),
        )
    });

    let blocks: Blocks = Blocks {
        common: dp.HRTIM_COMMON,
        master: dp.HRTIM_MASTER,
        tim_a: dp.HRTIM_TIMA,
        tim_b: dp.HRTIM_TIMB,
        tim_c: dp.HRTIM_TIMC,
        tim_d: dp.HRTIM_TIMD,
        tim_e: dp.HRTIM_TIME,
    };
    let mut parts: Parts = match Hrtim::new(blocks, &mut dp.RCC) {
        Ok(hrtim) => hrtim.split(),
        Err(e) => error_handler(e),
    };

    let pre: Prescaler = match Prescaler::finest_for(hrtim_hz, SWITCH_HZ) {
        Ok(pre) => pre,
        Err(e) => error_handler(e),
    };
    let period: u16 = match hrtim::period_ticks(hrtim_hz, SWITCH_HZ, pre) {
        Ok(period) => period,
        Err(e) => error_handler(e),
    };
    defmt::info!("prescaler={} period={}", pre, period);

    let tim: &mut hrtim::TimerA = &mut parts.tim_a;
    tim.configure(
        TimCr::RESET
            .set_prescaler(pre)
            .set_continuous(true)
            .set_preload(true)
            .set_update_sources(update::REPETITION),
    );
    tim.set_period(period);
    tim.set_output_config(OUTR);
    tim.set_output_events(Out::One, OutputEvents::PERIOD, OutputEvents::CMP1);
    tim.set_output_events(Out::Two, OutputEvents::CMP2, OutputEvents::CMP3);

    let mut duty: Duty = Duty::from_percent(10);
    set_duty(tim, period, pre, duty);

    parts.control.software_update(Timers::A);
    parts.control.enable_outputs(Outputs::TA1 | Outputs::TA2);
    parts.control.start(Timers::A);
    blue.set_on();

    let mut was_pushed: bool = false;
    loop {
        let pushed: bool = button.is_pushed();
        if pushed && !was_pushed {
            duty = if duty.permille() >= 900 {
                Duty::from_percent(10)
            } else {
                duty.saturating_add(STEP)
            };
            set_duty(&mut parts.tim_a, period, pre, duty);
            defmt::info!("duty={}", duty);
        }
        was_pushed = pushed;
        delay.delay_ms(20_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("dual-buck failed: {}", e);
    led::error_halt()
}
