// Synchronous buck rectification on timer D of the STM32F3348-DISCO.
//
// TD1 (PB14) drives the high side switch at 200 kHz, TD2 (PB15) is the
// complementary synchronous rectifier with dead-time on both edges.
// ADC trigger 2 fires on TD compare 2, in the middle of the on-time.
//
// Push the user button to toggle the synchronous rectifier off (light load,
// the body diode conducts) and on again. The blue LED is on while the
// rectifier runs.

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
            self, AdcTrigger, AdcTrigger24, AdcUpdateSource, Blocks, Compare, DeadTime, Duty,
            FaultLevel, Hrtim, Out, OutputEvents, Outputs, Outr, Parts, Prescaler, TimCr, TimerId,
            Timers, update,
        },
        pac, rcc,
        util::new_delay,
    },
    led::{self, Led},
    pb::PushButton,
};

const SWITCH_HZ: u32 = 200_000;
const DEAD_TIME_NS: u32 = 60;
const DUTY: Duty = Duty::from_permille(400);
const OUTPUTS: Outputs = Outputs::TD1.union(Outputs::TD2);

fn timing(hrtim_hz: u32) -> Result<(Prescaler, u16, DeadTime), hrtim::Error> {
    let pre: Prescaler = Prescaler::finest_for(hrtim_hz, SWITCH_HZ)?;
    let period: u16 = hrtim::period_ticks(hrtim_hz, SWITCH_HZ, pre)?;
    let dt: DeadTime = DeadTime::from_ns(hrtim_hz, DEAD_TIME_NS, DEAD_TIME_NS)?;
    Ok((pre, period, dt))
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

    let (button, mut blue, _td1, _td2): (
        PushButton,
        led::Blue,
        Alternate<pins::B14>,
        Alternate<pins::B15>,
    ) = cortex_m::interrupt::free(|cs| {
        (
            PushButton::new(gpioa.a0, cs),
            led::Blue::new(gpiob.b7, cs),
            Alternate::hrtim_chd1(gpiob.b14, cs),
            Alternate::hrtim_chd2(gpiob.b15, cs),
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

    let (pre, period, dt): (Prescaler, u16, DeadTime) = match timing(hrtim_hz) {
        Ok(timing) => timing,
        Err(e) => error_handler(e),
    };
    defmt::info!("prescaler={} period={} dead-time={}", pre, period, dt);

    let tim: &mut hrtim::TimerD = &mut parts.tim_d;
    tim.configure(
        TimCr::RESET
            .set_prescaler(pre)
            .set_continuous(true)
            .set_preload(true)
            .set_update_sources(update::REPETITION),
    );
    tim.set_period(period);
    tim.set_dead_time(dt);
    tim.set_output_config(
        Outr::RESET
            .set_fault_level(Out::One, FaultLevel::Inactive)
            .set_fault_level(Out::Two, FaultLevel::Inactive)
            .set_dead_time_en(true),
    );
    tim.set_output_events(Out::One, OutputEvents::PERIOD, OutputEvents::CMP1);
    let on: u16 = tim.set_duty(Compare::Cmp1, DUTY);
    tim.set_compare(Compare::Cmp2, on / 2);

    parts
        .control
        .set_adc_trigger(AdcTrigger::Trg2(AdcTrigger24::TD_CMP2));
    parts
        .control
        .set_adc_update_source(2, AdcUpdateSource::Timer(TimerId::D));

    parts.control.software_update(Timers::D);
    parts.control.enable_outputs(OUTPUTS);
    parts.control.start(Timers::D);
    blue.set_on();

    let mut rectifying: bool = true;
    let mut was_pushed: bool = false;
    loop {
        let pushed: bool = button.is_pushed();
        if pushed && !was_pushed {
            rectifying = !rectifying;
            if rectifying {
                parts.control.enable_outputs(Outputs::TD2);
            } else {
                parts.control.disable_outputs(Outputs::TD2);
            }
            blue.set(rectifying);
            defmt::info!("synchronous rectifier {}", rectifying);
        }
        was_pushed = pushed;
        delay.delay_ms(20_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("sync-rect failed: {}", e);
    led::error_halt()
}
