// HRTIM fault trip and re-arm on the STM32F3348-DISCO.
//
// Timer A drives TA1 (PA8) and TA2 (PA9) at 100 kHz with fault 1 on PA12,
// active low. Pull PA12 to ground to trip the fault: the outputs go to their
// inactive fault level in hardware.
//
// After a trip push the user button to re-arm. The re-arm is refused while
// PA12 is still low, and the outputs lock out after three trips until reset.
//
// * green: outputs running
// * red: tripped
// * orange: locked out

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
            self, Blocks, Compare, Duty, Fault, FaultInputConfig, FaultLevel, FaultPolarity,
            FaultSource, FaultSupervisor, Faults, Hrtim, Out, OutputEvents, Outputs, Outr, Parts,
            Prescaler, SupervisorState, TimCr, Timers, update,
        },
        pac, rcc,
        util::new_delay,
    },
    led::{self, Led, Leds},
    pb::PushButton,
};

const SWITCH_HZ: u32 = 100_000;
const MAX_TRIPS: u8 = 3;
const OUTPUTS: Outputs = Outputs::TA1.union(Outputs::TA2);

const FLT1: FaultInputConfig = FaultInputConfig::new()
    .set_source(FaultSource::Pin)
    .set_polarity(FaultPolarity::ActiveLow)
    .set_filter(0b0011)
    .set_enable(true);

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

    let (button, mut leds, _ta1, _ta2, _flt1): (
        PushButton,
        Leds,
        Alternate<pins::A8>,
        Alternate<pins::A9>,
        Alternate<pins::A12>,
    ) = cortex_m::interrupt::free(|cs| {
        (
            PushButton::new(gpioa.a0, cs),
            Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs),
            Alternate::hrtim_cha1(gpioa.a8, cs),
            Alternate::hrtim_cha2(gpioa.a9, cs),
            Alternate::hrtim_flt1(gpioa.a12, cs),
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

    parts.control.set_fault_sampling(0b01);
    parts.control.configure_fault_input(Fault::F1, FLT1);

    let tim: &mut hrtim::TimerA = &mut parts.tim_a;
    tim.configure(
        TimCr::RESET
            .set_prescaler(pre)
            .set_continuous(true)
            .set_preload(true)
            .set_update_sources(update::REPETITION),
    );
    tim.set_period(period);
    tim.set_output_config(
        Outr::RESET
            .set_fault_level(Out::One, FaultLevel::Inactive)
            .set_fault_level(Out::Two, FaultLevel::Inactive),
    );
    tim.set_output_events(Out::One, OutputEvents::PERIOD, OutputEvents::CMP1);
    tim.set_output_events(Out::Two, OutputEvents::CMP2, OutputEvents::PERIOD);
    tim.set_duty(Compare::Cmp1, Duty::from_percent(25));
    tim.set_duty(Compare::Cmp2, Duty::from_percent(75));
    tim.enable_faults(Faults::from(Fault::F1), false);

    parts.control.clear_faults(Faults::ALL_INPUTS);
    parts.control.software_update(Timers::A);
    parts.control.enable_outputs(OUTPUTS);
    parts.control.start(Timers::A);
    leds.green.set_on();

    let mut supervisor: FaultSupervisor = FaultSupervisor::new(MAX_TRIPS);
    let mut was_pushed: bool = false;

    loop {
        let faults: Faults = parts.control.fault_flags();
        if !faults.is_empty() && supervisor.is_armed() {
            let state: SupervisorState = supervisor.on_trip(faults);
            defmt::warn!("tripped: {}", state);
            leds.green.set_off();
            leds.red.set_on();
        }

        let pushed: bool = button.is_pushed();
        if pushed && !was_pushed {
            match supervisor.state() {
                SupervisorState::Armed => (),
                SupervisorState::LockedOut { .. } => defmt::warn!("locked out, reset the board"),
                SupervisorState::Tripped { .. } => {
                    match supervisor.rearm(&mut parts.control, OUTPUTS) {
                        Ok(()) => {
                            defmt::info!("re-armed after {} trips", supervisor.trips());
                            leds.red.set_off();
                            leds.green.set_on();
                        }
                        Err(hrtim::Error::LockedOut) => {
                            defmt::error!("locked out after {} trips", supervisor.trips());
                            leds.red.set_off();
                            leds.orange.set_on();
                        }
                        Err(e) => defmt::warn!("re-arm refused: {}", e),
                    }
                }
            }
        }
        was_pushed = pushed;

        delay.delay_ms(20_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("hrtim-fault failed: {}", e);
    led::error_halt()
}
