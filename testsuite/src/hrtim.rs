// On-target HRTIM tests for the STM32F3348-DISCO.
//
// The fault tests route COMP2 to fault 1 internally, no wiring is required.

#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use stm32f3348_disco_bsp::hal::{
    comp::{self, Comp2, Comps, InvInput},
    cortex_m::{self, delay::Delay},
    dac::Dac,
    gpio::{Analog, PortA, pins},
    hrtim::{
        self, Blocks, Compare, Control, Duty, Fault, FaultInputConfig, FaultLevel, FaultPolarity,
        FaultSource, FaultSupervisor, Faults, Hrtim, Irq, Out, Output, OutputEvents,
        OutputState, Outputs, Outr, Parts, Prescaler, SupervisorState, TimCr, TimerA, Timers,
    },
    pac::{self, DWT},
    rcc::{self, PllConfig},
    util::{new_delay, start_cycle_counter},
};

const FREQ: u32 = 72_000_000;
const HRTIM_FREQ: u32 = 2 * FREQ;
const CYC_PER_US: u32 = FREQ / 1000 / 1000;

const OUTPUTS: Outputs = Outputs::TA1.union(Outputs::TA2);

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_US);

/// Fault polarity that makes fault 1 active for the current COMP2 output.
fn active_polarity(comp2: &Comp2) -> FaultPolarity {
    if comp2.output() {
        FaultPolarity::ActiveHigh
    } else {
        FaultPolarity::ActiveLow
    }
}

const fn inactive(pol: FaultPolarity) -> FaultPolarity {
    match pol {
        FaultPolarity::ActiveHigh => FaultPolarity::ActiveLow,
        FaultPolarity::ActiveLow => FaultPolarity::ActiveHigh,
    }
}

fn fault_input(pol: FaultPolarity) -> FaultInputConfig {
    FaultInputConfig::new()
        .set_source(FaultSource::Internal)
        .set_polarity(pol)
        .set_enable(true)
}

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        control: Control,
        tim_a: TimerA,
        comp2: Comp2,
        delay: Delay,
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
        defmt::assert_eq!(rcc::sysclk_hz(&dp.RCC), FREQ);

        start_cycle_counter(&mut cp.DCB, &mut cp.DWT);

        let delay: Delay = new_delay(cp.SYST, &dp.RCC);

        // COMP2 compares PA7 against the DAC at full scale,
        // the output is stable whatever the level of the floating pin
        let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
        let _a7: Analog<pins::A7> = cortex_m::interrupt::free(|cs| Analog::new(gpioa.a7, cs));
        let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
        defmt::assert!(dac.set_mode_chip().is_none());
        dac.enable();
        dac.set_value(0xFFF);

        let comps: Comps = Comps::new(dp.COMP, &mut dp.RCC);
        let mut comp2: Comp2 = comps.comp2;
        unwrap!(comp2.set_csr(
            comp::Csr::RESET
                .set_inv_input(InvInput::Dac1Ch1)
                .set_enable(true)
        ));

        let blocks: Blocks = Blocks {
            common: dp.HRTIM_COMMON,
            master: dp.HRTIM_MASTER,
            tim_a: dp.HRTIM_TIMA,
            tim_b: dp.HRTIM_TIMB,
            tim_c: dp.HRTIM_TIMC,
            tim_d: dp.HRTIM_TIMD,
            tim_e: dp.HRTIM_TIME,
        };
        let hrtim: Hrtim = unwrap!(Hrtim::new(blocks, &mut dp.RCC));
        defmt::assert_eq!(rcc::hrtim_hz(&dp.RCC), HRTIM_FREQ);
        let parts: Parts = hrtim.split();

        TestArgs {
            control: parts.control,
            tim_a: parts.tim_a,
            comp2,
            delay,
        }
    }

    #[test]
    fn dll_ready(ta: &mut TestArgs) {
        defmt::assert!(ta.control.dll_ready());
    }

    #[test]
    fn period_compare(ta: &mut TestArgs) {
        let pre: Prescaler = unwrap!(Prescaler::finest_for(HRTIM_FREQ, 100_000).ok());
        let period: u16 = unwrap!(hrtim::period_ticks(HRTIM_FREQ, 100_000, pre).ok());
        ta.tim_a
            .configure(TimCr::RESET.set_prescaler(pre).set_continuous(true));
        ta.tim_a.set_period(period);
        defmt::assert_eq!(ta.tim_a.period(), period);

        let cmp: u16 = ta.tim_a.set_duty(Compare::Cmp1, Duty::from_percent(25));
        defmt::assert_eq!(ta.tim_a.compare(Compare::Cmp1), cmp);
        defmt::assert_eq!(
            cmp,
            hrtim::compare_for_duty(period, Duty::from_percent(25), pre)
        );
    }

    #[test]
    fn counter_runs(ta: &mut TestArgs) {
        ta.tim_a
            .configure(TimCr::RESET.set_prescaler(Prescaler::Div4).set_continuous(true));
        ta.tim_a.set_period(0xFFDF);
        ta.tim_a.set_repetition(0);
        ta.tim_a.clear_irq(Irq::REPETITION);

        ta.control.start(Timers::A);
        defmt::assert!(ta.control.running().contains(Timers::A));

        let first: u16 = ta.tim_a.counter();
        ta.delay.delay_us(10);
        let second: u16 = ta.tim_a.counter();
        defmt::assert_ne!(first, second);

        // 36 MHz counter, one period is 1.8 ms
        ta.delay.delay_ms(4);
        defmt::assert!(ta.tim_a.status().contains(Irq::REPETITION));

        ta.control.stop(Timers::A);
        defmt::assert!(!ta.control.running().contains(Timers::A));
        let stopped: u16 = ta.tim_a.counter();
        ta.delay.delay_us(10);
        defmt::assert_eq!(stopped, ta.tim_a.counter());
    }

    #[test]
    fn output_enable(ta: &mut TestArgs) {
        ta.tim_a
            .set_output_events(Out::One, OutputEvents::PERIOD, OutputEvents::CMP1);
        ta.tim_a
            .set_output_events(Out::Two, OutputEvents::CMP1, OutputEvents::PERIOD);

        ta.control.enable_outputs(OUTPUTS);
        defmt::assert_eq!(ta.control.enabled_outputs(), OUTPUTS);
        defmt::assert_eq!(ta.control.output_state(Output::Ta1), OutputState::Run);
        defmt::assert_eq!(ta.control.output_state(Output::Tb1), OutputState::Idle);

        ta.control.disable_outputs(OUTPUTS);
        defmt::assert!(ta.control.enabled_outputs().is_empty());
        defmt::assert_eq!(ta.control.output_state(Output::Ta2), OutputState::Idle);
    }

    #[test]
    fn fault_trip_and_rearm(ta: &mut TestArgs) {
        let active: FaultPolarity = active_polarity(&ta.comp2);
        defmt::info!("COMP2 output {}, active polarity {}", ta.comp2.output(), active);

        ta.tim_a.set_output_config(
            Outr::RESET
                .set_fault_level(Out::One, FaultLevel::Inactive)
                .set_fault_level(Out::Two, FaultLevel::Inactive),
        );
        ta.tim_a.enable_faults(Faults::from(Fault::F1), false);

        ta.control
            .configure_fault_input(Fault::F1, fault_input(inactive(active)));
        ta.control.clear_faults(Faults::ALL_INPUTS);
        ta.control.enable_outputs(OUTPUTS);
        defmt::assert!(ta.control.fault_flags().is_empty());
        defmt::assert_eq!(ta.control.output_state(Output::Ta1), OutputState::Run);

        // trip
        ta.control
            .configure_fault_input(Fault::F1, fault_input(active));
        ta.delay.delay_us(1);
        defmt::assert!(ta.control.fault_flags().contains(Fault::F1));
        defmt::assert_eq!(ta.control.output_state(Output::Ta1), OutputState::Fault);
        defmt::assert_eq!(ta.control.output_state(Output::Ta2), OutputState::Fault);

        // the fault is still present
        defmt::assert_eq!(
            ta.control.rearm(Faults::from(Fault::F1), OUTPUTS),
            Err(hrtim::Error::FaultActive(Faults::from(Fault::F1)))
        );
        defmt::assert_eq!(ta.control.output_state(Output::Ta1), OutputState::Fault);

        // fault removed
        ta.control
            .configure_fault_input(Fault::F1, fault_input(inactive(active)));
        unwrap!(ta.control.rearm(Faults::from(Fault::F1), OUTPUTS).ok());
        defmt::assert_eq!(ta.control.output_state(Output::Ta1), OutputState::Run);

        ta.control.disable_outputs(OUTPUTS);
        ta.tim_a.enable_faults(Faults::NONE, false);
    }

    #[test]
    fn supervisor_lockout(ta: &mut TestArgs) {
        let active: FaultPolarity = active_polarity(&ta.comp2);
        let mut supervisor: FaultSupervisor = FaultSupervisor::new(2);
        ta.tim_a.enable_faults(Faults::from(Fault::F1), false);

        for trip in 1..=2_u8 {
            ta.control.clear_faults(Faults::ALL_INPUTS);
            ta.control
                .configure_fault_input(Fault::F1, fault_input(inactive(active)));
            ta.control.enable_outputs(OUTPUTS);

            ta.control
                .configure_fault_input(Fault::F1, fault_input(active));
            ta.delay.delay_us(1);
            let faults: Faults = ta.control.fault_flags().inputs();
            defmt::assert!(faults.contains(Fault::F1));

            let state: SupervisorState = supervisor.on_trip(faults);
            defmt::info!("trip {}: {}", trip, state);
            defmt::assert_eq!(supervisor.trips(), trip);

            ta.control
                .configure_fault_input(Fault::F1, fault_input(inactive(active)));
            match supervisor.rearm(&mut ta.control, OUTPUTS) {
                Ok(()) => {
                    defmt::assert_eq!(trip, 1);
                    defmt::assert_eq!(ta.control.output_state(Output::Ta1), OutputState::Run);
                }
                Err(e) => {
                    defmt::assert_eq!(trip, 2);
                    defmt::assert_eq!(e, hrtim::Error::LockedOut);
                    // the locking trip never re-enables the outputs
                    defmt::assert_ne!(ta.control.output_state(Output::Ta1), OutputState::Run);
                    defmt::assert!(!ta.control.enabled_outputs().contains(Output::Ta1));
                }
            }
        }

        defmt::assert!(matches!(
            supervisor.state(),
            SupervisorState::LockedOut { .. }
        ));
        defmt::assert!(!supervisor.is_armed());
        defmt::assert_eq!(supervisor.try_rearm(false), Err(hrtim::Error::LockedOut));

        ta.control.disable_outputs(OUTPUTS);
        ta.tim_a.enable_faults(Faults::NONE, false);
    }
}
