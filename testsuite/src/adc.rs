// On-target ADC tests for the STM32F3348-DISCO.
//
// Only internal channels are sampled, no wiring is required.

#![no_std]
#![no_main]

use core::sync::atomic::{Ordering::SeqCst, compiler_fence};
use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use stm32f3348_disco_bsp::hal::{
    adc::{self, Adc, Ch, Edge, InjTrigger},
    cortex_m::{self, delay::Delay},
    hrtim::{
        AdcTrigger, AdcTrigger24, AdcUpdateSource, Blocks, Compare, Control, Hrtim, Parts,
        Prescaler, TimCr, TimerA, TimerId, Timers,
    },
    pac::{self, DWT},
    rcc::{self, PllConfig},
    util::{new_delay, start_cycle_counter},
};

const FREQ: u32 = 72_000_000;
const CYC_PER_US: u32 = FREQ / 1000 / 1000;

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_US);

// VDDA on the STM32F3348-DISCO is 3.3 V from the ST-LINK
const VDDA_MIN: u32 = 3_000;
const VDDA_MAX: u32 = 3_600;

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        adc: Adc,
        delay: Delay,
        control: Control,
        tim_a: TimerA,
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

        let delay: Delay = new_delay(cp.SYST, &dp.RCC);

        let adc: Adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);

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
        let parts: Parts = hrtim.split();

        start_cycle_counter(&mut cp.DCB, &mut cp.DWT);

        TestArgs {
            adc,
            delay,
            control: parts.control,
            tim_a: parts.tim_a,
        }
    }

    #[test]
    fn calibrate(ta: &mut TestArgs) {
        defmt::assert!(ta.adc.is_disabled());

        let start: u32 = DWT::cycle_count();
        ta.adc.calibrate(&mut ta.delay);
        let end: u32 = DWT::cycle_count();
        compiler_fence(SeqCst);
        let elapsed: u32 = end.wrapping_sub(start);

        defmt::info!(
            "calibration took {} cycles, CALFACT={}",
            elapsed,
            ta.adc.calfact()
        );
        defmt::assert!(ta.adc.is_disabled());
    }

    #[test]
    fn enable(ta: &mut TestArgs) {
        defmt::assert!(!ta.adc.is_enabled());

        let start: u32 = DWT::cycle_count();
        ta.adc.enable();
        let end: u32 = DWT::cycle_count();
        compiler_fence(SeqCst);
        let elapsed: u32 = end.wrapping_sub(start);
        defmt::info!("enable took {} cycles", elapsed);
        defmt::assert!(ta.adc.is_enabled());

        // enable when already enabled
        defmt::assert!(!ta.adc.start_enable());

        ta.adc.disable();
        defmt::assert!(ta.adc.is_disabled());
        ta.adc.enable();
        ta.adc.set_max_sample_time();
    }

    #[test]
    fn vdda(ta: &mut TestArgs) {
        ta.adc.enable_vref();
        // VREFINT startup time
        ta.delay.delay_us(10);

        let vdda: u32 = unwrap!(ta.adc.vdda());
        defmt::info!("VDDA={} mV", vdda);
        defmt::assert!((VDDA_MIN..=VDDA_MAX).contains(&vdda));
    }

    #[test]
    fn temperature(ta: &mut TestArgs) {
        ta.adc.enable_tsen();
        ta.delay.delay_us(10);

        let vdda: u32 = unwrap!(ta.adc.vdda());
        let celsius: i16 = unwrap!(ta.adc.temperature(vdda));
        defmt::info!("temperature {} C", celsius);
        defmt::assert!((5..=60).contains(&celsius));
    }

    #[test]
    fn injected_software(ta: &mut TestArgs) {
        let regular: u16 = ta.adc.vref();

        unwrap!(ta.adc.set_injected(&[Ch::Vref, Ch::Vts], InjTrigger::Software));
        ta.adc.start_injected();
        while !ta.adc.injected_complete() {}

        let injected: u16 = ta.adc.injected_data(0);
        let delta: i32 = (i32::from(injected) - i32::from(regular)).abs();
        defmt::info!("VREF regular={} injected={} delta={}", regular, injected, delta);
        defmt::assert!(delta < 20);
        defmt::assert_ne!(ta.adc.injected_data(1), 0);
    }

    #[test]
    fn injected_len(ta: &mut TestArgs) {
        defmt::assert_eq!(
            ta.adc.set_injected(&[], InjTrigger::Software),
            Err(adc::Error::InjectedLen { len: 0, max: 4 })
        );
        defmt::assert_eq!(
            ta.adc.set_injected(&[Ch::Vref; 5], InjTrigger::Software),
            Err(adc::Error::InjectedLen { len: 5, max: 4 })
        );
    }

    #[test]
    fn injected_hrtim_trigger(ta: &mut TestArgs) {
        ta.tim_a.configure(
            TimCr::RESET
                .set_prescaler(Prescaler::Div4)
                .set_continuous(true),
        );
        // 10 kHz at 36 MHz
        ta.tim_a.set_period(3_600);
        ta.tim_a.set_compare(Compare::Cmp2, 1_800);
        ta.control
            .set_adc_trigger(AdcTrigger::Trg2(AdcTrigger24::TA_CMP2));
        ta.control
            .set_adc_update_source(2, AdcUpdateSource::Timer(TimerId::A));

        unwrap!(ta.adc.set_injected(
            &[Ch::Vref],
            InjTrigger::HrtimTrg2(Edge::Rising)
        ));
        ta.adc.start_injected();

        // the timer is stopped, no conversion
        ta.delay.delay_us(500);
        defmt::assert!(!ta.adc.injected_complete());

        ta.control.start(Timers::A);
        let mut conversions: u32 = 0;
        let start: u32 = DWT::cycle_count();
        // 10 periods
        while DWT::cycle_count().wrapping_sub(start) < 1_000 * CYC_PER_US {
            if ta.adc.injected_complete() {
                conversions += 1;
            }
        }
        ta.control.stop(Timers::A);
        ta.adc.stop_injected();

        defmt::info!("{} HRTIM triggered conversions", conversions);
        defmt::assert!((9..=11).contains(&conversions));
    }
}
