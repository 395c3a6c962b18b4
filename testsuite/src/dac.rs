// On-target DAC tests for the STM32F3348-DISCO.

#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use stm32f3348_disco_bsp::hal::{
    cortex_m::{self, delay::Delay},
    dac::{self, Dac, ModePin},
    gpio::{Analog, PortA, pins},
    pac::{self, DWT},
    rcc::{self, PllConfig},
    util::{new_delay, start_cycle_counter},
};

const FREQ: u32 = 72_000_000;
const CYC_PER_US: u32 = FREQ / 1000 / 1000;

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_US);

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        dac: Dac,
        a4: Option<Analog<pins::A4>>,
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
        start_cycle_counter(&mut cp.DCB, &mut cp.DWT);

        let delay: Delay = new_delay(cp.SYST, &dp.RCC);
        let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
        let a4: Analog<pins::A4> = cortex_m::interrupt::free(|cs| Analog::new(gpioa.a4, cs));
        let dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);

        TestArgs {
            dac,
            a4: Some(a4),
            delay,
        }
    }

    #[test]
    fn reset_state(ta: &mut TestArgs) {
        defmt::assert!(!ta.dac.is_enabled());
        defmt::assert_eq!(ta.dac.out(), 0);
    }

    #[test]
    fn soft_trigger(ta: &mut TestArgs) {
        ta.dac.set_mode_pin(unwrap!(ta.a4.take()), ModePin::Buf);
        ta.dac.setup_soft_trigger();
        defmt::assert!(ta.dac.is_enabled());

        for val in [0, 1, 0x555, 0xAAA, dac::FULL_SCALE] {
            ta.dac.soft_trigger(val);
            // one APB1 clock cycle
            ta.delay.delay_us(1);
            defmt::assert_eq!(ta.dac.out(), val);
        }

        // data is held until the next trigger
        ta.dac.set_value(123);
        ta.delay.delay_us(1);
        defmt::assert_eq!(ta.dac.out(), dac::FULL_SCALE);

        ta.dac.disable();
        defmt::assert!(!ta.dac.is_enabled());
    }

    #[test]
    fn no_trigger(ta: &mut TestArgs) {
        ta.dac.enable();
        for val in [2048, 17, 4000] {
            ta.dac.set_value(val);
            ta.delay.delay_us(1);
            defmt::assert_eq!(ta.dac.out(), val);
        }

        // only the low 12 bits are used
        ta.dac.set_value(0xF001);
        ta.delay.delay_us(1);
        defmt::assert_eq!(ta.dac.out(), 1);
        ta.dac.disable();
    }

    #[test]
    fn chip_mode(ta: &mut TestArgs) {
        let a4: Option<Analog<pins::A4>> = ta.dac.set_mode_chip();
        defmt::assert!(a4.is_some());
        // no pin to return the second time
        defmt::assert!(ta.dac.set_mode_chip().is_none());
        ta.a4 = a4;

        ta.dac.enable();
        let code: u16 = dac::millivolts_to_code(1_650, 3_300);
        ta.dac.set_value(code);
        ta.delay.delay_us(1);
        defmt::assert_eq!(ta.dac.out(), 2048);
        ta.dac.disable();
    }
}
