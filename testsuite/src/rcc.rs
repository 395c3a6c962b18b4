// On-target clock tests for the STM32F3348-DISCO.
//
// The ST-LINK MCO provides the 8 MHz HSE in bypass mode.

#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use stm32f3348_disco_bsp::hal::{
    cortex_m::{self, peripheral::syst::SystClkSource},
    pac::{self, DWT},
    rcc::{self, PllConfig, PllError, PllSrc},
    util::start_cycle_counter,
};

// WARNING will wrap-around eventually, use this for relative timing only
// the sysclk changes between tests, this is raw cycles
defmt::timestamp!("{=u32}", DWT::cycle_count());

fn assert_clocks(rcc: &pac::RCC, sysclk: u32) {
    defmt::assert_eq!(rcc::sysclk_hz(rcc), sysclk);
    defmt::assert_eq!(rcc::hclk_hz(rcc), sysclk);
    defmt::assert_eq!(rcc::pclk2_hz(rcc), sysclk);
    defmt::assert!(rcc::pclk1_hz(rcc) <= 36_000_000);
    defmt::assert_eq!(
        rcc::cpu_systick_hz(rcc, SystClkSource::Core),
        rcc::hclk_hz(rcc)
    );
    defmt::assert_eq!(
        rcc::cpu_systick_hz(rcc, SystClkSource::External),
        rcc::hclk_hz(rcc) / 8
    );
}

#[defmt_test::tests]
mod tests {
    use super::*;

    struct TestArgs {
        flash: pac::FLASH,
        rcc: pac::RCC,
    }

    #[init]
    fn init() -> TestArgs {
        let dp: pac::Peripherals = unwrap!(pac::Peripherals::take());
        let mut cp: pac::CorePeripherals = unwrap!(pac::CorePeripherals::take());

        start_cycle_counter(&mut cp.DCB, &mut cp.DWT);

        TestArgs {
            flash: dp.FLASH,
            rcc: dp.RCC,
        }
    }

    #[test]
    fn reset_clocks(ta: &mut TestArgs) {
        assert_clocks(&ta.rcc, rcc::HSI_HZ);
        defmt::assert_eq!(rcc::pclk1_hz(&ta.rcc), rcc::HSI_HZ);
        defmt::assert_eq!(rcc::apb1_timer_hz(&ta.rcc), rcc::HSI_HZ);
    }

    #[test]
    fn pll_hse_bypass_72mhz(ta: &mut TestArgs) {
        cortex_m::interrupt::free(|cs| unsafe {
            rcc::set_sysclk_pll(
                &mut ta.flash,
                &mut ta.rcc,
                &PllConfig::HSE_BYPASS_72MHZ,
                cs,
            )
        });
        assert_clocks(&ta.rcc, 72_000_000);
        defmt::assert_eq!(rcc::pclk1_hz(&ta.rcc), 36_000_000);
        defmt::assert_eq!(rcc::apb1_timer_hz(&ta.rcc), 72_000_000);
    }

    #[test]
    fn hrtim_clock(ta: &mut TestArgs) {
        defmt::assert_eq!(rcc::hrtim_hz(&ta.rcc), rcc::pclk2_hz(&ta.rcc));
        rcc::set_hrtim_clk_pll(&mut ta.rcc);
        defmt::assert_eq!(rcc::hrtim_hz(&ta.rcc), 2 * rcc::sysclk_hz(&ta.rcc));
        defmt::assert_eq!(rcc::hrtim_hz(&ta.rcc), 144_000_000);
    }

    #[test]
    fn pll_hsi_64mhz(ta: &mut TestArgs) {
        cortex_m::interrupt::free(|cs| unsafe {
            rcc::set_sysclk_pll(&mut ta.flash, &mut ta.rcc, &PllConfig::HSI_64MHZ, cs)
        });
        assert_clocks(&ta.rcc, 64_000_000);
    }

    #[test]
    fn pll_custom(ta: &mut TestArgs) {
        let pll: PllConfig = unwrap!(PllConfig::new(
            PllSrc::Hse {
                prediv: 2,
                bypass: true
            },
            12
        ));
        defmt::assert_eq!(pll.sysclk_hz(), 48_000_000);
        cortex_m::interrupt::free(|cs| unsafe {
            rcc::set_sysclk_pll(&mut ta.flash, &mut ta.rcc, &pll, cs)
        });
        assert_clocks(&ta.rcc, 48_000_000);

        defmt::assert_eq!(
            PllConfig::new(PllSrc::HsiDiv2, 1),
            Err(PllError::Mul(1))
        );
        defmt::assert_eq!(
            PllConfig::new(
                PllSrc::Hse {
                    prediv: 17,
                    bypass: true
                },
                2
            ),
            Err(PllError::Prediv(17))
        );
    }

    #[test]
    fn back_to_hsi(ta: &mut TestArgs) {
        cortex_m::interrupt::free(|cs| unsafe {
            rcc::set_sysclk_hsi(&mut ta.flash, &mut ta.rcc, cs)
        });
        assert_clocks(&ta.rcc, rcc::HSI_HZ);
    }
}
