// Prints clock frequencies and device information for the STM32F3348-DISCO.
//
// The clocks are printed twice, at reset on the HSI and after switching the
// sysclk to the PLL at 72 MHz.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::hal::{
    self, cortex_m,
    info,
    pac,
    rcc::{self, PllConfig},
};

fn print_clocks(rcc: &pac::RCC) {
    defmt::info!("sysclk_hz: {}", rcc::sysclk_hz(rcc));
    defmt::info!("hclk_hz: {}", rcc::hclk_hz(rcc));
    defmt::info!("pclk1_hz: {}", rcc::pclk1_hz(rcc));
    defmt::info!("pclk2_hz: {}", rcc::pclk2_hz(rcc));
    defmt::info!("apb1_timer_hz: {}", rcc::apb1_timer_hz(rcc));
    defmt::info!("hrtim_hz: {}", rcc::hrtim_hz(rcc));
}

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());

    defmt::info!("Flash size: {} KiB", info::flash_size_kibibyte());
    defmt::info!("UID: {}", info::uid());
    match info::idcode().device() {
        Ok(device) => defmt::info!("Device: {}", device),
        Err(id) => defmt::warn!("Unknown device ID: {:#X}", id),
    }

    defmt::info!("Reset clocks");
    print_clocks(&dp.RCC);

    cortex_m::interrupt::free(|cs| unsafe {
        rcc::set_sysclk_pll(
            &mut dp.FLASH,
            &mut dp.RCC,
            &PllConfig::HSE_BYPASS_72MHZ,
            cs,
        )
    });

    defmt::info!("PLL clocks");
    print_clocks(&dp.RCC);

    loop {
        cortex_m::asm::bkpt();
    }
}
