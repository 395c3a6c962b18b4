// Prints to USART2 and echoes received bytes on the STM32F3348-DISCO.
//
// Connect a 3.3 V USB-serial adapter: adapter RX to PA2, adapter TX to PA3.
// Settings are 115200 8N1.

#![no_std]
#![no_main]

use core::fmt::Write;
use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self, cortex_m,
        embedded_hal::prelude::*,
        gpio::{PortA, PortB, pins},
        info, pac,
        rcc::{self, PllConfig},
        uart::{self, NoRx, NoTx, Uart2},
    },
    led::{self, Led},
};

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());

    cortex_m::interrupt::free(|cs| unsafe {
        rcc::set_sysclk_pll(
            &mut dp.FLASH,
            &mut dp.RCC,
            &PllConfig::HSE_BYPASS_72MHZ,
            cs,
        )
    });

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);

    let uart2: Uart2<NoRx, NoTx> =
        match Uart2::new(dp.USART2, 115_200, uart::Clk::Sysclk, &mut dp.RCC) {
            Ok(uart2) => uart2,
            Err(e) => error_handler(e),
        };
    let (mut uart, mut blue): (Uart2<pins::A3, pins::A2>, led::Blue) =
        cortex_m::interrupt::free(|cs| {
            (
                uart2.enable_tx(gpioa.a2, cs).enable_rx(gpioa.a3, cs),
                led::Blue::new(gpiob.b7, cs),
            )
        });

    if let Err(e) = writeln!(
        uart,
        "Hello from the STM32F3348-DISCO, sysclk {} Hz\r",
        rcc::sysclk_hz(&dp.RCC)
    ) {
        error_handler(defmt::Debug2Format(&e))
    }
    if writeln!(uart, "UID: {}\r", info::uid()).is_err() {
        error_handler("UART write failed")
    }

    loop {
        let byte: u8 = match nb::block!(uart.read()) {
            Ok(byte) => byte,
            Err(e) => {
                defmt::warn!("UART read error: {}", e);
                continue;
            }
        };
        blue.toggle();
        defmt::trace!("echo {:#04X}", byte);
        if let Err(e) = uart.bwrite_all(&[byte]) {
            defmt::warn!("UART write error: {}", e);
        }
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("uart-printf failed: {}", e);
    led::error_halt()
}
