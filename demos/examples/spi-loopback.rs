// SPI1 loopback on the STM32F3348-DISCO.
//
// Connect PB5 (MOSI) to PB4 (MISO) with a jumper wire.
// The green LED lights when the received frame matches the sent frame.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self, cortex_m,
        embedded_hal::blocking::spi::Transfer,
        gpio::{PortB, pins},
        pac,
        rcc::{self, PllConfig},
        spi::{BaudDiv, MODE_0, Spi1},
    },
    led::{self, Led},
};

const FRAME: [u8; 8] = [0x00, 0xFF, 0x55, 0xAA, 0x12, 0x34, 0x56, 0x78];

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

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut green: led::Green = cortex_m::interrupt::free(|cs| led::Green::new(gpiob.b9, cs));

    // 72 MHz / 8 = 9 MHz
    let mut spi: Spi1<pins::B5, pins::B4, pins::B3> = Spi1::new(
        dp.SPI1,
        gpiob.b5,
        gpiob.b4,
        gpiob.b3,
        MODE_0,
        BaudDiv::Div8,
        &mut dp.RCC,
    );

    let mut buf: [u8; FRAME.len()] = FRAME;
    match spi.transfer(&mut buf) {
        Ok(rx) => {
            defmt::info!("sent {:X}", FRAME);
            defmt::info!("received {:X}", rx);
            if rx == FRAME {
                green.set_on();
            } else {
                error_handler("loopback mismatch, is PB5 connected to PB4?")
            }
        }
        Err(e) => error_handler(e),
    }

    loop {
        cortex_m::asm::wfe();
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("spi-loopback failed: {}", e);
    led::error_halt()
}
