// Blinks the 4 user LEDs on the STM32F3348-DISCO clockwise.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        cortex_m::{self, delay::Delay},
        embedded_hal::blocking::delay::DelayMs,
        gpio::PortB,
        pac,
        util::new_delay,
    },
    led::Leds,
};

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut leds: Leds =
        cortex_m::interrupt::free(|cs| Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs));

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    defmt::info!("Starting blinky");

    loop {
        for n in 0..4 {
            leds.show(1 << n);
            delay.delay_ms(200_u32);
        }
    }
}
