// Triangle wave on the DAC output PA4 of the STM32F3348-DISCO.
//
// The output ramps between 0 V and V_DDA with software triggers, one step
// per millisecond.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::hal::{
    self,
    cortex_m::{self, delay::Delay},
    dac::{Dac, ModePin},
    embedded_hal::blocking::delay::DelayMs,
    gpio::{Analog, PortA},
    pac,
    util::new_delay,
};

const STEP: u16 = 64;
const FULL_SCALE: u16 = 4095;

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
    cortex_m::interrupt::free(|cs| dac.set_mode_pin(Analog::new(gpioa.a4, cs), ModePin::Buf));
    dac.setup_soft_trigger();

    let mut code: u16 = 0;
    let mut rising: bool = true;
    loop {
        dac.soft_trigger(code);
        if code == 0 {
            defmt::info!("DAC at zero, out={}", dac.out());
        }

        (code, rising) = match (rising, code) {
            (true, c) if c >= FULL_SCALE - STEP => (FULL_SCALE, false),
            (true, c) => (c + STEP, true),
            (false, c) if c <= STEP => (0, true),
            (false, c) => (c - STEP, false),
        };

        delay.delay_ms(1_u8);
    }
}
