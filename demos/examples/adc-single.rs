// Single software triggered ADC conversions on the STM32F3348-DISCO.
//
// Prints V_DDA, the junction temperature, and the voltage on PA2 once a
// second.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::hal::{
    self,
    adc::{self, Adc},
    cortex_m::{self, delay::Delay},
    embedded_hal::blocking::delay::DelayMs,
    gpio::{Analog, PortA, pins},
    pac,
    util::new_delay,
};

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let a2: Analog<pins::A2> = cortex_m::interrupt::free(|cs| Analog::new(gpioa.a2, cs));

    let mut adc: Adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv2, &mut dp.RCC);
    adc.calibrate(&mut delay);
    adc.set_max_sample_time();
    adc.enable();
    adc.enable_vref();
    adc.enable_tsen();
    // the sensors need a few microseconds to start
    delay.delay_ms(1_u8);

    loop {
        match adc.vdda() {
            Some(vdda_mv) => {
                let temp: Option<i16> = adc.temperature(vdda_mv);
                let a2_mv: u32 = adc::to_millivolts(adc.pin(&a2), vdda_mv);
                defmt::info!("VDDA={} mV temperature={} C PA2={} mV", vdda_mv, temp, a2_mv);
            }
            None => defmt::warn!("VREFINT sample is zero"),
        }
        delay.delay_ms(1000_u16);
    }
}
