// Reads the LM75 temperature sensor on the STM32373C-EVAL.
//
// The OS output thresholds are set a few degrees above the first reading,
// warm the sensor with a finger to see LD2 (orange) turn on.
// LD1 (green) toggles with every reading.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32373c_eval_bsp::{
    hal::{
        self,
        cortex_m::{self, delay::Delay},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{PortA, PortC},
        pac,
        util::new_delay,
    },
    led::{self, Led},
    lm75::{self, Lm75, Temperature},
    I2c,
};

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);

    let (i2c, mut ld1, mut ld2) = cortex_m::interrupt::free(|cs| {
        (
            stm32373c_eval_bsp::new_i2c(dp.I2C2, gpioa.a9, gpioa.a10, &mut dp.RCC, cs),
            led::Ld1::new(gpioc.c0, cs),
            led::Ld2::new(gpioc.c1, cs),
        )
    });
    let i2c: I2c = match i2c {
        Ok(i2c) => i2c,
        Err(e) => error_handler(e),
    };
    let mut lm75: Lm75<I2c> = Lm75::new(i2c, lm75::DEFAULT_ADDR);

    let first: Temperature = match lm75.temperature() {
        Ok(t) => t,
        Err(e) => error_handler(e),
    };
    let os: Temperature = Temperature::from_half_degrees(first.half_degrees().saturating_add(6));
    let hyst: Temperature = Temperature::from_half_degrees(first.half_degrees().saturating_add(4));
    if let Err(e) = lm75.set_thresholds(os, hyst) {
        error_handler(e)
    }
    defmt::info!(
        "OS threshold {} mC, hysteresis {} mC",
        os.millicelsius(),
        hyst.millicelsius()
    );

    loop {
        let t: Temperature = match lm75.temperature() {
            Ok(t) => t,
            Err(e) => error_handler(e),
        };
        defmt::info!("temperature {} mC", t.millicelsius());
        ld1.toggle();
        if t >= os {
            ld2.set_on();
        } else if t <= hyst {
            ld2.set_off();
        }
        delay.delay_ms(500_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("i2c-lm75 failed: {}", e);
    led::error_halt()
}
