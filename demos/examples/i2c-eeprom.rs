// Writes and reads back the M24LR64 EEPROM on the STM32373C-EVAL.
//
// The write crosses page boundaries, LD1 (green) lights when the read back
// data matches.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32373c_eval_bsp::{
    eeprom::{self, Eeprom, Geometry},
    hal::{
        self, cortex_m,
        gpio::{PortA, PortC},
        pac,
    },
    led::{self, Led},
    I2c,
};

const ADDR: u16 = 0x0102;
const MSG: &[u8] = b"STM32373C-EVAL M24LR64";

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);

    let (i2c, mut ld1) = cortex_m::interrupt::free(|cs| {
        (
            stm32373c_eval_bsp::new_i2c(dp.I2C2, gpioa.a9, gpioa.a10, &mut dp.RCC, cs),
            led::Ld1::new(gpioc.c0, cs),
        )
    });
    let i2c: I2c = match i2c {
        Ok(i2c) => i2c,
        Err(e) => error_handler(e),
    };
    let mut eeprom: Eeprom<I2c> = Eeprom::new(i2c, eeprom::DEFAULT_ADDR, Geometry::M24LR64);

    let mut before: [u8; MSG.len()] = [0; MSG.len()];
    if let Err(e) = eeprom.read(ADDR, &mut before) {
        error_handler(e)
    }
    defmt::info!("before: {:X}", before);

    let pages: usize = Geometry::M24LR64.page_chunks(ADDR, MSG.len()).count();
    defmt::info!("writing {} bytes in {} pages", MSG.len(), pages);
    if let Err(e) = eeprom.write(ADDR, MSG) {
        error_handler(e)
    }

    let mut after: [u8; MSG.len()] = [0; MSG.len()];
    if let Err(e) = eeprom.read(ADDR, &mut after) {
        error_handler(e)
    }
    defmt::info!("after: {:a}", after);

    if after == MSG {
        defmt::info!("read back matches");
        ld1.set_on();
    } else {
        error_handler("read back mismatch")
    }

    loop {
        cortex_m::asm::wfe();
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("i2c-eeprom failed: {}", e);
    led::error_halt()
}
