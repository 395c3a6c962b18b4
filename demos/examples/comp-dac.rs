// Comparator against a DAC threshold on the STM32F3348-DISCO.
//
// COMP4 compares PB0 against DAC1 channel 1, the output is routed to PB1.
// The threshold sweeps from 0 V to V_DDA, the blue LED follows the
// comparator output and the threshold at the last toggle is printed.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        comp::{Comps, Csr, InvInput, Polarity},
        cortex_m::{self, delay::Delay},
        dac::{self, Dac},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{Alternate, Analog, PortB, pins},
        pac,
        util::new_delay,
    },
    led::{self, Led},
};

const VDDA_MV: u32 = 3_300;
const STEP_MV: u32 = 50;

const CSR: Csr = Csr::RESET
    .set_inv_input(InvInput::Dac1Ch1)
    .set_polarity(Polarity::NonInverted)
    .set_enable(true);

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let (mut blue, _inp, _out): (led::Blue, Analog<pins::B0>, Alternate<pins::B1>) =
        cortex_m::interrupt::free(|cs| {
            (
                led::Blue::new(gpiob.b7, cs),
                Analog::new(gpiob.b0, cs),
                Alternate::comp4_out(gpiob.b1, cs),
            )
        });

    let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
    let _ = dac.set_mode_chip();
    dac.enable();

    let mut comps: Comps = Comps::new(dp.COMP, &mut dp.RCC);
    if let Err(e) = comps.comp4.set_csr(CSR) {
        error_handler(e)
    }

    let mut threshold_mv: u32 = 0;
    let mut prev: bool = comps.comp4.output();
    loop {
        dac.set_value(dac::millivolts_to_code(threshold_mv, VDDA_MV));
        delay.delay_ms(5_u8);

        let above: bool = comps.comp4.output();
        blue.set(above);
        if above != prev {
            defmt::info!("PB0 crossed {} mV, above={}", threshold_mv, above);
            prev = above;
        }

        threshold_mv = if threshold_mv >= VDDA_MV {
            0
        } else {
            threshold_mv + STEP_MV
        };
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("comp-dac failed: {}", e);
    led::error_halt()
}
