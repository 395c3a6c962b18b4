// SDADC voltmeter on the STM32373C-EVAL.
//
// Measures 0 to 3.3 V on PB1 (SDADC1 AIN5P) single-ended with a zero
// reference, the reference is VDDSD at 3.3 V.
// The 4 LEDs show the voltage as a bar graph.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32373c_eval_bsp::{
    hal::{
        self,
        cortex_m::{self, delay::Delay},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{Analog, PortB, PortC, pins},
        pac,
        sdadc::{Common, Conf, Gain, Mode, RefV, Sdadc, Slot},
        util::new_delay,
    },
    led::{self, Led},
};

const VDDSD_MV: u16 = 3_300;
const CH: u8 = 5;
const CONF: Conf = Conf::new(Gain::X1, Mode::SingleEndedZeroRef, Common::Vsssd);

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);

    let (_b1, mut ld1, mut ld2, mut ld3, mut ld4): (
        Analog<pins::B1>,
        led::Ld1,
        led::Ld2,
        led::Ld3,
        led::Ld4,
    ) = cortex_m::interrupt::free(|cs| {
        (
            Analog::new(gpiob.b1, cs),
            led::Ld1::new(gpioc.c0, cs),
            led::Ld2::new(gpioc.c1, cs),
            led::Ld3::new(gpioc.c2, cs),
            led::Ld4::new(gpioc.c3, cs),
        )
    });

    let mut sdadc: Sdadc =
        match Sdadc::new(dp.SDADC1, RefV::Vddsd(VDDSD_MV), &mut dp.PWR, &mut dp.RCC) {
            Ok(sdadc) => sdadc,
            Err(e) => error_handler(e),
        };
    if let Err(e) = sdadc.configure(Slot::Conf0, CONF, CH) {
        error_handler(e)
    }
    sdadc.calibrate(1);

    loop {
        let mv: i32 = match sdadc.sample_millivolts(CH) {
            Ok(mv) => mv,
            Err(e) => error_handler(e),
        };
        defmt::info!("AIN{}P: {} mV", CH, mv);

        let quarter: i32 = i32::from(VDDSD_MV) / 4;
        ld1.set(mv >= quarter / 2);
        ld2.set(mv >= quarter + quarter / 2);
        ld3.set(mv >= 2 * quarter + quarter / 2);
        ld4.set(mv >= 3 * quarter + quarter / 2);

        delay.delay_ms(250_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("sdadc-voltmeter failed: {}", e);
    led::error_halt()
}
