// OPAMP2 programmable gain amplifier on the STM32F3348-DISCO.
//
// Connect the DAC output PA4 to the amplifier input PA7, and measure the
// amplifier output on PA6.
// The DAC holds 200 mV, each push of the user button selects the next gain.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        cortex_m::{self, delay::Delay},
        dac::{self, Dac, ModePin},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{Analog, PortA, PortB, pins},
        opamp::{Csr, Gain, Mode, OpAmp, VpSel},
        pac,
        util::new_delay,
    },
    led::{self, Led, Leds},
    pb::PushButton,
};

const VDDA_MV: u32 = 3_300;
const INPUT_MV: u32 = 200;
const GAINS: [Gain; 4] = [Gain::X2, Gain::X4, Gain::X8, Gain::X16];

const fn csr(gain: Gain) -> Csr {
    Csr::RESET
        .set_vp(VpSel::A7)
        .set_mode(Mode::Pga(gain))
        .set_enable(true)
}

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);

    let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
    let (button, mut leds, _vp, _out): (PushButton, Leds, Analog<pins::A7>, Analog<pins::A6>) =
        cortex_m::interrupt::free(|cs| {
            dac.set_mode_pin(Analog::new(gpioa.a4, cs), ModePin::Buf);
            (
                PushButton::new(gpioa.a0, cs),
                Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs),
                Analog::new(gpioa.a7, cs),
                Analog::new(gpioa.a6, cs),
            )
        });
    dac.enable();
    dac.set_value(dac::millivolts_to_code(INPUT_MV, VDDA_MV));

    let mut opamp: OpAmp = OpAmp::new(dp.OPAMP, &mut dp.RCC);

    let mut idx: usize = 0;
    select_gain(&mut opamp, &mut leds, idx);

    let mut was_pushed: bool = false;
    loop {
        let pushed: bool = button.is_pushed();
        if pushed && !was_pushed {
            idx = (idx + 1) % GAINS.len();
            select_gain(&mut opamp, &mut leds, idx);
        }
        was_pushed = pushed;
        delay.delay_ms(20_u32);
    }
}

fn select_gain(opamp: &mut OpAmp, leds: &mut Leds, idx: usize) {
    let gain: Gain = GAINS[idx];
    if let Err(e) = opamp.set_csr(csr(gain)) {
        error_handler(e)
    }
    leds.show(1 << idx);
    defmt::info!(
        "gain x{}: expect PA6 = {} mV",
        gain.factor(),
        (INPUT_MV * u32::from(gain.factor())).min(VDDA_MV)
    );
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("opamp-pga failed: {}", e);
    led::error_halt()
}
