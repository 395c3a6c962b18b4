// Regulates the STM32F3348-DISCO buck-boost output to a target voltage.
//
// The input and output voltages are sampled on PA1 and PA3, the stage picks
// buck or boost mode from the input voltage, and the user button cycles the
// target voltage.
//
// The LEDs show the mode: blue for buck, orange for boost, green when the
// stage is de-energized. Red is the error LED.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    buck_boost::{self, BuckBoost, Limits, Mode},
    hal::{
        self,
        adc::{self, Adc},
        cortex_m::{self, delay::Delay},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{Analog, PortA, PortB, pins},
        hrtim::{Blocks, Hrtim, Parts},
        pac, rcc,
        util::new_delay,
    },
    led::{self, Led, Leds},
    pb::PushButton,
};

const TARGETS_MV: [u32; 3] = [3_300, 5_000, 8_000];

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    cortex_m::interrupt::free(|cs| unsafe {
        rcc::set_sysclk_pll(
            &mut dp.FLASH,
            &mut dp.RCC,
            &rcc::PllConfig::HSE_BYPASS_72MHZ,
            cs,
        )
    });
    let hrtim_hz: u32 = rcc::hrtim_hz(&dp.RCC);
    defmt::info!("hrtim_hz={}", hrtim_hz);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let (mut leds, button, vin, vout): (Leds, PushButton, Analog<pins::A1>, Analog<pins::A3>) =
        cortex_m::interrupt::free(|cs| {
            (
                Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs),
                PushButton::new(gpioa.a0, cs),
                Analog::new(gpioa.a1, cs),
                Analog::new(gpioa.a3, cs),
            )
        });

    let mut adc: Adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);
    adc.calibrate(&mut delay);
    adc.set_max_sample_time();
    adc.enable();
    adc.enable_vref();

    let blocks: Blocks = Blocks {
        common: dp.HRTIM_COMMON,
        master: dp.HRTIM_MASTER,
        tim_a: dp.HRTIM_TIMA,
        tim_b: dp.HRTIM_TIMB,
        tim_c: dp.HRTIM_TIMC,
        tim_d: dp.HRTIM_TIMD,
        tim_e: dp.HRTIM_TIME,
    };
    let mut parts: Parts = match Hrtim::new(blocks, &mut dp.RCC) {
        Ok(hrtim) => hrtim.split(),
        Err(e) => error_handler(e),
    };

    let stage = cortex_m::interrupt::free(|cs| {
        BuckBoost::new(
            parts.tim_a,
            parts.tim_b,
            &mut parts.control,
            (gpioa.a8, gpioa.a9, gpioa.a10, gpioa.a11),
            hrtim_hz,
            Limits::DISCO,
            cs,
        )
    });
    let mut stage: BuckBoost = match stage {
        Ok(stage) => stage,
        Err(e) => error_handler(e),
    };

    let mut target_idx: usize = 0;
    let mut was_pushed: bool = false;
    let mut prev_mode: Mode = stage.mode();

    loop {
        let pushed: bool = button.is_pushed();
        if pushed && !was_pushed {
            target_idx = (target_idx + 1) % TARGETS_MV.len();
            defmt::info!("target {} mV", TARGETS_MV[target_idx]);
        }
        was_pushed = pushed;

        let vdda_mv: u32 = match adc.vdda() {
            Some(mv) => mv,
            None => error_handler("VDDA out of range"),
        };
        let vin_mv: u32 =
            buck_boost::VIN_DIVIDER.sensed_mv(adc::to_millivolts(adc.pin(&vin), vdda_mv));
        let vout_mv: u32 =
            buck_boost::VOUT_DIVIDER.sensed_mv(adc::to_millivolts(adc.pin(&vout), vdda_mv));

        let mode: Mode = stage.regulate(&mut parts.control, vin_mv, TARGETS_MV[target_idx]);
        if mode != prev_mode {
            defmt::info!(
                "{} -> {} vin={} mV vout={} mV duty={}",
                prev_mode,
                mode,
                vin_mv,
                vout_mv,
                stage.duty()
            );
            leds.set_all(false);
            match mode {
                Mode::Buck => leds.blue.set_on(),
                Mode::Boost => leds.orange.set_on(),
                Mode::DeEnergize => leds.green.set_on(),
            }
            prev_mode = mode;
        }

        delay.delay_ms(10_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("buck-boost failed: {}", e);
    led::error_halt()
}
