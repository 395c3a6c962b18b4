// Transition mode power factor correction on timer A of the STM32F3348-DISCO.
//
// The inductor current zero-cross is detected by COMP4, with the sensed
// current on PB0 and the threshold from DAC1 channel 1.
// COMP4 drives HRTIM external event 2, which:
//
// * resets timer A and starts a new switching cycle (TA1 is set),
// * captures the length of the previous cycle in capture 1,
// * starts the auto-delayed compare 2 that triggers the ADC after the
//   zero-cross.
//
// TA1 (PA8) is reset on compare 1, the on-time. If no zero-cross arrives the
// timer period restarts the cycle, and compare 1 times out compare 2.
//
// The user button steps the on-time. The LEDs show the cycle frequency band.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        comp::{self, Comps},
        cortex_m::{self, delay::Delay},
        dac::{self, Dac},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{Alternate, Analog, PortA, PortB, pins},
        hrtim::{
            self, AdcTrigger, AdcTrigger13, AutoDelay, Blocks, Capture, CaptureTriggers, Compare,
            Duty, EevSensitivity, EevSrc, ExternalEventConfig, FaultLevel, Hrtim, Out,
            OutputEvents, Outputs, Outr, Parts, Prescaler, ResetEvents, TimCr, Timers, update,
        },
        pac, rcc,
        util::new_delay,
    },
    led::{self, Led, Leds},
    pb::PushButton,
};

/// Minimum switching frequency, the timer period.
const MIN_HZ: u32 = 40_000;
/// Zero-cross threshold.
const ZCD_MV: u32 = 100;
/// Delay from the zero-cross to the ADC trigger.
const SAMPLE_DELAY_NS: u32 = 500;

const EEV2: ExternalEventConfig = ExternalEventConfig::new(EevSrc::Src2)
    .set_sensitivity(EevSensitivity::Falling)
    .set_fast(true);

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

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let (button, mut leds, _ta1, _sense): (
        PushButton,
        Leds,
        Alternate<pins::A8>,
        Analog<pins::B0>,
    ) = cortex_m::interrupt::free(|cs| {
        (
            PushButton::new(gpioa.a0, cs),
            Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs),
            Alternate::hrtim_cha1(gpioa.a8, cs),
            Analog::new(gpiob.b0, cs),
        )
    });

    // zero-cross threshold on the comparator inverting input
    let mut dac: Dac = Dac::new(dp.DAC1, &mut dp.RCC);
    let _ = dac.set_mode_chip();
    dac.enable();
    dac.set_value(dac::millivolts_to_code(ZCD_MV, 3_300));

    let mut comps: Comps = Comps::new(dp.COMP, &mut dp.RCC);
    let csr: comp::Csr = comp::Csr::RESET
        .set_inv_input(comp::InvInput::Dac1Ch1)
        .set_enable(true);
    if let Err(e) = comps.comp4.set_csr(csr) {
        error_handler(e)
    }

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

    if let Err(e) = parts.control.configure_external_event(2, EEV2) {
        error_handler(e)
    }

    let pre: Prescaler = match Prescaler::finest_for(hrtim_hz, MIN_HZ) {
        Ok(pre) => pre,
        Err(e) => error_handler(e),
    };
    let period: u16 = match hrtim::period_ticks(hrtim_hz, MIN_HZ, pre) {
        Ok(period) => period,
        Err(e) => error_handler(e),
    };
    let sample_delay: u16 = hrtim::ns_to_ticks(hrtim_hz, SAMPLE_DELAY_NS, pre)
        .clamp(u64::from(pre.min_value()), u64::from(period)) as u16;

    let tim: &mut hrtim::TimerA = &mut parts.tim_a;
    tim.configure(
        TimCr::RESET
            .set_prescaler(pre)
            .set_continuous(true)
            .set_preload(true)
            .set_update_sources(update::RESET)
            .set_delayed_cmp2(AutoDelay::CaptureOrCmp1),
    );
    tim.set_period(period);
    tim.set_output_config(Outr::RESET.set_fault_level(Out::One, FaultLevel::Inactive));
    tim.set_output_events(
        Out::One,
        OutputEvents::PERIOD | OutputEvents::RESYNC,
        OutputEvents::CMP1,
    );
    tim.set_reset_events(defmt::unwrap!(ResetEvents::external(2)));
    tim.set_capture_trigger(Capture::Cpt1, defmt::unwrap!(CaptureTriggers::external(2)));
    tim.set_compare(Compare::Cmp2, sample_delay);

    let mut on_time: Duty = Duty::from_permille(200);
    tim.set_duty(Compare::Cmp1, on_time);

    parts
        .control
        .set_adc_trigger(AdcTrigger::Trg1(AdcTrigger13::TA_CMP2));
    parts.control.software_update(Timers::A);
    parts.control.enable_outputs(Outputs::TA1);
    parts.control.start(Timers::A);

    let tick_hz: u64 = pre.counter_hz(hrtim_hz);
    let mut was_pushed: bool = false;
    loop {
        let pushed: bool = button.is_pushed();
        if pushed && !was_pushed {
            on_time = if on_time.permille() >= 600 {
                Duty::from_permille(100)
            } else {
                on_time.saturating_add(100)
            };
            parts.tim_a.set_duty(Compare::Cmp1, on_time);
            defmt::info!("on-time {} of the longest cycle", on_time);
        }
        was_pushed = pushed;

        let cycle: u16 = parts.tim_a.capture(Capture::Cpt1);
        let cycle_hz: u32 = if cycle == 0 {
            0
        } else {
            (tick_hz / u64::from(cycle)) as u32
        };
        // one LED per 40 kHz band above the minimum frequency
        leds.show(match cycle_hz / MIN_HZ {
            0 => 0b0000,
            1 => 0b0001,
            2 => 0b0011,
            3 => 0b0111,
            _ => 0b1111,
        });
        defmt::info!(
            "cycle={} ticks ({} Hz) zcd={}",
            cycle,
            cycle_hz,
            comps.comp4.output()
        );

        delay.delay_ms(100_u32);
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("pfc failed: {}", e);
    led::error_halt()
}
