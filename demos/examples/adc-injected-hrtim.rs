// Injected ADC conversions triggered by the HRTIM on the STM32F3348-DISCO.
//
// Timer A runs a 50 kHz PWM on TA1 (PA8). HRTIM ADC trigger 2 fires on timer
// A compare 2, in the middle of the on-time, and starts an injected sequence
// of PA1 and PA3 (the buck-boost input and output sense pins).
//
// The samples are averaged over 1024 periods and printed.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    buck_boost,
    hal::{
        self,
        adc::{self, Adc, Edge, InjTrigger},
        cortex_m::{self, delay::Delay},
        gpio::{Alternate, Analog, PortA, PortB, pins},
        hrtim::{
            self, AdcTrigger, AdcTrigger24, AdcUpdateSource, Blocks, Compare, Duty, Hrtim, Out,
            OutputEvents, Outputs, Parts, Prescaler, TimCr, TimerId, Timers, update,
        },
        pac, rcc,
        util::new_delay,
    },
    led::{self, Led},
};

const SWITCH_HZ: u32 = 50_000;
const AVERAGE: u32 = 1024;

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

    let (mut green, _ta1, _vin, _vout): (
        led::Green,
        Alternate<pins::A8>,
        Analog<pins::A1>,
        Analog<pins::A3>,
    ) = cortex_m::interrupt::free(|cs| {
        (
            led::Green::new(gpiob.b9, cs),
            Alternate::hrtim_cha1(gpioa.a8, cs),
            Analog::new(gpioa.a1, cs),
            Analog::new(gpioa.a3, cs),
        )
    });

    let mut adc: Adc = Adc::new(dp.ADC1, dp.ADC1_2, adc::Clk::HclkDiv1, &mut dp.RCC);
    adc.calibrate(&mut delay);
    adc.set_max_sample_time();
    adc.enable();
    adc.enable_vref();
    let vdda_mv: u32 = match adc.vdda() {
        Some(mv) => mv,
        None => error_handler("VREFINT sample is zero"),
    };
    if let Err(e) = adc.set_injected(
        &[pins::A1::ADC_CH, pins::A3::ADC_CH],
        InjTrigger::HrtimTrg2(Edge::Rising),
    ) {
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

    let pre: Prescaler = match Prescaler::finest_for(hrtim_hz, SWITCH_HZ) {
        Ok(pre) => pre,
        Err(e) => error_handler(e),
    };
    let period: u16 = match hrtim::period_ticks(hrtim_hz, SWITCH_HZ, pre) {
        Ok(period) => period,
        Err(e) => error_handler(e),
    };

    let tim: &mut hrtim::TimerA = &mut parts.tim_a;
    tim.configure(
        TimCr::RESET
            .set_prescaler(pre)
            .set_continuous(true)
            .set_preload(true)
            .set_update_sources(update::REPETITION),
    );
    tim.set_period(period);
    tim.set_output_events(Out::One, OutputEvents::PERIOD, OutputEvents::CMP1);
    let on: u16 = tim.set_duty(Compare::Cmp1, Duty::from_percent(30));
    tim.set_compare(Compare::Cmp2, on / 2);

    parts
        .control
        .set_adc_trigger(AdcTrigger::Trg2(AdcTrigger24::TA_CMP2));
    parts
        .control
        .set_adc_update_source(2, AdcUpdateSource::Timer(TimerId::A));
    parts.control.software_update(Timers::A);
    parts.control.enable_outputs(Outputs::TA1);

    adc.start_injected();
    parts.control.start(Timers::A);
    green.set_on();

    loop {
        let mut vin_sum: u32 = 0;
        let mut vout_sum: u32 = 0;
        for _ in 0..AVERAGE {
            while !adc.injected_complete() {}
            vin_sum += u32::from(adc.injected_data(0));
            vout_sum += u32::from(adc.injected_data(1));
        }
        let vin_mv: u32 = buck_boost::VIN_DIVIDER
            .sensed_mv(adc::to_millivolts((vin_sum / AVERAGE) as u16, vdda_mv));
        let vout_mv: u32 = buck_boost::VOUT_DIVIDER
            .sensed_mv(adc::to_millivolts((vout_sum / AVERAGE) as u16, vdda_mv));
        defmt::info!("vin={} mV vout={} mV", vin_mv, vout_mv);
        green.toggle();
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("adc-injected-hrtim failed: {}", e);
    led::error_halt()
}
