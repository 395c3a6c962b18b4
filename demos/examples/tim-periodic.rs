// TIM6 update interrupt and TIM2 delay on the STM32F3348-DISCO.
//
// TIM6 toggles the green LED at 4 Hz from its update interrupt, the main
// loop reports the tick count every second with a TIM2 delay.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering::SeqCst};
use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        cortex_m::{self, interrupt::Mutex, peripheral::NVIC},
        embedded_hal::blocking::delay::DelayMs,
        gpio::PortB,
        pac::{self, interrupt},
        rcc::{self, PllConfig},
        tim::{Tim2, Tim6},
    },
    led::{self, Led},
};

static TICKS: AtomicU32 = AtomicU32::new(0);
static TIM6: Mutex<RefCell<Option<Tim6>>> = Mutex::new(RefCell::new(None));
static GREEN: Mutex<RefCell<Option<led::Green>>> = Mutex::new(RefCell::new(None));

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());

    cortex_m::interrupt::free(|cs| unsafe {
        rcc::set_sysclk_pll(
            &mut dp.FLASH,
            &mut dp.RCC,
            &PllConfig::HSE_BYPASS_72MHZ,
            cs,
        )
    });

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut delay: Tim2 = Tim2::new(dp.TIM2, &mut dp.RCC);
    let mut tim6: Tim6 = Tim6::new(dp.TIM6, &mut dp.RCC);
    defmt::info!("TIM6 clock {} Hz", tim6.clk_hz());

    if let Err(e) = tim6.start_hz(8) {
        error_handler(e)
    }
    tim6.listen();

    cortex_m::interrupt::free(|cs| {
        GREEN
            .borrow(cs)
            .replace(Some(led::Green::new(gpiob.b9, cs)));
        TIM6.borrow(cs).replace(Some(tim6));
    });
    unsafe { NVIC::unmask(pac::Interrupt::TIM6_DAC1) };

    loop {
        delay.delay_ms(1000_u32);
        defmt::info!("{} ticks", TICKS.load(SeqCst));
    }
}

#[interrupt]
#[allow(non_snake_case)]
fn TIM6_DAC1() {
    cortex_m::interrupt::free(|cs| {
        if let Some(tim6) = TIM6.borrow(cs).borrow_mut().as_mut() {
            tim6.clear_irq();
        }
        if let Some(green) = GREEN.borrow(cs).borrow_mut().as_mut() {
            green.toggle();
        }
    });
    TICKS.fetch_add(1, SeqCst);
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("tim-periodic failed: {}", e);
    led::error_halt()
}
