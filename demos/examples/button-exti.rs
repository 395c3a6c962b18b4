// Counts pushes of the STM32F3348-DISCO user button with the EXTI0 interrupt.
//
// The blue LED toggles on every push, the core sleeps in between.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU32, Ordering::SeqCst};
use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        cortex_m::{self, peripheral::NVIC},
        gpio::{PortA, PortB},
        pac::{self, interrupt},
        rcc,
    },
    led::{self, Led},
    pb::{IrqTrig, PushButton},
};

static PUSHES: AtomicU32 = AtomicU32::new(0);

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);

    let (_button, _blue): (PushButton, led::Blue) = cortex_m::interrupt::free(|cs| {
        (PushButton::new(gpioa.a0, cs), led::Blue::new(gpiob.b7, cs))
    });

    rcc::enable_syscfg(&mut dp.RCC);
    PushButton::setup_exti(&mut dp.SYSCFG, &mut dp.EXTI, IrqTrig::OnPush);
    defmt::assert!(!PushButton::is_pending(&dp.EXTI));
    unsafe { NVIC::unmask(pac::Interrupt::EXTI0) };

    loop {
        cortex_m::asm::wfi();
    }
}

#[interrupt]
#[allow(non_snake_case)]
fn EXTI0() {
    // safety: the EXTI0 handler is the only user of EXTI after setup
    let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
    defmt::assert!(PushButton::is_pending(&dp.EXTI));
    PushButton::clear_pending(&mut dp.EXTI);

    let pushes: u32 = PUSHES.fetch_add(1, SeqCst) + 1;
    defmt::info!("button pushed {} times", pushes);

    // safety: the LED was setup in main and is not used elsewhere
    let mut blue: led::Blue = unsafe { led::Blue::steal() };
    blue.toggle();
}
