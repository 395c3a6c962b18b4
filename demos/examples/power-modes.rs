// Steps through the low-power modes of the STM32F3348-DISCO.
//
// Each push of the user button enters the next mode:
//
// 1. Sleep, woken by the button EXTI interrupt.
// 2. Stop with the regulator in low-power mode, woken by the button EXTI
//    interrupt. The PLL is setup again after wakeup.
// 3. Standby, woken by the button on WKUP1. Wakeup from standby is a reset.
//
// The green LED is on while running, the LEDs are off in low-power modes.
// Measure the current on the IDD jumper JP2.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self,
        cortex_m::{self, delay::Delay, peripheral::NVIC},
        embedded_hal::blocking::delay::DelayMs,
        gpio::{PortA, PortB},
        pac::{self, interrupt},
        pwr::{self, StopRegulator, WakeupPin},
        rcc::{self, PllConfig},
        util::new_delay,
    },
    led::{Led, Leds},
    pb::{IrqTrig, PushButton},
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, defmt::Format)]
enum LowPower {
    Sleep,
    Stop,
    Standby,
}

impl LowPower {
    const fn next(self) -> Self {
        match self {
            LowPower::Sleep => LowPower::Stop,
            LowPower::Stop => LowPower::Standby,
            LowPower::Standby => LowPower::Sleep,
        }
    }
}

fn setup_pll(dp: &mut pac::Peripherals) {
    cortex_m::interrupt::free(|cs| unsafe {
        rcc::set_sysclk_pll(
            &mut dp.FLASH,
            &mut dp.RCC,
            &PllConfig::HSE_BYPASS_72MHZ,
            cs,
        )
    });
}

fn wait_for_push(button: &PushButton, delay: &mut Delay) {
    while !button.is_pushed() {
        delay.delay_ms(10_u32);
    }
    // debounce the push and wait for the release
    while button.is_pushed() {
        delay.delay_ms(10_u32);
    }
    delay.delay_ms(50_u32);
}

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let mut cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    pwr::enable_clock(&mut dp.RCC);
    let flags: pwr::Flags = pwr::flags(&dp.PWR);
    if flags.standby {
        defmt::info!("woke up from standby");
    }
    pwr::clear_flags(&mut dp.PWR);
    // the wakeup pin forces A0 to input pull-down, release it for the button
    pwr::set_wakeup_pin(&mut dp.PWR, WakeupPin::Wkup1, false);

    setup_pll(&mut dp);
    // SysTick is stopped in stop mode, the delay is only used while running
    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let (button, mut leds): (PushButton, Leds) = cortex_m::interrupt::free(|cs| {
        (
            PushButton::new(gpioa.a0, cs),
            Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs),
        )
    });

    rcc::enable_syscfg(&mut dp.RCC);
    PushButton::setup_exti(&mut dp.SYSCFG, &mut dp.EXTI, IrqTrig::OnPush);
    unsafe { NVIC::unmask(pac::Interrupt::EXTI0) };

    let mut mode: LowPower = LowPower::Sleep;
    loop {
        leds.green.set_on();
        defmt::info!("push the button to enter {}", mode);
        wait_for_push(&button, &mut delay);
        leds.set_all(false);

        match mode {
            LowPower::Sleep => {
                pwr::sleep(&mut cp.SCB);
                defmt::info!("woke up from sleep");
            }
            LowPower::Stop => {
                pwr::stop(&mut dp.PWR, &mut cp.SCB, StopRegulator::LowPower);
                setup_pll(&mut dp);
                defmt::info!("woke up from stop");
            }
            LowPower::Standby => {
                NVIC::mask(pac::Interrupt::EXTI0);
                pwr::set_wakeup_pin(&mut dp.PWR, WakeupPin::Wkup1, true);
                defmt::info!("entering standby");
                pwr::standby()
            }
        }

        // the push that woke the core, wait for the release
        while button.is_pushed() {
            delay.delay_ms(10_u32);
        }
        mode = mode.next();
    }
}

#[interrupt]
#[allow(non_snake_case)]
fn EXTI0() {
    // safety: only the pending bit is written, EXTI is otherwise unused
    let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
    PushButton::clear_pending(&mut dp.EXTI);
}
