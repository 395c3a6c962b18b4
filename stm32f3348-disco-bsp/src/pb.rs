//! Push-buttons

use stm32f3xx_hal as hal;

use hal::{
    cortex_m::interrupt::CriticalSection,
    gpio::{Exti, ExtiTrg, Input, PinState, Pull, pins},
    pac,
};

/// Push-button interrupt triggers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqTrig {
    /// Trigger an interrupt when the button is pushed.
    OnPush,
    /// Trigger an interrupt when the button is released.
    OnRelease,
    /// Trigger an interrupt on both push and release.
    Both,
}

/// The user push-button.
///
/// Marked as B1 (USER) on the PCB.
///
/// The button pulls PA0 high when pushed, the board has an external pull-down
/// resistor.
#[derive(Debug)]
pub struct PushButton {
    gpio: Input<pins::A0>,
}

impl PushButton {
    /// Create a new push-button.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3348_disco_bsp::{
    ///     hal::{cortex_m, gpio::PortA, pac},
    ///     pb::PushButton,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    /// let button = cortex_m::interrupt::free(|cs| PushButton::new(gpioa.a0, cs));
    /// ```
    pub fn new(a0: pins::A0, cs: &CriticalSection) -> Self {
        Self {
            gpio: Input::new(a0, Pull::None, cs),
        }
    }

    /// Free the GPIO pin from the push-button struct.
    pub fn free(self) -> pins::A0 {
        self.gpio.free()
    }

    /// Steal the push-button from whatever is currently using it.
    ///
    /// This will **not** initialize the GPIO peripheral.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the push-button has exclusive access
    ///    to the underlying GPIO.
    ///    Singleton checks are bypassed with this method.
    /// 2. You are responsible for setting up the underlying GPIO correctly.
    ///    No setup will occur when using this method.
    pub unsafe fn steal() -> Self {
        Self {
            gpio: unsafe { Input::steal() },
        }
    }

    /// Returns `true` if the button is currently being pushed.
    pub fn is_pushed(&self) -> bool {
        self.gpio.level() == PinState::High
    }

    /// Configure the EXTI line of the push-button.
    ///
    /// This does **not** unmask the `EXTI0` interrupt in the NVIC.
    /// The SYSCFG clock must be enabled with
    /// [`rcc::enable_syscfg`](crate::hal::rcc::enable_syscfg).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3348_disco_bsp::{
    ///     hal::{pac, rcc},
    ///     pb::{IrqTrig, PushButton},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// rcc::enable_syscfg(&mut dp.RCC);
    /// PushButton::setup_exti(&mut dp.SYSCFG, &mut dp.EXTI, IrqTrig::OnPush);
    /// unsafe { pac::NVIC::unmask(pac::Interrupt::EXTI0) };
    /// ```
    pub fn setup_exti(syscfg: &mut pac::SYSCFG, exti: &mut pac::EXTI, trg: IrqTrig) {
        let trg: ExtiTrg = match trg {
            IrqTrig::OnPush => ExtiTrg::Rising,
            IrqTrig::OnRelease => ExtiTrg::Falling,
            IrqTrig::Both => ExtiTrg::Both,
        };
        pins::A0::setup_exti(syscfg, exti, trg);
        pins::A0::unmask(exti);
    }

    /// Clear the pending EXTI line of the push-button.
    ///
    /// Call this in the `EXTI0` interrupt handler.
    pub fn clear_pending(exti: &mut pac::EXTI) {
        pins::A0::clear_exti(exti)
    }

    /// Returns `true` if the push-button EXTI line is pending.
    pub fn is_pending(exti: &pac::EXTI) -> bool {
        pins::A0::is_pending(exti)
    }
}
