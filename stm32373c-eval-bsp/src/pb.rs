//! Push-buttons
//!
//! Both buttons have external pull-ups and read low when pushed.

use stm32f3xx_hal as hal;

use hal::{
    cortex_m::interrupt::CriticalSection,
    gpio::{Exti, ExtiTrg, Input, PinState, Pull, pins},
    pac,
};

/// Key push-button, PA2.
///
/// The EXTI line shares the `EXTI2_TS` interrupt.
#[derive(Debug)]
pub struct Key {
    gpio: Input<pins::A2>,
}

/// Tamper push-button, PC13.
///
/// The EXTI line shares the `EXTI15_10` interrupt.
#[derive(Debug)]
pub struct Tamper {
    gpio: Input<pins::C13>,
}

/// Push-button IRQ triggers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqTrig {
    /// Fire the interrupt when the button is pushed.
    OnPush,
    /// Fire the interrupt when the button is released.
    OnRelease,
    /// Fire the interrupt on both push and release.
    Both,
}

impl From<IrqTrig> for ExtiTrg {
    fn from(trg: IrqTrig) -> Self {
        match trg {
            IrqTrig::OnPush => ExtiTrg::Falling,
            IrqTrig::OnRelease => ExtiTrg::Rising,
            IrqTrig::Both => ExtiTrg::Both,
        }
    }
}

/// Simple trait for a push-button
pub trait PushButton {
    /// Returns `true` if the button is currently being pushed.
    fn is_pushed(&self) -> bool;

    /// Setup the push-button to fire an interrupt.
    ///
    /// This will:
    /// 1. Set the SYSCFG EXTICR to the push-button pin
    /// 2. Enable falling/rising triggers (or both)
    /// 3. Unmask the line in the EXTI IMR
    ///
    /// This will **not** unmask the EXTI IRQ in the NVIC.
    fn setup_exti(syscfg: &mut pac::SYSCFG, exti: &mut pac::EXTI, trg: IrqTrig);

    /// Clear a pending IRQ in the EXTI for the push-button.
    fn clear_pending(exti: &mut pac::EXTI);
}

macro_rules! pb {
    ($name:ident, $pin:ident, $arg:ident, $port:ident, $split:ident) => {
        impl $name {
            /// Create a new push-button.
            ///
            /// # Example
            ///
            /// ```no_run
            /// use stm32373c_eval_bsp::{
            #[doc = concat!("    hal::{cortex_m, gpio::", stringify!($port), ", pac},")]
            #[doc = concat!("    pb::{", stringify!($name), ", PushButton},")]
            /// };
            ///
            /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
            ///
            #[doc = concat!("let port = ", stringify!($port), "::split(dp.", stringify!($split), ", &mut dp.RCC);")]
            #[doc = concat!("let pb = cortex_m::interrupt::free(|cs| ", stringify!($name), "::new(port.", stringify!($arg), ", cs));")]
            /// let pushed: bool = pb.is_pushed();
            /// ```
            pub fn new($arg: pins::$pin, cs: &CriticalSection) -> Self {
                Self {
                    gpio: Input::new($arg, Pull::None, cs),
                }
            }

            /// Free the GPIO pin from the push-button struct.
            pub fn free(self) -> pins::$pin {
                self.gpio.free()
            }

            /// Steal the push-button from whatever is currently using it.
            ///
            /// This will **not** initialize the GPIO peripheral.
            ///
            /// # Safety
            ///
            /// 1. Ensure that the code stealing the push-button has exclusive
            ///    access to the underlying GPIO.
            ///    Singleton checks are bypassed with this method.
            /// 2. You are responsible for setting up the underlying GPIO correctly.
            ///    No setup will occur when using this method.
            pub unsafe fn steal() -> Self {
                Self {
                    gpio: unsafe { Input::steal() },
                }
            }
        }

        impl PushButton for $name {
            fn is_pushed(&self) -> bool {
                self.gpio.level() == PinState::Low
            }

            fn setup_exti(syscfg: &mut pac::SYSCFG, exti: &mut pac::EXTI, trg: IrqTrig) {
                pins::$pin::setup_exti(syscfg, exti, trg.into());
                pins::$pin::unmask(exti);
            }

            fn clear_pending(exti: &mut pac::EXTI) {
                pins::$pin::clear_exti(exti)
            }
        }
    };
}

pb!(Key, A2, a2, PortA, GPIOA);
pb!(Tamper, C13, c13, PortC, GPIOC);
