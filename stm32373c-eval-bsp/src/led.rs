//! LEDs
//!
//! The four LEDs are connected between VDD and the GPIOs, they are active
//! low.

use stm32f3xx_hal as hal;

use hal::{
    cortex_m::{self, interrupt::CriticalSection},
    gpio::{self, Output, OutputArgs, PinState, PortC, pins},
    pac,
};

const LED_ARGS: OutputArgs = OutputArgs {
    speed: gpio::Speed::Low,
    level: PinState::High,
    ot: gpio::OutputType::PushPull,
    pull: gpio::Pull::None,
};

/// Simple trait for an LED
pub trait Led {
    /// Set the LED on.
    fn set_on(&mut self);

    /// Set the LED off.
    fn set_off(&mut self);

    /// Returns `true` if the LED is on.
    fn is_on(&self) -> bool;

    /// Set the LED on or off.
    fn set(&mut self, on: bool) {
        if on {
            self.set_on()
        } else {
            self.set_off()
        }
    }

    /// Toggle the LED state.
    fn toggle(&mut self) {
        if self.is_on() {
            self.set_off()
        } else {
            self.set_on()
        }
    }
}

macro_rules! led {
    ($name:ident, $pin:ident, $arg:ident, $color:literal) => {
        #[doc = concat!(stringify!($name), ", ", $color, " LED")]
        #[derive(Debug)]
        pub struct $name {
            gpio: Output<pins::$pin>,
        }

        impl $name {
            #[doc = concat!("Create a new ", stringify!($name), " LED.")]
            ///
            /// The LED is initially off.
            ///
            /// # Example
            ///
            /// ```no_run
            /// use stm32373c_eval_bsp::{
            ///     hal::{cortex_m, gpio::PortC, pac},
            ///     led::{self, Led},
            /// };
            ///
            /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
            ///
            /// let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);
            #[doc = concat!("let mut led = cortex_m::interrupt::free(|cs| led::", stringify!($name), "::new(gpioc.", stringify!($arg), ", cs));")]
            /// led.set_on();
            /// ```
            pub fn new($arg: pins::$pin, cs: &CriticalSection) -> Self {
                Self {
                    gpio: Output::new($arg, &LED_ARGS, cs),
                }
            }

            /// Free the GPIO pin from the LED struct.
            pub fn free(self) -> pins::$pin {
                self.gpio.free()
            }

            /// Steal the LED from whatever is currently using it.
            ///
            /// This will **not** initialize the GPIO peripheral.
            ///
            /// # Safety
            ///
            /// 1. Ensure that the code stealing the LED has exclusive access
            ///    to the underlying GPIO.
            ///    Singleton checks are bypassed with this method.
            /// 2. You are responsible for setting up the underlying GPIO correctly.
            ///    No setup will occur when using this method.
            pub unsafe fn steal() -> Self {
                Self {
                    gpio: unsafe { Output::steal() },
                }
            }
        }

        impl Led for $name {
            fn set_on(&mut self) {
                self.gpio.set_level(PinState::Low)
            }

            fn set_off(&mut self) {
                self.gpio.set_level(PinState::High)
            }

            fn is_on(&self) -> bool {
                self.gpio.level() == PinState::Low
            }
        }
    };
}

led!(Ld1, C0, c0, "green");
led!(Ld2, C1, c1, "orange");
led!(Ld3, C2, c2, "red");
led!(Ld4, C3, c3, "blue");

/// Light LD3 (red) and halt.
///
/// Interrupts are disabled and stay disabled. The GPIOC clock is enabled and
/// PC2 is configured as an output here, so this works whether or not the
/// caller has split port C or created the [`Ld3`] LED.
///
/// # Example
///
/// ```no_run
/// use stm32373c_eval_bsp::led;
///
/// fn error_handler<E: core::fmt::Debug>(_e: E) -> ! {
///     led::error_halt()
/// }
/// ```
pub fn error_halt() -> ! {
    cortex_m::interrupt::disable();
    // safety: interrupts are disabled and this never returns, no other code
    // touches RCC or GPIOC afterwards
    let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
    PortC::enable_clock(&mut dp.RCC);
    let gpioc: PortC = unsafe { PortC::steal() };
    cortex_m::interrupt::free(|cs| Ld3::new(gpioc.c2, cs).set_on());
    loop {
        cortex_m::asm::wfe();
    }
}
