//! LEDs
//!
//! The four user LEDs are active high.

use stm32f3xx_hal as hal;

use core::convert::Infallible;
use hal::{
    cortex_m::{self, interrupt::CriticalSection},
    embedded_hal::digital::v2::{OutputPin, StatefulOutputPin},
    gpio::{self, Output, OutputArgs, PinState, PortB, pins},
    pac,
};

const LED_ARGS: OutputArgs = OutputArgs {
    speed: gpio::Speed::Low,
    level: PinState::Low,
    ot: gpio::OutputType::PushPull,
    pull: gpio::Pull::None,
};

/// Simple trait for an LED
pub trait Led {
    /// Output pin driving the LED.
    type Pin: StatefulOutputPin<Error = Infallible>;

    /// Output pin driving the LED.
    fn output(&mut self) -> &mut Self::Pin;

    /// Set the LED on.
    fn set_on(&mut self) {
        let Ok(()) = self.output().set_high();
    }

    /// Set the LED off.
    fn set_off(&mut self) {
        let Ok(()) = self.output().set_low();
    }

    /// Set the LED on or off.
    fn set(&mut self, on: bool) {
        if on { self.set_on() } else { self.set_off() }
    }

    /// Returns `true` if the LED is on.
    fn is_on(&mut self) -> bool {
        let Ok(high) = self.output().is_set_high();
        high
    }

    /// Toggle the LED state.
    fn toggle(&mut self) {
        let on: bool = self.is_on();
        self.set(!on)
    }
}

macro_rules! led {
    ($name:ident, $pin:ident, $arg:ident, $label:literal, $color:literal) => {
        #[doc = concat!($color, " LED")]
        ///
        #[doc = concat!("Marked as ", $label, " on the PCB")]
        #[derive(Debug)]
        pub struct $name {
            gpio: Output<pins::$pin>,
        }

        impl $name {
            #[doc = concat!("Create a new ", $color, " LED.")]
            ///
            /// The LED is initially off.
            ///
            /// # Example
            ///
            /// ```no_run
            /// use stm32f3348_disco_bsp::{
            ///     hal::{cortex_m, gpio::PortB, pac},
            ///     led::{self, Led},
            /// };
            ///
            /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
            ///
            /// let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
            #[doc = concat!("let mut led = cortex_m::interrupt::free(|cs| led::", stringify!($name), "::new(gpiob.", stringify!($arg), ", cs));")]
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
            type Pin = Output<pins::$pin>;

            fn output(&mut self) -> &mut Self::Pin {
                &mut self.gpio
            }
        }
    };
}

led!(Red, B6, b6, "LD3", "Red");
led!(Blue, B7, b7, "LD6", "Blue");
led!(Orange, B8, b8, "LD4", "Orange");
led!(Green, B9, b9, "LD5", "Green");

/// All four user LEDs.
#[derive(Debug)]
#[allow(missing_docs)]
pub struct Leds {
    pub red: Red,
    pub orange: Orange,
    pub green: Green,
    pub blue: Blue,
}

impl Leds {
    /// Create all four LEDs from port B pins.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3348_disco_bsp::{
    ///     hal::{cortex_m, gpio::PortB, pac},
    ///     led::{Led, Leds},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    /// let mut leds: Leds = cortex_m::interrupt::free(|cs| {
    ///     Leds::new(gpiob.b6, gpiob.b7, gpiob.b8, gpiob.b9, cs)
    /// });
    /// leds.set_all(true);
    /// ```
    pub fn new(
        b6: pins::B6,
        b7: pins::B7,
        b8: pins::B8,
        b9: pins::B9,
        cs: &CriticalSection,
    ) -> Leds {
        Leds {
            red: Red::new(b6, cs),
            blue: Blue::new(b7, cs),
            orange: Orange::new(b8, cs),
            green: Green::new(b9, cs),
        }
    }

    /// Set all LEDs on or off.
    pub fn set_all(&mut self, on: bool) {
        self.red.set(on);
        self.orange.set(on);
        self.green.set(on);
        self.blue.set(on);
    }

    /// Show the low four bits of `n` on the LEDs.
    ///
    /// Bit 0 is red, bit 1 orange, bit 2 green and bit 3 blue, following
    /// the clockwise order on the PCB.
    pub fn show(&mut self, n: u8) {
        self.red.set(n & 0b0001 != 0);
        self.orange.set(n & 0b0010 != 0);
        self.green.set(n & 0b0100 != 0);
        self.blue.set(n & 0b1000 != 0);
    }
}

/// Light the red LED and halt.
///
/// Interrupts are disabled and stay disabled. The GPIOB clock is enabled and
/// PB6 is configured as an output here, so this works whether or not the
/// caller has split port B or created the [`Red`] LED.
///
/// # Example
///
/// ```no_run
/// use stm32f3348_disco_bsp::led;
///
/// fn error_handler<E: core::fmt::Debug>(_e: E) -> ! {
///     led::error_halt()
/// }
/// ```
pub fn error_halt() -> ! {
    cortex_m::interrupt::disable();
    // safety: interrupts are disabled and this never returns, no other code
    // touches RCC or GPIOB afterwards
    let mut dp: pac::Peripherals = unsafe { pac::Peripherals::steal() };
    PortB::enable_clock(&mut dp.RCC);
    let gpiob: PortB = unsafe { PortB::steal() };
    cortex_m::interrupt::free(|cs| Red::new(gpiob.b6, cs).set_on());
    loop {
        cortex_m::asm::wfe();
    }
}
