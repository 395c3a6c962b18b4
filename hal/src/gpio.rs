//! General purpose input-output pins

use crate::pac;
#[cfg(feature = "stm32f334")]
use crate::adc;
use core::ptr::{read_volatile, write_volatile};
use cortex_m::interrupt::CriticalSection;

pub use embedded_hal::digital::v2::PinState;

/// GPIO output types.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    /// Push-pull output.
    PushPull = 0b0,
    /// Open-drain output.
    ///
    /// This is typically used with [`Pull::Up`].
    OpenDrain = 0b1,
}

/// GPIO speeds.
///
/// Refer to the device datasheet for the frequency specifications and the power
/// supply and load conditions for each speed.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// Low speed, 2 MHz.
    Low = 0b00,
    /// Medium speed, 10 MHz.
    Medium = 0b01,
    /// High speed, 50 MHz.
    High = 0b11,
}

/// GPIO pull-up and pull-down.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// No pull-up, no pull-down.
    None = 0b00,
    /// Pull-up.
    Up = 0b01,
    /// Pull-down.
    Down = 0b10,
}

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Pin<const BASE: usize, const N: u8> {}

impl<const BASE: usize, const N: u8> Pin<BASE, N> {
    const MODER: *mut u32 = BASE as *mut u32;
    const OTYPER: *mut u32 = (BASE + 0x4) as *mut u32;
    const OSPEEDR: *mut u32 = (BASE + 0x8) as *mut u32;
    const PUPDR: *mut u32 = (BASE + 0xC) as *mut u32;
    const IDR: *const u32 = (BASE + 0x10) as *const u32;
    const ODR: *const u32 = (BASE + 0x14) as *const u32;
    const BSRR: *mut u32 = (BASE + 0x18) as *mut u32;

    const AF: *mut u32 = (if N > 7 { BASE + 0x24 } else { BASE + 0x20 }) as *mut u32;
    const AF_SHIFT: u8 = if N > 7 { (N - 8) * 4 } else { N * 4 };

    pub(crate) const fn new() -> Pin<BASE, N> {
        Pin {}
    }

    #[inline(always)]
    unsafe fn modify_field(reg: *mut u32, width: u32, shift: u8, val: u32) {
        let mask: u32 = ((1 << width) - 1) << shift;
        unsafe {
            let prev: u32 = read_volatile(reg);
            write_volatile(reg, (prev & !mask) | ((val << shift) & mask));
        }
    }

    #[inline(always)]
    pub(crate) unsafe fn set_mode(&mut self, _cs: &CriticalSection, mode: sealed::Mode) {
        unsafe { Self::modify_field(Self::MODER, 2, N * 2, mode as u32) }
    }

    #[inline(always)]
    pub(crate) unsafe fn set_output_type(&mut self, _cs: &CriticalSection, ot: OutputType) {
        unsafe { Self::modify_field(Self::OTYPER, 1, N, ot as u32) }
    }

    #[inline(always)]
    pub(crate) unsafe fn set_speed(&mut self, _cs: &CriticalSection, speed: Speed) {
        unsafe { Self::modify_field(Self::OSPEEDR, 2, N * 2, speed as u32) }
    }

    #[inline(always)]
    pub(crate) unsafe fn set_pull(&mut self, _cs: &CriticalSection, pull: Pull) {
        unsafe { Self::modify_field(Self::PUPDR, 2, N * 2, pull as u32) }
    }

    #[inline(always)]
    pub(crate) fn input_level(&self) -> PinState {
        PinState::from(unsafe { read_volatile(Self::IDR) } & (1 << N) != 0)
    }

    #[inline(always)]
    pub(crate) fn output_level(&self) -> PinState {
        PinState::from(unsafe { read_volatile(Self::ODR) } & (1 << N) != 0)
    }

    #[inline(always)]
    pub(crate) fn set_output_level(&mut self, level: PinState) {
        let val: u32 = match level {
            PinState::Low => 1 << (N + 16),
            PinState::High => 1 << N,
        };
        unsafe { write_volatile(Self::BSRR, val) }
    }

    #[inline(always)]
    pub(crate) unsafe fn set_alternate_function(&mut self, cs: &CriticalSection, af: u8) {
        unsafe {
            self.set_mode(cs, sealed::Mode::Alternate);
            Self::modify_field(Self::AF, 4, Self::AF_SHIFT, u32::from(af));
        }
    }
}

pub(crate) mod sealed {
    #[cfg(feature = "stm32f334")]
    use super::adc;
    use super::{CriticalSection, OutputType, PinState, Pull, Speed};

    /// GPIO modes.
    #[repr(u8)]
    pub enum Mode {
        Input = 0b00,
        Output = 0b01,
        Alternate = 0b10,
        Analog = 0b11,
    }

    /// This is the same methods as Pin, but in a trait so that the individual
    /// Pin structures can implement it in a light wrapper without putting a ton
    /// of code into the macro which will result in longer compile times.
    pub trait PinOps {
        unsafe fn steal() -> Self;
        unsafe fn set_mode(&mut self, cs: &CriticalSection, mode: Mode);
        unsafe fn set_output_type(&mut self, cs: &CriticalSection, ot: OutputType);
        unsafe fn set_speed(&mut self, cs: &CriticalSection, speed: Speed);
        unsafe fn set_pull(&mut self, cs: &CriticalSection, pull: Pull);
        fn input_level(&self) -> PinState;
        fn output_level(&self) -> PinState;
        fn set_output_level(&mut self, level: PinState);
        unsafe fn set_alternate_function(&mut self, cs: &CriticalSection, af: u8);
    }

    macro_rules! af_trait {
        ($trt:ident, $method:ident) => {
            pub trait $trt {
                fn $method(&mut self, cs: &CriticalSection);
            }
        };
    }

    af_trait!(Spi1Mosi, set_spi1_mosi_af);
    af_trait!(Spi1Miso, set_spi1_miso_af);
    af_trait!(Spi1Sck, set_spi1_sck_af);
    #[cfg(feature = "stm32f373")]
    af_trait!(Spi3Mosi, set_spi3_mosi_af);
    #[cfg(feature = "stm32f373")]
    af_trait!(Spi3Miso, set_spi3_miso_af);
    #[cfg(feature = "stm32f373")]
    af_trait!(Spi3Sck, set_spi3_sck_af);
    af_trait!(I2c1Sda, set_i2c1_sda_af);
    af_trait!(I2c1Scl, set_i2c1_scl_af);
    af_trait!(I2c2Sda, set_i2c2_sda_af);
    af_trait!(I2c2Scl, set_i2c2_scl_af);
    af_trait!(Uart1Tx, set_uart1_tx_af);
    af_trait!(Uart1Rx, set_uart1_rx_af);
    af_trait!(Uart2Tx, set_uart2_tx_af);
    af_trait!(Uart2Rx, set_uart2_rx_af);

    af_trait!(HrtimCha1, set_hrtim_cha1_af);
    af_trait!(HrtimCha2, set_hrtim_cha2_af);
    af_trait!(HrtimChb1, set_hrtim_chb1_af);
    af_trait!(HrtimChb2, set_hrtim_chb2_af);
    af_trait!(HrtimChc1, set_hrtim_chc1_af);
    af_trait!(HrtimChc2, set_hrtim_chc2_af);
    af_trait!(HrtimChd1, set_hrtim_chd1_af);
    af_trait!(HrtimChd2, set_hrtim_chd2_af);
    af_trait!(HrtimChe1, set_hrtim_che1_af);
    af_trait!(HrtimChe2, set_hrtim_che2_af);
    af_trait!(HrtimFlt1, set_hrtim_flt1_af);
    af_trait!(HrtimFlt2, set_hrtim_flt2_af);
    af_trait!(HrtimFlt3, set_hrtim_flt3_af);
    af_trait!(HrtimFlt4, set_hrtim_flt4_af);
    af_trait!(HrtimFlt5, set_hrtim_flt5_af);

    af_trait!(Comp2Out, set_comp2_out_af);
    af_trait!(Comp4Out, set_comp4_out_af);
    af_trait!(Comp6Out, set_comp6_out_af);

    /// Indicate a GPIO pin can be sampled by the ADC
    #[cfg(feature = "stm32f334")]
    pub trait AdcCh {
        const ADC_CH: adc::Ch;
    }

    /// EXTI line and SYSCFG port selection of a pin.
    pub trait ExtiLine {
        const LINE: u8;
        const PORT: u8;
    }
}

/// GPIO pins
pub mod pins {
    const GPIOA_BASE: usize = 0x4800_0000;
    const GPIOB_BASE: usize = 0x4800_0400;
    const GPIOC_BASE: usize = 0x4800_0800;
    const GPIOD_BASE: usize = 0x4800_0C00;
    #[cfg(feature = "stm32f373")]
    const GPIOE_BASE: usize = 0x4800_1000;
    const GPIOF_BASE: usize = 0x4800_1400;

    #[cfg(feature = "stm32f334")]
    use super::adc;
    use super::{CriticalSection, OutputType, Pin, PinState, Pull, Speed};

    macro_rules! gpio_struct {
        ($name:ident, $base:expr, $port:expr, $n:expr, $doc:expr) => {
            #[doc=$doc]
            #[derive(Debug)]
            #[cfg_attr(feature = "defmt", derive(defmt::Format))]
            pub struct $name {
                pin: Pin<$base, $n>,
            }

            impl $name {
                pub(crate) const fn new() -> Self {
                    $name { pin: Pin::new() }
                }
            }

            impl super::sealed::ExtiLine for $name {
                const LINE: u8 = $n;
                const PORT: u8 = $port;
            }

            impl super::Exti for $name {}

            impl super::sealed::PinOps for $name {
                #[inline(always)]
                unsafe fn steal() -> Self {
                    Self::new()
                }

                #[inline(always)]
                unsafe fn set_mode(&mut self, cs: &CriticalSection, mode: super::sealed::Mode) {
                    unsafe { self.pin.set_mode(cs, mode) }
                }

                #[inline(always)]
                unsafe fn set_output_type(&mut self, cs: &CriticalSection, ot: OutputType) {
                    unsafe { self.pin.set_output_type(cs, ot) }
                }

                #[inline(always)]
                unsafe fn set_speed(&mut self, cs: &CriticalSection, speed: Speed) {
                    unsafe { self.pin.set_speed(cs, speed) }
                }

                #[inline(always)]
                unsafe fn set_pull(&mut self, cs: &CriticalSection, pull: Pull) {
                    unsafe { self.pin.set_pull(cs, pull) }
                }

                #[inline(always)]
                fn input_level(&self) -> PinState {
                    self.pin.input_level()
                }

                #[inline(always)]
                fn output_level(&self) -> PinState {
                    self.pin.output_level()
                }

                #[inline(always)]
                fn set_output_level(&mut self, level: PinState) {
                    self.pin.set_output_level(level)
                }

                #[inline(always)]
                unsafe fn set_alternate_function(&mut self, cs: &CriticalSection, af: u8) {
                    unsafe { self.pin.set_alternate_function(cs, af) }
                }
            }
        };
    }

    macro_rules! gpio_structs {
        ($base:expr, $port:expr, $letter:literal, [$($name:ident: $n:literal),+ $(,)?]) => {
            $(
                gpio_struct!($name, $base, $port, $n, concat!("Port ", $letter, " pin ", $n));
            )+
        };
    }

    gpio_structs!(GPIOA_BASE, 0, "A", [
        A0: 0, A1: 1, A2: 2, A3: 3, A4: 4, A5: 5, A6: 6, A7: 7,
        A8: 8, A9: 9, A10: 10, A11: 11, A12: 12, A13: 13, A14: 14, A15: 15,
    ]);
    gpio_structs!(GPIOB_BASE, 1, "B", [
        B0: 0, B1: 1, B2: 2, B3: 3, B4: 4, B5: 5, B6: 6, B7: 7,
        B8: 8, B9: 9, B10: 10, B11: 11, B12: 12, B13: 13, B14: 14, B15: 15,
    ]);
    gpio_structs!(GPIOC_BASE, 2, "C", [
        C0: 0, C1: 1, C2: 2, C3: 3, C4: 4, C5: 5, C6: 6, C7: 7,
        C8: 8, C9: 9, C10: 10, C11: 11, C12: 12, C13: 13, C14: 14, C15: 15,
    ]);
    gpio_structs!(GPIOD_BASE, 3, "D", [D2: 2]);
    #[cfg(feature = "stm32f373")]
    gpio_structs!(GPIOD_BASE, 3, "D", [
        D0: 0, D1: 1, D3: 3, D4: 4, D5: 5, D6: 6, D7: 7,
        D8: 8, D9: 9, D10: 10, D11: 11, D12: 12, D13: 13, D14: 14, D15: 15,
    ]);
    #[cfg(feature = "stm32f373")]
    gpio_structs!(GPIOE_BASE, 4, "E", [
        E0: 0, E1: 1, E2: 2, E3: 3, E4: 4, E5: 5, E6: 6, E7: 7,
        E8: 8, E9: 9, E10: 10, E11: 11, E12: 12, E13: 13, E14: 14, E15: 15,
    ]);
    gpio_structs!(GPIOF_BASE, 5, "F", [F0: 0, F1: 1]);
    #[cfg(feature = "stm32f373")]
    gpio_structs!(GPIOF_BASE, 5, "F", [F6: 6, F7: 7]);

    macro_rules! impl_af {
        ($trt:ident, $gpio:ident, $method:ident, $num:expr) => {
            impl crate::gpio::sealed::$trt for $gpio {
                #[inline(always)]
                fn $method(&mut self, cs: &CriticalSection) {
                    unsafe { self.pin.set_alternate_function(cs, $num) }
                }
            }
        };
    }

    impl_af!(I2c1Scl, B6, set_i2c1_scl_af, 4);
    impl_af!(I2c1Sda, B7, set_i2c1_sda_af, 4);
    impl_af!(I2c1Scl, B8, set_i2c1_scl_af, 4);
    impl_af!(I2c1Sda, B9, set_i2c1_sda_af, 4);
    impl_af!(I2c1Sda, A14, set_i2c1_sda_af, 4);
    impl_af!(I2c1Scl, A15, set_i2c1_scl_af, 4);
    #[cfg(feature = "stm32f373")]
    impl_af!(I2c2Scl, A9, set_i2c2_scl_af, 4);
    #[cfg(feature = "stm32f373")]
    impl_af!(I2c2Sda, A10, set_i2c2_sda_af, 4);
    #[cfg(feature = "stm32f373")]
    impl_af!(I2c2Scl, F6, set_i2c2_scl_af, 4);
    #[cfg(feature = "stm32f373")]
    impl_af!(I2c2Sda, F7, set_i2c2_sda_af, 4);

    impl_af!(Spi1Sck, A5, set_spi1_sck_af, 5);
    impl_af!(Spi1Miso, A6, set_spi1_miso_af, 5);
    impl_af!(Spi1Mosi, A7, set_spi1_mosi_af, 5);
    impl_af!(Spi1Sck, B3, set_spi1_sck_af, 5);
    impl_af!(Spi1Miso, B4, set_spi1_miso_af, 5);
    impl_af!(Spi1Mosi, B5, set_spi1_mosi_af, 5);
    #[cfg(feature = "stm32f373")]
    impl_af!(Spi3Sck, C10, set_spi3_sck_af, 6);
    #[cfg(feature = "stm32f373")]
    impl_af!(Spi3Miso, C11, set_spi3_miso_af, 6);
    #[cfg(feature = "stm32f373")]
    impl_af!(Spi3Mosi, C12, set_spi3_mosi_af, 6);

    impl_af!(Uart2Tx, A2, set_uart2_tx_af, 7);
    impl_af!(Uart2Rx, A3, set_uart2_rx_af, 7);
    impl_af!(Uart1Tx, A9, set_uart1_tx_af, 7);
    impl_af!(Uart1Rx, A10, set_uart1_rx_af, 7);
    impl_af!(Uart2Tx, A14, set_uart2_tx_af, 7);
    impl_af!(Uart2Rx, A15, set_uart2_rx_af, 7);
    impl_af!(Uart2Tx, B3, set_uart2_tx_af, 7);
    impl_af!(Uart2Rx, B4, set_uart2_rx_af, 7);
    impl_af!(Uart1Tx, B6, set_uart1_tx_af, 7);
    impl_af!(Uart1Rx, B7, set_uart1_rx_af, 7);
    impl_af!(Uart1Tx, C4, set_uart1_tx_af, 7);
    impl_af!(Uart1Rx, C5, set_uart1_rx_af, 7);

    #[cfg(feature = "stm32f334")]
    mod f334 {
        use super::*;

        impl_af!(HrtimCha1, A8, set_hrtim_cha1_af, 13);
        impl_af!(HrtimCha2, A9, set_hrtim_cha2_af, 13);
        impl_af!(HrtimChb1, A10, set_hrtim_chb1_af, 13);
        impl_af!(HrtimChb2, A11, set_hrtim_chb2_af, 13);
        impl_af!(HrtimChc1, B12, set_hrtim_chc1_af, 13);
        impl_af!(HrtimChc2, B13, set_hrtim_chc2_af, 13);
        impl_af!(HrtimChd1, B14, set_hrtim_chd1_af, 13);
        impl_af!(HrtimChd2, B15, set_hrtim_chd2_af, 13);
        impl_af!(HrtimChe1, C8, set_hrtim_che1_af, 3);
        impl_af!(HrtimChe2, C9, set_hrtim_che2_af, 3);

        impl_af!(HrtimFlt1, A12, set_hrtim_flt1_af, 13);
        impl_af!(HrtimFlt2, A15, set_hrtim_flt2_af, 13);
        impl_af!(HrtimFlt3, B10, set_hrtim_flt3_af, 13);
        impl_af!(HrtimFlt4, B11, set_hrtim_flt4_af, 13);
        impl_af!(HrtimFlt5, C7, set_hrtim_flt5_af, 3);

        impl_af!(Comp2Out, A2, set_comp2_out_af, 8);
        impl_af!(Comp2Out, A12, set_comp2_out_af, 8);
        impl_af!(Comp4Out, B1, set_comp4_out_af, 8);
        impl_af!(Comp6Out, A10, set_comp6_out_af, 8);
        impl_af!(Comp6Out, C6, set_comp6_out_af, 7);
    }

    // keep the trait separate from the pin so that users cant use the ADC_CH
    // but are unable to implement the sealed trait themselves
    #[cfg(feature = "stm32f334")]
    macro_rules! impl_adc_ch {
        ($pin:ident, $ch:expr) => {
            impl $pin {
                /// Analog to digital converter channel when this pin is
                /// configured as [`Analog`](crate::gpio::Analog).
                pub const ADC_CH: adc::Ch = $ch;
            }

            impl crate::gpio::sealed::AdcCh for $pin {
                const ADC_CH: adc::Ch = Self::ADC_CH;
            }
        };
    }

    #[cfg(feature = "stm32f334")]
    mod adc_ch {
        use super::*;

        impl_adc_ch!(A0, adc::Ch::In1);
        impl_adc_ch!(A1, adc::Ch::In2);
        impl_adc_ch!(A2, adc::Ch::In3);
        impl_adc_ch!(A3, adc::Ch::In4);
        impl_adc_ch!(C0, adc::Ch::In6);
        impl_adc_ch!(C1, adc::Ch::In7);
        impl_adc_ch!(C2, adc::Ch::In8);
        impl_adc_ch!(C3, adc::Ch::In9);
        impl_adc_ch!(B0, adc::Ch::In11);
        impl_adc_ch!(B1, adc::Ch::In12);
        impl_adc_ch!(B13, adc::Ch::In13);
        impl_adc_ch!(B11, adc::Ch::In14);
        impl_adc_ch!(B15, adc::Ch::In15);
    }
}

macro_rules! port {
    (
        $Port:ident, $GPIO:ident, $en:expr, $letter:literal,
        [$($(#[$attr:meta])* $field:ident: $pin:ident),+ $(,)?]
    ) => {
        #[doc = concat!("Port ", $letter, " GPIOs")]
        #[derive(Debug)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        #[allow(missing_docs)]
        pub struct $Port {
            $($(#[$attr])* pub $field: pins::$pin,)+
        }

        impl $Port {
            const GPIOS: $Port = $Port {
                $($(#[$attr])* $field: pins::$pin::new(),)+
            };

            #[doc = concat!("Reset GPIO port ", $letter, " and split the port into individual pins.")]
            ///
            /// This will enable clocks and reset the GPIO port.
            #[allow(unused_variables)]
            pub fn split(gpio: pac::$GPIO, rcc: &mut pac::RCC) -> Self {
                Self::enable_clock(rcc);
                crate::rcc::en::ahb_reset(rcc, $en);
                Self::GPIOS
            }

            #[doc = concat!("Steal the port ", $letter, " GPIOs from whatever is currently using them.")]
            ///
            /// This will **not** initialize the GPIOs (unlike `split`).
            ///
            /// # Safety
            ///
            /// This will create new GPIOs, bypassing the singleton checks that normally
            /// occur.
            /// You are responsible for ensuring that the driver has exclusive access to
            /// the GPIOs.
            /// You are also responsible for ensuring the GPIO peripheral has been
            /// setup correctly.
            pub unsafe fn steal() -> Self {
                Self::GPIOS
            }

            #[doc = concat!("Disable the GPIO", $letter, " clock.")]
            ///
            /// # Safety
            ///
            /// 1. You cannot use any pin of this port while the clock is disabled.
            /// 2. You are responsible for re-enabling the clock before resuming use
            ///    of any pin of this port.
            pub unsafe fn disable_clock(rcc: &mut pac::RCC) {
                crate::rcc::en::ahb_disable(rcc, $en)
            }

            #[doc = concat!("Enable the GPIO", $letter, " clock.")]
            pub fn enable_clock(rcc: &mut pac::RCC) {
                crate::rcc::en::ahb(rcc, $en)
            }
        }
    };
}

port!(PortA, GPIOA, crate::rcc::en::AHB_IOPA, "A", [
    a0: A0, a1: A1, a2: A2, a3: A3, a4: A4, a5: A5, a6: A6, a7: A7,
    a8: A8, a9: A9, a10: A10, a11: A11, a12: A12, a13: A13, a14: A14, a15: A15,
]);
port!(PortB, GPIOB, crate::rcc::en::AHB_IOPB, "B", [
    b0: B0, b1: B1, b2: B2, b3: B3, b4: B4, b5: B5, b6: B6, b7: B7,
    b8: B8, b9: B9, b10: B10, b11: B11, b12: B12, b13: B13, b14: B14, b15: B15,
]);
port!(PortC, GPIOC, crate::rcc::en::AHB_IOPC, "C", [
    c0: C0, c1: C1, c2: C2, c3: C3, c4: C4, c5: C5, c6: C6, c7: C7,
    c8: C8, c9: C9, c10: C10, c11: C11, c12: C12, c13: C13, c14: C14, c15: C15,
]);
port!(PortD, GPIOD, crate::rcc::en::AHB_IOPD, "D", [
    #[cfg(feature = "stm32f373")] d0: D0,
    #[cfg(feature = "stm32f373")] d1: D1,
    d2: D2,
    #[cfg(feature = "stm32f373")] d3: D3,
    #[cfg(feature = "stm32f373")] d4: D4,
    #[cfg(feature = "stm32f373")] d5: D5,
    #[cfg(feature = "stm32f373")] d6: D6,
    #[cfg(feature = "stm32f373")] d7: D7,
    #[cfg(feature = "stm32f373")] d8: D8,
    #[cfg(feature = "stm32f373")] d9: D9,
    #[cfg(feature = "stm32f373")] d10: D10,
    #[cfg(feature = "stm32f373")] d11: D11,
    #[cfg(feature = "stm32f373")] d12: D12,
    #[cfg(feature = "stm32f373")] d13: D13,
    #[cfg(feature = "stm32f373")] d14: D14,
    #[cfg(feature = "stm32f373")] d15: D15,
]);
#[cfg(feature = "stm32f373")]
port!(PortE, GPIOE, crate::rcc::en::AHB_IOPE, "E", [
    e0: E0, e1: E1, e2: E2, e3: E3, e4: E4, e5: E5, e6: E6, e7: E7,
    e8: E8, e9: E9, e10: E10, e11: E11, e12: E12, e13: E13, e14: E14, e15: E15,
]);
port!(PortF, GPIOF, crate::rcc::en::AHB_IOPF, "F", [
    f0: F0,
    f1: F1,
    #[cfg(feature = "stm32f373")] f6: F6,
    #[cfg(feature = "stm32f373")] f7: F7,
]);

/// Output pin arguments.
///
/// Argument of [`Output::new`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct OutputArgs {
    /// Output speed.
    pub speed: Speed,
    /// Initial output level.
    pub level: PinState,
    /// Output type.
    pub ot: OutputType,
    /// IO pull configuration.
    ///
    /// This is only used if the output type is [`OutputType::OpenDrain`].
    pub pull: Pull,
}

impl OutputArgs {
    /// Create a new `OutputArgs` struct.
    ///
    /// This is the same as `default`, but in a `const` fn.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::gpio::OutputArgs;
    ///
    /// assert_eq!(OutputArgs::new(), OutputArgs::default());
    /// ```
    pub const fn new() -> Self {
        OutputArgs {
            speed: Speed::High,
            level: PinState::Low,
            ot: OutputType::PushPull,
            pull: Pull::None,
        }
    }
}

impl Default for OutputArgs {
    fn default() -> Self {
        Self::new()
    }
}

/// Output pin.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Output<P> {
    pin: P,
}

impl<P> Output<P>
where
    P: sealed::PinOps,
{
    /// Create a new output pin from a GPIO.
    ///
    /// # Example
    ///
    /// Configure GPIO B6 as an output.
    /// This is the red LED on the STM32F3348-DISCO.
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     cortex_m,
    ///     gpio::{self, pins, Output, PortB},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// const OUTPUT_ARGS: gpio::OutputArgs = gpio::OutputArgs {
    ///     level: gpio::PinState::Low,
    ///     speed: gpio::Speed::High,
    ///     ot: gpio::OutputType::PushPull,
    ///     pull: gpio::Pull::None,
    /// };
    ///
    /// let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    /// let mut b6: Output<pins::B6> =
    ///     cortex_m::interrupt::free(|cs| Output::new(gpiob.b6, &OUTPUT_ARGS, cs));
    /// ```
    pub fn new(mut pin: P, args: &OutputArgs, cs: &CriticalSection) -> Self {
        unsafe {
            pin.set_output_type(cs, args.ot);
            if args.ot == OutputType::OpenDrain {
                pin.set_pull(cs, args.pull)
            } else {
                pin.set_pull(cs, Pull::None)
            }
            pin.set_speed(cs, args.speed);
            pin.set_output_level(args.level);
            pin.set_mode(cs, sealed::Mode::Output);
        }
        Output { pin }
    }

    /// Create a new output pin from a GPIO using the default settings.
    pub fn default(pin: P, cs: &CriticalSection) -> Self {
        Self::new(pin, &OutputArgs::new(), cs)
    }

    /// Steal the output GPIO from whatever is currently using it.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the GPIO has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. You are responsible for setting up the GPIO correctly.
    ///    No setup will occur when using this method.
    pub unsafe fn steal() -> Self {
        Output {
            pin: unsafe { P::steal() },
        }
    }

    /// Free the GPIO pin.
    pub fn free(self) -> P {
        self.pin
    }

    /// Set the GPIO output level.
    ///
    /// This is the same as the `OutputPin` trait from the embedded hal, but
    /// without the `Infallible` result types.
    pub fn set_level(&mut self, level: PinState) {
        self.pin.set_output_level(level)
    }

    /// Set the GPIO output level high.
    pub fn set_level_high(&mut self) {
        self.set_level(PinState::High)
    }

    /// Set the GPIO output level low.
    pub fn set_level_low(&mut self) {
        self.set_level(PinState::Low)
    }

    /// Get the current GPIO output level.
    ///
    /// # Example
    ///
    /// Toggle a GPIO pin.
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     cortex_m,
    ///     gpio::{pins, Output, PortB},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    /// let mut b9: Output<pins::B9> = cortex_m::interrupt::free(|cs| Output::default(gpiob.b9, cs));
    /// b9.set_level(!b9.level());
    /// ```
    pub fn level(&self) -> PinState {
        self.pin.output_level()
    }
}

impl<P> embedded_hal::digital::v2::OutputPin for Output<P>
where
    P: sealed::PinOps,
{
    type Error = core::convert::Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_output_level(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_output_level(PinState::High);
        Ok(())
    }
}

impl<P> embedded_hal::digital::v2::StatefulOutputPin for Output<P>
where
    P: sealed::PinOps,
{
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.output_level() == PinState::High)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.output_level() == PinState::Low)
    }
}

impl<P: sealed::PinOps> embedded_hal::digital::v2::toggleable::Default for Output<P> {}

/// Input pin
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Input<P> {
    pin: P,
}

impl<P> Input<P>
where
    P: sealed::PinOps,
{
    /// Create a new input pin from a GPIO.
    ///
    /// # Example
    ///
    /// Configure GPIO A0 as an input.
    /// This is the user button on the STM32F3348-DISCO.
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     cortex_m,
    ///     gpio::{pins, Input, PortA, Pull},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    /// let a0: Input<pins::A0> = cortex_m::interrupt::free(|cs| Input::new(gpioa.a0, Pull::None, cs));
    /// ```
    pub fn new(mut pin: P, pull: Pull, cs: &CriticalSection) -> Self {
        unsafe {
            pin.set_pull(cs, pull);
            pin.set_output_type(cs, OutputType::PushPull);
            pin.set_mode(cs, sealed::Mode::Input);
        }
        Input { pin }
    }

    /// Create a new input pin from a GPIO with default settings.
    pub fn default(pin: P, cs: &CriticalSection) -> Self {
        Self::new(pin, Pull::None, cs)
    }

    /// Steal the input GPIO from whatever is currently using it.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the GPIO has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. You are responsible for setting up the GPIO correctly.
    ///    No setup will occur when using this method.
    pub unsafe fn steal() -> Self {
        Input {
            pin: unsafe { P::steal() },
        }
    }

    /// Free the GPIO pin.
    pub fn free(self) -> P {
        self.pin
    }

    /// Get the input level.
    pub fn level(&self) -> PinState {
        self.pin.input_level()
    }
}

impl<P> embedded_hal::digital::v2::InputPin for Input<P>
where
    P: sealed::PinOps,
{
    type Error = core::convert::Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.input_level() == PinState::High)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.pin.input_level() == PinState::Low)
    }
}

/// Analog pin
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Analog<P> {
    pin: P,
}

impl<P> Analog<P>
where
    P: sealed::PinOps,
{
    /// Create a new analog pin from a GPIO.
    ///
    /// Analog mode is also the mode for comparator, operational amplifier and
    /// SDADC inputs.
    ///
    /// # Example
    ///
    /// Configure GPIO A1 as an analog pin.
    /// This is the VIN sense of the buck-boost stage on the STM32F3348-DISCO.
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     cortex_m,
    ///     gpio::{pins, Analog, PortA},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    /// let a1: Analog<pins::A1> = cortex_m::interrupt::free(|cs| Analog::new(gpioa.a1, cs));
    /// ```
    pub fn new(mut pin: P, cs: &CriticalSection) -> Self {
        unsafe {
            pin.set_pull(cs, Pull::None);
            pin.set_mode(cs, sealed::Mode::Analog);
        }
        Analog { pin }
    }

    /// Free the GPIO pin.
    pub fn free(self) -> P {
        self.pin
    }
}

#[cfg(feature = "stm32f334")]
impl<P> Analog<P>
where
    P: sealed::PinOps + sealed::AdcCh,
{
    /// Analog to digital converter channel.
    pub const ADC_CH: adc::Ch = P::ADC_CH;
}

/// Pin owned by a peripheral signal through an alternate function.
///
/// Drivers such as [`I2c1`](crate::i2c::I2c1) configure their own pins,
/// this is for signals consumed by peripherals that do not take pins, such as
/// the HRTIM outputs and fault inputs.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alternate<P> {
    pin: P,
}

impl<P> Alternate<P>
where
    P: sealed::PinOps,
{
    /// Free the GPIO pin.
    ///
    /// The pin is left in alternate function mode.
    pub fn free(self) -> P {
        self.pin
    }

    /// Steal the alternate function GPIO from whatever is currently using it.
    ///
    /// # Safety
    ///
    /// 1. Ensure that the code stealing the GPIO has exclusive access to the
    ///    peripheral. Singleton checks are bypassed with this method.
    /// 2. You are responsible for setting up the GPIO correctly.
    ///    No setup will occur when using this method.
    pub unsafe fn steal() -> Self {
        Alternate {
            pin: unsafe { P::steal() },
        }
    }
}

macro_rules! alternate_ctor {
    ($trt:ident, $method:ident, $ctor:ident, $speed:expr, $doc:literal) => {
        impl<P> Alternate<P>
        where
            P: sealed::PinOps + sealed::$trt,
        {
            #[doc = concat!("Configure the pin as ", $doc, ".")]
            pub fn $ctor(mut pin: P, cs: &CriticalSection) -> Self {
                unsafe {
                    pin.set_output_type(cs, OutputType::PushPull);
                    pin.set_pull(cs, Pull::None);
                    pin.set_speed(cs, $speed);
                }
                pin.$method(cs);
                Alternate { pin }
            }
        }
    };
}

alternate_ctor!(HrtimCha1, set_hrtim_cha1_af, hrtim_cha1, Speed::High, "HRTIM output TA1");
alternate_ctor!(HrtimCha2, set_hrtim_cha2_af, hrtim_cha2, Speed::High, "HRTIM output TA2");
alternate_ctor!(HrtimChb1, set_hrtim_chb1_af, hrtim_chb1, Speed::High, "HRTIM output TB1");
alternate_ctor!(HrtimChb2, set_hrtim_chb2_af, hrtim_chb2, Speed::High, "HRTIM output TB2");
alternate_ctor!(HrtimChc1, set_hrtim_chc1_af, hrtim_chc1, Speed::High, "HRTIM output TC1");
alternate_ctor!(HrtimChc2, set_hrtim_chc2_af, hrtim_chc2, Speed::High, "HRTIM output TC2");
alternate_ctor!(HrtimChd1, set_hrtim_chd1_af, hrtim_chd1, Speed::High, "HRTIM output TD1");
alternate_ctor!(HrtimChd2, set_hrtim_chd2_af, hrtim_chd2, Speed::High, "HRTIM output TD2");
alternate_ctor!(HrtimChe1, set_hrtim_che1_af, hrtim_che1, Speed::High, "HRTIM output TE1");
alternate_ctor!(HrtimChe2, set_hrtim_che2_af, hrtim_che2, Speed::High, "HRTIM output TE2");
alternate_ctor!(HrtimFlt1, set_hrtim_flt1_af, hrtim_flt1, Speed::Low, "HRTIM fault input 1");
alternate_ctor!(HrtimFlt2, set_hrtim_flt2_af, hrtim_flt2, Speed::Low, "HRTIM fault input 2");
alternate_ctor!(HrtimFlt3, set_hrtim_flt3_af, hrtim_flt3, Speed::Low, "HRTIM fault input 3");
alternate_ctor!(HrtimFlt4, set_hrtim_flt4_af, hrtim_flt4, Speed::Low, "HRTIM fault input 4");
alternate_ctor!(HrtimFlt5, set_hrtim_flt5_af, hrtim_flt5, Speed::Low, "HRTIM fault input 5");
alternate_ctor!(Comp2Out, set_comp2_out_af, comp2_out, Speed::Medium, "COMP2 output");
alternate_ctor!(Comp4Out, set_comp4_out_af, comp4_out, Speed::Medium, "COMP4 output");
alternate_ctor!(Comp6Out, set_comp6_out_af, comp6_out, Speed::Medium, "COMP6 output");

/// EXTI trigger edges.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExtiTrg {
    /// Rising edge.
    Rising,
    /// Falling edge.
    Falling,
    /// Both rising and falling edges.
    Both,
}

const SYSCFG_EXTICR1: usize = 0x4001_0008;
const EXTI_IMR1: *mut u32 = 0x4001_0400 as *mut u32;
const EXTI_RTSR1: *mut u32 = 0x4001_0408 as *mut u32;
const EXTI_FTSR1: *mut u32 = 0x4001_040C as *mut u32;
const EXTI_PR1: *mut u32 = 0x4001_0414 as *mut u32;

/// Map an EXTI line to the SYSCFG EXTICR register and bit shift.
pub(crate) const fn exticr_location(line: u8) -> (usize, u8) {
    (
        SYSCFG_EXTICR1 + ((line as usize) / 4) * 4,
        (line % 4) * 4,
    )
}

/// External interrupt configuration for GPIO pins.
///
/// The port singletons (`pac::SYSCFG`, `pac::EXTI`) are taken by reference to
/// prove exclusive access, the registers are accessed by address because the
/// EXTI register names differ between F3 PACs.
pub trait Exti: sealed::ExtiLine {
    /// EXTI line of the pin.
    const EXTI_LINE: u8 = <Self as sealed::ExtiLine>::LINE;

    /// Route the pin to its EXTI line and set the trigger edges.
    ///
    /// This does **not** unmask the line, see [`unmask`](Self::unmask).
    /// The SYSCFG clock must be enabled.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3xx_hal::{
    ///     gpio::{pins, Exti, ExtiTrg},
    ///     pac,
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    /// pins::A0::setup_exti(&mut dp.SYSCFG, &mut dp.EXTI, ExtiTrg::Rising);
    /// pins::A0::unmask(&mut dp.EXTI);
    /// ```
    #[allow(unused_variables)]
    fn setup_exti(syscfg: &mut pac::SYSCFG, exti: &mut pac::EXTI, trg: ExtiTrg) {
        let line: u8 = Self::LINE;
        let (reg, shift) = exticr_location(line);
        let rtsr: bool = matches!(trg, ExtiTrg::Rising | ExtiTrg::Both);
        let ftsr: bool = matches!(trg, ExtiTrg::Falling | ExtiTrg::Both);
        cortex_m::interrupt::free(|_| unsafe {
            let reg: *mut u32 = reg as *mut u32;
            let cr: u32 = read_volatile(reg) & !(0xF << shift);
            write_volatile(reg, cr | (u32::from(Self::PORT) << shift));

            let r: u32 = read_volatile(EXTI_RTSR1) & !(1 << line);
            write_volatile(EXTI_RTSR1, r | (u32::from(rtsr) << line));
            let f: u32 = read_volatile(EXTI_FTSR1) & !(1 << line);
            write_volatile(EXTI_FTSR1, f | (u32::from(ftsr) << line));
        })
    }

    /// Unmask the EXTI line.
    ///
    /// This will **not** unmask the IRQ in the NVIC.
    #[allow(unused_variables)]
    fn unmask(exti: &mut pac::EXTI) {
        cortex_m::interrupt::free(|_| unsafe {
            write_volatile(EXTI_IMR1, read_volatile(EXTI_IMR1) | (1 << Self::LINE))
        })
    }

    /// Mask the EXTI line.
    #[allow(unused_variables)]
    fn mask(exti: &mut pac::EXTI) {
        cortex_m::interrupt::free(|_| unsafe {
            write_volatile(EXTI_IMR1, read_volatile(EXTI_IMR1) & !(1 << Self::LINE))
        })
    }

    /// Returns `true` if the EXTI line is pending.
    #[allow(unused_variables)]
    fn is_pending(exti: &pac::EXTI) -> bool {
        unsafe { read_volatile(EXTI_PR1) & (1 << Self::LINE) != 0 }
    }

    /// Clear a pending EXTI line.
    ///
    /// The pending register is write-one-to-clear, this can be called from an
    /// interrupt handler with a stolen `EXTI`.
    #[allow(unused_variables)]
    fn clear_exti(exti: &mut pac::EXTI) {
        unsafe { write_volatile(EXTI_PR1, 1 << Self::LINE) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exticr_mapping() {
        assert_eq!(exticr_location(0), (0x4001_0008, 0));
        assert_eq!(exticr_location(3), (0x4001_0008, 12));
        assert_eq!(exticr_location(6), (0x4001_000C, 8));
        assert_eq!(exticr_location(13), (0x4001_0014, 4));
    }

    #[test]
    fn exti_ports() {
        use sealed::ExtiLine;
        assert_eq!(pins::A0::PORT, 0);
        assert_eq!(pins::C13::PORT, 2);
        assert_eq!(pins::C13::LINE, 13);
        assert_eq!(pins::F1::PORT, 5);
        assert_eq!(<pins::B6 as Exti>::EXTI_LINE, 6);
    }

    #[test]
    fn default_output_args() {
        let args = OutputArgs::default();
        assert_eq!(args.level, PinState::Low);
        assert_eq!(args.ot, OutputType::PushPull);
    }
}
