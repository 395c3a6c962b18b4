//! Universal synchronous/asynchronous receiver transmitter
//!
//! 8 data bits, no parity, one stop bit, oversampling by 16.
use crate::{
    gpio::{self},
    pac, rcc,
};
use cortex_m::interrupt::CriticalSection;
use embedded_hal::prelude::*;

typestate!(NoRx, "no RX on a generic UART structure");
typestate!(NoTx, "no TX on a generic UART structure");

const CR1_UE: u32 = 1 << 0;
const CR1_RE: u32 = 1 << 2;
const CR1_TE: u32 = 1 << 3;

const ISR_PE: u32 = 1 << 0;
const ISR_FE: u32 = 1 << 1;
const ISR_NF: u32 = 1 << 2;
const ISR_ORE: u32 = 1 << 3;
const ISR_RXNE: u32 = 1 << 5;
const ISR_TC: u32 = 1 << 6;
const ISR_TXE: u32 = 1 << 7;
const ISR_ERR: u32 = ISR_PE | ISR_FE | ISR_NF | ISR_ORE;

/// UART kernel clock selection.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Clk {
    /// PCLK
    PClk = 0b00,
    /// System clock
    Sysclk = 0b01,
    /// LSE clock
    Lse = 0b10,
    /// HSI clock
    Hsi = 0b11,
}

impl Clk {
    const fn from_bits(bits: u32) -> Clk {
        match bits & 0b11 {
            0b00 => Clk::PClk,
            0b01 => Clk::Sysclk,
            0b10 => Clk::Lse,
            _ => Clk::Hsi,
        }
    }
}

/// UART errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Overrun.
    Overrun,
    /// Start bit noise detected.
    Noise,
    /// Framing error.
    Framing,
    /// Parity error.
    Parity,
}

impl Error {
    const fn from_isr(isr: u32) -> Option<Error> {
        if isr & ISR_PE != 0 {
            Some(Error::Parity)
        } else if isr & ISR_FE != 0 {
            Some(Error::Framing)
        } else if isr & ISR_NF != 0 {
            Some(Error::Noise)
        } else if isr & ISR_ORE != 0 {
            Some(Error::Overrun)
        } else {
            None
        }
    }
}

/// Baud rate calculation error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BaudError {
    /// Kernel clock frequency.
    pub clock_hz: u32,
    /// Requested baud rate.
    pub baud: u32,
}

/// Baud rate register value.
///
/// Rounded to the nearest divider.
///
/// # Errors
///
/// * [`BaudError`] if the kernel clock is slower than 16× the baud rate or
///   the divider does not fit in 16 bits.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::uart::{BaudError, brr};
///
/// assert_eq!(brr(72_000_000, 115_200), Ok(625));
/// assert_eq!(brr(8_000_000, 9600), Ok(833));
/// assert_eq!(
///     brr(8_000_000, 1_000_000),
///     Err(BaudError {
///         clock_hz: 8_000_000,
///         baud: 1_000_000
///     })
/// );
/// ```
pub const fn brr(clock_hz: u32, baud: u32) -> Result<u16, BaudError> {
    let err: BaudError = BaudError { clock_hz, baud };
    if baud == 0 || clock_hz / 16 < baud {
        return Err(err);
    }
    let div: u32 = clock_hz.saturating_add(baud / 2) / baud;
    if div > u16::MAX as u32 {
        Err(err)
    } else {
        Ok(div as u16)
    }
}

/// UART1 driver.
#[derive(Debug)]
pub struct Uart1<RX, TX> {
    uart: pac::USART1,
    rx: RX,
    tx: TX,
}

/// UART2 driver.
#[derive(Debug)]
pub struct Uart2<RX, TX> {
    uart: pac::USART2,
    rx: RX,
    tx: TX,
}

macro_rules! uart {
    (
        $uart:ident,
        $periph:ident,
        $en_fn:ident,
        $dis_fn:ident,
        $rst_fn:ident,
        $en_bit:expr,
        $sel_shift:expr,
        $pclk_fn:ident,
        $rx_trait:ident,
        $tx_trait:ident,
        $rx_af:ident,
        $tx_af:ident
    ) => {
        impl $uart<NoRx, NoTx> {
            #[doc = concat!("Create a new ", stringify!($periph), " driver.")]
            ///
            /// This will enable clocks and reset the peripheral.
            ///
            /// # Errors
            ///
            /// * [`BaudError`] if the kernel clock is slower than 16× the baud
            ///   rate or too fast for the 16-bit divider. The peripheral clock
            ///   is left disabled.
            ///
            /// # Example
            ///
            /// ```no_run
            #[doc = concat!("use stm32f3xx_hal::{pac, uart::{self, NoRx, NoTx, ", stringify!($uart), "}};")]
            ///
            /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
            ///
            #[doc = concat!("let uart: ", stringify!($uart), "<NoRx, NoTx> = ", stringify!($uart), "::new(dp.", stringify!($periph), ", 115_200, uart::Clk::Sysclk, &mut dp.RCC)?;")]
            /// # Ok::<(), uart::BaudError>(())
            /// ```
            pub fn new(
                uart: pac::$periph,
                baud: u32,
                clk: Clk,
                rcc: &mut pac::RCC,
            ) -> Result<$uart<NoRx, NoTx>, BaudError> {
                write_bits!(rcc.cfgr3, 0b11 << $sel_shift, (clk as u32) << $sel_shift);
                let br: u16 = brr(Self::kernel_hz(clk, rcc), baud)?;

                Self::enable_clock(rcc);
                rcc::en::$rst_fn(rcc, $en_bit);

                let ret: $uart<NoRx, NoTx> = $uart {
                    uart,
                    rx: NoRx::new(),
                    tx: NoTx::new(),
                };
                ret.uart.brr.write(|w| unsafe { w.bits(u32::from(br)) });
                ret.uart.cr1.write(|w| unsafe { w.bits(CR1_UE) });

                Ok(ret)
            }

            fn kernel_hz(clk: Clk, rcc: &pac::RCC) -> u32 {
                match clk {
                    Clk::PClk => rcc::$pclk_fn(rcc),
                    Clk::Sysclk => rcc::sysclk_hz(rcc),
                    Clk::Lse => rcc::LSE_HZ,
                    Clk::Hsi => rcc::HSI_HZ,
                }
            }

            /// Enable the clock.
            #[inline]
            pub fn enable_clock(rcc: &mut pac::RCC) {
                rcc::en::$en_fn(rcc, $en_bit)
            }

            /// Disable the clock.
            ///
            /// # Safety
            ///
            /// 1. Do not use the UART while the clock is disabled.
            #[inline]
            pub unsafe fn disable_clock(rcc: &mut pac::RCC) {
                rcc::en::$dis_fn(rcc, $en_bit)
            }

            /// Steal the UART peripheral from whatever is currently using it.
            ///
            /// This will **not** initialize the peripheral (unlike [`new`]).
            ///
            /// # Safety
            ///
            /// 1. Ensure that the code stealing the UART has exclusive access
            ///    to the peripheral. Singleton checks are bypassed with this
            ///    method.
            /// 2. You are responsible for setting up the UART correctly.
            ///
            /// [`new`]: Self::new
            pub unsafe fn steal() -> $uart<NoRx, NoTx> {
                $uart {
                    uart: unsafe { pac::Peripherals::steal() }.$periph,
                    rx: NoRx::new(),
                    tx: NoTx::new(),
                }
            }
        }

        impl<RX, TX> $uart<RX, TX> {
            /// Kernel clock selection.
            pub fn clk(&self, rcc: &pac::RCC) -> Clk {
                Clk::from_bits(rcc.cfgr3.read().bits() >> $sel_shift)
            }

            /// Kernel clock frequency in hertz.
            pub fn clock_hz(&self, rcc: &pac::RCC) -> u32 {
                $uart::<NoRx, NoTx>::kernel_hz(self.clk(rcc), rcc)
            }

            /// Free the UART peripheral from the driver.
            ///
            /// The pins are not returned, disable the receiver and
            /// transmitter first to get them back.
            pub fn free(self) -> pac::$periph {
                clear_bits!(self.uart.cr1, CR1_UE);
                self.uart
            }

            #[inline]
            fn status(&self) -> Result<u32, Error> {
                let isr: u32 = self.uart.isr.read().bits();
                match Error::from_isr(isr) {
                    Some(e) => {
                        // the error flags stay set until cleared
                        self.uart.icr.write(|w| unsafe { w.bits(ISR_ERR) });
                        Err(e)
                    }
                    None => Ok(isr),
                }
            }
        }

        impl<RX> $uart<RX, NoTx> {
            /// Enable the UART transmitter.
            pub fn enable_tx<TX: gpio::sealed::$tx_trait>(
                self,
                mut tx: TX,
                cs: &CriticalSection,
            ) -> $uart<RX, TX> {
                tx.$tx_af(cs);
                set_bits!(self.uart.cr1, CR1_TE);
                $uart {
                    uart: self.uart,
                    rx: self.rx,
                    tx,
                }
            }
        }

        impl<RX, TX> $uart<RX, TX> {
            /// Disable the UART transmitter.
            pub fn disable_tx(self) -> ($uart<RX, NoTx>, TX) {
                clear_bits!(self.uart.cr1, CR1_TE);
                (
                    $uart {
                        uart: self.uart,
                        rx: self.rx,
                        tx: NoTx::new(),
                    },
                    self.tx,
                )
            }
        }

        impl<TX> $uart<NoRx, TX> {
            /// Enable the UART receiver.
            pub fn enable_rx<RX: gpio::sealed::$rx_trait>(
                self,
                mut rx: RX,
                cs: &CriticalSection,
            ) -> $uart<RX, TX> {
                rx.$rx_af(cs);
                set_bits!(self.uart.cr1, CR1_RE);
                $uart {
                    uart: self.uart,
                    rx,
                    tx: self.tx,
                }
            }
        }

        impl<RX, TX> $uart<RX, TX> {
            /// Disable the UART receiver.
            pub fn disable_rx(self) -> ($uart<NoRx, TX>, RX) {
                clear_bits!(self.uart.cr1, CR1_RE);
                (
                    $uart {
                        uart: self.uart,
                        rx: NoRx::new(),
                        tx: self.tx,
                    },
                    self.rx,
                )
            }
        }

        impl<RX, TX> embedded_hal::serial::Write<u8> for $uart<RX, TX>
        where
            TX: gpio::sealed::$tx_trait,
        {
            type Error = Error;

            #[inline]
            fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
                if self.status()? & ISR_TXE != 0 {
                    self.uart.tdr.write(|w| unsafe { w.bits(u32::from(word)) });
                    Ok(())
                } else {
                    Err(nb::Error::WouldBlock)
                }
            }

            #[inline]
            fn flush(&mut self) -> nb::Result<(), Self::Error> {
                if self.status()? & ISR_TC == 0 {
                    Err(nb::Error::WouldBlock)
                } else {
                    Ok(())
                }
            }
        }

        impl<RX, TX> embedded_hal::blocking::serial::write::Default<u8> for $uart<RX, TX> where
            TX: gpio::sealed::$tx_trait
        {
        }

        impl<RX, TX> embedded_hal::serial::Read<u8> for $uart<RX, TX>
        where
            RX: gpio::sealed::$rx_trait,
        {
            type Error = Error;

            #[inline]
            fn read(&mut self) -> nb::Result<u8, Self::Error> {
                if self.status()? & ISR_RXNE != 0 {
                    Ok(self.uart.rdr.read().bits() as u8)
                } else {
                    Err(nb::Error::WouldBlock)
                }
            }
        }

        impl<RX, TX> $uart<RX, TX>
        where
            RX: gpio::sealed::$rx_trait,
        {
            /// Blocking read to fill `buffer`.
            ///
            /// This is not an embedded-hal trait, it exists for parity with
            /// the blocking write on the TX side.
            pub fn bread_all(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
                for byte in buffer.iter_mut() {
                    *byte = nb::block!(self.read())?;
                }
                Ok(())
            }
        }

        impl<RX, TX> core::fmt::Write for $uart<RX, TX>
        where
            TX: gpio::sealed::$tx_trait,
        {
            fn write_str(&mut self, s: &str) -> core::fmt::Result {
                self.bwrite_all(s.as_bytes()).map_err(|_| core::fmt::Error)
            }
        }
    };
}

uart!(
    Uart1,
    USART1,
    apb2,
    apb2_disable,
    apb2_reset,
    rcc::en::APB2_USART1,
    0,
    pclk2_hz,
    Uart1Rx,
    Uart1Tx,
    set_uart1_rx_af,
    set_uart1_tx_af
);
uart!(
    Uart2,
    USART2,
    apb1,
    apb1_disable,
    apb1_reset,
    rcc::en::APB1_USART2,
    16,
    pclk1_hz,
    Uart2Rx,
    Uart2Tx,
    set_uart2_rx_af,
    set_uart2_tx_af
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brr_limits() {
        // 16x oversampling lower bound
        assert_eq!(brr(16, 1), Ok(16));
        assert_eq!(
            brr(15, 1),
            Err(BaudError {
                clock_hz: 15,
                baud: 1
            })
        );
        assert!(brr(u32::MAX, 1).is_err());
        assert!(brr(8_000_000, 0).is_err());
    }

    #[test]
    fn brr_out_of_range_reports_request() {
        // 32 kHz LSE cannot run 115200 baud
        let err: BaudError = match brr(rcc::LSE_HZ, 115_200) {
            Ok(br) => panic!("unexpected divider {br}"),
            Err(e) => e,
        };
        assert_eq!(err.clock_hz, rcc::LSE_HZ);
        assert_eq!(err.baud, 115_200);
        // 9600 baud from the LSE is below 16x oversampling as well
        assert!(brr(rcc::LSE_HZ, 9600).is_err());
        assert_eq!(brr(rcc::HSI_HZ, 9600), Ok(833));
    }

    #[test]
    fn brr_rounding() {
        // 72 MHz / 9600 = 7500 exactly, 8 MHz / 115200 = 69.44
        assert_eq!(brr(72_000_000, 9600), Ok(7500));
        assert_eq!(brr(8_000_000, 115_200), Ok(69));
    }

    #[test]
    fn error_priority() {
        assert_eq!(Error::from_isr(0), None);
        assert_eq!(Error::from_isr(ISR_ORE | ISR_FE), Some(Error::Framing));
        assert_eq!(Error::from_isr(ISR_ORE | ISR_TXE), Some(Error::Overrun));
        assert_eq!(Clk::from_bits(0b11), Clk::Hsi);
    }
}
