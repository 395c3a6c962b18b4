//! STM32F3 hardware abstraction layer.
//!
//! This crate supports the STM32F334 (HRTIM power-conversion parts) and the
//! STM32F373 (SDADC measurement parts).
//! Select exactly one with the `stm32f334` or `stm32f373` feature.
//!
//! The high-resolution timer lives in [`hrtim`], it is the reason the F334 is
//! in this crate at all.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

#[cfg(all(feature = "stm32f334", feature = "stm32f373"))]
compile_error!("Only one of the stm32f334 and stm32f373 features may be enabled");

cfg_if::cfg_if! {
    if #[cfg(feature = "stm32f334")] {
        /// Peripheral access crate.
        pub use stm32f3::stm32f3x4 as pac;
    } else if #[cfg(feature = "stm32f373")] {
        /// Peripheral access crate.
        pub use stm32f3::stm32f373 as pac;
    } else {
        core::compile_error!("You must select your hardware with a feature flag");
    }
}

pub use cortex_m;
#[cfg(feature = "rt")]
pub use cortex_m_rt;
#[cfg(feature = "chrono")]
pub use chrono;
pub use embedded_hal;

mod macros;

#[cfg(feature = "stm32f334")]
pub mod adc;
#[cfg(feature = "stm32f334")]
pub mod comp;
pub mod crc;
pub mod dac;
pub mod gpio;
#[cfg(feature = "stm32f334")]
pub mod hrtim;
pub mod i2c;
pub mod info;
#[cfg(feature = "stm32f334")]
pub mod opamp;
pub mod pwr;
pub mod rcc;
#[cfg(feature = "chrono")]
pub mod rtc;
#[cfg(feature = "stm32f373")]
pub mod sdadc;
pub mod spi;
pub mod tim;
pub mod uart;
pub mod util;
