//! STM32F3348-DISCO board support package.
//!
//! The board has an STM32F334C8 with the high-resolution timer driving an
//! on-board buck-boost converter.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub mod buck_boost;
pub mod led;
pub mod pb;

pub use stm32f3xx_hal as hal;
