// Hardware CRC on the STM32F3348-DISCO.
//
// Computes the check value of several CRC models in hardware, compares them
// against the software implementation, and lights the green LED on success.

#![no_std]
#![no_main]

use defmt_rtt as _; // global logger
use panic_probe as _; // panic handler
use stm32f3348_disco_bsp::{
    hal::{
        self, cortex_m,
        crc::{Crc, CrcModel},
        gpio::PortB,
        pac,
    },
    led::{self, Led},
};

const CHECK: &[u8] = b"123456789";

const MODELS: [(&str, CrcModel); 5] = [
    ("CRC-32/MPEG-2", CrcModel::CRC32_MPEG2),
    ("CRC-32/ISO-HDLC", CrcModel::CRC32_ISO_HDLC),
    ("CRC-16/IBM-3740", CrcModel::CRC16_IBM_3740),
    ("CRC-8/SMBUS", CrcModel::CRC8_SMBUS),
    ("CRC-7/MMC", CrcModel::CRC7_MMC),
];

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());

    let gpiob: PortB = PortB::split(dp.GPIOB, &mut dp.RCC);
    let mut green: led::Green = cortex_m::interrupt::free(|cs| led::Green::new(gpiob.b9, cs));

    let mut crc: Crc = Crc::new(dp.CRC, &mut dp.RCC);

    for (name, model) in MODELS.iter() {
        let sw: u32 = model.compute(CHECK);
        let hw: u32 = match crc.checksum(model, CHECK) {
            Ok(hw) => hw,
            Err(e) => error_handler(e),
        };
        if hw != sw {
            error_handler(*name)
        }
        defmt::info!("{}: {=u32:#010x}", name, hw);
    }

    // the independent data register is scratch storage
    crc.set_idr(0xA5);
    defmt::assert_eq!(crc.idr(), 0xA5);

    green.set_on();
    loop {
        cortex_m::asm::wfe();
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("crc failed: {}", e);
    led::error_halt()
}
