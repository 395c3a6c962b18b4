// On-target CRC tests, the hardware is checked against the bitwise software
// implementation.

#![no_std]
#![no_main]

use defmt::unwrap;
use defmt_rtt as _; // global logger
use panic_probe as _;
use stm32f3348_disco_bsp::hal::{
    cortex_m,
    crc::{self, Config, Crc, CrcModel, PolySize, RevIn},
    pac::{self, DWT},
    rcc::{self, PllConfig},
    util::start_cycle_counter,
};

const FREQ: u32 = 72_000_000;
const CYC_PER_US: u32 = FREQ / 1000 / 1000;

// WARNING will wrap-around eventually, use this for relative timing only
defmt::timestamp!("{=u32:us}", DWT::cycle_count() / CYC_PER_US);

const CHECK: &[u8] = b"123456789";

const MODELS: [(&str, CrcModel); 5] = [
    ("CRC-32/MPEG-2", CrcModel::CRC32_MPEG2),
    ("CRC-32/ISO-HDLC", CrcModel::CRC32_ISO_HDLC),
    ("CRC-16/IBM-3740", CrcModel::CRC16_IBM_3740),
    ("CRC-8/SMBUS", CrcModel::CRC8_SMBUS),
    ("CRC-7/MMC", CrcModel::CRC7_MMC),
];

// xorshift, deterministic test data
fn fill_pseudo_random(buf: &mut [u8], mut seed: u32) {
    buf.iter_mut().for_each(|byte| {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        *byte = seed as u8;
    })
}

#[defmt_test::tests]
mod tests {
    use super::*;

    #[init]
    fn init() -> Crc {
        let mut dp: pac::Peripherals = unwrap!(pac::Peripherals::take());
        let mut cp: pac::CorePeripherals = unwrap!(pac::CorePeripherals::take());

        cortex_m::interrupt::free(|cs| unsafe {
            rcc::set_sysclk_pll(
                &mut dp.FLASH,
                &mut dp.RCC,
                &PllConfig::HSE_BYPASS_72MHZ,
                cs,
            )
        });
        start_cycle_counter(&mut cp.DCB, &mut cp.DWT);

        Crc::new(dp.CRC, &mut dp.RCC)
    }

    #[test]
    fn reset_config(crc: &mut Crc) {
        crc.reset();
        crc.feed_bytes(CHECK);
        defmt::assert_eq!(crc.result(), 0x0376_E6E7);
    }

    #[test]
    fn check_values(crc: &mut Crc) {
        for (name, model) in MODELS.iter() {
            let hw: u32 = unwrap!(crc.checksum(model, CHECK));
            let sw: u32 = model.compute(CHECK);
            defmt::debug!("{}: hw=0x{:08X} sw=0x{:08X}", name, hw, sw);
            defmt::assert_eq!(hw, sw, "{}", name);
        }
    }

    #[test]
    fn random_data(crc: &mut Crc) {
        let mut buf: [u8; 257] = [0; 257];
        for seed in 1..=8 {
            fill_pseudo_random(&mut buf, seed * 0x9E37_79B9);
            for (name, model) in MODELS.iter() {
                let start: u32 = DWT::cycle_count();
                let hw: u32 = unwrap!(crc.checksum(model, &buf));
                let elapsed: u32 = DWT::cycle_count().wrapping_sub(start);
                defmt::trace!("{} {} bytes in {} cycles", name, buf.len(), elapsed);
                defmt::assert_eq!(hw, model.compute(&buf), "{}", name);
            }
        }
    }

    #[test]
    fn unsupported_width(crc: &mut Crc) {
        let crc12 = CrcModel {
            width: 12,
            poly: 0x80F,
            ..CrcModel::CRC16_IBM_3740
        };
        defmt::assert_eq!(crc.checksum(&crc12, CHECK), Err(crc::Error::Width(12)));
    }

    #[test]
    fn feed_words(crc: &mut Crc) {
        crc.configure(&Config::RESET);
        crc.feed_words(&[0x3132_3334, 0x3536_3738]);
        let words: u32 = crc.result();

        crc.reset();
        crc.feed_bytes(b"12345678");
        defmt::assert_eq!(crc.result(), words);
    }

    #[test]
    fn word_reversal(crc: &mut Crc) {
        // reversal by word is reversal by byte of the little endian bytes
        crc.configure(&Config::RESET.set_rev_in(RevIn::Word));
        crc.feed_words(&[u32::from_le_bytes(*b"1234")]);
        let word: u32 = crc.result();

        crc.configure(&Config::RESET.set_rev_in(RevIn::Byte));
        crc.feed_bytes(b"1234");
        defmt::assert_eq!(crc.result(), word);
    }

    #[test]
    fn custom_poly(crc: &mut Crc) {
        // CRC-16/ARC
        let model = CrcModel {
            width: 16,
            poly: 0x8005,
            init: 0,
            refin: true,
            refout: true,
            xorout: 0,
        };
        crc.configure(
            &Config::RESET
                .set_poly(PolySize::Bits16, model.poly)
                .set_init(model.init)
                .set_rev_in(RevIn::Byte)
                .set_rev_out(true),
        );
        crc.feed_bytes(CHECK);
        defmt::assert_eq!(crc.result() & 0xFFFF, 0xBB3D);
        defmt::assert_eq!(model.compute(CHECK), 0xBB3D);
    }

    #[test]
    fn idr(crc: &mut Crc) {
        crc.set_idr(0xA5);
        crc.reset();
        crc.feed_bytes(CHECK);
        defmt::assert_eq!(crc.idr(), 0xA5);
        crc.set_idr(0);
        defmt::assert_eq!(crc.idr(), 0);
    }
}
