// Prints the microSD card details on the LCD of the STM32373C-EVAL.
//
// The card is identified with SCK below 400 kHz, then SPI3 is sped up for
// the LCD and the block reads. The LCD shows the card type, the capacity and
// the boot signature of block 0.
// LD1 (green) lights when a card is read, LD2 (orange) when the socket is
// empty.

#![no_std]
#![no_main]

use core::{cell::RefCell, fmt::Write as _};

use defmt_rtt as _; // global logger
use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_6X10},
    pixelcolor::Rgb565,
    prelude::*,
    text::{Baseline, Text},
};
use panic_probe as _; // panic handler
use stm32373c_eval_bsp::{
    LcdCs, SdCs, SharedBus, Spi,
    hal::{
        self,
        cortex_m::{self, delay::Delay},
        gpio::{PortC, PortD, PortE},
        pac, rcc,
        spi::BaudDiv,
        util::new_delay,
    },
    lcd::Lcd,
    led::{self, Led},
    sdcard::{BLOCK_LEN, CardDetect, CardType, SdCard},
};

const IDENT_HZ: u32 = 400_000;
const TRANSFER_HZ: u32 = 10_000_000;
const LINE_HEIGHT: i32 = 12;

/// Fixed capacity text buffer for one LCD line.
struct Line {
    buf: [u8; 40],
    len: usize,
}

impl Line {
    const fn new() -> Self {
        Line {
            buf: [0; 40],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

impl core::fmt::Write for Line {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let end: usize = self.len + s.len();
        if end > self.buf.len() {
            return Err(core::fmt::Error);
        }
        self.buf[self.len..end].copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

fn print<D>(target: &mut D, row: i32, text: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let style = MonoTextStyle::new(&FONT_6X10, Rgb565::WHITE);
    Text::with_baseline(text, Point::new(4, 4 + row * LINE_HEIGHT), style, Baseline::Top)
        .draw(target)?;
    Ok(())
}

#[hal::cortex_m_rt::entry]
fn main() -> ! {
    let mut dp: pac::Peripherals = defmt::unwrap!(pac::Peripherals::take());
    let cp: pac::CorePeripherals = defmt::unwrap!(pac::CorePeripherals::take());

    let mut delay: Delay = new_delay(cp.SYST, &dp.RCC);

    let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);
    let gpiod: PortD = PortD::split(dp.GPIOD, &mut dp.RCC);
    let gpioe: PortE = PortE::split(dp.GPIOE, &mut dp.RCC);

    let (lcd_cs, sd_cs, detect, mut ld1, mut ld2): (LcdCs, SdCs, CardDetect, led::Ld1, led::Ld2) =
        cortex_m::interrupt::free(|cs| {
            (
                stm32373c_eval_bsp::lcd_cs(gpiod.d2, cs),
                stm32373c_eval_bsp::sd_cs(gpioe.e2, cs),
                CardDetect::new(gpioe.e3, cs),
                led::Ld1::new(gpioc.c0, cs),
                led::Ld2::new(gpioc.c1, cs),
            )
        });

    let pclk1_hz: u32 = rcc::pclk1_hz(&dp.RCC);
    let (ident_div, transfer_div): (BaudDiv, BaudDiv) = match (
        BaudDiv::for_hz(pclk1_hz, IDENT_HZ),
        BaudDiv::for_hz(pclk1_hz, TRANSFER_HZ),
    ) {
        (Some(ident), Some(transfer)) => (ident, transfer),
        _ => error_handler("no SPI3 divider for the PCLK1 frequency"),
    };
    defmt::info!(
        "PCLK1 {} Hz, identification SCK {} Hz, transfer SCK {} Hz",
        pclk1_hz,
        pclk1_hz / ident_div.div(),
        pclk1_hz / transfer_div.div()
    );

    let bus: RefCell<Spi> = RefCell::new(stm32373c_eval_bsp::new_spi(
        dp.SPI3,
        gpioc.c12,
        gpioc.c11,
        gpioc.c10,
        ident_div,
        &mut dp.RCC,
    ));
    let mut card = SdCard::new(SharedBus::new(&bus), sd_cs);
    let mut lcd = Lcd::new(SharedBus::new(&bus), lcd_cs);

    let card_type: Option<CardType> = if detect.is_present() {
        match card.init() {
            Ok(card_type) => Some(card_type),
            Err(e) => error_handler(e),
        }
    } else {
        None
    };
    bus.borrow_mut().set_baud_div(transfer_div);

    match lcd.init(&mut delay) {
        Ok(controller) => defmt::info!("LCD controller {}", controller),
        Err(e) => error_handler(e),
    }
    if let Err(e) = lcd.clear(Rgb565::BLUE) {
        error_handler(e)
    }
    if let Err(e) = print(&mut lcd, 0, "STM32373C-EVAL microSD") {
        error_handler(e)
    }

    let Some(card_type) = card_type else {
        defmt::warn!("no card in the socket");
        if let Err(e) = print(&mut lcd, 1, "no card") {
            error_handler(e)
        }
        ld2.set_on();
        loop {
            cortex_m::asm::wfe();
        }
    };

    let blocks: u64 = card.num_blocks().unwrap_or(0);
    let mib: u64 = blocks / (1024 * 1024 / BLOCK_LEN as u64);
    defmt::info!("{} card, {} blocks, {} MiB", card_type, blocks, mib);

    let mut block0: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
    if let Err(e) = card.read_block(0, &mut block0) {
        error_handler(e)
    }
    let signature: u16 = u16::from_le_bytes([block0[510], block0[511]]);
    defmt::info!("block 0 signature {:#06X}", signature);

    let mut type_line: Line = Line::new();
    let mut size_line: Line = Line::new();
    let mut sig_line: Line = Line::new();
    let text = write!(type_line, "type: {:?}", card_type)
        .and(write!(size_line, "size: {} MiB", mib))
        .and(write!(sig_line, "block 0 signature: {:#06X}", signature));
    if text.is_err() {
        error_handler("LCD line too long")
    }
    for (row, line) in [type_line, size_line, sig_line].iter().enumerate() {
        if let Err(e) = print(&mut lcd, row as i32 + 2, line.as_str()) {
            error_handler(e)
        }
    }
    ld1.set_on();

    loop {
        cortex_m::asm::wfe();
    }
}

fn error_handler<E: defmt::Format>(e: E) -> ! {
    defmt::error!("lcd-sdcard failed: {}", e);
    led::error_halt()
}
