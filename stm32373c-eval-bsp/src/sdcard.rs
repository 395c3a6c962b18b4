//! microSD card in SPI mode
//!
//! The socket shares SPI3 with the LCD, chip select on PE2 and the card
//! detect switch on PE3.
//!
//! Commands are 6 byte frames protected by a CRC7, the card answers with an
//! R1 status byte within 8 bytes. Data blocks are 512 bytes and start with a
//! data token. Standard capacity cards are byte addressed and high capacity
//! cards are block addressed, the driver takes block numbers for both.
//!
//! Card identification must run with SCK at or below 400 kHz, the bus can
//! be recreated with a faster divider after [`SdCard::init`].

use core::convert::Infallible;

use stm32f3xx_hal as hal;

use hal::{
    cortex_m::interrupt::CriticalSection,
    embedded_hal::{
        blocking::spi::{Transfer, Write},
        digital::v2::OutputPin,
    },
    gpio::{Input, PinState, Pull, pins},
};

/// Block length in bytes.
pub const BLOCK_LEN: usize = 512;

/// Maximum number of `ACMD41` polls while the card leaves the idle state.
pub const MAX_INIT_POLLS: u32 = 20_000;

/// Maximum number of polls for a data token or the end of a write.
pub const MAX_BUSY_POLLS: u32 = 100_000;

// NCR, bytes before the R1 response
const MAX_NCR: usize = 8;
const CMD0_RETRIES: usize = 10;

const CMD0: u8 = 0;
const CMD8: u8 = 8;
const CMD9: u8 = 9;
const CMD16: u8 = 16;
const CMD17: u8 = 17;
const CMD24: u8 = 24;
const CMD55: u8 = 55;
const CMD58: u8 = 58;
const ACMD41: u8 = 41;

const R1_READY: u8 = 0x00;
const R1_IDLE: u8 = 0x01;
const R1_ILLEGAL_CMD: u8 = 0x04;

// 2.7 to 3.6 V, check pattern
const CMD8_ARG: u32 = 0x1AA;
const ACMD41_HCS: u32 = 1 << 30;
const OCR_CCS: u8 = 1 << 6;

const DATA_START: u8 = 0xFE;
const DATA_RESP_MASK: u8 = 0x1F;
const DATA_ACCEPTED: u8 = 0x05;

/// CRC7 of a command frame, as sent in the upper 7 bits of the last byte.
///
/// # Example
///
/// ```
/// use stm32373c_eval_bsp::sdcard::crc7;
///
/// assert_eq!(crc7(&[0x40, 0, 0, 0, 0]), 0x4A);
/// ```
pub const fn crc7(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    let mut idx: usize = 0;
    while idx < data.len() {
        let byte: u8 = data[idx];
        let mut bit: u32 = 0;
        while bit < 8 {
            crc <<= 1;
            if ((byte << bit) ^ crc) & 0x80 != 0 {
                crc ^= 0x09;
            }
            bit += 1;
        }
        idx += 1;
    }
    crc & 0x7F
}

/// Command frame: start bits and index, argument MSB first, CRC and end bit.
///
/// # Example
///
/// ```
/// use stm32373c_eval_bsp::sdcard::command_frame;
///
/// assert_eq!(command_frame(0, 0), [0x40, 0x00, 0x00, 0x00, 0x00, 0x95]);
/// assert_eq!(command_frame(8, 0x1AA), [0x48, 0x00, 0x00, 0x01, 0xAA, 0x87]);
/// ```
pub const fn command_frame(cmd: u8, arg: u32) -> [u8; 6] {
    let [a3, a2, a1, a0] = arg.to_be_bytes();
    let head: [u8; 5] = [0x40 | (cmd & 0x3F), a3, a2, a1, a0];
    [head[0], a3, a2, a1, a0, (crc7(&head) << 1) | 1]
}

/// Card type, found during [`SdCard::init`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CardType {
    /// Version 1.x standard capacity, byte addressed.
    Sd1,
    /// Version 2.0 standard capacity, byte addressed.
    Sd2,
    /// High or extended capacity, block addressed.
    Sdhc,
}

impl CardType {
    /// Card address argument of a block.
    pub const fn address(self, block: u32) -> u32 {
        match self {
            CardType::Sdhc => block,
            CardType::Sd1 | CardType::Sd2 => block * BLOCK_LEN as u32,
        }
    }
}

/// Card specific data register.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Csd(pub [u8; 16]);

impl Csd {
    /// `CSD_STRUCTURE`, 0 for version 1.0 and 1 for version 2.0.
    pub const fn structure(&self) -> u8 {
        self.0[0] >> 6
    }

    /// Card capacity in 512 byte blocks.
    ///
    /// Returns `None` for unknown CSD structures.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32373c_eval_bsp::sdcard::Csd;
    ///
    /// // version 2.0, C_SIZE = 7579
    /// let csd = Csd([
    ///     0x40, 0x0E, 0x00, 0x32, 0x5B, 0x59, 0x00, 0x00,
    ///     0x1D, 0x9B, 0x7F, 0x80, 0x0A, 0x40, 0x00, 0x01,
    /// ]);
    /// assert_eq!(csd.num_blocks(), Some(7580 * 1024));
    /// ```
    pub const fn num_blocks(&self) -> Option<u64> {
        let csd: &[u8; 16] = &self.0;
        match self.structure() {
            0 => {
                let read_bl_len: u32 = (csd[5] & 0x0F) as u32;
                if read_bl_len < 9 {
                    return None;
                }
                let c_size: u64 = (((csd[6] & 0x03) as u64) << 10)
                    | ((csd[7] as u64) << 2)
                    | ((csd[8] >> 6) as u64);
                let c_size_mult: u32 = (((csd[9] & 0x03) as u32) << 1) | ((csd[10] >> 7) as u32);
                Some((c_size + 1) << (c_size_mult + 2 + read_bl_len - 9))
            }
            1 => {
                let c_size: u64 = (((csd[7] & 0x3F) as u64) << 16)
                    | ((csd[8] as u64) << 8)
                    | (csd[9] as u64);
                Some((c_size + 1) * 1024)
            }
            _ => None,
        }
    }
}

/// SD card errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// SPI bus error.
    Spi(E),
    /// No R1 response, no card or the card is not powered.
    NoResponse,
    /// A command returned an unexpected R1 status.
    Command {
        /// Command index.
        cmd: u8,
        /// R1 status.
        r1: u8,
    },
    /// The card does not accept the host voltage range.
    Unsupported,
    /// The card did not leave the idle state or stayed busy.
    Timeout,
    /// A read returned a data error token instead of a data block.
    DataToken(u8),
    /// The card rejected a written block, data response token.
    WriteRejected(u8),
    /// The block is past the end of the card.
    OutOfRange(u32),
    /// [`SdCard::init`] has not completed.
    NotInitialized,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Spi(e)
    }
}

#[derive(Debug, Clone, Copy)]
struct Card {
    card_type: CardType,
    num_blocks: u64,
}

/// SD card driver.
#[derive(Debug)]
pub struct SdCard<SPI, CS> {
    spi: SPI,
    cs: CS,
    card: Option<Card>,
}

impl<SPI, CS, E> SdCard<SPI, CS>
where
    SPI: Write<u8, Error = E> + Transfer<u8, Error = E>,
    CS: OutputPin<Error = Infallible>,
{
    /// Create a new SD card driver.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32373c_eval_bsp::{
    ///     hal::{cortex_m, gpio::{PortC, PortE}, pac, spi::BaudDiv},
    ///     sdcard::{self, SdCard, BLOCK_LEN},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpioc: PortC = PortC::split(dp.GPIOC, &mut dp.RCC);
    /// let gpioe: PortE = PortE::split(dp.GPIOE, &mut dp.RCC);
    /// let spi = stm32373c_eval_bsp::new_spi(
    ///     dp.SPI3,
    ///     gpioc.c12,
    ///     gpioc.c11,
    ///     gpioc.c10,
    ///     BaudDiv::Div128,
    ///     &mut dp.RCC,
    /// );
    /// let cs = cortex_m::interrupt::free(|cs| stm32373c_eval_bsp::sd_cs(gpioe.e2, cs));
    ///
    /// let mut card = SdCard::new(spi, cs);
    /// card.init()?;
    /// let mut block: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
    /// card.read_block(0, &mut block)?;
    /// # Ok::<(), sdcard::Error<stm32373c_eval_bsp::hal::spi::Error>>(())
    /// ```
    pub fn new(spi: SPI, mut cs: CS) -> Self {
        let Ok(()) = cs.set_high();
        SdCard {
            spi,
            cs,
            card: None,
        }
    }

    /// Free the SPI bus and the chip select.
    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    /// Card type, `None` before [`init`](Self::init).
    pub fn card_type(&self) -> Option<CardType> {
        self.card.map(|card| card.card_type)
    }

    /// Card capacity in blocks, `None` before [`init`](Self::init).
    pub fn num_blocks(&self) -> Option<u64> {
        self.card.map(|card| card.num_blocks)
    }

    fn xfer(&mut self, byte: u8) -> Result<u8, E> {
        let mut buf: [u8; 1] = [byte];
        self.spi.transfer(&mut buf)?;
        Ok(buf[0])
    }

    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error<E>>,
    ) -> Result<T, Error<E>> {
        let Ok(()) = self.cs.set_low();
        let ret: Result<T, Error<E>> = f(self);
        let Ok(()) = self.cs.set_high();
        // eight clocks with CS high release MISO
        let release: Result<u8, E> = self.xfer(0xFF);
        let val: T = ret?;
        release?;
        Ok(val)
    }

    /// Send a command and return the R1 status.
    fn command(&mut self, cmd: u8, arg: u32) -> Result<u8, Error<E>> {
        self.spi.write(&command_frame(cmd, arg))?;
        for _ in 0..MAX_NCR {
            let r1: u8 = self.xfer(0xFF)?;
            if r1 & 0x80 == 0 {
                return Ok(r1);
            }
        }
        Err(Error::NoResponse)
    }

    fn command_expect(&mut self, cmd: u8, arg: u32, expect: u8) -> Result<(), Error<E>> {
        let r1: u8 = self.command(cmd, arg)?;
        if r1 == expect {
            Ok(())
        } else {
            Err(Error::Command { cmd, r1 })
        }
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), Error<E>> {
        buf.fill(0xFF);
        self.spi.transfer(buf)?;
        Ok(())
    }

    /// Wait for the start token, then read a data block and its CRC.
    fn read_data(&mut self, buf: &mut [u8]) -> Result<(), Error<E>> {
        let mut token: u8 = 0xFF;
        for _ in 0..MAX_BUSY_POLLS {
            token = self.xfer(0xFF)?;
            if token != 0xFF {
                break;
            }
        }
        match token {
            DATA_START => (),
            0xFF => return Err(Error::Timeout),
            token => return Err(Error::DataToken(token)),
        }
        self.read_bytes(buf)?;
        let mut crc: [u8; 2] = [0xFF; 2];
        self.read_bytes(&mut crc)
    }

    /// Identify and initialize the card.
    ///
    /// This puts the card in SPI mode, negotiates the voltage range and the
    /// capacity class, then reads the CSD for the card size.
    pub fn init(&mut self) -> Result<CardType, Error<E>> {
        self.card = None;

        // at least 74 clocks with CS high
        let Ok(()) = self.cs.set_high();
        self.spi.write(&[0xFF; 10])?;

        let card_type: CardType = self.transaction(|sd| {
            let mut r1: u8 = 0xFF;
            for _ in 0..CMD0_RETRIES {
                r1 = match sd.command(CMD0, 0) {
                    Ok(r1) => r1,
                    Err(Error::NoResponse) => continue,
                    Err(e) => return Err(e),
                };
                if r1 == R1_IDLE {
                    break;
                }
            }
            match r1 {
                R1_IDLE => (),
                0xFF => return Err(Error::NoResponse),
                r1 => return Err(Error::Command { cmd: CMD0, r1 }),
            }

            let r1: u8 = sd.command(CMD8, CMD8_ARG)?;
            let v2: bool = if r1 & R1_ILLEGAL_CMD != 0 {
                false
            } else {
                let mut r7: [u8; 4] = [0xFF; 4];
                sd.read_bytes(&mut r7)?;
                if r7[2] & 0x0F != 0x01 || r7[3] != 0xAA {
                    return Err(Error::Unsupported);
                }
                true
            };

            let hcs: u32 = if v2 { ACMD41_HCS } else { 0 };
            let mut ready: bool = false;
            for _ in 0..MAX_INIT_POLLS {
                sd.command(CMD55, 0)?;
                match sd.command(ACMD41, hcs)? {
                    R1_READY => {
                        ready = true;
                        break;
                    }
                    R1_IDLE => (),
                    r1 => return Err(Error::Command { cmd: ACMD41, r1 }),
                }
            }
            if !ready {
                return Err(Error::Timeout);
            }

            if !v2 {
                return Ok(CardType::Sd1);
            }
            sd.command_expect(CMD58, 0, R1_READY)?;
            let mut ocr: [u8; 4] = [0xFF; 4];
            sd.read_bytes(&mut ocr)?;
            Ok(if ocr[0] & OCR_CCS != 0 {
                CardType::Sdhc
            } else {
                CardType::Sd2
            })
        })?;

        if card_type != CardType::Sdhc {
            self.transaction(|sd| sd.command_expect(CMD16, BLOCK_LEN as u32, R1_READY))?;
        }

        let csd: Csd = self.read_csd()?;
        let num_blocks: u64 = csd.num_blocks().ok_or(Error::Unsupported)?;
        self.card = Some(Card {
            card_type,
            num_blocks,
        });
        Ok(card_type)
    }

    /// Read the card specific data register.
    pub fn read_csd(&mut self) -> Result<Csd, Error<E>> {
        self.transaction(|sd| {
            sd.command_expect(CMD9, 0, R1_READY)?;
            let mut csd: [u8; 16] = [0; 16];
            sd.read_data(&mut csd)?;
            Ok(Csd(csd))
        })
    }

    fn check_block(&self, block: u32) -> Result<CardType, Error<E>> {
        let card: Card = self.card.ok_or(Error::NotInitialized)?;
        if u64::from(block) >= card.num_blocks {
            Err(Error::OutOfRange(block))
        } else {
            Ok(card.card_type)
        }
    }

    /// Read one block.
    pub fn read_block(&mut self, block: u32, buf: &mut [u8; BLOCK_LEN]) -> Result<(), Error<E>> {
        let card_type: CardType = self.check_block(block)?;
        self.transaction(|sd| {
            sd.command_expect(CMD17, card_type.address(block), R1_READY)?;
            sd.read_data(buf)
        })
    }

    /// Write one block and wait for the card to finish programming.
    pub fn write_block(&mut self, block: u32, data: &[u8; BLOCK_LEN]) -> Result<(), Error<E>> {
        let card_type: CardType = self.check_block(block)?;
        self.transaction(|sd| {
            sd.command_expect(CMD24, card_type.address(block), R1_READY)?;
            sd.spi.write(&[0xFF, DATA_START])?;
            sd.spi.write(data)?;
            // CRC is ignored in SPI mode
            sd.spi.write(&[0xFF, 0xFF])?;

            let resp: u8 = sd.xfer(0xFF)? & DATA_RESP_MASK;
            if resp != DATA_ACCEPTED {
                return Err(Error::WriteRejected(resp));
            }
            for _ in 0..MAX_BUSY_POLLS {
                if sd.xfer(0xFF)? != 0x00 {
                    return Ok(());
                }
            }
            Err(Error::Timeout)
        })
    }
}

/// Card detect switch, PE3.
///
/// The switch pulls the GPIO low when a card is inserted.
#[derive(Debug)]
pub struct CardDetect {
    gpio: Input<pins::E3>,
}

impl CardDetect {
    /// Create a new card detect input.
    pub fn new(e3: pins::E3, cs: &CriticalSection) -> Self {
        CardDetect {
            gpio: Input::new(e3, Pull::Up, cs),
        }
    }

    /// Free the GPIO pin.
    pub fn free(self) -> pins::E3 {
        self.gpio.free()
    }

    /// Returns `true` if a card is in the socket.
    pub fn is_present(&self) -> bool {
        self.gpio.level() == PinState::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        cell::RefCell,
        collections::{HashMap, VecDeque},
        rc::Rc,
    };

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum Kind {
        V1,
        V2,
        V2Hc,
    }

    enum Phase {
        Idle,
        Command(Vec<u8>),
        WriteToken(u32),
        WriteData(u32, Vec<u8>),
    }

    // version 1.0, READ_BL_LEN = 9, C_SIZE = 255, C_SIZE_MULT = 0
    const CSD_V1: [u8; 16] = [
        0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x00, 0x3F, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01,
    ];
    // version 2.0, C_SIZE = 15
    const CSD_V2: [u8; 16] = [
        0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01,
    ];

    struct FakeCard {
        kind: Kind,
        present: bool,
        selected: bool,
        busy_polls: u32,
        read_error: bool,
        reject_writes: bool,
        phase: Phase,
        out: VecDeque<u8>,
        app_cmd: bool,
        log: Vec<(u8, u32)>,
        blocks: HashMap<u32, [u8; BLOCK_LEN]>,
    }

    impl FakeCard {
        fn new(kind: Kind) -> Self {
            FakeCard {
                kind,
                present: true,
                selected: false,
                busy_polls: 2,
                read_error: false,
                reject_writes: false,
                phase: Phase::Idle,
                out: VecDeque::new(),
                app_cmd: false,
                log: Vec::new(),
                blocks: HashMap::new(),
            }
        }

        fn block_index(&self, arg: u32) -> u32 {
            match self.kind {
                Kind::V2Hc => arg,
                Kind::V1 | Kind::V2 => arg / BLOCK_LEN as u32,
            }
        }

        fn respond(&mut self, bytes: &[u8]) {
            // one byte of NCR before R1
            self.out.push_back(0xFF);
            self.out.extend(bytes.iter().copied());
        }

        fn handle(&mut self, frame: &[u8]) {
            let cmd: u8 = frame[0] & 0x3F;
            let arg: u32 = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
            self.log.push((cmd, arg));

            if matches!(cmd, CMD0 | CMD8) && frame[5] != command_frame(cmd, arg)[5] {
                self.respond(&[0x08]);
                return;
            }

            let app_cmd: bool = core::mem::replace(&mut self.app_cmd, false);
            match (cmd, app_cmd) {
                (CMD0, _) => self.respond(&[R1_IDLE]),
                (CMD8, _) => match self.kind {
                    Kind::V1 => self.respond(&[R1_IDLE | R1_ILLEGAL_CMD]),
                    _ => self.respond(&[R1_IDLE, 0x00, 0x00, frame[3] & 0x0F, frame[4]]),
                },
                (CMD55, _) => {
                    self.app_cmd = true;
                    let r1: u8 = if self.busy_polls > 0 { R1_IDLE } else { R1_READY };
                    self.respond(&[r1])
                }
                (ACMD41, true) => {
                    if self.busy_polls > 0 {
                        self.busy_polls -= 1;
                        self.respond(&[R1_IDLE])
                    } else {
                        self.respond(&[R1_READY])
                    }
                }
                (CMD58, _) => {
                    let ocr0: u8 = if self.kind == Kind::V2Hc { 0xC0 } else { 0x80 };
                    self.respond(&[R1_READY, ocr0, 0xFF, 0x80, 0x00])
                }
                (CMD16, _) => self.respond(&[R1_READY]),
                (CMD9, _) => {
                    let csd: [u8; 16] = if self.kind == Kind::V2Hc { CSD_V2 } else { CSD_V1 };
                    self.respond(&[R1_READY, 0xFF, DATA_START]);
                    self.out.extend(csd);
                    self.out.extend([0x00, 0x00]);
                }
                (CMD17, _) => {
                    if self.read_error {
                        self.respond(&[R1_READY, 0xFF, 0x08]);
                    } else {
                        let block: [u8; BLOCK_LEN] = self
                            .blocks
                            .get(&self.block_index(arg))
                            .copied()
                            .unwrap_or([0; BLOCK_LEN]);
                        self.respond(&[R1_READY, 0xFF, 0xFF, DATA_START]);
                        self.out.extend(block);
                        self.out.extend([0x00, 0x00]);
                    }
                }
                (CMD24, _) => {
                    self.respond(&[R1_READY]);
                    self.phase = Phase::WriteToken(self.block_index(arg));
                }
                _ => self.respond(&[R1_ILLEGAL_CMD]),
            }
        }

        fn exchange(&mut self, mosi: u8) -> u8 {
            if !self.present || !self.selected {
                return 0xFF;
            }
            let miso: u8 = self.out.pop_front().unwrap_or(0xFF);
            match core::mem::replace(&mut self.phase, Phase::Idle) {
                Phase::Idle => {
                    if mosi & 0xC0 == 0x40 {
                        self.phase = Phase::Command(vec![mosi]);
                    }
                }
                Phase::Command(mut frame) => {
                    frame.push(mosi);
                    if frame.len() == 6 {
                        self.handle(&frame);
                    } else {
                        self.phase = Phase::Command(frame);
                    }
                }
                Phase::WriteToken(block) => {
                    self.phase = if mosi == DATA_START {
                        Phase::WriteData(block, Vec::new())
                    } else {
                        Phase::WriteToken(block)
                    };
                }
                Phase::WriteData(block, mut data) => {
                    data.push(mosi);
                    if data.len() == BLOCK_LEN + 2 {
                        if self.reject_writes {
                            self.out.push_back(0xEB);
                        } else {
                            let mut buf: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
                            buf.copy_from_slice(&data[..BLOCK_LEN]);
                            self.blocks.insert(block, buf);
                            self.out.extend([0xE5, 0x00, 0x00, 0x00]);
                        }
                    } else {
                        self.phase = Phase::WriteData(block, data);
                    }
                }
            }
            miso
        }

        fn commands(&self) -> Vec<u8> {
            self.log.iter().map(|(cmd, _)| *cmd).collect()
        }
    }

    struct FakeSpi(Shared);
    struct FakeCs(Shared);

    impl Write<u8> for FakeSpi {
        type Error = ();

        fn write(&mut self, words: &[u8]) -> Result<(), ()> {
            let mut card = self.0.borrow_mut();
            for word in words {
                card.exchange(*word);
            }
            Ok(())
        }
    }

    impl Transfer<u8> for FakeSpi {
        type Error = ();

        fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], ()> {
            let mut card = self.0.borrow_mut();
            for word in words.iter_mut() {
                *word = card.exchange(*word);
            }
            Ok(words)
        }
    }

    impl OutputPin for FakeCs {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().selected = true;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().selected = false;
            Ok(())
        }
    }

    type Shared = Rc<RefCell<FakeCard>>;

    fn sd(card: FakeCard) -> (SdCard<FakeSpi, FakeCs>, Shared) {
        let card: Shared = Rc::new(RefCell::new(card));
        (SdCard::new(FakeSpi(card.clone()), FakeCs(card.clone())), card)
    }

    fn pattern(seed: u8) -> [u8; BLOCK_LEN] {
        let mut block: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
        for (n, byte) in block.iter_mut().enumerate() {
            *byte = (n as u8).wrapping_mul(7).wrapping_add(seed);
        }
        block
    }

    #[test]
    fn frame_crc() {
        assert_eq!(command_frame(CMD0, 0)[5], 0x95);
        assert_eq!(command_frame(CMD8, CMD8_ARG)[5], 0x87);
        assert_eq!(command_frame(CMD17, 0), [0x51, 0, 0, 0, 0, 0x55]);
        assert_eq!(command_frame(CMD58, 0)[5], 0xFD);
    }

    #[test]
    fn csd_capacity() {
        assert_eq!(Csd(CSD_V1).structure(), 0);
        assert_eq!(Csd(CSD_V1).num_blocks(), Some(1024));
        assert_eq!(Csd(CSD_V2).structure(), 1);
        assert_eq!(Csd(CSD_V2).num_blocks(), Some(16 * 1024));

        // 2 GiB version 1.0 card: C_SIZE = 4095, C_SIZE_MULT = 7, READ_BL_LEN = 10
        let mut csd: [u8; 16] = [0; 16];
        csd[5] = 0x0A;
        csd[6] = 0x03;
        csd[7] = 0xFF;
        csd[8] = 0xC0;
        csd[9] = 0x03;
        csd[10] = 0x80;
        assert_eq!(Csd(csd).num_blocks(), Some(4 * 1024 * 1024));

        csd[0] = 0x80;
        assert_eq!(Csd(csd).num_blocks(), None);
    }

    #[test]
    fn address_by_card_type() {
        assert_eq!(CardType::Sdhc.address(3), 3);
        assert_eq!(CardType::Sd2.address(3), 1536);
        assert_eq!(CardType::Sd1.address(0), 0);
    }

    #[test]
    fn init_sdhc() {
        let (mut sd, card) = sd(FakeCard::new(Kind::V2Hc));
        assert_eq!(sd.init(), Ok(CardType::Sdhc));
        assert_eq!(sd.card_type(), Some(CardType::Sdhc));
        assert_eq!(sd.num_blocks(), Some(16 * 1024));

        let card = card.borrow();
        assert_eq!(
            card.commands(),
            [CMD0, CMD8, CMD55, ACMD41, CMD55, ACMD41, CMD55, ACMD41, CMD58, CMD9]
        );
        assert!(card.log.contains(&(ACMD41, ACMD41_HCS)));
    }

    #[test]
    fn init_v1_sets_block_len() {
        let (mut sd, card) = sd(FakeCard::new(Kind::V1));
        assert_eq!(sd.init(), Ok(CardType::Sd1));
        assert_eq!(sd.num_blocks(), Some(1024));

        let card = card.borrow();
        assert!(card.log.contains(&(ACMD41, 0)));
        assert!(card.log.contains(&(CMD16, 512)));
        assert!(!card.commands().contains(&CMD58));
    }

    #[test]
    fn no_card() {
        let mut fake = FakeCard::new(Kind::V2Hc);
        fake.present = false;
        let (mut sd, _) = sd(fake);
        assert_eq!(sd.init(), Err(Error::NoResponse));
        assert_eq!(sd.card_type(), None);
    }

    #[test]
    fn init_timeout() {
        let mut fake = FakeCard::new(Kind::V2);
        fake.busy_polls = u32::MAX;
        let (mut sd, _) = sd(fake);
        assert_eq!(sd.init(), Err(Error::Timeout));
    }

    #[test]
    fn block_addressed_write_read() {
        let (mut sd, card) = sd(FakeCard::new(Kind::V2Hc));
        sd.init().unwrap();

        let data: [u8; BLOCK_LEN] = pattern(3);
        sd.write_block(5, &data).unwrap();
        assert!(card.borrow().log.contains(&(CMD24, 5)));
        assert_eq!(card.borrow().blocks.get(&5), Some(&data));

        let mut readback: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
        sd.read_block(5, &mut readback).unwrap();
        assert_eq!(readback, data);
        assert!(card.borrow().log.contains(&(CMD17, 5)));
    }

    #[test]
    fn byte_addressed_write_read() {
        let (mut sd, card) = sd(FakeCard::new(Kind::V2));
        assert_eq!(sd.init(), Ok(CardType::Sd2));

        let data: [u8; BLOCK_LEN] = pattern(9);
        sd.write_block(3, &data).unwrap();
        assert!(card.borrow().log.contains(&(CMD24, 1536)));

        let mut readback: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
        sd.read_block(3, &mut readback).unwrap();
        assert_eq!(readback, data);
    }

    #[test]
    fn read_error_token() {
        let (mut sd, card) = sd(FakeCard::new(Kind::V2Hc));
        sd.init().unwrap();
        card.borrow_mut().read_error = true;
        let mut buf: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
        assert_eq!(sd.read_block(0, &mut buf), Err(Error::DataToken(0x08)));
    }

    #[test]
    fn write_rejected() {
        let (mut sd, card) = sd(FakeCard::new(Kind::V2Hc));
        sd.init().unwrap();
        card.borrow_mut().reject_writes = true;
        assert_eq!(sd.write_block(1, &pattern(0)), Err(Error::WriteRejected(0x0B)));
        assert!(card.borrow().blocks.is_empty());
    }

    #[test]
    fn block_range() {
        let (mut sd, _) = sd(FakeCard::new(Kind::V1));
        let mut buf: [u8; BLOCK_LEN] = [0; BLOCK_LEN];
        assert_eq!(sd.read_block(0, &mut buf), Err(Error::NotInitialized));

        sd.init().unwrap();
        assert_eq!(sd.read_block(1024, &mut buf), Err(Error::OutOfRange(1024)));
        assert_eq!(sd.write_block(1023, &pattern(1)), Ok(()));
    }
}
