//! M24-series I2C EEPROM
//!
//! Memory addresses are 16 bits, sent MSB first after the device address.
//! Writes are split at page boundaries, a write that crosses a page would
//! wrap around to the start of the page in the device.
//!
//! After each page write the device does not acknowledge its address until
//! the internal write cycle completes, the driver polls for the ACK.

use stm32f3xx_hal as hal;

use hal::embedded_hal::blocking::i2c::{Write, WriteRead};

/// I2C address with E2, E1 tied low, as on the STM32373C-EVAL.
pub const DEFAULT_ADDR: u8 = 0x50;

/// Largest supported page size in bytes.
pub const MAX_PAGE_SIZE: usize = 64;

/// Maximum number of address polls while waiting for a write cycle.
pub const MAX_POLLS: u32 = 10_000;

/// EEPROM geometry.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Size of the memory in bytes.
    pub capacity: u32,
    /// Page size in bytes, a power of two.
    pub page_size: usize,
}

impl Geometry {
    /// M24LR64, 64 Kbit, 4 byte pages, on the STM32373C-EVAL.
    pub const M24LR64: Geometry = Geometry {
        capacity: 8 * 1024,
        page_size: 4,
    };

    /// M24C64, 64 Kbit, 32 byte pages.
    pub const M24C64: Geometry = Geometry {
        capacity: 8 * 1024,
        page_size: 32,
    };

    /// M24256, 256 Kbit, 64 byte pages.
    pub const M24256: Geometry = Geometry {
        capacity: 32 * 1024,
        page_size: 64,
    };

    /// Split a write of `len` bytes at `addr` into `(addr, len)` chunks that
    /// do not cross a page boundary.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32373c_eval_bsp::eeprom::Geometry;
    ///
    /// let mut chunks = Geometry::M24LR64.page_chunks(6, 7);
    /// assert_eq!(chunks.next(), Some((6, 2)));
    /// assert_eq!(chunks.next(), Some((8, 4)));
    /// assert_eq!(chunks.next(), Some((12, 1)));
    /// assert_eq!(chunks.next(), None);
    /// ```
    pub fn page_chunks(&self, addr: u16, len: usize) -> PageChunks {
        PageChunks {
            addr: u32::from(addr),
            remain: len,
            page_size: self.page_size,
        }
    }
}

/// Iterator returned by [`Geometry::page_chunks`].
#[derive(Debug, Clone)]
pub struct PageChunks {
    addr: u32,
    remain: usize,
    page_size: usize,
}

impl Iterator for PageChunks {
    type Item = (u16, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remain == 0 {
            return None;
        }
        let offset: usize = (self.addr as usize) & (self.page_size - 1);
        let len: usize = (self.page_size - offset).min(self.remain);
        let item = (self.addr as u16, len);
        self.addr += len as u32;
        self.remain -= len;
        Some(item)
    }
}

/// EEPROM errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C bus error.
    I2c(E),
    /// The access does not fit in the memory.
    OutOfRange {
        /// Start address of the access.
        addr: u16,
        /// Length of the access.
        len: usize,
    },
    /// The device did not acknowledge after a write cycle.
    WriteTimeout,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::I2c(e)
    }
}

/// M24-series EEPROM driver.
#[derive(Debug)]
pub struct Eeprom<I2C> {
    i2c: I2C,
    addr: u8,
    geometry: Geometry,
}

impl<I2C, E> Eeprom<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    /// Create a new EEPROM driver.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32373c_eval_bsp::{
    ///     eeprom::{self, Eeprom, Geometry},
    ///     hal::{cortex_m, gpio::PortA, pac},
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    /// let i2c = cortex_m::interrupt::free(|cs| {
    ///     stm32373c_eval_bsp::new_i2c(dp.I2C2, gpioa.a9, gpioa.a10, &mut dp.RCC, cs)
    /// })
    /// .unwrap();
    /// let mut eeprom = Eeprom::new(i2c, eeprom::DEFAULT_ADDR, Geometry::M24LR64);
    /// eeprom.write(0x100, b"hello")?;
    /// # Ok::<(), eeprom::Error<stm32373c_eval_bsp::hal::i2c::Error>>(())
    /// ```
    ///
    /// # Panics
    ///
    /// Page sizes above [`MAX_PAGE_SIZE`] or not a power of two.
    pub fn new(i2c: I2C, addr: u8, geometry: Geometry) -> Self {
        assert!(
            geometry.page_size.is_power_of_two() && geometry.page_size <= MAX_PAGE_SIZE,
            "unsupported page size"
        );
        Eeprom {
            i2c,
            addr,
            geometry,
        }
    }

    /// Free the I2C bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    /// EEPROM geometry.
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn check_range(&self, addr: u16, len: usize) -> Result<(), Error<E>> {
        if u64::from(addr) + len as u64 > u64::from(self.geometry.capacity) {
            Err(Error::OutOfRange { addr, len })
        } else {
            Ok(())
        }
    }

    /// Read a single byte.
    pub fn read_byte(&mut self, addr: u16) -> Result<u8, Error<E>> {
        let mut buf: [u8; 1] = [0];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }

    /// Sequential read starting at `addr`.
    ///
    /// Reads are not limited to a page.
    pub fn read(&mut self, addr: u16, buf: &mut [u8]) -> Result<(), Error<E>> {
        self.check_range(addr, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.i2c.write_read(self.addr, &addr.to_be_bytes(), buf)?;
        Ok(())
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, addr: u16, byte: u8) -> Result<(), Error<E>> {
        self.write(addr, &[byte])
    }

    /// Write `data` starting at `addr`.
    ///
    /// The data is written one page at a time, waiting for the write cycle
    /// after each page.
    pub fn write(&mut self, addr: u16, data: &[u8]) -> Result<(), Error<E>> {
        self.check_range(addr, data.len())?;

        let mut buf: [u8; MAX_PAGE_SIZE + 2] = [0; MAX_PAGE_SIZE + 2];
        let mut data: &[u8] = data;
        for (chunk_addr, len) in self.geometry.page_chunks(addr, data.len()) {
            let (chunk, rest) = data.split_at(len);
            data = rest;

            buf[..2].copy_from_slice(&chunk_addr.to_be_bytes());
            buf[2..2 + len].copy_from_slice(chunk);
            self.i2c.write(self.addr, &buf[..2 + len])?;
            self.wait_write_cycle(chunk_addr)?;
        }
        Ok(())
    }

    /// Poll the device until it acknowledges its address.
    ///
    /// The poll writes the memory address without data, this only sets the
    /// address pointer.
    fn wait_write_cycle(&mut self, addr: u16) -> Result<(), Error<E>> {
        for _ in 0..MAX_POLLS {
            if self.i2c.write(self.addr, &addr.to_be_bytes()).is_ok() {
                return Ok(());
            }
        }
        Err(Error::WriteTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    struct Nack;

    struct FakeEeprom {
        mem: [u8; 64],
        page_size: usize,
        ptr: usize,
        busy: u32,
        busy_after_write: u32,
        page_writes: usize,
    }

    impl FakeEeprom {
        fn new(page_size: usize, busy_after_write: u32) -> Self {
            FakeEeprom {
                mem: [0xFF; 64],
                page_size,
                ptr: 0,
                busy: 0,
                busy_after_write,
                page_writes: 0,
            }
        }
    }

    impl Write for FakeEeprom {
        type Error = Nack;

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Nack> {
            if addr != DEFAULT_ADDR {
                return Err(Nack);
            }
            if self.busy > 0 {
                self.busy -= 1;
                return Err(Nack);
            }
            let ptr: usize = usize::from(u16::from_be_bytes([bytes[0], bytes[1]]));
            self.ptr = ptr;
            let data: &[u8] = &bytes[2..];
            if !data.is_empty() {
                // a page write rolls over within the page
                let page: usize = ptr & !(self.page_size - 1);
                for (n, byte) in data.iter().enumerate() {
                    let offset: usize = (ptr + n) & (self.page_size - 1);
                    self.mem[page + offset] = *byte;
                }
                self.page_writes += 1;
                self.busy = self.busy_after_write;
            }
            Ok(())
        }
    }

    impl WriteRead for FakeEeprom {
        type Error = Nack;

        fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Nack> {
            self.write(addr, bytes)?;
            for (n, dst) in buffer.iter_mut().enumerate() {
                *dst = self.mem[(self.ptr + n) % self.mem.len()];
            }
            Ok(())
        }
    }

    const GEOMETRY: Geometry = Geometry {
        capacity: 64,
        page_size: 8,
    };

    #[test]
    fn chunks_aligned() {
        let chunks: Vec<(u16, usize)> = GEOMETRY.page_chunks(8, 16).collect();
        assert_eq!(chunks, [(8, 8), (16, 8)]);
        assert_eq!(GEOMETRY.page_chunks(3, 0).count(), 0);
    }

    #[test]
    fn write_across_pages() {
        let mut eeprom = Eeprom::new(FakeEeprom::new(8, 3), DEFAULT_ADDR, GEOMETRY);
        let data: [u8; 11] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        eeprom.write(5, &data).unwrap();

        let mut readback: [u8; 11] = [0; 11];
        eeprom.read(5, &mut readback).unwrap();
        assert_eq!(readback, data);
        assert_eq!(eeprom.read_byte(4), Ok(0xFF));
        assert_eq!(eeprom.read_byte(16), Ok(0xFF));

        let fake: FakeEeprom = eeprom.free();
        assert_eq!(fake.page_writes, 2);
    }

    #[test]
    fn single_byte() {
        let mut eeprom = Eeprom::new(FakeEeprom::new(8, 1), DEFAULT_ADDR, GEOMETRY);
        eeprom.write_byte(63, 0xA5).unwrap();
        assert_eq!(eeprom.read_byte(63), Ok(0xA5));
    }

    #[test]
    fn out_of_range() {
        let mut eeprom = Eeprom::new(FakeEeprom::new(8, 0), DEFAULT_ADDR, GEOMETRY);
        assert_eq!(
            eeprom.write(60, &[0; 5]),
            Err(Error::OutOfRange { addr: 60, len: 5 })
        );
        let mut buf: [u8; 2] = [0; 2];
        assert_eq!(
            eeprom.read(63, &mut buf),
            Err(Error::OutOfRange { addr: 63, len: 2 })
        );
        assert_eq!(eeprom.free().page_writes, 0);
    }

    #[test]
    fn write_cycle_timeout() {
        let mut eeprom = Eeprom::new(FakeEeprom::new(8, u32::MAX), DEFAULT_ADDR, GEOMETRY);
        assert_eq!(eeprom.write_byte(0, 1), Err(Error::WriteTimeout));
    }

    #[test]
    fn wrong_address() {
        let mut eeprom = Eeprom::new(FakeEeprom::new(8, 0), 0x51, GEOMETRY);
        assert_eq!(eeprom.read_byte(0), Err(Error::I2c(Nack)));
    }
}
