//! LM75 digital temperature sensor
//!
//! The sensor is generic over the `embedded-hal` blocking I2C traits.
//!
//! Temperatures are 9-bit two's complement values with a 0.5 °C resolution,
//! stored MSB first and left aligned in 16-bit registers.

use stm32f3xx_hal as hal;

use hal::embedded_hal::blocking::i2c::{Write, WriteRead};

/// I2C address with A2, A1, A0 tied low, as on the STM32373C-EVAL.
pub const DEFAULT_ADDR: u8 = 0x48;

mod reg {
    pub const TEMP: u8 = 0x00;
    pub const CONF: u8 = 0x01;
    pub const THYST: u8 = 0x02;
    pub const TOS: u8 = 0x03;
}

/// Temperature in units of 0.5 °C.
///
/// # Example
///
/// ```
/// use stm32373c_eval_bsp::lm75::Temperature;
///
/// let t = Temperature::from_reg([0x19, 0x80]);
/// assert_eq!(t.half_degrees(), 51);
/// assert_eq!(t.millicelsius(), 25_500);
///
/// let t = Temperature::from_reg([0xE7, 0x00]);
/// assert_eq!(t.millicelsius(), -25_000);
/// assert_eq!(t.to_reg(), [0xE7, 0x00]);
/// ```
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Temperature(i16);

impl Temperature {
    /// Largest temperature, +127.5 °C.
    pub const MAX: Temperature = Temperature(255);
    /// Smallest temperature, -128 °C.
    pub const MIN: Temperature = Temperature(-256);

    /// Create a temperature from units of 0.5 °C, saturating at the 9-bit
    /// range.
    pub const fn from_half_degrees(half: i16) -> Temperature {
        if half > Self::MAX.0 {
            Self::MAX
        } else if half < Self::MIN.0 {
            Self::MIN
        } else {
            Temperature(half)
        }
    }

    /// Create a temperature from millidegrees Celsius, rounding to the
    /// nearest 0.5 °C.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32373c_eval_bsp::lm75::Temperature;
    ///
    /// assert_eq!(Temperature::from_millicelsius(75_000).half_degrees(), 150);
    /// assert_eq!(Temperature::from_millicelsius(-760).half_degrees(), -2);
    /// assert_eq!(Temperature::from_millicelsius(200_000), Temperature::MAX);
    /// ```
    pub const fn from_millicelsius(mc: i32) -> Temperature {
        let half: i32 = if mc >= 0 {
            (mc + 250) / 500
        } else {
            (mc - 250) / 500
        };
        let half: i16 = if half > i16::MAX as i32 {
            i16::MAX
        } else if half < i16::MIN as i32 {
            i16::MIN
        } else {
            half as i16
        };
        Self::from_half_degrees(half)
    }

    /// Decode a temperature register.
    pub const fn from_reg(reg: [u8; 2]) -> Temperature {
        Temperature(i16::from_be_bytes(reg) >> 7)
    }

    /// Encode a temperature register.
    pub const fn to_reg(self) -> [u8; 2] {
        (self.0 << 7).to_be_bytes()
    }

    /// Temperature in units of 0.5 °C.
    pub const fn half_degrees(self) -> i16 {
        self.0
    }

    /// Temperature in millidegrees Celsius.
    pub const fn millicelsius(self) -> i32 {
        self.0 as i32 * 500
    }

    /// Temperature in whole degrees Celsius, rounded towards zero.
    pub const fn celsius(self) -> i16 {
        self.0 / 2
    }
}

/// Over-temperature output mode.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OsMode {
    /// Comparator mode, OS is active while the temperature is above
    /// T<sub>OS</sub> and until it falls below T<sub>HYST</sub>.
    Comparator,
    /// Interrupt mode, OS is active on a threshold crossing until a register
    /// is read.
    Interrupt,
}

/// Consecutive faults required to trigger OS.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultQueue {
    /// 1 fault.
    One = 0b00,
    /// 2 faults.
    Two = 0b01,
    /// 4 faults.
    Four = 0b10,
    /// 6 faults.
    Six = 0b11,
}

/// Configuration register.
///
/// # Example
///
/// ```
/// use stm32373c_eval_bsp::lm75::{Config, FaultQueue, OsMode};
///
/// const CFG: Config = Config::RESET
///     .set_os_mode(OsMode::Interrupt)
///     .set_fault_queue(FaultQueue::Four);
/// assert_eq!(CFG.raw(), 0b1_0010);
/// assert!(!CFG.shutdown());
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    val: u8,
}

impl From<u8> for Config {
    fn from(val: u8) -> Self {
        Config { val }
    }
}

impl Config {
    const SHUTDOWN: u8 = 1 << 0;
    const INT: u8 = 1 << 1;
    const POL: u8 = 1 << 2;
    const FQ_SHIFT: u8 = 3;

    /// Reset value, comparator mode, OS active low, 1 fault, running.
    pub const RESET: Config = Config { val: 0 };

    /// Get the raw register value.
    pub const fn raw(self) -> u8 {
        self.val
    }

    /// Set shutdown mode.
    #[must_use = "set_shutdown returns a modified Config"]
    pub const fn set_shutdown(mut self, shutdown: bool) -> Config {
        if shutdown {
            self.val |= Self::SHUTDOWN
        } else {
            self.val &= !Self::SHUTDOWN
        }
        self
    }

    /// Returns `true` if shutdown mode is set.
    pub const fn shutdown(&self) -> bool {
        self.val & Self::SHUTDOWN != 0
    }

    /// Set the OS output mode.
    #[must_use = "set_os_mode returns a modified Config"]
    pub const fn set_os_mode(mut self, mode: OsMode) -> Config {
        match mode {
            OsMode::Comparator => self.val &= !Self::INT,
            OsMode::Interrupt => self.val |= Self::INT,
        }
        self
    }

    /// OS output mode.
    pub const fn os_mode(&self) -> OsMode {
        if self.val & Self::INT == 0 {
            OsMode::Comparator
        } else {
            OsMode::Interrupt
        }
    }

    /// Set the OS output active high.
    #[must_use = "set_os_active_high returns a modified Config"]
    pub const fn set_os_active_high(mut self, high: bool) -> Config {
        if high {
            self.val |= Self::POL
        } else {
            self.val &= !Self::POL
        }
        self
    }

    /// Set the fault queue.
    #[must_use = "set_fault_queue returns a modified Config"]
    pub const fn set_fault_queue(mut self, fq: FaultQueue) -> Config {
        self.val = (self.val & !(0b11 << Self::FQ_SHIFT)) | ((fq as u8) << Self::FQ_SHIFT);
        self
    }
}

/// LM75 driver.
#[derive(Debug)]
pub struct Lm75<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C, E> Lm75<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
{
    /// Create a new LM75 driver.
    ///
    /// This does not communicate with the sensor.
    pub const fn new(i2c: I2C, addr: u8) -> Self {
        Lm75 { i2c, addr }
    }

    /// Free the I2C bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    fn read_temp_reg(&mut self, reg: u8) -> Result<Temperature, E> {
        let mut buf: [u8; 2] = [0; 2];
        self.i2c.write_read(self.addr, &[reg], &mut buf)?;
        Ok(Temperature::from_reg(buf))
    }

    fn write_temp_reg(&mut self, reg: u8, t: Temperature) -> Result<(), E> {
        let [msb, lsb] = t.to_reg();
        self.i2c.write(self.addr, &[reg, msb, lsb])
    }

    /// Read the temperature.
    pub fn temperature(&mut self) -> Result<Temperature, E> {
        self.read_temp_reg(reg::TEMP)
    }

    /// Read the configuration register.
    pub fn config(&mut self) -> Result<Config, E> {
        let mut buf: [u8; 1] = [0];
        self.i2c.write_read(self.addr, &[reg::CONF], &mut buf)?;
        Ok(buf[0].into())
    }

    /// Write the configuration register.
    pub fn set_config(&mut self, cfg: Config) -> Result<(), E> {
        self.i2c.write(self.addr, &[reg::CONF, cfg.raw()])
    }

    /// Enter or leave shutdown mode, keeping the other settings.
    pub fn set_shutdown(&mut self, shutdown: bool) -> Result<(), E> {
        let cfg: Config = self.config()?;
        self.set_config(cfg.set_shutdown(shutdown))
    }

    /// Read the over-temperature threshold, T<sub>OS</sub>.
    pub fn os_threshold(&mut self) -> Result<Temperature, E> {
        self.read_temp_reg(reg::TOS)
    }

    /// Read the hysteresis threshold, T<sub>HYST</sub>.
    pub fn hysteresis(&mut self) -> Result<Temperature, E> {
        self.read_temp_reg(reg::THYST)
    }

    /// Set the over-temperature and hysteresis thresholds.
    ///
    /// The reset values are 80 °C and 75 °C.
    pub fn set_thresholds(&mut self, os: Temperature, hyst: Temperature) -> Result<(), E> {
        debug_assert!(hyst <= os, "hysteresis above the over-temperature threshold");
        self.write_temp_reg(reg::TOS, os)?;
        self.write_temp_reg(reg::THYST, hyst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Nack;

    struct FakeLm75 {
        regs: [[u8; 2]; 4],
        ptr: usize,
        present: bool,
    }

    impl FakeLm75 {
        fn new() -> Self {
            FakeLm75 {
                regs: [[0x19, 0x00], [0x00, 0x00], [0x4B, 0x00], [0x50, 0x00]],
                ptr: 0,
                present: true,
            }
        }
    }

    impl Write for FakeLm75 {
        type Error = Nack;

        fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), Nack> {
            if !self.present || addr != DEFAULT_ADDR {
                return Err(Nack);
            }
            let (ptr, data) = bytes.split_first().ok_or(Nack)?;
            self.ptr = usize::from(*ptr & 0b11);
            for (dst, src) in self.regs[self.ptr].iter_mut().zip(data) {
                *dst = *src;
            }
            Ok(())
        }
    }

    impl WriteRead for FakeLm75 {
        type Error = Nack;

        fn write_read(&mut self, addr: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Nack> {
            self.write(addr, &bytes[..1])?;
            for (dst, src) in buffer.iter_mut().zip(self.regs[self.ptr].iter()) {
                *dst = *src;
            }
            Ok(())
        }
    }

    #[test]
    fn temperature_codec() {
        assert_eq!(Temperature::from_reg([0x00, 0x80]).half_degrees(), 1);
        assert_eq!(Temperature::from_reg([0xFF, 0x80]).half_degrees(), -1);
        assert_eq!(Temperature::from_reg([0x7F, 0x80]), Temperature::MAX);
        assert_eq!(Temperature::from_reg([0x80, 0x00]), Temperature::MIN);
        // unused low bits are ignored
        assert_eq!(Temperature::from_reg([0x19, 0xFF]).millicelsius(), 25_500);
        assert_eq!(Temperature::from_half_degrees(-3).to_reg(), [0xFE, 0x80]);
        assert_eq!(Temperature::from_half_degrees(-3).celsius(), -1);
    }

    #[test]
    fn read_registers() {
        let mut lm75 = Lm75::new(FakeLm75::new(), DEFAULT_ADDR);
        assert_eq!(lm75.temperature().map(Temperature::millicelsius), Ok(25_000));
        assert_eq!(lm75.os_threshold().map(Temperature::celsius), Ok(80));
        assert_eq!(lm75.hysteresis().map(Temperature::celsius), Ok(75));
        assert_eq!(lm75.config(), Ok(Config::RESET));
    }

    #[test]
    fn write_registers() {
        let mut lm75 = Lm75::new(FakeLm75::new(), DEFAULT_ADDR);
        lm75.set_thresholds(
            Temperature::from_millicelsius(45_500),
            Temperature::from_millicelsius(40_000),
        )
        .unwrap();
        lm75.set_shutdown(true).unwrap();

        let fake: FakeLm75 = lm75.free();
        assert_eq!(fake.regs[3], [0x2D, 0x80]);
        assert_eq!(fake.regs[2], [0x28, 0x00]);
        assert_eq!(fake.regs[1][0], 0b1);
    }

    #[test]
    fn nack_propagates() {
        let mut fake = FakeLm75::new();
        fake.present = false;
        let mut lm75 = Lm75::new(fake, DEFAULT_ADDR);
        assert_eq!(lm75.temperature(), Err(Nack));
        assert_eq!(lm75.set_shutdown(false), Err(Nack));
    }
}
