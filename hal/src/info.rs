//! Device electronic signature

use core::{fmt::Display, ptr::read_volatile};

const UID_BASE: usize = 0x1FFF_F7AC;
const FLASH_SIZE: usize = 0x1FFF_F7CC;
const DBGMCU_IDCODE: usize = 0xE004_2000;

/// 96-bit unique device identifier
///
/// Returned by [`uid`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Uid {
    uid: [u32; 3],
}

impl From<[u32; 3]> for Uid {
    fn from(uid: [u32; 3]) -> Self {
        Uid { uid }
    }
}

impl From<Uid> for [u32; 3] {
    fn from(uid: Uid) -> Self {
        uid.uid
    }
}

impl From<Uid> for [u8; 12] {
    fn from(uid: Uid) -> Self {
        let mut bytes: [u8; 12] = [0; 12];
        bytes
            .chunks_exact_mut(4)
            .zip(uid.uid.iter())
            .for_each(|(chunk, word)| chunk.copy_from_slice(&word.to_le_bytes()));
        bytes
    }
}

impl Display for Uid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Uid")
            .field("x", &self.x())
            .field("y", &self.y())
            .field("wafer", &self.wafer())
            .field("lot", &core::str::from_utf8(&self.lot()).unwrap_or("?"))
            .finish()
    }
}

impl Uid {
    /// X coordinate on the wafer.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::info::Uid;
    ///
    /// let uid: Uid = Uid::from([0x0024_0013, 0x4E47_5007, 0x2036_3834]);
    /// assert_eq!(uid.x(), 0x13);
    /// assert_eq!(uid.y(), 0x24);
    /// ```
    pub const fn x(&self) -> u16 {
        self.uid[0] as u16
    }

    /// Y coordinate on the wafer.
    pub const fn y(&self) -> u16 {
        (self.uid[0] >> 16) as u16
    }

    /// Wafer number
    pub const fn wafer(&self) -> u8 {
        self.uid[1] as u8
    }

    /// Lot number, ASCII encoded.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::info::Uid;
    ///
    /// let uid: Uid = Uid::from([0x0024_0013, 0x4E47_5007, 0x2036_3834]);
    /// assert_eq!(uid.wafer(), 7);
    /// assert_eq!(&uid.lot(), b"PGN486 ");
    /// ```
    pub const fn lot(&self) -> [u8; 7] {
        [
            (self.uid[1] >> 8) as u8,
            (self.uid[1] >> 16) as u8,
            (self.uid[1] >> 24) as u8,
            self.uid[2] as u8,
            (self.uid[2] >> 8) as u8,
            (self.uid[2] >> 16) as u8,
            (self.uid[2] >> 24) as u8,
        ]
    }
}

/// Get the 96-bit unique device identifier
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::info::{uid, Uid};
///
/// let uid: Uid = uid();
/// ```
pub fn uid() -> Uid {
    unsafe {
        [
            read_volatile(UID_BASE as *const u32),
            read_volatile((UID_BASE + 4) as *const u32),
            read_volatile((UID_BASE + 8) as *const u32),
        ]
    }
    .into()
}

/// Flash size in kibibytes
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::info::flash_size_kibibyte;
///
/// // valid for the STM32F3348-DISCO board
/// assert_eq!(flash_size_kibibyte(), 64);
/// ```
pub fn flash_size_kibibyte() -> u16 {
    unsafe { read_volatile(FLASH_SIZE as *const u16) }
}

/// Flash size in bytes
pub fn flash_size() -> u32 {
    u32::from(flash_size_kibibyte()) << 10
}

/// Device line, from the debug MCU identity code.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum Device {
    /// STM32F334xx, STM32F303x4/6/8
    F334 = 0x438,
    /// STM32F373xx
    F373 = 0x432,
}

impl TryFrom<u16> for Device {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0x438 => Ok(Device::F334),
            0x432 => Ok(Device::F373),
            _ => Err(value),
        }
    }
}

/// Debug MCU identity code.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdCode {
    raw: u32,
}

impl From<u32> for IdCode {
    fn from(raw: u32) -> Self {
        IdCode { raw }
    }
}

impl IdCode {
    /// Device identifier.
    ///
    /// If the identifier is not a supported device it is returned in the
    /// `Err` variant.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::info::{Device, IdCode};
    ///
    /// let id: IdCode = IdCode::from(0x1001_6438);
    /// assert_eq!(id.device(), Ok(Device::F334));
    /// assert_eq!(id.rev_id(), 0x1001);
    /// assert_eq!(IdCode::from(0x0000_0422).device(), Err(0x422));
    /// ```
    pub fn device(&self) -> Result<Device, u16> {
        Device::try_from((self.raw & 0xFFF) as u16)
    }

    /// Revision identifier.
    pub const fn rev_id(&self) -> u16 {
        (self.raw >> 16) as u16
    }
}

/// Read the debug MCU identity code.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::info::{self, Device};
///
/// // valid for the STM32F3348-DISCO board
/// assert_eq!(info::idcode().device(), Ok(Device::F334));
/// ```
pub fn idcode() -> IdCode {
    unsafe { read_volatile(DBGMCU_IDCODE as *const u32) }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_bytes() {
        let uid: Uid = Uid::from([0x0403_0201, 0x0807_0605, 0x0C0B_0A09]);
        let bytes: [u8; 12] = uid.into();
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        assert_eq!(uid.wafer(), 5);
        assert_eq!(uid.lot(), [6, 7, 8, 9, 10, 11, 12]);
    }

    #[test]
    fn device_codes() {
        assert_eq!(IdCode::from(0x1000_6432).device(), Ok(Device::F373));
        assert_eq!(IdCode::from(0x2000_0438).rev_id(), 0x2000);
    }
}
