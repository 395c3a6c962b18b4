//! Reset and clocking control
//!
//! Unlike other HALs clocks do not get frozen.
//! The power-conversion demos run the core from the PLL at 72 MHz and feed the
//! HRTIM with twice that, the power-mode demos drop back to the HSI.

use crate::pac;
use cortex_m::{interrupt::CriticalSection, peripheral::syst::SystClkSource};

/// HSI oscillator frequency.
pub const HSI_HZ: u32 = 8_000_000;

/// HSE crystal frequency on the STM32F3348-DISCO and STM32373C-EVAL boards.
pub const HSE_HZ: u32 = 8_000_000;

/// LSI oscillator typical frequency.
pub const LSI_HZ: u32 = 40_000;

/// LSE crystal frequency.
pub const LSE_HZ: u32 = 32_768;

// RCC_CR
const CR_HSION: u32 = 1 << 0;
const CR_HSIRDY: u32 = 1 << 1;
const CR_HSEON: u32 = 1 << 16;
const CR_HSERDY: u32 = 1 << 17;
const CR_HSEBYP: u32 = 1 << 18;
const CR_PLLON: u32 = 1 << 24;
const CR_PLLRDY: u32 = 1 << 25;

// RCC_CFGR
const CFGR_SW_MASK: u32 = 0b11;
const CFGR_SWS_SHIFT: u32 = 2;
const CFGR_HPRE_SHIFT: u32 = 4;
const CFGR_PPRE1_SHIFT: u32 = 8;
const CFGR_PPRE2_SHIFT: u32 = 11;
const CFGR_PLLSRC: u32 = 1 << 16;
const CFGR_PLLMUL_SHIFT: u32 = 18;
const CFGR_PLLMUL_MASK: u32 = 0b1111 << CFGR_PLLMUL_SHIFT;
const CFGR_PRE_MASK: u32 = (0b1111 << CFGR_HPRE_SHIFT)
    | (0b111 << CFGR_PPRE1_SHIFT)
    | (0b111 << CFGR_PPRE2_SHIFT);

// RCC_CFGR2
const CFGR2_PREDIV_MASK: u32 = 0b1111;

// RCC_CFGR3
#[cfg(feature = "stm32f334")]
const CFGR3_HRTIM1SW: u32 = 1 << 12;

// RCC_BDCR
const BDCR_LSEON: u32 = 1 << 0;
const BDCR_LSERDY: u32 = 1 << 1;
const BDCR_BDRST: u32 = 1 << 16;

// RCC_CSR
const CSR_LSION: u32 = 1 << 0;
const CSR_LSIRDY: u32 = 1 << 1;

// FLASH_ACR
const ACR_LATENCY_MASK: u32 = 0b111;
const ACR_PRFTBE: u32 = 1 << 4;

/// System clock switch values (`SW` and `SWS`).
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysClkSrc {
    /// HSI oscillator.
    Hsi = 0b00,
    /// HSE oscillator.
    Hse = 0b01,
    /// Phase locked loop.
    Pll = 0b10,
}

impl SysClkSrc {
    const fn from_bits(bits: u32) -> SysClkSrc {
        match bits & 0b11 {
            0b01 => SysClkSrc::Hse,
            0b10 => SysClkSrc::Pll,
            _ => SysClkSrc::Hsi,
        }
    }
}

#[repr(u8)]
#[derive(Debug, PartialEq, Eq, Clone, Copy, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum FlashLatency {
    /// Zero wait state.
    Zero = 0b000,
    /// One wait state.
    One = 0b001,
    /// Two wait states.
    Two = 0b010,
}

impl FlashLatency {
    /// Wait states for a given HCLK, RM0364 section 3.2.1.
    pub const fn from_hertz(hz: u32) -> FlashLatency {
        match hz {
            0..=24_000_000 => FlashLatency::Zero,
            24_000_001..=48_000_000 => FlashLatency::One,
            _ => FlashLatency::Two,
        }
    }
}

fn set_flash_latency(flash: &mut pac::FLASH, target_sysclk_hz: u32) {
    let latency: FlashLatency = FlashLatency::from_hertz(target_sysclk_hz);
    write_bits!(
        flash.acr,
        ACR_LATENCY_MASK | ACR_PRFTBE,
        (latency as u32) | ACR_PRFTBE
    );
    while flash.acr.read().bits() & ACR_LATENCY_MASK != latency as u32 {}
}

/// PLL input source.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllSrc {
    /// HSI divided by two.
    HsiDiv2,
    /// HSE divided by `prediv` (1 to 16).
    Hse {
        /// HSE pre-divider.
        prediv: u8,
        /// HSE oscillator bypass (external clock on OSC_IN).
        bypass: bool,
    },
}

/// PLL configuration errors.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllError {
    /// Multiplier outside of 2..=16.
    Mul(u8),
    /// HSE pre-divider outside of 1..=16.
    Prediv(u8),
    /// Resulting frequency is above the 72 MHz limit.
    Overclock(u32),
}

/// PLL configuration.
///
/// # Example
///
/// ```
/// use stm32f3xx_hal::rcc::PllConfig;
///
/// assert_eq!(PllConfig::HSE_72MHZ.sysclk_hz(), 72_000_000);
/// assert_eq!(PllConfig::HSI_64MHZ.sysclk_hz(), 64_000_000);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PllConfig {
    src: PllSrc,
    mul: u8,
}

impl PllConfig {
    /// Maximum system clock frequency.
    pub const MAX_HZ: u32 = 72_000_000;

    /// 8 MHz HSE × 9 = 72 MHz.
    pub const HSE_72MHZ: PllConfig = PllConfig {
        src: PllSrc::Hse {
            prediv: 1,
            bypass: false,
        },
        mul: 9,
    };

    /// 8 MHz HSE from the ST-LINK MCO (bypass) × 9 = 72 MHz.
    pub const HSE_BYPASS_72MHZ: PllConfig = PllConfig {
        src: PllSrc::Hse {
            prediv: 1,
            bypass: true,
        },
        mul: 9,
    };

    /// 8 MHz HSI / 2 × 16 = 64 MHz.
    pub const HSI_64MHZ: PllConfig = PllConfig {
        src: PllSrc::HsiDiv2,
        mul: 16,
    };

    /// Create a new PLL configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3xx_hal::rcc::{PllConfig, PllError, PllSrc};
    ///
    /// let pll = PllConfig::new(PllSrc::HsiDiv2, 9)?;
    /// assert_eq!(pll.sysclk_hz(), 36_000_000);
    ///
    /// assert_eq!(PllConfig::new(PllSrc::HsiDiv2, 17), Err(PllError::Mul(17)));
    /// assert_eq!(
    ///     PllConfig::new(PllSrc::Hse { prediv: 1, bypass: false }, 16),
    ///     Err(PllError::Overclock(128_000_000))
    /// );
    /// # Ok::<(), PllError>(())
    /// ```
    pub const fn new(src: PllSrc, mul: u8) -> Result<PllConfig, PllError> {
        if mul < 2 || mul > 16 {
            return Err(PllError::Mul(mul));
        }
        if let PllSrc::Hse { prediv, .. } = src {
            if prediv == 0 || prediv > 16 {
                return Err(PllError::Prediv(prediv));
            }
        }
        let cfg = PllConfig { src, mul };
        let hz: u32 = cfg.sysclk_hz();
        if hz > Self::MAX_HZ {
            Err(PllError::Overclock(hz))
        } else {
            Ok(cfg)
        }
    }

    /// PLL input source.
    pub const fn src(&self) -> PllSrc {
        self.src
    }

    /// PLL multiplier.
    pub const fn mul(&self) -> u8 {
        self.mul
    }

    /// PLL input frequency in hertz.
    pub const fn input_hz(&self) -> u32 {
        match self.src {
            PllSrc::HsiDiv2 => HSI_HZ / 2,
            PllSrc::Hse { prediv, .. } => HSE_HZ / (prediv as u32),
        }
    }

    /// PLL output frequency in hertz.
    pub const fn sysclk_hz(&self) -> u32 {
        self.input_hz() * (self.mul as u32)
    }

    const fn cfgr_bits(&self) -> u32 {
        let src: u32 = match self.src {
            PllSrc::HsiDiv2 => 0,
            PllSrc::Hse { .. } => CFGR_PLLSRC,
        };
        src | (((self.mul as u32) - 2) << CFGR_PLLMUL_SHIFT)
    }
}

/// AHB prescaler divisor from the `HPRE` field.
pub(crate) const fn hpre_div(hpre: u8) -> u16 {
    match hpre {
        0b1000 => 2,
        0b1001 => 4,
        0b1010 => 8,
        0b1011 => 16,
        0b1100 => 64,
        0b1101 => 128,
        0b1110 => 256,
        0b1111 => 512,
        _ => 1,
    }
}

/// APB prescaler divisor from the `PPRE1` or `PPRE2` field.
pub(crate) const fn ppre_div(pre: u8) -> u8 {
    match pre {
        0b100 => 2,
        0b101 => 4,
        0b110 => 8,
        0b111 => 16,
        _ => 1,
    }
}

/// APB1 at most 36 MHz, APB2 and AHB undivided.
const fn bus_prescalers(sysclk_hz: u32) -> u32 {
    if sysclk_hz > 36_000_000 {
        0b100 << CFGR_PPRE1_SHIFT
    } else {
        0
    }
}

fn switch_sysclk(flash: &mut pac::FLASH, rcc: &mut pac::RCC, src: SysClkSrc, target_hz: u32) {
    let current_hz: u32 = sysclk_hz(rcc);
    let pre: u32 = bus_prescalers(target_hz);

    if target_hz > current_hz {
        // freq increase, set new flash latency first
        set_flash_latency(flash, target_hz);
        write_bits!(rcc.cfgr, CFGR_PRE_MASK, pre);
        write_bits!(rcc.cfgr, CFGR_SW_MASK, src as u32);
        while SysClkSrc::from_bits(rcc.cfgr.read().bits() >> CFGR_SWS_SHIFT) != src {}
    } else {
        // freq decrease, set new flash latency last
        write_bits!(rcc.cfgr, CFGR_SW_MASK, src as u32);
        while SysClkSrc::from_bits(rcc.cfgr.read().bits() >> CFGR_SWS_SHIFT) != src {}
        write_bits!(rcc.cfgr, CFGR_PRE_MASK, pre);
        set_flash_latency(flash, target_hz);
    }
}

/// Set the sysclk to use the HSI 8 MHz clock.
///
/// # Safety
///
/// 1. Ensure peripherals are not in-use before calling this function.
/// 2. Ensure peripherals have their clocks adjusted correctly for the new
///    sysclk frequency after calling this function.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, rcc::set_sysclk_hsi};
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// cortex_m::interrupt::free(|cs| unsafe { set_sysclk_hsi(&mut dp.FLASH, &mut dp.RCC, cs) });
/// ```
#[allow(unused_variables)]
pub unsafe fn set_sysclk_hsi(flash: &mut pac::FLASH, rcc: &mut pac::RCC, cs: &CriticalSection) {
    set_bits!(rcc.cr, CR_HSION);
    while rcc.cr.read().bits() & CR_HSIRDY == 0 {}

    switch_sysclk(flash, rcc, SysClkSrc::Hsi, HSI_HZ);

    // the PLL can only be reconfigured while it is off
    clear_bits!(rcc.cr, CR_PLLON);
}

/// Set the sysclk to use the PLL.
///
/// The PLL is stopped (after switching the sysclk to the HSI if required),
/// reconfigured, restarted, and then selected as the sysclk source.
///
/// # Safety
///
/// 1. Ensure peripherals are not in-use before calling this function.
/// 2. Ensure peripherals have their clocks adjusted correctly for the new
///    sysclk frequency after calling this function.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{
///     pac,
///     rcc::{set_sysclk_pll, PllConfig},
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// cortex_m::interrupt::free(|cs| unsafe {
///     set_sysclk_pll(&mut dp.FLASH, &mut dp.RCC, &PllConfig::HSE_72MHZ, cs)
/// });
/// ```
pub unsafe fn set_sysclk_pll(
    flash: &mut pac::FLASH,
    rcc: &mut pac::RCC,
    cfg: &PllConfig,
    cs: &CriticalSection,
) {
    if SysClkSrc::from_bits(rcc.cfgr.read().bits() >> CFGR_SWS_SHIFT) == SysClkSrc::Pll {
        unsafe { set_sysclk_hsi(flash, rcc, cs) };
    }
    clear_bits!(rcc.cr, CR_PLLON);
    while rcc.cr.read().bits() & CR_PLLRDY != 0 {}

    if let PllSrc::Hse { prediv, bypass } = cfg.src {
        if bypass {
            set_bits!(rcc.cr, CR_HSEBYP);
        } else {
            clear_bits!(rcc.cr, CR_HSEBYP);
        }
        set_bits!(rcc.cr, CR_HSEON);
        while rcc.cr.read().bits() & CR_HSERDY == 0 {}
        write_bits!(rcc.cfgr2, CFGR2_PREDIV_MASK, u32::from(prediv - 1));
    }

    write_bits!(rcc.cfgr, CFGR_PLLSRC | CFGR_PLLMUL_MASK, cfg.cfgr_bits());

    set_bits!(rcc.cr, CR_PLLON);
    while rcc.cr.read().bits() & CR_PLLRDY == 0 {}

    switch_sysclk(flash, rcc, SysClkSrc::Pll, cfg.sysclk_hz());
}

fn pllclk(rcc: &pac::RCC, cfgr: u32) -> u32 {
    let mul: u32 = (((cfgr & CFGR_PLLMUL_MASK) >> CFGR_PLLMUL_SHIFT) + 2).min(16);
    let input: u32 = if cfgr & CFGR_PLLSRC == 0 {
        HSI_HZ / 2
    } else {
        let prediv: u32 = (rcc.cfgr2.read().bits() & CFGR2_PREDIV_MASK) + 1;
        HSE_HZ / prediv
    };
    input * mul
}

/// Calculate the current system clock frequency in hertz.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, rcc::sysclk_hz};
///
/// let dp: pac::Peripherals = pac::Peripherals::take().unwrap();
///
/// // without any initialization sysclk will be 8MHz
/// assert_eq!(sysclk_hz(&dp.RCC), 8_000_000);
/// ```
pub fn sysclk_hz(rcc: &pac::RCC) -> u32 {
    let cfgr: u32 = rcc.cfgr.read().bits();
    match SysClkSrc::from_bits(cfgr >> CFGR_SWS_SHIFT) {
        SysClkSrc::Hsi => HSI_HZ,
        SysClkSrc::Hse => HSE_HZ,
        SysClkSrc::Pll => pllclk(rcc, cfgr),
    }
}

/// Calculate the current AHB clock (HCLK) frequency in hertz.
pub fn hclk_hz(rcc: &pac::RCC) -> u32 {
    let hpre: u8 = ((rcc.cfgr.read().bits() >> CFGR_HPRE_SHIFT) & 0b1111) as u8;
    sysclk_hz(rcc) / u32::from(hpre_div(hpre))
}

fn ppre1(rcc: &pac::RCC) -> u8 {
    ((rcc.cfgr.read().bits() >> CFGR_PPRE1_SHIFT) & 0b111) as u8
}

fn ppre2(rcc: &pac::RCC) -> u8 {
    ((rcc.cfgr.read().bits() >> CFGR_PPRE2_SHIFT) & 0b111) as u8
}

/// Calculate the current PCLK1 frequency in hertz.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, rcc::pclk1_hz};
///
/// let dp: pac::Peripherals = pac::Peripherals::take().unwrap();
///
/// // without any initialization pclk1 will be 8MHz
/// assert_eq!(pclk1_hz(&dp.RCC), 8_000_000);
/// ```
pub fn pclk1_hz(rcc: &pac::RCC) -> u32 {
    hclk_hz(rcc) / u32::from(ppre_div(ppre1(rcc)))
}

/// Calculate the current PCLK2 frequency in hertz.
pub fn pclk2_hz(rcc: &pac::RCC) -> u32 {
    hclk_hz(rcc) / u32::from(ppre_div(ppre2(rcc)))
}

/// Timer clock on APB1.
///
/// When the APB1 prescaler divides HCLK the timer clock is twice PCLK1.
pub fn apb1_timer_hz(rcc: &pac::RCC) -> u32 {
    let pre: u8 = ppre_div(ppre1(rcc));
    if pre == 1 {
        hclk_hz(rcc)
    } else {
        pclk1_hz(rcc) * 2
    }
}

/// HRTIM input clock frequency.
///
/// The HRTIM runs from the PLL output × 2 when `HRTIM1SW` is set, and from
/// PCLK2 otherwise.
#[cfg(feature = "stm32f334")]
pub fn hrtim_hz(rcc: &pac::RCC) -> u32 {
    let cfgr: u32 = rcc.cfgr.read().bits();
    if rcc.cfgr3.read().bits() & CFGR3_HRTIM1SW != 0 {
        pllclk(rcc, cfgr) * 2
    } else {
        pclk2_hz(rcc)
    }
}

/// Select the PLL × 2 as the HRTIM clock source.
///
/// The PLL must be running, and the sysclk must be the PLL.
/// RM0364 section 9.2.6: the 144 MHz HRTIM clock is only available when
/// the AHB and APB2 prescalers are 1.
#[cfg(feature = "stm32f334")]
pub fn set_hrtim_clk_pll(rcc: &mut pac::RCC) {
    debug_assert!(rcc.cr.read().bits() & CR_PLLRDY != 0);
    set_bits!(rcc.cfgr3, CFGR3_HRTIM1SW);
}

/// Calculate the current systick frequency in hertz.
///
/// # Example
///
/// Create a systick based delay structure.
///
/// ```no_run
/// use stm32f3xx_hal::{
///     cortex_m::{delay::Delay, peripheral::syst::SystClkSource},
///     pac,
///     rcc::cpu_systick_hz,
/// };
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// let cp: pac::CorePeripherals = pac::CorePeripherals::take().unwrap();
///
/// let mut delay: Delay = Delay::new(cp.SYST, cpu_systick_hz(&dp.RCC, SystClkSource::Core));
/// delay.delay_ms(100);
/// ```
pub fn cpu_systick_hz(rcc: &pac::RCC, src: SystClkSource) -> u32 {
    let hclk: u32 = hclk_hz(rcc);
    match src {
        SystClkSource::Core => hclk,
        SystClkSource::External => hclk / 8,
    }
}

/// Enable the SYSCFG clock.
///
/// Required before routing GPIO pins to EXTI lines.
#[inline]
pub fn enable_syscfg(rcc: &mut pac::RCC) {
    en::apb2(rcc, en::APB2_SYSCFG);
}

/// Enable the LSI clock and wait for it to be ready.
#[inline]
pub fn enable_lsi(rcc: &mut pac::RCC) {
    set_bits!(rcc.csr, CSR_LSION);
    while rcc.csr.read().bits() & CSR_LSIRDY == 0 {}
}

/// Enable the LSE clock and wait for it to be ready.
///
/// Backup domain write access must be enabled first with
/// [`pwr::enable_backup_access`](crate::pwr::enable_backup_access).
#[inline]
pub fn enable_lse(rcc: &mut pac::RCC) {
    set_bits!(rcc.bdcr, BDCR_LSEON);
    while rcc.bdcr.read().bits() & BDCR_LSERDY == 0 {}
}

/// Reset the backup domain.
///
/// # Safety
///
/// 1. This will disable the LSE clock.
///    Ensure no peripherals are using the LSE clock before calling this function.
/// 2. This will reset the real-time clock.
///    Setup the RTC after calling this function.
///
/// # Example
///
/// ```no_run
/// use stm32f3xx_hal::{pac, rcc::pulse_reset_backup_domain};
///
/// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
/// unsafe { pulse_reset_backup_domain(&mut dp.RCC, &mut dp.PWR) };
/// ```
#[inline]
pub unsafe fn pulse_reset_backup_domain(rcc: &mut pac::RCC, pwr: &mut pac::PWR) {
    crate::pwr::enable_clock(rcc);
    crate::pwr::enable_backup_access(pwr);
    set_bits!(rcc.bdcr, BDCR_BDRST);
    clear_bits!(rcc.bdcr, BDCR_BDRST);
}

/// Peripheral clock enable and reset bits.
///
/// Register bit positions from RM0364 and RM0313 section 9.4.
pub(crate) mod en {
    use crate::pac;

    pub const AHB_CRC: u32 = 1 << 6;
    pub const AHB_IOPA: u32 = 1 << 17;
    pub const AHB_IOPB: u32 = 1 << 18;
    pub const AHB_IOPC: u32 = 1 << 19;
    pub const AHB_IOPD: u32 = 1 << 20;
    #[cfg(feature = "stm32f373")]
    pub const AHB_IOPE: u32 = 1 << 21;
    pub const AHB_IOPF: u32 = 1 << 22;
    #[cfg(feature = "stm32f334")]
    pub const AHB_ADC12: u32 = 1 << 28;

    pub const APB1_TIM2: u32 = 1 << 0;
    pub const APB1_TIM6: u32 = 1 << 4;
    #[cfg(feature = "stm32f373")]
    pub const APB1_SPI3: u32 = 1 << 15;
    pub const APB1_USART2: u32 = 1 << 17;
    pub const APB1_I2C1: u32 = 1 << 21;
    #[cfg(feature = "stm32f373")]
    pub const APB1_I2C2: u32 = 1 << 22;
    pub const APB1_PWR: u32 = 1 << 28;
    pub const APB1_DAC1: u32 = 1 << 29;

    pub const APB2_SYSCFG: u32 = 1 << 0;
    #[cfg(feature = "stm32f373")]
    pub const APB2_ADC1: u32 = 1 << 9;
    pub const APB2_SPI1: u32 = 1 << 12;
    pub const APB2_USART1: u32 = 1 << 14;
    #[cfg(feature = "stm32f373")]
    pub const APB2_SDADC1: u32 = 1 << 24;
    #[cfg(feature = "stm32f334")]
    pub const APB2_HRTIM1: u32 = 1 << 29;

    pub fn ahb(rcc: &mut pac::RCC, mask: u32) {
        set_bits!(rcc.ahbenr, mask);
        // delay after an RCC peripheral clock enabling
        rcc.ahbenr.read();
    }

    pub fn ahb_disable(rcc: &mut pac::RCC, mask: u32) {
        clear_bits!(rcc.ahbenr, mask);
    }

    pub fn ahb_reset(rcc: &mut pac::RCC, mask: u32) {
        set_bits!(rcc.ahbrstr, mask);
        clear_bits!(rcc.ahbrstr, mask);
    }

    pub fn apb1(rcc: &mut pac::RCC, mask: u32) {
        set_bits!(rcc.apb1enr, mask);
        rcc.apb1enr.read();
    }

    pub fn apb1_disable(rcc: &mut pac::RCC, mask: u32) {
        clear_bits!(rcc.apb1enr, mask);
    }

    pub fn apb1_reset(rcc: &mut pac::RCC, mask: u32) {
        set_bits!(rcc.apb1rstr, mask);
        clear_bits!(rcc.apb1rstr, mask);
    }

    pub fn apb2(rcc: &mut pac::RCC, mask: u32) {
        set_bits!(rcc.apb2enr, mask);
        rcc.apb2enr.read();
    }

    pub fn apb2_disable(rcc: &mut pac::RCC, mask: u32) {
        clear_bits!(rcc.apb2enr, mask);
    }

    pub fn apb2_reset(rcc: &mut pac::RCC, mask: u32) {
        set_bits!(rcc.apb2rstr, mask);
        clear_bits!(rcc.apb2rstr, mask);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_latency_bounds() {
        assert_eq!(FlashLatency::from_hertz(8_000_000), FlashLatency::Zero);
        assert_eq!(FlashLatency::from_hertz(24_000_000), FlashLatency::Zero);
        assert_eq!(FlashLatency::from_hertz(24_000_001), FlashLatency::One);
        assert_eq!(FlashLatency::from_hertz(48_000_000), FlashLatency::One);
        assert_eq!(FlashLatency::from_hertz(64_000_000), FlashLatency::Two);
        assert_eq!(FlashLatency::from_hertz(72_000_000), FlashLatency::Two);
    }

    #[test]
    fn pll_presets() {
        assert_eq!(PllConfig::HSE_72MHZ.sysclk_hz(), 72_000_000);
        assert_eq!(PllConfig::HSE_BYPASS_72MHZ.sysclk_hz(), 72_000_000);
        assert_eq!(PllConfig::HSI_64MHZ.sysclk_hz(), 64_000_000);
        assert_eq!(PllConfig::HSE_72MHZ.cfgr_bits(), CFGR_PLLSRC | (7 << 18));
        assert_eq!(PllConfig::HSI_64MHZ.cfgr_bits(), 14 << 18);
    }

    #[test]
    fn pll_validation() {
        assert_eq!(PllConfig::new(PllSrc::HsiDiv2, 1), Err(PllError::Mul(1)));
        assert_eq!(
            PllConfig::new(
                PllSrc::Hse {
                    prediv: 0,
                    bypass: false
                },
                9
            ),
            Err(PllError::Prediv(0))
        );
        assert_eq!(
            PllConfig::new(
                PllSrc::Hse {
                    prediv: 2,
                    bypass: false
                },
                16
            )
            .map(|pll| pll.sysclk_hz()),
            Ok(64_000_000)
        );
    }

    #[test]
    fn prescaler_divisors() {
        assert_eq!(hpre_div(0b0000), 1);
        assert_eq!(hpre_div(0b0111), 1);
        assert_eq!(hpre_div(0b1000), 2);
        assert_eq!(hpre_div(0b1011), 16);
        assert_eq!(hpre_div(0b1100), 64);
        assert_eq!(hpre_div(0b1111), 512);
        assert_eq!(ppre_div(0b011), 1);
        assert_eq!(ppre_div(0b100), 2);
        assert_eq!(ppre_div(0b111), 16);
    }

    #[test]
    fn apb1_is_kept_under_36mhz() {
        assert_eq!(bus_prescalers(72_000_000), 0b100 << CFGR_PPRE1_SHIFT);
        assert_eq!(bus_prescalers(36_000_000), 0);
        assert_eq!(bus_prescalers(8_000_000), 0);
    }
}
