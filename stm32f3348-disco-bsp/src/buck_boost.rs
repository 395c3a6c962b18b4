//! Buck-boost power stage
//!
//! The four-switch buck-boost converter is driven by two HRTIM timing units:
//!
//! | Leg    | High side   | Low side    |
//! |--------|-------------|-------------|
//! | input  | TA1 (PA8)   | TA2 (PA9)   |
//! | output | TB2 (PA11)  | TB1 (PA10)  |
//!
//! Each leg is a complementary pair with dead-time, only output 1 of each
//! timer has a crossbar, output 2 is derived by the dead-time generator.
//!
//! * **Buck**: the input leg switches at the duty cycle, the output leg
//!   keeps TB2 on and TB1 off.
//! * **Boost**: the input leg keeps TA1 on, the output leg switches TB1 at
//!   the duty cycle.
//! * **De-energize**: all four outputs are disabled.
//!
//! The input and output voltages are sensed through resistor dividers on
//! PA1 and PA3.

use stm32f3xx_hal as hal;

use hal::{
    cortex_m::interrupt::CriticalSection,
    gpio::{Alternate, pins},
    hrtim::{
        self, Compare, Control, DeadTime, Duty, FaultLevel, Out, OutputEvents, Outputs, Outr,
        Prescaler, TimCr, TimerA, TimerB, Timers, update,
    },
};

/// Switching frequency in hertz.
pub const SWITCH_HZ: u32 = 250_000;

/// Dead-time of both legs in nanoseconds.
pub const DEAD_TIME_NS: u32 = 50;

/// HRTIM outputs of the power stage.
pub const OUTPUTS: Outputs = Outputs::TA1
    .union(Outputs::TA2)
    .union(Outputs::TB1)
    .union(Outputs::TB2);

/// Resistor divider between a sensed voltage and an ADC pin.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Divider {
    /// Resistor between the sensed voltage and the pin, in ohms.
    pub top_ohm: u32,
    /// Resistor between the pin and ground, in ohms.
    pub bottom_ohm: u32,
}

impl Divider {
    /// Sensed voltage from the voltage at the ADC pin.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3348_disco_bsp::buck_boost::VIN_DIVIDER;
    ///
    /// // 5 V input
    /// assert_eq!(VIN_DIVIDER.sensed_mv(1006), 5_000);
    /// ```
    pub const fn sensed_mv(&self, pin_mv: u32) -> u32 {
        let total: u64 = self.top_ohm as u64 + self.bottom_ohm as u64;
        let num: u64 = pin_mv as u64 * total;
        ((num + (self.bottom_ohm as u64 / 2)) / self.bottom_ohm as u64) as u32
    }

    /// Voltage at the ADC pin for a sensed voltage.
    pub const fn pin_mv(&self, sensed_mv: u32) -> u32 {
        let total: u64 = self.top_ohm as u64 + self.bottom_ohm as u64;
        let num: u64 = sensed_mv as u64 * self.bottom_ohm as u64;
        ((num + total / 2) / total) as u32
    }
}

/// Input voltage divider, VIN sense on PA1 (ADC1 IN2).
pub const VIN_DIVIDER: Divider = Divider {
    top_ohm: 27_000,
    bottom_ohm: 6_800,
};

/// Output voltage divider, VOUT sense on PA3 (ADC1 IN4).
pub const VOUT_DIVIDER: Divider = Divider {
    top_ohm: 27_000,
    bottom_ohm: 10_000,
};

/// Operating mode of the converter.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Step down, VOUT < VIN.
    Buck,
    /// Step up, VOUT > VIN.
    Boost,
    /// All switches off.
    DeEnergize,
}

/// Mode selection thresholds.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    /// Minimum input voltage, below this the stage is de-energized.
    pub vin_min_mv: u32,
    /// Maximum input voltage, above this the stage is de-energized.
    pub vin_max_mv: u32,
    /// Hysteresis around VIN == VOUT for buck/boost transitions.
    pub hysteresis_mv: u32,
    /// Minimum duty cycle in either mode.
    pub duty_min: Duty,
    /// Maximum buck duty cycle.
    pub buck_duty_max: Duty,
    /// Maximum boost duty cycle.
    pub boost_duty_max: Duty,
}

impl Limits {
    /// Limits of the STM32F3348-DISCO power stage.
    pub const DISCO: Limits = Limits {
        vin_min_mv: 3_000,
        vin_max_mv: 15_000,
        hysteresis_mv: 500,
        duty_min: Duty::from_permille(50),
        buck_duty_max: Duty::from_permille(950),
        boost_duty_max: Duty::from_permille(750),
    };

    /// Select the operating mode.
    ///
    /// Between the buck and boost thresholds the previous mode is kept.
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3348_disco_bsp::buck_boost::{Limits, Mode};
    ///
    /// const L: Limits = Limits::DISCO;
    /// assert_eq!(L.select_mode(Mode::DeEnergize, 5_000, 3_300), Mode::Buck);
    /// assert_eq!(L.select_mode(Mode::Buck, 5_000, 8_000), Mode::Boost);
    /// // within the hysteresis band
    /// assert_eq!(L.select_mode(Mode::Boost, 5_000, 5_200), Mode::Boost);
    /// // input under-voltage
    /// assert_eq!(L.select_mode(Mode::Buck, 2_000, 1_000), Mode::DeEnergize);
    /// ```
    pub const fn select_mode(&self, prev: Mode, vin_mv: u32, target_mv: u32) -> Mode {
        if vin_mv < self.vin_min_mv || vin_mv > self.vin_max_mv || target_mv == 0 {
            return Mode::DeEnergize;
        }

        if target_mv.saturating_add(self.hysteresis_mv) < vin_mv {
            Mode::Buck
        } else if target_mv > vin_mv.saturating_add(self.hysteresis_mv) {
            Mode::Boost
        } else {
            match prev {
                Mode::DeEnergize => {
                    if target_mv <= vin_mv {
                        Mode::Buck
                    } else {
                        Mode::Boost
                    }
                }
                mode => mode,
            }
        }
    }

    /// Open-loop duty cycle for a mode.
    ///
    /// * Buck: D = VOUT / VIN
    /// * Boost: D = 1 - VIN / VOUT
    ///
    /// The result is clamped to the mode limits, de-energize is always
    /// [`Duty::ZERO`].
    ///
    /// # Example
    ///
    /// ```
    /// use stm32f3348_disco_bsp::{
    ///     buck_boost::{Limits, Mode},
    ///     hal::hrtim::Duty,
    /// };
    ///
    /// const L: Limits = Limits::DISCO;
    /// assert_eq!(L.duty(Mode::Buck, 5_000, 3_300), Duty::from_permille(660));
    /// assert_eq!(L.duty(Mode::Boost, 5_000, 10_000), Duty::from_permille(500));
    /// assert_eq!(L.duty(Mode::Boost, 3_000, 15_000), L.boost_duty_max);
    /// ```
    pub const fn duty(&self, mode: Mode, vin_mv: u32, target_mv: u32) -> Duty {
        let (permille, max): (u64, Duty) = match mode {
            Mode::DeEnergize => return Duty::ZERO,
            Mode::Buck => {
                if vin_mv == 0 {
                    return Duty::ZERO;
                }
                (
                    (target_mv as u64 * 1000 + vin_mv as u64 / 2) / vin_mv as u64,
                    self.buck_duty_max,
                )
            }
            Mode::Boost => {
                if target_mv <= vin_mv {
                    (0, self.boost_duty_max)
                } else {
                    let diff: u64 = (target_mv - vin_mv) as u64;
                    (
                        (diff * 1000 + target_mv as u64 / 2) / target_mv as u64,
                        self.boost_duty_max,
                    )
                }
            }
        };

        let permille: u16 = if permille > max.permille() as u64 {
            max.permille()
        } else {
            permille as u16
        };
        if permille < self.duty_min.permille() {
            self.duty_min
        } else {
            Duty::from_permille(permille)
        }
    }
}

/// Crossbar settings of one mode, `(set, reset)` for TA1 and TB1.
const fn crossbar(mode: Mode) -> [(OutputEvents, OutputEvents); 2] {
    match mode {
        Mode::Buck => [
            (OutputEvents::PERIOD, OutputEvents::CMP1),
            // TB1 never set, TB2 held on through the complement
            (OutputEvents::NONE, OutputEvents::PERIOD),
        ],
        Mode::Boost => [
            (OutputEvents::PERIOD, OutputEvents::NONE),
            (OutputEvents::PERIOD, OutputEvents::CMP1),
        ],
        Mode::DeEnergize => [
            (OutputEvents::NONE, OutputEvents::PERIOD),
            (OutputEvents::NONE, OutputEvents::PERIOD),
        ],
    }
}

/// Buck-boost power stage.
#[derive(Debug)]
pub struct BuckBoost {
    tim_a: TimerA,
    tim_b: TimerB,
    pins: (
        Alternate<pins::A8>,
        Alternate<pins::A9>,
        Alternate<pins::A10>,
        Alternate<pins::A11>,
    ),
    limits: Limits,
    mode: Mode,
    duty: Duty,
}

impl BuckBoost {
    /// Configure timers A and B for the power stage, and start them.
    ///
    /// The outputs stay disabled in [`Mode::DeEnergize`] until the first
    /// call to [`apply`](Self::apply) with another mode.
    ///
    /// # Errors
    ///
    /// * [`hrtim::Error`] if the switching frequency or dead-time cannot be
    ///   reached with `hrtim_hz`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use stm32f3348_disco_bsp::{
    ///     buck_boost::{BuckBoost, Limits, Mode},
    ///     hal::{
    ///         cortex_m,
    ///         gpio::PortA,
    ///         hrtim::{self, Blocks, Duty, Hrtim},
    ///         pac, rcc,
    ///     },
    /// };
    ///
    /// let mut dp: pac::Peripherals = pac::Peripherals::take().unwrap();
    ///
    /// cortex_m::interrupt::free(|cs| unsafe {
    ///     rcc::set_sysclk_pll(&mut dp.FLASH, &mut dp.RCC, &rcc::PllConfig::HSE_72MHZ, cs)
    /// });
    ///
    /// let hrtim_hz: u32 = rcc::hrtim_hz(&dp.RCC);
    /// let gpioa: PortA = PortA::split(dp.GPIOA, &mut dp.RCC);
    /// let blocks: Blocks = Blocks {
    ///     common: dp.HRTIM_COMMON,
    ///     master: dp.HRTIM_MASTER,
    ///     tim_a: dp.HRTIM_TIMA,
    ///     tim_b: dp.HRTIM_TIMB,
    ///     tim_c: dp.HRTIM_TIMC,
    ///     tim_d: dp.HRTIM_TIMD,
    ///     tim_e: dp.HRTIM_TIME,
    /// };
    /// let mut parts = Hrtim::new(blocks, &mut dp.RCC)?.split();
    /// let mut stage: BuckBoost = cortex_m::interrupt::free(|cs| {
    ///     BuckBoost::new(
    ///         parts.tim_a,
    ///         parts.tim_b,
    ///         &mut parts.control,
    ///         (gpioa.a8, gpioa.a9, gpioa.a10, gpioa.a11),
    ///         hrtim_hz,
    ///         Limits::DISCO,
    ///         cs,
    ///     )
    /// })?;
    /// stage.apply(&mut parts.control, Mode::Buck, Duty::from_percent(66));
    /// # Ok::<(), hrtim::Error>(())
    /// ```
    pub fn new(
        mut tim_a: TimerA,
        mut tim_b: TimerB,
        control: &mut Control,
        pins: (pins::A8, pins::A9, pins::A10, pins::A11),
        hrtim_hz: u32,
        limits: Limits,
        cs: &CriticalSection,
    ) -> Result<BuckBoost, hrtim::Error> {
        let pre: Prescaler = Prescaler::finest_for(hrtim_hz, SWITCH_HZ)?;
        let period: u16 = hrtim::period_ticks(hrtim_hz, SWITCH_HZ, pre)?;
        let dt: DeadTime = DeadTime::from_ns(hrtim_hz, DEAD_TIME_NS, DEAD_TIME_NS)?;

        control.disable_outputs(OUTPUTS);

        const OUTR: Outr = Outr::RESET
            .set_fault_level(Out::One, FaultLevel::Inactive)
            .set_fault_level(Out::Two, FaultLevel::Inactive)
            .set_dead_time_en(true);
        let cr: TimCr = TimCr::RESET
            .set_prescaler(pre)
            .set_continuous(true)
            .set_preload(true)
            .set_update_sources(update::REPETITION);

        // both timers are started together, timer B stays phase aligned
        tim_a.configure(cr);
        tim_b.configure(cr);
        tim_a.set_period(period);
        tim_b.set_period(period);
        tim_a.set_dead_time(dt);
        tim_b.set_dead_time(dt);
        tim_a.set_output_config(OUTR);
        tim_b.set_output_config(OUTR);

        let [(a_set, a_rst), (b_set, b_rst)] = crossbar(Mode::DeEnergize);
        tim_a.set_output_events(Out::One, a_set, a_rst);
        tim_b.set_output_events(Out::One, b_set, b_rst);
        tim_a.set_duty(Compare::Cmp1, Duty::ZERO);
        tim_b.set_duty(Compare::Cmp1, Duty::ZERO);

        let pins = (
            Alternate::hrtim_cha1(pins.0, cs),
            Alternate::hrtim_cha2(pins.1, cs),
            Alternate::hrtim_chb1(pins.2, cs),
            Alternate::hrtim_chb2(pins.3, cs),
        );

        control.software_update(Timers::A | Timers::B);
        control.start(Timers::A | Timers::B);

        Ok(BuckBoost {
            tim_a,
            tim_b,
            pins,
            limits,
            mode: Mode::DeEnergize,
            duty: Duty::ZERO,
        })
    }

    /// Current mode.
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Current duty cycle.
    pub const fn duty(&self) -> Duty {
        self.duty
    }

    /// Mode selection limits.
    pub const fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Program a mode and duty cycle.
    ///
    /// The crossbars are only rewritten on a mode change, the duty cycle is
    /// preloaded and takes effect on the next period.
    ///
    /// Returns the duty cycle after clamping to the mode limits.
    pub fn apply(&mut self, control: &mut Control, mode: Mode, duty: Duty) -> Duty {
        let duty: Duty = match mode {
            Mode::DeEnergize => Duty::ZERO,
            Mode::Buck => duty.clamp(self.limits.duty_min, self.limits.buck_duty_max),
            Mode::Boost => duty.clamp(self.limits.duty_min, self.limits.boost_duty_max),
        };

        if mode != self.mode {
            control.disable_outputs(OUTPUTS);
            let [(a_set, a_rst), (b_set, b_rst)] = crossbar(mode);
            self.tim_a.set_output_events(Out::One, a_set, a_rst);
            self.tim_b.set_output_events(Out::One, b_set, b_rst);
        }

        match mode {
            Mode::Buck => {
                self.tim_a.set_duty(Compare::Cmp1, duty);
            }
            Mode::Boost => {
                self.tim_b.set_duty(Compare::Cmp1, duty);
            }
            Mode::DeEnergize => (),
        }

        if mode != self.mode && mode != Mode::DeEnergize {
            control.software_update(Timers::A | Timers::B);
            control.enable_outputs(OUTPUTS);
        }

        self.mode = mode;
        self.duty = duty;
        duty
    }

    /// Select the mode for the measured input voltage and target output
    /// voltage, and program the open-loop duty cycle.
    pub fn regulate(&mut self, control: &mut Control, vin_mv: u32, target_mv: u32) -> Mode {
        let mode: Mode = self.limits.select_mode(self.mode, vin_mv, target_mv);
        let duty: Duty = self.limits.duty(mode, vin_mv, target_mv);
        self.apply(control, mode, duty);
        mode
    }

    /// De-energize the stage, stop the timers, and free the HRTIM timers and
    /// pins.
    pub fn free(
        mut self,
        control: &mut Control,
    ) -> (
        TimerA,
        TimerB,
        (pins::A8, pins::A9, pins::A10, pins::A11),
    ) {
        self.apply(control, Mode::DeEnergize, Duty::ZERO);
        control.stop(Timers::A | Timers::B);
        let (a8, a9, a10, a11) = self.pins;
        (
            self.tim_a,
            self.tim_b,
            (a8.free(), a9.free(), a10.free(), a11.free()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divider_round_trip() {
        assert_eq!(VOUT_DIVIDER.pin_mv(3_700), 1_000);
        assert_eq!(VOUT_DIVIDER.sensed_mv(1_000), 3_700);
        assert_eq!(VIN_DIVIDER.pin_mv(0), 0);
    }

    #[test]
    fn mode_hysteresis() {
        let l = Limits::DISCO;
        assert_eq!(l.select_mode(Mode::Buck, 5_000, 5_000), Mode::Buck);
        assert_eq!(l.select_mode(Mode::Boost, 5_000, 5_000), Mode::Boost);
        assert_eq!(l.select_mode(Mode::DeEnergize, 5_000, 5_000), Mode::Buck);
        assert_eq!(l.select_mode(Mode::DeEnergize, 5_000, 5_400), Mode::Boost);
        assert_eq!(l.select_mode(Mode::Boost, 5_000, 4_400), Mode::Buck);
        assert_eq!(l.select_mode(Mode::Buck, 5_000, 5_600), Mode::Boost);
    }

    #[test]
    fn mode_input_window() {
        let l = Limits::DISCO;
        assert_eq!(l.select_mode(Mode::Buck, 16_000, 5_000), Mode::DeEnergize);
        assert_eq!(l.select_mode(Mode::Boost, 2_999, 5_000), Mode::DeEnergize);
        assert_eq!(l.select_mode(Mode::Buck, 5_000, 0), Mode::DeEnergize);
        assert_eq!(l.select_mode(Mode::DeEnergize, 3_000, 5_000), Mode::Boost);
    }

    #[test]
    fn duty_clamping() {
        let l = Limits::DISCO;
        assert_eq!(l.duty(Mode::Buck, 5_000, 5_000), l.buck_duty_max);
        assert_eq!(l.duty(Mode::Buck, 15_000, 100), l.duty_min);
        assert_eq!(l.duty(Mode::Boost, 5_000, 5_000), l.duty_min);
        assert_eq!(l.duty(Mode::DeEnergize, 5_000, 3_300), Duty::ZERO);
        assert_eq!(l.duty(Mode::Buck, 0, 3_300), Duty::ZERO);
    }

    #[test]
    fn crossbars() {
        assert_eq!(crossbar(Mode::Buck)[0].1, OutputEvents::CMP1);
        assert!(crossbar(Mode::Buck)[1].0.is_empty());
        assert!(crossbar(Mode::Boost)[0].1.is_empty());
        assert_eq!(crossbar(Mode::Boost)[1].1, OutputEvents::CMP1);
    }

    #[test]
    fn switching_period() {
        let pre = Prescaler::finest_for(144_000_000, SWITCH_HZ).unwrap();
        assert_eq!(pre, Prescaler::Mul32);
        assert_eq!(hrtim::period_ticks(144_000_000, SWITCH_HZ, pre), Ok(18432));
    }
}
