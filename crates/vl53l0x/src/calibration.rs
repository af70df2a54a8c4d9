//! Extended initialisation: identity check followed by the configuration and
//! calibration stages, run strictly in order.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::registers::*;
use crate::{Error, InitError, State, Vl53l0x, MIN_TIMING_BUDGET_US};

// Settle time for the stages that have no register sequence yet.
const TEMPERATURE_SETTLE_MS: u32 = 10;
const SPAD_SETTLE_MS: u32 = 10;

/// Stages of [`Vl53l0x::init_extended`], in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InitStage {
    Identity,
    BaseSettings,
    TemperatureCheck,
    SpadCalibration,
    ReferenceCalibration,
    TimingBudget,
}

impl InitStage {
    pub const ALL: [InitStage; 6] = [
        InitStage::Identity,
        InitStage::BaseSettings,
        InitStage::TemperatureCheck,
        InitStage::SpadCalibration,
        InitStage::ReferenceCalibration,
        InitStage::TimingBudget,
    ];
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InitStage::Identity => "identity check",
            InitStage::BaseSettings => "base settings",
            InitStage::TemperatureCheck => "temperature check",
            InitStage::SpadCalibration => "SPAD calibration",
            InitStage::ReferenceCalibration => "reference calibration",
            InitStage::TimingBudget => "timing budget",
        };
        f.write_str(name)
    }
}

impl<I2C, D> Vl53l0x<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Identity check, then every [`InitStage`] in order. The first failing
    /// stage aborts initialisation; nothing is retried.
    pub fn init_extended(
        &mut self,
        timing_budget_us: u32,
    ) -> Result<(), InitError<I2C::Error>> {
        self.enter_idle(State::Uninitialized);
        for stage in InitStage::ALL {
            self.run_stage(stage, timing_budget_us)
                .map_err(|error| InitError { stage, error })?;
        }
        self.enter_idle(State::Configured);
        Ok(())
    }

    fn run_stage(
        &mut self,
        stage: InitStage,
        timing_budget_us: u32,
    ) -> Result<(), Error<I2C::Error>> {
        match stage {
            InitStage::Identity => self.init(),
            InitStage::BaseSettings => self.apply_base_settings(),
            InitStage::TemperatureCheck => {
                self.delay.delay_ms(TEMPERATURE_SETTLE_MS);
                Ok(())
            }
            InitStage::SpadCalibration => {
                self.delay.delay_ms(SPAD_SETTLE_MS);
                Ok(())
            }
            InitStage::ReferenceCalibration => self.calibrate_reference(),
            InitStage::TimingBudget => {
                self.set_measurement_timing_budget(timing_budget_us)
            }
        }
    }

    fn apply_base_settings(&mut self) -> Result<(), Error<I2C::Error>> {
        // 2V8 I/O pads, standard mode I2C.
        self.regs
            .modify_byte(VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV, |v| v | 0x01)?;
        self.regs.write_byte(I2C_MODE, 0x00)?;

        self.regs.write_byte(POWER_MANAGEMENT, 0x01)?;
        self.regs.write_byte(PAGE_SELECT, 0x01)?;
        self.regs.write_byte(INTERNAL_TUNING, 0x00)?;
        self.stop_variable = self.regs.read_byte(STOP_VARIABLE)?;
        self.regs.write_byte(INTERNAL_TUNING, 0x01)?;
        self.regs.write_byte(PAGE_SELECT, 0x00)?;
        self.regs.write_byte(POWER_MANAGEMENT, 0x00)?;

        self.regs
            .modify_byte(MSRC_CONFIG_CONTROL, |v| v | MSRC_LIMIT_CHECKS_OFF)?;
        self.regs.write_word(
            FINAL_RANGE_CONFIG_MIN_COUNT_RATE_RTN_LIMIT,
            SIGNAL_RATE_LIMIT_Q9_7,
        )?;
        self.regs.write_byte(SYSTEM_SEQUENCE_CONFIG, SEQUENCE_ALL)?;

        // Interrupt on new sample, active low.
        self.regs
            .write_byte(SYSTEM_INTERRUPT_CONFIG_GPIO, GPIO_NEW_SAMPLE_READY)?;
        self.regs.modify_byte(GPIO_HV_MUX_ACTIVE_HIGH, |v| v & !0x10)?;
        self.regs.write_byte(SYSTEM_INTERRUPT_CLEAR, 0x01)?;

        self.regs.write_byte(SYSTEM_SEQUENCE_CONFIG, SEQUENCE_DEFAULT)?;
        Ok(())
    }

    /// VHV then phase calibration, each a single reference measurement.
    fn calibrate_reference(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(SYSTEM_SEQUENCE_CONFIG, SEQUENCE_VHV_ONLY)?;
        self.single_ref_calibration(VHV_INIT)?;

        self.regs.write_byte(SYSTEM_SEQUENCE_CONFIG, SEQUENCE_PHASE_ONLY)?;
        self.single_ref_calibration(0x00)?;

        self.regs.write_byte(SYSTEM_SEQUENCE_CONFIG, SEQUENCE_DEFAULT)?;
        Ok(())
    }

    fn single_ref_calibration(
        &mut self,
        vhv_init: u8,
    ) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(SYSRANGE_START, RANGE_SINGLE | vhv_init)?;
        self.poll_until(RESULT_INTERRUPT_STATUS, self.io_timeout_ms, |status| {
            status & INTERRUPT_MASK != 0
        })?;
        self.regs.write_byte(SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        self.regs.write_byte(SYSRANGE_START, RANGE_STOP)?;
        Ok(())
    }

    /// Record the time allowed for one measurement, at least 20 000 µs.
    pub fn set_measurement_timing_budget(
        &mut self,
        budget_us: u32,
    ) -> Result<(), Error<I2C::Error>> {
        if budget_us < MIN_TIMING_BUDGET_US {
            return Err(Error::InvalidTimingBudget(budget_us));
        }
        self.timing_budget_us = Some(budget_us);
        Ok(())
    }
}
