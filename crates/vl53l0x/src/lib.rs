#![no_std]
//! Blocking driver for the ST VL53L0X time-of-flight ranging sensor.
//!
//! [`Vl53l0x::init`] only verifies the sensor identity, which is enough for
//! the bare single-shot protocol ([`Vl53l0x::measure`]). For calibrated
//! ranging and continuous mode run [`Vl53l0x::init_extended`] instead.
//!
//! Every wait is a bounded poll: one register read per millisecond through the
//! provided [`DelayNs`], for at most the given number of polls.

mod calibration;
mod errors;
pub mod registers;

pub use calibration::InitStage;
pub use errors::{Error, InitError};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use register_transport::{BigEndian, RegisterTransport};

use registers::*;

pub const DEFAULT_ADDRESS: u8 = 0x29;

/// Poll budget used by [`Vl53l0x::measure`] callers that have no opinion.
pub const DEFAULT_MEASURE_TIMEOUT_MS: u32 = 33;
/// Poll budget for calibration and continuous-mode waits.
pub const DEFAULT_IO_TIMEOUT_MS: u32 = 500;
pub const MIN_TIMING_BUDGET_US: u32 = 20_000;

const POLL_INTERVAL_MS: u32 = 1;
const STOP_SETTLE_US: u32 = 500;

/// One distance sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Range {
    Millimeters(u16),
    /// No target within range; carries the raw code the sensor reported.
    OutOfRange(u16),
}

impl Range {
    pub fn from_raw(raw: u16) -> Self {
        if raw >= OUT_OF_RANGE_RAW {
            Range::OutOfRange(raw)
        } else {
            Range::Millimeters(raw)
        }
    }

    /// Distance in millimetres, `None` when out of range.
    pub fn millimeters(self) -> Option<u16> {
        match self {
            Range::Millimeters(mm) => Some(mm),
            Range::OutOfRange(_) => None,
        }
    }
}

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    IdentityVerified,
    /// Extended initialisation completed.
    Configured,
    MeasuringSingle,
    MeasuringContinuous,
}

pub struct Vl53l0x<I2C, D> {
    regs: RegisterTransport<I2C, BigEndian>,
    delay: D,
    state: State,
    /// State to fall back to once a measurement is over.
    idle: State,
    io_timeout_ms: u32,
    timeout_occurred: bool,
    timing_budget_us: Option<u32>,
    stop_variable: u8,
}

impl<I2C, D> Vl53l0x<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            regs: RegisterTransport::new(i2c, address),
            delay,
            state: State::Uninitialized,
            idle: State::Uninitialized,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            timeout_occurred: false,
            timing_budget_us: None,
            stop_variable: 0,
        }
    }

    pub fn address(&self) -> u8 {
        self.regs.address()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Poll budget for calibration and continuous-mode waits, in ms.
    pub fn set_io_timeout(&mut self, timeout_ms: u32) {
        self.io_timeout_ms = timeout_ms;
    }

    pub fn io_timeout(&self) -> u32 {
        self.io_timeout_ms
    }

    /// Whether a wait has timed out since the last call. Clears the flag.
    pub fn timeout_occurred(&mut self) -> bool {
        core::mem::take(&mut self.timeout_occurred)
    }

    /// Budget recorded by extended initialisation, in µs.
    pub fn measurement_timing_budget(&self) -> Option<u32> {
        self.timing_budget_us
    }

    /// Value captured from the sensor during base settings.
    pub fn stop_variable(&self) -> u8 {
        self.stop_variable
    }

    pub fn release(self) -> (I2C, D) {
        (self.regs.release(), self.delay)
    }

    fn enter_idle(&mut self, idle: State) {
        self.idle = idle;
        self.state = idle;
    }

    /// Check that the device at this address is a VL53L0X.
    ///
    /// Nothing is written to the sensor.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        let id = self.regs.read_byte(MODEL_ID)?;
        if id != EXPECTED_MODEL_ID {
            return Err(Error::InvalidModelId(id));
        }
        self.enter_idle(State::IdentityVerified);
        Ok(())
    }

    /// Kick off a single-shot measurement.
    pub fn start_measurement(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(SYSRANGE_START, RANGE_SINGLE)?;
        self.state = State::MeasuringSingle;
        Ok(())
    }

    /// Poll RESULT_RANGE_STATUS once per millisecond, at most `timeout_ms`
    /// times, until the busy bit clears, then read the distance.
    pub fn wait_for_completion(
        &mut self,
        timeout_ms: u32,
    ) -> Result<Range, Error<I2C::Error>> {
        self.poll_until(RESULT_RANGE_STATUS, timeout_ms, |status| {
            status & RANGE_BUSY == 0
        })?;
        let range = self.read_distance()?;
        self.state = self.idle;
        Ok(range)
    }

    /// Read the last range result.
    pub fn read_distance(&mut self) -> Result<Range, Error<I2C::Error>> {
        let raw = self.regs.read_word(RESULT_RANGE_VALUE)?;
        Ok(Range::from_raw(raw))
    }

    /// Start, wait and read; the first failing step's error is returned.
    pub fn measure(&mut self, timeout_ms: u32) -> Result<Range, Error<I2C::Error>> {
        self.start_measurement()?;
        self.wait_for_completion(timeout_ms)
    }

    /// Stop any measurement in flight and let the sensor settle.
    pub fn reset(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(SYSRANGE_START, RANGE_STOP)?;
        self.delay.delay_us(STOP_SETTLE_US);
        self.state = self.idle;
        Ok(())
    }

    /// Single-shot measurement using the calibrated sequence.
    pub fn read_range_single_millimeters(
        &mut self,
    ) -> Result<Range, Error<I2C::Error>> {
        self.restore_stop_variable()?;
        self.regs.write_byte(SYSRANGE_START, RANGE_SINGLE)?;
        self.state = State::MeasuringSingle;

        // SYSRANGE_START bit 0 clears once the sensor accepted the command.
        self.poll_until(SYSRANGE_START, self.io_timeout_ms, |start| {
            start & RANGE_SINGLE == 0
        })?;
        let range = self.read_new_sample()?;
        self.state = self.idle;
        Ok(range)
    }

    /// Start continuous ranging. With `period_ms` zero the sensor measures
    /// back to back, otherwise it waits `period_ms` between measurements.
    pub fn start_continuous(
        &mut self,
        period_ms: u32,
    ) -> Result<(), Error<I2C::Error>> {
        self.restore_stop_variable()?;

        if period_ms != 0 {
            let osc_calibrate = self.regs.read_word(OSC_CALIBRATE_VAL)?;
            let period = match osc_calibrate {
                0 => period_ms,
                osc => period_ms.saturating_mul(osc as u32),
            };
            self.regs.write_dword(SYSTEM_INTERMEASUREMENT_PERIOD, period)?;
            self.regs.write_byte(SYSRANGE_START, RANGE_TIMED)?;
        } else {
            self.regs.write_byte(SYSRANGE_START, RANGE_BACK_TO_BACK)?;
        }

        self.state = State::MeasuringContinuous;
        Ok(())
    }

    /// Wait for the next continuous-mode sample.
    pub fn read_range_continuous(&mut self) -> Result<Range, Error<I2C::Error>> {
        self.read_new_sample()
    }

    pub fn stop_continuous(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(SYSRANGE_START, RANGE_SINGLE)?;
        self.regs.write_byte(PAGE_SELECT, 0x01)?;
        self.regs.write_byte(INTERNAL_TUNING, 0x00)?;
        self.regs.write_byte(STOP_VARIABLE, 0x00)?;
        self.regs.write_byte(INTERNAL_TUNING, 0x01)?;
        self.regs.write_byte(PAGE_SELECT, 0x00)?;
        self.state = self.idle;
        Ok(())
    }

    fn read_new_sample(&mut self) -> Result<Range, Error<I2C::Error>> {
        self.poll_until(RESULT_INTERRUPT_STATUS, self.io_timeout_ms, |status| {
            status & INTERRUPT_MASK != 0
        })?;
        let range = self.read_distance()?;
        self.regs.write_byte(SYSTEM_INTERRUPT_CLEAR, 0x01)?;
        Ok(range)
    }

    fn restore_stop_variable(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(POWER_MANAGEMENT, 0x01)?;
        self.regs.write_byte(PAGE_SELECT, 0x01)?;
        self.regs.write_byte(INTERNAL_TUNING, 0x00)?;
        self.regs.write_byte(STOP_VARIABLE, self.stop_variable)?;
        self.regs.write_byte(INTERNAL_TUNING, 0x01)?;
        self.regs.write_byte(PAGE_SELECT, 0x00)?;
        self.regs.write_byte(POWER_MANAGEMENT, 0x00)?;
        Ok(())
    }

    /// Read `reg` up to `polls` times, 1 ms apart, until `ready` accepts it.
    fn poll_until<F>(
        &mut self,
        reg: u8,
        polls: u32,
        ready: F,
    ) -> Result<u8, Error<I2C::Error>>
    where
        F: Fn(u8) -> bool,
    {
        for _ in 0..polls {
            let value = self.regs.read_byte(reg)?;
            if ready(value) {
                return Ok(value);
            }
            self.delay.delay_ms(POLL_INTERVAL_MS);
        }
        self.timeout_occurred = true;
        Err(Error::Timeout)
    }
}
