//! Register map.

pub const SYSRANGE_START: u8 = 0x00;
pub const SYSTEM_SEQUENCE_CONFIG: u8 = 0x01;
pub const SYSTEM_INTERMEASUREMENT_PERIOD: u8 = 0x04;
pub const SYSTEM_INTERRUPT_CONFIG_GPIO: u8 = 0x0A;
pub const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;
pub const RESULT_INTERRUPT_STATUS: u8 = 0x13;
pub const RESULT_RANGE_STATUS: u8 = 0x14;
/// Big-endian range in millimetres, 10 bytes into the range status block.
pub const RESULT_RANGE_VALUE: u8 = 0x1E;
pub const FINAL_RANGE_CONFIG_MIN_COUNT_RATE_RTN_LIMIT: u8 = 0x44;
pub const MSRC_CONFIG_CONTROL: u8 = 0x60;
pub const GPIO_HV_MUX_ACTIVE_HIGH: u8 = 0x84;
pub const I2C_MODE: u8 = 0x88;
pub const VHV_CONFIG_PAD_SCL_SDA_EXTSUP_HV: u8 = 0x89;
pub const MODEL_ID: u8 = 0xC0;
pub const OSC_CALIBRATE_VAL: u8 = 0xF8;

// Undocumented registers used to reach the stop variable.
pub const POWER_MANAGEMENT: u8 = 0x80;
pub const PAGE_SELECT: u8 = 0xFF;
pub const INTERNAL_TUNING: u8 = 0x00;
pub const STOP_VARIABLE: u8 = 0x91;

pub const EXPECTED_MODEL_ID: u8 = 0xEE;

// SYSRANGE_START commands.
pub const RANGE_STOP: u8 = 0x00;
pub const RANGE_SINGLE: u8 = 0x01;
pub const RANGE_BACK_TO_BACK: u8 = 0x02;
pub const RANGE_TIMED: u8 = 0x04;
/// VHV reference calibration flag, OR-ed into the start command.
pub const VHV_INIT: u8 = 0x40;

/// RESULT_RANGE_STATUS bit that stays set while a measurement runs.
pub const RANGE_BUSY: u8 = 0x01;
/// RESULT_INTERRUPT_STATUS bits signalling a new sample.
pub const INTERRUPT_MASK: u8 = 0x07;
/// Interrupt on new sample ready.
pub const GPIO_NEW_SAMPLE_READY: u8 = 0x04;
pub const SEQUENCE_VHV_ONLY: u8 = 0x01;
pub const SEQUENCE_PHASE_ONLY: u8 = 0x02;
/// DSS, PRE-RANGE and FINAL-RANGE steps.
pub const SEQUENCE_DEFAULT: u8 = 0xE8;
pub const SEQUENCE_ALL: u8 = 0xFF;
/// MSRC and pre-range signal-rate limit checks disabled.
pub const MSRC_LIMIT_CHECKS_OFF: u8 = 0x12;

/// Return signal rate limit, 0.25 MCPS in 9.7 fixed point.
pub const SIGNAL_RATE_LIMIT_Q9_7: u16 = 32;

/// Raw distance reported when no target is in range.
pub const OUT_OF_RANGE_RAW: u16 = 8190;
