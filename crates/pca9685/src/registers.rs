use bitflags::bitflags;

pub const MODE1: u8 = 0x00;
pub const MODE2: u8 = 0x01;
/// First register of channel 0's ON_L, ON_H, OFF_L, OFF_H quadruplet.
pub const LED0_ON_L: u8 = 0x06;
pub const PRE_SCALE: u8 = 0xFE;

/// Bytes per channel register block.
pub const CHANNEL_STRIDE: u8 = 4;
pub const CHANNEL_COUNT: usize = 16;

/// Largest 12-bit on/off time.
pub const MAX_TIME: u16 = 4095;

/// Internal oscillator frequency in Hz.
pub const OSC_HZ: u32 = 25_000_000;
pub const MIN_FREQUENCY_HZ: u16 = 24;
pub const MAX_FREQUENCY_HZ: u16 = 1526;
pub const DEFAULT_FREQUENCY_HZ: u16 = 50;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode1: u8 {
        /// Reads 1 while PWM channels are stopped by sleep; writing 1 restarts them.
        const RESTART = 0b1000_0000;
        const EXTCLK  = 0b0100_0000;
        /// Register auto-increment.
        const AI      = 0b0010_0000;
        /// Low power mode, oscillator off.
        const SLEEP   = 0b0001_0000;
        const SUB1    = 0b0000_1000;
        const SUB2    = 0b0000_0100;
        const SUB3    = 0b0000_0010;
        const ALLCALL = 0b0000_0001;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mode2: u8 {
        const INVRT  = 0b0001_0000;
        const OCH    = 0b0000_1000;
        /// Totem pole outputs when set, open drain otherwise.
        const OUTDRV = 0b0000_0100;
        const OUTNE1 = 0b0000_0010;
        const OUTNE0 = 0b0000_0001;
    }
}

/// Base register of `channel`'s on/off block.
pub const fn channel_base(channel: u8) -> u8 {
    LED0_ON_L + CHANNEL_STRIDE * channel
}

/// PRE_SCALE value for `hz`: round(25 MHz / (4096 × hz)) − 1.
///
/// `hz` must already be within the supported range.
pub const fn prescale_for(hz: u16) -> u8 {
    let divisor = 4096 * hz as u32;
    let rounded = (OSC_HZ + divisor / 2) / divisor;
    (rounded - 1) as u8
}
