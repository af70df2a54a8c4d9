#![no_std]
//! Blocking driver for the NXP PCA9685 16-channel, 12-bit PWM controller.
//!
//! The controller's registers are the only copy of its configuration: the
//! driver writes MODE1/MODE2, the prescaler and per-channel on/off times, and
//! reads them back on request, but never caches channel state.
//!
//! Settling delays (1 ms for RESTART to assert, 500 µs for the oscillator)
//! are part of the register protocol and always go through the provided
//! [`DelayNs`].

pub mod errors;
pub mod registers;

pub use errors::Error;
pub use registers::{Mode1, Mode2};

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use register_transport::{ByteOrder, LittleEndian, RegisterTransport};

use registers::*;

/// Address with all hardware address pins low.
pub const DEFAULT_ADDRESS: u8 = 0x40;

const SLEEP_TO_RESTART_US: u32 = 1_000;
const OSC_STABILIZE_US: u32 = 500;

/// Driver lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    Resetting,
    Configured,
    /// A register sequence failed part way; call `init` again.
    Faulted,
}

pub struct Pca9685<I2C, D> {
    regs: RegisterTransport<I2C, LittleEndian>,
    delay: D,
    state: State,
}

impl<I2C, D> Pca9685<I2C, D>
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
        }
    }

    pub fn address(&self) -> u8 {
        self.regs.address()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Tear the driver down and give back the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.regs.release(), self.delay)
    }

    /// Bus and protocol failures leave the chip in an unknown configuration.
    fn track<T>(
        &mut self,
        result: Result<T, Error<I2C::Error>>,
    ) -> Result<T, Error<I2C::Error>> {
        if let Err(Error::Transport(_) | Error::RestartNotAcknowledged(_)) =
            &result
        {
            self.state = State::Faulted;
        }
        result
    }

    /// Soft restart through the sleep/RESTART handshake.
    ///
    /// A completed reset leaves the driver `Uninitialized`; only [`init`]
    /// reaches `Configured`.
    ///
    /// [`init`]: Self::init
    pub fn reset(&mut self) -> Result<(), Error<I2C::Error>> {
        self.state = State::Resetting;
        let result = self.restart_sequence();
        self.track(result)?;
        self.state = State::Uninitialized;
        Ok(())
    }

    fn restart_sequence(&mut self) -> Result<(), Error<I2C::Error>> {
        let mode = self.regs.read_byte(MODE1)?;
        self.regs.write_byte(MODE1, mode | Mode1::SLEEP.bits())?;

        // RESTART self-asserts once the oscillator has stopped.
        self.delay.delay_us(SLEEP_TO_RESTART_US);

        let mode = Mode1::from_bits_retain(self.regs.read_byte(MODE1)?);
        if !mode.contains(Mode1::RESTART) {
            return Err(Error::RestartNotAcknowledged(mode.bits()));
        }

        // Clearing SLEEP keeps RESTART latched.
        let awake = mode - Mode1::SLEEP;
        self.regs.write_byte(MODE1, awake.bits())?;
        self.delay.delay_us(OSC_STABILIZE_US);

        self.regs.write_byte(MODE1, (awake | Mode1::RESTART).bits())?;
        Ok(())
    }

    /// Reset, then configure auto-increment, totem-pole outputs and 50 Hz.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        self.reset()?;
        let result = self.configure();
        self.track(result)?;
        self.state = State::Configured;
        Ok(())
    }

    fn configure(&mut self) -> Result<(), Error<I2C::Error>> {
        self.regs.write_byte(MODE1, Mode1::AI.bits())?;
        self.regs.write_byte(MODE2, Mode2::OUTDRV.bits())?;
        self.set_frequency(DEFAULT_FREQUENCY_HZ)
    }

    /// Program the PWM frequency of all channels.
    ///
    /// The prescaler only latches while the oscillator is asleep, so MODE1 is
    /// put to sleep, PRE_SCALE written, MODE1 restored and the channels
    /// restarted after the oscillator settles.
    pub fn set_frequency(&mut self, hz: u16) -> Result<(), Error<I2C::Error>> {
        if !(MIN_FREQUENCY_HZ..=MAX_FREQUENCY_HZ).contains(&hz) {
            return Err(Error::InvalidFrequency(hz));
        }
        let result = self.program_prescale(prescale_for(hz));
        self.track(result)
    }

    fn program_prescale(&mut self, prescale: u8) -> Result<(), Error<I2C::Error>> {
        let old = Mode1::from_bits_retain(self.regs.read_byte(MODE1)?);
        let sleeping = (old - Mode1::RESTART) | Mode1::SLEEP;

        self.regs.write_byte(MODE1, sleeping.bits())?;
        self.regs.write_byte(PRE_SCALE, prescale)?;
        self.regs.write_byte(MODE1, old.bits())?;
        self.delay.delay_us(OSC_STABILIZE_US);
        self.regs
            .write_byte(MODE1, (old | Mode1::RESTART | Mode1::AI).bits())?;
        Ok(())
    }

    /// Set `channel`'s on and off times within the 4096-tick cycle.
    ///
    /// Misordered times are swapped and each time is clamped to 4095.
    pub fn set_channel_time(
        &mut self,
        channel: u8,
        on: u16,
        off: u16,
    ) -> Result<(), Error<I2C::Error>> {
        let (on, off) = if on > off { (off, on) } else { (on, off) };
        self.write_channel(channel, on.min(MAX_TIME), off.min(MAX_TIME))
    }

    /// Leading-edge PWM with `duty` ticks high out of 4095.
    ///
    /// 0 writes (0, 0), fully off. 4095 writes (4095, 0), the fully-on
    /// encoding, verbatim rather than through the swap in
    /// [`set_channel_time`](Self::set_channel_time).
    pub fn set_duty_cycle(
        &mut self,
        channel: u8,
        duty: u16,
    ) -> Result<(), Error<I2C::Error>> {
        let (on, off) = match duty.min(MAX_TIME) {
            0 => (0, 0),
            MAX_TIME => (MAX_TIME, 0),
            duty => (0, duty),
        };
        self.write_channel(channel, on, off)
    }

    /// Apply [`set_channel_time`](Self::set_channel_time) to every channel in
    /// order. Stops at the first failure; earlier channels stay updated.
    pub fn set_all_channel_times(
        &mut self,
        on: &[u16; CHANNEL_COUNT],
        off: &[u16; CHANNEL_COUNT],
    ) -> Result<(), Error<I2C::Error>> {
        for (channel, (&on, &off)) in on.iter().zip(off.iter()).enumerate() {
            self.set_channel_time(channel as u8, on, off)?;
        }
        Ok(())
    }

    /// Drive every channel fully off.
    pub fn all_off(&mut self) -> Result<(), Error<I2C::Error>> {
        for channel in 0..CHANNEL_COUNT as u8 {
            self.set_duty_cycle(channel, 0)?;
        }
        Ok(())
    }

    /// Read `channel`'s (on, off) pair back from the controller.
    pub fn channel_time(
        &mut self,
        channel: u8,
    ) -> Result<(u16, u16), Error<I2C::Error>> {
        check_channel(channel)?;
        let mut buf = [0u8; 4];
        let result = self
            .regs
            .read_bytes(channel_base(channel), &mut buf)
            .map_err(Error::from);
        self.track(result)?;
        Ok((LittleEndian::read_u16(&buf[..2]), LittleEndian::read_u16(&buf[2..])))
    }

    pub fn prescale(&mut self) -> Result<u8, Error<I2C::Error>> {
        let result = self.regs.read_byte(PRE_SCALE).map_err(Error::from);
        self.track(result)
    }

    pub fn mode1(&mut self) -> Result<Mode1, Error<I2C::Error>> {
        let result = self.regs.read_byte(MODE1).map_err(Error::from);
        self.track(result).map(Mode1::from_bits_retain)
    }

    pub fn mode2(&mut self) -> Result<Mode2, Error<I2C::Error>> {
        let result = self.regs.read_byte(MODE2).map_err(Error::from);
        self.track(result).map(Mode2::from_bits_retain)
    }

    fn write_channel(
        &mut self,
        channel: u8,
        on: u16,
        off: u16,
    ) -> Result<(), Error<I2C::Error>> {
        check_channel(channel)?;
        let result = self
            .regs
            .write_words(channel_base(channel), &[on, off])
            .map_err(Error::from);
        self.track(result)
    }
}

fn check_channel<E>(channel: u8) -> Result<(), Error<E>> {
    if channel as usize >= CHANNEL_COUNT {
        return Err(Error::InvalidChannel(channel));
    }
    Ok(())
}
