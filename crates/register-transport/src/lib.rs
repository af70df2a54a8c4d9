#![no_std]
//! Register-oriented access to I2C peripherals.
//!
//! [`RegisterTransport`] binds one bus to one fixed 7-bit device address and
//! frames every register access as a single bus operation: writes send
//! `[reg] ++ payload` in one message, reads send the register byte and read
//! the data back in a combined write-then-read with no stop in between.
//!
//! Multi-byte values use the byte order chosen by the `B` type parameter, so
//! the wire layout never depends on the host architecture.

#[cfg(feature = "mock")]
extern crate std;

mod error;
#[cfg(feature = "mock")]
pub mod mock;
mod transaction;

use core::marker::PhantomData;

pub use byteorder::{BigEndian, ByteOrder, LittleEndian};
use embedded_hal::i2c::{self, I2c};
use heapless::Vec;

pub use error::{ErrorKind, TransportError};
pub use transaction::{Direction, RegisterTransaction};

/// Largest payload (excluding the register byte) a single write may carry.
pub const MAX_PAYLOAD: usize = 32;

/// Register access for a single device on a bus.
pub struct RegisterTransport<I2C, B> {
    i2c: I2C,
    address: u8,
    last_status: Option<i2c::ErrorKind>,
    _order: PhantomData<B>,
}

impl<I2C, B> RegisterTransport<I2C, B>
where
    I2C: I2c,
    B: ByteOrder,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address, last_status: None, _order: PhantomData }
    }

    /// The device address every transaction is sent to.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Outcome of the most recent bus transfer: `None` if it succeeded.
    pub fn last_status(&self) -> Option<i2c::ErrorKind> {
        self.last_status
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn execute(
        &mut self,
        transaction: RegisterTransaction<'_>,
    ) -> Result<(), TransportError<I2C::Error>> {
        let result = transaction.execute(&mut self.i2c);
        match &result {
            Ok(()) => self.last_status = None,
            Err(TransportError::I2c(err)) => {
                self.last_status = Some(i2c::Error::kind(err))
            }
            Err(TransportError::PayloadTooLong) => {}
        }
        result
    }

    /// Write `data` starting at `reg`, in one message.
    pub fn write_bytes(
        &mut self,
        reg: u8,
        data: &[u8],
    ) -> Result<(), TransportError<I2C::Error>> {
        self.execute(RegisterTransaction::write(self.address, reg, data))
    }

    pub fn write_byte(
        &mut self,
        reg: u8,
        value: u8,
    ) -> Result<(), TransportError<I2C::Error>> {
        self.write_bytes(reg, &[value])
    }

    pub fn write_word(
        &mut self,
        reg: u8,
        value: u16,
    ) -> Result<(), TransportError<I2C::Error>> {
        let mut buf = [0u8; 2];
        B::write_u16(&mut buf, value);
        self.write_bytes(reg, &buf)
    }

    pub fn write_dword(
        &mut self,
        reg: u8,
        value: u32,
    ) -> Result<(), TransportError<I2C::Error>> {
        let mut buf = [0u8; 4];
        B::write_u32(&mut buf, value);
        self.write_bytes(reg, &buf)
    }

    /// Write consecutive 16-bit values as one burst starting at `reg`.
    pub fn write_words(
        &mut self,
        reg: u8,
        values: &[u16],
    ) -> Result<(), TransportError<I2C::Error>> {
        let mut frame = Vec::<u8, MAX_PAYLOAD>::new();
        for &value in values {
            let mut buf = [0u8; 2];
            B::write_u16(&mut buf, value);
            frame
                .extend_from_slice(&buf)
                .map_err(|_| TransportError::PayloadTooLong)?;
        }
        self.write_bytes(reg, &frame)
    }

    /// Fill `buf` from consecutive registers starting at `reg`.
    pub fn read_bytes(
        &mut self,
        reg: u8,
        buf: &mut [u8],
    ) -> Result<(), TransportError<I2C::Error>> {
        self.execute(RegisterTransaction::read(self.address, reg, buf))
    }

    pub fn read_byte(
        &mut self,
        reg: u8,
    ) -> Result<u8, TransportError<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.read_bytes(reg, &mut buf)?;
        Ok(buf[0])
    }

    pub fn read_word(
        &mut self,
        reg: u8,
    ) -> Result<u16, TransportError<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.read_bytes(reg, &mut buf)?;
        Ok(B::read_u16(&buf))
    }

    pub fn read_dword(
        &mut self,
        reg: u8,
    ) -> Result<u32, TransportError<I2C::Error>> {
        let mut buf = [0u8; 4];
        self.read_bytes(reg, &mut buf)?;
        Ok(B::read_u32(&buf))
    }

    /// Read `reg`, apply `f`, and write the result back.
    pub fn modify_byte<F>(
        &mut self,
        reg: u8,
        f: F,
    ) -> Result<(), TransportError<I2C::Error>>
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read_byte(reg)?;
        self.write_byte(reg, f(value))
    }
}
