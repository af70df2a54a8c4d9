use embedded_hal::i2c::I2c;
use heapless::Vec;

use crate::error::TransportError;
use crate::MAX_PAYLOAD;

const FRAME_CAPACITY: usize = MAX_PAYLOAD + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Read,
    Write,
}

enum Payload<'b> {
    Read(&'b mut [u8]),
    Write(&'b [u8]),
}

/// One register access, built and consumed within a single call.
pub struct RegisterTransaction<'b> {
    pub device_address: u8,
    pub register: u8,
    payload: Payload<'b>,
}

impl<'b> RegisterTransaction<'b> {
    pub fn read(device_address: u8, register: u8, buf: &'b mut [u8]) -> Self {
        Self { device_address, register, payload: Payload::Read(buf) }
    }

    pub fn write(device_address: u8, register: u8, data: &'b [u8]) -> Self {
        Self { device_address, register, payload: Payload::Write(data) }
    }

    pub fn direction(&self) -> Direction {
        match self.payload {
            Payload::Read(_) => Direction::Read,
            Payload::Write(_) => Direction::Write,
        }
    }

    /// Number of data bytes moved, not counting the register byte.
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::Read(buf) => buf.len(),
            Payload::Write(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the transaction on `i2c`.
    ///
    /// A write is one message `[register] ++ data`. A read is a write of the
    /// register byte chained to the read without a stop condition.
    pub fn execute<I2C: I2c>(
        self,
        i2c: &mut I2C,
    ) -> Result<(), TransportError<I2C::Error>> {
        match self.payload {
            Payload::Write(data) => {
                let mut frame = Vec::<u8, FRAME_CAPACITY>::new();
                frame
                    .push(self.register)
                    .map_err(|_| TransportError::PayloadTooLong)?;
                frame
                    .extend_from_slice(data)
                    .map_err(|_| TransportError::PayloadTooLong)?;
                i2c.write(self.device_address, &frame)
                    .map_err(TransportError::I2c)
            }
            Payload::Read(buf) => i2c
                .write_read(self.device_address, &[self.register], buf)
                .map_err(TransportError::I2c),
        }
    }
}
