use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use crate::error::BusError;
use crate::factory::BusFactory;
use crate::handle::BusHandle;
use crate::manager::BusManager;

/// Bus representation expected by [`BusDevice`]: the platform bus behind a
/// blocking mutex.
pub type SharedBus<M, T> = Mutex<M, RefCell<T>>;

/// One device's view of a shared I2C bus.
///
/// Owns a [`BusHandle`], so the bus stays open for as long as the device
/// exists. Every call runs inside a single bus lock; a write-then-read never
/// interleaves with another device's transfer.
pub struct BusDevice<'a, M: RawMutex, F: BusFactory> {
    handle: BusHandle<'a, M, F>,
}

impl<'a, M: RawMutex, F: BusFactory> BusDevice<'a, M, F> {
    pub fn new(handle: BusHandle<'a, M, F>) -> Self {
        Self { handle }
    }

    /// Acquire the bus (opening it if needed) and wrap the handle.
    pub fn acquire(
        manager: &'a BusManager<M, F>,
    ) -> Result<Self, BusError<F::Error>> {
        manager.acquire().map(Self::new)
    }

    pub fn handle(&self) -> &BusHandle<'a, M, F> {
        &self.handle
    }

    /// Give up this device's hold on the bus, reporting the close result.
    pub fn close(self) -> Result<(), BusError<F::Error>> {
        self.handle.close()
    }
}

impl<M, F, BM, T> ErrorType for BusDevice<'_, M, F>
where
    M: RawMutex,
    BM: RawMutex,
    F: BusFactory<Bus = SharedBus<BM, T>>,
    T: ErrorType,
{
    type Error = T::Error;
}

impl<M, F, BM, T> I2c for BusDevice<'_, M, F>
where
    M: RawMutex,
    BM: RawMutex,
    F: BusFactory<Bus = SharedBus<BM, T>>,
    T: I2c,
{
    fn read(
        &mut self,
        address: SevenBitAddress,
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.handle.lock(|bus| bus.borrow_mut().read(address, read))
    }

    fn write(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
    ) -> Result<(), Self::Error> {
        self.handle.lock(|bus| bus.borrow_mut().write(address, write))
    }

    fn write_read(
        &mut self,
        address: SevenBitAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.handle
            .lock(|bus| bus.borrow_mut().write_read(address, write, read))
    }

    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.handle
            .lock(|bus| bus.borrow_mut().transaction(address, operations))
    }
}
