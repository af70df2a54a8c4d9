#![no_std]
//! Reference-counted lifecycle manager for a shared peripheral bus.
//!
//! The bus is opened by the first [`BusManager::acquire`] and closed again
//! when the last [`BusHandle`] goes away. Device drivers hold the bus through
//! a [`BusDevice`], which implements [`embedded_hal::i2c::I2c`] and keeps every
//! transaction under the bus lock.

mod device;
mod error;
mod factory;
mod handle;
mod manager;

pub use device::{BusDevice, SharedBus};
pub use error::BusError;
pub use factory::BusFactory;
pub use handle::BusHandle;
pub use manager::BusManager;
