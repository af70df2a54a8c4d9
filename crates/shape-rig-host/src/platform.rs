//! Linux I2C bus behind the shared bus manager.

use std::cell::RefCell;

use bus_manager::{BusDevice, BusError, BusFactory, BusManager, SharedBus};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::{Delay, I2cdev};
use pca9685::Pca9685;
use vl53l0x::Vl53l0x;

/// I2C adapter the rig is wired to.
pub const BUS_PATH: &str = "/dev/i2c-1";

/// Opens and closes the `/dev/i2c-*` character device.
pub struct LinuxI2cFactory;

impl BusFactory for LinuxI2cFactory {
    type Bus = SharedBus<NoopRawMutex, I2cdev>;
    type Resources = &'static str;
    type Destructor = &'static str;
    type Error = LinuxI2CError;

    fn create(
        path: Self::Resources,
    ) -> Result<(Self::Bus, Self::Destructor), (Self::Error, Self::Resources)> {
        match I2cdev::new(path) {
            Ok(dev) => {
                tracing::debug!(path, "I2C bus opened");
                Ok((Mutex::new(RefCell::new(dev)), path))
            }
            Err(err) => Err((err, path)),
        }
    }

    fn destroy(
        bus: Self::Bus,
        path: Self::Destructor,
    ) -> Result<Self::Resources, (Self::Error, Self::Resources)> {
        // Dropping the device closes its file descriptor.
        drop(bus);
        tracing::debug!(path, "I2C bus closed");
        Ok(path)
    }
}

pub type RigBus = BusManager<NoopRawMutex, LinuxI2cFactory>;
pub type RigDevice<'a> = BusDevice<'a, NoopRawMutex, LinuxI2cFactory>;
pub type PwmController<'a> = Pca9685<RigDevice<'a>, Delay>;
pub type RangeSensor<'a> = Vl53l0x<RigDevice<'a>, Delay>;

/// Manager for [`BUS_PATH`]. Nothing is opened until a device is.
pub fn bus() -> RigBus {
    BusManager::new(BUS_PATH)
}

pub fn open_pwm(
    bus: &RigBus,
    address: u8,
) -> Result<PwmController<'_>, BusError<LinuxI2CError>> {
    let device = BusDevice::acquire(bus)?;
    Ok(Pca9685::with_address(device, Delay, address))
}

pub fn open_range_sensor(
    bus: &RigBus,
    address: u8,
) -> Result<RangeSensor<'_>, BusError<LinuxI2CError>> {
    let device = BusDevice::acquire(bus)?;
    Ok(Vl53l0x::with_address(device, Delay, address))
}
