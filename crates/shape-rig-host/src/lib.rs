//! Host side of the shape rig: opens `/dev/i2c-1` through a shared
//! [`bus_manager::BusManager`], drives the PCA9685 motor bank and the VL53L0X
//! ranging sensor, and replays recorded depth frames into motor targets.

pub mod config;
pub mod depth;
pub mod error;
pub mod motors;
pub mod platform;
pub mod scenarios;

pub use config::RigConfig;
pub use error::{Error, Result};
